//! Directed-edge, boundary-edge and whole-edge tables.

use crate::mesh_error::MeshError;
use crate::slab::{Column, Slab, SlabConfig};
use crate::slab_columns;
use crate::topology::handle::{
    EdgeHandle, HoleId, Side, VertexId, WholeEdgeId, canonical_pair, next_directed, pack_wedge,
    prev_directed, unpack_wedge,
};

/// Sharpness stored on whole edges that bound a hole.
pub const BOUNDARY_SHARPNESS: f32 = -1.0;

const NONE: i32 = -1;

/// Read access to edge connectivity, shared by the mesh and its vertex rings.
///
/// Implementations assume valid handles; public callers go through the
/// checked accessors on [`TriMesh`](crate::topology::TriMesh).
pub trait EdgeProvider {
    fn origin(&self, e: EdgeHandle) -> VertexId;
    fn next(&self, e: EdgeHandle) -> EdgeHandle;
    fn prev(&self, e: EdgeHandle) -> EdgeHandle;
    /// Whole edge and side that `e` occupies.
    fn wedge(&self, e: EdgeHandle) -> (WholeEdgeId, Side);
    /// Both edges of a whole edge, `(left, right)`.
    fn whole_edge(&self, w: WholeEdgeId) -> (EdgeHandle, EdgeHandle);
    fn sharpness(&self, w: WholeEdgeId) -> f32;

    /// Twin of `e`.
    #[inline]
    fn pair(&self, e: EdgeHandle) -> EdgeHandle {
        let (w, side) = self.wedge(e);
        let (left, right) = self.whole_edge(w);
        match side {
            Side::Left => right,
            Side::Right => left,
        }
    }

    #[inline]
    fn dest(&self, e: EdgeHandle) -> VertexId {
        self.origin(self.next(e))
    }

    #[inline]
    fn edge_sharpness(&self, e: EdgeHandle) -> f32 {
        self.sharpness(self.wedge(e).0)
    }
}

#[derive(Debug)]
pub struct DirectedColumns {
    pub origin: Column<i32>,
    pub wedge: Column<i32>,
}
slab_columns!(DirectedColumns { origin, wedge });

#[derive(Debug)]
pub struct BoundaryColumns {
    /// Origin vertex; `-1` marks a free slot.
    pub origin: Column<i32>,
    pub prev: Column<i32>,
    /// Next boundary edge, or the free-list link of a free slot.
    pub next: Column<i32>,
    /// Owning hole, `-1` while unassigned.
    pub hole: Column<i32>,
    pub wedge: Column<i32>,
}
slab_columns!(BoundaryColumns {
    origin,
    prev,
    next,
    hole,
    wedge
});

#[derive(Debug)]
pub struct WholeEdgeColumns {
    /// Encoded `(left, right)` edge handles.
    pub edge: Column<i32>,
    pub sharpness: Column<f32>,
}
slab_columns!(WholeEdgeColumns { edge, sharpness });

/// All edge storage of a triangle mesh.
#[derive(Debug)]
pub struct EdgeTables {
    pub(crate) directed: Slab<DirectedColumns>,
    pub(crate) boundary: Slab<BoundaryColumns>,
    pub(crate) whole: Slab<WholeEdgeColumns>,
    free_head: i32,
    free_count: usize,
}

impl EdgeTables {
    pub fn new(config: SlabConfig) -> Self {
        EdgeTables {
            directed: Slab::new(
                "directed-edge",
                DirectedColumns {
                    origin: Column::with_fill("origin", 1, NONE),
                    wedge: Column::with_fill("wedge", 1, NONE),
                },
                config,
            ),
            boundary: Slab::new(
                "boundary-edge",
                BoundaryColumns {
                    origin: Column::with_fill("origin", 1, NONE),
                    prev: Column::with_fill("prev", 1, NONE),
                    next: Column::with_fill("next", 1, NONE),
                    hole: Column::with_fill("hole", 1, NONE),
                    wedge: Column::with_fill("wedge", 1, NONE),
                },
                config,
            ),
            whole: Slab::new(
                "whole-edge",
                WholeEdgeColumns {
                    edge: Column::with_fill("edge", 2, NONE),
                    sharpness: Column::new("sharpness", 1),
                },
                config,
            ),
            free_head: NONE,
            free_count: 0,
        }
    }

    pub fn directed_len(&self) -> usize {
        self.directed.len()
    }

    /// Boundary slots, live and free.
    pub fn boundary_len(&self) -> usize {
        self.boundary.len()
    }

    pub fn live_boundary_len(&self) -> usize {
        self.boundary.len() - self.free_count
    }

    pub fn free_boundary_len(&self) -> usize {
        self.free_count
    }

    pub fn whole_len(&self) -> usize {
        self.whole.len()
    }

    pub(crate) fn free_head(&self) -> Option<u32> {
        (self.free_head >= 0).then_some(self.free_head as u32)
    }

    /// Check that `e` addresses a live edge.
    pub fn check_edge(&self, e: EdgeHandle) -> Result<(), MeshError> {
        match e {
            EdgeHandle::Directed(d) if (d as usize) < self.directed.len() => Ok(()),
            EdgeHandle::Directed(d) => Err(MeshError::invalid(
                "directed edge",
                d as usize,
                self.directed.len(),
            )),
            EdgeHandle::Boundary(b) if (b as usize) < self.boundary.len() && !self.is_free(b) => {
                Ok(())
            }
            EdgeHandle::Boundary(b) => Err(MeshError::invalid(
                "boundary edge",
                b as usize,
                self.boundary.len(),
            )),
        }
    }

    pub fn check_whole_edge(&self, w: WholeEdgeId) -> Result<(), MeshError> {
        if w.index() < self.whole.len() {
            Ok(())
        } else {
            Err(MeshError::invalid("whole edge", w.index(), self.whole.len()))
        }
    }

    /// Append three directed edges for a new triangle; returns the first handle.
    pub(crate) fn alloc_triangle(&mut self, origins: [VertexId; 3]) -> Result<u32, MeshError> {
        let first = self.directed.append(3)?;
        let cols = self.directed.columns_mut();
        for (i, v) in origins.into_iter().enumerate() {
            cols.origin.set(first + i, 0, v.0 as i32);
        }
        Ok(first as u32)
    }

    pub(crate) fn set_origin(&mut self, e: EdgeHandle, v: VertexId) {
        match e {
            EdgeHandle::Directed(d) => self.directed.columns_mut().origin.set(d as usize, 0, v.0 as i32),
            EdgeHandle::Boundary(b) => self.boundary.columns_mut().origin.set(b as usize, 0, v.0 as i32),
        }
    }

    /// Take a boundary slot from the free list, or append one.
    pub(crate) fn alloc_boundary(&mut self, origin: VertexId) -> Result<u32, MeshError> {
        let b = match self.free_head() {
            Some(b) => {
                self.free_head = self.boundary.columns().next.get(b as usize, 0);
                self.free_count -= 1;
                b as usize
            }
            None => self.boundary.append(1)?,
        };
        let cols = self.boundary.columns_mut();
        cols.origin.set(b, 0, origin.0 as i32);
        cols.prev.set(b, 0, NONE);
        cols.next.set(b, 0, NONE);
        cols.hole.set(b, 0, NONE);
        cols.wedge.set(b, 0, NONE);
        Ok(b as u32)
    }

    /// Tombstone a boundary slot and push it on the free list.
    pub(crate) fn free_boundary(&mut self, b: u32) {
        debug_assert!(!self.is_free(b), "double free of boundary edge b{b}");
        let head = self.free_head;
        let cols = self.boundary.columns_mut();
        let b = b as usize;
        cols.origin.set(b, 0, NONE);
        cols.prev.set(b, 0, NONE);
        cols.hole.set(b, 0, NONE);
        cols.wedge.set(b, 0, NONE);
        cols.next.set(b, 0, head);
        self.free_head = b as i32;
        self.free_count += 1;
    }

    /// Reset the free list after the boundary slab was repacked.
    pub(crate) fn clear_free_list(&mut self) {
        self.free_head = NONE;
        self.free_count = 0;
    }

    #[inline]
    pub fn is_free(&self, b: u32) -> bool {
        self.boundary.columns().origin.get(b as usize, 0) < 0
    }

    /// Live boundary edges in index order.
    pub fn boundary_iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.boundary.len() as u32).filter(move |&b| !self.is_free(b))
    }

    /// `next(a) = b` on the boundary lists.
    #[inline]
    pub(crate) fn link_next(&mut self, a: u32, b: u32) {
        let cols = self.boundary.columns_mut();
        cols.next.set(a as usize, 0, b as i32);
        cols.prev.set(b as usize, 0, a as i32);
    }

    #[inline]
    pub(crate) fn boundary_next(&self, b: u32) -> u32 {
        self.boundary.columns().next.get(b as usize, 0) as u32
    }

    #[inline]
    pub(crate) fn boundary_prev(&self, b: u32) -> u32 {
        self.boundary.columns().prev.get(b as usize, 0) as u32
    }

    pub fn hole(&self, b: u32) -> Option<HoleId> {
        let h = self.boundary.columns().hole.get(b as usize, 0);
        (h >= 0).then_some(HoleId(h as u32))
    }

    pub(crate) fn set_hole(&mut self, b: u32, hole: Option<HoleId>) {
        let raw = hole.map_or(NONE, |h| h.0 as i32);
        self.boundary.columns_mut().hole.set(b as usize, 0, raw);
    }

    fn set_wedge_ref(&mut self, e: EdgeHandle, w: WholeEdgeId, side: Side) {
        let raw = pack_wedge(w, side);
        match e {
            EdgeHandle::Directed(d) => self.directed.columns_mut().wedge.set(d as usize, 0, raw),
            EdgeHandle::Boundary(b) => self.boundary.columns_mut().wedge.set(b as usize, 0, raw),
        }
    }

    /// Allocate a whole edge joining `a` and `b`.
    pub(crate) fn alloc_whole_edge(
        &mut self,
        a: EdgeHandle,
        b: EdgeHandle,
        sharpness: f32,
    ) -> Result<WholeEdgeId, MeshError> {
        let w = WholeEdgeId(self.whole.append(1)? as u32);
        self.whole.columns_mut().sharpness.set(w.index(), 0, sharpness);
        self.set_whole_edge(w, a, b);
        Ok(w)
    }

    /// Rewrite a whole edge in canonical order and repair both back-references.
    pub(crate) fn set_whole_edge(&mut self, w: WholeEdgeId, a: EdgeHandle, b: EdgeHandle) {
        let (left, right) = canonical_pair(a, b);
        debug_assert!(!left.is_boundary(), "whole edge {w} has two boundary edges");
        self.whole
            .columns_mut()
            .edge
            .set_vec(w.index(), [left.encode(), right.encode()]);
        self.set_wedge_ref(left, w, Side::Left);
        self.set_wedge_ref(right, w, Side::Right);
    }

    pub(crate) fn set_sharpness(&mut self, w: WholeEdgeId, s: f32) {
        self.whole.columns_mut().sharpness.set(w.index(), 0, s);
    }
}

impl EdgeProvider for EdgeTables {
    #[inline]
    fn origin(&self, e: EdgeHandle) -> VertexId {
        let raw = match e {
            EdgeHandle::Directed(d) => self.directed.columns().origin.get(d as usize, 0),
            EdgeHandle::Boundary(b) => self.boundary.columns().origin.get(b as usize, 0),
        };
        VertexId(raw as u32)
    }

    #[inline]
    fn next(&self, e: EdgeHandle) -> EdgeHandle {
        match e {
            EdgeHandle::Directed(d) => EdgeHandle::Directed(next_directed(d)),
            EdgeHandle::Boundary(b) => EdgeHandle::Boundary(self.boundary_next(b)),
        }
    }

    #[inline]
    fn prev(&self, e: EdgeHandle) -> EdgeHandle {
        match e {
            EdgeHandle::Directed(d) => EdgeHandle::Directed(prev_directed(d)),
            EdgeHandle::Boundary(b) => EdgeHandle::Boundary(self.boundary_prev(b)),
        }
    }

    #[inline]
    fn wedge(&self, e: EdgeHandle) -> (WholeEdgeId, Side) {
        let raw = match e {
            EdgeHandle::Directed(d) => self.directed.columns().wedge.get(d as usize, 0),
            EdgeHandle::Boundary(b) => self.boundary.columns().wedge.get(b as usize, 0),
        };
        unpack_wedge(raw)
    }

    #[inline]
    fn whole_edge(&self, w: WholeEdgeId) -> (EdgeHandle, EdgeHandle) {
        let [l, r] = self.whole.columns().edge.get_vec::<2>(w.index());
        (EdgeHandle::decode(l), EdgeHandle::decode(r))
    }

    #[inline]
    fn sharpness(&self, w: WholeEdgeId) -> f32 {
        self.whole.columns().sharpness.get(w.index(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_list_reuses_tombstoned_slots() {
        let mut t = EdgeTables::new(SlabConfig::default());
        let a = t.alloc_boundary(VertexId(0)).unwrap();
        let b = t.alloc_boundary(VertexId(1)).unwrap();
        t.free_boundary(a);
        assert!(t.is_free(a));
        assert_eq!(t.free_boundary_len(), 1);
        assert_eq!(t.boundary_iter().collect::<Vec<_>>(), vec![b]);
        let c = t.alloc_boundary(VertexId(2)).unwrap();
        assert_eq!(c, a);
        assert_eq!(t.free_boundary_len(), 0);
        assert_eq!(t.boundary_len(), 2);
    }

    #[test]
    fn whole_edge_back_references() {
        let mut t = EdgeTables::new(SlabConfig::default());
        t.alloc_triangle([VertexId(0), VertexId(1), VertexId(2)]).unwrap();
        let b = t.alloc_boundary(VertexId(1)).unwrap();
        let w = t
            .alloc_whole_edge(EdgeHandle::Boundary(b), EdgeHandle::Directed(0), 0.0)
            .unwrap();
        assert_eq!(t.whole_edge(w), (EdgeHandle::Directed(0), EdgeHandle::Boundary(b)));
        assert_eq!(t.pair(EdgeHandle::Directed(0)), EdgeHandle::Boundary(b));
        assert_eq!(t.pair(EdgeHandle::Boundary(b)), EdgeHandle::Directed(0));
        assert_eq!(t.wedge(EdgeHandle::Boundary(b)), (w, Side::Right));
    }
}
