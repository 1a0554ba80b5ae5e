//! Vertex table and vertex-ring circulators.

use std::f32::consts::TAU;

use crate::mesh_error::MeshError;
use crate::slab::{Column, Slab, SlabConfig};
use crate::slab_columns;
use crate::topology::edge::EdgeProvider;
use crate::topology::handle::{EdgeHandle, VertexId};

/// Crease value of a corner vertex.
pub const CORNER: f32 = -1.0;

/// Field of the position column holding the crease value.
pub const CREASE_FIELD: usize = 3;

#[derive(Debug)]
pub struct VertexColumns {
    /// One outgoing directed edge, `-1` for an isolated vertex.
    pub out_edge: Column<i32>,
    pub valence: Column<i32>,
    /// `x, y, z, crease`.
    pub position: Column<f32>,
    pub normal: Column<f32>,
}
slab_columns!(VertexColumns {
    out_edge,
    valence,
    position,
    normal
});

#[derive(Debug)]
pub struct VertexTable {
    pub(crate) slab: Slab<VertexColumns>,
}

impl VertexTable {
    pub fn new(config: SlabConfig) -> Self {
        VertexTable {
            slab: Slab::new(
                "vertex",
                VertexColumns {
                    out_edge: Column::with_fill("out_edge", 1, -1),
                    valence: Column::new("valence", 1),
                    position: Column::new("position", 4),
                    normal: Column::new("normal", 3),
                },
                config,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    pub fn check(&self, v: VertexId) -> Result<(), MeshError> {
        if v.index() < self.slab.len() {
            Ok(())
        } else {
            Err(MeshError::invalid("vertex", v.index(), self.slab.len()))
        }
    }

    /// Append an isolated vertex.
    pub fn alloc(&mut self, position: [f32; 3]) -> Result<VertexId, MeshError> {
        let v = self.slab.append(1)?;
        let [x, y, z] = position;
        self.slab.columns_mut().position.set_vec_tracked(v, [x, y, z, 0.0]);
        Ok(VertexId(v as u32))
    }

    #[inline]
    pub fn out_edge(&self, v: VertexId) -> Option<EdgeHandle> {
        let raw = self.slab.columns().out_edge.get(v.index(), 0);
        (raw >= 0).then(|| EdgeHandle::decode(raw))
    }

    #[inline]
    pub(crate) fn set_out_edge(&mut self, v: VertexId, e: EdgeHandle) {
        self.slab.columns_mut().out_edge.set(v.index(), 0, e.encode());
    }

    #[inline]
    pub fn position(&self, v: VertexId) -> [f32; 3] {
        self.slab.columns().position.get_vec::<3>(v.index())
    }

    pub fn set_position(&mut self, v: VertexId, p: [f32; 3]) {
        self.slab.columns_mut().position.set_vec_tracked(v.index(), p);
    }

    #[inline]
    pub fn crease(&self, v: VertexId) -> f32 {
        self.slab.columns().position.get(v.index(), CREASE_FIELD)
    }

    #[inline]
    pub fn valence(&self, v: VertexId) -> u32 {
        self.slab.columns().valence.get(v.index(), 0).max(0) as u32
    }

    #[inline]
    pub fn normal(&self, v: VertexId) -> [f32; 3] {
        self.slab.columns().normal.get_vec::<3>(v.index())
    }

    /// Lazy circulator over the edges leaving `v`.
    ///
    /// The ring must be closed; on a corrupted mesh the walk does not end.
    /// Use [`validate_mesh`](crate::topology::validation::validate_mesh) first
    /// when that is in doubt.
    pub fn outgoing_ring<'a, P: EdgeProvider>(&self, edges: &'a P, v: VertexId) -> OutgoingRing<'a, P> {
        OutgoingRing::new(edges, self.out_edge(v))
    }

    /// Lazy circulator over the edges arriving at `v`.
    pub fn incoming_ring<'a, P: EdgeProvider>(&self, edges: &'a P, v: VertexId) -> IncomingRing<'a, P> {
        IncomingRing::new(edges, self.out_edge(v))
    }

    /// Recompute valence and crease of every vertex from its ring.
    ///
    /// An incident whole edge is sharp when its sharpness is positive. More
    /// than two sharp edges make a corner, exactly two a crease of their
    /// smaller weight. Any boundary edge makes the vertex a corner, so
    /// boundary vertices are pinned in place by refinement.
    pub fn compute_valence_and_crease<P: EdgeProvider>(&mut self, edges: &P) {
        for v in 0..self.slab.len() {
            let v = VertexId(v as u32);
            let mut valence = 0i32;
            let mut sharp = [0.0f32; 3];
            let mut count = 0usize;
            for e in self.outgoing_ring(edges, v) {
                valence += 1;
                let s = edges.edge_sharpness(e);
                if count < 3 {
                    if s < 0.0 {
                        count = 3;
                    } else if s > 0.0 {
                        sharp[count] = s;
                        count += 1;
                    }
                }
            }
            let crease = match count {
                3 => CORNER,
                2 => sharp[0].min(sharp[1]),
                _ => 0.0,
            };
            let cols = self.slab.columns_mut();
            cols.valence.set(v.index(), 0, valence);
            cols.position.set_tracked(v.index(), CREASE_FIELD, crease);
        }
    }

    /// Loop tangent normal: weight ring neighbours by `cos`/`sin` of their ring
    /// position and cross the two tangents.
    pub fn compute_loop_normal<P: EdgeProvider>(&mut self, edges: &P) {
        for v in 0..self.slab.len() {
            let n = self.loop_normal(edges, VertexId(v as u32));
            self.slab.columns_mut().normal.set_vec_tracked(v, n);
        }
    }

    pub(crate) fn loop_normal<P: EdgeProvider>(&self, edges: &P, v: VertexId) -> [f32; 3] {
        let valence = self.valence(v);
        if valence == 0 {
            return [0.0; 3];
        }
        let step = TAU / valence as f32;
        let mut t1 = [0.0f32; 3];
        let mut t2 = [0.0f32; 3];
        for (i, e) in self.outgoing_ring(edges, v).enumerate() {
            let p = self.position(edges.dest(e));
            let (sin, cos) = (i as f32 * step).sin_cos();
            for k in 0..3 {
                t1[k] += cos * p[k];
                t2[k] += sin * p[k];
            }
        }
        // the outgoing ring turns clockwise around a counter-clockwise fan
        normalize(cross(t2, t1))
    }
}

#[inline]
pub(crate) fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > f32::EPSILON {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0.0; 3]
    }
}

/// Outgoing-edge circulator: `e -> next(pair(e))`.
///
/// Restartable by cloning before iterating.
#[derive(Clone)]
pub struct OutgoingRing<'a, P> {
    edges: &'a P,
    start: Option<EdgeHandle>,
    current: Option<EdgeHandle>,
}

impl<'a, P: EdgeProvider> OutgoingRing<'a, P> {
    pub fn new(edges: &'a P, start: Option<EdgeHandle>) -> Self {
        OutgoingRing {
            edges,
            start,
            current: start,
        }
    }
}

impl<P: EdgeProvider> Iterator for OutgoingRing<'_, P> {
    type Item = EdgeHandle;

    fn next(&mut self) -> Option<EdgeHandle> {
        let e = self.current?;
        let next = self.edges.next(self.edges.pair(e));
        self.current = (Some(next) != self.start).then_some(next);
        Some(e)
    }
}

/// Incoming-edge circulator: yields `pair(e)` and steps to `next(pair(e))`.
#[derive(Clone)]
pub struct IncomingRing<'a, P> {
    edges: &'a P,
    start: Option<EdgeHandle>,
    current: Option<EdgeHandle>,
}

impl<'a, P: EdgeProvider> IncomingRing<'a, P> {
    pub fn new(edges: &'a P, start: Option<EdgeHandle>) -> Self {
        IncomingRing {
            edges,
            start,
            current: start,
        }
    }
}

impl<P: EdgeProvider> Iterator for IncomingRing<'_, P> {
    type Item = EdgeHandle;

    fn next(&mut self) -> Option<EdgeHandle> {
        let out = self.current?;
        let incoming = self.edges.pair(out);
        let next = self.edges.next(incoming);
        self.current = (Some(next) != self.start).then_some(next);
        Some(incoming)
    }
}
