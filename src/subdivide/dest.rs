//! Write-only view of a pre-sized destination mesh.
//!
//! A subdivision pass writes every destination row exactly once, and the
//! handle remap decides which unit writes which row. The view hands out raw
//! column pointers so units running on different threads can fill disjoint
//! rows of the same column without locking.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::slab::Column;
use crate::topology::handle::{EdgeHandle, FaceId, HoleId, Side, VertexId, WholeEdgeId, pack_wedge};
use crate::topology::material::MaterialId;
use crate::topology::mesh::TriMesh;

/// Shared mutable access to one column's padded buffer.
pub(crate) struct SyncSlice<T> {
    ptr: *mut T,
    len: usize,
    stride: usize,
    _marker: PhantomData<T>,
}

// SAFETY: a SyncSlice is only written through `write`, whose contract
// requires distinct indices per concurrent writer; `T: Pod` has no drop glue.
unsafe impl<T: Pod + Send> Send for SyncSlice<T> {}
unsafe impl<T: Pod + Send> Sync for SyncSlice<T> {}

impl<T: Pod> SyncSlice<T> {
    fn new(column: &mut Column<T>) -> Self {
        SyncSlice {
            len: column.padded().len(),
            stride: column.stride(),
            ptr: column.as_mut_ptr(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// The column must outlive the view and must not be resized, and no other
    /// thread may read or write `(row, field)` concurrently.
    #[inline]
    unsafe fn write(&self, row: usize, field: usize, value: T) {
        let i = row * self.stride + field;
        debug_assert!(field < self.stride && i < self.len, "destination write out of bounds");
        // SAFETY: in bounds by the debug check above and the presize; exclusive
        // by the caller's contract.
        unsafe { self.ptr.add(i).write(value) }
    }
}

/// Raw write handles for every topology column of a destination mesh.
pub(crate) struct DestView {
    vertex_out: SyncSlice<i32>,
    vertex_valence: SyncSlice<i32>,
    vertex_position: SyncSlice<f32>,
    face_material: SyncSlice<i32>,
    directed_origin: SyncSlice<i32>,
    directed_wedge: SyncSlice<i32>,
    boundary_origin: SyncSlice<i32>,
    boundary_prev: SyncSlice<i32>,
    boundary_next: SyncSlice<i32>,
    boundary_hole: SyncSlice<i32>,
    boundary_wedge: SyncSlice<i32>,
    whole_edge: SyncSlice<i32>,
    whole_sharpness: SyncSlice<f32>,
    hole_edge: SyncSlice<i32>,
    hole_sides: SyncSlice<i32>,
}

impl DestView {
    /// Capture the columns of `dest`, which must already be pre-sized.
    ///
    /// The view does not borrow `dest`; the caller keeps it alive and
    /// untouched until every writer has finished.
    pub(crate) fn new(dest: &mut TriMesh) -> Self {
        let v = dest.vertices.slab.columns_mut();
        let (vertex_out, vertex_valence, vertex_position) = (
            SyncSlice::new(&mut v.out_edge),
            SyncSlice::new(&mut v.valence),
            SyncSlice::new(&mut v.position),
        );
        let face_material = SyncSlice::new(&mut dest.faces.slab.columns_mut().material);
        let d = dest.edges.directed.columns_mut();
        let (directed_origin, directed_wedge) = (SyncSlice::new(&mut d.origin), SyncSlice::new(&mut d.wedge));
        let b = dest.edges.boundary.columns_mut();
        let (boundary_origin, boundary_prev, boundary_next, boundary_hole, boundary_wedge) = (
            SyncSlice::new(&mut b.origin),
            SyncSlice::new(&mut b.prev),
            SyncSlice::new(&mut b.next),
            SyncSlice::new(&mut b.hole),
            SyncSlice::new(&mut b.wedge),
        );
        let w = dest.edges.whole.columns_mut();
        let (whole_edge, whole_sharpness) = (SyncSlice::new(&mut w.edge), SyncSlice::new(&mut w.sharpness));
        let h = dest.holes.slab.columns_mut();
        let (hole_edge, hole_sides) = (SyncSlice::new(&mut h.edge), SyncSlice::new(&mut h.sides));
        DestView {
            vertex_out,
            vertex_valence,
            vertex_position,
            face_material,
            directed_origin,
            directed_wedge,
            boundary_origin,
            boundary_prev,
            boundary_next,
            boundary_hole,
            boundary_wedge,
            whole_edge,
            whole_sharpness,
            hole_edge,
            hole_sides,
        }
    }

    /// # Safety
    ///
    /// See [`SyncSlice::write`]: row `v` is written by one unit only.
    pub(crate) unsafe fn set_vertex(&self, v: VertexId, position: [f32; 4], valence: u32, out: Option<EdgeHandle>) {
        let row = v.index();
        unsafe {
            for (k, x) in position.into_iter().enumerate() {
                self.vertex_position.write(row, k, x);
            }
            self.vertex_valence.write(row, 0, valence as i32);
            self.vertex_out.write(row, 0, out.map_or(-1, EdgeHandle::encode));
        }
    }

    /// # Safety
    ///
    /// Row `f` is written by one unit only.
    pub(crate) unsafe fn set_material(&self, f: FaceId, material: MaterialId) {
        unsafe { self.face_material.write(f.index(), 0, material.0 as i32) }
    }

    /// # Safety
    ///
    /// Row `e` of the origin column is written by one unit only.
    pub(crate) unsafe fn set_origin(&self, e: EdgeHandle, v: VertexId) {
        unsafe {
            match e {
                EdgeHandle::Directed(d) => self.directed_origin.write(d as usize, 0, v.0 as i32),
                EdgeHandle::Boundary(b) => self.boundary_origin.write(b as usize, 0, v.0 as i32),
            }
        }
    }

    /// Write whole edge `w` in canonical order with both back-references.
    ///
    /// # Safety
    ///
    /// Whole edge `w` and the wedge rows of `left` and `right` are written by
    /// one unit only.
    pub(crate) unsafe fn set_whole_edge(&self, w: WholeEdgeId, left: EdgeHandle, right: EdgeHandle, sharpness: f32) {
        unsafe {
            self.whole_edge.write(w.index(), 0, left.encode());
            self.whole_edge.write(w.index(), 1, right.encode());
            self.whole_sharpness.write(w.index(), 0, sharpness);
            self.set_wedge_ref(left, w, Side::Left);
            self.set_wedge_ref(right, w, Side::Right);
        }
    }

    unsafe fn set_wedge_ref(&self, e: EdgeHandle, w: WholeEdgeId, side: Side) {
        let raw = pack_wedge(w, side);
        unsafe {
            match e {
                EdgeHandle::Directed(d) => self.directed_wedge.write(d as usize, 0, raw),
                EdgeHandle::Boundary(b) => self.boundary_wedge.write(b as usize, 0, raw),
            }
        }
    }

    /// # Safety
    ///
    /// Boundary row `b` is written by one unit only.
    pub(crate) unsafe fn set_boundary_links(&self, b: u32, prev: u32, next: u32, hole: Option<HoleId>) {
        let row = b as usize;
        unsafe {
            self.boundary_prev.write(row, 0, prev as i32);
            self.boundary_next.write(row, 0, next as i32);
            self.boundary_hole.write(row, 0, hole.map_or(-1, |h| h.0 as i32));
        }
    }

    /// # Safety
    ///
    /// Hole row `h` is written by one unit only.
    pub(crate) unsafe fn set_hole(&self, h: HoleId, edge: u32, sides: u32) {
        unsafe {
            self.hole_edge.write(h.index(), 0, edge as i32);
            self.hole_sides.write(h.index(), 0, sides as i32);
        }
    }
}
