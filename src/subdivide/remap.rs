//! Old-handle to new-handle arithmetic for one Loop pass.
//!
//! Every function here is pure: the unit that writes a new element and the
//! unit that links to it compute the same handle independently. Over all old
//! vertices and whole edges, [`HandleRemap::new_vertex`] and
//! [`HandleRemap::new_edge_vertex`] cover `0 .. V + W` exactly once; over all
//! old whole edges and faces, [`HandleRemap::new_whole_edge_pair`] and
//! [`HandleRemap::new_face_whole_edge_base`] cover `0 .. 2W + 3F` exactly
//! once.
//!
//! Triangle `f` becomes faces `4f .. 4f + 4`: one per old corner, then the
//! inner triangle. Its twelve directed edges are `12f + 3i + j` for corner
//! triangle `i`, and `12f + 9 + j` for the inner one.

use crate::subdivide::partition::WorkPartition;
use crate::topology::handle::{EdgeHandle, FaceId, NEXT, VertexId, WholeEdgeId};

/// Offsets of the three whole edges inside a mixed 12-slot block.
const BLOCK_WEDGE: [u32; 3] = [0, 5, 10];
/// Offsets of the two faces' interior whole edges inside a mixed block.
const BLOCK_FACE: [u32; 2] = [2, 7];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRemap {
    partition: WorkPartition,
}

impl HandleRemap {
    pub fn new(partition: WorkPartition) -> Self {
        HandleRemap { partition }
    }

    pub fn partition(&self) -> &WorkPartition {
        &self.partition
    }

    /// New vertex refined from old vertex `v`.
    #[inline]
    pub fn new_vertex(&self, v: VertexId) -> VertexId {
        let p = &self.partition;
        let v = v.index();
        let n = if v < p.v_mix {
            4 * v
        } else {
            4 * p.v_mix + (p.whole_edges - 3 * p.v_mix) + (v - p.v_mix)
        };
        VertexId(n as u32)
    }

    /// New vertex inserted on old whole edge `w`.
    #[inline]
    pub fn new_edge_vertex(&self, w: WholeEdgeId) -> VertexId {
        let p = &self.partition;
        let w = w.index();
        let n = if w < 3 * p.v_mix {
            4 * (w / 3) + 1 + w % 3
        } else {
            4 * p.v_mix + (w - 3 * p.v_mix)
        };
        VertexId(n as u32)
    }

    /// The two whole edges old whole edge `w` splits into: `lo` joins the
    /// first half of its left edge, `hi` the second half.
    #[inline]
    pub fn new_whole_edge_pair(&self, w: WholeEdgeId) -> (WholeEdgeId, WholeEdgeId) {
        let p = &self.partition;
        let w = w.0;
        let lo = if (w as usize) < 3 * p.w_mix {
            12 * (w / 3) + BLOCK_WEDGE[(w % 3) as usize]
        } else {
            let base = 12 * p.w_mix + 3 * (p.faces - 2 * p.w_mix);
            (base + 2 * (w as usize - 3 * p.w_mix)) as u32
        };
        (WholeEdgeId(lo), WholeEdgeId(lo + 1))
    }

    /// First of the three interior whole edges created inside old face `f`.
    #[inline]
    pub fn new_face_whole_edge_base(&self, f: FaceId) -> WholeEdgeId {
        let p = &self.partition;
        let f = f.0;
        let base = if (f as usize) < 2 * p.w_mix {
            12 * (f / 2) + BLOCK_FACE[(f % 2) as usize]
        } else {
            (12 * p.w_mix + 3 * (f as usize - 2 * p.w_mix)) as u32
        };
        WholeEdgeId(base)
    }
}

/// The four faces old face `f` becomes; the last is the inner triangle.
#[inline]
pub fn new_faces(f: FaceId) -> [FaceId; 4] {
    let base = 4 * f.0;
    [FaceId(base), FaceId(base + 1), FaceId(base + 2), FaceId(base + 3)]
}

/// Half of `e` that starts at `e`'s origin.
#[inline]
pub fn first_half(e: EdgeHandle) -> EdgeHandle {
    match e {
        EdgeHandle::Directed(d) => EdgeHandle::Directed(12 * (d / 3) + 3 * (d % 3)),
        EdgeHandle::Boundary(b) => EdgeHandle::Boundary(2 * b),
    }
}

/// Half of `e` that ends at `e`'s destination.
#[inline]
pub fn second_half(e: EdgeHandle) -> EdgeHandle {
    match e {
        EdgeHandle::Directed(d) => EdgeHandle::Directed(12 * (d / 3) + 3 * NEXT[(d % 3) as usize] + 2),
        EdgeHandle::Boundary(b) => EdgeHandle::Boundary(2 * b + 1),
    }
}

/// Interior edge of corner triangle `i` of old face `f`, running between the
/// two new edge vertices.
#[inline]
pub fn corner_interior_edge(f: FaceId, i: u32) -> u32 {
    12 * f.0 + 3 * i + 1
}

/// Edge `i` of the inner triangle of old face `f`; twin of
/// [`corner_interior_edge`]`(f, i)`.
#[inline]
pub fn inner_edge(f: FaceId, i: u32) -> u32 {
    12 * f.0 + 9 + i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::mesh::MeshCounts;

    fn remap(vertices: usize, faces: usize, whole_edges: usize) -> HandleRemap {
        HandleRemap::new(WorkPartition::compute(&MeshCounts {
            vertices,
            faces,
            whole_edges,
            ..MeshCounts::default()
        }))
    }

    #[test]
    fn mixed_vertex_block_is_consecutive() {
        let r = remap(6, 8, 12);
        assert_eq!(r.new_vertex(VertexId(1)), VertexId(4));
        assert_eq!(r.new_edge_vertex(WholeEdgeId(3)), VertexId(5));
        assert_eq!(r.new_edge_vertex(WholeEdgeId(5)), VertexId(7));
        // remainder: 4 mixed blocks use 16 rows and all 12 edges
        assert_eq!(r.new_vertex(VertexId(4)), VertexId(16));
        assert_eq!(r.new_vertex(VertexId(5)), VertexId(17));
    }

    #[test]
    fn mixed_wedge_block_layout() {
        let r = remap(6, 8, 12);
        assert_eq!(r.new_whole_edge_pair(WholeEdgeId(0)), (WholeEdgeId(0), WholeEdgeId(1)));
        assert_eq!(r.new_face_whole_edge_base(FaceId(0)), WholeEdgeId(2));
        assert_eq!(r.new_whole_edge_pair(WholeEdgeId(1)), (WholeEdgeId(5), WholeEdgeId(6)));
        assert_eq!(r.new_face_whole_edge_base(FaceId(1)), WholeEdgeId(7));
        assert_eq!(r.new_whole_edge_pair(WholeEdgeId(2)), (WholeEdgeId(10), WholeEdgeId(11)));
        assert_eq!(r.new_face_whole_edge_base(FaceId(2)), WholeEdgeId(14));
    }

    #[test]
    fn halves_share_the_old_endpoints() {
        // d = 3f + 2 runs v2 -> v0; its halves sit in corner triangles 2 and 0
        assert_eq!(first_half(EdgeHandle::Directed(5)), EdgeHandle::Directed(18));
        assert_eq!(second_half(EdgeHandle::Directed(5)), EdgeHandle::Directed(14));
        assert_eq!(second_half(EdgeHandle::Directed(3)), EdgeHandle::Directed(17));
        assert_eq!(first_half(EdgeHandle::Boundary(4)), EdgeHandle::Boundary(8));
        assert_eq!(second_half(EdgeHandle::Boundary(4)), EdgeHandle::Boundary(9));
        assert_eq!(corner_interior_edge(FaceId(1), 2), 19);
        assert_eq!(inner_edge(FaceId(1), 2), 23);
    }
}
