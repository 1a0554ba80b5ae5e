//! Work partitioning for a subdivision pass.
//!
//! Vertex work is grouped into mixed blocks of one old vertex and three old
//! whole edges, whose four new vertices land in four consecutive rows.
//! Whole-edge work is grouped into blocks of three old whole edges and two old
//! faces, whose twelve new whole edges are consecutive. Whatever does not fill
//! a block is handled one element per unit afterwards.

use serde::{Deserialize, Serialize};

use crate::topology::handle::{FaceId, VertexId, WholeEdgeId};
use crate::topology::mesh::MeshCounts;

/// Sizes of the mixed-block prefixes for one source mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPartition {
    pub vertices: usize,
    pub faces: usize,
    pub whole_edges: usize,
    pub boundary_edges: usize,
    pub holes: usize,
    /// Mixed vertex blocks: `(1 vertex + 3 whole edges)`.
    pub v_mix: usize,
    /// Mixed whole-edge blocks: `(3 whole edges + 2 faces)`.
    pub w_mix: usize,
}

/// One unit of vertex-stage work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexUnit {
    /// Vertex `k` and whole edges `3k .. 3k + 3`.
    Mixed(usize),
    EdgeVertex(WholeEdgeId),
    Vertex(VertexId),
}

/// One unit of whole-edge-stage work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WedgeUnit {
    /// Whole edges `3k .. 3k + 3` and faces `2k`, `2k + 1`.
    Mixed(usize),
    Face(FaceId),
    WholeEdge(WholeEdgeId),
}

impl WorkPartition {
    /// Largest mixed prefixes the counts allow.
    pub fn compute(counts: &MeshCounts) -> Self {
        Self::with_mix(counts, usize::MAX, usize::MAX)
    }

    /// Partition with at most `v_mix` / `w_mix` mixed blocks.
    ///
    /// Any prefix length is valid; the new handles do depend on it, so the
    /// same partition must be used for every stage of one pass.
    pub fn with_mix(counts: &MeshCounts, v_mix: usize, w_mix: usize) -> Self {
        let w3 = counts.whole_edges / 3;
        WorkPartition {
            vertices: counts.vertices,
            faces: counts.faces,
            whole_edges: counts.whole_edges,
            boundary_edges: counts.boundary_edges,
            holes: counts.holes,
            v_mix: v_mix.min(counts.vertices).min(w3),
            w_mix: w_mix.min(counts.faces / 2).min(w3),
        }
    }

    /// Counts of the subdivided mesh.
    pub fn new_counts(&self) -> MeshCounts {
        MeshCounts {
            vertices: self.vertices + self.whole_edges,
            faces: 4 * self.faces,
            whole_edges: 2 * self.whole_edges + 3 * self.faces,
            boundary_edges: 2 * self.boundary_edges,
            holes: self.holes,
        }
    }

    pub fn vertex_units(&self) -> usize {
        self.v_mix + (self.whole_edges - 3 * self.v_mix) + (self.vertices - self.v_mix)
    }

    pub fn vertex_unit(&self, u: usize) -> VertexUnit {
        let edges_left = self.whole_edges - 3 * self.v_mix;
        if u < self.v_mix {
            VertexUnit::Mixed(u)
        } else if u < self.v_mix + edges_left {
            VertexUnit::EdgeVertex(WholeEdgeId((3 * self.v_mix + (u - self.v_mix)) as u32))
        } else {
            VertexUnit::Vertex(VertexId((u - edges_left) as u32))
        }
    }

    pub fn wedge_units(&self) -> usize {
        self.w_mix + (self.faces - 2 * self.w_mix) + (self.whole_edges - 3 * self.w_mix)
    }

    pub fn wedge_unit(&self, u: usize) -> WedgeUnit {
        let faces_left = self.faces - 2 * self.w_mix;
        if u < self.w_mix {
            WedgeUnit::Mixed(u)
        } else if u < self.w_mix + faces_left {
            WedgeUnit::Face(FaceId((2 * self.w_mix + (u - self.w_mix)) as u32))
        } else {
            let w = 3 * self.w_mix + (u - self.w_mix - faces_left);
            WedgeUnit::WholeEdge(WholeEdgeId(w as u32))
        }
    }

    /// Boundary-stage units: one per boundary edge, then one per hole.
    pub fn boundary_units(&self) -> usize {
        self.boundary_edges + self.holes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(vertices: usize, faces: usize, whole_edges: usize) -> MeshCounts {
        MeshCounts {
            vertices,
            faces,
            whole_edges,
            ..MeshCounts::default()
        }
    }

    #[test]
    fn prefixes_are_clamped() {
        // single triangle: 3 vertices, 3 whole edges, 1 face
        let p = WorkPartition::compute(&counts(3, 1, 3));
        assert_eq!((p.v_mix, p.w_mix), (1, 0));
        assert_eq!(p.vertex_units(), 1 + 0 + 2);
        assert_eq!(p.vertex_unit(0), VertexUnit::Mixed(0));
        assert_eq!(p.vertex_unit(1), VertexUnit::Vertex(VertexId(1)));
        assert_eq!(p.wedge_unit(0), WedgeUnit::Face(FaceId(0)));
        assert_eq!(p.wedge_unit(1), WedgeUnit::WholeEdge(WholeEdgeId(0)));
    }

    #[test]
    fn octahedron_counts() {
        let p = WorkPartition::compute(&counts(6, 8, 12));
        assert_eq!((p.v_mix, p.w_mix), (4, 4));
        let n = p.new_counts();
        assert_eq!((n.vertices, n.faces, n.whole_edges), (18, 32, 48));
        assert_eq!(p.wedge_units(), 4);
    }
}
