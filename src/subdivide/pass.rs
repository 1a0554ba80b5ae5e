//! The four barrier-separated stages of one subdivision pass.
//!
//! Within a stage every unit writes rows no other unit of that stage writes;
//! the handle remap guarantees it. Across stages the driver waits for the
//! executor to drain before starting the next.

use std::ops::Range;
use std::sync::Arc;

use crate::subdivide::dest::DestView;
use crate::subdivide::kernels::{refine_edge, refine_vertex, split_sharpness};
use crate::subdivide::partition::{VertexUnit, WedgeUnit, WorkPartition};
use crate::subdivide::plan::SubdivisionPlan;
use crate::subdivide::remap::{HandleRemap, corner_interior_edge, first_half, inner_edge, new_faces, second_half};
use crate::topology::edge::EdgeProvider;
use crate::topology::face::FaceTable;
use crate::topology::handle::{EdgeHandle, FaceId, HoleId, PREV, VertexId, WholeEdgeId, canonical_pair};
use crate::topology::mesh::TriMesh;

/// Stage of a pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Refined vertex and edge-vertex rows.
    Vertices,
    /// Face materials and directed-edge origins.
    Faces,
    /// Split and interior whole edges with their back-references.
    WholeEdges,
    /// Boundary cycles and holes.
    Boundary,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Vertices, Stage::Faces, Stage::WholeEdges, Stage::Boundary];

    pub fn units(self, p: &WorkPartition) -> usize {
        match self {
            Stage::Vertices => p.vertex_units(),
            Stage::Faces => p.faces,
            Stage::WholeEdges => p.wedge_units(),
            Stage::Boundary => p.boundary_units(),
        }
    }
}

pub(crate) struct Pass {
    source: Arc<TriMesh>,
    plan: SubdivisionPlan,
    view: DestView,
}

impl Pass {
    pub(crate) fn new(source: Arc<TriMesh>, plan: SubdivisionPlan, view: DestView) -> Self {
        Pass { source, plan, view }
    }

    #[inline]
    fn remap(&self) -> &HandleRemap {
        &self.plan.remap
    }

    pub(crate) fn run(&self, stage: Stage, units: Range<usize>) {
        for u in units {
            match stage {
                Stage::Vertices => self.vertex_unit(u),
                Stage::Faces => self.face(FaceId(u as u32)),
                Stage::WholeEdges => self.wedge_unit(u),
                Stage::Boundary => self.boundary_unit(u),
            }
        }
    }

    fn vertex_unit(&self, u: usize) {
        match self.plan.partition.vertex_unit(u) {
            VertexUnit::Mixed(k) => {
                self.vertex(VertexId(k as u32));
                for j in 0..3 {
                    self.edge_vertex(WholeEdgeId((3 * k + j) as u32));
                }
            }
            VertexUnit::EdgeVertex(w) => self.edge_vertex(w),
            VertexUnit::Vertex(v) => self.vertex(v),
        }
    }

    fn vertex(&self, v: VertexId) {
        let src = &*self.source;
        let position = refine_vertex(&src.vertices, &src.edges, v);
        let out = src.vertices.out_edge(v).map(first_half);
        // SAFETY: new_vertex is injective and disjoint from new_edge_vertex.
        unsafe {
            self.view
                .set_vertex(self.remap().new_vertex(v), position, src.vertices.valence(v), out)
        }
    }

    fn edge_vertex(&self, w: WholeEdgeId) {
        let src = &*self.source;
        let (left, right) = src.edges.whole_edge(w);
        let position = refine_edge(&src.vertices, &src.edges, w);
        let valence = if right.is_boundary() { 4 } else { 6 };
        // SAFETY: new_edge_vertex is injective and disjoint from new_vertex.
        unsafe {
            self.view.set_vertex(
                self.remap().new_edge_vertex(w),
                position,
                valence,
                Some(second_half(left)),
            )
        }
    }

    fn face(&self, f: FaceId) {
        let src = &*self.source;
        let remap = self.remap();
        let sides = FaceTable::edges(f);
        let corner = sides.map(|e| remap.new_vertex(src.edges.origin(e)));
        let mid = sides.map(|e| remap.new_edge_vertex(src.edges.wedge(e).0));
        let material = src.faces.material(f);
        // SAFETY: faces 4f..4f+4 and directed edges 12f..12f+12 belong to f alone.
        unsafe {
            for nf in new_faces(f) {
                self.view.set_material(nf, material);
            }
            for i in 0..3u32 {
                let (here, prev) = (i as usize, PREV[i as usize] as usize);
                self.view.set_origin(EdgeHandle::Directed(12 * f.0 + 3 * i), corner[here]);
                self.view.set_origin(EdgeHandle::Directed(corner_interior_edge(f, i)), mid[here]);
                self.view.set_origin(EdgeHandle::Directed(12 * f.0 + 3 * i + 2), mid[prev]);
                self.view.set_origin(EdgeHandle::Directed(inner_edge(f, i)), mid[prev]);
            }
        }
    }

    fn wedge_unit(&self, u: usize) {
        match self.plan.partition.wedge_unit(u) {
            WedgeUnit::Mixed(k) => {
                for j in 0..3 {
                    self.split_whole_edge(WholeEdgeId((3 * k + j) as u32));
                }
                for t in 0..2 {
                    self.interior_whole_edges(FaceId((2 * k + t) as u32));
                }
            }
            WedgeUnit::Face(f) => self.interior_whole_edges(f),
            WedgeUnit::WholeEdge(w) => self.split_whole_edge(w),
        }
    }

    fn interior_whole_edges(&self, f: FaceId) {
        let base = self.remap().new_face_whole_edge_base(f);
        for m in 0..3 {
            // SAFETY: the three interior whole edges and their six edges belong to f alone.
            unsafe {
                self.view.set_whole_edge(
                    WholeEdgeId(base.0 + m),
                    EdgeHandle::Directed(corner_interior_edge(f, m)),
                    EdgeHandle::Directed(inner_edge(f, m)),
                    0.0,
                )
            }
        }
    }

    fn split_whole_edge(&self, w: WholeEdgeId) {
        let src = &*self.source;
        let (left, right) = src.edges.whole_edge(w);
        let sharpness = split_sharpness(src.edges.sharpness(w));
        let (lo, hi) = self.remap().new_whole_edge_pair(w);
        let (a, b) = canonical_pair(first_half(left), second_half(right));
        let (c, d) = canonical_pair(second_half(left), first_half(right));
        // SAFETY: the halves of w's two edges are produced by w alone.
        unsafe {
            self.view.set_whole_edge(lo, a, b, sharpness);
            self.view.set_whole_edge(hi, c, d, sharpness);
        }
    }

    fn boundary_unit(&self, u: usize) {
        let src = &*self.source;
        let remap = self.remap();
        let boundary = self.plan.partition.boundary_edges;
        if u < boundary {
            let b = u as u32;
            let e = EdgeHandle::Boundary(b);
            let hole = src.edges.hole(b);
            let prev = src.edges.boundary_prev(b);
            let next = src.edges.boundary_next(b);
            // SAFETY: boundary rows 2b and 2b + 1 belong to b alone.
            unsafe {
                self.view
                    .set_origin(first_half(e), remap.new_vertex(src.edges.origin(e)));
                self.view
                    .set_origin(second_half(e), remap.new_edge_vertex(src.edges.wedge(e).0));
                self.view.set_boundary_links(2 * b, 2 * prev + 1, 2 * b + 1, hole);
                self.view.set_boundary_links(2 * b + 1, 2 * b, 2 * next, hole);
            }
        } else {
            let h = HoleId((u - boundary) as u32);
            // SAFETY: one unit per hole.
            unsafe {
                self.view
                    .set_hole(h, 2 * src.holes.edge(h), 2 * src.holes.sides(h))
            }
        }
    }
}
