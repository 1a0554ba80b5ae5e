//! Triangle mesh over directed-edge tables.
//!
//! Faces are inserted one at a time. Each side of a new triangle either
//! fills a free boundary edge already present (the two become a whole edge),
//! or opens a new gap next to an existing boundary edge, or starts the ring
//! of an isolated vertex. Boundary edges of matched sides are merged first
//! and the remaining new boundary edges are spliced into vertex rings last;
//! splicing first would leave the merge with far more relinking to do.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::slab::{Column, PropertyId, RectDims, SlabConfig};
use crate::topology::edge::{BOUNDARY_SHARPNESS, EdgeProvider, EdgeTables};
use crate::topology::face::FaceTable;
use crate::topology::handle::{EdgeHandle, FaceId, HoleId, Side, VertexId, WholeEdgeId};
use crate::topology::hole::HoleTable;
use crate::topology::material::{CountingDepot, MaterialDepot, MaterialId};
use crate::topology::validation::{ValidationOptions, validate_mesh};
use crate::topology::vertex::{IncomingRing, OutgoingRing, VertexTable};

/// Result of probing a vertex ring for one side of a new triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// A free boundary edge with the same endpoints exists.
    Matched(u32),
    /// No match; splice after this boundary edge leaving the origin.
    Gap(u32),
    /// The origin has no edges yet.
    Isolated,
}

/// Error from [`TriMesh::insert_polygon`]: the fan stopped part-way.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("polygon fan stopped after {} of {total} triangles: {source}", .inserted.len())]
pub struct PolygonInsertError {
    /// Triangles inserted before the failure; they stay in the mesh.
    pub inserted: Vec<FaceId>,
    pub total: usize,
    pub source: MeshError,
}

/// Element counts used to pre-size a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshCounts {
    pub vertices: usize,
    pub faces: usize,
    pub whole_edges: usize,
    pub boundary_edges: usize,
    pub holes: usize,
}

/// Summary of table sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub vertices: usize,
    pub faces: usize,
    pub whole_edges: usize,
    pub boundary_edges: usize,
    pub holes: usize,
    pub free_boundary: usize,
}

impl fmt::Display for MeshStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vertices:       {}", self.vertices)?;
        writeln!(f, "faces:          {}", self.faces)?;
        writeln!(f, "whole edges:    {}", self.whole_edges)?;
        writeln!(f, "boundary edges: {} ({} free)", self.boundary_edges, self.free_boundary)?;
        write!(f, "holes:          {}", self.holes)
    }
}

/// Triangle-only directed-edge mesh.
#[derive(Debug)]
pub struct TriMesh {
    pub(crate) vertices: VertexTable,
    pub(crate) edges: EdgeTables,
    pub(crate) faces: FaceTable,
    pub(crate) holes: HoleTable,
    depot: Arc<dyn MaterialDepot>,
    config: SlabConfig,
    finalized: bool,
    /// Whether face materials have been counted with the depot.
    holds_refs: bool,
}

impl Default for TriMesh {
    fn default() -> Self {
        TriMesh::new(SlabConfig::default())
    }
}

impl TriMesh {
    /// Empty mesh with a private [`CountingDepot`].
    pub fn new(config: SlabConfig) -> Self {
        Self::with_depot(config, Arc::new(CountingDepot::default()))
    }

    pub fn with_depot(config: SlabConfig, depot: Arc<dyn MaterialDepot>) -> Self {
        TriMesh {
            vertices: VertexTable::new(config),
            edges: EdgeTables::new(config),
            faces: FaceTable::new(config),
            holes: HoleTable::new(config),
            depot,
            config,
            finalized: true,
            holds_refs: true,
        }
    }

    pub fn config(&self) -> &SlabConfig {
        &self.config
    }

    pub fn depot(&self) -> &Arc<dyn MaterialDepot> {
        &self.depot
    }

    /// Read-only edge connectivity, unchecked.
    pub fn edge_tables(&self) -> &EdgeTables {
        &self.edges
    }

    pub fn vertex_table(&self) -> &VertexTable {
        &self.vertices
    }

    pub fn face_table(&self) -> &FaceTable {
        &self.faces
    }

    pub fn hole_table(&self) -> &HoleTable {
        &self.holes
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn whole_edge_count(&self) -> usize {
        self.edges.whole_len()
    }

    /// Live boundary edges.
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.live_boundary_len()
    }

    /// Live holes.
    pub fn hole_count(&self) -> usize {
        self.holes.live_len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// `true` when no boundary or hole slot is on a free list.
    pub fn is_compacted(&self) -> bool {
        self.edges.free_boundary_len() == 0 && self.holes.free_len() == 0
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertices: self.vertex_count(),
            faces: self.face_count(),
            whole_edges: self.whole_edge_count(),
            boundary_edges: self.boundary_edge_count(),
            holes: self.hole_count(),
            free_boundary: self.edges.free_boundary_len(),
        }
    }

    // ----- vertices -----

    pub fn add_vertex(&mut self, position: [f32; 3]) -> Result<VertexId, MeshError> {
        self.vertices.alloc(position)
    }

    pub fn position(&self, v: VertexId) -> Result<[f32; 3], MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.position(v))
    }

    /// Move a vertex; the change is recorded in the position dirty range.
    pub fn set_position(&mut self, v: VertexId, p: [f32; 3]) -> Result<(), MeshError> {
        self.vertices.check(v)?;
        self.vertices.set_position(v, p);
        Ok(())
    }

    pub fn crease(&self, v: VertexId) -> Result<f32, MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.crease(v))
    }

    pub fn valence(&self, v: VertexId) -> Result<u32, MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.valence(v))
    }

    pub fn normal(&self, v: VertexId) -> Result<[f32; 3], MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.normal(v))
    }

    pub fn out_edge(&self, v: VertexId) -> Result<Option<EdgeHandle>, MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.out_edge(v))
    }

    pub fn outgoing_ring(&self, v: VertexId) -> Result<OutgoingRing<'_, EdgeTables>, MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.outgoing_ring(&self.edges, v))
    }

    pub fn incoming_ring(&self, v: VertexId) -> Result<IncomingRing<'_, EdgeTables>, MeshError> {
        self.vertices.check(v)?;
        Ok(self.vertices.incoming_ring(&self.edges, v))
    }

    /// Attach a per-vertex column, e.g. RGBA colors.
    pub fn add_vertex_property<T: bytemuck::Pod + Send + Sync>(
        &mut self,
        name: &'static str,
        stride: usize,
        fill: T,
    ) -> Result<PropertyId<T>, MeshError> {
        self.vertices.slab.add_property(name, stride, fill)
    }

    pub fn vertex_property<T: bytemuck::Pod + Send + Sync>(&self, id: PropertyId<T>) -> Option<&Column<T>> {
        self.vertices.slab.props().get(id)
    }

    pub fn vertex_property_mut<T: bytemuck::Pod + Send + Sync>(
        &mut self,
        id: PropertyId<T>,
    ) -> Option<&mut Column<T>> {
        self.vertices.slab.props_mut().get_mut(id)
    }

    /// Attach a per-directed-edge column, e.g. a UV layer.
    pub fn add_edge_property<T: bytemuck::Pod + Send + Sync>(
        &mut self,
        name: &'static str,
        stride: usize,
        fill: T,
    ) -> Result<PropertyId<T>, MeshError> {
        self.edges.directed.add_property(name, stride, fill)
    }

    pub fn edge_property<T: bytemuck::Pod + Send + Sync>(&self, id: PropertyId<T>) -> Option<&Column<T>> {
        self.edges.directed.props().get(id)
    }

    pub fn edge_property_mut<T: bytemuck::Pod + Send + Sync>(
        &mut self,
        id: PropertyId<T>,
    ) -> Option<&mut Column<T>> {
        self.edges.directed.props_mut().get_mut(id)
    }

    /// RGBA vertex colors, initially opaque white.
    pub fn add_vertex_colors(&mut self, name: &'static str) -> Result<PropertyId<f32>, MeshError> {
        self.add_vertex_property(name, 4, 1.0)
    }

    /// A `u, v` pair per directed edge, i.e. per face corner.
    pub fn add_uv_layer(&mut self, name: &'static str) -> Result<PropertyId<f32>, MeshError> {
        self.add_edge_property(name, 2, 0.0)
    }

    /// Element range of the position column changed since the last reset.
    pub fn positions_dirty_range(&self) -> Option<std::ops::RangeInclusive<usize>> {
        self.vertices.slab.columns().position.dirty_range()
    }

    /// Mark every tracked column as consumed.
    pub fn reset_dirty_ranges(&mut self) {
        let cols = self.vertices.slab.columns_mut();
        cols.position.reset_dirty_range();
        cols.normal.reset_dirty_range();
        self.faces.slab.columns_mut().material.reset_dirty_range();
    }

    /// Rect layout of the vertex position buffer.
    pub fn position_rect(&self) -> Result<RectDims, MeshError> {
        self.vertices.slab.rect_dims(4)
    }

    // ----- edges -----

    pub fn origin(&self, e: EdgeHandle) -> Result<VertexId, MeshError> {
        self.edges.check_edge(e)?;
        Ok(self.edges.origin(e))
    }

    pub fn dest(&self, e: EdgeHandle) -> Result<VertexId, MeshError> {
        self.edges.check_edge(e)?;
        Ok(self.edges.dest(e))
    }

    pub fn next(&self, e: EdgeHandle) -> Result<EdgeHandle, MeshError> {
        self.edges.check_edge(e)?;
        Ok(self.edges.next(e))
    }

    pub fn prev(&self, e: EdgeHandle) -> Result<EdgeHandle, MeshError> {
        self.edges.check_edge(e)?;
        Ok(self.edges.prev(e))
    }

    pub fn pair(&self, e: EdgeHandle) -> Result<EdgeHandle, MeshError> {
        self.edges.check_edge(e)?;
        Ok(self.edges.pair(e))
    }

    /// Whole edge `e` belongs to.
    pub fn whole_edge_of(&self, e: EdgeHandle) -> Result<WholeEdgeId, MeshError> {
        self.edges.check_edge(e)?;
        Ok(self.edges.wedge(e).0)
    }

    /// `(left, right)` edges of a whole edge.
    pub fn whole_edge(&self, w: WholeEdgeId) -> Result<(EdgeHandle, EdgeHandle), MeshError> {
        self.edges.check_whole_edge(w)?;
        Ok(self.edges.whole_edge(w))
    }

    pub fn sharpness(&self, w: WholeEdgeId) -> Result<f32, MeshError> {
        self.edges.check_whole_edge(w)?;
        Ok(self.edges.sharpness(w))
    }

    /// Set the crease weight of an interior whole edge.
    ///
    /// Boundary whole edges keep their infinite sharpness. Vertex creases are
    /// re-derived by the next [`finalize_boundaries`](Self::finalize_boundaries).
    pub fn set_sharpness(&mut self, w: WholeEdgeId, sharpness: f32) -> Result<(), MeshError> {
        self.edges.check_whole_edge(w)?;
        let (_, right) = self.edges.whole_edge(w);
        if right.is_boundary() {
            log::warn!("whole edge {w} is on a boundary; sharpness left infinite");
            return Ok(());
        }
        self.edges.set_sharpness(w, sharpness.max(0.0));
        self.finalized = false;
        Ok(())
    }

    /// Directed edge `origin -> dest`, real or boundary.
    pub fn find_half_edge(&self, origin: VertexId, dest: VertexId) -> Result<Option<EdgeHandle>, MeshError> {
        self.vertices.check(origin)?;
        self.vertices.check(dest)?;
        Ok(self
            .vertices
            .outgoing_ring(&self.edges, origin)
            .find(|&e| self.edges.dest(e) == dest))
    }

    // ----- faces and holes -----

    pub fn face_material(&self, f: FaceId) -> Result<MaterialId, MeshError> {
        self.faces.check(f)?;
        Ok(self.faces.material(f))
    }

    /// Reassign a face's material, moving one reference between materials.
    pub fn set_face_material(&mut self, f: FaceId, material: MaterialId) -> Result<(), MeshError> {
        self.faces.check(f)?;
        let old = self.faces.material(f);
        if old != material {
            self.faces.set_material(f, material);
            self.depot.release_ref(old, 1);
            self.depot.add_ref(material, 1);
        }
        Ok(())
    }

    pub fn face_vertices(&self, f: FaceId) -> Result<[VertexId; 3], MeshError> {
        self.faces.check(f)?;
        Ok(FaceTable::edges(f).map(|e| self.edges.origin(e)))
    }

    pub fn holes(&self) -> impl Iterator<Item = HoleId> + '_ {
        self.holes.iter()
    }

    /// Representative boundary edge of a hole.
    pub fn hole_edge(&self, h: HoleId) -> Result<EdgeHandle, MeshError> {
        self.holes.check(h)?;
        Ok(EdgeHandle::Boundary(self.holes.edge(h)))
    }

    pub fn hole_sides(&self, h: HoleId) -> Result<u32, MeshError> {
        self.holes.check(h)?;
        Ok(self.holes.sides(h))
    }

    pub fn hole_of(&self, e: EdgeHandle) -> Result<Option<HoleId>, MeshError> {
        self.edges.check_edge(e)?;
        Ok(e.boundary().and_then(|b| self.edges.hole(b)))
    }

    // ----- construction -----

    /// Insert triangle `(v0, v1, v2)`, counter-clockwise.
    ///
    /// Rejecting a face is an expected outcome while importing: a side that
    /// already belongs to another face fails with
    /// [`MeshError::NonManifoldEdge`] and leaves the mesh as it was.
    pub fn insert_triangle(
        &mut self,
        corners: [VertexId; 3],
        material: Option<MaterialId>,
    ) -> Result<FaceId, MeshError> {
        for v in corners {
            self.vertices.check(v)?;
        }
        let [v0, v1, v2] = corners;
        if v0 == v1 || v1 == v2 || v2 == v0 {
            log::warn!("rejecting degenerate triangle ({v0}, {v1}, {v2})");
            return Err(MeshError::DegenerateTriangle {
                v0: v0.0,
                v1: v1.0,
                v2: v2.0,
            });
        }

        let mut probes = [Probe::Isolated; 3];
        for i in 0..3 {
            probes[i] = self.find_free_edge(corners[i], corners[(i + 1) % 3]).inspect_err(|e| {
                log::warn!("rejecting triangle ({v0}, {v1}, {v2}): {e}");
            })?;
        }

        // Reserve first so a capacity failure cannot leave a half-built face.
        self.faces.slab.reserve(self.faces.len() + 1)?;
        self.edges.directed.reserve(self.edges.directed_len() + 3)?;
        self.edges.boundary.reserve(self.edges.boundary_len() + 3)?;
        self.edges.whole.reserve(self.edges.whole_len() + 3)?;

        for i in 0..3 {
            if let (Probe::Matched(inn), Probe::Matched(out)) = (probes[i], probes[(i + 1) % 3]) {
                self.make_adjacent(inn, out)?;
            }
        }

        let material = material.unwrap_or_else(|| self.depot.default_material());
        let face = self.faces.alloc(material)?;
        self.depot.add_ref(material, 1);
        let first = self.edges.alloc_triangle(corners)?;
        let mut twins = [0u32; 3];
        for i in 0..3 {
            twins[i] = self.edges.alloc_boundary(corners[(i + 1) % 3])?;
        }
        // The twins run against the triangle: twin i ends where side i starts.
        self.edges.link_next(twins[0], twins[2]);
        self.edges.link_next(twins[2], twins[1]);
        self.edges.link_next(twins[1], twins[0]);

        let mut handled = [false; 3];
        for i in 0..3 {
            let side = EdgeHandle::Directed(first + i as u32);
            let b = twins[i];
            match probes[i] {
                Probe::Matched(a) => {
                    handled[i] = true;
                    handled[(i + 1) % 3] = true;
                    let c = self.edges.boundary_next(a);
                    if c != b {
                        let d = self.edges.boundary_prev(b);
                        self.edges.link_next(a, b);
                        self.edges.link_next(d, c);
                    }
                    let c = self.edges.boundary_prev(a);
                    if c != b {
                        let d = self.edges.boundary_next(b);
                        self.edges.link_next(b, a);
                        self.edges.link_next(c, d);
                    }
                    let real = self.edges.pair(EdgeHandle::Boundary(a));
                    let (w, _) = self.edges.wedge(EdgeHandle::Boundary(a));
                    self.edges.free_boundary(a);
                    self.edges.free_boundary(b);
                    self.edges.set_whole_edge(w, side, real);
                    if self.edges.sharpness(w) < 0.0 {
                        self.edges.set_sharpness(w, 0.0);
                    }
                }
                Probe::Gap(_) | Probe::Isolated => {
                    self.edges.alloc_whole_edge(side, EdgeHandle::Boundary(b), 0.0)?;
                }
            }
        }

        for i in 0..3 {
            if handled[i] {
                continue;
            }
            match probes[i] {
                Probe::Isolated => {
                    self.vertices
                        .set_out_edge(corners[i], EdgeHandle::Directed(first + i as u32));
                }
                Probe::Gap(a) => {
                    let b = twins[i];
                    let c = self.edges.boundary_prev(a);
                    let d = self.edges.boundary_next(b);
                    self.edges.link_next(b, a);
                    self.edges.link_next(c, d);
                }
                Probe::Matched(_) => {}
            }
        }

        self.finalized = false;
        Ok(face)
    }

    /// Insert a convex polygon as a fan around its first corner.
    ///
    /// Triangles inserted before a rejection stay in the mesh and are listed
    /// in the error.
    pub fn insert_polygon(
        &mut self,
        corners: &[VertexId],
        material: Option<MaterialId>,
    ) -> Result<Vec<FaceId>, PolygonInsertError> {
        let total = corners.len().saturating_sub(2);
        if corners.len() < 3 {
            return Err(PolygonInsertError {
                inserted: Vec::new(),
                total,
                source: MeshError::PolygonTooSmall {
                    sides: corners.len(),
                },
            });
        }
        let mut inserted = Vec::with_capacity(total);
        for pair in corners[1..].windows(2) {
            match self.insert_triangle([corners[0], pair[0], pair[1]], material) {
                Ok(f) => inserted.push(f),
                Err(source) => {
                    return Err(PolygonInsertError {
                        inserted,
                        total,
                        source,
                    });
                }
            }
        }
        Ok(inserted)
    }

    /// Look for side `v0 -> v1` in the ring of `v0`.
    fn find_free_edge(&self, v0: VertexId, v1: VertexId) -> Result<Probe, MeshError> {
        let Some(_) = self.vertices.out_edge(v0) else {
            return Ok(Probe::Isolated);
        };
        let mut gap = None;
        for e in self.vertices.outgoing_ring(&self.edges, v0) {
            if self.edges.dest(e) == v1 {
                return match e {
                    EdgeHandle::Boundary(b) => Ok(Probe::Matched(b)),
                    EdgeHandle::Directed(_) => Err(MeshError::NonManifoldEdge {
                        origin: v0.0,
                        dest: v1.0,
                    }),
                };
            }
            if let EdgeHandle::Boundary(b) = e {
                gap = Some(b);
            }
        }
        gap.map(Probe::Gap)
            .ok_or(MeshError::NonManifoldVertex { vertex: v0.0 })
    }

    /// Relink boundary lists so that `next(inn) == out`.
    fn make_adjacent(&mut self, inn: u32, out: u32) -> Result<(), MeshError> {
        if self.edges.boundary_next(inn) == out {
            return Ok(());
        }
        let b = self.edges.boundary_next(inn);
        let d = self.edges.boundary_prev(out);
        let Some(g) = self.find_free_in_edge(out, inn) else {
            let err = MeshError::AdjacencyBroken {
                incoming: EdgeHandle::Boundary(inn).encode(),
                outgoing: EdgeHandle::Boundary(out).encode(),
            };
            log::error!("{err}");
            return Err(err);
        };
        if g == d {
            self.edges.link_next(inn, out);
            self.edges.link_next(d, b);
        } else {
            let h = self.edges.boundary_next(g);
            self.edges.link_next(inn, out);
            self.edges.link_next(g, b);
            self.edges.link_next(d, h);
        }
        Ok(())
    }

    /// Incoming boundary edge at the shared vertex, after `out` and before `inn`.
    fn find_free_in_edge(&self, out: u32, inn: u32) -> Option<u32> {
        let start = self.edges.pair(EdgeHandle::Boundary(out));
        let before = EdgeHandle::Boundary(inn);
        let limit = self.edges.directed_len() + self.edges.boundary_len();
        let mut current = start;
        for _ in 0..limit {
            if current == before {
                break;
            }
            if let EdgeHandle::Boundary(g) = current {
                return Some(g);
            }
            current = self.edges.pair(self.edges.next(current));
        }
        None
    }

    /// Assign every boundary cycle to a hole, mark boundary whole edges as
    /// infinitely sharp, then recompute valence, crease and normals.
    ///
    /// Every vertex touching a boundary ends up a corner.
    pub fn finalize_boundaries(&mut self) -> Result<(), MeshError> {
        let live: Vec<HoleId> = self.holes.iter().collect();
        for h in live {
            self.holes.free(h);
        }
        let boundary: Vec<u32> = self.edges.boundary_iter().collect();
        for &b in &boundary {
            self.edges.set_hole(b, None);
        }
        let limit = boundary.len();
        for &start in &boundary {
            if self.edges.hole(start).is_some() {
                continue;
            }
            let hole = self.holes.alloc(start)?;
            let mut sides = 0u32;
            let mut current = start;
            loop {
                let (w, _) = self.edges.wedge(EdgeHandle::Boundary(current));
                self.edges.set_sharpness(w, BOUNDARY_SHARPNESS);
                self.edges.set_hole(current, Some(hole));
                sides += 1;
                current = self.edges.boundary_next(current);
                if current == start {
                    break;
                }
                if sides as usize > limit {
                    return Err(MeshError::InvariantViolated(format!(
                        "boundary cycle from b{start} does not close"
                    )));
                }
            }
            self.holes.set_sides(hole, sides);
        }
        self.vertices.compute_valence_and_crease(&self.edges);
        self.vertices.compute_loop_normal(&self.edges);
        self.finalized = true;
        log::debug!(
            "finalized mesh: {} boundary edges in {} holes",
            boundary.len(),
            self.holes.live_len()
        );
        self.debug_assert_invariants();
        Ok(())
    }

    /// Recompute every vertex normal from the current positions.
    pub fn compute_normals(&mut self) {
        self.vertices.compute_loop_normal(&self.edges);
    }

    /// Size every table for `counts` live rows, with no geometric slack.
    pub(crate) fn presize(&mut self, counts: MeshCounts) -> Result<(), MeshError> {
        self.vertices.slab.presize(counts.vertices)?;
        self.faces.slab.presize(counts.faces)?;
        self.edges.directed.presize(counts.faces * 3)?;
        self.edges.whole.presize(counts.whole_edges)?;
        self.edges.boundary.presize(counts.boundary_edges)?;
        self.holes.slab.presize(counts.holes)?;
        Ok(())
    }

    pub(crate) fn set_finalized(&mut self, finalized: bool) {
        self.finalized = finalized;
    }

    /// Take ownership of one material reference per face.
    pub(crate) fn acquire_material_refs(&mut self) {
        if self.holds_refs {
            return;
        }
        for (material, count) in self.material_tally() {
            self.depot.add_ref(material, count);
        }
        self.holds_refs = true;
    }

    /// Destination meshes start without references until their faces are written.
    pub(crate) fn without_material_refs(mut self) -> Self {
        self.holds_refs = false;
        self
    }

    /// Reference count per material over all faces.
    pub(crate) fn material_tally(&self) -> hashbrown::HashMap<MaterialId, u32> {
        let mut tally = hashbrown::HashMap::new();
        for f in 0..self.faces.len() {
            *tally.entry(self.faces.material(FaceId(f as u32))).or_insert(0) += 1;
        }
        tally
    }

    /// Directed edge on `side` of whole edge `w`.
    pub(crate) fn wedge_side(&self, w: WholeEdgeId, side: Side) -> EdgeHandle {
        let (l, r) = self.edges.whole_edge(w);
        match side {
            Side::Left => l,
            Side::Right => r,
        }
    }
}

impl DebugInvariants for TriMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "TriMesh");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        validate_mesh(self, ValidationOptions::all())
    }
}

impl Drop for TriMesh {
    fn drop(&mut self) {
        if !self.holds_refs {
            return;
        }
        for (material, count) in self.material_tally() {
            self.depot.release_ref(material, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_with_vertices(n: usize) -> TriMesh {
        let mut m = TriMesh::default();
        for i in 0..n {
            m.add_vertex([i as f32, (i * i) as f32, 0.0]).unwrap();
        }
        m
    }

    fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    #[test]
    fn degenerate_triangle_rejected() {
        let mut m = mesh_with_vertices(3);
        let err = m.insert_triangle([v(0), v(1), v(0)], None).unwrap_err();
        assert!(matches!(err, MeshError::DegenerateTriangle { .. }));
        assert_eq!(m.face_count(), 0);
    }

    #[test]
    fn unknown_vertex_is_invalid_handle() {
        let mut m = mesh_with_vertices(2);
        let err = m.insert_triangle([v(0), v(1), v(5)], None).unwrap_err();
        assert_eq!(
            err,
            MeshError::InvalidHandle {
                kind: "vertex",
                index: 5,
                len: 2
            }
        );
    }

    #[test]
    fn closed_fan_rejects_pinching_face() {
        // closed tetrahedron: every vertex fan is complete
        let mut m = mesh_with_vertices(5);
        for t in [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]] {
            m.insert_triangle(t.map(v), None).unwrap();
        }
        assert_eq!(m.boundary_edge_count(), 0);
        let err = m.insert_triangle([v(0), v(4), v(1)], None).unwrap_err();
        assert_eq!(err, MeshError::NonManifoldVertex { vertex: 0 });
        assert_eq!(m.face_count(), 4);
    }

    #[test]
    fn fan_reports_partial_insertion() {
        let mut m = mesh_with_vertices(5);
        m.insert_triangle([v(0), v(2), v(3)], None).unwrap();
        let err = m
            .insert_polygon(&[v(0), v(1), v(2), v(3), v(4)], None)
            .unwrap_err();
        assert_eq!(err.inserted.len(), 1);
        assert_eq!(err.total, 3);
        assert_eq!(err.source, MeshError::NonManifoldEdge { origin: 0, dest: 2 });
    }

    #[test]
    fn material_refs_follow_faces() {
        let depot = Arc::new(CountingDepot::new(MaterialId(0)));
        {
            let mut m = TriMesh::with_depot(SlabConfig::default(), depot.clone());
            for i in 0..4 {
                m.add_vertex([i as f32, 0.0, (i % 2) as f32]).unwrap();
            }
            let f = m.insert_triangle([v(0), v(1), v(2)], None).unwrap();
            m.insert_triangle([v(2), v(1), v(3)], Some(MaterialId(7))).unwrap();
            assert_eq!(depot.ref_count(MaterialId(0)), 1);
            m.set_face_material(f, MaterialId(7)).unwrap();
            assert_eq!(depot.ref_count(MaterialId(0)), 0);
            assert_eq!(depot.ref_count(MaterialId(7)), 2);
        }
        assert_eq!(depot.ref_count(MaterialId(7)), 0);
    }

    #[test]
    fn stats_display() {
        let mut m = mesh_with_vertices(3);
        m.insert_triangle([v(0), v(1), v(2)], None).unwrap();
        m.finalize_boundaries().unwrap();
        let text = m.stats().to_string();
        assert!(text.contains("faces:          1"));
        assert!(text.contains("boundary edges: 3 (0 free)"));
    }
}
