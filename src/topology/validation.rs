//! Structural sanity checks for [`TriMesh`].

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;
use crate::topology::edge::EdgeProvider;
use crate::topology::handle::{EdgeHandle, Side, VertexId, WholeEdgeId};
use crate::topology::mesh::TriMesh;

/// Optional validation toggles for mesh checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Every vertex ring closes and every ring edge starts at the vertex.
    pub check_rings: bool,
    /// Whole edges and their two edges reference each other.
    pub check_whole_edges: bool,
    /// Boundary `prev`/`next` links agree and the free list is consistent.
    pub check_boundary: bool,
    /// Hole cycles match their side counts (finalized meshes only).
    pub check_holes: bool,
}

impl ValidationOptions {
    /// Enable all checks.
    pub fn all() -> Self {
        Self {
            check_rings: true,
            check_whole_edges: true,
            check_boundary: true,
            check_holes: true,
        }
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self::all()
    }
}

fn violated(msg: String) -> MeshError {
    MeshError::InvariantViolated(msg)
}

/// Validate mesh connectivity and return the first inconsistency found.
pub fn validate_mesh(mesh: &TriMesh, options: ValidationOptions) -> Result<(), MeshError> {
    if options.check_whole_edges {
        check_whole_edges(mesh)?;
    }
    if options.check_boundary {
        check_boundary(mesh)?;
    }
    if options.check_rings {
        check_rings(mesh)?;
    }
    if options.check_holes && mesh.is_finalized() {
        check_holes(mesh)?;
    }
    Ok(())
}

/// Like [`validate_mesh`], but logs the failure and reports `false` instead.
pub fn sanity_check(mesh: &TriMesh) -> bool {
    match validate_mesh(mesh, ValidationOptions::all()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("mesh failed sanity check: {e}");
            false
        }
    }
}

fn check_whole_edges(mesh: &TriMesh) -> Result<(), MeshError> {
    let edges = mesh.edge_tables();
    let live = edges.directed_len() + edges.live_boundary_len();
    if live != 2 * edges.whole_len() {
        return Err(violated(format!(
            "{} live edges cannot pair into {} whole edges",
            live,
            edges.whole_len()
        )));
    }
    for w in 0..edges.whole_len() as u32 {
        let w = WholeEdgeId(w);
        let (left, right) = edges.whole_edge(w);
        if left.is_boundary() {
            return Err(violated(format!("whole edge {w}: boundary edge {left} on the left")));
        }
        for (e, side) in [(left, Side::Left), (right, Side::Right)] {
            edges.check_edge(e).map_err(|_| violated(format!("whole edge {w}: dangling {e}")))?;
            if edges.wedge(e) != (w, side) {
                return Err(violated(format!(
                    "whole edge {w}: {e} points back to {:?}",
                    edges.wedge(e)
                )));
            }
        }
        if edges.origin(left) != edges.dest(right) || edges.origin(right) != edges.dest(left) {
            return Err(violated(format!("whole edge {w}: {left} and {right} are not twins")));
        }
        if let (EdgeHandle::Directed(l), EdgeHandle::Directed(r)) = (left, right) {
            if l > r {
                return Err(violated(format!("whole edge {w}: {left} > {right}")));
            }
        }
    }
    Ok(())
}

fn check_boundary(mesh: &TriMesh) -> Result<(), MeshError> {
    let edges = mesh.edge_tables();
    for b in edges.boundary_iter() {
        let next = edges.boundary_next(b);
        let prev = edges.boundary_prev(b);
        if next as usize >= edges.boundary_len() || edges.is_free(next) {
            return Err(violated(format!("boundary b{b}: next b{next} is not live")));
        }
        if edges.boundary_prev(next) != b || edges.boundary_next(prev) != b {
            return Err(violated(format!("boundary b{b}: prev/next links disagree")));
        }
        let e = EdgeHandle::Boundary(b);
        if edges.origin(edges.pair(e)) != edges.dest(e) {
            return Err(violated(format!("boundary b{b}: next does not start at its twin's origin")));
        }
    }
    let mut free = 0usize;
    let mut cursor = edges.free_head();
    while let Some(b) = cursor {
        if free > edges.boundary_len() || !edges.is_free(b) {
            return Err(violated(format!("free list corrupted at b{b}")));
        }
        free += 1;
        let link = edges.boundary.columns().next.get(b as usize, 0);
        cursor = (link >= 0).then_some(link as u32);
    }
    if free != edges.free_boundary_len() {
        return Err(violated(format!(
            "free list holds {free} slots, expected {}",
            edges.free_boundary_len()
        )));
    }
    Ok(())
}

fn check_rings(mesh: &TriMesh) -> Result<(), MeshError> {
    let edges = mesh.edge_tables();
    let vertices = mesh.vertex_table();
    let limit = edges.directed_len() + edges.boundary_len();
    for v in 0..vertices.len() as u32 {
        let v = VertexId(v);
        let Some(start) = vertices.out_edge(v) else {
            continue;
        };
        if start.is_boundary() {
            return Err(violated(format!("vertex {v}: out edge {start} is a boundary edge")));
        }
        let mut steps = 0usize;
        for e in vertices.outgoing_ring(edges, v) {
            if edges.origin(e) != v {
                return Err(violated(format!("vertex {v}: ring edge {e} starts elsewhere")));
            }
            steps += 1;
            if steps > limit {
                return Err(violated(format!("vertex {v}: ring does not close")));
            }
        }
        if mesh.is_finalized() && steps != vertices.valence(v) as usize {
            return Err(violated(format!(
                "vertex {v}: ring has {steps} edges, valence says {}",
                vertices.valence(v)
            )));
        }
    }
    Ok(())
}

fn check_holes(mesh: &TriMesh) -> Result<(), MeshError> {
    let edges = mesh.edge_tables();
    let holes = mesh.hole_table();
    let mut covered = 0usize;
    for h in holes.iter() {
        let start = holes.edge(h);
        let mut sides = 0u32;
        let mut current = start;
        loop {
            if edges.hole(current) != Some(h) {
                return Err(violated(format!("hole {h}: b{current} belongs elsewhere")));
            }
            sides += 1;
            current = edges.boundary_next(current);
            if current == start || sides as usize > edges.boundary_len() {
                break;
            }
        }
        if sides != holes.sides(h) {
            return Err(violated(format!(
                "hole {h}: cycle has {sides} sides, table says {}",
                holes.sides(h)
            )));
        }
        covered += sides as usize;
    }
    if covered != edges.live_boundary_len() {
        let orphan = edges.boundary_iter().find(|&b| edges.hole(b).is_none());
        return Err(violated(format!(
            "{} boundary edges outside any hole (first: {orphan:?})",
            edges.live_boundary_len() - covered.min(edges.live_boundary_len())
        )));
    }
    Ok(())
}
