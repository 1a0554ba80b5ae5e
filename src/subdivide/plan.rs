//! Planning a pass: precondition checks, partition and destination sizing.
//!
//! Everything that can fail happens here, on the driving thread, before any
//! unit of work runs.

use crate::mesh_error::MeshError;
use crate::subdivide::partition::WorkPartition;
use crate::subdivide::remap::HandleRemap;
use crate::topology::mesh::{MeshCounts, TriMesh};

/// A checked, sized subdivision pass over one source mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubdivisionPlan {
    pub partition: WorkPartition,
    pub remap: HandleRemap,
}

impl SubdivisionPlan {
    /// Plan with the largest mixed-block prefixes.
    pub fn new(source: &TriMesh) -> Result<Self, MeshError> {
        Self::with_mix(source, usize::MAX, usize::MAX)
    }

    /// Plan with at most `v_mix` / `w_mix` mixed blocks.
    pub fn with_mix(source: &TriMesh, v_mix: usize, w_mix: usize) -> Result<Self, MeshError> {
        if !source.is_finalized() {
            return Err(MeshError::NotFinalized);
        }
        if !source.is_compacted() {
            return Err(MeshError::NotCompacted {
                free_boundary: source.edge_tables().free_boundary_len(),
                free_holes: source.hole_table().free_len(),
            });
        }
        let counts = MeshCounts {
            vertices: source.vertex_count(),
            faces: source.face_count(),
            whole_edges: source.whole_edge_count(),
            boundary_edges: source.boundary_edge_count(),
            holes: source.hole_count(),
        };
        let partition = WorkPartition::with_mix(&counts, v_mix, w_mix);
        log::debug!(
            "subdivision plan: {} vertex units ({} mixed), {} whole-edge units ({} mixed)",
            partition.vertex_units(),
            partition.v_mix,
            partition.wedge_units(),
            partition.w_mix
        );
        Ok(SubdivisionPlan {
            partition,
            remap: HandleRemap::new(partition),
        })
    }

    pub fn new_counts(&self) -> MeshCounts {
        self.partition.new_counts()
    }

    /// Empty destination sharing the source's configuration and material
    /// depot, with every table sized exactly for the result.
    pub fn allocate_destination(&self, source: &TriMesh) -> Result<TriMesh, MeshError> {
        let mut dest = TriMesh::with_depot(*source.config(), source.depot().clone()).without_material_refs();
        dest.presize(self.new_counts())?;
        Ok(dest)
    }
}
