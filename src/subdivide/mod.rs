//! Loop subdivision.
//!
//! A pass reads a finalized, compacted source mesh and fills a destination
//! that was sized exactly before any work started. Each old handle maps to
//! its new handles by arithmetic alone (see [`remap`]), so the four stages can
//! be split into blocks and run by any [`Executor`].

pub(crate) mod dest;
pub mod kernels;
pub mod partition;
pub(crate) mod pass;
pub mod plan;
pub mod remap;

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::parallel::Executor;
use crate::topology::mesh::TriMesh;

pub use partition::{VertexUnit, WedgeUnit, WorkPartition};
pub use pass::Stage;
pub use plan::SubdivisionPlan;
pub use remap::HandleRemap;

use dest::DestView;
use pass::Pass;

/// Subdivision settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdivideOptions {
    /// Passes run by [`subdivide_levels`].
    pub levels: u32,
    /// Units per claimed block.
    pub block_size: usize,
    /// Recompute vertex normals on the final mesh.
    pub compute_normals: bool,
}

impl Default for SubdivideOptions {
    fn default() -> Self {
        SubdivideOptions {
            levels: 1,
            block_size: 256,
            compute_normals: true,
        }
    }
}

/// One Loop pass over `source`.
///
/// Fails before any work starts if `source` is not finalized
/// ([`MeshError::NotFinalized`]) or still has free boundary/hole slots
/// ([`MeshError::NotCompacted`]). The source is never modified; on any
/// error the partially written destination is discarded.
pub fn subdivide(
    source: &Arc<TriMesh>,
    executor: &dyn Executor,
    options: &SubdivideOptions,
) -> Result<TriMesh, MeshError> {
    let plan = SubdivisionPlan::new(source)?;
    subdivide_with_plan(source, &plan, executor, options)
}

/// One Loop pass with a caller-chosen partition.
///
/// `plan` must have been made for `source`; the result depends on the
/// partition only through its handle numbering.
pub fn subdivide_with_plan(
    source: &Arc<TriMesh>,
    plan: &SubdivisionPlan,
    executor: &dyn Executor,
    options: &SubdivideOptions,
) -> Result<TriMesh, MeshError> {
    let fresh = SubdivisionPlan::with_mix(source, plan.partition.v_mix, plan.partition.w_mix)?;
    if fresh != *plan {
        return Err(MeshError::InvariantViolated(
            "subdivision plan was made for a different mesh".into(),
        ));
    }

    let mut dest = plan.allocate_destination(source)?;
    let pass = Arc::new(Pass::new(source.clone(), *plan, DestView::new(&mut dest)));
    for stage in Stage::ALL {
        let units = stage.units(&plan.partition);
        let started = Instant::now();
        let p = pass.clone();
        executor.for_each_block(0..units, options.block_size, Arc::new(move |r: Range<usize>| p.run(stage, r)))?;
        log::trace!("stage {stage:?}: {units} units in {:?}", started.elapsed());
    }
    drop(pass);

    dest.vertices.slab.columns_mut().position.mark_all_dirty();
    dest.faces.slab.columns_mut().material.mark_all_dirty();
    if options.compute_normals {
        dest.compute_normals();
    }
    dest.set_finalized(true);
    dest.acquire_material_refs();
    log::debug!(
        "subdivided {} -> {} faces, {} -> {} vertices",
        source.face_count(),
        dest.face_count(),
        source.vertex_count(),
        dest.vertex_count()
    );
    dest.debug_assert_invariants();
    Ok(dest)
}

/// Compact `mesh` if needed and run `options.levels` passes, each result
/// becoming the next source. Normals are computed on the final level only.
pub fn subdivide_levels(
    mut mesh: TriMesh,
    executor: &dyn Executor,
    options: &SubdivideOptions,
) -> Result<TriMesh, MeshError> {
    if !mesh.is_finalized() {
        return Err(MeshError::NotFinalized);
    }
    if !mesh.is_compacted() {
        mesh.compact()?;
    }
    let mut current = Arc::new(mesh);
    for level in 0..options.levels {
        let level_options = SubdivideOptions {
            compute_normals: options.compute_normals && level + 1 == options.levels,
            ..*options
        };
        current = Arc::new(subdivide(&current, executor, &level_options)?);
    }
    Arc::try_unwrap(current)
        .map_err(|_| MeshError::InvariantViolated("subdivided mesh is still shared".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::Serial;
    use crate::topology::handle::VertexId;

    fn cap() -> TriMesh {
        let mut m = TriMesh::default();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            m.add_vertex(p).unwrap();
        }
        m.insert_triangle([VertexId(0), VertexId(1), VertexId(2)], None).unwrap();
        m.finalize_boundaries().unwrap();
        m
    }

    #[test]
    fn unfinalized_source_is_rejected() {
        let mut m = cap();
        let v = m.add_vertex([1.0, 1.0, 0.0]).unwrap();
        m.insert_triangle([VertexId(2), VertexId(1), v], None).unwrap();
        let err = subdivide(&Arc::new(m), &Serial, &SubdivideOptions::default()).unwrap_err();
        assert_eq!(err, MeshError::NotFinalized);
    }

    #[test]
    fn cap_boundary_stays_on_the_edges() {
        let fine = subdivide(&Arc::new(cap()), &Serial, &SubdivideOptions::default()).unwrap();
        // boundary edge vertices are plain midpoints
        let mids: Vec<[f32; 3]> = (0..fine.vertex_count() as u32)
            .map(|v| fine.position(VertexId(v)).unwrap())
            .collect();
        assert!(mids.contains(&[0.5, 0.0, 0.0]));
        assert!(mids.contains(&[0.5, 0.5, 0.0]));
        assert!(mids.contains(&[0.0, 0.5, 0.0]));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: SubdivideOptions = serde_json::from_str(r#"{ "levels": 3 }"#).unwrap();
        assert_eq!(opts.levels, 3);
        assert_eq!(opts.block_size, 256);
        assert!(opts.compute_normals);
    }
}
