#![cfg_attr(docsrs, feature(doc_cfg))]
//! # loopmesh
//!
//! loopmesh is a triangle-mesh editing and Loop-subdivision kernel whose
//! buffers can be handed to a GPU as image-shaped arrays without repacking.
//!
//! ## Features
//! - Column slabs with geometric growth, dirty-range tracking and
//!   rectangular capacity padding
//! - Directed-edge topology with face insertion, boundary splicing and
//!   non-manifold detection
//! - Loop subdivision with creases, driven by a deterministic handle remap so
//!   every unit of work writes to slots it can compute on its own
//! - A fixed worker pool with atomic work-stealing loops (optionally rayon)
//!
//! ## Usage
//!
//! ```rust
//! use loopmesh::prelude::*;
//!
//! let mut mesh = TriMesh::default();
//! let a = mesh.add_vertex([0.0, 0.0, 0.0])?;
//! let b = mesh.add_vertex([1.0, 0.0, 0.0])?;
//! let c = mesh.add_vertex([0.0, 1.0, 0.0])?;
//! mesh.insert_triangle([a, b, c], None)?;
//! mesh.finalize_boundaries()?;
//!
//! let fine = subdivide_levels(mesh, &Serial, &SubdivideOptions::default())?;
//! assert_eq!(fine.face_count(), 4);
//! # Ok::<(), MeshError>(())
//! ```
//!
//! ## Invariant checking
//!
//! Debug builds validate mesh connectivity after every finalize and
//! subdivision pass. Enable `check-invariants` to keep those checks in release
//! builds.

pub mod algs;
pub mod debug_invariants;
pub mod mesh_error;
pub mod parallel;
pub mod render;
pub mod slab;
pub mod subdivide;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::quadrangulate::{QuadPairing, quadrangulate};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshError;
    #[cfg(feature = "rayon")]
    pub use crate::parallel::RayonExecutor;
    pub use crate::parallel::{Executor, PoolConfig, Serial, WorkerPool, default_pool};
    pub use crate::render::{BufferDescriptor, PullBuffer, RenderBuffers};
    pub use crate::slab::{Column, PropertyId, RectDims, SlabConfig};
    pub use crate::subdivide::{SubdivideOptions, subdivide, subdivide_levels};
    pub use crate::topology::{
        CountingDepot, EdgeHandle, EdgeProvider, FaceId, HoleId, MaterialDepot, MaterialId,
        TriMesh, ValidationOptions, VertexId, WholeEdgeId,
    };
}
