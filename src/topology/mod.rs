//! Directed-edge mesh topology.
//!
//! This module provides the handle types and tables for triangle meshes:
//! - Vertex, face, whole-edge and hole handles, plus the two-space [`EdgeHandle`]
//! - Column tables for vertices, directed/boundary/whole edges, faces and holes
//! - [`TriMesh`], which owns the tables and implements face insertion,
//!   boundary finalization and compaction
//!
//! Most users build meshes through [`TriMesh`] and query them through its
//! checked accessors.

pub mod compact;
pub mod edge;
pub mod face;
pub mod handle;
pub mod hole;
pub mod material;
pub mod mesh;
pub mod validation;
pub mod vertex;

pub use edge::{BOUNDARY_SHARPNESS, EdgeProvider, EdgeTables};
pub use face::FaceTable;
pub use handle::{EdgeHandle, FaceId, HoleId, Side, VertexId, WholeEdgeId};
pub use hole::HoleTable;
pub use material::{CountingDepot, MaterialDepot, MaterialId};
pub use mesh::{MeshCounts, MeshStats, PolygonInsertError, TriMesh};
pub use validation::{ValidationOptions, sanity_check, validate_mesh};
pub use vertex::{CORNER, IncomingRing, OutgoingRing, VertexTable};
