//! MeshError: Unified error type for loopmesh public APIs
//!
//! Construction-time rejections (`NonManifoldEdge`, `DegenerateTriangle`) are
//! expected during mesh building and are returned as values. Integrity errors
//! (`AdjacencyBroken`, `InvariantViolated`) indicate a corrupted mesh; callers
//! should not continue editing after seeing one.

use thiserror::Error;

/// Unified error type for loopmesh operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// The slab cannot satisfy the rectangular-padding constraint.
    #[error(
        "slab `{slab}`: {requested} rows cannot be padded to a rectangle of width <= {max_row_width}"
    )]
    CapacityExceeded {
        slab: &'static str,
        requested: usize,
        max_row_width: usize,
    },
    /// The directed edge `origin -> dest` is already owned by a face.
    #[error("non-manifold edge {origin} -> {dest}: directed edge already belongs to a face")]
    NonManifoldEdge { origin: u32, dest: u32 },
    /// The vertex's fan is already closed; another face would pinch it.
    #[error("non-manifold vertex {vertex}: no free gap in its edge ring")]
    NonManifoldVertex { vertex: u32 },
    /// No free gap was found while splicing two boundary edges together.
    #[error("adjacency broken: no free gap to splice incoming {incoming} with outgoing {outgoing}")]
    AdjacencyBroken { incoming: i32, outgoing: i32 },
    /// Out-of-range or stale handle passed to a table accessor.
    #[error("invalid {kind} handle {index} (table length {len})")]
    InvalidHandle {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    /// A triangle referenced the same vertex more than once.
    #[error("degenerate triangle ({v0}, {v1}, {v2})")]
    DegenerateTriangle { v0: u32, v1: u32, v2: u32 },
    /// Polygon fan with fewer than three corners.
    #[error("polygon needs at least 3 corners, got {sides}")]
    PolygonTooSmall { sides: usize },
    /// Boundary-edge or hole slab still has free slots; `compact()` first.
    #[error("mesh not compacted: {free_boundary} free boundary slots, {free_holes} free hole slots")]
    NotCompacted {
        free_boundary: usize,
        free_holes: usize,
    },
    /// Topology was edited after the last `finalize_boundaries()`.
    #[error("mesh edited since the last finalize_boundaries()")]
    NotFinalized,
    /// Injected backing store is shorter than the live data.
    #[error("backing store too small: need {needed} elements, got {provided}")]
    BackingTooSmall { needed: usize, provided: usize },
    /// Injected backing store is not a padded rectangle.
    #[error("backing store of {len} elements is not padded to a rectangle")]
    BackingNotPadded { len: usize },
    /// A structural sanity check failed.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
    /// A task panicked on a worker thread.
    #[error("worker task panicked: {0}")]
    TaskPanicked(String),
    /// A message was dispatched to a worker pool that is shutting down.
    #[error("worker pool has been shut down")]
    PoolShutdown,
}

impl MeshError {
    pub(crate) fn invalid(kind: &'static str, index: usize, len: usize) -> Self {
        MeshError::InvalidHandle { kind, index, len }
    }
}
