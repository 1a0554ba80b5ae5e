//! Structural self-checks for slabs and meshes.
//!
//! Builds with `debug_assertions`, `check-invariants` or `strict-invariants`
//! re-validate a table after each bulk mutation (finalize, compaction, a
//! subdivision pass) and stop at the first broken link. Other release builds
//! skip the walk.

use crate::mesh_error::MeshError;

/// A table that can check its own storage and connectivity.
pub trait DebugInvariants {
    /// Validate and panic on failure when checks are compiled in.
    fn debug_assert_invariants(&self);

    /// Walk the structure; `Err` carries the first inconsistency found.
    fn validate_invariants(&self) -> Result<(), MeshError>;
}

/// Evaluate `$check` (a `Result<_, MeshError>`) when checks are compiled in,
/// logging and panicking with `$what` as context if it fails.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $($what:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants", feature = "strict-invariants"))]
        if let Err(err) = $check {
            log::error!(concat!($($what)*, " failed validation: {}"), err);
            panic!(concat!($($what)*, " is inconsistent: {}"), err);
        }
    };
}
