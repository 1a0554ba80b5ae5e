//! Task execution for data-parallel passes.
//!
//! [`WorkerPool`] is a fixed set of threads fed by [`TaskGroup`]s; its
//! work-stealing loop publishes one atomic cursor per call and every worker
//! claims blocks from it until the range is exhausted. [`Executor`] is the
//! narrow interface subdivision uses, so the same kernels run serially, on a
//! pool, or (feature `rayon`) on the rayon global pool.

pub mod group;
pub mod pool;

use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::mesh_error::MeshError;

pub use group::{Completion, TaskGroup, Wait};
pub use pool::{ForBody, ForLoop, Message, PoolConfig, WorkerContext, WorkerPool};

/// Body of one stage: called with disjoint sub-ranges of the stage range.
pub type RangeBody = Arc<dyn Fn(Range<usize>) + Send + Sync>;

/// Runs a blocked for-loop and returns once every block has finished.
pub trait Executor: Send + Sync {
    /// Number of threads that may run blocks at once.
    fn concurrency(&self) -> usize;

    /// Call `body` on blocks of at most `block` elements covering `range`
    /// exactly once. Blocks may run in any order and concurrently.
    fn for_each_block(&self, range: Range<usize>, block: usize, body: RangeBody) -> Result<(), MeshError>;
}

/// Runs every block in order on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl Executor for Serial {
    fn concurrency(&self) -> usize {
        1
    }

    fn for_each_block(&self, range: Range<usize>, block: usize, body: RangeBody) -> Result<(), MeshError> {
        let block = block.max(1);
        let mut start = range.start;
        while start < range.end {
            let end = start.saturating_add(block).min(range.end);
            body(start..end);
            start = end;
        }
        Ok(())
    }
}

impl Executor for WorkerPool {
    fn concurrency(&self) -> usize {
        self.workers()
    }

    fn for_each_block(&self, range: Range<usize>, block: usize, body: RangeBody) -> Result<(), MeshError> {
        let group = self.task_group();
        group.dispatch_for(range, block, move |_, r| body(r))?;
        group.when_all_done().wait()
    }
}

/// Executes blocks on the rayon global thread pool.
#[cfg(feature = "rayon")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonExecutor;

#[cfg(feature = "rayon")]
impl Executor for RayonExecutor {
    fn concurrency(&self) -> usize {
        rayon::current_num_threads()
    }

    fn for_each_block(&self, range: Range<usize>, block: usize, body: RangeBody) -> Result<(), MeshError> {
        use rayon::prelude::*;
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let block = block.clamp(1, range.len().max(1));
        let blocks = range.len().div_ceil(block);
        let start = range.start;
        let end = range.end;
        catch_unwind(AssertUnwindSafe(|| {
            (0..blocks).into_par_iter().for_each(|i| {
                let lo = start + i * block;
                body(lo..lo.saturating_add(block).min(end));
            })
        }))
        .map_err(|p| {
            let msg = p
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| p.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            MeshError::TaskPanicked(msg)
        })
    }
}

static DEFAULT_POOL: OnceCell<WorkerPool> = OnceCell::new();

/// Process-wide pool with [`PoolConfig::default`], created on first use.
pub fn default_pool() -> Result<&'static WorkerPool, MeshError> {
    DEFAULT_POOL.get_or_try_init(|| {
        let pool = WorkerPool::new(PoolConfig::default())?;
        log::debug!("default pool started with {} workers", pool.workers());
        Ok(pool)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collect_blocks(exec: &dyn Executor, range: Range<usize>, block: usize) -> Vec<Range<usize>> {
        let seen = Arc::new(Mutex::new(Vec::<Range<usize>>::new()));
        let sink = seen.clone();
        exec.for_each_block(range, block, Arc::new(move |r: Range<usize>| sink.lock().push(r)))
            .unwrap();
        let mut out = std::mem::take(&mut *seen.lock());
        out.sort_by_key(|r| r.start);
        out
    }

    #[test]
    fn serial_blocks_are_clamped() {
        let blocks = collect_blocks(&Serial, 3..20, 8);
        assert_eq!(blocks, vec![3..11, 11..19, 19..20]);
    }

    #[test]
    fn pool_matches_serial_blocks() {
        let pool = WorkerPool::with_workers(4).unwrap();
        assert_eq!(collect_blocks(&pool, 0..100, 7), collect_blocks(&Serial, 0..100, 7));
        assert!(collect_blocks(&pool, 5..5, 7).is_empty());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn rayon_matches_serial_blocks() {
        assert_eq!(
            collect_blocks(&RayonExecutor, 0..100, 7),
            collect_blocks(&Serial, 0..100, 7)
        );
    }
}
