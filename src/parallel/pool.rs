//! Fixed-size worker pool.
//!
//! Workers wait on one condition variable and take messages from their own
//! direct queue first (broadcasts), then from the shared FIFO (single tasks).
//! A worker drops each message before reporting it finished, so once a group
//! has drained no worker still holds anything the message captured.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;
use crate::parallel::group::{GroupState, TaskGroup};

/// Body of a work-stealing loop.
pub type ForBody = Arc<dyn Fn(&WorkerContext, Range<usize>) + Send + Sync>;

/// What a worker can be asked to do.
#[derive(Clone)]
pub enum Message {
    /// Store group-wide read-only data on the worker.
    Setup(Arc<dyn Any + Send + Sync>),
    /// Run a function once.
    Task(Arc<dyn Fn(&WorkerContext) + Send + Sync>),
    /// Join a work-stealing loop.
    For(ForLoop),
    /// Drop the group's setup data.
    Teardown,
}

impl Message {
    pub fn task<F>(f: F) -> Self
    where
        F: Fn(&WorkerContext) + Send + Sync + 'static,
    {
        Message::Task(Arc::new(f))
    }

    pub fn setup<T: Any + Send + Sync>(data: T) -> Self {
        Message::Setup(Arc::new(data))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Setup(_) => f.write_str("Setup"),
            Message::Task(_) => f.write_str("Task"),
            Message::For(l) => f
                .debug_struct("For")
                .field("end", &l.end)
                .field("block", &l.block)
                .finish(),
            Message::Teardown => f.write_str("Teardown"),
        }
    }
}

/// One atomic cursor shared by every worker taking part in a loop.
#[derive(Clone)]
pub struct ForLoop {
    pub(crate) cursor: Arc<AtomicUsize>,
    pub(crate) end: usize,
    pub(crate) block: usize,
    pub(crate) body: ForBody,
}

impl ForLoop {
    /// Claim blocks until the cursor reaches `end`. The last block is clamped.
    ///
    /// The cursor never moves past `end`, so it cannot wrap however large the
    /// block is.
    fn run(&self, ctx: &WorkerContext) {
        let (end, block) = (self.end, self.block);
        while let Ok(start) = self.cursor.fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
            (c < end).then(|| c.saturating_add(block).min(end))
        }) {
            (self.body)(ctx, start..start.saturating_add(block).min(end));
        }
    }
}

/// Per-worker state passed to every task.
pub struct WorkerContext {
    index: usize,
    group: u64,
    setups: hashbrown::HashMap<u64, Arc<dyn Any + Send + Sync>>,
}

impl WorkerContext {
    /// Index of this worker within its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Setup data broadcast by the current task's group, if any.
    pub fn setup<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.setups.get(&self.group)?.downcast_ref::<T>()
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Setup(data) => {
                self.setups.insert(self.group, data);
            }
            Message::Teardown => {
                self.setups.remove(&self.group);
            }
            Message::Task(f) => f(self),
            Message::For(work) => work.run(self),
        }
    }
}

/// Worker-pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads; `0` is treated as `1`.
    pub workers: usize,
    /// Thread names are `{name_prefix}-{index}`.
    pub name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            name_prefix: "loopmesh-worker".to_string(),
        }
    }
}

struct Job {
    group: Arc<GroupState>,
    message: Message,
}

struct Queues {
    shared: VecDeque<Job>,
    direct: Vec<VecDeque<Job>>,
    shutdown: bool,
}

pub(crate) struct PoolShared {
    queues: Mutex<Queues>,
    available: Condvar,
    workers: usize,
}

impl PoolShared {
    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    pub(crate) fn push_all(&self, group: &Arc<GroupState>, message: Message) -> Result<(), MeshError> {
        let mut q = self.queues.lock();
        if q.shutdown {
            return Err(MeshError::PoolShutdown);
        }
        for direct in q.direct.iter_mut() {
            direct.push_back(Job {
                group: group.clone(),
                message: message.clone(),
            });
        }
        drop(q);
        self.available.notify_all();
        Ok(())
    }

    pub(crate) fn push_one(&self, group: &Arc<GroupState>, message: Message) -> Result<(), MeshError> {
        let mut q = self.queues.lock();
        if q.shutdown {
            return Err(MeshError::PoolShutdown);
        }
        q.shared.push_back(Job {
            group: group.clone(),
            message,
        });
        drop(q);
        self.available.notify_one();
        Ok(())
    }

    /// Next job for worker `index`, or `None` once shut down and drained.
    fn take(&self, index: usize) -> Option<Job> {
        let mut q = self.queues.lock();
        loop {
            if let Some(job) = q.direct[index].pop_front() {
                return Some(job);
            }
            if let Some(job) = q.shared.pop_front() {
                return Some(job);
            }
            if q.shutdown {
                return None;
            }
            self.available.wait(&mut q);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn worker_loop(shared: Arc<PoolShared>, index: usize) {
    log::debug!("worker {index} started");
    let mut ctx = WorkerContext {
        index,
        group: 0,
        setups: hashbrown::HashMap::new(),
    };
    while let Some(Job { group, message }) = shared.take(index) {
        ctx.group = group.id();
        let outcome = catch_unwind(AssertUnwindSafe(|| ctx.handle(message)));
        group.finish(outcome.err().map(panic_message));
    }
    log::debug!("worker {index} stopped");
}

/// Fixed pool of worker threads, sized at construction.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self, MeshError> {
        let workers = config.workers.max(1);
        let shared = Arc::new(PoolShared {
            queues: Mutex::new(Queues {
                shared: VecDeque::new(),
                direct: (0..workers).map(|_| VecDeque::new()).collect(),
                shutdown: false,
            }),
            available: Condvar::new(),
            workers,
        });
        let mut pool = WorkerPool {
            shared,
            handles: Vec::with_capacity(workers),
            config,
        };
        for index in 0..workers {
            let shared = pool.shared.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", pool.config.name_prefix))
                .spawn(move || worker_loop(shared, index))
                .map_err(|e| MeshError::WorkerSpawn(e.to_string()))?;
            pool.handles.push(handle);
        }
        Ok(pool)
    }

    /// Pool with `workers` threads and default naming.
    pub fn with_workers(workers: usize) -> Result<Self, MeshError> {
        Self::new(PoolConfig {
            workers,
            ..PoolConfig::default()
        })
    }

    pub fn workers(&self) -> usize {
        self.shared.workers
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Start a new group of messages that will be awaited together.
    pub fn task_group(&self) -> TaskGroup {
        TaskGroup::new(self.shared.clone())
    }

    /// Stop accepting messages, let the workers drain their queues and join them.
    pub fn shutdown(&mut self) {
        self.shared.queues.lock().shutdown = true;
        self.shared.available.notify_all();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("worker thread exited by panic");
            }
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.shared.workers)
            .field("running", &self.handles.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::group::Wait;

    #[test]
    fn tasks_run_and_complete() {
        let pool = WorkerPool::with_workers(3).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let group = pool.task_group();
        for _ in 0..10 {
            let hits = hits.clone();
            group
                .dispatch_one(Message::task(move |_| {
                    hits.fetch_add(1, Ordering::Relaxed);
                }))
                .unwrap();
        }
        group.when_all_done().wait().unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 10);
        assert_eq!(group.outstanding(), 0);
    }

    #[test]
    fn setup_is_visible_until_teardown() {
        let pool = WorkerPool::with_workers(2).unwrap();
        let group = pool.task_group();
        group.dispatch_all(Message::setup(41usize)).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        group
            .dispatch_all(Message::task(move |ctx| {
                let v = ctx.setup::<usize>().copied().unwrap_or(0);
                s.fetch_add(v + 1, Ordering::Relaxed);
            }))
            .unwrap();
        group.when_all_done().wait().unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 2 * 42);

        // teardown ran as part of the wait
        let s = seen.clone();
        group
            .dispatch_all(Message::task(move |ctx| {
                if ctx.setup::<usize>().is_none() {
                    s.fetch_add(1, Ordering::Relaxed);
                }
            }))
            .unwrap();
        group.when_all_done().wait().unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 2 * 42 + 2);
    }

    #[test]
    fn panicking_task_is_reported() {
        let pool = WorkerPool::with_workers(2).unwrap();
        let group = pool.task_group();
        group.dispatch_one(Message::task(|_| panic!("boom"))).unwrap();
        let err = group.when_all_done().wait().unwrap_err();
        assert_eq!(err, MeshError::TaskPanicked("boom".into()));
        // the worker survives
        group.dispatch_one(Message::task(|_| {})).unwrap();
        group.when_all_done().wait().unwrap();
    }

    #[test]
    fn dispatch_after_shutdown_fails() {
        let mut pool = WorkerPool::with_workers(1).unwrap();
        let group = pool.task_group();
        pool.shutdown();
        assert_eq!(
            group.dispatch_one(Message::task(|_| {})),
            Err(MeshError::PoolShutdown)
        );
        assert_eq!(group.outstanding(), 0);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: PoolConfig = serde_json::from_str(r#"{ "workers": 3 }"#).unwrap();
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.name_prefix, "loopmesh-worker");
    }
}
