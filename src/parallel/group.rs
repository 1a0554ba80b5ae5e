//! Task groups: outstanding-task counting and completion waits.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::mesh_error::MeshError;
use crate::parallel::pool::{ForLoop, Message, PoolShared, WorkerContext};

/// Anything that can be waited on.
pub trait Wait {
    type Output;

    /// Block until completion.
    fn wait(self) -> Self::Output;
}

static NEXT_GROUP: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct Counters {
    outstanding: usize,
    /// Set by real work, cleared once teardown has been broadcast.
    work_done: bool,
    panics: Vec<String>,
}

/// Completion bookkeeping shared between a [`TaskGroup`] and the workers.
#[derive(Debug)]
pub(crate) struct GroupState {
    id: u64,
    counters: Mutex<Counters>,
    idle: Condvar,
}

impl GroupState {
    fn new() -> Self {
        GroupState {
            id: NEXT_GROUP.fetch_add(1, Ordering::Relaxed),
            counters: Mutex::new(Counters::default()),
            idle: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn begin(&self, tasks: usize, is_work: bool) {
        let mut c = self.counters.lock();
        c.outstanding += tasks;
        c.work_done |= is_work && tasks > 0;
    }

    /// Called by a worker after the message has been dropped.
    pub(crate) fn finish(&self, panic: Option<String>) {
        let mut c = self.counters.lock();
        c.outstanding -= 1;
        if let Some(p) = panic {
            c.panics.push(p);
        }
        if c.outstanding == 0 {
            self.idle.notify_all();
        }
    }

    /// Wait for zero outstanding tasks; returns whether teardown is due.
    fn wait_idle(&self) -> bool {
        let mut c = self.counters.lock();
        while c.outstanding > 0 {
            self.idle.wait(&mut c);
        }
        std::mem::take(&mut c.work_done)
    }

    fn take_panics(&self) -> Vec<String> {
        std::mem::take(&mut self.counters.lock().panics)
    }
}

/// A set of messages dispatched to one pool, awaited together.
///
/// Each group keeps its own counter, so several drivers can share one pool.
/// Setup data broadcast through a group is visible only to that group's
/// messages.
pub struct TaskGroup {
    shared: Arc<PoolShared>,
    state: Arc<GroupState>,
}

impl TaskGroup {
    pub(crate) fn new(shared: Arc<PoolShared>) -> Self {
        TaskGroup {
            shared,
            state: Arc::new(GroupState::new()),
        }
    }

    /// Messages dispatched and not yet finished.
    pub fn outstanding(&self) -> usize {
        self.state.counters.lock().outstanding
    }

    /// Send a copy of `message` to every worker.
    pub fn dispatch_all(&self, message: Message) -> Result<(), MeshError> {
        let is_work = !matches!(message, Message::Teardown);
        self.state.begin(self.shared.workers(), is_work);
        self.shared
            .push_all(&self.state, message)
            .inspect_err(|_| self.rollback(self.shared.workers()))
    }

    /// Give `message` to the first free worker.
    pub fn dispatch_one(&self, message: Message) -> Result<(), MeshError> {
        self.state.begin(1, true);
        self.shared
            .push_one(&self.state, message)
            .inspect_err(|_| self.rollback(1))
    }

    /// Run `body` over `range` in blocks of `block`, claimed by every worker
    /// from one shared atomic cursor.
    ///
    /// `block` is clamped to `1..=range.len()`.
    pub fn dispatch_for<F>(&self, range: Range<usize>, block: usize, body: F) -> Result<(), MeshError>
    where
        F: Fn(&WorkerContext, Range<usize>) + Send + Sync + 'static,
    {
        if range.is_empty() {
            return Ok(());
        }
        let work = ForLoop {
            cursor: Arc::new(AtomicUsize::new(range.start)),
            end: range.end,
            block: block.clamp(1, range.len()),
            body: Arc::new(body),
        };
        self.dispatch_all(Message::For(work))
    }

    /// Resolves once every dispatched message has finished.
    pub fn when_all_done(&self) -> Completion {
        Completion {
            shared: self.shared.clone(),
            state: self.state.clone(),
        }
    }

    fn rollback(&self, tasks: usize) {
        for _ in 0..tasks {
            self.state.finish(None);
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        // Clear any setup data the workers still hold for this group.
        if self.state.wait_idle() {
            let _ = self.dispatch_all(Message::Teardown);
            self.state.wait_idle();
        }
    }
}

/// Future-like handle returned by [`TaskGroup::when_all_done`].
pub struct Completion {
    shared: Arc<PoolShared>,
    state: Arc<GroupState>,
}

impl Wait for Completion {
    type Output = Result<(), MeshError>;

    /// Wait for the group to drain, broadcast one teardown if any work ran,
    /// then report the first task panic, if any.
    fn wait(self) -> Result<(), MeshError> {
        if self.state.wait_idle() {
            self.state.begin(self.shared.workers(), false);
            if self.shared.push_all(&self.state, Message::Teardown).is_err() {
                for _ in 0..self.shared.workers() {
                    self.state.finish(None);
                }
            }
            self.state.wait_idle();
        }
        match self.state.take_panics().into_iter().next() {
            Some(p) => Err(MeshError::TaskPanicked(p)),
            None => Ok(()),
        }
    }
}
