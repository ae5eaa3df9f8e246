//! `GoPool` — default `Dispatcher` implementation.
//!
//! At most `max_workers` tasks are admitted at once. A task counts against
//! the bound from the moment it is accepted until its closure returns.
//! Workers are spawned lazily; each owns a one-task handoff slot, and the
//! submitter pops an idle worker, drops the task into its slot and wakes
//! it. If none is parked a new thread is spawned, so the thread count can
//! briefly exceed the bound while a finished worker is re-parking. An idle
//! worker that waits longer than `idle_duration` unregisters itself and
//! exits.
//!
//! Stopping the pool rejects new submissions and wakes idle workers so
//! they exit. Busy workers finish their current task, then exit.

use relay_core::constants::{DEFAULT_MAX_TASKS, DEFAULT_TASK_IDLE_MS};
use relay_core::dispatch::{Dispatcher, Task};
use relay_core::{kdebug, kerror, ktrace};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Handoff slot between a submitter and one worker.
struct WorkerSlot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

#[derive(Default)]
struct SlotState {
    task: Option<Task>,
    /// Set by `stop()` on parked workers.
    exit: bool,
}

impl WorkerSlot {
    fn new(task: Option<Task>) -> Self {
        Self {
            state: Mutex::new(SlotState { task, exit: false }),
            cond: Condvar::new(),
        }
    }

    fn hand(&self, task: Task) {
        lock(&self.state).task = Some(task);
        self.cond.notify_one();
    }

    fn signal_exit(&self) {
        lock(&self.state).exit = true;
        self.cond.notify_one();
    }
}

/// What a parked worker woke up to.
enum Wake {
    Task(Task),
    Exit,
    IdleTimeout,
}

/// Shared state between submitters and workers.
struct PoolInner {
    max_workers: usize,
    idle_duration: Duration,
    /// Cleared by `stop()`; never set again.
    running: AtomicBool,
    /// Live worker threads, busy or parked.
    workers: AtomicUsize,
    /// Tasks admitted and not yet returned. Bounded by `max_workers`.
    active: AtomicUsize,
    /// Parked workers, most recently used last.
    ready: Mutex<Vec<Arc<WorkerSlot>>>,
    next_id: AtomicUsize,
}

/// Bounded, lazily-scaled worker pool
pub struct GoPool {
    inner: Arc<PoolInner>,
}

impl GoPool {
    /// Create a pool running at most `max_workers` tasks at once.
    ///
    /// `max_workers == 0` selects `DEFAULT_MAX_TASKS`; a zero
    /// `idle_duration` selects `DEFAULT_TASK_IDLE_MS`.
    pub fn new(max_workers: usize, idle_duration: Duration) -> Self {
        let max_workers = if max_workers == 0 {
            DEFAULT_MAX_TASKS
        } else {
            max_workers
        };
        let idle_duration = if idle_duration.is_zero() {
            Duration::from_millis(DEFAULT_TASK_IDLE_MS)
        } else {
            idle_duration
        };
        kdebug!(
            "go pool started: max_workers={}, idle={:?}",
            max_workers,
            idle_duration
        );
        GoPool {
            inner: Arc::new(PoolInner {
                max_workers,
                idle_duration,
                running: AtomicBool::new(true),
                workers: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                ready: Mutex::new(Vec::new()),
                next_id: AtomicUsize::new(0),
            }),
        }
    }

    /// Default sizing: `DEFAULT_MAX_TASKS` workers, default idle period.
    pub fn with_defaults() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn idle_duration(&self) -> Duration {
        self.inner.idle_duration
    }

    /// Live worker threads, busy or parked.
    pub fn total_workers(&self) -> usize {
        self.inner.workers.load(Ordering::Acquire)
    }

    /// Run `f` on a worker. `false` if the pool is saturated or stopped.
    pub fn go<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(f))
    }

    /// Run `f` on a worker, retrying until accepted.
    pub fn anyway_go<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit_retrying(Box::new(f))
    }

    /// Admit one task against the bound.
    fn reserve(&self) -> bool {
        let inner = &self.inner;
        let mut current = inner.active.load(Ordering::Acquire);
        loop {
            if current >= inner.max_workers {
                return false;
            }
            match inner.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn spawn_worker(&self, task: Task) -> Result<(), Task> {
        self.inner.workers.fetch_add(1, Ordering::AcqRel);
        let slot = Arc::new(WorkerSlot::new(Some(task)));
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let worker_slot = Arc::clone(&slot);

        let spawned = thread::Builder::new()
            .name(format!("relay-worker-{}", id))
            .spawn(move || worker_loop(inner, worker_slot));

        match spawned {
            Ok(_) => Ok(()),
            Err(e) => {
                self.inner.workers.fetch_sub(1, Ordering::AcqRel);
                kerror!("failed to spawn worker thread: {}", e);
                // The slot still owns the task; hand it back to the caller.
                lock(&slot.state).task.take().map_or(Ok(()), Err)
            }
        }
    }
}

impl Dispatcher for GoPool {
    fn try_submit(&self, task: Task) -> Result<(), Task> {
        if !self.inner.running.load(Ordering::Acquire) || !self.reserve() {
            return Err(task);
        }

        let parked = lock(&self.inner.ready).pop();
        if let Some(slot) = parked {
            slot.hand(task);
            return Ok(());
        }

        self.spawn_worker(task).map_err(|task| {
            self.inner.active.fetch_sub(1, Ordering::AcqRel);
            task
        })
    }

    fn running_workers(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    fn idle_workers(&self) -> usize {
        lock(&self.inner.ready).len()
    }

    fn max_workers(&self) -> usize {
        self.inner.max_workers
    }

    fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let parked: Vec<_> = lock(&self.inner.ready).drain(..).collect();
        for slot in &parked {
            slot.signal_exit();
        }
        kdebug!(
            "go pool stopped: {} active, {} idle released",
            self.running_workers(),
            parked.len()
        );
    }

    fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }
}

impl Drop for GoPool {
    fn drop(&mut self) {
        // Busy workers hold their own Arc and exit after the current task.
        self.stop();
    }
}

impl std::fmt::Debug for GoPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoPool")
            .field("max_workers", &self.inner.max_workers)
            .field("idle_duration", &self.inner.idle_duration)
            .field("running", &self.is_running())
            .field("workers", &self.total_workers())
            .field("active", &self.running_workers())
            .finish()
    }
}

/// Worker thread main loop.
fn worker_loop(inner: Arc<PoolInner>, slot: Arc<WorkerSlot>) {
    loop {
        match wait_for_task(&slot, inner.idle_duration) {
            Wake::Task(task) => {
                run_task(task);
                inner.active.fetch_sub(1, Ordering::AcqRel);

                if !park(&inner, &slot) {
                    break;
                }
            }
            Wake::Exit => break,
            Wake::IdleTimeout => {
                if unpark_self(&inner, &slot) {
                    ktrace!("idle worker reclaimed");
                    break;
                }
                // A submitter popped us first; its task is on the way.
            }
        }
    }
    inner.workers.fetch_sub(1, Ordering::AcqRel);
}

/// Block until a task arrives, exit is signalled, or `idle` passes.
///
/// An `idle` too large to express as an `Instant` never times out.
fn wait_for_task(slot: &WorkerSlot, idle: Duration) -> Wake {
    let deadline = Instant::now().checked_add(idle);
    let mut state = lock(&slot.state);
    loop {
        if let Some(task) = state.task.take() {
            return Wake::Task(task);
        }
        if state.exit {
            return Wake::Exit;
        }
        state = match deadline {
            None => slot.cond.wait(state).unwrap_or_else(PoisonError::into_inner),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Wake::IdleTimeout;
                }
                slot.cond
                    .wait_timeout(state, deadline - now)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|e| e.into_inner().0)
            }
        };
    }
}

/// Push the worker back on the idle stack. `false` if the pool stopped.
fn park(inner: &PoolInner, slot: &Arc<WorkerSlot>) -> bool {
    let mut ready = lock(&inner.ready);
    // Checked under the lock so `stop()`'s drain cannot miss us.
    if !inner.running.load(Ordering::Acquire) {
        return false;
    }
    ready.push(Arc::clone(slot));
    true
}

/// Remove the worker from the idle stack. `false` if it was already taken.
fn unpark_self(inner: &PoolInner, slot: &Arc<WorkerSlot>) -> bool {
    let mut ready = lock(&inner.ready);
    match ready.iter().position(|s| Arc::ptr_eq(s, slot)) {
        Some(idx) => {
            ready.remove(idx);
            true
        }
        None => false,
    }
}

fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        kerror!("task panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
