//! Admission controller abstraction.
//!
//! A `Dispatcher` runs tasks on worker threads while bounding how many
//! run at once. Each running task costs a fixed memory budget, so the
//! bound caps worst-case memory at `max_workers × budget`.
//!
//! # Submission modes
//!
//! - `submit()`: never blocks. Saturation is reported as `false` and the
//!   task is dropped unrun. Rejection is an expected outcome, not an error.
//!
//! - `submit_retrying()`: never fails. Retries every `RETRY_BACKOFF` until
//!   the task is accepted. No upper bound on the wait; wrap it with
//!   `submit_retrying_until()` when a deadline matters.
//!
//! # Implementors
//!
//! - `GoPool` (relay-pool): lazily spawned OS threads up to the bound,
//!   reclaimed after an idle period.

use std::time::Duration;

use crate::context::Context;

/// A unit of work accepted by a dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Pause between attempts in the retrying submission modes.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Bounded task dispatcher.
///
/// **Contract:**
/// - `try_submit()` must NEVER block the caller on task completion.
/// - The number of concurrently running tasks never exceeds `max_workers()`.
/// - Once stopped, every submission is rejected. Tasks already running
///   are not interrupted.
pub trait Dispatcher: Send + Sync {
    /// Schedule `task`, or hand it back if there is no capacity.
    fn try_submit(&self, task: Task) -> Result<(), Task>;

    /// Workers currently executing a task.
    fn running_workers(&self) -> usize;

    /// Workers parked waiting for a task.
    fn idle_workers(&self) -> usize;

    /// The capacity bound.
    fn max_workers(&self) -> usize;

    /// Stop accepting submissions. Idempotent.
    fn stop(&self);

    fn is_running(&self) -> bool;

    /// Schedule `task`; `false` means saturated and the task was dropped.
    fn submit(&self, task: Task) -> bool {
        self.try_submit(task).is_ok()
    }

    /// Keep trying until `task` is accepted, sleeping `RETRY_BACKOFF`
    /// between attempts. Returns only once the task is scheduled.
    fn submit_retrying(&self, task: Task) {
        let mut task = task;
        loop {
            match self.try_submit(task) {
                Ok(()) => return,
                Err(rejected) => {
                    task = rejected;
                    std::thread::sleep(RETRY_BACKOFF);
                }
            }
        }
    }

    /// Like `submit_retrying`, but give up once `ctx` is done.
    ///
    /// Returns `true` if the task was accepted, `false` if the context was
    /// cancelled or expired first (the task is dropped unrun).
    fn submit_retrying_until(&self, task: Task, ctx: &Context) -> bool {
        let mut task = task;
        loop {
            if ctx.done().is_some() {
                return false;
            }
            match self.try_submit(task) {
                Ok(()) => return true,
                Err(rejected) => {
                    task = rejected;
                    if !ctx.sleep(RETRY_BACKOFF) {
                        return false;
                    }
                }
            }
        }
    }
}
