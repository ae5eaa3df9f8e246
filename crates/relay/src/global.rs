//! Process-wide admission controller
//!
//! One `GoPool` serves the whole process. Reconfiguring replaces it: the
//! new pool is built first and swapped in under the write lock, then the
//! old one is stopped. Tasks already running on the old pool finish; it
//! just stops accepting work.
//!
//! Call `set_gopool` (or `PeerConfig::apply`) before the first dispatch.
//! Submissions racing a swap may land on the retiring pool and be
//! rejected.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use relay_core::{kinfo, kwarn, Dispatcher};
use relay_pool::GoPool;

static GOPOOL: OnceLock<RwLock<Arc<GoPool>>> = OnceLock::new();

fn slot() -> &'static RwLock<Arc<GoPool>> {
    GOPOOL.get_or_init(|| RwLock::new(Arc::new(GoPool::with_defaults())))
}

/// The current global pool.
pub fn gopool() -> Arc<GoPool> {
    let guard = slot().read().unwrap_or_else(|e| e.into_inner());
    Arc::clone(&guard)
}

/// Replace the global pool with one bounded by `max_tasks`.
///
/// Zero for either argument selects the default, as in `GoPool::new`.
pub fn set_gopool(max_tasks: usize, idle: Duration) {
    let fresh = Arc::new(GoPool::new(max_tasks, idle));
    kinfo!(
        "global go pool reconfigured: max_tasks={}, idle={:?}",
        fresh.max_workers(),
        fresh.idle_duration()
    );
    let old = {
        let mut guard = slot().write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, fresh)
    };
    old.stop();
}

/// Run `f` on the global pool without blocking.
///
/// `false` (with a warning logged) if the pool is saturated; `f` is dropped.
pub fn go<F>(f: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let pool = gopool();
    if pool.go(f) {
        return true;
    }
    kwarn!(
        "go: task rejected, pool saturated ({}/{} running)",
        pool.running_workers(),
        pool.max_workers()
    );
    false
}

/// Run `f` on the global pool, retrying every second until accepted.
pub fn anyway_go<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    gopool().anyway_go(f)
}
