//! Cancellation and deadline context
//!
//! A `Context` governs one call. It can be cancelled explicitly, and it
//! may carry a deadline. Contexts form parent-child chains: a child is
//! done when it or any ancestor is cancelled, and its effective deadline
//! is the earliest one on the chain.
//!
//! Cancellation is advisory. Work that holds a context should poll
//! `check()` or `done()` and stop promptly.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};

/// Granularity at which blocking waits re-check their context.
pub const CANCEL_POLL: Duration = Duration::from_millis(5);

/// Why a context is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    /// `cancel()` was called on this context or an ancestor
    Cancelled,
    /// The effective deadline has passed
    DeadlineExceeded,
}

/// Cancellation/deadline context
///
/// Cloning shares state: cancelling any clone cancels them all.
#[derive(Clone)]
pub struct Context {
    inner: ContextInner,
}

#[derive(Clone)]
enum ContextInner {
    /// Heap-allocated, cancellable context
    Owned(Arc<OwnedContext>),
    /// Never cancels and has no deadline
    Background,
}

struct OwnedContext {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

impl Context {
    /// A context that is never done. Does not allocate.
    pub const fn background() -> Self {
        Self {
            inner: ContextInner::Background,
        }
    }

    /// An independent cancellable context with no deadline.
    pub fn new() -> Self {
        Self::owned(None, None)
    }

    /// A cancellable context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::owned(Instant::now().checked_add(timeout), None)
    }

    /// A cancellable context with an absolute deadline.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::owned(Some(deadline), None)
    }

    /// A child linked to this context.
    pub fn child(&self) -> Self {
        Self::owned(None, Some(self.clone()))
    }

    /// A child linked to this context with its own timeout.
    ///
    /// The effective deadline is the earlier of the two.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self::owned(Instant::now().checked_add(timeout), Some(self.clone()))
    }

    fn owned(deadline: Option<Instant>, parent: Option<Context>) -> Self {
        Self {
            inner: ContextInner::Owned(Arc::new(OwnedContext {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
            })),
        }
    }

    /// Request cancellation. No-op on the background context.
    ///
    /// Only this context and its descendants observe it, never the parent.
    pub fn cancel(&self) {
        if let ContextInner::Owned(arc) = &self.inner {
            arc.cancelled.store(true, Ordering::Release);
        }
    }

    /// Whether this context or any ancestor was cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        match &self.inner {
            ContextInner::Owned(arc) => {
                if arc.cancelled.load(Ordering::Acquire) {
                    return true;
                }
                match &arc.parent {
                    Some(parent) => parent.is_cancelled(),
                    None => false,
                }
            }
            ContextInner::Background => false,
        }
    }

    /// Effective deadline: the earliest along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.inner {
            ContextInner::Owned(arc) => {
                let inherited = arc.parent.as_ref().and_then(Context::deadline);
                match (arc.deadline, inherited) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                }
            }
            ContextInner::Background => None,
        }
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.deadline().is_some_and(|d| Instant::now() >= d)
    }

    /// `Some(reason)` once the context is done. Cancellation wins over expiry.
    pub fn done(&self) -> Option<Done> {
        if self.is_cancelled() {
            Some(Done::Cancelled)
        } else if self.is_expired() {
            Some(Done::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Return an error if the context is done
    ///
    /// ```ignore
    /// fn send_loop(ctx: &Context) -> CoreResult<()> {
    ///     loop {
    ///         ctx.check()?;
    ///         // ... write a frame ...
    ///     }
    /// }
    /// ```
    #[inline]
    pub fn check(&self) -> CoreResult<()> {
        match self.done() {
            None => Ok(()),
            Some(Done::Cancelled) => Err(CoreError::Cancelled),
            Some(Done::DeadlineExceeded) => Err(CoreError::DeadlineExceeded),
        }
    }

    /// Whether this is the background context, which is never done.
    #[inline]
    pub fn is_background(&self) -> bool {
        matches!(self.inner, ContextInner::Background)
    }

    /// Sleep for `dur`, waking early if the context becomes done.
    ///
    /// Returns `true` if the full duration elapsed. A `dur` too large to
    /// express as an `Instant` lasts until the context is done.
    pub fn sleep(&self, dur: Duration) -> bool {
        let until = Instant::now().checked_add(dur);
        loop {
            if self.done().is_some() {
                return false;
            }
            let mut step = CANCEL_POLL;
            if let Some(until) = until {
                let now = Instant::now();
                if now >= until {
                    return true;
                }
                step = step.min(until - now);
            }
            if let Some(left) = self.remaining() {
                step = step.min(left.max(Duration::from_millis(1)));
            }
            std::thread::sleep(step);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("done", &self.done())
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cancellation() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());

        ctx.cancel();

        assert!(ctx.is_cancelled());
        assert_eq!(ctx.done(), Some(Done::Cancelled));
        assert!(matches!(ctx.check(), Err(CoreError::Cancelled)));
    }

    #[test]
    fn test_child_sees_parent_cancel() {
        let parent = Context::new();
        let child = parent.child();

        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_child_cancel_is_local() {
        let parent = Context::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_deadline_expires() {
        let ctx = Context::with_timeout(Duration::from_millis(20));
        assert!(ctx.done().is_none());
        assert!(ctx.remaining().is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(ctx.is_expired());
        assert_eq!(ctx.done(), Some(Done::DeadlineExceeded));
        assert!(matches!(ctx.check(), Err(CoreError::DeadlineExceeded)));
    }

    #[test]
    fn test_child_inherits_earliest_deadline() {
        let parent = Context::with_timeout(Duration::from_millis(50));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let tight = parent.child_with_timeout(Duration::from_millis(1));
        assert!(tight.deadline() < parent.deadline());
    }

    #[test]
    fn test_background_never_done() {
        let ctx = Context::background();
        ctx.cancel();
        assert!(ctx.done().is_none());
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(ctx.is_background());
        assert!(!Context::new().is_background());
        assert!(!Context::background().child().is_background());
    }

    #[test]
    fn test_clone_shares_state() {
        let a = Context::new();
        let b = a.clone();
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let ctx = Context::new();
        let remote = ctx.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        assert!(!ctx.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn test_endless_sleep_wakes_on_cancel() {
        let ctx = Context::new();
        let remote = ctx.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        assert!(!ctx.sleep(Duration::MAX));
        handle.join().unwrap();

        let expiring = Context::with_timeout(Duration::from_millis(20));
        assert!(!expiring.sleep(Duration::MAX));
    }

    #[test]
    fn test_sleep_completes() {
        let ctx = Context::new();
        assert!(ctx.sleep(Duration::from_millis(10)));
    }
}
