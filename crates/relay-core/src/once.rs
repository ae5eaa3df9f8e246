//! One-shot initialization flag
//!
//! Guards a side effect that must run at most once per process, no matter
//! how many threads race to trigger it:
//!
//! ```ignore
//! static ANNOUNCE: OnceFlag = OnceFlag::new();
//!
//! ANNOUNCE.call_once(|| kinfo!("listening"));
//! ```
//!
//! Unlike `std::sync::Once`, losers of the race return immediately instead
//! of waiting for the winner's closure to finish, and the caller learns
//! whether it was the one that fired.

use core::sync::atomic::{AtomicBool, Ordering};

/// Fires its closure exactly once
pub struct OnceFlag {
    fired: AtomicBool,
}

impl OnceFlag {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Run `f` if no caller has fired this flag yet.
    ///
    /// Returns `true` only for the caller whose closure ran.
    #[inline]
    pub fn call_once<F: FnOnce()>(&self, f: F) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        f();
        true
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Default for OnceFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OnceFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceFlag")
            .field("fired", &self.is_fired())
            .finish()
    }
}
