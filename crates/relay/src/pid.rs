//! Process identifier announcement

use nix::unistd::getpid;
use relay_core::{kinfo, OnceFlag};

static PID_ONCE: OnceFlag = OnceFlag::new();

/// Log the process PID at info level, once per process.
///
/// Returns `true` for the call that printed it.
pub fn print_pid_once() -> bool {
    PID_ONCE.call_once(|| kinfo!("the current process PID: {}", getpid()))
}
