//! # relay-core
//!
//! Core types shared by every relay crate. No OS-specific code and no
//! transport logic lives here.
//!
//! ## Modules
//!
//! - `ptype` - Packet type tag (pull, reply, push)
//! - `args` - Ordered multi-valued metadata container + pool
//! - `packet` - In-memory request/response value + pool
//! - `context` - Cancellation and deadline context
//! - `once` - One-shot initialization flag
//! - `dispatch` - Admission controller trait (`Dispatcher`)
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod ptype;
pub mod args;
pub mod packet;
pub mod context;
pub mod once;
pub mod dispatch;
pub mod error;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use ptype::Ptype;
pub use args::{acquire_args, release_args, Args};
pub use packet::{acquire_packet, release_packet, Packet};
pub use context::{Context, Done};
pub use once::OnceFlag;
pub use dispatch::{Dispatcher, Task, RETRY_BACKOFF};
pub use error::{CoreError, CoreResult};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

/// Constants shared across crates
pub mod constants {
    /// Memory budget assumed per concurrently running task (8 KiB)
    pub const TASK_MEMORY_BUDGET: usize = 8 * 1024;

    /// Worst-case memory the default admission bound allows for (8 GiB)
    pub const DEFAULT_MEMORY_CAP: u64 = 8 << 30;

    /// Default admission bound: `DEFAULT_MEMORY_CAP / TASK_MEMORY_BUDGET`
    pub const DEFAULT_MAX_TASKS: usize = (DEFAULT_MEMORY_CAP / TASK_MEMORY_BUDGET as u64) as usize;

    /// Default idle period before an unused worker is reclaimed (ms)
    pub const DEFAULT_TASK_IDLE_MS: u64 = 10_000;

    /// Capacity of the packet and args free lists
    pub const POOL_CAPACITY: usize = 1024;
}
