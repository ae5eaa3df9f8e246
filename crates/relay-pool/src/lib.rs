//! # relay-pool — admission controller
//!
//! `GoPool` is the default `Dispatcher`: it runs each accepted task on an
//! OS thread, spawning workers on demand up to a fixed bound and letting
//! them go after an idle period.
//!
//! ```text
//!  submit(task)
//!      │
//!      ├── idle worker parked? ──yes──▶ hand task over, wake it
//!      │
//!      ├── workers < max? ─────yes──▶ spawn worker with task
//!      │
//!      └── otherwise ─────────────────▶ reject (false)
//! ```
//!
//! Workers that finish a task park themselves on the idle stack (LIFO, so
//! hot workers are reused first). A worker left idle for `idle_duration`
//! removes itself and exits.

pub mod go_pool;

pub use go_pool::GoPool;
pub use relay_core::dispatch::{Dispatcher, Task, RETRY_BACKOFF};
