//! # relay — RPC control layer
//!
//! Regulates how much concurrent work the process runs, represents
//! in-flight pulls as inspectable, cancellable handles, and classifies
//! failures so callers can tell connection trouble from application
//! errors.
//!
//! ## Quick Start
//!
//! ```ignore
//! use relay::{PeerConfig, Packet, PullCmd, Args};
//!
//! let config = PeerConfig::from_env().max_tasks(256).count_time(true);
//! config.apply()?;
//!
//! let cmd = config.pull(Packet::new().with_uri("/home/get"), |out, ctx| {
//!     // send `out`, wait for the reply while watching `ctx`
//!     Ok(("hello".to_string(), Args::new()))
//! });
//!
//! match cmd.result() {
//!     (Some(reply), _) => println!("{} in {:?}", reply, cmd.cost_time()),
//!     (_, Some(e)) if relay::is_conn_rerror(Some(e)) => { /* redial */ }
//!     (_, Some(e)) => eprintln!("{}", e),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                               │
//! │        PeerConfig::pull(), go(), anyway_go()                │
//! └─────────────────────────────────────────────────────────────┘
//!               │                              │
//!               ▼                              ▼
//! ┌───────────────────────────┐  ┌───────────────────────────────┐
//! │   relay-call              │  │   relay-pool                  │
//! │   NetPullCmd ◄─ Completer │  │   GoPool (global, swappable)  │
//! └───────────────────────────┘  └───────────────────────────────┘
//!               │                              │
//!               └──────────────┬───────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   relay-core: Packet, Args, Context, Dispatcher, kprint     │
//! │   rerror:     Rerror, codes, is_conn_rerror                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod global;
pub mod pid;
pub mod tls;

pub use config::{ConfigError, PeerConfig};
pub use global::{anyway_go, go, gopool, set_gopool};
pub use pid::print_pid_once;
pub use tls::{new_tls_config_from_file, TlsError};

// Re-export core types
pub use relay_core::{
    acquire_args, acquire_packet, release_args, release_packet, Args, Context, CoreError,
    CoreResult, Dispatcher, Done, OnceFlag, Packet, Ptype, Task,
};

// Re-export kprint macros for debug logging
pub use relay_core::{kdebug, kerror, kinfo, kprintln, ktrace, kwarn};
pub use relay_core::kprint::{
    init as init_logging, set_flush_enabled, set_log_level, set_time_enabled, LogLevel,
};

// Re-export env utilities
pub use relay_core::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

pub use relay_call::{go_pull, FakePullCmd, NetPullCmd, PullCmd, PullCompleter};
pub use relay_pool::GoPool;
pub use rerror::*;
