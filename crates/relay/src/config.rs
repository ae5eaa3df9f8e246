//! Peer configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay::PeerConfig;
//!
//! // Defaults with env overrides, then programmatic tweaks
//! let config = PeerConfig::from_env()
//!     .max_tasks(4096)
//!     .default_timeout(Duration::from_secs(3));
//! config.apply()?;
//! ```

use std::time::Duration;

use relay_call::{go_pull, NetPullCmd};
use relay_core::constants::{DEFAULT_MAX_TASKS, DEFAULT_TASK_IDLE_MS};
use relay_core::env::{env_get, env_get_bool};
use relay_core::{Args, Context, Packet};
use rerror::Rerror;

use crate::global::{gopool, set_gopool};
use crate::pid::print_pid_once;

/// Settings for one peer: admission bounds and call behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Maximum tasks running concurrently on the global pool
    pub max_tasks: usize,
    /// How long an idle worker lingers before it is reclaimed
    pub task_idle: Duration,
    /// Measure round-trip time of pulls
    pub count_time: bool,
    /// Deadline applied to pulls whose context has none (zero: no deadline)
    pub default_timeout: Duration,
    /// Announce the process PID once when applied
    pub print_pid: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PeerConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `RELAY_MAX_TASKS` - Global pool bound
    /// - `RELAY_TASK_IDLE_MS` - Worker idle period in milliseconds
    /// - `RELAY_COUNT_TIME` - Measure pull cost time (0/1)
    /// - `RELAY_DEFAULT_TIMEOUT_MS` - Default pull deadline in milliseconds
    /// - `RELAY_PRINT_PID` - Print the PID on apply (0/1)
    pub fn from_env() -> Self {
        let defaults = Self::new();
        Self {
            max_tasks: env_get("RELAY_MAX_TASKS", defaults.max_tasks),
            task_idle: Duration::from_millis(env_get(
                "RELAY_TASK_IDLE_MS",
                DEFAULT_TASK_IDLE_MS,
            )),
            count_time: env_get_bool("RELAY_COUNT_TIME", defaults.count_time),
            default_timeout: Duration::from_millis(env_get("RELAY_DEFAULT_TIMEOUT_MS", 0)),
            print_pid: env_get_bool("RELAY_PRINT_PID", defaults.print_pid),
        }
    }

    /// Create config with library defaults only (no env override).
    pub fn new() -> Self {
        Self {
            max_tasks: DEFAULT_MAX_TASKS,
            task_idle: Duration::from_millis(DEFAULT_TASK_IDLE_MS),
            count_time: false,
            default_timeout: Duration::ZERO,
            print_pid: true,
        }
    }

    pub fn max_tasks(mut self, n: usize) -> Self {
        self.max_tasks = n;
        self
    }

    pub fn task_idle(mut self, d: Duration) -> Self {
        self.task_idle = d;
        self
    }

    pub fn count_time(mut self, enable: bool) -> Self {
        self.count_time = enable;
        self
    }

    pub fn default_timeout(mut self, d: Duration) -> Self {
        self.default_timeout = d;
        self
    }

    pub fn print_pid(mut self, enable: bool) -> Self {
        self.print_pid = enable;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tasks == 0 {
            return Err(ConfigError::InvalidValue("max_tasks must be > 0"));
        }
        if self.task_idle.is_zero() {
            return Err(ConfigError::InvalidValue("task_idle must be > 0"));
        }
        Ok(())
    }

    /// Install this configuration process-wide.
    ///
    /// Replaces the global pool and, if enabled, prints the PID once.
    /// Call before the first dispatch.
    pub fn apply(&self) -> Result<(), ConfigError> {
        self.validate()?;
        set_gopool(self.max_tasks, self.task_idle);
        if self.print_pid {
            print_pid_once();
        }
        Ok(())
    }

    /// A fresh call context carrying `default_timeout`, if any.
    pub fn new_context(&self) -> Context {
        if self.default_timeout.is_zero() {
            Context::new()
        } else {
            Context::with_timeout(self.default_timeout)
        }
    }

    /// Start a pull on the global pool.
    ///
    /// A packet whose context has no deadline gets `default_timeout`
    /// layered on as a child context.
    pub fn pull<R, F>(&self, mut output: Packet, exchange: F) -> NetPullCmd<R>
    where
        R: Send + Sync + 'static,
        F: FnOnce(&Packet, &Context) -> Result<(R, Args), Rerror> + Send + 'static,
    {
        if !self.default_timeout.is_zero() && output.context().deadline().is_none() {
            let ctx = output.context().child_with_timeout(self.default_timeout);
            output.set_context(ctx);
        }
        go_pull(&*gopool(), output, self.count_time, exchange)
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("Relay Peer Configuration:");
        eprintln!("  max_tasks:        {}", self.max_tasks);
        eprintln!("  task_idle:        {:?}", self.task_idle);
        eprintln!("  count_time:       {}", self.count_time);
        eprintln!("  default_timeout:  {:?}", self.default_timeout);
        eprintln!("  print_pid:        {}", self.print_pid);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
