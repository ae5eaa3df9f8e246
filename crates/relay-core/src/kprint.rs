//! Leveled stderr logging
//!
//! Every line is written while holding the stderr lock, so workers never
//! interleave partial lines. Settings live in one atomic byte: the level
//! in the low bits plus flush/time/initialized flags.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `RELAY_LOG_LEVEL` | `off`, `error`, `warn`, `info`, `debug`, `trace`, or 0-5 |
//! | `RELAY_FLUSH_EPRINT` | flush after every line |
//! | `RELAY_LOG_TIME` | prefix `+secs` since the first log line |
//!
//! ```ignore
//! use relay_core::{kinfo, kwarn};
//!
//! kinfo!("pool started: max={}", max);
//! kwarn!("task rejected: pool saturated");
//! ```
//!
//! Output: `[WARN ] +0.001532 <relay-worker-3> task rejected: pool saturated`

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use crate::env::{env_get_bool, env_get_opt};

/// Severity, most severe first
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Off,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Values above `Trace` saturate to `Trace`.
    pub fn from_u8(v: u8) -> Self {
        Self::ALL[usize::from(v.min(LogLevel::Trace as u8))]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "OFF",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return if n <= LogLevel::Trace as u8 {
                Ok(Self::from_u8(n))
            } else {
                Err(())
            };
        }
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

// Settings byte layout
const LEVEL_MASK: u8 = 0b0000_0111;
const FLUSH_BIT: u8 = 0b0000_1000;
const TIME_BIT: u8 = 0b0001_0000;
const INIT_BIT: u8 = 0b1000_0000;

static SETTINGS: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Read settings from the environment
///
/// Runs once, on the first log or setter call. Variables that are unset
/// keep the built-in defaults.
pub fn init() {
    let prev = SETTINGS.fetch_or(INIT_BIT, Ordering::AcqRel);
    if prev & INIT_BIT != 0 {
        return;
    }
    epoch();

    let mut bits = prev | INIT_BIT;
    if let Some(level) = env_get_opt::<LogLevel>("RELAY_LOG_LEVEL") {
        bits = (bits & !LEVEL_MASK) | level as u8;
    }
    bits = with_flag(bits, FLUSH_BIT, env_get_bool("RELAY_FLUSH_EPRINT", false));
    bits = with_flag(bits, TIME_BIT, env_get_bool("RELAY_LOG_TIME", false));
    SETTINGS.store(bits, Ordering::Release);
}

fn with_flag(bits: u8, flag: u8, on: bool) -> u8 {
    if on {
        bits | flag
    } else {
        bits & !flag
    }
}

#[inline]
fn settings() -> u8 {
    let bits = SETTINGS.load(Ordering::Acquire);
    if bits & INIT_BIT != 0 {
        return bits;
    }
    init();
    SETTINGS.load(Ordering::Acquire)
}

fn update(f: impl Fn(u8) -> u8) {
    settings();
    let _ = SETTINGS.fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| Some(f(b)));
}

#[inline]
pub fn log_level() -> LogLevel {
    LogLevel::from_u8(settings() & LEVEL_MASK)
}

pub fn set_log_level(level: LogLevel) {
    update(|b| (b & !LEVEL_MASK) | level as u8);
}

#[inline]
pub fn flush_enabled() -> bool {
    settings() & FLUSH_BIT != 0
}

pub fn set_flush_enabled(enabled: bool) {
    update(|b| with_flag(b, FLUSH_BIT, enabled));
}

#[inline]
pub fn time_enabled() -> bool {
    settings() & TIME_BIT != 0
}

/// Toggle the `+secs` prefix
pub fn set_time_enabled(enabled: bool) {
    update(|b| with_flag(b, TIME_BIT, enabled));
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

/// Write one line. `None` prints without any prefix and ignores the level.
#[doc(hidden)]
pub fn emit(level: Option<LogLevel>, args: fmt::Arguments<'_>) {
    let bits = settings();
    if let Some(level) = level {
        if !level_enabled(level) {
            return;
        }
    }

    let mut out = std::io::stderr().lock();
    if let Some(level) = level {
        let _ = write!(out, "[{:<5}] ", level);
        if bits & TIME_BIT != 0 {
            let _ = write!(out, "+{:.6} ", epoch().elapsed().as_secs_f64());
        }
        if let Some(name) = std::thread::current().name() {
            let _ = write!(out, "<{}> ", name);
        }
    }
    let _ = writeln!(out, "{}", args);
    if bits & FLUSH_BIT != 0 {
        let _ = out.flush();
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __klog {
    ($level:ident, $($arg:tt)*) => {
        $crate::kprint::emit(
            ::core::option::Option::Some($crate::kprint::LogLevel::$level),
            format_args!($($arg)*),
        )
    };
}

/// Unleveled line to stderr
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint::emit(::core::option::Option::None, format_args!(""))
    };
    ($($arg:tt)*) => {
        $crate::kprint::emit(::core::option::Option::None, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => { $crate::__klog!(Error, $($arg)*) };
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => { $crate::__klog!(Warn, $($arg)*) };
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => { $crate::__klog!(Info, $($arg)*) };
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => { $crate::__klog!(Debug, $($arg)*) };
}

/// Most verbose
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => { $crate::__klog!(Trace, $($arg)*) };
}
