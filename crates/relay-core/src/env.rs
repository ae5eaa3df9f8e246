//! Typed environment lookups
//!
//! Used by `PeerConfig::from_env()` and the logging setup. Values are
//! trimmed before parsing; a value that does not parse is treated as
//! unset.
//!
//! ```ignore
//! use relay_core::env::{env_get, env_get_bool};
//!
//! let max: usize = env_get("RELAY_MAX_TASKS", 1024);
//! let count_time = env_get_bool("RELAY_COUNT_TIME", false);
//! ```

use std::str::FromStr;

fn raw(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Boolean spellings accepted in the environment, case-insensitive.
fn parse_bool(s: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["1", "true", "yes", "on"];
    const FALSE: [&str; 4] = ["0", "false", "no", "off"];
    let s = s.trim();
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(s)) {
        Some(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(s)) {
        Some(false)
    } else {
        None
    }
}

/// `Some(T)` if `key` is set and parses.
#[inline]
pub fn env_get_opt<T: FromStr>(key: &str) -> Option<T> {
    raw(key).and_then(|v| v.trim().parse().ok())
}

/// `key` parsed as `T`, falling back to `default`.
#[inline]
pub fn env_get<T: FromStr>(key: &str, default: T) -> T {
    env_get_opt(key).unwrap_or(default)
}

/// `key` as a flag: 1/true/yes/on or 0/false/no/off. Anything else is `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    raw(key).as_deref().and_then(parse_bool).unwrap_or(default)
}

/// `key` verbatim, or `default`.
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    raw(key).unwrap_or_else(|| default.to_owned())
}

#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}
