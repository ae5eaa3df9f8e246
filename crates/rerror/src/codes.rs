//! Framework reply error codes.
//!
//! # Code Ranges
//!
//! | Range        | Purpose                                   |
//! |--------------|-------------------------------------------|
//! | `-1`         | `CODE_UNKNOWN_ERROR` — unclassified       |
//! | `0 — 999`    | Framework reserved (HTTP-flavoured)       |
//! | `1000+`      | **User application space** (free for all) |
//!
//! Only dial-failed and connection-closed describe the link itself.
//! Everything else is a protocol or application failure and must not
//! trigger a reconnect.

// ── Framework codes ───────────────────────────────────────────────

pub const CODE_UNKNOWN_ERROR: i32 = -1;
pub const CODE_CONN_CLOSED: i32 = 102;
pub const CODE_WRITE_FAILED: i32 = 104;
pub const CODE_DIAL_FAILED: i32 = 105;
pub const CODE_BAD_PACKET: i32 = 400;
pub const CODE_NOT_FOUND: i32 = 404;
pub const CODE_PTYPE_NOT_ALLOWED: i32 = 405;
pub const CODE_HANDLE_TIMEOUT: i32 = 408;

/// First code available to applications.
pub const CODE_USER_MIN: i32 = 1000;

/// Text rendered for any code outside the framework set.
pub const UNKNOWN_ERROR_TEXT: &str = "Unknown Error";

/// Returns the fixed text for a framework code.
///
/// Total: any code outside the framework set, including
/// [`CODE_UNKNOWN_ERROR`], yields `"Unknown Error"`.
pub const fn code_text(code: i32) -> &'static str {
    match code {
        CODE_DIAL_FAILED => "Dial Failed",
        CODE_CONN_CLOSED => "Connection Closed",
        CODE_WRITE_FAILED => "Write Failed",
        CODE_BAD_PACKET => "Bad Packet",
        CODE_NOT_FOUND => "Not Found",
        CODE_HANDLE_TIMEOUT => "Handle Timeout",
        CODE_PTYPE_NOT_ALLOWED => "Packet Type Not Allowed",
        _ => UNKNOWN_ERROR_TEXT,
    }
}

/// Whether `code` belongs to the link itself (dial failure or closed connection).
#[inline]
pub const fn is_conn_code(code: i32) -> bool {
    matches!(code, CODE_DIAL_FAILED | CODE_CONN_CLOSED)
}

/// Whether `code` lies in the application range.
#[inline]
pub const fn is_user_code(code: i32) -> bool {
    code >= CODE_USER_MIN
}
