use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use crate::codes::{
    code_text, is_conn_code, CODE_BAD_PACKET, CODE_CONN_CLOSED, CODE_DIAL_FAILED,
    CODE_HANDLE_TIMEOUT, CODE_NOT_FOUND, CODE_PTYPE_NOT_ALLOWED, CODE_UNKNOWN_ERROR,
    CODE_WRITE_FAILED,
};

/// Reply error — the structured failure record surfaced by every call.
///
/// Immutable once built. The stored `message` is exactly what the
/// failure site supplied; [`code_text`] is consulted only when rendering
/// a record whose message is empty.
///
/// Text fields are `Cow<'static, str>` so that the framework singletons
/// can be built in const context and cloned without allocating.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rerror {
    code: i32,
    message: Cow<'static, str>,
    reason: Cow<'static, str>,
}

// ── Constructors ──────────────────────────────────────────────────

impl Rerror {
    /// Create a record from explicit parts. Nothing is derived or checked.
    pub fn new(
        code: i32,
        message: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            reason: reason.into(),
        }
    }

    /// Create a record whose message is the fixed text for `code`.
    ///
    /// ```
    /// use rerror::{Rerror, CODE_DIAL_FAILED};
    /// let err = Rerror::from_code(CODE_DIAL_FAILED);
    /// assert_eq!(err.message(), "Dial Failed");
    /// assert!(err.reason().is_empty());
    /// ```
    pub const fn from_code(code: i32) -> Self {
        Self {
            code,
            message: Cow::Borrowed(code_text(code)),
            reason: Cow::Borrowed(""),
        }
    }

    /// Return a copy carrying `reason` as its diagnostic detail.
    pub fn with_reason(&self, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            reason: reason.into(),
        }
    }
}

// ── Accessors ─────────────────────────────────────────────────────

impl Rerror {
    #[inline]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The stored message, verbatim.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The text used when rendering: the stored message, or the code text
    /// when no message was supplied.
    #[inline]
    pub fn display_text(&self) -> &str {
        if self.message.is_empty() {
            code_text(self.code)
        } else {
            &self.message
        }
    }

    /// `true` if this record describes a dial failure or a closed connection.
    #[inline]
    pub fn is_conn(&self) -> bool {
        is_conn_code(self.code)
    }
}

/// Determines whether an optional reply error is a connection error.
///
/// Upstream retry and reconnect logic keys off this predicate alone:
/// `true` means re-establish the link, `false` means surface the error.
/// An absent record is never a connection error.
#[inline]
pub fn is_conn_rerror(rerr: Option<&Rerror>) -> bool {
    rerr.is_some_and(Rerror::is_conn)
}

// ── Singletons ────────────────────────────────────────────────────

pub static RERR_UNKNOWN_ERROR: Rerror = Rerror::from_code(CODE_UNKNOWN_ERROR);
pub static RERR_DIAL_FAILED: Rerror = Rerror::from_code(CODE_DIAL_FAILED);
pub static RERR_CONN_CLOSED: Rerror = Rerror::from_code(CODE_CONN_CLOSED);
pub static RERR_WRITE_FAILED: Rerror = Rerror::from_code(CODE_WRITE_FAILED);
pub static RERR_BAD_PACKET: Rerror = Rerror::from_code(CODE_BAD_PACKET);
pub static RERR_NOT_FOUND: Rerror = Rerror::from_code(CODE_NOT_FOUND);
pub static RERR_PTYPE_NOT_ALLOWED: Rerror = Rerror::from_code(CODE_PTYPE_NOT_ALLOWED);
pub static RERR_HANDLE_TIMEOUT: Rerror = Rerror::from_code(CODE_HANDLE_TIMEOUT);

// ── std::error::Error ─────────────────────────────────────────────

impl Error for Rerror {}

// ── Display ───────────────────────────────────────────────────────

impl fmt::Display for Rerror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.display_text(), self.code)?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason)?;
        }
        Ok(())
    }
}

// ── Debug ─────────────────────────────────────────────────────────

impl fmt::Debug for Rerror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rerror")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("reason", &self.reason)
            .finish()
    }
}
