//! # rerror — Reply Error
//!
//! A zero-dependency, structured reply error with stable `i32` codes,
//! human-readable text and a connection-error predicate.
//!
//! ## Design
//!
//! `Rerror` is the record every call surfaces on failure:
//!
//! - **code**: stable numeric identifier. Never renumbered once assigned.
//! - **message**: short fixed text, usually derived from the code.
//! - **reason**: free-form diagnostic string supplied by the failure site.
//!
//! Framework codes live below [`CODE_USER_MIN`]. Application codes start
//! at 1000.
//!
//! ## Quick Start
//!
//! ```rust
//! use rerror::{Rerror, is_conn_rerror, code_text, CODE_DIAL_FAILED, CODE_NOT_FOUND};
//!
//! let dial = Rerror::from_code(CODE_DIAL_FAILED).with_reason("connect refused");
//! assert_eq!(dial.message(), "Dial Failed");
//! assert!(is_conn_rerror(Some(&dial)));
//!
//! let missing = Rerror::from_code(CODE_NOT_FOUND);
//! assert!(!is_conn_rerror(Some(&missing)));
//! assert_eq!(code_text(CODE_NOT_FOUND), "Not Found");
//! ```
//!
//! ## Singletons
//!
//! Every framework code has a preconstructed `static` record
//! (`RERR_DIAL_FAILED`, `RERR_CONN_CLOSED`, ...). They borrow `'static`
//! text, so `clone()` never allocates.
//!
//! ## Dependencies
//!
//! None.

mod codes;
mod error;

// ── Public API ────────────────────────────────────────────────────

pub use codes::*;
pub use error::{
    is_conn_rerror, Rerror, RERR_BAD_PACKET, RERR_CONN_CLOSED, RERR_DIAL_FAILED,
    RERR_HANDLE_TIMEOUT, RERR_NOT_FOUND, RERR_PTYPE_NOT_ALLOWED, RERR_UNKNOWN_ERROR,
    RERR_WRITE_FAILED,
};

/// Convenience Result alias.
pub type RResult<T> = Result<T, Rerror>;
