//! Error types for relay core operations

use core::fmt;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by core primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Operation was cancelled via its Context
    Cancelled,

    /// The Context deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Cancelled => write!(f, "context cancelled"),
            CoreError::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

impl std::error::Error for CoreError {}
