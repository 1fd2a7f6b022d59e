//! Error types for markstream.
//!
//! Library crates use [`MarkstreamError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! The renderer core itself never fails; errors here come from configuration,
//! I/O, and host-side input limits.

use std::path::PathBuf;

/// Top-level error type for all markstream operations.
#[derive(Debug, thiserror::Error)]
pub enum MarkstreamError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid value supplied by a caller (flag, config field, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Input nested lists deeper than the host allows.
    #[error("list nesting depth {depth} exceeds limit of {limit}")]
    ListDepthExceeded { depth: usize, limit: usize },

    /// The renderer already rejected this stream; the instance must be discarded.
    #[error("stream was rejected and no longer accepts input")]
    Rejected,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarkstreamError>;

impl MarkstreamError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
