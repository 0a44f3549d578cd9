//! Error types for cursor execution.
//!
//! Every failure travels through the same channel as cursor results: a
//! `Result<CursorResult<T>, CursorError>`. Caller mistakes are reported as
//! `InvalidArgument` before any I/O happens; I/O, engine and evaluation
//! failures are wrapped into `Failure` with their contextual key-value pairs.

pub mod internal;

pub use internal::{EvaluationError, StoreError};

use error_stack::Report;
use strata_proto::DecodeError;
use thiserror::Error;

/// Marker context for failures that cross the cursor boundary.
/// The actual error chain is preserved in the Report via error-stack.
#[derive(Debug, Error)]
#[error("internal error")]
pub struct InternalError;

/// Error type of the cursor channel.
///
/// Returned from: `Cursor::next`, cursor constructors and plan execution
#[derive(Debug, Error)]
pub enum CursorError {
    /// The caller supplied something unusable; retrying will not help
    #[error("invalid argument: {0}")]
    InvalidArgument(ArgumentError),

    /// `next` was called after the cursor already failed
    #[error("cursor is not usable after a failure")]
    Unusable,

    /// `next` was called after `close`
    #[error("cursor is closed")]
    Closed,

    /// I/O or evaluation failure - use `.diagnostic()` for details
    #[error("{0:?}")]
    Failure(Report<InternalError>),
}

impl CursorError {
    pub fn invalid_argument(message: impl Into<String>) -> Self { CursorError::InvalidArgument(ArgumentError::new(message)) }

    /// Wrap a lower-level error as a fatal failure. This is the one place a
    /// failure is logged; the cursors it passes through only record it.
    pub fn failure<E>(err: E) -> Self
    where E: std::error::Error + Send + Sync + 'static {
        tracing::warn!(error = %err, "cursor failure");
        CursorError::Failure(Report::new(err).change_context(InternalError))
    }

    /// A continuation handed in by the caller could not be decoded
    pub fn invalid_continuation(err: DecodeError) -> Self {
        CursorError::invalid_argument("continuation could not be decoded").with_log_info("cause", err)
    }

    /// Add a contextual key-value pair (index name, query, offending record, ...)
    pub fn with_log_info(self, key: &str, value: impl std::fmt::Display) -> Self {
        match self {
            CursorError::InvalidArgument(arg) => CursorError::InvalidArgument(arg.with_log_info(key, value)),
            CursorError::Failure(report) => CursorError::Failure(report.attach_printable(format!("{key}={value}"))),
            other => other,
        }
    }

    pub fn is_invalid_argument(&self) -> bool { matches!(self, CursorError::InvalidArgument(_)) }

    /// Get diagnostic string if this is a Failure
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::Failure(report) => Some(format!("{report:?}")),
            _ => None,
        }
    }
}

impl From<StoreError> for CursorError {
    fn from(err: StoreError) -> Self { CursorError::failure(err) }
}

impl From<EvaluationError> for CursorError {
    fn from(err: EvaluationError) -> Self { CursorError::failure(err) }
}

/// A caller error with the log info needed to diagnose it without a retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentError {
    pub message: String,
    pub log_info: Vec<(String, String)>,
}

impl ArgumentError {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into(), log_info: Vec::new() } }

    pub fn with_log_info(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.log_info.push((key.to_string(), value.to_string()));
        self
    }

    pub fn log_value(&self, key: &str) -> Option<&str> { self.log_info.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()) }
}

impl std::fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for (key, value) in &self.log_info {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}
