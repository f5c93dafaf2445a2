//! Errors surfaced by SDK pipeline operations.
//!
//! Span mutators never fail; the only externally visible failure channel is
//! the result of explicit `force_flush`/`shutdown` calls (and the export
//! results handed back to them).

use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for SDK pipeline operations.
pub type SdkResult = Result<(), SdkError>;

/// Errors returned by flush, shutdown and export operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdkError {
    /// The operation targeted a component that has already been shut down.
    #[error("shutdown already invoked")]
    AlreadyShutdown,

    /// The operation did not complete within the allotted time.
    ///
    /// Timing out does not roll back partial progress; it is a bounded wait,
    /// not a transactional abort.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation failed for the contained reason.
    #[error("operation failed: {0}")]
    InternalFailure(String),
}

impl<T> From<PoisonError<T>> for SdkError {
    fn from(err: PoisonError<T>) -> Self {
        SdkError::InternalFailure(err.to_string())
    }
}
