//! Common error types used across all Opsync services

use thiserror::Error;

use crate::SyncModel;

/// Failures an import call can surface to the job layer.
///
/// Skip-worthy conditions (stale record, filtered activity, invalid image)
/// are NOT errors; they are returned as outcomes so batch processing of
/// independent records is unaffected. Everything here either aborts the job
/// permanently or signals the job layer to retry, per [`SyncError::is_retryable`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// The external entity no longer exists on the backend. Recovered
    /// locally by the engine; callers only see it from raw adapter calls.
    #[error("record no longer exists on the backend: {model} {external_id}")]
    RecordMissing {
        model: SyncModel,
        external_id: String,
    },

    /// A required link relation is absent from the record. A data-integrity
    /// failure; retrying cannot fix it.
    #[error("missing required link \"{link}\" on {model} record {external_id}")]
    MissingDependency {
        link: &'static str,
        model: SyncModel,
        external_id: String,
    },

    /// The advisory import lock is held by another worker.
    #[error("import lock unavailable: {0}")]
    LockContention(String),

    /// Transient network failure (timeout, connection reset).
    #[error("transient network failure: {0}")]
    NetworkRetryable(String),

    /// Non-transient backend failure (protocol error, unexpected payload).
    #[error("backend error: {0}")]
    Backend(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether the job layer should re-run the failed call with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::LockContention(_) | SyncError::NetworkRetryable(_)
        )
    }
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SyncError::LockContention("import(op, 1, task, 7)".into()).is_retryable());
        assert!(SyncError::NetworkRetryable("timeout".into()).is_retryable());

        assert!(!SyncError::RecordMissing {
            model: SyncModel::Task,
            external_id: "7".into(),
        }
        .is_retryable());
        assert!(!SyncError::MissingDependency {
            link: "project",
            model: SyncModel::Task,
            external_id: "7".into(),
        }
        .is_retryable());
        assert!(!SyncError::Database("locked".into()).is_retryable());
    }
}
