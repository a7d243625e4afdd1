use opsync_core::{SyncError, SyncModel};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The requested entity returned 404; it no longer exists remotely.
    #[error("record not found on backend: {model} {external_id}")]
    RecordMissing {
        model: SyncModel,
        external_id: String,
    },

    /// Timeout or connection failure; worth retrying later.
    #[error("transient network failure: {0}")]
    NetworkRetryable(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Http { status: u16, url: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("invalid backend configuration: {0}")]
    Configuration(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Classify a reqwest failure; timeouts and connection errors are the
    /// retryable ones, everything else is a hard backend failure.
    pub fn from_request_error(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ClientError::NetworkRetryable(err.to_string())
        } else {
            ClientError::Decode(err.to_string())
        }
    }
}

impl From<ClientError> for SyncError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::RecordMissing { model, external_id } => {
                SyncError::RecordMissing { model, external_id }
            }
            ClientError::NetworkRetryable(msg) => SyncError::NetworkRetryable(msg),
            ClientError::Http { status, url } => {
                SyncError::Backend(format!("HTTP {} from {}", status, url))
            }
            ClientError::Decode(msg) => SyncError::Backend(msg),
            ClientError::Configuration(msg) => SyncError::Configuration(msg),
        }
    }
}
