//! Configuration management utilities

use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Tunables for the import job worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Maximum executions of one job before it is dropped.
    pub max_attempts: u32,
    /// Base delay between retries of a retryable failure, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Timeout for avatar downloads, in seconds.
    pub avatar_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 500,
            avatar_timeout_secs: 10,
        }
    }
}
