//! Core utilities and types shared across all Opsync crates

pub mod config;
pub mod error;
pub mod jobs;
pub mod model;
pub mod types;
mod constants;

// Re-export commonly used types
pub use config::*;
pub use constants::*;
pub use error::*;
pub use jobs::*;
pub use model::SyncModel;
pub use types::*;

// Re-export external dependencies
pub use anyhow;
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tokio;
pub use tracing;

// Re-export standard datetime type for use across all crates
pub use types::UtcDateTime;
