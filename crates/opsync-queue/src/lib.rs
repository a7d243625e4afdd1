//! Implementation of job queue using tokio channels
//! This crate implements the JobQueue trait from opsync-core using tokio's
//! broadcast and mpsc channels.

pub mod jobs;
pub mod queue;

pub use jobs::*;
pub use queue::*;

// Re-export core traits for convenience
pub use opsync_core::{JobQueue, JobReceiver, QueueError};
