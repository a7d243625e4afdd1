//! Opsync import core
//!
//! This crate implements the record-import orchestration layer: a generic
//! per-record import state machine with dependency resolution, staleness
//! checks and advisory locking, batch importers over filtered collections,
//! and the background job listener that executes delayed imports with
//! retry-on-transient-failure semantics.
//!
//! # Architecture
//!
//! - **Engine**: the per-record state machine and the model-importer registry
//! - **Models**: one importer implementation per synced model
//! - **Batch**: collection iteration, project archival reconciliation,
//!   work-package activity streams
//! - **Listener**: queue subscriber executing import jobs
//!
//! The host application constructs a [`SyncService`] and either calls its
//! operations directly (cron surface) or starts a [`SyncJobListener`] and
//! feeds jobs through the queue.

pub mod context;
pub mod listener;
pub mod services;

pub use context::ImportContext;
pub use listener::SyncJobListener;
pub use services::{
    BatchImporter, Binder, ImageImporter, ImportEngine, ImportInput, ImportOutcome, JobOptions,
    LockRegistry, ModelImporter, SyncService, WriteOptions,
};
