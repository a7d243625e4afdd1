pub mod batch;
pub mod binder;
pub mod engine;
pub mod image;
pub mod links;
pub mod lock;
pub mod models;
pub mod sync;

pub use batch::{ActivityBatchImporter, BatchImporter, JobOptions, ProjectBatchImporter};
pub use binder::Binder;
pub use engine::{ImportEngine, ImportInput, ImportOutcome, ModelImporter, WriteOptions};
pub use image::ImageImporter;
pub use links::LinkDependency;
pub use lock::{LockGuard, LockRegistry};
pub use sync::SyncService;

use opsync_core::SyncError;

/// Shorthand used by every service touching sea-orm.
pub(crate) fn db_err(err: sea_orm::DbErr) -> SyncError {
    SyncError::Database(err.to_string())
}
