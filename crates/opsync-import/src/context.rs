//! Import context
//!
//! Every import operation receives its collaborators explicitly: the
//! database handle, the backend row whose configuration governs the import,
//! the backend adapter and the job queue. Nothing reaches for ambient state.

use std::sync::Arc;

use opsync_client::BackendAdapter;
use opsync_core::JobQueue;
use opsync_database::DbConnection;
use opsync_entities::backends;

#[derive(Clone)]
pub struct ImportContext {
    pub db: Arc<DbConnection>,
    pub backend: backends::Model,
    pub adapter: Arc<dyn BackendAdapter>,
    pub queue: Arc<dyn JobQueue>,
}

impl ImportContext {
    pub fn new(
        db: Arc<DbConnection>,
        backend: backends::Model,
        adapter: Arc<dyn BackendAdapter>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            db,
            backend,
            adapter,
            queue,
        }
    }
}
