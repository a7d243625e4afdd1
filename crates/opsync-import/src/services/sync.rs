//! Sync service facade
//!
//! The operations the host application's cron/command surface calls, plus
//! the per-job entry points the listener uses. Builds an [`ImportContext`]
//! per backend and delegates to the engine and batch importers.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::EntityTrait;

use opsync_client::{BackendAdapter, ExternalRecord, Filter, OpenProjectClient};
use opsync_core::{
    ImportAvatarJob, ImportRecordJob, JobQueue, SyncError, SyncModel, SyncResult, WorkerSettings,
};
use opsync_database::DbConnection;
use opsync_entities::backends;

use super::batch::{ActivityBatchImporter, BatchImporter, JobOptions, ProjectBatchImporter};
use super::db_err;
use super::engine::{ImportEngine, ImportInput, ImportOutcome};
use super::image::ImageImporter;
use crate::context::ImportContext;

/// Builds a backend adapter for a backend row. Tests substitute in-memory
/// fakes through this seam.
pub type AdapterFactory =
    Arc<dyn Fn(&backends::Model) -> SyncResult<Arc<dyn BackendAdapter>> + Send + Sync>;

pub struct SyncService {
    db: Arc<DbConnection>,
    queue: Arc<dyn JobQueue>,
    engine: Arc<ImportEngine>,
    adapters: AdapterFactory,
    settings: WorkerSettings,
}

impl SyncService {
    /// Service talking HTTP to each backend's configured API.
    pub fn new(db: Arc<DbConnection>, queue: Arc<dyn JobQueue>) -> Self {
        Self::with_adapter_factory(
            db,
            queue,
            Arc::new(|backend| {
                let client = OpenProjectClient::new(&backend.api_url, &backend.api_key)?;
                Ok(Arc::new(client) as Arc<dyn BackendAdapter>)
            }),
        )
    }

    pub fn with_adapter_factory(
        db: Arc<DbConnection>,
        queue: Arc<dyn JobQueue>,
        adapters: AdapterFactory,
    ) -> Self {
        Self {
            db,
            queue,
            engine: Arc::new(ImportEngine::with_default_importers()),
            adapters,
            settings: WorkerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn engine(&self) -> &ImportEngine {
        &self.engine
    }

    /// Assemble the context for one backend.
    pub async fn context_for(&self, backend_id: i32) -> SyncResult<ImportContext> {
        let backend = backends::Entity::find_by_id(backend_id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| SyncError::Configuration(format!("no backend with id {}", backend_id)))?;

        let adapter = (self.adapters)(&backend)?;
        Ok(ImportContext::new(
            Arc::clone(&self.db),
            backend,
            adapter,
            Arc::clone(&self.queue),
        ))
    }

    /// Import the backend's active projects, reconcile archival state, and
    /// bootstrap the dependent work-package and time-entry batch imports.
    pub async fn import_projects(&self, backend_id: i32, delay: bool) -> SyncResult<()> {
        let ctx = self.context_for(backend_id).await?;
        ProjectBatchImporter::run(
            &self.engine,
            &ctx,
            vec![Filter::eq("active", "t")],
            None,
            true,
            &JobOptions { delay },
        )
        .await
    }

    pub async fn import_project_work_packages(
        &self,
        backend_id: i32,
        delay: bool,
    ) -> SyncResult<u64> {
        let ctx = self.context_for(backend_id).await?;
        BatchImporter::run(
            &self.engine,
            &ctx,
            SyncModel::Task,
            Vec::new(),
            None,
            &JobOptions { delay },
        )
        .await
    }

    pub async fn import_project_time_entries(
        &self,
        backend_id: i32,
        delay: bool,
    ) -> SyncResult<u64> {
        let ctx = self.context_for(backend_id).await?;
        BatchImporter::run(
            &self.engine,
            &ctx,
            SyncModel::TimeEntry,
            Vec::new(),
            None,
            &JobOptions { delay },
        )
        .await
    }

    /// Import the full activity stream of one work package, inline.
    pub async fn import_activities(
        &self,
        backend_id: i32,
        work_package_external_id: &str,
    ) -> SyncResult<u64> {
        let ctx = self.context_for(backend_id).await?;
        ActivityBatchImporter::run(
            &self.engine,
            &ctx,
            work_package_external_id,
            &JobOptions::inline(),
        )
        .await
    }

    /// Import one record by external id.
    pub async fn import_single(
        &self,
        backend_id: i32,
        model: SyncModel,
        external_id: &str,
        force: bool,
    ) -> SyncResult<ImportOutcome> {
        let ctx = self.context_for(backend_id).await?;
        self.engine
            .run(&ctx, model, ImportInput::ExternalId(external_id.to_string()), force)
            .await
    }

    /// Execute a queued record-import job.
    pub async fn import_record_job(&self, job: &ImportRecordJob) -> SyncResult<ImportOutcome> {
        let ctx = self.context_for(job.backend_id).await?;
        let input = match &job.record {
            Some(value) => {
                ImportInput::Record(ExternalRecord::from_value(value.clone()).map_err(SyncError::from)?)
            }
            None => ImportInput::ExternalId(job.external_id.clone()),
        };
        self.engine.run(&ctx, job.model, input, job.force).await
    }

    /// Execute a queued avatar-import job.
    pub async fn import_avatar(&self, job: &ImportAvatarJob) -> SyncResult<String> {
        let ctx = self.context_for(job.backend_id).await?;
        ImageImporter::run(
            &ctx,
            &job.url,
            job.user_id,
            Duration::from_secs(self.settings.avatar_timeout_secs),
        )
        .await
    }
}
