//! Batch importers
//!
//! Iterate filtered collections from the backend and hand each record to the
//! per-record import, either inline or as a delayed job. The project variant
//! adds archival reconciliation and bootstraps the dependent batch imports;
//! the activity variant is scoped to one work package's activity stream.

use std::collections::HashSet;

use futures::TryStreamExt;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::{debug, info};

use opsync_client::{ExternalRecord, Filter};
use opsync_core::{
    ImportRecordJob, ImportTimeEntriesJob, ImportWorkPackagesJob, Job, SyncModel, SyncResult,
};
use opsync_entities::{projects, sync_bindings};

use super::db_err;
use super::engine::{ImportEngine, ImportInput};
use super::models::enqueue;
use crate::context::ImportContext;

/// How per-record imports are executed.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Enqueue each record as a separate job instead of importing inline.
    pub delay: bool,
}

impl JobOptions {
    pub fn delayed() -> Self {
        Self { delay: true }
    }

    pub fn inline() -> Self {
        Self { delay: false }
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::delayed()
    }
}

/// Dispatch one fetched record per the job options.
async fn import_record(
    engine: &ImportEngine,
    ctx: &ImportContext,
    model: SyncModel,
    record: ExternalRecord,
    job_options: &JobOptions,
) -> SyncResult<()> {
    if job_options.delay {
        enqueue(
            ctx,
            Job::ImportRecord(ImportRecordJob {
                backend_id: ctx.backend.id,
                model,
                external_id: record.external_id().to_string(),
                record: Some(record.into_value()),
                force: false,
            }),
        )
        .await
    } else {
        let outcome = Box::pin(engine.run(ctx, model, ImportInput::Record(record), false)).await?;
        debug!("Inline {} import: {}", model, outcome);
        Ok(())
    }
}

/// Generic batch importer over a filtered, paginated collection.
pub struct BatchImporter;

impl BatchImporter {
    /// Import every record the filters match. Returns the number of records
    /// dispatched (imported inline or enqueued).
    pub async fn run(
        engine: &ImportEngine,
        ctx: &ImportContext,
        model: SyncModel,
        filters: Vec<Filter>,
        offset: Option<u32>,
        job_options: &JobOptions,
    ) -> SyncResult<u64> {
        let page_size = ctx.backend.effective_page_size();
        let mut stream = ctx.adapter.get_collection(model, filters, page_size, offset);

        let mut dispatched = 0u64;
        while let Some(record) = stream.try_next().await? {
            import_record(engine, ctx, model, record, job_options).await?;
            dispatched += 1;
        }

        info!(
            "Dispatched {} {} records from backend {}",
            dispatched, model, ctx.backend.id
        );
        Ok(dispatched)
    }
}

/// Project batch importer with archival reconciliation.
pub struct ProjectBatchImporter;

impl ProjectBatchImporter {
    /// Import the active external projects.
    ///
    /// Reconciliation runs first, synchronously, and dependent batch imports
    /// are bootstrapped only afterwards: a work-package or time-entry import
    /// against a project that is archived remotely fails, so the ordering is
    /// a correctness requirement, not an optimization.
    pub async fn run(
        engine: &ImportEngine,
        ctx: &ImportContext,
        filters: Vec<Filter>,
        offset: Option<u32>,
        bootstrap: bool,
        job_options: &JobOptions,
    ) -> SyncResult<()> {
        let page_size = ctx.backend.effective_page_size();

        // The whole set is needed for the set difference below
        let records: Vec<ExternalRecord> = ctx
            .adapter
            .get_collection(SyncModel::Project, filters, page_size, offset)
            .try_collect()
            .await?;

        if ctx.backend.sync_project_status {
            Self::reconcile_archived(ctx, &records).await?;
        }

        for record in records {
            import_record(engine, ctx, SyncModel::Project, record, job_options).await?;
        }

        if bootstrap {
            Self::bootstrap(ctx).await?;
        }

        Ok(())
    }

    /// Archive bound projects that vanished from the external active set and
    /// reactivate ones that came back. Operates on the set difference over
    /// binding identity; processing order of the external records is
    /// irrelevant.
    async fn reconcile_archived(ctx: &ImportContext, records: &[ExternalRecord]) -> SyncResult<()> {
        let external_active: HashSet<&str> =
            records.iter().map(ExternalRecord::external_id).collect();

        let bindings = sync_bindings::Entity::find()
            .filter(sync_bindings::Column::BackendId.eq(ctx.backend.id))
            .filter(sync_bindings::Column::Model.eq(SyncModel::Project.as_str()))
            .all(ctx.db.as_ref())
            .await
            .map_err(db_err)?;

        let mut to_archive = Vec::new();
        let mut to_unarchive = Vec::new();
        for binding in &bindings {
            if external_active.contains(binding.external_id.as_str()) {
                to_unarchive.push(binding.record_id);
            } else {
                to_archive.push(binding.record_id);
            }
        }

        if !to_archive.is_empty() {
            let result = projects::Entity::update_many()
                .col_expr(projects::Column::Active, Expr::value(false))
                .filter(projects::Column::Id.is_in(to_archive))
                .filter(projects::Column::Active.eq(true))
                .exec(ctx.db.as_ref())
                .await
                .map_err(db_err)?;
            info!(
                "Archived {} projects no longer active on backend {}",
                result.rows_affected, ctx.backend.id
            );
        }

        if !to_unarchive.is_empty() {
            let result = projects::Entity::update_many()
                .col_expr(projects::Column::Active, Expr::value(true))
                .filter(projects::Column::Id.is_in(to_unarchive))
                .filter(projects::Column::Active.eq(false))
                .exec(ctx.db.as_ref())
                .await
                .map_err(db_err)?;
            if result.rows_affected > 0 {
                info!(
                    "Reactivated {} projects on backend {}",
                    result.rows_affected, ctx.backend.id
                );
            }
        }

        Ok(())
    }

    /// Schedule the batch imports that depend on the project set.
    async fn bootstrap(ctx: &ImportContext) -> SyncResult<()> {
        enqueue(
            ctx,
            Job::ImportWorkPackages(ImportWorkPackagesJob {
                backend_id: ctx.backend.id,
                delay: true,
            }),
        )
        .await?;
        enqueue(
            ctx,
            Job::ImportTimeEntries(ImportTimeEntriesJob {
                backend_id: ctx.backend.id,
                delay: true,
            }),
        )
        .await?;
        Ok(())
    }
}

/// Batch importer for one work package's activity stream.
pub struct ActivityBatchImporter;

impl ActivityBatchImporter {
    pub async fn run(
        engine: &ImportEngine,
        ctx: &ImportContext,
        work_package_external_id: &str,
        job_options: &JobOptions,
    ) -> SyncResult<u64> {
        let mut stream = ctx
            .adapter
            .get_work_package_activities(work_package_external_id.to_string(), None);

        let mut dispatched = 0u64;
        while let Some(record) = stream.try_next().await? {
            import_record(engine, ctx, SyncModel::Activity, record, job_options).await?;
            dispatched += 1;
        }

        debug!(
            "Dispatched {} activities for work package {}",
            dispatched, work_package_external_id
        );
        Ok(dispatched)
    }
}
