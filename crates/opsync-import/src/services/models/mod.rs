//! Model importers
//!
//! One [`ModelImporter`](super::engine::ModelImporter) implementation per
//! synced model. Mapping rules live next to the persistence code for each
//! entity; the shared helpers below cover the patterns every mapper needs
//! (link-relation resolution to local ids, formattable text fields, dates).

mod activity;
mod duration;
mod project;
mod task;
mod task_stage;
mod time_entry;
mod user;

pub use activity::ActivityImporter;
pub use duration::parse_duration_hours;
pub use project::ProjectImporter;
pub use task::TaskImporter;
pub use task_stage::TaskStageImporter;
pub use time_entry::TimeEntryImporter;
pub use user::UserImporter;

use std::sync::Arc;

use chrono::NaiveDate;
use opsync_client::{parse_link_relation, ExternalRecord};
use opsync_core::{Job, SyncError, SyncModel, SyncResult};

use super::binder::Binder;
use super::engine::ModelImporter;
use super::links::LinkDependency;
use crate::context::ImportContext;

/// Every importer this crate ships, for registry construction.
pub fn default_importers() -> Vec<Arc<dyn ModelImporter>> {
    vec![
        Arc::new(ProjectImporter),
        Arc::new(TaskStageImporter),
        Arc::new(UserImporter),
        Arc::new(TaskImporter),
        Arc::new(TimeEntryImporter),
        Arc::new(ActivityImporter),
    ]
}

/// Resolve a link relation to the bound local record id, if any.
pub(crate) async fn linked_record_id(
    ctx: &ImportContext,
    record: &ExternalRecord,
    link: &LinkDependency,
) -> SyncResult<Option<i32>> {
    match parse_link_relation(record.links(), link.key, link.endpoint) {
        Some(external_id) => Ok(Binder::to_internal(ctx, link.model, &external_id)
            .await?
            .map(|binding| binding.record_id)),
        None => Ok(None),
    }
}

/// Like [`linked_record_id`], but the relation and its binding must exist.
/// Dependency import runs before mapping, so a miss here is a data problem.
pub(crate) async fn required_linked_record_id(
    ctx: &ImportContext,
    record: &ExternalRecord,
    link: &LinkDependency,
    owner: SyncModel,
) -> SyncResult<i32> {
    linked_record_id(ctx, record, link)
        .await?
        .ok_or_else(|| SyncError::MissingDependency {
            link: link.key,
            model: owner,
            external_id: record.external_id().to_string(),
        })
}

/// Extract the raw text of a formattable field (`{"format": .., "raw": ..}`).
pub(crate) fn formatted_text(record: &ExternalRecord, field: &str) -> Option<String> {
    record
        .get(field)?
        .get("raw")?
        .as_str()
        .map(str::to_string)
}

/// Parse a plain `YYYY-MM-DD` date field.
pub(crate) fn parse_date_field(record: &ExternalRecord, field: &str) -> Option<NaiveDate> {
    record
        .get_str(field)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Enqueue a job from inside an importer hook.
pub(crate) async fn enqueue(ctx: &ImportContext, job: Job) -> SyncResult<()> {
    ctx.queue
        .send(job)
        .await
        .map_err(|e| SyncError::Internal(anyhow::anyhow!("failed to enqueue job: {}", e)))
}
