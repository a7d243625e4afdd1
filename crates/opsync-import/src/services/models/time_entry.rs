use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use opsync_client::ExternalRecord;
use opsync_core::{SyncError, SyncModel, SyncResult};
use opsync_entities::time_entries;

use super::{
    formatted_text, linked_record_id, parse_date_field, parse_duration_hours,
    required_linked_record_id,
};
use crate::context::ImportContext;
use crate::services::db_err;
use crate::services::engine::{ModelImporter, WriteOptions};
use crate::services::links::{
    LinkDependency, OPTIONAL_WORK_PACKAGE_LINK, PROJECT_LINK, USER_LINK,
};

const TIME_ENTRY_DEPS: &[LinkDependency] = &[PROJECT_LINK, OPTIONAL_WORK_PACKAGE_LINK, USER_LINK];

/// Imports spent-time entries. The work-package relation is optional: time
/// can be booked directly on a project.
pub struct TimeEntryImporter;

#[async_trait]
impl ModelImporter for TimeEntryImporter {
    fn model(&self) -> SyncModel {
        SyncModel::TimeEntry
    }

    fn dependencies(&self) -> &'static [LinkDependency] {
        TIME_ENTRY_DEPS
    }

    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        _options: &WriteOptions,
    ) -> SyncResult<i32> {
        let project_id =
            required_linked_record_id(ctx, record, &PROJECT_LINK, SyncModel::TimeEntry).await?;
        let user_id =
            required_linked_record_id(ctx, record, &USER_LINK, SyncModel::TimeEntry).await?;
        let task_id = linked_record_id(ctx, record, &OPTIONAL_WORK_PACKAGE_LINK).await?;

        let spent_on = parse_date_field(record, "spentOn").ok_or_else(|| {
            SyncError::Backend(format!(
                "time entry {} has no usable spentOn date",
                record.external_id()
            ))
        })?;
        let hours = record
            .get_str("hours")
            .and_then(parse_duration_hours)
            .unwrap_or(0.0);
        let comment = formatted_text(record, "comment");

        match existing {
            Some(id) => {
                let entry = time_entries::Entity::find_by_id(id)
                    .one(ctx.db.as_ref())
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        SyncError::Database(format!("binding points at missing time entry {}", id))
                    })?;

                let mut entry: time_entries::ActiveModel = entry.into();
                entry.user_id = Set(user_id);
                entry.task_id = Set(task_id);
                entry.project_id = Set(project_id);
                entry.spent_on = Set(spent_on);
                entry.hours = Set(hours);
                entry.comment = Set(comment);
                let updated = entry.update(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(updated.id)
            }
            None => {
                let entry = time_entries::ActiveModel {
                    user_id: Set(user_id),
                    task_id: Set(task_id),
                    project_id: Set(project_id),
                    spent_on: Set(spent_on),
                    hours: Set(hours),
                    comment: Set(comment),
                    created_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let created = entry.insert(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(created.id)
            }
        }
    }
}
