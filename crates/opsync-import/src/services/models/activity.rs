use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use opsync_client::ExternalRecord;
use opsync_core::{SyncError, SyncModel, SyncResult};
use opsync_entities::{messages, projects, tasks};

use super::{formatted_text, linked_record_id, required_linked_record_id};
use crate::context::ImportContext;
use crate::services::db_err;
use crate::services::engine::{ModelImporter, WriteOptions};
use crate::services::links::{LinkDependency, USER_LINK, WORK_PACKAGE_LINK};

const ACTIVITY_DEPS: &[LinkDependency] = &[WORK_PACKAGE_LINK, USER_LINK];

/// Fallback discriminator for activities without a `_type`.
const DEFAULT_ACTIVITY_TYPE: &str = "Activity";

/// Imports work-package activities as local messages, filtered by the
/// parent project's activity sync policy.
pub struct ActivityImporter;

impl ActivityImporter {
    /// The project the activity's work package belongs to. Dependency
    /// import runs first, so the task binding is in place by the time the
    /// skip hook asks.
    async fn parent_project(
        ctx: &ImportContext,
        record: &ExternalRecord,
    ) -> SyncResult<projects::Model> {
        let task_id =
            required_linked_record_id(ctx, record, &WORK_PACKAGE_LINK, SyncModel::Activity).await?;
        let task = tasks::Entity::find_by_id(task_id)
            .one(ctx.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                SyncError::Database(format!("binding points at missing task {}", task_id))
            })?;
        projects::Entity::find_by_id(task.project_id)
            .one(ctx.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                SyncError::Database(format!("task {} has no project {}", task_id, task.project_id))
            })
    }
}

#[async_trait]
impl ModelImporter for ActivityImporter {
    fn model(&self) -> SyncModel {
        SyncModel::Activity
    }

    fn dependencies(&self) -> &'static [LinkDependency] {
        ACTIVITY_DEPS
    }

    async fn should_skip(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
    ) -> SyncResult<Option<String>> {
        let project = Self::parent_project(ctx, record).await?;
        let activity_type = record.record_type().unwrap_or(DEFAULT_ACTIVITY_TYPE);

        if !project.activity_sync.allows(activity_type) {
            return Ok(Some(format!(
                "Skipping sync for activity type: {}",
                activity_type
            )));
        }
        Ok(None)
    }

    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        _options: &WriteOptions,
    ) -> SyncResult<i32> {
        let task_id =
            required_linked_record_id(ctx, record, &WORK_PACKAGE_LINK, SyncModel::Activity).await?;
        let author_id = linked_record_id(ctx, record, &USER_LINK).await?;

        let body = formatted_text(record, "comment");
        let activity_type = record
            .record_type()
            .unwrap_or(DEFAULT_ACTIVITY_TYPE)
            .to_string();
        let remote_created_at = record.created_at();

        match existing {
            Some(id) => {
                let message = messages::Entity::find_by_id(id)
                    .one(ctx.db.as_ref())
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        SyncError::Database(format!("binding points at missing message {}", id))
                    })?;

                let mut message: messages::ActiveModel = message.into();
                message.task_id = Set(task_id);
                message.author_id = Set(author_id);
                message.body = Set(body);
                message.activity_type = Set(activity_type);
                let updated = message.update(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(updated.id)
            }
            None => {
                let message = messages::ActiveModel {
                    task_id: Set(task_id),
                    author_id: Set(author_id),
                    body: Set(body),
                    activity_type: Set(activity_type),
                    remote_created_at: Set(remote_created_at),
                    created_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let created = message.insert(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(created.id)
            }
        }
    }
}
