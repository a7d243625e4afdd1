use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use opsync_client::ExternalRecord;
use opsync_core::{Job, SyncError, SyncModel, SyncResult, TaskChangedJob};
use opsync_entities::{projects, tasks, ActivitySyncMode};

use super::{
    enqueue, formatted_text, linked_record_id, parse_date_field, parse_duration_hours,
    required_linked_record_id,
};
use crate::context::ImportContext;
use crate::services::batch::{ActivityBatchImporter, JobOptions};
use crate::services::db_err;
use crate::services::engine::{ImportEngine, ModelImporter, WriteOptions};
use crate::services::links::{LinkDependency, ASSIGNEE_LINK, PROJECT_LINK, STATUS_LINK};

const TASK_DEPS: &[LinkDependency] = &[PROJECT_LINK, ASSIGNEE_LINK, STATUS_LINK];

/// Imports work packages as tasks.
///
/// The work package's description is mirrored only when the parent project
/// opts in via `sync_wp_description`. After a write, the work package's
/// activity stream is imported in bulk when the project's activity policy
/// allows any activities at all.
pub struct TaskImporter;

impl TaskImporter {
    async fn parent_project(
        ctx: &ImportContext,
        record: &ExternalRecord,
    ) -> SyncResult<projects::Model> {
        let project_id =
            required_linked_record_id(ctx, record, &PROJECT_LINK, SyncModel::Task).await?;
        projects::Entity::find_by_id(project_id)
            .one(ctx.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                SyncError::Database(format!("binding points at missing project {}", project_id))
            })
    }
}

#[async_trait]
impl ModelImporter for TaskImporter {
    fn model(&self) -> SyncModel {
        SyncModel::Task
    }

    fn dependencies(&self) -> &'static [LinkDependency] {
        TASK_DEPS
    }

    fn write_options(&self) -> WriteOptions {
        // Imported tasks must not fan out change notifications
        WriteOptions::silent()
    }

    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        options: &WriteOptions,
    ) -> SyncResult<i32> {
        let project = Self::parent_project(ctx, record).await?;
        let stage_id = required_linked_record_id(ctx, record, &STATUS_LINK, SyncModel::Task).await?;
        let assignee_id = linked_record_id(ctx, record, &ASSIGNEE_LINK).await?;

        let subject = record.get_str("subject").unwrap_or_default().to_string();
        let description = if project.sync_wp_description {
            formatted_text(record, "description")
        } else {
            None
        };
        let date_start = parse_date_field(record, "startDate");
        let date_deadline = parse_date_field(record, "dueDate");
        let estimated_hours = record
            .get_str("estimatedTime")
            .and_then(parse_duration_hours);

        let task_id = match existing {
            Some(id) => {
                let task = tasks::Entity::find_by_id(id)
                    .one(ctx.db.as_ref())
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        SyncError::Database(format!("binding points at missing task {}", id))
                    })?;

                let mut task: tasks::ActiveModel = task.into();
                task.subject = Set(subject);
                task.description = Set(description);
                task.project_id = Set(project.id);
                task.stage_id = Set(stage_id);
                task.assignee_id = Set(assignee_id);
                task.date_start = Set(date_start);
                task.date_deadline = Set(date_deadline);
                task.estimated_hours = Set(estimated_hours);
                task.remote_updated_at = Set(record.updated_at());
                let updated = task.update(ctx.db.as_ref()).await.map_err(db_err)?;
                updated.id
            }
            None => {
                let task = tasks::ActiveModel {
                    subject: Set(subject),
                    description: Set(description),
                    project_id: Set(project.id),
                    stage_id: Set(stage_id),
                    assignee_id: Set(assignee_id),
                    date_start: Set(date_start),
                    date_deadline: Set(date_deadline),
                    estimated_hours: Set(estimated_hours),
                    remote_created_at: Set(record.created_at()),
                    remote_updated_at: Set(record.updated_at()),
                    created_at: Set(chrono::Utc::now()),
                    updated_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let created = task.insert(ctx.db.as_ref()).await.map_err(db_err)?;
                created.id
            }
        };

        if !options.suppress_events {
            enqueue(
                ctx,
                Job::TaskChanged(TaskChangedJob {
                    task_id,
                    created: existing.is_none(),
                }),
            )
            .await?;
        }

        Ok(task_id)
    }

    async fn after_import(
        &self,
        engine: &ImportEngine,
        ctx: &ImportContext,
        record: &ExternalRecord,
        _record_id: i32,
        _for_create: bool,
    ) -> SyncResult<()> {
        let project = Self::parent_project(ctx, record).await?;
        if project.activity_sync != ActivitySyncMode::None {
            // Import the activity stream in bulk, not as separate jobs
            ActivityBatchImporter::run(
                engine,
                ctx,
                record.external_id(),
                &JobOptions::inline(),
            )
            .await?;
        }
        Ok(())
    }
}
