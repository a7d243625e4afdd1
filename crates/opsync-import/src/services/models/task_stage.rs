use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;

use opsync_client::ExternalRecord;
use opsync_core::{SyncError, SyncModel, SyncResult};
use opsync_entities::task_stages;

use crate::context::ImportContext;
use crate::services::db_err;
use crate::services::engine::{ModelImporter, WriteOptions};

/// Imports work-package statuses as task stages.
pub struct TaskStageImporter;

#[async_trait]
impl ModelImporter for TaskStageImporter {
    fn model(&self) -> SyncModel {
        SyncModel::TaskStage
    }

    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        _options: &WriteOptions,
    ) -> SyncResult<i32> {
        let name = record.get_str("name").unwrap_or_default().to_string();
        let is_closed = record
            .get("isClosed")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let position = record
            .get("position")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32;

        match existing {
            Some(id) => {
                let stage = task_stages::Entity::find_by_id(id)
                    .one(ctx.db.as_ref())
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        SyncError::Database(format!("binding points at missing task stage {}", id))
                    })?;

                let mut stage: task_stages::ActiveModel = stage.into();
                stage.name = Set(name);
                stage.is_closed = Set(is_closed);
                stage.position = Set(position);
                let updated = stage.update(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(updated.id)
            }
            None => {
                let stage = task_stages::ActiveModel {
                    name: Set(name),
                    is_closed: Set(is_closed),
                    position: Set(position),
                    ..Default::default()
                };
                let created = stage.insert(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(created.id)
            }
        }
    }
}
