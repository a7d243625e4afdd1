use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;

use opsync_client::ExternalRecord;
use opsync_core::{SyncError, SyncModel, SyncResult};
use opsync_entities::projects;

use super::formatted_text;
use crate::context::ImportContext;
use crate::services::db_err;
use crate::services::engine::{ModelImporter, WriteOptions};

/// Imports external projects. Sync toggles (`sync_wp_description`,
/// `activity_sync`) are local configuration and are left untouched on
/// update.
pub struct ProjectImporter;

#[async_trait]
impl ModelImporter for ProjectImporter {
    fn model(&self) -> SyncModel {
        SyncModel::Project
    }

    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        _options: &WriteOptions,
    ) -> SyncResult<i32> {
        let name = record.get_str("name").unwrap_or_default().to_string();
        let identifier = record
            .get_str("identifier")
            .unwrap_or_else(|| record.external_id())
            .to_string();
        let description = formatted_text(record, "description");
        let active = record
            .get("active")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        match existing {
            Some(id) => {
                let project = projects::Entity::find_by_id(id)
                    .one(ctx.db.as_ref())
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        SyncError::Database(format!("binding points at missing project {}", id))
                    })?;

                let mut project: projects::ActiveModel = project.into();
                project.name = Set(name);
                project.identifier = Set(identifier);
                project.description = Set(description);
                project.active = Set(active);
                let updated = project.update(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(updated.id)
            }
            None => {
                let project = projects::ActiveModel {
                    name: Set(name),
                    identifier: Set(identifier),
                    description: Set(description),
                    active: Set(active),
                    created_at: Set(chrono::Utc::now()),
                    updated_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let created = project.insert(ctx.db.as_ref()).await.map_err(db_err)?;
                Ok(created.id)
            }
        }
    }
}
