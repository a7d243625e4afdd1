use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use opsync_client::ExternalRecord;
use opsync_core::{ImportAvatarJob, Job, SyncError, SyncModel, SyncResult, UserCreatedJob};
use opsync_entities::users;

use super::enqueue;
use crate::context::ImportContext;
use crate::services::db_err;
use crate::services::engine::{ImportEngine, ModelImporter, WriteOptions};

/// Imports external users.
///
/// Writes are silent: a synced user must not receive the invitation mail the
/// host application sends for locally created accounts. Avatars arrive via a
/// separate delayed job scheduled on first import.
pub struct UserImporter;

#[async_trait]
impl ModelImporter for UserImporter {
    fn model(&self) -> SyncModel {
        SyncModel::User
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions::silent()
    }

    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        options: &WriteOptions,
    ) -> SyncResult<i32> {
        let name = record.get_str("name").unwrap_or_default().to_string();
        let login = record
            .get_str("login")
            .unwrap_or_else(|| record.external_id())
            .to_string();
        let email = record.get_str("email").map(str::to_string);
        let active = record.get_str("status") != Some("locked");

        let user_id = match existing {
            Some(id) => {
                let user = users::Entity::find_by_id(id)
                    .one(ctx.db.as_ref())
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| {
                        SyncError::Database(format!("binding points at missing user {}", id))
                    })?;

                let mut user: users::ActiveModel = user.into();
                user.name = Set(name);
                user.login = Set(login);
                user.email = Set(email);
                user.active = Set(active);
                let updated = user.update(ctx.db.as_ref()).await.map_err(db_err)?;
                updated.id
            }
            None => {
                let user = users::ActiveModel {
                    name: Set(name),
                    login: Set(login.clone()),
                    email: Set(email),
                    active: Set(active),
                    created_at: Set(chrono::Utc::now()),
                    updated_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                let created = user.insert(ctx.db.as_ref()).await.map_err(db_err)?;

                if !options.suppress_events {
                    enqueue(
                        ctx,
                        Job::UserCreated(UserCreatedJob {
                            user_id: created.id,
                            login,
                        }),
                    )
                    .await?;
                }

                created.id
            }
        };

        Ok(user_id)
    }

    async fn after_import(
        &self,
        _engine: &ImportEngine,
        ctx: &ImportContext,
        record: &ExternalRecord,
        record_id: i32,
        for_create: bool,
    ) -> SyncResult<()> {
        let avatar_url = record.get_str("avatar").unwrap_or_default();
        if for_create && !avatar_url.is_empty() {
            enqueue(
                ctx,
                Job::ImportAvatar(ImportAvatarJob {
                    backend_id: ctx.backend.id,
                    url: avatar_url.to_string(),
                    user_id: record_id,
                }),
            )
            .await?;
        }
        Ok(())
    }
}
