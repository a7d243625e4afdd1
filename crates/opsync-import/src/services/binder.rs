//! Binder: the single source of truth for external-to-local identity
//!
//! A binding row links an external id to a local record and carries the
//! `sync_date` the staleness check compares against. `bind` is called after
//! every successful write; it creates the row on first import and refreshes
//! it afterwards.

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;

use opsync_core::{SyncModel, SyncResult};
use opsync_entities::sync_bindings;

use super::db_err;
use crate::context::ImportContext;

pub struct Binder;

impl Binder {
    /// Look up the binding for an external id, if one exists.
    pub async fn to_internal(
        ctx: &ImportContext,
        model: SyncModel,
        external_id: &str,
    ) -> SyncResult<Option<sync_bindings::Model>> {
        sync_bindings::Entity::find()
            .filter(sync_bindings::Column::BackendId.eq(ctx.backend.id))
            .filter(sync_bindings::Column::Model.eq(model.as_str()))
            .filter(sync_bindings::Column::ExternalId.eq(external_id))
            .one(ctx.db.as_ref())
            .await
            .map_err(db_err)
    }

    /// Record the external-to-local association and stamp `sync_date`.
    pub async fn bind(
        ctx: &ImportContext,
        model: SyncModel,
        external_id: &str,
        record_id: i32,
    ) -> SyncResult<sync_bindings::Model> {
        let now = chrono::Utc::now();

        match Self::to_internal(ctx, model, external_id).await? {
            Some(existing) => {
                let mut binding: sync_bindings::ActiveModel = existing.into();
                binding.record_id = Set(record_id);
                binding.sync_date = Set(Some(now));
                binding.update(ctx.db.as_ref()).await.map_err(db_err)
            }
            None => {
                debug!(
                    "Creating binding for {} {} on backend {}",
                    model, external_id, ctx.backend.id
                );
                let binding = sync_bindings::ActiveModel {
                    backend_id: Set(ctx.backend.id),
                    model: Set(model.as_str().to_string()),
                    external_id: Set(external_id.to_string()),
                    record_id: Set(record_id),
                    sync_date: Set(Some(now)),
                    created_at: Set(now),
                    ..Default::default()
                };
                binding.insert(ctx.db.as_ref()).await.map_err(db_err)
            }
        }
    }
}
