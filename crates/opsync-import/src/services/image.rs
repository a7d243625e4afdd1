//! Avatar image importer
//!
//! Downloads binary content with a bounded timeout and stores it,
//! base64-encoded, on a user record. Timeouts surface as retryable errors so
//! the job layer reschedules; every other failure mode is a descriptive
//! outcome string, not an error.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tracing::{debug, warn};

use opsync_core::{SyncError, SyncResult};
use opsync_entities::users;

use super::db_err;
use crate::context::ImportContext;

pub struct ImageImporter;

impl ImageImporter {
    /// Fetch `url` and set it as the avatar of the given local user.
    pub async fn run(
        ctx: &ImportContext,
        url: &str,
        user_id: i32,
        timeout: Duration,
    ) -> SyncResult<String> {
        let bytes = match ctx.adapter.fetch_binary(url, timeout).await? {
            Some(bytes) => bytes,
            None => {
                debug!("No image at {} for user {}", url, user_id);
                return Ok("No image could be downloaded".to_string());
            }
        };

        // Decode fully before persisting anything
        if image::load_from_memory(&bytes).is_err() {
            warn!("Undecodable image at {} for user {}", url, user_id);
            return Ok(format!("Not a valid image: {}", url));
        }

        let user = users::Entity::find_by_id(user_id)
            .one(ctx.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| SyncError::Database(format!("no user with id {}", user_id)))?;

        let mut user: users::ActiveModel = user.into();
        user.avatar = Set(Some(BASE64.encode(&bytes)));
        user.update(ctx.db.as_ref()).await.map_err(db_err)?;

        Ok(format!("Avatar set on user: {}", user_id))
    }
}
