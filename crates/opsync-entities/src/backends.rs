//! Backend entity
//!
//! One row per connected tracking-service instance. Holds the API endpoint,
//! credentials and the per-backend sync configuration the importers read.

use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

use opsync_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "backends")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Base URL of the tracking service API (e.g. "https://openproject.example.com")
    pub api_url: String,
    pub api_key: String,
    /// Collection page size requested from the API
    pub page_size: i32,
    /// Reconcile archived/unarchived projects during project batch imports
    pub sync_project_status: bool,
    pub active: bool,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sync_bindings::Entity")]
    SyncBindings,
}

impl Related<super::sync_bindings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncBindings.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}

impl Model {
    /// Page size as the importers use it; guards against misconfigured rows.
    pub fn effective_page_size(&self) -> u32 {
        if self.page_size >= 1 {
            self.page_size as u32
        } else {
            opsync_core::DEFAULT_PAGE_SIZE
        }
    }
}
