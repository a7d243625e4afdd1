//! Sync binding entity
//!
//! Pairs an external identifier with a local record and the timestamp of the
//! last successful import. `(backend_id, model, external_id)` is unique among
//! rows; the importer creates a binding on first import, refreshes
//! `sync_date` on every subsequent one, and never deletes bindings itself.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use opsync_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_bindings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub backend_id: i32,
    /// Local model discriminator, see `opsync_core::SyncModel`
    pub model: String,
    pub external_id: String,
    /// Primary key of the bound local record
    pub record_id: i32,
    /// Last successful import; empty until the first import completes
    pub sync_date: Option<DBDateTime>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::backends::Entity",
        from = "Column::BackendId",
        to = "super::backends::Column::Id"
    )]
    Backend,
}

impl Related<super::backends::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Backend.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
