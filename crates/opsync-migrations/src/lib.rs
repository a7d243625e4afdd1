//! Database migrations for the Opsync connector

pub use sea_orm_migration::prelude::*;

mod migration;

pub use migration::Migrator;
