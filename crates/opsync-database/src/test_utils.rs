//! Test utilities for database integration tests
//!
//! Provides in-memory sqlite databases, migrated with the workspace
//! migrations, for use across all opsync crates. The schema is portable, so
//! tests do not need a running Postgres instance.

use crate::DbConnection;
use opsync_migrations::Migrator;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend, Statement};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

/// Test database backed by a private in-memory sqlite instance
pub struct TestDatabase {
    pub db: Arc<DbConnection>,
}

impl TestDatabase {
    /// Create a fresh, empty in-memory database without any schema.
    pub async fn new() -> anyhow::Result<Self> {
        // A pooled connection per in-memory database would mean a separate
        // database per connection; pin the pool to one connection.
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);

        let db = Database::connect(opt).await?;
        Ok(TestDatabase { db: Arc::new(db) })
    }

    /// Create a fresh in-memory database and run all migrations.
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let test_db = Self::new().await?;
        Migrator::up(&*test_db.db, None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        Ok(test_db)
    }

    /// Execute raw SQL for test setup/inspection
    pub async fn execute_sql(&self, sql: &str) -> anyhow::Result<()> {
        let statement = Statement::from_string(DatabaseBackend::Sqlite, sql.to_owned());
        self.db.execute(statement).await?;
        Ok(())
    }

    /// Get the database connection
    pub fn connection(&self) -> &DbConnection {
        &self.db
    }

    /// Get the database connection as Arc
    pub fn connection_arc(&self) -> Arc<DbConnection> {
        Arc::clone(&self.db)
    }
}

/// Helper to wait for a condition with timeout
pub async fn wait_for<F, Fut>(
    condition: F,
    timeout_secs: u64,
    check_interval_ms: u64,
) -> anyhow::Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);
    let interval = std::time::Duration::from_millis(check_interval_ms);

    while start.elapsed() < timeout {
        if condition().await {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }

    Err(anyhow::anyhow!("Timeout waiting for condition"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_setup() -> anyhow::Result<()> {
        let test_db = TestDatabase::new().await?;
        test_db.execute_sql("SELECT 1").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_with_migrations_creates_schema() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;

        // Migrated schema accepts inserts into the bindings table
        test_db
            .execute_sql(
                "INSERT INTO backends (name, api_url, api_key, page_size, sync_project_status, active, created_at, updated_at) \
                 VALUES ('op', 'http://openproject', 'secret', 20, 1, 1, '2025-06-01T00:00:00Z', '2025-06-01T00:00:00Z')",
            )
            .await?;

        Ok(())
    }
}
