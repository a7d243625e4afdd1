//! Record import engine
//!
//! Drives one external record through the import state machine:
//!
//! resolve record -> staleness check -> lock -> import dependencies ->
//! skip hook -> map & write -> bind -> after-import hook
//!
//! Model-specific behavior lives behind [`ModelImporter`]; the engine holds
//! a registry keyed by [`SyncModel`] and selects the implementation at call
//! time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use opsync_client::{parse_link_relation, ClientError, ExternalRecord};
use opsync_core::{SyncError, SyncModel, SyncResult};
use opsync_entities::sync_bindings;
use tracing::{debug, info};

use super::binder::Binder;
use super::links::LinkDependency;
use super::lock::{import_lock_key, LockRegistry};
use crate::context::ImportContext;

/// Input to a record import: either a bare external id (the engine fetches
/// the record) or an already-fetched record (batch importers pass these).
#[derive(Debug, Clone)]
pub enum ImportInput {
    ExternalId(String),
    Record(ExternalRecord),
}

impl From<ExternalRecord> for ImportInput {
    fn from(record: ExternalRecord) -> Self {
        ImportInput::Record(record)
    }
}

impl From<&str> for ImportInput {
    fn from(external_id: &str) -> Self {
        ImportInput::ExternalId(external_id.to_string())
    }
}

/// Terminal outcome of one import call. All variants are successes from the
/// caller's perspective; failures are `SyncError` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The record was written and bound.
    Imported { created: bool },
    /// Binding is at least as new as the record; nothing written.
    UpToDate,
    /// The skip hook filtered the record; carries the reason.
    Skipped(String),
    /// The entity no longer exists on the backend.
    Missing,
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::Imported { created: true } => write!(f, "Record created."),
            ImportOutcome::Imported { created: false } => write!(f, "Record updated."),
            ImportOutcome::UpToDate => write!(f, "Record is already up-to-date."),
            ImportOutcome::Skipped(reason) => f.write_str(reason),
            ImportOutcome::Missing => write!(f, "Record no longer exists on the backend."),
        }
    }
}

/// Effects applied around the write/create call.
///
/// The import pipeline writes entities that the host application normally
/// announces on the queue (user invitations, task change notifications);
/// importers suppress those domain events so a sync run does not spam the
/// application's notification surfaces.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub suppress_events: bool,
}

impl WriteOptions {
    pub fn silent() -> Self {
        Self {
            suppress_events: true,
        }
    }
}

/// Model-specific import behavior, registered per [`SyncModel`].
///
/// The engine owns the generic state machine; implementations supply the
/// declared link dependencies, the hooks, and the map-and-write step.
#[async_trait]
pub trait ModelImporter: Send + Sync {
    fn model(&self) -> SyncModel;

    /// Link relations to resolve and import before writing this record.
    fn dependencies(&self) -> &'static [LinkDependency] {
        &[]
    }

    /// Transform the raw record before use. Identity by default.
    fn preprocess(&self, record: ExternalRecord) -> ExternalRecord {
        record
    }

    /// Effects applied around the write/create call. No-op by default.
    fn write_options(&self) -> WriteOptions {
        WriteOptions::default()
    }

    /// Return a non-empty reason to skip this record without writing.
    /// Runs after dependency import, before mapping. Never skips by default.
    async fn should_skip(
        &self,
        _ctx: &ImportContext,
        _record: &ExternalRecord,
    ) -> SyncResult<Option<String>> {
        Ok(None)
    }

    /// Map the record to local values and write them, creating a new local
    /// record or updating `existing`. Returns the local record id.
    async fn persist(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        existing: Option<i32>,
        options: &WriteOptions,
    ) -> SyncResult<i32>;

    /// Side effects after a successful write and bind. No-op by default.
    async fn after_import(
        &self,
        _engine: &ImportEngine,
        _ctx: &ImportContext,
        _record: &ExternalRecord,
        _record_id: i32,
        _for_create: bool,
    ) -> SyncResult<()> {
        Ok(())
    }
}

/// Registry of model importers plus the shared lock registry.
pub struct ImportEngine {
    registry: HashMap<SyncModel, Arc<dyn ModelImporter>>,
    locks: Arc<LockRegistry>,
}

impl ImportEngine {
    /// An engine with no registered importers. Tests register their own.
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
            locks: Arc::new(LockRegistry::new()),
        }
    }

    /// An engine with every model importer this crate ships.
    pub fn with_default_importers() -> Self {
        let mut engine = Self::new();
        for importer in super::models::default_importers() {
            engine.register(importer);
        }
        engine
    }

    pub fn register(&mut self, importer: Arc<dyn ModelImporter>) {
        debug!("Registering importer for model: {}", importer.model());
        self.registry.insert(importer.model(), importer);
    }

    fn importer_for(&self, model: SyncModel) -> SyncResult<&Arc<dyn ModelImporter>> {
        self.registry
            .get(&model)
            .ok_or_else(|| SyncError::Configuration(format!("no importer registered for {}", model)))
    }

    /// Import exactly one external record into exactly one local binding.
    pub async fn run(
        &self,
        ctx: &ImportContext,
        model: SyncModel,
        input: ImportInput,
        force: bool,
    ) -> SyncResult<ImportOutcome> {
        let importer = self.importer_for(model)?;

        let record = match input {
            ImportInput::ExternalId(external_id) => {
                match ctx.adapter.get_single(model, &external_id).await {
                    Ok(record) => record,
                    Err(ClientError::RecordMissing { .. }) => {
                        info!(
                            "Skipping {} {}: no longer exists on backend {}",
                            model, external_id, ctx.backend.id
                        );
                        return Ok(ImportOutcome::Missing);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            ImportInput::Record(record) => record,
        };

        let record = importer.preprocess(record);
        let external_id = record.external_id().to_string();

        let binding = Binder::to_internal(ctx, model, &external_id).await?;
        let exists = binding.is_some();

        if !force && is_uptodate(&record, binding.as_ref()) {
            debug!("Skipping {} {}: up-to-date", model, external_id);
            return Ok(ImportOutcome::UpToDate);
        }

        // Lock scope covers dependency resolution and the write, also under
        // force.
        let lock_key = import_lock_key(&ctx.backend, model, &external_id);
        let _lock = self.locks.try_acquire(&lock_key)?;

        self.import_dependencies(ctx, importer.as_ref(), &record)
            .await?;

        if let Some(reason) = importer.should_skip(ctx, &record).await? {
            info!("Skipping {} {}: {}", model, external_id, reason);
            return Ok(ImportOutcome::Skipped(reason));
        }

        let options = importer.write_options();
        let existing_record_id = binding.as_ref().map(|b| b.record_id);
        let record_id = importer
            .persist(ctx, &record, existing_record_id, &options)
            .await?;

        Binder::bind(ctx, model, &external_id, record_id).await?;

        importer
            .after_import(self, ctx, &record, record_id, !exists)
            .await?;

        Ok(ImportOutcome::Imported { created: !exists })
    }

    async fn import_dependencies(
        &self,
        ctx: &ImportContext,
        importer: &dyn ModelImporter,
        record: &ExternalRecord,
    ) -> SyncResult<()> {
        for link in importer.dependencies() {
            self.import_link_dependency(ctx, record, link, importer.model())
                .await?;
        }
        Ok(())
    }

    /// Resolve one declared link relation, importing the referenced entity
    /// if no binding for it exists yet.
    pub(crate) async fn import_link_dependency(
        &self,
        ctx: &ImportContext,
        record: &ExternalRecord,
        link: &LinkDependency,
        owner: SyncModel,
    ) -> SyncResult<()> {
        match parse_link_relation(record.links(), link.key, link.endpoint) {
            Some(external_id) => {
                let binding = Binder::to_internal(ctx, link.model, &external_id).await?;
                if binding.is_none() {
                    debug!(
                        "Importing \"{}\" link dependency for {}: {} {}",
                        link.key, owner, link.model, external_id
                    );
                    self.import_dependency(ctx, link.model, &external_id).await?;
                }
                Ok(())
            }
            None if link.required => Err(SyncError::MissingDependency {
                link: link.key,
                model: owner,
                external_id: record.external_id().to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn import_dependency(
        &self,
        ctx: &ImportContext,
        model: SyncModel,
        external_id: &str,
    ) -> SyncResult<()> {
        // Boxed: dependency import recurses back into run()
        Box::pin(self.run(ctx, model, ImportInput::ExternalId(external_id.to_string()), false))
            .await?;
        Ok(())
    }
}

impl Default for ImportEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the binding is at least as new as the record.
///
/// Holds only when the binding has a non-empty `sync_date` and the record
/// carries an `updatedAt` that is not strictly later; a record without
/// `updatedAt` is never considered up to date.
fn is_uptodate(record: &ExternalRecord, binding: Option<&sync_bindings::Model>) -> bool {
    let sync_date = match binding.and_then(|b| b.sync_date) {
        Some(sync_date) => sync_date,
        None => return false,
    };
    match record.updated_at() {
        Some(updated_at) => updated_at <= sync_date,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_updated_at(updated_at: &str) -> ExternalRecord {
        ExternalRecord::from_value(json!({"id": 1, "updatedAt": updated_at})).unwrap()
    }

    fn binding_synced_at(sync_date: Option<&str>) -> sync_bindings::Model {
        sync_bindings::Model {
            id: 1,
            backend_id: 1,
            model: "task".to_string(),
            external_id: "1".to_string(),
            record_id: 10,
            sync_date: sync_date.map(|s| s.parse().unwrap()),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_uptodate_when_binding_is_newer() {
        let record = record_updated_at("2014-08-29T12:44:41Z");
        let binding = binding_synced_at(Some("2014-09-01T00:00:00Z"));
        assert!(is_uptodate(&record, Some(&binding)));
    }

    #[test]
    fn test_uptodate_when_timestamps_are_equal() {
        let record = record_updated_at("2014-08-29T12:44:41Z");
        let binding = binding_synced_at(Some("2014-08-29T12:44:41Z"));
        assert!(is_uptodate(&record, Some(&binding)));
    }

    #[test]
    fn test_stale_when_record_is_newer() {
        let record = record_updated_at("2014-09-02T08:00:00Z");
        let binding = binding_synced_at(Some("2014-09-01T00:00:00Z"));
        assert!(!is_uptodate(&record, Some(&binding)));
    }

    #[test]
    fn test_never_uptodate_without_binding_or_sync_date() {
        let record = record_updated_at("2014-08-29T12:44:41Z");
        assert!(!is_uptodate(&record, None));

        let unsynced = binding_synced_at(None);
        assert!(!is_uptodate(&record, Some(&unsynced)));
    }

    #[test]
    fn test_never_uptodate_without_updated_at() {
        let record = ExternalRecord::from_value(json!({"id": 1})).unwrap();
        let binding = binding_synced_at(Some("2014-09-01T00:00:00Z"));
        assert!(!is_uptodate(&record, Some(&binding)));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            ImportOutcome::Imported { created: true }.to_string(),
            "Record created."
        );
        assert_eq!(
            ImportOutcome::Imported { created: false }.to_string(),
            "Record updated."
        );
        assert_eq!(
            ImportOutcome::UpToDate.to_string(),
            "Record is already up-to-date."
        );
        assert_eq!(
            ImportOutcome::Skipped("Skipping sync for activity type: Activity".to_string())
                .to_string(),
            "Skipping sync for activity type: Activity"
        );
        assert_eq!(
            ImportOutcome::Missing.to_string(),
            "Record no longer exists on the backend."
        );
    }
}
