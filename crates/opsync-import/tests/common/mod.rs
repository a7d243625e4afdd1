#![allow(dead_code)]

//! Shared test harness: an in-memory backend adapter over JSON fixtures and
//! a migrated sqlite database wired into a SyncService.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::{json, Value};

use opsync_client::{BackendAdapter, ClientError, ClientResult, ExternalRecord, Filter, RecordStream};
use opsync_core::{Job, JobQueue, SyncModel};
use opsync_database::test_utils::TestDatabase;
use opsync_entities::{backends, projects, sync_bindings};
use opsync_import::SyncService;
use opsync_queue::BroadcastQueueService;

/// Canned response for a binary URL.
pub enum BinaryFixture {
    Bytes(Vec<u8>),
    NotFound,
    Timeout,
}

/// Backend adapter over in-memory fixtures.
#[derive(Default)]
pub struct MockAdapter {
    singles: Mutex<HashMap<(SyncModel, String), Value>>,
    collections: Mutex<HashMap<SyncModel, Vec<Value>>>,
    activities: Mutex<HashMap<String, Vec<Value>>>,
    binaries: Mutex<HashMap<String, BinaryFixture>>,
}

impl MockAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn id_of(value: &Value) -> String {
        match value.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => panic!("fixture record without id: {}", value),
        }
    }

    /// Make a record fetchable by `get_single`.
    pub fn add_record(&self, model: SyncModel, value: Value) {
        let id = Self::id_of(&value);
        self.singles.lock().unwrap().insert((model, id), value);
    }

    /// Set the collection returned for a model; records are also fetchable
    /// individually.
    pub fn set_collection(&self, model: SyncModel, values: Vec<Value>) {
        for value in &values {
            self.add_record(model, value.clone());
        }
        self.collections.lock().unwrap().insert(model, values);
    }

    /// Set the activity stream of one work package.
    pub fn set_activities(&self, work_package_id: &str, values: Vec<Value>) {
        for value in &values {
            self.add_record(SyncModel::Activity, value.clone());
        }
        self.activities
            .lock()
            .unwrap()
            .insert(work_package_id.to_string(), values);
    }

    pub fn set_binary(&self, url: &str, fixture: BinaryFixture) {
        self.binaries.lock().unwrap().insert(url.to_string(), fixture);
    }
}

#[async_trait]
impl BackendAdapter for MockAdapter {
    async fn get_single(
        &self,
        model: SyncModel,
        external_id: &str,
    ) -> ClientResult<ExternalRecord> {
        let value = self
            .singles
            .lock()
            .unwrap()
            .get(&(model, external_id.to_string()))
            .cloned();
        match value {
            Some(value) => ExternalRecord::from_value(value),
            None => Err(ClientError::RecordMissing {
                model,
                external_id: external_id.to_string(),
            }),
        }
    }

    fn get_collection(
        &self,
        model: SyncModel,
        _filters: Vec<Filter>,
        _page_size: u32,
        _offset: Option<u32>,
    ) -> RecordStream<'_> {
        let values = self
            .collections
            .lock()
            .unwrap()
            .get(&model)
            .cloned()
            .unwrap_or_default();
        Box::pin(futures::stream::iter(
            values.into_iter().map(ExternalRecord::from_value),
        ))
    }

    fn get_work_package_activities(
        &self,
        work_package_id: String,
        _offset: Option<u32>,
    ) -> RecordStream<'_> {
        let values = self
            .activities
            .lock()
            .unwrap()
            .get(&work_package_id)
            .cloned()
            .unwrap_or_default();
        Box::pin(futures::stream::iter(
            values.into_iter().map(ExternalRecord::from_value),
        ))
    }

    async fn fetch_binary(&self, url: &str, _timeout: Duration) -> ClientResult<Option<Bytes>> {
        match self.binaries.lock().unwrap().get(url) {
            Some(BinaryFixture::Bytes(bytes)) => Ok(Some(Bytes::from(bytes.clone()))),
            Some(BinaryFixture::Timeout) => {
                Err(ClientError::NetworkRetryable("request timed out".to_string()))
            }
            Some(BinaryFixture::NotFound) | None => Ok(None),
        }
    }
}

pub struct TestHarness {
    pub db: TestDatabase,
    pub service: Arc<SyncService>,
    pub adapter: Arc<MockAdapter>,
    pub queue: Arc<dyn JobQueue>,
    pub queue_rx: tokio::sync::broadcast::Receiver<Job>,
    pub backend_id: i32,
}

pub async fn setup() -> TestHarness {
    let db = TestDatabase::with_migrations()
        .await
        .expect("in-memory database should migrate");

    let backend = backends::ActiveModel {
        name: Set("op".to_string()),
        api_url: Set("http://openproject".to_string()),
        api_key: Set("secret".to_string()),
        page_size: Set(20),
        sync_project_status: Set(true),
        active: Set(true),
        ..Default::default()
    }
    .insert(db.connection())
    .await
    .expect("backend row should insert");

    let (queue, queue_rx) = BroadcastQueueService::create_job_queue_arc_with_receiver(64);

    let adapter = MockAdapter::new();
    let factory_adapter = Arc::clone(&adapter);
    let service = Arc::new(SyncService::with_adapter_factory(
        db.connection_arc(),
        Arc::clone(&queue),
        Arc::new(move |_backend| Ok(Arc::clone(&factory_adapter) as Arc<dyn BackendAdapter>)),
    ));

    TestHarness {
        db,
        service,
        adapter,
        queue,
        queue_rx,
        backend_id: backend.id,
    }
}

// Fixtures mirroring a small tracking-service instance: one project, one
// status, one user, one work package.

pub fn project_14() -> Value {
    json!({
        "id": 14,
        "_type": "Project",
        "identifier": "a_project",
        "name": "A project",
        "active": true,
        "description": {"format": "textile", "raw": "", "html": ""},
        "updatedAt": "2014-08-28T10:00:00Z",
    })
}

pub fn project_15() -> Value {
    json!({
        "id": 15,
        "_type": "Project",
        "identifier": "another_project",
        "name": "Another project",
        "active": true,
        "updatedAt": "2014-08-28T10:00:00Z",
    })
}

pub fn status_1() -> Value {
    json!({
        "id": 1,
        "_type": "Status",
        "name": "New",
        "isClosed": false,
        "position": 1,
    })
}

pub fn user_1() -> Value {
    json!({
        "id": 1,
        "_type": "User",
        "name": "John Sheppard",
        "login": "j.sheppard",
        "email": "shep@mail.com",
        "status": "active",
        "avatar": "http://openproject/avatar/1",
    })
}

pub fn work_package_1528() -> Value {
    json!({
        "id": 1528,
        "_type": "WorkPackage",
        "subject": "Develop API",
        "description": {
            "format": "textile",
            "raw": "Develop super cool OpenProject API.",
            "html": "<p>Develop super cool OpenProject API.</p>",
        },
        "startDate": "2014-08-30",
        "dueDate": "2014-09-01",
        "estimatedTime": "PT2H",
        "createdAt": "2014-08-29T12:40:53Z",
        "updatedAt": "2014-08-29T12:44:41Z",
        "_links": {
            "project": {"href": "/api/v3/projects/14"},
            "status": {"href": "/api/v3/statuses/1"},
            "assignee": {"href": "/api/v3/users/1"},
        },
    })
}

pub fn comment_activity_100() -> Value {
    json!({
        "id": 100,
        "_type": "Activity::Comment",
        "comment": {"format": "textile", "raw": "Looking good so far.", "html": ""},
        "createdAt": "2014-08-29T13:00:00Z",
        "_links": {
            "workPackage": {"href": "/api/v3/work_packages/1528"},
            "user": {"href": "/api/v3/users/1"},
        },
    })
}

pub fn system_activity_101() -> Value {
    json!({
        "id": 101,
        "_type": "Activity",
        "comment": {"format": "textile", "raw": "", "html": ""},
        "createdAt": "2014-08-29T13:05:00Z",
        "_links": {
            "workPackage": {"href": "/api/v3/work_packages/1528"},
            "user": {"href": "/api/v3/users/1"},
        },
    })
}

/// Seed the adapter with the standard fixture set.
pub fn seed_standard_records(adapter: &MockAdapter) {
    adapter.add_record(SyncModel::Project, project_14());
    adapter.add_record(SyncModel::TaskStage, status_1());
    adapter.add_record(SyncModel::User, user_1());
    adapter.add_record(SyncModel::Task, work_package_1528());
}

/// Look up the binding for an external id.
pub async fn binding_for(
    harness: &TestHarness,
    model: SyncModel,
    external_id: &str,
) -> Option<sync_bindings::Model> {
    sync_bindings::Entity::find()
        .filter(sync_bindings::Column::BackendId.eq(harness.backend_id))
        .filter(sync_bindings::Column::Model.eq(model.as_str()))
        .filter(sync_bindings::Column::ExternalId.eq(external_id))
        .one(harness.db.connection())
        .await
        .expect("binding query should succeed")
}

/// Resolve a bound project row by external id.
pub async fn project_by_external(harness: &TestHarness, external_id: &str) -> projects::Model {
    let binding = binding_for(harness, SyncModel::Project, external_id)
        .await
        .unwrap_or_else(|| panic!("no project binding for external id {}", external_id));
    projects::Entity::find_by_id(binding.record_id)
        .one(harness.db.connection())
        .await
        .expect("project query should succeed")
        .expect("bound project row should exist")
}
