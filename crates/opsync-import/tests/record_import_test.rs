//! Per-record import behavior: dependency resolution, staleness, force
//! semantics and terminal outcomes, against an in-memory backend.

mod common;

use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use serde_json::json;
use tokio::time::{timeout, Duration};

use common::*;
use opsync_core::{Job, SyncError, SyncModel};
use opsync_entities::{projects, task_stages, tasks, users};
use opsync_import::ImportOutcome;

#[tokio::test]
async fn test_work_package_import_creates_task_and_dependencies() {
    let harness = setup().await;
    seed_standard_records(&harness.adapter);

    let outcome = harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "1528", false)
        .await
        .expect("import should succeed");
    assert_eq!(outcome, ImportOutcome::Imported { created: true });

    // Exactly one task, mapped from the work package
    let all_tasks = tasks::Entity::find()
        .all(harness.db.connection())
        .await
        .unwrap();
    assert_eq!(all_tasks.len(), 1);
    let task = &all_tasks[0];
    assert_eq!(task.subject, "Develop API");
    assert_eq!(task.date_start, NaiveDate::from_ymd_opt(2014, 8, 30));
    assert_eq!(task.date_deadline, NaiveDate::from_ymd_opt(2014, 9, 1));
    assert!((task.estimated_hours.unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(
        task.remote_updated_at.unwrap().to_rfc3339(),
        "2014-08-29T12:44:41+00:00"
    );
    // Description withheld until the project opts in
    assert_eq!(task.description, None);

    // Dependencies were imported and wired up
    let project = projects::Entity::find_by_id(task.project_id)
        .one(harness.db.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.name, "A project");
    assert!(project.active);

    let stage = task_stages::Entity::find_by_id(task.stage_id)
        .one(harness.db.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stage.name, "New");

    let assignee = users::Entity::find_by_id(task.assignee_id.unwrap())
        .one(harness.db.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(assignee.login, "j.sheppard");

    // Bindings exist for the record and every dependency, sync-date stamped
    for (model, external_id) in [
        (SyncModel::Task, "1528"),
        (SyncModel::Project, "14"),
        (SyncModel::TaskStage, "1"),
        (SyncModel::User, "1"),
    ] {
        let binding = binding_for(&harness, model, external_id)
            .await
            .unwrap_or_else(|| panic!("missing binding for {} {}", model, external_id));
        assert!(binding.sync_date.is_some());
    }
}

#[tokio::test]
async fn test_description_synced_when_project_opts_in() {
    let harness = setup().await;
    seed_standard_records(&harness.adapter);

    // Import the project first and opt it into description sync
    harness
        .service
        .import_single(harness.backend_id, SyncModel::Project, "14", false)
        .await
        .unwrap();
    let project = project_by_external(&harness, "14").await;
    let mut project: projects::ActiveModel = project.into();
    project.sync_wp_description = Set(true);
    project.update(harness.db.connection()).await.unwrap();

    harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "1528", false)
        .await
        .unwrap();

    let task = tasks::Entity::find()
        .one(harness.db.connection())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        task.description.as_deref(),
        Some("Develop super cool OpenProject API.")
    );
}

#[tokio::test]
async fn test_up_to_date_record_is_skipped() {
    let harness = setup().await;
    seed_standard_records(&harness.adapter);

    harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "1528", false)
        .await
        .unwrap();

    // The binding's sync_date is now later than the record's updatedAt
    let outcome = harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "1528", false)
        .await
        .unwrap();
    assert_eq!(outcome, ImportOutcome::UpToDate);

    let count = tasks::Entity::find()
        .count(harness.db.connection())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_force_reimport_is_idempotent() {
    let harness = setup().await;
    seed_standard_records(&harness.adapter);

    harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "1528", false)
        .await
        .unwrap();

    for _ in 0..3 {
        let outcome = harness
            .service
            .import_single(harness.backend_id, SyncModel::Task, "1528", true)
            .await
            .unwrap();
        assert_eq!(outcome, ImportOutcome::Imported { created: false });
    }

    let all_tasks = tasks::Entity::find()
        .all(harness.db.connection())
        .await
        .unwrap();
    assert_eq!(all_tasks.len(), 1);
    assert_eq!(all_tasks[0].subject, "Develop API");

    let binding = binding_for(&harness, SyncModel::Task, "1528").await.unwrap();
    assert_eq!(binding.record_id, all_tasks[0].id);
}

#[tokio::test]
async fn test_missing_required_dependency_is_fatal() {
    let harness = setup().await;
    seed_standard_records(&harness.adapter);

    // Work package without a project link
    harness.adapter.add_record(
        SyncModel::Task,
        json!({
            "id": 1600,
            "_type": "WorkPackage",
            "subject": "Orphan",
            "_links": {
                "status": {"href": "/api/v3/statuses/1"},
            },
        }),
    );

    let result = harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "1600", false)
        .await;

    match result {
        Err(SyncError::MissingDependency { link, external_id, .. }) => {
            assert_eq!(link, "project");
            assert_eq!(external_id, "1600");
        }
        other => panic!("expected MissingDependency, got {:?}", other.map(|o| o.to_string())),
    }

    let count = tasks::Entity::find()
        .count(harness.db.connection())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_missing_remote_record_is_benign() {
    let harness = setup().await;
    seed_standard_records(&harness.adapter);

    let outcome = harness
        .service
        .import_single(harness.backend_id, SyncModel::Task, "9999", false)
        .await
        .expect("missing record is an outcome, not an error");
    assert_eq!(outcome, ImportOutcome::Missing);
    assert_eq!(
        outcome.to_string(),
        "Record no longer exists on the backend."
    );
}

#[tokio::test]
async fn test_avatar_import_scheduled_on_user_creation() {
    let mut harness = setup().await;
    seed_standard_records(&harness.adapter);

    harness
        .service
        .import_single(harness.backend_id, SyncModel::User, "1", false)
        .await
        .unwrap();

    let job = timeout(Duration::from_secs(1), harness.queue_rx.recv())
        .await
        .expect("avatar job should be scheduled")
        .unwrap();
    match job {
        Job::ImportAvatar(data) => {
            assert_eq!(data.url, "http://openproject/avatar/1");
            assert_eq!(data.backend_id, harness.backend_id);
        }
        other => panic!("expected ImportAvatar job, got {}", other),
    }

    // A forced re-import is an update, not a create: no second avatar job
    harness
        .service
        .import_single(harness.backend_id, SyncModel::User, "1", true)
        .await
        .unwrap();
    let no_job = timeout(Duration::from_millis(100), harness.queue_rx.recv()).await;
    assert!(no_job.is_err(), "update must not reschedule the avatar import");
}
