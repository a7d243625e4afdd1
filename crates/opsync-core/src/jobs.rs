use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SyncModel;

/// Import one external record into its local binding.
///
/// Batch importers attach the already-fetched record payload so delayed
/// workers do not hit the backend again; directly scheduled jobs carry only
/// the external id and the worker re-fetches.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportRecordJob {
    pub backend_id: i32,
    pub model: SyncModel,
    pub external_id: String,
    pub record: Option<serde_json::Value>,
    pub force: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportProjectsJob {
    pub backend_id: i32,
    /// Split per-record imports into separate jobs instead of running inline.
    pub delay: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportWorkPackagesJob {
    pub backend_id: i32,
    pub delay: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportTimeEntriesJob {
    pub backend_id: i32,
    pub delay: bool,
}

/// Import the full activity stream of one work package.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportActivitiesJob {
    pub backend_id: i32,
    pub work_package_external_id: String,
}

/// Download a user's avatar and store it on the local user record.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImportAvatarJob {
    pub backend_id: i32,
    pub url: String,
    pub user_id: i32,
}

/// Job for when a local user record is created outside an import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedJob {
    pub user_id: i32,
    pub login: String,
}

/// Job for when a local task record is created or updated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChangedJob {
    pub task_id: i32,
    pub created: bool,
}

/// Core job enum containing all possible job types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Job {
    ImportRecord(ImportRecordJob),
    ImportProjects(ImportProjectsJob),
    ImportWorkPackages(ImportWorkPackagesJob),
    ImportTimeEntries(ImportTimeEntriesJob),
    ImportActivities(ImportActivitiesJob),
    ImportAvatar(ImportAvatarJob),
    UserCreated(UserCreatedJob),
    TaskChanged(TaskChangedJob),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::ImportRecord(job) => write!(
                f,
                "ImportRecord(backend: {}, model: {}, external_id: {})",
                job.backend_id, job.model, job.external_id
            ),
            Job::ImportProjects(job) => {
                write!(f, "ImportProjects(backend: {})", job.backend_id)
            }
            Job::ImportWorkPackages(job) => {
                write!(f, "ImportWorkPackages(backend: {})", job.backend_id)
            }
            Job::ImportTimeEntries(job) => {
                write!(f, "ImportTimeEntries(backend: {})", job.backend_id)
            }
            Job::ImportActivities(job) => write!(
                f,
                "ImportActivities(backend: {}, work_package: {})",
                job.backend_id, job.work_package_external_id
            ),
            Job::ImportAvatar(job) => write!(
                f,
                "ImportAvatar(backend: {}, user: {})",
                job.backend_id, job.user_id
            ),
            Job::UserCreated(job) => {
                write!(f, "UserCreated(id: {}, login: {})", job.user_id, job.login)
            }
            Job::TaskChanged(job) => write!(
                f,
                "TaskChanged(id: {}, created: {})",
                job.task_id, job.created
            ),
        }
    }
}

// Core queue abstraction - opsync-queue implements this
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to send job: {0}")]
    SendError(String),
    #[error("Failed to receive job: {0}")]
    ReceiveError(String),
    #[error("Queue channel closed")]
    ChannelClosed,
    #[error("Invalid job data: {0}")]
    InvalidData(String),
}

/// Core trait for job queue operations
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Send a job to the queue
    async fn send(&self, job: Job) -> Result<(), QueueError>;

    /// Create a new receiver for jobs
    fn subscribe(&self) -> Box<dyn JobReceiver>;
}

/// Core trait for receiving jobs
#[async_trait]
pub trait JobReceiver: Send {
    /// Receive the next job
    async fn recv(&mut self) -> Result<Job, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_display_formatting() {
        let import_job = Job::ImportRecord(ImportRecordJob {
            backend_id: 1,
            model: SyncModel::Task,
            external_id: "1528".to_string(),
            record: None,
            force: false,
        });
        assert_eq!(
            format!("{}", import_job),
            "ImportRecord(backend: 1, model: task, external_id: 1528)"
        );

        let avatar_job = Job::ImportAvatar(ImportAvatarJob {
            backend_id: 1,
            url: "http://openproject/avatar/1".to_string(),
            user_id: 42,
        });
        assert_eq!(format!("{}", avatar_job), "ImportAvatar(backend: 1, user: 42)");
    }

    #[test]
    fn test_import_record_job_round_trips_through_json() {
        let job = Job::ImportRecord(ImportRecordJob {
            backend_id: 3,
            model: SyncModel::TimeEntry,
            external_id: "99".to_string(),
            record: Some(serde_json::json!({"id": 99, "hours": "PT2H"})),
            force: true,
        });

        let encoded = serde_json::to_string(&job).unwrap();
        match serde_json::from_str::<Job>(&encoded).unwrap() {
            Job::ImportRecord(decoded) => {
                assert_eq!(decoded.backend_id, 3);
                assert_eq!(decoded.model, SyncModel::TimeEntry);
                assert_eq!(decoded.external_id, "99");
                assert!(decoded.force);
                assert!(decoded.record.is_some());
            }
            other => panic!("Expected ImportRecord job, got {}", other),
        }
    }
}
