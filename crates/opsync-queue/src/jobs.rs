// Re-export job types from opsync-core for backward compatibility
pub use opsync_core::{
    ImportActivitiesJob, ImportAvatarJob, ImportProjectsJob, ImportRecordJob, ImportTimeEntriesJob,
    ImportWorkPackagesJob, Job, TaskChangedJob, UserCreatedJob,
};
