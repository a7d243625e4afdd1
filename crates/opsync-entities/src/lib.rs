pub mod activity_sync;
pub mod backends;
pub mod messages;
pub mod projects;
pub mod sync_bindings;
pub mod task_stages;
pub mod tasks;
pub mod time_entries;
pub mod users;

pub use activity_sync::ActivitySyncMode;
