//! Synced model identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies which local model an external record maps to.
///
/// Selects the importer implementation at call time and discriminates
/// binding rows; the string forms below are what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncModel {
    Project,
    TaskStage,
    Task,
    User,
    TimeEntry,
    Activity,
}

impl SyncModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncModel::Project => "project",
            SyncModel::TaskStage => "task_stage",
            SyncModel::Task => "task",
            SyncModel::User => "user",
            SyncModel::TimeEntry => "time_entry",
            SyncModel::Activity => "activity",
        }
    }
}

impl fmt::Display for SyncModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(SyncModel::Project),
            "task_stage" => Ok(SyncModel::TaskStage),
            "task" => Ok(SyncModel::Task),
            "user" => Ok(SyncModel::User),
            "time_entry" => Ok(SyncModel::TimeEntry),
            "activity" => Ok(SyncModel::Activity),
            other => Err(format!("unknown sync model: {}", other)),
        }
    }
}
