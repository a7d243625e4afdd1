//! Activity sync policy for projects
//!
//! Controls which work-package activities are mirrored into local messages.

use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

/// Activity discriminator the tracking service puts on comment activities.
pub const COMMENT_ACTIVITY_TYPE: &str = "Activity::Comment";

/// Per-project activity sync policy
///
/// - `None`: no activity of any type is imported
/// - `Some`: only user comments are imported
/// - `All`: every fetched activity is imported
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ActivitySyncMode {
    #[default]
    #[sea_orm(string_value = "none")]
    None,

    #[sea_orm(string_value = "some")]
    Some,

    #[sea_orm(string_value = "all")]
    All,
}

impl std::fmt::Display for ActivitySyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivitySyncMode::None => write!(f, "none"),
            ActivitySyncMode::Some => write!(f, "some"),
            ActivitySyncMode::All => write!(f, "all"),
        }
    }
}

impl ActivitySyncMode {
    /// Whether an activity of the given type passes this policy.
    pub fn allows(&self, activity_type: &str) -> bool {
        match self {
            ActivitySyncMode::None => false,
            ActivitySyncMode::Some => activity_type == COMMENT_ACTIVITY_TYPE,
            ActivitySyncMode::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_rejects_everything() {
        assert!(!ActivitySyncMode::None.allows(COMMENT_ACTIVITY_TYPE));
        assert!(!ActivitySyncMode::None.allows("Activity"));
    }

    #[test]
    fn test_some_admits_comments_only() {
        assert!(ActivitySyncMode::Some.allows(COMMENT_ACTIVITY_TYPE));
        assert!(!ActivitySyncMode::Some.allows("Activity"));
        assert!(!ActivitySyncMode::Some.allows("Activity::System"));
    }

    #[test]
    fn test_all_admits_everything() {
        assert!(ActivitySyncMode::All.allows(COMMENT_ACTIVITY_TYPE));
        assert!(ActivitySyncMode::All.allows("Activity"));
    }

    #[test]
    fn test_default_is_none() {
        assert_eq!(ActivitySyncMode::default(), ActivitySyncMode::None);
    }

    #[test]
    fn test_serde_round_trip() {
        assert_eq!(
            serde_json::to_string(&ActivitySyncMode::Some).unwrap(),
            "\"some\""
        );
        assert_eq!(
            serde_json::from_str::<ActivitySyncMode>("\"all\"").unwrap(),
            ActivitySyncMode::All
        );
    }
}
