//! Declared link dependencies
//!
//! Each model importer names the link relations it depends on. A required
//! relation that is absent from a record is a data-integrity failure; an
//! optional one is skipped silently.

use opsync_core::SyncModel;

#[derive(Debug, Clone, Copy)]
pub struct LinkDependency {
    /// Relation name in the record's `_links` map
    pub key: &'static str,
    /// Path segment identifying the target resource in the href
    pub endpoint: &'static str,
    /// Local model the relation resolves to
    pub model: SyncModel,
    pub required: bool,
}

impl LinkDependency {
    pub const fn required(key: &'static str, endpoint: &'static str, model: SyncModel) -> Self {
        Self {
            key,
            endpoint,
            model,
            required: true,
        }
    }

    pub const fn optional(key: &'static str, endpoint: &'static str, model: SyncModel) -> Self {
        Self {
            key,
            endpoint,
            model,
            required: false,
        }
    }
}

pub const PROJECT_LINK: LinkDependency =
    LinkDependency::required("project", "projects", SyncModel::Project);
pub const STATUS_LINK: LinkDependency =
    LinkDependency::required("status", "statuses", SyncModel::TaskStage);
pub const ASSIGNEE_LINK: LinkDependency =
    LinkDependency::optional("assignee", "users", SyncModel::User);
pub const USER_LINK: LinkDependency = LinkDependency::required("user", "users", SyncModel::User);
pub const WORK_PACKAGE_LINK: LinkDependency =
    LinkDependency::required("workPackage", "work_packages", SyncModel::Task);
pub const OPTIONAL_WORK_PACKAGE_LINK: LinkDependency =
    LinkDependency::optional("workPackage", "work_packages", SyncModel::Task);
