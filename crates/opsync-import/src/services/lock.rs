//! Advisory import locks
//!
//! Serializes concurrent imports of the same logical entity. Locks are
//! cooperative and in-process: workers run as tokio tasks inside one host
//! application, so a shared registry of held keys is the whole mechanism.
//! Contention is surfaced as a retryable error, never waited out here.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use opsync_core::{SyncError, SyncModel, SyncResult};
use opsync_entities::backends;
use tracing::debug;

/// Registry of currently held import locks.
#[derive(Default)]
pub struct LockRegistry {
    held: Mutex<HashSet<String>>,
}

/// Holds one lock key until dropped.
pub struct LockGuard {
    registry: Arc<LockRegistry>,
    key: String,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the given key or fail with `SyncError::LockContention`.
    pub fn try_acquire(self: &Arc<Self>, key: &str) -> SyncResult<LockGuard> {
        let mut held = self
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !held.insert(key.to_string()) {
            return Err(SyncError::LockContention(key.to_string()));
        }

        debug!("Acquired import lock: {}", key);
        Ok(LockGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut held = self
            .registry
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        held.remove(&self.key);
        debug!("Released import lock: {}", self.key);
    }
}

/// Lock key serializing imports of one (backend, model, external id) triple.
pub fn import_lock_key(backend: &backends::Model, model: SyncModel, external_id: &str) -> String {
    format!(
        "import({}, {}, {}, {})",
        backend.name, backend.id, model, external_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> backends::Model {
        backends::Model {
            id: 1,
            name: "op".to_string(),
            api_url: "http://openproject".to_string(),
            api_key: "secret".to_string(),
            page_size: 20,
            sync_project_status: true,
            active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_lock_key_format() {
        assert_eq!(
            import_lock_key(&backend(), SyncModel::Task, "1528"),
            "import(op, 1, task, 1528)"
        );
    }

    #[test]
    fn test_acquire_and_contend() {
        let registry = Arc::new(LockRegistry::new());
        let key = import_lock_key(&backend(), SyncModel::Task, "1528");

        let guard = registry.try_acquire(&key).expect("first acquire succeeds");

        match registry.try_acquire(&key) {
            Err(SyncError::LockContention(contended)) => assert_eq!(contended, key),
            other => panic!("expected contention, got {:?}", other.map(|_| ())),
        }

        drop(guard);
        registry
            .try_acquire(&key)
            .expect("lock is free again after guard drop");
    }

    #[test]
    fn test_distinct_keys_do_not_contend() {
        let registry = Arc::new(LockRegistry::new());

        let _task = registry
            .try_acquire(&import_lock_key(&backend(), SyncModel::Task, "1"))
            .unwrap();
        let _user = registry
            .try_acquire(&import_lock_key(&backend(), SyncModel::User, "1"))
            .unwrap();
        let _other = registry
            .try_acquire(&import_lock_key(&backend(), SyncModel::Task, "2"))
            .unwrap();
    }
}
