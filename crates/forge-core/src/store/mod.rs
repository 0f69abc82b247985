//! Project document store.
//!
//! One document per project, keyed by id. Writes are compare-and-swap on
//! [`ForgeProject::version`]: a save succeeds only when the stored version
//! equals the caller's, and bumps it. Callers that lose the race reload and
//! retry (see [`crate::pipeline`]). The redb backend enforces this across
//! processes through its write transaction; the file backend only within
//! one process.

mod db;
mod file;

pub use self::db::RedbStore;
pub use self::file::FileStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{ForgeError, Result};
use crate::paths;
use crate::project::ForgeProject;
use std::path::Path;
use std::sync::Arc;

pub trait ProjectStore: Send + Sync {
    /// Store a new project at version 1. Fails with `ProjectExists`.
    fn insert(&self, project: &mut ForgeProject) -> Result<()>;

    /// Fails with `ProjectNotFound`.
    fn load(&self, id: &str) -> Result<ForgeProject>;

    /// Compare-and-swap write. Fails with `ConcurrencyConflict` when the
    /// stored version differs from `project.version`; on success the
    /// version is incremented in place.
    fn save(&self, project: &mut ForgeProject) -> Result<()>;

    /// Every project, oldest first.
    fn list(&self) -> Result<Vec<ForgeProject>>;

    fn delete(&self, id: &str) -> Result<()>;
}

/// Open the backend selected in config under `root`.
pub fn open(root: &Path, config: &StoreConfig) -> Result<Arc<dyn ProjectStore>> {
    if !paths::forge_dir(root).is_dir() {
        return Err(ForgeError::NotInitialized);
    }
    let store: Arc<dyn ProjectStore> = match config.backend {
        StoreBackend::File => Arc::new(FileStore::new(root)),
        StoreBackend::Redb => Arc::new(RedbStore::open(&paths::db_path(root))?),
    };
    Ok(store)
}

pub(crate) fn conflict(id: &str, expected: u64, found: u64) -> ForgeError {
    ForgeError::ConcurrencyConflict {
        id: id.to_string(),
        expected,
        found,
        attempts: 1,
    }
}

// ---------------------------------------------------------------------------
// Shared behaviour tests, run against both backends
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::types::Priority;

    fn project(id: &str) -> ForgeProject {
        ForgeProject::new(id, id, "ada", None, Priority::Medium)
    }

    pub fn insert_load_roundtrip(store: &dyn ProjectStore) {
        let mut p = project("alpha");
        store.insert(&mut p).unwrap();
        assert_eq!(p.version, 1);
        let loaded = store.load("alpha").unwrap();
        assert_eq!(loaded, p);
        assert!(matches!(
            store.insert(&mut project("alpha")),
            Err(ForgeError::ProjectExists(_))
        ));
    }

    pub fn missing_project(store: &dyn ProjectStore) {
        assert!(matches!(store.load("ghost"), Err(ForgeError::ProjectNotFound(_))));
        assert!(matches!(store.delete("ghost"), Err(ForgeError::ProjectNotFound(_))));
        let mut p = project("ghost");
        p.version = 1;
        assert!(matches!(store.save(&mut p), Err(ForgeError::ProjectNotFound(_))));
    }

    pub fn stale_save_conflicts(store: &dyn ProjectStore) {
        let mut p = project("beta");
        store.insert(&mut p).unwrap();

        let mut a = store.load("beta").unwrap();
        let mut b = store.load("beta").unwrap();
        a.name = "first".into();
        store.save(&mut a).unwrap();
        assert_eq!(a.version, 2);

        b.name = "second".into();
        match store.save(&mut b) {
            Err(ForgeError::ConcurrencyConflict {
                expected, found, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(found, 2);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(b.version, 1);
        assert_eq!(store.load("beta").unwrap().name, "first");
    }

    pub fn list_and_delete(store: &dyn ProjectStore) {
        for id in ["one", "two", "three"] {
            store.insert(&mut project(id)).unwrap();
        }
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["one", "two", "three"]);
        store.delete("two").unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
        assert!(store.load("two").is_err());
    }
}
