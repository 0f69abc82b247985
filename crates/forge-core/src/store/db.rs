//! redb-backed project store.
//!
//! A single `projects` table maps project id to the JSON-encoded document.
//! redb serializes write transactions, so the version check and the write
//! commit as one unit.

use std::path::Path;

use ::redb::{Database, ReadableTable, TableDefinition};
use serde::Deserialize;

use super::{conflict, ProjectStore};
use crate::error::{ForgeError, Result};
use crate::paths;
use crate::project::ForgeProject;

const PROJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("projects");

fn db_err(e: impl std::fmt::Display) -> ForgeError {
    ForgeError::Store(e.to_string())
}

/// Reads only the revision field of a stored document.
#[derive(Deserialize)]
struct Revision {
    #[serde(default)]
    version: u64,
}

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating the table if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(PROJECTS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }
}

impl ProjectStore for RedbStore {
    fn insert(&self, project: &mut ForgeProject) -> Result<()> {
        paths::validate_id(&project.id)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(PROJECTS).map_err(db_err)?;
            if table.get(project.id.as_str()).map_err(db_err)?.is_some() {
                return Err(ForgeError::ProjectExists(project.id.clone()));
            }
            let mut stored = project.clone();
            stored.version = 1;
            let value = serde_json::to_vec(&stored)?;
            table
                .insert(project.id.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        project.version = 1;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<ForgeProject> {
        paths::validate_id(id)?;
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(PROJECTS).map_err(db_err)?;
        let entry = table
            .get(id)
            .map_err(db_err)?
            .ok_or_else(|| ForgeError::ProjectNotFound(id.to_string()))?;
        let project: ForgeProject = serde_json::from_slice(entry.value())?;
        Ok(project)
    }

    fn save(&self, project: &mut ForgeProject) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(PROJECTS).map_err(db_err)?;
            let found = {
                let entry = table
                    .get(project.id.as_str())
                    .map_err(db_err)?
                    .ok_or_else(|| ForgeError::ProjectNotFound(project.id.clone()))?;
                serde_json::from_slice::<Revision>(entry.value())?.version
            };
            if found != project.version {
                return Err(conflict(&project.id, project.version, found));
            }
            let mut next = project.clone();
            next.version += 1;
            let value = serde_json::to_vec(&next)?;
            table
                .insert(project.id.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        project.version += 1;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ForgeProject>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(PROJECTS).map_err(db_err)?;
        let mut projects = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let project: ForgeProject = serde_json::from_slice(v.value())?;
            projects.push(project);
        }
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    fn delete(&self, id: &str) -> Result<()> {
        paths::validate_id(id)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = wt.open_table(PROJECTS).map_err(db_err)?;
            let removed = table.remove(id).map_err(db_err)?.is_some();
            removed
        };
        if !removed {
            return Err(ForgeError::ProjectNotFound(id.to_string()));
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use tempfile::TempDir;

    fn store() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("forge.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn insert_load_roundtrip() {
        let (_dir, s) = store();
        contract::insert_load_roundtrip(&s);
    }

    #[test]
    fn missing_project() {
        let (_dir, s) = store();
        contract::missing_project(&s);
    }

    #[test]
    fn stale_save_conflicts() {
        let (_dir, s) = store();
        contract::stale_save_conflicts(&s);
    }

    #[test]
    fn list_and_delete() {
        let (_dir, s) = store();
        contract::list_and_delete(&s);
    }

    #[test]
    fn reopen_preserves_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forge.redb");
        {
            let s = RedbStore::open(&path).unwrap();
            let mut p = ForgeProject::new("delta", "Delta", "ada", None, Default::default());
            s.insert(&mut p).unwrap();
        }
        let s = RedbStore::open(&path).unwrap();
        assert_eq!(s.load("delta").unwrap().name, "Delta");
    }
}
