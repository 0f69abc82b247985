use super::{conflict, ProjectStore};
use crate::error::{ForgeError, Result};
use crate::io;
use crate::paths;
use crate::project::ForgeProject;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// YAML document per project under `.forge/projects/<id>/project.yaml`.
///
/// Version checks run under a per-project lock held by this `FileStore`,
/// so the compare-and-swap only covers writers within one process. Writers
/// in separate processes fall back to last-writer-wins. Writes go through
/// a temp file and rename; readers never see a partial document.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id.to_string()).or_default().clone()
    }

    fn read(&self, id: &str) -> Result<ForgeProject> {
        let path = paths::project_document(&self.root, id);
        if !path.exists() {
            return Err(ForgeError::ProjectNotFound(id.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let project: ForgeProject = serde_yaml::from_str(&data)?;
        Ok(project)
    }

    fn write(&self, project: &ForgeProject) -> Result<()> {
        let path = paths::project_document(&self.root, &project.id);
        let data = serde_yaml::to_string(project)?;
        io::atomic_write(&path, data.as_bytes())
    }
}

impl ProjectStore for FileStore {
    fn insert(&self, project: &mut ForgeProject) -> Result<()> {
        paths::validate_id(&project.id)?;
        let lock = self.lock_for(&project.id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        if paths::project_document(&self.root, &project.id).exists() {
            return Err(ForgeError::ProjectExists(project.id.clone()));
        }
        project.version = 1;
        if let Err(e) = self.write(project) {
            project.version = 0;
            return Err(e);
        }
        Ok(())
    }

    fn load(&self, id: &str) -> Result<ForgeProject> {
        paths::validate_id(id)?;
        self.read(id)
    }

    fn save(&self, project: &mut ForgeProject) -> Result<()> {
        let lock = self.lock_for(&project.id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let stored = self.read(&project.id)?;
        if stored.version != project.version {
            return Err(conflict(&project.id, project.version, stored.version));
        }
        project.version += 1;
        if let Err(e) = self.write(project) {
            project.version -= 1;
            return Err(e);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<ForgeProject>> {
        let dir = paths::projects_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut projects = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let id = entry.file_name().to_string_lossy().into_owned();
                match self.read(&id) {
                    Ok(p) => projects.push(p),
                    Err(ForgeError::ProjectNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }

    fn delete(&self, id: &str) -> Result<()> {
        paths::validate_id(id)?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let dir = paths::project_dir(&self.root, id);
        if !paths::project_document(&self.root, id).exists() {
            return Err(ForgeError::ProjectNotFound(id.to_string()));
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}
