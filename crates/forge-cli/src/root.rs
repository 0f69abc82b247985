use forge_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the forge workspace root.
///
/// Priority:
/// 1. `--root` flag / `FORGE_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.forge/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_forge_dir(&cwd).unwrap_or(cwd)
}

fn find_forge_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(paths::FORGE_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn finds_forge_dir_from_nested_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".forge")).unwrap();
        let nested = dir.path().join("docs/drafts");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_forge_dir(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_forge_dir_found() {
        let dir = TempDir::new().unwrap();
        assert!(find_forge_dir(dir.path()).is_none());
    }
}
