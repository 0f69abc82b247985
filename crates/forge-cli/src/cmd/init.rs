use anyhow::Context;
use forge_core::config::{Config, StoreBackend};
use forge_core::{io, paths};
use std::path::Path;

pub fn run(root: &Path, backend: &str) -> anyhow::Result<()> {
    let backend: StoreBackend = backend.parse()?;

    println!("Initializing forge in: {}", root.display());

    for dir in [paths::FORGE_DIR, paths::PROJECTS_DIR, paths::EXPORTS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        let mut cfg = Config::default();
        cfg.store.backend = backend;
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nforge initialized. Next: forge project create \"<name>\" --owner <you>");
    Ok(())
}
