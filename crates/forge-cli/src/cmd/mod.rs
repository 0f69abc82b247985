pub mod analyze;
pub mod artifact;
pub mod config;
pub mod export;
pub mod init;
pub mod project;
pub mod quality;
pub mod stage;

use anyhow::Context;
use forge_core::config::{Config, WarnLevel};
use forge_core::{store, Stage, StagePipeline};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Load config, refuse it when validation finds errors, and open the
/// configured store.
pub fn open_pipeline(root: &Path) -> anyhow::Result<(Config, StagePipeline)> {
    let config = Config::load(root).context("failed to load config")?;
    if config.has_errors() {
        let errors: Vec<String> = config
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        anyhow::bail!(
            "invalid config: {}; see `forge config validate`",
            errors.join("; ")
        );
    }
    let store = store::open(root, &config.store).context("failed to open project store")?;
    let pipeline = StagePipeline::from_config(store, &config);
    Ok((config, pipeline))
}

pub fn parse_stage(s: &str) -> anyhow::Result<Stage> {
    Ok(s.parse::<Stage>()?)
}

/// Read a stage document from a YAML or JSON file, or stdin when `path`
/// is `-`.
pub fn read_document(path: &Path) -> anyhow::Result<Value> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    let is_json = path.extension().is_some_and(|e| e == "json");
    let value = if is_json {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))?
    };
    Ok(value)
}
