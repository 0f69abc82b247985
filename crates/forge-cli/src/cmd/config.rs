use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::config::{Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective config and per-stage gate thresholds
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }
    print!("{}", serde_yaml::to_string(&config)?);

    let rows = config
        .quality
        .profiles()
        .iter()
        .map(|p| {
            let dims: Vec<String> = p
                .dimensions
                .iter()
                .map(|d| format!("{} {:.2}", d.name, d.weight))
                .collect();
            vec![
                p.stage.to_string(),
                format!("{:.0}", p.thresholds.minimum),
                format!("{:.0}", p.thresholds.recommended),
                dims.join(", "),
            ]
        })
        .collect();
    println!();
    print_table(&["STAGE", "MINIMUM", "RECOMMENDED", "DIMENSIONS"], rows);
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
