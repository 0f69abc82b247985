use crate::cmd::{open_pipeline, parse_stage, read_document};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use forge_core::artifact::{ArtifactKind, NewArtifact};
use forge_core::ForgeError;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ArtifactSubcommand {
    /// Append an artifact to a project
    Record {
        id: String,
        /// stage_document, consensus_report, export or attachment
        #[arg(long, default_value = "attachment")]
        kind: String,
        #[arg(long)]
        title: String,
        /// YAML or JSON content ('-' reads stdin)
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        stage: Option<String>,
        /// Author
        #[arg(long)]
        by: Option<String>,
    },

    /// List a project's artifacts
    List {
        id: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        stage: Option<String>,
    },

    /// Show one artifact with its content
    Show { id: String, artifact: String },
}

pub fn run(root: &Path, subcmd: ArtifactSubcommand, json: bool) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    match subcmd {
        ArtifactSubcommand::Record {
            id,
            kind,
            title,
            file,
            stage,
            by,
        } => {
            let mut new = NewArtifact::new(kind.parse()?, title, read_document(&file)?);
            if let Some(stage) = stage {
                new = new.for_stage(parse_stage(&stage)?);
            }
            if let Some(by) = by {
                new = new.by(by);
            }
            let artifact = pipeline.record_artifact(&id, new)?;
            if json {
                print_json(&artifact)
            } else {
                println!("Recorded {} ({}) on '{id}'", artifact.id, artifact.kind);
                Ok(())
            }
        }
        ArtifactSubcommand::List { id, kind, stage } => {
            let kind = kind.as_deref().map(str::parse::<ArtifactKind>).transpose()?;
            let stage = stage.as_deref().map(parse_stage).transpose()?;
            let project = pipeline.get_project(&id)?;
            let artifacts: Vec<_> = project
                .artifacts
                .iter()
                .filter(|a| kind.map_or(true, |k| a.kind == k))
                .filter(|a| stage.map_or(true, |s| a.stage == Some(s)))
                .collect();
            if json {
                return print_json(&artifacts);
            }
            if artifacts.is_empty() {
                println!("No artifacts.");
                return Ok(());
            }
            let rows = artifacts
                .iter()
                .map(|a| {
                    vec![
                        a.id.clone(),
                        a.kind.to_string(),
                        a.stage.map_or("-".into(), |s| s.to_string()),
                        a.title.clone(),
                        a.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "KIND", "STAGE", "TITLE", "CREATED"], rows);
            Ok(())
        }
        ArtifactSubcommand::Show { id, artifact } => {
            let project = pipeline.get_project(&id)?;
            let found = project
                .artifact(&artifact)
                .ok_or_else(|| ForgeError::ArtifactNotFound(artifact.clone()))?;
            if json {
                return print_json(found);
            }
            println!("{}  {}  {}", found.id, found.kind, found.title);
            if let Some(stage) = found.stage {
                println!("stage: {stage}");
            }
            if let Some(by) = &found.created_by {
                println!("by:    {by}");
            }
            println!();
            print!("{}", serde_yaml::to_string(&found.content)?);
            Ok(())
        }
    }
}
