use crate::cmd::{open_pipeline, parse_stage};
use crate::output::print_json;
use anyhow::Context;
use forge_core::artifact::{ArtifactKind, NewArtifact};
use forge_core::export::ExportFormat;
use forge_core::paths;
use std::path::{Path, PathBuf};

pub struct ExportArgs {
    pub id: String,
    pub format: String,
    pub stages: Vec<String>,
    pub out: Option<PathBuf>,
    pub stdout: bool,
    pub record: bool,
}

pub fn run(root: &Path, args: ExportArgs, json: bool) -> anyhow::Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let stages = args
        .stages
        .iter()
        .map(|s| parse_stage(s.trim()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (_, pipeline) = open_pipeline(root)?;
    let bundle = pipeline.export_project(&args.id, format, &stages)?;

    if args.stdout {
        print!("{}", bundle.content);
        return Ok(());
    }

    let dir = args.out.unwrap_or_else(|| paths::exports_dir(root));
    let path = bundle
        .write_to(&dir)
        .with_context(|| format!("failed to write export into {}", dir.display()))?;

    let artifact = if args.record {
        let content = serde_json::json!({
            "format": bundle.format,
            "file_name": bundle.file_name,
            "stages": bundle.stages,
        });
        let title = format!("{} export", bundle.format);
        Some(pipeline.record_artifact(&args.id, NewArtifact::new(ArtifactKind::Export, title, content))?.id)
    } else {
        None
    };

    if json {
        print_json(&serde_json::json!({
            "project_id": bundle.project_id,
            "format": bundle.format,
            "stages": bundle.stages,
            "path": path,
            "artifact": artifact,
        }))
    } else {
        println!("Exported {} stage(s) to {}", bundle.stages.len(), path.display());
        Ok(())
    }
}
