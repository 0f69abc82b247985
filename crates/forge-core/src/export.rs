//! Project export bundles.
//!
//! An export is a single rendered document holding a project summary and the
//! selected stage documents with their latest quality results. Exports are
//! pure reads; recording one as an artifact is the caller's choice.

use crate::artifact::Artifact;
use crate::error::{ForgeError, Result};
use crate::io;
use crate::project::ForgeProject;
use crate::quality::features::is_populated;
use crate::types::{GateStatus, ProjectStatus, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ExportFormat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Yaml,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Markdown => "markdown",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(ForgeError::UnknownFormat(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub project_id: String,
    pub format: ExportFormat,
    pub file_name: String,
    pub stages: Vec<Stage>,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

impl ExportBundle {
    /// Write the bundle into `dir` under its file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        io::atomic_write(&path, self.content.as_bytes())?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    project: ProjectSummary<'a>,
    stages: BTreeMap<Stage, StageExport<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    artifacts: Vec<&'a Artifact>,
    exported_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ProjectSummary<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    owner: &'a str,
    status: ProjectStatus,
    current_stage: Stage,
    progress_percentage: f64,
    overall_quality: f64,
}

#[derive(Serialize)]
struct StageExport<'a> {
    title: &'static str,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gate: Option<GateStatus>,
    content: &'a Value,
}

/// Stages that hold a non-empty document, in pipeline order.
pub fn stages_with_data(project: &ForgeProject) -> Vec<Stage> {
    project
        .stages
        .iter()
        .filter(|(_, data)| is_populated(&data.content))
        .map(|(stage, _)| *stage)
        .collect()
}

/// Render `project` in `format`. An empty `stages` selects every stage with
/// data; naming a stage without data is a validation error.
pub fn export_project(
    project: &ForgeProject,
    format: ExportFormat,
    stages: &[Stage],
) -> Result<ExportBundle> {
    let available = stages_with_data(project);
    let mut selected: Vec<Stage> = if stages.is_empty() {
        available.clone()
    } else {
        stages.to_vec()
    };
    selected.sort();
    selected.dedup();
    if let Some(missing) = selected.iter().find(|s| !available.contains(*s)) {
        return Err(ForgeError::validation(
            "stages",
            format!("stage '{missing}' has no content to export"),
        ));
    }

    let doc = ExportDocument {
        project: ProjectSummary {
            id: &project.id,
            name: &project.name,
            description: project.description.as_deref(),
            owner: &project.owner,
            status: project.status,
            current_stage: project.current_stage,
            progress_percentage: project.progress_percentage,
            overall_quality: project.quality_tracking.overall_quality,
        },
        stages: selected
            .iter()
            .filter_map(|s| project.stage(*s).map(|data| (*s, data)))
            .map(|(s, data)| {
                let assessment = data.assessment.as_ref();
                (
                    s,
                    StageExport {
                        title: s.title(),
                        completed: data.stage_completed,
                        score: assessment.map(|a| a.overall_score),
                        gate: assessment.map(|a| a.gate),
                        content: &data.content,
                    },
                )
            })
            .collect(),
        artifacts: project
            .artifacts
            .iter()
            .filter(|a| a.stage.map_or(true, |s| selected.contains(&s)))
            .collect(),
        exported_at: Utc::now(),
    };

    let content = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&doc)?,
        ExportFormat::Yaml => serde_yaml::to_string(&doc)?,
        ExportFormat::Markdown => render_markdown(&doc)?,
    };

    tracing::debug!(project = %project.id, format = %format, stages = selected.len(), "project exported");
    Ok(ExportBundle {
        project_id: project.id.clone(),
        format,
        file_name: format!("{}-export.{}", project.id, format.extension()),
        stages: selected,
        content,
        generated_at: doc.exported_at,
    })
}

fn render_markdown(doc: &ExportDocument<'_>) -> Result<String> {
    let p = &doc.project;
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", p.name));
    if let Some(description) = p.description {
        out.push_str(description);
        out.push_str("\n\n");
    }
    out.push_str(&format!("- **Id:** {}\n", p.id));
    out.push_str(&format!("- **Owner:** {}\n", p.owner));
    out.push_str(&format!("- **Status:** {}\n", p.status));
    out.push_str(&format!("- **Current stage:** {}\n", p.current_stage.title()));
    out.push_str(&format!("- **Progress:** {:.0}%\n", p.progress_percentage));
    out.push_str(&format!("- **Overall quality:** {:.1}\n", p.overall_quality));

    for s in doc.stages.values() {
        out.push_str(&format!("\n## {}\n\n", s.title));
        match (s.score, s.gate) {
            (Some(score), Some(gate)) => {
                out.push_str(&format!("**Quality:** {score:.1} ({gate})"));
            }
            _ => out.push_str("**Quality:** not assessed"),
        }
        out.push_str(if s.completed { " · completed\n\n" } else { "\n\n" });
        out.push_str("```yaml\n");
        out.push_str(&serde_yaml::to_string(s.content)?);
        out.push_str("```\n");
    }

    if !doc.artifacts.is_empty() {
        out.push_str("\n## Artifacts\n\n");
        for a in &doc.artifacts {
            let stage = a.stage.map(|s| format!(" [{s}]")).unwrap_or_default();
            out.push_str(&format!("- `{}` {}{}: {}\n", a.id, a.kind, stage, a.title));
        }
    }
    Ok(out)
}
