use crate::cmd::{open_pipeline, parse_stage};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum QualitySubcommand {
    /// Overall and per-stage quality, trend and open issues
    Report { id: String },

    /// Every recorded assessment, oldest first
    History {
        id: String,
        /// Only this stage
        #[arg(long)]
        stage: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: QualitySubcommand, json: bool) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    match subcmd {
        QualitySubcommand::Report { id } => {
            let report = pipeline.quality_report(&id)?;
            if json {
                return print_json(&report);
            }
            println!(
                "{}: overall {:.1}, trend {}, current stage {}",
                report.project_id, report.overall_quality, report.trend, report.current_stage
            );
            let rows = report
                .stages
                .iter()
                .map(|s| {
                    vec![
                        s.stage.to_string(),
                        s.score.map_or("-".into(), |v| format!("{v:.1}")),
                        s.gate.map_or("-".into(), |g| g.to_string()),
                        if s.completed { "yes".into() } else { "no".into() },
                        s.assessments.to_string(),
                    ]
                })
                .collect();
            println!();
            print_table(&["STAGE", "SCORE", "GATE", "COMPLETED", "ASSESSMENTS"], rows);

            if !report.open_issues.is_empty() {
                println!("\nOpen issues:");
                for issue in &report.open_issues {
                    println!("  {} [{}] {}: {}", issue.id, issue.kind, issue.stage, issue.message);
                }
            }
            Ok(())
        }
        QualitySubcommand::History { id, stage } => {
            let stage = stage.as_deref().map(parse_stage).transpose()?;
            let project = pipeline.get_project(&id)?;
            let entries: Vec<_> = project
                .quality_tracking
                .history
                .iter()
                .filter(|e| stage.map_or(true, |s| e.stage == s))
                .collect();
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No assessments recorded for '{id}'.");
                return Ok(());
            }
            let rows = entries
                .iter()
                .map(|e| {
                    vec![
                        e.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        e.stage.to_string(),
                        format!("{:.1}", e.score),
                        e.gate.to_string(),
                    ]
                })
                .collect();
            print_table(&["RECORDED", "STAGE", "SCORE", "GATE"], rows);
            Ok(())
        }
    }
}
