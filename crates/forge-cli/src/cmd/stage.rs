use crate::cmd::{open_pipeline, parse_stage, read_document};
use crate::output::{print_assessment, print_json};
use anyhow::Context;
use clap::Subcommand;
use forge_core::project::GateOverride;
use forge_core::{Stage, StagePipeline};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum StageSubcommand {
    /// Submit a stage document and run its quality gate
    Complete {
        id: String,
        stage: String,
        /// YAML or JSON document ('-' reads stdin)
        #[arg(long)]
        file: PathBuf,
        /// Who is submitting
        #[arg(long)]
        actor: Option<String>,
        /// Advance to the next stage when the gate passes
        #[arg(long)]
        advance: bool,
    },

    /// Assess a document without storing it
    Assess {
        id: String,
        stage: String,
        #[arg(long)]
        file: PathBuf,
    },

    /// Advance to the next stage (the current stage's gate must pass)
    Advance {
        id: String,
        /// Target stage (default: the one after the current stage)
        #[arg(long)]
        to: Option<String>,
    },

    /// Advance past a blocking gate, recording who and why
    Override {
        id: String,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        operator: String,
        #[arg(long)]
        reason: String,
    },

    /// Re-open the completed current stage for resubmission
    Reopen {
        id: String,
        stage: String,
        #[arg(long)]
        actor: String,
    },

    /// Mark the pipeline complete once the playbook gate passes
    Finish { id: String },
}

pub fn run(root: &Path, subcmd: StageSubcommand, json: bool) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    match subcmd {
        StageSubcommand::Complete {
            id,
            stage,
            file,
            actor,
            advance,
        } => complete(&pipeline, &id, parse_stage(&stage)?, &file, actor.as_deref(), advance, json),
        StageSubcommand::Assess { id, stage, file } => {
            let stage = parse_stage(&stage)?;
            let content = read_document(&file)?;
            let assessment = pipeline.assess_stage(&id, stage, &content)?;
            if json {
                print_json(&assessment)
            } else {
                print_assessment(&assessment);
                Ok(())
            }
        }
        StageSubcommand::Advance { id, to } => {
            let target = target_stage(&pipeline, &id, to.as_deref())?;
            let project = pipeline.advance_stage(&id, target)?;
            report_stage(&project.id, project.current_stage, project.progress_percentage, json)
        }
        StageSubcommand::Override {
            id,
            to,
            operator,
            reason,
        } => {
            let target = target_stage(&pipeline, &id, to.as_deref())?;
            let project = pipeline.override_advance(
                &id,
                &GateOverride {
                    target,
                    operator,
                    reason,
                },
            )?;
            if !json {
                eprintln!("warning: gate overridden; a gate_override quality issue was recorded");
            }
            report_stage(&project.id, project.current_stage, project.progress_percentage, json)
        }
        StageSubcommand::Reopen { id, stage, actor } => {
            let stage = parse_stage(&stage)?;
            let project = pipeline.reopen_stage(&id, stage, &actor)?;
            if json {
                print_json(&project.stage(stage))
            } else {
                println!("Re-opened {stage} on '{}'; submit a revised document", project.id);
                Ok(())
            }
        }
        StageSubcommand::Finish { id } => {
            let project = pipeline.finish_pipeline(&id)?;
            if json {
                print_json(&serde_json::json!({"id": project.id, "status": project.status}))
            } else {
                println!("Pipeline complete for '{}'", project.id);
                Ok(())
            }
        }
    }
}

fn complete(
    pipeline: &StagePipeline,
    id: &str,
    stage: Stage,
    file: &Path,
    actor: Option<&str>,
    advance: bool,
    json: bool,
) -> anyhow::Result<()> {
    let content = read_document(file)?;
    let done = pipeline
        .complete_stage(id, stage, content, actor)
        .with_context(|| format!("failed to complete {stage} for '{id}'"))?;

    let advanced = match (advance && done.can_progress, stage.next()) {
        (true, Some(next)) => Some(pipeline.advance_stage(id, next)?.current_stage),
        _ => None,
    };

    if json {
        return print_json(&serde_json::json!({
            "completion": done,
            "advanced_to": advanced,
        }));
    }

    print_assessment(&done.quality_assessment);
    println!();
    match (done.can_progress, advanced, stage.next()) {
        (false, _, _) => println!(
            "Gate BLOCK: {stage} needs at least {:.0}. Revise and resubmit.",
            done.quality_assessment.thresholds.minimum
        ),
        (true, Some(next), _) => println!("Stage {stage} passed; now at {next}."),
        (true, None, Some(next)) => {
            println!("Stage {stage} passed. Run `forge stage advance {id}` to move to {next}.")
        }
        (true, None, None) => println!("Playbook passed. Run `forge stage finish {id}` to complete."),
    }
    Ok(())
}

fn target_stage(pipeline: &StagePipeline, id: &str, to: Option<&str>) -> anyhow::Result<Stage> {
    if let Some(to) = to {
        return parse_stage(to);
    }
    let project = pipeline.get_project(id)?;
    project.current_stage.next().with_context(|| {
        format!(
            "'{id}' is at the last stage; use `forge stage finish {id}` instead"
        )
    })
}

fn report_stage(id: &str, stage: Stage, progress: f64, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({
            "id": id,
            "current_stage": stage,
            "progress_percentage": progress,
        }))
    } else {
        println!("'{id}' is now at {stage} ({progress:.0}% complete)");
        Ok(())
    }
}
