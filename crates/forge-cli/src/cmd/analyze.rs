use crate::cmd::open_pipeline;
use crate::output::print_json;
use anyhow::Context;
use forge_core::artifact::{ArtifactKind, NewArtifact};
use forge_core::consensus::{Aspect, ConsensusOrchestrator, ConsensusResult};
use forge_core::Stage;
use std::path::Path;

pub fn run(root: &Path, id: &str, record: bool, json: bool) -> anyhow::Result<()> {
    let (config, pipeline) = open_pipeline(root)?;
    let requirements = pipeline.architecture_requirements(id)?;
    let orchestrator = ConsensusOrchestrator::from_config(&config.consensus);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt
        .block_on(orchestrator.analyze_architecture(&requirements))
        .context("architecture analysis failed")?;

    let artifact = if record {
        let content = serde_json::to_value(&result)?;
        let recorded = pipeline.record_artifact(
            id,
            NewArtifact::new(ArtifactKind::ConsensusReport, "Architecture consensus", content)
                .for_stage(Stage::Technical),
        )?;
        Some(recorded.id)
    } else {
        None
    };

    if json {
        return print_json(&serde_json::json!({
            "result": result,
            "artifact": artifact,
        }));
    }

    print_result(&result);
    if let Some(artifact) = artifact {
        println!("\nRecorded as artifact {artifact}.");
    }
    println!("\nSeed for the technical stage document:\n");
    print!("{}", serde_yaml::to_string(&result.stage_seed())?);
    Ok(())
}

fn print_result(r: &ConsensusResult) {
    let rec = &r.final_recommendation;
    println!(
        "Consensus {:.2} (confidence {}) from {} of {} providers",
        r.overall_consensus,
        r.confidence_level,
        r.analyses.len(),
        r.requested_providers
    );
    println!(
        "Recommendation: {} ({}, score {:.1}; majority: {})",
        rec.style,
        rec.provider,
        rec.score,
        r.majority.join(", ")
    );

    for aspect in [Aspect::Style, Aspect::Component, Aspect::Risk] {
        let agreed: Vec<&str> = r
            .consensus_areas
            .iter()
            .filter(|a| a.aspect == aspect)
            .map(|a| a.value.as_str())
            .collect();
        if !agreed.is_empty() {
            println!("  agreed {aspect}: {}", agreed.join(", "));
        }
    }

    if !r.divergence_areas.is_empty() {
        println!("\nDivergence:");
        for area in &r.divergence_areas {
            for (provider, items) in &area.viewpoints {
                println!("  {} {provider}: {}", area.aspect, items.join(", "));
            }
        }
    }

    if !r.partial_failures.is_empty() {
        println!("\nDropped providers:");
        for f in &r.partial_failures {
            println!("  {f}");
        }
    }
}
