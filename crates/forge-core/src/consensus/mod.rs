//! Multi-provider architecture consensus for the technical stage.
//!
//! ```text
//!                          ┌─► provider A (timeout) ─┐
//! requirements ─► request ─┼─► provider B (timeout) ─┼─► normalize ─► agreement ─► ConsensusResult
//!                          └─► provider C (timeout) ─┘        │
//!                                                   dropped ──┴─► partial_failures
//! ```
//!
//! Every provider gets the identical request at the same time and its own
//! timeout. The orchestrator waits for all of them; a provider that errors,
//! times out, panics or returns an unusable reply is dropped from the batch
//! and noted. Only when nothing survives is the call an error.

pub mod agreement;
pub mod normalize;
pub mod request;
pub mod types;

pub use request::ArchitectureRequirements;
pub use types::{
    ArchitectureAnalysis, Aspect, Component, ConsensusArea, ConsensusResult, DivergenceArea,
    FailureReason, ProviderFailure, Risk,
};

use crate::config::ConsensusConfig;
use crate::error::{ForgeError, Result};
use crate::types::ConfidenceLevel;
use chrono::Utc;
use model_client::{HttpProvider, ModelProvider, ModelResponse};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

type CallOutcome = std::result::Result<model_client::Result<ModelResponse>, tokio::time::error::Elapsed>;

pub struct ConsensusOrchestrator {
    providers: Vec<Arc<dyn ModelProvider>>,
    config: ConsensusConfig,
    /// Configured providers that could not be built; reported on every run.
    unavailable: Vec<ProviderFailure>,
}

impl ConsensusOrchestrator {
    pub fn new(providers: Vec<Arc<dyn ModelProvider>>, config: ConsensusConfig) -> Self {
        Self {
            providers,
            config,
            unavailable: Vec::new(),
        }
    }

    /// One HTTP provider per configured entry. Entries whose API key
    /// variable is unset are kept as unavailable rather than failing.
    pub fn from_config(config: &ConsensusConfig) -> Self {
        let mut providers: Vec<Arc<dyn ModelProvider>> = Vec::new();
        let mut unavailable = Vec::new();
        for p in &config.providers {
            let built = match &p.api_key_env {
                Some(var) => HttpProvider::from_env(&p.name, &p.base_url, &p.model, var),
                None => Ok(HttpProvider::new(&p.name, &p.base_url, &p.model, None)),
            };
            match built {
                Ok(provider) => providers.push(Arc::new(provider)),
                Err(e) => {
                    warn!(provider = %p.name, error = %e, "provider unavailable");
                    unavailable.push(ProviderFailure::new(
                        &p.name,
                        FailureReason::Unavailable(e.to_string()),
                    ));
                }
            }
        }
        Self {
            providers,
            config: config.clone(),
            unavailable,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fan the request out to every provider, wait for all of them, and
    /// reconcile the survivors.
    pub async fn analyze_architecture(
        &self,
        requirements: &ArchitectureRequirements,
    ) -> Result<ConsensusResult> {
        requirements.validate()?;
        let requested = self.providers.len() + self.unavailable.len();
        let mut failures = self.unavailable.clone();

        if self.providers.is_empty() {
            return Err(ForgeError::NoProvidersAvailable { failures });
        }

        let request = Arc::new(requirements.to_request());
        let mut join_set = JoinSet::new();

        // Scatter.
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let request = Arc::clone(&request);
            let limit = self.config.timeout_for(provider.name());
            join_set.spawn(async move {
                let name = provider.name().to_string();
                let outcome: CallOutcome = tokio::time::timeout(limit, provider.invoke(&request)).await;
                (name, limit, outcome)
            });
        }

        // Gather.
        let mut analyses = Vec::with_capacity(self.providers.len());
        let mut reported = BTreeSet::new();
        let mut panics = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let (name, limit, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    panics.push(e.to_string());
                    continue;
                }
            };
            reported.insert(name.clone());
            match classify(&name, limit, outcome) {
                Ok(analysis) => {
                    info!(
                        provider = %name,
                        style = %analysis.style,
                        score = analysis.score,
                        latency_ms = analysis.latency_ms,
                        "analysis received"
                    );
                    analyses.push(analysis);
                }
                Err(failure) => {
                    warn!(provider = %name, reason = %failure.reason, "provider dropped from batch");
                    failures.push(failure);
                }
            }
        }

        // A panicked task loses its output, so attribute it by absence.
        if !panics.is_empty() {
            let detail = panics.join("; ");
            for name in self.provider_names() {
                if !reported.contains(name) {
                    warn!(provider = %name, "provider task panicked");
                    failures.push(ProviderFailure::new(name, FailureReason::Panicked(detail.clone())));
                }
            }
        }

        failures.sort_by(|a, b| a.provider.cmp(&b.provider));
        if analyses.is_empty() {
            return Err(ForgeError::NoProvidersAvailable { failures });
        }
        Ok(self.reconcile(analyses, failures, requested))
    }

    /// Fold surviving analyses into one result. Arrival order does not
    /// matter: analyses are ordered by provider name first.
    fn reconcile(
        &self,
        mut analyses: Vec<ArchitectureAnalysis>,
        partial_failures: Vec<ProviderFailure>,
        requested: usize,
    ) -> ConsensusResult {
        analyses.sort_by(|a, b| a.provider.cmp(&b.provider));
        let weights = &self.config.weights;

        let overall = round3(agreement::overall(&analyses, weights));
        let cluster = agreement::majority_cluster(&analyses, weights, self.config.cluster_threshold);
        let pick = agreement::best_in(&analyses, &cluster).unwrap_or(0);
        let final_recommendation = analyses[pick].clone();
        let majority = cluster.iter().map(|&i| analyses[i].provider.clone()).collect();
        let confidence_level = confidence(overall, analyses.len(), requested);

        info!(
            analyses = analyses.len(),
            failed = partial_failures.len(),
            consensus = overall,
            recommended = %final_recommendation.provider,
            style = %final_recommendation.style,
            "consensus reached"
        );

        ConsensusResult {
            overall_consensus: overall,
            consensus_areas: agreement::consensus_areas(&analyses),
            divergence_areas: agreement::divergence_areas(&analyses),
            majority,
            final_recommendation,
            confidence_level,
            partial_failures,
            requested_providers: requested.max(analyses.len()),
            analyses,
            generated_at: Utc::now(),
        }
    }
}

fn classify(
    name: &str,
    limit: Duration,
    outcome: CallOutcome,
) -> std::result::Result<ArchitectureAnalysis, ProviderFailure> {
    let reason = match outcome {
        Ok(Ok(response)) => match normalize::normalize(&response) {
            // Results are keyed by the configured name, not whatever the reply claims.
            Ok(mut analysis) => {
                analysis.provider = name.to_string();
                return Ok(analysis);
            }
            Err(detail) => FailureReason::Malformed(detail),
        },
        Ok(Err(e)) => FailureReason::Error(e.to_string()),
        Err(_) => FailureReason::Timeout {
            after_ms: limit.as_millis() as u64,
        },
    };
    Err(ProviderFailure::new(name, reason))
}

/// A lone survivor is never better than low confidence; otherwise
/// agreement is discounted by the share of providers that answered.
fn confidence(consensus: f64, survivors: usize, requested: usize) -> ConfidenceLevel {
    if survivors <= 1 {
        return ConfidenceLevel::Low;
    }
    let coverage = survivors as f64 / requested.max(survivors) as f64;
    ConfidenceLevel::from_score(consensus * (0.5 + 0.5 * coverage))
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
