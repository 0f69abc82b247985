use crate::types::ConfidenceLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ArchitectureAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Lowercased, whitespace-collapsed name used for comparison.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    /// One of [`RISK_CATEGORIES`](super::normalize::RISK_CATEGORIES).
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// One provider's answer, normalized onto the common schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureAnalysis {
    pub provider: String,
    pub model: String,
    /// Canonical style identifier, e.g. `microservices`, `modular_monolith`.
    pub style: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub risks: Vec<Risk>,
    /// Self-reported or derived quality of the analysis, 0–100.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub latency_ms: u64,
}

impl ArchitectureAnalysis {
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name.as_str())
    }

    pub fn component_kinds(&self) -> impl Iterator<Item = &str> {
        self.components.iter().filter_map(|c| c.kind.as_deref())
    }

    pub fn risk_categories(&self) -> impl Iterator<Item = &str> {
        self.risks.iter().map(|r| r.category.as_str())
    }
}

// ---------------------------------------------------------------------------
// Provider failures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureReason {
    Timeout { after_ms: u64 },
    Error(String),
    /// The provider answered but the reply could not be normalized.
    Malformed(String),
    Panicked(String),
    /// The provider could not be constructed, e.g. its API key is unset.
    Unavailable(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout { after_ms } => write!(f, "timed out after {after_ms}ms"),
            FailureReason::Error(e) => write!(f, "error: {e}"),
            FailureReason::Malformed(e) => write!(f, "malformed response: {e}"),
            FailureReason::Panicked(e) => write!(f, "task panicked: {e}"),
            FailureReason::Unavailable(e) => write!(f, "unavailable: {e}"),
        }
    }
}

/// A provider dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: FailureReason,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            provider: provider.into(),
            reason,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, FailureReason::Timeout { .. })
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

// ---------------------------------------------------------------------------
// Agreement areas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Style,
    Component,
    Risk,
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Aspect::Style => "style",
            Aspect::Component => "component",
            Aspect::Risk => "risk",
        };
        f.write_str(s)
    }
}

/// An item a strict majority of analyses share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusArea {
    pub aspect: Aspect,
    pub value: String,
    pub supporters: Vec<String>,
    /// Share of surviving analyses that include the item.
    pub support: f64,
}

/// An aspect the analyses disagree on, with each provider's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceArea {
    pub aspect: Aspect,
    /// Provider name → the items that provider holds outside the majority.
    pub viewpoints: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// ConsensusResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Mean pairwise agreement across surviving analyses, 0..=1.
    pub overall_consensus: f64,
    /// Surviving analyses ordered by provider name.
    pub analyses: Vec<ArchitectureAnalysis>,
    #[serde(default)]
    pub consensus_areas: Vec<ConsensusArea>,
    #[serde(default)]
    pub divergence_areas: Vec<DivergenceArea>,
    /// Providers in the majority cluster.
    pub majority: Vec<String>,
    pub final_recommendation: ArchitectureAnalysis,
    pub confidence_level: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial_failures: Vec<ProviderFailure>,
    pub requested_providers: usize,
    pub generated_at: DateTime<Utc>,
}

impl ConsensusResult {
    pub fn providers(&self) -> Vec<&str> {
        self.analyses.iter().map(|a| a.provider.as_str()).collect()
    }

    /// The `consensus` and `architecture` sections of a technical stage
    /// document, seeded from this result. Callers add rationale, stack and
    /// alternatives before submitting.
    pub fn stage_seed(&self) -> Value {
        let rec = &self.final_recommendation;
        let risks: Vec<Value> = rec
            .risks
            .iter()
            .map(|r| json!({"category": r.category, "description": r.description}))
            .collect();
        let mut architecture = json!({ "style": rec.style });
        if let Some(rationale) = &rec.rationale {
            architecture["rationale"] = Value::String(rationale.clone());
        }
        json!({
            "consensus": {
                "overall_consensus": self.overall_consensus,
                "providers": self.providers(),
                "confidence_level": self.confidence_level,
                "divergence_areas": self.divergence_areas.len(),
            },
            "architecture": architecture,
            "risks": risks,
        })
    }
}
