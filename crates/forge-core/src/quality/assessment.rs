use super::profile::Thresholds;
use crate::types::{ConfidenceLevel, GateStatus, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// DimensionScore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: f64,
    pub weight: f64,
    pub target: f64,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// False when the scorer failed and the dimension was degraded to zero.
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// ImprovementSuggestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

impl SuggestionPriority {
    /// Bucket by weighted impact on the overall score.
    pub fn from_impact(impact: f64) -> Self {
        if impact >= 10.0 {
            SuggestionPriority::High
        } else if impact >= 4.0 {
            SuggestionPriority::Medium
        } else {
            SuggestionPriority::Low
        }
    }
}

impl fmt::Display for SuggestionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionPriority::High => "high",
            SuggestionPriority::Medium => "medium",
            SuggestionPriority::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    pub dimension: String,
    pub priority: SuggestionPriority,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
    /// Points the overall score would gain if the dimension reached its target.
    pub expected_impact: f64,
    pub estimated_minutes: u32,
}

// ---------------------------------------------------------------------------
// QualityAssessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub stage: Stage,
    pub overall_score: f64,
    pub dimension_scores: BTreeMap<String, DimensionScore>,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub gate: GateStatus,
    pub thresholds: Thresholds,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<ImprovementSuggestion>,
    pub context_completeness: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_context: Vec<String>,
    pub assessed_at: DateTime<Utc>,
}

impl QualityAssessment {
    pub fn can_progress(&self) -> bool {
        self.gate.allows_progress()
    }

    pub fn unavailable_dimensions(&self) -> Vec<&str> {
        self.dimension_scores
            .iter()
            .filter(|(_, d)| !d.available)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Σ score·weight over `(score, weight)` pairs, clipped to `0..=100`.
///
/// Non-finite scores count as zero and negative weights are ignored.
pub fn weighted_score(parts: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let total: f64 = parts
        .into_iter()
        .map(|(score, weight)| {
            let score = if score.is_finite() {
                score.clamp(0.0, 100.0)
            } else {
                0.0
            };
            let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
            score * weight
        })
        .sum();
    if total.is_finite() {
        total.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
