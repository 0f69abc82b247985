//! Stage quality assessment.
//!
//! ```text
//! stage document ──► StageFeatures ──► DimensionScorer (per dimension)
//!                                            │
//!        StageProfiles (weights, thresholds) ▼
//!                                    AssessmentEngine ──► QualityAssessment
//!                                            ▲               (score, gate,
//!        PriorContext (upstream docs) ───────┘                suggestions)
//! ```

pub mod assessment;
pub mod engine;
pub mod features;
pub mod profile;
pub mod scorer;

pub use assessment::{
    weighted_score, DimensionScore, ImprovementSuggestion, QualityAssessment, SuggestionPriority,
};
pub use engine::{AssessmentEngine, PriorContext};
pub use features::StageFeatures;
pub use profile::{
    Criterion, DimensionSpec, FieldCheck, StageProfile, StageProfiles, Thresholds, UpstreamField,
    WEIGHT_TOLERANCE,
};
pub use scorer::{score_dimension, DimensionOutcome, DimensionScorer, ScoreError, StructuralScorer};
