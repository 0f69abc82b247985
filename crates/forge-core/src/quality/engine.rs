use super::assessment::{
    weighted_score, DimensionScore, ImprovementSuggestion, QualityAssessment, SuggestionPriority,
};
use super::features::{lookup, is_populated, StageFeatures};
use super::profile::{StageProfile, StageProfiles};
use super::scorer::{DimensionScorer, StructuralScorer};
use crate::error::Result;
use crate::types::{ConfidenceLevel, Stage};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;

/// Content of earlier stages, keyed by stage.
pub type PriorContext = BTreeMap<Stage, Value>;

/// Share of confidence carried by upstream context completeness; the rest
/// comes from agreement between dimension scores.
const CONTEXT_SHARE: f64 = 0.6;
/// Standard deviation (in score points) at which dimension agreement hits 0.
const SPREAD_CEILING: f64 = 50.0;
const MINUTES_PER_TEN_POINTS: f64 = 15.0;

/// Stateless quality assessor configured with a stage lookup table.
///
/// Holds no per-request state; one instance serves any number of
/// concurrent assessments.
pub struct AssessmentEngine {
    profiles: StageProfiles,
    scorer: Box<dyn DimensionScorer>,
}

impl Default for AssessmentEngine {
    fn default() -> Self {
        Self::new(StageProfiles::standard())
    }
}

impl std::fmt::Debug for AssessmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentEngine")
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}

impl AssessmentEngine {
    pub fn new(profiles: StageProfiles) -> Self {
        Self::with_scorer(profiles, StructuralScorer)
    }

    pub fn with_scorer(profiles: StageProfiles, scorer: impl DimensionScorer + 'static) -> Self {
        Self {
            profiles,
            scorer: Box::new(scorer),
        }
    }

    /// Assess `content` as the document for `stage`.
    ///
    /// Fails only when `content` is not a JSON object. Scorer failures
    /// degrade the affected dimension to zero.
    pub fn assess(
        &self,
        stage: Stage,
        content: &Value,
        prior: &PriorContext,
    ) -> Result<QualityAssessment> {
        let features = StageFeatures::extract(content)?;
        let profile = self.profiles.get(stage);

        let mut dimension_scores = BTreeMap::new();
        for spec in &profile.dimensions {
            let scored = match self.scorer.score(stage, spec, &features) {
                Ok(outcome) => DimensionScore {
                    score: outcome.score.clamp(0.0, 100.0),
                    weight: spec.weight,
                    target: spec.target,
                    feedback: outcome.feedback,
                    suggestions: outcome.suggestions,
                    available: true,
                },
                Err(e) => {
                    tracing::warn!(stage = %stage, dimension = %spec.name, error = %e, "dimension scorer failed");
                    DimensionScore {
                        score: 0.0,
                        weight: spec.weight,
                        target: spec.target,
                        feedback: format!("unavailable: {e}"),
                        suggestions: Vec::new(),
                        available: false,
                    }
                }
            };
            dimension_scores.insert(spec.name.clone(), scored);
        }

        let overall_score = round1(weighted_score(
            dimension_scores.values().map(|d| (d.score, d.weight)),
        ));

        let (context_completeness, missing_context) = context_completeness(profile, prior);
        let confidence = confidence(context_completeness, &dimension_scores);
        let thresholds = profile.thresholds;
        let gate = thresholds.gate(overall_score);
        let suggestions = suggestions(&dimension_scores);

        tracing::debug!(
            stage = %stage,
            score = overall_score,
            gate = %gate,
            context = context_completeness,
            "stage assessed"
        );

        Ok(QualityAssessment {
            stage,
            overall_score,
            dimension_scores,
            confidence,
            confidence_level: ConfidenceLevel::from_score(confidence),
            gate,
            thresholds,
            suggestions,
            context_completeness,
            missing_context,
            assessed_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn context_completeness(profile: &StageProfile, prior: &PriorContext) -> (f64, Vec<String>) {
    if profile.upstream.is_empty() {
        return (1.0, Vec::new());
    }
    let missing: Vec<String> = profile
        .upstream
        .iter()
        .filter(|field| {
            !prior
                .get(&field.stage)
                .and_then(|doc| lookup(doc, &field.path))
                .is_some_and(is_populated)
        })
        .map(|field| field.to_string())
        .collect();
    let total = profile.upstream.len() as f64;
    let present = total - missing.len() as f64;
    (round3(present / total), missing)
}

fn confidence(context: f64, dimensions: &BTreeMap<String, DimensionScore>) -> f64 {
    if dimensions.is_empty() {
        return 0.0;
    }
    let n = dimensions.len() as f64;
    let mean = dimensions.values().map(|d| d.score).sum::<f64>() / n;
    let variance = dimensions
        .values()
        .map(|d| (d.score - mean).powi(2))
        .sum::<f64>()
        / n;
    let agreement = 1.0 - (variance.sqrt() / SPREAD_CEILING).min(1.0);
    let available = dimensions.values().filter(|d| d.available).count() as f64 / n;
    round3(((CONTEXT_SHARE * context + (1.0 - CONTEXT_SHARE) * agreement) * available).clamp(0.0, 1.0))
}

fn suggestions(dimensions: &BTreeMap<String, DimensionScore>) -> Vec<ImprovementSuggestion> {
    let mut out: Vec<ImprovementSuggestion> = dimensions
        .iter()
        .filter(|(_, d)| d.score < d.target)
        .map(|(name, d)| {
            let deficit = d.target - d.score;
            let impact = round1(d.weight * deficit);
            let label = name.replace('_', " ");
            let message = if d.available {
                format!("Raise {label} from {:.0} to at least {:.0}", d.score, d.target)
            } else {
                format!("Re-run assessment: {label} could not be scored")
            };
            ImprovementSuggestion {
                dimension: name.clone(),
                priority: SuggestionPriority::from_impact(impact),
                message,
                actions: d.suggestions.clone(),
                expected_impact: impact,
                estimated_minutes: estimate_minutes(deficit),
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.expected_impact
            .total_cmp(&a.expected_impact)
            .then_with(|| a.dimension.cmp(&b.dimension))
    });
    out
}

fn estimate_minutes(deficit: f64) -> u32 {
    let blocks = (deficit / 10.0).ceil().max(1.0);
    (blocks * MINUTES_PER_TEN_POINTS) as u32
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::quality::profile::DimensionSpec;
    use crate::quality::scorer::{DimensionOutcome, ScoreError};
    use crate::types::GateStatus;
    use serde_json::json;

    /// Returns a fixed score for every dimension.
    struct FixedScorer(f64);

    impl DimensionScorer for FixedScorer {
        fn score(
            &self,
            _: Stage,
            _: &DimensionSpec,
            _: &StageFeatures<'_>,
        ) -> std::result::Result<DimensionOutcome, ScoreError> {
            Ok(DimensionOutcome {
                score: self.0,
                feedback: "fixed".into(),
                suggestions: vec![],
            })
        }
    }

    /// Fails for one named dimension and delegates the rest.
    struct FailingScorer(&'static str);

    impl DimensionScorer for FailingScorer {
        fn score(
            &self,
            stage: Stage,
            dim: &DimensionSpec,
            features: &StageFeatures<'_>,
        ) -> std::result::Result<DimensionOutcome, ScoreError> {
            if dim.name == self.0 {
                return Err(ScoreError::Failed("model offline".into()));
            }
            StructuralScorer.score(stage, dim, features)
        }
    }

    fn fixed(score: f64) -> AssessmentEngine {
        AssessmentEngine::with_scorer(StageProfiles::standard(), FixedScorer(score))
    }

    #[test]
    fn overall_score_stays_in_range_at_extremes() {
        for score in [0.0, 100.0, 250.0, -40.0] {
            for stage in Stage::all() {
                let a = fixed(score)
                    .assess(*stage, &json!({"x": 1}), &PriorContext::new())
                    .unwrap();
                assert!((0.0..=100.0).contains(&a.overall_score), "{stage}: {}", a.overall_score);
            }
        }
    }

    #[test]
    fn idea_gate_at_documented_scores() {
        let blocked = fixed(60.0)
            .assess(Stage::Idea, &json!({"x": 1}), &PriorContext::new())
            .unwrap();
        assert_eq!(blocked.gate, GateStatus::Block);
        assert!(!blocked.can_progress());

        let caution = fixed(76.0)
            .assess(Stage::Idea, &json!({"x": 1}), &PriorContext::new())
            .unwrap();
        assert_eq!(caution.gate, GateStatus::ProceedWithCaution);
        assert!(caution.can_progress());
    }

    #[test]
    fn strong_idea_document_proceeds() {
        let engine = AssessmentEngine::default();
        let a = engine
            .assess(Stage::Idea, &fixtures::idea(), &PriorContext::new())
            .unwrap();
        assert!(a.overall_score >= 85.0, "score {}", a.overall_score);
        assert_eq!(a.gate, GateStatus::ProceedExcellent);
        assert_eq!(a.context_completeness, 1.0);
        assert_eq!(a.confidence_level, ConfidenceLevel::High);
    }

    #[test]
    fn thin_idea_document_blocks_with_ranked_suggestions() {
        let engine = AssessmentEngine::default();
        let a = engine
            .assess(
                Stage::Idea,
                &json!({"problem": {"statement": "Checkout is slow."}}),
                &PriorContext::new(),
            )
            .unwrap();
        assert_eq!(a.gate, GateStatus::Block);
        assert_eq!(a.suggestions.len(), 3);
        // problem_clarity carries the largest weight and the deficits are
        // similar, so it ranks first.
        assert_eq!(a.suggestions[0].dimension, "problem_clarity");
        assert!(a
            .suggestions
            .windows(2)
            .all(|w| w[0].expected_impact >= w[1].expected_impact));
        assert!(a.suggestions.iter().all(|s| s.estimated_minutes >= 15));
    }

    #[test]
    fn scorer_failure_degrades_one_dimension() {
        let engine = AssessmentEngine::with_scorer(
            StageProfiles::standard(),
            FailingScorer("market_context"),
        );
        let a = engine
            .assess(Stage::Idea, &fixtures::idea(), &PriorContext::new())
            .unwrap();
        let market = &a.dimension_scores["market_context"];
        assert_eq!(market.score, 0.0);
        assert!(!market.available);
        assert!(market.feedback.starts_with("unavailable"));
        assert!(a.dimension_scores["problem_clarity"].score > 0.0);
        assert_eq!(a.unavailable_dimensions(), vec!["market_context"]);
        assert!(a.confidence < 1.0);
    }

    #[test]
    fn missing_upstream_context_is_reported() {
        let engine = AssessmentEngine::default();
        let mut prior = PriorContext::new();
        prior.insert(Stage::Idea, json!({"problem": {"statement": "x"}}));
        let a = engine
            .assess(Stage::Requirements, &fixtures::requirements(), &prior)
            .unwrap();
        assert!(a.context_completeness < 1.0);
        assert!(a.missing_context.contains(&"idea.value_proposition".to_string()));
        assert!(!a.missing_context.contains(&"idea.problem.statement".to_string()));

        let full = fixtures::prior_for(Stage::Requirements);
        let b = engine
            .assess(Stage::Requirements, &fixtures::requirements(), &full)
            .unwrap();
        assert_eq!(b.context_completeness, 1.0);
        assert!(b.confidence > a.confidence);
    }

    #[test]
    fn every_fixture_clears_its_recommended_threshold() {
        let engine = AssessmentEngine::default();
        for stage in Stage::all() {
            let a = engine
                .assess(*stage, &fixtures::content(*stage), &fixtures::prior_for(*stage))
                .unwrap();
            assert_eq!(a.gate, GateStatus::ProceedExcellent, "{stage}: {}", a.overall_score);
        }
    }

    #[test]
    fn non_object_content_is_rejected() {
        let err = AssessmentEngine::default()
            .assess(Stage::Idea, &json!("an idea"), &PriorContext::new())
            .unwrap_err();
        assert!(matches!(err, crate::ForgeError::Validation { .. }));
    }

    #[test]
    fn assessment_is_deterministic_apart_from_timestamp() {
        let engine = AssessmentEngine::default();
        let mut a = engine
            .assess(Stage::Ux, &fixtures::ux(), &fixtures::prior_for(Stage::Ux))
            .unwrap();
        let b = engine
            .assess(Stage::Ux, &fixtures::ux(), &fixtures::prior_for(Stage::Ux))
            .unwrap();
        a.assessed_at = b.assessed_at;
        assert_eq!(a, b);
    }
}
