use super::features::{is_populated, kind_of, word_count, StageFeatures};
use super::profile::{DimensionSpec, FieldCheck, StageProfiles};
use crate::types::Stage;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionOutcome {
    /// 0..=100.
    pub score: f64,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error("stage '{stage}' has no dimension named '{dimension}'")]
    UnknownDimension { stage: Stage, dimension: String },

    #[error("field '{path}' should be {expected} but is {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("scorer failed: {0}")]
    Failed(String),
}

/// Scores one quality dimension of one stage document.
///
/// Implementations must be deterministic for identical input. A returned
/// error degrades only the affected dimension; the engine keeps going.
pub trait DimensionScorer: Send + Sync {
    fn score(
        &self,
        stage: Stage,
        dimension: &DimensionSpec,
        features: &StageFeatures<'_>,
    ) -> Result<DimensionOutcome, ScoreError>;
}

/// Default scorer: evaluates the dimension's structural criteria.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralScorer;

impl DimensionScorer for StructuralScorer {
    fn score(
        &self,
        _stage: Stage,
        dimension: &DimensionSpec,
        features: &StageFeatures<'_>,
    ) -> Result<DimensionOutcome, ScoreError> {
        let mut earned = 0.0;
        let mut possible = 0.0;
        let mut met = 0usize;
        let mut touched = false;
        let mut suggestions = Vec::new();

        for criterion in &dimension.criteria {
            let credit = credit(&criterion.check, features)?;
            let points = f64::from(criterion.points);
            earned += credit * points;
            possible += points;
            if credit >= 1.0 {
                met += 1;
            } else {
                suggestions.push(criterion.hint.clone());
            }
            if credit > 0.0 {
                touched = true;
            }
        }

        let score = if possible > 0.0 {
            round2((100.0 * earned / possible).clamp(0.0, 100.0))
        } else {
            0.0
        };

        let feedback = if !touched {
            suggestions.insert(
                0,
                format!("Populate the {} section of the document", dimension.label()),
            );
            format!("No {} content found", dimension.label())
        } else {
            let verdict = if score >= dimension.target {
                "meets target"
            } else if score >= 60.0 {
                "adequate, below target"
            } else {
                "weak"
            };
            format!(
                "{met}/{} criteria fully met; {verdict}",
                dimension.criteria.len()
            )
        };

        Ok(DimensionOutcome {
            score,
            feedback,
            suggestions,
        })
    }
}

/// Score a dimension by name using the structural scorer.
pub fn score_dimension(
    profiles: &StageProfiles,
    stage: Stage,
    dimension: &str,
    features: &StageFeatures<'_>,
) -> Result<DimensionOutcome, ScoreError> {
    let spec = profiles
        .get(stage)
        .dimension(dimension)
        .ok_or_else(|| ScoreError::UnknownDimension {
            stage,
            dimension: dimension.to_string(),
        })?;
    StructuralScorer.score(stage, spec, features)
}

// ---------------------------------------------------------------------------
// Criterion evaluation
// ---------------------------------------------------------------------------

/// Credit in `0.0..=1.0` for one check.
fn credit(check: &FieldCheck, features: &StageFeatures<'_>) -> Result<f64, ScoreError> {
    match check {
        FieldCheck::Present { path } => Ok(if features.is_populated(path) { 1.0 } else { 0.0 }),

        FieldCheck::Words { path, min } => {
            let Some(value) = features.lookup(path) else {
                return Ok(0.0);
            };
            let count = word_count(value).ok_or_else(|| mismatch(path, "text", value))?;
            Ok(ratio(count, *min))
        }

        FieldCheck::Items { path, min } => match list_at(features, path)? {
            Some(items) => Ok(ratio(items.len(), *min)),
            None => Ok(0.0),
        },

        FieldCheck::EachHas { path, field } => {
            let Some(items) = list_at(features, path)? else {
                return Ok(0.0);
            };
            Ok(fraction(items, |item| {
                item.get(field).is_some_and(is_populated)
            }))
        }

        FieldCheck::References {
            path,
            field,
            target,
            key,
        } => {
            let Some(items) = list_at(features, path)? else {
                return Ok(0.0);
            };
            let known: HashSet<&str> = list_at(features, target)?
                .map(|targets| {
                    targets
                        .iter()
                        .filter_map(|t| match t {
                            Value::String(s) => Some(s.as_str()),
                            other => other.get(key).and_then(Value::as_str),
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(fraction(items, |item| {
                referenced(item.get(field)).any(|r| known.contains(r))
            }))
        }
    }
}

fn list_at<'a>(
    features: &StageFeatures<'a>,
    path: &str,
) -> Result<Option<&'a Vec<Value>>, ScoreError> {
    match features.lookup(path) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(mismatch(path, "a list", other)),
    }
}

fn referenced(value: Option<&Value>) -> Box<dyn Iterator<Item = &str> + '_> {
    match value {
        Some(Value::String(s)) => Box::new(std::iter::once(s.as_str())),
        Some(Value::Array(items)) => Box::new(items.iter().filter_map(Value::as_str)),
        _ => Box::new(std::iter::empty()),
    }
}

fn fraction(items: &[Value], pred: impl Fn(&Value) -> bool) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().filter(|i| pred(i)).count() as f64 / items.len() as f64
}

fn ratio(have: usize, want: usize) -> f64 {
    if want == 0 {
        return if have > 0 { 1.0 } else { 0.0 };
    }
    (have as f64 / want as f64).min(1.0)
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> ScoreError {
    ScoreError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: kind_of(found),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profiles() -> StageProfiles {
        StageProfiles::standard()
    }

    fn score(stage: Stage, dim: &str, doc: &Value) -> Result<DimensionOutcome, ScoreError> {
        let features = StageFeatures::extract(doc).unwrap();
        score_dimension(&profiles(), stage, dim, &features)
    }

    #[test]
    fn missing_content_scores_zero_with_populate_hint() {
        let out = score(Stage::Idea, "market_context", &json!({})).unwrap();
        assert_eq!(out.score, 0.0);
        assert!(out.feedback.starts_with("No market context"));
        assert!(out.suggestions[0].contains("Populate the market context"));
    }

    #[test]
    fn partial_credit_is_proportional() {
        // 2 of 3 pain points = 2/3 of 25 points, nothing else.
        let doc = json!({"problem": {"pain_points": ["slow", "costly"]}});
        let out = score(Stage::Idea, "problem_clarity", &doc).unwrap();
        assert!((out.score - 16.67).abs() < 0.01, "got {}", out.score);
    }

    #[test]
    fn excess_items_do_not_exceed_full_credit() {
        let doc = json!({
            "testing": {"unit": "cargo test", "integration": "docker compose", "e2e": "playwright", "coverage_target": 80}
        });
        let out = score(Stage::Playbook, "testing_completeness", &doc).unwrap();
        assert_eq!(out.score, 100.0);
        assert!(out.suggestions.is_empty());
        assert!(out.feedback.contains("meets target"));
    }

    #[test]
    fn references_count_linked_entries() {
        let doc = json!({
            "functional": [{"id": "FR-1"}, {"id": "FR-2"}],
            "user_stories": [
                {"requirement_ids": ["FR-1"]},
                {"requirement_ids": ["FR-9"]}
            ]
        });
        let features = StageFeatures::extract(&doc).unwrap();
        let check = FieldCheck::References {
            path: "user_stories".into(),
            field: "requirement_ids".into(),
            target: "functional".into(),
            key: "id".into(),
        };
        assert_eq!(credit(&check, &features).unwrap(), 0.5);
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let doc = json!({"risks": "everything could go wrong"});
        let err = score(Stage::Technical, "risk_identification", &doc).unwrap_err();
        assert!(matches!(err, ScoreError::TypeMismatch { ref path, .. } if path == "risks"));
    }

    #[test]
    fn unknown_dimension_is_an_error() {
        let err = score(Stage::Ux, "problem_clarity", &json!({"a": 1})).unwrap_err();
        assert!(matches!(err, ScoreError::UnknownDimension { stage: Stage::Ux, .. }));
    }

    #[test]
    fn scores_stay_in_range_for_arbitrary_documents() {
        let docs = [
            json!({}),
            json!({"steps": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]}),
            json!({"steps": [{"instructions": "x", "deliverables": ["y"], "estimate": "1d"}]}),
            json!({"deployment": {"environments": ["dev", "staging", "prod"], "rollback": "", "ci": true}}),
        ];
        for doc in &docs {
            for dim in profiles().get(Stage::Playbook).dimensions.iter() {
                let out = score(Stage::Playbook, &dim.name, doc).unwrap();
                assert!((0.0..=100.0).contains(&out.score));
            }
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let doc = json!({"components": [{"name": "Button", "states": ["idle"]}], "screens": []});
        let a = score(Stage::Ux, "component_coverage", &doc).unwrap();
        let b = score(Stage::Ux, "component_coverage", &doc).unwrap();
        assert_eq!(a, b);
    }
}
