//! Per-stage quality configuration as a lookup table.
//!
//! Each stage owns a fixed set of weighted dimensions, gate thresholds and
//! the upstream fields it is expected to build on. Every dimension is scored
//! by structural criteria over the stage document, so adding a stage or
//! re-weighting one is a change to this table only.

use crate::types::{GateStatus, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used when checking that a stage's weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub minimum: f64,
    pub recommended: f64,
}

impl Thresholds {
    pub const fn new(minimum: f64, recommended: f64) -> Self {
        Self {
            minimum,
            recommended,
        }
    }

    /// Gate decision for `score`. Monotonic: a higher score never yields a
    /// lower gate.
    pub fn gate(&self, score: f64) -> GateStatus {
        if score >= self.recommended {
            GateStatus::ProceedExcellent
        } else if score >= self.minimum {
            GateStatus::ProceedWithCaution
        } else {
            GateStatus::Block
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// One structural check against a dotted path in the stage document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum FieldCheck {
    /// Field exists and is non-empty.
    Present { path: String },
    /// Text (or list of texts) has at least `min` words; partial credit below.
    Words { path: String, min: usize },
    /// List has at least `min` entries; partial credit below.
    Items { path: String, min: usize },
    /// Fraction of list entries carrying a non-empty `field`.
    EachHas { path: String, field: String },
    /// Fraction of list entries whose `field` names at least one `key` found
    /// among the entries at `target`.
    References {
        path: String,
        field: String,
        target: String,
        key: String,
    },
}

impl FieldCheck {
    pub fn path(&self) -> &str {
        match self {
            FieldCheck::Present { path }
            | FieldCheck::Words { path, .. }
            | FieldCheck::Items { path, .. }
            | FieldCheck::EachHas { path, .. }
            | FieldCheck::References { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub check: FieldCheck,
    pub points: u32,
    /// Actionable advice surfaced when the criterion is not fully met.
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub name: String,
    pub weight: f64,
    /// Score below which the dimension produces an improvement suggestion.
    pub target: f64,
    pub criteria: Vec<Criterion>,
}

impl DimensionSpec {
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamField {
    pub stage: Stage,
    pub path: String,
}

impl std::fmt::Display for UpstreamField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stage, self.path)
    }
}

// ---------------------------------------------------------------------------
// StageProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProfile {
    pub stage: Stage,
    pub thresholds: Thresholds,
    pub dimensions: Vec<DimensionSpec>,
    /// Fields from earlier stages this stage is expected to integrate.
    pub upstream: Vec<UpstreamField>,
}

impl StageProfile {
    pub fn dimension(&self, name: &str) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn weight_sum(&self) -> f64 {
        self.dimensions.iter().map(|d| d.weight).sum()
    }
}

// ---------------------------------------------------------------------------
// StageProfiles (the lookup table)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StageProfiles {
    // Indexed by `Stage::index()`; one entry per stage by construction.
    profiles: Vec<StageProfile>,
}

impl Default for StageProfiles {
    fn default() -> Self {
        Self::standard()
    }
}

impl StageProfiles {
    pub fn standard() -> Self {
        Self {
            profiles: vec![
                idea_profile(),
                requirements_profile(),
                ux_profile(),
                technical_profile(),
                playbook_profile(),
            ],
        }
    }

    pub fn get(&self, stage: Stage) -> &StageProfile {
        &self.profiles[stage.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageProfile> {
        self.profiles.iter()
    }

    /// Replace the gate thresholds of the listed stages.
    pub fn with_thresholds(mut self, overrides: &BTreeMap<Stage, Thresholds>) -> Self {
        for (stage, thresholds) in overrides {
            self.profiles[stage.index()].thresholds = *thresholds;
        }
        self
    }

    /// Stages whose dimension weights do not sum to one.
    pub fn unbalanced_stages(&self) -> Vec<Stage> {
        self.profiles
            .iter()
            .filter(|p| (p.weight_sum() - 1.0).abs() > WEIGHT_TOLERANCE)
            .map(|p| p.stage)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Table builders
// ---------------------------------------------------------------------------

fn present(path: &str, points: u32, hint: &str) -> Criterion {
    Criterion {
        check: FieldCheck::Present { path: path.into() },
        points,
        hint: hint.into(),
    }
}

fn words(path: &str, min: usize, points: u32, hint: &str) -> Criterion {
    Criterion {
        check: FieldCheck::Words {
            path: path.into(),
            min,
        },
        points,
        hint: hint.into(),
    }
}

fn items(path: &str, min: usize, points: u32, hint: &str) -> Criterion {
    Criterion {
        check: FieldCheck::Items {
            path: path.into(),
            min,
        },
        points,
        hint: hint.into(),
    }
}

fn each_has(path: &str, field: &str, points: u32, hint: &str) -> Criterion {
    Criterion {
        check: FieldCheck::EachHas {
            path: path.into(),
            field: field.into(),
        },
        points,
        hint: hint.into(),
    }
}

fn references(path: &str, field: &str, target: &str, key: &str, points: u32, hint: &str) -> Criterion {
    Criterion {
        check: FieldCheck::References {
            path: path.into(),
            field: field.into(),
            target: target.into(),
            key: key.into(),
        },
        points,
        hint: hint.into(),
    }
}

fn dimension(name: &str, weight: f64, target: f64, criteria: Vec<Criterion>) -> DimensionSpec {
    DimensionSpec {
        name: name.into(),
        weight,
        target,
        criteria,
    }
}

fn upstream(fields: &[(Stage, &str)]) -> Vec<UpstreamField> {
    fields
        .iter()
        .map(|(stage, path)| UpstreamField {
            stage: *stage,
            path: (*path).into(),
        })
        .collect()
}

fn idea_profile() -> StageProfile {
    let t = Thresholds::new(75.0, 85.0);
    StageProfile {
        stage: Stage::Idea,
        thresholds: t,
        dimensions: vec![
            dimension(
                "problem_clarity",
                0.40,
                t.recommended,
                vec![
                    words("problem.statement", 40, 40, "Describe the problem in at least 40 words: who has it, when, and what it costs them"),
                    items("problem.target_users", 2, 20, "Name at least two target user groups"),
                    items("problem.pain_points", 3, 25, "List at least three concrete pain points"),
                    words("value_proposition", 15, 15, "State the value proposition in one or two full sentences"),
                ],
            ),
            dimension(
                "market_context",
                0.30,
                t.recommended,
                vec![
                    items("market.competitors", 3, 35, "Identify at least three competitors or existing alternatives"),
                    each_has("market.competitors", "weakness", 15, "Record a weakness for every competitor"),
                    present("market.size", 20, "Estimate the size of the addressable market"),
                    items("market.differentiators", 2, 30, "List at least two differentiators"),
                ],
            ),
            dimension(
                "feasibility",
                0.30,
                t.recommended,
                vec![
                    items("feasibility.constraints", 2, 25, "List at least two known constraints (budget, regulation, platform)"),
                    present("feasibility.resources", 20, "Describe the people and tooling available"),
                    items("feasibility.risks", 3, 30, "Identify at least three delivery risks"),
                    words("feasibility.timeline", 5, 25, "Sketch a rough delivery timeline"),
                ],
            ),
        ],
        upstream: Vec::new(),
    }
}

fn requirements_profile() -> StageProfile {
    let t = Thresholds::new(78.0, 88.0);
    StageProfile {
        stage: Stage::Requirements,
        thresholds: t,
        dimensions: vec![
            dimension(
                "completeness",
                0.40,
                t.recommended,
                vec![
                    items("functional", 5, 35, "Capture at least five functional requirements"),
                    each_has("functional", "description", 15, "Give every functional requirement a description"),
                    items("non_functional", 3, 25, "Capture at least three non-functional requirements"),
                    items("scope.in", 3, 15, "List what is in scope"),
                    present("scope.out", 10, "List what is explicitly out of scope"),
                ],
            ),
            dimension(
                "testability",
                0.30,
                t.recommended,
                vec![
                    each_has("functional", "acceptance_criteria", 50, "Give every functional requirement acceptance criteria"),
                    each_has("non_functional", "metric", 30, "Attach a measurable metric to each non-functional requirement"),
                    words("definition_of_done", 10, 20, "Write a definition of done"),
                ],
            ),
            dimension(
                "story_coverage",
                0.30,
                t.recommended,
                vec![
                    items("user_stories", 5, 30, "Write at least five user stories"),
                    each_has("user_stories", "so_that", 20, "Finish each user story with the benefit it delivers"),
                    references("user_stories", "requirement_ids", "functional", "id", 50, "Link every user story to the functional requirements it covers"),
                ],
            ),
        ],
        upstream: upstream(&[
            (Stage::Idea, "problem.statement"),
            (Stage::Idea, "problem.target_users"),
            (Stage::Idea, "value_proposition"),
            (Stage::Idea, "feasibility.constraints"),
        ]),
    }
}

fn ux_profile() -> StageProfile {
    let t = Thresholds::new(80.0, 90.0);
    StageProfile {
        stage: Stage::Ux,
        thresholds: t,
        dimensions: vec![
            dimension(
                "journey_completeness",
                0.40,
                t.recommended,
                vec![
                    items("journeys", 2, 30, "Map at least two end-to-end user journeys"),
                    each_has("journeys", "steps", 30, "Break every journey into steps"),
                    items("personas", 2, 20, "Define at least two personas"),
                    each_has("journeys", "persona", 20, "Assign a persona to every journey"),
                ],
            ),
            dimension(
                "accessibility",
                0.30,
                t.recommended,
                vec![
                    present("accessibility.wcag_level", 35, "Choose a WCAG conformance level"),
                    items("accessibility.considerations", 4, 40, "List at least four accessibility considerations"),
                    present("accessibility.testing", 25, "Describe how accessibility will be tested"),
                ],
            ),
            dimension(
                "component_coverage",
                0.30,
                t.recommended,
                vec![
                    items("components", 5, 30, "Inventory at least five UI components"),
                    each_has("components", "states", 25, "Document the states of every component"),
                    items("screens", 3, 20, "Describe at least three screens"),
                    references("screens", "components", "components", "name", 25, "Build every screen from inventoried components"),
                ],
            ),
        ],
        upstream: upstream(&[
            (Stage::Idea, "problem.target_users"),
            (Stage::Requirements, "functional"),
            (Stage::Requirements, "non_functional"),
            (Stage::Requirements, "user_stories"),
        ]),
    }
}

fn technical_profile() -> StageProfile {
    let t = Thresholds::new(85.0, 92.0);
    StageProfile {
        stage: Stage::Technical,
        thresholds: t,
        dimensions: vec![
            dimension(
                "consensus_coverage",
                0.35,
                t.recommended,
                vec![
                    present("consensus.overall_consensus", 25, "Run the multi-provider architecture analysis and record its consensus"),
                    items("consensus.providers", 2, 25, "Base the analysis on at least two independent providers"),
                    present("architecture.style", 25, "State the chosen architecture style"),
                    words("architecture.rationale", 30, 25, "Explain how the chosen architecture reconciles divergent recommendations"),
                ],
            ),
            dimension(
                "risk_identification",
                0.35,
                t.recommended,
                vec![
                    items("risks", 4, 35, "Identify at least four technical risks"),
                    each_has("risks", "mitigation", 35, "Give every risk a mitigation"),
                    each_has("risks", "category", 15, "Categorise every risk"),
                    each_has("risks", "severity", 15, "Rate the severity of every risk"),
                ],
            ),
            dimension(
                "stack_justification",
                0.30,
                t.recommended,
                vec![
                    items("stack", 3, 30, "Name at least three stack choices"),
                    each_has("stack", "justification", 40, "Justify every stack choice"),
                    items("alternatives", 2, 30, "Record at least two rejected alternatives and why"),
                ],
            ),
        ],
        upstream: upstream(&[
            (Stage::Requirements, "functional"),
            (Stage::Requirements, "non_functional"),
            (Stage::Requirements, "scope.in"),
            (Stage::Ux, "components"),
            (Stage::Ux, "journeys"),
        ]),
    }
}

fn playbook_profile() -> StageProfile {
    let t = Thresholds::new(88.0, 95.0);
    StageProfile {
        stage: Stage::Playbook,
        thresholds: t,
        dimensions: vec![
            dimension(
                "context_integration",
                0.25,
                t.recommended,
                vec![
                    words("context.idea_summary", 20, 20, "Summarise the original idea in the playbook"),
                    items("context.requirement_refs", 3, 30, "Reference the requirements each part of the plan satisfies"),
                    items("context.ux_refs", 2, 20, "Reference the UX journeys and components being built"),
                    words("context.architecture", 10, 30, "Restate the architecture decision the plan follows"),
                ],
            ),
            dimension(
                "actionability",
                0.30,
                t.recommended,
                vec![
                    items("steps", 5, 30, "Break the implementation into at least five steps"),
                    each_has("steps", "instructions", 30, "Give every step concrete instructions"),
                    each_has("steps", "deliverables", 20, "Name the deliverables of every step"),
                    each_has("steps", "estimate", 20, "Estimate the effort of every step"),
                ],
            ),
            dimension(
                "testing_completeness",
                0.25,
                t.recommended,
                vec![
                    present("testing.unit", 25, "Describe the unit testing approach"),
                    present("testing.integration", 25, "Describe the integration testing approach"),
                    present("testing.e2e", 25, "Describe the end-to-end testing approach"),
                    present("testing.coverage_target", 25, "Set a coverage target"),
                ],
            ),
            dimension(
                "deployment_readiness",
                0.20,
                t.recommended,
                vec![
                    items("deployment.environments", 2, 25, "Define at least two deployment environments"),
                    words("deployment.rollback", 10, 25, "Describe the rollback procedure"),
                    present("deployment.monitoring", 25, "Describe production monitoring"),
                    present("deployment.ci", 25, "Describe the CI pipeline"),
                ],
            ),
        ],
        upstream: upstream(&[
            (Stage::Idea, "problem.statement"),
            (Stage::Requirements, "functional"),
            (Stage::Ux, "components"),
            (Stage::Technical, "architecture.style"),
            (Stage::Technical, "stack"),
            (Stage::Technical, "risks"),
        ]),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
