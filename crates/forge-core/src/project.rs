use crate::artifact::{Artifact, ArtifactKind, NewArtifact};
use crate::error::{ForgeError, Result};
use crate::quality::{PriorContext, QualityAssessment};
use crate::types::{CollaboratorRole, GateStatus, Priority, ProjectStatus, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// StageData / StageTransition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageData {
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub stage_completed: bool,
    /// Latest assessment; superseded, never edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<QualityAssessment>,
    /// Set when the stage was passed through an audited gate override.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overridden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reopen_count: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl StageData {
    pub fn has_content(&self) -> bool {
        crate::quality::features::is_populated(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: Stage,
    pub entered: DateTime<Utc>,
    pub exited: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Collaborator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: String,
    pub role: CollaboratorRole,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Quality tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A stage assessment fell below the gate minimum.
    BelowMinimum,
    /// An operator forced advancement past a blocking gate.
    GateOverride,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::BelowMinimum => f.write_str("below_minimum"),
            IssueKind::GateOverride => f.write_str("gate_override"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub id: String,
    pub kind: IssueKind,
    pub stage: Stage,
    pub score: f64,
    pub minimum: f64,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl QualityIssue {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityHistoryEntry {
    pub stage: Stage,
    pub score: f64,
    pub gate: GateStatus,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityTracking {
    /// Mean of the latest score of every assessed stage.
    #[serde(default)]
    pub overall_quality: f64,
    #[serde(default)]
    pub per_stage_quality: BTreeMap<Stage, f64>,
    #[serde(default)]
    pub history: Vec<QualityHistoryEntry>,
    #[serde(default)]
    pub issues: Vec<QualityIssue>,
}

impl QualityTracking {
    pub fn open_issues(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(|i| i.is_open())
    }

    fn next_issue_id(&self) -> String {
        format!("QI-{}", self.issues.len() + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageQuality {
    pub stage: Stage,
    pub score: Option<f64>,
    pub gate: Option<GateStatus>,
    pub completed: bool,
    pub assessments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub project_id: String,
    pub current_stage: Stage,
    pub overall_quality: f64,
    pub stages: Vec<StageQuality>,
    pub trend: Trend,
    pub open_issues: Vec<QualityIssue>,
}

// ---------------------------------------------------------------------------
// GateOverride
// ---------------------------------------------------------------------------

/// Audited request to advance past a blocking gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOverride {
    pub target: Stage,
    pub operator: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// ForgeProject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeProject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    pub current_stage: Stage,
    pub progress_percentage: f64,
    #[serde(default)]
    pub stages: BTreeMap<Stage, StageData>,
    #[serde(default)]
    pub collaborators: Vec<Collaborator>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub quality_tracking: QualityTracking,
    #[serde(default)]
    pub stage_history: Vec<StageTransition>,
    /// Store revision; bumped on every successful save.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForgeProject {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
        description: Option<String>,
        priority: Priority,
    ) -> Self {
        let now = Utc::now();
        let owner = owner.into();
        Self {
            id: id.into(),
            name: name.into(),
            description,
            owner: owner.clone(),
            status: ProjectStatus::Draft,
            priority,
            current_stage: Stage::Idea,
            progress_percentage: 0.0,
            stages: BTreeMap::new(),
            collaborators: vec![Collaborator {
                user_id: owner,
                role: CollaboratorRole::Owner,
                added_at: now,
            }],
            artifacts: Vec::new(),
            quality_tracking: QualityTracking::default(),
            stage_history: vec![StageTransition {
                stage: Stage::Idea,
                entered: now,
                exited: None,
                note: None,
            }],
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageData> {
        self.stages.get(&stage)
    }

    pub fn latest_assessment(&self, stage: Stage) -> Option<&QualityAssessment> {
        self.stage(stage).and_then(|s| s.assessment.as_ref())
    }

    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        self.stage(stage).is_some_and(|s| s.stage_completed)
    }

    pub fn is_finished(&self) -> bool {
        self.status == ProjectStatus::Completed
    }

    pub fn artifact(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    /// Documents of every stage before `stage` that has content.
    pub fn prior_context(&self, stage: Stage) -> PriorContext {
        stage
            .upstream()
            .iter()
            .filter_map(|s| {
                self.stage(*s)
                    .filter(|d| d.has_content())
                    .map(|d| (*s, d.content.clone()))
            })
            .collect()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ForgeError::TerminalProject {
                id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_not_finished(&self) -> Result<()> {
        self.ensure_open()?;
        if self.is_finished() {
            return Err(ForgeError::InvalidTransition {
                from: "complete".into(),
                to: self.current_stage.to_string(),
                reason: "the pipeline is already complete".into(),
            });
        }
        Ok(())
    }

    fn recompute_progress(&mut self) {
        let done = Stage::all()
            .iter()
            .filter(|s| self.is_stage_completed(**s))
            .count();
        self.progress_percentage = 100.0 * done as f64 / Stage::all().len() as f64;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // -----------------------------------------------------------------------
    // Stage completion
    // -----------------------------------------------------------------------

    /// Check that `stage` may accept a new document.
    pub fn can_submit(&self, stage: Stage) -> Result<()> {
        self.ensure_not_finished()?;
        if stage != self.current_stage {
            return Err(ForgeError::InvalidStage {
                expected: self.current_stage.to_string(),
                got: stage.to_string(),
            });
        }
        if self.is_stage_completed(stage) {
            return Err(ForgeError::InvalidTransition {
                from: stage.to_string(),
                to: stage.to_string(),
                reason: "stage is already completed; reopen it before resubmitting".into(),
            });
        }
        Ok(())
    }

    /// Store `content` with its assessment. A non-blocking gate marks the
    /// stage completed and snapshots the document as an artifact.
    pub fn record_submission(
        &mut self,
        stage: Stage,
        content: Value,
        assessment: QualityAssessment,
        submitted_by: Option<&str>,
    ) -> Result<()> {
        self.can_submit(stage)?;
        let now = Utc::now();
        let passed = assessment.can_progress();

        self.track_quality(&assessment);
        if self.status == ProjectStatus::Draft {
            self.status = ProjectStatus::Active;
        }

        let data = self.stages.entry(stage).or_default();
        data.content = content.clone();
        data.assessment = Some(assessment);
        data.updated_at = Some(now);
        if passed {
            data.stage_completed = true;
            data.completed_at = Some(now);
            let mut snapshot =
                NewArtifact::new(ArtifactKind::StageDocument, stage.title(), content).for_stage(stage);
            if let Some(who) = submitted_by {
                snapshot = snapshot.by(who);
            }
            Artifact::append_to(&mut self.artifacts, snapshot);
        }

        self.recompute_progress();
        self.touch();
        Ok(())
    }

    fn track_quality(&mut self, assessment: &QualityAssessment) {
        let stage = assessment.stage;
        let now = Utc::now();
        let tracking = &mut self.quality_tracking;

        tracking.history.push(QualityHistoryEntry {
            stage,
            score: assessment.overall_score,
            gate: assessment.gate,
            recorded_at: now,
        });
        tracking
            .per_stage_quality
            .insert(stage, assessment.overall_score);
        let n = tracking.per_stage_quality.len() as f64;
        tracking.overall_quality =
            (tracking.per_stage_quality.values().sum::<f64>() / n * 10.0).round() / 10.0;

        let open_below = tracking
            .issues
            .iter()
            .any(|i| i.is_open() && i.kind == IssueKind::BelowMinimum && i.stage == stage);
        if assessment.can_progress() {
            for issue in tracking.issues.iter_mut().filter(|i| {
                i.is_open() && i.kind == IssueKind::BelowMinimum && i.stage == stage
            }) {
                issue.resolved_at = Some(now);
            }
        } else if !open_below {
            let id = tracking.next_issue_id();
            tracking.issues.push(QualityIssue {
                id,
                kind: IssueKind::BelowMinimum,
                stage,
                score: assessment.overall_score,
                minimum: assessment.thresholds.minimum,
                message: format!(
                    "{} scored {:.1}, below the minimum of {:.1}",
                    stage.title(),
                    assessment.overall_score,
                    assessment.thresholds.minimum
                ),
                raised_at: now,
                operator: None,
                reason: None,
                resolved_at: None,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Advancement
    // -----------------------------------------------------------------------

    fn check_next(&self, target: Stage) -> Result<()> {
        self.ensure_not_finished()?;
        if self.current_stage.next() != Some(target) {
            let reason = if target <= self.current_stage {
                "stages only move forward".to_string()
            } else {
                match self.current_stage.next() {
                    Some(next) => format!("the next stage is '{next}'"),
                    None => "the final stage has no successor; finish the pipeline instead"
                        .to_string(),
                }
            };
            return Err(ForgeError::InvalidTransition {
                from: self.current_stage.to_string(),
                to: target.to_string(),
                reason,
            });
        }
        Ok(())
    }

    /// Check the ordinary advancement invariant for `target`.
    pub fn can_advance_to(&self, target: Stage) -> Result<()> {
        self.check_next(target)?;
        let current = self.current_stage;
        let Some(assessment) = self.latest_assessment(current) else {
            return Err(ForgeError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
                reason: "the current stage has not been assessed".into(),
            });
        };
        if !assessment.can_progress() {
            return Err(ForgeError::GateBlocked {
                stage: current.to_string(),
                assessment: Box::new(assessment.clone()),
            });
        }
        if !self.is_stage_completed(current) {
            return Err(ForgeError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
                reason: "the current stage was reopened; resubmit it before advancing".into(),
            });
        }
        Ok(())
    }

    pub fn advance_to(&mut self, target: Stage) -> Result<()> {
        self.can_advance_to(target)?;
        self.enter_stage(target, None);
        Ok(())
    }

    /// Force advancement past a blocking gate, recording an audit issue.
    ///
    /// Rejected when the gate is not blocking; such advances go through
    /// [`ForgeProject::advance_to`].
    pub fn override_advance(&mut self, request: &GateOverride) -> Result<()> {
        self.check_next(request.target)?;
        if request.operator.trim().is_empty() {
            return Err(ForgeError::validation("operator", "an override must name its operator"));
        }
        if request.reason.trim().is_empty() {
            return Err(ForgeError::validation("reason", "an override must state a reason"));
        }
        let current = self.current_stage;
        let (score, minimum) = match self.latest_assessment(current) {
            Some(a) if a.can_progress() => {
                return Err(ForgeError::InvalidTransition {
                    from: current.to_string(),
                    to: request.target.to_string(),
                    reason: format!("gate is {}; advance without an override", a.gate),
                });
            }
            Some(a) => (a.overall_score, a.thresholds.minimum),
            None => {
                return Err(ForgeError::InvalidTransition {
                    from: current.to_string(),
                    to: request.target.to_string(),
                    reason: "stage has not been assessed; only a blocking gate can be overridden"
                        .into(),
                });
            }
        };

        let now = Utc::now();
        let id = self.quality_tracking.next_issue_id();
        self.quality_tracking.issues.push(QualityIssue {
            id,
            kind: IssueKind::GateOverride,
            stage: current,
            score,
            minimum,
            message: format!(
                "{} overrode the {} gate at score {:.1} (minimum {:.1})",
                request.operator, current, score, minimum
            ),
            raised_at: now,
            operator: Some(request.operator.clone()),
            reason: Some(request.reason.clone()),
            resolved_at: None,
        });

        let data = self.stages.entry(current).or_default();
        data.stage_completed = true;
        data.overridden = true;
        data.completed_at = Some(now);

        self.enter_stage(
            request.target,
            Some(format!("gate override by {}: {}", request.operator, request.reason)),
        );
        Ok(())
    }

    fn enter_stage(&mut self, target: Stage, note: Option<String>) {
        let now = Utc::now();
        if let Some(last) = self.stage_history.last_mut() {
            last.exited = Some(now);
        }
        self.current_stage = target;
        self.stage_history.push(StageTransition {
            stage: target,
            entered: now,
            exited: None,
            note,
        });
        self.recompute_progress();
        self.touch();
    }

    /// Reopen the completed current stage so a new document can be submitted.
    pub fn reopen(&mut self, stage: Stage, actor: &str) -> Result<()> {
        self.ensure_open()?;
        if stage != self.current_stage {
            return Err(ForgeError::InvalidStage {
                expected: self.current_stage.to_string(),
                got: stage.to_string(),
            });
        }
        if !self.is_stage_completed(stage) {
            return Err(ForgeError::InvalidTransition {
                from: stage.to_string(),
                to: stage.to_string(),
                reason: "stage is not completed".into(),
            });
        }
        if self.is_finished() {
            self.status = ProjectStatus::Active;
        }
        let data = self.stages.entry(stage).or_default();
        data.stage_completed = false;
        data.overridden = false;
        data.completed_at = None;
        data.reopen_count += 1;

        let now = Utc::now();
        if let Some(last) = self.stage_history.last_mut() {
            last.exited = Some(now);
        }
        self.stage_history.push(StageTransition {
            stage,
            entered: now,
            exited: None,
            note: Some(format!("reopened by {actor}")),
        });
        self.recompute_progress();
        self.touch();
        Ok(())
    }

    /// Move a project whose playbook has passed its gate into the complete state.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_not_finished()?;
        if self.current_stage != Stage::Playbook || !self.is_stage_completed(Stage::Playbook) {
            return Err(ForgeError::InvalidTransition {
                from: self.current_stage.to_string(),
                to: "complete".into(),
                reason: "the playbook stage must be completed first".into(),
            });
        }
        let now = Utc::now();
        if let Some(last) = self.stage_history.last_mut() {
            last.exited = Some(now);
        }
        self.status = ProjectStatus::Completed;
        self.progress_percentage = 100.0;
        self.touch();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Status, collaborators, artifacts
    // -----------------------------------------------------------------------

    pub fn set_status(&mut self, status: ProjectStatus) -> Result<()> {
        self.ensure_open()?;
        if status == self.status {
            return Ok(());
        }
        if status == ProjectStatus::Completed {
            return Err(ForgeError::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
                reason: "projects complete by finishing the pipeline".into(),
            });
        }
        if self.is_finished() && !status.is_terminal() {
            return Err(ForgeError::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
                reason: "a completed project can only be archived or cancelled".into(),
            });
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    pub fn add_collaborator(&mut self, user_id: &str, role: CollaboratorRole) -> Result<()> {
        self.ensure_open()?;
        if user_id.trim().is_empty() {
            return Err(ForgeError::validation("user_id", "must not be empty"));
        }
        if self.collaborators.iter().any(|c| c.user_id == user_id) {
            return Err(ForgeError::validation(
                "user_id",
                format!("'{user_id}' is already a collaborator"),
            ));
        }
        self.collaborators.push(Collaborator {
            user_id: user_id.to_string(),
            role,
            added_at: Utc::now(),
        });
        self.touch();
        Ok(())
    }

    pub fn record_artifact(&mut self, artifact: NewArtifact) -> Result<&Artifact> {
        self.ensure_open()?;
        if artifact.title.trim().is_empty() {
            return Err(ForgeError::validation("title", "must not be empty"));
        }
        self.touch();
        Ok(Artifact::append_to(&mut self.artifacts, artifact))
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    pub fn quality_report(&self) -> QualityReport {
        let history = &self.quality_tracking.history;
        let stages = Stage::all()
            .iter()
            .map(|stage| {
                let assessment = self.latest_assessment(*stage);
                StageQuality {
                    stage: *stage,
                    score: assessment.map(|a| a.overall_score),
                    gate: assessment.map(|a| a.gate),
                    completed: self.is_stage_completed(*stage),
                    assessments: history.iter().filter(|h| h.stage == *stage).count(),
                }
            })
            .collect();
        QualityReport {
            project_id: self.id.clone(),
            current_stage: self.current_stage,
            overall_quality: self.quality_tracking.overall_quality,
            stages,
            trend: trend(history),
            open_issues: self.quality_tracking.open_issues().cloned().collect(),
        }
    }
}

/// Sum of the latest score change of every stage assessed more than once.
fn trend(history: &[QualityHistoryEntry]) -> Trend {
    let delta: f64 = Stage::all()
        .iter()
        .filter_map(|stage| {
            let mut scores = history.iter().rev().filter(|h| h.stage == *stage);
            let last = scores.next()?;
            let previous = scores.next()?;
            Some(last.score - previous.score)
        })
        .sum();
    if delta > 1.0 {
        Trend::Improving
    } else if delta < -1.0 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::quality::{AssessmentEngine, PriorContext};
    use serde_json::json;

    fn project() -> ForgeProject {
        ForgeProject::new("bakery", "Bakery", "ada", None, Priority::High)
    }

    fn assess(p: &ForgeProject, stage: Stage, content: &Value) -> QualityAssessment {
        AssessmentEngine::default()
            .assess(stage, content, &p.prior_context(stage))
            .unwrap()
    }

    fn pass(p: &mut ForgeProject, stage: Stage) {
        let content = fixtures::content(stage);
        let a = assess(p, stage, &content);
        p.record_submission(stage, content, a, Some("ada")).unwrap();
    }

    fn blocked(p: &ForgeProject, stage: Stage) -> (Value, QualityAssessment) {
        let content = json!({"problem": {"statement": "too short"}});
        let a = assess(p, stage, &content);
        assert_eq!(a.gate, GateStatus::Block);
        (content, a)
    }

    #[test]
    fn new_project_starts_at_idea_in_draft() {
        let p = project();
        assert_eq!(p.current_stage, Stage::Idea);
        assert_eq!(p.status, ProjectStatus::Draft);
        assert_eq!(p.progress_percentage, 0.0);
        assert_eq!(p.collaborators[0].role, CollaboratorRole::Owner);
        assert_eq!(p.stage_history.len(), 1);
    }

    #[test]
    fn passing_submission_completes_and_snapshots() {
        let mut p = project();
        pass(&mut p, Stage::Idea);
        assert!(p.is_stage_completed(Stage::Idea));
        assert_eq!(p.status, ProjectStatus::Active);
        assert_eq!(p.progress_percentage, 20.0);
        assert_eq!(p.artifacts.len(), 1);
        assert_eq!(p.artifacts[0].kind, ArtifactKind::StageDocument);
        assert_eq!(p.artifacts[0].stage, Some(Stage::Idea));
        assert_eq!(p.quality_tracking.history.len(), 1);
    }

    #[test]
    fn submission_for_other_stage_is_invalid_stage() {
        let mut p = project();
        let a = assess(&p, Stage::Ux, &fixtures::ux());
        let err = p
            .record_submission(Stage::Ux, fixtures::ux(), a, None)
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidStage { .. }));
    }

    #[test]
    fn blocked_submission_opens_issue_and_next_pass_resolves_it() {
        let mut p = project();
        let (content, a) = blocked(&p, Stage::Idea);
        p.record_submission(Stage::Idea, content.clone(), a.clone(), None)
            .unwrap();
        p.record_submission(Stage::Idea, content, a, None).unwrap();
        assert!(!p.is_stage_completed(Stage::Idea));
        assert_eq!(p.quality_tracking.open_issues().count(), 1);
        assert!(p.artifacts.is_empty());

        pass(&mut p, Stage::Idea);
        assert_eq!(p.quality_tracking.open_issues().count(), 0);
        assert_eq!(p.quality_tracking.issues.len(), 1);
        assert_eq!(p.quality_report().trend, Trend::Improving);
    }

    #[test]
    fn completed_stage_needs_reopen_before_resubmission() {
        let mut p = project();
        pass(&mut p, Stage::Idea);
        let a = assess(&p, Stage::Idea, &fixtures::idea());
        let err = p
            .record_submission(Stage::Idea, fixtures::idea(), a, None)
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidTransition { .. }));

        p.reopen(Stage::Idea, "ada").unwrap();
        assert!(!p.is_stage_completed(Stage::Idea));
        assert_eq!(p.stage(Stage::Idea).unwrap().reopen_count, 1);
        pass(&mut p, Stage::Idea);
        assert_eq!(p.artifacts.len(), 2);
    }

    #[test]
    fn advance_requires_passing_assessment() {
        let mut p = project();
        let err = p.advance_to(Stage::Requirements).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidTransition { .. }));

        let (content, a) = blocked(&p, Stage::Idea);
        p.record_submission(Stage::Idea, content, a, None).unwrap();
        match p.advance_to(Stage::Requirements).unwrap_err() {
            ForgeError::GateBlocked { stage, assessment } => {
                assert_eq!(stage, "idea");
                assert!(assessment.overall_score < assessment.thresholds.minimum);
            }
            other => panic!("expected GateBlocked, got {other:?}"),
        }

        pass(&mut p, Stage::Idea);
        p.advance_to(Stage::Requirements).unwrap();
        assert_eq!(p.current_stage, Stage::Requirements);
        assert_eq!(p.stage_history.len(), 2);
        assert!(p.stage_history[0].exited.is_some());
    }

    #[test]
    fn skipping_a_stage_is_invalid_transition() {
        let mut p = project();
        pass(&mut p, Stage::Idea);
        for target in [Stage::Ux, Stage::Technical, Stage::Playbook, Stage::Idea] {
            let err = p.advance_to(target).unwrap_err();
            assert!(
                matches!(err, ForgeError::InvalidTransition { .. }),
                "{target}: {err:?}"
            );
        }
    }

    #[test]
    fn override_is_audited_and_only_for_blocked_gates() {
        let mut p = project();
        let (content, a) = blocked(&p, Stage::Idea);
        let score = a.overall_score;
        p.record_submission(Stage::Idea, content, a, None).unwrap();

        let request = GateOverride {
            target: Stage::Requirements,
            operator: "lead".into(),
            reason: "pilot deadline".into(),
        };
        p.override_advance(&request).unwrap();
        assert_eq!(p.current_stage, Stage::Requirements);
        let issue = p
            .quality_tracking
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::GateOverride)
            .unwrap();
        assert_eq!(issue.operator.as_deref(), Some("lead"));
        assert_eq!(issue.score, score);
        assert_eq!(issue.minimum, 75.0);
        assert!(p.stage(Stage::Idea).unwrap().overridden);
        assert!(p.stage_history[1].note.as_deref().unwrap().contains("override"));

        // A passing gate refuses the override path.
        pass(&mut p, Stage::Requirements);
        let err = p
            .override_advance(&GateOverride {
                target: Stage::Ux,
                operator: "lead".into(),
                reason: "x".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidTransition { .. }));
    }

    #[test]
    fn reopened_stage_cannot_be_advanced_past() {
        let mut p = project();
        pass(&mut p, Stage::Idea);
        p.reopen(Stage::Idea, "ada").unwrap();

        let err = p.advance_to(Stage::Requirements).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidTransition { .. }), "{err:?}");
        assert_eq!(p.current_stage, Stage::Idea);
        assert_eq!(p.progress_percentage, 0.0);

        pass(&mut p, Stage::Idea);
        p.advance_to(Stage::Requirements).unwrap();
        assert!(p.is_stage_completed(Stage::Idea));
    }

    #[test]
    fn override_needs_an_assessed_blocking_gate() {
        let mut p = project();
        let err = p
            .override_advance(&GateOverride {
                target: Stage::Requirements,
                operator: "lead".into(),
                reason: "pilot deadline".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidTransition { .. }), "{err:?}");
        assert_eq!(p.current_stage, Stage::Idea);
        assert!(p.quality_tracking.issues.is_empty());
    }

    #[test]
    fn override_requires_operator_and_reason() {
        let mut p = project();
        let err = p
            .override_advance(&GateOverride {
                target: Stage::Requirements,
                operator: " ".into(),
                reason: "r".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ForgeError::Validation { ref field, .. } if field == "operator"));
    }

    #[test]
    fn full_pipeline_finishes() {
        let mut p = project();
        for stage in Stage::all() {
            pass(&mut p, *stage);
            if let Some(next) = stage.next() {
                p.advance_to(next).unwrap();
            }
        }
        p.finish().unwrap();
        assert_eq!(p.status, ProjectStatus::Completed);
        assert_eq!(p.progress_percentage, 100.0);
        assert!(p.advance_to(Stage::Playbook).is_err());
        assert!(p.set_status(ProjectStatus::Active).is_err());
        p.set_status(ProjectStatus::Archived).unwrap();
    }

    #[test]
    fn terminal_projects_reject_everything() {
        let mut p = project();
        pass(&mut p, Stage::Idea);
        p.set_status(ProjectStatus::Cancelled).unwrap();
        assert!(matches!(
            p.advance_to(Stage::Requirements),
            Err(ForgeError::TerminalProject { .. })
        ));
        assert!(matches!(
            p.set_status(ProjectStatus::Active),
            Err(ForgeError::TerminalProject { .. })
        ));
        assert!(p.add_collaborator("bob", CollaboratorRole::Viewer).is_err());
    }

    #[test]
    fn collaborators_are_unique() {
        let mut p = project();
        p.add_collaborator("bob", CollaboratorRole::Editor).unwrap();
        assert!(p.add_collaborator("bob", CollaboratorRole::Viewer).is_err());
        assert!(p.add_collaborator("ada", CollaboratorRole::Viewer).is_err());
    }

    #[test]
    fn prior_context_contains_only_upstream_content() {
        let mut p = project();
        pass(&mut p, Stage::Idea);
        let ctx: PriorContext = p.prior_context(Stage::Requirements);
        assert_eq!(ctx.keys().copied().collect::<Vec<_>>(), vec![Stage::Idea]);
        assert!(p.prior_context(Stage::Idea).is_empty());
    }

    #[test]
    fn yaml_and_json_round_trip_preserve_everything() {
        let mut p = project();
        let (content, a) = blocked(&p, Stage::Idea);
        p.record_submission(Stage::Idea, content, a, None).unwrap();
        pass(&mut p, Stage::Idea);
        p.advance_to(Stage::Requirements).unwrap();
        p.add_collaborator("bob", CollaboratorRole::Reviewer).unwrap();

        let yaml = serde_yaml::to_string(&p).unwrap();
        let from_yaml: ForgeProject = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(from_yaml, p);

        let json = serde_json::to_string(&p).unwrap();
        let from_json: ForgeProject = serde_json::from_str(&json).unwrap();
        assert_eq!(from_json, p);
        assert_eq!(from_json.quality_tracking.history.len(), 2);
    }
}
