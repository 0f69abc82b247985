//! Stage pipeline state machine.
//!
//! Every mutating operation is a read-modify-write of one project document:
//! load, apply a [`ForgeProject`] transition, compare-and-swap save. A lost
//! race reloads and retries with bounded exponential backoff before
//! surfacing `ConcurrencyConflict`. Operations on different projects never
//! contend.

use crate::artifact::{Artifact, NewArtifact};
use crate::config::{Config, RetryConfig};
use crate::consensus::ArchitectureRequirements;
use crate::error::{ForgeError, Result};
use crate::export::{self, ExportBundle, ExportFormat};
use crate::paths;
use crate::project::{ForgeProject, GateOverride, QualityReport};
use crate::quality::{AssessmentEngine, QualityAssessment};
use crate::store::ProjectStore;
use crate::types::{CollaboratorRole, Priority, ProjectStatus, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    /// Derived from `name` when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl ProjectFilter {
    pub fn matches(&self, p: &ForgeProject) -> bool {
        self.status.map_or(true, |s| p.status == s)
            && self.stage.map_or(true, |s| p.current_stage == s)
            && self.owner.as_deref().map_or(true, |o| p.owner == o)
            && self.priority.map_or(true, |pr| p.priority == pr)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCompletion {
    pub project_id: String,
    pub quality_assessment: QualityAssessment,
    pub can_progress: bool,
}

// ---------------------------------------------------------------------------
// StagePipeline
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct StagePipeline {
    store: Arc<dyn ProjectStore>,
    engine: Arc<AssessmentEngine>,
    retry: RetryConfig,
}

impl StagePipeline {
    pub fn new(store: Arc<dyn ProjectStore>, engine: AssessmentEngine, retry: RetryConfig) -> Self {
        Self {
            store,
            engine: Arc::new(engine),
            retry,
        }
    }

    pub fn from_config(store: Arc<dyn ProjectStore>, config: &Config) -> Self {
        Self::new(
            store,
            AssessmentEngine::new(config.quality.profiles()),
            config.retry,
        )
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_project(&self, id: &str) -> Result<ForgeProject> {
        self.store.load(id)
    }

    pub fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<ForgeProject>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    pub fn quality_report(&self, id: &str) -> Result<QualityReport> {
        Ok(self.store.load(id)?.quality_report())
    }

    /// Assess `content` against the project's context without storing it.
    pub fn assess_stage(&self, id: &str, stage: Stage, content: &Value) -> Result<QualityAssessment> {
        validate_content(content)?;
        let project = self.store.load(id)?;
        self.engine
            .assess(stage, content, &project.prior_context(stage))
    }

    /// Render the project's stage documents; see [`export::export_project`].
    pub fn export_project(
        &self,
        id: &str,
        format: ExportFormat,
        stages: &[Stage],
    ) -> Result<ExportBundle> {
        export::export_project(&self.store.load(id)?, format, stages)
    }

    /// Consensus request built from the project's idea and requirements.
    pub fn architecture_requirements(&self, id: &str) -> Result<ArchitectureRequirements> {
        ArchitectureRequirements::from_project(&self.store.load(id)?)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn create_project(&self, new: NewProject) -> Result<ForgeProject> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ForgeError::validation("name", "must not be empty"));
        }
        let owner = new.owner.trim();
        if owner.is_empty() {
            return Err(ForgeError::validation("owner", "must not be empty"));
        }
        let id = match new.id {
            Some(id) => id,
            None => paths::slugify(name).ok_or_else(|| {
                ForgeError::validation("name", "contains no characters usable in an id")
            })?,
        };
        paths::validate_id(&id)?;

        let mut project = ForgeProject::new(id, name, owner, new.description, new.priority);
        self.store.insert(&mut project)?;
        tracing::info!(project = %project.id, "project created");
        Ok(project)
    }

    /// Store the document for the current stage, assess it, and persist the
    /// result. The stage completes when its gate is not BLOCK.
    pub fn complete_stage(
        &self,
        id: &str,
        stage: Stage,
        content: Value,
        actor: Option<&str>,
    ) -> Result<StageCompletion> {
        validate_content(&content)?;
        let (_, assessment) = self.update(id, |p| {
            p.can_submit(stage)?;
            let assessment = self.engine.assess(stage, &content, &p.prior_context(stage))?;
            p.record_submission(stage, content.clone(), assessment.clone(), actor)?;
            Ok(assessment)
        })?;

        tracing::info!(
            project = %id,
            stage = %stage,
            score = assessment.overall_score,
            gate = %assessment.gate,
            "stage assessed"
        );
        Ok(StageCompletion {
            project_id: id.to_string(),
            can_progress: assessment.can_progress(),
            quality_assessment: assessment,
        })
    }

    pub fn advance_stage(&self, id: &str, target: Stage) -> Result<ForgeProject> {
        let (project, ()) = self.update(id, |p| p.advance_to(target))?;
        tracing::info!(project = %id, stage = %target, "stage advanced");
        Ok(project)
    }

    /// Audited bypass of a blocking gate.
    pub fn override_advance(&self, id: &str, request: &GateOverride) -> Result<ForgeProject> {
        let (project, ()) = self.update(id, |p| p.override_advance(request))?;
        tracing::warn!(
            project = %id,
            stage = %request.target,
            operator = %request.operator,
            "gate overridden"
        );
        Ok(project)
    }

    pub fn reopen_stage(&self, id: &str, stage: Stage, actor: &str) -> Result<ForgeProject> {
        let (project, ()) = self.update(id, |p| p.reopen(stage, actor))?;
        tracing::info!(project = %id, stage = %stage, actor, "stage reopened");
        Ok(project)
    }

    pub fn finish_pipeline(&self, id: &str) -> Result<ForgeProject> {
        let (project, ()) = self.update(id, |p| p.finish())?;
        tracing::info!(project = %id, "pipeline complete");
        Ok(project)
    }

    pub fn set_status(&self, id: &str, status: ProjectStatus) -> Result<ForgeProject> {
        let (project, ()) = self.update(id, |p| p.set_status(status))?;
        Ok(project)
    }

    pub fn add_collaborator(
        &self,
        id: &str,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<ForgeProject> {
        let (project, ()) = self.update(id, |p| p.add_collaborator(user_id, role))?;
        Ok(project)
    }

    pub fn record_artifact(&self, id: &str, artifact: NewArtifact) -> Result<Artifact> {
        let (_, recorded) = self.update(id, |p| p.record_artifact(artifact.clone()).cloned())?;
        tracing::debug!(project = %id, artifact = %recorded.id, kind = %recorded.kind, "artifact recorded");
        Ok(recorded)
    }

    pub fn delete_project(&self, id: &str) -> Result<()> {
        self.store.delete(id)?;
        tracing::info!(project = %id, "project deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Optimistic read-modify-write
    // -----------------------------------------------------------------------

    fn update<T>(
        &self,
        id: &str,
        mut apply: impl FnMut(&mut ForgeProject) -> Result<T>,
    ) -> Result<(ForgeProject, T)> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut project = self.store.load(id)?;
            let out = apply(&mut project)?;
            match self.store.save(&mut project) {
                Ok(()) => return Ok((project, out)),
                Err(ForgeError::ConcurrencyConflict {
                    id,
                    expected,
                    found,
                    ..
                }) => {
                    if attempt > self.retry.max_retries {
                        return Err(ForgeError::ConcurrencyConflict {
                            id,
                            expected,
                            found,
                            attempts: attempt,
                        });
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::debug!(project = %id, attempt, ?delay, "write conflict, retrying");
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn validate_content(content: &Value) -> Result<()> {
    match content {
        Value::Object(map) if map.is_empty() => {
            Err(ForgeError::validation("content", "stage document is empty"))
        }
        Value::Object(_) => Ok(()),
        _ => Err(ForgeError::validation(
            "content",
            "stage document must be a JSON object",
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
