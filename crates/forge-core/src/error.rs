use crate::consensus::ProviderFailure;
use crate::quality::QualityAssessment;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("not initialized: run 'forge init'")]
    NotInitialized,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project already exists: {0}")]
    ProjectExists(String),

    #[error("invalid project id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidId(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid stage: project is at '{expected}', got '{got}'")]
    InvalidStage { expected: String, got: String },

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error(
        "gate blocked at stage '{stage}': score {:.1} is below the minimum of {:.1}",
        .assessment.overall_score,
        .assessment.thresholds.minimum
    )]
    GateBlocked {
        stage: String,
        assessment: Box<QualityAssessment>,
    },

    #[error("project '{id}' is {status}; no further transitions are permitted")]
    TerminalProject { id: String, status: String },

    #[error("no analysis available: {}", describe_failures(.failures))]
    NoProvidersAvailable { failures: Vec<ProviderFailure> },

    #[error(
        "concurrent modification of project '{id}': expected version {expected}, found {found} (gave up after {attempts} attempts)"
    )]
    ConcurrencyConflict {
        id: String,
        expected: u64,
        found: u64,
        attempts: u32,
    },

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("unknown export format: {0}")]
    UnknownFormat(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ForgeError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ForgeError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors produced by a lost compare-and-swap race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ForgeError::ConcurrencyConflict { .. })
    }
}

fn describe_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers are configured".to_string();
    }
    let detail: Vec<String> = failures
        .iter()
        .map(|f| format!("{} ({})", f.provider, f.reason))
        .collect();
    format!("all {} providers failed: {}", failures.len(), detail.join(", "))
}

pub type Result<T> = std::result::Result<T, ForgeError>;
