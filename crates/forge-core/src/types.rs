use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idea,
    Requirements,
    Ux,
    Technical,
    Playbook,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Idea,
            Stage::Requirements,
            Stage::Ux,
            Stage::Technical,
            Stage::Playbook,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        Stage::all().get(self.index() + 1).copied()
    }

    /// Stages strictly before this one, in pipeline order.
    pub fn upstream(self) -> &'static [Stage] {
        &Stage::all()[..self.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idea => "idea",
            Stage::Requirements => "requirements",
            Stage::Ux => "ux",
            Stage::Technical => "technical",
            Stage::Playbook => "playbook",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Idea => "Idea",
            Stage::Requirements => "Requirements",
            Stage::Ux => "UX Design",
            Stage::Technical => "Technical Analysis",
            Stage::Playbook => "Implementation Playbook",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::error::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idea" => Ok(Stage::Idea),
            "requirements" => Ok(Stage::Requirements),
            "ux" => Ok(Stage::Ux),
            "technical" | "technical_analysis" | "technical-analysis" => Ok(Stage::Technical),
            "playbook" | "implementation_playbook" | "implementation-playbook" => {
                Ok(Stage::Playbook)
            }
            _ => Err(crate::error::ForgeError::UnknownStage(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Active,
    OnHold,
    Completed,
    Archived,
    Cancelled,
}

impl ProjectStatus {
    /// Archived and cancelled projects accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Archived | ProjectStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = crate::error::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "active" => Ok(ProjectStatus::Active),
            "on_hold" | "on-hold" => Ok(ProjectStatus::OnHold),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            "cancelled" | "canceled" => Ok(ProjectStatus::Cancelled),
            _ => Err(crate::error::ForgeError::validation(
                "status",
                format!("unknown project status '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(crate::error::ForgeError::validation(
                "priority",
                format!("unknown priority '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// GateStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Block,
    ProceedWithCaution,
    ProceedExcellent,
}

impl GateStatus {
    pub fn allows_progress(self) -> bool {
        !matches!(self, GateStatus::Block)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Block => "BLOCK",
            GateStatus::ProceedWithCaution => "PROCEED_WITH_CAUTION",
            GateStatus::ProceedExcellent => "PROCEED_EXCELLENT",
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConfidenceLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// CollaboratorRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorRole {
    Owner,
    Editor,
    Reviewer,
    Viewer,
}

impl fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollaboratorRole::Owner => "owner",
            CollaboratorRole::Editor => "editor",
            CollaboratorRole::Reviewer => "reviewer",
            CollaboratorRole::Viewer => "viewer",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CollaboratorRole {
    type Err = crate::error::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(CollaboratorRole::Owner),
            "editor" => Ok(CollaboratorRole::Editor),
            "reviewer" => Ok(CollaboratorRole::Reviewer),
            "viewer" => Ok(CollaboratorRole::Viewer),
            _ => Err(crate::error::ForgeError::validation(
                "role",
                format!("unknown collaborator role '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
