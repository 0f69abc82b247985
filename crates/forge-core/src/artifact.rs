use crate::types::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Snapshot of a stage document at the moment it passed its gate.
    StageDocument,
    ConsensusReport,
    Export,
    Attachment,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::StageDocument => "stage_document",
            ArtifactKind::ConsensusReport => "consensus_report",
            ArtifactKind::Export => "export",
            ArtifactKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = crate::error::ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage_document" | "stage-document" => Ok(ArtifactKind::StageDocument),
            "consensus_report" | "consensus-report" => Ok(ArtifactKind::ConsensusReport),
            "export" => Ok(ArtifactKind::Export),
            "attachment" => Ok(ArtifactKind::Attachment),
            _ => Err(crate::error::ForgeError::validation(
                "kind",
                format!("unknown artifact kind '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Immutable document attached to a project. Artifacts are only ever
/// appended; there is no update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub kind: ArtifactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub title: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of an artifact; id and timestamp are assigned on
/// append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    pub kind: ArtifactKind,
    pub stage: Option<Stage>,
    pub title: String,
    pub content: Value,
    pub created_by: Option<String>,
}

impl NewArtifact {
    pub fn new(kind: ArtifactKind, title: impl Into<String>, content: Value) -> Self {
        Self {
            kind,
            stage: None,
            title: title.into(),
            content,
            created_by: None,
        }
    }

    pub fn for_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn by(mut self, who: impl Into<String>) -> Self {
        self.created_by = Some(who.into());
        self
    }
}

impl Artifact {
    /// Ids are sequential per project: `art-0001`, `art-0002`, ...
    pub fn id_for(seq: usize) -> String {
        format!("art-{seq:04}")
    }

    pub(crate) fn append_to(list: &mut Vec<Artifact>, new: NewArtifact) -> &Artifact {
        let artifact = Artifact {
            id: Self::id_for(list.len() + 1),
            kind: new.kind,
            stage: new.stage,
            title: new.title,
            content: new.content,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        list.push(artifact);
        &list[list.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn append_assigns_sequential_ids() {
        let mut list = Vec::new();
        let first = Artifact::append_to(
            &mut list,
            NewArtifact::new(ArtifactKind::StageDocument, "Idea", json!({"a": 1}))
                .for_stage(Stage::Idea),
        )
        .id
        .clone();
        let second = Artifact::append_to(
            &mut list,
            NewArtifact::new(ArtifactKind::Attachment, "notes", json!("text")).by("ada"),
        );
        assert_eq!(first, "art-0001");
        assert_eq!(second.id, "art-0002");
        assert_eq!(second.created_by.as_deref(), Some("ada"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn kind_parse_and_display_agree() {
        for kind in [
            ArtifactKind::StageDocument,
            ArtifactKind::ConsensusReport,
            ArtifactKind::Export,
            ArtifactKind::Attachment,
        ] {
            assert_eq!(ArtifactKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(ArtifactKind::from_str("diagram").is_err());
    }
}
