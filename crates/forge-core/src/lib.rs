//! `forge-core`: a five-stage, quality-gated product pipeline.
//!
//! ```text
//! idea ──► requirements ──► ux ──► technical ──► playbook ──► completed
//!   │            │           │         │             │
//!   └────────────┴───────────┴─────────┴─────────────┘
//!                      each gated by quality::AssessmentEngine
//!
//! StagePipeline ──► ProjectStore (file | redb, compare-and-swap)
//! ConsensusOrchestrator ──► model_client::ModelProvider × N (technical stage)
//! ```

pub mod artifact;
pub mod config;
pub mod consensus;
pub mod error;
pub mod export;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod project;
pub mod quality;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use consensus::{ArchitectureRequirements, ConsensusOrchestrator, ConsensusResult};
pub use error::{ForgeError, Result};
pub use pipeline::{NewProject, ProjectFilter, StageCompletion, StagePipeline};
pub use project::ForgeProject;
pub use quality::{AssessmentEngine, QualityAssessment};
pub use types::{GateStatus, Stage};
