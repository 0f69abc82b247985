use crate::error::{ForgeError, Result};
use crate::paths;
use crate::quality::{StageProfiles, Thresholds, WEIGHT_TOLERANCE};
use crate::types::Stage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Largest provider fan-out the orchestrator is tuned for.
pub const MAX_PROVIDERS: usize = 4;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// QualityConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Per-stage overrides of the built-in gate thresholds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<Stage, Thresholds>,
}

impl QualityConfig {
    pub fn profiles(&self) -> StageProfiles {
        StageProfiles::standard().with_thresholds(&self.thresholds)
    }
}

// ---------------------------------------------------------------------------
// ConsensusConfig
// ---------------------------------------------------------------------------

/// Relative weight of each similarity signal in pairwise agreement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgreementWeights {
    #[serde(default = "default_style_weight")]
    pub style: f64,
    #[serde(default = "default_components_weight")]
    pub components: f64,
    #[serde(default = "default_risks_weight")]
    pub risks: f64,
}

fn default_style_weight() -> f64 {
    0.40
}

fn default_components_weight() -> f64 {
    0.35
}

fn default_risks_weight() -> f64 {
    0.25
}

impl Default for AgreementWeights {
    fn default() -> Self {
        Self {
            style: default_style_weight(),
            components: default_components_weight(),
            risks: default_risks_weight(),
        }
    }
}

impl AgreementWeights {
    pub fn sum(&self) -> f64 {
        self.style + self.components + self.risks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key. Omit for keyless gateways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Pairwise agreement at or above which two analyses share a cluster.
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: f64,
    #[serde(default)]
    pub weights: AgreementWeights,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_cluster_threshold() -> f64 {
    0.5
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            cluster_threshold: default_cluster_threshold(),
            weights: AgreementWeights::default(),
            providers: Vec::new(),
        }
    }
}

impl ConsensusConfig {
    /// Call timeout for the named provider, falling back to the shared default.
    pub fn timeout_for(&self, provider: &str) -> Duration {
        let secs = self
            .providers
            .iter()
            .find(|p| p.name == provider)
            .and_then(|p| p.timeout_seconds)
            .unwrap_or(self.timeout_seconds);
        Duration::from_secs(secs)
    }
}

// ---------------------------------------------------------------------------
// StoreConfig / RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    File,
    Redb,
}

impl std::str::FromStr for StoreBackend {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(StoreBackend::File),
            "redb" => Ok(StoreBackend::Redb),
            _ => Err(ForgeError::validation(
                "store.backend",
                format!("unknown backend '{s}' (expected file or redb)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

/// Bounded exponential backoff for optimistic-concurrency retries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_backoff_ms() -> u64 {
    10
}

fn default_max_backoff_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .base_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            quality: QualityConfig::default(),
            consensus: ConsensusConfig::default(),
            store: StoreConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load `.forge/config.yaml`. A workspace without a config file gets
    /// the defaults; a root without `.forge/` is not initialized.
    pub fn load(root: &Path) -> Result<Self> {
        if !paths::forge_dir(root).is_dir() {
            return Err(ForgeError::NotInitialized);
        }
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        // Threshold overrides.
        for (stage, t) in &self.quality.thresholds {
            if !(0.0..=100.0).contains(&t.minimum) || !(0.0..=100.0).contains(&t.recommended) {
                push(
                    WarnLevel::Error,
                    format!("quality.thresholds.{stage}: values must lie within 0..=100"),
                );
            }
            if t.minimum > t.recommended {
                push(
                    WarnLevel::Error,
                    format!(
                        "quality.thresholds.{stage}: minimum {} exceeds recommended {}",
                        t.minimum, t.recommended
                    ),
                );
            }
        }
        let profiles = self.quality.profiles();
        let minimums: Vec<(Stage, f64)> = profiles
            .iter()
            .map(|p| (p.stage, p.thresholds.minimum))
            .collect();
        for pair in minimums.windows(2) {
            let ((a, a_min), (b, b_min)) = (pair[0], pair[1]);
            if b_min < a_min {
                push(
                    WarnLevel::Warning,
                    format!("minimum threshold drops from {a_min} at {a} to {b_min} at {b}"),
                );
            }
        }

        // Consensus.
        let weights = &self.consensus.weights;
        if (weights.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            push(
                WarnLevel::Error,
                format!(
                    "consensus.weights sum to {:.3}; they must sum to 1",
                    weights.sum()
                ),
            );
        }
        if [weights.style, weights.components, weights.risks]
            .iter()
            .any(|w| *w < 0.0)
        {
            push(
                WarnLevel::Error,
                "consensus.weights must not be negative".to_string(),
            );
        }
        if !(0.0..=1.0).contains(&self.consensus.cluster_threshold) {
            push(
                WarnLevel::Error,
                format!(
                    "consensus.cluster_threshold {} is outside 0..=1",
                    self.consensus.cluster_threshold
                ),
            );
        }
        let count = self.consensus.providers.len();
        if count == 0 || count > MAX_PROVIDERS {
            push(
                WarnLevel::Warning,
                format!("{count} consensus providers configured; 1 to {MAX_PROVIDERS} expected"),
            );
        }
        let mut seen = HashSet::new();
        for provider in &self.consensus.providers {
            if !seen.insert(provider.name.as_str()) {
                push(
                    WarnLevel::Error,
                    format!("duplicate consensus provider '{}'", provider.name),
                );
            }
            if provider.model.trim().is_empty() {
                push(
                    WarnLevel::Error,
                    format!("consensus provider '{}' has an empty model", provider.name),
                );
            }
            if provider.timeout_seconds == Some(0) {
                push(
                    WarnLevel::Warning,
                    format!("consensus provider '{}' has a zero timeout", provider.name),
                );
            }
        }

        if self.retry.max_retries > 20 {
            push(
                WarnLevel::Warning,
                format!(
                    "retry.max_retries={} (>20 is unusual)",
                    self.retry.max_retries
                ),
            );
        }

        warnings
    }

    pub fn has_errors(&self) -> bool {
        self.validate().iter().any(|w| w.level == WarnLevel::Error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
