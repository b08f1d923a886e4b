//! Unified configuration for kindred analysis runs.
//!
//! Configuration is loaded with precedence: overrides > Env vars > Config file > Defaults
//!
//! # Example config file (kindred.toml)
//! ```toml
//! [dedup]
//! threshold = 0.8
//! year_gap_cap = 3
//!
//! [dedup.weights]
//! sources = 0.0
//!
//! [relationships]
//! checks = ["circular", "orphans"]
//! max_concurrent_spouses = 2
//!
//! [timeline]
//! max_parent_age = 65
//! min_severity = "warning"
//! ```
//!
//! Environment variables use the `KINDRED_` prefix with `__` between
//! sections, e.g. `KINDRED_DEDUP__THRESHOLD=0.8`.

mod defaults;

pub use defaults::*;

use crate::error::{ensure_in_range, AnalysisError, AnalysisResult};
use crate::issues::Severity;
use crate::relationships::{RelationshipCheck, RelationshipOptions};
use crate::scoring::{FactorWeights, SimilarityScorer};
use crate::timeline::TimelineOptions;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindredConfig {
    /// Duplicate detection
    pub dedup: DedupConfig,
    /// Relationship graph validation
    pub relationships: RelationshipConfig,
    /// Timeline validation
    pub timeline: TimelineConfig,
    /// Source coverage analysis
    pub coverage: CoverageConfig,
}

impl KindredConfig {
    /// Load configuration with precedence: overrides > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - Caller overrides to apply on top
    pub fn load(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(KindredConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with KINDRED_ prefix
        figment = figment.merge(Env::prefixed("KINDRED_").split("__"));

        // Layer 3: Caller overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: KindredConfig = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no overrides)
    pub fn from_env(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Check every section against its documented range
    pub fn validate(&self) -> AnalysisResult<()> {
        self.dedup.validate()?;
        self.relationships.validate()?;
        self.timeline.validate()
    }
}

/// Duplicate detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Score at or above which a pair is a duplicate (0.0 - 1.0)
    pub threshold: f64,
    /// Threshold for listing likely duplicate pairs (0.0 - 1.0)
    pub likely_threshold: f64,
    /// Year gap at which year proximity reaches zero (0 = exact year only)
    pub year_gap_cap: u32,
    /// Minimum weight a score is normalized by (0.0 - 1.0)
    pub min_evidence_weight: f64,
    /// Skip phonetic buckets larger than this (0 = unlimited)
    pub max_block_size: usize,
    /// Score candidate pairs on the rayon thread pool
    pub parallel: bool,
    pub weights: FactorWeights,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            likely_threshold: DEFAULT_LIKELY_DUPLICATE_THRESHOLD,
            year_gap_cap: DEFAULT_YEAR_GAP_CAP,
            min_evidence_weight: DEFAULT_MIN_EVIDENCE_WEIGHT,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            parallel: true,
            weights: FactorWeights::default(),
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        ensure_in_range("dedup.threshold", self.threshold, 0.0, 1.0)?;
        ensure_in_range("dedup.likely_threshold", self.likely_threshold, 0.0, 1.0)?;
        SimilarityScorer::from_config(self).map(|_| ())
    }
}

/// Relationship validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipConfig {
    /// Checks run by default
    pub checks: Vec<RelationshipCheck>,
    pub max_concurrent_spouses: usize,
    pub max_biological_parents: usize,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            checks: RelationshipCheck::ALL.to_vec(),
            max_concurrent_spouses: DEFAULT_MAX_CONCURRENT_SPOUSES,
            max_biological_parents: DEFAULT_MAX_BIOLOGICAL_PARENTS,
        }
    }
}

impl RelationshipConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.max_concurrent_spouses == 0 || self.max_biological_parents == 0 {
            return Err(AnalysisError::configuration(
                "relationship allowances must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn options(&self) -> RelationshipOptions {
        RelationshipOptions::from_config(self)
    }
}

/// Timeline validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub max_parent_age: i32,
    pub min_parent_age: i32,
    pub max_lifespan: i32,
    pub min_severity: Severity,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_parent_age: DEFAULT_MAX_PARENT_AGE,
            min_parent_age: DEFAULT_MIN_PARENT_AGE,
            max_lifespan: DEFAULT_MAX_LIFESPAN,
            min_severity: Severity::Info,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        self.options().validate()
    }

    pub fn options(&self) -> TimelineOptions {
        TimelineOptions::from_config(self)
    }
}

/// Source coverage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub generations: u32,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            generations: DEFAULT_COVERAGE_GENERATIONS,
        }
    }
}

/// Overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup: Option<DedupOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<TimelineOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_gap_cap: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parent_age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_parent_age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lifespan: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<Severity>,
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

impl From<AnalysisError> for ConfigError {
    fn from(e: AnalysisError) -> Self {
        let message = match e {
            AnalysisError::Configuration(message) | AnalysisError::Input(message) => message,
        };
        Self { message }
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(e: ConfigError) -> Self {
        AnalysisError::Configuration(e.message)
    }
}
