//! Configuration for indexes, analysis, scoring and ingestion.
//!
//! All configuration types are plain serde structs with sensible defaults, so an
//! [`IndexConfig`] can be built in code or loaded from a JSON file:
//!
//! ```
//! use placedex::config::IndexConfig;
//!
//! let config = IndexConfig::from_json_str(r#"{"ingest": {"batches": 4}}"#).unwrap();
//! assert_eq!(config.ingest.batches, 4);
//! assert_eq!(config.scoring.k1, 1.2);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlacedexError, Result};
use crate::index::writer::UniquePolicy;

/// Fixed timestamp format used by Timestamp fields.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stop words removed from analyzed text by default.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "of", "to", "and", "a", "in", "is", "it", "you", "that", "he", "was", "for", "on",
    "are",
];

/// Top-level configuration for an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Text analysis settings.
    pub analysis: AnalysisConfig,

    /// Relevance scoring settings.
    pub scoring: ScoringConfig,

    /// Chunked ingestion settings.
    pub ingest: IngestConfig,

    /// chrono format string for Timestamp fields.
    pub timestamp_format: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            analysis: AnalysisConfig::default(),
            scoring: ScoringConfig::default(),
            ingest: IngestConfig::default(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl IndexConfig {
    /// Parse a configuration from a JSON string. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.scoring.k1 < 0.0 {
            return Err(PlacedexError::invalid_argument("k1 must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.scoring.b) {
            return Err(PlacedexError::invalid_argument("b must be within [0, 1]"));
        }
        if let Some((field, weight)) = self
            .scoring
            .field_weights
            .iter()
            .find(|(_, weight)| **weight < 0.0)
        {
            return Err(PlacedexError::invalid_argument(format!(
                "Field weight for '{field}' must be non-negative, got {weight}"
            )));
        }
        if self.ingest.batches == 0 {
            return Err(PlacedexError::invalid_argument("batches must be at least 1"));
        }
        if self.ingest.queue_capacity == 0 {
            return Err(PlacedexError::invalid_argument(
                "queue_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Analysis pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Words dropped from Text fields, matched case-insensitively on whole tokens.
    pub stop_words: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// BM25F parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Term frequency saturation.
    pub k1: f32,

    /// Length normalization strength.
    pub b: f32,

    /// Per-field weights; fields not listed weigh 1.0.
    pub field_weights: BTreeMap<String, f32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            k1: 1.2,
            b: 0.75,
            field_weights: BTreeMap::new(),
        }
    }
}

/// Chunked ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Number of chunks `k` to split an input into.
    pub batches: usize,

    /// Preparation threads for parallel ingestion.
    pub workers: usize,

    /// Prepared chunks allowed to wait in the commit queue.
    pub queue_capacity: usize,

    /// What to do when a record repeats a unique value.
    pub unique_policy: UniquePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        IngestConfig {
            batches: 10,
            workers,
            queue_capacity: workers,
            unique_policy: UniquePolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.timestamp_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(config.analysis.stop_words.len(), 15);
        assert_eq!(config.scoring.b, 0.75);
        assert_eq!(config.ingest.batches, 10);
        assert!(config.ingest.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = IndexConfig::from_json_str(
            r#"{"scoring": {"field_weights": {"name": 2.0}}, "ingest": {"unique_policy": "Overwrite"}}"#,
        )
        .unwrap();

        assert_eq!(config.scoring.field_weights.get("name"), Some(&2.0));
        assert_eq!(config.scoring.k1, 1.2);
        assert_eq!(config.ingest.unique_policy, UniquePolicy::Overwrite);
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(IndexConfig::from_json_str(r#"{"scoring": {"b": 1.5}}"#).is_err());
        assert!(IndexConfig::from_json_str(r#"{"ingest": {"batches": 0}}"#).is_err());
        assert!(
            IndexConfig::from_json_str(r#"{"scoring": {"field_weights": {"name": -1.0}}}"#)
                .is_err()
        );
        assert!(IndexConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{"timestamp_format": "%Y-%m-%d"}"#).unwrap();

        let config = IndexConfig::from_json_file(&path).unwrap();
        assert_eq!(config.timestamp_format, "%Y-%m-%d");
    }
}
