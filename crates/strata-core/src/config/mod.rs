//! Configuration system for strata.
//!
//! `StrataConfig` composes the per-engine configs so one file can drive the
//! whole hierarchy. Each sub-config defaults independently; a partial file
//! overrides only what it names.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationConfig;
use crate::error::{StrataError, StrataResult};
use crate::promotion::{MemoryTargets, PromotionConfig};
use crate::pruning::PruneConfig;
use crate::query::QueryConfig;
use crate::scoring::ScoreWeights;

/// Main strata configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Promotion thresholds.
    pub promotion: PromotionConfig,
    /// Core memory files promotions render into.
    pub memory_targets: MemoryTargets,
    /// Observation aggregation behavior.
    pub aggregation: AggregationConfig,
    /// Pruning rules.
    pub pruning: PruneConfig,
    /// Query behavior.
    pub query: QueryConfig,
    /// Relevance score weights.
    pub weights: ScoreWeights,
}

impl StrataConfig {
    /// Load configuration from a file (TOML or JSON).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> StrataResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| StrataError::configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| StrataError::configuration(e.to_string()))?,
            _ => {
                return Err(StrataError::configuration(
                    "Unsupported config file format. Use .toml or .json",
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> StrataResult<()> {
        if !(0.0..=1.0).contains(&self.aggregation.similarity_threshold) {
            return Err(StrataError::configuration(format!(
                "aggregation.similarity_threshold must be within 0.0-1.0, got {}",
                self.aggregation.similarity_threshold
            )));
        }
        if self.promotion.observation_count_threshold == 0 {
            return Err(StrataError::configuration(
                "promotion.observation_count_threshold must be at least 1",
            ));
        }
        if self.query.default_limit == 0 {
            return Err(StrataError::configuration(
                "query.default_limit must be at least 1",
            ));
        }
        for (name, value) in [
            ("frequency", self.weights.frequency),
            ("recency", self.weights.recency),
            ("session_spread", self.weights.session_spread),
        ] {
            if value < 0.0 {
                return Err(StrataError::configuration(format!(
                    "weights.{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Start building a configuration.
    pub fn builder() -> StrataConfigBuilder {
        StrataConfigBuilder::default()
    }
}

/// Builder for StrataConfig.
#[derive(Default)]
pub struct StrataConfigBuilder {
    config: StrataConfig,
}

impl StrataConfigBuilder {
    /// Set promotion thresholds.
    pub fn promotion(mut self, config: PromotionConfig) -> Self {
        self.config.promotion = config;
        self
    }

    /// Set core memory targets.
    pub fn memory_targets(mut self, targets: MemoryTargets) -> Self {
        self.config.memory_targets = targets;
        self
    }

    /// Set aggregation behavior.
    pub fn aggregation(mut self, config: AggregationConfig) -> Self {
        self.config.aggregation = config;
        self
    }

    /// Set pruning rules.
    pub fn pruning(mut self, config: PruneConfig) -> Self {
        self.config.pruning = config;
        self
    }

    /// Set query behavior.
    pub fn query(mut self, config: QueryConfig) -> Self {
        self.config.query = config;
        self
    }

    /// Set relevance weights.
    pub fn weights(mut self, weights: ScoreWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> StrataConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_compose_sub_configs() {
        let config = StrataConfig::default();

        assert_eq!(config.promotion.observation_count_threshold, 3);
        assert_eq!(config.promotion.long_term_days_threshold, 7);
        assert!(config.memory_targets.claude_md);
        assert!(!config.memory_targets.agents_md);
        assert!((config.aggregation.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.pruning.stale_days, 90);
        assert_eq!(config.query.default_limit, 50);
        assert!((config.weights.frequency - 0.5).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StrataConfig::builder()
            .promotion(PromotionConfig::new(5, 14))
            .pruning(PruneConfig {
                dry_run: true,
                ..PruneConfig::default()
            })
            .build();

        assert_eq!(config.promotion.observation_count_threshold, 5);
        assert_eq!(config.promotion.long_term_days_threshold, 14);
        assert!(config.pruning.dry_run);
        // Untouched sections keep their defaults.
        assert_eq!(config.query.default_limit, 50);
    }

    #[test]
    fn test_partial_toml_overrides_named_fields_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(
            &path,
            r#"
[promotion]
observation_count_threshold = 5

[pruning]
stale_days = 30

[memory_targets]
agents_md = true
"#,
        )
        .unwrap();

        let config = StrataConfig::from_file(&path).unwrap();

        assert_eq!(config.promotion.observation_count_threshold, 5);
        // Unnamed field in a named section still defaults.
        assert_eq!(config.promotion.long_term_days_threshold, 7);
        assert_eq!(config.pruning.stale_days, 30);
        assert!(config.pruning.prune_denied);
        assert!(config.memory_targets.agents_md);
        assert_eq!(config.query.default_limit, 50);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.json");

        let config = StrataConfig::builder()
            .query(QueryConfig {
                default_limit: 10,
                ..QueryConfig::default()
            })
            .build();
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = StrataConfig::from_file(&path).unwrap();
        assert_eq!(loaded.query.default_limit, 10);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.yaml");
        fs::write(&path, "promotion: {}").unwrap();

        let err = StrataConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported config file format"));
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        fs::write(
            &path,
            r#"
[aggregation]
similarity_threshold = 1.5
"#,
        )
        .unwrap();

        let err = StrataConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn test_validate_catches_zero_thresholds() {
        let mut config = StrataConfig::default();
        config.promotion.observation_count_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = StrataConfig::default();
        config.query.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = StrataConfig::default();
        config.weights.recency = -0.1;
        assert!(config.validate().is_err());
    }
}
