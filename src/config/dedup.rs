//! Deduplication engine configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Per-field weights for the similarity score.
///
/// The defaults sum to 1.0 so the combined score stays in [0, 1].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f64,
    pub seller: f64,
    pub price: f64,
    pub description: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 0.4,
            seller: 0.2,
            price: 0.2,
            description: 0.2,
        }
    }
}

/// Configuration for fuzzy duplicate detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Overall similarity at or above which two items count as duplicates.
    pub similarity_threshold: f64,
    /// Per-field weights for the similarity score.
    #[serde(default)]
    pub weights: FieldWeights,
    /// Maximum relative price difference still considered similar.
    pub max_price_diff_pct: f64,
    /// Only items seen within this window are compared, in hours.
    pub max_age_hours: u64,
    /// Cap on the number of recent items fetched per duplicate check.
    pub recent_limit: i64,
}

impl DedupConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "dedup.similarity_threshold",
                reason: format!("{} is outside [0, 1]", self.similarity_threshold),
            });
        }
        if self.recent_limit <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "dedup.recent_limit",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.80,
            weights: FieldWeights::default(),
            max_price_diff_pct: 0.20,
            max_age_hours: 72,
            recent_limit: 500,
        }
    }
}
