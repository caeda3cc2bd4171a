//! Search and scoring configuration.
//!
//! Every knob has a default matching the production tuning, so an empty
//! JSON object deserializes into a working configuration.

use std::sync::Arc;
use std::time::Duration;
use remedex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use crate::scoring::{LinearBlend, ScoringStrategy, WeightedDiversity};

/// Which scoring strategy ranks solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringKind {
    #[default]
    WeightedDiversity,
    LinearBlend,
}

impl std::str::FromStr for ScoringKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "weighted-diversity" => Ok(ScoringKind::WeightedDiversity),
            "linear-blend" => Ok(ScoringKind::LinearBlend),
            other => Err(Error::InvalidConfig(format!(
                "unknown scoring strategy '{}', expected weighted-diversity or linear-blend",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ScoringKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringKind::WeightedDiversity => write!(f, "weighted-diversity"),
            ScoringKind::LinearBlend => write!(f, "linear-blend"),
        }
    }
}

/// Parameters of the weighted-diversity strategy.
///
/// A solution whose best organ scores agree closely (variance below
/// `max_variance`) and are high (mean above `min_mean`) counts as a
/// concentrated match; anything else is scored as a diffuse match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedDiversityConfig {
    pub top_organs: usize,
    pub max_variance: f64,
    pub min_mean: f64,
    pub match_count_weight: f64,
    pub organ_diversity_weight: f64,
}

impl Default for WeightedDiversityConfig {
    fn default() -> Self {
        Self {
            top_organs: 3,
            max_variance: 0.05,
            min_mean: 0.7,
            match_count_weight: 0.4,
            organ_diversity_weight: 0.5,
        }
    }
}

/// Weights of the linear-blend strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearBlendConfig {
    pub top_organs: usize,
    pub similarity_weight: f64,
    pub diversity_weight: f64,
    pub count_weight: f64,
}

impl Default for LinearBlendConfig {
    fn default() -> Self {
        Self {
            top_organs: 3,
            similarity_weight: 0.6,
            diversity_weight: 0.25,
            count_weight: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub strategy: ScoringKind,
    pub weighted_diversity: WeightedDiversityConfig,
    pub linear_blend: LinearBlendConfig,
}

impl ScoringConfig {
    /// Resolve the configured strategy. Called once at startup.
    pub fn build(&self) -> Arc<dyn ScoringStrategy> {
        match self.strategy {
            ScoringKind::WeightedDiversity => Arc::new(WeightedDiversity::new(self.weighted_diversity)),
            ScoringKind::LinearBlend => Arc::new(LinearBlend::new(self.linear_blend)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let wd = &self.weighted_diversity;
        let lb = &self.linear_blend;
        if wd.top_organs == 0 || lb.top_organs == 0 {
            return Err(Error::InvalidConfig("top_organs must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&wd.min_mean) || !(0.0..=1.0).contains(&wd.max_variance) {
            return Err(Error::InvalidConfig(
                "min_mean and max_variance must lie in [0, 1]".into(),
            ));
        }
        let weights = [
            wd.match_count_weight,
            wd.organ_diversity_weight,
            lb.similarity_weight,
            lb.diversity_weight,
            lb.count_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::InvalidConfig("scoring weights must be finite and non-negative".into()));
        }
        Ok(())
    }
}

/// Limits applied to every search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates the index considers before cutting to `neighbor_limit`.
    pub candidate_pool_size: usize,
    /// Neighbor rows handed to aggregation.
    pub neighbor_limit: usize,
    /// Ranked solutions returned to the caller.
    pub max_results: usize,
    /// Budget for embedding plus retrieval of one request.
    pub request_timeout_ms: u64,
    pub scoring: ScoringConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_pool_size: 400,
            neighbor_limit: 150,
            max_results: 15,
            request_timeout_ms: 10_000,
            scoring: ScoringConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.neighbor_limit == 0 || self.max_results == 0 {
            return Err(Error::InvalidConfig(
                "neighbor_limit and max_results must be positive".into(),
            ));
        }
        if self.candidate_pool_size < self.neighbor_limit {
            return Err(Error::InvalidConfig(format!(
                "candidate_pool_size ({}) must be >= neighbor_limit ({})",
                self.candidate_pool_size, self.neighbor_limit
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms must be positive".into()));
        }
        self.scoring.validate()
    }
}
