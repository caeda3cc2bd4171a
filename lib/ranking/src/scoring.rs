//! Pluggable scoring strategies.
//!
//! A strategy turns one [`SolutionAggregate`] into a final ranking score and
//! the representative average similarity. Strategies are stateless and shared
//! across requests behind an `Arc`.

use crate::aggregate::SolutionAggregate;
use crate::config::{LinearBlendConfig, WeightedDiversityConfig};

/// Output of a strategy for one solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub final_score: f64,
    /// Mean of all contributing similarities, in [0, 1].
    pub avg_score: f64,
}

pub trait ScoringStrategy: Send + Sync + std::fmt::Debug {
    /// Stable identifier, as used in configuration.
    fn name(&self) -> &'static str;

    fn calculate(&self, agg: &SolutionAggregate) -> Score;
}

/// Mean and population variance of a non-empty slice; `(0, 0)` when empty.
/// Variance is only computed for more than one value.
fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
    } else {
        0.0
    };
    (mean, variance)
}

/// Organs matched per neighbor row.
fn organ_diversity(agg: &SolutionAggregate) -> f64 {
    agg.matching_organs().len() as f64 / agg.match_count().max(1) as f64
}

/// Rewards solutions that match a few organs consistently and with high
/// confidence, otherwise blends average similarity with match volume and
/// organ spread.
#[derive(Debug, Clone)]
pub struct WeightedDiversity {
    config: WeightedDiversityConfig,
}

impl WeightedDiversity {
    pub fn new(config: WeightedDiversityConfig) -> Self {
        Self { config }
    }

    /// Whether the top organ scores form a concentrated high-confidence match.
    pub fn is_concentrated(&self, agg: &SolutionAggregate) -> bool {
        let top = agg.top_organ_scores(self.config.top_organs);
        let (mean, variance) = mean_and_variance(&top);
        top.len() >= 2 && variance < self.config.max_variance && mean > self.config.min_mean
    }
}

impl Default for WeightedDiversity {
    fn default() -> Self {
        Self::new(WeightedDiversityConfig::default())
    }
}

impl ScoringStrategy for WeightedDiversity {
    fn name(&self) -> &'static str {
        "weighted-diversity"
    }

    fn calculate(&self, agg: &SolutionAggregate) -> Score {
        let avg_score = agg.avg_score();
        let top = agg.top_organ_scores(self.config.top_organs);
        let (top_avg, variance) = mean_and_variance(&top);

        let final_score = if top.len() >= 2
            && variance < self.config.max_variance
            && top_avg > self.config.min_mean
        {
            let organs = agg.matching_organs().len() as f64;
            top_avg * (top.len() as f64).sqrt() * (1.0 + organs.ln())
        } else {
            let count = agg.match_count() as f64;
            let count_factor = (count + 1.0).ln() * self.config.match_count_weight;
            avg_score
                * (1.0 + count_factor)
                * (1.0 + organ_diversity(agg) * self.config.organ_diversity_weight)
        };

        Score { final_score, avg_score }
    }
}

/// Fixed weighted sum of top organ similarity, organ spread and match volume.
#[derive(Debug, Clone)]
pub struct LinearBlend {
    config: LinearBlendConfig,
}

impl LinearBlend {
    pub fn new(config: LinearBlendConfig) -> Self {
        Self { config }
    }
}

impl Default for LinearBlend {
    fn default() -> Self {
        Self::new(LinearBlendConfig::default())
    }
}

impl ScoringStrategy for LinearBlend {
    fn name(&self) -> &'static str {
        "linear-blend"
    }

    fn calculate(&self, agg: &SolutionAggregate) -> Score {
        let top = agg.top_organ_scores(self.config.top_organs);
        let (top_avg, _) = mean_and_variance(&top);
        let count = agg.match_count() as f64;

        let final_score = self.config.similarity_weight * top_avg
            + self.config.diversity_weight * organ_diversity(agg)
            + self.config.count_weight * (count + 1.0).ln();

        Score { final_score, avg_score: agg.avg_score() }
    }
}
