//! The search-and-ranking pipeline.
//!
//! `query text -> embed -> retrieve -> aggregate -> score -> sort -> top-N`

use std::sync::Arc;
use remedex_core::{Error, NeighborMatch, NeighborRetriever, Result, SourceFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::aggregate::aggregate;
use crate::config::SearchConfig;
use crate::embedder::Embedder;
use crate::scoring::ScoringStrategy;

/// One ranked solution as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub solution: String,
    /// Final score rounded to four decimals.
    pub score: f64,
    /// Average similarity as a whole percentage.
    #[serde(rename = "similarity")]
    pub similarity_percent: u8,
    pub matching_organs: Vec<String>,
    pub matching_sources: Vec<String>,
}

/// Presentation order of an already ranked result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Final score, as ranked.
    #[default]
    Recommended,
    /// Similarity percent descending; ties keep score order.
    Similarity,
}

impl SortOrder {
    pub fn apply(self, results: &mut [RankedResult]) {
        if self == SortOrder::Similarity {
            results.sort_by(|a, b| b.similarity_percent.cmp(&a.similarity_percent));
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn to_percent(avg: f64) -> u8 {
    (avg * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Wires the embedder, retriever and scoring strategy together.
///
/// Holds only read-only handles; one pipeline serves all requests.
#[derive(Clone)]
pub struct RankingPipeline {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn NeighborRetriever>,
    strategy: Arc<dyn ScoringStrategy>,
    config: SearchConfig,
}

impl RankingPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn NeighborRetriever>,
        strategy: Arc<dyn ScoringStrategy>,
        config: SearchConfig,
    ) -> Self {
        Self { embedder, retriever, strategy, config }
    }

    /// Build with the strategy named in `config.scoring`.
    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn NeighborRetriever>,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let strategy = config.scoring.build();
        Ok(Self::new(embedder, retriever, strategy, config))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn strategy(&self) -> &dyn ScoringStrategy {
        self.strategy.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Run a full search for free-text `query`.
    pub fn search(&self, query: &str, filter: &SourceFilter) -> Result<Vec<RankedResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".into()));
        }

        let vector = self.embedder.embed(query)?;
        let matches = self.retriever.retrieve(
            &vector,
            filter,
            self.config.candidate_pool_size,
            self.config.neighbor_limit,
        )?;
        debug!(matches = matches.len(), sources = filter.len(), "neighbors retrieved");

        let results = self.rank(&matches)?;
        debug!(results = results.len(), strategy = self.strategy.name(), "solutions ranked");
        Ok(results)
    }

    /// Aggregate, score, sort and truncate a retrieved neighbor set.
    pub fn rank(&self, matches: &[NeighborMatch]) -> Result<Vec<RankedResult>> {
        let mut results = aggregate(matches)
            .into_iter()
            .map(|(solution, agg)| {
                let score = self.strategy.calculate(&agg);
                if !score.final_score.is_finite() {
                    return Err(Error::Internal(format!(
                        "non-finite score for solution '{}'",
                        solution
                    )));
                }
                Ok(RankedResult {
                    score: round4(score.final_score),
                    similarity_percent: to_percent(score.avg_score),
                    matching_organs: agg.matching_organs().to_vec(),
                    matching_sources: agg.matching_sources().to_vec(),
                    solution,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable: equal scores keep first-appearance order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(self.config.max_results);
        Ok(results)
    }
}
