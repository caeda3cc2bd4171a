//! In-memory symptom index: exact scan or HNSW, with source filtering.

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::filter::{Filter, SourceFilter};
use crate::hnsw::{HnswIndex, HnswParams};
use crate::{Error, NeighborMatch, Result, SymptomRecord, Vector};

/// Above this many records the exact scan is split across the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
    Euclidean,
    Dot,
}

impl Distance {
    /// Raw distance, smaller is closer. Cosine assumes unit vectors.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Distance::Cosine | Distance::Dot => 1.0 - crate::math::dot(a, b),
            Distance::Euclidean => crate::math::l2_distance(a, b),
        }
    }

    /// Map a raw distance onto a [0, 1] similarity score.
    ///
    /// Cosine and dot use `(1 + x) / 2`, euclidean uses `1 / (1 + d)`.
    #[inline]
    pub fn similarity(&self, distance: f32) -> f64 {
        let d = f64::from(distance);
        let score = match self {
            Distance::Cosine | Distance::Dot => (2.0 - d) / 2.0,
            Distance::Euclidean => 1.0 / (1.0 + d),
        };
        score.clamp(0.0, 1.0)
    }
}

impl std::str::FromStr for Distance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Distance::Cosine),
            "euclidean" => Ok(Distance::Euclidean),
            "dot" => Ok(Distance::Dot),
            other => Err(Error::InvalidConfig(format!("unknown distance '{}'", other))),
        }
    }
}

/// Configuration for a symptom index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub distance: Distance,
    pub use_hnsw: bool,
    pub hnsw: HnswParams,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            distance: Distance::Cosine,
            use_hnsw: false,
            hnsw: HnswParams::default(),
        }
    }
}

/// Nearest-neighbor lookup over symptom embeddings.
///
/// `num_candidates` bounds how many candidates are considered before the
/// final cut to `limit`; implementations require `num_candidates >= limit`.
pub trait NeighborRetriever: Send + Sync {
    fn retrieve(
        &self,
        query: &Vector,
        filter: &SourceFilter,
        num_candidates: usize,
        limit: usize,
    ) -> Result<Vec<NeighborMatch>>;
}

/// Immutable index over a fixed set of symptom records.
pub struct SymptomIndex {
    config: IndexConfig,
    dim: usize,
    records: Vec<SymptomRecord>,
    hnsw: Option<HnswIndex>,
}

impl SymptomIndex {
    /// Validate the records and build the index.
    ///
    /// Every vector must be non-empty, finite and share one dimension.
    /// Cosine indexes store unit vectors.
    pub fn build(config: IndexConfig, mut records: Vec<SymptomRecord>) -> Result<Self> {
        let dim = records.first().map(|r| r.vector.dim()).unwrap_or(0);
        for record in &mut records {
            if record.vector.dim() != dim || dim == 0 {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: record.vector.dim(),
                });
            }
            if !record.vector.is_finite() {
                return Err(Error::Index(format!(
                    "non-finite embedding for solution '{}'",
                    record.solution_name
                )));
            }
            if config.distance == Distance::Cosine {
                record.vector.normalize();
            }
        }

        let hnsw = if config.use_hnsw && !records.is_empty() {
            let mut index = HnswIndex::new(config.distance, config.hnsw);
            for record in &records {
                index.insert(record.vector.as_slice())?;
            }
            Some(index)
        } else {
            None
        };

        debug!(records = records.len(), dim, hnsw = hnsw.is_some(), "symptom index built");
        Ok(Self { config, dim, records, hnsw })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SymptomRecord] {
        &self.records
    }

    /// Search for the most similar records.
    ///
    /// Returns `(record_idx, similarity)` pairs, best first.
    pub fn search(
        &self,
        query: &Vector,
        filter: &dyn Filter,
        num_candidates: usize,
        limit: usize,
    ) -> Result<Vec<(usize, f64)>> {
        if query.is_empty() {
            return Err(Error::InvalidDimension { expected: self.dim, actual: 0 });
        }
        if !query.is_finite() {
            return Err(Error::Index("query vector contains non-finite values".into()));
        }
        if num_candidates < limit {
            return Err(Error::Index(format!(
                "candidate pool ({}) must not be smaller than the result limit ({})",
                num_candidates, limit
            )));
        }
        if self.records.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        if query.dim() != self.dim {
            return Err(Error::InvalidDimension { expected: self.dim, actual: query.dim() });
        }

        let query = match self.config.distance {
            Distance::Cosine => query.normalized(),
            _ => query.clone(),
        };
        let distance = self.config.distance;

        if let Some(hnsw) = &self.hnsw {
            // The candidate pool is the beam width; the filter is applied
            // inside the beam so rejected records never take up its slots.
            let admit = |idx: usize| filter.matches(&self.records[idx]);
            let hits: Vec<(usize, f64)> = hnsw
                .search_filtered(query.as_slice(), limit, num_candidates, &admit)
                .into_iter()
                .map(|(idx, dist)| (idx, distance.similarity(dist)))
                .collect();
            if hits.len() == limit {
                return Ok(hits);
            }
            // Fewer admitted records than requested, or some are unreachable
            // in the graph: only a full scan gives a complete answer.
            debug!(found = hits.len(), limit, "approximate search came up short, scanning");
        }

        Ok(self.exact_search(&query, filter, limit))
    }

    /// Score every admitted record and keep the best `limit`.
    fn exact_search(&self, query: &Vector, filter: &dyn Filter, limit: usize) -> Vec<(usize, f64)> {
        let distance = self.config.distance;
        let score = |(idx, record): (usize, &SymptomRecord)| -> Option<(usize, f64)> {
            if !filter.matches(record) {
                return None;
            }
            let dist = distance.distance(query.as_slice(), record.vector.as_slice());
            Some((idx, distance.similarity(dist)))
        };

        let mut scored: Vec<(usize, f64)> = if self.records.len() > PARALLEL_SCAN_THRESHOLD {
            self.records.par_iter().enumerate().filter_map(score).collect()
        } else {
            self.records.iter().enumerate().filter_map(score).collect()
        };

        scored.sort_by_key(|&(idx, sim)| (std::cmp::Reverse(OrderedFloat(sim)), idx));
        scored.truncate(limit);
        scored
    }
}

impl NeighborRetriever for SymptomIndex {
    fn retrieve(
        &self,
        query: &Vector,
        filter: &SourceFilter,
        num_candidates: usize,
        limit: usize,
    ) -> Result<Vec<NeighborMatch>> {
        let hits = self.search(query, filter, num_candidates, limit)?;
        Ok(hits
            .into_iter()
            .map(|(idx, similarity)| NeighborMatch::from_record(&self.records[idx], similarity))
            .collect())
    }
}
