//! # Remedex Ranking
//!
//! Turns a free-text symptom query into a ranked list of candidate solutions.
//!
//! - [`Embedder`] - text to vector, hashing or remote
//! - [`aggregate`] - groups neighbor rows per solution
//! - [`ScoringStrategy`] - pluggable per-solution scoring
//! - [`RankingPipeline`] - embed, retrieve, aggregate, score, sort, truncate

pub mod aggregate;
pub mod config;
pub mod embedder;
pub mod pipeline;
pub mod scoring;

pub use aggregate::{aggregate, Aggregates, ScoreMap, SolutionAggregate};
pub use config::{LinearBlendConfig, ScoringConfig, ScoringKind, SearchConfig, WeightedDiversityConfig};
pub use embedder::{
    Embedder, EmbedderConfig, EmbedderKind, HashingEmbedder, RemoteEmbedder, DEFAULT_EMBEDDING_DIM,
};
pub use pipeline::{RankedResult, RankingPipeline, SortOrder};
pub use scoring::{LinearBlend, Score, ScoringStrategy, WeightedDiversity};
