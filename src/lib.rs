//! # Remedex
//!
//! Symptom-to-remedy search: free-text symptoms in, ranked candidate
//! remedies out.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! remedex ingest --input dataset.json --output data/catalog.snapshot
//! remedex serve --data data/catalog.snapshot --http-port 6480
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use std::sync::Arc;
//! use remedex::prelude::*;
//!
//! let embedder = Arc::new(HashingEmbedder::new(64));
//! let records = vec![
//!     SymptomRecord::new("Belladonna", "Head", "clarke", embedder.embed("throbbing headache").unwrap()),
//!     SymptomRecord::new("Bryonia", "Chest", "clarke", embedder.embed("dry painful cough").unwrap()),
//! ];
//! let index = Arc::new(SymptomIndex::build(IndexConfig::default(), records).unwrap());
//!
//! let pipeline = RankingPipeline::from_config(embedder, index, SearchConfig::default()).unwrap();
//! let results = pipeline.search("headache", &SourceFilter::any()).unwrap();
//! assert_eq!(results[0].solution, "Belladonna");
//! ```
//!
//! ## Crate Structure
//!
//! - `remedex-core` - vectors, symptom index, source filter, errors
//! - `remedex-ranking` - embedders, aggregation, scoring, the ranking pipeline
//! - `remedex-storage` - snapshots, ingestion, the catalog
//! - `remedex-api` - REST API

pub mod config;
pub mod service;

pub use config::ServiceConfig;
pub use service::{build_state, run_ingest};

// Re-export core types
pub use remedex_core::{
    Distance, Error, ErrorKind, IndexConfig, NeighborMatch, NeighborRetriever, Result,
    SourceFilter, SymptomIndex, SymptomRecord, Vector,
};

// Re-export ranking
pub use remedex_ranking::{
    Embedder, EmbedderConfig, HashingEmbedder, RankedResult, RankingPipeline, ScoringKind,
    ScoringStrategy, SearchConfig, SortOrder,
};

// Re-export storage
pub use remedex_storage::{Catalog, DatasetSnapshot, SolutionDetail, SolutionStore};

// Re-export API
pub use remedex_api::{RestApi, ServiceState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Catalog, Distance, Embedder, Error, HashingEmbedder, IndexConfig, NeighborRetriever,
        RankedResult, RankingPipeline, Result, ScoringKind, SearchConfig, ServiceConfig,
        SourceFilter, SymptomIndex, SymptomRecord, Vector,
    };
}
