//! # Remedex Core
//!
//! Core data structures for the Remedex symptom search service.
//!
//! - [`Vector`] - dense embedding with cosine helpers
//! - [`SymptomRecord`] - an embedded symptom belonging to a solution
//! - [`NeighborMatch`] - one retrieval hit with a normalized organ label
//! - [`SymptomIndex`] - in-memory exact or HNSW index with source filtering
//! - [`NeighborRetriever`] - the retrieval seam the ranking pipeline consumes
//!
//! ## Example
//!
//! ```rust
//! use remedex_core::{IndexConfig, NeighborRetriever, SourceFilter, SymptomIndex, SymptomRecord, Vector};
//!
//! let index = SymptomIndex::build(
//!     IndexConfig::default(),
//!     vec![SymptomRecord::new("Arnica", "Head", "clarke", Vector::new(vec![1.0, 0.0]))],
//! )
//! .unwrap();
//!
//! let hits = index
//!     .retrieve(&Vector::new(vec![1.0, 0.0]), &SourceFilter::any(), 400, 150)
//!     .unwrap();
//! assert_eq!(hits[0].solution_name, "Arnica");
//! ```

pub mod error;
pub mod filter;
pub mod hnsw;
pub mod index;
pub mod math;
pub mod symptom;
pub mod vector;

pub use error::{Error, ErrorKind, Result};
pub use filter::{Filter, SourceFilter};
pub use hnsw::{HnswIndex, HnswParams};
pub use index::{Distance, IndexConfig, NeighborRetriever, SymptomIndex};
pub use symptom::{normalize_organ, NeighborMatch, SymptomRecord};
pub use vector::Vector;
