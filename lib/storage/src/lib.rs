//! # Remedex Storage
//!
//! Dataset snapshots, raw-dataset ingestion and the in-memory [`Catalog`]
//! the service reads from.

pub mod catalog;
pub mod ingest;
pub mod snapshot;
pub mod solution;
pub mod sources;

pub use catalog::Catalog;
pub use ingest::{ingest, load_raw_dataset, RawDataset, RawSymptom};
pub use snapshot::{
    checksum_file, read_snapshot, write_snapshot, DatasetSnapshot, EmbeddingInfo, SnapshotDescription,
};
pub use solution::{InMemorySolutionStore, SolutionDetail, SolutionStore};
pub use sources::SourceRegistry;
