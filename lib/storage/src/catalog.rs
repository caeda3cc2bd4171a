//! The read-only dataset a running service answers from.

use std::path::Path;
use std::sync::Arc;
use remedex_core::{Error, IndexConfig, Result, SymptomIndex};
use remedex_ranking::Embedder;
use tracing::{info, warn};
use crate::snapshot::{read_snapshot, DatasetSnapshot, EmbeddingInfo};
use crate::solution::{InMemorySolutionStore, SolutionStore};
use crate::sources::SourceRegistry;

pub struct Catalog {
    index: Arc<SymptomIndex>,
    solutions: Arc<dyn SolutionStore>,
    sources: SourceRegistry,
    embedding: EmbeddingInfo,
}

impl Catalog {
    /// Build the index and stores from a loaded snapshot.
    ///
    /// `sources` replaces the declared source list when given. Without either,
    /// the list is derived from the symptom records.
    pub fn from_snapshot(
        snapshot: DatasetSnapshot,
        index_config: IndexConfig,
        sources: Option<Vec<String>>,
    ) -> Result<Self> {
        let DatasetSnapshot { embedding, sources: declared, symptoms, solutions, .. } = snapshot;

        let sources = match sources {
            Some(list) => SourceRegistry::new(list),
            None if !declared.is_empty() => SourceRegistry::new(declared),
            None => SourceRegistry::new(symptoms.iter().map(|r| r.source.as_str())),
        };

        if let Some(bad) = symptoms.iter().find(|r| r.vector.dim() != embedding.dim) {
            return Err(Error::InvalidDimension { expected: embedding.dim, actual: bad.vector.dim() });
        }
        let unknown = symptoms.iter().filter(|r| !sources.contains(&r.source)).count();
        if unknown > 0 {
            warn!(records = unknown, "symptom records reference undeclared sources");
        }

        let index = SymptomIndex::build(index_config, symptoms)?;
        let solutions = InMemorySolutionStore::new(solutions);
        info!(
            symptoms = index.len(),
            solutions = solutions.len(),
            sources = sources.len(),
            model = %embedding.model_id,
            "catalog loaded"
        );

        Ok(Self {
            index: Arc::new(index),
            solutions: Arc::new(solutions),
            sources,
            embedding,
        })
    }

    pub fn open(
        path: &Path,
        index_config: IndexConfig,
        sources: Option<Vec<String>>,
    ) -> anyhow::Result<Self> {
        let snapshot = read_snapshot(path)?;
        Ok(Self::from_snapshot(snapshot, index_config, sources)?)
    }

    /// Fail when `embedder` cannot produce vectors comparable to the stored ones.
    pub fn check_embedder(&self, embedder: &dyn Embedder) -> Result<()> {
        if embedder.dim() != self.embedding.dim {
            return Err(Error::InvalidConfig(format!(
                "embedder '{}' produces {}-dimensional vectors but the catalog stores {}",
                embedder.model_id(),
                embedder.dim(),
                self.embedding.dim
            )));
        }
        if embedder.model_id() != self.embedding.model_id {
            warn!(
                embedder = embedder.model_id(),
                catalog = %self.embedding.model_id,
                "embedding model differs from the one used at ingest"
            );
        }
        Ok(())
    }

    pub fn index(&self) -> Arc<SymptomIndex> {
        self.index.clone()
    }

    pub fn solutions(&self) -> Arc<dyn SolutionStore> {
        self.solutions.clone()
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn embedding(&self) -> &EmbeddingInfo {
        &self.embedding
    }
}
