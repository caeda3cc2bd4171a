//! Build a snapshot from raw symptom text.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use anyhow::Context;
use rayon::prelude::*;
use remedex_core::{Error, Result, SymptomRecord, Vector};
use remedex_ranking::Embedder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::snapshot::{DatasetSnapshot, EmbeddingInfo};
use crate::solution::SolutionDetail;

/// Texts sent to the embedder per batch.
const EMBED_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSymptom {
    pub solution: String,
    pub organ: String,
    pub source: String,
    pub text: String,
}

/// Unembedded dataset as exported from the reference texts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    #[serde(default)]
    pub sources: Vec<String>,
    pub symptoms: Vec<RawSymptom>,
    #[serde(default)]
    pub solutions: BTreeMap<String, SolutionDetail>,
}

pub fn load_raw_dataset(path: &Path) -> anyhow::Result<RawDataset> {
    let file = File::open(path).with_context(|| format!("cannot open dataset {}", path.display()))?;
    let dataset = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("malformed dataset {}", path.display()))?;
    Ok(dataset)
}

/// Embed every symptom text and assemble a snapshot.
///
/// Rows with a blank solution name or text are skipped with a warning.
/// Batches are embedded in parallel.
pub fn ingest(dataset: RawDataset, embedder: &dyn Embedder) -> Result<DatasetSnapshot> {
    let total = dataset.symptoms.len();
    let rows: Vec<RawSymptom> = dataset
        .symptoms
        .into_iter()
        .filter(|row| {
            let keep = !row.text.trim().is_empty() && !row.solution.trim().is_empty();
            if !keep {
                warn!(solution = %row.solution, organ = %row.organ, "skipping symptom row without text");
            }
            keep
        })
        .collect();

    let vectors: Vec<Vector> = rows
        .par_chunks(EMBED_BATCH_SIZE)
        .map(|chunk| {
            let texts: Vec<String> = chunk.iter().map(|row| row.text.trim().to_string()).collect();
            embedder.embed_batch(&texts)
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    if vectors.len() != rows.len() {
        return Err(Error::Embedding(format!(
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            rows.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.dim() != embedder.dim()) {
        return Err(Error::InvalidDimension { expected: embedder.dim(), actual: bad.dim() });
    }

    let mut snapshot = DatasetSnapshot::new(EmbeddingInfo {
        model_id: embedder.model_id().to_string(),
        dim: embedder.dim(),
    });
    snapshot.sources = dataset.sources;
    snapshot.solutions = dataset.solutions;
    snapshot.symptoms = rows
        .into_iter()
        .zip(vectors)
        .map(|(row, vector)| {
            SymptomRecord::new(row.solution.trim(), row.organ, row.source.trim().to_lowercase(), vector)
        })
        .collect();

    info!(
        embedded = snapshot.symptoms.len(),
        skipped = total - snapshot.symptoms.len(),
        solutions = snapshot.solutions.len(),
        model = embedder.model_id(),
        "dataset ingested"
    );
    Ok(snapshot)
}
