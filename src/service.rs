//! Wiring between configuration, storage and the HTTP layer.

use std::path::Path;
use anyhow::Context;
use remedex_api::ServiceState;
use remedex_ranking::{EmbedderConfig, RankingPipeline};
use remedex_storage::{ingest, load_raw_dataset, write_snapshot, Catalog, SnapshotDescription};
use tracing::info;
use crate::config::ServiceConfig;

/// Load the catalog at `data` and assemble the request-serving state.
///
/// Builds a blocking HTTP client for remote embedders; call it outside any
/// async context.
pub fn build_state(config: &ServiceConfig, data: &Path) -> anyhow::Result<ServiceState> {
    config.validate()?;
    let embedder = config.embedder.build()?;
    let catalog = Catalog::open(data, config.index.clone(), config.sources.clone())
        .with_context(|| format!("failed to load catalog from {}", data.display()))?;
    catalog.check_embedder(embedder.as_ref())?;

    let pipeline = RankingPipeline::from_config(embedder, catalog.index(), config.search.clone())?;
    info!(
        strategy = pipeline.strategy().name(),
        embedder = pipeline.embedder().model_id(),
        hnsw = config.index.use_hnsw,
        "ranking pipeline ready"
    );
    Ok(ServiceState::from_catalog(pipeline, &catalog))
}

/// Embed a raw dataset and write it as a snapshot.
pub fn run_ingest(
    input: &Path,
    output: &Path,
    embedder: &EmbedderConfig,
) -> anyhow::Result<SnapshotDescription> {
    let embedder = embedder.build()?;
    let dataset = load_raw_dataset(input)?;
    info!(rows = dataset.symptoms.len(), model = embedder.model_id(), "embedding dataset");

    let snapshot = ingest(dataset, embedder.as_ref())?;
    let description = write_snapshot(output, &snapshot)?;
    info!(
        path = %description.path,
        size = description.size,
        checksum = %description.checksum,
        "snapshot written"
    );
    Ok(description)
}
