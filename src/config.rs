//! Service configuration file.

use std::fs;
use std::path::Path;
use anyhow::Context;
use remedex_core::{Error, IndexConfig, Result};
use remedex_ranking::{EmbedderConfig, EmbedderKind, SearchConfig};
use serde::{Deserialize, Serialize};

/// Everything the `serve` command can be tuned with. Every field defaults,
/// so `{}` is a valid configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub search: SearchConfig,
    pub index: IndexConfig,
    pub embedder: EmbedderConfig,
    /// Replaces the source list declared by the snapshot.
    pub sources: Option<Vec<String>>,
}

impl ServiceConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: ServiceConfig = serde_json::from_str(&text)
            .with_context(|| format!("malformed config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;

        let hnsw = &self.index.hnsw;
        if hnsw.max_connections == 0 || hnsw.max_layers == 0 || hnsw.ef_construction == 0 {
            return Err(Error::InvalidConfig("HNSW parameters must be positive".into()));
        }
        if self.embedder.dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        if self.embedder.kind == EmbedderKind::Remote && self.embedder.url.is_none() {
            return Err(Error::InvalidConfig("remote embedder requires an endpoint url".into()));
        }
        if let Some(sources) = &self.sources {
            if sources.iter().any(|s| s.trim().is_empty()) {
                return Err(Error::InvalidConfig("source names must not be blank".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedex_core::Distance;
    use remedex_ranking::ScoringKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_is_default() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "search": {{ "max_results": 5, "scoring": {{ "strategy": "linear-blend" }} }},
                "index": {{ "distance": "dot", "use_hnsw": true }},
                "sources": ["clarke"]
            }}"#
        )
        .unwrap();

        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.neighbor_limit, 150);
        assert_eq!(config.search.scoring.strategy, ScoringKind::LinearBlend);
        assert_eq!(config.index.distance, Distance::Dot);
        assert!(config.index.use_hnsw);
        assert_eq!(config.sources, Some(vec!["clarke".to_string()]));
    }

    #[test]
    fn test_invalid_combinations_rejected() {
        let mut config = ServiceConfig::default();
        config.search.candidate_pool_size = 10;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.embedder.kind = EmbedderKind::Remote;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.sources = Some(vec!["".into()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ \"search\": 3 }}").unwrap();
        assert!(ServiceConfig::load(file.path()).is_err());
    }
}
