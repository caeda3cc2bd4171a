//! Text embedders.
//!
//! [`HashingEmbedder`] is a deterministic, dependency-free feature-hashing
//! model suitable for tests, demos and offline catalogs.
//! [`RemoteEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint.
//! Both return L2-normalized vectors.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use remedex_core::{Error, Result, Vector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Default dimension, matching the MiniLM-L6 family.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, recorded in snapshots.
    fn model_id(&self) -> &str;

    fn dim(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vector>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Trigram and word feature hashing into a fixed number of buckets.
///
/// Buckets come from xxh3, whose output does not change between releases, so
/// vectors stored in a snapshot stay comparable across builds.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self {
            dim,
            model_id: format!("hashing-xxh3:d{}", dim),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        (xxh3_64(feature.as_bytes()) % self.dim as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

fn trigrams(s: &str) -> HashSet<String> {
    let chars: Vec<char> = format!("  {}  ", s).chars().collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vector> {
        let normalized = text.trim().to_lowercase();
        let mut components = vec![0.0f32; self.dim];
        if normalized.is_empty() {
            return Ok(Vector::new(components));
        }

        for trigram in trigrams(&normalized) {
            components[self.bucket(&trigram)] += 1.0;
        }
        // Whole words weigh more than their trigrams
        for word in normalized.split_whitespace() {
            components[self.bucket(word)] += 2.0;
        }

        let mut vector = Vector::new(components);
        vector.normalize();
        Ok(vector)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Client for an OpenAI-compatible embeddings endpoint.
///
/// Uses a blocking client; call it from a blocking context such as
/// `actix_web::web::block` or a plain thread.
pub struct RemoteEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    model_id: String,
    dim: usize,
    api_key: Option<String>,
}

impl RemoteEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dim: usize,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding client: {}", e)))?;
        let model = model.into();
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model_id: format!("remote:{}:d{}", model, dim),
            model,
            dim,
            api_key,
        })
    }
}

impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vector> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("embedding service returned no vectors".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { model: &self.model, input: texts });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Embedding(e.to_string()))?;
        let mut body: EmbeddingResponse = response
            .json()
            .map_err(|e| Error::Embedding(format!("malformed embedding response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }
        body.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        debug!(count = texts.len(), model = %self.model, "remote embeddings received");

        body.data
            .into_iter()
            .map(|d| {
                if d.embedding.len() != self.dim {
                    return Err(Error::InvalidDimension {
                        expected: self.dim,
                        actual: d.embedding.len(),
                    });
                }
                let mut vector = Vector::new(d.embedding);
                vector.normalize();
                Ok(vector)
            })
            .collect()
    }
}

/// Which embedder backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    #[default]
    Hashing,
    Remote,
}

impl std::str::FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hashing" => Ok(EmbedderKind::Hashing),
            "remote" => Ok(EmbedderKind::Remote),
            other => Err(Error::InvalidConfig(format!("unknown embedder '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    pub dim: usize,
    /// Endpoint URL, required for the remote embedder.
    pub url: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    /// Bearer token for the remote endpoint.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Hashing,
            dim: DEFAULT_EMBEDDING_DIM,
            url: None,
            model: "all-MiniLM-L6-v2".to_string(),
            timeout_ms: 5_000,
            api_key: None,
        }
    }
}

impl EmbedderConfig {
    pub fn build(&self) -> Result<Arc<dyn Embedder>> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        match self.kind {
            EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(self.dim))),
            EmbedderKind::Remote => {
                let url = self.url.clone().ok_or_else(|| {
                    Error::InvalidConfig("remote embedder requires an endpoint url".into())
                })?;
                Ok(Arc::new(RemoteEmbedder::new(
                    url,
                    self.model.clone(),
                    self.dim,
                    Duration::from_millis(self.timeout_ms),
                    self.api_key.clone(),
                )?))
            }
        }
    }
}
