//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **`LocalProvider`**: runs a pretrained sentence-embedding model locally
//!   via fastembed (primary) or tract (musl/Intel Mac). Weights are fetched
//!   from Hugging Face on first use and cached per model under
//!   [`default_cache_dir`]; later runs are fully offline.
//! - **[`HashProvider`]**: deterministic feature hashing of word tokens. No
//!   model download; used for offline smoke runs and tests.
//!
//! A provider is created once per run with [`create_provider`] and passed by
//! reference to every stage that embeds text. Creation failures are
//! [`DocrankError::ModelLoad`] and end the run.
//!
//! # Provider Selection
//!
//! ```rust
//! # use docrank::config::EmbeddingConfig;
//! # use docrank::embedding::create_provider;
//! let config = EmbeddingConfig {
//!     provider: "hash".to_string(),
//!     ..Default::default()
//! };
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "hash");
//! assert_eq!(provider.dims(), 384);
//! ```

#[cfg(feature = "local-embeddings-tract")]
mod local_tract;

use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::config::EmbeddingConfig;
use crate::error::DocrankError;

/// Default local model.
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";
/// Vector size of the hash provider when `embedding.dims` is unset.
pub const DEFAULT_HASH_DIMS: usize = 384;

/// Local models known to docrank: `(name, dims, Hugging Face repo)`.
pub const LOCAL_MODELS: &[(&str, usize, &str)] = &[
    ("all-minilm-l6-v2", 384, "sentence-transformers/all-MiniLM-L6-v2"),
    ("bge-small-en-v1.5", 384, "BAAI/bge-small-en-v1.5"),
    ("bge-base-en-v1.5", 768, "BAAI/bge-base-en-v1.5"),
    ("bge-large-en-v1.5", 1024, "BAAI/bge-large-en-v1.5"),
    ("multilingual-e5-small", 384, "intfloat/multilingual-e5-small"),
    ("multilingual-e5-base", 768, "intfloat/multilingual-e5-base"),
    ("multilingual-e5-large", 1024, "intfloat/multilingual-e5-large"),
];

/// Trait for embedding providers.
///
/// Implementations must be deterministic: embedding the same text twice
/// yields the same vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per text in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocrankError>;
}

/// Embed a single query text.
pub fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>, DocrankError> {
    provider
        .embed(&[text.to_string()])?
        .into_iter()
        .next()
        .ok_or_else(|| DocrankError::Embedding("empty embedding response".to_string()))
}

/// Embed `texts` in batches of `batch_size`, isolating failures per text.
///
/// When a whole batch fails, each of its texts is retried on its own, so one
/// bad unit only costs its own slot. The result has one entry per input text.
pub fn embed_units(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Vec<Result<Vec<f32>, DocrankError>> {
    let mut out = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        match provider.embed(batch) {
            Ok(vectors) if vectors.len() == batch.len() => {
                out.extend(vectors.into_iter().map(Ok));
            }
            outcome => {
                match outcome {
                    Ok(vectors) => tracing::warn!(
                        expected = batch.len(),
                        got = vectors.len(),
                        "embedding batch returned wrong count, retrying per text"
                    ),
                    Err(e) => {
                        tracing::warn!(error = %e, "embedding batch failed, retrying per text")
                    }
                }
                for text in batch {
                    out.push(embed_query(provider, text));
                }
            }
        }
    }

    out
}

/// Where model weights are cached: `$HOME/.cache/docrank/models`.
pub fn default_cache_dir() -> PathBuf {
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(base)
        .join(".cache")
        .join("docrank")
        .join("models")
}

#[cfg_attr(
    not(any(
        feature = "local-embeddings-fastembed",
        feature = "local-embeddings-tract"
    )),
    allow(dead_code)
)]
pub(crate) fn resolve_cache_dir(config: &EmbeddingConfig, model_name: &str) -> Result<PathBuf, DocrankError> {
    let dir = config.cache_dir.clone().unwrap_or_else(default_cache_dir);
    std::fs::create_dir_all(&dir).map_err(|e| DocrankError::ModelLoad {
        model: model_name.to_string(),
        reason: format!("create cache dir {}: {}", dir.display(), e),
    })?;
    Ok(dir)
}

/// Look up a local model by name, returning `(name, dims)`.
pub fn resolve_local_model(config: &EmbeddingConfig) -> Result<(String, usize), DocrankError> {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

    LOCAL_MODELS
        .iter()
        .find(|(name, _, _)| *name == model_name)
        .map(|(name, dims, _)| (name.to_string(), *dims))
        .ok_or_else(|| DocrankError::ModelLoad {
            reason: format!(
                "unknown local embedding model. Supported models: {}",
                LOCAL_MODELS
                    .iter()
                    .map(|(n, _, _)| *n)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            model: model_name,
        })
}

/// Create the [`EmbeddingProvider`] selected by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"local"` | `LocalProvider` (fastembed or tract, see features) |
/// | `"hash"` | [`HashProvider`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>, DocrankError> {
    match config.provider.as_str() {
        "hash" => Ok(Box::new(HashProvider::new(
            config.dims.unwrap_or(DEFAULT_HASH_DIMS),
        ))),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(all(
            feature = "local-embeddings-tract",
            not(feature = "local-embeddings-fastembed")
        ))]
        "local" => Ok(Box::new(local_tract::TractProvider::new(config)?)),
        #[cfg(not(any(
            feature = "local-embeddings-fastembed",
            feature = "local-embeddings-tract"
        )))]
        "local" => Err(DocrankError::ModelLoad {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            reason: "local embeddings require one of: --features local-embeddings-fastembed, --features local-embeddings-tract".to_string(),
        }),
        other => Err(DocrankError::Config(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ Hash Provider ============

/// Feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256; the first eight
/// bytes pick a bucket and the ninth a sign. Texts sharing words end up with
/// positive cosine similarity. Empty text maps to the zero vector.
pub struct HashProvider {
    dims: usize,
}

impl HashProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        v
    }
}

impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocrankError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ============ Local Provider (fastembed) ============

/// Embedding provider running a local ONNX model through fastembed.
///
/// The model is initialized once in [`LocalProvider::new`]; the session sits
/// behind a mutex because fastembed inference needs `&mut`.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: std::sync::Mutex<fastembed::TextEmbedding>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, DocrankError> {
        let (model_name, dims) = resolve_local_model(config)?;
        let fastembed_model = config_to_fastembed_model(&model_name)?;
        let cache_dir = resolve_cache_dir(config, &model_name)?;

        tracing::info!(model = %model_name, cache = %cache_dir.display(), "loading embedding model");
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(true),
        )
        .map_err(|e| DocrankError::ModelLoad {
            model: model_name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: std::sync::Mutex::new(model),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocrankError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| DocrankError::Embedding("embedding model lock poisoned".to_string()))?;
        model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| DocrankError::Embedding(e.to_string()))
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel, DocrankError> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => Err(DocrankError::ModelLoad {
            model: other.to_string(),
            reason: "not available through fastembed".to_string(),
        }),
    }
}
