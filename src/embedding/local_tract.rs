//! Tract-based local embedding (fallback for musl and Intel Mac).
//!
//! Pure-Rust path: loads the ONNX model with tract-onnx and tokenizes with the
//! tokenizers crate. No ONNX Runtime or system deps. Model and tokenizer files
//! are downloaded once into `<cache_dir>/<model>/` and reused afterwards.
#![cfg_attr(
    all(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract"),
    allow(dead_code)
)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tract_onnx::prelude::*;

use super::{resolve_cache_dir, resolve_local_model, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::DocrankError;

const ALL_MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_MAX_LEN: usize = 256;

type Runner = Box<dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send>;

struct Session {
    tokenizer: tokenizers::Tokenizer,
    run: Runner,
}

pub struct TractProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    session: Mutex<Session>,
}

/// Model manifest: name -> (repo, onnx path in repo, tokenizer path in repo).
fn model_manifest(model_name: &str) -> Result<(&'static str, &'static str, &'static str), String> {
    match model_name {
        "all-minilm-l6-v2" => Ok((ALL_MINILM_REPO, "onnx/model.onnx", "tokenizer.json")),
        _ => Err(format!(
            "tract backend supports only all-minilm-l6-v2 for now, requested '{}'",
            model_name
        )),
    }
}

fn download_to_cache(repo: &str, path: &str, cache_path: &Path) -> Result<(), String> {
    if cache_path.exists() {
        return Ok(());
    }
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        repo,
        path.replace(' ', "%20")
    );
    tracing::info!(%url, "downloading model file");
    let bytes = reqwest::blocking::get(&url)
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.bytes())
        .map_err(|e| format!("download {}: {}", url, e))?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("create cache dir: {}", e))?;
    }
    std::fs::write(cache_path, &bytes).map_err(|e| format!("write cache: {}", e))
}

/// Ensure model and tokenizer are in cache; return (onnx path, tokenizer path).
fn ensure_cached(cache_dir: &Path, model_name: &str) -> Result<(PathBuf, PathBuf), String> {
    let (repo, onnx_rel, tokenizer_rel) = model_manifest(model_name)?;
    let model_dir = cache_dir.join(model_name);
    let onnx_path = model_dir.join(onnx_rel);
    let tokenizer_path = model_dir.join(tokenizer_rel);
    download_to_cache(repo, onnx_rel, &onnx_path)?;
    download_to_cache(repo, tokenizer_rel, &tokenizer_path)?;
    Ok((onnx_path, tokenizer_path))
}

fn load_session(cache_dir: &Path, model_name: &str) -> Result<Session, String> {
    let (onnx_path, tokenizer_path) = ensure_cached(cache_dir, model_name)?;

    let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| format!("load tokenizer: {}", e))?;

    let model = tract_onnx::onnx()
        .model_for_path(onnx_path)
        .map_err(|e| format!("load ONNX: {}", e))?
        .into_optimized()
        .map_err(|e| format!("optimize: {}", e))?
        .into_runnable()
        .map_err(|e| format!("build tract runnable: {}", e))?;

    Ok(Session {
        tokenizer,
        run: Box::new(move |inputs: TVec<TValue>| model.run(inputs)),
    })
}

impl TractProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, DocrankError> {
        let (model_name, dims) = resolve_local_model(config)?;
        let cache_dir = resolve_cache_dir(config, &model_name)?;

        tracing::info!(model = %model_name, cache = %cache_dir.display(), "loading embedding model (tract)");
        let session = load_session(&cache_dir, &model_name).map_err(|reason| {
            DocrankError::ModelLoad {
                model: model_name.clone(),
                reason,
            }
        })?;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size.max(1),
            session: Mutex::new(session),
        })
    }
}

impl EmbeddingProvider for TractProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocrankError> {
        let session = self
            .session
            .lock()
            .map_err(|_| DocrankError::Embedding("embedding model lock poisoned".to_string()))?;
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let vectors =
                run_batch(&session, self.dims, chunk).map_err(DocrankError::Embedding)?;
            all.extend(vectors);
        }
        Ok(all)
    }
}

fn run_batch(session: &Session, dims: usize, chunk: &[String]) -> Result<Vec<Vec<f32>>, String> {
    let encodings: Vec<_> = chunk
        .iter()
        .map(|s| {
            session
                .tokenizer
                .encode(s.as_str(), true)
                .map_err(|e| format!("tokenize: {}", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(1)
        .clamp(1, DEFAULT_MAX_LEN);

    let rows = encodings.len();
    let mut input_ids = vec![0i64; rows * max_len];
    let mut attention_mask = vec![0i64; rows * max_len];

    for (i, enc) in encodings.iter().enumerate() {
        let ids = enc.get_ids();
        let len = ids.len().min(max_len);
        for (j, &id) in ids.iter().take(len).enumerate() {
            input_ids[i * max_len + j] = id as i64;
            attention_mask[i * max_len + j] = 1;
        }
    }

    let input_ids_tensor = ndarray::Array2::from_shape_vec((rows, max_len), input_ids)
        .map_err(|e| format!("input ids shape: {}", e))?;
    let attention_mask_tensor = ndarray::Array2::from_shape_vec((rows, max_len), attention_mask)
        .map_err(|e| format!("attention mask shape: {}", e))?;

    let input_ids_t: Tensor = input_ids_tensor.into();
    let attention_mask_t: Tensor = attention_mask_tensor.into();
    let result = (session.run)(tvec!(input_ids_t.into(), attention_mask_t.into()))
        .map_err(|e| format!("inference: {}", e))?;

    let output = result
        .into_iter()
        .next()
        .ok_or_else(|| "no output tensor".to_string())?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| format!("output to array: {}", e))?;

    // [batch, dims] is a pooled sentence embedding; [batch, seq_len, dims] is
    // last_hidden_state and gets mean-pooled over the attended tokens.
    let shape = view.shape();
    let mut vectors = Vec::with_capacity(rows);
    if shape.len() == 2 {
        for i in 0..shape[0] {
            let row = view.slice(ndarray::s![i, ..]);
            vectors.push(normalize_l2(row.iter().copied().collect()));
        }
    } else if shape.len() == 3 {
        let seq_len = shape[1];
        for (i, enc) in encodings.iter().enumerate() {
            let valid_len = enc.get_ids().len().min(seq_len).min(max_len);
            let mut sum = vec![0f32; dims];
            for j in 0..valid_len {
                for (k, &v) in view.slice(ndarray::s![i, j, ..]).iter().enumerate() {
                    if k < dims {
                        sum[k] += v;
                    }
                }
            }
            if valid_len > 0 {
                for x in &mut sum {
                    *x /= valid_len as f32;
                }
            }
            vectors.push(normalize_l2(sum));
        }
    } else {
        return Err(format!("unexpected output shape: {:?}", shape));
    }

    Ok(vectors)
}

fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
