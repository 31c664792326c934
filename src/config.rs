//! Run configuration.
//!
//! Settings come from three layers, highest precedence first: CLI flags (or
//! their `DOCRANK_*` environment variables), an optional TOML file passed with
//! `--config`, and the built-in defaults below. [`Config::validate`] is called
//! once the layers are merged, before any document is read.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::DocrankError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub refine: RefineConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub job: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Number of sections kept in `extracted_sections`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of snippets kept in `subsection_analyses`.
    #[serde(default = "default_top_m")]
    pub top_m: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            persona: String::new(),
            job: String::new(),
            output: default_output(),
            top_k: default_top_k(),
            top_m: default_top_m(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("output").join("result.json")
}
fn default_top_k() -> usize {
    10
}
fn default_top_m() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Segments longer than this are split at a line or word boundary.
    #[serde(default = "default_max_section_chars")]
    pub max_section_chars: usize,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_section_chars: default_max_section_chars(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_max_section_chars() -> usize {
    1500
}
fn default_title_max_chars() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefineConfig {
    /// Sentences shorter than this are not considered as snippets.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    /// Snippets scoring at or below this value are dropped.
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            min_score: None,
        }
    }
}

fn default_min_chars() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Only used by the `hash` provider; local models dictate their own size.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            cache_dir: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}

/// Values supplied on the command line or through `DOCRANK_*` variables.
///
/// `None` leaves the file/default value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub persona: Option<String>,
    pub job: Option<String>,
    pub top_k: Option<usize>,
    pub top_m: Option<usize>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub model_cache: Option<PathBuf>,
}

impl Config {
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(dir) = overrides.input_dir {
            self.input.dir = dir;
        }
        if let Some(output) = overrides.output {
            self.run.output = output;
        }
        if let Some(persona) = overrides.persona {
            self.run.persona = persona;
        }
        if let Some(job) = overrides.job {
            self.run.job = job;
        }
        if let Some(k) = overrides.top_k {
            self.run.top_k = k;
        }
        if let Some(m) = overrides.top_m {
            self.run.top_m = m;
        }
        if let Some(provider) = overrides.provider {
            self.embedding.provider = provider;
        }
        if let Some(model) = overrides.model {
            self.embedding.model = Some(model);
        }
        if let Some(cache) = overrides.model_cache {
            self.embedding.cache_dir = Some(cache);
        }
        self
    }

    /// Check the merged configuration. Persona and job are only required
    /// for a ranking run, so `require_query` is false for `docrank sections`.
    pub fn validate(&self, require_query: bool) -> Result<(), DocrankError> {
        if require_query {
            if self.run.persona.trim().is_empty() {
                return Err(DocrankError::Config(
                    "persona must be set (--persona or DOCRANK_PERSONA)".to_string(),
                ));
            }
            if self.run.job.trim().is_empty() {
                return Err(DocrankError::Config(
                    "job must be set (--job or DOCRANK_JOB)".to_string(),
                ));
            }
        }
        if self.run.top_k == 0 {
            return Err(DocrankError::Config("run.top_k must be >= 1".to_string()));
        }
        if self.run.top_m == 0 {
            return Err(DocrankError::Config("run.top_m must be >= 1".to_string()));
        }
        if self.input.include_globs.is_empty() {
            return Err(DocrankError::Config(
                "input.include_globs must not be empty".to_string(),
            ));
        }
        if self.extraction.max_section_chars < 64 {
            return Err(DocrankError::Config(
                "extraction.max_section_chars must be >= 64".to_string(),
            ));
        }
        if self.extraction.title_max_chars < 8 {
            return Err(DocrankError::Config(
                "extraction.title_max_chars must be >= 8".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(DocrankError::Config(
                "embedding.batch_size must be >= 1".to_string(),
            ));
        }
        if self.embedding.dims == Some(0) {
            return Err(DocrankError::Config(
                "embedding.dims must be > 0".to_string(),
            ));
        }
        match self.embedding.provider.as_str() {
            "local" | "hash" => {}
            other => {
                return Err(DocrankError::Config(format!(
                    "unknown embedding provider: '{}'. Must be local or hash.",
                    other
                )))
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    Ok(config)
}
