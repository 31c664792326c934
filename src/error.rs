//! Error taxonomy for the ranking pipeline.
//!
//! Per-document and per-unit failures ([`DocrankError::DocumentRead`],
//! [`DocrankError::Embedding`]) are caught at the boundary of their stage and
//! degrade the result set. Only [`DocrankError::NoInput`] and
//! [`DocrankError::ModelLoad`] abort a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocrankError {
    /// A document could not be opened or parsed.
    #[error("failed to read document '{document}': {reason}")]
    DocumentRead { document: String, reason: String },

    /// The embedding model could not be initialized.
    #[error("failed to load embedding model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    /// No readable document was found at the input location.
    #[error("no readable input documents in {location}")]
    NoInput { location: String },

    /// Embedding computation failed for a single text unit.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Invalid configuration detected at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DocrankError {
    /// Process exit code for a fatal error of this kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            DocrankError::NoInput { .. } => 2,
            DocrankError::ModelLoad { .. } => 3,
            _ => 1,
        }
    }
}
