//! Error types for corpus operations.
//!
//! Layer and storage failures from the core crate pass through unchanged;
//! the corpus adds its own for configuration and document bookkeeping.

use layered_standoff::{LayerError, StoreError};
use thiserror::Error;

/// Errors that can occur while building or editing a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A schema, layer or document error from the core crate.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// A schema file could not be read or parsed.
    #[error("failed to load schema: {path}: {message}")]
    Load { path: String, message: String },

    /// A schema configuration entry that cannot be turned into a layer.
    #[error("invalid layer configuration for {name}: {message}")]
    Config { name: String, message: String },

    /// Layers cannot be declared once documents exist.
    #[error("cannot declare layer {name}: the corpus already holds documents")]
    SchemaFrozen { name: String },

    /// A document with the same content is already in the corpus.
    #[error("document {id} is already in the corpus")]
    DuplicateDocument { id: String },

    /// No document with this id.
    #[error("document {id} is not in the corpus")]
    UnknownDocument { id: String },

    /// A corpus snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<StoreError> for CorpusError {
    fn from(err: StoreError) -> Self {
        CorpusError::Layer(LayerError::Storage(err))
    }
}

/// Result type for corpus operations.
pub type CorpusResult<T> = Result<T, CorpusError>;
