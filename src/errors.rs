//! Error types for schema definition, layer construction and index translation.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by schema, document and layer operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The schema definition itself is invalid.
    #[error("schema error: {0}")]
    Schema(String),

    /// A layer name that the schema does not declare.
    #[error("layer {name} is not declared in the schema")]
    UnknownLayer { name: String },

    /// Construction stalled with layers whose bases never became available.
    #[error("cannot resolve layers {}: their base layers are missing", .layers.join(", "))]
    UnresolvableDependency { layers: Vec<String> },

    /// The layer is declared but has no value in this document.
    #[error("layer {name} has not been set")]
    LayerNotSet { name: String },

    /// An annotation with bad bounds or a payload the data spec rejects.
    #[error("malformed annotation in layer {layer}: {message}")]
    MalformedAnnotation { layer: String, message: String },

    /// A sequence layer whose length differs from its base.
    #[error("layer {layer} has {found} values but its base {base} has {expected}")]
    LengthMismatch {
        layer: String,
        base: String,
        expected: usize,
        found: usize,
    },

    /// The translation target is not on the layer's derivation chain.
    #[error("layer {target} is not an ancestor of layer {layer}")]
    UnrelatedLayer { layer: String, target: String },

    /// Failure reported by the bound document store.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LayerError {
    pub(crate) fn malformed(layer: &str, message: impl Into<String>) -> Self {
        LayerError::MalformedAnnotation {
            layer: layer.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown(name: &str) -> Self {
        LayerError::UnknownLayer {
            name: name.to_string(),
        }
    }
}

/// Result type for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;
