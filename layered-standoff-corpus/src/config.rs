//! Schema configuration loaded from TOML.
//!
//! ```toml
//! [[layer]]
//! name = "text"
//! type = "characters"
//!
//! [[layer]]
//! name = "words"
//! type = "span"
//! base = "text"
//!
//! [[layer]]
//! name = "pos"
//! type = "seq"
//! base = "words"
//! data = "string"
//! values = ["NOUN", "VERB", "PUNCT"]
//! ```
//!
//! `data = "string"` with `values` declares a closed label set, as does
//! `values` alone. `data = "link"` with `values` declares typed links.

use std::fs;
use std::path::Path;

use layered_standoff::{DataSpec, RawLayer, Schema};
use serde::{Deserialize, Serialize};

use crate::errors::{CorpusError, CorpusResult};

/// The `[[layer]]` tables of a schema file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerConfig>,
}

/// One `[[layer]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub base: Option<String>,
    /// `"string"` or `"link"`.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    /// Layer that links point into.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub default: Option<RawLayer>,
}

impl LayerConfig {
    fn data_spec(&self) -> CorpusResult<Option<DataSpec>> {
        let spec = match (self.data.as_deref(), self.values.clone()) {
            (None, None) => None,
            (None, Some(values)) | (Some("string"), Some(values)) => Some(DataSpec::Enum(values)),
            (Some("string"), None) => Some(DataSpec::String),
            (Some("link"), None) => Some(DataSpec::Link {
                target: self.target.clone(),
            }),
            (Some("link"), Some(labels)) => Some(DataSpec::TypedLink {
                target: self.target.clone(),
                labels,
            }),
            (Some(other), _) => {
                return Err(CorpusError::Config {
                    name: self.name.clone(),
                    message: format!("unknown data type {}", other),
                })
            }
        };
        if self.target.is_some() && self.data.as_deref() != Some("link") {
            return Err(CorpusError::Config {
                name: self.name.clone(),
                message: "a target is only meaningful for link data".to_string(),
            });
        }
        Ok(spec)
    }
}

impl SchemaConfig {
    /// Declare every configured layer, in file order, and validate the result.
    pub fn into_schema(self) -> CorpusResult<Schema> {
        let mut schema = Schema::new();
        for layer in self.layers {
            let data = layer.data_spec()?;
            schema.define_layer(
                &layer.name,
                &layer.kind,
                layer.base.as_deref(),
                data,
                layer.default,
            )?;
        }
        schema.validate()?;
        log::debug!("loaded schema with {} layers", schema.len());
        Ok(schema)
    }
}

/// Parse a schema from TOML text.
pub fn parse_schema(content: &str) -> CorpusResult<Schema> {
    let config: SchemaConfig = toml::from_str(content).map_err(|e| CorpusError::Load {
        path: "<inline>".to_string(),
        message: e.to_string(),
    })?;
    config.into_schema()
}

/// Load a schema from a TOML file.
pub fn load_schema(path: &Path) -> CorpusResult<Schema> {
    let content = fs::read_to_string(path).map_err(|e| CorpusError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config: SchemaConfig = toml::from_str(&content).map_err(|e| CorpusError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    config.into_schema()
}
