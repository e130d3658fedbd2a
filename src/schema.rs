//! Layer schema: the declared layers of a corpus and how they derive from each other.
//!
//! A schema is a forest. Character layers are the roots, every other layer
//! names exactly one base layer, and following `base` links always ends at a
//! character layer.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{LayerError, LayerResult};
use crate::raw::RawLayer;

/// The addressing scheme of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// The base text itself.
    Characters,
    /// One value per annotation of the base layer.
    Seq,
    /// `(start, end)` ranges over the base layer.
    Span,
    /// Start points dividing the base layer into consecutive parts.
    Div,
    /// Single positions of the base layer.
    Element,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Characters => "characters",
            LayerKind::Seq => "seq",
            LayerKind::Span => "span",
            LayerKind::Div => "div",
            LayerKind::Element => "element",
        }
    }

    /// Span, div and element layers store index references into their base.
    pub fn is_standoff(&self) -> bool {
        matches!(self, LayerKind::Span | LayerKind::Div | LayerKind::Element)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" => Ok(LayerKind::Characters),
            "seq" | "sequence" => Ok(LayerKind::Seq),
            "span" => Ok(LayerKind::Span),
            "div" | "division" => Ok(LayerKind::Div),
            "element" => Ok(LayerKind::Element),
            other => Err(LayerError::Schema(format!("unknown layer type {}", other))),
        }
    }
}

/// Shape of the payload attached to each annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSpec {
    /// Free string labels.
    String,
    /// Labels drawn from a closed set.
    Enum(Vec<String>),
    /// An index into the target layer (or this layer when no target is named).
    Link { target: Option<String> },
    /// A link carrying one of a closed set of labels.
    TypedLink {
        target: Option<String>,
        labels: Vec<String>,
    },
}

impl DataSpec {
    pub fn link_target(&self) -> Option<&str> {
        match self {
            DataSpec::Link { target } | DataSpec::TypedLink { target, .. } => target.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for DataSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSpec::String => write!(f, "string"),
            DataSpec::Enum(values) => write!(f, "enum({})", values.join(",")),
            DataSpec::Link { .. } => write!(f, "link"),
            DataSpec::TypedLink { labels, .. } => write!(f, "link({})", labels.join(",")),
        }
    }
}

/// Declaration of a single layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSpec>,
    /// Value installed when a document does not supply one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RawLayer>,
}

impl LayerDesc {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            data: None,
            default: None,
        }
    }

    pub fn characters(name: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Characters)
    }

    pub fn seq(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Seq).on(base)
    }

    pub fn span(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Span).on(base)
    }

    pub fn div(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Div).on(base)
    }

    pub fn element(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Element).on(base)
    }

    /// Set the base layer.
    pub fn on(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_data(mut self, data: DataSpec) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_default(mut self, default: RawLayer) -> Self {
        self.default = Some(default);
        self
    }

    fn check(&self) -> LayerResult<()> {
        match (self.kind, &self.base) {
            (LayerKind::Characters, Some(base)) => Err(LayerError::Schema(format!(
                "layer {} of type characters cannot be based on layer {}",
                self.name, base
            ))),
            (LayerKind::Characters, None) => {
                if self.data.is_some() {
                    return Err(LayerError::Schema(format!(
                        "layer {} of type characters cannot carry data",
                        self.name
                    )));
                }
                Ok(())
            }
            (kind, None) => Err(LayerError::Schema(format!(
                "layer {} of type {} must be based on another layer",
                self.name, kind
            ))),
            (_, Some(base)) if *base == self.name => Err(LayerError::Schema(format!(
                "layer {} cannot be based on itself",
                self.name
            ))),
            (_, Some(_)) => match &self.data {
                Some(DataSpec::TypedLink { labels, .. }) if labels.is_empty() => {
                    Err(LayerError::Schema(format!(
                        "typed links of layer {} need at least one label",
                        self.name
                    )))
                }
                _ => Ok(()),
            },
        }
    }
}

/// The ordered set of layer declarations shared by every document of a corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LayerDesc>", into = "Vec<LayerDesc>")]
pub struct Schema {
    entries: Vec<LayerDesc>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer declaration. Declarations are immutable once registered.
    pub fn define(&mut self, desc: LayerDesc) -> LayerResult<()> {
        if self.contains(&desc.name) {
            return Err(LayerError::Schema(format!(
                "layer {} is already defined",
                desc.name
            )));
        }
        desc.check()?;
        self.entries.push(desc);
        Ok(())
    }

    /// Register a layer from loosely typed parts, as read from configuration.
    pub fn define_layer(
        &mut self,
        name: &str,
        kind: &str,
        base: Option<&str>,
        data: Option<DataSpec>,
        default: Option<RawLayer>,
    ) -> LayerResult<()> {
        let mut desc = LayerDesc::new(name, kind.parse()?);
        desc.base = base.filter(|b| !b.is_empty()).map(str::to_string);
        desc.data = data;
        desc.default = default;
        self.define(desc)
    }

    /// Builder-style [`define`](Self::define).
    pub fn with(mut self, desc: LayerDesc) -> LayerResult<Self> {
        self.define(desc)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&LayerDesc> {
        self.entries.iter().find(|desc| desc.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerDesc> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|desc| desc.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the character layers (the roots of the forest).
    pub fn character_layers(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|desc| desc.kind == LayerKind::Characters)
            .map(|desc| desc.name.as_str())
    }

    /// The strict ancestors of `name`, nearest first.
    ///
    /// Stops at an undeclared base or when the chain revisits a layer.
    pub fn ancestors<'a>(&'a self, name: &str) -> Vec<&'a str> {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = self.get(name).and_then(|desc| desc.base.as_deref());
        while let Some(base) = current {
            if base == name || chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = self.get(base).and_then(|desc| desc.base.as_deref());
        }
        chain
    }

    /// True if `target` is `name` itself or lies on its base chain.
    pub fn derives_from(&self, name: &str, target: &str) -> bool {
        name == target || self.ancestors(name).contains(&target)
    }

    /// The character layer at the root of `name`'s chain.
    pub fn root_of(&self, name: &str) -> LayerResult<&str> {
        let desc = self.get(name).ok_or_else(|| LayerError::unknown(name))?;
        if desc.kind == LayerKind::Characters {
            return Ok(desc.name.as_str());
        }
        self.ancestors(name)
            .into_iter()
            .find(|ancestor| {
                self.get(ancestor)
                    .map_or(false, |desc| desc.kind == LayerKind::Characters)
            })
            .ok_or_else(|| {
                LayerError::Schema(format!("layer {} has no character layer at its root", name))
            })
    }

    /// Check that every base is declared and that no chain is cyclic.
    pub fn validate(&self) -> LayerResult<()> {
        for desc in &self.entries {
            if let Some(base) = &desc.base {
                if !self.contains(base) {
                    return Err(LayerError::Schema(format!(
                        "layer {} is based on undeclared layer {}",
                        desc.name, base
                    )));
                }
            }
            self.root_of(&desc.name).map_err(|_| {
                LayerError::Schema(format!("layer {} is part of a base cycle", desc.name))
            })?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<LayerDesc>> for Schema {
    type Error = LayerError;

    fn try_from(entries: Vec<LayerDesc>) -> Result<Self, Self::Error> {
        let mut schema = Schema::new();
        for desc in entries {
            schema.define(desc)?;
        }
        schema.validate()?;
        Ok(schema)
    }
}

impl From<Schema> for Vec<LayerDesc> {
    fn from(schema: Schema) -> Self {
        schema.entries
    }
}
