//! Raw layer values: the shape layers take when stored or serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The stored form of a single layer.
///
/// Which shape a layer uses depends on its kind and data spec; see
/// [`Layer::build`](crate::Layer::build).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLayer {
    Text(String),
    Indexes(Vec<u32>),
    Pairs(Vec<(u32, u32)>),
    Triples(Vec<(u32, u32, u32)>),
    Labels(Vec<String>),
    IndexLabels(Vec<(u32, String)>),
    PairLabels(Vec<(u32, u32, String)>),
    TripleLabels(Vec<(u32, u32, u32, String)>),
}

impl RawLayer {
    /// Name of the shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            RawLayer::Text(_) => "text",
            RawLayer::Indexes(_) => "indexes",
            RawLayer::Pairs(_) => "pairs",
            RawLayer::Triples(_) => "triples",
            RawLayer::Labels(_) => "labels",
            RawLayer::IndexLabels(_) => "index-labels",
            RawLayer::PairLabels(_) => "pair-labels",
            RawLayer::TripleLabels(_) => "triple-labels",
        }
    }

    /// True for a list shape with no entries.
    ///
    /// Empty lists deserialize as [`RawLayer::Indexes`] whatever their
    /// intended shape, so they are accepted by every list-shaped layer.
    pub fn is_empty_list(&self) -> bool {
        match self {
            RawLayer::Text(_) => false,
            RawLayer::Indexes(v) => v.is_empty(),
            RawLayer::Pairs(v) => v.is_empty(),
            RawLayer::Triples(v) => v.is_empty(),
            RawLayer::Labels(v) => v.is_empty(),
            RawLayer::IndexLabels(v) => v.is_empty(),
            RawLayer::PairLabels(v) => v.is_empty(),
            RawLayer::TripleLabels(v) => v.is_empty(),
        }
    }
}

impl From<&str> for RawLayer {
    fn from(text: &str) -> Self {
        RawLayer::Text(text.to_string())
    }
}

impl From<String> for RawLayer {
    fn from(text: String) -> Self {
        RawLayer::Text(text)
    }
}

impl From<Vec<(u32, u32)>> for RawLayer {
    fn from(pairs: Vec<(u32, u32)>) -> Self {
        RawLayer::Pairs(pairs)
    }
}

impl From<Vec<u32>> for RawLayer {
    fn from(indexes: Vec<u32>) -> Self {
        RawLayer::Indexes(indexes)
    }
}

impl From<Vec<&str>> for RawLayer {
    fn from(labels: Vec<&str>) -> Self {
        RawLayer::Labels(labels.into_iter().map(str::to_string).collect())
    }
}

/// Raw values of every materialized layer of a document, keyed by layer name.
pub type RawDocument = BTreeMap<String, RawLayer>;

/// The payload of a single annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datum {
    /// The layer carries no data.
    Empty,
    Label(String),
    Link(usize),
    TypedLink(usize, String),
}

impl Datum {
    pub fn label(&self) -> Option<&str> {
        match self {
            Datum::Label(label) | Datum::TypedLink(_, label) => Some(label),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<usize> {
        match self {
            Datum::Link(target) | Datum::TypedLink(target, _) => Some(*target),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Datum::Empty)
    }
}
