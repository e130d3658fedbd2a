//! Stand-off annotation layers over text.
//!
//! A [`Document`] holds one or more character layers (the base text) and any
//! number of annotation layers. Each annotation layer is expressed in the
//! coordinates of a single base layer, declared in a shared [`Schema`], so
//! annotations stack: words over characters, entities over words, and so on.
//! Any layer can translate its annotations into the coordinates of any layer
//! on its base chain, which is how the covered text is recovered.
//!
//! ## Core Types
//!
//! - [`Schema`] / [`LayerDesc`] - layer declarations
//! - [`Document`] - a text and its materialized layers
//! - [`Layer`] / [`LayerRef`] - one layer, alone or paired with its document
//! - [`RawLayer`] - the stored shape of a layer value
//! - [`DocumentStore`] - persistence boundary for bound documents
//! - [`LayerDisplay`] - underline rendering for tests and debugging
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use layered_standoff::{DataSpec, Document, LayerDesc, RawLayer, Schema};
//!
//! let schema = Schema::new()
//!     .with(LayerDesc::characters("text")).unwrap()
//!     .with(LayerDesc::span("words", "text")).unwrap()
//!     .with(LayerDesc::span("ner", "words").with_data(DataSpec::String)).unwrap();
//!
//! let mut doc = Document::new(Arc::new(schema), "doc1");
//! doc.set("text", "John Doe lives in New York.").unwrap();
//! doc.set("words", vec![(0, 4), (5, 8), (9, 14), (15, 17), (18, 21), (22, 26)]).unwrap();
//! doc.set("ner", RawLayer::PairLabels(vec![(0, 2, "PER".into()), (4, 6, "LOC".into())])).unwrap();
//!
//! let ner = doc.get("ner").unwrap();
//! assert_eq!(ner.indexes("text").unwrap(), vec![(0, 8), (18, 26)]);
//! assert_eq!(ner.text().unwrap(), vec!["John Doe", "New York"]);
//! ```

mod document;
mod errors;
mod id;
mod layer;
mod raw;
mod schema;
mod segment;
mod store;

#[cfg(test)]
mod tests {
    mod properties;
    mod standoff;
    mod store;
}

pub use document::Document;
pub use errors::{LayerError, LayerResult};
pub use id::document_id;
pub use layer::{
    CharacterLayer, DisplayConfig, DivLayer, ElementLayer, IndexRange, Layer, LayerDisplay,
    LayerRef, PayloadKind, SeqLayer, SpanLayer, TextFor,
};
pub use raw::{Datum, RawDocument, RawLayer};
pub use schema::{DataSpec, LayerDesc, LayerKind, Schema};
pub use segment::word_spans;
pub use store::{
    DirectoryStore, DocumentStore, FailOn, MemoryStore, StoreError, StoreOperation, StoreResult,
};
