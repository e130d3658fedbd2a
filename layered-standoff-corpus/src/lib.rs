//! Corpus collections for layered-standoff.
//!
//! A [`Corpus`] is an ordered set of documents sharing one schema, with ids
//! derived from their text. This crate also loads schemas from TOML and
//! saves whole corpora as RON snapshots.
//!
//! ## Modules
//!
//! - [`config`] - TOML schema files
//! - [`snapshot`] - RON corpus snapshots
//! - [`errors`] - Error types for corpus operations

pub mod config;
mod corpus;
pub mod errors;
pub mod snapshot;

pub use config::{load_schema, parse_schema, LayerConfig, SchemaConfig};
pub use corpus::Corpus;
pub use errors::{CorpusError, CorpusResult};
pub use snapshot::{CorpusSnapshot, SnapshotDocument};
