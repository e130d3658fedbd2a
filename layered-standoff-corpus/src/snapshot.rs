//! Serializable corpus snapshots.
//!
//! A snapshot carries the schema plus the raw layer values of every document,
//! in corpus order, and is written as pretty RON:
//!
//! ```text
//! (
//!     version: 1,
//!     schema: [
//!         (name: "text", type: characters),
//!         (name: "words", type: span, base: Some("text")),
//!     ],
//!     documents: [
//!         (
//!             id: "4c1b",
//!             layers: {
//!                 "text": "This is it.",
//!                 "words": [(0, 4), (5, 7), (8, 10)],
//!             },
//!         ),
//!     ],
//! )
//! ```

use layered_standoff::{RawDocument, Schema};
use serde::{Deserialize, Serialize};

/// Schema and raw documents of a corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub version: u32,
    pub schema: Schema,
    #[serde(default)]
    pub documents: Vec<SnapshotDocument>,
}

/// One document of a [`CorpusSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub id: String,
    pub layers: RawDocument,
}

impl CorpusSnapshot {
    pub const VERSION: u32 = 1;

    /// Serialize to a pretty RON string.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(6)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config)
    }

    /// Deserialize from a RON string.
    pub fn from_ron_string(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}
