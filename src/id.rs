//! Content-derived document ids.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::raw::{RawDocument, RawLayer};

const MIN_ID_LEN: usize = 4;

/// Derive an id for a document from its character layers.
///
/// The id is the shortest prefix (at least four characters) of the base64
/// encoded SHA-256 digest of every character layer, in name order, that does
/// not collide with `existing`. A document whose full digest is already taken gets the
/// full digest, so identical documents get identical ids.
pub fn document_id<S: AsRef<str>>(layers: &RawDocument, existing: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (name, raw) in layers {
        if let RawLayer::Text(text) = raw {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(text.as_bytes());
            hasher.update([0u8]);
        }
    }
    let digest = STANDARD.encode(hasher.finalize());

    for len in MIN_ID_LEN..digest.len() {
        let candidate = &digest[..len];
        if !existing.iter().any(|id| id.as_ref() == candidate) {
            return candidate.to_string();
        }
    }
    digest
}
