//! Word segmentation for building a first span layer over raw text.

use unicode_segmentation::UnicodeSegmentation;

use crate::raw::RawLayer;

/// Spans of the words and punctuation of `text`, in character offsets.
///
/// Segments follow Unicode word boundaries (UAX #29); whitespace segments are
/// dropped. The result installs directly as a span layer over a character
/// layer holding `text`.
pub fn word_spans(text: &str) -> RawLayer {
    let mut spans = Vec::new();
    let mut chars_before = 0u32;
    let mut bytes_seen = 0;
    for (offset, segment) in text.split_word_bound_indices() {
        chars_before += text[bytes_seen..offset].chars().count() as u32;
        bytes_seen = offset;
        if segment.chars().all(char::is_whitespace) {
            continue;
        }
        let len = segment.chars().count() as u32;
        spans.push((chars_before, chars_before + len));
    }
    RawLayer::Pairs(spans)
}
