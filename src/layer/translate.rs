//! Cross-layer index translation.
//!
//! Every layer can express its annotations in the coordinates of any layer on
//! its base chain. A layer knows its ranges in its own coordinates (each
//! annotation is one slot) and in its direct base's coordinates; anything
//! further up is obtained by translating the base layer first and composing:
//!
//! ```text
//! ner   (0,2)               own range over words
//! words (0,4) (5,8) ...     words translated to text
//! ner   (0,8)               start of words[0], end of words[1]
//! ```

use std::ops::Deref;

use crate::document::Document;
use crate::errors::{LayerError, LayerResult};
use crate::layer::{CharacterLayer, IndexRange, Layer};
use crate::raw::{Datum, RawLayer};

/// Translate `layer`'s annotations into `target`'s coordinates.
pub(crate) fn indexes(doc: &Document, layer: &Layer, target: &str) -> LayerResult<Vec<IndexRange>> {
    if target == layer.name() {
        return Ok(layer.own_indexes());
    }
    // undeclared targets are unreachable too
    let schema = doc.schema();
    let base_name = match layer.base() {
        Some(base) if schema.derives_from(base, target) => base,
        _ => {
            return Err(LayerError::UnrelatedLayer {
                layer: layer.name().to_string(),
                target: target.to_string(),
            })
        }
    };

    let base = doc.layer(base_name)?;
    let own = layer.base_indexes(base.len()).unwrap_or_default();
    log::trace!(
        "translating {} ({} annotations) through {} towards {}",
        layer.name(),
        own.len(),
        base_name,
        target
    );

    if target == base_name {
        // Bases replaced after this layer was built may have shrunk.
        if let Some((start, end)) = own.iter().find(|(s, e)| s > e || *e > base.len()) {
            return Err(stale_range(layer.name(), (*start, *end), base_name, base.len()));
        }
        return Ok(own);
    }

    let below = indexes(doc, base, target)?;
    own.into_iter()
        .map(|range| compose(range, &below).ok_or_else(|| stale_range(layer.name(), range, base_name, below.len())))
        .collect()
}

/// Map a range over the base onto the base's own translated ranges.
///
/// Empty ranges land on the start of the base annotation at that position,
/// or on the end of the last one when they sit at the very end.
fn compose((start, end): IndexRange, below: &[IndexRange]) -> Option<IndexRange> {
    if start < end {
        let first = below.get(start)?;
        let last = below.get(end - 1)?;
        Some((first.0, last.1))
    } else if start == end {
        let at = match below.get(start) {
            Some(range) => range.0,
            None if start == below.len() => below.last().map_or(0, |range| range.1),
            None => return None,
        };
        Some((at, at))
    } else {
        None
    }
}

fn stale_range(layer: &str, (start, end): IndexRange, base: &str, base_len: usize) -> LayerError {
    LayerError::malformed(
        layer,
        format!(
            "range ({}, {}) does not fit base {} with {} annotations",
            start, end, base, base_len
        ),
    )
}

/// A layer together with the document it belongs to.
///
/// Returned by [`Document::get`]; dereferences to the underlying [`Layer`].
#[derive(Debug, Clone, Copy)]
pub struct LayerRef<'d> {
    doc: &'d Document,
    layer: &'d Layer,
}

impl<'d> LayerRef<'d> {
    pub(crate) fn new(doc: &'d Document, layer: &'d Layer) -> Self {
        Self { doc, layer }
    }

    pub fn layer(&self) -> &'d Layer {
        self.layer
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Annotation ranges in the coordinates of `target`.
    ///
    /// `target` must be this layer or one of its ancestors. The result always
    /// has one range per annotation.
    pub fn indexes(&self, target: &str) -> LayerResult<Vec<IndexRange>> {
        indexes(self.doc, self.layer, target)
    }

    /// Translated ranges paired with each annotation's payload.
    pub fn indexes_data(&self, target: &str) -> LayerResult<Vec<(IndexRange, Datum)>> {
        Ok(self
            .indexes(target)?
            .into_iter()
            .zip(self.layer.data())
            .collect())
    }

    /// The text covered by each annotation.
    pub fn text(&self) -> LayerResult<Vec<&'d str>> {
        Ok(self.doc.text_for(self.layer.name())?.collect())
    }

    /// Covered text paired with each annotation's payload.
    pub fn text_data(&self) -> LayerResult<Vec<(&'d str, Datum)>> {
        Ok(self
            .doc
            .text_for(self.layer.name())?
            .zip(self.layer.data())
            .collect())
    }

    pub fn raw(&self) -> RawLayer {
        self.layer.raw()
    }
}

impl<'d> Deref for LayerRef<'d> {
    type Target = Layer;

    fn deref(&self) -> &Self::Target {
        self.layer
    }
}

/// Iterator over the text of each annotation of a layer.
///
/// Produced by [`Document::text_for`]. Clone it to iterate again.
#[derive(Debug, Clone)]
pub struct TextFor<'d> {
    characters: &'d CharacterLayer,
    ranges: std::vec::IntoIter<IndexRange>,
}

impl<'d> TextFor<'d> {
    pub(crate) fn new(characters: &'d CharacterLayer, ranges: Vec<IndexRange>) -> Self {
        Self {
            characters,
            ranges: ranges.into_iter(),
        }
    }
}

impl<'d> Iterator for TextFor<'d> {
    type Item = &'d str;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, end) = self.ranges.next()?;
        let text = self.characters.slice(start, end);
        debug_assert!(
            text.is_some(),
            "range ({}, {}) outside characters {}",
            start,
            end,
            self.characters.name
        );
        // ranges were checked against the character layer during translation
        Some(text.unwrap_or_default())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ranges.size_hint()
    }
}

impl<'d> ExactSizeIterator for TextFor<'d> {}
