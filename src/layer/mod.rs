//! Materialized layers.
//!
//! A [`Layer`] is the validated, typed form of a [`RawLayer`] for one
//! [`LayerDesc`]. Layers never hold references to their document or their
//! base layer; they remember their base by name and the [`Document`] resolves
//! it at call time. [`LayerRef`] pairs a layer with its document to offer
//! index translation and text access.
//!
//! [`Document`]: crate::Document

mod display;
mod translate;

pub use display::{DisplayConfig, LayerDisplay};
pub use translate::{LayerRef, TextFor};
pub(crate) use translate::indexes as translate_indexes;

use crate::errors::{LayerError, LayerResult};
use crate::raw::{Datum, RawLayer};
use crate::schema::{DataSpec, LayerDesc, LayerKind};

/// A half-open `(start, end)` range in some layer's coordinates.
pub type IndexRange = (usize, usize);

/// The payload family a layer carries, decided by its data spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    None,
    Label,
    Link,
    TypedLink,
}

impl PayloadKind {
    fn of(desc: &LayerDesc) -> Self {
        match (&desc.data, desc.kind) {
            (None, LayerKind::Seq) => PayloadKind::Label,
            (None, _) => PayloadKind::None,
            (Some(DataSpec::String), _) | (Some(DataSpec::Enum(_)), _) => PayloadKind::Label,
            (Some(DataSpec::Link { .. }), _) => PayloadKind::Link,
            (Some(DataSpec::TypedLink { .. }), _) => PayloadKind::TypedLink,
        }
    }
}

/// The base text of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterLayer {
    name: String,
    text: String,
    /// Byte offset of every character boundary, including the end of the text.
    boundaries: Vec<usize>,
}

impl CharacterLayer {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let boundaries = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        Self {
            name: name.into(),
            text,
            boundaries,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of characters (Unicode scalar values).
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The text between two character offsets.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        let from = *self.boundaries.get(start)?;
        let to = *self.boundaries.get(end)?;
        self.text.get(from..to)
    }
}

/// One value per annotation of the base layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqLayer {
    name: String,
    base: String,
    payload: PayloadKind,
    values: Vec<Datum>,
}

/// Annotated ranges of the base layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanLayer {
    name: String,
    base: String,
    payload: PayloadKind,
    spans: Vec<(usize, usize, Datum)>,
}

/// Start points splitting the base layer into consecutive parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivLayer {
    name: String,
    base: String,
    payload: PayloadKind,
    starts: Vec<(usize, Datum)>,
}

/// Annotations attached to single positions of the base layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLayer {
    name: String,
    base: String,
    payload: PayloadKind,
    positions: Vec<(usize, Datum)>,
}

impl SpanLayer {
    pub fn spans(&self) -> &[(usize, usize, Datum)] {
        &self.spans
    }
}

impl DivLayer {
    pub fn starts(&self) -> impl Iterator<Item = usize> + '_ {
        self.starts.iter().map(|(start, _)| *start)
    }
}

impl ElementLayer {
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().map(|(pos, _)| *pos)
    }
}

impl SeqLayer {
    pub fn values(&self) -> &[Datum] {
        &self.values
    }
}

/// A materialized layer of one of the five kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Characters(CharacterLayer),
    Seq(SeqLayer),
    Span(SpanLayer),
    Div(DivLayer),
    Element(ElementLayer),
}

impl Layer {
    /// Validate `raw` against `desc` and build the layer.
    ///
    /// `base_len` is the annotation count of the base layer and is required
    /// for every kind except characters.
    pub fn build(desc: &LayerDesc, raw: RawLayer, base_len: Option<usize>) -> LayerResult<Layer> {
        let name = desc.name.as_str();
        if desc.kind == LayerKind::Characters {
            return match raw {
                RawLayer::Text(text) => Ok(Layer::Characters(CharacterLayer::new(name, text))),
                other => Err(shape_error(desc, PayloadKind::None, &other)),
            };
        }

        let base = desc
            .base
            .clone()
            .ok_or_else(|| LayerError::Schema(format!("layer {} has no base", name)))?;
        let base_len = base_len.ok_or_else(|| LayerError::LayerNotSet { name: base.clone() })?;
        let payload = PayloadKind::of(desc);
        let decoder = Decoder { desc, payload };

        let layer = match desc.kind {
            LayerKind::Seq => {
                let values = decoder.seq(raw)?;
                if values.len() != base_len {
                    return Err(LayerError::LengthMismatch {
                        layer: name.to_string(),
                        base,
                        expected: base_len,
                        found: values.len(),
                    });
                }
                Layer::Seq(SeqLayer {
                    name: name.to_string(),
                    base,
                    payload,
                    values,
                })
            }
            LayerKind::Span => {
                let spans = decoder.spans(raw)?;
                for (start, end, _) in &spans {
                    if start >= end {
                        return Err(LayerError::malformed(
                            name,
                            format!("span ({}, {}) must have start < end", start, end),
                        ));
                    }
                    if *end > base_len {
                        return Err(LayerError::malformed(
                            name,
                            format!(
                                "span ({}, {}) exceeds base {} of length {}",
                                start, end, base, base_len
                            ),
                        ));
                    }
                }
                Layer::Span(SpanLayer {
                    name: name.to_string(),
                    base,
                    payload,
                    spans,
                })
            }
            LayerKind::Div => {
                let starts = decoder.points(raw)?;
                if let Some((first, _)) = starts.first().filter(|(first, _)| *first != 0) {
                    return Err(LayerError::malformed(
                        name,
                        format!("first division starts at {} instead of 0", first),
                    ));
                }
                let mut previous = 0;
                for (start, _) in &starts {
                    if *start < previous {
                        return Err(LayerError::malformed(
                            name,
                            format!("division start {} follows start {}", start, previous),
                        ));
                    }
                    if *start > base_len {
                        return Err(LayerError::malformed(
                            name,
                            format!(
                                "division start {} exceeds base {} of length {}",
                                start, base, base_len
                            ),
                        ));
                    }
                    previous = *start;
                }
                Layer::Div(DivLayer {
                    name: name.to_string(),
                    base,
                    payload,
                    starts,
                })
            }
            LayerKind::Element => {
                let positions = decoder.points(raw)?;
                if let Some((pos, _)) = positions.iter().find(|(pos, _)| *pos >= base_len) {
                    return Err(LayerError::malformed(
                        name,
                        format!(
                            "element position {} is outside base {} of length {}",
                            pos, base, base_len
                        ),
                    ));
                }
                Layer::Element(ElementLayer {
                    name: name.to_string(),
                    base,
                    payload,
                    positions,
                })
            }
            LayerKind::Characters => unreachable!("handled above"),
        };
        log::trace!("built {} layer {} with {} annotations", desc.kind, name, layer.len());
        Ok(layer)
    }

    pub fn name(&self) -> &str {
        match self {
            Layer::Characters(l) => &l.name,
            Layer::Seq(l) => &l.name,
            Layer::Span(l) => &l.name,
            Layer::Div(l) => &l.name,
            Layer::Element(l) => &l.name,
        }
    }

    /// The layer this one is expressed in; `None` for characters.
    pub fn base(&self) -> Option<&str> {
        match self {
            Layer::Characters(_) => None,
            Layer::Seq(l) => Some(&l.base),
            Layer::Span(l) => Some(&l.base),
            Layer::Div(l) => Some(&l.base),
            Layer::Element(l) => Some(&l.base),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Characters(_) => LayerKind::Characters,
            Layer::Seq(_) => LayerKind::Seq,
            Layer::Span(_) => LayerKind::Span,
            Layer::Div(_) => LayerKind::Div,
            Layer::Element(_) => LayerKind::Element,
        }
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        match self {
            Layer::Characters(l) => l.len(),
            Layer::Seq(l) => l.values.len(),
            Layer::Span(l) => l.spans.len(),
            Layer::Div(l) => l.starts.len(),
            Layer::Element(l) => l.positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_characters(&self) -> Option<&CharacterLayer> {
        match self {
            Layer::Characters(l) => Some(l),
            _ => None,
        }
    }

    /// Per-annotation payloads.
    pub fn data(&self) -> Vec<Datum> {
        match self {
            Layer::Characters(l) => vec![Datum::Empty; l.len()],
            Layer::Seq(l) => l.values.clone(),
            Layer::Span(l) => l.spans.iter().map(|(_, _, d)| d.clone()).collect(),
            Layer::Div(l) => l.starts.iter().map(|(_, d)| d.clone()).collect(),
            Layer::Element(l) => l.positions.iter().map(|(_, d)| d.clone()).collect(),
        }
    }

    /// The stored representation, in the shape [`Layer::build`] accepts.
    pub fn raw(&self) -> RawLayer {
        match self {
            Layer::Characters(l) => RawLayer::Text(l.text.clone()),
            Layer::Seq(l) => match l.payload {
                PayloadKind::Link => {
                    RawLayer::Indexes(l.values.iter().map(|d| link_of(d)).collect())
                }
                PayloadKind::TypedLink => RawLayer::IndexLabels(
                    l.values.iter().map(|d| (link_of(d), label_of(d))).collect(),
                ),
                PayloadKind::None | PayloadKind::Label => {
                    RawLayer::Labels(l.values.iter().map(label_of).collect())
                }
            },
            Layer::Span(l) => {
                let spans = l.spans.iter().map(|(s, e, d)| (*s as u32, *e as u32, d));
                match l.payload {
                    PayloadKind::None => RawLayer::Pairs(spans.map(|(s, e, _)| (s, e)).collect()),
                    PayloadKind::Label => {
                        RawLayer::PairLabels(spans.map(|(s, e, d)| (s, e, label_of(d))).collect())
                    }
                    PayloadKind::Link => {
                        RawLayer::Triples(spans.map(|(s, e, d)| (s, e, link_of(d))).collect())
                    }
                    PayloadKind::TypedLink => RawLayer::TripleLabels(
                        spans
                            .map(|(s, e, d)| (s, e, link_of(d), label_of(d)))
                            .collect(),
                    ),
                }
            }
            Layer::Div(DivLayer {
                payload, starts, ..
            })
            | Layer::Element(ElementLayer {
                payload,
                positions: starts,
                ..
            }) => {
                let points = starts.iter().map(|(p, d)| (*p as u32, d));
                match payload {
                    PayloadKind::None => RawLayer::Indexes(points.map(|(p, _)| p).collect()),
                    PayloadKind::Label => {
                        RawLayer::IndexLabels(points.map(|(p, d)| (p, label_of(d))).collect())
                    }
                    PayloadKind::Link => {
                        RawLayer::Pairs(points.map(|(p, d)| (p, link_of(d))).collect())
                    }
                    PayloadKind::TypedLink => RawLayer::PairLabels(
                        points.map(|(p, d)| (p, link_of(d), label_of(d))).collect(),
                    ),
                }
            }
        }
    }

    /// Each annotation mapped onto its own ordinal slot: `(i, i + 1)`.
    pub fn own_indexes(&self) -> Vec<IndexRange> {
        (0..self.len()).map(|i| (i, i + 1)).collect()
    }

    /// Annotation ranges in the coordinates of the direct base layer.
    ///
    /// `base_len` closes the last division. Returns `None` for characters.
    pub fn base_indexes(&self, base_len: usize) -> Option<Vec<IndexRange>> {
        match self {
            Layer::Characters(_) => None,
            Layer::Seq(l) => Some((0..l.values.len()).map(|i| (i, i + 1)).collect()),
            Layer::Span(l) => Some(l.spans.iter().map(|(s, e, _)| (*s, *e)).collect()),
            Layer::Div(l) => {
                let ends = l.starts.iter().skip(1).map(|(s, _)| *s);
                Some(
                    l.starts
                        .iter()
                        .map(|(s, _)| *s)
                        .zip(ends.chain(std::iter::once(base_len)))
                        .collect(),
                )
            }
            Layer::Element(l) => Some(l.positions.iter().map(|(p, _)| (*p, *p + 1)).collect()),
        }
    }
}

fn link_of(datum: &Datum) -> u32 {
    datum.link().unwrap_or_default() as u32
}

fn label_of(datum: &Datum) -> String {
    datum.label().unwrap_or_default().to_string()
}

fn shape_error(desc: &LayerDesc, payload: PayloadKind, raw: &RawLayer) -> LayerError {
    let data = desc
        .data
        .as_ref()
        .map_or_else(|| "no data".to_string(), |d| format!("{} data", d));
    LayerError::malformed(
        &desc.name,
        format!(
            "a {} layer with {} cannot be read from {} (payload {:?})",
            desc.kind,
            data,
            raw.shape(),
            payload
        ),
    )
}

/// Turns raw entries into typed annotations according to a data spec.
struct Decoder<'a> {
    desc: &'a LayerDesc,
    payload: PayloadKind,
}

impl<'a> Decoder<'a> {
    fn label(&self, label: String) -> LayerResult<Datum> {
        match &self.desc.data {
            Some(DataSpec::Enum(values)) if !values.contains(&label) => {
                Err(LayerError::malformed(
                    &self.desc.name,
                    format!("{} is not one of {}", label, values.join(", ")),
                ))
            }
            _ => Ok(Datum::Label(label)),
        }
    }

    fn typed_link(&self, target: u32, label: String) -> LayerResult<Datum> {
        match &self.desc.data {
            Some(DataSpec::TypedLink { labels, .. }) if !labels.contains(&label) => {
                Err(LayerError::malformed(
                    &self.desc.name,
                    format!("link type {} is not one of {}", label, labels.join(", ")),
                ))
            }
            _ => Ok(Datum::TypedLink(target as usize, label)),
        }
    }

    fn seq(&self, raw: RawLayer) -> LayerResult<Vec<Datum>> {
        if raw.is_empty_list() {
            return Ok(Vec::new());
        }
        match (self.payload, raw) {
            (PayloadKind::Label, RawLayer::Labels(values)) => {
                values.into_iter().map(|v| self.label(v)).collect()
            }
            (PayloadKind::Link, RawLayer::Indexes(values)) => {
                Ok(values.into_iter().map(|v| Datum::Link(v as usize)).collect())
            }
            (PayloadKind::TypedLink, RawLayer::IndexLabels(values)) => values
                .into_iter()
                .map(|(t, l)| self.typed_link(t, l))
                .collect(),
            (payload, other) => Err(shape_error(self.desc, payload, &other)),
        }
    }

    fn spans(&self, raw: RawLayer) -> LayerResult<Vec<(usize, usize, Datum)>> {
        if raw.is_empty_list() {
            return Ok(Vec::new());
        }
        match (self.payload, raw) {
            (PayloadKind::None, RawLayer::Pairs(values)) => Ok(values
                .into_iter()
                .map(|(s, e)| (s as usize, e as usize, Datum::Empty))
                .collect()),
            (PayloadKind::Label, RawLayer::PairLabels(values)) => values
                .into_iter()
                .map(|(s, e, l)| Ok((s as usize, e as usize, self.label(l)?)))
                .collect(),
            (PayloadKind::Link, RawLayer::Triples(values)) => Ok(values
                .into_iter()
                .map(|(s, e, t)| (s as usize, e as usize, Datum::Link(t as usize)))
                .collect()),
            (PayloadKind::TypedLink, RawLayer::TripleLabels(values)) => values
                .into_iter()
                .map(|(s, e, t, l)| Ok((s as usize, e as usize, self.typed_link(t, l)?)))
                .collect(),
            (payload, other) => Err(shape_error(self.desc, payload, &other)),
        }
    }

    /// Div and element entries: a single position plus payload.
    fn points(&self, raw: RawLayer) -> LayerResult<Vec<(usize, Datum)>> {
        if raw.is_empty_list() {
            return Ok(Vec::new());
        }
        match (self.payload, raw) {
            (PayloadKind::None, RawLayer::Indexes(values)) => Ok(values
                .into_iter()
                .map(|p| (p as usize, Datum::Empty))
                .collect()),
            (PayloadKind::Label, RawLayer::IndexLabels(values)) => values
                .into_iter()
                .map(|(p, l)| Ok((p as usize, self.label(l)?)))
                .collect(),
            (PayloadKind::Link, RawLayer::Pairs(values)) => Ok(values
                .into_iter()
                .map(|(p, t)| (p as usize, Datum::Link(t as usize)))
                .collect()),
            (PayloadKind::TypedLink, RawLayer::PairLabels(values)) => values
                .into_iter()
                .map(|(p, t, l)| Ok((p as usize, self.typed_link(t, l)?)))
                .collect(),
            (payload, other) => Err(shape_error(self.desc, payload, &other)),
        }
    }
}
