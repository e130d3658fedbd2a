//! Property tests for index translation.

use std::sync::Arc;

use proptest::collection::vec;
use proptest::prelude::*;

use crate::{DataSpec, Document, LayerDesc, RawLayer, Schema};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new()
            .with(LayerDesc::characters("text"))
            .unwrap()
            .with(LayerDesc::span("words", "text"))
            .unwrap()
            .with(LayerDesc::div("chunks", "text"))
            .unwrap()
            .with(LayerDesc::seq("tags", "words").with_data(DataSpec::String))
            .unwrap()
            .with(LayerDesc::div("sents", "words"))
            .unwrap()
            .with(LayerDesc::span("ner", "words"))
            .unwrap()
            .with(LayerDesc::element("marks", "sents"))
            .unwrap(),
    )
}

/// Scale a percentage onto `0..=len`.
fn scale(percent: u32, len: u32) -> u32 {
    percent * len / 100
}

#[derive(Debug, Clone)]
struct Generated {
    text: String,
    words: Vec<(u32, u32)>,
    chunk_points: Vec<u32>,
    sent_points: Vec<u32>,
    ner: Vec<(u32, u32)>,
    marks: Vec<u32>,
}

fn layer_values() -> impl Strategy<Value = Generated> {
    "[a-zé ]{1,60}".prop_flat_map(|text| {
        let n = text.chars().count() as u32;
        (
            Just(text),
            vec((0..n, 1..=4u32), 0..12),
            vec(0..=100u32, 0..6),
            vec(0..=100u32, 0..6),
            vec((0..100u32, 1..=3u32), 0..6),
            vec(0..100u32, 0..6),
        )
            .prop_map(|(text, words, chunk_points, sent_points, ner, marks)| Generated {
                text,
                words,
                chunk_points,
                sent_points,
                ner,
                marks,
            })
    })
}

fn build(generated: &Generated) -> Document {
    let n = generated.text.chars().count() as u32;
    let mut words: Vec<(u32, u32)> = generated
        .words
        .iter()
        .map(|(start, len)| (*start, (start + len).min(n)))
        .collect();
    // sorted starts keep composed ranges ordered
    words.sort_unstable();
    let word_count = words.len() as u32;

    // divisions always open at the start of their base
    let mut chunks: Vec<u32> = std::iter::once(0)
        .chain(generated.chunk_points.iter().map(|p| scale(*p, n)))
        .collect();
    chunks.sort_unstable();
    let mut sents: Vec<u32> = std::iter::once(0)
        .chain(generated.sent_points.iter().map(|p| scale(*p, word_count)))
        .collect();
    sents.sort_unstable();
    let sent_count = sents.len() as u32;

    let ner: Vec<(u32, u32)> = if word_count == 0 {
        Vec::new()
    } else {
        generated
            .ner
            .iter()
            .map(|(p, len)| {
                let start = p % word_count;
                (start, (start + len).min(word_count))
            })
            .collect()
    };
    let marks: Vec<u32> = if sent_count == 0 {
        Vec::new()
    } else {
        generated.marks.iter().map(|p| p % sent_count).collect()
    };
    let tags: Vec<String> = (0..words.len()).map(|i| format!("T{}", i % 3)).collect();

    Document::construct(
        schema(),
        "generated",
        vec![
            ("text", RawLayer::from(generated.text.as_str())),
            ("words", RawLayer::Pairs(words)),
            ("chunks", RawLayer::Indexes(chunks)),
            ("tags", RawLayer::Labels(tags)),
            ("sents", RawLayer::Indexes(sents)),
            ("ner", RawLayer::Pairs(ner)),
            ("marks", RawLayer::Indexes(marks)),
        ],
        true,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn property_translation_keeps_one_range_per_annotation(generated in layer_values()) {
        let doc = build(&generated);
        let schema = doc.schema().clone();
        for layer in doc.layers() {
            let own = layer.indexes(layer.name()).unwrap();
            let expected: Vec<(usize, usize)> = (0..layer.len()).map(|i| (i, i + 1)).collect();
            prop_assert_eq!(own, expected);

            for target in schema.ancestors(layer.name()) {
                let first = layer.indexes(target).unwrap();
                prop_assert_eq!(first.len(), layer.len());
                prop_assert!(first.iter().all(|(start, end)| start <= end));
                prop_assert_eq!(layer.indexes(target).unwrap(), first);
            }
            prop_assert_eq!(doc.text_for(layer.name()).unwrap().count(), layer.len());
        }
    }

    #[test]
    fn property_divisions_partition_their_base(generated in layer_values()) {
        let doc = build(&generated);
        for (name, base) in [("chunks", "text"), ("sents", "words")] {
            let base_len = doc.get(base).unwrap().len();
            let ranges = doc.indexes(name, base).unwrap();
            prop_assert!(!ranges.is_empty());
            prop_assert_eq!(ranges[0].0, 0);
            prop_assert_eq!(ranges[ranges.len() - 1].1, base_len);
            for pair in ranges.windows(2) {
                prop_assert_eq!(pair[0].1, pair[1].0);
            }
            let covered: usize = ranges.iter().map(|(start, end)| end - start).sum();
            prop_assert_eq!(covered, base_len);
        }
    }

    #[test]
    fn property_raw_round_trip(generated in layer_values()) {
        let doc = build(&generated);
        let raw = doc.to_raw();
        let rebuilt = Document::from_raw(raw.clone(), doc.schema().clone(), doc.id()).unwrap();
        prop_assert_eq!(rebuilt.to_raw(), raw);
    }
}
