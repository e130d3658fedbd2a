use std::fmt::Write;

use unicode_width::UnicodeWidthChar;

use crate::document::Document;
use crate::errors::{LayerError, LayerResult};
use crate::layer::IndexRange;
use crate::raw::Datum;

/// What [`LayerDisplay`] renders besides the underlines.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Append `=label` to annotations that carry one.
    pub show_labels: bool,
    /// Render an arrow row under annotations that link elsewhere.
    pub show_links: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_labels: true,
            show_links: true,
        }
    }
}

impl DisplayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(mut self, show: bool) -> Self {
        self.show_labels = show;
        self
    }

    pub fn links(mut self, show: bool) -> Self {
        self.show_links = show;
        self
    }
}

struct IncludedRow {
    layer: String,
    /// Range in the character layer.
    range: IndexRange,
    datum: Datum,
    link_target: String,
}

/// Renders a character layer with the annotations of chosen layers underlined.
///
/// ```text
/// John Doe lives in New York.
/// ╰──╯words
/// ╰──────╯ner=PER
///                   ╰──────╯ner=LOC
/// ```
pub struct LayerDisplay<'d> {
    doc: &'d Document,
    characters: String,
    config: DisplayConfig,
    rows: Vec<IncludedRow>,
}

// T  o  k  y  o     i  s     b  i  g  .   - characters
// 0  1  2  3  4  5  6  7  8  9  10 11 12  - display columns
// ╰───╯words                              - (0, 5)
//                   ╰╯words               - (6, 8)
//                   ╰─────────────╯s      - division (6, 13)
impl<'d> std::fmt::Display for LayerDisplay<'d> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self
            .doc
            .layer(&self.characters)
            .ok()
            .and_then(|layer| layer.as_characters())
            .map(|layer| layer.as_str())
            .unwrap_or_default();

        // display column of every character boundary
        let mut columns = Vec::with_capacity(text.len() + 1);
        let mut opening_line = String::new();
        let mut column = 0;
        for c in text.chars() {
            columns.push(column);
            let c = if c.is_control() { ' ' } else { c };
            opening_line.push(c);
            column += UnicodeWidthChar::width(c).unwrap_or(0);
        }
        columns.push(column);

        f.write_str(&opening_line)?;

        for row in &self.rows {
            f.write_char('\n')?;
            let start_col = columns.get(row.range.0).copied().unwrap_or(column);
            let end_col = columns.get(row.range.1).copied().unwrap_or(column);
            for _ in 0..start_col {
                f.write_char(' ')?;
            }

            f.write_char('╰')?;
            for _ in (start_col + 1)..end_col.saturating_sub(1) {
                f.write_char('─')?;
            }
            if end_col.saturating_sub(start_col) > 1 {
                f.write_char('╯')?;
            }

            f.write_str(&row.layer)?;
            match &row.datum {
                Datum::Label(label) if self.config.show_labels => write!(f, "={}", label)?,
                _ => {}
            }

            if self.config.show_links {
                if let Some(target) = row.datum.link() {
                    f.write_char('\n')?;
                    for _ in 0..start_col + 2 {
                        f.write_char(' ')?;
                    }
                    let label = row.datum.label().unwrap_or("");
                    write!(f, "└─{}─>{}[{}]", label, row.link_target, target)?;
                }
            }
        }

        Ok(())
    }
}

impl<'d> LayerDisplay<'d> {
    /// Start a display of the character layer `characters`.
    pub fn new(doc: &'d Document, characters: &str) -> LayerResult<Self> {
        if doc.layer(characters)?.as_characters().is_none() {
            return Err(LayerError::Schema(format!(
                "layer {} is not a character layer",
                characters
            )));
        }
        Ok(Self {
            doc,
            characters: characters.to_string(),
            config: DisplayConfig::default(),
            rows: Vec::new(),
        })
    }

    pub fn with_config(mut self, config: DisplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Add one row per annotation of `layer`.
    ///
    /// `layer` must derive from the displayed character layer.
    pub fn include(&mut self, layer: &str) -> LayerResult<()> {
        let layer_ref = self.doc.get(layer)?;
        let link_target = self
            .doc
            .schema()
            .get(layer)
            .and_then(|desc| desc.data.as_ref())
            .and_then(|data| data.link_target())
            .unwrap_or(layer)
            .to_string();
        for (range, datum) in layer_ref.indexes_data(&self.characters)? {
            self.rows.push(IncludedRow {
                layer: layer.to_string(),
                range,
                datum,
                link_target: link_target.clone(),
            });
        }
        Ok(())
    }

    /// Takes self
    pub fn with(mut self, layer: &str) -> LayerResult<Self> {
        self.include(layer)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::raw::RawLayer;
    use crate::schema::{DataSpec, LayerDesc, Schema};
    use crate::Document;

    use super::*;

    fn schema() -> Arc<Schema> {
        let mut schema = Schema::new();
        schema.define(LayerDesc::characters("text")).unwrap();
        schema.define(LayerDesc::span("words", "text")).unwrap();
        schema
            .define(LayerDesc::span("ner", "words").with_data(DataSpec::String))
            .unwrap();
        schema
            .define(LayerDesc::seq("deps", "words").with_data(DataSpec::TypedLink {
                target: None,
                labels: vec!["root".into(), "nsubj".into(), "obj".into()],
            }))
            .unwrap();
        schema.define(LayerDesc::div("sentences", "text")).unwrap();
        Arc::new(schema)
    }

    #[test]
    fn test_display_spans_through_words() {
        let doc = Document::construct(
            schema(),
            "d1",
            vec![
                ("text", RawLayer::from("John Doe lives in New York.")),
                (
                    "words",
                    RawLayer::Pairs(vec![(0, 4), (5, 8), (9, 14), (15, 17), (18, 22), (23, 26)]),
                ),
                (
                    "ner",
                    RawLayer::PairLabels(vec![(0, 2, "PER".into()), (4, 6, "LOC".into())]),
                ),
            ],
            false,
        )
        .unwrap();

        let display = LayerDisplay::new(&doc, "text")
            .unwrap()
            .with("words")
            .unwrap()
            .with("ner")
            .unwrap();

        insta::assert_snapshot!(display, @r###"
        John Doe lives in New York.
        ╰──╯words
             ╰─╯words
                 ╰───╯words
                       ╰╯words
                          ╰──╯words
                               ╰─╯words
        ╰──────╯ner=PER
                          ╰──────╯ner=LOC
        "###);
    }

    #[test]
    fn test_display_links_and_divisions() {
        let doc = Document::construct(
            schema(),
            "d1",
            vec![
                ("text", RawLayer::from("I saw it. Ok.")),
                ("words", RawLayer::Pairs(vec![(0, 1), (2, 5), (6, 8)])),
                (
                    "deps",
                    RawLayer::IndexLabels(vec![
                        (1, "nsubj".into()),
                        (1, "root".into()),
                        (1, "obj".into()),
                    ]),
                ),
                ("sentences", RawLayer::Indexes(vec![0, 10])),
            ],
            false,
        )
        .unwrap();

        let display = LayerDisplay::new(&doc, "text")
            .unwrap()
            .with("sentences")
            .unwrap()
            .with("deps")
            .unwrap();

        insta::assert_snapshot!(display, @r###"
        I saw it. Ok.
        ╰────────╯sentences
                  ╰─╯sentences
        ╰deps
          └─nsubj─>deps[1]
          ╰─╯deps
            └─root─>deps[1]
              ╰╯deps
                └─obj─>deps[1]
        "###);
    }

    #[test]
    fn test_display_without_links() {
        let doc = Document::construct(
            schema(),
            "d1",
            vec![
                ("text", RawLayer::from("I saw it")),
                ("words", RawLayer::Pairs(vec![(0, 1), (2, 5), (6, 8)])),
                (
                    "deps",
                    RawLayer::IndexLabels(vec![
                        (1, "nsubj".into()),
                        (1, "root".into()),
                        (1, "obj".into()),
                    ]),
                ),
            ],
            false,
        )
        .unwrap();

        let display = LayerDisplay::new(&doc, "text")
            .unwrap()
            .with_config(DisplayConfig::new().links(false))
            .with("deps")
            .unwrap();

        insta::assert_snapshot!(display, @r###"
        I saw it
        ╰deps
          ╰─╯deps
              ╰╯deps
        "###);
    }

    #[test]
    fn test_display_rejects_unrelated_layers() {
        let mut schema = Schema::new();
        schema.define(LayerDesc::characters("text")).unwrap();
        schema.define(LayerDesc::characters("title")).unwrap();
        schema.define(LayerDesc::span("words", "text")).unwrap();
        let doc = Document::construct(
            Arc::new(schema),
            "d1",
            vec![
                ("text", RawLayer::from("Hi there")),
                ("title", RawLayer::from("Greeting")),
                ("words", RawLayer::Pairs(vec![(0, 2)])),
            ],
            false,
        )
        .unwrap();

        let mut display = LayerDisplay::new(&doc, "title").unwrap();
        assert!(matches!(
            display.include("words"),
            Err(LayerError::UnrelatedLayer { .. })
        ));
        assert!(LayerDisplay::new(&doc, "words").is_err());
    }
}
