use std::sync::Arc;

use layered_standoff::{
    DataSpec, DirectoryStore, DocumentStore, FailOn, LayerDesc, LayerError, MemoryStore,
    RawLayer, StoreError, StoreOperation,
};

use crate::{parse_schema, Corpus, CorpusError, CorpusSnapshot};

const SCHEMA: &str = r#"
[[layer]]
name = "text"
type = "characters"

[[layer]]
name = "words"
type = "span"
base = "text"

[[layer]]
name = "ner"
type = "span"
base = "words"
values = ["LOC", "ORG", "PER"]

[[layer]]
name = "sentences"
type = "div"
base = "text"
default = [0]
"#;

fn corpus() -> Corpus {
    Corpus::new(parse_schema(SCHEMA).unwrap())
}

fn john() -> Vec<(&'static str, RawLayer)> {
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
    ]
}

fn short(text: &str) -> Vec<(&'static str, RawLayer)> {
    vec![("text", RawLayer::from(text))]
}

#[test]
fn test_add_doc_derives_ids_and_fills_defaults() {
    let mut corpus = corpus();
    let first = corpus.add_doc(john()).unwrap();
    let second = corpus.add_doc(short("Hello.")).unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(corpus.doc_ids(), &[first.clone(), second.clone()]);

    let doc = corpus.doc_by_id(&first).unwrap();
    assert_eq!(doc.id(), first);
    assert_eq!(doc.text_for("ner").unwrap().collect::<Vec<_>>(), vec!["John Doe", "New York"]);
    assert_eq!(
        doc.text_for("sentences").unwrap().collect::<Vec<_>>(),
        vec!["John Doe lives in New York."]
    );
    assert_eq!(corpus.docs().count(), 2);
}

#[test]
fn test_identical_texts_get_longer_ids() {
    let mut corpus = corpus();
    let first = corpus.add_doc(short("Hello.")).unwrap();
    let second = corpus.add_doc(short("Hello.")).unwrap();
    assert_eq!(second.len(), 5);
    assert!(second.starts_with(&first));
}

#[test]
fn test_invalid_documents_are_not_added() {
    let mut corpus = corpus();
    let err = corpus
        .add_doc(vec![
            ("text", RawLayer::from("Hi.")),
            ("ner", RawLayer::PairLabels(vec![(0, 1, "PER".into())])),
        ])
        .unwrap_err();
    assert!(matches!(
        err,
        CorpusError::Layer(LayerError::UnresolvableDependency { .. })
    ));
    assert!(corpus.is_empty());
}

#[test]
fn test_layers_are_frozen_once_documents_exist() {
    let mut corpus = corpus();
    corpus
        .add_layer_meta(LayerDesc::seq("pos", "words").with_data(DataSpec::String))
        .unwrap();
    corpus.add_doc(short("Hi.")).unwrap();

    let err = corpus
        .add_layer_meta(LayerDesc::seq("lemma", "words"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot declare layer lemma: the corpus already holds documents"
    );
    assert!(corpus.schema().contains("pos"));
}

#[test]
fn test_update_doc_keeps_id_unless_text_changes() {
    let mut corpus = corpus();
    let first = corpus.add_doc(short("Hello there.")).unwrap();
    let second = corpus.add_doc(short("Goodbye.")).unwrap();

    let same = corpus
        .update_doc(&first, vec![("words", RawLayer::Pairs(vec![(0, 5), (6, 11)]))])
        .unwrap();
    assert_eq!(same, first);

    let renamed = corpus
        .update_doc(&first, vec![("text", RawLayer::from("Hello again."))])
        .unwrap();
    assert_ne!(renamed, first);
    assert_eq!(corpus.doc_ids(), &[renamed.clone(), second]);
    assert!(matches!(
        corpus.doc_by_id(&first),
        Err(CorpusError::UnknownDocument { .. })
    ));
    assert_eq!(corpus.doc_by_id(&renamed).unwrap().id(), renamed);
}

#[test]
fn test_failed_update_leaves_document_in_place() {
    let mut corpus = corpus();
    let id = corpus.add_doc(john()).unwrap();
    let err = corpus
        .update_doc(
            &id,
            vec![("ner", RawLayer::PairLabels(vec![(0, 2, "DATE".into())]))],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CorpusError::Layer(LayerError::MalformedAnnotation { .. })
    ));
    assert_eq!(
        corpus.doc_by_id(&id).unwrap().get("ner").unwrap().len(),
        2
    );
}

#[test]
fn test_remove_doc() {
    let mut corpus = corpus();
    let first = corpus.add_doc(short("One.")).unwrap();
    let second = corpus.add_doc(short("Two.")).unwrap();

    let removed = corpus.remove_doc(&first).unwrap();
    assert_eq!(removed.id(), first);
    assert_eq!(corpus.doc_ids(), &[second]);
    assert!(corpus.remove_doc(&first).is_err());
}

#[test]
fn test_bound_corpus_mirrors_the_store() {
    let store = MemoryStore::new();
    let mut corpus = corpus().with_store(Arc::new(store.clone())).unwrap();

    let id = corpus.add_doc(short("Hello there.")).unwrap();
    corpus
        .doc_mut(&id)
        .unwrap()
        .set("words", vec![(0, 5), (6, 11)])
        .unwrap();
    let renamed = corpus
        .update_doc(&id, vec![("text", RawLayer::from("Hello again."))])
        .unwrap();

    assert_eq!(
        store.operations(),
        vec![
            StoreOperation::Push {
                id: id.clone(),
                layers: vec!["sentences".into(), "text".into()],
            },
            StoreOperation::Push {
                id: id.clone(),
                layers: vec!["sentences".into(), "text".into(), "words".into()],
            },
            StoreOperation::Push {
                id: renamed.clone(),
                layers: vec!["sentences".into(), "text".into(), "words".into()],
            },
            StoreOperation::Remove { id: id.clone() },
        ]
    );

    corpus.remove_doc(&renamed).unwrap();
    assert!(store.list_ids().unwrap().is_empty());
}

#[test]
fn test_failed_push_keeps_document_and_snapshot() {
    let store = MemoryStore::new();
    let mut corpus = corpus().with_store(Arc::new(store.clone())).unwrap();
    let id = corpus.add_doc(short("Hello there.")).unwrap();
    let stored = store.fetch_by_id(&id).unwrap();

    store.fail_on(FailOn::Push(StoreError::Write("disk full".into())));
    for update in [
        short("Hello again."),
        vec![("words", RawLayer::Pairs(vec![(0, 5), (6, 11)]))],
    ] {
        let err = corpus.update_doc(&id, update).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::Layer(LayerError::Storage(StoreError::Write(_)))
        ));
        assert_eq!(corpus.doc_ids(), &[id.clone()]);
        let doc = corpus.doc_by_id(&id).unwrap();
        assert_eq!(doc.id(), id);
        assert_eq!(doc.get("text").unwrap().raw(), RawLayer::from("Hello there."));
        assert!(!doc.contains("words"));
        assert!(doc.is_bound());
        assert_eq!(store.list_ids().unwrap(), vec![id.clone()]);
        assert_eq!(store.fetch_by_id(&id).unwrap(), stored);
    }

    store.clear_failure();
    let renamed = corpus.update_doc(&id, short("Hello again.")).unwrap();
    assert_eq!(store.list_ids().unwrap(), vec![renamed.clone()]);
    assert_eq!(
        store.fetch_by_id(&renamed).unwrap(),
        corpus.doc_by_id(&renamed).unwrap().to_raw()
    );
}

#[test]
fn test_binding_pushes_existing_documents() {
    let mut corpus = corpus();
    let first = corpus.add_doc(short("One.")).unwrap();
    let second = corpus.add_doc(short("Two.")).unwrap();

    let store = MemoryStore::new();
    let mut corpus = corpus.with_store(Arc::new(store.clone())).unwrap();
    assert_eq!(store.list_ids().unwrap(), vec![first.clone(), second.clone()]);
    assert!(corpus.docs().all(|doc| doc.is_bound()));

    corpus.remove_doc(&first).unwrap();
    assert_eq!(store.list_ids().unwrap(), vec![second]);
}

#[test]
fn test_binding_fails_when_the_store_rejects_a_document() {
    let mut corpus = corpus();
    corpus.add_doc(short("One.")).unwrap();

    let store = MemoryStore::new();
    store.fail_on(FailOn::Push(StoreError::Write("read-only".into())));
    let err = corpus.with_store(Arc::new(store.clone())).unwrap_err();
    assert!(matches!(
        err,
        CorpusError::Layer(LayerError::Storage(StoreError::Write(_)))
    ));
    assert!(store.list_ids().unwrap().is_empty());
}

#[test]
fn test_layers_across_documents() {
    let mut corpus = corpus();
    corpus.add_doc(john()).unwrap();
    corpus.add_doc(short("Hello.")).unwrap();

    let texts: Vec<RawLayer> = corpus.layers("text").unwrap().map(|layer| layer.raw()).collect();
    assert_eq!(
        texts,
        vec![
            RawLayer::from("John Doe lives in New York."),
            RawLayer::from("Hello.")
        ]
    );

    let entities: Vec<Vec<&str>> = corpus
        .layers("ner")
        .unwrap()
        .map(|layer| layer.text().unwrap())
        .collect();
    assert_eq!(entities, vec![vec!["John Doe", "New York"]]);

    assert!(matches!(
        corpus.layers("lemmas").map(|layers| layers.count()),
        Err(CorpusError::Layer(LayerError::UnknownLayer { .. }))
    ));
}

#[test]
fn test_store_failure_rejects_new_document() {
    let store = MemoryStore::new();
    store.fail_on(FailOn::Push(StoreError::Write("read-only".into())));
    let mut corpus = corpus().with_store(Arc::new(store)).unwrap();

    let err = corpus.add_doc(short("Hi.")).unwrap_err();
    assert!(matches!(
        err,
        CorpusError::Layer(LayerError::Storage(StoreError::Write(_)))
    ));
    assert!(corpus.is_empty());
}

#[test]
fn test_reload_from_directory_store() {
    let dir = tempfile::tempdir().unwrap();
    let schema = Arc::new(parse_schema(SCHEMA).unwrap());
    let store: Arc<dyn DocumentStore> = Arc::new(DirectoryStore::open(dir.path()).unwrap());

    let mut corpus = Corpus::with_schema(schema.clone())
        .with_store(store.clone())
        .unwrap();
    let id = corpus.add_doc(john()).unwrap();

    let reloaded = Corpus::from_store(schema, store).unwrap();
    assert_eq!(reloaded.doc_ids(), &[id.clone()]);
    assert_eq!(
        reloaded.doc_by_id(&id).unwrap().to_raw(),
        corpus.doc_by_id(&id).unwrap().to_raw()
    );
}

#[test]
fn test_snapshot_round_trip() {
    let mut corpus = corpus();
    corpus.add_doc(john()).unwrap();
    corpus.add_doc(short("Hello.")).unwrap();

    let encoded = corpus.to_ron_string().unwrap();
    let restored = Corpus::from_ron_string(&encoded).unwrap();
    assert_eq!(restored.doc_ids(), corpus.doc_ids());
    assert_eq!(restored.to_snapshot(), corpus.to_snapshot());
    assert_eq!(
        restored
            .doc_by_id(&corpus.doc_ids()[0])
            .unwrap()
            .text_for("ner")
            .unwrap()
            .collect::<Vec<_>>(),
        vec!["John Doe", "New York"]
    );
}

#[test]
fn test_snapshot_version_is_checked() {
    let mut snapshot = corpus().to_snapshot();
    snapshot.version = 7;
    let err = Corpus::from_snapshot(snapshot).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"snapshot error: unsupported snapshot version 7");
}

#[test]
fn test_snapshot_layout() {
    let schema = parse_schema(
        r#"
[[layer]]
name = "text"
type = "characters"

[[layer]]
name = "words"
type = "span"
base = "text"
"#,
    )
    .unwrap();
    let snapshot = CorpusSnapshot {
        version: CorpusSnapshot::VERSION,
        schema,
        documents: Vec::new(),
    };
    let encoded = snapshot.to_ron_string().unwrap();
    assert!(encoded.contains("type: characters"));
    assert!(encoded.contains("base: Some(\"text\")"));
    assert_eq!(CorpusSnapshot::from_ron_string(&encoded).unwrap(), snapshot);
}
