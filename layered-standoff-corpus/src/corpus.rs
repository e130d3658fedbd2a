use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use layered_standoff::{
    document_id, Document, DocumentStore, LayerDesc, LayerError, LayerRef, RawDocument, RawLayer,
    Schema, StoreResult,
};

use crate::errors::{CorpusError, CorpusResult};
use crate::snapshot::{CorpusSnapshot, SnapshotDocument};

/// An ordered collection of documents sharing one schema.
///
/// Documents are keyed by an id derived from their character layers (see
/// [`document_id`]). When the corpus is bound to a [`DocumentStore`] every
/// document it holds is bound too, so edits through [`Corpus::doc_mut`] are
/// pushed as they happen.
pub struct Corpus {
    schema: Arc<Schema>,
    order: Vec<String>,
    docs: HashMap<String, Document>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl fmt::Debug for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Corpus")
            .field("layers", &self.schema.names().collect::<Vec<_>>())
            .field("order", &self.order)
            .field("bound", &self.store.is_some())
            .finish()
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new(Schema::new())
    }
}

impl Corpus {
    pub fn new(schema: Schema) -> Self {
        Self::with_schema(Arc::new(schema))
    }

    pub fn with_schema(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            order: Vec::new(),
            docs: HashMap::new(),
            store: None,
        }
    }

    /// Bind the corpus to a store, pushing every document it already holds.
    ///
    /// If a push fails the snapshots pushed so far are removed again and the
    /// error is returned. Use [`Corpus::from_store`] to load the documents a
    /// store already holds.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> CorpusResult<Self> {
        for (pushed, id) in self.order.iter().enumerate() {
            let doc = self.docs.get(id).ok_or_else(|| unknown_document(id))?;
            if let Err(err) = store.push_snapshot(id, &doc.to_raw()) {
                for done in &self.order[..pushed] {
                    if let Err(undo) = store.remove(done) {
                        log::warn!("could not withdraw snapshot {}: {}", done, undo);
                    }
                }
                return Err(err.into());
            }
        }
        for doc in self.docs.values_mut() {
            doc.bind_store(store.clone());
        }
        log::debug!("bound {} documents to store", self.order.len());
        self.store = Some(store);
        Ok(self)
    }

    /// Load every document of `store`, in the store's listing order.
    pub fn from_store(schema: Arc<Schema>, store: Arc<dyn DocumentStore>) -> CorpusResult<Self> {
        let mut corpus = Self::with_schema(schema);
        for id in store.list_ids()? {
            let raw = store.fetch_by_id(&id)?;
            let doc = Document::from_raw(raw, corpus.schema.clone(), id.clone())?
                .with_store(store.clone());
            corpus.order.push(id.clone());
            corpus.docs.insert(id, doc);
        }
        log::info!("loaded {} documents from store", corpus.order.len());
        corpus.store = Some(store);
        Ok(corpus)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Declare a new layer. Only allowed while the corpus holds no documents.
    pub fn add_layer_meta(&mut self, desc: LayerDesc) -> CorpusResult<()> {
        if !self.docs.is_empty() {
            return Err(CorpusError::SchemaFrozen { name: desc.name });
        }
        Arc::make_mut(&mut self.schema).define(desc)?;
        Ok(())
    }

    /// Build a document from raw layer values and add it at the end.
    ///
    /// Schema defaults fill missing layers. Returns the derived id.
    pub fn add_doc<I, K>(&mut self, layers: I) -> CorpusResult<String>
    where
        I: IntoIterator<Item = (K, RawLayer)>,
        K: Into<String>,
    {
        let mut doc = Document::construct(self.schema.clone(), String::new(), layers, true)?;
        let raw = doc.to_raw();
        let id = document_id(&raw, &self.order);
        if self.docs.contains_key(&id) {
            return Err(CorpusError::DuplicateDocument { id });
        }
        doc.set_id(id.clone());

        if let Some(store) = &self.store {
            store.push_snapshot(&id, &raw)?;
            doc.bind_store(store.clone());
        }
        log::debug!("added document {} with {} layers", id, raw.len());
        self.order.push(id.clone());
        self.docs.insert(id.clone(), doc);
        Ok(id)
    }

    pub fn doc_by_id(&self, id: &str) -> CorpusResult<&Document> {
        self.docs.get(id).ok_or_else(|| unknown_document(id))
    }

    /// Mutable access to a document.
    ///
    /// Setting a character layer through this handle keeps the old id; use
    /// [`Corpus::update_doc`] to re-derive it.
    pub fn doc_mut(&mut self, id: &str) -> CorpusResult<&mut Document> {
        self.docs.get_mut(id).ok_or_else(|| unknown_document(id))
    }

    /// Document ids in insertion order.
    pub fn doc_ids(&self) -> &[String] {
        &self.order
    }

    /// Documents in insertion order.
    pub fn docs(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(move |id| self.docs.get(id))
    }

    /// One layer of every document, in insertion order.
    ///
    /// Documents that have not set the layer are skipped.
    pub fn layers<'c>(
        &'c self,
        name: &'c str,
    ) -> CorpusResult<impl Iterator<Item = LayerRef<'c>> + 'c> {
        if !self.schema.contains(name) {
            return Err(LayerError::UnknownLayer {
                name: name.to_string(),
            }
            .into());
        }
        Ok(self.docs().filter_map(move |doc| doc.get(name).ok()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Install new values for some layers of a document.
    ///
    /// When a character layer changes the document gets a new id, keeping its
    /// position in the corpus; the new id is returned. The edit is applied to
    /// a copy and only replaces the stored document once validation and the
    /// store have accepted it: on any error the corpus and the store are
    /// unchanged.
    pub fn update_doc<I, K>(&mut self, id: &str, layers: I) -> CorpusResult<String>
    where
        I: IntoIterator<Item = (K, RawLayer)>,
        K: Into<String>,
    {
        let position = self
            .order
            .iter()
            .position(|stored| stored == id)
            .ok_or_else(|| unknown_document(id))?;
        let mut doc = self.doc_by_id(id)?.clone();

        // Pushed once below, under whichever id the document ends up with.
        let store = doc.unbind_store();
        let before = character_values(&doc.to_raw());
        doc.add_layers(layers, false)?;

        let raw = doc.to_raw();
        let new_id = if character_values(&raw) == before {
            id.to_string()
        } else {
            let others: Vec<&String> = self.order.iter().filter(|stored| *stored != id).collect();
            document_id(&raw, &others)
        };
        if new_id != id && self.docs.contains_key(&new_id) {
            return Err(CorpusError::DuplicateDocument { id: new_id });
        }

        if let Some(store) = store {
            sync_renamed(store.as_ref(), id, &new_id, &raw)?;
            doc.bind_store(store);
        }
        doc.set_id(new_id.clone());
        self.docs.remove(id);
        self.order[position] = new_id.clone();
        self.docs.insert(new_id.clone(), doc);
        Ok(new_id)
    }

    /// Remove a document, deleting it from the store when bound.
    pub fn remove_doc(&mut self, id: &str) -> CorpusResult<Document> {
        if !self.docs.contains_key(id) {
            return Err(unknown_document(id));
        }
        if let Some(store) = &self.store {
            store.remove(id)?;
        }
        let mut doc = self.docs.remove(id).ok_or_else(|| unknown_document(id))?;
        self.order.retain(|stored| stored != id);
        doc.unbind_store();
        Ok(doc)
    }

    /// Schema, order and raw layer values of every document.
    pub fn to_snapshot(&self) -> CorpusSnapshot {
        CorpusSnapshot {
            version: CorpusSnapshot::VERSION,
            schema: (*self.schema).clone(),
            documents: self
                .docs()
                .map(|doc| SnapshotDocument {
                    id: doc.id().to_string(),
                    layers: doc.to_raw(),
                })
                .collect(),
        }
    }

    /// Rebuild an unbound corpus from a snapshot, keeping the stored ids.
    pub fn from_snapshot(snapshot: CorpusSnapshot) -> CorpusResult<Self> {
        if snapshot.version != CorpusSnapshot::VERSION {
            return Err(CorpusError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        snapshot.schema.validate()?;
        let mut corpus = Self::new(snapshot.schema);
        for entry in snapshot.documents {
            if corpus.docs.contains_key(&entry.id) {
                return Err(CorpusError::DuplicateDocument { id: entry.id });
            }
            let doc = Document::from_raw(entry.layers, corpus.schema.clone(), entry.id.clone())?;
            corpus.order.push(entry.id.clone());
            corpus.docs.insert(entry.id, doc);
        }
        Ok(corpus)
    }

    pub fn to_ron_string(&self) -> CorpusResult<String> {
        self.to_snapshot()
            .to_ron_string()
            .map_err(|e| CorpusError::Snapshot(e.to_string()))
    }

    pub fn from_ron_string(s: &str) -> CorpusResult<Self> {
        let snapshot =
            CorpusSnapshot::from_ron_string(s).map_err(|e| CorpusError::Snapshot(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }
}

fn unknown_document(id: &str) -> CorpusError {
    CorpusError::UnknownDocument { id: id.to_string() }
}

/// Replace the stored snapshot of a document that may have changed id.
///
/// The new snapshot is written before the old one is removed; if the removal
/// fails the new snapshot is withdrawn so the store keeps only the old one.
fn sync_renamed(
    store: &dyn DocumentStore,
    old: &str,
    new: &str,
    raw: &RawDocument,
) -> StoreResult<()> {
    store.push_snapshot(new, raw)?;
    if old == new {
        return Ok(());
    }
    log::debug!("document {} renamed to {}", old, new);
    if let Err(err) = store.remove(old) {
        if let Err(undo) = store.remove(new) {
            log::warn!("could not withdraw snapshot {}: {}", new, undo);
        }
        return Err(err);
    }
    Ok(())
}

/// The character layer values of a raw document.
fn character_values(raw: &RawDocument) -> Vec<(String, String)> {
    raw.iter()
        .filter_map(|(name, value)| match value {
            RawLayer::Text(text) => Some((name.clone(), text.clone())),
            _ => None,
        })
        .collect()
}
