//! Documents: one base text plus its materialized annotation layers.
//!
//! A [`Document`] holds a shared, read-only [`Schema`] and the layers that
//! have been set so far, in the order they were resolved. A layer can only be
//! materialized once its base is, so construction from a batch of raw values
//! repeatedly sweeps the unresolved layers until a sweep makes no progress.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::errors::{LayerError, LayerResult};
use crate::layer::{IndexRange, Layer, LayerRef, TextFor};
use crate::raw::{RawDocument, RawLayer};
use crate::schema::Schema;
use crate::store::DocumentStore;

/// A text and its annotation layers.
///
/// Clones share the schema and any bound store.
#[derive(Clone)]
pub struct Document {
    id: String,
    schema: Arc<Schema>,
    /// Materialized layers in resolution order.
    layers: Vec<Layer>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("layers", &self.layer_names().collect::<Vec<_>>())
            .field("bound", &self.store.is_some())
            .finish()
    }
}

impl Document {
    /// Create a document with no layers.
    pub fn new(schema: Arc<Schema>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema,
            layers: Vec::new(),
            store: None,
        }
    }

    /// Create a document from initial raw values.
    ///
    /// With `default_fill`, every schema layer missing from `initial` that
    /// declares a default gets that default.
    pub fn construct<I, K>(
        schema: Arc<Schema>,
        id: impl Into<String>,
        initial: I,
        default_fill: bool,
    ) -> LayerResult<Self>
    where
        I: IntoIterator<Item = (K, RawLayer)>,
        K: Into<String>,
    {
        let mut doc = Self::new(schema, id);
        doc.add_layers(initial, default_fill)?;
        Ok(doc)
    }

    /// Rebuild a document from the output of [`to_raw`](Self::to_raw).
    ///
    /// Defaults are not filled, so `from_raw(doc.to_raw())` reproduces `doc`.
    pub fn from_raw(raw: RawDocument, schema: Arc<Schema>, id: impl Into<String>) -> LayerResult<Self> {
        Self::construct(schema, id, raw, false)
    }

    /// Bind the document to a store; every later mutation pushes a snapshot.
    pub fn bind_store(&mut self, store: Arc<dyn DocumentStore>) {
        self.store = Some(store);
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.bind_store(store);
        self
    }

    pub fn unbind_store(&mut self) -> Option<Arc<dyn DocumentStore>> {
        self.store.take()
    }

    pub fn is_bound(&self) -> bool {
        self.store.is_some()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Change the id; later snapshots are pushed under the new id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Install several layers at once, resolving them in dependency order.
    ///
    /// Either every value is validated and installed, or the document is
    /// left untouched. A bound store receives one snapshot at the end.
    pub fn add_layers<I, K>(&mut self, values: I, default_fill: bool) -> LayerResult<()>
    where
        I: IntoIterator<Item = (K, RawLayer)>,
        K: Into<String>,
    {
        let mut given: HashMap<String, RawLayer> = HashMap::new();
        for (name, value) in values {
            let name = name.into();
            if !self.schema.contains(&name) {
                return Err(LayerError::unknown(&name));
            }
            given.insert(name, value);
        }

        if default_fill {
            for desc in self.schema.iter() {
                if !given.contains_key(&desc.name) && !self.contains(&desc.name) {
                    if let Some(default) = &desc.default {
                        given.insert(desc.name.clone(), default.clone());
                    }
                }
            }
        }

        // Sweep in schema order so resolution order is deterministic.
        let mut pending: Vec<(String, RawLayer)> = self
            .schema
            .names()
            .filter_map(|name| given.remove_entry(name))
            .collect();
        let mut staged = self.layers.clone();
        let mut pass = 0;

        while !pending.is_empty() {
            pass += 1;
            let waiting: HashSet<String> = pending.iter().map(|(name, _)| name.clone()).collect();
            let before = pending.len();
            let mut stalled = Vec::new();

            for (name, value) in pending {
                let desc = self
                    .schema
                    .get(&name)
                    .ok_or_else(|| LayerError::unknown(&name))?;
                let base_len = match &desc.base {
                    None => None,
                    Some(base) if waiting.contains(base) => {
                        stalled.push((name, value));
                        continue;
                    }
                    Some(base) => match staged.iter().find(|l| l.name() == base) {
                        Some(layer) => Some(layer.len()),
                        None => {
                            stalled.push((name, value));
                            continue;
                        }
                    },
                };
                let layer = Layer::build(desc, value, base_len)?;
                upsert(&mut staged, layer);
            }

            log::debug!(
                "resolution pass {} installed {} layers, {} waiting",
                pass,
                before - stalled.len(),
                stalled.len()
            );
            if stalled.len() == before {
                let layers: Vec<String> = stalled.into_iter().map(|(name, _)| name).collect();
                log::warn!("document {}: cannot resolve layers {:?}", self.id, layers);
                return Err(LayerError::UnresolvableDependency { layers });
            }
            pending = stalled;
        }

        let previous = std::mem::replace(&mut self.layers, staged);
        if let Err(err) = self.push_snapshot() {
            self.layers = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Set the value of one layer.
    pub fn set(&mut self, name: &str, value: impl Into<RawLayer>) -> LayerResult<()> {
        self.set_or_default(name, Some(value.into()))
    }

    /// Set one layer, falling back to the schema default when `value` is `None`.
    ///
    /// The value is validated against the schema and the current base layer
    /// before it replaces any previous value. On failure, including a failed
    /// store push, the document is left as it was.
    pub fn set_or_default(&mut self, name: &str, value: Option<RawLayer>) -> LayerResult<()> {
        let desc = self.schema.get(name).ok_or_else(|| LayerError::unknown(name))?;
        let value = value.or_else(|| desc.default.clone()).ok_or_else(|| {
            LayerError::malformed(name, "no value given and the layer has no default")
        })?;
        let base_len = match &desc.base {
            Some(base) => Some(self.layer(base)?.len()),
            None => None,
        };
        let layer = Layer::build(desc, value, base_len)?;
        log::debug!("document {}: setting {} layer {}", self.id, layer.kind(), name);

        let previous = upsert(&mut self.layers, layer);
        if let Err(err) = self.push_snapshot() {
            match previous {
                Some(previous) => {
                    upsert(&mut self.layers, previous);
                }
                None => self.layers.retain(|l| l.name() != name),
            }
            return Err(err);
        }
        Ok(())
    }

    /// A materialized layer, paired with this document for translation.
    pub fn get(&self, name: &str) -> LayerResult<LayerRef<'_>> {
        Ok(LayerRef::new(self, self.layer(name)?))
    }

    /// A materialized layer.
    pub fn layer(&self, name: &str) -> LayerResult<&Layer> {
        if !self.schema.contains(name) {
            return Err(LayerError::unknown(name));
        }
        self.layers
            .iter()
            .find(|layer| layer.name() == name)
            .ok_or_else(|| LayerError::LayerNotSet {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name() == name)
    }

    /// Names of the materialized layers in resolution order.
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(Layer::name)
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerRef<'_>> {
        self.layers.iter().map(move |layer| LayerRef::new(self, layer))
    }

    /// Shorthand for `get(name)?.indexes(target)`.
    pub fn indexes(&self, name: &str, target: &str) -> LayerResult<Vec<IndexRange>> {
        self.get(name)?.indexes(target)
    }

    /// The text under each annotation of a layer.
    ///
    /// The layer's indexes are translated into the character layer at the
    /// root of its chain; the returned iterator slices that text lazily.
    pub fn text_for(&self, name: &str) -> LayerResult<TextFor<'_>> {
        let layer = self.layer(name)?;
        let root = self.schema.root_of(name)?;
        let characters = self
            .layer(root)?
            .as_characters()
            .ok_or_else(|| LayerError::Schema(format!("layer {} is not a character layer", root)))?;
        let ranges = crate::layer::translate_indexes(self, layer, root)?;
        Ok(TextFor::new(characters, ranges))
    }

    /// Raw values of every materialized layer.
    pub fn to_raw(&self) -> RawDocument {
        self.layers
            .iter()
            .map(|layer| (layer.name().to_string(), layer.raw()))
            .collect()
    }

    fn push_snapshot(&self) -> LayerResult<()> {
        if let Some(store) = &self.store {
            log::debug!("pushing snapshot of document {} ({} layers)", self.id, self.layers.len());
            store.push_snapshot(&self.id, &self.to_raw())?;
        }
        Ok(())
    }
}

/// Replace the layer with the same name in place, or append it.
fn upsert(layers: &mut Vec<Layer>, layer: Layer) -> Option<Layer> {
    match layers.iter_mut().find(|l| l.name() == layer.name()) {
        Some(slot) => Some(std::mem::replace(slot, layer)),
        None => {
            layers.push(layer);
            None
        }
    }
}
