//! The authoritative layer store.
//!
//! Layers are kept in z-order, tombstones included. Every change goes through
//! [`Scene::mutate`], [`Scene::replace_all`] or the insert methods, and
//! listeners hear about it once per call or once per [`Scene::batch`].

mod cache;
mod registry;

pub use cache::ShapeCache;
pub use registry::SceneRegistry;

use crate::config::EngineConfig;
use crate::layers::{Layer, LayerId, LayerUpdate};
use kurbo::BezPath;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for scenes.
pub type SceneId = Uuid;

/// Handle returned by [`Scene::subscribe`].
pub type ListenerId = u64;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Layer not found: {0}")]
    NotFound(LayerId),
    #[error("Unknown scene: {0}")]
    UnknownScene(SceneId),
    #[error("Duplicate layer id: {0}")]
    DuplicateId(LayerId),
    #[error("Index {index} out of bounds for {len} layers")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Notification sent to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneChange {
    /// Increments with every notification.
    pub nonce: u64,
    /// Layers touched since the previous notification, in order of first change.
    pub layer_ids: Vec<LayerId>,
}

type Listener = Box<dyn FnMut(&SceneChange)>;

#[derive(Serialize, Deserialize)]
struct SceneData {
    id: SceneId,
    layers: Vec<Layer>,
    #[serde(default)]
    config: EngineConfig,
}

/// Layer graph with an id index, shape cache and change notification.
pub struct Scene {
    id: SceneId,
    layers: Vec<Layer>,
    index: HashMap<LayerId, usize>,
    cache: ShapeCache,
    config: EngineConfig,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: ListenerId,
    batch_depth: usize,
    pending: Vec<LayerId>,
    pending_set: HashSet<LayerId>,
    nonce: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("layers", &self.layers.len())
            .field("listeners", &self.listeners.len())
            .field("nonce", &self.nonce)
            .finish()
    }
}

impl Scene {
    /// Create an empty scene with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            layers: Vec::new(),
            index: HashMap::new(),
            cache: ShapeCache::new(),
            config,
            listeners: Vec::new(),
            next_listener: 0,
            batch_depth: 0,
            pending: Vec::new(),
            pending_set: HashSet::new(),
            nonce: 0,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Notification counter.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// All layers in z-order, tombstones included.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Live layers in z-order, back to front.
    pub fn non_deleted_layers(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.layers.iter().filter(|layer| !layer.deleted)
    }

    /// Any layer by id, tombstones included.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.index.get(&id).and_then(|&i| self.layers.get(i))
    }

    /// A layer by id unless it is deleted.
    pub fn non_deleted_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layer(id).filter(|layer| !layer.deleted)
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Append a layer on top.
    pub fn insert_layer(&mut self, layer: Layer) -> SceneResult<()> {
        let len = self.layers.len();
        self.insert_layer_at(layer, len)
    }

    /// Insert a layer at a z-order position.
    pub fn insert_layer_at(&mut self, layer: Layer, index: usize) -> SceneResult<()> {
        if index > self.layers.len() {
            return Err(SceneError::IndexOutOfBounds {
                index,
                len: self.layers.len(),
            });
        }
        if self.index.contains_key(&layer.id) {
            return Err(SceneError::DuplicateId(layer.id));
        }
        let id = layer.id;
        self.layers.insert(index, layer);
        self.reindex_from(index);
        log::debug!("Inserted layer {id} at {index}");
        self.record_change(id);
        Ok(())
    }

    /// Replace every layer, keeping the given order.
    pub fn replace_all(&mut self, layers: Vec<Layer>) -> SceneResult<()> {
        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.id) {
                return Err(SceneError::DuplicateId(layer.id));
            }
        }
        self.layers = layers;
        self.cache.clear();
        self.index.clear();
        self.reindex_from(0);
        let ids: Vec<LayerId> = self.layers.iter().map(|layer| layer.id).collect();
        self.batch(|scene| {
            for id in ids {
                scene.record_change(id);
            }
        });
        Ok(())
    }

    /// Apply an update to a layer.
    ///
    /// Returns whether anything changed. Unknown ids are a no-op.
    pub fn mutate(&mut self, id: LayerId, update: LayerUpdate) -> bool {
        let Some(&i) = self.index.get(&id) else {
            return false;
        };
        let Some(layer) = self.layers.get_mut(i) else {
            return false;
        };
        let outcome = update.apply(layer);
        if outcome.changed && layer.deleted {
            self.cache.remove(id);
        } else if outcome.geometry_changed {
            self.cache.invalidate(id);
        }
        if outcome.changed {
            log::trace!("Mutated layer {id} (geometry: {})", outcome.geometry_changed);
            self.record_change(id);
        }
        outcome.changed
    }

    /// Run `f` with notifications collapsed into one.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Scene) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.flush();
        }
        result
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&SceneChange) + 'static) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Local-frame outline of a live layer.
    pub fn shape_outline(&self, id: LayerId) -> Option<BezPath> {
        self.non_deleted_layer(id).map(|layer| self.cache.get_or_build(layer))
    }

    pub fn cache(&self) -> &ShapeCache {
        &self.cache
    }

    /// Serialize the scene to JSON.
    pub fn to_json(&self) -> SceneResult<String> {
        let data = SceneData {
            id: self.id,
            layers: self.layers.clone(),
            config: self.config.clone(),
        };
        serde_json::to_string(&data).map_err(|e| SceneError::Serialization(e.to_string()))
    }

    /// Deserialize a scene from JSON.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let data: SceneData = serde_json::from_str(json).map_err(|e| SceneError::Serialization(e.to_string()))?;
        let mut scene = Self::with_config(data.config);
        scene.id = data.id;
        scene.replace_all(data.layers)?;
        Ok(scene)
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, layer) in self.layers.iter().enumerate().skip(start) {
            self.index.insert(layer.id, i);
        }
    }

    fn record_change(&mut self, id: LayerId) {
        if self.pending_set.insert(id) {
            self.pending.push(id);
        }
        if self.batch_depth == 0 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.nonce += 1;
        let change = SceneChange {
            nonce: self.nonce,
            layer_ids: std::mem::take(&mut self.pending),
        };
        self.pending_set.clear();
        log::trace!("Scene {} notifying {} changed layers", self.id, change.layer_ids.len());
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}
