//! Derived outline cache keyed by layer id and generation.

use crate::geometry::outline;
use crate::layers::{Layer, LayerId};
use kurbo::BezPath;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct CachedShape {
    generation: u64,
    path: BezPath,
}

/// Outline paths in each layer's local frame.
///
/// Entries are valid while their generation matches the layer's current
/// generation. Invalidation bumps the generation and leaves the stale entry to
/// be rebuilt on next access.
#[derive(Debug, Default)]
pub struct ShapeCache {
    entries: RwLock<HashMap<LayerId, CachedShape>>,
    generations: HashMap<LayerId, u64>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation of a layer's outline.
    pub fn generation(&self, id: LayerId) -> u64 {
        self.generations.get(&id).copied().unwrap_or(0)
    }

    pub fn invalidate(&mut self, id: LayerId) {
        *self.generations.entry(id).or_insert(0) += 1;
    }

    pub fn remove(&mut self, id: LayerId) {
        self.generations.remove(&id);
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&id);
        }
    }

    /// Number of stored outlines, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.generations.clear();
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Whether an up-to-date outline is stored for the layer.
    pub fn is_fresh(&self, id: LayerId) -> bool {
        let generation = self.generation(id);
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&id).map(|entry| entry.generation == generation))
            .unwrap_or(false)
    }

    /// Stored outline, rebuilt when stale.
    pub fn get_or_build(&self, layer: &Layer) -> BezPath {
        let generation = self.generation(layer.id);
        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&layer.id) {
                if entry.generation == generation {
                    return entry.path.clone();
                }
            }
        }
        let path = outline(layer);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                layer.id,
                CachedShape {
                    generation,
                    path: path.clone(),
                },
            );
        }
        path
    }
}
