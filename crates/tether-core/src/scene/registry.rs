//! Explicit layer-to-scene lookup.

use super::{Scene, SceneError, SceneId, SceneResult};
use crate::layers::LayerId;
use std::collections::HashMap;

/// Owns scenes and resolves which scene a layer id lives in.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scenes: HashMap<SceneId, Scene>,
    owners: HashMap<LayerId, SceneId>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a scene and index its layers.
    pub fn insert(&mut self, scene: Scene) -> SceneId {
        let id = scene.id();
        for layer in scene.layers() {
            self.owners.insert(layer.id, id);
        }
        self.scenes.insert(id, scene);
        id
    }

    pub fn remove(&mut self, id: SceneId) -> Option<Scene> {
        self.owners.retain(|_, owner| *owner != id);
        self.scenes.remove(&id)
    }

    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(&id)
    }

    pub fn scene_mut(&mut self, id: SceneId) -> Option<&mut Scene> {
        self.scenes.get_mut(&id)
    }

    /// Re-index a scene after layers were added to it.
    pub fn refresh(&mut self, id: SceneId) -> SceneResult<()> {
        let scene = self.scenes.get(&id).ok_or(SceneError::UnknownScene(id))?;
        self.owners.retain(|_, owner| *owner != id);
        for layer in scene.layers() {
            self.owners.insert(layer.id, id);
        }
        Ok(())
    }

    pub fn scene_of(&self, layer_id: LayerId) -> Option<SceneId> {
        self.owners.get(&layer_id).copied()
    }

    pub fn scene_for_layer(&self, layer_id: LayerId) -> SceneResult<&Scene> {
        self.scene_of(layer_id)
            .and_then(|id| self.scenes.get(&id))
            .ok_or(SceneError::NotFound(layer_id))
    }

    pub fn scene_for_layer_mut(&mut self, layer_id: LayerId) -> SceneResult<&mut Scene> {
        let id = self.scene_of(layer_id).ok_or(SceneError::NotFound(layer_id))?;
        self.scenes.get_mut(&id).ok_or(SceneError::UnknownScene(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Layer, LayerUpdate};

    #[test]
    fn test_independent_scenes() {
        let mut registry = SceneRegistry::new();
        let mut first = Scene::new();
        let mut second = Scene::new();
        let a = Layer::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = Layer::rectangle(0.0, 0.0, 10.0, 10.0);
        let (a_id, b_id) = (a.id, b.id);
        first.insert_layer(a).unwrap();
        second.insert_layer(b).unwrap();
        let first_id = registry.insert(first);
        let second_id = registry.insert(second);

        assert_eq!(registry.scene_of(a_id), Some(first_id));
        assert_eq!(registry.scene_of(b_id), Some(second_id));

        let scene = registry.scene_for_layer_mut(b_id).unwrap();
        assert!(scene.mutate(b_id, LayerUpdate::new().position(3.0, 4.0)));
        assert!(scene.layer(a_id).is_none());
    }

    #[test]
    fn test_refresh_picks_up_new_layers() {
        let mut registry = SceneRegistry::new();
        let id = registry.insert(Scene::new());
        let rect = Layer::rectangle(0.0, 0.0, 1.0, 1.0);
        let rect_id = rect.id;
        registry.scene_mut(id).unwrap().insert_layer(rect).unwrap();
        assert!(matches!(registry.scene_for_layer(rect_id), Err(SceneError::NotFound(_))));

        registry.refresh(id).unwrap();
        assert_eq!(registry.scene_for_layer(rect_id).unwrap().id(), id);
    }

    #[test]
    fn test_remove_scene() {
        let mut registry = SceneRegistry::new();
        let mut scene = Scene::new();
        let rect = Layer::rectangle(0.0, 0.0, 1.0, 1.0);
        let rect_id = rect.id;
        scene.insert_layer(rect).unwrap();
        let id = registry.insert(scene);
        assert!(registry.remove(id).is_some());
        assert_eq!(registry.scene_of(rect_id), None);
        assert!(matches!(registry.refresh(id), Err(SceneError::UnknownScene(_))));
    }
}
