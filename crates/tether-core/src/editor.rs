//! Editor state and the edits that span bindings, text and transforms.

use crate::binding::{bind_or_unbind_selected, repair_after_deletion, repair_after_duplication};
use crate::config::EngineConfig;
use crate::layers::{BoundLayer, GroupId, Layer, LayerId, LayerUpdate, TextAlign, VerticalAlign};
use crate::scene::{Scene, SceneError, SceneResult};
use crate::text::TextLayout;
use crate::text::container::{auto_fit_container, redraw_text_bounding_box, refresh_text};
use crate::transform::{UpdateOptions, drag_selected_layers, update_bound_layers};
use kurbo::{Size, Vec2};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A scene together with the text layout engine measuring its text.
#[derive(Debug, Default)]
pub struct Editor {
    pub scene: Scene,
    pub layout: TextLayout,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            scene: Scene::with_config(config),
            layout: TextLayout::default(),
        }
    }

    pub fn with_layout(scene: Scene, layout: TextLayout) -> Self {
        Self { scene, layout }
    }

    /// Add a layer on top. Text layers are measured on the way in.
    pub fn add_layer(&mut self, layer: Layer) -> SceneResult<LayerId> {
        let id = layer.id;
        let is_text = layer.text_data().is_some();
        self.scene.insert_layer(layer)?;
        if is_text {
            refresh_text(&mut self.scene, &self.layout, id);
        }
        Ok(id)
    }

    /// Layers in `ids` plus their bound text, in z-order.
    fn with_bound_text(&self, ids: &[LayerId]) -> Vec<LayerId> {
        let mut wanted: HashSet<LayerId> = HashSet::new();
        for id in ids {
            if let Some(layer) = self.scene.non_deleted_layer(*id) {
                wanted.insert(layer.id);
                wanted.extend(layer.bound_text_id());
            }
        }
        self.scene
            .non_deleted_layers()
            .filter(|layer| wanted.contains(&layer.id))
            .map(|layer| layer.id)
            .collect()
    }

    /// Delete layers with their bound text and clear every reference to them.
    ///
    /// Returns the ids actually deleted.
    pub fn delete_layers(&mut self, ids: &[LayerId]) -> Vec<LayerId> {
        let doomed = self.with_bound_text(ids);
        if doomed.is_empty() {
            return doomed;
        }
        log::debug!("Deleting {} layers", doomed.len());
        self.scene.batch(|scene| {
            for id in &doomed {
                scene.mutate(*id, LayerUpdate::new().deleted(true));
            }
            repair_after_deletion(scene, &doomed);
        });
        doomed
    }

    /// Copies of `ids` with fresh ids and group ids, moved by `offset`.
    fn copies(&self, ids: &[LayerId], offset: Vec2) -> (Vec<Layer>, Vec<Layer>, HashMap<LayerId, LayerId>) {
        let originals: Vec<Layer> = self
            .with_bound_text(ids)
            .into_iter()
            .filter_map(|id| self.scene.layer(id).cloned())
            .collect();
        let mut groups: HashMap<GroupId, GroupId> = HashMap::new();
        let mut id_map = HashMap::new();
        let copies = originals
            .iter()
            .map(|original| {
                let mut copy = original.duplicate();
                copy.x += offset.x;
                copy.y += offset.y;
                copy.group_ids = original
                    .group_ids
                    .iter()
                    .map(|group| *groups.entry(*group).or_insert_with(Uuid::new_v4))
                    .collect();
                id_map.insert(original.id, copy.id);
                copy
            })
            .collect();
        (originals, copies, id_map)
    }

    /// Duplicate layers on top of the scene, bound text included.
    ///
    /// Bindings among the copies are repointed at each other. Returns the map
    /// from original to duplicate id.
    pub fn duplicate_layers(&mut self, ids: &[LayerId], offset: Vec2) -> SceneResult<HashMap<LayerId, LayerId>> {
        let (originals, copies, id_map) = self.copies(ids, offset);
        self.scene.batch(|scene| {
            for copy in copies {
                scene.insert_layer(copy)?;
            }
            repair_after_duplication(scene, &originals, &id_map, false);
            Ok::<(), SceneError>(())
        })?;
        Ok(id_map)
    }

    /// Leave a copy in place under each layer about to be alt-dragged.
    ///
    /// The copies take over the originals' external connections, since they
    /// are what stays where the originals were.
    pub fn duplicate_for_alt_drag(&mut self, ids: &[LayerId]) -> SceneResult<HashMap<LayerId, LayerId>> {
        let (originals, copies, id_map) = self.copies(ids, Vec2::ZERO);
        self.scene.batch(|scene| {
            for (original, copy) in originals.iter().zip(copies) {
                let index = scene.layer_index(original.id).ok_or(SceneError::NotFound(original.id))?;
                scene.insert_layer_at(copy, index)?;
            }
            repair_after_duplication(scene, &originals, &id_map, true);
            Ok::<(), SceneError>(())
        })?;
        Ok(id_map)
    }

    /// Move layers and re-anchor connectors bound to them.
    pub fn drag_layers(&mut self, ids: &[LayerId], offset: Vec2) {
        drag_selected_layers(&mut self.scene, &self.layout, ids, offset);
    }

    /// Settle bindings at the end of a gesture.
    pub fn finish_transform(&mut self, ids: &[LayerId]) {
        bind_or_unbind_selected(&mut self.scene, ids);
    }

    /// Put a free text layer inside a container.
    ///
    /// Fails when either layer is missing, the text is already bound, or the
    /// container cannot hold text or already holds some.
    pub fn bind_text_to_container(&mut self, text_id: LayerId, container_id: LayerId) -> bool {
        let Some(text) = self.scene.non_deleted_layer(text_id) else {
            return false;
        };
        if text.text_data().is_none() || text.container_id().is_some() {
            return false;
        }
        let Some(container) = self.scene.non_deleted_layer(container_id) else {
            return false;
        };
        if !container.is_text_container() || container.bound_text_id().is_some() {
            return false;
        }
        let mut bound = container.bound_layers.clone();
        bound.push(BoundLayer::text(text_id));

        let layout = &self.layout;
        self.scene.batch(|scene| {
            scene.mutate(
                text_id,
                LayerUpdate::new()
                    .container_id(Some(container_id))
                    .text_align(TextAlign::Center)
                    .vertical_align(VerticalAlign::Middle),
            );
            scene.mutate(container_id, LayerUpdate::new().bound_layers(bound));
            redraw_text_bounding_box(scene, layout, text_id)
        })
    }

    /// Replace a text layer's content and re-lay it out.
    ///
    /// Bound text re-wraps and its container grows or shrinks to fit. Free
    /// text re-anchors connectors bound to it.
    pub fn update_text(&mut self, text_id: LayerId, content: &str) -> bool {
        let Some(text) = self.scene.non_deleted_layer(text_id) else {
            return false;
        };
        if text.text_data().is_none() {
            return false;
        }
        let container_id = text.container_id();
        let old_size = Size::new(text.width, text.height);

        let layout = &self.layout;
        self.scene.batch(|scene| {
            let update = match container_id {
                Some(_) => LayerUpdate::new().original_text(content),
                None => LayerUpdate::new().text(content).original_text(content),
            };
            scene.mutate(text_id, update);
            let Some(metrics) = refresh_text(scene, layout, text_id) else {
                return false;
            };
            match container_id {
                Some(container_id) => {
                    auto_fit_container(scene, layout, container_id);
                }
                None => {
                    let options = UpdateOptions::new().resized(old_size, Size::new(metrics.width, metrics.height));
                    update_bound_layers(scene, layout, text_id, &options);
                }
            }
            true
        })
    }
}
