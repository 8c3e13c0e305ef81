//! Rotation of single layers and selections.

use super::{TransformState, UpdateOptions, update_bound_layers};
use crate::geometry::{normalize_angle, rotate_point};
use crate::layers::{Layer, LayerId, LayerUpdate};
use crate::scene::Scene;
use crate::text::TextLayout;
use crate::text::container::update_bound_text_position;
use kurbo::Point;
use std::collections::{HashMap, HashSet};
use std::f64::consts::FRAC_PI_2;

fn pointer_angle(center: Point, pointer: Point) -> f64 {
    (pointer.y - center.y).atan2(pointer.x - center.x)
}

fn snap_angle(angle: f64, step: f64) -> f64 {
    if step > 0.0 {
        (angle / step).round() * step
    } else {
        angle
    }
}

/// Point a layer's top at `pointer`, rotating around its center.
///
/// With `discrete` the angle snaps to the configured step. Bound text takes
/// the container's angle and bound connectors are re-anchored.
pub fn rotate_single_layer(scene: &mut Scene, layout: &TextLayout, id: LayerId, pointer: Point, discrete: bool) -> bool {
    let Some(layer) = scene.non_deleted_layer(id) else {
        return false;
    };
    if layer.container_id().is_some() {
        return false;
    }
    // Offset so 0 is up
    let mut angle = pointer_angle(layer.center(), pointer) + FRAC_PI_2;
    if discrete {
        angle = snap_angle(angle, scene.config().transform.angle_snap_step);
    }
    let angle = normalize_angle(angle);

    scene.batch(|scene| {
        scene.mutate(id, LayerUpdate::new().angle(angle));
        update_bound_text_position(scene, id);
        update_bound_layers(scene, layout, id, &UpdateOptions::new());
    });
    true
}

/// In-progress rotation of a selection around its common center.
#[derive(Debug, Clone)]
pub struct MultiRotateState {
    /// Center of the selection's rotated bounds at the start.
    pub centroid: Point,
    /// Pointer angle around the centroid at the start.
    pub start_angle: f64,
    pub original_layers: HashMap<LayerId, Layer>,
}

impl MultiRotateState {
    /// Capture a selection. `None` when nothing in it can rotate.
    pub fn new(scene: &Scene, ids: &[LayerId], pointer: Point) -> Option<Self> {
        let state = TransformState::new(scene, ids, pointer);
        let bounds = ids
            .iter()
            .filter_map(|id| state.original_layers.get(id))
            .filter(|layer| layer.container_id().is_none())
            .map(Layer::rotated_bounds)
            .reduce(|acc, rect| acc.union(rect))?;
        let centroid = bounds.center();
        Some(Self {
            centroid,
            start_angle: pointer_angle(centroid, pointer),
            original_layers: state.original_layers,
        })
    }

    /// Rotate every layer by the pointer's angular travel since the start.
    pub fn apply(&self, scene: &mut Scene, layout: &TextLayout, pointer: Point, discrete: bool) -> bool {
        let mut delta = pointer_angle(self.centroid, pointer) - self.start_angle;
        if discrete {
            delta = snap_angle(delta, scene.config().transform.angle_snap_step);
        }
        let rotated: Vec<&Layer> = self
            .original_layers
            .values()
            .filter(|layer| layer.container_id().is_none())
            .collect();
        if rotated.is_empty() {
            return false;
        }
        let ids: HashSet<LayerId> = rotated.iter().map(|layer| layer.id).collect();

        scene.batch(|scene| {
            for original in &rotated {
                let center = original.center();
                let shift = rotate_point(center, self.centroid, delta) - center;
                let angle = normalize_angle(original.angle + delta);
                scene.mutate(
                    original.id,
                    LayerUpdate::new()
                        .position(original.x + shift.x, original.y + shift.y)
                        .angle(angle),
                );
                if original.is_arrow() {
                    update_bound_text_position(scene, original.id);
                } else if let Some(text) = original.bound_text_id().and_then(|text_id| self.original_layers.get(&text_id)) {
                    scene.mutate(
                        text.id,
                        LayerUpdate::new().position(text.x + shift.x, text.y + shift.y).angle(angle),
                    );
                }
            }
            let options = UpdateOptions::new().simultaneously_updated(ids);
            for original in &rotated {
                update_bound_layers(scene, layout, original.id, &options);
            }
        });
        true
    }
}
