//! Moves, resizes and rotations, and the updates they cascade to bound layers.

mod resize;
mod rotate;

pub use resize::{ResizeModifiers, get_perfect_layer_size, resize_multiple_layers, resize_single_layer};
pub use rotate::{MultiRotateState, rotate_single_layer};

use crate::binding::max_binding_gap;
use crate::geometry::collision;
use crate::layers::{BoundLayerKind, Edge, Layer, LayerId, LayerUpdate, PointBinding, linear};
use crate::scene::Scene;
use crate::text::TextLayout;
use crate::text::container::handle_bind_text_resize;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Resize handle on a selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformHandle {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TransformHandle {
    pub fn is_corner(self) -> bool {
        matches!(
            self,
            TransformHandle::TopLeft | TransformHandle::TopRight | TransformHandle::BottomLeft | TransformHandle::BottomRight
        )
    }

    pub fn has_top(self) -> bool {
        matches!(self, TransformHandle::Top | TransformHandle::TopLeft | TransformHandle::TopRight)
    }

    pub fn has_bottom(self) -> bool {
        matches!(self, TransformHandle::Bottom | TransformHandle::BottomLeft | TransformHandle::BottomRight)
    }

    pub fn has_left(self) -> bool {
        matches!(self, TransformHandle::Left | TransformHandle::TopLeft | TransformHandle::BottomLeft)
    }

    pub fn has_right(self) -> bool {
        matches!(self, TransformHandle::Right | TransformHandle::TopRight | TransformHandle::BottomRight)
    }
}

/// Snapshot taken when a transform gesture starts.
#[derive(Debug, Clone)]
pub struct TransformState {
    /// Pointer position when the gesture started.
    pub start_point: Point,
    /// Latest pointer position.
    pub current_point: Point,
    /// Layers as they were at the start, bound text included.
    pub original_layers: HashMap<LayerId, Layer>,
}

impl TransformState {
    /// Capture the given layers and the text bound to them.
    pub fn new(scene: &Scene, ids: &[LayerId], start_point: Point) -> Self {
        let mut original_layers = HashMap::new();
        for id in ids {
            let Some(layer) = scene.non_deleted_layer(*id) else {
                continue;
            };
            if let Some(text) = layer.bound_text_id().and_then(|text_id| scene.non_deleted_layer(text_id)) {
                original_layers.insert(text.id, text.clone());
            }
            original_layers.insert(layer.id, layer.clone());
        }
        Self {
            start_point,
            current_point: start_point,
            original_layers,
        }
    }

    /// Get the drag delta.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.original_layers.keys().copied().collect()
    }
}

/// What changed about a shape whose bound connectors need updating.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Size before the change, when the shape was resized.
    pub old_size: Option<Size>,
    /// Size after the change.
    pub new_size: Option<Size>,
    /// Layers moved by the same gesture.
    pub simultaneously_updated: HashSet<LayerId>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resized(mut self, old_size: Size, new_size: Size) -> Self {
        self.old_size = Some(old_size);
        self.new_size = Some(new_size);
        self
    }

    pub fn simultaneously_updated(mut self, ids: impl IntoIterator<Item = LayerId>) -> Self {
        self.simultaneously_updated = ids.into_iter().collect();
        self
    }
}

/// Gap scaled with the shape's smaller side, kept between the floor and the catch zone.
fn rescaled_gap(gap: f64, old_size: Size, new_size: Size, max_gap: f64, min_gap: f64) -> f64 {
    let ratio = if new_size.width < new_size.height {
        new_size.width / old_size.width
    } else {
        new_size.height / old_size.height
    };
    let next = gap * ratio;
    if next.is_finite() {
        next.min(max_gap).max(min_gap)
    } else {
        gap
    }
}

/// New scene position of a bound edge.
///
/// The stored focus is re-projected onto the shape as seen from the adjacent
/// point, then pushed out to the stored gap.
fn bound_edge_point(connector: &Layer, shape: &Layer, edge: Edge, binding: &PointBinding) -> Option<(usize, Point)> {
    let len = connector.linear()?.points.len();
    if len < 2 {
        return None;
    }
    let (index, adjacent_index) = edge.point_indices(len);
    let adjacent = linear::global_point(connector, adjacent_index)?;
    let focus_point = collision::determine_focus_point(shape, binding.focus, adjacent);
    if binding.gap == 0.0 {
        return Some((index, focus_point));
    }
    let point = collision::intersect_layer_with_line(shape, adjacent, focus_point, binding.gap)
        .first()
        .copied()
        .unwrap_or(focus_point);
    Some((index, point))
}

/// Bring connectors bound to a changed shape back onto it.
///
/// On a resize the stored gaps of edges bound to the shape are rescaled.
/// Connectors moved by the same gesture only take the new gaps; the others
/// have their edges on this shape recomputed and their labels re-laid out.
pub fn update_bound_layers(scene: &mut Scene, layout: &TextLayout, changed_id: LayerId, options: &UpdateOptions) {
    let Some(changed) = scene.non_deleted_layer(changed_id) else {
        return;
    };
    let connector_ids: Vec<LayerId> = changed
        .bound_layers
        .iter()
        .filter(|bound| bound.kind == BoundLayerKind::Arrow)
        .map(|bound| bound.id)
        .collect();
    if connector_ids.is_empty() {
        return;
    }
    let config = &scene.config().binding;
    let resize = match (options.old_size, options.new_size) {
        (Some(old_size), Some(new_size)) => Some((
            old_size,
            new_size,
            max_binding_gap(changed, new_size.width, new_size.height, config),
            config.min_binding_gap,
        )),
        _ => None,
    };
    let shape = changed.clone();

    scene.batch(|scene| {
        for connector_id in connector_ids {
            let Some(connector) = scene.non_deleted_layer(connector_id).filter(|layer| layer.is_linear()) else {
                continue;
            };
            let Some(data) = connector.linear() else {
                continue;
            };
            let mut bindings = [(Edge::Start, data.start_binding), (Edge::End, data.end_binding)];
            let mut update = LayerUpdate::new();
            if let Some((old_size, new_size, max_gap, min_gap)) = resize {
                for (edge, binding) in bindings.iter_mut() {
                    if let Some(binding) = binding.as_mut().filter(|b| b.layer_id == changed_id) {
                        binding.gap = rescaled_gap(binding.gap, old_size, new_size, max_gap, min_gap);
                        update = update.binding(*edge, Some(*binding));
                    }
                }
            }

            if options.simultaneously_updated.contains(&connector_id) {
                if !update.is_empty() {
                    scene.mutate(connector_id, update);
                }
                continue;
            }

            let moves: Vec<(usize, Point)> = bindings
                .iter()
                .filter_map(|(edge, binding)| {
                    let binding = binding.as_ref().filter(|b| b.layer_id == changed_id)?;
                    bound_edge_point(connector, &shape, *edge, binding)
                })
                .collect();
            if let Some(moved) = linear::move_points(connector, &moves) {
                update.x = moved.x;
                update.y = moved.y;
                update.points = moved.points;
            }
            log::trace!("Re-anchoring {} edges of {connector_id} on {changed_id}", moves.len());
            if !update.is_empty() {
                scene.mutate(connector_id, update);
            }
            handle_bind_text_resize(scene, layout, connector_id, None, false);
        }
    });
}

/// Translate layers with their bound text and re-anchor connectors bound to them.
pub fn drag_selected_layers(scene: &mut Scene, layout: &TextLayout, ids: &[LayerId], offset: Vec2) {
    let mut moved: Vec<LayerId> = Vec::new();
    for id in ids {
        let Some(layer) = scene.non_deleted_layer(*id) else {
            continue;
        };
        if !moved.contains(id) {
            moved.push(*id);
        }
        if let Some(text_id) = layer.bound_text_id() {
            if !moved.contains(&text_id) {
                moved.push(text_id);
            }
        }
    }

    scene.batch(|scene| {
        for id in &moved {
            let Some(layer) = scene.non_deleted_layer(*id) else {
                continue;
            };
            let update = LayerUpdate::new().position(layer.x + offset.x, layer.y + offset.y);
            scene.mutate(*id, update);
        }
        let options = UpdateOptions::new().simultaneously_updated(moved.iter().copied());
        for id in &moved {
            update_bound_layers(scene, layout, *id, &options);
        }
    });
}
