//! Connector-to-shape bindings.
//!
//! A connector edge stores a [`PointBinding`] naming the shape it is attached
//! to, and the shape lists the connector in its `bound_layers`. Every function
//! here keeps the two sides in agreement.

use crate::config::BindingConfig;
use crate::geometry::collision::{self, HitCheck};
use crate::layers::{BoundLayer, BoundLayerKind, Edge, Layer, LayerId, LayerKind, LayerUpdate, PointBinding, linear};
use crate::scene::Scene;
use kurbo::Point;
use std::collections::{HashMap, HashSet};
use std::f64::consts::FRAC_1_SQRT_2;

/// Requested change for one connector edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSpec {
    /// Leave the edge as it is.
    Keep,
    /// Detach the edge.
    Unbind,
    /// Attach the edge to a shape.
    Bind(LayerId),
}

/// Edges of a connector that could newly bind to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibleEdges {
    Start,
    End,
    Both,
}

pub fn is_binding_enabled(scene: &Scene) -> bool {
    scene.config().binding.enabled
}

/// Width of the catch zone around a shape.
///
/// A quarter of the smaller side, clamped to the configured range. Diamonds
/// use their inscribed extent.
pub fn max_binding_gap(layer: &Layer, width: f64, height: f64, config: &BindingConfig) -> f64 {
    let ratio = if matches!(layer.kind, LayerKind::Diamond) {
        FRAC_1_SQRT_2
    } else {
        1.0
    };
    let smaller = ratio * width.abs().min(height.abs());
    (config.gap_size_factor * smaller).clamp(config.min_gap, config.max_gap)
}

/// Whether `point` lies outside the shape but inside its catch zone.
pub fn binding_border_test(layer: &Layer, point: Point, config: &BindingConfig) -> bool {
    let threshold = max_binding_gap(layer, layer.width, layer.height, config);
    collision::hit_test(layer, point, threshold, HitCheck::OutsideWithinGap, config.ellipse_iterations)
}

/// Topmost live bindable layer whose catch zone contains `point`.
pub fn hovered_layer_for_binding(scene: &Scene, point: Point, exclude: Option<LayerId>) -> Option<LayerId> {
    if !is_binding_enabled(scene) {
        return None;
    }
    let config = &scene.config().binding;
    scene
        .non_deleted_layers()
        .rev()
        .filter(|layer| Some(layer.id) != exclude && layer.is_bindable())
        .find(|layer| binding_border_test(layer, point, config))
        .map(|layer| layer.id)
}

fn edge_points(connector: &Layer, edge: Edge) -> Option<(Point, Point)> {
    let len = connector.linear()?.points.len();
    if len < 2 {
        return None;
    }
    let (edge_index, adjacent_index) = edge.point_indices(len);
    Some((
        linear::global_point(connector, edge_index)?,
        linear::global_point(connector, adjacent_index)?,
    ))
}

/// Shape the connector's edge could bind to at its current position.
pub fn eligible_layer_for_edge(scene: &Scene, linear_id: LayerId, edge: Edge) -> Option<LayerId> {
    let connector = scene.non_deleted_layer(linear_id)?;
    let (point, _) = edge_points(connector, edge)?;
    hovered_layer_for_binding(scene, point, Some(linear_id))
}

fn simple_and_bound_on_opposite_edge(connector: &Layer, shape_id: LayerId, edge: Edge) -> bool {
    connector.linear().is_some_and(|data| {
        data.is_simple() && data.binding(edge.opposite()).map(|b| b.layer_id) == Some(shape_id)
    })
}

/// Connectors with free edges in the shape's catch zone.
pub fn eligible_connectors_for_shape(scene: &Scene, shape_id: LayerId) -> Vec<(LayerId, EligibleEdges)> {
    if !is_binding_enabled(scene) {
        return Vec::new();
    }
    let Some(shape) = scene.non_deleted_layer(shape_id).filter(|layer| layer.is_bindable()) else {
        return Vec::new();
    };
    let config = &scene.config().binding;
    let can_bind = |connector: &Layer, edge: Edge| {
        connector.binding(edge).is_none()
            && !simple_and_bound_on_opposite_edge(connector, shape_id, edge)
            && edge_points(connector, edge).is_some_and(|(point, _)| binding_border_test(shape, point, config))
    };
    scene
        .non_deleted_layers()
        .filter(|layer| layer.is_linear())
        .filter_map(|connector| {
            match (can_bind(connector, Edge::Start), can_bind(connector, Edge::End)) {
                (true, true) => Some((connector.id, EligibleEdges::Both)),
                (true, false) => Some((connector.id, EligibleEdges::Start)),
                (false, true) => Some((connector.id, EligibleEdges::End)),
                (false, false) => None,
            }
        })
        .collect()
}

/// Layers that would take part in a binding if the selection were dropped now.
///
/// Selected connectors report shapes under their edges; selected shapes report
/// connectors that could attach to them. Selected layers are never reported.
pub fn eligible_bindings(scene: &Scene, selection: &[LayerId]) -> Vec<LayerId> {
    let selected: HashSet<LayerId> = selection.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for &id in selection {
        let Some(layer) = scene.non_deleted_layer(id) else {
            continue;
        };
        let candidates: Vec<LayerId> = if layer.is_linear() {
            [Edge::Start, Edge::End]
                .into_iter()
                .filter_map(|edge| eligible_layer_for_edge(scene, id, edge))
                .collect()
        } else if layer.is_bindable() {
            eligible_connectors_for_shape(scene, id)
                .into_iter()
                .map(|(connector, _)| connector)
                .collect()
        } else {
            Vec::new()
        };
        for candidate in candidates {
            if !selected.contains(&candidate) && seen.insert(candidate) {
                result.push(candidate);
            }
        }
    }
    result
}

/// Attach a connector edge to a shape at the edge's current position.
///
/// Returns `false` when either layer is missing, or when a two-point connector
/// would end up with both edges on the same shape. A shape the edge was bound
/// to before is released unless the other edge still holds it.
pub fn bind_linear_layer(scene: &mut Scene, linear_id: LayerId, shape_id: LayerId, edge: Edge) -> bool {
    let Some(connector) = scene.non_deleted_layer(linear_id) else {
        return false;
    };
    let Some(shape) = scene.non_deleted_layer(shape_id).filter(|layer| layer.is_bindable()) else {
        return false;
    };
    if simple_and_bound_on_opposite_edge(connector, shape_id, edge) {
        log::warn!("Refusing to bind both edges of {linear_id} to {shape_id}");
        return false;
    }
    let Some((edge_point, adjacent)) = edge_points(connector, edge) else {
        return false;
    };
    let opposite = connector.binding(edge.opposite()).map(|b| b.layer_id);
    let previous = connector
        .binding(edge)
        .map(|b| b.layer_id)
        .filter(|id| *id != shape_id && Some(*id) != opposite);
    let config = &scene.config().binding;
    let binding = PointBinding {
        layer_id: shape_id,
        focus: collision::determine_focus_distance(shape, adjacent, edge_point),
        gap: collision::distance_to_bindable_with(shape, edge_point, config.ellipse_iterations)
            .max(config.min_binding_gap),
    };
    let back_reference = (!shape.has_bound_layer(linear_id)).then(|| {
        let mut bound = shape.bound_layers.clone();
        bound.push(BoundLayer::arrow(linear_id));
        bound
    });

    log::debug!(
        "Binding {edge:?} of {linear_id} to {shape_id} (focus {:.3}, gap {:.2})",
        binding.focus,
        binding.gap
    );
    scene.batch(|scene| {
        scene.mutate(linear_id, LayerUpdate::new().binding(edge, Some(binding)));
        if let Some(bound) = back_reference {
            scene.mutate(shape_id, LayerUpdate::new().bound_layers(bound));
        }
        if let Some(previous) = previous {
            remove_bound_layer(scene, previous, linear_id);
        }
    });
    true
}

/// Detach a connector edge and return the shape it was bound to.
///
/// The shape's back-reference is left for the caller to clean up.
pub fn unbind_linear_layer(scene: &mut Scene, linear_id: LayerId, edge: Edge) -> Option<LayerId> {
    let previous = scene.non_deleted_layer(linear_id)?.binding(edge)?.layer_id;
    log::debug!("Unbinding {edge:?} of {linear_id} from {previous}");
    scene.mutate(linear_id, LayerUpdate::new().binding(edge, None));
    Some(previous)
}

fn remove_bound_layer(scene: &mut Scene, layer_id: LayerId, bound_id: LayerId) {
    let Some(layer) = scene.layer(layer_id) else {
        return;
    };
    if !layer.has_bound_layer(bound_id) {
        return;
    }
    let bound = layer
        .bound_layers
        .iter()
        .filter(|bound| bound.id != bound_id)
        .copied()
        .collect();
    scene.mutate(layer_id, LayerUpdate::new().bound_layers(bound));
}

/// Shape an edge ends up on when `spec` is honored. Binding to a missing or
/// unbindable layer leaves the edge as it is.
fn resolve_target(scene: &Scene, spec: BindingSpec, current: Option<LayerId>) -> Option<LayerId> {
    match spec {
        BindingSpec::Keep => current,
        BindingSpec::Unbind => None,
        BindingSpec::Bind(shape_id) => {
            if scene.non_deleted_layer(shape_id).is_some_and(Layer::is_bindable) {
                Some(shape_id)
            } else {
                current
            }
        }
    }
}

/// Drive both edges of a connector through bind or unbind.
///
/// Both requests are resolved against each other before anything is written,
/// so the rule that a two-point connector never has both edges on one shape
/// sees where each edge will end up. On a clash the start edge wins, unless
/// the end edge was asked to keep its binding. The losing edge stays where it
/// was, or comes loose if it was on the contested shape. Shapes that no
/// longer hold any edge lose their back-reference.
pub fn bind_or_unbind_linear_layer(scene: &mut Scene, linear_id: LayerId, start: BindingSpec, end: BindingSpec) {
    let Some(data) = scene.non_deleted_layer(linear_id).and_then(Layer::linear) else {
        return;
    };
    let current_start = data.start_binding.map(|b| b.layer_id);
    let current_end = data.end_binding.map(|b| b.layer_id);
    let mut start_target = resolve_target(scene, start, current_start);
    let mut end_target = resolve_target(scene, end, current_end);

    if data.is_simple() && start_target.is_some() && start_target == end_target {
        log::debug!("Both edges of {linear_id} resolve to {start_target:?}, start edge takes precedence");
        if end == BindingSpec::Keep {
            start_target = current_start.filter(|id| Some(*id) != end_target);
        } else {
            end_target = current_end.filter(|id| Some(*id) != start_target);
        }
    }

    let edges = [
        (Edge::Start, start, current_start, start_target),
        (Edge::End, end, current_end, end_target),
    ];
    scene.batch(|scene| {
        let mut released = HashSet::new();
        // clear edges leaving their shape first so binds only see final targets
        for (edge, _, current, target) in edges {
            if current.is_some() && current != target {
                released.extend(unbind_linear_layer(scene, linear_id, edge));
            }
        }
        for (edge, spec, _, target) in edges {
            if let Some(shape_id) = target.filter(|id| spec == BindingSpec::Bind(*id)) {
                bind_linear_layer(scene, linear_id, shape_id, edge);
            }
        }

        let still_bound: HashSet<LayerId> = scene
            .layer(linear_id)
            .and_then(Layer::linear)
            .map(|data| {
                [data.start_binding, data.end_binding]
                    .into_iter()
                    .flatten()
                    .map(|b| b.layer_id)
                    .collect()
            })
            .unwrap_or_default();
        for shape_id in released.difference(&still_bound) {
            remove_bound_layer(scene, *shape_id, linear_id);
        }
    });
}

/// Re-evaluate bindings after the selection was dropped.
///
/// Selected connectors bind each edge to the shape under it or come loose.
/// Selected shapes pick up connectors whose free edges touch their border.
pub fn bind_or_unbind_selected(scene: &mut Scene, selection: &[LayerId]) {
    scene.batch(|scene| {
        for &id in selection {
            let Some(layer) = scene.non_deleted_layer(id) else {
                continue;
            };
            if layer.is_linear() {
                let spec = |edge| {
                    eligible_layer_for_edge(scene, id, edge).map_or(BindingSpec::Unbind, BindingSpec::Bind)
                };
                let (start, end) = (spec(Edge::Start), spec(Edge::End));
                bind_or_unbind_linear_layer(scene, id, start, end);
            } else if layer.is_bindable() {
                for (connector, edges) in eligible_connectors_for_shape(scene, id) {
                    let start = match edges {
                        EligibleEdges::End => BindingSpec::Keep,
                        _ => BindingSpec::Bind(id),
                    };
                    let end = match edges {
                        EligibleEdges::Start => BindingSpec::Keep,
                        _ => BindingSpec::Bind(id),
                    };
                    bind_or_unbind_linear_layer(scene, connector, start, end);
                }
            }
        }
    });
}

/// Detach both edges of every given connector.
pub fn unbind_linear_layers(scene: &mut Scene, ids: &[LayerId]) {
    scene.batch(|scene| {
        for &id in ids {
            bind_or_unbind_linear_layer(scene, id, BindingSpec::Unbind, BindingSpec::Unbind);
        }
    });
}

/// Clear references to deleted layers from the layers that held them.
///
/// Only layers referenced by the deleted ones are visited.
pub fn repair_after_deletion(scene: &mut Scene, deleted_ids: &[LayerId]) {
    let deleted: HashSet<LayerId> = deleted_ids.iter().copied().collect();
    let mut affected: Vec<LayerId> = Vec::new();
    for id in deleted_ids {
        if let Some(layer) = scene.layer(*id) {
            for referenced in layer.referenced_ids() {
                if !deleted.contains(&referenced) && !affected.contains(&referenced) {
                    affected.push(referenced);
                }
            }
        }
    }
    log::debug!("Repairing {} layers after deleting {}", affected.len(), deleted.len());

    scene.batch(|scene| {
        for id in affected {
            let Some(layer) = scene.non_deleted_layer(id) else {
                continue;
            };
            let mut update = LayerUpdate::new();
            if layer.bound_layers.iter().any(|bound| deleted.contains(&bound.id)) {
                let kept = layer
                    .bound_layers
                    .iter()
                    .filter(|bound| !deleted.contains(&bound.id))
                    .copied()
                    .collect();
                update = update.bound_layers(kept);
            }
            for edge in [Edge::Start, Edge::End] {
                if layer.binding(edge).is_some_and(|b| deleted.contains(&b.layer_id)) {
                    update = update.binding(edge, None);
                }
            }
            if layer.container_id().is_some_and(|c| deleted.contains(&c)) {
                update = update.container_id(None);
            }
            if !update.is_empty() {
                scene.mutate(id, update);
            }
        }
    });
}

fn remap_binding(binding: Option<PointBinding>, id_map: &HashMap<LayerId, LayerId>) -> Option<PointBinding> {
    binding.map(|b| PointBinding {
        layer_id: id_map.get(&b.layer_id).copied().unwrap_or(b.layer_id),
        ..b
    })
}

/// Point duplicated layers at each other after a copy.
///
/// `old_layers` are the originals as they were copied and `id_map` maps each
/// original id to its duplicate. With `reverse_roles` the duplicates take over
/// the originals' external relationships, and connectors outside the copy are
/// repointed at the duplicates.
pub fn repair_after_duplication(
    scene: &mut Scene,
    old_layers: &[Layer],
    id_map: &HashMap<LayerId, LayerId>,
    reverse_roles: bool,
) {
    let mut connectors: Vec<LayerId> = Vec::new();
    let mut shapes: Vec<LayerId> = Vec::new();
    let push = |list: &mut Vec<LayerId>, id: LayerId| {
        if !list.contains(&id) {
            list.push(id);
        }
    };

    for old in old_layers {
        if !old.bound_layers.is_empty() {
            if reverse_roles {
                for bound in &old.bound_layers {
                    if !id_map.contains_key(&bound.id) {
                        push(&mut connectors, bound.id);
                    }
                }
            }
            if let Some(duplicate) = id_map.get(&old.id) {
                push(&mut shapes, *duplicate);
            }
        }
        if let Some(data) = old.linear() {
            let targets = [data.start_binding, data.end_binding];
            if reverse_roles {
                for binding in targets.iter().flatten() {
                    if !id_map.contains_key(&binding.layer_id) {
                        push(&mut shapes, binding.layer_id);
                    }
                }
            }
            if targets.iter().any(Option::is_some) {
                if let Some(duplicate) = id_map.get(&old.id) {
                    push(&mut connectors, *duplicate);
                }
            }
        }
    }

    scene.batch(|scene| {
        for &id in &connectors {
            let Some(data) = scene.layer(id).and_then(Layer::linear) else {
                continue;
            };
            let update = LayerUpdate::new()
                .binding(Edge::Start, remap_binding(data.start_binding, id_map))
                .binding(Edge::End, remap_binding(data.end_binding, id_map));
            scene.mutate(id, update);
        }
        for &id in &shapes {
            let Some(layer) = scene.layer(id) else {
                continue;
            };
            let bound = layer
                .bound_layers
                .iter()
                .map(|bound| BoundLayer {
                    id: id_map.get(&bound.id).copied().unwrap_or(bound.id),
                    kind: bound.kind,
                })
                .collect();
            scene.mutate(id, LayerUpdate::new().bound_layers(bound));
        }
        for old in old_layers {
            let (Some(container), Some(duplicate)) = (old.container_id(), id_map.get(&old.id)) else {
                continue;
            };
            let container = id_map.get(&container).copied().unwrap_or(container);
            scene.mutate(*duplicate, LayerUpdate::new().container_id(Some(container)));
        }

        let mut touched: Vec<LayerId> = id_map.values().copied().collect();
        if reverse_roles {
            touched.extend(id_map.keys().copied());
        }
        touched.extend(connectors.iter().copied());
        touched.extend(shapes.iter().copied());
        reconcile_back_references(scene, &touched);
    });
}

/// Make references among `ids` and their referents agree.
///
/// Connectors register with the shapes they are bound to. Back-references
/// whose referent does not point back are dropped, and text whose container
/// does not list it is released.
fn reconcile_back_references(scene: &mut Scene, ids: &[LayerId]) {
    for &id in ids {
        let Some(data) = scene.non_deleted_layer(id).and_then(Layer::linear) else {
            continue;
        };
        let targets: Vec<LayerId> = [data.start_binding, data.end_binding]
            .into_iter()
            .flatten()
            .map(|b| b.layer_id)
            .collect();
        for target in targets {
            let Some(shape) = scene.non_deleted_layer(target) else {
                continue;
            };
            if !shape.has_bound_layer(id) {
                let mut bound = shape.bound_layers.clone();
                bound.push(BoundLayer::arrow(id));
                scene.mutate(target, LayerUpdate::new().bound_layers(bound));
            }
        }
    }

    for &id in ids {
        let Some(layer) = scene.non_deleted_layer(id) else {
            continue;
        };
        let points_back = |bound: &BoundLayer| {
            scene.non_deleted_layer(bound.id).is_some_and(|referent| match bound.kind {
                BoundLayerKind::Arrow => [Edge::Start, Edge::End]
                    .into_iter()
                    .any(|edge| referent.binding(edge).is_some_and(|b| b.layer_id == id)),
                BoundLayerKind::Text => referent.container_id() == Some(id),
            })
        };
        let kept: Vec<BoundLayer> = layer.bound_layers.iter().filter(|b| points_back(*b)).copied().collect();
        if kept.len() != layer.bound_layers.len() {
            log::debug!("Dropping {} stale back-references from {id}", layer.bound_layers.len() - kept.len());
            scene.mutate(id, LayerUpdate::new().bound_layers(kept));
        }
    }

    for &id in ids {
        let Some(container_id) = scene.non_deleted_layer(id).and_then(Layer::container_id) else {
            continue;
        };
        if !scene.non_deleted_layer(container_id).is_some_and(|c| c.has_bound_layer(id)) {
            scene.mutate(id, LayerUpdate::new().container_id(None));
        }
    }
}
