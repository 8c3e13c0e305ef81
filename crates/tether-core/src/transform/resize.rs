//! Resizing single layers and selections.

use super::{TransformHandle, UpdateOptions, update_bound_layers};
use crate::geometry::{normalize_angle, rotate_point};
use crate::layers::{Layer, LayerId, LayerKind, LayerUpdate, linear};
use crate::scene::Scene;
use crate::text::TextLayout;
use crate::text::container::{
    compute_bound_text_position, handle_bind_text_resize, max_container_width, measure_font_size_from_width,
    min_container_size,
};
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::{HashMap, HashSet};
use std::f64::consts::FRAC_PI_2;

/// Keyboard modifiers held during a resize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeModifiers {
    pub keep_aspect_ratio: bool,
    pub from_center: bool,
}

/// Snap a drawn size to a locked angle.
///
/// Lines and arrows snap their slope to multiples of `step`, collapsing to
/// horizontal or vertical. Other shapes become squares.
pub fn get_perfect_layer_size(kind: &LayerKind, width: f64, height: f64, step: f64) -> Size {
    let abs_width = width.abs();
    let abs_height = height.abs();
    if !matches!(kind, LayerKind::Line(_) | LayerKind::Arrow(_)) {
        return Size::new(width, abs_width * height.signum());
    }
    if abs_width == 0.0 && abs_height == 0.0 || step <= 0.0 {
        return Size::new(width, height);
    }
    let locked = ((abs_height / abs_width).atan() / step).round() * step;
    if locked == 0.0 {
        Size::new(width, 0.0)
    } else if (locked - FRAC_PI_2).abs() < 1e-9 {
        Size::new(0.0, height)
    } else {
        Size::new(width, abs_width * locked.tan() * height.signum())
    }
}

/// Top-left of the resized box in the unrotated frame.
///
/// The edge or corner opposite the handle stays fixed in scene space, or the
/// center when resizing from it. `new_bounds` is signed; a negative side
/// means the box flipped over its anchor.
fn anchored_top_left(
    bounds: Rect,
    new_bounds: Size,
    flipped: (bool, bool),
    handle: TransformHandle,
    modifiers: ResizeModifiers,
    angle: f64,
) -> Point {
    let start_center = bounds.center();
    let abs_width = new_bounds.width.abs();
    let abs_height = new_bounds.height.abs();
    let mut top_left = Point::new(bounds.x0, bounds.y0);
    match handle {
        TransformHandle::Top | TransformHandle::Left | TransformHandle::TopLeft => {
            top_left = Point::new(bounds.x1 - abs_width, bounds.y1 - abs_height);
        }
        TransformHandle::TopRight => top_left.y = bounds.y1 - abs_height,
        TransformHandle::BottomLeft => top_left.x = bounds.x1 - abs_width,
        _ => {}
    }

    if modifiers.keep_aspect_ratio {
        if matches!(handle, TransformHandle::Top | TransformHandle::Bottom) {
            top_left.x = start_center.x - new_bounds.width / 2.0;
        }
        if matches!(handle, TransformHandle::Left | TransformHandle::Right) {
            top_left.y = start_center.y - new_bounds.height / 2.0;
        }
    }
    if flipped.0 {
        if handle.has_right() {
            top_left.x -= abs_width;
        }
        if handle.has_left() {
            top_left.x += abs_width;
        }
    }
    if flipped.1 {
        if handle.has_bottom() {
            top_left.y -= abs_height;
        }
        if handle.has_top() {
            top_left.y += abs_height;
        }
    }
    if modifiers.from_center {
        top_left = Point::new(start_center.x - abs_width / 2.0, start_center.y - abs_height / 2.0);
    }

    // re-pivot so the anchor keeps its rotated position
    let rotated_top_left = rotate_point(top_left, start_center, angle);
    let new_center = Point::new(top_left.x + abs_width / 2.0, top_left.y + abs_height / 2.0);
    let rotated_center = rotate_point(new_center, start_center, angle);
    rotate_point(rotated_top_left, rotated_center, -angle)
}

/// Resize one layer by dragging `handle` to `pointer`.
///
/// Works from the layer's state in `originals`, so repeated calls during a
/// gesture do not accumulate. Returns false, leaving the scene untouched,
/// when the resize would collapse the layer or shrink its text below the
/// minimum font size.
pub fn resize_single_layer(
    scene: &mut Scene,
    layout: &TextLayout,
    originals: &HashMap<LayerId, Layer>,
    id: LayerId,
    handle: TransformHandle,
    pointer: Point,
    modifiers: ResizeModifiers,
) -> bool {
    let Some(original) = originals.get(&id) else {
        return false;
    };
    let Some(current) = scene.non_deleted_layer(id) else {
        return false;
    };
    if original.text_data().is_some() {
        if original.container_id().is_some() {
            return false;
        }
        return resize_free_text(scene, layout, original, handle, pointer, modifiers);
    }
    let current_size = Size::new(current.width, current.height);
    let text_config = scene.config().text.clone();
    let snap_step = scene.config().transform.angle_snap_step;

    let bounds = original.bounds();
    let pointer = rotate_point(pointer, bounds.center(), -original.angle);
    let (bounds_width, bounds_height) = (bounds.width(), bounds.height());
    let mut scale_x = 1.0;
    let mut scale_y = 1.0;
    if bounds_width > 0.0 {
        if handle.has_right() {
            scale_x = (pointer.x - bounds.x0) / bounds_width;
        }
        if handle.has_left() {
            scale_x = (bounds.x1 - pointer.x) / bounds_width;
        }
    }
    if bounds_height > 0.0 {
        if handle.has_bottom() {
            scale_y = (pointer.y - bounds.y0) / bounds_height;
        }
        if handle.has_top() {
            scale_y = (bounds.y1 - pointer.y) / bounds_height;
        }
    }

    let mut new_width = original.width * scale_x;
    let mut new_height = original.height * scale_y;
    if modifiers.from_center {
        new_width = 2.0 * new_width - original.width;
        new_height = 2.0 * new_height - original.height;
    }

    let two_point = original.linear().is_some_and(|data| data.points.len() == 2);
    let mut snapped = false;
    if modifiers.keep_aspect_ratio {
        if two_point && handle.is_corner() {
            let perfect = get_perfect_layer_size(&original.kind, new_width, new_height, snap_step);
            new_width = perfect.width;
            new_height = perfect.height;
            snapped = true;
        } else if original.width > 0.0 && original.height > 0.0 {
            let width_ratio = new_width.abs() / original.width;
            let height_ratio = new_height.abs() / original.height;
            if handle.is_corner() {
                let ratio = width_ratio.max(height_ratio);
                new_width = original.width * ratio * new_width.signum();
                new_height = original.height * ratio * new_height.signum();
            } else {
                new_height *= width_ratio;
                new_width *= height_ratio;
            }
        }
    }

    let mut text_font: Option<(LayerId, f64)> = None;
    if let Some(text) = current.bound_text_id().and_then(|text_id| scene.non_deleted_layer(text_id)) {
        if modifiers.keep_aspect_ratio {
            let mut resized = current.clone();
            resized.width = new_width.abs();
            resized.height = new_height.abs();
            let next_width = max_container_width(&resized, Some(text), &text_config);
            let Some(font_size) = measure_font_size_from_width(text, Some(current), next_width, &text_config) else {
                log::debug!("Resize of {id} rejected, bound text would be too small");
                return false;
            };
            text_font = Some((text.id, font_size));
        } else {
            let min = min_container_size(layout, current, text, &text_config);
            new_width = new_width.signum() * new_width.abs().max(min.width).ceil();
            new_height = new_height.signum() * new_height.abs().max(min.height).ceil();
            text_font = originals
                .get(&text.id)
                .and_then(Layer::text_data)
                .map(|data| (text.id, data.font_size));
        }
    }

    let rescaled = original
        .linear()
        .map(|data| linear::rescale_to(&data.points, new_width, new_height, true));
    let new_bounds = match &rescaled {
        Some(points) => linear::points_bounds(points),
        None => Rect::new(0.0, 0.0, new_width, new_height),
    };
    let top_left = anchored_top_left(
        bounds,
        Size::new(new_bounds.width(), new_bounds.height()),
        (new_width < 0.0, new_height < 0.0),
        handle,
        modifiers,
        original.angle,
    );
    let origin = top_left - Vec2::new(new_bounds.x0, new_bounds.y0);
    let width = new_width.abs();
    let height = new_height.abs();

    let collapsed = |next: f64, before: f64| next == 0.0 && before != 0.0;
    let valid = origin.x.is_finite()
        && origin.y.is_finite()
        && width.is_finite()
        && height.is_finite()
        && if rescaled.is_some() {
            snapped || !(collapsed(width, original.width) || collapsed(height, original.height))
        } else {
            width > 0.0 && height > 0.0
        };
    if !valid {
        log::trace!("Resize of {id} rejected, degenerate size");
        return false;
    }

    let mut update = LayerUpdate::new().position(origin.x, origin.y).size(width, height);
    if let Some(points) = rescaled {
        update = update.points(points);
    }
    if let Some(image) = original.image_data() {
        update = update.scale(Vec2::new(
            image.scale.x * new_bounds.width().signum(),
            image.scale.y * new_bounds.height().signum(),
        ));
    }

    scene.batch(|scene| {
        scene.mutate(id, update);
        if let Some((text_id, font_size)) = text_font {
            scene.mutate(text_id, LayerUpdate::new().font_size(font_size));
        }
        let options = UpdateOptions::new().resized(current_size, Size::new(width, height));
        update_bound_layers(scene, layout, id, &options);
        handle_bind_text_resize(scene, layout, id, Some(handle), modifiers.keep_aspect_ratio);
    });
    true
}

/// Corner drags scale a free text layer's font; other handles do nothing.
fn resize_free_text(
    scene: &mut Scene,
    layout: &TextLayout,
    original: &Layer,
    handle: TransformHandle,
    pointer: Point,
    modifiers: ResizeModifiers,
) -> bool {
    if !handle.is_corner() {
        return false;
    }
    let Some(data) = original.text_data() else {
        return false;
    };
    let bounds = original.bounds();
    let (width, height) = (bounds.width(), bounds.height());
    if width <= 0.0 || height <= 0.0 {
        return false;
    }
    let pointer = rotate_point(pointer, bounds.center(), -original.angle);
    let scale_x = if handle.has_right() {
        (pointer.x - bounds.x0) / width
    } else {
        (bounds.x1 - pointer.x) / width
    };
    let scale_y = if handle.has_bottom() {
        (pointer.y - bounds.y0) / height
    } else {
        (bounds.y1 - pointer.y) / height
    };
    let scale = scale_x.max(scale_y);
    if !(scale > 0.0 && scale.is_finite()) {
        return false;
    }

    let next = Size::new(original.width * scale, original.height * scale);
    let Some(font_size) = measure_font_size_from_width(original, None, next.width, &scene.config().text) else {
        return false;
    };
    let baseline = layout
        .measure_text(&data.text, &data.font().with_size(font_size), data.line_height)
        .baseline;
    let top_left = anchored_top_left(
        bounds,
        next,
        (false, false),
        handle,
        ResizeModifiers {
            keep_aspect_ratio: false,
            ..modifiers
        },
        original.angle,
    );
    let id = original.id;
    let Some(current_size) = scene.non_deleted_layer(id).map(|layer| Size::new(layer.width, layer.height)) else {
        return false;
    };

    scene.batch(|scene| {
        scene.mutate(
            id,
            LayerUpdate::new()
                .position(top_left.x, top_left.y)
                .size(next.width, next.height)
                .font_size(font_size)
                .baseline(baseline),
        );
        update_bound_layers(scene, layout, id, &UpdateOptions::new().resized(current_size, next));
    });
    true
}

struct PlannedResize {
    id: LayerId,
    update: LayerUpdate,
    size: Size,
    /// Bound text font, and the angle it follows for non-connector containers.
    text: Option<(LayerId, f64, Option<f64>)>,
}

/// Scale a selection uniformly from a corner handle.
///
/// The anchor is the opposite corner of the selection's rotated bounds,
/// connector labels included, or its center when resizing from it. Dragging
/// past the anchor mirrors the selection and its angles. Nothing changes
/// when any text would drop below the minimum font size.
pub fn resize_multiple_layers(
    scene: &mut Scene,
    layout: &TextLayout,
    originals: &HashMap<LayerId, Layer>,
    ids: &[LayerId],
    handle: TransformHandle,
    pointer: Point,
    from_center: bool,
) -> bool {
    if !handle.is_corner() {
        return false;
    }
    let text_config = scene.config().text.clone();
    let targets: Vec<&Layer> = ids
        .iter()
        .filter_map(|id| originals.get(id))
        .filter(|layer| layer.container_id().is_none())
        .collect();

    let mut selection: Option<Rect> = None;
    for target in &targets {
        let mut rect = target.rotated_bounds();
        if target.is_arrow() {
            if let Some(text) = target.bound_text_id().and_then(|text_id| originals.get(&text_id)) {
                let position = compute_bound_text_position(target, text, &text_config);
                rect = rect.union(Rect::from_origin_size(position, (text.width, text.height)));
            }
        }
        selection = Some(selection.map_or(rect, |acc| acc.union(rect)));
    }
    let Some(selection) = selection else {
        return false;
    };

    let anchor = if from_center {
        selection.center()
    } else {
        match handle {
            TransformHandle::TopRight => Point::new(selection.x0, selection.y1),
            TransformHandle::BottomRight => Point::new(selection.x0, selection.y0),
            TransformHandle::BottomLeft => Point::new(selection.x1, selection.y0),
            _ => Point::new(selection.x1, selection.y1),
        }
    };
    let ratio = |distance: f64, size: f64| if size > 0.0 { distance.abs() / size } else { 0.0 };
    let scale = ratio(pointer.x - anchor.x, selection.width()).max(ratio(pointer.y - anchor.y, selection.height()))
        * if from_center { 2.0 } else { 1.0 };
    if scale == 0.0 || !scale.is_finite() {
        return false;
    }

    let (keep_x, keep_y) = match handle {
        TransformHandle::TopRight => (pointer.x >= anchor.x, pointer.y <= anchor.y),
        TransformHandle::BottomRight => (pointer.x >= anchor.x, pointer.y >= anchor.y),
        TransformHandle::BottomLeft => (pointer.x <= anchor.x, pointer.y >= anchor.y),
        _ => (pointer.x <= anchor.x, pointer.y <= anchor.y),
    };
    let flip_x = if keep_x { 1.0 } else { -1.0 };
    let flip_y = if keep_y { 1.0 } else { -1.0 };
    let map = |p: Point| {
        Point::new(
            anchor.x + flip_x * (p.x - anchor.x) * scale,
            anchor.y + flip_y * (p.y - anchor.y) * scale,
        )
    };

    let mut planned = Vec::with_capacity(targets.len());
    for target in &targets {
        let size = Size::new(target.width * scale, target.height * scale);
        let angle = normalize_angle(target.angle * flip_x * flip_y);
        let mut update = if target.is_linear() {
            let globals: Vec<Point> = linear::global_points(target).into_iter().map(map).collect();
            let (origin, points) = linear::relocate(&globals, angle, map(target.center()));
            LayerUpdate::new().position(origin.x, origin.y).points(points)
        } else {
            let center = map(target.center());
            LayerUpdate::new()
                .position(center.x - size.width / 2.0, center.y - size.height / 2.0)
                .size(size.width, size.height)
        }
        .angle(angle);

        if let (Some(image), 1) = (target.image_data(), targets.len()) {
            update = update.scale(Vec2::new(image.scale.x * flip_x, image.scale.y * flip_y));
        }
        if let Some(data) = target.text_data() {
            let Some(font_size) = measure_font_size_from_width(target, None, size.width, &text_config) else {
                return false;
            };
            let baseline = layout
                .measure_text(&data.text, &data.font().with_size(font_size), data.line_height)
                .baseline;
            update = update.font_size(font_size).baseline(baseline);
        }

        let mut text = None;
        if let Some(bound) = target.bound_text_id().and_then(|text_id| originals.get(&text_id)) {
            let mut resized = (*target).clone();
            resized.width = size.width;
            resized.height = size.height;
            let next_width = max_container_width(&resized, Some(bound), &text_config);
            let Some(font_size) = measure_font_size_from_width(bound, Some(target), next_width, &text_config) else {
                return false;
            };
            let follows = (!target.is_linear()).then_some(angle);
            text = Some((bound.id, font_size, follows));
        }
        planned.push(PlannedResize {
            id: target.id,
            update,
            size,
            text,
        });
    }

    let moved: HashSet<LayerId> = planned.iter().map(|plan| plan.id).collect();
    scene.batch(|scene| {
        for plan in planned {
            let Some(old_size) = scene.non_deleted_layer(plan.id).map(|layer| Size::new(layer.width, layer.height)) else {
                continue;
            };
            scene.mutate(plan.id, plan.update);
            let options = UpdateOptions {
                old_size: Some(old_size),
                new_size: Some(plan.size),
                simultaneously_updated: moved.clone(),
            };
            update_bound_layers(scene, layout, plan.id, &options);
            if let Some((text_id, font_size, angle)) = plan.text {
                let mut update = LayerUpdate::new().font_size(font_size);
                if let Some(angle) = angle {
                    update = update.angle(angle);
                }
                scene.mutate(text_id, update);
                handle_bind_text_resize(scene, layout, plan.id, Some(handle), true);
            }
        }
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::tests::scene_with;
    use crate::binding::{BindingSpec, bind_or_unbind_linear_layer};
    use crate::geometry::collision::distance_to_bindable;
    use crate::layers::{BoundLayer, FontSpec};
    use crate::text::container::refresh_text;
    use crate::text::tests::fixed_layout;
    use std::f64::consts::{FRAC_PI_4, FRAC_PI_6};

    fn originals(scene: &Scene) -> HashMap<LayerId, Layer> {
        scene.layers().iter().map(|layer| (layer.id, layer.clone())).collect()
    }

    fn resize(scene: &mut Scene, id: LayerId, handle: TransformHandle, pointer: Point, modifiers: ResizeModifiers) -> bool {
        let layout = TextLayout::default();
        let originals = originals(scene);
        resize_single_layer(scene, &layout, &originals, id, handle, pointer, modifiers)
    }

    fn rect_scene(angle: f64) -> (Scene, LayerId) {
        let rect = Layer::rectangle(0.0, 0.0, 100.0, 50.0).with_angle(angle);
        let id = rect.id;
        (scene_with(vec![rect]), id)
    }

    fn global_corner(layer: &Layer, corner: Point) -> Point {
        rotate_point(corner, layer.center(), layer.angle)
    }

    #[test]
    fn test_right_and_left_handles() {
        let (mut scene, id) = rect_scene(0.0);
        assert!(resize(&mut scene, id, TransformHandle::Right, Point::new(150.0, 25.0), ResizeModifiers::default()));
        let rect = scene.layer(id).unwrap();
        assert!((rect.width - 150.0).abs() < 1e-9);
        assert!(rect.x.abs() < 1e-9);

        let (mut scene, id) = rect_scene(0.0);
        assert!(resize(&mut scene, id, TransformHandle::Left, Point::new(-50.0, 25.0), ResizeModifiers::default()));
        let rect = scene.layer(id).unwrap();
        assert!((rect.width - 150.0).abs() < 1e-9);
        assert!((rect.x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_corner_keeps_anchor() {
        let (mut scene, id) = rect_scene(FRAC_PI_6);
        let before = scene.layer(id).unwrap().clone();
        let anchor = global_corner(&before, Point::new(before.x, before.y));
        assert!(resize(&mut scene, id, TransformHandle::BottomRight, Point::new(180.0, 140.0), ResizeModifiers::default()));

        let after = scene.layer(id).unwrap();
        assert!(after.width != before.width);
        let moved = global_corner(after, Point::new(after.x, after.y));
        assert!((moved - anchor).hypot() < 1e-9);
    }

    #[test]
    fn test_rotated_side_keeps_opposite_edge() {
        let (mut scene, id) = rect_scene(FRAC_PI_4);
        let before = scene.layer(id).unwrap().clone();
        let anchor = global_corner(&before, Point::new(before.x + before.width, before.y + before.height));
        assert!(resize(&mut scene, id, TransformHandle::Top, Point::new(0.0, -60.0), ResizeModifiers::default()));

        let after = scene.layer(id).unwrap();
        let moved = global_corner(after, Point::new(after.x + after.width, after.y + after.height));
        assert!((moved - anchor).hypot() < 1e-9);
        assert!((after.width - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_past_anchor_flips() {
        let (mut scene, id) = rect_scene(0.0);
        assert!(resize(&mut scene, id, TransformHandle::Right, Point::new(-20.0, 25.0), ResizeModifiers::default()));
        let rect = scene.layer(id).unwrap();
        assert!((rect.width - 20.0).abs() < 1e-9);
        assert!((rect.x + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_keep_aspect_ratio_on_corner() {
        let (mut scene, id) = rect_scene(0.0);
        let modifiers = ResizeModifiers {
            keep_aspect_ratio: true,
            from_center: false,
        };
        assert!(resize(&mut scene, id, TransformHandle::BottomRight, Point::new(200.0, 60.0), modifiers));
        let rect = scene.layer(id).unwrap();
        assert!((rect.width - 200.0).abs() < 1e-9);
        assert!((rect.height - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_center() {
        let (mut scene, id) = rect_scene(0.0);
        let modifiers = ResizeModifiers {
            keep_aspect_ratio: false,
            from_center: true,
        };
        assert!(resize(&mut scene, id, TransformHandle::Right, Point::new(150.0, 25.0), modifiers));
        let rect = scene.layer(id).unwrap();
        assert!((rect.width - 200.0).abs() < 1e-9);
        assert!((rect.x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_scale_rejected() {
        let (mut scene, id) = rect_scene(0.0);
        assert!(!resize(&mut scene, id, TransformHandle::Right, Point::new(0.0, 25.0), ResizeModifiers::default()));
        let rect = scene.layer(id).unwrap();
        assert_eq!(rect.version, 1);
        assert!((rect.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_points_rescale() {
        let line = Layer::line(&[Point::new(0.0, 0.0), Point::new(100.0, 50.0)]);
        let id = line.id;
        let mut scene = scene_with(vec![line]);
        assert!(resize(&mut scene, id, TransformHandle::BottomRight, Point::new(200.0, 100.0), ResizeModifiers::default()));
        let line = scene.layer(id).unwrap();
        assert_eq!(line.linear().unwrap().points[1], Point::new(200.0, 100.0));
        assert!((line.width - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_size() {
        let line = Layer::line(&[Point::ZERO, Point::new(1.0, 1.0)]).kind;
        let step = std::f64::consts::PI / 12.0;
        let flat = get_perfect_layer_size(&line, 100.0, 10.0, step);
        assert!(flat.height.abs() < f64::EPSILON);
        let diagonal = get_perfect_layer_size(&line, 100.0, 95.0, step);
        assert!((diagonal.height - 100.0).abs() < 1e-9);
        let upright = get_perfect_layer_size(&line, 2.0, 100.0, step);
        assert!(upright.width.abs() < f64::EPSILON);
        let square = get_perfect_layer_size(&LayerKind::Rectangle, 100.0, -30.0, step);
        assert!((square.height + 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_perfect_line_with_aspect_lock() {
        let line = Layer::line(&[Point::new(0.0, 0.0), Point::new(100.0, 50.0)]);
        let id = line.id;
        let mut scene = scene_with(vec![line]);
        let modifiers = ResizeModifiers {
            keep_aspect_ratio: true,
            from_center: false,
        };
        assert!(resize(&mut scene, id, TransformHandle::BottomRight, Point::new(200.0, 5.0), modifiers));
        let line = scene.layer(id).unwrap();
        assert!(line.height.abs() < f64::EPSILON);
        assert!((line.width - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_image_flip_sets_scale() {
        let image = Layer::image(0.0, 0.0, 100.0, 50.0, None);
        let id = image.id;
        let mut scene = scene_with(vec![image]);
        assert!(resize(&mut scene, id, TransformHandle::Right, Point::new(-20.0, 25.0), ResizeModifiers::default()));
        let scale = scene.layer(id).unwrap().image_data().unwrap().scale;
        assert_eq!(scale, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_resize_reanchors_bound_connector() {
        let left = Layer::rectangle(0.0, 0.0, 100.0, 100.0);
        let right = Layer::rectangle(300.0, 0.0, 100.0, 100.0);
        let arrow = Layer::arrow(&[Point::new(104.0, 50.0), Point::new(296.0, 50.0)]);
        let (left_id, right_id, arrow_id) = (left.id, right.id, arrow.id);
        let mut scene = scene_with(vec![left, right, arrow]);
        bind_or_unbind_linear_layer(&mut scene, arrow_id, BindingSpec::Bind(left_id), BindingSpec::Bind(right_id));

        assert!(resize(&mut scene, right_id, TransformHandle::Left, Point::new(250.0, 50.0), ResizeModifiers::default()));
        let arrow = scene.layer(arrow_id).unwrap();
        let end = linear::global_point(arrow, 1).unwrap();
        assert!((end.x - 246.0).abs() < 1e-6);
        let right = scene.layer(right_id).unwrap();
        assert!((distance_to_bindable(right, end) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_resize_scales_bound_font() {
        let layout = fixed_layout(10.0);
        let mut rect = Layer::rectangle(0.0, 0.0, 100.0, 100.0);
        let mut text = Layer::text(0.0, 0.0, "hi", FontSpec::default(), 1.25);
        if let Some(data) = text.text_data_mut() {
            data.container_id = Some(rect.id);
        }
        rect.bound_layers.push(BoundLayer::text(text.id));
        let (rect_id, text_id) = (rect.id, text.id);
        let mut scene = scene_with(vec![rect, text]);
        refresh_text(&mut scene, &layout, text_id);
        let font = scene.layer(text_id).unwrap().text_data().unwrap().font_size;

        let originals = originals(&scene);
        let modifiers = ResizeModifiers {
            keep_aspect_ratio: true,
            from_center: false,
        };
        assert!(resize_single_layer(
            &mut scene,
            &layout,
            &originals,
            rect_id,
            TransformHandle::BottomRight,
            Point::new(200.0, 200.0),
            modifiers
        ));
        let next = scene.layer(text_id).unwrap().text_data().unwrap().font_size;
        assert!((next - font * 190.0 / 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_flipped_container_keeps_flip_with_bound_text() {
        let layout = fixed_layout(10.0);
        let mut rect = Layer::rectangle(0.0, 0.0, 100.0, 100.0);
        let mut text = Layer::text(0.0, 0.0, "hi", FontSpec::default(), 1.25);
        if let Some(data) = text.text_data_mut() {
            data.container_id = Some(rect.id);
        }
        rect.bound_layers.push(BoundLayer::text(text.id));
        let (rect_id, text_id) = (rect.id, text.id);
        let mut scene = scene_with(vec![rect, text]);
        refresh_text(&mut scene, &layout, text_id);

        let originals = originals(&scene);
        assert!(resize_single_layer(
            &mut scene,
            &layout,
            &originals,
            rect_id,
            TransformHandle::Right,
            Point::new(-150.0, 50.0),
            ResizeModifiers::default()
        ));
        let rect = scene.layer(rect_id).unwrap();
        assert!((rect.width - 150.0).abs() < 1e-9);
        assert!((rect.x + 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_free_text_corner_scales_font() {
        let layout = fixed_layout(10.0);
        let text = Layer::text(0.0, 0.0, "ab", FontSpec::default(), 1.25);
        let id = text.id;
        let mut scene = scene_with(vec![text]);
        refresh_text(&mut scene, &layout, id);
        let before = scene.layer(id).unwrap().clone();
        let font = before.text_data().unwrap().font_size;

        let originals = originals(&scene);
        let pointer = Point::new(before.width * 2.0, before.height * 2.0);
        assert!(resize_single_layer(
            &mut scene,
            &layout,
            &originals,
            id,
            TransformHandle::BottomRight,
            pointer,
            ResizeModifiers::default()
        ));
        let after = scene.layer(id).unwrap();
        assert!((after.text_data().unwrap().font_size - font * 2.0).abs() < 1e-9);
        assert!(after.x.abs() < 1e-9);

        assert!(!resize_single_layer(
            &mut scene,
            &layout,
            &originals,
            id,
            TransformHandle::Right,
            pointer,
            ResizeModifiers::default()
        ));
    }

    #[test]
    fn test_multiple_scale_from_corner() {
        let a = Layer::rectangle(0.0, 0.0, 100.0, 100.0);
        let b = Layer::rectangle(200.0, 0.0, 100.0, 100.0);
        let (a_id, b_id) = (a.id, b.id);
        let mut scene = scene_with(vec![a, b]);
        let layout = TextLayout::default();
        let originals = originals(&scene);

        assert!(resize_multiple_layers(
            &mut scene,
            &layout,
            &originals,
            &[a_id, b_id],
            TransformHandle::BottomRight,
            Point::new(600.0, 100.0),
            false
        ));
        let a = scene.layer(a_id).unwrap();
        let b = scene.layer(b_id).unwrap();
        assert!(a.x.abs() < 1e-9 && (a.width - 200.0).abs() < 1e-9);
        assert!((b.x - 400.0).abs() < 1e-9 && b.y.abs() < 1e-9);
    }

    #[test]
    fn test_multiple_flip_mirrors_positions_and_angles() {
        let a = Layer::rectangle(0.0, 0.0, 100.0, 100.0).with_angle(FRAC_PI_6);
        let b = Layer::rectangle(200.0, 0.0, 100.0, 100.0);
        let (a_id, b_id) = (a.id, b.id);
        let mut scene = scene_with(vec![a, b]);
        let layout = TextLayout::default();
        let originals = originals(&scene);
        let selection = originals[&a_id].rotated_bounds().union(originals[&b_id].rotated_bounds());
        let anchor = Point::new(selection.x0, selection.y0);

        let pointer = Point::new(anchor.x - selection.width(), selection.y1);
        assert!(resize_multiple_layers(
            &mut scene,
            &layout,
            &originals,
            &[a_id, b_id],
            TransformHandle::BottomRight,
            pointer,
            false
        ));
        let b = scene.layer(b_id).unwrap();
        let mirrored_center = 2.0 * anchor.x - 250.0;
        assert!((b.center().x - mirrored_center).abs() < 1e-9);
        let a = scene.layer(a_id).unwrap();
        assert!((a.angle - normalize_angle(-FRAC_PI_6)).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_rejects_side_handle_and_tiny_font() {
        let layout = fixed_layout(10.0);
        let text = Layer::text(0.0, 0.0, "ab", FontSpec::default(), 1.25);
        let rect = Layer::rectangle(100.0, 100.0, 100.0, 100.0);
        let (text_id, rect_id) = (text.id, rect.id);
        let mut scene = scene_with(vec![text, rect]);
        refresh_text(&mut scene, &layout, text_id);
        let originals = originals(&scene);
        let ids = [text_id, rect_id];

        assert!(!resize_multiple_layers(&mut scene, &layout, &originals, &ids, TransformHandle::Right, Point::new(400.0, 100.0), false));
        // shrinks the selection to a hair, pushing the font below the minimum
        assert!(!resize_multiple_layers(
            &mut scene,
            &layout,
            &originals,
            &ids,
            TransformHandle::BottomRight,
            Point::new(0.01, 0.01),
            false
        ));
        assert_eq!(scene.layer(rect_id).unwrap().version, 1);
    }
}
