//! Layout of text bound inside a container.
//!
//! A container's usable box is its bounds shrunk by padding and, for
//! ellipses and diamonds, by the largest rectangle that fits inside the
//! outline. Connectors carry their label centered on their midpoint.

use super::{TextLayout, TextMetrics};
use crate::config::TextConfig;
use crate::layers::{Layer, LayerId, LayerKind, LayerUpdate, TextAlign, VerticalAlign, linear};
use crate::scene::Scene;
use crate::transform::TransformHandle;
use kurbo::{Point, Size};
use std::f64::consts::SQRT_2;

/// Widest line the container can hold.
pub fn max_container_width(container: &Layer, bound_text: Option<&Layer>, config: &TextConfig) -> f64 {
    let padding = config.bound_text_padding;
    let width = container.width;
    match container.kind {
        LayerKind::Ellipse => width * SQRT_2 / 2.0 - 2.0 * padding,
        LayerKind::Diamond => width / 2.0 - 2.0 * padding,
        LayerKind::Arrow(_) => {
            let available = width - config.arrow_label_padding();
            if available > 0.0 {
                available
            } else {
                bound_text
                    .map(|text| text.width)
                    .filter(|w| *w > 0.0)
                    .unwrap_or_else(|| config.arrow_label_padding())
            }
        }
        _ => width - 2.0 * padding,
    }
}

/// Tallest text block the container can hold.
pub fn max_container_height(container: &Layer, bound_text: Option<&Layer>, config: &TextConfig) -> f64 {
    let padding = config.bound_text_padding;
    let height = container.height;
    match container.kind {
        LayerKind::Ellipse => height * SQRT_2 / 2.0 - 2.0 * padding,
        LayerKind::Diamond => height / 2.0 - 2.0 * padding,
        LayerKind::Arrow(_) => {
            let available = height - config.arrow_label_padding();
            if available > 0.0 {
                available
            } else {
                bound_text.map(|text| text.height).unwrap_or(0.0)
            }
        }
        _ => height - 2.0 * padding,
    }
}

/// Container dimension whose usable extent holds `dimension`.
pub fn container_dimension_for_text(dimension: f64, kind: &LayerKind, config: &TextConfig) -> f64 {
    let dimension = dimension.ceil();
    let padding = 2.0 * config.bound_text_padding;
    match kind {
        LayerKind::Ellipse => ((dimension + padding) * SQRT_2).ceil(),
        LayerKind::Diamond => 2.0 * (dimension + padding),
        LayerKind::Arrow(_) => dimension + config.arrow_label_padding(),
        _ => dimension + padding,
    }
}

/// Top-left of the usable box.
pub fn container_coords(container: &Layer, config: &TextConfig) -> Point {
    let padding = config.bound_text_padding;
    let (mut dx, mut dy) = (padding, padding);
    match container.kind {
        LayerKind::Ellipse => {
            dx += container.width / 2.0 * (1.0 - SQRT_2 / 2.0);
            dy += container.height / 2.0 * (1.0 - SQRT_2 / 2.0);
        }
        LayerKind::Diamond => {
            dx += container.width / 4.0;
            dy += container.height / 4.0;
        }
        _ => {}
    }
    Point::new(container.x + dx, container.y + dy)
}

/// Smallest container size that still fits one line of a single character.
pub fn min_container_size(layout: &TextLayout, container: &Layer, text: &Layer, config: &TextConfig) -> Size {
    let Some(data) = text.text_data() else {
        return Size::ZERO;
    };
    let font = data.font();
    let line_width = layout.approx_min_line_width(&font);
    let line_height = layout.metrics().line_height_px(&font, data.line_height);
    Size::new(
        container_dimension_for_text(line_width, &container.kind, config),
        container_dimension_for_text(line_height, &container.kind, config),
    )
}

/// Where bound text goes inside its container, honoring its alignment.
pub fn compute_bound_text_position(container: &Layer, text: &Layer, config: &TextConfig) -> Point {
    if container.is_arrow() {
        let mid = linear::effective_midpoint(container).unwrap_or_else(|| container.center());
        return Point::new(mid.x - text.width / 2.0, mid.y - text.height / 2.0);
    }
    let coords = container_coords(container, config);
    let max_width = max_container_width(container, Some(text), config);
    let max_height = max_container_height(container, Some(text), config);
    let (align, vertical) = text
        .text_data()
        .map(|data| (data.text_align, data.vertical_align))
        .unwrap_or_default();
    let x = match align {
        TextAlign::Left => coords.x,
        TextAlign::Center => coords.x + (max_width - text.width) / 2.0,
        TextAlign::Right => coords.x + max_width - text.width,
    };
    let y = match vertical {
        VerticalAlign::Top => coords.y,
        VerticalAlign::Middle => coords.y + (max_height - text.height) / 2.0,
        VerticalAlign::Bottom => coords.y + max_height - text.height,
    };
    Point::new(x, y)
}

/// Place a container's bound text at its computed position.
pub fn update_bound_text_position(scene: &mut Scene, container_id: LayerId) -> bool {
    let Some(container) = scene.non_deleted_layer(container_id) else {
        return false;
    };
    let Some(text) = container.bound_text_id().and_then(|id| scene.non_deleted_layer(id)) else {
        return false;
    };
    let position = compute_bound_text_position(container, text, &scene.config().text);
    let mut update = LayerUpdate::new().position(position.x, position.y);
    if !container.is_arrow() {
        update = update.angle(container.angle);
    }
    let text_id = text.id;
    scene.mutate(text_id, update)
}

/// Re-wrap a text layer and store its measured size.
///
/// Bound text wraps its original text to the container's usable width.
pub fn refresh_text(scene: &mut Scene, layout: &TextLayout, text_id: LayerId) -> Option<TextMetrics> {
    let text = scene.non_deleted_layer(text_id)?;
    let data = text.text_data()?;
    let font = data.font();
    let container = data.container_id.and_then(|id| scene.non_deleted_layer(id));
    let wrapped = match container {
        Some(container) => {
            let max_width = max_container_width(container, Some(text), &scene.config().text);
            layout.wrap_text(&data.original_text, &font, max_width)
        }
        None => data.text.clone(),
    };
    let metrics = layout.measure_text(&wrapped, &font, data.line_height);
    scene.mutate(
        text_id,
        LayerUpdate::new()
            .text(wrapped)
            .size(metrics.width, metrics.height)
            .baseline(metrics.baseline),
    );
    Some(metrics)
}

/// Grow a container until its bound text fits.
///
/// With a top handle the container grows upward.
fn grow_container(scene: &mut Scene, layout: &TextLayout, container_id: LayerId, handle: Option<TransformHandle>, remember: bool) {
    let Some(container) = scene.non_deleted_layer(container_id) else {
        return;
    };
    if container.is_arrow() {
        return;
    }
    let Some(text) = container.bound_text_id().and_then(|id| scene.non_deleted_layer(id)) else {
        return;
    };
    let config = &scene.config().text;
    let mut update = LayerUpdate::new();

    if text.height > max_container_height(container, Some(text), config) {
        let next = container_dimension_for_text(text.height, &container.kind, config);
        update = update.height(next);
        if handle.is_some_and(TransformHandle::has_top) {
            update = update.y(container.y - (next - container.height));
        }
        if remember {
            layout.record_original_container_height(container_id, next);
        }
    }
    if text.width > max_container_width(container, Some(text), config) {
        update = update.width(container_dimension_for_text(text.width, &container.kind, config));
    }
    if !update.is_empty() {
        log::debug!("Growing container {container_id} to fit its text");
        scene.mutate(container_id, update);
    }
}

/// Re-wrap and re-measure a text layer, growing its container when needed.
pub fn redraw_text_bounding_box(scene: &mut Scene, layout: &TextLayout, text_id: LayerId) -> bool {
    scene.batch(|scene| {
        if refresh_text(scene, layout, text_id).is_none() {
            return false;
        }
        let Some(container_id) = scene.non_deleted_layer(text_id).and_then(Layer::container_id) else {
            return true;
        };
        grow_container(scene, layout, container_id, None, true);
        update_bound_text_position(scene, container_id);
        true
    })
}

/// Re-layout a container's bound text after the container was resized.
///
/// Vertical-only resizes without aspect lock keep the current wrapping.
pub fn handle_bind_text_resize(
    scene: &mut Scene,
    layout: &TextLayout,
    container_id: LayerId,
    handle: Option<TransformHandle>,
    keep_aspect: bool,
) {
    let Some(text_id) = scene
        .non_deleted_layer(container_id)
        .and_then(Layer::bound_text_id)
        .filter(|id| scene.non_deleted_layer(*id).is_some())
    else {
        return;
    };
    layout.reset_original_container_height(container_id);
    scene.batch(|scene| {
        let rewrap = keep_aspect || !matches!(handle, Some(TransformHandle::Top | TransformHandle::Bottom));
        if rewrap {
            refresh_text(scene, layout, text_id);
        }
        grow_container(scene, layout, container_id, handle, false);
        update_bound_text_position(scene, container_id);
    });
}

/// Grow or shrink a container to its bound text while the text is edited.
///
/// The container never shrinks below the height it had when editing began.
pub fn auto_fit_container(scene: &mut Scene, layout: &TextLayout, container_id: LayerId) -> bool {
    let Some(container) = scene.non_deleted_layer(container_id) else {
        return false;
    };
    if container.is_arrow() {
        return update_bound_text_position(scene, container_id);
    }
    let Some(text) = container.bound_text_id().and_then(|id| scene.non_deleted_layer(id)) else {
        return false;
    };
    let original = layout.original_container_height(container_id).unwrap_or_else(|| {
        layout.record_original_container_height(container_id, container.height);
        container.height
    });
    let config = &scene.config().text;
    let max_height = max_container_height(container, Some(text), config);
    let fitted = container_dimension_for_text(text.height, &container.kind, config);
    let target = if text.height > max_height {
        Some(fitted)
    } else if container.height > original && text.height < max_height {
        Some(fitted.max(original))
    } else {
        None
    };
    scene.batch(|scene| {
        if let Some(height) = target {
            scene.mutate(container_id, LayerUpdate::new().height(height));
        }
        update_bound_text_position(scene, container_id);
    });
    true
}

/// Font size that makes text span `next_width`.
///
/// Bound text measures against its container's usable width. Sizes below the
/// configured minimum are rejected.
pub fn measure_font_size_from_width(text: &Layer, container: Option<&Layer>, next_width: f64, config: &TextConfig) -> Option<f64> {
    let data = text.text_data()?;
    let width = match container {
        Some(container) => max_container_width(container, Some(text), config),
        None => text.width,
    };
    let next = data.font_size * (next_width / width);
    (next.is_finite() && next >= config.min_font_size).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{BoundLayer, FontSpec};
    use crate::text::tests::fixed_layout;
    use kurbo::Point;

    fn bind(scene: &mut Scene, container: Layer, content: &str) -> (LayerId, LayerId) {
        let mut text = Layer::text(0.0, 0.0, content, FontSpec::default(), 1.25);
        let (container_id, text_id) = (container.id, text.id);
        if let Some(data) = text.text_data_mut() {
            data.container_id = Some(container_id);
        }
        let mut container = container;
        container.bound_layers.push(BoundLayer::text(text_id));
        scene.insert_layer(container).unwrap();
        scene.insert_layer(text).unwrap();
        (container_id, text_id)
    }

    #[test]
    fn test_max_width_by_kind() {
        let config = TextConfig::default();
        let rect = Layer::rectangle(0.0, 0.0, 100.0, 60.0);
        let ellipse = Layer::ellipse(0.0, 0.0, 100.0, 60.0);
        let diamond = Layer::diamond(0.0, 0.0, 100.0, 60.0);
        assert!((max_container_width(&rect, None, &config) - 90.0).abs() < f64::EPSILON);
        assert!((max_container_width(&ellipse, None, &config) - (50.0 * SQRT_2 - 10.0)).abs() < 1e-9);
        assert!((max_container_width(&diamond, None, &config) - 40.0).abs() < f64::EPSILON);
        assert!((max_container_height(&diamond, None, &config) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_short_arrow_uses_label_width() {
        let config = TextConfig::default();
        let arrow = Layer::arrow(&[Point::new(0.0, 0.0), Point::new(50.0, 0.0)]);
        assert!((max_container_width(&arrow, None, &config) - 80.0).abs() < f64::EPSILON);
        let mut label = Layer::text(0.0, 0.0, "x", FontSpec::default(), 1.25);
        label.width = 33.0;
        label.height = 25.0;
        assert!((max_container_width(&arrow, Some(&label), &config) - 33.0).abs() < f64::EPSILON);
        assert!((max_container_height(&arrow, Some(&label), &config) - 25.0).abs() < f64::EPSILON);

        let long = Layer::arrow(&[Point::new(0.0, 0.0), Point::new(300.0, 0.0)]);
        assert!((max_container_width(&long, None, &config) - 220.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dimension_inverts_max_extent() {
        let config = TextConfig::default();
        for kind in [LayerKind::Rectangle, LayerKind::Ellipse, LayerKind::Diamond] {
            for text_height in [1.0, 24.5, 50.0, 133.0] {
                let height = container_dimension_for_text(text_height, &kind, &config);
                let container = Layer::new(kind.clone(), 0.0, 0.0, 100.0, height);
                assert!(max_container_height(&container, None, &config) + 1e-9 >= text_height);
            }
        }
        let ellipse = container_dimension_for_text(50.0, &LayerKind::Ellipse, &config);
        assert!((ellipse - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_centered_position_in_diamond() {
        let config = TextConfig::default();
        let diamond = Layer::diamond(0.0, 0.0, 200.0, 100.0);
        let mut text = Layer::text(0.0, 0.0, "x", FontSpec::default(), 1.25);
        text.width = 40.0;
        text.height = 20.0;
        let position = compute_bound_text_position(&diamond, &text, &config);
        // centered on the diamond's center
        assert!((position.x + 20.0 - 100.0).abs() < 1e-9);
        assert!((position.y + 10.0 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_arrow_label_centers_on_midpoint() {
        let config = TextConfig::default();
        let arrow = Layer::arrow(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 80.0)]);
        let mut text = Layer::text(0.0, 0.0, "x", FontSpec::default(), 1.25);
        text.width = 10.0;
        text.height = 20.0;
        let position = compute_bound_text_position(&arrow, &text, &config);
        assert!((position.x - 95.0).abs() < 1e-9);
        assert!((position.y - -10.0).abs() < 1e-9);
    }

    #[test]
    fn test_redraw_grows_container() {
        let mut scene = Scene::new();
        let layout = fixed_layout(10.0);
        let (container_id, text_id) = bind(&mut scene, Layer::rectangle(0.0, 0.0, 100.0, 40.0), "one two three");
        assert!(redraw_text_bounding_box(&mut scene, &layout, text_id));

        let text = scene.layer(text_id).unwrap();
        assert_eq!(text.text_data().unwrap().text, "one two\nthree");
        assert!((text.height - 50.0).abs() < f64::EPSILON);
        let container = scene.layer(container_id).unwrap();
        assert!((container.height - 60.0).abs() < f64::EPSILON);
        assert_eq!(layout.original_container_height(container_id), Some(60.0));
        // vertically centered in the grown box
        assert!((text.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_fit_shrinks_to_original() {
        let mut scene = Scene::new();
        let layout = fixed_layout(10.0);
        let (container_id, text_id) = bind(&mut scene, Layer::rectangle(0.0, 0.0, 100.0, 40.0), "a");
        refresh_text(&mut scene, &layout, text_id);
        assert!(auto_fit_container(&mut scene, &layout, container_id));
        assert_eq!(layout.original_container_height(container_id), Some(40.0));

        scene.mutate(text_id, LayerUpdate::new().original_text("a\nb\nc"));
        refresh_text(&mut scene, &layout, text_id);
        auto_fit_container(&mut scene, &layout, container_id);
        assert!((scene.layer(container_id).unwrap().height - 85.0).abs() < f64::EPSILON);

        scene.mutate(text_id, LayerUpdate::new().original_text("a"));
        refresh_text(&mut scene, &layout, text_id);
        auto_fit_container(&mut scene, &layout, container_id);
        assert!((scene.layer(container_id).unwrap().height - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_vertical_resize_keeps_wrapping() {
        let mut scene = Scene::new();
        let layout = fixed_layout(10.0);
        let (container_id, text_id) = bind(&mut scene, Layer::rectangle(0.0, 0.0, 100.0, 100.0), "one two three");
        redraw_text_bounding_box(&mut scene, &layout, text_id);
        scene.mutate(container_id, LayerUpdate::new().width(200.0));

        handle_bind_text_resize(&mut scene, &layout, container_id, Some(TransformHandle::Bottom), false);
        assert_eq!(scene.layer(text_id).unwrap().text_data().unwrap().text, "one two\nthree");

        handle_bind_text_resize(&mut scene, &layout, container_id, Some(TransformHandle::Right), false);
        assert_eq!(scene.layer(text_id).unwrap().text_data().unwrap().text, "one two three");
        assert_eq!(layout.original_container_height(container_id), None);
    }

    #[test]
    fn test_top_handle_grows_upward() {
        let mut scene = Scene::new();
        let layout = fixed_layout(10.0);
        let (container_id, text_id) = bind(&mut scene, Layer::rectangle(0.0, 100.0, 100.0, 35.0), "one two three");
        refresh_text(&mut scene, &layout, text_id);

        handle_bind_text_resize(&mut scene, &layout, container_id, Some(TransformHandle::TopLeft), false);
        let container = scene.layer(container_id).unwrap();
        assert!((container.height - 60.0).abs() < f64::EPSILON);
        assert!((container.y - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_font_size_from_width() {
        let config = TextConfig::default();
        let mut text = Layer::text(0.0, 0.0, "abc", FontSpec::default(), 1.25);
        text.width = 30.0;
        assert_eq!(measure_font_size_from_width(&text, None, 60.0, &config), Some(40.0));
        assert_eq!(measure_font_size_from_width(&text, None, 1.0, &config), None);
        let rect = Layer::rectangle(0.0, 0.0, 110.0, 50.0);
        assert_eq!(measure_font_size_from_width(&text, Some(&rect), 50.0, &config), Some(10.0));
    }
}
