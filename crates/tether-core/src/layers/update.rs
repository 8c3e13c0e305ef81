//! Explicit update objects applied to layers.
//!
//! A [`LayerUpdate`] names the fields to write. [`LayerUpdate::apply`] skips
//! writes that would not change anything and reports whether the layer's
//! shape must be rebuilt.

use super::{BoundLayer, Edge, GroupId, Layer, LayerId, PointBinding, TextAlign, VerticalAlign, linear};
use kurbo::{Point, Vec2};

/// Partial update of a layer. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub angle: Option<f64>,
    pub group_ids: Option<Vec<GroupId>>,
    pub bound_layers: Option<Vec<BoundLayer>>,
    pub deleted: Option<bool>,
    pub points: Option<Vec<Point>>,
    pub start_binding: Option<Option<PointBinding>>,
    pub end_binding: Option<Option<PointBinding>>,
    pub text: Option<String>,
    pub original_text: Option<String>,
    pub font_size: Option<f64>,
    pub line_height: Option<f64>,
    pub baseline: Option<f64>,
    pub text_align: Option<TextAlign>,
    pub vertical_align: Option<VerticalAlign>,
    pub container_id: Option<Option<LayerId>>,
    pub file_id: Option<Option<String>>,
    pub scale: Option<Vec2>,
}

/// Result of applying an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// At least one field changed value.
    pub changed: bool,
    /// Width, height, points or image file changed.
    pub geometry_changed: bool,
}

impl LayerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn group_ids(mut self, group_ids: Vec<GroupId>) -> Self {
        self.group_ids = Some(group_ids);
        self
    }

    pub fn bound_layers(mut self, bound_layers: Vec<BoundLayer>) -> Self {
        self.bound_layers = Some(bound_layers);
        self
    }

    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = Some(deleted);
        self
    }

    pub fn points(mut self, points: Vec<Point>) -> Self {
        self.points = Some(points);
        self
    }

    pub fn binding(mut self, edge: Edge, binding: Option<PointBinding>) -> Self {
        match edge {
            Edge::Start => self.start_binding = Some(binding),
            Edge::End => self.end_binding = Some(binding),
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn original_text(mut self, text: impl Into<String>) -> Self {
        self.original_text = Some(text.into());
        self
    }

    pub fn font_size(mut self, font_size: f64) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn line_height(mut self, line_height: f64) -> Self {
        self.line_height = Some(line_height);
        self
    }

    pub fn text_align(mut self, align: TextAlign) -> Self {
        self.text_align = Some(align);
        self
    }

    pub fn vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = Some(align);
        self
    }

    pub fn baseline(mut self, baseline: f64) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn container_id(mut self, container_id: Option<LayerId>) -> Self {
        self.container_id = Some(container_id);
        self
    }

    pub fn file_id(mut self, file_id: Option<String>) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn scale(mut self, scale: Vec2) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Write the fields into `layer`, bumping its version when anything changed.
    ///
    /// Scalars, points, scale and group ids are compared before writing.
    /// Bound layers and bindings always count as changed.
    pub fn apply(&self, layer: &mut Layer) -> UpdateOutcome {
        let mut changed = false;
        let mut geometry = false;

        changed |= set_compared(&mut layer.x, &self.x);
        changed |= set_compared(&mut layer.y, &self.y);
        changed |= set_compared(&mut layer.angle, &self.angle);
        changed |= set_compared(&mut layer.deleted, &self.deleted);
        changed |= set_compared(&mut layer.group_ids, &self.group_ids);
        changed |= set_always(&mut layer.bound_layers, &self.bound_layers);

        let sized = set_compared(&mut layer.width, &self.width) | set_compared(&mut layer.height, &self.height);
        geometry |= sized;

        if let Some(data) = layer.linear_mut() {
            let moved = set_compared(&mut data.points, &self.points);
            changed |= set_always(&mut data.start_binding, &self.start_binding);
            changed |= set_always(&mut data.end_binding, &self.end_binding);
            if moved {
                let extent = linear::points_extent(&data.points);
                layer.width = extent.width;
                layer.height = extent.height;
                geometry = true;
            }
        }

        if let Some(data) = layer.text_data_mut() {
            changed |= set_compared(&mut data.text, &self.text);
            changed |= set_compared(&mut data.original_text, &self.original_text);
            changed |= set_compared(&mut data.font_size, &self.font_size);
            changed |= set_compared(&mut data.line_height, &self.line_height);
            changed |= set_compared(&mut data.baseline, &self.baseline);
            changed |= set_compared(&mut data.text_align, &self.text_align);
            changed |= set_compared(&mut data.vertical_align, &self.vertical_align);
            changed |= set_compared(&mut data.container_id, &self.container_id);
        }

        if let super::LayerKind::Image(data) = &mut layer.kind {
            geometry |= set_compared(&mut data.file_id, &self.file_id);
            changed |= set_compared(&mut data.scale, &self.scale);
        }

        changed |= geometry;
        if changed {
            layer.version = layer.version.wrapping_add(1);
            layer.version_nonce = super::next_nonce();
            layer.updated_at = super::now_millis();
        }

        UpdateOutcome {
            changed,
            geometry_changed: geometry,
        }
    }
}

fn set_compared<T: PartialEq + Clone>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(value) if slot != value => {
            *slot = value.clone();
            true
        }
        _ => false,
    }
}

fn set_always<T: Clone>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(value) => {
            *slot = value.clone();
            true
        }
        None => false,
    }
}
