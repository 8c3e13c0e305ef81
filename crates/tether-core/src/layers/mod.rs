//! Layer definitions for the scene graph.

pub mod linear;
mod text;
mod update;

pub use text::{FontFamily, FontSpec, TextAlign, TextData, VerticalAlign};
pub use update::{LayerUpdate, UpdateOutcome};

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for layers.
pub type LayerId = Uuid;

/// Unique identifier for groups.
pub type GroupId = Uuid;

/// Kind of a back-reference stored on a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundLayerKind {
    Arrow,
    Text,
}

/// Weak reference from a layer to another layer that points at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundLayer {
    pub id: LayerId,
    pub kind: BoundLayerKind,
}

impl BoundLayer {
    pub fn arrow(id: LayerId) -> Self {
        Self { id, kind: BoundLayerKind::Arrow }
    }

    pub fn text(id: LayerId) -> Self {
        Self { id, kind: BoundLayerKind::Text }
    }
}

/// Attachment of a connector edge to a bindable layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointBinding {
    /// Layer the edge is attached to.
    pub layer_id: LayerId,
    /// Signed position of the anchor on the shape's focus image, in (-1, 1).
    pub focus: f64,
    /// Maintained distance between the edge point and the shape boundary.
    pub gap: f64,
}

/// One end of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Start,
    End,
}

impl Edge {
    pub fn opposite(self) -> Self {
        match self {
            Edge::Start => Edge::End,
            Edge::End => Edge::Start,
        }
    }

    /// Index of the edge point and of its neighbour in a point list.
    pub fn point_indices(self, len: usize) -> (usize, usize) {
        match self {
            Edge::Start => (0, 1.min(len.saturating_sub(1))),
            Edge::End => (len.saturating_sub(1), len.saturating_sub(2)),
        }
    }
}

/// Point data shared by lines and arrows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearData {
    /// Offsets from the layer position; the first point is (0, 0).
    pub points: Vec<Point>,
    pub start_binding: Option<PointBinding>,
    pub end_binding: Option<PointBinding>,
}

impl LinearData {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            start_binding: None,
            end_binding: None,
        }
    }

    pub fn binding(&self, edge: Edge) -> Option<&PointBinding> {
        match edge {
            Edge::Start => self.start_binding.as_ref(),
            Edge::End => self.end_binding.as_ref(),
        }
    }

    /// Two points or fewer.
    pub fn is_simple(&self) -> bool {
        self.points.len() < 3
    }
}

/// Image payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub file_id: Option<String>,
    /// Per-axis flip factors (±1).
    pub scale: Vec2,
}

impl Default for ImageData {
    fn default() -> Self {
        Self {
            file_id: None,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

/// Kind-specific layer data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerKind {
    Rectangle,
    Diamond,
    Ellipse,
    Image(ImageData),
    Text(TextData),
    Line(LinearData),
    Arrow(LinearData),
}

/// A layer in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    /// Top-left for shapes, first point for connectors.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians around the layer's center.
    #[serde(default)]
    pub angle: f64,
    /// Groups this layer belongs to, innermost last.
    #[serde(default)]
    pub group_ids: Vec<GroupId>,
    /// Layers that point at this one.
    #[serde(default)]
    pub bound_layers: Vec<BoundLayer>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub version_nonce: u32,
    #[serde(default)]
    pub updated_at: u64,
    pub kind: LayerKind,
}

impl Layer {
    /// Create a layer with a fresh id.
    pub fn new(kind: LayerKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width,
            height,
            angle: 0.0,
            group_ids: Vec::new(),
            bound_layers: Vec::new(),
            deleted: false,
            version: 1,
            version_nonce: random_nonce(),
            updated_at: now_millis(),
            kind,
        }
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(LayerKind::Rectangle, x, y, width, height)
    }

    pub fn diamond(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(LayerKind::Diamond, x, y, width, height)
    }

    pub fn ellipse(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(LayerKind::Ellipse, x, y, width, height)
    }

    pub fn image(x: f64, y: f64, width: f64, height: f64, file_id: Option<String>) -> Self {
        Self::new(
            LayerKind::Image(ImageData {
                file_id,
                ..ImageData::default()
            }),
            x,
            y,
            width,
            height,
        )
    }

    /// Create a free text layer. Its size is filled in by the text layout engine.
    pub fn text(x: f64, y: f64, content: &str, font: FontSpec, line_height: f64) -> Self {
        Self::new(LayerKind::Text(TextData::new(content, font, line_height)), x, y, 0.0, 0.0)
    }

    /// Create a line from global points.
    pub fn line(points: &[Point]) -> Self {
        Self::linear_from(points, false)
    }

    /// Create an arrow from global points.
    pub fn arrow(points: &[Point]) -> Self {
        Self::linear_from(points, true)
    }

    fn linear_from(points: &[Point], arrow: bool) -> Self {
        let origin = points.first().copied().unwrap_or(Point::ZERO);
        let local: Vec<Point> = points.iter().map(|p| (*p - origin).to_point()).collect();
        let size = linear::points_extent(&local);
        let data = LinearData::new(local);
        let kind = if arrow {
            LayerKind::Arrow(data)
        } else {
            LayerKind::Line(data)
        };
        Self::new(kind, origin.x, origin.y, size.width, size.height)
    }

    /// Attach group membership, innermost last.
    pub fn with_groups(mut self, group_ids: Vec<GroupId>) -> Self {
        self.group_ids = group_ids;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Copy under a new id with a fresh version. References still name the
    /// originals' targets.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 1,
            version_nonce: random_nonce(),
            updated_at: now_millis(),
            ..self.clone()
        }
    }

    /// Shapes connectors can attach to. Text bound to a container is excluded.
    pub fn is_bindable(&self) -> bool {
        match &self.kind {
            LayerKind::Rectangle | LayerKind::Diamond | LayerKind::Ellipse | LayerKind::Image(_) => true,
            LayerKind::Text(text) => text.container_id.is_none(),
            LayerKind::Line(_) | LayerKind::Arrow(_) => false,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self.kind, LayerKind::Line(_) | LayerKind::Arrow(_))
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self.kind, LayerKind::Arrow(_))
    }

    /// Shapes able to host a bound text layer.
    pub fn is_text_container(&self) -> bool {
        matches!(
            self.kind,
            LayerKind::Rectangle | LayerKind::Diamond | LayerKind::Ellipse | LayerKind::Arrow(_)
        )
    }

    pub fn linear(&self) -> Option<&LinearData> {
        match &self.kind {
            LayerKind::Line(data) | LayerKind::Arrow(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn linear_mut(&mut self) -> Option<&mut LinearData> {
        match &mut self.kind {
            LayerKind::Line(data) | LayerKind::Arrow(data) => Some(data),
            _ => None,
        }
    }

    pub fn text_data(&self) -> Option<&TextData> {
        match &self.kind {
            LayerKind::Text(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn text_data_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.kind {
            LayerKind::Text(data) => Some(data),
            _ => None,
        }
    }

    pub fn image_data(&self) -> Option<&ImageData> {
        match &self.kind {
            LayerKind::Image(data) => Some(data),
            _ => None,
        }
    }

    pub fn binding(&self, edge: Edge) -> Option<&PointBinding> {
        self.linear().and_then(|data| data.binding(edge))
    }

    /// Container of a bound text layer.
    pub fn container_id(&self) -> Option<LayerId> {
        self.text_data().and_then(|text| text.container_id)
    }

    /// Text layer bound inside this container.
    pub fn bound_text_id(&self) -> Option<LayerId> {
        self.bound_layers
            .iter()
            .find(|bound| bound.kind == BoundLayerKind::Text)
            .map(|bound| bound.id)
    }

    pub fn has_bound_layer(&self, id: LayerId) -> bool {
        self.bound_layers.iter().any(|bound| bound.id == id)
    }

    /// Every layer id this layer references.
    pub fn referenced_ids(&self) -> Vec<LayerId> {
        let mut ids: Vec<LayerId> = self.bound_layers.iter().map(|bound| bound.id).collect();
        if let Some(data) = self.linear() {
            ids.extend(data.start_binding.iter().map(|b| b.layer_id));
            ids.extend(data.end_binding.iter().map(|b| b.layer_id));
        }
        ids.extend(self.container_id());
        ids
    }

    /// Unrotated bounds in scene coordinates.
    ///
    /// For connectors this is the box of the points, which may start left of `x`.
    pub fn bounds(&self) -> Rect {
        match self.linear() {
            Some(data) => linear::points_bounds(&data.points) + Vec2::new(self.x, self.y),
            None => Rect::new(self.x, self.y, self.x + self.width, self.y + self.height),
        }
    }

    /// Rotation center.
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Axis-aligned bounds of the rotated layer.
    pub fn rotated_bounds(&self) -> Rect {
        let center = self.center();
        let corners: Vec<Point> = match self.linear() {
            Some(_) => linear::global_points(self),
            None => {
                let b = self.bounds();
                vec![
                    Point::new(b.x0, b.y0),
                    Point::new(b.x1, b.y0),
                    Point::new(b.x1, b.y1),
                    Point::new(b.x0, b.y1),
                ]
                .into_iter()
                .map(|p| crate::geometry::rotate_point(p, center, self.angle))
                .collect()
            }
        };
        let Some(first) = corners.first() else {
            return self.bounds();
        };
        corners
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
    }
}

fn random_nonce() -> u32 {
    (Uuid::new_v4().as_u128() & u128::from(u32::MAX)) as u32
}

/// Milliseconds since the Unix epoch, or 0 when the clock is unavailable.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(crate) fn next_nonce() -> u32 {
    random_nonce()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_creation() {
        let rect = Layer::rectangle(10.0, 20.0, 100.0, 50.0);
        assert!(rect.is_bindable());
        assert!(!rect.is_linear());
        assert_eq!(rect.version, 1);
        let center = rect.center();
        assert!((center.x - 60.0).abs() < f64::EPSILON);
        assert!((center.y - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_arrow_from_global_points() {
        let arrow = Layer::arrow(&[Point::new(10.0, 10.0), Point::new(60.0, -30.0)]);
        let data = arrow.linear().unwrap();
        assert_eq!(data.points[0], Point::ZERO);
        assert_eq!(data.points[1], Point::new(50.0, -40.0));
        assert!((arrow.width - 50.0).abs() < f64::EPSILON);
        assert!((arrow.height - 40.0).abs() < f64::EPSILON);

        let bounds = arrow.bounds();
        assert!((bounds.y0 - -30.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_and_arrow_share_point_data() {
        let points = [Point::new(5.0, 5.0), Point::new(25.0, 15.0)];
        let line = Layer::line(&points);
        let arrow = Layer::arrow(&points);
        assert!(matches!(line.kind, LayerKind::Line(_)));
        assert!(arrow.is_arrow() && !line.is_arrow());
        assert_eq!(line.linear(), arrow.linear());
        assert!(Layer::rectangle(0.0, 0.0, 1.0, 1.0).linear().is_none());
    }

    #[test]
    fn test_bound_text_is_not_bindable() {
        let mut text = Layer::text(0.0, 0.0, "label", FontSpec::default(), 1.25);
        assert!(text.is_bindable());
        text.text_data_mut().unwrap().container_id = Some(Uuid::new_v4());
        assert!(!text.is_bindable());
    }

    #[test]
    fn test_edge_point_indices() {
        assert_eq!(Edge::Start.point_indices(3), (0, 1));
        assert_eq!(Edge::End.point_indices(3), (2, 1));
        assert_eq!(Edge::End.opposite(), Edge::Start);
    }

    #[test]
    fn test_rotated_bounds() {
        let rect = Layer::rectangle(0.0, 0.0, 100.0, 100.0).with_angle(std::f64::consts::FRAC_PI_4);
        let bounds = rect.rotated_bounds();
        let half_diag = 50.0 * std::f64::consts::SQRT_2;
        assert!((bounds.x0 - (50.0 - half_diag)).abs() < 1e-9);
        assert!((bounds.width() - 2.0 * half_diag).abs() < 1e-9);
    }
}
