//! Distance, hit testing, intersection and focus math for bindable layers.
//!
//! Every function works in the layer's unrotated, center-relative frame so a
//! single formula per shape kind handles any rotation.

use super::{Line, rotate_point};
use crate::config::BindingConfig;
use crate::layers::{Layer, LayerKind};
use kurbo::{Point, Vec2};

/// Outline family used by the distance and focus formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outline {
    Rectangle,
    Diamond,
    Ellipse,
}

fn outline_of(layer: &Layer) -> Option<Outline> {
    match layer.kind {
        LayerKind::Rectangle | LayerKind::Image(_) | LayerKind::Text(_) => Some(Outline::Rectangle),
        LayerKind::Diamond => Some(Outline::Diamond),
        LayerKind::Ellipse => Some(Outline::Ellipse),
        LayerKind::Line(_) | LayerKind::Arrow(_) => None,
    }
}

fn half_extents(layer: &Layer) -> (f64, f64) {
    (layer.width / 2.0, layer.height / 2.0)
}

/// `point` in the layer's unrotated frame, relative to its center.
pub fn point_relative_to_layer(layer: &Layer, point: Point) -> Point {
    let center = layer.center();
    let unrotated = rotate_point(point, center, -layer.angle);
    (unrotated - center).to_point()
}

/// Scene position of a center-relative point.
fn point_from_relative(layer: &Layer, relative: Point) -> Point {
    let center = layer.center();
    rotate_point(center + relative.to_vec2(), center, layer.angle)
}

/// Signed distance from `point` to the layer's outline. Negative inside.
///
/// Connectors have no outline and report infinity. Ellipses use the default
/// [`BindingConfig::ellipse_iterations`].
pub fn distance_to_bindable(layer: &Layer, point: Point) -> f64 {
    distance_to_bindable_with(layer, point, BindingConfig::default().ellipse_iterations)
}

/// [`distance_to_bindable`] with an explicit ellipse iteration count.
pub fn distance_to_bindable_with(layer: &Layer, point: Point, iterations: usize) -> f64 {
    let Some(outline) = outline_of(layer) else {
        return f64::INFINITY;
    };
    let rel = point_relative_to_layer(layer, point);
    let q = Point::new(rel.x.abs(), rel.y.abs());
    let (hw, hh) = half_extents(layer);
    match outline {
        Outline::Rectangle => distance_to_rectangle(q, hw, hh),
        Outline::Diamond => distance_to_diamond(q, hw, hh),
        Outline::Ellipse => distance_to_ellipse(q, hw, hh, iterations),
    }
}

/// Folded point against the near side, picked by the diagonal through `(hw, hh)`.
fn distance_to_rectangle(q: Point, hw: f64, hh: f64) -> f64 {
    if hw * q.y - hh * q.x > 0.0 {
        q.y - hh
    } else {
        q.x - hw
    }
}

fn distance_to_diamond(q: Point, hw: f64, hh: f64) -> f64 {
    if hw == 0.0 && hh == 0.0 {
        return q.to_vec2().hypot();
    }
    Line::equation(hh, hw, -hh * hw).signed_distance(q)
}

fn distance_to_ellipse(q: Point, a: f64, b: f64, iterations: usize) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return distance_to_rectangle(q, a.max(0.0), b.max(0.0));
    }
    let (tx, ty) = closest_ellipse_parameter(q, a, b, iterations);
    // tangent at (a·tx, b·ty); positive outside
    Line::equation(tx / a, ty / b, -1.0).signed_distance(q)
}

/// Converge `(cos t, sin t)` of the point on the ellipse closest to `q`.
///
/// Starts at 45° and corrects through the evolute each step.
fn closest_ellipse_parameter(q: Point, a: f64, b: f64, iterations: usize) -> (f64, f64) {
    let mut tx = std::f64::consts::FRAC_1_SQRT_2;
    let mut ty = std::f64::consts::FRAC_1_SQRT_2;
    for _ in 0..iterations {
        let x = a * tx;
        let y = b * ty;
        let ex = (a * a - b * b) * tx.powi(3) / a;
        let ey = (b * b - a * a) * ty.powi(3) / b;
        let r = (x - ex).hypot(y - ey);
        let qx = q.x - ex;
        let qy = q.y - ey;
        let dist = qx.hypot(qy);
        if dist == 0.0 {
            break;
        }
        tx = ((qx * r / dist + ex) / a).clamp(0.0, 1.0);
        ty = ((qy * r / dist + ey) / b).clamp(0.0, 1.0);
        let t = tx.hypot(ty);
        if t == 0.0 {
            break;
        }
        tx /= t;
        ty /= t;
    }
    (tx, ty)
}

/// Distance predicate used by hit tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCheck {
    /// Inside the outline.
    StrictlyInside,
    /// Inside, or outside by less than the threshold.
    InsideOrNear,
    /// Within the threshold of the outline on either side.
    Near,
    /// Outside, by less than the threshold. Used for binding borders.
    OutsideWithinGap,
}

impl HitCheck {
    pub fn matches(self, distance: f64, threshold: f64) -> bool {
        match self {
            HitCheck::StrictlyInside => distance < 0.0,
            HitCheck::InsideOrNear => distance < threshold,
            HitCheck::Near => distance.abs() < threshold,
            HitCheck::OutsideWithinGap => (0.0..threshold).contains(&distance),
        }
    }
}

/// Classify `point` against the layer outline.
pub fn hit_test(layer: &Layer, point: Point, threshold: f64, check: HitCheck, iterations: usize) -> bool {
    check.matches(distance_to_bindable_with(layer, point, iterations), threshold)
}

fn rectangle_corners(hw: f64, hh: f64) -> [Point; 4] {
    [
        Point::new(hw, hh),
        Point::new(hw, -hh),
        Point::new(-hw, -hh),
        Point::new(-hw, hh),
    ]
}

fn diamond_corners(hw: f64, hh: f64) -> [Point; 4] {
    [
        Point::new(0.0, hh),
        Point::new(hw, 0.0),
        Point::new(0.0, -hh),
        Point::new(-hw, 0.0),
    ]
}

/// Intersections of the infinite line `a → b` with the layer outline grown by `gap`.
///
/// Returns the nearest and farthest hit from `a`, or nothing when the line
/// misses.
pub fn intersect_layer_with_line(layer: &Layer, a: Point, b: Point, gap: f64) -> Vec<Point> {
    let Some(outline) = outline_of(layer) else {
        return Vec::new();
    };
    let a_rel = point_relative_to_layer(layer, a);
    let b_rel = point_relative_to_layer(layer, b);
    let line = Line::through(a_rel, b_rel);
    if line.is_degenerate() {
        return Vec::new();
    }
    let (hw, hh) = half_extents(layer);

    let mut hits = match outline {
        Outline::Ellipse => line.intersect_ellipse(hw + gap, hh + gap),
        Outline::Rectangle => intersect_polygon(&line, &rectangle_corners(hw, hh), gap),
        Outline::Diamond => intersect_polygon(&line, &diamond_corners(hw, hh), gap),
    };
    if hits.len() < 2 {
        return Vec::new();
    }
    hits.sort_by(|p, q| {
        let dp = (*p - a_rel).hypot2();
        let dq = (*q - a_rel).hypot2();
        dp.total_cmp(&dq)
    });
    let near = hits[0];
    let far = hits[hits.len() - 1];
    vec![point_from_relative(layer, near), point_from_relative(layer, far)]
}

/// Hits on a convex polygon grown by `gap`: offset edges plus rounded corners.
fn intersect_polygon(line: &Line, corners: &[Point; 4], gap: f64) -> Vec<Point> {
    let mut hits = Vec::new();
    for i in 0..corners.len() {
        let p = corners[i];
        let q = corners[(i + 1) % corners.len()];
        let d = q - p;
        let len = d.hypot();
        let offset = if len > 0.0 {
            Vec2::new(d.y, -d.x) * (-gap / len)
        } else {
            Vec2::ZERO
        };
        hits.extend(line.intersect_segment(p + offset, q + offset));
    }
    if gap > 0.0 {
        for corner in corners {
            hits.extend(line.intersect_circle(*corner, gap));
        }
    }
    hits
}

/// Distance from the center to the outline's supporting line with normal `(a, b)`.
fn support(outline: Outline, hw: f64, hh: f64, a: f64, b: f64) -> f64 {
    match outline {
        Outline::Rectangle => hw * a.abs() + hh * b.abs(),
        Outline::Diamond => (hw * a.abs()).max(hh * b.abs()),
        Outline::Ellipse => (hw * hw * a * a + hh * hh * b * b).sqrt(),
    }
}

/// Signed ratio in (-1, 1) of where the line `a → b` passes the layer.
///
/// It is the line's offset from the center over the outline's extent in the
/// line's normal direction. Zero when undefined.
pub fn determine_focus_distance(layer: &Layer, a: Point, b: Point) -> f64 {
    let Some(outline) = outline_of(layer) else {
        return 0.0;
    };
    let line = Line::through(point_relative_to_layer(layer, a), point_relative_to_layer(layer, b));
    let (hw, hh) = half_extents(layer);
    let ratio = line.c / support(outline, hw, hh, line.a, line.b);
    if ratio.is_finite() { ratio } else { 0.0 }
}

/// Anchor point on the layer for a stored focus, seen from `adjacent`.
///
/// This is the tangent point, from `adjacent`, of the outline scaled by
/// `|focus|`, on the side given by the focus sign. Zero focus is the center.
pub fn determine_focus_point(layer: &Layer, focus: f64, adjacent: Point) -> Point {
    let center = layer.center();
    let Some(outline) = outline_of(layer) else {
        return center;
    };
    if focus == 0.0 || !focus.is_finite() {
        return center;
    }
    let adjacent_rel = point_relative_to_layer(layer, adjacent);
    let (hw, hh) = half_extents(layer);
    let scale = focus.abs();
    let candidates: Vec<Point> = match outline {
        Outline::Rectangle => rectangle_corners(hw * scale, hh * scale).to_vec(),
        Outline::Diamond => diamond_corners(hw * scale, hh * scale).to_vec(),
        Outline::Ellipse => ellipse_tangent_points(adjacent_rel, hw * scale, hh * scale),
    };

    let orientation = focus.signum();
    let mut best: Option<(f64, Point)> = None;
    for candidate in candidates {
        let offset = orientation * Line::through(adjacent_rel, candidate).c;
        if offset > best.map_or(0.0, |(d, _)| d) {
            best = Some((offset, candidate));
        }
    }
    match best {
        Some((_, point)) => point_from_relative(layer, point),
        None => center,
    }
}

/// Tangent points from `p` to the origin-centered ellipse, via its polar line.
fn ellipse_tangent_points(p: Point, rx: f64, ry: f64) -> Vec<Point> {
    if rx <= 0.0 || ry <= 0.0 {
        return Vec::new();
    }
    if (p.x / rx).powi(2) + (p.y / ry).powi(2) <= 1.0 {
        return Vec::new();
    }
    let polar = Line::equation(p.x / (rx * rx), p.y / (ry * ry), -1.0);
    polar.intersect_ellipse(rx, ry)
}
