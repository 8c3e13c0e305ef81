//! Point and line algebra shared by hit testing and binding.

pub mod collision;

use crate::layers::{Layer, LayerKind};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};

/// Line `a·x + b·y + c = 0` with `(a, b)` a unit normal.
///
/// `c` is then the signed distance of the origin from the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Line {
    /// Line from raw coefficients, normalized. A zero normal is kept as is.
    pub fn equation(a: f64, b: f64, c: f64) -> Self {
        let norm = a.hypot(b);
        if norm == 0.0 {
            return Self { a, b, c };
        }
        Self {
            a: a / norm,
            b: b / norm,
            c: c / norm,
        }
    }

    /// Line through `p` then `q`. Orientation follows the direction `p → q`.
    pub fn through(p: Point, q: Point) -> Self {
        Self::equation(p.y - q.y, q.x - p.x, p.x * q.y - q.x * p.y)
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == 0.0 && self.b == 0.0
    }

    pub fn normal(&self) -> Vec2 {
        Vec2::new(self.a, self.b)
    }

    /// Positive on the side the normal points to.
    pub fn signed_distance(&self, p: Point) -> f64 {
        self.a * p.x + self.b * p.y + self.c
    }

    /// Intersection with the segment `p → q`, endpoints included.
    pub fn intersect_segment(&self, p: Point, q: Point) -> Option<Point> {
        let sp = self.signed_distance(p);
        let sq = self.signed_distance(q);
        if sp * sq > 0.0 || sp == sq {
            return None;
        }
        let t = sp / (sp - sq);
        Some(p.lerp(q, t))
    }

    /// Intersections with a circle.
    pub fn intersect_circle(&self, center: Point, radius: f64) -> Vec<Point> {
        if radius <= 0.0 || self.is_degenerate() {
            return Vec::new();
        }
        let d = self.signed_distance(center);
        if d.abs() > radius {
            return Vec::new();
        }
        let foot = center - self.normal() * d;
        let half_chord = (radius * radius - d * d).max(0.0).sqrt();
        let along = Vec2::new(self.b, -self.a) * half_chord;
        vec![foot + along, foot - along]
    }

    /// Intersections with the origin-centered ellipse of radii `rx`, `ry`.
    pub fn intersect_ellipse(&self, rx: f64, ry: f64) -> Vec<Point> {
        let Line { a: m, b: n, c } = *self;
        let squares = rx * rx * m * m + ry * ry * n * n;
        let discr = squares - c * c;
        if squares == 0.0 || discr <= 0.0 {
            return Vec::new();
        }
        let root = discr.sqrt();
        let x_mid = -rx * rx * m * c;
        let y_mid = -ry * ry * n * c;
        let x_off = rx * ry * n * root;
        let y_off = rx * ry * m * root;
        vec![
            Point::new((x_mid + x_off) / squares, (y_mid - y_off) / squares),
            Point::new((x_mid - x_off) / squares, (y_mid + y_off) / squares),
        ]
    }
}

/// Rotate `p` around `center` by `angle` radians.
pub fn rotate_point(p: Point, center: Point, angle: f64) -> Point {
    if angle == 0.0 {
        return p;
    }
    let (sin, cos) = angle.sin_cos();
    let d = p - center;
    Point::new(
        center.x + d.x * cos - d.y * sin,
        center.y + d.x * sin + d.y * cos,
    )
}

/// Normalize an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let turn = std::f64::consts::TAU;
    let normalized = angle.rem_euclid(turn);
    if normalized >= turn { 0.0 } else { normalized }
}

/// Outline of a layer in its local, unrotated frame.
///
/// Shapes span `(0, 0)` to `(width, height)`; connectors use their points.
pub fn outline(layer: &Layer) -> BezPath {
    let w = layer.width;
    let h = layer.height;
    match &layer.kind {
        LayerKind::Rectangle | LayerKind::Image(_) | LayerKind::Text(_) => {
            Rect::new(0.0, 0.0, w, h).to_path(0.1)
        }
        LayerKind::Ellipse => kurbo::Ellipse::from_rect(Rect::new(0.0, 0.0, w, h)).to_path(0.1),
        LayerKind::Diamond => {
            let mut path = BezPath::new();
            path.move_to((w / 2.0, 0.0));
            path.line_to((w, h / 2.0));
            path.line_to((w / 2.0, h));
            path.line_to((0.0, h / 2.0));
            path.close_path();
            path
        }
        LayerKind::Line(data) | LayerKind::Arrow(data) => {
            let mut path = BezPath::new();
            for (i, p) in data.points.iter().enumerate() {
                if i == 0 {
                    path.move_to(*p);
                } else {
                    path.line_to(*p);
                }
            }
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_line_through_offset() {
        let line = Line::through(Point::new(0.0, 1.0), Point::new(1.0, 1.0));
        assert!((line.signed_distance(Point::ZERO) - -1.0).abs() < 1e-12);
        assert!((line.signed_distance(Point::new(5.0, 2.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_intersection() {
        let line = Line::through(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let hit = line.intersect_segment(Point::new(0.0, 10.0), Point::new(10.0, 0.0)).unwrap();
        assert!((hit.x - 5.0).abs() < 1e-12);
        assert!((hit.y - 5.0).abs() < 1e-12);
        assert!(line.intersect_segment(Point::new(0.0, 10.0), Point::new(-5.0, 20.0)).is_none());
    }

    #[test]
    fn test_circle_intersection() {
        let line = Line::equation(0.0, 1.0, 0.0);
        let hits = line.intersect_circle(Point::ZERO, 5.0);
        assert_eq!(hits.len(), 2);
        for hit in hits {
            assert!((hit.x.abs() - 5.0).abs() < 1e-12);
            assert!(hit.y.abs() < 1e-12);
        }
    }

    #[test]
    fn test_ellipse_intersection_on_curve() {
        let line = Line::through(Point::new(-100.0, 10.0), Point::new(100.0, 30.0));
        let hits = line.intersect_ellipse(60.0, 40.0);
        assert_eq!(hits.len(), 2);
        for hit in hits {
            let on = (hit.x / 60.0).powi(2) + (hit.y / 40.0).powi(2);
            assert!((on - 1.0).abs() < 1e-9);
            assert!(line.signed_distance(hit).abs() < 1e-9);
        }
        let miss = Line::equation(0.0, 1.0, -50.0);
        assert!(miss.intersect_ellipse(60.0, 40.0).is_empty());
    }

    #[test]
    fn test_rotate_point() {
        let p = rotate_point(Point::new(1.0, 0.0), Point::ZERO, FRAC_PI_2);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(5.0 * PI / 2.0) - FRAC_PI_2).abs() < 1e-12);
        assert!((normalize_angle(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!(normalize_angle(2.0 * PI).abs() < 1e-12);
    }
}
