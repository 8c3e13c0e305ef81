//! Point helpers for lines and arrows.

use super::{Layer, LayerUpdate};
use crate::geometry::rotate_point;
use kurbo::{Point, Rect, Size};

/// Bounding box of local points.
pub fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
}

/// Width and height spanned by local points.
pub fn points_extent(points: &[Point]) -> Size {
    points_bounds(points).size()
}

/// Scene position of the point at `index`, rotation applied.
pub fn global_point(layer: &Layer, index: usize) -> Option<Point> {
    let data = layer.linear()?;
    let local = data.points.get(index)?;
    let center = layer.center();
    Some(rotate_point(
        Point::new(layer.x + local.x, layer.y + local.y),
        center,
        layer.angle,
    ))
}

/// Scene positions of every point.
pub fn global_points(layer: &Layer) -> Vec<Point> {
    let Some(data) = layer.linear() else {
        return Vec::new();
    };
    let center = layer.center();
    data.points
        .iter()
        .map(|p| rotate_point(Point::new(layer.x + p.x, layer.y + p.y), center, layer.angle))
        .collect()
}

/// Origin and local points reproducing `globals` under `angle`.
///
/// The rotation pivot of the result is the center of its own point box, so the
/// pivot is solved from `pivot_hint` instead of assumed.
pub fn relocate(globals: &[Point], angle: f64, pivot_hint: Point) -> (Point, Vec<Point>) {
    if globals.is_empty() {
        return (pivot_hint, Vec::new());
    }
    let unrotated: Vec<Point> = globals
        .iter()
        .map(|g| rotate_point(*g, pivot_hint, -angle))
        .collect();
    let pivot = rotate_point(points_bounds(&unrotated).center(), pivot_hint, angle);
    let placed: Vec<Point> = globals.iter().map(|g| rotate_point(*g, pivot, -angle)).collect();
    let origin = placed[0];
    let locals = placed.iter().map(|p| (*p - origin).to_point()).collect();
    (origin, locals)
}

/// Update moving the given points to scene positions, keeping the first point at (0, 0).
pub fn move_points(layer: &Layer, moves: &[(usize, Point)]) -> Option<LayerUpdate> {
    let mut globals = global_points(layer);
    for (index, target) in moves {
        *globals.get_mut(*index)? = *target;
    }
    let (origin, locals) = relocate(&globals, layer.angle, layer.center());
    Some(LayerUpdate::new().position(origin.x, origin.y).points(locals))
}

/// Axis of a point coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn get(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    fn set(self, p: &mut Point, value: f64) {
        match self {
            Axis::X => p.x = value,
            Axis::Y => p.y = value,
        }
    }
}

/// Scale points along one axis so they span `new_size`.
///
/// A negative size mirrors the points. With `normalize`, multi-point paths are
/// shifted back so their minimum coordinate is unchanged.
pub fn rescale_points(axis: Axis, new_size: f64, points: &[Point], normalize: bool) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }
    let (min, max) = points
        .iter()
        .map(|p| axis.get(*p))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let size = max - min;
    let scale = if size == 0.0 { 1.0 } else { new_size / size };

    let mut scaled: Vec<Point> = points
        .iter()
        .map(|p| {
            let mut q = *p;
            axis.set(&mut q, axis.get(*p) * scale);
            q
        })
        .collect();

    if normalize && scaled.len() > 2 {
        let next_min = scaled
            .iter()
            .map(|p| axis.get(*p))
            .fold(f64::INFINITY, f64::min);
        let translation = min - next_min;
        for p in &mut scaled {
            let value = axis.get(*p) + translation;
            axis.set(p, value);
        }
    }
    scaled
}

/// Scale points to the given width and height.
pub fn rescale_to(points: &[Point], width: f64, height: f64, normalize: bool) -> Vec<Point> {
    let vertical = rescale_points(Axis::Y, height, points, normalize);
    rescale_points(Axis::X, width, &vertical, normalize)
}

/// Point a connector label centers on.
///
/// Odd point counts use the middle point; even counts use the middle segment's midpoint.
pub fn effective_midpoint(layer: &Layer) -> Option<Point> {
    let globals = global_points(layer);
    let len = globals.len();
    if len < 2 {
        return None;
    }
    if len % 2 == 1 {
        return Some(globals[len / 2]);
    }
    let a = globals[len / 2 - 1];
    let b = globals[len / 2];
    Some(a.midpoint(b))
}
