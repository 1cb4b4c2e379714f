// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cutting shapes with a circular eraser.

use alloc::vec;
use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::shape::circle_polygon;
use crate::{Geometry, Shape};

/// What an eraser stroke did to one shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Erased {
    /// The eraser missed the shape.
    Untouched,
    /// The shape is gone entirely.
    Removed,
    /// The shape was cut; these pieces replace it, in order.
    ///
    /// The first piece carries the original id. Further pieces carry it too
    /// and must be given fresh ids by the owning collection.
    Split(SmallVec<[Shape; 2]>),
}

/// Parameter range `[t0, t1]` of segment `a`–`b` lying inside the circle.
fn inside_interval(a: Point, b: Point, center: Point, r_sq: f64) -> Option<(f64, f64)> {
    let d = b - a;
    let f = a - center;
    let qa = d.hypot2();
    let qc = f.hypot2() - r_sq;
    if qa == 0.0 {
        return (qc <= 0.0).then_some((0.0, 1.0));
    }
    let qb = 2.0 * f.dot(d);
    let disc = qb * qb - 4.0 * qa * qc;
    // A tangent touch does not cut.
    if disc <= 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t0 = (-qb - root) / (2.0 * qa);
    let t1 = (-qb + root) / (2.0 * qa);
    if t1 <= 0.0 || t0 >= 1.0 {
        return None;
    }
    Some((t0.max(0.0), t1.min(1.0)))
}

/// Cuts an open polyline; `None` when the eraser does not touch it.
///
/// Returned pieces are not filtered and may be degenerate.
fn cut_polyline(points: &[Point], center: Point, radius: f64) -> Option<Vec<Vec<Point>>> {
    let r_sq = radius * radius;
    let mut cut = false;
    let mut pieces = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    for seg in points.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        match inside_interval(a, b, center, r_sq) {
            None => {
                if current.is_empty() {
                    current.push(a);
                }
                current.push(b);
            }
            Some((t0, t1)) => {
                cut = true;
                if t0 > 0.0 {
                    if current.is_empty() {
                        current.push(a);
                    }
                    current.push(a.lerp(b, t0));
                }
                if !current.is_empty() {
                    pieces.push(core::mem::take(&mut current));
                }
                if t1 < 1.0 {
                    current.push(a.lerp(b, t1));
                    current.push(b);
                }
            }
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    cut.then_some(pieces)
}

/// Cuts a closed outline given by its vertices.
fn cut_ring(vertices: &[Point], center: Point, radius: f64) -> Option<Vec<Vec<Point>>> {
    let r_sq = radius * radius;
    // Start the walk outside the eraser so the seam is never cut.
    let Some(start) = vertices
        .iter()
        .position(|p| p.distance_squared(center) > r_sq)
    else {
        return Some(Vec::new());
    };
    let mut ring: Vec<Point> = vertices[start..]
        .iter()
        .chain(&vertices[..start])
        .copied()
        .collect();
    ring.push(vertices[start]);
    let mut pieces = cut_polyline(&ring, center, radius)?;
    // The first and last pieces meet at the seam vertex.
    if pieces.len() >= 2 {
        let first = pieces.remove(0);
        if let Some(last) = pieces.last_mut() {
            last.extend(first.into_iter().skip(1));
        }
    }
    Some(pieces)
}

/// Where a shape starts: the first point it was created with.
fn first_point(geometry: &Geometry) -> Option<Point> {
    match geometry {
        Geometry::Freehand { points } => points.first().copied(),
        Geometry::Straight { start, .. } => Some(*start),
        Geometry::Circle { center, .. } => Some(*center),
        Geometry::Rectangle { corner, .. } => Some(*corner),
        Geometry::Text { anchor, .. } | Geometry::Information { anchor, .. } => Some(*anchor),
    }
}

fn has_two_distinct(points: &[Point]) -> bool {
    points
        .first()
        .is_some_and(|first| points.iter().any(|p| p != first))
}

impl Shape {
    /// Applies a circular eraser centred at `center` (world space).
    ///
    /// Stroked lines are cut where the eraser crosses them and may split
    /// into several pieces. Stroked circles and rectangles are cut along
    /// their outline and the remains become freehand lines. Filled shapes
    /// are removed wholesale as soon as the eraser touches their region.
    /// Text and markers are removed when the eraser covers their anchor,
    /// and so is a shape too degenerate to draw when the eraser covers its
    /// first point. Pieces with fewer than two distinct points are dropped.
    #[must_use]
    pub fn erase(&self, center: Point, radius: f64) -> Erased {
        if radius.is_nan() || radius <= 0.0 {
            return Erased::Untouched;
        }
        let whole = |hit: bool| if hit { Erased::Removed } else { Erased::Untouched };
        if !self.is_valid() {
            return whole(
                first_point(self.geometry()).is_some_and(|p| p.distance(center) <= radius),
            );
        }
        let filled = self.stroke_width().is_filled();
        let (pieces, straight) = match self.geometry() {
            Geometry::Text { anchor, .. } | Geometry::Information { anchor, .. } => {
                return whole(anchor.distance(center) <= radius);
            }
            _ if filled => return whole(self.region_distance(center) <= radius),
            Geometry::Freehand { points } => (cut_polyline(points, center, radius), false),
            Geometry::Straight { start, end } => {
                (cut_polyline(&[*start, *end], center, radius), true)
            }
            Geometry::Circle { center: c, edge } => {
                let ring = circle_polygon(*c, c.distance(*edge));
                (cut_ring(&ring, center, radius), false)
            }
            Geometry::Rectangle { corner, opposite } => {
                let r = Rect::from_points(*corner, *opposite);
                let ring = vec![
                    Point::new(r.x0, r.y0),
                    Point::new(r.x1, r.y0),
                    Point::new(r.x1, r.y1),
                    Point::new(r.x0, r.y1),
                ];
                (cut_ring(&ring, center, radius), false)
            }
        };
        let Some(pieces) = pieces else {
            return Erased::Untouched;
        };
        let shapes: SmallVec<[Self; 2]> = pieces
            .into_iter()
            .filter(|p| has_two_distinct(p))
            .map(|points| {
                let geometry = if straight {
                    Geometry::Straight {
                        start: points[0],
                        end: points[points.len() - 1],
                    }
                } else {
                    Geometry::Freehand { points }
                };
                Self::new(self.id(), self.color(), self.stroke_width(), geometry)
            })
            .collect();
        if shapes.is_empty() {
            Erased::Removed
        } else {
            Erased::Split(shapes)
        }
    }
}
