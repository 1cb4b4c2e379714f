// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Precise, world-space hit testing of shapes.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Line, ParamCurveNearest, Point, Rect};

use crate::shape::INFO_ICON_PX;
use crate::{Geometry, Shape};

/// Scale-dependent parameters for queries against shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitParams {
    /// Extra slack, in world units, added around strokes and regions.
    pub tolerance: f64,
    /// World units covered by one screen pixel; sizes fixed-size labels.
    pub world_units_per_pixel: f64,
}

impl Default for HitParams {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            world_units_per_pixel: 1.0,
        }
    }
}

impl HitParams {
    /// Parameters for a screen-space tolerance at the given zoom level.
    #[must_use]
    pub fn from_screen(tolerance_px: f64, world_units_per_pixel: f64) -> Self {
        Self {
            tolerance: tolerance_px * world_units_per_pixel,
            world_units_per_pixel,
        }
    }
}

/// What part of a shape was hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitKind {
    /// Near a stroked outline or line.
    Stroke,
    /// Inside a filled region.
    Fill,
    /// On a text box or marker icon.
    Label,
}

/// A successful hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitScore {
    /// Distance from the query point to the hit geometry; zero when inside.
    pub distance: f64,
    /// What was hit.
    pub kind: HitKind,
}

fn within(distance: f64, limit: f64, kind: HitKind) -> Option<HitScore> {
    (distance <= limit).then_some(HitScore { distance, kind })
}

/// Distance from `pt` to the segment `a`–`b`.
pub(crate) fn segment_distance(pt: Point, a: Point, b: Point) -> f64 {
    if a == b {
        return pt.distance(a);
    }
    Line::new(a, b).nearest(pt, 0.).distance_sq.sqrt()
}

/// Distance from `pt` to an open polyline.
pub(crate) fn polyline_distance(pt: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => pt.distance(*only),
        _ => points
            .windows(2)
            .map(|seg| segment_distance(pt, seg[0], seg[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from `pt` to the outline of a closed polygon.
pub(crate) fn outline_distance(pt: Point, polygon: &[Point]) -> f64 {
    let closing = match (polygon.first(), polygon.last()) {
        (Some(first), Some(last)) => segment_distance(pt, *last, *first),
        _ => f64::INFINITY,
    };
    polyline_distance(pt, polygon).min(closing)
}

/// Non-zero winding test of `pt` against a closed polygon.
pub(crate) fn polygon_contains(pt: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut winding = 0_i32;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + 1) % n]);
        let side = (b.x - a.x) * (pt.y - a.y) - (pt.x - a.x) * (b.y - a.y);
        if a.y <= pt.y {
            if b.y > pt.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= pt.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}

fn rect_edge_distance(pt: Point, rect: Rect) -> f64 {
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    outline_distance(pt, &corners)
}

/// Distance from `pt` to the filled interior of a rectangle (zero inside).
fn rect_region_distance(pt: Point, rect: Rect) -> f64 {
    let dx = (rect.x0 - pt.x).max(pt.x - rect.x1).max(0.0);
    let dy = (rect.y0 - pt.y).max(pt.y - rect.y1).max(0.0);
    dx.hypot(dy)
}

impl Shape {
    /// Hit-tests a world-space point.
    ///
    /// Stroked geometry is hit within half the stroke width plus
    /// [`HitParams::tolerance`]; filled geometry anywhere inside its region
    /// or within the tolerance of it. Text and markers are hit on their
    /// on-screen box. Invalid shapes are never hit.
    #[must_use]
    pub fn hit_test(&self, pt: Point, params: &HitParams) -> Option<HitScore> {
        if !self.is_valid() {
            return None;
        }
        let stroke = self.stroke_width();
        let limit = stroke.half_width() + params.tolerance;
        match self.geometry() {
            Geometry::Freehand { points } => {
                if stroke.is_filled() && polygon_contains(pt, points) {
                    return within(0.0, 0.0, HitKind::Fill);
                }
                let distance = if stroke.is_filled() {
                    outline_distance(pt, points)
                } else {
                    polyline_distance(pt, points)
                };
                within(distance, limit, HitKind::Stroke)
            }
            Geometry::Straight { start, end } => {
                within(segment_distance(pt, *start, *end), limit, HitKind::Stroke)
            }
            Geometry::Circle { center, edge } => {
                let r = center.distance(*edge);
                let d = pt.distance(*center);
                if stroke.is_filled() {
                    within((d - r).max(0.0), limit, HitKind::Fill)
                } else {
                    within((d - r).abs(), limit, HitKind::Stroke)
                }
            }
            Geometry::Rectangle { corner, opposite } => {
                let rect = Rect::from_points(*corner, *opposite);
                if stroke.is_filled() {
                    within(rect_region_distance(pt, rect), limit, HitKind::Fill)
                } else {
                    within(rect_edge_distance(pt, rect), limit, HitKind::Stroke)
                }
            }
            Geometry::Text { .. } => {
                let boxed = self.extent(params.world_units_per_pixel);
                within(rect_region_distance(pt, boxed), params.tolerance, HitKind::Label)
            }
            Geometry::Information { anchor, .. } => {
                let half = INFO_ICON_PX / 2.0 * params.world_units_per_pixel;
                let icon = Rect::from_center_size(*anchor, (2.0 * half, 2.0 * half));
                within(rect_region_distance(pt, icon), params.tolerance, HitKind::Label)
            }
        }
    }

    /// Distance from `pt` to the area this shape covers, ignoring stroke
    /// width; zero inside filled regions.
    pub(crate) fn region_distance(&self, pt: Point) -> f64 {
        match self.geometry() {
            Geometry::Freehand { points } => {
                if self.stroke_width().is_filled() {
                    if polygon_contains(pt, points) {
                        0.0
                    } else {
                        outline_distance(pt, points)
                    }
                } else {
                    polyline_distance(pt, points)
                }
            }
            Geometry::Straight { start, end } => segment_distance(pt, *start, *end),
            Geometry::Circle { center, edge } => {
                let r = center.distance(*edge);
                let d = pt.distance(*center);
                if self.stroke_width().is_filled() {
                    (d - r).max(0.0)
                } else {
                    (d - r).abs()
                }
            }
            Geometry::Rectangle { corner, opposite } => {
                let rect = Rect::from_points(*corner, *opposite);
                if self.stroke_width().is_filled() {
                    rect_region_distance(pt, rect)
                } else {
                    rect_edge_distance(pt, rect)
                }
            }
            Geometry::Text { anchor, .. } | Geometry::Information { anchor, .. } => {
                pt.distance(*anchor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Point;
    use peniko::Color;

    use super::{HitKind, HitParams, polygon_contains, segment_distance};
    use crate::{Geometry, Shape, ShapeId, StrokeWidth};

    #[test]
    fn stroked_line_hit_and_miss() {
        let line = Shape::new(
            ShapeId(1),
            Color::BLACK,
            StrokeWidth::Stroked(2.0),
            Geometry::Straight {
                start: Point::new(0.0, 0.0),
                end: Point::new(10.0, 0.0),
            },
        );
        let params = HitParams::default();
        assert!(line.hit_test(Point::new(5.0, 0.0), &params).is_some());
        assert!(line.hit_test(Point::new(5.0, 0.5), &params).is_some());
        assert!(line.hit_test(Point::new(5.0, 5.0), &params).is_none());

        let loose = HitParams::from_screen(5.0, 1.0);
        let hit = line.hit_test(Point::new(5.0, 5.0), &loose).unwrap();
        assert_eq!(hit.kind, HitKind::Stroke);
        assert!((hit.distance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn filled_regions_hit_inside() {
        let circle = Shape::new(
            ShapeId(2),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Circle {
                center: Point::ZERO,
                edge: Point::new(10.0, 0.0),
            },
        );
        let params = HitParams::default();
        assert_eq!(
            circle.hit_test(Point::new(3.0, 3.0), &params).map(|h| h.kind),
            Some(HitKind::Fill)
        );
        assert!(circle.hit_test(Point::new(8.0, 8.0), &params).is_none());

        let ring = Shape::new(
            ShapeId(3),
            Color::BLACK,
            StrokeWidth::Stroked(1.0),
            Geometry::Circle {
                center: Point::ZERO,
                edge: Point::new(10.0, 0.0),
            },
        );
        assert!(ring.hit_test(Point::new(3.0, 3.0), &params).is_none());
        assert!(ring.hit_test(Point::new(0.0, 10.4), &params).is_some());
    }

    #[test]
    fn text_hit_area_scales_with_zoom() {
        let text = Shape::new(
            ShapeId(4),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Text {
                anchor: Point::ZERO,
                text: "door".into(),
                size_px: 10.0,
            },
        );
        // "door" is 24 px wide; at 1 world unit per px (20, 5) is inside.
        let near = HitParams::from_screen(0.0, 1.0);
        assert!(text.hit_test(Point::new(20.0, 5.0), &near).is_some());
        // Zoomed in 4x the box only covers 6 world units.
        let zoomed = HitParams::from_screen(0.0, 0.25);
        assert!(text.hit_test(Point::new(20.0, 5.0), &zoomed).is_none());
    }

    #[test]
    fn winding_and_degenerate_segments() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!(polygon_contains(Point::new(2.0, 2.0), &square));
        assert!(!polygon_contains(Point::new(5.0, 2.0), &square));
        assert_eq!(segment_distance(Point::new(3.0, 4.0), Point::ZERO, Point::ZERO), 5.0);
    }
}
