// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::Color;

use battlemap_canvas::{Canvas, CanvasExt, Pen, text_extent};
use battlemap_view::CoordinateTransformer;

use crate::BoundingRectangle;

/// On-screen size, in pixels, of an information marker's icon.
pub const INFO_ICON_PX: f64 = 24.0;

/// Font size, in pixels, of the label drawn next to an information marker.
pub const INFO_LABEL_PX: f64 = 14.0;

/// Number of segments used when a circle is turned into a polygon.
pub const CIRCLE_SEGMENTS: usize = 64;

/// Thinnest on-screen stroke, so lines never vanish when zoomed out.
const MIN_SCREEN_STROKE: f64 = 1.0;

/// Identity of a shape within its [`LineCollection`](crate::LineCollection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u64);

/// How a shape is painted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrokeWidth {
    /// Outline with the given width in world units.
    Stroked(f64),
    /// Fill the shape's region. Persisted as an infinite stroke width.
    Filled,
}

impl StrokeWidth {
    /// Returns `true` for [`StrokeWidth::Filled`].
    #[must_use]
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Filled)
    }

    /// Half the stroke width, or zero for filled shapes.
    #[must_use]
    pub fn half_width(self) -> f64 {
        match self {
            Self::Stroked(w) => w.max(0.0) / 2.0,
            Self::Filled => 0.0,
        }
    }
}

/// Variant tag of a [`Geometry`], used to filter queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// [`Geometry::Freehand`].
    Freehand,
    /// [`Geometry::Straight`].
    Straight,
    /// [`Geometry::Circle`].
    Circle,
    /// [`Geometry::Rectangle`].
    Rectangle,
    /// [`Geometry::Text`].
    Text,
    /// [`Geometry::Information`].
    Information,
}

impl ShapeKind {
    /// Tag used in saved files.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Freehand => "freehand",
            Self::Straight => "straight",
            Self::Circle => "circle",
            Self::Rectangle => "rectangle",
            Self::Text => "text",
            Self::Information => "information",
        }
    }

    /// Inverse of [`ShapeKind::tag`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "freehand" => Self::Freehand,
            "straight" => Self::Straight,
            "circle" => Self::Circle,
            "rectangle" => Self::Rectangle,
            "text" => Self::Text,
            "information" => Self::Information,
            _ => return None,
        })
    }
}

/// World-space geometry of a shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Arbitrary polyline.
    Freehand {
        /// Vertices in drawing order.
        points: Vec<Point>,
    },
    /// Segment between two endpoints.
    Straight {
        /// First endpoint.
        start: Point,
        /// Second endpoint.
        end: Point,
    },
    /// Circle given by its centre and a point on the circumference.
    Circle {
        /// Centre.
        center: Point,
        /// Any point on the circumference.
        edge: Point,
    },
    /// Axis-aligned rectangle given by two opposite corners.
    Rectangle {
        /// First corner.
        corner: Point,
        /// Opposite corner.
        opposite: Point,
    },
    /// Text with a fixed on-screen size; `anchor` is its top-left corner.
    Text {
        /// World position of the top-left corner.
        anchor: Point,
        /// Content.
        text: String,
        /// Font size in screen pixels.
        size_px: f64,
    },
    /// Information marker: a fixed-size icon centred on `anchor`.
    Information {
        /// World position of the icon centre.
        anchor: Point,
        /// Note shown next to the icon.
        text: String,
    },
}

impl Geometry {
    /// The variant tag.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Freehand { .. } => ShapeKind::Freehand,
            Self::Straight { .. } => ShapeKind::Straight,
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Text { .. } => ShapeKind::Text,
            Self::Information { .. } => ShapeKind::Information,
        }
    }

    /// Every point that defines the geometry.
    #[must_use]
    pub fn defining_points(&self) -> Vec<Point> {
        match self {
            Self::Freehand { points } => points.clone(),
            Self::Straight { start, end } => vec![*start, *end],
            Self::Circle { center, edge } => vec![*center, *edge],
            Self::Rectangle { corner, opposite } => vec![*corner, *opposite],
            Self::Text { anchor, .. } | Self::Information { anchor, .. } => vec![*anchor],
        }
    }

    fn radius(center: Point, edge: Point) -> f64 {
        center.distance(edge)
    }
}

/// A drawable primitive on one map layer.
///
/// `bounds` encloses every defining point plus half the stroke width. Text
/// and information markers have a fixed on-screen size, so their visual
/// extent depends on the zoom level; see [`Shape::extent`].
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    id: ShapeId,
    color: Color,
    stroke_width: StrokeWidth,
    geometry: Geometry,
    bounds: BoundingRectangle,
}

impl Shape {
    /// Creates a shape and computes its bounds.
    #[must_use]
    pub fn new(id: ShapeId, color: Color, stroke_width: StrokeWidth, geometry: Geometry) -> Self {
        let mut shape = Self {
            id,
            color,
            stroke_width,
            geometry,
            bounds: BoundingRectangle::EMPTY,
        };
        shape.recompute_bounds();
        shape
    }

    /// Identity within the owning collection.
    #[must_use]
    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ShapeId) {
        self.id = id;
    }

    /// Paint colour.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Changes the paint colour.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Stroke width or fill.
    #[must_use]
    pub fn stroke_width(&self) -> StrokeWidth {
        self.stroke_width
    }

    /// World-space geometry.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub(crate) fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    /// The variant tag.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// Bounds of the defining points plus half the stroke width.
    #[must_use]
    pub fn bounds(&self) -> &BoundingRectangle {
        &self.bounds
    }

    pub(crate) fn recompute_bounds(&mut self) {
        let mut bounds = match &self.geometry {
            Geometry::Circle { center, edge } => {
                let r = Geometry::radius(*center, *edge);
                BoundingRectangle::from_rect(Rect::from_center_size(*center, (2.0 * r, 2.0 * r)))
            }
            geometry => BoundingRectangle::from_points(geometry.defining_points()),
        };
        // Keeps the circle's edge point inside too.
        for p in self.geometry.defining_points() {
            bounds.update_bounds(p);
        }
        bounds.expand(self.stroke_width.half_width());
        self.bounds = bounds;
    }

    /// Extends the geometry with a new world-space point.
    ///
    /// Freehand lines append it. Straight lines, circles and rectangles move
    /// their second defining point to it. Text and information markers move
    /// their anchor.
    pub fn add_point(&mut self, pt: Point) {
        match &mut self.geometry {
            Geometry::Freehand { points } => {
                points.push(pt);
                let half = self.stroke_width.half_width();
                let mut grown = BoundingRectangle::from_points([pt]);
                grown.expand(half);
                self.bounds.update_bounds_rect(&grown);
                return;
            }
            Geometry::Straight { end: second, .. }
            | Geometry::Circle { edge: second, .. }
            | Geometry::Rectangle {
                opposite: second, ..
            }
            | Geometry::Text { anchor: second, .. }
            | Geometry::Information { anchor: second, .. } => *second = pt,
        }
        self.recompute_bounds();
    }

    /// Returns `true` once the shape has enough geometry to be drawn.
    ///
    /// Lines need two distinct points, circles a positive radius, rectangles
    /// a non-zero width and height, and text a non-empty string. Information
    /// markers are always valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match &self.geometry {
            Geometry::Freehand { points } => points
                .first()
                .is_some_and(|first| points.iter().any(|p| p != first)),
            Geometry::Straight { start, end } => start != end,
            Geometry::Circle { center, edge } => center != edge,
            Geometry::Rectangle { corner, opposite } => {
                corner.x != opposite.x && corner.y != opposite.y
            }
            Geometry::Text { text, size_px, .. } => !text.is_empty() && *size_px > 0.0,
            Geometry::Information { .. } => true,
        }
    }

    /// Moves the whole shape by `delta` world units.
    pub fn translate(&mut self, delta: Vec2) {
        match &mut self.geometry {
            Geometry::Freehand { points } => {
                for p in points {
                    *p += delta;
                }
            }
            Geometry::Straight { start: a, end: b }
            | Geometry::Circle { center: a, edge: b }
            | Geometry::Rectangle {
                corner: a,
                opposite: b,
            } => {
                *a += delta;
                *b += delta;
            }
            Geometry::Text { anchor, .. } | Geometry::Information { anchor, .. } => {
                *anchor += delta;
            }
        }
        self.recompute_bounds();
    }

    /// World-space area the shape paints when `world_per_px` world units map
    /// to one screen pixel.
    #[must_use]
    pub fn extent(&self, world_per_px: f64) -> Rect {
        match &self.geometry {
            Geometry::Text {
                anchor,
                text,
                size_px,
            } => {
                let size = text_extent(text, *size_px);
                Rect::from_origin_size(
                    *anchor,
                    (size.width * world_per_px, size.height * world_per_px),
                )
            }
            Geometry::Information { anchor, text } => {
                let half = INFO_ICON_PX / 2.0 * world_per_px;
                let label = text_extent(text, INFO_LABEL_PX);
                let icon = Rect::from_center_size(*anchor, (2.0 * half, 2.0 * half));
                let label = Rect::from_origin_size(
                    Point::new(anchor.x + half, anchor.y - half),
                    (label.width * world_per_px, label.height * world_per_px),
                );
                icon.union(label)
            }
            _ => self
                .bounds
                .to_rect()
                .unwrap_or_else(|| Rect::from_origin_size(Point::ZERO, (0.0, 0.0))),
        }
    }

    /// Screen-space area the shape paints under `transformer`.
    #[must_use]
    pub fn screen_bounds(&self, transformer: &CoordinateTransformer) -> Rect {
        let world_per_px = transformer.screen_to_world_distance(1.0);
        let rect = transformer.world_to_screen_rect(self.extent(world_per_px));
        // Round and thin strokes may spill by up to a pixel.
        rect.inflate(MIN_SCREEN_STROKE, MIN_SCREEN_STROKE)
    }

    fn pen(&self, transformer: &CoordinateTransformer) -> Pen {
        let width = transformer
            .world_to_screen_distance(self.stroke_width.half_width() * 2.0)
            .max(MIN_SCREEN_STROKE);
        Pen::new(width, self.color)
    }

    /// Draws the shape in screen space. Invalid shapes draw nothing.
    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, transformer: &CoordinateTransformer) {
        if !self.is_valid() {
            return;
        }
        let to_screen = |p: Point| transformer.world_to_screen(p);
        let filled = self.stroke_width.is_filled();
        match &self.geometry {
            Geometry::Freehand { points } => {
                let screen: Vec<Point> = points.iter().map(|p| to_screen(*p)).collect();
                if filled {
                    canvas.fill_path(&polygon_path(&screen), self.color);
                } else {
                    canvas.stroke_polyline(&screen, self.pen(transformer));
                }
            }
            Geometry::Straight { start, end } => {
                canvas.stroke_line(to_screen(*start), to_screen(*end), self.pen(transformer));
            }
            Geometry::Circle { center, edge } => {
                let r = transformer.world_to_screen_distance(Geometry::radius(*center, *edge));
                if filled {
                    canvas.fill_circle(to_screen(*center), r, self.color);
                } else {
                    canvas.stroke_circle(to_screen(*center), r, self.pen(transformer));
                }
            }
            Geometry::Rectangle { corner, opposite } => {
                let rect = Rect::from_points(to_screen(*corner), to_screen(*opposite));
                if filled {
                    canvas.fill_rect(rect, self.color);
                } else {
                    canvas.stroke_rect(rect, self.pen(transformer));
                }
            }
            Geometry::Text {
                anchor,
                text,
                size_px,
            } => canvas.draw_text(to_screen(*anchor), text, *size_px, self.color),
            Geometry::Information { anchor, text } => {
                let center = to_screen(*anchor);
                let half = INFO_ICON_PX / 2.0;
                canvas.fill_circle(center, half, self.color);
                let glyph = text_extent("i", INFO_ICON_PX * 0.75);
                canvas.draw_text(
                    center - glyph.to_vec2() / 2.0,
                    "i",
                    INFO_ICON_PX * 0.75,
                    Color::WHITE,
                );
                if !text.is_empty() {
                    canvas.draw_text(
                        Point::new(center.x + half, center.y - half),
                        text,
                        INFO_LABEL_PX,
                        self.color,
                    );
                }
            }
        }
    }

    /// Screen-space region this shape contributes to a fog-of-war mask.
    ///
    /// Freehand lines contribute the polygon they enclose, circles their
    /// disc and rectangles their area. Straight lines, text and markers
    /// have no area and contribute nothing. Every returned subpath winds the
    /// same way, so regions combined into one path under the non-zero rule
    /// form their union.
    #[must_use]
    pub fn region_path(&self, transformer: &CoordinateTransformer) -> Option<BezPath> {
        if !self.is_valid() {
            return None;
        }
        let polygon: Vec<Point> = match &self.geometry {
            Geometry::Freehand { points } if points.len() >= 3 => points
                .iter()
                .map(|p| transformer.world_to_screen(*p))
                .collect(),
            Geometry::Circle { center, edge } => {
                circle_polygon(*center, Geometry::radius(*center, *edge))
                    .into_iter()
                    .map(|p| transformer.world_to_screen(p))
                    .collect()
            }
            Geometry::Rectangle { corner, opposite } => {
                let r = Rect::from_points(
                    transformer.world_to_screen(*corner),
                    transformer.world_to_screen(*opposite),
                );
                vec![
                    Point::new(r.x0, r.y0),
                    Point::new(r.x1, r.y0),
                    Point::new(r.x1, r.y1),
                    Point::new(r.x0, r.y1),
                ]
            }
            _ => return None,
        };
        Some(polygon_path(&oriented(polygon)))
    }
}

/// Vertices of a regular polygon approximating a circle, without repeating
/// the first vertex.
pub(crate) fn circle_polygon(center: Point, radius: f64) -> Vec<Point> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = i as f64 / CIRCLE_SEGMENTS as f64 * core::f64::consts::TAU;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Twice the signed area of a closed polygon.
pub(crate) fn signed_area2(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Reorders `points` so the polygon has non-negative signed area.
fn oriented(mut points: Vec<Point>) -> Vec<Point> {
    if signed_area2(&points) < 0.0 {
        points.reverse();
    }
    points
}

/// Closed path through `points`.
pub(crate) fn polygon_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.move_to(*first);
        for p in iter {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use battlemap_canvas::{RecordedOp, RecordingCanvas};
    use battlemap_view::CoordinateTransformer;
    use kurbo::{Point, Rect, Vec2};
    use peniko::Color;

    use super::{Geometry, Shape, ShapeId, ShapeKind, StrokeWidth, signed_area2};

    fn freehand(points: &[(f64, f64)], width: f64) -> Shape {
        Shape::new(
            ShapeId(1),
            Color::BLACK,
            StrokeWidth::Stroked(width),
            Geometry::Freehand {
                points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            },
        )
    }

    #[test]
    fn bounds_track_points_and_half_width() {
        let mut s = freehand(&[(0.0, 0.0)], 4.0);
        s.add_point(Point::new(10.0, 5.0));
        assert_eq!(s.bounds().to_rect(), Some(Rect::new(-2.0, -2.0, 12.0, 7.0)));
        s.translate(Vec2::new(1.0, 1.0));
        assert_eq!(s.bounds().to_rect(), Some(Rect::new(-1.0, -1.0, 13.0, 8.0)));

        let circle = Shape::new(
            ShapeId(2),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Circle {
                center: Point::new(0.0, 0.0),
                edge: Point::new(3.0, 4.0),
            },
        );
        assert_eq!(circle.bounds().to_rect(), Some(Rect::new(-5.0, -5.0, 5.0, 5.0)));
    }

    #[test]
    fn validity_rules() {
        assert!(!freehand(&[(1.0, 1.0), (1.0, 1.0)], 1.0).is_valid());
        assert!(freehand(&[(1.0, 1.0), (1.0, 2.0)], 1.0).is_valid());

        let mut rect = Shape::new(
            ShapeId(3),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Rectangle {
                corner: Point::ZERO,
                opposite: Point::ZERO,
            },
        );
        rect.add_point(Point::new(5.0, 0.0));
        assert!(!rect.is_valid(), "zero height rectangle");
        rect.add_point(Point::new(5.0, 2.0));
        assert!(rect.is_valid());

        let text = Shape::new(
            ShapeId(4),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Text {
                anchor: Point::ZERO,
                text: "".to_string(),
                size_px: 12.0,
            },
        );
        assert!(!text.is_valid());
        let info = Shape::new(
            ShapeId(5),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Information {
                anchor: Point::ZERO,
                text: "".to_string(),
            },
        );
        assert!(info.is_valid());
    }

    #[test]
    fn text_keeps_screen_size_across_zoom() {
        let text = Shape::new(
            ShapeId(6),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Text {
                anchor: Point::new(10.0, 10.0),
                text: "abc".to_string(),
                size_px: 20.0,
            },
        );
        let near = text.extent(0.5);
        let far = text.extent(2.0);
        assert!((far.width() / near.width() - 4.0).abs() < 1e-9);

        let mut zoomed = CoordinateTransformer::IDENTITY;
        zoomed.zoom(3.0, Point::ZERO);
        let a = text.screen_bounds(&CoordinateTransformer::IDENTITY);
        let b = text.screen_bounds(&zoomed);
        assert!((a.width() - b.width()).abs() < 1e-9);
        assert!((a.height() - b.height()).abs() < 1e-9);
    }

    #[test]
    fn draw_skips_invalid_and_maps_to_screen() {
        let t = CoordinateTransformer::new(2.0, Vec2::new(5.0, 0.0));
        let mut canvas = RecordingCanvas::new();
        freehand(&[(1.0, 1.0)], 1.0).draw(&mut canvas, &t);
        assert!(canvas.events().is_empty());

        freehand(&[(0.0, 0.0), (1.0, 1.0)], 3.0).draw(&mut canvas, &t);
        let ops: vec::Vec<_> = canvas.draws().cloned().collect();
        match &ops[..] {
            [RecordedOp::Polyline { points, pen }] => {
                assert_eq!(points, &vec![Point::new(5.0, 0.0), Point::new(7.0, 2.0)]);
                assert_eq!(pen.width, 6.0);
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn region_paths_wind_consistently() {
        let t = CoordinateTransformer::IDENTITY;
        let clockwise = freehand(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)], 1.0);
        let counter = freehand(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], 1.0);
        for shape in [clockwise, counter] {
            let path = shape.region_path(&t).unwrap();
            let pts: vec::Vec<Point> = path
                .elements()
                .iter()
                .filter_map(|el| el.end_point())
                .collect();
            assert!(signed_area2(&pts) > 0.0);
        }
        let line = Shape::new(
            ShapeId(9),
            Color::BLACK,
            StrokeWidth::Filled,
            Geometry::Straight {
                start: Point::ZERO,
                end: Point::new(4.0, 4.0),
            },
        );
        assert!(line.region_path(&t).is_none());
        assert_eq!(line.kind(), ShapeKind::Straight);
        assert_eq!(ShapeKind::from_tag(ShapeKind::Information.tag()), Some(ShapeKind::Information));
    }
}
