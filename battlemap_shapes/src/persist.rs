// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Persist`] impls for shapes and layers.

use alloc::string::String;
use alloc::vec::Vec;

use battlemap_format::{FormatError, Persist, TokenReader, TokenWriter};
use kurbo::Point;
use peniko::Color;

use crate::{Geometry, LineCollection, Shape, ShapeId, ShapeKind, StrokeWidth};

/// Filled shapes are written with an infinite width.
impl Persist for StrokeWidth {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_f64(match self {
            Self::Stroked(width) => *width,
            Self::Filled => f64::INFINITY,
        });
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        let line = r.line();
        let width = r.read_f64()?;
        if width == f64::INFINITY {
            Ok(Self::Filled)
        } else if width.is_finite() && width >= 0.0 {
            Ok(Self::Stroked(width))
        } else {
            Err(FormatError::InvalidValue {
                line,
                reason: "stroke width must be non-negative",
            })
        }
    }
}

/// `{ kind id color stroke geometry... }`, with the geometry fields
/// depending on the kind.
impl Persist for Shape {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_str(self.kind().tag());
        w.write_u64(self.id().0);
        self.color().serialize(w);
        self.stroke_width().serialize(w);
        match self.geometry() {
            Geometry::Freehand { points } => points.serialize(w),
            Geometry::Straight { start: a, end: b }
            | Geometry::Circle { center: a, edge: b }
            | Geometry::Rectangle {
                corner: a,
                opposite: b,
            } => {
                a.serialize(w);
                b.serialize(w);
            }
            Geometry::Text {
                anchor,
                text,
                size_px,
            } => {
                anchor.serialize(w);
                w.write_str(text);
                w.write_f64(*size_px);
            }
            Geometry::Information { anchor, text } => {
                anchor.serialize(w);
                w.write_str(text);
            }
        }
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let line = r.line();
        let tag = r.read_string()?;
        let kind = ShapeKind::from_tag(&tag)
            .ok_or(FormatError::UnknownShapeKind { line, kind: tag })?;
        let id = ShapeId(r.read_u64()?);
        let color = Color::deserialize(r)?;
        let stroke = StrokeWidth::deserialize(r)?;
        let geometry = match kind {
            ShapeKind::Freehand => Geometry::Freehand {
                points: Vec::<Point>::deserialize(r)?,
            },
            ShapeKind::Straight => Geometry::Straight {
                start: Point::deserialize(r)?,
                end: Point::deserialize(r)?,
            },
            ShapeKind::Circle => Geometry::Circle {
                center: Point::deserialize(r)?,
                edge: Point::deserialize(r)?,
            },
            ShapeKind::Rectangle => Geometry::Rectangle {
                corner: Point::deserialize(r)?,
                opposite: Point::deserialize(r)?,
            },
            ShapeKind::Text => Geometry::Text {
                anchor: Point::deserialize(r)?,
                text: String::deserialize(r)?,
                size_px: r.read_finite_f64()?,
            },
            ShapeKind::Information => Geometry::Information {
                anchor: Point::deserialize(r)?,
                text: String::deserialize(r)?,
            },
        };
        r.expect_object_end()?;
        Ok(Self::new(id, color, stroke, geometry))
    }
}

/// `{ next_id [ shape* ] }`. Shapes that fail to load are skipped, shapes
/// without geometry are dropped and duplicate ids are reassigned.
impl Persist for LineCollection {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_u64(self.next_id());
        w.begin_array();
        for shape in self {
            shape.serialize(w);
        }
        w.end_array();
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let next_id = r.read_u64()?;
        let shapes: Vec<Shape> = Vec::deserialize(r)?;
        r.expect_object_end()?;
        let mut layer = Self::new();
        layer.restore(next_id, shapes);
        let dropped = layer.remove_invalid();
        if dropped > 0 {
            log::warn!("dropped {dropped} shapes without drawable geometry");
        }
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use battlemap_format::{FormatError, from_str, to_string};
    use kurbo::Point;
    use peniko::Color;

    use crate::{HitParams, LineCollection, Shape, ShapeId, StrokeWidth};

    fn sample_layer() -> LineCollection {
        let mut layer = LineCollection::new();
        let params = HitParams::default();
        let red = Color::from_rgba8(200, 10, 10, 255);
        let line = layer.create_freehand_line(Point::new(1.0, 2.0), red, StrokeWidth::Stroked(3.0));
        layer.add_point(line, Point::new(4.5, -2.0), &params);
        layer.add_point(line, Point::new(9.0, 0.25), &params);
        let wall = layer.create_straight_line(Point::ZERO, Color::BLACK, StrokeWidth::Stroked(1.0));
        layer.add_point(wall, Point::new(0.0, 50.0), &params);
        let pool = layer.create_circle(Point::new(30.0, 30.0), red, StrokeWidth::Filled);
        layer.add_point(pool, Point::new(35.0, 30.0), &params);
        let room = layer.create_rectangle(Point::ZERO, Color::BLACK, StrokeWidth::Filled);
        layer.add_point(room, Point::new(-20.0, 10.0), &params);
        layer.create_text(Point::new(5.0, 5.0), "Throne \"room\"", 18.0, Color::WHITE);
        layer.create_information(Point::new(7.0, 7.0), "secret door\nbehind", red);
        layer
    }

    #[test]
    fn layer_survives_a_save() {
        let layer = sample_layer();
        let text = to_string(&layer);
        assert!(text.contains("\ninf\n"), "filled shapes store an infinite width");

        let loaded: LineCollection = from_str(&text).unwrap();
        assert!(loaded.iter().eq(layer.iter()));
        assert_eq!(loaded.next_id(), layer.next_id());
    }

    #[test]
    fn unknown_shape_kind_is_skipped() {
        let layer = sample_layer();
        let text = to_string(&layer).replacen("\"circle\"", "\"hexagon\"", 1);
        let loaded: LineCollection = from_str(&text).unwrap();
        assert_eq!(loaded.len(), layer.len() - 1);

        let err = from_str::<Shape>("{\n\"hexagon\"\n1\n0\n1\n}\n").unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownShapeKind {
                line: 2,
                kind: String::from("hexagon"),
            }
        );
    }

    #[test]
    fn duplicate_and_stale_ids_are_fixed_on_load() {
        let layer = sample_layer();
        // Claim a too-small counter and give two shapes the same id.
        let text = to_string(&layer)
            .replacen("{\n7\n", "{\n1\n", 1)
            .replacen("\"straight\"\n2\n", "\"straight\"\n1\n", 1);
        let mut loaded: LineCollection = from_str(&text).unwrap();
        let ids: Vec<ShapeId> = loaded.iter().map(Shape::id).collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids[0], ShapeId(1));

        let fresh = loaded.create_text(Point::ZERO, "new", 10.0, Color::BLACK);
        assert!(ids.iter().all(|id| *id < fresh));
    }
}
