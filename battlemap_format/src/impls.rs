// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Persist`] impls for primitives, containers, geometry and view types.

use alloc::string::String;
use alloc::vec::Vec;

use battlemap_view::{CoordinateTransformer, Grid, SnapMode};
use kurbo::{Point, Vec2};
use peniko::Color;

use crate::{FormatError, Persist, TokenReader, TokenWriter};

impl Persist for f64 {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_f64(*self);
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.read_f64()
    }
}

impl Persist for u64 {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_u64(*self);
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.read_u64()
    }
}

impl Persist for bool {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_bool(*self);
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.read_bool()
    }
}

impl Persist for String {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_str(self);
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.read_string()
    }
}

/// Arrays recover per element: unreadable elements are logged and dropped.
impl<T: Persist> Persist for Vec<T> {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_array();
        for item in self {
            item.serialize(w);
        }
        w.end_array();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.read_array(T::deserialize)
    }
}

/// Points are written inline as two finite numbers.
impl Persist for Point {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_f64(self.x);
        w.write_f64(self.y);
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        Ok(Self::new(r.read_finite_f64()?, r.read_finite_f64()?))
    }
}

impl Persist for Vec2 {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_f64(self.x);
        w.write_f64(self.y);
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        Ok(Self::new(r.read_finite_f64()?, r.read_finite_f64()?))
    }
}

/// Colours are written as one packed `0xRRGGBBAA` integer.
impl Persist for Color {
    fn serialize(&self, w: &mut TokenWriter) {
        let c = self.to_rgba8();
        w.write_u64(u64::from(u32::from_be_bytes([c.r, c.g, c.b, c.a])));
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        let line = r.line();
        let packed = u32::try_from(r.read_u64()?).map_err(|_| FormatError::InvalidValue {
            line,
            reason: "colour does not fit in 32 bits",
        })?;
        let [red, green, blue, alpha] = packed.to_be_bytes();
        Ok(Self::from_rgba8(red, green, blue, alpha))
    }
}

impl Persist for SnapMode {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_str(match self {
            Self::CellCenters => "cell_centers",
            Self::Intersections => "intersections",
        });
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        let line = r.line();
        match r.read_string()?.as_str() {
            "cell_centers" => Ok(Self::CellCenters),
            "intersections" => Ok(Self::Intersections),
            _ => Err(FormatError::InvalidValue {
                line,
                reason: "unknown snap mode",
            }),
        }
    }
}

impl Persist for Grid {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_f64(self.cell_size());
        self.offset().serialize(w);
        self.snap_mode().serialize(w);
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let line = r.line();
        let cell_size = r.read_finite_f64()?;
        if cell_size < 0.0 {
            return Err(FormatError::InvalidValue {
                line,
                reason: "grid cell size is negative",
            });
        }
        let offset = Vec2::deserialize(r)?;
        let snap_mode = SnapMode::deserialize(r)?;
        r.expect_object_end()?;
        Ok(Self::new(cell_size)
            .with_offset(offset)
            .with_snap_mode(snap_mode))
    }
}

impl Persist for CoordinateTransformer {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_f64(self.scale());
        self.origin().serialize(w);
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let line = r.line();
        let scale = r.read_finite_f64()?;
        if scale <= 0.0 {
            return Err(FormatError::InvalidValue {
                line,
                reason: "transformer scale must be positive",
            });
        }
        let origin = Vec2::deserialize(r)?;
        r.expect_object_end()?;
        Ok(Self::new(scale, origin))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use battlemap_view::{CoordinateTransformer, Grid, SnapMode};
    use kurbo::{Point, Vec2};
    use peniko::Color;

    use crate::{FormatError, from_str, to_string};

    #[test]
    fn view_types_survive_a_save() {
        let grid = Grid::new(42.0)
            .with_offset(Vec2::new(-3.5, 7.0))
            .with_snap_mode(SnapMode::Intersections);
        assert_eq!(from_str::<Grid>(&to_string(&grid)).unwrap(), grid);

        let t = CoordinateTransformer::new(1.75, Vec2::new(-120.0, 33.25));
        assert_eq!(from_str::<CoordinateTransformer>(&to_string(&t)).unwrap(), t);

        let c = Color::from_rgba8(1, 2, 3, 4);
        assert_eq!(to_string(&c), "16909060\n");
        assert_eq!(from_str::<Color>("16909060").unwrap(), c);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            from_str::<CoordinateTransformer>("{\n0\n0\n0\n}\n"),
            Err(FormatError::InvalidValue { line: 2, .. })
        ));
        assert!(matches!(
            from_str::<Grid>("{\n10\n0\n0\n\"hexes\"\n}\n"),
            Err(FormatError::InvalidValue { line: 5, .. })
        ));
        assert!(from_str::<Color>("4294967296").is_err());
    }

    #[test]
    fn point_arrays_drop_bad_entries() {
        let text = "[\n1\n2\n\"x\"\n3\n4\n]\n";
        // `"x"` is dropped, then 3 4 pair up.
        let points: Vec<Point> = from_str(text).unwrap();
        assert_eq!(points, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
    }
}
