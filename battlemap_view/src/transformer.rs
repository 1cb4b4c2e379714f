// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Rect, Vec2};

/// Smallest scale that [`CoordinateTransformer::zoom`] will produce.
pub const MIN_SCALE: f64 = 1e-3;

/// Largest scale that [`CoordinateTransformer::zoom`] will produce.
pub const MAX_SCALE: f64 = 1e3;

/// Uniform scale + translate mapping from one 2D space into another.
///
/// The same type is used for every hop of the pipeline:
/// - grid space → world space (scale is the cell size),
/// - world space → screen space (scale is the zoom level, origin the pan).
///
/// A point `p` maps to `p * scale + origin`. The inverse mapping is exact up
/// to floating-point error, so `screen_to_world(world_to_screen(p)) ≈ p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransformer {
    scale: f64,
    origin: Vec2,
}

impl Default for CoordinateTransformer {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CoordinateTransformer {
    /// The identity mapping.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        origin: Vec2::ZERO,
    };

    /// Creates a transformer with the given scale and origin offset.
    ///
    /// The scale is not clamped here; grid transformers legitimately use
    /// large cell sizes. Only [`CoordinateTransformer::zoom`] clamps.
    #[must_use]
    pub const fn new(scale: f64, origin: Vec2) -> Self {
        Self { scale, origin }
    }

    /// Returns the uniform scale factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the origin offset in target space.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Replaces the origin offset.
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    /// Maps a source-space (world) point into target space (screen).
    #[must_use]
    pub fn world_to_screen(&self, pt: Point) -> Point {
        Point::new(
            pt.x * self.scale + self.origin.x,
            pt.y * self.scale + self.origin.y,
        )
    }

    /// Maps a target-space (screen) point back into source space (world).
    #[must_use]
    pub fn screen_to_world(&self, pt: Point) -> Point {
        Point::new(
            (pt.x - self.origin.x) / self.scale,
            (pt.y - self.origin.y) / self.scale,
        )
    }

    /// Maps a world-space rectangle into screen space.
    #[must_use]
    pub fn world_to_screen_rect(&self, rect: Rect) -> Rect {
        // The uniform positive scale keeps the rect axis-aligned and ordered.
        let p0 = self.world_to_screen(Point::new(rect.x0, rect.y0));
        let p1 = self.world_to_screen(Point::new(rect.x1, rect.y1));
        Rect::from_points(p0, p1)
    }

    /// Maps a screen-space rectangle into world space.
    #[must_use]
    pub fn screen_to_world_rect(&self, rect: Rect) -> Rect {
        let p0 = self.screen_to_world(Point::new(rect.x0, rect.y0));
        let p1 = self.screen_to_world(Point::new(rect.x1, rect.y1));
        Rect::from_points(p0, p1)
    }

    /// Converts a world-space length into screen pixels.
    #[must_use]
    pub fn world_to_screen_distance(&self, d: f64) -> f64 {
        d * self.scale
    }

    /// Converts a screen-space length into world units.
    #[must_use]
    pub fn screen_to_world_distance(&self, d: f64) -> f64 {
        d / self.scale
    }

    /// Zooms by `factor` around a focal point given in screen space.
    ///
    /// The focal point keeps its screen position. The resulting scale is
    /// clamped into `[MIN_SCALE, MAX_SCALE]`; non-positive or non-finite
    /// factors are ignored.
    pub fn zoom(&mut self, factor: f64, focal_screen: Point) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let old_scale = self.scale;
        let new_scale = (old_scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        if (new_scale - old_scale).abs() < f64::EPSILON {
            return;
        }
        let focal = focal_screen.to_vec2();
        self.origin = focal - (focal - self.origin) * (new_scale / old_scale);
        self.scale = new_scale;
    }

    /// Translates the origin by `(dx, dy)` target-space units.
    pub fn move_origin(&mut self, dx: f64, dy: f64) {
        self.origin += Vec2::new(dx, dy);
    }

    /// Composes `self` followed by `outer`.
    ///
    /// `grid_to_world.compose(&world_to_screen)` maps grid space directly to
    /// screen space.
    #[must_use]
    pub fn compose(&self, outer: &Self) -> Self {
        Self {
            scale: self.scale * outer.scale,
            origin: self.origin * outer.scale + outer.origin,
        }
    }

    /// Returns the mapping as a kurbo [`Affine`].
    #[must_use]
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.origin) * Affine::scale(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect, Vec2};

    use super::{CoordinateTransformer, MAX_SCALE, MIN_SCALE};

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn zoom_about_focal_point_keeps_it_fixed() {
        let mut t = CoordinateTransformer::IDENTITY;
        t.zoom(2.0, Point::new(100.0, 100.0));
        assert_eq!(t.scale(), 2.0);
        assert_eq!(t.origin(), Vec2::new(-100.0, -100.0));

        let world = t.screen_to_world(Point::new(100.0, 100.0));
        assert!(close(world, Point::new(100.0, 100.0)), "focal point drifted");
    }

    #[test]
    fn zoom_ignores_bad_factors_and_clamps() {
        let mut t = CoordinateTransformer::IDENTITY;
        t.zoom(0.0, Point::ZERO);
        t.zoom(-3.0, Point::ZERO);
        t.zoom(f64::NAN, Point::ZERO);
        assert_eq!(t, CoordinateTransformer::IDENTITY);

        t.zoom(1e9, Point::new(5.0, 5.0));
        assert_eq!(t.scale(), MAX_SCALE);
        t.zoom(1e-12, Point::new(5.0, 5.0));
        assert_eq!(t.scale(), MIN_SCALE);
    }

    #[test]
    fn round_trip_after_mixed_operations() {
        let mut t = CoordinateTransformer::IDENTITY;
        t.zoom(1.7, Point::new(30.0, -12.0));
        t.move_origin(-44.5, 19.25);
        t.zoom(0.3, Point::new(400.0, 300.0));
        t.move_origin(3.0, 7.0);

        for p in [
            Point::new(0.0, 0.0),
            Point::new(123.456, -98.7),
            Point::new(-1e4, 2e4),
        ] {
            let back = t.screen_to_world(t.world_to_screen(p));
            assert!((back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6);
        }
    }

    #[test]
    fn compose_matches_sequential_application() {
        let grid = CoordinateTransformer::new(50.0, Vec2::new(10.0, 20.0));
        let mut world = CoordinateTransformer::IDENTITY;
        world.zoom(1.5, Point::new(200.0, 100.0));
        world.move_origin(12.0, -8.0);

        let grid_to_screen = grid.compose(&world);
        let p = Point::new(3.0, 4.5);
        let expected = world.world_to_screen(grid.world_to_screen(p));
        assert!(close(grid_to_screen.world_to_screen(p), expected));
    }

    #[test]
    fn rect_and_distance_conversions() {
        let t = CoordinateTransformer::new(2.0, Vec2::new(10.0, 0.0));
        let r = t.world_to_screen_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(r, Rect::new(10.0, 0.0, 20.0, 10.0));
        assert_eq!(t.screen_to_world_rect(r), Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(t.world_to_screen_distance(3.0), 6.0);
        assert_eq!(t.screen_to_world_distance(6.0), 3.0);

        let affine = t.to_affine();
        assert!(close(affine * Point::new(1.0, 1.0), t.world_to_screen(Point::new(1.0, 1.0))));
    }
}
