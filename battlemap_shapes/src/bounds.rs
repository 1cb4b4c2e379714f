// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Point, Rect};

/// Axis-aligned bounds that start out empty and grow.
///
/// The empty state has `x_min = y_min = +∞` and `x_max = y_max = -∞`, so the
/// first update simply adopts the point or rectangle given. Once non-empty,
/// `x_min <= x_max` and `y_min <= y_max` always hold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingRectangle {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
}

impl Default for BoundingRectangle {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingRectangle {
    /// Bounds containing nothing.
    pub const EMPTY: Self = Self {
        x_min: f64::INFINITY,
        y_min: f64::INFINITY,
        x_max: f64::NEG_INFINITY,
        y_max: f64::NEG_INFINITY,
    };

    /// Bounds covering exactly `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            x_min: rect.x0,
            y_min: rect.y0,
            x_max: rect.x1,
            y_max: rect.y1,
        }
    }

    /// Bounds of a set of points.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.update_bounds(p);
        }
        bounds
    }

    /// Returns `true` before the first update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    /// Smallest x, or `+∞` when empty.
    #[must_use]
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Smallest y, or `+∞` when empty.
    #[must_use]
    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    /// Largest x, or `-∞` when empty.
    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Largest y, or `-∞` when empty.
    #[must_use]
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Grows to include `pt`.
    pub fn update_bounds(&mut self, pt: Point) {
        self.x_min = self.x_min.min(pt.x);
        self.y_min = self.y_min.min(pt.y);
        self.x_max = self.x_max.max(pt.x);
        self.y_max = self.y_max.max(pt.y);
    }

    /// Grows to include `other`; empty `other` changes nothing.
    pub fn update_bounds_rect(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.x_min = self.x_min.min(other.x_min);
        self.y_min = self.y_min.min(other.y_min);
        self.x_max = self.x_max.max(other.x_max);
        self.y_max = self.y_max.max(other.y_max);
    }

    /// Grows every side by `margin`. Empty bounds stay empty.
    pub fn expand(&mut self, margin: f64) {
        if self.is_empty() {
            return;
        }
        self.x_min -= margin;
        self.y_min -= margin;
        self.x_max += margin;
        self.y_max += margin;
    }

    /// Returns `true` if `pt` lies inside or on the edge.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x_min && pt.x <= self.x_max && pt.y >= self.y_min && pt.y <= self.y_max
    }

    /// Returns `true` if the two bounds overlap (touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x_min <= other.x_max
            && other.x_min <= self.x_max
            && self.y_min <= other.y_max
            && other.y_min <= self.y_max
    }

    /// The bounds as a rectangle, or `None` when empty.
    #[must_use]
    pub fn to_rect(&self) -> Option<Rect> {
        (!self.is_empty()).then(|| Rect::new(self.x_min, self.y_min, self.x_max, self.y_max))
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::BoundingRectangle;

    #[test]
    fn empty_until_first_update() {
        let mut b = BoundingRectangle::default();
        assert!(b.is_empty());
        assert_eq!(b.to_rect(), None);
        b.expand(5.0);
        assert!(b.is_empty(), "expanding nothing stays nothing");

        b.update_bounds(Point::new(3.0, -1.0));
        assert!(!b.is_empty());
        assert_eq!(b.to_rect(), Some(Rect::new(3.0, -1.0, 3.0, -1.0)));
    }

    #[test]
    fn union_expand_and_queries() {
        let mut b = BoundingRectangle::from_points([Point::new(0.0, 0.0), Point::new(4.0, 2.0)]);
        b.update_bounds_rect(&BoundingRectangle::EMPTY);
        b.update_bounds_rect(&BoundingRectangle::from_rect(Rect::new(6.0, 1.0, 3.0, 5.0)));
        assert_eq!(b.to_rect(), Some(Rect::new(0.0, 0.0, 6.0, 5.0)));

        b.expand(1.0);
        assert!(b.contains(Point::new(-1.0, 6.0)));
        assert!(!b.contains(Point::new(-1.5, 0.0)));

        let far = BoundingRectangle::from_rect(Rect::new(10.0, 10.0, 12.0, 12.0));
        assert!(!b.intersects(&far));
        assert!(b.intersects(&BoundingRectangle::from_rect(Rect::new(7.0, 6.0, 9.0, 9.0))));
        assert!(!b.intersects(&BoundingRectangle::EMPTY));
    }
}
