// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point reduction for freehand lines.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Point;

use crate::hit::segment_distance;
use crate::{Geometry, Shape};

/// Default tolerance, in world units, used by
/// [`LineCollection::optimize`](crate::LineCollection::optimize).
pub const DEFAULT_OPTIMIZE_TOLERANCE: f64 = 0.5;

/// Drops points closer than `min_dist` to the previously kept one. Both
/// endpoints survive.
fn dedupe(points: &[Point], min_dist: f64) -> Vec<Point> {
    let Some((&last, rest)) = points.split_last() else {
        return Vec::new();
    };
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());
    for &p in rest {
        match kept.last() {
            Some(prev) if prev.distance(p) < min_dist => {}
            _ => kept.push(p),
        }
    }
    if kept.len() >= 2 && kept[kept.len() - 1].distance(last) < min_dist {
        kept.pop();
    }
    kept.push(last);
    kept
}

/// Ramer–Douglas–Peucker with an explicit work stack.
fn reduce(points: &[Point], tolerance: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut stack = vec![(0, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let (a, b) = (points[start], points[end]);
        let mut far = (start, 0.0);
        for (i, &p) in points.iter().enumerate().take(end).skip(start + 1) {
            let d = segment_distance(p, a, b);
            if d > far.1 {
                far = (i, d);
            }
        }
        if far.1 > tolerance {
            keep[far.0] = true;
            stack.push((start, far.0));
            stack.push((far.0, end));
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplifies a polyline until another pass would remove nothing.
pub(crate) fn simplify_polyline(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut current = points.to_vec();
    loop {
        let next = reduce(&dedupe(&current, tolerance / 2.0), tolerance);
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

impl Shape {
    /// Removes freehand points that deviate less than `tolerance` world
    /// units from the simplified line. Endpoints are kept.
    ///
    /// Returns `true` if any point was removed. Other kinds are unchanged.
    pub fn simplify(&mut self, tolerance: f64) -> bool {
        if tolerance.is_nan() || tolerance < 0.0 {
            return false;
        }
        let id = self.id();
        let Geometry::Freehand { points } = self.geometry_mut() else {
            return false;
        };
        if points.len() < 3 {
            return false;
        }
        let simplified = simplify_polyline(points, tolerance);
        if simplified.len() == points.len() {
            return false;
        }
        log::trace!(
            "simplified {id:?} from {} to {} points",
            points.len(),
            simplified.len()
        );
        *points = simplified;
        self.recompute_bounds();
        true
    }
}
