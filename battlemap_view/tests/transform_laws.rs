// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Round-trip and composition laws for `CoordinateTransformer` and `Grid`.

use battlemap_view::{CoordinateTransformer, Grid, SnapMode};
use kurbo::{Point, Vec2};

/// Small deterministic generator so the sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self, lo: f64, hi: f64) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let unit = (self.0 >> 11) as f64 / (1_u64 << 53) as f64;
        lo + unit * (hi - lo)
    }
}

#[test]
fn screen_to_world_inverts_world_to_screen_for_random_sequences() {
    let mut rng = Lcg(7);
    for _ in 0..64 {
        let mut t = CoordinateTransformer::IDENTITY;
        for _ in 0..16 {
            if rng.next_f64(0.0, 1.0) < 0.5 {
                let factor = rng.next_f64(0.25, 4.0);
                let focal = Point::new(rng.next_f64(-500.0, 500.0), rng.next_f64(-500.0, 500.0));
                t.zoom(factor, focal);
            } else {
                t.move_origin(rng.next_f64(-300.0, 300.0), rng.next_f64(-300.0, 300.0));
            }
        }
        let p = Point::new(rng.next_f64(-1e3, 1e3), rng.next_f64(-1e3, 1e3));
        let back = t.screen_to_world(t.world_to_screen(p));
        let tol = 1e-6 * (1.0 + p.x.abs().max(p.y.abs()));
        assert!(
            (back.x - p.x).abs() < tol && (back.y - p.y).abs() < tol,
            "round trip failed: {p:?} -> {back:?}"
        );
    }
}

#[test]
fn zoom_keeps_any_focal_point_fixed() {
    let mut rng = Lcg(99);
    for _ in 0..64 {
        let mut t = CoordinateTransformer::new(rng.next_f64(0.5, 2.0), Vec2::new(3.0, -9.0));
        let focal = Point::new(rng.next_f64(0.0, 800.0), rng.next_f64(0.0, 600.0));
        let world_before = t.screen_to_world(focal);
        t.zoom(rng.next_f64(0.5, 3.0), focal);
        let screen_after = t.world_to_screen(world_before);
        assert!((screen_after.x - focal.x).abs() < 1e-6, "focal x drifted");
        assert!((screen_after.y - focal.y).abs() < 1e-6, "focal y drifted");
    }
}

#[test]
fn snapped_points_are_never_farther_than_half_a_diagonal() {
    let mut rng = Lcg(3);
    let grid = Grid::new(37.0).with_snap_mode(SnapMode::Intersections);
    let half_diagonal = 37.0 * core::f64::consts::SQRT_2 / 2.0;
    for _ in 0..256 {
        let p = Point::new(rng.next_f64(-2e3, 2e3), rng.next_f64(-2e3, 2e3));
        let snapped = grid.nearest_snap_point(p, 1.0);
        assert!(p.distance(snapped) <= half_diagonal + 1e-9);
        // Snapping is idempotent.
        let again = grid.nearest_snap_point(snapped, 1.0);
        assert!(again.distance(snapped) < 1e-9, "snap is not idempotent");
    }
}
