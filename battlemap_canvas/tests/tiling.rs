// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster output must not depend on how a frame is split into regions.

use battlemap_canvas::{Bitmap, CanvasExt, ClipShape, Pen, RasterCanvas, ScrollBuffer};
use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::Color;

const W: u32 = 64;
const H: u32 = 48;
/// Anti-aliased edges rendered at another offset may round differently.
const EDGE_ROUNDING: u8 = 2;

fn scene<C: CanvasExt>(canvas: &mut C, offset: Vec2) {
    let at = |x: f64, y: f64| Point::new(x, y) + offset;
    canvas.fill_rect(
        Rect::from_points(at(4.0, 4.0), at(40.0, 28.0)),
        Color::from_rgba8(200, 180, 140, 255),
    );
    canvas.stroke_line(at(-10.0, 20.5), at(90.0, 20.5), Pen::new(3.0, Color::BLACK));
    canvas.stroke_polyline(
        &[at(2.0, 44.0), at(18.0, 30.25), at(33.5, 40.0), at(62.0, 6.0)],
        Pen::new(2.5, Color::from_rgba8(0, 0, 200, 255)),
    );
    canvas.fill_circle(at(44.25, 30.5), 9.5, Color::from_rgba8(0, 150, 0, 200));
    canvas.stroke_circle(at(20.0, 12.0), 6.0, Pen::new(1.5, Color::from_rgba8(90, 0, 0, 255)));

    let mut triangle = BezPath::new();
    triangle.move_to(at(50.0, 2.0));
    triangle.line_to(at(62.0, 20.0));
    triangle.line_to(at(38.0, 18.5));
    triangle.close_path();
    canvas.with_clip(ClipShape::Rect(Rect::from_points(at(0.0, 0.0), at(56.0, 48.0))), |c| {
        c.fill_path(&triangle, Color::from_rgba8(160, 0, 160, 180));
    });

    let checker = Bitmap::from_pixels(
        2,
        2,
        vec![
            Bitmap::pack(Color::WHITE),
            0,
            0,
            Bitmap::pack(Color::WHITE),
        ],
    )
    .unwrap();
    canvas.draw_bitmap(&checker, Rect::from_points(at(8.0, 32.0), at(16.0, 40.0)));
}

fn whole(offset: Vec2) -> Bitmap {
    let mut bitmap = Bitmap::filled(W, H, Color::WHITE);
    scene(&mut RasterCanvas::new(&mut bitmap), offset);
    bitmap
}

#[test]
fn tiles_compose_to_the_whole_frame() {
    let mut tiled = Bitmap::filled(W, H, Color::WHITE);
    let mut canvas = RasterCanvas::new(&mut tiled);
    for (x0, y0, x1, y1) in [
        (0.0, 0.0, 21.0, 17.0),
        (21.0, 0.0, 64.0, 17.0),
        (0.0, 17.0, 37.0, 48.0),
        (37.0, 17.0, 64.0, 48.0),
    ] {
        canvas.with_clip(ClipShape::Rect(Rect::new(x0, y0, x1, y1)), |c| {
            scene(c, Vec2::ZERO);
        });
    }
    assert_eq!(canvas.clip_depth(), 0);
    drop(canvas);
    assert_eq!(tiled, whole(Vec2::ZERO));
}

#[test]
fn scrolling_then_filling_strips_matches_a_redraw_up_to_rounding() {
    let mut buffer = ScrollBuffer::new(W, H);
    let mut offset = Vec2::ZERO;
    let mut request = buffer.full_redraw();
    request.clear_invalid(Color::WHITE);
    scene(&mut request.canvas(), offset);

    for (dx, dy) in [(7, 0), (0, -5), (-13, 9), (3, 3)] {
        offset += Vec2::new(f64::from(dx), f64::from(dy));
        let mut request = buffer.scroll(dx, dy);
        assert!(!request.is_empty());
        request.clear_invalid(Color::WHITE);
        let regions = request.invalid_regions.clone();
        let mut canvas = request.canvas();
        for region in regions {
            canvas.with_clip(ClipShape::Rect(region), |c| scene(c, offset));
        }
        drop(canvas);
        let diff = buffer.front().max_difference(&whole(offset));
        assert!(
            diff.is_some_and(|d| d <= EDGE_ROUNDING),
            "off by {diff:?} after scrolling by ({dx}, {dy})"
        );
    }
}

#[test]
fn oversized_scrolls_redraw_everything() {
    let mut buffer = ScrollBuffer::new(W, H);
    buffer.full_redraw();
    let request = buffer.scroll(0, -48);
    assert_eq!(request.invalid_regions.as_slice(), &[Rect::new(0.0, 0.0, 64.0, 48.0)]);
}
