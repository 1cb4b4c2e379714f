// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport compositing: incremental redraws must match full ones.

use battlemap_canvas::{Bitmap, RasterCanvas};
use battlemap_shapes::{HitParams, StrokeWidth};
use battlemap_view::Grid;
use kurbo::{Point, Vec2};
use peniko::Color;

use battlemap_map::{
    BuiltInShape, DrawFlags, FogOfWarMode, InputEvent, InputKind, InteractionMode, MapData,
    MapDrawer, Redraw, Session, SessionContext, Token, TokenArt,
};

const WIDTH: u32 = 96;
const HEIGHT: u32 = 72;

fn dungeon() -> MapData {
    let params = HitParams::default();
    let mut map = MapData::default();
    map.grid = Grid::new(16.0);

    let room = map.background.create_rectangle(
        Point::new(8.0, 8.0),
        Color::from_rgba8(120, 100, 80, 255),
        StrokeWidth::Filled,
    );
    map.background.add_point(room, Point::new(72.0, 56.0), &params);
    let wall = map.background.create_straight_line(
        Point::new(-20.0, 30.0),
        Color::BLACK,
        StrokeWidth::Stroked(3.0),
    );
    map.background.add_point(wall, Point::new(130.0, 30.0), &params);
    let pillar = map.background.create_circle(
        Point::new(40.0, 40.0),
        Color::from_rgba8(60, 60, 60, 255),
        StrokeWidth::Stroked(2.0),
    );
    map.background.add_point(pillar, Point::new(50.0, 40.0), &params);
    let arrow = map.annotations.create_freehand_line(
        Point::new(0.0, 64.0),
        Color::from_rgba8(0, 0, 200, 255),
        StrokeWidth::Stroked(2.0),
    );
    for pt in [(20.0, 60.0), (44.0, 66.0), (90.0, 50.0)] {
        map.annotations.add_point(arrow, pt.into(), &params);
    }

    map.tokens.insert(Token::new(
        "fighter",
        Point::new(1.5, 1.5),
        1.0,
        TokenArt::SolidColor(Color::from_rgba8(0, 160, 0, 255)),
    ));
    let mut ogre = Token::new(
        "ogre",
        Point::new(4.0, 3.0),
        2.0,
        TokenArt::BuiltIn {
            shape: BuiltInShape::Square,
            color: Color::from_rgba8(160, 0, 160, 255),
        },
    );
    ogre.set_bloodied(true);
    map.tokens.insert(ogre);
    map
}

fn reference(map: &MapData) -> Bitmap {
    let mut target = Bitmap::filled(WIDTH, HEIGHT, Color::WHITE);
    let bounds = target.bounds();
    let mut ctx = SessionContext::default();
    MapDrawer::new().draw(&mut RasterCanvas::new(&mut target), map, &mut ctx, bounds);
    target
}

fn pan(session: &mut Session, delta: Vec2) -> Option<Redraw> {
    let event = InputEvent::new(InputKind::Scroll { delta }, Point::new(40.0, 40.0)).with_fingers(2);
    session.handle(event)
}

#[test]
fn panned_view_matches_a_full_composite() {
    let mut session = Session::new(dungeon(), SessionContext::default(), WIDTH, HEIGHT);
    let first = session.invalidate().unwrap();
    session.render(&first);
    assert_eq!(session.front(), &reference(session.map()));

    for delta in [
        Vec2::new(5.0, 0.0),
        Vec2::new(0.0, -7.0),
        Vec2::new(-11.0, 3.0),
        Vec2::new(2.5, 2.5),
        Vec2::new(0.5, -9.0),
    ] {
        if let Some(redraw) = pan(&mut session, delta) {
            assert!(
                matches!(redraw, Redraw::Partial { .. }),
                "a pan only scrolls"
            );
            session.render(&redraw);
        }
        let origin = session.map().transformer.origin();
        assert_eq!(origin, Vec2::new(origin.x.trunc(), origin.y.trunc()));
        // Scrolled anti-aliased edges may round differently from a fresh render.
        let diff = session.front().max_difference(&reference(session.map()));
        assert!(
            diff.is_some_and(|d| d <= 2),
            "off by {diff:?} after panning by {delta:?}"
        );
    }
}

#[test]
fn dirty_rect_redraw_matches_a_full_composite() {
    let mut session = Session::new(dungeon(), SessionContext::default(), WIDTH, HEIGHT);
    let first = session.invalidate().unwrap();
    session.render(&first);

    // Move the fighter two cells right and down through the token mode.
    session.set_mode(InteractionMode::Token);
    let start = Point::new(24.0, 24.0);
    let end = Point::new(56.0, 56.0);
    if let Some(redraw) = session.handle(InputEvent::new(InputKind::Down, start)) {
        session.render(&redraw);
    }
    let drag = InputEvent::new(InputKind::Scroll { delta: end - start }, end);
    let redraw = session.handle(drag).unwrap();
    let Redraw::Partial { scroll, ref rects } = redraw else {
        panic!("a token drag only redraws around the token");
    };
    assert_eq!(scroll, Vec2::ZERO);
    assert!(!rects.is_empty());
    session.render(&redraw);
    if let Some(redraw) = session.handle(InputEvent::new(InputKind::Up, end)) {
        session.render(&redraw);
    }
    assert_eq!(session.front(), &reference(session.map()));
}

#[test]
fn fog_defaults_differ_between_background_and_gm_notes() {
    let params = HitParams::default();
    let mut map = MapData::default();
    let red = Color::from_rgba8(255, 0, 0, 255);
    let blue = Color::from_rgba8(0, 0, 255, 255);
    let floor = map
        .background
        .create_rectangle(Point::ZERO, red, StrokeWidth::Filled);
    map.background
        .add_point(floor, Point::new(96.0, 72.0), &params);
    let secret = map
        .gm_notes
        .create_rectangle(Point::new(40.0, 30.0), blue, StrokeWidth::Filled);
    map.gm_notes
        .add_point(secret, Point::new(60.0, 50.0), &params);

    let drawer = MapDrawer::new()
        .with_flags(DrawFlags::GM_NOTES)
        .with_background_fog(FogOfWarMode::Clip)
        .with_gm_notes_fog(FogOfWarMode::Clip);
    let mut target = Bitmap::filled(WIDTH, HEIGHT, Color::WHITE);
    let bounds = target.bounds();
    drawer.draw(
        &mut RasterCanvas::new(&mut target),
        &map,
        &mut SessionContext::default(),
        bounds,
    );
    assert_eq!(target.pixel(5, 5), Some(Bitmap::pack(red)), "background shows");
    assert_eq!(target.pixel(50, 40), Some(Bitmap::pack(red)), "GM notes hidden");

    // Reveal part of the notes.
    let reveal = map
        .gm_notes_fog
        .create_rectangle(Point::new(40.0, 30.0), Color::BLACK, StrokeWidth::Filled);
    map.gm_notes_fog
        .add_point(reveal, Point::new(50.0, 50.0), &params);
    let mut target = Bitmap::filled(WIDTH, HEIGHT, Color::WHITE);
    drawer.draw(
        &mut RasterCanvas::new(&mut target),
        &map,
        &mut SessionContext::default(),
        bounds,
    );
    assert_eq!(target.pixel(45, 40), Some(Bitmap::pack(blue)));
    assert_eq!(target.pixel(55, 40), Some(Bitmap::pack(red)));
}

#[test]
fn masked_tokens_follow_the_background_mask() {
    let params = HitParams::default();
    let mut map = MapData::default();
    map.grid = Grid::new(32.0);
    let green = Color::from_rgba8(0, 200, 0, 255);
    map.tokens.insert(Token::new(
        "scout",
        Point::new(2.0, 1.0),
        2.0,
        TokenArt::BuiltIn {
            shape: BuiltInShape::Square,
            color: green,
        },
    ));
    let lit = map
        .background_fog
        .create_rectangle(Point::ZERO, Color::BLACK, StrokeWidth::Filled);
    map.background_fog
        .add_point(lit, Point::new(48.0, 72.0), &params);

    let render = |flags: DrawFlags| {
        let mut target = Bitmap::filled(WIDTH, HEIGHT, Color::WHITE);
        let bounds = target.bounds();
        MapDrawer::new()
            .with_flags(flags)
            .with_background_fog(FogOfWarMode::Clip)
            .draw(
                &mut RasterCanvas::new(&mut target),
                &map,
                &mut SessionContext::default(),
                bounds,
            );
        target
    };
    let masked = render(DrawFlags::TOKENS | DrawFlags::MASK_TOKENS);
    assert_eq!(masked.pixel(40, 30), Some(Bitmap::pack(green)));
    assert_eq!(masked.pixel(60, 30), Some(Bitmap::pack(Color::WHITE)));
    let unmasked = render(DrawFlags::TOKENS);
    assert_eq!(unmasked.pixel(60, 30), Some(Bitmap::pack(green)));
}
