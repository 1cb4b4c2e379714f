// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The on-screen viewport: a scroll buffer kept in sync with the map.

use battlemap_canvas::{Bitmap, DrawRequest, ScrollBuffer};
use battlemap_view::CoordinateTransformer;
use kurbo::{Rect, Vec2};

use crate::config::SessionContext;
use crate::drawer::MapDrawer;
use crate::map_data::MapData;
use crate::redraw::Redraw;

/// Displays a map through a [`ScrollBuffer`].
///
/// Pans move the world transform by whole pixels so that scrolled pixels
/// stay exact; the fractional part is carried into the next pan.
#[derive(Clone, Debug)]
pub struct MapView {
    buffer: ScrollBuffer,
    carry: Vec2,
}

impl MapView {
    /// A viewport of `width` × `height` pixels. The first redraw is full.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: ScrollBuffer::new(width, height),
            carry: Vec2::ZERO,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// The viewport rectangle in screen space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.buffer.front().bounds()
    }

    /// The displayed pixels.
    #[must_use]
    pub fn front(&self) -> &Bitmap {
        self.buffer.front()
    }

    /// Changes the viewport size; the next redraw is full.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.buffer.resize(width, height);
    }

    /// Moves `transformer` by `delta` screen pixels, rounded to whole pixels.
    ///
    /// Returns the whole-pixel delta actually applied. The rest is kept and
    /// added to the next pan.
    pub fn pan(&mut self, transformer: &mut CoordinateTransformer, delta: Vec2) -> Vec2 {
        if !delta.is_finite() {
            return Vec2::ZERO;
        }
        let wanted = delta + self.carry;
        let applied = Vec2::new(wanted.x.trunc(), wanted.y.trunc());
        self.carry = wanted - applied;
        transformer.move_origin(applied.x, applied.y);
        applied
    }

    /// Brings the displayed pixels up to date with `map`.
    ///
    /// A partial redraw scrolls the buffer first and then recomposites the
    /// exposed strips and the requested rectangles, each on its own.
    pub fn apply(
        &mut self,
        redraw: &Redraw,
        map: &MapData,
        ctx: &mut SessionContext,
        drawer: &MapDrawer,
    ) {
        match redraw {
            Redraw::Full => {
                self.buffer.invalidate();
                let request = self.buffer.full_redraw();
                composite(request, map, ctx, drawer);
            }
            Redraw::Partial { scroll, rects } => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "scrolls are whole pixels; oversized ones become full redraws"
                )]
                let (dx, dy) = (
                    scroll.x.clamp(-f64::from(i32::MAX), f64::from(i32::MAX)) as i32,
                    scroll.y.clamp(-f64::from(i32::MAX), f64::from(i32::MAX)) as i32,
                );
                let request = self.buffer.scroll(dx, dy);
                composite(request, map, ctx, drawer);
                for rect in rects {
                    let request = self.buffer.redraw_region(rect.expand());
                    composite(request, map, ctx, drawer);
                }
            }
        }
    }
}

fn composite(
    mut request: DrawRequest<'_>,
    map: &MapData,
    ctx: &mut SessionContext,
    drawer: &MapDrawer,
) {
    if request.is_empty() {
        return;
    }
    log::trace!(
        "compositing {} region(s) after scrolling ({}, {})",
        request.invalid_regions.len(),
        request.delta_x,
        request.delta_y
    );
    request.clear_invalid(ctx.config.background_color());
    let regions = request.invalid_regions.clone();
    let mut canvas = request.canvas();
    for region in regions {
        drawer.draw(&mut canvas, map, ctx, region);
    }
}

#[cfg(test)]
mod tests {
    use battlemap_view::CoordinateTransformer;
    use kurbo::Vec2;

    use super::MapView;

    #[test]
    fn pans_carry_fractions() {
        let mut view = MapView::new(10, 10);
        let mut t = CoordinateTransformer::IDENTITY;
        assert_eq!(view.pan(&mut t, Vec2::new(0.75, -0.5)), Vec2::ZERO);
        assert_eq!(view.pan(&mut t, Vec2::new(0.75, -0.75)), Vec2::new(1.0, -1.0));
        assert_eq!(t.origin(), Vec2::new(1.0, -1.0));
        assert_eq!(view.pan(&mut t, Vec2::new(0.5, -0.25)), Vec2::new(1.0, 0.0));
        assert_eq!(t.origin(), Vec2::new(2.0, -1.0));
    }
}
