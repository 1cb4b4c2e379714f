// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;
use peniko::Color;
use smallvec::SmallVec;

use crate::{Bitmap, RasterCanvas};

/// Regions of a [`DrawRequest`] that the caller must redraw.
pub type InvalidRegions = SmallVec<[Rect; 2]>;

/// Double-buffered surface that scrolls by copying pixels.
///
/// Scrolling copies the still-visible part of the current image into the
/// back buffer at its new position, swaps the buffers, and reports the
/// exposed strips in a [`DrawRequest`]. Only those strips need redrawing, so
/// a pan costs work proportional to the exposed area instead of the whole
/// surface. Any change that is not a pure translation must go through
/// [`ScrollBuffer::invalidate`].
#[derive(Clone, Debug)]
pub struct ScrollBuffer {
    buffers: [Bitmap; 2],
    front: usize,
    valid: bool,
}

/// What the caller has to draw after a [`ScrollBuffer`] operation.
///
/// `surface` is already positioned: pixels outside `invalid_regions` hold
/// the correct, scrolled content. Pixels inside them are stale until redrawn.
#[derive(Debug)]
pub struct DrawRequest<'a> {
    /// The surface to draw into; it is the new front buffer.
    pub surface: &'a mut Bitmap,
    /// Screen-space rectangles to redraw. Empty when nothing is exposed.
    pub invalid_regions: InvalidRegions,
    /// Horizontal scroll applied, in pixels.
    pub delta_x: i32,
    /// Vertical scroll applied, in pixels.
    pub delta_y: i32,
}

impl DrawRequest<'_> {
    /// Returns `true` when nothing needs drawing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invalid_regions.is_empty()
    }

    /// Overwrites every invalid region with `color`.
    pub fn clear_invalid(&mut self, color: Color) {
        for region in &self.invalid_regions {
            self.surface.fill_region(*region, color);
        }
    }

    /// A raster canvas over the surface.
    pub fn canvas(&mut self) -> RasterCanvas<'_> {
        RasterCanvas::new(self.surface)
    }
}

impl ScrollBuffer {
    /// Creates a buffer of the given size. The first request is a full redraw.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffers: [Bitmap::new(width, height), Bitmap::new(width, height)],
            front: 0,
            valid: false,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffers[0].width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffers[0].height()
    }

    /// The buffer currently holding the displayed image.
    #[must_use]
    pub fn front(&self) -> &Bitmap {
        &self.buffers[self.front]
    }

    /// Returns `false` until the next request is a full redraw.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Discards the current content; the next request redraws everything.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Changes the surface size and invalidates the content.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width() && height == self.height() {
            return;
        }
        self.buffers = [Bitmap::new(width, height), Bitmap::new(width, height)];
        self.front = 0;
        self.valid = false;
    }

    /// Requests a redraw of the whole surface.
    pub fn full_redraw(&mut self) -> DrawRequest<'_> {
        self.valid = true;
        let bounds = self.front().bounds();
        let mut invalid_regions = InvalidRegions::new();
        if !bounds.is_zero_area() {
            invalid_regions.push(bounds);
        }
        DrawRequest {
            surface: &mut self.buffers[self.front],
            invalid_regions,
            delta_x: 0,
            delta_y: 0,
        }
    }

    /// Requests a redraw of `rect` only, or of everything when the content
    /// is invalid.
    pub fn redraw_region(&mut self, rect: Rect) -> DrawRequest<'_> {
        if !self.valid {
            return self.full_redraw();
        }
        let clipped = rect.intersect(self.front().bounds());
        let mut invalid_regions = InvalidRegions::new();
        if !clipped.is_zero_area() {
            invalid_regions.push(clipped);
        }
        DrawRequest {
            surface: &mut self.buffers[self.front],
            invalid_regions,
            delta_x: 0,
            delta_y: 0,
        }
    }

    /// Scrolls the content by `(dx, dy)` pixels.
    ///
    /// Positive `dx` moves content right, exposing a strip on the left.
    /// A scroll of at least a full surface in either direction, or a scroll
    /// while the content is invalid, degrades to a full redraw.
    pub fn scroll(&mut self, dx: i32, dy: i32) -> DrawRequest<'_> {
        let (w, h) = (self.width(), self.height());
        if !self.valid || dx.unsigned_abs() >= w || dy.unsigned_abs() >= h {
            let mut request = self.full_redraw();
            request.delta_x = dx;
            request.delta_y = dy;
            return request;
        }
        if dx == 0 && dy == 0 {
            return DrawRequest {
                surface: &mut self.buffers[self.front],
                invalid_regions: InvalidRegions::new(),
                delta_x: 0,
                delta_y: 0,
            };
        }

        let back = 1 - self.front;
        let [first, second] = &mut self.buffers;
        let (src, dst) = if self.front == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };
        dst.copy_shifted_from(src, dx, dy);
        self.front = back;

        let (w, h) = (f64::from(w), f64::from(h));
        let (fx, fy) = (f64::from(dx), f64::from(dy));
        let mut invalid_regions = InvalidRegions::new();
        // Vertical strip spans the full height; the horizontal strip only
        // covers the columns the vertical one does not.
        let (x0, x1) = match dx {
            0 => (0.0, w),
            _ if dx > 0 => {
                invalid_regions.push(Rect::new(0.0, 0.0, fx, h));
                (fx, w)
            }
            _ => {
                invalid_regions.push(Rect::new(w + fx, 0.0, w, h));
                (0.0, w + fx)
            }
        };
        if dy > 0 {
            invalid_regions.push(Rect::new(x0, 0.0, x1, fy));
        } else if dy < 0 {
            invalid_regions.push(Rect::new(x0, h + fy, x1, h));
        }
        log::trace!("scrolled by ({dx}, {dy}), {} strips exposed", invalid_regions.len());

        DrawRequest {
            surface: &mut self.buffers[self.front],
            invalid_regions,
            delta_x: dx,
            delta_y: dy,
        }
    }
}
