// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Battlemap Canvas: backend-agnostic immediate-mode drawing surface.
//!
//! Map layers never talk to a concrete graphics API. They draw through the
//! small [`Canvas`] trait, which accepts:
//! - [`DrawOp`]s: rectangles, lines, polylines, circles, filled paths, text
//!   and bitmaps, all in screen-space pixels.
//! - A clip stack ([`Canvas::push_clip`] / [`Canvas::pop_clip`]) of
//!   [`ClipShape`]s; a pixel is drawn only when every pushed clip contains it.
//!
//! Two backends ship with the crate:
//! - [`RasterCanvas`] rasterizes into a [`Bitmap`] with `vello_cpu`,
//!   anti-aliased. Clipping to whole-pixel rectangles leaves a pixel's value
//!   independent of how the drawing was split into regions, so dirty-rectangle
//!   redraw matches a full redraw. Content scrolled by [`ScrollBuffer`] can
//!   differ from a fresh render by rounding on anti-aliased edges.
//! - [`RecordingCanvas`] records the ops and clip state for tests and
//!   debugging, without producing pixels.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use peniko::Color;
//! use battlemap_canvas::{Bitmap, CanvasExt, ClipShape, Pen, RasterCanvas};
//!
//! let mut bitmap = Bitmap::new(16, 16);
//! let mut canvas = RasterCanvas::new(&mut bitmap);
//! canvas.with_clip(ClipShape::Rect(Rect::new(0.0, 0.0, 8.0, 16.0)), |c| {
//!     c.fill_rect(Rect::new(0.0, 0.0, 16.0, 16.0), Color::WHITE);
//! });
//! canvas.stroke_line(Point::new(0.0, 8.0), Point::new(16.0, 8.0), Pen::new(2.0, Color::BLACK));
//! // Drawing lands in the bitmap when the canvas goes away.
//! drop(canvas);
//! assert_eq!(bitmap.pixel(2, 2), Some(Bitmap::pack(Color::WHITE)));
//! assert_eq!(bitmap.pixel(12, 2), Some(0));
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod bitmap;
mod recording;
mod scroll;

use kurbo::{BezPath, Circle, Line, Point, Rect, Size};
use peniko::Color;

pub use bitmap::{Bitmap, RasterCanvas};
pub use recording::{Event, RecordedOp, RecordingCanvas};
pub use scroll::{DrawRequest, InvalidRegions, ScrollBuffer};

/// Width of one glyph cell relative to the font size.
///
/// Text layout is deliberately simple and monospaced so that hit-testing and
/// rendering agree on text extents without a font stack.
pub const GLYPH_ADVANCE: f64 = 0.6;

/// Returns the on-screen extent of `text` drawn at `size` pixels.
#[must_use]
pub fn text_extent(text: &str, size: f64) -> Size {
    let chars = text.chars().count() as f64;
    Size::new(chars * size * GLYPH_ADVANCE, size)
}

/// Stroke parameters: width in pixels and colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pen {
    /// Full stroke width in pixels.
    pub width: f64,
    /// Stroke colour.
    pub color: Color,
}

impl Pen {
    /// Creates a pen.
    #[inline]
    pub const fn new(width: f64, color: Color) -> Self {
        Self { width, color }
    }
}

/// Clip shape pushed onto a canvas clip stack.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipShape {
    /// Axis-aligned rectangle. For point queries the min edge is inside and
    /// the max edge outside.
    Rect(Rect),
    /// Interior of a path under the non-zero winding rule.
    Path(BezPath),
}

impl ClipShape {
    /// Bounding box of the clip region.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(rect) => *rect,
            Self::Path(path) => kurbo::Shape::bounding_box(path),
        }
    }

    /// Returns `true` when `pt` lies inside the clip region.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        match self {
            Self::Rect(rect) => {
                pt.x >= rect.x0 && pt.x < rect.x1 && pt.y >= rect.y0 && pt.y < rect.y1
            }
            Self::Path(path) => kurbo::Shape::winding(path, pt) != 0,
        }
    }
}

/// A single draw operation in screen-space pixels.
#[derive(Clone, Copy, Debug)]
pub enum DrawOp<'a> {
    /// Fill an axis-aligned rectangle.
    FillRect {
        /// Rectangle to fill.
        rect: Rect,
        /// Fill colour.
        color: Color,
    },
    /// Stroke the outline of an axis-aligned rectangle.
    StrokeRect {
        /// Rectangle to outline.
        rect: Rect,
        /// Stroke parameters.
        pen: Pen,
    },
    /// Stroke a single segment with round caps.
    Line {
        /// Segment to stroke.
        line: Line,
        /// Stroke parameters.
        pen: Pen,
    },
    /// Stroke a connected polyline with round joins and caps.
    Polyline {
        /// Vertices in order.
        points: &'a [Point],
        /// Stroke parameters.
        pen: Pen,
    },
    /// Fill a disc.
    FillCircle {
        /// Disc to fill.
        circle: Circle,
        /// Fill colour.
        color: Color,
    },
    /// Stroke a circle outline.
    StrokeCircle {
        /// Circle to outline.
        circle: Circle,
        /// Stroke parameters.
        pen: Pen,
    },
    /// Fill a path using the non-zero winding rule.
    FillPath {
        /// Path to fill.
        path: &'a BezPath,
        /// Fill colour.
        color: Color,
    },
    /// Draw a line of text with its top-left corner at `origin`.
    Text {
        /// Top-left corner of the text box.
        origin: Point,
        /// Text to draw.
        text: &'a str,
        /// Font size in pixels.
        size: f64,
        /// Text colour.
        color: Color,
    },
    /// Draw a bitmap scaled into `dest`.
    Bitmap {
        /// Source pixels.
        bitmap: &'a Bitmap,
        /// Destination rectangle.
        dest: Rect,
    },
}

/// Immediate-mode 2D drawing surface.
///
/// Implementations must treat the clip stack as an intersection of all
/// pushed clips, and `pop_clip` on an empty stack as a no-op.
pub trait Canvas {
    /// Intersects the current clip with `clip`.
    fn push_clip(&mut self, clip: ClipShape);

    /// Restores the clip that was active before the last `push_clip`.
    fn pop_clip(&mut self);

    /// Draws one operation under the current clip.
    fn draw(&mut self, op: DrawOp<'_>);
}

/// Convenience helpers for [`Canvas`] implementations and callers.
///
/// This is separate from [`Canvas`] so that methods can accept closures
/// without complicating trait object usage (`&mut dyn Canvas`).
pub trait CanvasExt: Canvas {
    /// Runs `f` with `clip` pushed, popping it afterwards.
    fn with_clip<R>(&mut self, clip: ClipShape, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_clip(clip);
        let out = f(self);
        self.pop_clip();
        out
    }

    /// Fills a rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.draw(DrawOp::FillRect { rect, color });
    }

    /// Outlines a rectangle.
    fn stroke_rect(&mut self, rect: Rect, pen: Pen) {
        self.draw(DrawOp::StrokeRect { rect, pen });
    }

    /// Strokes a segment.
    fn stroke_line(&mut self, p0: Point, p1: Point, pen: Pen) {
        self.draw(DrawOp::Line {
            line: Line::new(p0, p1),
            pen,
        });
    }

    /// Strokes a polyline.
    fn stroke_polyline(&mut self, points: &[Point], pen: Pen) {
        self.draw(DrawOp::Polyline { points, pen });
    }

    /// Fills a disc.
    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.draw(DrawOp::FillCircle {
            circle: Circle::new(center, radius),
            color,
        });
    }

    /// Outlines a circle.
    fn stroke_circle(&mut self, center: Point, radius: f64, pen: Pen) {
        self.draw(DrawOp::StrokeCircle {
            circle: Circle::new(center, radius),
            pen,
        });
    }

    /// Fills a path.
    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.draw(DrawOp::FillPath { path, color });
    }

    /// Draws text with its top-left corner at `origin`.
    fn draw_text(&mut self, origin: Point, text: &str, size: f64, color: Color) {
        self.draw(DrawOp::Text {
            origin,
            text,
            size,
            color,
        });
    }

    /// Draws a bitmap scaled into `dest`.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, dest: Rect) {
        self.draw(DrawOp::Bitmap { bitmap, dest });
    }
}

impl<C: Canvas + ?Sized> CanvasExt for C {}

#[cfg(test)]
mod tests {
    use kurbo::{BezPath, Point, Rect};

    use super::{ClipShape, text_extent};

    #[test]
    fn rect_clip_is_half_open() {
        let clip = ClipShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(clip.contains(Point::new(0.0, 0.0)));
        assert!(!clip.contains(Point::new(10.0, 5.0)));
    }

    #[test]
    fn path_clip_uses_winding() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.line_to((10.0, 10.0));
        path.line_to((0.0, 10.0));
        path.close_path();
        let clip = ClipShape::Path(path);
        assert!(clip.contains(Point::new(5.0, 5.0)));
        assert!(!clip.contains(Point::new(15.0, 5.0)));
        assert_eq!(clip.bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn text_extent_is_monospaced() {
        let size = text_extent("abcd", 10.0);
        assert!((size.width - 24.0).abs() < 1e-9);
        assert_eq!(size.height, 10.0);
    }
}
