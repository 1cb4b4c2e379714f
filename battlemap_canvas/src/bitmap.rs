// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, BezPath, Cap, Circle, Join, Point, Rect, Shape, Stroke};
use peniko::{Blob, Color, ImageAlphaType, ImageData, ImageFormat, ImageQuality, ImageSampler};
use vello_cpu::{Image, ImageSource, Pixmap, RenderContext, RenderMode, RenderSettings};

use crate::{Canvas, ClipShape, DrawOp, GLYPH_ADVANCE, Pen};

/// Flattening tolerance for circles and clip rectangles, in pixels.
const TOLERANCE: f64 = 0.1;

/// Owned RGBA8 pixel buffer.
///
/// Pixels are stored row-major, one `u32` each, packed as `0xRRGGBBAA` with
/// straight (non-premultiplied) alpha. Zero is fully transparent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    /// Creates a fully transparent bitmap.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Creates a bitmap filled with `color`.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![Self::pack(color); width as usize * height as usize],
        }
    }

    /// Wraps packed pixels; returns `None` if the length does not match.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a bitmap from tightly packed RGBA8 bytes.
    #[must_use]
    pub fn from_rgba8_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width as usize * height as usize * 4 {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| u32::from_be_bytes([px[0], px[1], px[2], px[3]]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    /// Packs a colour into the bitmap's pixel format.
    #[must_use]
    pub fn pack(color: Color) -> u32 {
        let rgba = color.to_rgba8();
        u32::from_be_bytes([rgba.r, rgba.g, rgba.b, rgba.a])
    }

    /// Splits a packed pixel into `[r, g, b, a]`.
    #[must_use]
    pub fn channels(pixel: u32) -> [u8; 4] {
        pixel.to_be_bytes()
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The bitmap area as a rectangle anchored at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Overwrites the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: u32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = pixel;
        }
    }

    /// Overwrites every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(Self::pack(color));
    }

    /// Overwrites (without blending) every pixel whose centre lies in `rect`.
    pub fn fill_region(&mut self, rect: Rect, color: Color) {
        let pixel = Self::pack(color);
        let Some((x0, y0, x1, y1)) = pixel_span(rect, self.width, self.height) else {
            return;
        };
        for y in y0..y1 {
            let row = y as usize * self.width as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(pixel);
        }
    }

    /// Copies `src` into `self` shifted by `(dx, dy)` pixels.
    ///
    /// After the call `self(x, y) == src(x - dx, y - dy)` wherever the source
    /// pixel exists. Pixels with no source counterpart are left untouched.
    /// Bitmaps of different sizes are not copied.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "offsets are bounded by the bitmap size, which fits in memory"
    )]
    pub fn copy_shifted_from(&mut self, src: &Self, dx: i32, dy: i32) {
        if src.width != self.width || src.height != self.height {
            log::warn!(
                "shifted copy between {}x{} and {}x{} bitmaps ignored",
                src.width,
                src.height,
                self.width,
                self.height
            );
            return;
        }
        let w = i64::from(self.width);
        let h = i64::from(self.height);
        let (dx, dy) = (i64::from(dx), i64::from(dy));
        let x_start = dx.max(0);
        let x_end = (w + dx).min(w);
        if x_start >= x_end {
            return;
        }
        for y in dy.max(0)..(h + dy).min(h) {
            let sy = y - dy;
            let dst_row = (y * w) as usize;
            let src_row = (sy * w) as usize;
            let dst = dst_row + x_start as usize..dst_row + x_end as usize;
            let src_start = src_row + (x_start - dx) as usize;
            self.pixels[dst.clone()].copy_from_slice(&src.pixels[src_start..src_start + dst.len()]);
        }
    }

    /// Largest difference between any two corresponding channels, or `None`
    /// when the sizes differ.
    #[must_use]
    pub fn max_difference(&self, other: &Self) -> Option<u8> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        let diff = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .flat_map(|(a, b)| {
                let (a, b) = (a.to_be_bytes(), b.to_be_bytes());
                (0..4).map(move |i| a[i].abs_diff(b[i]))
            })
            .max();
        Some(diff.unwrap_or(0))
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }
}

/// Range of pixel indices whose centres lie inside `rect`, clamped to the
/// bitmap. Half-open on both axes; `None` when empty.
fn pixel_span(rect: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = (rect.x0 - 0.5).ceil().max(0.0);
    let y0 = (rect.y0 - 0.5).ceil().max(0.0);
    let x1 = (rect.x1 - 0.5).ceil().min(f64::from(width));
    let y1 = (rect.y1 - 0.5).ceil().min(f64::from(height));
    // Also rejects NaN.
    if !(x0 < x1 && y0 < y1) {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "values are clamped to the bitmap dimensions"
    )]
    let span = (x0 as u32, y0 as u32, x1 as u32, y1 as u32);
    Some(span)
}

/// Source-over of a premultiplied source pixel onto a straight-alpha
/// destination, in 8-bit integer arithmetic.
fn composite(dst: u32, src: [u8; 4]) -> u32 {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return u32::from_be_bytes(src);
    }
    if sa == 0 {
        return dst;
    }
    let d = dst.to_be_bytes();
    let dst_weight = u32::from(d[3]) * (255 - sa);
    let total = sa * 255 + dst_weight;
    let mix = |s: u8, d: u8| {
        let v = (u32::from(s) * 255 * 255 + u32::from(d) * dst_weight + total / 2) / total;
        u8::try_from(v).unwrap_or(u8::MAX)
    };
    let out_a = u8::try_from((total + 127) / 255).unwrap_or(u8::MAX);
    u32::from_be_bytes([mix(src[0], d[0]), mix(src[1], d[1]), mix(src[2], d[2]), out_a])
}

fn image_paint(bitmap: &Bitmap) -> Image {
    let bytes: Vec<u8> = bitmap.pixels.iter().flat_map(|px| px.to_be_bytes()).collect();
    let data = ImageData {
        data: Blob::from(bytes),
        format: ImageFormat::Rgba8,
        alpha_type: ImageAlphaType::Alpha,
        width: bitmap.width,
        height: bitmap.height,
    };
    Image {
        image: ImageSource::from_peniko_image_data(&data),
        sampler: ImageSampler::new().with_quality(ImageQuality::Low),
    }
}

fn round_stroke(width: f64) -> Stroke {
    Stroke::new(width)
        .with_join(Join::Round)
        .with_caps(Cap::Round)
}

/// Anti-aliased rasterizer drawing into a [`Bitmap`] through a `vello_cpu`
/// [`RenderContext`].
///
/// Ops accumulate in the render context and land in the target when the
/// canvas is dropped, composited over what the bitmap already holds. Pixels
/// that nothing covers keep their exact value, and a pixel fully inside a
/// whole-pixel clip rectangle renders the same as without the clip. That
/// keeps dirty-rectangle redraws identical to full ones.
pub struct RasterCanvas<'a> {
    target: &'a mut Bitmap,
    ctx: Option<RenderContext>,
    clip_depth: usize,
    dirty: bool,
}

impl fmt::Debug for RasterCanvas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterCanvas")
            .field("width", &self.target.width)
            .field("height", &self.target.height)
            .field("clip_depth", &self.clip_depth)
            .finish_non_exhaustive()
    }
}

impl<'a> RasterCanvas<'a> {
    /// Creates a canvas drawing into `target` with an empty clip stack.
    ///
    /// Bitmaps wider or taller than `u16::MAX` pixels cannot be rendered;
    /// drawing into them does nothing.
    pub fn new(target: &'a mut Bitmap) -> Self {
        let ctx = match (u16::try_from(target.width), u16::try_from(target.height)) {
            (Ok(0), _) | (_, Ok(0)) => None,
            (Ok(width), Ok(height)) => {
                let settings = RenderSettings {
                    render_mode: RenderMode::OptimizeSpeed,
                    ..RenderSettings::default()
                };
                Some(RenderContext::new_with(width, height, settings))
            }
            _ => {
                log::warn!(
                    "{}x{} bitmap is too large to rasterize",
                    target.width,
                    target.height
                );
                None
            }
        };
        Self {
            target,
            ctx,
            clip_depth: 0,
            dirty: false,
        }
    }

    /// Number of clips currently pushed.
    #[must_use]
    pub fn clip_depth(&self) -> usize {
        self.clip_depth
    }

    fn stroke_points(ctx: &mut RenderContext, points: &[Point], pen: Pen) {
        let Some((&first, rest)) = points.split_first() else {
            return;
        };
        ctx.set_paint(pen.color);
        if rest.iter().all(|p| *p == first) {
            // A dot: the round caps of a zero-length stroke.
            ctx.fill_path(&Circle::new(first, pen.width / 2.0).to_path(TOLERANCE));
            return;
        }
        let mut path = BezPath::new();
        path.move_to(first);
        for p in rest {
            path.line_to(*p);
        }
        ctx.set_stroke(round_stroke(pen.width));
        ctx.stroke_path(&path);
    }

    fn draw_image(ctx: &mut RenderContext, bitmap: &Bitmap, dest: Rect) {
        let dest = dest.abs();
        if bitmap.width == 0 || bitmap.height == 0 || dest.is_zero_area() {
            return;
        }
        let (w, h) = (f64::from(bitmap.width), f64::from(bitmap.height));
        ctx.set_paint(image_paint(bitmap));
        ctx.set_transform(
            Affine::translate(dest.origin().to_vec2())
                * Affine::scale_non_uniform(dest.width() / w, dest.height() / h),
        );
        ctx.fill_rect(&Rect::new(0.0, 0.0, w, h));
        ctx.set_transform(Affine::IDENTITY);
    }

    /// Renders everything drawn so far and composites it onto the target.
    fn flush(&mut self) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        for _ in 0..self.clip_depth {
            ctx.pop_layer();
        }
        self.clip_depth = 0;
        if !self.dirty {
            return;
        }
        self.dirty = false;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the context was only created for sizes that fit in u16"
        )]
        let mut pixmap = Pixmap::new(self.target.width as u16, self.target.height as u16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        for (dst, src) in self.target.pixels.iter_mut().zip(pixmap.data()) {
            *dst = composite(*dst, [src.r, src.g, src.b, src.a]);
        }
    }
}

impl Drop for RasterCanvas<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl Canvas for RasterCanvas<'_> {
    fn push_clip(&mut self, clip: ClipShape) {
        if let Some(ctx) = self.ctx.as_mut() {
            let path = match clip {
                ClipShape::Rect(rect) => rect.abs().to_path(TOLERANCE),
                ClipShape::Path(path) => path,
            };
            ctx.push_clip_layer(&path);
        }
        self.clip_depth += 1;
    }

    fn pop_clip(&mut self) {
        if self.clip_depth == 0 {
            return;
        }
        self.clip_depth -= 1;
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.pop_layer();
        }
    }

    fn draw(&mut self, op: DrawOp<'_>) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };
        self.dirty = true;
        match op {
            DrawOp::FillRect { rect, color } => {
                ctx.set_paint(color);
                ctx.fill_rect(&rect.abs());
            }
            DrawOp::StrokeRect { rect, pen } => {
                ctx.set_paint(pen.color);
                ctx.set_stroke(Stroke::new(pen.width).with_join(Join::Miter));
                ctx.stroke_rect(&rect.abs());
            }
            DrawOp::Line { line, pen } => Self::stroke_points(ctx, &[line.p0, line.p1], pen),
            DrawOp::Polyline { points, pen } => Self::stroke_points(ctx, points, pen),
            DrawOp::FillCircle { circle, color } => {
                ctx.set_paint(color);
                ctx.fill_path(&circle.to_path(TOLERANCE));
            }
            DrawOp::StrokeCircle { circle, pen } => {
                ctx.set_paint(pen.color);
                ctx.set_stroke(round_stroke(pen.width));
                ctx.stroke_path(&circle.to_path(TOLERANCE));
            }
            DrawOp::FillPath { path, color } => {
                ctx.set_paint(color);
                ctx.fill_path(path);
            }
            DrawOp::Text {
                origin,
                text,
                size,
                color,
            } => {
                // Each glyph renders as a solid box inside its cell.
                ctx.set_paint(color);
                let advance = size * GLYPH_ADVANCE;
                for (i, ch) in text.chars().enumerate() {
                    if ch.is_whitespace() {
                        continue;
                    }
                    let x = origin.x + i as f64 * advance;
                    ctx.fill_rect(&Rect::new(
                        x + advance * 0.1,
                        origin.y + size * 0.1,
                        x + advance * 0.9,
                        origin.y + size * 0.9,
                    ));
                }
            }
            DrawOp::Bitmap { bitmap, dest } => Self::draw_image(ctx, bitmap, dest),
        }
    }
}
