// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-session settings and the context object that carries them.

use battlemap_history::DEFAULT_HISTORY_LIMIT;
use battlemap_shapes::{DEFAULT_OPTIMIZE_TOLERANCE, StrokeWidth};
use peniko::Color;

use crate::images::{ImageCache, ImageLoader};

/// Tunables for one editing session.
///
/// Built from [`Default`] and adjusted with the `with_*` methods:
///
/// ```rust
/// use battlemap_map::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_history_limit(20)
///     .with_eraser_radius_px(24.0);
/// assert_eq!(config.history_limit(), 20);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    history_limit: usize,
    hit_tolerance_px: f64,
    eraser_radius_px: f64,
    optimize_tolerance: f64,
    fog_color: Color,
    background_color: Color,
    line_color: Color,
    line_stroke: StrokeWidth,
    text_size_px: f64,
    handle_radius_px: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            hit_tolerance_px: 8.0,
            eraser_radius_px: 16.0,
            optimize_tolerance: DEFAULT_OPTIMIZE_TOLERANCE,
            fog_color: Color::from_rgba8(0, 0, 0, 128),
            background_color: Color::WHITE,
            line_color: Color::BLACK,
            line_stroke: StrokeWidth::Stroked(2.0),
            text_size_px: 16.0,
            handle_radius_px: 24.0,
        }
    }
}

impl SessionConfig {
    /// Undo steps kept per layer.
    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Sets the undo steps kept per layer.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Slack around shapes and tokens for taps, in screen pixels.
    #[must_use]
    pub fn hit_tolerance_px(&self) -> f64 {
        self.hit_tolerance_px
    }

    /// Sets the tap slack in screen pixels.
    #[must_use]
    pub fn with_hit_tolerance_px(mut self, px: f64) -> Self {
        self.hit_tolerance_px = px;
        self
    }

    /// Eraser radius in screen pixels.
    #[must_use]
    pub fn eraser_radius_px(&self) -> f64 {
        self.eraser_radius_px
    }

    /// Sets the eraser radius in screen pixels.
    #[must_use]
    pub fn with_eraser_radius_px(mut self, px: f64) -> Self {
        self.eraser_radius_px = px;
        self
    }

    /// Simplification tolerance applied to finished freehand lines, in
    /// world units.
    #[must_use]
    pub fn optimize_tolerance(&self) -> f64 {
        self.optimize_tolerance
    }

    /// Sets the freehand simplification tolerance.
    #[must_use]
    pub fn with_optimize_tolerance(mut self, tolerance: f64) -> Self {
        self.optimize_tolerance = tolerance;
        self
    }

    /// Translucent colour of fog-of-war overlays.
    #[must_use]
    pub fn fog_color(&self) -> Color {
        self.fog_color
    }

    /// Sets the fog overlay colour.
    #[must_use]
    pub fn with_fog_color(mut self, color: Color) -> Self {
        self.fog_color = color;
        self
    }

    /// Colour behind every layer.
    #[must_use]
    pub fn background_color(&self) -> Color {
        self.background_color
    }

    /// Sets the colour behind every layer.
    #[must_use]
    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Colour of new shapes.
    #[must_use]
    pub fn line_color(&self) -> Color {
        self.line_color
    }

    /// Stroke of new lines, circles and rectangles.
    #[must_use]
    pub fn line_stroke(&self) -> StrokeWidth {
        self.line_stroke
    }

    /// Sets the colour and stroke of new shapes.
    #[must_use]
    pub fn with_pen(mut self, color: Color, stroke: StrokeWidth) -> Self {
        self.line_color = color;
        self.line_stroke = stroke;
        self
    }

    /// Font size of new text, in screen pixels.
    #[must_use]
    pub fn text_size_px(&self) -> f64 {
        self.text_size_px
    }

    /// Sets the font size of new text.
    #[must_use]
    pub fn with_text_size_px(mut self, px: f64) -> Self {
        self.text_size_px = px;
        self
    }

    /// How close, in screen pixels, a touch must land to grab an image
    /// corner.
    #[must_use]
    pub fn handle_radius_px(&self) -> f64 {
        self.handle_radius_px
    }

    /// Sets the corner grab radius.
    #[must_use]
    pub fn with_handle_radius_px(mut self, px: f64) -> Self {
        self.handle_radius_px = px;
        self
    }
}

/// Everything one open map shares: settings and the image cache.
///
/// There is one context per session; nothing in the crate is global.
#[derive(Debug, Default)]
pub struct SessionContext {
    /// Settings.
    pub config: SessionConfig,
    /// Token and background images.
    pub images: ImageCache,
}

impl SessionContext {
    /// Creates a context loading images through `loader`.
    pub fn new(config: SessionConfig, loader: impl ImageLoader + 'static) -> Self {
        Self {
            config,
            images: ImageCache::new(loader),
        }
    }
}
