// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The map compositor.

use battlemap_canvas::{Canvas, CanvasExt, ClipShape, Pen};
use battlemap_shapes::LineCollection;
use battlemap_view::{CoordinateTransformer, Grid};
use kurbo::{BezPath, Rect};
use peniko::Color;

use crate::config::SessionContext;
use crate::map_data::MapData;
use crate::token::{BuiltInShape, Token, TokenArt};

/// Screen pixels a token's decorations may extend past its footprint.
pub const TOKEN_MARGIN_PX: f64 = 4.0;

const SELECTION_RING_PX: f64 = 3.0;

const GRID_LINE_PX: f64 = 1.0;

bitflags::bitflags! {
    /// Which parts of a map a [`MapDrawer`] composites.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DrawFlags: u8 {
        /// Grid lines.
        const GRID_LINES         = 0b0000_0001;
        /// The game master's notes.
        const GM_NOTES           = 0b0000_0010;
        /// Tokens.
        const TOKENS             = 0b0000_0100;
        /// Selection rings on selected tokens.
        const TOKENS_MANIPULABLE = 0b0000_1000;
        /// Annotations.
        const ANNOTATIONS        = 0b0001_0000;
        /// Clip tokens to the background mask when it clips.
        const MASK_TOKENS        = 0b0010_0000;
    }
}

/// What the players see: grid, tokens and annotations.
impl Default for DrawFlags {
    fn default() -> Self {
        Self::GRID_LINES | Self::TOKENS | Self::ANNOTATIONS
    }
}

/// How a fog-of-war mask affects the layer it belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FogOfWarMode {
    /// Draw the layer, then shade the mask regions in the fog colour.
    Draw,
    /// Show the layer only inside the mask regions.
    Clip,
    /// Ignore the mask.
    #[default]
    Nothing,
}

/// Composites a [`MapData`] onto a canvas.
///
/// The drawer holds configuration only. Layers go down in a fixed order:
/// grid lines, background lines, background images, tokens, annotations,
/// then GM notes.
///
/// A layer's mask is the union of the areas of its shapes. With
/// [`FogOfWarMode::Clip`] an empty background mask shows the whole
/// background while an empty GM notes mask hides every note.
#[derive(Clone, Debug, PartialEq)]
pub struct MapDrawer {
    flags: DrawFlags,
    background_fog: FogOfWarMode,
    gm_notes_fog: FogOfWarMode,
    fog_color: Color,
    grid_color: Color,
    selection_color: Color,
    bloodied_color: Color,
    placeholder_color: Color,
}

impl Default for MapDrawer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDrawer {
    /// A drawer with [`DrawFlags::default`] that ignores both masks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flags: DrawFlags::default(),
            background_fog: FogOfWarMode::Nothing,
            gm_notes_fog: FogOfWarMode::Nothing,
            fog_color: Color::from_rgba8(0, 0, 0, 128),
            grid_color: Color::from_rgba8(96, 96, 96, 255),
            selection_color: Color::from_rgba8(32, 128, 255, 255),
            bloodied_color: Color::from_rgba8(200, 0, 0, 112),
            placeholder_color: Color::from_rgba8(160, 160, 160, 255),
        }
    }

    /// Replaces the layer flags.
    #[must_use]
    pub fn with_flags(mut self, flags: DrawFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets how the background mask applies.
    #[must_use]
    pub fn with_background_fog(mut self, mode: FogOfWarMode) -> Self {
        self.background_fog = mode;
        self
    }

    /// Sets how the GM notes mask applies.
    #[must_use]
    pub fn with_gm_notes_fog(mut self, mode: FogOfWarMode) -> Self {
        self.gm_notes_fog = mode;
        self
    }

    /// Sets the colour of fog overlays in [`FogOfWarMode::Draw`].
    #[must_use]
    pub fn with_fog_color(mut self, color: Color) -> Self {
        self.fog_color = color;
        self
    }

    /// Sets the colour of grid lines.
    #[must_use]
    pub fn with_grid_color(mut self, color: Color) -> Self {
        self.grid_color = color;
        self
    }

    /// The layer flags.
    #[must_use]
    pub fn flags(&self) -> DrawFlags {
        self.flags
    }

    /// How the background mask applies.
    #[must_use]
    pub fn background_fog(&self) -> FogOfWarMode {
        self.background_fog
    }

    /// How the GM notes mask applies.
    #[must_use]
    pub fn gm_notes_fog(&self) -> FogOfWarMode {
        self.gm_notes_fog
    }

    /// Composites `map` inside the screen rectangle `dirty`.
    ///
    /// Image tokens whose pixels are not loaded yet get a placeholder and a
    /// load request on `ctx.images`.
    pub fn draw<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        map: &MapData,
        ctx: &mut SessionContext,
        dirty: Rect,
    ) {
        let dirty = dirty.abs();
        if dirty.is_zero_area() {
            return;
        }
        canvas.push_clip(ClipShape::Rect(dirty));
        let t = &map.transformer;

        if self.flags.contains(DrawFlags::GRID_LINES) {
            self.draw_grid(canvas, &map.grid, t, dirty);
        }

        let background_clip = match self.background_fog {
            FogOfWarMode::Clip if !map.background_fog.is_empty() => {
                Some(map.background_fog.region_path(t))
            }
            _ => None,
        };
        with_optional_clip(canvas, background_clip.as_ref(), |canvas| {
            map.background.draw(canvas, t);
            for image in &map.background_images {
                let dest = t.world_to_screen_rect(image.rect);
                if image.is_degenerate() || !dest.overlaps(dirty) {
                    continue;
                }
                match ctx.images.get(&image.key) {
                    Some(bitmap) => canvas.draw_bitmap(bitmap, dest),
                    None => {
                        ctx.images.require_image(&image.key);
                    }
                }
            }
        });
        if self.background_fog == FogOfWarMode::Draw {
            self.draw_fog(canvas, &map.background_fog, t);
        }

        if self.flags.contains(DrawFlags::TOKENS) {
            let token_clip = background_clip
                .as_ref()
                .filter(|_| self.flags.contains(DrawFlags::MASK_TOKENS));
            with_optional_clip(canvas, token_clip, |canvas| {
                for token in &map.tokens {
                    self.draw_token(canvas, token, map, ctx, dirty);
                }
            });
        }

        if self.flags.contains(DrawFlags::ANNOTATIONS) {
            map.annotations.draw(canvas, t);
        }

        if self.flags.contains(DrawFlags::GM_NOTES) {
            match self.gm_notes_fog {
                FogOfWarMode::Clip => {
                    if !map.gm_notes_fog.is_empty() {
                        let region = map.gm_notes_fog.region_path(t);
                        canvas.with_clip(ClipShape::Path(region), |canvas| {
                            map.gm_notes.draw(canvas, t);
                        });
                    }
                }
                FogOfWarMode::Draw => {
                    map.gm_notes.draw(canvas, t);
                    self.draw_fog(canvas, &map.gm_notes_fog, t);
                }
                FogOfWarMode::Nothing => map.gm_notes.draw(canvas, t),
            }
        }

        canvas.pop_clip();
    }

    fn draw_grid<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        grid: &Grid,
        t: &CoordinateTransformer,
        dirty: Rect,
    ) {
        // Grid lines are axis aligned, so each one is a one pixel wide
        // rectangle centred on it.
        let world = t.screen_to_world_rect(dirty.inflate(1.0, 1.0));
        let half = GRID_LINE_PX / 2.0;
        for line in grid.visible_lines(world) {
            let (p0, p1) = (t.world_to_screen(line.p0), t.world_to_screen(line.p1));
            let rect = Rect::from_points(p0, p1).inflate(
                if p0.x == p1.x { half } else { 0.0 },
                if p0.y == p1.y { half } else { 0.0 },
            );
            canvas.fill_rect(rect, self.grid_color);
        }
    }

    fn draw_fog<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        mask: &LineCollection,
        t: &CoordinateTransformer,
    ) {
        let region = mask.region_path(t);
        if !region.elements().is_empty() {
            canvas.fill_path(&region, self.fog_color);
        }
    }

    fn draw_token<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        token: &Token,
        map: &MapData,
        ctx: &mut SessionContext,
        dirty: Rect,
    ) {
        if !map.grid.is_configured() {
            return;
        }
        let rect = token.screen_rect(&map.grid, &map.transformer);
        if !rect
            .inflate(TOKEN_MARGIN_PX, TOKEN_MARGIN_PX)
            .overlaps(dirty)
        {
            return;
        }
        let center = rect.center();
        let radius = rect.width() / 2.0;
        match token.art() {
            TokenArt::SolidColor(color) => canvas.fill_circle(center, radius, *color),
            TokenArt::BuiltIn { shape, color } => match shape {
                BuiltInShape::Circle => canvas.fill_circle(center, radius, *color),
                BuiltInShape::Square => canvas.fill_rect(rect, *color),
                BuiltInShape::Diamond => canvas.fill_path(&diamond(rect), *color),
            },
            TokenArt::Image(key) => match ctx.images.get(key) {
                Some(bitmap) => canvas.draw_bitmap(bitmap, rect),
                None => {
                    ctx.images.require_image(key);
                    canvas.fill_circle(center, radius, self.placeholder_color);
                    canvas.stroke_circle(center, radius, Pen::new(1.0, self.grid_color));
                }
            },
        }
        if token.is_bloodied() {
            canvas.fill_circle(center, radius, self.bloodied_color);
        }
        if token.is_selected() && self.flags.contains(DrawFlags::TOKENS_MANIPULABLE) {
            canvas.stroke_circle(
                center,
                radius + SELECTION_RING_PX / 2.0,
                Pen::new(SELECTION_RING_PX, self.selection_color),
            );
        }
    }
}

/// Screen rectangle a token paints into, decorations included.
#[must_use]
pub fn token_extent(token: &Token, grid: &Grid, world_to_screen: &CoordinateTransformer) -> Rect {
    token
        .screen_rect(grid, world_to_screen)
        .inflate(TOKEN_MARGIN_PX, TOKEN_MARGIN_PX)
}

fn diamond(rect: Rect) -> BezPath {
    let c = rect.center();
    let mut path = BezPath::new();
    path.move_to((c.x, rect.y0));
    path.line_to((rect.x1, c.y));
    path.line_to((c.x, rect.y1));
    path.line_to((rect.x0, c.y));
    path.close_path();
    path
}

fn with_optional_clip<C: Canvas + ?Sized>(
    canvas: &mut C,
    clip: Option<&BezPath>,
    f: impl FnOnce(&mut C),
) {
    match clip {
        Some(path) => canvas.with_clip(ClipShape::Path(path.clone()), f),
        None => f(canvas),
    }
}

#[cfg(test)]
mod tests {
    use battlemap_canvas::{Bitmap, RasterCanvas, RecordedOp, RecordingCanvas};
    use battlemap_shapes::StrokeWidth;
    use kurbo::{Point, Rect};
    use peniko::Color;

    use super::{DrawFlags, FogOfWarMode, MapDrawer};
    use crate::{ImageKey, MapData, SessionContext, Token, TokenArt};

    const RED: Color = Color::from_rgba8(255, 0, 0, 255);

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    fn render(drawer: &MapDrawer, map: &MapData) -> Bitmap {
        let mut target = Bitmap::filled(100, 100, Color::WHITE);
        let mut ctx = SessionContext::default();
        drawer.draw(&mut RasterCanvas::new(&mut target), map, &mut ctx, viewport());
        target
    }

    fn red_at(bitmap: &Bitmap, x: u32, y: u32) -> bool {
        bitmap.pixel(x, y) == Some(Bitmap::pack(RED))
    }

    #[test]
    fn empty_background_mask_shows_everything() {
        let mut map = MapData::default();
        let id = map
            .background
            .create_rectangle(Point::new(10.0, 10.0), RED, StrokeWidth::Filled);
        map.background
            .add_point(id, Point::new(90.0, 90.0), &Default::default());
        let drawer = MapDrawer::new().with_background_fog(FogOfWarMode::Clip);
        assert!(red_at(&render(&drawer, &map), 50, 50));
    }

    #[test]
    fn empty_gm_mask_hides_everything() {
        let mut map = MapData::default();
        let id = map
            .gm_notes
            .create_rectangle(Point::new(10.0, 10.0), RED, StrokeWidth::Filled);
        map.gm_notes
            .add_point(id, Point::new(90.0, 90.0), &Default::default());
        let drawer = MapDrawer::new()
            .with_flags(DrawFlags::GM_NOTES)
            .with_gm_notes_fog(FogOfWarMode::Clip);
        assert!(!red_at(&render(&drawer, &map), 50, 50));

        let unmasked = drawer.clone().with_gm_notes_fog(FogOfWarMode::Nothing);
        assert!(red_at(&render(&unmasked, &map), 50, 50));
    }

    #[test]
    fn background_mask_clips_to_its_regions() {
        let mut map = MapData::default();
        let id = map
            .background
            .create_rectangle(Point::ZERO, RED, StrokeWidth::Filled);
        map.background
            .add_point(id, Point::new(100.0, 100.0), &Default::default());
        let mask = map
            .background_fog
            .create_rectangle(Point::ZERO, Color::BLACK, StrokeWidth::Filled);
        map.background_fog
            .add_point(mask, Point::new(50.0, 100.0), &Default::default());

        let clip = MapDrawer::new().with_background_fog(FogOfWarMode::Clip);
        let pixels = render(&clip, &map);
        assert!(red_at(&pixels, 25, 50));
        assert!(!red_at(&pixels, 75, 50));

        let draw = MapDrawer::new().with_background_fog(FogOfWarMode::Draw);
        let pixels = render(&draw, &map);
        assert!(!red_at(&pixels, 25, 50), "fog shades the mask region");
        assert!(red_at(&pixels, 75, 50));
    }

    #[test]
    fn layers_go_down_in_order_inside_the_dirty_clip() {
        let mut map = MapData::default();
        map.grid = battlemap_view::Grid::new(50.0);
        map.background
            .create_circle(Point::new(10.0, 10.0), RED, StrokeWidth::Stroked(1.0));
        map.tokens.insert(Token::new(
            "orc",
            Point::new(0.5, 0.5),
            1.0,
            TokenArt::SolidColor(Color::BLACK),
        ));
        let mut canvas = RecordingCanvas::new();
        let mut ctx = SessionContext::default();
        MapDrawer::new().draw(&mut canvas, &map, &mut ctx, viewport());
        let ops: Vec<_> = canvas.draws().collect();
        let first_token = ops
            .iter()
            .position(|op| matches!(op, RecordedOp::FillCircle { .. }))
            .unwrap();
        assert!(
            ops[..first_token]
                .iter()
                .any(|op| matches!(op, RecordedOp::FillRect { .. })),
            "grid lines come before tokens"
        );
        assert_eq!(canvas.clip_depth(), 0, "every clip is popped");
    }

    #[test]
    fn missing_token_images_are_requested() {
        let mut map = MapData::default();
        map.grid = battlemap_view::Grid::new(50.0);
        let key = ImageKey::new("dragon.png");
        map.tokens.insert(Token::new(
            "dragon",
            Point::new(1.0, 1.0),
            2.0,
            TokenArt::Image(key.clone()),
        ));
        let mut ctx = SessionContext::default();
        let mut target = Bitmap::filled(100, 100, Color::WHITE);
        MapDrawer::new().draw(&mut RasterCanvas::new(&mut target), &map, &mut ctx, viewport());
        assert!(ctx.images.is_pending(&key));
        assert_ne!(target.pixel(50, 50), Some(Bitmap::pack(Color::WHITE)));
    }
}
