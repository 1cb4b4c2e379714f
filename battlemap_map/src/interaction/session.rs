// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use battlemap_canvas::{Bitmap, Canvas, CanvasExt, Pen};
use battlemap_history::UndoRedoTarget;
use battlemap_shapes::{HitParams, LineCollection, ShapeId};
use kurbo::{Point, Rect, Vec2};
use peniko::Color;

use super::{DragState, DrawTool, InputEvent, InputKind, InteractionMode, Measurement};
use crate::background::Corner;
use crate::config::SessionContext;
use crate::drawer::{MapDrawer, token_extent};
use crate::map_data::{EditTarget, MapData};
use crate::redraw::{Redraw, RedrawBatch};
use crate::token::TokenId;
use crate::view::MapView;

/// Screen pixels a shape may paint past its world extent.
const STROKE_SLACK_PX: f64 = 2.0;

/// Room around a ruler for its end caps and label.
const RULER_MARGIN_PX: f64 = 40.0;

const RULER_LABEL_PX: f64 = 14.0;

/// The single-finger gesture in progress.
#[derive(Clone, Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Panning,
    Drawing {
        layer: EditTarget,
        shape: ShapeId,
    },
    Erasing {
        layer: EditTarget,
    },
    MovingToken {
        token: TokenId,
        from: Point,
        drag: DragState,
    },
    Resizing {
        index: usize,
        corner: Corner,
    },
    Measuring {
        drag: DragState,
    },
}

/// One open map: its data, the viewport showing it, and the current
/// interaction mode.
///
/// Every method that can change what is on screen returns the coalesced
/// [`Redraw`] it caused, to be passed to [`Session::render`].
#[derive(Debug)]
pub struct Session {
    map: MapData,
    ctx: SessionContext,
    view: MapView,
    drawer: MapDrawer,
    batch: RedrawBatch,
    mode: InteractionMode,
    gesture: Gesture,
    ruler: Option<Measurement>,
}

impl Session {
    /// Opens `map` in a `width` × `height` viewport.
    ///
    /// The map takes the history limit of `ctx.config`, and the drawer its
    /// fog colour.
    pub fn new(mut map: MapData, ctx: SessionContext, width: u32, height: u32) -> Self {
        map.set_history_limit(ctx.config.history_limit());
        let drawer = MapDrawer::new().with_fog_color(ctx.config.fog_color());
        Self {
            map,
            ctx,
            view: MapView::new(width, height),
            drawer,
            batch: RedrawBatch::new(),
            mode: InteractionMode::default(),
            gesture: Gesture::Idle,
            ruler: None,
        }
    }

    /// The map being edited.
    #[must_use]
    pub fn map(&self) -> &MapData {
        &self.map
    }

    /// The map, for edits made outside of gestures. Follow them with
    /// [`Session::invalidate`].
    pub fn map_mut(&mut self) -> &mut MapData {
        &mut self.map
    }

    /// Settings and images.
    #[must_use]
    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }

    /// Settings and images, mutably.
    pub fn ctx_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    /// The compositor configuration.
    #[must_use]
    pub fn drawer(&self) -> &MapDrawer {
        &self.drawer
    }

    /// The viewport.
    #[must_use]
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// The displayed pixels.
    #[must_use]
    pub fn front(&self) -> &Bitmap {
        self.view.front()
    }

    /// How single-finger input is interpreted.
    #[must_use]
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// The current or last ruler of the measure mode.
    #[must_use]
    pub fn measurement(&self) -> Option<&Measurement> {
        self.ruler.as_ref()
    }

    /// Switches mode, abandoning any gesture in progress.
    ///
    /// Token and image modes make their collection the undo target. Line
    /// modes keep the active line layer, falling back to the background.
    pub fn set_mode(&mut self, mode: InteractionMode) -> Option<Redraw> {
        self.batch.begin();
        self.cancel_gesture();
        self.clear_ruler();
        match &mode {
            InteractionMode::Token => self.map.set_active(EditTarget::Tokens),
            InteractionMode::ResizeImage => self.map.set_active(EditTarget::BackgroundImages),
            m if m.edits_lines() && !self.map.active().is_line_layer() => {
                self.map.set_active(EditTarget::Background);
            }
            _ => {}
        }
        log::debug!("interaction mode {mode:?}, editing {:?}", self.map.active());
        self.mode = mode;
        self.batch.end()
    }

    /// Changes what undo and redo apply to, abandoning any gesture.
    pub fn set_active(&mut self, target: EditTarget) -> Option<Redraw> {
        self.batch.begin();
        self.cancel_gesture();
        self.map.set_active(target);
        self.batch.end()
    }

    /// Replaces the compositor configuration.
    pub fn set_drawer(&mut self, drawer: MapDrawer) -> Option<Redraw> {
        self.batch.begin();
        if drawer != self.drawer {
            self.drawer = drawer;
            self.batch.request_full();
        }
        self.batch.end()
    }

    /// Requests a full recomposite. Call it after editing the map through
    /// [`Session::map_mut`]; images nothing uses any more are released.
    pub fn invalidate(&mut self) -> Option<Redraw> {
        self.batch.begin();
        self.release_unused_images();
        self.batch.request_full();
        self.batch.end()
    }

    /// Changes the viewport size.
    pub fn resize(&mut self, width: u32, height: u32) -> Option<Redraw> {
        self.view.resize(width, height);
        self.invalidate()
    }

    /// Undoes the last gesture on the active target.
    pub fn undo(&mut self) -> Option<Redraw> {
        self.batch.begin();
        self.cancel_gesture();
        if self.map.undo().is_applied() {
            self.release_unused_images();
            self.batch.request_full();
        } else {
            log::debug!("nothing to undo on {:?}", self.map.active());
        }
        self.batch.end()
    }

    /// Redoes the next gesture on the active target.
    pub fn redo(&mut self) -> Option<Redraw> {
        self.batch.begin();
        self.cancel_gesture();
        if self.map.redo().is_applied() {
            self.release_unused_images();
            self.batch.request_full();
        } else {
            log::debug!("nothing to redo on {:?}", self.map.active());
        }
        self.batch.end()
    }

    /// Abandons the gesture in progress, restoring what it changed.
    pub fn cancel(&mut self) -> Option<Redraw> {
        self.batch.begin();
        self.cancel_gesture();
        self.batch.end()
    }

    /// Brings the viewport up to date.
    pub fn render(&mut self, redraw: &Redraw) {
        self.view
            .apply(redraw, &self.map, &mut self.ctx, &self.drawer);
    }

    /// Applies finished image loads and asks for the visible tokens and
    /// background images that use them to be redrawn.
    pub fn pump_images(&mut self) -> Option<Redraw> {
        let ready = self.ctx.images.poll();
        if ready.is_empty() {
            return None;
        }
        self.batch.begin();
        let viewport = self.view.bounds();
        let t = &self.map.transformer;
        for token in &self.map.tokens {
            if token.art().image_key().is_some_and(|key| ready.contains(key)) {
                let rect = token_extent(token, &self.map.grid, t);
                if rect.overlaps(viewport) {
                    self.batch.request_rect(rect);
                }
            }
        }
        for image in &self.map.background_images {
            if ready.contains(&image.key) {
                let rect = t.world_to_screen_rect(image.rect);
                if rect.overlaps(viewport) {
                    self.batch.request_rect(rect);
                }
            }
        }
        self.batch.end()
    }

    /// Draws transient feedback, such as the ruler, on top of the displayed
    /// map. It is not part of the scroll buffer, so hosts draw it on their
    /// presentation surface after copying [`Session::front`].
    pub fn draw_overlay<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let Some(ruler) = &self.ruler else {
            return;
        };
        let t = &self.map.transformer;
        let (start, end) = (t.world_to_screen(ruler.start), t.world_to_screen(ruler.end));
        let pen = Pen::new(2.0, Color::from_rgba8(255, 200, 0, 255));
        canvas.stroke_line(start, end, pen);
        canvas.fill_circle(start, 3.0, pen.color);
        if let Some(cells) = ruler.cells(&self.map.grid) {
            let label = format!("{cells:.1}");
            canvas.draw_text(end + Vec2::new(8.0, 8.0), &label, RULER_LABEL_PX, pen.color);
        }
    }

    /// Handles one input event and returns the redraw it caused.
    pub fn handle(&mut self, event: InputEvent) -> Option<Redraw> {
        self.batch.begin();
        let point = event.point;
        match event.kind {
            InputKind::Scale { factor } => {
                self.cancel_gesture();
                self.zoom(factor, point);
            }
            InputKind::Scroll { delta } if event.fingers >= 2 => {
                self.cancel_gesture();
                self.pan(delta);
            }
            InputKind::Down => {
                // A second touch-down mid-gesture means it was interrupted.
                self.cancel_gesture();
                if event.fingers == 1 {
                    self.on_down(point);
                }
            }
            InputKind::Scroll { delta } => self.on_move(point, delta),
            InputKind::Up => self.on_up(),
            InputKind::LongPress => self.on_long_press(point),
            InputKind::SingleTapConfirmed => self.on_tap(point),
        }
        self.batch.end()
    }

    fn release_unused_images(&mut self) {
        let in_use = self.map.image_keys();
        self.ctx.images.release_unused(|key| in_use.contains(key));
    }

    fn hit_params(&self) -> HitParams {
        HitParams::from_screen(
            self.ctx.config.hit_tolerance_px(),
            self.map.transformer.screen_to_world_distance(1.0),
        )
    }

    fn to_world(&self, screen: Point) -> Point {
        self.map.transformer.screen_to_world(screen)
    }

    fn request_world(&mut self, world: Rect) {
        let rect = self.map.transformer.world_to_screen_rect(world);
        self.batch
            .request_rect(rect.inflate(STROKE_SLACK_PX, STROKE_SLACK_PX));
    }

    fn request_token(&mut self, id: TokenId) {
        if let Some(token) = self.map.tokens.get(id) {
            let rect = token_extent(token, &self.map.grid, &self.map.transformer);
            self.batch.request_rect(rect);
        }
    }

    fn request_ruler(&mut self) {
        if let Some(ruler) = self.ruler {
            let t = &self.map.transformer;
            let rect = Rect::from_points(t.world_to_screen(ruler.start), t.world_to_screen(ruler.end));
            self.batch
                .request_rect(rect.inflate(RULER_MARGIN_PX, RULER_MARGIN_PX));
        }
    }

    fn clear_ruler(&mut self) {
        self.request_ruler();
        self.ruler = None;
    }

    fn pan(&mut self, delta: Vec2) {
        let applied = self.view.pan(&mut self.map.transformer, delta);
        self.batch.request_scroll(applied);
    }

    fn zoom(&mut self, factor: f64, focal: Point) {
        let before = self.map.transformer;
        self.map.transformer.zoom(factor, focal);
        if self.map.transformer != before {
            self.batch.request_full();
        }
    }

    fn layer(&mut self, target: EditTarget) -> Option<&mut LineCollection> {
        self.map.layer_mut(target)
    }

    fn cancel_gesture(&mut self) {
        let rolled_back = match core::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning => false,
            Gesture::Drawing { layer, .. } | Gesture::Erasing { layer } => {
                self.map.target_mut(layer).rollback()
            }
            Gesture::MovingToken { .. } => self.map.tokens.rollback(),
            Gesture::Resizing { .. } => self.map.background_images.rollback(),
            Gesture::Measuring { mut drag } => {
                drag.end();
                self.clear_ruler();
                false
            }
        };
        if rolled_back {
            log::debug!("gesture interrupted; rolled back");
            self.release_unused_images();
            self.batch.request_full();
        }
    }

    fn on_down(&mut self, point: Point) {
        let world = self.to_world(point);
        let params = self.hit_params();
        let config = &self.ctx.config;
        let (color, stroke) = (config.line_color(), config.line_stroke());
        match self.mode.clone() {
            InteractionMode::Pan => self.gesture = Gesture::Panning,
            InteractionMode::Draw(tool) => {
                let target = self.map.active();
                let Some(layer) = self.layer(target) else {
                    return;
                };
                layer.checkpoint();
                let shape = match tool {
                    DrawTool::Freehand => layer.create_freehand_line(world, color, stroke),
                    DrawTool::Straight => layer.create_straight_line(world, color, stroke),
                    DrawTool::Circle => layer.create_circle(world, color, stroke),
                    DrawTool::Rectangle => layer.create_rectangle(world, color, stroke),
                };
                self.gesture = Gesture::Drawing {
                    layer: target,
                    shape,
                };
            }
            InteractionMode::Erase => {
                let target = self.map.active();
                let Some(layer) = self.layer(target) else {
                    return;
                };
                layer.checkpoint();
                self.gesture = Gesture::Erasing { layer: target };
                self.erase_at(target, world, &params);
            }
            InteractionMode::Token => {
                let grid_pt = self.map.grid.world_to_grid(world);
                let hit = self
                    .map
                    .grid
                    .is_configured()
                    .then(|| self.map.tokens.find_at(grid_pt))
                    .flatten();
                for changed in self.map.tokens.select_only(hit) {
                    self.request_token(changed);
                }
                if let Some((token, from)) =
                    hit.and_then(|id| self.map.tokens.get(id).map(|t| (id, t.location())))
                {
                    self.map.tokens.checkpoint();
                    self.gesture = Gesture::MovingToken {
                        token,
                        from,
                        drag: DragState::started_at(point),
                    };
                }
            }
            InteractionMode::ResizeImage => {
                let radius = self
                    .map
                    .transformer
                    .screen_to_world_distance(self.ctx.config.handle_radius_px());
                if let Some((index, corner)) = self.map.background_images.find_corner(world, radius)
                {
                    self.map.background_images.checkpoint();
                    self.gesture = Gesture::Resizing { index, corner };
                }
            }
            InteractionMode::Measure => {
                self.clear_ruler();
                self.ruler = Some(Measurement {
                    start: world,
                    end: world,
                });
                self.gesture = Gesture::Measuring {
                    drag: DragState::started_at(point),
                };
            }
            InteractionMode::Text { .. } | InteractionMode::Info { .. } => {}
        }
    }

    fn erase_at(&mut self, target: EditTarget, world: Point, params: &HitParams) {
        let radius = self
            .map
            .transformer
            .screen_to_world_distance(self.ctx.config.eraser_radius_px());
        let dirty = self
            .layer(target)
            .and_then(|layer| layer.erase(world, radius, params));
        if let Some(dirty) = dirty {
            self.request_world(dirty);
        }
    }

    fn on_move(&mut self, point: Point, delta: Vec2) {
        let world = self.to_world(point);
        let params = self.hit_params();
        match &mut self.gesture {
            Gesture::Idle => {
                if self.mode == InteractionMode::Pan {
                    self.pan(delta);
                }
            }
            Gesture::Panning => self.pan(delta),
            Gesture::Drawing { layer, shape } => {
                let (target, shape) = (*layer, *shape);
                let dirty = self
                    .layer(target)
                    .and_then(|layer| layer.add_point(shape, world, &params));
                if let Some(dirty) = dirty {
                    self.request_world(dirty);
                }
            }
            Gesture::Erasing { layer } => {
                let target = *layer;
                self.erase_at(target, world, &params);
            }
            Gesture::MovingToken { token, from, drag } => {
                drag.update(point);
                let (id, from) = (*token, *from);
                let Some(offset) = drag.total_offset(point) else {
                    return;
                };
                let cell_px = self.map.grid.cell_size() * self.map.transformer.scale();
                if cell_px <= 0.0 {
                    return;
                }
                self.request_token(id);
                if let Some(token) = self.map.tokens.get_mut(id) {
                    token.set_location(from + offset / cell_px);
                }
                self.request_token(id);
            }
            Gesture::Resizing { index, corner } => {
                let (index, corner) = (*index, *corner);
                let Some(old) = self.map.background_images.get(index).map(|image| image.rect)
                else {
                    return;
                };
                self.map
                    .background_images
                    .set_rect(index, corner.drag(old, world));
                self.request_world(old.union(corner.drag(old, world).abs()));
            }
            Gesture::Measuring { drag } => {
                drag.update(point);
                let end = drag.last_pos().map(|p| self.map.transformer.screen_to_world(p));
                self.request_ruler();
                if let (Some(ruler), Some(end)) = (&mut self.ruler, end) {
                    ruler.end = end;
                }
                self.request_ruler();
            }
        }
    }

    fn on_up(&mut self) {
        match core::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning => {}
            Gesture::Drawing { layer, shape } => {
                let tolerance = self.ctx.config.optimize_tolerance();
                let params = self.hit_params();
                let Some(collection) = self.layer(layer) else {
                    return;
                };
                let extent = collection
                    .get(shape)
                    .map(|s| s.extent(params.world_units_per_pixel));
                collection.optimize_with_tolerance(tolerance);
                let dropped = collection.remove_invalid();
                let committed = collection.commit();
                log::debug!("stroke finished on {layer:?}: committed {committed}, dropped {dropped}");
                if let Some(extent) = extent {
                    self.request_world(extent);
                }
            }
            Gesture::Erasing { layer } => {
                let tolerance = self.ctx.config.optimize_tolerance();
                if let Some(collection) = self.layer(layer) {
                    collection.optimize_with_tolerance(tolerance);
                    let committed = collection.commit();
                    log::debug!("erase finished on {layer:?}: committed {committed}");
                }
            }
            Gesture::MovingToken { token, .. } => {
                self.request_token(token);
                let grid = self.map.grid;
                if grid.is_configured()
                    && let Some(moved) = self.map.tokens.get_mut(token)
                {
                    let world = grid.grid_to_world(moved.location());
                    let snapped = grid.nearest_snap_point(world, moved.size());
                    moved.set_location(grid.world_to_grid(snapped));
                }
                self.request_token(token);
                self.map.tokens.commit();
            }
            Gesture::Resizing { index, .. } => {
                let degenerate = self
                    .map
                    .background_images
                    .get(index)
                    .is_none_or(|image| image.is_degenerate());
                if degenerate {
                    log::debug!("image resize left a degenerate rectangle; rolled back");
                    self.map.background_images.rollback();
                    self.batch.request_full();
                } else {
                    self.map.background_images.commit();
                }
            }
            Gesture::Measuring { drag } => {
                if let Some(start) = drag.start_pos()
                    && let Some(ruler) = &self.ruler
                {
                    log::debug!(
                        "measured {:.2} world units from {start:?}",
                        ruler.length()
                    );
                }
            }
        }
    }

    fn on_long_press(&mut self, point: Point) {
        if self.mode != InteractionMode::Token || !self.map.grid.is_configured() {
            return;
        }
        let grid_pt = self.map.grid.world_to_grid(self.to_world(point));
        let Some(id) = self.map.tokens.find_at(grid_pt) else {
            return;
        };
        // Inside a drag the toggle joins that gesture's undo step.
        let standalone = !matches!(self.gesture, Gesture::MovingToken { .. });
        if standalone {
            self.map.tokens.checkpoint();
        }
        if let Some(token) = self.map.tokens.get_mut(id) {
            token.set_bloodied(!token.is_bloodied());
        }
        if standalone {
            self.map.tokens.commit();
        }
        self.request_token(id);
    }

    fn on_tap(&mut self, point: Point) {
        let world = self.to_world(point);
        let params = self.hit_params();
        let config = &self.ctx.config;
        let (color, size_px) = (config.line_color(), config.text_size_px());
        let target = self.map.active();
        let mode = self.mode.clone();
        let Some(layer) = self.layer(target) else {
            return;
        };
        let shape = match mode {
            InteractionMode::Text { text } if !text.is_empty() => {
                layer.checkpoint();
                layer.create_text(world, text, size_px, color)
            }
            InteractionMode::Info { text } => {
                layer.checkpoint();
                layer.create_information(world, text, color)
            }
            _ => return,
        };
        layer.commit();
        let extent = layer
            .get(shape)
            .map(|s| s.extent(params.world_units_per_pixel));
        if let Some(extent) = extent {
            self.request_world(extent);
        }
    }
}
