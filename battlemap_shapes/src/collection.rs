// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::Color;

use battlemap_canvas::Canvas;
use battlemap_history::{History, UndoOutcome, UndoRedoTarget};
use battlemap_view::CoordinateTransformer;

use crate::{
    BoundingRectangle, DEFAULT_OPTIMIZE_TOLERANCE, Erased, Geometry, HitParams, Shape, ShapeId,
    ShapeKind, StrokeWidth,
};

fn union(acc: Option<Rect>, rect: Rect) -> Option<Rect> {
    Some(acc.map_or(rect, |acc| acc.union(rect)))
}

/// An ordered layer of shapes with its own undo history.
///
/// Insertion order is z-order: later shapes draw on top and win hit tests.
/// Ids come from a counter that never goes backwards, so an id is never
/// reused even after undo.
///
/// Mutating methods do not record history on their own. A gesture is made
/// undoable by bracketing it with [`UndoRedoTarget::checkpoint`] and
/// [`UndoRedoTarget::commit`].
#[derive(Debug)]
pub struct LineCollection {
    shapes: Vec<Shape>,
    next_id: u64,
    history: History<Vec<Shape>>,
}

impl Default for LineCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCollection {
    /// Creates an empty layer with the default history limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            next_id: 1,
            history: History::new(),
        }
    }

    /// Creates an empty layer keeping at most `limit` undo steps.
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: History::with_limit(limit),
            ..Self::new()
        }
    }

    /// The undo history.
    #[must_use]
    pub fn history(&self) -> &History<Vec<Shape>> {
        &self.history
    }

    /// Changes how many undo steps are kept.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
    }

    fn allocate_id(&mut self) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Adds `shape` on top of the layer under a fresh id.
    pub fn insert(&mut self, mut shape: Shape) -> ShapeId {
        let id = self.allocate_id();
        shape.set_id(id);
        self.shapes.push(shape);
        id
    }

    /// Replaces the whole content, keeping stored ids where they are unique.
    ///
    /// Used by loading. Duplicate or zero ids are reassigned. History is
    /// cleared.
    pub(crate) fn restore(&mut self, next_id: u64, shapes: Vec<Shape>) {
        self.next_id = shapes
            .iter()
            .map(|s| s.id().0.saturating_add(1))
            .fold(next_id.max(1), u64::max);
        self.shapes.clear();
        self.history.clear();
        let mut seen = BTreeSet::new();
        for mut shape in shapes {
            if shape.id().0 == 0 || !seen.insert(shape.id()) {
                let id = self.allocate_id();
                log::warn!("reassigned duplicate shape id {:?} to {id:?}", shape.id());
                shape.set_id(id);
                seen.insert(id);
            }
            self.shapes.push(shape);
        }
    }

    fn create(&mut self, color: Color, stroke: StrokeWidth, geometry: Geometry) -> ShapeId {
        self.insert(Shape::new(ShapeId(0), color, stroke, geometry))
    }

    /// Starts a freehand line at `start`. It stays invalid until a second,
    /// distinct point is added.
    pub fn create_freehand_line(
        &mut self,
        start: Point,
        color: Color,
        stroke: StrokeWidth,
    ) -> ShapeId {
        self.create(color, stroke, Geometry::Freehand { points: vec![start] })
    }

    /// Starts a straight line with both endpoints at `start`.
    pub fn create_straight_line(
        &mut self,
        start: Point,
        color: Color,
        stroke: StrokeWidth,
    ) -> ShapeId {
        self.create(color, stroke, Geometry::Straight { start, end: start })
    }

    /// Starts a circle centred on `center` with zero radius.
    pub fn create_circle(&mut self, center: Point, color: Color, stroke: StrokeWidth) -> ShapeId {
        self.create(
            color,
            stroke,
            Geometry::Circle {
                center,
                edge: center,
            },
        )
    }

    /// Starts a rectangle with both corners at `corner`.
    pub fn create_rectangle(
        &mut self,
        corner: Point,
        color: Color,
        stroke: StrokeWidth,
    ) -> ShapeId {
        self.create(
            color,
            stroke,
            Geometry::Rectangle {
                corner,
                opposite: corner,
            },
        )
    }

    /// Places text with its top-left corner at `anchor`.
    pub fn create_text(
        &mut self,
        anchor: Point,
        text: impl Into<String>,
        size_px: f64,
        color: Color,
    ) -> ShapeId {
        self.create(
            color,
            StrokeWidth::Filled,
            Geometry::Text {
                anchor,
                text: text.into(),
                size_px,
            },
        )
    }

    /// Places an information marker centred on `anchor`.
    pub fn create_information(
        &mut self,
        anchor: Point,
        text: impl Into<String>,
        color: Color,
    ) -> ShapeId {
        self.create(
            color,
            StrokeWidth::Filled,
            Geometry::Information {
                anchor,
                text: text.into(),
            },
        )
    }

    fn position(&self, id: ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    /// Looks a shape up by id.
    #[must_use]
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Shapes in z-order, bottom first.
    pub fn iter(&self) -> core::slice::Iter<'_, Shape> {
        self.shapes.iter()
    }

    /// Number of shapes, valid or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if the layer holds no shapes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Union of the bounds of every valid shape.
    #[must_use]
    pub fn bounds(&self) -> BoundingRectangle {
        let mut bounds = BoundingRectangle::EMPTY;
        for shape in self.shapes.iter().filter(|s| s.is_valid()) {
            bounds.update_bounds_rect(shape.bounds());
        }
        bounds
    }

    /// Removes every shape. Ids keep counting up.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Applies `edit` to shape `id` and returns the world area to redraw.
    fn edit_shape(
        &mut self,
        id: ShapeId,
        params: &HitParams,
        edit: impl FnOnce(&mut Shape),
    ) -> Option<Rect> {
        let wpp = params.world_units_per_pixel;
        let shape = self.shapes.iter_mut().find(|s| s.id() == id)?;
        let before = shape.extent(wpp);
        edit(shape);
        Some(before.union(shape.extent(wpp)))
    }

    /// Extends shape `id` with a world point; see [`Shape::add_point`].
    ///
    /// Returns the world rectangle that needs redrawing, or `None` if there
    /// is no such shape.
    pub fn add_point(&mut self, id: ShapeId, pt: Point, params: &HitParams) -> Option<Rect> {
        self.edit_shape(id, params, |shape| shape.add_point(pt))
    }

    /// Moves shape `id` by `delta`; returns the world rectangle to redraw.
    pub fn translate_shape(
        &mut self,
        id: ShapeId,
        delta: Vec2,
        params: &HitParams,
    ) -> Option<Rect> {
        self.edit_shape(id, params, |shape| shape.translate(delta))
    }

    /// Removes shape `id` and returns it.
    pub fn delete(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.position(id)?;
        Some(self.shapes.remove(index))
    }

    /// Drops every shape that cannot be drawn; returns how many went.
    pub fn remove_invalid(&mut self) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(Shape::is_valid);
        before - self.shapes.len()
    }

    /// Applies a circular eraser to every shape, bottom to top.
    ///
    /// Split pieces replace the original at its z position. The first piece
    /// keeps the original id; the others get fresh ones. Returns the world
    /// rectangle covering everything that changed, or `None` if nothing did.
    pub fn erase(&mut self, center: Point, radius: f64, params: &HitParams) -> Option<Rect> {
        let wpp = params.world_units_per_pixel;
        let mut dirty = None;
        let old = core::mem::take(&mut self.shapes);
        let mut kept = Vec::with_capacity(old.len());
        for shape in old {
            match shape.erase(center, radius) {
                Erased::Untouched => kept.push(shape),
                Erased::Removed => dirty = union(dirty, shape.extent(wpp)),
                Erased::Split(pieces) => {
                    dirty = union(dirty, shape.extent(wpp));
                    for (i, mut piece) in pieces.into_iter().enumerate() {
                        if i > 0 {
                            piece.set_id(self.allocate_id());
                        }
                        kept.push(piece);
                    }
                }
            }
        }
        self.shapes = kept;
        dirty
    }

    /// The topmost shape hit at `pt`, optionally restricted to one kind.
    #[must_use]
    pub fn find_shape(
        &self,
        pt: Point,
        params: &HitParams,
        kind: Option<ShapeKind>,
    ) -> Option<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .filter(|s| kind.is_none_or(|k| s.kind() == k))
            .find(|s| s.hit_test(pt, params).is_some())
            .map(Shape::id)
    }

    /// Simplifies every freehand line with [`DEFAULT_OPTIMIZE_TOLERANCE`].
    pub fn optimize(&mut self) -> bool {
        self.optimize_with_tolerance(DEFAULT_OPTIMIZE_TOLERANCE)
    }

    /// Simplifies every freehand line; returns `true` if any point went.
    ///
    /// Running it twice with the same tolerance changes nothing the second
    /// time.
    pub fn optimize_with_tolerance(&mut self, tolerance: f64) -> bool {
        let mut changed = false;
        for shape in &mut self.shapes {
            changed |= shape.simplify(tolerance);
        }
        changed
    }

    /// Draws every valid shape in z-order.
    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, transformer: &CoordinateTransformer) {
        for shape in &self.shapes {
            shape.draw(canvas, transformer);
        }
    }

    /// Union of the screen-space regions of every shape; see
    /// [`Shape::region_path`]. Empty when no shape has an area.
    #[must_use]
    pub fn region_path(&self, transformer: &CoordinateTransformer) -> BezPath {
        let mut path = BezPath::new();
        for region in self.shapes.iter().filter_map(|s| s.region_path(transformer)) {
            path.extend(region);
        }
        path
    }

    fn restore_snapshot(&mut self, snapshot: &[Shape]) {
        self.shapes = snapshot.to_vec();
    }
}

impl<'a> IntoIterator for &'a LineCollection {
    type Item = &'a Shape;
    type IntoIter = core::slice::Iter<'a, Shape>;

    fn into_iter(self) -> Self::IntoIter {
        self.shapes.iter()
    }
}

impl UndoRedoTarget for LineCollection {
    fn checkpoint(&mut self) {
        self.history.checkpoint(&self.shapes);
    }

    fn commit(&mut self) -> bool {
        self.history.commit(&self.shapes)
    }

    fn rollback(&mut self) -> bool {
        match self.history.rollback() {
            Some(snapshot) => {
                self.restore_snapshot(&snapshot);
                true
            }
            None => false,
        }
    }

    fn undo(&mut self) -> UndoOutcome {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore_snapshot(&snapshot);
                UndoOutcome::Applied
            }
            None => UndoOutcome::Nothing,
        }
    }

    fn redo(&mut self) -> UndoOutcome {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore_snapshot(&snapshot);
                UndoOutcome::Applied
            }
            None => UndoOutcome::Nothing,
        }
    }

    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::{Point, Vec2};
    use peniko::Color;

    use battlemap_canvas::RecordingCanvas;
    use battlemap_history::UndoRedoTarget;
    use battlemap_view::CoordinateTransformer;

    use super::LineCollection;
    use crate::{HitParams, ShapeId, ShapeKind, StrokeWidth};

    const STROKE: StrokeWidth = StrokeWidth::Stroked(2.0);

    fn horizontal_line(layer: &mut LineCollection, y: f64) -> ShapeId {
        let id = layer.create_freehand_line(Point::new(0.0, y), Color::BLACK, STROKE);
        let params = HitParams::default();
        for x in 1..=10 {
            layer.add_point(id, Point::new(f64::from(x) * 10.0, y), &params);
        }
        id
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut layer = LineCollection::new();
        let a = layer.create_circle(Point::ZERO, Color::BLACK, STROKE);
        let b = layer.create_rectangle(Point::ZERO, Color::BLACK, STROKE);
        assert!(b > a);
        layer.delete(b);
        let c = layer.create_text(Point::ZERO, "x", 12.0, Color::BLACK);
        assert!(c > b, "deleted ids are not reused");
    }

    #[test]
    fn add_point_reports_old_and_new_extent() {
        let mut layer = LineCollection::new();
        let id = layer.create_straight_line(Point::ZERO, Color::BLACK, STROKE);
        let params = HitParams::default();
        layer.add_point(id, Point::new(10.0, 0.0), &params);
        let dirty = layer
            .add_point(id, Point::new(0.0, 20.0), &params)
            .unwrap();
        assert!(dirty.contains(Point::new(10.0, 0.0)));
        assert!(dirty.contains(Point::new(0.0, 20.0)));
        assert_eq!(layer.add_point(ShapeId(99), Point::ZERO, &params), None);
    }

    #[test]
    fn erase_split_keeps_first_id_and_z_position() {
        let mut layer = LineCollection::new();
        let below = horizontal_line(&mut layer, 0.0);
        let middle = horizontal_line(&mut layer, 50.0);
        let above = horizontal_line(&mut layer, 100.0);

        let dirty = layer.erase(Point::new(50.0, 50.0), 5.0, &HitParams::default());
        assert!(dirty.is_some());
        let ids: Vec<ShapeId> = layer.iter().map(|s| s.id()).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], below);
        assert_eq!(ids[1], middle);
        assert!(ids[2] > above, "second piece gets a fresh id");
        assert_eq!(ids[3], above);

        assert_eq!(layer.erase(Point::new(500.0, 500.0), 5.0, &HitParams::default()), None);
    }

    #[test]
    fn covering_erase_removes_the_shape() {
        let mut layer = LineCollection::new();
        horizontal_line(&mut layer, 0.0);
        layer.erase(Point::new(50.0, 0.0), 100.0, &HitParams::default());
        assert!(layer.is_empty());
    }

    #[test]
    fn covering_erase_removes_lines_still_at_their_first_point() {
        let mut layer = LineCollection::new();
        layer.create_freehand_line(Point::new(4.0, 4.0), Color::BLACK, StrokeWidth::Stroked(2.0));
        horizontal_line(&mut layer, 0.0);
        let dirty = layer.erase(Point::ZERO, 1000.0, &HitParams::default());
        assert!(layer.is_empty());
        assert!(dirty.is_some());
    }

    #[test]
    fn find_shape_prefers_the_top_and_filters_by_kind() {
        let mut layer = LineCollection::new();
        let params = HitParams::default();
        let rect = layer.create_rectangle(Point::ZERO, Color::BLACK, StrokeWidth::Filled);
        layer.add_point(rect, Point::new(100.0, 100.0), &params);
        let circle = layer.create_circle(Point::new(50.0, 50.0), Color::BLACK, StrokeWidth::Filled);
        layer.add_point(circle, Point::new(60.0, 50.0), &params);

        let pt = Point::new(50.0, 50.0);
        assert_eq!(layer.find_shape(pt, &params, None), Some(circle));
        assert_eq!(layer.find_shape(pt, &params, Some(ShapeKind::Rectangle)), Some(rect));
        assert_eq!(layer.find_shape(pt, &params, Some(ShapeKind::Text)), None);
        assert_eq!(layer.find_shape(Point::new(500.0, 0.0), &params, None), None);
    }

    #[test]
    fn undo_restores_exact_state() {
        let mut layer = LineCollection::new();
        layer.checkpoint();
        let id = horizontal_line(&mut layer, 0.0);
        assert!(layer.commit());
        let drawn: Vec<_> = layer.iter().cloned().collect();

        layer.checkpoint();
        layer.translate_shape(id, Vec2::new(5.0, 5.0), &HitParams::default());
        assert!(layer.commit());

        assert!(layer.undo().is_applied());
        assert!(layer.iter().eq(drawn.iter()));
        assert!(layer.undo().is_applied());
        assert!(layer.is_empty());
        assert!(!layer.undo().is_applied());
        assert!(layer.redo().is_applied());
        assert!(layer.iter().eq(drawn.iter()));
    }

    #[test]
    fn rollback_abandons_a_torn_gesture() {
        let mut layer = LineCollection::new();
        layer.checkpoint();
        horizontal_line(&mut layer, 0.0);
        assert!(layer.rollback());
        assert!(layer.is_empty());
        assert!(!layer.can_undo());
    }

    #[test]
    fn invalid_shapes_are_not_drawn_and_can_be_pruned() {
        let mut layer = LineCollection::new();
        layer.create_freehand_line(Point::ZERO, Color::BLACK, STROKE);
        horizontal_line(&mut layer, 10.0);
        let mut canvas = RecordingCanvas::new();
        layer.draw(&mut canvas, &CoordinateTransformer::IDENTITY);
        assert_eq!(canvas.draws().count(), 1);
        assert_eq!(layer.remove_invalid(), 1);
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn optimize_is_idempotent() {
        let mut layer = LineCollection::new();
        horizontal_line(&mut layer, 0.0);
        assert!(layer.optimize());
        assert!(!layer.optimize());
        assert_eq!(layer.iter().next().unwrap().geometry().defining_points().len(), 2);
    }

    #[test]
    fn region_path_unions_areas_only() {
        let mut layer = LineCollection::new();
        let params = HitParams::default();
        let line = layer.create_straight_line(Point::ZERO, Color::BLACK, STROKE);
        layer.add_point(line, Point::new(100.0, 0.0), &params);
        assert!(layer.region_path(&CoordinateTransformer::IDENTITY).elements().is_empty());
        let rect = layer.create_rectangle(Point::ZERO, Color::BLACK, StrokeWidth::Filled);
        layer.add_point(rect, Point::new(10.0, 10.0), &params);
        let circle = layer.create_circle(Point::new(50.0, 50.0), Color::BLACK, STROKE);
        layer.add_point(circle, Point::new(60.0, 50.0), &params);
        let path = layer.region_path(&CoordinateTransformer::IDENTITY);
        assert_eq!(path.segments().count(), 4 + crate::CIRCLE_SEGMENTS);
    }
}
