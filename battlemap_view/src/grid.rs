// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Line, Point, Rect, Vec2};

use crate::transformer::CoordinateTransformer;

/// Upper bound on the number of grid lines produced per axis.
///
/// When zoomed far out the grid degenerates into noise; past this many lines
/// [`Grid::visible_lines`] returns nothing at all.
pub const MAX_LINES_PER_AXIS: usize = 2048;

/// What a snapped point lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SnapMode {
    /// Snap token centres so that the token's footprint lines up with the
    /// grid lines. A one-cell token lands on a cell centre, a two-cell token
    /// on an intersection.
    #[default]
    CellCenters,
    /// Snap to the nearest grid intersection, regardless of token size.
    Intersections,
}

/// Square map grid.
///
/// Grid space measures positions in cells: the point `(i, j)` in grid space
/// is the top-left corner of cell `(i, j)`. A grid maps to world space with
/// `cell_size` world units per cell and an `offset` (world position of the
/// grid origin).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    cell_size: f64,
    offset: Vec2,
    snap_mode: SnapMode,
}

impl Default for Grid {
    /// An unconfigured grid with zero cell size.
    fn default() -> Self {
        Self {
            cell_size: 0.0,
            offset: Vec2::ZERO,
            snap_mode: SnapMode::default(),
        }
    }
}

impl Grid {
    /// Creates a grid with the given cell size and zero offset.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            ..Self::default()
        }
    }

    /// Returns this grid with the given world-space offset.
    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Returns this grid with the given snap mode.
    #[must_use]
    pub fn with_snap_mode(mut self, mode: SnapMode) -> Self {
        self.snap_mode = mode;
        self
    }

    /// World units per cell.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Sets the number of world units per cell.
    pub fn set_cell_size(&mut self, cell_size: f64) {
        self.cell_size = cell_size;
    }

    /// World position of the grid origin.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Moves the grid origin.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Current snap mode.
    #[must_use]
    pub fn snap_mode(&self) -> SnapMode {
        self.snap_mode
    }

    /// Changes the snap mode.
    pub fn set_snap_mode(&mut self, mode: SnapMode) {
        self.snap_mode = mode;
    }

    /// Returns `true` once the grid has a usable, positive cell size.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.cell_size.is_finite() && self.cell_size > 0.0
    }

    /// Transformer from grid space into world space.
    #[must_use]
    pub fn grid_to_world_transformer(&self) -> CoordinateTransformer {
        CoordinateTransformer::new(self.cell_size, self.offset)
    }

    /// Transformer from grid space straight into screen space.
    #[must_use]
    pub fn grid_to_screen_transformer(
        &self,
        world_to_screen: &CoordinateTransformer,
    ) -> CoordinateTransformer {
        self.grid_to_world_transformer().compose(world_to_screen)
    }

    /// Maps a grid-space point into world space.
    #[must_use]
    pub fn grid_to_world(&self, pt: Point) -> Point {
        self.grid_to_world_transformer().world_to_screen(pt)
    }

    /// Maps a world-space point into grid space.
    ///
    /// An unconfigured grid returns the input unchanged.
    #[must_use]
    pub fn world_to_grid(&self, pt: Point) -> Point {
        if !self.is_configured() {
            return pt;
        }
        self.grid_to_world_transformer().screen_to_world(pt)
    }

    /// Index of the cell containing a world-space point.
    #[must_use]
    pub fn cell_at(&self, world: Point) -> Option<(i64, i64)> {
        if !self.is_configured() {
            return None;
        }
        let g = self.world_to_grid(world);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "cell indices of any realistic map fit in i64"
        )]
        let cell = (g.x.floor() as i64, g.y.floor() as i64);
        Some(cell)
    }

    /// Returns the snap target nearest to `world` for a token that is
    /// `token_size` cells wide.
    ///
    /// Distance is Euclidean; on an exact tie the lower-index cell wins. An
    /// unconfigured grid returns the input unchanged.
    #[must_use]
    pub fn nearest_snap_point(&self, world: Point, token_size: f64) -> Point {
        if !self.is_configured() {
            return world;
        }
        let phase = match self.snap_mode {
            SnapMode::Intersections => 0.0,
            SnapMode::CellCenters => {
                let size = if token_size.is_finite() && token_size > 0.0 {
                    token_size
                } else {
                    1.0
                };
                let half = size / 2.0;
                half - half.floor()
            }
        };
        let g = self.world_to_grid(world);
        // The lattice is axis aligned, so the Euclidean nearest lattice point
        // is the per-axis nearest one.
        let snapped = Point::new(snap_axis(g.x, phase), snap_axis(g.y, phase));
        self.grid_to_world(snapped)
    }

    /// Grid lines (in world space) crossing the given world-space rectangle.
    ///
    /// Returns no lines for an unconfigured grid or when more than
    /// [`MAX_LINES_PER_AXIS`] lines would be needed along either axis.
    #[must_use]
    pub fn visible_lines(&self, visible_world: Rect) -> Vec<Line> {
        let mut lines = Vec::new();
        if !self.is_configured() {
            return lines;
        }
        let g0 = self.world_to_grid(Point::new(visible_world.x0, visible_world.y0));
        let g1 = self.world_to_grid(Point::new(visible_world.x1, visible_world.y1));
        let (i0, i1) = (g0.x.min(g1.x).floor(), g0.x.max(g1.x).ceil());
        let (j0, j1) = (g0.y.min(g1.y).floor(), g0.y.max(g1.y).ceil());
        let limit = MAX_LINES_PER_AXIS as f64;
        if i1 - i0 > limit || j1 - j0 > limit {
            return lines;
        }
        let mut i = i0;
        while i <= i1 {
            let x = i * self.cell_size + self.offset.x;
            lines.push(Line::new((x, visible_world.y0), (x, visible_world.y1)));
            i += 1.0;
        }
        let mut j = j0;
        while j <= j1 {
            let y = j * self.cell_size + self.offset.y;
            lines.push(Line::new((visible_world.x0, y), (visible_world.x1, y)));
            j += 1.0;
        }
        lines
    }
}

/// Nearest value of the form `k + phase`; exact halves round down.
fn snap_axis(g: f64, phase: f64) -> f64 {
    (g - phase - 0.5).ceil() + phase
}
