// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Battlemap View: coordinate spaces for battle maps.
//!
//! A battle map has three coordinate spaces:
//! - **Grid space**, measured in map cells.
//! - **World space**, the map's intrinsic coordinates, independent of zoom
//!   and pan.
//! - **Screen space**, device pixels of the current viewport.
//!
//! [`CoordinateTransformer`] is the uniform scale + translate mapping used for
//! each hop, and it composes: grid → world followed by world → screen is
//! grid → screen. [`Grid`] owns the grid → world hop and the snapping rules
//! used when placing tokens.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::Point;
//! use battlemap_view::{CoordinateTransformer, Grid, SnapMode};
//!
//! let mut world_to_screen = CoordinateTransformer::IDENTITY;
//! world_to_screen.zoom(2.0, Point::new(100.0, 100.0));
//! assert_eq!(world_to_screen.world_to_screen(Point::new(100.0, 100.0)), Point::new(100.0, 100.0));
//!
//! let grid = Grid::new(50.0).with_snap_mode(SnapMode::Intersections);
//! assert_eq!(grid.nearest_snap_point(Point::new(23.0, 61.0), 1.0), Point::new(0.0, 50.0));
//!
//! let grid_to_screen = grid.grid_to_screen_transformer(&world_to_screen);
//! let corner = grid_to_screen.world_to_screen(Point::new(1.0, 1.0));
//! assert_eq!(corner, world_to_screen.world_to_screen(Point::new(50.0, 50.0)));
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod grid;
mod transformer;

pub use grid::{Grid, MAX_LINES_PER_AXIS, SnapMode};
pub use transformer::{CoordinateTransformer, MAX_SCALE, MIN_SCALE};
