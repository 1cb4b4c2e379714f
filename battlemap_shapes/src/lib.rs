// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Battlemap Shapes: the drawable contents of a map layer.
//!
//! A [`Shape`] is one of a closed set of [`Geometry`] variants (freehand
//! line, straight line, circle, rectangle, text, information marker) plus a
//! colour and a [`StrokeWidth`]. Geometry lives in world space; screen sizes
//! only matter for text and markers, which keep a fixed on-screen size.
//!
//! Per shape:
//! - [`Shape::hit_test`] with [`HitParams`] carrying the tolerance and the
//!   current zoom.
//! - [`Shape::erase`] cuts stroked geometry with a circular eraser and
//!   reports the pieces that replace it as [`Erased`].
//! - [`Shape::simplify`] drops freehand points that do not change the line.
//! - [`Shape::draw`] and [`Shape::region_path`] render through a
//!   [`battlemap_canvas::Canvas`] or build fog-of-war masks.
//!
//! A [`LineCollection`] is an ordered layer of shapes with stable ids and
//! its own undo history (see [`battlemap_history::UndoRedoTarget`]).
//!
//! ## Example
//!
//! ```rust
//! use kurbo::Point;
//! use peniko::Color;
//! use battlemap_history::UndoRedoTarget;
//! use battlemap_shapes::{HitParams, LineCollection, StrokeWidth};
//!
//! let mut layer = LineCollection::new();
//! let params = HitParams::default();
//!
//! layer.checkpoint();
//! let wall = layer.create_freehand_line(Point::new(0.0, 0.0), Color::BLACK, StrokeWidth::Stroked(2.0));
//! for x in 1..=3 {
//!     layer.add_point(wall, Point::new(f64::from(x), 0.0), &params);
//! }
//! layer.optimize();
//! assert!(layer.commit());
//!
//! assert_eq!(layer.get(wall).unwrap().geometry().defining_points().len(), 2);
//! assert_eq!(layer.find_shape(Point::new(1.5, 0.5), &params, None), Some(wall));
//!
//! layer.undo();
//! assert!(layer.is_empty());
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod bounds;
mod collection;
mod erase;
mod hit;
mod persist;
mod shape;
mod simplify;

pub use bounds::BoundingRectangle;
pub use collection::LineCollection;
pub use erase::Erased;
pub use hit::{HitKind, HitParams, HitScore};
pub use shape::{
    CIRCLE_SEGMENTS, Geometry, INFO_ICON_PX, INFO_LABEL_PX, Shape, ShapeId, ShapeKind,
    StrokeWidth,
};
pub use simplify::DEFAULT_OPTIMIZE_TOLERANCE;
