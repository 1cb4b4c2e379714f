// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Battlemap Map: whole maps, their compositing and their editing.
//!
//! - [`MapData`] gathers a map's grid, view transform, line layers, fog of
//!   war masks, [`TokenCollection`] and [`BackgroundImages`]. Each part keeps
//!   its own undo history; [`EditTarget`] picks the one undo applies to.
//! - [`MapDrawer`] composites a map onto any [`battlemap_canvas::Canvas`]
//!   in a fixed layer order, with a [`FogOfWarMode`] for the background and
//!   for the GM notes.
//! - [`RedrawBatch`] coalesces the redraw requests made while one input
//!   event is handled into a single [`Redraw`], and [`MapView`] applies it to
//!   a scrolling double buffer.
//! - [`ImageCache`] loads token and background bitmaps through an
//!   [`ImageLoader`], delivering results over a channel.
//! - [`Session`] ties it together and turns [`InputEvent`]s into edits
//!   according to the current [`InteractionMode`].
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Point, Vec2};
//! use battlemap_map::{
//!     DrawTool, InputEvent, InputKind, InteractionMode, MapData, Session, SessionContext,
//! };
//!
//! let mut session = Session::new(MapData::default(), SessionContext::default(), 64, 64);
//! let first = session.invalidate().unwrap();
//! session.render(&first);
//!
//! session.set_mode(InteractionMode::Draw(DrawTool::Straight));
//! session.handle(InputEvent::new(InputKind::Down, Point::new(8.0, 8.0)));
//! let moved = InputKind::Scroll { delta: Vec2::new(40.0, 0.0) };
//! if let Some(redraw) = session.handle(InputEvent::new(moved, Point::new(48.0, 8.0))) {
//!     session.render(&redraw);
//! }
//! session.handle(InputEvent::new(InputKind::Up, Point::new(48.0, 8.0)));
//! assert_eq!(session.map().background.len(), 1);
//!
//! let undone = session.undo().unwrap();
//! session.render(&undone);
//! assert!(session.map().background.is_empty());
//! ```

mod background;
mod config;
mod drawer;
mod images;
mod interaction;
mod map_data;
mod persist;
mod redraw;
mod token;
mod view;

pub use background::{BackgroundImage, BackgroundImages, Corner, MIN_IMAGE_SIDE};
pub use config::{SessionConfig, SessionContext};
pub use drawer::{DrawFlags, FogOfWarMode, MapDrawer, TOKEN_MARGIN_PX, token_extent};
pub use images::{
    ImageCache, ImageError, ImageKey, ImageLoaded, ImageLoader, ImageSource,
    ImmediateImageLoader, ThreadImageLoader,
};
pub use interaction::{DrawTool, InputEvent, InputKind, InteractionMode, Measurement, Session};
pub use map_data::{EditTarget, MapData};
pub use redraw::{DirtyRects, Redraw, RedrawBatch};
pub use token::{BuiltInShape, Token, TokenArt, TokenCollection, TokenId};
pub use view::MapView;
