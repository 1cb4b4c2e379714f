// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer tracking for single-finger gestures.

use kurbo::{Point, Vec2};

/// Where a gesture started and where the pointer was last seen, in screen
/// space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct DragState {
    start: Option<Point>,
    last: Option<Point>,
}

impl DragState {
    /// A drag already started at `pos`.
    pub(crate) fn started_at(pos: Point) -> Self {
        let mut drag = Self::default();
        drag.start(pos);
        drag
    }

    pub(crate) fn start(&mut self, pos: Point) {
        self.start = Some(pos);
        self.last = Some(pos);
    }

    /// Records a new position; returns the movement since the last one.
    pub(crate) fn update(&mut self, pos: Point) -> Option<Vec2> {
        self.start?;
        let last = self.last.replace(pos)?;
        Some(pos - last)
    }

    /// Offset of `current` from the start of the drag.
    pub(crate) fn total_offset(&self, current: Point) -> Option<Vec2> {
        self.start.map(|start| current - start)
    }

    pub(crate) fn start_pos(&self) -> Option<Point> {
        self.start
    }

    pub(crate) fn last_pos(&self) -> Option<Point> {
        self.last
    }

    pub(crate) fn end(&mut self) {
        *self = Self::default();
    }
}
