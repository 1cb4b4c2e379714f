// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer input and the editing modes that interpret it.
//!
//! Events arrive already recognized as gestures, in screen pixels, tagged
//! with the number of fingers down. A [`Session`] routes them: two-finger
//! scrolls pan the view and scale gestures zoom it whatever the mode, and
//! everything else goes to the current [`InteractionMode`].

mod drag;
mod session;

use battlemap_view::Grid;
use kurbo::{Point, Vec2};

pub(crate) use drag::DragState;
pub use session::Session;

/// What kind of pointer gesture an [`InputEvent`] reports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputKind {
    /// A finger touched down.
    Down,
    /// The fingers moved by `delta` pixels since the previous event.
    Scroll {
        /// Movement in screen pixels.
        delta: Vec2,
    },
    /// A pinch changed the zoom by `factor` around the event point.
    Scale {
        /// Relative scale change.
        factor: f64,
    },
    /// The last finger lifted.
    Up,
    /// A finger stayed down without moving.
    LongPress,
    /// A tap that is definitely not the start of a double tap.
    SingleTapConfirmed,
}

/// One pointer event in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    /// The gesture.
    pub kind: InputKind,
    /// Current pointer position, or the focus of a pinch.
    pub point: Point,
    /// Number of fingers down.
    pub fingers: u8,
}

impl InputEvent {
    /// A single-finger event.
    #[must_use]
    pub fn new(kind: InputKind, point: Point) -> Self {
        Self {
            kind,
            point,
            fingers: 1,
        }
    }

    /// The same event with a different finger count.
    #[must_use]
    pub fn with_fingers(mut self, fingers: u8) -> Self {
        self.fingers = fingers;
        self
    }
}

/// Shapes the draw mode creates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DrawTool {
    /// Follows the finger.
    #[default]
    Freehand,
    /// From the touch-down point to the finger.
    Straight,
    /// Centred on the touch-down point, through the finger.
    Circle,
    /// Spanned by the touch-down point and the finger.
    Rectangle,
}

/// How single-finger input is interpreted.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InteractionMode {
    /// Dragging pans the view.
    #[default]
    Pan,
    /// Dragging draws on the active layer.
    Draw(DrawTool),
    /// Dragging erases from the active layer.
    Erase,
    /// Tapping places text on the active layer.
    Text {
        /// What to write.
        text: String,
    },
    /// Tapping places an information marker on the active layer.
    Info {
        /// The marker's label.
        text: String,
    },
    /// Dragging moves tokens, snapping them on release; a long press marks
    /// a token as bloodied or healthy.
    Token,
    /// Dragging a corner of a background image resizes it.
    ResizeImage,
    /// Dragging measures a distance in grid cells.
    Measure,
}

impl InteractionMode {
    /// Returns `true` for modes that edit the active line layer.
    #[must_use]
    pub fn edits_lines(&self) -> bool {
        matches!(
            self,
            Self::Draw(_) | Self::Erase | Self::Text { .. } | Self::Info { .. }
        )
    }
}

/// A ruler laid out by [`InteractionMode::Measure`], in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// Where the finger went down.
    pub start: Point,
    /// Where the finger is, or where it lifted.
    pub end: Point,
}

impl Measurement {
    /// Length in world units.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Length in grid cells, or `None` while the grid is unconfigured.
    #[must_use]
    pub fn cells(&self, grid: &Grid) -> Option<f64> {
        grid.is_configured()
            .then(|| self.length() / grid.cell_size())
    }
}

#[cfg(test)]
mod tests {
    use battlemap_view::Grid;
    use kurbo::Point;

    use super::{InteractionMode, Measurement};

    #[test]
    fn measurements_count_cells() {
        let ruler = Measurement {
            start: Point::new(0.0, 0.0),
            end: Point::new(30.0, 40.0),
        };
        assert_eq!(ruler.length(), 50.0);
        assert_eq!(ruler.cells(&Grid::new(10.0)), Some(5.0));
        assert_eq!(ruler.cells(&Grid::default()), None);
    }

    #[test]
    fn line_modes() {
        assert!(InteractionMode::Erase.edits_lines());
        assert!(!InteractionMode::Token.edits_lines());
    }
}
