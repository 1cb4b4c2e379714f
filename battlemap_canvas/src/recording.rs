// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{BezPath, Circle, Line, Point, Rect};
use peniko::Color;

use crate::{Canvas, ClipShape, DrawOp, Pen};

/// Owned copy of a [`DrawOp`].
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedOp {
    /// See [`DrawOp::FillRect`].
    FillRect {
        /// Rectangle filled.
        rect: Rect,
        /// Fill colour.
        color: Color,
    },
    /// See [`DrawOp::StrokeRect`].
    StrokeRect {
        /// Rectangle outlined.
        rect: Rect,
        /// Stroke parameters.
        pen: Pen,
    },
    /// See [`DrawOp::Line`].
    Line {
        /// Segment stroked.
        line: Line,
        /// Stroke parameters.
        pen: Pen,
    },
    /// See [`DrawOp::Polyline`].
    Polyline {
        /// Vertices in order.
        points: Vec<Point>,
        /// Stroke parameters.
        pen: Pen,
    },
    /// See [`DrawOp::FillCircle`].
    FillCircle {
        /// Disc filled.
        circle: Circle,
        /// Fill colour.
        color: Color,
    },
    /// See [`DrawOp::StrokeCircle`].
    StrokeCircle {
        /// Circle outlined.
        circle: Circle,
        /// Stroke parameters.
        pen: Pen,
    },
    /// See [`DrawOp::FillPath`].
    FillPath {
        /// Path filled.
        path: BezPath,
        /// Fill colour.
        color: Color,
    },
    /// See [`DrawOp::Text`].
    Text {
        /// Top-left corner of the text box.
        origin: Point,
        /// Text drawn.
        text: String,
        /// Font size in pixels.
        size: f64,
        /// Text colour.
        color: Color,
    },
    /// See [`DrawOp::Bitmap`]. Only the source dimensions are kept.
    Bitmap {
        /// Source width in pixels.
        width: u32,
        /// Source height in pixels.
        height: u32,
        /// Destination rectangle.
        dest: Rect,
    },
}

impl From<DrawOp<'_>> for RecordedOp {
    fn from(op: DrawOp<'_>) -> Self {
        match op {
            DrawOp::FillRect { rect, color } => Self::FillRect { rect, color },
            DrawOp::StrokeRect { rect, pen } => Self::StrokeRect { rect, pen },
            DrawOp::Line { line, pen } => Self::Line { line, pen },
            DrawOp::Polyline { points, pen } => Self::Polyline {
                points: points.to_vec(),
                pen,
            },
            DrawOp::FillCircle { circle, color } => Self::FillCircle { circle, color },
            DrawOp::StrokeCircle { circle, pen } => Self::StrokeCircle { circle, pen },
            DrawOp::FillPath { path, color } => Self::FillPath {
                path: path.clone(),
                color,
            },
            DrawOp::Text {
                origin,
                text,
                size,
                color,
            } => Self::Text {
                origin,
                text: text.into(),
                size,
                color,
            },
            DrawOp::Bitmap { bitmap, dest } => Self::Bitmap {
                width: bitmap.width(),
                height: bitmap.height(),
                dest,
            },
        }
    }
}

/// Event recorded by [`RecordingCanvas`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A clip was pushed.
    PushClip(ClipShape),
    /// A clip was popped.
    PopClip,
    /// An op was drawn.
    Draw {
        /// The op.
        op: RecordedOp,
        /// Number of clips active when it was drawn.
        clip_depth: usize,
    },
}

/// Canvas that records what was drawn instead of producing pixels.
///
/// Intended for tests and debugging that want to assert on the emitted ops
/// and the clip state at the time each op was drawn.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    events: Vec<Event>,
    depth: usize,
}

impl RecordingCanvas {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events in order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Recorded draw ops, without clip events.
    pub fn draws(&self) -> impl Iterator<Item = &RecordedOp> + '_ {
        self.events.iter().filter_map(|event| match event {
            Event::Draw { op, .. } => Some(op),
            _ => None,
        })
    }

    /// Current clip depth.
    #[must_use]
    pub fn clip_depth(&self) -> usize {
        self.depth
    }

    /// Forgets all recorded events.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn push_clip(&mut self, clip: ClipShape) {
        self.depth += 1;
        self.events.push(Event::PushClip(clip));
    }

    fn pop_clip(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        self.events.push(Event::PopClip);
    }

    fn draw(&mut self, op: DrawOp<'_>) {
        self.events.push(Event::Draw {
            op: op.into(),
            clip_depth: self.depth,
        });
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};
    use peniko::Color;

    use super::{Event, RecordedOp, RecordingCanvas};
    use crate::{Bitmap, Canvas, CanvasExt, ClipShape, Pen};

    #[test]
    fn records_ops_with_clip_depth() {
        let mut canvas = RecordingCanvas::new();
        canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        canvas.with_clip(ClipShape::Rect(Rect::new(0.0, 0.0, 5.0, 5.0)), |c| {
            c.stroke_polyline(
                &[Point::ZERO, Point::new(3.0, 4.0)],
                Pen::new(1.0, Color::BLACK),
            );
        });
        canvas.draw_bitmap(&Bitmap::new(3, 2), Rect::new(0.0, 0.0, 6.0, 4.0));

        let events = canvas.events();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], Event::Draw { clip_depth: 0, .. }));
        assert!(matches!(events[1], Event::PushClip(_)));
        assert!(matches!(
            &events[2],
            Event::Draw { op: RecordedOp::Polyline { points, .. }, clip_depth: 1 } if points.len() == 2
        ));
        assert_eq!(events[3], Event::PopClip);
        assert!(matches!(
            canvas.draws().last(),
            Some(RecordedOp::Bitmap { width: 3, height: 2, .. })
        ));
    }

    #[test]
    fn unbalanced_pop_is_ignored() {
        let mut canvas = RecordingCanvas::new();
        canvas.pop_clip();
        assert!(canvas.events().is_empty());
        assert_eq!(canvas.clip_depth(), 0);
    }
}
