// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalescing of redraw requests made while one input event is handled.

use kurbo::{Rect, Vec2};
use smallvec::SmallVec;

/// Screen rectangles of a partial redraw.
pub type DirtyRects = SmallVec<[Rect; 4]>;

/// One coalesced redraw, produced at the end of an input event.
#[derive(Clone, Debug, PartialEq)]
pub enum Redraw {
    /// Composite the whole viewport from scratch.
    Full,
    /// Scroll the existing pixels, then recomposite the exposed strips and
    /// `rects`.
    Partial {
        /// Whole-pixel scroll to apply first; zero when there is none.
        scroll: Vec2,
        /// Screen-space rectangles to recomposite after scrolling. They may
        /// overlap.
        rects: DirtyRects,
    },
}

impl Redraw {
    /// Union of the rectangles of a partial redraw, or `None` for a full
    /// redraw or one without rectangles.
    #[must_use]
    pub fn union_rect(&self) -> Option<Rect> {
        match self {
            Self::Full => None,
            Self::Partial { rects, .. } => {
                let mut it = rects.iter().copied();
                let first = it.next()?;
                Some(it.fold(first, |acc, r| acc.union(r)))
            }
        }
    }
}

/// Batching latch for redraw requests.
///
/// Input handling brackets each event with [`RedrawBatch::begin`] and
/// [`RedrawBatch::end`]. Requests made in between accumulate, and the
/// outermost `end` yields at most one [`Redraw`]. Brackets nest, so helpers
/// that open their own batch inside an event do not flush early.
#[derive(Clone, Debug, Default)]
pub struct RedrawBatch {
    depth: usize,
    full: bool,
    scroll: Vec2,
    rects: DirtyRects,
}

impl RedrawBatch {
    /// Creates an idle latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a batch.
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Returns `true` between the outermost `begin` and its `end`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// Closes a batch. The outermost close returns everything requested
    /// since it opened, or `None` if nothing was.
    pub fn end(&mut self) -> Option<Redraw> {
        if self.depth > 1 {
            self.depth -= 1;
            return None;
        }
        self.depth = 0;
        self.flush()
    }

    /// Asks for a full recomposite. Overrides every other request.
    pub fn request_full(&mut self) {
        self.full = true;
        self.rects.clear();
    }

    /// Asks for a screen rectangle to be recomposited.
    pub fn request_rect(&mut self, rect: Rect) {
        if self.full || !rect.is_finite() || rect.is_zero_area() {
            return;
        }
        self.rects.push(rect.abs());
    }

    /// Records a scroll of the existing content by a whole-pixel `delta`.
    ///
    /// Rectangles requested earlier in the batch move with the content.
    pub fn request_scroll(&mut self, delta: Vec2) {
        if self.full || delta == Vec2::ZERO {
            return;
        }
        self.scroll += delta;
        for rect in &mut self.rects {
            *rect = *rect + delta;
        }
    }

    fn flush(&mut self) -> Option<Redraw> {
        let full = core::mem::take(&mut self.full);
        let scroll = core::mem::take(&mut self.scroll);
        let rects = core::mem::take(&mut self.rects);
        let redraw = if full {
            Redraw::Full
        } else if scroll == Vec2::ZERO && rects.is_empty() {
            return None;
        } else {
            Redraw::Partial { scroll, rects }
        };
        log::trace!("flushing {redraw:?}");
        Some(redraw)
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Vec2};

    use super::{Redraw, RedrawBatch};

    #[test]
    fn nothing_requested_flushes_nothing() {
        let mut batch = RedrawBatch::new();
        batch.begin();
        assert!(batch.is_open());
        assert_eq!(batch.end(), None);
        assert!(!batch.is_open());
    }

    #[test]
    fn full_requests_coalesce() {
        let mut batch = RedrawBatch::new();
        batch.begin();
        batch.request_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        batch.request_full();
        batch.request_full();
        batch.request_rect(Rect::new(5.0, 5.0, 10.0, 10.0));
        assert_eq!(batch.end(), Some(Redraw::Full));

        batch.begin();
        assert_eq!(batch.end(), None, "state does not leak into the next batch");
    }

    #[test]
    fn nested_batches_flush_once() {
        let mut batch = RedrawBatch::new();
        batch.begin();
        batch.begin();
        batch.request_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(batch.end(), None);
        batch.request_rect(Rect::new(8.0, 0.0, 12.0, 4.0));
        let redraw = batch.end().unwrap();
        assert_eq!(redraw.union_rect(), Some(Rect::new(0.0, 0.0, 12.0, 4.0)));
    }

    #[test]
    fn earlier_rects_follow_the_scroll() {
        let mut batch = RedrawBatch::new();
        batch.begin();
        batch.request_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        batch.request_scroll(Vec2::new(3.0, -1.0));
        batch.request_rect(Rect::new(20.0, 20.0, 24.0, 24.0));
        batch.request_scroll(Vec2::new(1.0, 0.0));
        let Some(Redraw::Partial { scroll, rects }) = batch.end() else {
            panic!("expected a partial redraw");
        };
        assert_eq!(scroll, Vec2::new(4.0, -1.0));
        assert_eq!(
            rects.as_slice(),
            &[
                Rect::new(4.0, -1.0, 8.0, 3.0),
                Rect::new(21.0, 20.0, 25.0, 24.0)
            ]
        );
    }

    #[test]
    fn degenerate_rects_are_ignored() {
        let mut batch = RedrawBatch::new();
        batch.begin();
        batch.request_rect(Rect::new(0.0, 0.0, 0.0, 10.0));
        batch.request_rect(Rect::new(0.0, 0.0, f64::NAN, 10.0));
        assert_eq!(batch.end(), None);
    }
}
