// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bitmaps placed under the map geometry.

use battlemap_history::{History, UndoOutcome, UndoRedoTarget};
use kurbo::{Point, Rect};

use crate::images::ImageKey;

/// Smallest side, in world units, a resized image may keep.
pub const MIN_IMAGE_SIDE: f64 = 1.0;

/// One of the four corners of a background image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    /// `(x0, y0)`.
    TopLeft,
    /// `(x1, y0)`.
    TopRight,
    /// `(x1, y1)`.
    BottomRight,
    /// `(x0, y1)`.
    BottomLeft,
}

impl Corner {
    const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomRight,
        Self::BottomLeft,
    ];

    /// Position of this corner on `rect`.
    #[must_use]
    pub fn of(self, rect: Rect) -> Point {
        match self {
            Self::TopLeft => Point::new(rect.x0, rect.y0),
            Self::TopRight => Point::new(rect.x1, rect.y0),
            Self::BottomRight => Point::new(rect.x1, rect.y1),
            Self::BottomLeft => Point::new(rect.x0, rect.y1),
        }
    }

    /// `rect` with this corner moved to `to`; the opposite corner stays put.
    #[must_use]
    pub fn drag(self, rect: Rect, to: Point) -> Rect {
        match self {
            Self::TopLeft => Rect::new(to.x, to.y, rect.x1, rect.y1),
            Self::TopRight => Rect::new(rect.x0, to.y, to.x, rect.y1),
            Self::BottomRight => Rect::new(rect.x0, rect.y0, to.x, to.y),
            Self::BottomLeft => Rect::new(to.x, rect.y0, rect.x1, to.y),
        }
    }
}

/// An image stretched over a world-space rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundImage {
    /// The pixels to show.
    pub key: ImageKey,
    /// Where they go, in world space.
    pub rect: Rect,
}

impl BackgroundImage {
    /// Creates an image covering `rect`.
    #[must_use]
    pub fn new(key: ImageKey, rect: Rect) -> Self {
        Self { key, rect }
    }

    /// Returns `true` if the rectangle is too thin or inside out.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.rect.width() >= MIN_IMAGE_SIDE && self.rect.height() >= MIN_IMAGE_SIDE)
    }
}

/// The background images of a map, bottom first, with their own history.
#[derive(Debug)]
pub struct BackgroundImages {
    images: Vec<BackgroundImage>,
    history: History<Vec<BackgroundImage>>,
}

impl Default for BackgroundImages {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundImages {
    /// No images, default history limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            history: History::new(),
        }
    }

    /// No images, keeping at most `limit` undo steps.
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            images: Vec::new(),
            history: History::with_limit(limit),
        }
    }

    /// Changes how many undo steps are kept.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
    }

    /// Adds an image on top; returns its index.
    pub fn push(&mut self, image: BackgroundImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Removes the image at `index`.
    pub fn remove(&mut self, index: usize) -> Option<BackgroundImage> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    /// The image at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BackgroundImage> {
        self.images.get(index)
    }

    /// Moves or stretches the image at `index`. Returns the old rectangle.
    pub fn set_rect(&mut self, index: usize, rect: Rect) -> Option<Rect> {
        let image = self.images.get_mut(index)?;
        Some(core::mem::replace(&mut image.rect, rect))
    }

    /// Images bottom first.
    pub fn iter(&self) -> std::slice::Iter<'_, BackgroundImage> {
        self.images.iter()
    }

    /// Number of images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` if there are no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The corner nearest to a world point within `radius`, topmost image
    /// first.
    #[must_use]
    pub fn find_corner(&self, pt: Point, radius: f64) -> Option<(usize, Corner)> {
        self.images.iter().enumerate().rev().find_map(|(i, image)| {
            Corner::ALL
                .into_iter()
                .map(|c| (c, c.of(image.rect).distance(pt)))
                .filter(|(_, d)| *d <= radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(c, _)| (i, c))
        })
    }

    pub(crate) fn restore(&mut self, images: Vec<BackgroundImage>) {
        self.images = images;
        self.history.clear();
    }
}

impl<'a> IntoIterator for &'a BackgroundImages {
    type Item = &'a BackgroundImage;
    type IntoIter = std::slice::Iter<'a, BackgroundImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

impl UndoRedoTarget for BackgroundImages {
    fn checkpoint(&mut self) {
        self.history.checkpoint(&self.images);
    }

    fn commit(&mut self) -> bool {
        self.history.commit(&self.images)
    }

    fn rollback(&mut self) -> bool {
        match self.history.rollback() {
            Some(snapshot) => {
                self.images = snapshot.to_vec();
                true
            }
            None => false,
        }
    }

    fn undo(&mut self) -> UndoOutcome {
        match self.history.undo() {
            Some(snapshot) => {
                self.images = snapshot.to_vec();
                UndoOutcome::Applied
            }
            None => UndoOutcome::Nothing,
        }
    }

    fn redo(&mut self) -> UndoOutcome {
        match self.history.redo() {
            Some(snapshot) => {
                self.images = snapshot.to_vec();
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
    use battlemap_history::UndoRedoTarget;
    use kurbo::{Point, Rect};

    use super::{BackgroundImage, BackgroundImages, Corner};
    use crate::ImageKey;

    fn tavern() -> BackgroundImage {
        BackgroundImage::new(ImageKey::new("tavern.png"), Rect::new(0.0, 0.0, 100.0, 50.0))
    }

    #[test]
    fn corners_are_found_on_the_topmost_image() {
        let mut images = BackgroundImages::new();
        images.push(tavern());
        let top = images.push(tavern());
        assert_eq!(
            images.find_corner(Point::new(98.0, 52.0), 5.0),
            Some((top, Corner::BottomRight))
        );
        assert_eq!(images.find_corner(Point::new(50.0, 25.0), 5.0), None);
    }

    #[test]
    fn dragging_a_corner_keeps_the_opposite_one() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let dragged = Corner::TopRight.drag(rect, Point::new(120.0, -10.0));
        assert_eq!(dragged, Rect::new(0.0, -10.0, 120.0, 50.0));
        assert_eq!(Corner::BottomLeft.of(dragged), Point::new(0.0, 50.0));

        let mut inside_out = tavern();
        inside_out.rect = Corner::TopLeft.drag(inside_out.rect, Point::new(150.0, 10.0));
        assert!(inside_out.is_degenerate());
    }

    #[test]
    fn resize_rolls_back_and_undoes() {
        let mut images = BackgroundImages::new();
        let index = images.push(tavern());
        images.checkpoint();
        images.set_rect(index, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(images.rollback());
        assert_eq!(images.get(index), Some(&tavern()));

        images.checkpoint();
        images.set_rect(index, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(images.commit());
        assert!(images.undo().is_applied());
        assert_eq!(images.get(index), Some(&tavern()));
    }
}
