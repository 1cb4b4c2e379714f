// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use battlemap_history::{UndoOutcome, UndoRedoTarget};
use battlemap_shapes::LineCollection;
use battlemap_view::{CoordinateTransformer, Grid};
use hashbrown::HashSet;

use crate::background::BackgroundImages;
use crate::config::SessionConfig;
use crate::images::ImageKey;
use crate::token::TokenCollection;

/// The part of a map currently being edited; undo and redo go there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EditTarget {
    /// Background map geometry.
    #[default]
    Background,
    /// Player-visible annotations.
    Annotations,
    /// Notes only the game master sees.
    GmNotes,
    /// Fog-of-war mask of the background.
    BackgroundFog,
    /// Fog-of-war mask of the GM notes.
    GmNotesFog,
    /// Tokens.
    Tokens,
    /// Background images.
    BackgroundImages,
}

impl EditTarget {
    /// Returns `true` for targets that are line layers.
    #[must_use]
    pub fn is_line_layer(self) -> bool {
        !matches!(self, Self::Tokens | Self::BackgroundImages)
    }
}

/// Everything drawn on one map.
#[derive(Debug)]
pub struct MapData {
    /// The grid tokens stand on.
    pub grid: Grid,
    /// World to screen mapping of the current view.
    pub transformer: CoordinateTransformer,
    /// Background map geometry.
    pub background: LineCollection,
    /// Player-visible annotations.
    pub annotations: LineCollection,
    /// Game master notes.
    pub gm_notes: LineCollection,
    /// Regions of the background players may see.
    pub background_fog: LineCollection,
    /// Regions of the GM notes that are shown.
    pub gm_notes_fog: LineCollection,
    /// Tokens.
    pub tokens: TokenCollection,
    /// Background images.
    pub background_images: BackgroundImages,
    active: EditTarget,
}

impl Default for MapData {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl MapData {
    /// An empty map: unconfigured grid, identity view.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let limit = config.history_limit();
        Self {
            grid: Grid::default(),
            transformer: CoordinateTransformer::IDENTITY,
            background: LineCollection::with_history_limit(limit),
            annotations: LineCollection::with_history_limit(limit),
            gm_notes: LineCollection::with_history_limit(limit),
            background_fog: LineCollection::with_history_limit(limit),
            gm_notes_fog: LineCollection::with_history_limit(limit),
            tokens: TokenCollection::with_history_limit(limit),
            background_images: BackgroundImages::with_history_limit(limit),
            active: EditTarget::Background,
        }
    }

    /// Changes how many undo steps every part keeps.
    pub fn set_history_limit(&mut self, limit: usize) {
        for layer in [
            &mut self.background,
            &mut self.annotations,
            &mut self.gm_notes,
            &mut self.background_fog,
            &mut self.gm_notes_fog,
        ] {
            layer.set_history_limit(limit);
        }
        self.tokens.set_history_limit(limit);
        self.background_images.set_history_limit(limit);
    }

    /// The part being edited.
    #[must_use]
    pub fn active(&self) -> EditTarget {
        self.active
    }

    /// Switches the part being edited. Histories are kept per part.
    pub fn set_active(&mut self, target: EditTarget) {
        self.active = target;
    }

    /// The line layer behind a target, or `None` for tokens and images.
    pub fn layer_mut(&mut self, target: EditTarget) -> Option<&mut LineCollection> {
        match target {
            EditTarget::Background => Some(&mut self.background),
            EditTarget::Annotations => Some(&mut self.annotations),
            EditTarget::GmNotes => Some(&mut self.gm_notes),
            EditTarget::BackgroundFog => Some(&mut self.background_fog),
            EditTarget::GmNotesFog => Some(&mut self.gm_notes_fog),
            EditTarget::Tokens | EditTarget::BackgroundImages => None,
        }
    }

    /// The active line layer, if the active target is one.
    pub fn active_layer_mut(&mut self) -> Option<&mut LineCollection> {
        self.layer_mut(self.active)
    }

    /// The undo/redo face of a target.
    pub fn target_mut(&mut self, target: EditTarget) -> &mut dyn UndoRedoTarget {
        match target {
            EditTarget::Background => &mut self.background,
            EditTarget::Annotations => &mut self.annotations,
            EditTarget::GmNotes => &mut self.gm_notes,
            EditTarget::BackgroundFog => &mut self.background_fog,
            EditTarget::GmNotesFog => &mut self.gm_notes_fog,
            EditTarget::Tokens => &mut self.tokens,
            EditTarget::BackgroundImages => &mut self.background_images,
        }
    }

    /// The undo/redo face of the active target.
    pub fn active_target(&mut self) -> &mut dyn UndoRedoTarget {
        self.target_mut(self.active)
    }

    /// Undoes the last edit of the active target.
    pub fn undo(&mut self) -> UndoOutcome {
        self.active_target().undo()
    }

    /// Redoes the next edit of the active target.
    pub fn redo(&mut self) -> UndoOutcome {
        self.active_target().redo()
    }

    /// Returns `true` if the active target has something to undo.
    pub fn can_undo(&mut self) -> bool {
        self.active_target().can_undo()
    }

    /// Returns `true` if the active target has something to redo.
    pub fn can_redo(&mut self) -> bool {
        self.active_target().can_redo()
    }

    /// Every image key a token or background image currently shows.
    #[must_use]
    pub fn image_keys(&self) -> HashSet<&ImageKey> {
        self.tokens
            .iter()
            .filter_map(|token| token.art().image_key())
            .chain(self.background_images.iter().map(|image| &image.key))
            .collect()
    }
}
