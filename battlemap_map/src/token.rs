// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tokens: creatures and objects standing on the grid.

use std::collections::BTreeSet;

use battlemap_history::{History, UndoOutcome, UndoRedoTarget};
use battlemap_view::{CoordinateTransformer, Grid};
use kurbo::{Point, Rect};
use peniko::Color;

use crate::images::ImageKey;

/// Identity of a token within its collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub u64);

/// Built-in silhouettes for tokens without artwork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltInShape {
    /// A disc.
    Circle,
    /// A square filling the footprint.
    Square,
    /// A square rotated by 45°.
    Diamond,
}

impl BuiltInShape {
    /// Tag used in saved files.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Diamond => "diamond",
        }
    }

    /// Inverse of [`BuiltInShape::tag`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "circle" => Self::Circle,
            "square" => Self::Square,
            "diamond" => Self::Diamond,
            _ => return None,
        })
    }
}

/// How a token is painted.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenArt {
    /// A plain disc in one colour.
    SolidColor(Color),
    /// One of the built-in silhouettes.
    BuiltIn {
        /// Silhouette.
        shape: BuiltInShape,
        /// Fill colour.
        color: Color,
    },
    /// A bitmap loaded through the image cache.
    Image(ImageKey),
}

impl TokenArt {
    /// The image this art needs, if any.
    #[must_use]
    pub fn image_key(&self) -> Option<&ImageKey> {
        match self {
            Self::Image(key) => Some(key),
            _ => None,
        }
    }
}

/// A token on the map.
///
/// `location` is the centre of the token in grid space; `size` is its
/// diameter in cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    id: TokenId,
    name: String,
    location: Point,
    size: f64,
    bloodied: bool,
    selected: bool,
    art: TokenArt,
}

impl Token {
    /// Creates an unselected, healthy token. The id is assigned on insertion.
    pub fn new(name: impl Into<String>, location: Point, size: f64, art: TokenArt) -> Self {
        Self {
            id: TokenId(0),
            name: name.into(),
            location,
            size: if size.is_finite() && size > 0.0 { size } else { 1.0 },
            bloodied: false,
            selected: false,
            art,
        }
    }

    /// Identity within the owning collection.
    #[must_use]
    pub fn id(&self) -> TokenId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: TokenId) {
        self.id = id;
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Centre in grid space.
    #[must_use]
    pub fn location(&self) -> Point {
        self.location
    }

    /// Moves the centre.
    pub fn set_location(&mut self, location: Point) {
        self.location = location;
    }

    /// Diameter in cells.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns `true` if the token has been marked as wounded.
    #[must_use]
    pub fn is_bloodied(&self) -> bool {
        self.bloodied
    }

    /// Marks or clears the wounded state.
    pub fn set_bloodied(&mut self, bloodied: bool) {
        self.bloodied = bloodied;
    }

    /// Returns `true` while the token is selected.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Selects or deselects the token.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// How the token is painted.
    #[must_use]
    pub fn art(&self) -> &TokenArt {
        &self.art
    }

    /// Returns `true` if the grid-space point lies on the token's disc.
    #[must_use]
    pub fn contains(&self, grid_pt: Point) -> bool {
        grid_pt.distance(self.location) <= self.size / 2.0
    }

    /// Square footprint in grid space.
    #[must_use]
    pub fn grid_rect(&self) -> Rect {
        Rect::from_center_size(self.location, (self.size, self.size))
    }

    /// Square footprint in screen space.
    #[must_use]
    pub fn screen_rect(&self, grid: &Grid, world_to_screen: &CoordinateTransformer) -> Rect {
        grid.grid_to_screen_transformer(world_to_screen)
            .world_to_screen_rect(self.grid_rect())
    }
}

/// The tokens of one map, with their own undo history.
///
/// Order is z-order: later tokens draw on top and are found first.
#[derive(Debug)]
pub struct TokenCollection {
    tokens: Vec<Token>,
    next_id: u64,
    history: History<Vec<Token>>,
}

impl Default for TokenCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCollection {
    /// Creates an empty collection with the default history limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            next_id: 1,
            history: History::new(),
        }
    }

    /// Creates an empty collection keeping at most `limit` undo steps.
    #[must_use]
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: History::with_limit(limit),
            ..Self::new()
        }
    }

    /// Changes how many undo steps are kept.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Places `token` on top of the others under a fresh id.
    pub fn insert(&mut self, mut token: Token) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        token.set_id(id);
        self.tokens.push(token);
        id
    }

    /// Replaces the content with loaded tokens, fixing duplicate ids.
    pub(crate) fn restore(&mut self, next_id: u64, tokens: Vec<Token>) {
        self.next_id = tokens
            .iter()
            .map(|t| t.id().0.saturating_add(1))
            .fold(next_id.max(1), u64::max);
        self.tokens.clear();
        self.history.clear();
        let mut seen = BTreeSet::new();
        for mut token in tokens {
            if token.id().0 == 0 || !seen.insert(token.id()) {
                let id = TokenId(self.next_id);
                self.next_id += 1;
                log::warn!("reassigned duplicate token id {:?} to {id:?}", token.id());
                token.set_id(id);
                seen.insert(id);
            }
            self.tokens.push(token);
        }
    }

    /// Looks a token up by id.
    #[must_use]
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id() == id)
    }

    /// Looks a token up by id for editing.
    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.iter_mut().find(|t| t.id() == id)
    }

    /// Takes a token off the map.
    pub fn remove(&mut self, id: TokenId) -> Option<Token> {
        let index = self.tokens.iter().position(|t| t.id() == id)?;
        Some(self.tokens.remove(index))
    }

    /// Tokens in z-order, bottom first.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if there are no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The topmost token covering a grid-space point.
    #[must_use]
    pub fn find_at(&self, grid_pt: Point) -> Option<TokenId> {
        self.tokens
            .iter()
            .rev()
            .find(|t| t.contains(grid_pt))
            .map(Token::id)
    }

    /// Selects exactly `id`, or nothing. Returns the ids whose selection
    /// state changed.
    pub fn select_only(&mut self, id: Option<TokenId>) -> Vec<TokenId> {
        let mut changed = Vec::new();
        for token in &mut self.tokens {
            let selected = Some(token.id()) == id;
            if token.is_selected() != selected {
                token.set_selected(selected);
                changed.push(token.id());
            }
        }
        changed
    }

    fn restore_snapshot(&mut self, snapshot: &[Token]) {
        self.tokens = snapshot.to_vec();
    }
}

impl<'a> IntoIterator for &'a TokenCollection {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl UndoRedoTarget for TokenCollection {
    fn checkpoint(&mut self) {
        self.history.checkpoint(&self.tokens);
    }

    fn commit(&mut self) -> bool {
        self.history.commit(&self.tokens)
    }

    fn rollback(&mut self) -> bool {
        self.history
            .rollback()
            .map(|snapshot| self.restore_snapshot(&snapshot))
            .is_some()
    }

    fn undo(&mut self) -> UndoOutcome {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore_snapshot(&snapshot);
                UndoOutcome::Applied
            }
            None => UndoOutcome::Nothing,
        }
    }

    fn redo(&mut self) -> UndoOutcome {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore_snapshot(&snapshot);
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
