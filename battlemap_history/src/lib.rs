// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Battlemap History: undo/redo over immutable snapshots.
//!
//! Every editable layer of a map keeps its own [`History`]. Edits follow a
//! two-phase protocol:
//!
//! 1. [`History::checkpoint`] captures the state before a gesture starts.
//! 2. [`History::commit`] records the before/after pair once the gesture ends,
//!    or [`History::rollback`] abandons it and hands back the checkpoint.
//!
//! Revisions are stored as shared, never-mutated snapshots (`Arc<S>`) and
//! tagged with a generation number. Undo and redo only move a cursor over
//! the arena, so the live state and the stored snapshots never alias.
//!
//! [`UndoRedoTarget`] is the object-safe face of anything that owns a
//! history, so the map can route the undo and redo controls to whichever
//! layer is active.
//!
//! ## Example
//!
//! ```rust
//! use battlemap_history::History;
//!
//! let mut state = vec![1, 2, 3];
//! let mut history = History::new();
//!
//! history.checkpoint(&state);
//! state.push(4);
//! assert!(history.commit(&state));
//!
//! let before = history.undo().unwrap();
//! assert_eq!(*before, vec![1, 2, 3]);
//! let after = history.redo().unwrap();
//! assert_eq!(*after, vec![1, 2, 3, 4]);
//! assert!(history.redo().is_none());
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::sync::Arc;

/// Number of revisions kept when no explicit limit is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Monotonic revision tag.
pub type Generation = u64;

/// One committed edit: the state before it and the state after it.
#[derive(Debug)]
pub struct Revision<S> {
    generation: Generation,
    before: Arc<S>,
    after: Arc<S>,
}

impl<S> Revision<S> {
    /// Generation assigned when the revision was committed.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// State before the edit.
    #[must_use]
    pub fn before(&self) -> &Arc<S> {
        &self.before
    }

    /// State after the edit.
    #[must_use]
    pub fn after(&self) -> &Arc<S> {
        &self.after
    }
}

impl<S> Clone for Revision<S> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            before: Arc::clone(&self.before),
            after: Arc::clone(&self.after),
        }
    }
}

/// Bounded undo/redo history of snapshots of `S`.
///
/// Revisions before the cursor can be undone, revisions after it redone.
/// Committing a new revision drops everything after the cursor.
#[derive(Debug)]
pub struct History<S> {
    revisions: VecDeque<Revision<S>>,
    cursor: usize,
    pending: Option<Arc<S>>,
    next_generation: Generation,
    limit: usize,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl<S> History<S> {
    /// Creates an empty history keeping [`DEFAULT_HISTORY_LIMIT`] revisions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty history keeping at most `limit` revisions (at least one).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            revisions: VecDeque::new(),
            cursor: 0,
            pending: None,
            next_generation: 0,
            limit: limit.max(1),
        }
    }

    /// Maximum number of revisions kept.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Changes the bound, evicting the oldest revisions if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.evict();
    }

    /// Number of stored revisions (undoable and redoable).
    #[must_use]
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Returns `true` when no revision is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Returns `true` if [`History::undo`] would do something.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Returns `true` if [`History::redo`] would do something.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.revisions.len()
    }

    /// Returns `true` while a checkpoint awaits commit or rollback.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Generation of the most recently applied revision, if any.
    #[must_use]
    pub fn current_generation(&self) -> Option<Generation> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.revisions.get(i))
            .map(Revision::generation)
    }

    /// Stored revisions, oldest first.
    pub fn revisions(&self) -> impl Iterator<Item = &Revision<S>> + '_ {
        self.revisions.iter()
    }

    /// Abandons the pending checkpoint and returns it.
    ///
    /// The caller restores the returned snapshot to undo a torn gesture.
    pub fn rollback(&mut self) -> Option<Arc<S>> {
        let pending = self.pending.take();
        if pending.is_some() {
            log::debug!("rolled back pending checkpoint");
        }
        pending
    }

    /// Steps back one revision and returns the state to restore.
    ///
    /// A pending checkpoint is discarded first.
    pub fn undo(&mut self) -> Option<Arc<S>> {
        self.pending = None;
        if self.cursor == 0 {
            log::debug!("nothing to undo");
            return None;
        }
        self.cursor -= 1;
        let revision = &self.revisions[self.cursor];
        log::debug!("undo to before generation {}", revision.generation);
        Some(Arc::clone(&revision.before))
    }

    /// Steps forward one revision and returns the state to restore.
    pub fn redo(&mut self) -> Option<Arc<S>> {
        self.pending = None;
        let Some(revision) = self.revisions.get(self.cursor) else {
            log::debug!("nothing to redo");
            return None;
        };
        self.cursor += 1;
        log::debug!("redo generation {}", revision.generation);
        Some(Arc::clone(&revision.after))
    }

    /// Drops every revision and any pending checkpoint.
    pub fn clear(&mut self) {
        self.revisions.clear();
        self.cursor = 0;
        self.pending = None;
    }

    fn evict(&mut self) {
        while self.revisions.len() > self.limit {
            self.revisions.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
    }
}

impl<S: Clone + PartialEq> History<S> {
    /// Captures `state` as the "before" snapshot of the next revision.
    ///
    /// A second checkpoint without an intervening commit replaces the first.
    pub fn checkpoint(&mut self, state: &S) {
        if self.pending.is_some() {
            log::debug!("checkpoint replaces an uncommitted checkpoint");
        }
        self.pending = Some(Arc::new(state.clone()));
    }

    /// Records the pending checkpoint together with `state` as one revision.
    ///
    /// Returns `false`, and records nothing, when there is no checkpoint or
    /// `state` equals it. Otherwise redo is cleared and the oldest revision
    /// is evicted if the bound is exceeded.
    pub fn commit(&mut self, state: &S) -> bool {
        let Some(before) = self.pending.take() else {
            log::debug!("commit without checkpoint ignored");
            return false;
        };
        if *before == *state {
            return false;
        }
        self.revisions.truncate(self.cursor);
        let generation = self.next_generation;
        self.next_generation += 1;
        self.revisions.push_back(Revision {
            generation,
            before,
            after: Arc::new(state.clone()),
        });
        self.cursor = self.revisions.len();
        self.evict();
        log::debug!(
            "committed generation {generation}, {} revisions stored",
            self.revisions.len()
        );
        true
    }
}

/// Result of an undo or redo request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum UndoOutcome {
    /// A revision was applied.
    Applied,
    /// There was nothing to undo or redo.
    Nothing,
}

impl UndoOutcome {
    /// Returns `true` for [`UndoOutcome::Applied`].
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Something that owns a [`History`] and can restore its own snapshots.
pub trait UndoRedoTarget {
    /// Captures the current state before a gesture.
    fn checkpoint(&mut self);

    /// Records the gesture; returns `true` if a revision was added.
    fn commit(&mut self) -> bool;

    /// Abandons the gesture, restoring the checkpointed state.
    /// Returns `true` if a checkpoint was pending.
    fn rollback(&mut self) -> bool;

    /// Restores the state before the last applied revision.
    fn undo(&mut self) -> UndoOutcome;

    /// Re-applies the next revision.
    fn redo(&mut self) -> UndoOutcome;

    /// Returns `true` if [`UndoRedoTarget::undo`] would do something.
    fn can_undo(&self) -> bool;

    /// Returns `true` if [`UndoRedoTarget::redo`] would do something.
    fn can_redo(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{History, UndoOutcome};

    fn edit(history: &mut History<Vec<i32>>, state: &mut Vec<i32>, value: i32) {
        history.checkpoint(state);
        state.push(value);
        assert!(history.commit(state), "edit should be recorded");
    }

    #[test]
    fn undo_restores_exact_state() {
        let mut history = History::new();
        let mut state = vec![7, 8];
        edit(&mut history, &mut state, 9);
        edit(&mut history, &mut state, 10);

        assert_eq!(*history.undo().unwrap(), vec![7, 8, 9]);
        assert_eq!(*history.undo().unwrap(), vec![7, 8]);
        assert!(history.undo().is_none());
        assert_eq!(*history.redo().unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn unchanged_commit_is_dropped() {
        let mut history = History::new();
        let state = vec![1];
        history.checkpoint(&state);
        assert!(!history.commit(&state));
        assert!(history.is_empty());
        assert!(!history.commit(&state), "commit without checkpoint");
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut history = History::new();
        let mut state = Vec::new();
        edit(&mut history, &mut state, 1);
        edit(&mut history, &mut state, 2);
        state = (*history.undo().unwrap()).clone();
        assert!(history.can_redo());
        edit(&mut history, &mut state, 3);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(*history.undo().unwrap(), vec![1]);
    }

    #[test]
    fn bound_evicts_oldest() {
        let mut history = History::with_limit(3);
        let mut state = Vec::new();
        for v in 0..5 {
            edit(&mut history, &mut state, v);
        }
        assert_eq!(history.len(), 3);
        let generations: Vec<_> = history.revisions().map(|r| r.generation()).collect();
        assert_eq!(generations, vec![2, 3, 4]);
        let mut undone = 0;
        while history.undo().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        assert_eq!(*history.redo().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn rollback_returns_checkpoint() {
        let mut history = History::new();
        let state = vec![4, 5];
        history.checkpoint(&state);
        assert!(history.has_pending());
        assert_eq!(*history.rollback().unwrap(), vec![4, 5]);
        assert!(history.rollback().is_none());
        assert!(!history.can_undo());
    }

    #[test]
    fn outcome_helpers() {
        assert!(UndoOutcome::Applied.is_applied());
        assert!(!UndoOutcome::Nothing.is_applied());
    }
}
