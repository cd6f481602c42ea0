//! Mutation lifecycle tracking for optimistic route edits.
//!
//! The planning session applies edits to its in-memory view before the
//! store confirms them. [`MutationTracker`] records where each target
//! sits in that lifecycle so a second edit cannot pile onto one still in
//! flight, and so tests can observe whether an edit committed or rolled
//! back.

use std::collections::HashMap;

use thiserror::Error;

use crate::store::{RouteId, StopId};

/// What a mutation can be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    /// A whole route, as in delete or a status change.
    Route(RouteId),
    /// A single stop, as in visit, removal, or reorder.
    Stop(StopId),
}

/// Lifecycle of one mutation against one target.
///
/// Targets start `Idle`. `begin` moves a target to `Pending`; the
/// outcome moves it to `Committed` or `RolledBack`, both of which re-arm
/// the target for the next mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationState {
    /// No mutation has touched the target, or the last one concluded
    /// long enough ago that the tracker forgot it.
    #[default]
    Idle,
    /// A mutation is in flight; further mutations are rejected.
    Pending,
    /// The last mutation was confirmed by the store.
    Committed,
    /// The last mutation failed and the view was restored.
    RolledBack,
}

/// A mutation was attempted on a target that already has one in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a mutation is already in flight for {target:?}")]
pub struct MutationInFlight {
    /// Target the rejected mutation addressed.
    pub target: MutationTarget,
}

/// Tracks mutation state per target.
#[derive(Debug, Clone, Default)]
pub struct MutationTracker {
    states: HashMap<MutationTarget, MutationState>,
}

impl MutationTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `target`.
    #[must_use]
    pub fn state(&self, target: MutationTarget) -> MutationState {
        self.states.get(&target).copied().unwrap_or_default()
    }

    /// Whether a mutation is in flight for `target`.
    #[must_use]
    pub fn is_pending(&self, target: MutationTarget) -> bool {
        self.state(target) == MutationState::Pending
    }

    /// Move `target` to `Pending`.
    ///
    /// Committed and rolled-back targets re-arm here; a pending target
    /// rejects the attempt without touching its state.
    ///
    /// # Errors
    /// Returns [`MutationInFlight`] when `target` is already pending.
    pub fn begin(&mut self, target: MutationTarget) -> Result<(), MutationInFlight> {
        if self.is_pending(target) {
            return Err(MutationInFlight { target });
        }
        self.states.insert(target, MutationState::Pending);
        Ok(())
    }

    /// Record that the store confirmed the pending mutation.
    pub fn commit(&mut self, target: MutationTarget) {
        debug_assert!(self.is_pending(target), "commit without a pending mutation");
        self.states.insert(target, MutationState::Committed);
    }

    /// Record that the pending mutation failed and was undone.
    pub fn roll_back(&mut self, target: MutationTarget) {
        debug_assert!(
            self.is_pending(target),
            "roll back without a pending mutation"
        );
        self.states.insert(target, MutationState::RolledBack);
    }
}
