//! Per-node synchronization state machine.
//!
//! This module provides a pure, side-effect-free transition function over a
//! node's [`SyncState`]. Verbs go in, a new state plus an optional
//! [`Action`] comes out. Applying the action (detaching a node from its
//! parent) is the caller's job, which keeps every transition testable on
//! its own.

use livekml_types::OpKind;
use serde::{Deserialize, Serialize};

/// Synchronization state of one node - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SyncState {
    /// Not published and not of interest to the walker.
    #[default]
    Idle,
    /// Creation requested, not yet delivered.
    Creating,
    /// Delivered and stable.
    Created,
    /// A field changed since the last delivery.
    Changing,
    /// Deletion requested for a node that exists remotely.
    DeleteCreated,
    /// Deletion requested for a node that also has an undelivered field change.
    DeleteChanged,
}

/// The verbs that drive a node's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `activate(true)`: request publication.
    Activate,
    /// `activate(false)`: request removal (or silent cancellation).
    Deactivate,
    /// A published field has a new value.
    FieldChanged,
    /// An operation for this node was placed into a batch.
    Synchronized,
    /// Reset without emitting anything.
    ForceIdle,
}

/// Side effects requested by a transition, executed by the node tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The node's delete was delivered; remove it from its parent's list.
    Detach,
}

impl SyncState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Apply a verb and return the new state plus an optional action.
    ///
    /// Transitions not listed are no-ops that keep the current state.
    pub fn on_verb(self, verb: Verb) -> (Self, Option<Action>) {
        use SyncState::*;

        match (self, verb) {
            (_, Verb::ForceIdle) => (Idle, None),

            // Activate
            (Idle, Verb::Activate) => (Creating, None),
            (DeleteCreated, Verb::Activate) => (Created, None),
            (DeleteChanged, Verb::Activate) => (Changing, None),

            // Deactivate: never delivered, so cancel silently
            (Creating, Verb::Deactivate) => (Idle, None),
            (Created, Verb::Deactivate) => (DeleteCreated, None),
            (Changing, Verb::Deactivate) => (DeleteChanged, None),

            // FieldChanged
            (Created, Verb::FieldChanged) => (Changing, None),
            (DeleteCreated, Verb::FieldChanged) => (DeleteChanged, None),

            // Synchronized
            (Creating | Changing, Verb::Synchronized) => (Created, None),
            (DeleteCreated | DeleteChanged, Verb::Synchronized) => (Idle, Some(Action::Detach)),

            (state, _) => (state, None),
        }
    }

    /// The operation this state asks for, if any.
    pub fn pending_op(&self) -> Option<OpKind> {
        match self {
            Self::Creating => Some(OpKind::Create),
            Self::Changing => Some(OpKind::Change),
            Self::DeleteCreated | Self::DeleteChanged => Some(OpKind::Delete),
            Self::Idle | Self::Created => None,
        }
    }

    /// Check if the node has undelivered work.
    pub fn is_pending(&self) -> bool {
        self.pending_op().is_some()
    }

    /// Check if the node is (or is about to be) displayed and not scheduled
    /// for deletion.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Creating | Self::Created | Self::Changing)
    }

    /// Check if a delete is pending.
    pub fn is_deleting(&self) -> bool {
        matches!(self, Self::DeleteCreated | Self::DeleteChanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SyncState::*;

    const ALL: [SyncState; 6] = [
        Idle,
        Creating,
        Created,
        Changing,
        DeleteCreated,
        DeleteChanged,
    ];

    fn apply(state: SyncState, verb: Verb) -> SyncState {
        state.on_verb(verb).0
    }

    #[test]
    fn starts_idle() {
        assert_eq!(SyncState::new(), Idle);
        assert_eq!(SyncState::default(), Idle);
    }

    #[test]
    fn activate_from_idle_creates() {
        assert_eq!(apply(Idle, Verb::Activate), Creating);
    }

    #[test]
    fn activate_is_noop_when_already_active() {
        for state in [Creating, Created, Changing] {
            assert_eq!(apply(state, Verb::Activate), state);
        }
    }

    #[test]
    fn activate_cancels_pending_delete() {
        assert_eq!(apply(DeleteCreated, Verb::Activate), Created);
        assert_eq!(apply(DeleteChanged, Verb::Activate), Changing);
    }

    #[test]
    fn deactivate_before_delivery_is_silent() {
        let (state, action) = Creating.on_verb(Verb::Deactivate);
        assert_eq!(state, Idle);
        assert!(action.is_none());
        assert!(state.pending_op().is_none());
    }

    #[test]
    fn deactivate_after_delivery_requests_delete() {
        assert_eq!(apply(Created, Verb::Deactivate), DeleteCreated);
        assert_eq!(apply(Changing, Verb::Deactivate), DeleteChanged);
    }

    #[test]
    fn deactivate_is_noop_while_deleting() {
        assert_eq!(apply(DeleteCreated, Verb::Deactivate), DeleteCreated);
        assert_eq!(apply(DeleteChanged, Verb::Deactivate), DeleteChanged);
        assert_eq!(apply(Idle, Verb::Deactivate), Idle);
    }

    #[test]
    fn field_changed_transitions() {
        assert_eq!(apply(Created, Verb::FieldChanged), Changing);
        assert_eq!(apply(DeleteCreated, Verb::FieldChanged), DeleteChanged);
        for state in [Idle, Creating, Changing, DeleteChanged] {
            assert_eq!(apply(state, Verb::FieldChanged), state);
        }
    }

    #[test]
    fn synchronized_settles_creates_and_changes() {
        assert_eq!(Creating.on_verb(Verb::Synchronized), (Created, None));
        assert_eq!(Changing.on_verb(Verb::Synchronized), (Created, None));
    }

    #[test]
    fn synchronized_delete_detaches() {
        for state in [DeleteCreated, DeleteChanged] {
            assert_eq!(
                state.on_verb(Verb::Synchronized),
                (Idle, Some(Action::Detach))
            );
        }
    }

    #[test]
    fn synchronized_is_noop_without_pending_work() {
        assert_eq!(Idle.on_verb(Verb::Synchronized), (Idle, None));
        assert_eq!(Created.on_verb(Verb::Synchronized), (Created, None));
    }

    #[test]
    fn force_idle_from_every_state() {
        for state in ALL {
            assert_eq!(state.on_verb(Verb::ForceIdle), (Idle, None));
        }
    }

    #[test]
    fn changed_then_deactivated_is_delete_changed() {
        let state = apply(Created, Verb::FieldChanged);
        let state = apply(state, Verb::Deactivate);
        assert_eq!(state, DeleteChanged);
        assert_eq!(state.pending_op(), Some(OpKind::Delete));
    }

    #[test]
    fn deactivated_then_changed_is_delete_changed() {
        let state = apply(Created, Verb::Deactivate);
        let state = apply(state, Verb::FieldChanged);
        assert_eq!(state, DeleteChanged);
        assert_eq!(state.pending_op(), Some(OpKind::Delete));
    }

    #[test]
    fn classification() {
        assert_eq!(Idle.pending_op(), None);
        assert_eq!(Created.pending_op(), None);
        assert_eq!(Creating.pending_op(), Some(OpKind::Create));
        assert_eq!(Changing.pending_op(), Some(OpKind::Change));
        assert_eq!(DeleteCreated.pending_op(), Some(OpKind::Delete));
        assert_eq!(DeleteChanged.pending_op(), Some(OpKind::Delete));
    }

    #[test]
    fn only_detach_action_exists_for_deletes() {
        for state in ALL {
            for verb in [
                Verb::Activate,
                Verb::Deactivate,
                Verb::FieldChanged,
                Verb::Synchronized,
                Verb::ForceIdle,
            ] {
                let (_, action) = state.on_verb(verb);
                if action.is_some() {
                    assert!(state.is_deleting());
                    assert_eq!(verb, Verb::Synchronized);
                }
            }
        }
    }

    #[test]
    fn is_active_helper() {
        assert!(!Idle.is_active());
        assert!(Creating.is_active());
        assert!(Created.is_active());
        assert!(Changing.is_active());
        assert!(!DeleteCreated.is_active());
        assert!(!DeleteChanged.is_active());
    }
}
