//! Edit session lifecycle
//!
//! [`EditSession`] is the synchronous state machine behind the group details
//! screen:
//!
//! ```text
//! Idle -> Editing -> Publishing -> Idle
//!            ^            |
//!            +-- failure -+
//! ```
//!
//! Edits are only accepted while editing. Calls made in the wrong state are
//! ignored rather than reported: UI callers routinely fire redundant events.

use ensemble_core::{GroupType, Identity, MemberOrPending};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::changeset::{PendingChangeSet, ReconcileReport};
use crate::diff::{WireDiff, compile_diff};
use crate::error::GroupsResult;
use crate::projection::{project_members, stored_members};
use crate::store::MemberStore;

/// Lifecycle state of an edit session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Showing the stored list.
    #[default]
    Idle,
    /// Accumulating edits.
    Editing,
    /// A diff was handed to the engine and is awaiting confirmation.
    Publishing,
}

/// Result of a publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The diff was empty; the session went back to idle.
    NothingToPublish,
    /// The diff must be submitted to the engine.
    Submit(WireDiff),
    /// Not editing; nothing happened.
    Ignored,
}

/// Edit session state machine for one group.
#[derive(Debug, Clone)]
pub struct EditSession {
    own_identity: Identity,
    initial_group_type: GroupType,
    changes: PendingChangeSet,
    state: SessionState,
}

impl EditSession {
    /// Create an idle session
    pub fn new(own_identity: Identity, initial_group_type: GroupType) -> Self {
        Self {
            own_identity,
            initial_group_type,
            changes: PendingChangeSet::new(),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn own_identity(&self) -> &Identity {
        &self.own_identity
    }

    pub fn changes(&self) -> &PendingChangeSet {
        &self.changes
    }

    /// The group type as last reported by the engine
    pub fn initial_group_type(&self) -> GroupType {
        self.initial_group_type
    }

    /// The group type in effect, including a pending change
    pub fn group_type(&self) -> GroupType {
        self.changes.effective_group_type(self.initial_group_type)
    }

    /// Record a group type reported by the engine
    ///
    /// A pending override equal to the new type is no longer a change.
    /// Newly added members are re-resolved against the new effective type.
    pub fn set_initial_group_type(&mut self, group_type: GroupType) {
        self.initial_group_type = group_type;
        self.changes.rebase_group_type(group_type);
    }

    /// Enter edit mode
    pub fn start_editing(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        info!("Editing started");
        self.state = SessionState::Editing;
        true
    }

    fn editing(&self, action: &'static str) -> bool {
        if self.state == SessionState::Editing {
            true
        } else {
            debug!(action, state = ?self.state, "Ignoring edit outside edit mode");
            false
        }
    }

    /// Select a new member
    pub fn member_added(&mut self, store: &MemberStore, identity: Identity, sort_key: Vec<u8>) -> bool {
        if !self.editing("member_added") {
            return false;
        }
        let group_type = self.group_type();
        self.changes.add_member(store, &group_type, identity, sort_key)
    }

    /// Remove a member, or deselect a newly added one
    pub fn member_removed(&mut self, store: &MemberStore, identity: &Identity) -> bool {
        if !self.editing("member_removed") {
            return false;
        }
        self.changes.remove_member(store, identity)
    }

    /// Toggle a member's admin flag
    pub fn permission_changed(&mut self, store: &MemberStore, identity: &Identity, is_admin: bool) -> bool {
        if !self.editing("permission_changed") {
            return false;
        }
        let group_type = self.group_type();
        self.changes.set_admin(store, &group_type, identity, is_admin)
    }

    /// Change the group type
    pub fn group_type_changed(&mut self, group_type: GroupType) -> bool {
        if !self.editing("group_type_changed") {
            return false;
        }
        self.changes.set_group_type(group_type, self.initial_group_type)
    }

    /// Compile the pending edits
    ///
    /// An empty diff ends the session as a discard would. A compile failure
    /// leaves the session editing with its edits intact.
    pub fn publish(&mut self, store: &MemberStore) -> GroupsResult<PublishOutcome> {
        if !self.editing("publish") {
            return Ok(PublishOutcome::Ignored);
        }

        let group_type = self.group_type();
        let diff = compile_diff(
            &self.changes,
            store,
            &group_type,
            &self.initial_group_type,
            &self.own_identity,
        )?;

        if diff.is_empty() {
            info!("Nothing to publish, leaving edit mode");
            self.changes.clear();
            self.state = SessionState::Idle;
            return Ok(PublishOutcome::NothingToPublish);
        }

        info!(
            added = diff.added_members_with_permissions.len(),
            removed = diff.removed_members.len(),
            permission_changes = diff.permission_changes.len(),
            type_changed = diff.updated_group_type.is_some(),
            "Publishing group update"
        );
        self.state = SessionState::Publishing;
        Ok(PublishOutcome::Submit(diff))
    }

    /// The engine confirmed the update
    pub fn publication_finished(&mut self) -> bool {
        if self.state != SessionState::Publishing {
            return false;
        }
        info!("Group update published");
        self.initial_group_type = self.group_type();
        self.changes.clear();
        self.state = SessionState::Idle;
        true
    }

    /// The engine call failed; edits are kept for a retry
    pub fn publication_failed(&mut self) -> bool {
        if self.state != SessionState::Publishing {
            return false;
        }
        self.state = SessionState::Editing;
        true
    }

    /// Drop every edit and leave edit mode
    pub fn discard(&mut self) -> bool {
        if !self.editing("discard") {
            return false;
        }
        info!("Edits discarded");
        self.changes.clear();
        self.state = SessionState::Idle;
        true
    }

    /// Reconcile pending edits against a fresh snapshot
    pub fn reconcile(&mut self, store: &MemberStore) -> ReconcileReport {
        let report = self.changes.reconcile(store);
        if !report.is_noop() {
            debug!(?report, "Pending edits reconciled with stored members");
        }
        report
    }

    /// The list the screen should render right now
    pub fn displayed_members(&self, store: &MemberStore) -> Vec<MemberOrPending> {
        match self.state {
            SessionState::Idle => stored_members(store),
            SessionState::Editing | SessionState::Publishing => {
                project_members(store, &self.changes, &self.group_type())
            }
        }
    }
}
