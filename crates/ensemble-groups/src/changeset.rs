//! Uncommitted local edits to a group
//!
//! A [`PendingChangeSet`] accumulates the edits a user makes on the group
//! details screen. It is layered on top of the authoritative [`MemberStore`]
//! and must be reconciled against it every time a new snapshot arrives.
//!
//! Invariants maintained by every method:
//!
//! - an identity is never both added and removed
//! - admin changes only name identities present in the store
//! - removing an identity discards its admin change

use std::collections::{BTreeMap, BTreeSet};

use ensemble_core::{GroupType, Identity, MemberOrPending};
use serde::Serialize;
use tracing::debug;

use crate::permissions::resolve_permissions;
use crate::store::MemberStore;

/// Accumulated local edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingChangeSet {
    /// Desired admin flag for existing members.
    admin_changes: BTreeMap<Identity, bool>,
    /// Existing members marked for removal.
    members_removed: BTreeSet<Identity>,
    /// Newly selected members, as synthesized records.
    members_added: BTreeMap<Identity, MemberOrPending>,
    /// Replacement group type, when it differs from the initial one.
    group_type_override: Option<GroupType>,
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Added members that now appear in the store.
    pub confirmed_additions: usize,
    /// Confirmed additions whose requested admin flag was lost.
    pub admin_corrections: usize,
    /// Removals that already took effect.
    pub pruned_removals: usize,
    /// Admin changes for identities that left the store.
    pub pruned_admin_changes: usize,
}

impl ReconcileReport {
    /// Whether the pass touched the change-set.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

impl PendingChangeSet {
    /// Create an empty change-set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been edited
    pub fn is_empty(&self) -> bool {
        self.admin_changes.is_empty()
            && self.members_removed.is_empty()
            && self.members_added.is_empty()
            && self.group_type_override.is_none()
    }

    /// Drop every edit
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn admin_changes(&self) -> &BTreeMap<Identity, bool> {
        &self.admin_changes
    }

    pub fn members_removed(&self) -> &BTreeSet<Identity> {
        &self.members_removed
    }

    pub fn members_added(&self) -> &BTreeMap<Identity, MemberOrPending> {
        &self.members_added
    }

    pub fn group_type_override(&self) -> Option<GroupType> {
        self.group_type_override
    }

    /// The group type in effect: the override if any, else `initial`
    pub fn effective_group_type(&self, initial: GroupType) -> GroupType {
        self.group_type_override.unwrap_or(initial)
    }

    /// Select a new member.
    ///
    /// Selecting an identity that is pending removal cancels the removal.
    /// Selecting an identity already in the group (or already added) does
    /// nothing. Returns whether the change-set changed.
    pub fn add_member(
        &mut self,
        store: &MemberStore,
        group_type: &GroupType,
        identity: Identity,
        sort_key: Vec<u8>,
    ) -> bool {
        if self.members_removed.remove(&identity) {
            return true;
        }
        if store.contains(&identity) || self.members_added.contains_key(&identity) {
            return false;
        }

        let is_admin = matches!(group_type, GroupType::Simple);
        let record = MemberOrPending::pending(
            identity.clone(),
            sort_key,
            resolve_permissions(group_type, is_admin),
        );
        self.members_added.insert(identity, record);
        true
    }

    /// Mark a member for removal.
    ///
    /// A newly added member is simply deselected. Returns whether the
    /// change-set changed.
    pub fn remove_member(&mut self, store: &MemberStore, identity: &Identity) -> bool {
        if self.members_added.remove(identity).is_some() {
            return true;
        }
        if !store.contains(identity) {
            return false;
        }
        self.admin_changes.remove(identity);
        self.members_removed.insert(identity.clone())
    }

    /// Toggle the admin flag of a member.
    ///
    /// For a newly added member the synthesized record is updated in place.
    /// For an existing member an admin change is recorded, or dropped when
    /// it matches the stored flag. Members pending removal are left alone.
    pub fn set_admin(
        &mut self,
        store: &MemberStore,
        group_type: &GroupType,
        identity: &Identity,
        is_admin: bool,
    ) -> bool {
        if let Some(added) = self.members_added.get_mut(identity) {
            let permissions = resolve_permissions(group_type, is_admin);
            let changed = added.permissions != permissions;
            added.permissions = permissions;
            return changed;
        }

        if self.members_removed.contains(identity) {
            return false;
        }
        let Some(existing) = store.get(identity) else {
            return false;
        };

        if existing.is_admin() == is_admin {
            self.admin_changes.remove(identity).is_some()
        } else {
            self.admin_changes.insert(identity.clone(), is_admin) != Some(is_admin)
        }
    }

    /// Change the group type.
    ///
    /// Newly added members are re-resolved against the new type: everyone is
    /// an admin in a simple group, nobody new is in a private one.
    pub fn set_group_type(&mut self, group_type: GroupType, initial: GroupType) -> bool {
        let new_override = (group_type != initial).then_some(group_type);
        if new_override == self.group_type_override {
            return false;
        }
        self.group_type_override = new_override;
        self.resolve_added(group_type);
        true
    }

    /// Move onto a new initial group type reported by the engine.
    ///
    /// A pending override equal to the new type stops being a change.
    /// Newly added members are re-resolved against the resulting effective
    /// type whether or not an override is pending.
    pub fn rebase_group_type(&mut self, initial: GroupType) {
        let effective = self.effective_group_type(initial);
        self.group_type_override = self.group_type_override.filter(|pending| *pending != initial);
        self.resolve_added(effective);
    }

    fn resolve_added(&mut self, group_type: GroupType) {
        for added in self.members_added.values_mut() {
            let is_admin = match group_type {
                GroupType::Simple => true,
                GroupType::Private => false,
                GroupType::ReadOnly | GroupType::Custom { .. } => added.is_admin(),
            };
            added.permissions = resolve_permissions(&group_type, is_admin);
        }
    }

    /// Reconcile against a fresh authoritative snapshot.
    ///
    /// - added members now present in the store stop being additions; if
    ///   the requested admin flag did not make it, an admin change takes
    ///   its place
    /// - removals of identities no longer in the store are dropped
    /// - admin changes of identities no longer in the store are dropped
    pub fn reconcile(&mut self, store: &MemberStore) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let confirmed: Vec<Identity> = self
            .members_added
            .keys()
            .filter(|id| store.contains(id))
            .cloned()
            .collect();
        for identity in confirmed {
            let Some(requested) = self.members_added.remove(&identity) else {
                continue;
            };
            report.confirmed_additions += 1;

            let stored_admin = store.get(&identity).is_some_and(|m| m.is_admin());
            if requested.is_admin() && !stored_admin {
                debug!(member = %identity.short_id(), "Added member confirmed without admin, keeping correction");
                self.admin_changes.insert(identity, true);
                report.admin_corrections += 1;
            }
        }

        let before = self.members_removed.len();
        self.members_removed.retain(|id| store.contains(id));
        report.pruned_removals = before - self.members_removed.len();

        let before = self.admin_changes.len();
        self.admin_changes.retain(|id, _| store.contains(id));
        report.pruned_admin_changes = before - self.admin_changes.len();

        report
    }
}

#[cfg(test)]
mod tests {
    use ensemble_core::PermissionSet;

    use super::*;

    fn id(b: u8) -> Identity {
        Identity::new(vec![b])
    }

    fn member(b: u8, permissions: PermissionSet) -> MemberOrPending {
        MemberOrPending::member(id(b), vec![b], permissions)
    }

    fn store() -> MemberStore {
        MemberStore::with_members(vec![
            member(1, PermissionSet::DEFAULT_ADMIN),
            member(2, PermissionSet::DEFAULT_MEMBER),
        ])
    }

    #[test]
    fn test_add_synthesizes_pending_record() {
        let store = store();
        let mut changes = PendingChangeSet::new();

        assert!(changes.add_member(&store, &GroupType::Private, id(5), b"e".to_vec()));
        let added = &changes.members_added()[&id(5)];
        assert!(added.pending);
        assert_eq!(added.permissions, PermissionSet::DEFAULT_MEMBER);

        assert!(changes.add_member(&store, &GroupType::Simple, id(6), b"f".to_vec()));
        assert_eq!(changes.members_added()[&id(6)].permissions, PermissionSet::DEFAULT_ADMIN);
    }

    #[test]
    fn test_add_existing_member_is_noop() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        assert!(!changes.add_member(&store, &GroupType::Private, id(1), vec![]));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_add_cancels_removal() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        assert!(changes.remove_member(&store, &id(2)));
        assert!(changes.add_member(&store, &GroupType::Private, id(2), vec![2]));
        assert!(changes.members_removed().is_empty());
        assert!(changes.members_added().is_empty());
    }

    #[test]
    fn test_remove_added_member_deselects() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::Private, id(7), vec![7]);
        assert!(changes.remove_member(&store, &id(7)));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_remove_discards_admin_change() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        assert!(changes.set_admin(&store, &GroupType::Private, &id(2), true));
        assert_eq!(changes.admin_changes().get(&id(2)), Some(&true));

        assert!(changes.remove_member(&store, &id(2)));
        assert!(changes.admin_changes().is_empty());
        assert!(!changes.set_admin(&store, &GroupType::Private, &id(2), true));
    }

    #[test]
    fn test_admin_change_back_to_stored_value_is_dropped() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        changes.set_admin(&store, &GroupType::Private, &id(1), false);
        assert_eq!(changes.admin_changes().get(&id(1)), Some(&false));

        assert!(changes.set_admin(&store, &GroupType::Private, &id(1), true));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_admin_toggle_on_added_member() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        let group_type = GroupType::ReadOnly;
        changes.add_member(&store, &group_type, id(8), vec![8]);
        assert_eq!(changes.members_added()[&id(8)].permissions, PermissionSet::EMPTY);

        assert!(changes.set_admin(&store, &group_type, &id(8), true));
        assert_eq!(
            changes.members_added()[&id(8)].permissions,
            resolve_permissions(&group_type, true)
        );
        assert!(changes.admin_changes().is_empty());
    }

    #[test]
    fn test_group_type_change_re_resolves_added() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::Private, id(9), vec![9]);

        assert!(changes.set_group_type(GroupType::Simple, GroupType::Private));
        assert_eq!(changes.group_type_override(), Some(GroupType::Simple));
        assert!(changes.members_added()[&id(9)].is_admin());

        assert!(changes.set_group_type(GroupType::Private, GroupType::Private));
        assert_eq!(changes.group_type_override(), None);
        assert!(!changes.members_added()[&id(9)].is_admin());
        assert!(!changes.set_group_type(GroupType::Private, GroupType::Private));
    }

    #[test]
    fn test_rebase_re_resolves_added_without_override() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::Private, id(5), vec![5]);
        assert_eq!(changes.members_added()[&id(5)].permissions, PermissionSet::DEFAULT_MEMBER);

        changes.rebase_group_type(GroupType::ReadOnly);
        assert_eq!(changes.group_type_override(), None);
        assert_eq!(changes.members_added()[&id(5)].permissions, PermissionSet::EMPTY);
    }

    #[test]
    fn test_rebase_keeps_differing_override() {
        let store = store();
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::Private, id(5), vec![5]);
        changes.set_group_type(GroupType::Simple, GroupType::Private);

        changes.rebase_group_type(GroupType::ReadOnly);
        assert_eq!(changes.group_type_override(), Some(GroupType::Simple));
        assert_eq!(changes.members_added()[&id(5)].permissions, PermissionSet::DEFAULT_ADMIN);
    }

    #[test]
    fn test_reconcile_prunes_applied_removal() {
        let mut store = store();
        let mut changes = PendingChangeSet::new();
        changes.remove_member(&store, &id(2));

        store.refresh(vec![member(1, PermissionSet::DEFAULT_ADMIN)]);
        let report = changes.reconcile(&store);

        assert_eq!(report.pruned_removals, 1);
        assert!(changes.members_removed().is_empty());
    }

    #[test]
    fn test_reconcile_migrates_lost_admin_request() {
        let mut store = store();
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::ReadOnly, id(3), vec![3]);
        changes.set_admin(&store, &GroupType::ReadOnly, &id(3), true);

        store.refresh(vec![
            member(1, PermissionSet::DEFAULT_ADMIN),
            member(2, PermissionSet::DEFAULT_MEMBER),
            member(3, PermissionSet::EMPTY),
        ]);
        let report = changes.reconcile(&store);

        assert_eq!(report.confirmed_additions, 1);
        assert_eq!(report.admin_corrections, 1);
        assert!(changes.members_added().is_empty());
        assert_eq!(changes.admin_changes().get(&id(3)), Some(&true));
    }

    #[test]
    fn test_reconcile_confirmed_member_without_discrepancy() {
        let mut store = store();
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::Private, id(4), vec![4]);

        store.refresh(vec![member(4, PermissionSet::DEFAULT_MEMBER)]);
        let report = changes.reconcile(&store);

        assert_eq!(report.confirmed_additions, 1);
        assert_eq!(report.admin_corrections, 0);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_reconcile_prunes_admin_change_of_departed_member() {
        let mut store = store();
        let mut changes = PendingChangeSet::new();
        changes.set_admin(&store, &GroupType::Private, &id(2), true);

        store.refresh(vec![member(1, PermissionSet::DEFAULT_ADMIN)]);
        let report = changes.reconcile(&store);
        assert_eq!(report.pruned_admin_changes, 1);
        assert!(changes.is_empty());
        assert!(changes.reconcile(&store).is_noop());
    }
}
