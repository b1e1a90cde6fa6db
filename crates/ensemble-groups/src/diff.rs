//! Change-set to wire-diff compilation
//!
//! Turns the pending edits plus the stored member list into the minimal
//! update handed to the group engine. Compilation is a pure function: the
//! same inputs always give an equal [`WireDiff`].

use std::collections::{BTreeMap, BTreeSet};

use ensemble_core::{GroupType, Identity, PermissionSet};
use serde::{Deserialize, Serialize};

use crate::changeset::PendingChangeSet;
use crate::error::GroupsResult;
use crate::permissions::admin_and_member_permissions;
use crate::store::MemberStore;

/// Group update submitted to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDiff {
    /// New members and the permissions they start with.
    pub added_members_with_permissions: BTreeMap<Identity, PermissionSet>,
    /// Members to remove.
    pub removed_members: BTreeSet<Identity>,
    /// Full target permission set for every member whose permissions change.
    pub permission_changes: BTreeMap<Identity, PermissionSet>,
    /// JSON encoding of the new group type, when it changed.
    pub updated_group_type: Option<String>,
}

impl WireDiff {
    /// Whether the diff carries no change at all
    pub fn is_empty(&self) -> bool {
        self.added_members_with_permissions.is_empty()
            && self.removed_members.is_empty()
            && self.permission_changes.is_empty()
            && self.updated_group_type.is_none()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }
}

/// Compile pending edits into a wire diff.
///
/// Existing members are checked against the permissions their (possibly
/// edited) admin status calls for under `group_type`; any mismatch emits the
/// full expected set. Private groups force every existing member to
/// non-admin and simple groups force admin.
///
/// Whenever the diff is non-empty the own identity is given the full admin
/// permission set, even if it already holds it. This is policy, not a
/// derived invariant: the local user re-asserts its own rights on every
/// group edit. Keep it even where it looks redundant.
pub fn compile_diff(
    changes: &PendingChangeSet,
    store: &MemberStore,
    group_type: &GroupType,
    initial_group_type: &GroupType,
    own_identity: &Identity,
) -> GroupsResult<WireDiff> {
    let (admin_permissions, member_permissions) = admin_and_member_permissions(group_type);
    let mut diff = WireDiff::default();

    for (identity, added) in changes.members_added() {
        let permissions = if added.is_admin() {
            admin_permissions
        } else {
            member_permissions
        };
        diff.added_members_with_permissions
            .insert(identity.clone(), permissions);
    }

    diff.removed_members
        .extend(changes.members_removed().iter().cloned());

    for member in store.members() {
        if changes.members_removed().contains(&member.identity) {
            continue;
        }
        let is_admin = match group_type {
            GroupType::Private => false,
            GroupType::Simple => true,
            GroupType::ReadOnly | GroupType::Custom { .. } => changes
                .admin_changes()
                .get(&member.identity)
                .copied()
                .unwrap_or(member.is_admin()),
        };
        let expected = if is_admin {
            admin_permissions
        } else {
            member_permissions
        };
        if member.permissions != expected {
            diff.permission_changes
                .insert(member.identity.clone(), expected);
        }
    }

    if group_type != initial_group_type {
        diff.updated_group_type = Some(group_type.to_json()?);
    }

    if !diff.is_empty() {
        diff.permission_changes
            .insert(own_identity.clone(), admin_permissions);
    }

    Ok(diff)
}

#[cfg(test)]
mod tests {
    use ensemble_core::{MemberOrPending, RemoteDeleteSetting};

    use super::*;
    use crate::permissions::resolve_permissions;

    fn id(b: u8) -> Identity {
        Identity::new(vec![b])
    }

    fn own() -> Identity {
        id(0xee)
    }

    fn member(b: u8, permissions: PermissionSet) -> MemberOrPending {
        MemberOrPending::member(id(b), vec![b], permissions)
    }

    #[test]
    fn test_no_changes_consistent_group_is_empty() {
        let store = MemberStore::with_members(vec![
            member(1, PermissionSet::DEFAULT_ADMIN),
            member(2, PermissionSet::EMPTY),
        ]);
        let changes = PendingChangeSet::new();
        let diff = compile_diff(&changes, &store, &GroupType::ReadOnly, &GroupType::ReadOnly, &own()).unwrap();
        assert!(diff.is_empty());
        assert!(!diff.permission_changes.contains_key(&own()));
    }

    #[test]
    fn test_simple_group_promotes_non_admin() {
        let store = MemberStore::with_members(vec![member(1, PermissionSet::DEFAULT_MEMBER)]);
        let changes = PendingChangeSet::new();
        let diff = compile_diff(&changes, &store, &GroupType::Simple, &GroupType::Simple, &own()).unwrap();

        assert_eq!(diff.permission_changes.len(), 2);
        assert_eq!(diff.permission_changes[&id(1)], PermissionSet::DEFAULT_ADMIN);
        assert_eq!(diff.permission_changes[&own()], PermissionSet::DEFAULT_ADMIN);
        assert!(diff.updated_group_type.is_none());
    }

    #[test]
    fn test_private_group_demotes_admin() {
        let store = MemberStore::with_members(vec![member(1, PermissionSet::DEFAULT_ADMIN)]);
        let changes = PendingChangeSet::new();
        let diff = compile_diff(&changes, &store, &GroupType::Private, &GroupType::Private, &own()).unwrap();
        assert_eq!(diff.permission_changes[&id(1)], PermissionSet::DEFAULT_MEMBER);
    }

    #[test]
    fn test_added_removed_and_type_change() {
        let store = MemberStore::with_members(vec![
            member(1, PermissionSet::DEFAULT_ADMIN),
            member(2, PermissionSet::EMPTY),
        ]);
        let custom = GroupType::Custom {
            read_only: true,
            remote_delete: RemoteDeleteSetting::Nobody,
        };
        let mut changes = PendingChangeSet::new();
        changes.set_group_type(custom, GroupType::ReadOnly);
        changes.add_member(&store, &custom, id(3), vec![3]);
        changes.set_admin(&store, &custom, &id(3), true);
        changes.remove_member(&store, &id(2));

        let diff = compile_diff(&changes, &store, &custom, &GroupType::ReadOnly, &own()).unwrap();

        assert_eq!(diff.added_members_with_permissions[&id(3)], resolve_permissions(&custom, true));
        assert_eq!(diff.removed_members, BTreeSet::from([id(2)]));
        // Admin under custom/nobody loses remote-delete-anything
        assert_eq!(
            diff.permission_changes[&id(1)],
            PermissionSet::DEFAULT_ADMIN.with_remote_delete_anything(false)
        );
        assert_eq!(
            diff.updated_group_type.as_deref(),
            Some(r#"{"type":"custom","ro":true,"del":"nobody"}"#)
        );
        assert_eq!(diff.permission_changes[&own()], resolve_permissions(&custom, true));
    }

    #[test]
    fn test_admin_change_emits_full_set() {
        let store = MemberStore::with_members(vec![member(1, PermissionSet::EMPTY)]);
        let mut changes = PendingChangeSet::new();
        changes.set_admin(&store, &GroupType::ReadOnly, &id(1), true);

        let diff = compile_diff(&changes, &store, &GroupType::ReadOnly, &GroupType::ReadOnly, &own()).unwrap();
        assert_eq!(diff.permission_changes[&id(1)], PermissionSet::DEFAULT_ADMIN);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let store = MemberStore::with_members(vec![member(1, PermissionSet::DEFAULT_MEMBER)]);
        let mut changes = PendingChangeSet::new();
        changes.add_member(&store, &GroupType::Private, id(4), vec![4]);

        let first = compile_diff(&changes, &store, &GroupType::Private, &GroupType::Private, &own()).unwrap();
        let second = compile_diff(&changes, &store, &GroupType::Private, &GroupType::Private, &own()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_wire_diff_bytes() {
        let mut diff = WireDiff::default();
        diff.removed_members.insert(id(9));
        diff.updated_group_type = Some(GroupType::Simple.to_json().unwrap());

        let bytes = diff.to_bytes().unwrap();
        assert_eq!(WireDiff::from_bytes(&bytes).unwrap(), diff);
    }
}
