//! Effective membership projection
//!
//! Computes the member list the group details screen should render.

use ensemble_core::{GroupType, MemberOrPending, sort_members};

use crate::changeset::PendingChangeSet;
use crate::store::MemberStore;

/// Apply pending edits on top of the stored list.
///
/// Removed members are dropped, admin changes are applied (send permission
/// recomputed from the group type), added members are appended, and the
/// result is sorted by sort key.
pub fn project_members(
    store: &MemberStore,
    changes: &PendingChangeSet,
    group_type: &GroupType,
) -> Vec<MemberOrPending> {
    let read_only = group_type.is_read_only();

    let mut projected: Vec<MemberOrPending> = store
        .members()
        .iter()
        .filter(|m| !changes.members_removed().contains(&m.identity))
        .map(|m| match changes.admin_changes().get(&m.identity) {
            Some(&is_admin) => {
                let mut replacement = m.clone();
                replacement.permissions.admin = is_admin;
                replacement.permissions.send_message = !read_only;
                replacement
            }
            None => m.clone(),
        })
        .collect();

    projected.extend(changes.members_added().values().cloned());
    sort_members(&mut projected);
    projected
}

/// The list to display outside of edit mode: the stored list, sorted.
pub fn stored_members(store: &MemberStore) -> Vec<MemberOrPending> {
    let mut members = store.members().to_vec();
    sort_members(&mut members);
    members
}
