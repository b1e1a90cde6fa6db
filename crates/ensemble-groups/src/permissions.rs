//! Permission resolution for group types

use ensemble_core::{GroupType, PermissionSet, RemoteDeleteSetting};

/// Permissions a member receives under a group type.
///
/// Used both when synthesizing a newly added member and when compiling the
/// wire diff; both call sites must agree bit for bit.
pub fn resolve_permissions(group_type: &GroupType, is_admin: bool) -> PermissionSet {
    match group_type {
        GroupType::Simple => PermissionSet::DEFAULT_ADMIN,
        GroupType::Private => {
            if is_admin {
                PermissionSet::DEFAULT_ADMIN
            } else {
                PermissionSet::DEFAULT_MEMBER
            }
        }
        GroupType::ReadOnly => {
            if is_admin {
                PermissionSet::DEFAULT_ADMIN
            } else {
                PermissionSet::EMPTY
            }
        }
        GroupType::Custom {
            read_only,
            remote_delete,
        } => {
            let base = if is_admin {
                PermissionSet::DEFAULT_ADMIN
            } else if *read_only {
                PermissionSet::EMPTY
            } else {
                PermissionSet::DEFAULT_MEMBER
            };
            let may_delete = match remote_delete {
                RemoteDeleteSetting::Everyone => true,
                RemoteDeleteSetting::Admins => is_admin,
                RemoteDeleteSetting::Nobody => false,
            };
            base.with_remote_delete_anything(may_delete)
        }
    }
}

/// Admin and member permission sets for a group type.
pub fn admin_and_member_permissions(group_type: &GroupType) -> (PermissionSet, PermissionSet) {
    (
        resolve_permissions(group_type, true),
        resolve_permissions(group_type, false),
    )
}
