//! Group member records

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::permissions::PermissionSet;

/// One group member, or an invited identity that has not joined yet.
///
/// Records come from the persistent member list and are replaced wholesale
/// on every refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberOrPending {
    /// Member identity.
    pub identity: Identity,
    /// Invited but not yet joined.
    #[serde(default)]
    pub pending: bool,
    /// Key used for display ordering.
    #[serde(default)]
    pub sort_key: Vec<u8>,
    /// Permissions currently granted.
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl MemberOrPending {
    /// Create a joined member record.
    pub fn member(identity: Identity, sort_key: impl Into<Vec<u8>>, permissions: PermissionSet) -> Self {
        Self {
            identity,
            pending: false,
            sort_key: sort_key.into(),
            permissions,
        }
    }

    /// Create a pending (invited) member record.
    pub fn pending(identity: Identity, sort_key: impl Into<Vec<u8>>, permissions: PermissionSet) -> Self {
        Self {
            identity,
            pending: true,
            sort_key: sort_key.into(),
            permissions,
        }
    }

    /// Whether this member holds the admin flag.
    pub fn is_admin(&self) -> bool {
        self.permissions.admin
    }

    /// Order two records by sort key.
    ///
    /// Bytes compare as unsigned values; on a shared prefix the shorter key
    /// sorts first.
    pub fn compare_sort_key(&self, other: &Self) -> Ordering {
        self.sort_key.as_slice().cmp(other.sort_key.as_slice())
    }
}

/// Stable sort of member records by sort key.
pub fn sort_members(members: &mut [MemberOrPending]) {
    members.sort_by(MemberOrPending::compare_sort_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u8, key: &[u8]) -> MemberOrPending {
        MemberOrPending::member(Identity::new(vec![id]), key.to_vec(), PermissionSet::DEFAULT_MEMBER)
    }

    #[test]
    fn test_sort_key_is_unsigned() {
        let a = record(1, &[0x7f]);
        let b = record(2, &[0x80]);
        assert_eq!(a.compare_sort_key(&b), Ordering::Less);
    }

    #[test]
    fn test_shorter_prefix_sorts_first() {
        let a = record(1, b"al");
        let b = record(2, b"alice");
        assert_eq!(a.compare_sort_key(&b), Ordering::Less);
        assert_eq!(b.compare_sort_key(&a), Ordering::Greater);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut members = vec![record(3, b"b"), record(1, b"a"), record(2, b"b")];
        sort_members(&mut members);
        let ids: Vec<u8> = members.iter().map(|m| m.identity.as_bytes()[0]).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_pending_constructor() {
        let m = MemberOrPending::pending(Identity::new(vec![9]), b"z".to_vec(), PermissionSet::EMPTY);
        assert!(m.pending);
        assert!(!m.is_admin());
    }
}
