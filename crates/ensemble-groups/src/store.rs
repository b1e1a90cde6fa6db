//! Authoritative member list snapshot

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use ensemble_core::{Identity, MemberOrPending};

/// The latest member list delivered by the persistent source.
///
/// Replaced wholesale on every refresh. Keeps the delivery order for display
/// and an identity index for lookups.
#[derive(Debug, Clone, Default)]
pub struct MemberStore {
    /// Records in delivery order
    members: Vec<MemberOrPending>,
    /// Identity to position in `members`
    index: BTreeMap<Identity, usize>,
    /// When the last snapshot arrived
    refreshed_at: Option<DateTime<Utc>>,
}

impl MemberStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an initial snapshot
    pub fn with_members(members: Vec<MemberOrPending>) -> Self {
        let mut store = Self::new();
        store.refresh(members);
        store
    }

    /// Replace the snapshot
    ///
    /// Returns the identities that were present before and are gone now.
    /// A later duplicate of an identity replaces the earlier record.
    pub fn refresh(&mut self, members: Vec<MemberOrPending>) -> BTreeSet<Identity> {
        let previous: BTreeSet<Identity> = std::mem::take(&mut self.index).into_keys().collect();

        let mut deduped: Vec<MemberOrPending> = Vec::with_capacity(members.len());
        for member in members {
            match self.index.get(&member.identity) {
                Some(&pos) => deduped[pos] = member,
                None => {
                    self.index.insert(member.identity.clone(), deduped.len());
                    deduped.push(member);
                }
            }
        }
        self.members = deduped;
        self.refreshed_at = Some(Utc::now());

        previous
            .into_iter()
            .filter(|id| !self.index.contains_key(id))
            .collect()
    }

    /// Look up a record
    pub fn get(&self, identity: &Identity) -> Option<&MemberOrPending> {
        self.index.get(identity).map(|&pos| &self.members[pos])
    }

    /// Whether an identity is present
    pub fn contains(&self, identity: &Identity) -> bool {
        self.index.contains_key(identity)
    }

    /// All records in delivery order
    pub fn members(&self) -> &[MemberOrPending] {
        &self.members
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// When the last snapshot arrived (None before the first one)
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}
