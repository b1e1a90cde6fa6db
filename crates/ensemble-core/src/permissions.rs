//! Group member permission flags

use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability flags granted to a group member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionSet {
    /// Member is a group administrator.
    pub admin: bool,
    /// Member may post messages.
    pub send_message: bool,
    /// Member may remotely delete any message in the group.
    pub remote_delete_anything: bool,
    /// Member may change group settings.
    pub change_settings: bool,
    /// Member may edit or remotely delete their own messages.
    pub edit_or_remote_delete_own_messages: bool,
}

impl PermissionSet {
    /// No capability at all.
    pub const EMPTY: Self = Self {
        admin: false,
        send_message: false,
        remote_delete_anything: false,
        change_settings: false,
        edit_or_remote_delete_own_messages: false,
    };

    /// Every capability.
    pub const DEFAULT_ADMIN: Self = Self {
        admin: true,
        send_message: true,
        remote_delete_anything: true,
        change_settings: true,
        edit_or_remote_delete_own_messages: true,
    };

    /// A regular member: post and manage own messages.
    pub const DEFAULT_MEMBER: Self = Self {
        admin: false,
        send_message: true,
        remote_delete_anything: false,
        change_settings: false,
        edit_or_remote_delete_own_messages: true,
    };

    /// Return a copy with the remote-delete-anything bit set or cleared.
    pub fn with_remote_delete_anything(mut self, enabled: bool) -> Self {
        self.remote_delete_anything = enabled;
        self
    }

    /// Whether no capability is granted.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.admin, "admin"),
            (self.send_message, "send"),
            (self.remote_delete_anything, "delete-any"),
            (self.change_settings, "settings"),
            (self.edit_or_remote_delete_own_messages, "edit-own"),
        ];
        let names: Vec<&str> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", names.join(","))
    }
}
