//! Group permission templates
//!
//! A [`GroupType`] decides which permissions admins and regular members
//! receive. Its wire form is a small JSON object:
//!
//! ```json
//! {"type":"custom","ro":false,"del":"admins"}
//! ```
//!
//! `ro` and `del` are only present for custom groups.

use serde::{Deserialize, Serialize};

use crate::error::GroupTypeError;
use crate::member::MemberOrPending;
use crate::permissions::PermissionSet;

/// Who may remotely delete any message in a custom group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteDeleteSetting {
    /// Nobody.
    Nobody,
    /// Admins only.
    Admins,
    /// Every member.
    Everyone,
}

/// Permission template of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "JsonGroupType", into = "JsonGroupType")]
pub enum GroupType {
    /// Everyone is an admin.
    Simple,
    /// Admins manage the group, members chat.
    Private,
    /// Only admins may post.
    ReadOnly,
    /// Explicit settings.
    Custom {
        /// Regular members may not post.
        read_only: bool,
        /// Who may remotely delete any message.
        remote_delete: RemoteDeleteSetting,
    },
}

impl GroupType {
    /// Whether regular members are barred from posting.
    pub fn is_read_only(&self) -> bool {
        match self {
            GroupType::ReadOnly => true,
            GroupType::Custom { read_only, .. } => *read_only,
            GroupType::Simple | GroupType::Private => false,
        }
    }

    /// Encode as the JSON wire form.
    pub fn to_json(&self) -> Result<String, GroupTypeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, GroupTypeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Guess the template of a group whose engine reports no explicit type.
    ///
    /// Looks only at the permissions members currently hold.
    pub fn infer(members: &[MemberOrPending]) -> Self {
        let (admins, regulars): (Vec<_>, Vec<_>) =
            members.iter().map(|m| m.permissions).partition(|p| p.admin);

        if regulars.is_empty() {
            return GroupType::Simple;
        }

        if regulars.iter().all(|p| !p.send_message) {
            return GroupType::ReadOnly;
        }

        if regulars.iter().all(|p| *p == PermissionSet::DEFAULT_MEMBER)
            && admins.iter().all(|p| *p == PermissionSet::DEFAULT_ADMIN)
        {
            return GroupType::Private;
        }

        let remote_delete = if regulars.iter().any(|p| p.remote_delete_anything) {
            RemoteDeleteSetting::Everyone
        } else {
            RemoteDeleteSetting::Admins
        };
        GroupType::Custom {
            read_only: false,
            remote_delete,
        }
    }
}

/// Wire representation of a [`GroupType`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct JsonGroupType {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ro: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    del: Option<RemoteDeleteSetting>,
}

impl From<GroupType> for JsonGroupType {
    fn from(group_type: GroupType) -> Self {
        let (kind, ro, del) = match group_type {
            GroupType::Simple => ("simple", None, None),
            GroupType::Private => ("private", None, None),
            GroupType::ReadOnly => ("read_only", None, None),
            GroupType::Custom {
                read_only,
                remote_delete,
            } => ("custom", Some(read_only), Some(remote_delete)),
        };
        Self {
            kind: kind.to_string(),
            ro,
            del,
        }
    }
}

impl TryFrom<JsonGroupType> for GroupType {
    type Error = GroupTypeError;

    fn try_from(json: JsonGroupType) -> Result<Self, Self::Error> {
        match json.kind.as_str() {
            "simple" => Ok(GroupType::Simple),
            "private" => Ok(GroupType::Private),
            "read_only" => Ok(GroupType::ReadOnly),
            "custom" => Ok(GroupType::Custom {
                read_only: json.ro.ok_or(GroupTypeError::MissingField("ro"))?,
                remote_delete: json.del.ok_or(GroupTypeError::MissingField("del"))?,
            }),
            other => Err(GroupTypeError::UnknownType(other.to_string())),
        }
    }
}
