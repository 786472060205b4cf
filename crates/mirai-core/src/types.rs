//! Entity snapshots shared by events and session responses.

use serde::{Deserialize, Serialize};

/// Whether a target is a friend or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// A friend.
    Friend,
    /// A group.
    Group,
}

/// Permission of a member within a group.
///
/// Ordered by privilege: `Member < Administrator < Owner`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    /// Ordinary member.
    #[default]
    Member,
    /// Group administrator.
    Administrator,
    /// Group owner.
    Owner,
}

/// A group, with the bot's permission in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group number.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Permission of the bot in this group.
    pub permission: Permission,
}

/// A member of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// QQ of the member.
    pub id: i64,
    /// Group card, or nickname when no card is set.
    pub member_name: String,
    /// Permission of the member.
    pub permission: Permission,
    /// The group the member belongs to.
    pub group: Group,
}

/// A friend of the bot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    /// QQ of the friend.
    pub id: i64,
    /// Nickname.
    pub nickname: String,
    /// Remark set by the bot.
    pub remark: String,
}

/// Group settings. Unset fields are left unchanged when written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Entrance announcement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confess_talk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_member_invite: Option<bool>,
    /// Approve join requests automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_approve: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_chat: Option<bool>,
}

/// Card and special title of a member. Unset fields are left unchanged when
/// written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    /// Group card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_title: Option<String>,
}

/// Per-session server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Number of messages cached for `messageFromId` lookups.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default)]
    pub enable_websocket: bool,
}

fn default_cache_size() -> usize {
    4096
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            enable_websocket: false,
        }
    }
}
