//! Recall and group setting events.
//!
//! An `operator` of `None` means the bot did it. Setting changes carry the
//! value before (`origin`) and after (`current`).

use serde::{Deserialize, Serialize};

use crate::types::{Group, Member};

// ============================================================================
// Recall
// ============================================================================

/// A group message was recalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecallEvent {
    /// Sender of the recalled message.
    pub author_id: i64,
    pub message_id: i32,
    /// When the recalled message was sent.
    pub time: i32,
    pub group: Group,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// A friend message was recalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRecallEvent {
    pub author_id: i64,
    pub message_id: i32,
    pub time: i32,
    /// QQ of whoever recalled it.
    pub operator: i64,
}

// ============================================================================
// Group Settings
// ============================================================================

/// The group was renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNameChangeEvent {
    pub origin: String,
    pub current: String,
    pub group: Group,
    pub is_by_bot: bool,
}

/// The entrance announcement changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntranceAnnouncementChangeEvent {
    pub origin: String,
    pub current: String,
    pub group: Group,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// Mute-all was switched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMuteAllEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// Anonymous chat was switched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAllowAnonymousChatEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// Confess talk was switched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAllowConfessTalkEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    pub is_by_bot: bool,
}

/// Member invitations were switched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAllowMemberInviteEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    #[serde(default)]
    pub operator: Option<Member>,
}
