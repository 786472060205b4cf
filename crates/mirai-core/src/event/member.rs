//! Membership and member state events.
//!
//! An `operator` of `None` means the bot did it.

use serde::{Deserialize, Serialize};

use crate::types::{Member, Permission};

// ============================================================================
// Join / Leave
// ============================================================================

/// Someone joined a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberJoinEvent {
    pub member: Member,
}

/// A member was kicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLeaveEventKick {
    pub member: Member,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// A member left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLeaveEventQuit {
    pub member: Member,
}

// ============================================================================
// Member State
// ============================================================================

/// A group card changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCardChangeEvent {
    pub origin: String,
    pub current: String,
    pub member: Member,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// A special title changed. Only the owner can do this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpecialTitleChangeEvent {
    pub origin: String,
    pub current: String,
    pub member: Member,
}

/// A member's permission changed. Only the owner can do this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPermissionChangeEvent {
    pub origin: Permission,
    pub current: Permission,
    pub member: Member,
}

/// A member was muted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMuteEvent {
    pub duration_seconds: i32,
    pub member: Member,
    #[serde(default)]
    pub operator: Option<Member>,
}

/// A member was unmuted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUnmuteEvent {
    pub member: Member,
    #[serde(default)]
    pub operator: Option<Member>,
}
