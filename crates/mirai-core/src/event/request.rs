//! Request events and their responses.
//!
//! Each request is answered once through the session, which posts the body
//! built by `response()` together with the session key:
//!
//! | Event | Endpoint | Decisions (`operate`) |
//! |-------|----------|-----------------------|
//! | `NewFriendRequestEvent` | `/resp/newFriendRequestEvent` | accept 0, refuse 1, refuse and block 2 |
//! | `MemberJoinRequestEvent` | `/resp/memberJoinRequestEvent` | accept 0, refuse 1, ignore 2, refuse and block 3, ignore and block 4 |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::json;

use crate::wire::Value;

// ============================================================================
// NewFriendRequestEvent
// ============================================================================

/// Someone asked to befriend the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFriendRequestEvent {
    pub event_id: i64,
    /// QQ of the requester.
    pub from_id: i64,
    /// The group the requester found the bot through, if any.
    #[serde(default, with = "zero_as_none")]
    pub group_id: Option<i64>,
    pub nick: String,
    /// Verification message.
    #[serde(default)]
    pub message: String,
}

/// Answer to a [`NewFriendRequestEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewFriendDecision {
    Accept,
    Refuse,
    RefuseAndBlock,
}

impl NewFriendDecision {
    /// The `operate` code.
    pub const fn operate(self) -> i32 {
        match self {
            Self::Accept => 0,
            Self::Refuse => 1,
            Self::RefuseAndBlock => 2,
        }
    }
}

impl NewFriendRequestEvent {
    /// Response body, without the session key.
    pub fn response(&self, decision: NewFriendDecision, message: &str) -> Value {
        json!({
            "eventId": self.event_id,
            "fromId": self.from_id,
            "groupId": self.group_id.unwrap_or(0),
            "operate": decision.operate(),
            "message": message,
        })
    }
}

// ============================================================================
// MemberJoinRequestEvent
// ============================================================================

/// Someone asked to join a group the bot administers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberJoinRequestEvent {
    pub event_id: i64,
    pub from_id: i64,
    pub group_id: i64,
    pub group_name: String,
    pub nick: String,
    #[serde(default)]
    pub message: String,
}

/// Answer to a [`MemberJoinRequestEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberJoinDecision {
    Accept,
    Refuse,
    /// Leave the request pending for other administrators.
    Ignore,
    RefuseAndBlock,
    IgnoreAndBlock,
}

impl MemberJoinDecision {
    /// The `operate` code.
    pub const fn operate(self) -> i32 {
        match self {
            Self::Accept => 0,
            Self::Refuse => 1,
            Self::Ignore => 2,
            Self::RefuseAndBlock => 3,
            Self::IgnoreAndBlock => 4,
        }
    }
}

impl MemberJoinRequestEvent {
    /// Response body, without the session key.
    pub fn response(&self, decision: MemberJoinDecision, message: &str) -> Value {
        json!({
            "eventId": self.event_id,
            "fromId": self.from_id,
            "groupId": self.group_id,
            "operate": decision.operate(),
            "message": message,
        })
    }
}

// The server sends `groupId: 0` when a friend request came from no group.
mod zero_as_none {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        value.unwrap_or(0).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.filter(|id| *id != 0))
    }
}
