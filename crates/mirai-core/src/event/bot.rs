//! Events about the bot account itself.
//!
//! ```text
//! BotOnlineEvent              { qq }
//! BotOfflineEventActive       { qq }     logged out on purpose
//! BotOfflineEventForce        { qq }     kicked by another login
//! BotOfflineEventDropped      { qq }     network loss
//! BotReloginEvent             { qq }
//! BotGroupPermissionChangeEvent { origin, current, group }
//! BotMuteEvent                { durationSeconds, operator }
//! BotUnmuteEvent              { operator }
//! BotJoinGroupEvent           { group }
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Group, Member, Permission};

// ============================================================================
// Login State
// ============================================================================

/// The bot logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotOnlineEvent {
    pub qq: i64,
}

/// The bot logged out on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotOfflineEventActive {
    pub qq: i64,
}

/// The bot was forced offline by a login elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotOfflineEventForce {
    pub qq: i64,
}

/// The bot dropped off the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotOfflineEventDropped {
    pub qq: i64,
}

/// The bot logged in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReloginEvent {
    pub qq: i64,
}

// ============================================================================
// Group Standing
// ============================================================================

/// The bot's permission in a group changed. The operator is always the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotGroupPermissionChangeEvent {
    pub origin: Permission,
    pub current: Permission,
    pub group: Group,
}

/// The bot was muted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotMuteEvent {
    pub duration_seconds: i32,
    pub operator: Member,
}

/// The bot was unmuted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotUnmuteEvent {
    pub operator: Member,
}

/// The bot joined a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotJoinGroupEvent {
    pub group: Group,
}
