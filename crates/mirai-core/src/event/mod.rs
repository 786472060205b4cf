//! Bot events.
//!
//! Every event arrives as one JSON object whose `type` names the kind:
//!
//! ```text
//! Event
//! ├── message   GroupMessage, FriendMessage, TempMessage
//! ├── bot       BotOnlineEvent, BotOffline*, BotReloginEvent,
//! │             BotGroupPermissionChangeEvent, BotMuteEvent,
//! │             BotUnmuteEvent, BotJoinGroupEvent
//! ├── group     GroupRecallEvent, FriendRecallEvent, Group*ChangeEvent,
//! │             GroupMuteAllEvent, GroupAllow*Event
//! ├── member    MemberJoinEvent, MemberLeaveEvent*, Member*ChangeEvent,
//! │             MemberMuteEvent, MemberUnmuteEvent
//! └── request   NewFriendRequestEvent, MemberJoinRequestEvent
//! ```
//!
//! # Handling events
//!
//! ```rust,ignore
//! use mirai_core::{Event, GroupMessage, VariantWrapper};
//!
//! fn on_event(event: Event) {
//!     event.dispatch(|msg: &GroupMessage| {
//!         if msg.message_chain.content.starts_with("/ping") {
//!             // reply in msg.sender.group
//!         }
//!     });
//! }
//! ```

pub mod bot;
pub mod group;
pub mod member;
pub mod message;
pub mod request;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use bot::*;
pub use group::*;
pub use member::*;
pub use message::*;
pub use request::*;

use crate::VariantWrapper;
use crate::error::{DecodeError, DecodeResult};
use crate::received::ReceivedMessage;
use crate::wire::{self, TaggedWire, Value};

// ============================================================================
// Event Enum
// ============================================================================

/// Any event the server can push or return from a poll.
#[derive(Debug, Clone, PartialEq, VariantWrapper)]
#[variant(kind = "EventKind", wire)]
pub enum Event {
    GroupMessage(GroupMessage),
    FriendMessage(FriendMessage),
    TempMessage(TempMessage),

    #[variant(tag = "BotOnlineEvent")]
    BotOnline(BotOnlineEvent),
    #[variant(tag = "BotOfflineEventActive")]
    BotOfflineActive(BotOfflineEventActive),
    #[variant(tag = "BotOfflineEventForce")]
    BotOfflineForce(BotOfflineEventForce),
    #[variant(tag = "BotOfflineEventDropped")]
    BotOfflineDropped(BotOfflineEventDropped),
    #[variant(tag = "BotReloginEvent")]
    BotRelogin(BotReloginEvent),

    #[variant(tag = "GroupRecallEvent")]
    GroupRecall(GroupRecallEvent),
    #[variant(tag = "FriendRecallEvent")]
    FriendRecall(FriendRecallEvent),

    #[variant(tag = "BotGroupPermissionChangeEvent")]
    BotGroupPermissionChange(BotGroupPermissionChangeEvent),
    #[variant(tag = "BotMuteEvent")]
    BotMute(BotMuteEvent),
    #[variant(tag = "BotUnmuteEvent")]
    BotUnmute(BotUnmuteEvent),
    #[variant(tag = "BotJoinGroupEvent")]
    BotJoinGroup(BotJoinGroupEvent),

    #[variant(tag = "GroupNameChangeEvent")]
    GroupNameChange(GroupNameChangeEvent),
    #[variant(tag = "GroupEntranceAnnouncementChangeEvent")]
    GroupEntranceAnnouncementChange(GroupEntranceAnnouncementChangeEvent),
    #[variant(tag = "GroupMuteAllEvent")]
    GroupMuteAll(GroupMuteAllEvent),
    #[variant(tag = "GroupAllowAnonymousChatEvent")]
    GroupAllowAnonymousChat(GroupAllowAnonymousChatEvent),
    #[variant(tag = "GroupAllowConfessTalkEvent")]
    GroupAllowConfessTalk(GroupAllowConfessTalkEvent),
    #[variant(tag = "GroupAllowMemberInviteEvent")]
    GroupAllowMemberInvite(GroupAllowMemberInviteEvent),

    #[variant(tag = "MemberJoinEvent")]
    MemberJoin(MemberJoinEvent),
    #[variant(tag = "MemberLeaveEventKick")]
    MemberLeaveKick(MemberLeaveEventKick),
    #[variant(tag = "MemberLeaveEventQuit")]
    MemberLeaveQuit(MemberLeaveEventQuit),
    #[variant(tag = "MemberCardChangeEvent")]
    MemberCardChange(MemberCardChangeEvent),
    #[variant(tag = "MemberSpecialTitleChangeEvent")]
    MemberSpecialTitleChange(MemberSpecialTitleChangeEvent),
    #[variant(tag = "MemberPermissionChangeEvent")]
    MemberPermissionChange(MemberPermissionChangeEvent),
    #[variant(tag = "MemberMuteEvent")]
    MemberMute(MemberMuteEvent),
    #[variant(tag = "MemberUnmuteEvent")]
    MemberUnmute(MemberUnmuteEvent),

    #[variant(tag = "NewFriendRequestEvent")]
    NewFriendRequest(NewFriendRequestEvent),
    #[variant(tag = "MemberJoinRequestEvent")]
    MemberJoinRequest(MemberJoinRequestEvent),
}

impl Event {
    /// Decodes one event object.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnknownEventKind`] for an unrecognized `type`, and the
    /// usual field errors otherwise.
    pub fn decode(value: &Value) -> DecodeResult<Self> {
        let tag = wire::type_tag(value)?;
        let kind =
            EventKind::from_tag(tag).ok_or_else(|| DecodeError::UnknownEventKind(tag.to_string()))?;
        match kind {
            EventKind::GroupMessage => GroupMessage::decode(value).map(Event::GroupMessage),
            EventKind::FriendMessage => FriendMessage::decode(value).map(Event::FriendMessage),
            EventKind::TempMessage => TempMessage::decode(value).map(Event::TempMessage),
            _ => Self::decode_kind(kind, value),
        }
    }

    /// Decodes a JSON array of events, as returned by the polling endpoints.
    pub fn decode_all(value: &Value) -> DecodeResult<Vec<Self>> {
        wire::array(value)?.iter().map(Self::decode).collect()
    }

    /// The received message of a message event.
    pub fn message(&self) -> Option<&ReceivedMessage> {
        match self {
            Event::GroupMessage(e) => Some(&e.message_chain),
            Event::FriendMessage(e) => Some(&e.message_chain),
            Event::TempMessage(e) => Some(&e.message_chain),
            _ => None,
        }
    }

    /// Whether this is one of the message kinds.
    pub fn is_message(&self) -> bool {
        self.message().is_some()
    }
}

impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.encode().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Event::decode(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Quote, Segment, Source};
    use crate::stringified::StringifiedMessage;
    use crate::types::{Friend, Group, Member, Permission};
    use crate::variant::VariantKind;
    use serde_json::json;

    fn group() -> Value {
        json!({ "id": 12345, "name": "group", "permission": "MEMBER" })
    }

    fn member(id: i64) -> Value {
        json!({ "id": id, "memberName": "nick", "permission": "ADMINISTRATOR", "group": group() })
    }

    #[test]
    fn test_decode_group_message() {
        let event = Event::decode(&json!({
            "type": "GroupMessage",
            "messageChain": [
                { "type": "Source", "id": 100, "time": 1 },
                { "type": "Plain", "text": "/ping" }
            ],
            "sender": member(42)
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::GroupMessage);
        assert!(event.is_message());
        assert_eq!(event.message().unwrap().id(), 100);
        let msg = event.get::<GroupMessage>().unwrap();
        assert_eq!(msg.sender.permission, Permission::Administrator);
        assert_eq!(msg.message_chain.content.chain(), [Segment::plain("/ping")]);
    }

    #[test]
    fn test_decode_notifications() {
        let recall = Event::decode(&json!({
            "type": "GroupRecallEvent",
            "authorId": 1, "messageId": 2, "time": 3,
            "group": group(),
            "operator": null
        }))
        .unwrap();
        assert!(!recall.is_message());
        assert_eq!(recall.get::<GroupRecallEvent>().unwrap().operator, None);

        let kick = Event::decode(&json!({
            "type": "MemberLeaveEventKick",
            "member": member(1),
            "operator": member(2)
        }))
        .unwrap();
        assert_eq!(
            kick.get_if::<MemberLeaveEventKick>()
                .and_then(|e| e.operator.as_ref())
                .map(|m| m.id),
            Some(2)
        );

        let offline = Event::decode(&json!({ "type": "BotOfflineEventDropped", "qq": 5 })).unwrap();
        assert_eq!(offline, Event::BotOfflineDropped(BotOfflineEventDropped { qq: 5 }));
    }

    #[test]
    fn test_unknown_event_kind() {
        assert_eq!(
            Event::decode(&json!({ "type": "NudgeEvent" })),
            Err(DecodeError::UnknownEventKind("NudgeEvent".to_string()))
        );
        assert_eq!(
            Event::decode(&json!({ "type": "BotMuteEvent", "operator": member(1) })),
            Err(DecodeError::MissingField("durationSeconds".to_string()))
        );
    }

    #[test]
    fn test_kind_table() {
        assert_eq!(EventKind::all().len(), 30);
        for kind in EventKind::all() {
            assert_eq!(EventKind::from_tag(kind.as_str()), Some(*kind));
        }
        assert_eq!(EventKind::BotOnline.as_str(), "BotOnlineEvent");
        assert_eq!(EventKind::from_tag("GroupMessage"), Some(EventKind::GroupMessage));
        assert_eq!(EventKind::from_tag("BotOnline"), None);
    }

    #[test]
    fn test_decode_bot_mute() {
        let event = Event::decode(&json!({
            "type": "BotMuteEvent",
            "durationSeconds": 60,
            "operator": member(2000)
        }))
        .unwrap();
        assert_eq!(event.kind(), EventKind::BotMute);
        let mute = event.get::<BotMuteEvent>().unwrap();
        assert_eq!(mute.duration_seconds, 60);
        assert_eq!(mute.operator.id, 2000);
        assert_eq!(mute.operator.member_name, "nick");
        assert_eq!(mute.operator.permission, Permission::Administrator);
        assert_eq!(mute.operator.group.id, 12345);
    }

    #[test]
    fn test_chain_errors_keep_their_kind() {
        assert_eq!(
            Event::decode(&json!({
                "type": "GroupMessage",
                "messageChain": [{ "type": "Voice" }],
                "sender": member(1)
            })),
            Err(DecodeError::UnknownSegmentKind("Voice".to_string()))
        );
        assert_eq!(
            Event::decode(&json!({
                "type": "FriendMessage",
                "messageChain": [{ "type": "Plain" }],
                "sender": { "id": 1, "nickname": "n", "remark": "" }
            })),
            Err(DecodeError::MissingField("text".to_string()))
        );
        assert_eq!(
            Event::decode(&json!({ "type": "TempMessage", "sender": member(1) })),
            Err(DecodeError::MissingField("messageChain".to_string()))
        );
        assert_eq!(
            Event::decode_all(&json!([
                { "type": "BotOnlineEvent", "qq": 1 },
                { "type": "GroupMessage", "messageChain": [{ "type": "At", "display": "" }], "sender": member(1) }
            ])),
            Err(DecodeError::MissingField("target".to_string()))
        );

        let err = serde_json::from_value::<Event>(json!({
            "type": "GroupMessage",
            "messageChain": [{ "type": "Voice" }],
            "sender": member(1)
        }))
        .unwrap_err();
        assert_eq!(
            DecodeError::from(err),
            DecodeError::UnknownSegmentKind("Voice".to_string())
        );
    }

    fn every_kind() -> Vec<Event> {
        let group = Group {
            id: 12345,
            name: "group".to_string(),
            permission: Permission::Owner,
        };
        let member = |id: i64| Member {
            id,
            member_name: format!("m{id}"),
            permission: Permission::Member,
            group: group.clone(),
        };
        let received = || ReceivedMessage {
            source: Source { id: 7, time: 1600000000 },
            quote: None,
            content: StringifiedMessage::new(vec![Segment::at(3), Segment::plain(" hi")]),
        };

        vec![
            Event::from(GroupMessage {
                message_chain: ReceivedMessage {
                    quote: Some(Quote {
                        id: 6,
                        group_id: 12345,
                        sender_id: 4,
                        target_id: 12345,
                        origin: vec![Segment::plain("earlier")],
                    }),
                    content: StringifiedMessage::new(vec![Segment::plain("reply")]),
                    ..received()
                },
                sender: member(1),
            }),
            Event::from(FriendMessage {
                message_chain: received(),
                sender: Friend {
                    id: 2,
                    nickname: "friend".to_string(),
                    remark: "r".to_string(),
                },
            }),
            Event::from(TempMessage {
                message_chain: received(),
                sender: member(3),
            }),
            Event::from(BotOnlineEvent { qq: 1 }),
            Event::from(BotOfflineEventActive { qq: 1 }),
            Event::from(BotOfflineEventForce { qq: 1 }),
            Event::from(BotOfflineEventDropped { qq: 1 }),
            Event::from(BotReloginEvent { qq: 1 }),
            Event::from(GroupRecallEvent {
                author_id: 1,
                message_id: 2,
                time: 3,
                group: group.clone(),
                operator: Some(member(4)),
            }),
            Event::from(FriendRecallEvent {
                author_id: 1,
                message_id: 2,
                time: 3,
                operator: 4,
            }),
            Event::from(BotGroupPermissionChangeEvent {
                origin: Permission::Member,
                current: Permission::Administrator,
                group: group.clone(),
            }),
            Event::from(BotMuteEvent {
                duration_seconds: 60,
                operator: member(5),
            }),
            Event::from(BotUnmuteEvent { operator: member(5) }),
            Event::from(BotJoinGroupEvent { group: group.clone() }),
            Event::from(GroupNameChangeEvent {
                origin: "old".to_string(),
                current: "new".to_string(),
                group: group.clone(),
                is_by_bot: true,
            }),
            Event::from(GroupEntranceAnnouncementChangeEvent {
                origin: "a".to_string(),
                current: "b".to_string(),
                group: group.clone(),
                operator: None,
            }),
            Event::from(GroupMuteAllEvent {
                origin: false,
                current: true,
                group: group.clone(),
                operator: Some(member(6)),
            }),
            Event::from(GroupAllowAnonymousChatEvent {
                origin: true,
                current: false,
                group: group.clone(),
                operator: None,
            }),
            Event::from(GroupAllowConfessTalkEvent {
                origin: false,
                current: true,
                group: group.clone(),
                is_by_bot: false,
            }),
            Event::from(GroupAllowMemberInviteEvent {
                origin: true,
                current: false,
                group: group.clone(),
                operator: Some(member(7)),
            }),
            Event::from(MemberJoinEvent { member: member(8) }),
            Event::from(MemberLeaveEventKick {
                member: member(9),
                operator: Some(member(10)),
            }),
            Event::from(MemberLeaveEventQuit { member: member(11) }),
            Event::from(MemberCardChangeEvent {
                origin: "c1".to_string(),
                current: "c2".to_string(),
                member: member(12),
                operator: None,
            }),
            Event::from(MemberSpecialTitleChangeEvent {
                origin: String::new(),
                current: "title".to_string(),
                member: member(13),
            }),
            Event::from(MemberPermissionChangeEvent {
                origin: Permission::Member,
                current: Permission::Administrator,
                member: member(14),
            }),
            Event::from(MemberMuteEvent {
                duration_seconds: 600,
                member: member(15),
                operator: Some(member(16)),
            }),
            Event::from(MemberUnmuteEvent {
                member: member(15),
                operator: None,
            }),
            Event::from(NewFriendRequestEvent {
                event_id: 1,
                from_id: 2,
                group_id: Some(3),
                nick: "n".to_string(),
                message: "hello".to_string(),
            }),
            Event::from(MemberJoinRequestEvent {
                event_id: 4,
                from_id: 5,
                group_id: 12345,
                group_name: "group".to_string(),
                nick: "m".to_string(),
                message: String::new(),
            }),
        ]
    }

    #[test]
    fn test_every_kind_round_trips() {
        let events = every_kind();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, EventKind::ALL);

        for event in events {
            let encoded = event.encode();
            assert_eq!(encoded["type"], event.kind().as_str());
            assert_eq!(Event::decode(&encoded).unwrap(), event);
            let decoded: Event = serde_json::from_value(encoded).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_decode_all() {
        let events = Event::decode_all(&json!([
            { "type": "BotOnlineEvent", "qq": 1 },
            { "type": "BotReloginEvent", "qq": 1 }
        ]))
        .unwrap();
        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(kinds, [EventKind::BotOnline, EventKind::BotRelogin]);
    }
}
