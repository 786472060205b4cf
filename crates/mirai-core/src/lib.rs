//! # Mirai Core
//!
//! The message, event and error model of the mirai client.
//!
//! Everything here is plain data plus its wire codec; networking lives in
//! `mirai-transport` and sessions in `mirai-runtime`.
//!
//! ## Layers
//!
//! - **Variant wrapper**: closed tagged unions with typed access
//!   ([`VariantWrapper`], [`Payload`]), generated by
//!   `#[derive(VariantWrapper)]`
//! - **Segments**: the ten payload kinds of a message chain ([`Segment`]),
//!   plus the structural [`Source`] and [`Quote`]
//! - **Messages**: the builder view ([`Message`]), the read view
//!   ([`StringifiedMessage`]) and inbound messages ([`ReceivedMessage`])
//! - **Events**: every server push ([`Event`])
//! - **Entities**: [`Group`], [`Member`], [`Friend`] and settings bundles
//!
//! ## Decoding
//!
//! ```text
//!  JSON ──type tag──▶ Kind::from_tag ──▶ decode_kind ──▶ Event / Segment
//!                          │
//!                          └── unknown ──▶ DecodeError
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mirai_core::{Event, GroupMessage, Message, VariantWrapper};
//!
//! let event = Event::decode(&payload)?;
//! event.dispatch(|msg: &GroupMessage| {
//!     if msg.message_chain.content.starts_with("/hello") {
//!         let reply = Message::from("Hello, ").at(msg.sender.id);
//!         // session.send_group_message(msg.sender.group.id, &reply, None)
//!     }
//! });
//! ```

// Lets generated code name `::mirai_core` from inside this crate.
extern crate self as mirai_core;

pub mod error;
pub mod event;
pub mod message;
pub mod received;
pub mod response;
pub mod segment;
pub mod stringified;
pub mod types;
pub mod variant;
pub mod wire;

pub use mirai_macros::VariantWrapper;

pub use error::{
    DecodeError, DecodeResult, MalformedEscape, RemoteError, TransportError, TransportResult,
    TypeMismatch,
};
pub use event::{
    BotGroupPermissionChangeEvent, BotJoinGroupEvent, BotMuteEvent, BotOfflineEventActive,
    BotOfflineEventDropped, BotOfflineEventForce, BotOnlineEvent, BotReloginEvent, BotUnmuteEvent,
    Event, EventKind, EventVisitor, FriendMessage, FriendRecallEvent,
    GroupAllowAnonymousChatEvent, GroupAllowConfessTalkEvent, GroupAllowMemberInviteEvent,
    GroupEntranceAnnouncementChangeEvent, GroupMessage, GroupMuteAllEvent, GroupNameChangeEvent,
    GroupRecallEvent, MemberCardChangeEvent, MemberJoinDecision, MemberJoinEvent,
    MemberJoinRequestEvent, MemberLeaveEventKick, MemberLeaveEventQuit, MemberMuteEvent,
    MemberPermissionChangeEvent, MemberSpecialTitleChangeEvent, MemberUnmuteEvent,
    NewFriendDecision, NewFriendRequestEvent, TempMessage,
};
pub use message::{Message, escape, unescape};
pub use received::{ReceivedMessage, strip_reply_mention};
pub use response::check_response;
pub use segment::{
    App, At, AtAll, Face, FlashImage, Image, Json, MessageChain, Plain, Poke, Quote, Segment,
    SegmentKind, SegmentVisitor, Source, Xml, combine_adjacent_text, decode_chain,
};
pub use stringified::StringifiedMessage;
pub use types::{
    Friend, Group, GroupConfig, Member, MemberInfo, Permission, SessionConfig, TargetType,
};
pub use variant::{Payload, VariantKind, VariantWrapper};
pub use wire::{TaggedWire, Value};
