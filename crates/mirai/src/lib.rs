//! # Mirai
//!
//! A typed client for the mirai HTTP/WebSocket bot API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  HTTP   ┌────────────────┐
//! │     Session      │────────▶│                │
//! │ (mirai-runtime)  │         │   API server   │
//! │   subscribe ─────┼── WS ──▶│                │
//! └───────┬──────────┘         └────────────────┘
//!         │ frames
//!         ▼
//!  Event::decode ──▶ on_event (inline on the reactor, or on the worker pool)
//! ```
//!
//! - **mirai-core**: segments, messages, events and their wire codec
//! - **mirai-transport**: the WebSocket client and the blocking HTTP client
//! - **mirai-runtime**: configuration, logging, the session and dispatch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mirai::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     init_logging(&config.logging);
//!
//!     let session = Session::open(&config)?;
//!     for event in session.fetch_events(10)? {
//!         if let Some(message) = event.get_if::<FriendMessage>() {
//!             let text = message.message_chain.content.extract_text();
//!             session.send_friend_message(message.sender.id, Message::new().plain(text), None)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use mirai_core as core;
pub use mirai_runtime as runtime;
pub use mirai_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use mirai::prelude::*;
/// ```
pub mod prelude {
    // Session and configuration
    pub use mirai_runtime::config::load_config;
    pub use mirai_runtime::logging::init_from_config as init_logging;
    pub use mirai_runtime::{
        ConfigLoader, ExecutionPolicy, MiraiConfig, Session, SessionError, SessionResult,
        SubscriptionPath,
    };

    // Messages
    pub use mirai_core::{
        Message, MessageChain, ReceivedMessage, Segment, SegmentKind, StringifiedMessage,
    };

    // Events
    pub use mirai_core::{
        Event, EventKind, FriendMessage, GroupMessage, MemberJoinDecision, NewFriendDecision,
        TempMessage,
    };

    // Entities
    pub use mirai_core::{Friend, Group, Member, Permission, TargetType};

    // Variant access (trait and derive share the name)
    pub use mirai_core::VariantWrapper;

    // Connections
    pub use mirai_transport::{Connection, Status};
}
