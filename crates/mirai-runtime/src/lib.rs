//! Mirai Runtime - configuration, logging and the API session.
//!
//! This crate provides:
//! - Layered configuration (`MiraiConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`, `logging::init_from_config`)
//! - The authenticated [`Session`] with its HTTP calls and WebSocket
//!   subscriptions
//! - The worker pool behind pooled subscriptions (`Executor`, `ThreadPool`)
//!
//! # Dispatch
//!
//! | Policy | Runs on | May call blocking session methods |
//! |--------|---------|-----------------------------------|
//! | `Inline` | the WebSocket reactor thread | no |
//! | `Pooled` | a `mirai-worker-*` thread | yes |
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mirai_runtime::{ExecutionPolicy, Session, config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let session = Arc::new(Session::open(&config)?);
//! session.start_websocket_client()?;
//!
//! let replier = Arc::downgrade(&session);
//! session.subscribe_messages(
//!     move |event| {
//!         if let (Some(session), Some(group)) = (replier.upgrade(), event.get_if::<GroupMessage>()) {
//!             let _ = session.send_group_message(group.sender.group.id, "pong", None);
//!         }
//!     },
//!     |err| tracing::warn!(error = %err, "Bad frame"),
//!     ExecutionPolicy::Pooled,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod session;
pub mod subscription;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, MiraiConfig, Profile};
pub use error::{SessionError, SessionResult};
pub use executor::{Executor, Job, ThreadPool};
pub use logging::LoggingBuilder;
pub use session::Session;
pub use subscription::{
    ErrorHandler, EventHandler, ExecutionPolicy, Subscription, SubscriptionPath, decode_frame,
};
