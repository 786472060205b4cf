//! # Mirai Transport
//!
//! Network transports for the mirai client.
//!
//! ## Features
//!
//! - `http-client` (default): blocking HTTP client behind the [`HttpApi`]
//!   trait
//! - `ws-client` (default): WebSocket [`Client`] with one background reactor
//!   thread and per-connection state machines
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  mirai-runtime      │  (Session, subscriptions)
//! ├─────────────────────┤
//! │  mirai-transport    │  <- This crate
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! ## Connection lifecycle
//!
//! ```text
//! Connecting ──handshake ok──▶ Open ──close──▶ Closed
//!     │                          │
//!     └──handshake failed──▶ Failed ◀──dropped──┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mirai_transport::websocket::Client;
//!
//! let client = Client::new()?;
//! let connection = client.connect("ws://127.0.0.1:8080/all?sessionKey=abc")?;
//! connection.set_message_callback(|text| println!("{text}"));
//! ```

pub mod http;

#[cfg(feature = "ws-client")]
pub mod error;
#[cfg(feature = "ws-client")]
pub mod websocket;

pub use http::HttpApi;

#[cfg(feature = "ws-client")]
pub use error::{CloseError, ConnectError};

#[cfg(feature = "http-client")]
pub use http::HttpClient;

#[cfg(feature = "ws-client")]
pub use websocket::{Client, Connection, FailureKind, MessageCallback, Status};
