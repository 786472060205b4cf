//! WebSocket client transport.
//!
//! A [`Client`] owns one reactor thread and the [`Connection`]s opened
//! through it. Connections are one-shot: reconnecting means calling
//! [`Client::connect`] again.

mod client;
mod connection;

pub use client::Client;
pub use connection::{Connection, FailureKind, MessageCallback, Status};
