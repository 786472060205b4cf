//! WebSocket client errors.
//!
//! Only failures the caller can observe synchronously live here. Anything
//! that goes wrong after `connect` returns shows up as
//! [`Status::Failed`] on the connection instead.

use thiserror::Error;

use crate::websocket::Status;

/// `Client::connect` could not create a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The URI does not parse.
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Only `ws` and `wss` are accepted.
    #[error("unsupported URI scheme in '{0}', expected ws or wss")]
    UnsupportedScheme(String),

    /// The client is shutting down.
    #[error("WebSocket client stopped")]
    ClientStopped,
}

/// `Client::close` could not start a graceful close.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloseError {
    /// Only open connections can be closed.
    #[error("connection is {0}, not open")]
    NotOpen(Status),

    /// The connection was created by another client.
    #[error("connection {0} does not belong to this client")]
    UnknownConnection(u64),

    /// The client is shutting down.
    #[error("WebSocket client stopped")]
    ClientStopped,
}
