//! Session error types.

use thiserror::Error;

use mirai_core::{DecodeError, RemoteError, TransportError};
use mirai_transport::{CloseError, ConnectError};

pub use crate::config::{ConfigError, ConfigResult};

/// Errors returned by [`Session`](crate::Session) calls and passed to
/// subscription error handlers.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A response or frame did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The server answered with a non-zero code.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The HTTP request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A WebSocket connection could not be created.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A WebSocket connection could not be closed.
    #[error(transparent)]
    Close(#[from] CloseError),

    /// The worker pool or WebSocket reactor thread could not be spawned.
    #[error("failed to start background thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// `subscribe` was called before `start_websocket_client`.
    #[error("WebSocket client not started")]
    WebsocketClientNotStarted,

    /// The session was released or never verified.
    #[error("session is not valid")]
    InvalidSession,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
