//! One WebSocket connection and its state machine.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Callback invoked with the text of every inbound frame.
pub type MessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Status
// ============================================================================

/// Lifecycle state of a [`Connection`].
///
/// `Closed` and `Failed` are terminal; a connection never leaves them and
/// never returns to `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Connecting => "connecting",
            Status::Open => "open",
            Status::Closed => "closed",
            Status::Failed => "failed",
        }
    }

    /// Whether this is a terminal state.
    pub const fn is_ended(self) -> bool {
        matches!(self, Status::Closed | Status::Failed)
    }

    fn can_become(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Connecting, Status::Open)
                | (Status::Connecting, Status::Failed)
                | (Status::Open, Status::Closed)
                | (Status::Open, Status::Failed)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FailureKind
// ============================================================================

/// Why a connection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The server rejected the upgrade request.
    Handshake,
    /// Socket-level error, including refused connections.
    Io,
    /// TLS failure.
    Tls,
    /// The peer violated the WebSocket protocol.
    Protocol,
    /// The connection ended without a close handshake.
    Dropped,
    /// The client stopped before the handshake completed.
    Cancelled,
}

impl FailureKind {
    pub(crate) fn classify(err: &WsError) -> Self {
        match err {
            WsError::Http(_) | WsError::HttpFormat(_) | WsError::Url(_) => FailureKind::Handshake,
            WsError::Io(_) => FailureKind::Io,
            WsError::Tls(_) => FailureKind::Tls,
            WsError::ConnectionClosed | WsError::AlreadyClosed => FailureKind::Dropped,
            _ => FailureKind::Protocol,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::Handshake => "handshake rejected",
            FailureKind::Io => "I/O error",
            FailureKind::Tls => "TLS error",
            FailureKind::Protocol => "protocol error",
            FailureKind::Dropped => "connection dropped",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

// ============================================================================
// Connection
// ============================================================================

struct State {
    status: Status,
    error: Option<(FailureKind, String)>,
    server: String,
}

/// A WebSocket connection owned by a [`Client`](super::Client).
///
/// Shared as `Arc<Connection>`: the client, its reactor task and the caller
/// all hold one. Inbound text frames go to the message callback, called on
/// the reactor thread.
pub struct Connection {
    id: u64,
    uri: String,
    state: Mutex<State>,
    changed: Condvar,
    callback: RwLock<Option<MessageCallback>>,
    close: CancellationToken,
}

impl Connection {
    pub(crate) fn new(id: u64, uri: String, close: CancellationToken) -> Self {
        Self {
            id,
            uri,
            state: Mutex::new(State {
                status: Status::Connecting,
                error: None,
                server: "N/A".to_string(),
            }),
            changed: Condvar::new(),
            callback: RwLock::new(None),
            close,
        }
    }

    /// Client-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The URI this connection was opened to.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Whether the connection is closed or failed.
    pub fn ended(&self) -> bool {
        self.status().is_ended()
    }

    /// Why the connection failed, if it did.
    pub fn error(&self) -> Option<FailureKind> {
        self.state.lock().error.as_ref().map(|(kind, _)| *kind)
    }

    /// Human-readable failure reason, if the connection failed.
    pub fn error_reason(&self) -> Option<String> {
        self.state.lock().error.as_ref().map(|(_, reason)| reason.clone())
    }

    /// The `Server` header of the handshake response, `"N/A"` until one is
    /// seen.
    pub fn server(&self) -> String {
        self.state.lock().server.clone()
    }

    /// Sets the callback for inbound text frames, replacing any previous
    /// one.
    ///
    /// The callback runs on the reactor thread and must not block. If it
    /// panics, it is removed and later frames are dropped.
    pub fn set_message_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.install_callback(Arc::new(callback));
    }

    pub(crate) fn install_callback(&self, callback: MessageCallback) {
        *self.callback.write() = Some(callback);
    }

    /// Removes the message callback; later frames are dropped.
    pub fn clear_message_callback(&self) {
        *self.callback.write() = None;
    }

    /// Blocks while the connection is still connecting, up to `timeout`.
    /// Returns the status at wake-up.
    pub fn wait_connected(&self, timeout: Duration) -> Status {
        self.wait_while(timeout, |status| status == Status::Connecting)
    }

    /// Blocks until the connection ends, up to `timeout`. Returns the status
    /// at wake-up.
    pub fn wait_ended(&self, timeout: Duration) -> Status {
        self.wait_while(timeout, |status| !status.is_ended())
    }

    fn wait_while(&self, timeout: Duration, pending: impl Fn(Status) -> bool) -> Status {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while pending(state.status) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.status
    }

    // ------------------------------------------------------------------------
    // Reactor side
    // ------------------------------------------------------------------------

    pub(crate) fn close_token(&self) -> &CancellationToken {
        &self.close
    }

    /// Moves to `next` if the state machine allows it.
    pub(crate) fn transition(&self, next: Status) -> bool {
        let mut state = self.state.lock();
        if !state.status.can_become(next) {
            debug!(
                id = self.id,
                from = %state.status,
                to = %next,
                "Ignored invalid connection transition"
            );
            return false;
        }
        state.status = next;
        self.changed.notify_all();
        true
    }

    /// Moves to `Open`, recording the `Server` banner only if the move is
    /// allowed.
    pub(crate) fn open(&self, server: Option<&str>) -> bool {
        let mut state = self.state.lock();
        if !state.status.can_become(Status::Open) {
            debug!(id = self.id, from = %state.status, "Ignored late open");
            return false;
        }
        if let Some(server) = server {
            state.server = server.to_string();
        }
        state.status = Status::Open;
        self.changed.notify_all();
        true
    }

    pub(crate) fn fail(&self, kind: FailureKind, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let mut state = self.state.lock();
        if !state.status.can_become(Status::Failed) {
            return false;
        }
        warn!(id = self.id, uri = %self.uri, kind = %kind, reason = %reason, "WebSocket connection failed");
        state.status = Status::Failed;
        state.error = Some((kind, reason));
        self.changed.notify_all();
        true
    }

    /// Records the banner of a rejected handshake; ended connections keep
    /// theirs.
    pub(crate) fn set_server(&self, server: &str) {
        let mut state = self.state.lock();
        if !state.status.is_ended() {
            state.server = server.to_string();
        }
    }

    /// Hands one inbound frame to the callback.
    pub(crate) fn deliver(&self, text: &str) {
        let Some(callback) = self.callback.read().clone() else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(text))).is_err() {
            error!(id = self.id, uri = %self.uri, "Message callback panicked, removing it");
            self.clear_message_callback();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .field("status", &state.status)
            .field("server", &state.server)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn connection() -> Connection {
        Connection::new(1, "ws://localhost/all".to_string(), CancellationToken::new())
    }

    #[test]
    fn test_open_after_end_keeps_banner() {
        let conn = connection();
        assert!(conn.fail(FailureKind::Cancelled, "stopped"));
        assert!(!conn.open(Some("late-server")));
        conn.set_server("late-server");
        assert_eq!(conn.server(), "N/A");
        assert_eq!(conn.status(), Status::Failed);

        let conn = connection();
        assert!(conn.open(Some("first")));
        assert!(!conn.open(Some("second")));
        assert_eq!(conn.server(), "first");
    }

    #[test]
    fn test_state_machine() {
        let conn = connection();
        assert_eq!(conn.status(), Status::Connecting);
        assert!(!conn.transition(Status::Closed));
        assert!(conn.open(Some("ktor-server-core")));
        assert_eq!(conn.status(), Status::Open);
        assert_eq!(conn.server(), "ktor-server-core");
        assert!(!conn.transition(Status::Connecting));

        assert!(conn.fail(FailureKind::Dropped, "eof"));
        assert!(conn.ended());
        assert_eq!(conn.error(), Some(FailureKind::Dropped));
        assert_eq!(conn.error_reason().as_deref(), Some("eof"));

        assert!(!conn.transition(Status::Open));
        assert!(!conn.transition(Status::Closed));
        assert!(!conn.fail(FailureKind::Io, "again"));
        assert_eq!(conn.error_reason().as_deref(), Some("eof"));
    }

    #[test]
    fn test_closed_is_terminal() {
        let conn = connection();
        assert_eq!(conn.server(), "N/A");
        assert!(conn.open(None));
        assert!(conn.transition(Status::Closed));
        assert_eq!(conn.error(), None);
        assert!(!conn.fail(FailureKind::Io, "late"));
        assert_eq!(conn.status(), Status::Closed);
    }

    #[test]
    fn test_deliver_and_panicking_callback() {
        let conn = connection();
        conn.deliver("dropped");

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        conn.set_message_callback(move |text| {
            counter.fetch_add(1, Ordering::SeqCst);
            if text == "boom" {
                panic!("callback failure");
            }
        });
        conn.deliver("a");
        conn.deliver("boom");
        conn.deliver("b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_wait_times_out() {
        let conn = connection();
        let status = conn.wait_connected(Duration::from_millis(20));
        assert_eq!(status, Status::Connecting);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(Status::Open.to_string(), "open");
        assert!(Status::Failed.is_ended());
        assert!(!Status::Connecting.is_ended());
    }
}
