//! WebSocket client with a dedicated reactor thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Handle};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::SERVER;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use mirai_core::{TransportError, TransportResult};

use super::connection::{Connection, FailureKind, MessageCallback, Status};
use crate::error::{CloseError, ConnectError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long a graceful close waits for the server's close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket client.
///
/// Owns one OS thread running a current-thread tokio runtime, which drives
/// the I/O of every connection opened through this client. Dropping the
/// client closes every open connection, stops the runtime and joins the
/// thread.
pub struct Client {
    handle: Handle,
    stop: CancellationToken,
    tracker: TaskTracker,
    connections: Mutex<Vec<Arc<Connection>>>,
    next_id: AtomicU64,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl Client {
    /// Starts the reactor thread.
    pub fn new() -> TransportResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = runtime.handle().clone();
        let stop = CancellationToken::new();
        let tracker = TaskTracker::new();

        let thread = {
            let stop = stop.clone();
            let tracker = tracker.clone();
            thread::Builder::new()
                .name("mirai-ws-client".to_string())
                .spawn(move || {
                    runtime.block_on(async move {
                        stop.cancelled().await;
                        tracker.close();
                        tracker.wait().await;
                    });
                    debug!("WebSocket reactor stopped");
                })
                .map_err(|e| TransportError::Io(format!("failed to spawn reactor thread: {e}")))?
        };

        info!("WebSocket client started");
        Ok(Self {
            handle,
            stop,
            tracker,
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    /// Opens a connection to `uri`.
    ///
    /// The URI is validated here; the handshake runs on the reactor thread,
    /// so a refused or rejected handshake shows up later as
    /// [`Status::Failed`].
    pub fn connect(&self, uri: &str) -> Result<Arc<Connection>, ConnectError> {
        self.open(uri, None)
    }

    /// Like [`connect`](Self::connect), with the message callback installed
    /// before the handshake starts so no early frame is dropped.
    pub fn connect_with<F>(&self, uri: &str, callback: F) -> Result<Arc<Connection>, ConnectError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.open(uri, Some(Arc::new(callback)))
    }

    fn open(
        &self,
        uri: &str,
        callback: Option<MessageCallback>,
    ) -> Result<Arc<Connection>, ConnectError> {
        if self.stop.is_cancelled() {
            return Err(ConnectError::ClientStopped);
        }
        let request = uri
            .into_client_request()
            .map_err(|e| ConnectError::InvalidUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        if !matches!(request.uri().scheme_str(), Some("ws" | "wss")) {
            return Err(ConnectError::UnsupportedScheme(uri.to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(Connection::new(
            id,
            uri.to_string(),
            self.stop.child_token(),
        ));
        if let Some(callback) = callback {
            connection.install_callback(callback);
        }
        self.connections.lock().push(connection.clone());

        debug!(id, uri = %uri, "Connecting to WebSocket server");
        self.tracker
            .spawn_on(run_connection(request, connection.clone()), &self.handle);
        Ok(connection)
    }

    /// Starts a graceful close with a going-away code.
    ///
    /// Returns once the close is requested; the connection becomes
    /// [`Status::Closed`] when the server acknowledges it.
    pub fn close(&self, connection: &Connection) -> Result<(), CloseError> {
        if self.stop.is_cancelled() {
            return Err(CloseError::ClientStopped);
        }
        let owned = self
            .connections
            .lock()
            .iter()
            .any(|c| c.id() == connection.id() && c.uri() == connection.uri());
        if !owned {
            return Err(CloseError::UnknownConnection(connection.id()));
        }
        match connection.status() {
            Status::Open => {
                connection.close_token().cancel();
                Ok(())
            }
            status => Err(CloseError::NotOpen(status)),
        }
    }

    /// Every connection opened by this client, in creation order.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().clone()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let open = self.connections.lock().iter().filter(|c| !c.ended()).count();
        debug!(open, "Stopping WebSocket client");
        // Cancels every connection token, which closes open connections and
        // aborts pending handshakes.
        self.stop.cancel();

        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread::current().id() == self.thread_id {
            error!("WebSocket client dropped on its own reactor thread; not joining");
            return;
        }
        if thread.join().is_err() {
            error!("WebSocket reactor thread panicked");
        }
        info!("WebSocket client stopped");
    }
}

// ============================================================================
// Connection task
// ============================================================================

async fn run_connection(request: Request, connection: Arc<Connection>) {
    let close = connection.close_token().clone();

    let connected = tokio::select! {
        _ = close.cancelled() => {
            connection.fail(FailureKind::Cancelled, "client stopped before the handshake completed");
            return;
        }
        result = connect_async(request) => result,
    };

    let (stream, response) = match connected {
        Ok(ok) => ok,
        Err(err) => {
            if let WsError::Http(response) = &err {
                if let Some(server) = response.headers().get(SERVER).and_then(|v| v.to_str().ok())
                {
                    connection.set_server(server);
                }
            }
            connection.fail(FailureKind::classify(&err), err.to_string());
            return;
        }
    };

    let server = response.headers().get(SERVER).and_then(|v| v.to_str().ok());
    if !connection.open(server) {
        return;
    }
    info!(id = connection.id(), uri = %connection.uri(), "WebSocket connection open");

    let (sink, source) = stream.split();
    run_open(sink, source, &connection, &close).await;
}

/// Pumps frames until the connection ends.
async fn run_open(
    mut sink: WsSink,
    mut source: WsSource,
    connection: &Connection,
    close: &CancellationToken,
) {
    loop {
        tokio::select! {
            _ = close.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Away,
                    reason: "".into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    connection.fail(FailureKind::classify(&e), e.to_string());
                    return;
                }
                finish_close(&mut source, connection).await;
                return;
            }

            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(id = connection.id(), len = text.len(), "Received text");
                    connection.deliver(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => connection.deliver(text),
                    Err(_) => warn!(id = connection.id(), len = data.len(), "Dropped non-UTF-8 binary frame"),
                },
                // tungstenite queues the pong reply itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    info!(id = connection.id(), frame = ?frame, "Server closed connection");
                    finish_close(&mut source, connection).await;
                    return;
                }
                Some(Err(e)) => {
                    connection.fail(FailureKind::classify(&e), e.to_string());
                    return;
                }
                None => {
                    connection.fail(FailureKind::Dropped, "stream ended without a close frame");
                    return;
                }
            }
        }
    }
}

/// Reads until the close handshake completes, then marks the connection
/// closed.
async fn finish_close(source: &mut WsSource, connection: &Connection) {
    let drain = async {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(_) => continue,
                Err(WsError::ConnectionClosed) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    };
    match tokio::time::timeout(CLOSE_TIMEOUT, drain).await {
        Ok(Ok(())) => {
            connection.transition(Status::Closed);
            info!(id = connection.id(), "WebSocket connection closed");
        }
        Ok(Err(e)) => {
            connection.fail(FailureKind::classify(&e), e.to_string());
        }
        Err(_) => {
            connection.fail(FailureKind::Dropped, "timed out waiting for the close handshake");
        }
    }
}
