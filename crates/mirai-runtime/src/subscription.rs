//! Frame dispatch for WebSocket subscriptions.
//!
//! Every inbound frame goes through the same pipeline:
//!
//! ```text
//! text ──parse──▶ JSON ──check_response──▶ envelope ok ──Event::decode──▶ on_event
//!                   │                          │                 │
//!                   └──────────────────────────┴─────────────────┴──▶ on_error
//! ```
//!
//! Under [`ExecutionPolicy::Inline`] the pipeline runs on the reactor
//! thread; under [`ExecutionPolicy::Pooled`] the reactor only copies the
//! frame text and queues the pipeline on the session's worker pool.
//!
//! A panic escaping `on_event` or `on_error` poisons the subscription: it is
//! logged once and every later frame is dropped. With
//! `dispatch.abort_on_callback_panic` the process aborts instead.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use mirai_core::{DecodeError, Event, Value, check_response};
use mirai_transport::Connection;
use tracing::{error, trace};

use crate::error::{SessionError, SessionResult};
use crate::executor::Executor;

/// Callback receiving decoded events.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Callback receiving frames that failed to decode or carried an error code.
pub type ErrorHandler = Arc<dyn Fn(SessionError) + Send + Sync>;

/// Where subscription callbacks run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExecutionPolicy {
    /// On the reactor thread. Handlers must not block, and must not call the
    /// blocking HTTP methods of the session.
    #[default]
    Inline,
    /// On the session's worker pool, started on first use.
    Pooled,
}

/// The WebSocket endpoint a subscription listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionPath {
    /// `/message`: message events only.
    Message,
    /// `/all`: every event.
    All,
    /// `/event`: every non-message event.
    Event,
}

impl SubscriptionPath {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "/message",
            Self::All => "/all",
            Self::Event => "/event",
        }
    }
}

impl fmt::Display for SubscriptionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes one frame into an event.
pub fn decode_frame(text: &str) -> SessionResult<Event> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::from)?;
    check_response(&value)?;
    Ok(Event::decode(&value)?)
}

// ============================================================================
// Dispatcher
// ============================================================================

/// The callbacks of one subscription plus its poison flag. Shared by the
/// connection callback and by every queued pooled job.
pub(crate) struct Dispatcher {
    path: SubscriptionPath,
    on_event: EventHandler,
    on_error: ErrorHandler,
    poisoned: AtomicBool,
    abort_on_panic: bool,
}

impl Dispatcher {
    pub(crate) fn new(
        path: SubscriptionPath,
        on_event: EventHandler,
        on_error: ErrorHandler,
        abort_on_panic: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            path,
            on_event,
            on_error,
            poisoned: AtomicBool::new(false),
            abort_on_panic,
        })
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Runs the decode pipeline and the matching callback.
    pub(crate) fn handle_frame(&self, text: &str) {
        if self.is_poisoned() {
            trace!(path = %self.path, "Dropping frame for poisoned subscription");
            return;
        }

        let result = decode_frame(text);
        let outcome = catch_unwind(AssertUnwindSafe(|| match result {
            Ok(event) => (self.on_event)(event),
            Err(err) => (self.on_error)(err),
        }));
        if outcome.is_err() {
            self.poison();
        }
    }

    fn poison(&self) {
        if self.poisoned.swap(true, Ordering::AcqRel) {
            return;
        }
        error!(
            path = %self.path,
            "Subscription callback panicked, no further frames will be dispatched"
        );
        if self.abort_on_panic {
            std::process::abort();
        }
    }
}

/// Builds the connection callback for `policy`.
///
/// Pooled callbacks hold the pool weakly; frames arriving after the pool is
/// gone are dropped.
pub(crate) fn frame_handler(
    dispatcher: Arc<Dispatcher>,
    pool: Option<Weak<dyn Executor>>,
) -> impl Fn(&str) + Send + Sync + 'static {
    move |text: &str| match &pool {
        None => dispatcher.handle_frame(text),
        Some(pool) => {
            let Some(pool) = pool.upgrade() else {
                trace!(path = %dispatcher.path, "Worker pool stopped, dropping frame");
                return;
            };
            let dispatcher = dispatcher.clone();
            let text = text.to_owned();
            pool.submit(Box::new(move || dispatcher.handle_frame(&text)));
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// One subscribed connection with its callbacks and execution policy.
#[derive(Clone)]
pub struct Subscription {
    policy: ExecutionPolicy,
    connection: Arc<Connection>,
    dispatcher: Arc<Dispatcher>,
}

impl Subscription {
    pub(crate) fn new(
        policy: ExecutionPolicy,
        connection: Arc<Connection>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            policy,
            connection,
            dispatcher,
        }
    }

    pub fn path(&self) -> SubscriptionPath {
        self.dispatcher.path
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Whether a callback panicked and dispatch stopped.
    pub fn is_poisoned(&self) -> bool {
        self.dispatcher.is_poisoned()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path())
            .field("policy", &self.policy)
            .field("connection", &self.connection.id())
            .field("poisoned", &self.is_poisoned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ThreadPool;
    use mirai_core::{EventKind, VariantWrapper};
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    const ONLINE: &str = r#"{"type":"BotOnlineEvent","qq":123}"#;

    fn recording() -> (
        EventHandler,
        ErrorHandler,
        Arc<Mutex<Vec<EventKind>>>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let (e, r) = (events.clone(), errors.clone());
        (
            Arc::new(move |event: Event| e.lock().push(event.kind())),
            Arc::new(move |err: SessionError| r.lock().push(err.to_string())),
            events,
            errors,
        )
    }

    #[test]
    fn test_decode_frame() {
        assert_eq!(decode_frame(ONLINE).unwrap().kind(), EventKind::BotOnline);
        assert!(matches!(
            decode_frame(r#"{"code":3,"msg":"Session invalid"}"#),
            Err(SessionError::Remote(e)) if e.code == 3
        ));
        assert!(matches!(
            decode_frame("not json"),
            Err(SessionError::Decode(DecodeError::Json(_)))
        ));
        assert!(matches!(
            decode_frame(r#"{"type":"NoSuchEvent"}"#),
            Err(SessionError::Decode(DecodeError::UnknownEventKind(tag))) if tag == "NoSuchEvent"
        ));
    }

    #[test]
    fn test_inline_routes_events_and_errors() {
        let (on_event, on_error, events, errors) = recording();
        let handler = frame_handler(
            Dispatcher::new(SubscriptionPath::All, on_event, on_error, false),
            None,
        );
        handler(ONLINE);
        handler(r#"{"code":1,"msg":"wrong key"}"#);
        assert_eq!(*events.lock(), vec![EventKind::BotOnline]);
        assert_eq!(errors.lock().len(), 1);
        assert!(errors.lock()[0].contains("wrong key"));
    }

    #[test]
    fn test_panic_poisons_subscription() {
        let (_, on_error, _, errors) = recording();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let dispatcher = Dispatcher::new(
            SubscriptionPath::Message,
            Arc::new(move |_: Event| {
                *counter.lock() += 1;
                panic!("handler failure");
            }),
            on_error,
            false,
        );
        let handler = frame_handler(dispatcher.clone(), None);
        handler(ONLINE);
        assert!(dispatcher.is_poisoned());
        handler(ONLINE);
        handler("garbage");
        assert_eq!(*calls.lock(), 1);
        assert!(errors.lock().is_empty());
    }

    #[test]
    fn test_pooled_callback_outlives_subscriber() {
        let pool: Arc<ThreadPool> = Arc::new(ThreadPool::new(1).unwrap());
        let (release, gate) = mpsc::channel::<()>();
        pool.submit(Box::new(move || {
            gate.recv_timeout(Duration::from_secs(5)).ok();
        }));

        let (on_event, on_error, events, _) = recording();
        let executor: Arc<dyn Executor> = pool.clone();
        let handler = frame_handler(
            Dispatcher::new(SubscriptionPath::All, on_event, on_error, false),
            Some(Arc::downgrade(&executor)),
        );
        drop(executor);
        handler(ONLINE);
        // Tear down the subscriber side before the queued job can run.
        drop(handler);
        assert!(events.lock().is_empty());

        release.send(()).unwrap();
        let pool = Arc::try_unwrap(pool).unwrap();
        drop(pool);
        assert_eq!(*events.lock(), vec![EventKind::BotOnline]);
    }

    #[test]
    fn test_pooled_frames_after_pool_stop_are_dropped() {
        let (on_event, on_error, events, _) = recording();
        let executor: Arc<dyn Executor> = Arc::new(ThreadPool::new(1).unwrap());
        let handler = frame_handler(
            Dispatcher::new(SubscriptionPath::All, on_event, on_error, false),
            Some(Arc::downgrade(&executor)),
        );
        drop(executor);
        handler(ONLINE);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_path_strings() {
        assert_eq!(SubscriptionPath::Message.as_str(), "/message");
        assert_eq!(SubscriptionPath::All.to_string(), "/all");
        assert_eq!(SubscriptionPath::Event.as_str(), "/event");
    }
}
