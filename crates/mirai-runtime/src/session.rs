//! An authenticated API session.
//!
//! A [`Session`] owns the session key obtained through `/auth` + `/verify`
//! and threads it into every HTTP call and WebSocket subscription.
//!
//! # Teardown
//!
//! Dropping the session, or calling [`Session::release`], tears down in a
//! fixed order:
//!
//! 1. the WebSocket client stops, closing every subscribed connection;
//! 2. the worker pool drains its queue and joins its threads;
//! 3. `/release` is posted, once.
//!
//! No callback runs after step 2, so callbacks never outlive the session
//! key they were subscribed with.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirai_runtime::{ExecutionPolicy, Session, config::load_config};
//!
//! let config = load_config()?;
//! let session = Session::open(&config)?;
//! session.start_websocket_client()?;
//! session.subscribe_messages(
//!     |event| println!("{event:?}"),
//!     |err| eprintln!("{err}"),
//!     ExecutionPolicy::Pooled,
//! )?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, json};
use tracing::{debug, error, info, trace};

use mirai_core::{
    DecodeError, Event, Friend, Group, GroupConfig, Member, MemberInfo, MemberJoinDecision,
    MemberJoinRequestEvent, Message, NewFriendDecision, NewFriendRequestEvent, SessionConfig,
    TargetType, Value, check_response,
};
use mirai_transport::{Client, Connection, HttpApi, HttpClient};

use crate::config::{DispatchConfig, MiraiConfig};
use crate::error::{SessionError, SessionResult};
use crate::executor::{Executor, ThreadPool};
use crate::subscription::{
    Dispatcher, ExecutionPolicy, Subscription, SubscriptionPath, frame_handler,
};

/// An authenticated session with the API server.
///
/// All methods take `&self`; share the session as `Arc<Session>` to call it
/// from pooled callbacks. HTTP methods block, so inline callbacks (which run
/// on the WebSocket reactor) must not call them.
pub struct Session {
    http: Arc<dyn HttpApi>,
    ws_base: String,
    key: String,
    qq: i64,
    valid: AtomicBool,
    dispatch: DispatchConfig,
    client: Mutex<Option<Client>>,
    pool: Mutex<Option<Arc<ThreadPool>>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Session {
    /// Opens a session over a blocking HTTP client built from
    /// `config.server`.
    pub fn open(config: &MiraiConfig) -> SessionResult<Self> {
        let http = HttpClient::new(&config.server.host, config.server.timeout())?;
        Self::connect(config, Arc::new(http))
    }

    /// Authenticates with `config.auth.auth_key`, then binds the session to
    /// `config.auth.qq`.
    pub fn connect(config: &MiraiConfig, http: Arc<dyn HttpApi>) -> SessionResult<Self> {
        let mut auth = http.post("/auth", &json!({ "authKey": config.auth.auth_key }))?;
        check_response(&auth)?;
        let key: String = decode(take_field(&mut auth, "session")?)?;

        let verify = http.post(
            "/verify",
            &json!({ "sessionKey": key, "qq": config.auth.qq }),
        )?;
        check_response(&verify)?;
        info!(qq = config.auth.qq, "Session verified");

        Ok(Self {
            http,
            ws_base: websocket_base(&config.server.host),
            key,
            qq: config.auth.qq,
            valid: AtomicBool::new(true),
            dispatch: config.dispatch.clone(),
            client: Mutex::new(None),
            pool: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    pub fn session_key(&self) -> &str {
        &self.key
    }

    /// The bot account this session is bound to.
    pub fn qq(&self) -> i64 {
        self.qq
    }

    /// False once the session has been released.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Tears down subscriptions and the worker pool, then releases the
    /// session key. Fails with [`SessionError::InvalidSession`] if it was
    /// already released.
    pub fn release(&self) -> SessionResult<()> {
        self.close_websocket_client();
        let pool = self.pool.lock().take();
        drop(pool);

        if !self.valid.swap(false, Ordering::AcqRel) {
            return Err(SessionError::InvalidSession);
        }
        let response = self.http.post(
            "/release",
            &json!({ "sessionKey": self.key, "qq": self.qq }),
        )?;
        check_response(&response)?;
        info!(qq = self.qq, "Session released");
        Ok(())
    }

    /// Version of the API server. Needs no session key.
    pub fn version(&self) -> SessionResult<String> {
        let mut response = self.http.get("/about", &[])?;
        check_response(&response)?;
        let mut data = take_field(&mut response, "data")?;
        decode(take_field(&mut data, "version")?)
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    fn ensure_valid(&self) -> SessionResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SessionError::InvalidSession)
        }
    }

    /// POSTs `fields` plus the session key and checks the envelope.
    fn post(&self, path: &str, fields: Value) -> SessionResult<Value> {
        self.ensure_valid()?;
        let mut body = Map::new();
        body.insert("sessionKey".to_string(), Value::String(self.key.clone()));
        if let Value::Object(fields) = fields {
            body.extend(fields);
        }
        trace!(path, "POST");
        let response = self.http.post(path, &Value::Object(body))?;
        check_response(&response)?;
        Ok(response)
    }

    /// GETs with the session key prepended to `query` and checks the
    /// envelope.
    fn get(&self, path: &str, query: &[(&str, String)]) -> SessionResult<Value> {
        self.ensure_valid()?;
        let mut params = Vec::with_capacity(query.len() + 1);
        params.push(("sessionKey", self.key.clone()));
        params.extend_from_slice(query);
        trace!(path, "GET");
        let response = self.http.get(path, &params)?;
        check_response(&response)?;
        Ok(response)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Sends a message to a friend. Returns the message id.
    pub fn send_friend_message(
        &self,
        target: i64,
        message: impl Into<Message>,
        quote: Option<i32>,
    ) -> SessionResult<i32> {
        self.send_message(
            "/sendFriendMessage",
            json!({ "target": target }),
            message.into(),
            quote,
        )
    }

    /// Sends a message to a group. Returns the message id.
    pub fn send_group_message(
        &self,
        target: i64,
        message: impl Into<Message>,
        quote: Option<i32>,
    ) -> SessionResult<i32> {
        self.send_message(
            "/sendGroupMessage",
            json!({ "target": target }),
            message.into(),
            quote,
        )
    }

    /// Sends a private message to `qq` through `group`. Returns the message
    /// id.
    pub fn send_temp_message(
        &self,
        group: i64,
        qq: i64,
        message: impl Into<Message>,
        quote: Option<i32>,
    ) -> SessionResult<i32> {
        self.send_message(
            "/sendTempMessage",
            json!({ "qq": qq, "group": group }),
            message.into(),
            quote,
        )
    }

    fn send_message(
        &self,
        path: &str,
        mut fields: Value,
        message: Message,
        quote: Option<i32>,
    ) -> SessionResult<i32> {
        fields["messageChain"] = json!(message);
        if let Some(quote) = quote {
            fields["quote"] = json!(quote);
        }
        let mut response = self.post(path, fields)?;
        let id = decode(take_field(&mut response, "messageId")?)?;
        debug!(path, message_id = id, "Message sent");
        Ok(id)
    }

    /// Sends images by URL. Returns the image ids.
    pub fn send_image_message<S: AsRef<str>>(
        &self,
        target: i64,
        target_type: TargetType,
        urls: &[S],
    ) -> SessionResult<Vec<String>> {
        let urls: Vec<&str> = urls.iter().map(AsRef::as_ref).collect();
        let mut fields = json!({ "target": target, "urls": urls });
        let key = match target_type {
            TargetType::Friend => "qq",
            TargetType::Group => "group",
        };
        fields[key] = json!(target);
        decode(self.post("/sendImageMessage", fields)?)
    }

    /// Recalls a message sent by the bot.
    pub fn recall(&self, message_id: i32) -> SessionResult<()> {
        self.post("/recall", json!({ "target": message_id }))?;
        Ok(())
    }

    // ========================================================================
    // Event polling
    // ========================================================================

    /// Removes and returns up to `count` of the oldest queued events.
    pub fn fetch_events(&self, count: usize) -> SessionResult<Vec<Event>> {
        self.poll("/fetchMessage", count)
    }

    /// Removes and returns up to `count` of the newest queued events.
    pub fn fetch_latest_events(&self, count: usize) -> SessionResult<Vec<Event>> {
        self.poll("/fetchLatestMessage", count)
    }

    /// Returns up to `count` of the oldest queued events without removing
    /// them.
    pub fn peek_events(&self, count: usize) -> SessionResult<Vec<Event>> {
        self.poll("/peekMessage", count)
    }

    /// Returns up to `count` of the newest queued events without removing
    /// them.
    pub fn peek_latest_events(&self, count: usize) -> SessionResult<Vec<Event>> {
        self.poll("/peekLatestMessage", count)
    }

    fn poll(&self, path: &str, count: usize) -> SessionResult<Vec<Event>> {
        let mut response = self.get(path, &[("count", count.to_string())])?;
        let events = Event::decode_all(&take_field(&mut response, "data")?)?;
        trace!(path, count = events.len(), "Polled events");
        Ok(events)
    }

    /// Number of queued events.
    pub fn count_events(&self) -> SessionResult<usize> {
        let mut response = self.get("/countMessage", &[])?;
        decode(take_field(&mut response, "data")?)
    }

    /// Looks up a cached message event by message id.
    pub fn message_from_id(&self, id: i32) -> SessionResult<Event> {
        let mut response = self.get("/messageFromId", &[("id", id.to_string())])?;
        Ok(Event::decode(&take_field(&mut response, "data")?)?)
    }

    // ========================================================================
    // Listings
    // ========================================================================

    pub fn friend_list(&self) -> SessionResult<Vec<Friend>> {
        decode(self.get("/friendList", &[])?)
    }

    pub fn group_list(&self) -> SessionResult<Vec<Group>> {
        decode(self.get("/groupList", &[])?)
    }

    pub fn member_list(&self, group: i64) -> SessionResult<Vec<Member>> {
        decode(self.get("/memberList", &[("target", group.to_string())])?)
    }

    // ========================================================================
    // Group administration
    // ========================================================================

    pub fn mute_all(&self, group: i64) -> SessionResult<()> {
        self.post("/muteAll", json!({ "target": group }))?;
        Ok(())
    }

    pub fn unmute_all(&self, group: i64) -> SessionResult<()> {
        self.post("/unmuteAll", json!({ "target": group }))?;
        Ok(())
    }

    /// Mutes a member for `seconds`.
    pub fn mute(&self, group: i64, member: i64, seconds: u32) -> SessionResult<()> {
        self.post(
            "/mute",
            json!({ "target": group, "memberId": member, "time": seconds }),
        )?;
        Ok(())
    }

    pub fn unmute(&self, group: i64, member: i64) -> SessionResult<()> {
        self.post("/unmute", json!({ "target": group, "memberId": member }))?;
        Ok(())
    }

    /// Removes a member from a group, with a message shown to them.
    pub fn kick(&self, group: i64, member: i64, message: &str) -> SessionResult<()> {
        self.post(
            "/kick",
            json!({ "target": group, "memberId": member, "msg": message }),
        )?;
        Ok(())
    }

    pub fn group_config(&self, group: i64) -> SessionResult<GroupConfig> {
        decode(self.get("/groupConfig", &[("target", group.to_string())])?)
    }

    /// Updates the fields of `config` that are set.
    pub fn set_group_config(&self, group: i64, config: &GroupConfig) -> SessionResult<()> {
        self.post("/groupConfig", json!({ "target": group, "config": config }))?;
        Ok(())
    }

    pub fn member_info(&self, group: i64, member: i64) -> SessionResult<MemberInfo> {
        decode(self.get(
            "/memberInfo",
            &[("target", group.to_string()), ("memberId", member.to_string())],
        )?)
    }

    /// Updates the fields of `info` that are set.
    pub fn set_member_info(&self, group: i64, member: i64, info: &MemberInfo) -> SessionResult<()> {
        self.post(
            "/memberInfo",
            json!({ "target": group, "memberId": member, "info": info }),
        )?;
        Ok(())
    }

    // ========================================================================
    // Session settings and requests
    // ========================================================================

    pub fn config(&self) -> SessionResult<SessionConfig> {
        decode(self.get("/config", &[])?)
    }

    /// Updates the given settings; `None` leaves a setting unchanged.
    pub fn set_config(
        &self,
        cache_size: Option<usize>,
        enable_websocket: Option<bool>,
    ) -> SessionResult<()> {
        let mut fields = Map::new();
        if let Some(cache_size) = cache_size {
            fields.insert("cacheSize".to_string(), json!(cache_size));
        }
        if let Some(enable_websocket) = enable_websocket {
            fields.insert("enableWebsocket".to_string(), json!(enable_websocket));
        }
        self.post("/config", Value::Object(fields))?;
        Ok(())
    }

    /// Answers a friend request.
    pub fn respond_new_friend_request(
        &self,
        request: &NewFriendRequestEvent,
        decision: NewFriendDecision,
        message: &str,
    ) -> SessionResult<()> {
        self.post(
            "/resp/newFriendRequestEvent",
            request.response(decision, message),
        )?;
        Ok(())
    }

    /// Answers a group join request.
    pub fn respond_member_join_request(
        &self,
        request: &MemberJoinRequestEvent,
        decision: MemberJoinDecision,
        message: &str,
    ) -> SessionResult<()> {
        self.post(
            "/resp/memberJoinRequestEvent",
            request.response(decision, message),
        )?;
        Ok(())
    }

    // ========================================================================
    // WebSocket subscriptions
    // ========================================================================

    /// Starts the WebSocket client if it is not running.
    pub fn start_websocket_client(&self) -> SessionResult<()> {
        let mut client = self.client.lock();
        if client.is_none() {
            *client = Some(Client::new()?);
        }
        Ok(())
    }

    /// Stops the WebSocket client, closing every subscription.
    pub fn close_websocket_client(&self) {
        let client = self.client.lock().take();
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        if client.is_some() {
            debug!(subscriptions = subscriptions.len(), "Closing WebSocket client");
        }
        // Joins the reactor thread; no lock may be held here.
        drop(client);
    }

    pub fn websocket_client_started(&self) -> bool {
        self.client.lock().is_some()
    }

    /// Subscribes to `path` on `ws://<host><path>?sessionKey=<key>`.
    ///
    /// Frames that fail to parse, carry a non-zero `code` or name an
    /// unknown event go to `on_error`; decoded events go to `on_event`.
    pub fn subscribe<F, E>(
        &self,
        path: SubscriptionPath,
        on_event: F,
        on_error: E,
        policy: ExecutionPolicy,
    ) -> SessionResult<Arc<Connection>>
    where
        F: Fn(Event) + Send + Sync + 'static,
        E: Fn(SessionError) + Send + Sync + 'static,
    {
        self.ensure_valid()?;
        if !self.websocket_client_started() {
            return Err(SessionError::WebsocketClientNotStarted);
        }
        let pool = match policy {
            ExecutionPolicy::Inline => None,
            ExecutionPolicy::Pooled => Some(self.executor()?),
        };
        let dispatcher = Dispatcher::new(
            path,
            Arc::new(on_event),
            Arc::new(on_error),
            self.dispatch.abort_on_callback_panic,
        );

        let uri = format!("{}{}?sessionKey={}", self.ws_base, path, self.key);
        let connection = {
            let client = self.client.lock();
            let client = client
                .as_ref()
                .ok_or(SessionError::WebsocketClientNotStarted)?;
            client.connect_with(&uri, frame_handler(dispatcher.clone(), pool))?
        };

        info!(id = connection.id(), path = %path, policy = ?policy, "Subscribed");
        self.subscriptions
            .lock()
            .push(Subscription::new(policy, connection.clone(), dispatcher));
        Ok(connection)
    }

    /// Subscribes to message events.
    pub fn subscribe_messages<F, E>(
        &self,
        on_event: F,
        on_error: E,
        policy: ExecutionPolicy,
    ) -> SessionResult<Arc<Connection>>
    where
        F: Fn(Event) + Send + Sync + 'static,
        E: Fn(SessionError) + Send + Sync + 'static,
    {
        self.subscribe(SubscriptionPath::Message, on_event, on_error, policy)
    }

    /// Subscribes to every event, messages included.
    pub fn subscribe_all_events<F, E>(
        &self,
        on_event: F,
        on_error: E,
        policy: ExecutionPolicy,
    ) -> SessionResult<Arc<Connection>>
    where
        F: Fn(Event) + Send + Sync + 'static,
        E: Fn(SessionError) + Send + Sync + 'static,
    {
        self.subscribe(SubscriptionPath::All, on_event, on_error, policy)
    }

    /// Subscribes to non-message events.
    pub fn subscribe_events<F, E>(
        &self,
        on_event: F,
        on_error: E,
        policy: ExecutionPolicy,
    ) -> SessionResult<Arc<Connection>>
    where
        F: Fn(Event) + Send + Sync + 'static,
        E: Fn(SessionError) + Send + Sync + 'static,
    {
        self.subscribe(SubscriptionPath::Event, on_event, on_error, policy)
    }

    /// Closes one subscribed connection gracefully.
    pub fn unsubscribe(&self, connection: &Connection) -> SessionResult<()> {
        {
            let client = self.client.lock();
            let client = client
                .as_ref()
                .ok_or(SessionError::WebsocketClientNotStarted)?;
            client.close(connection)?;
        }
        self.subscriptions
            .lock()
            .retain(|s| s.connection().id() != connection.id());
        Ok(())
    }

    /// Every live subscription, in subscription order.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().clone()
    }

    /// Subscriptions that stopped dispatching because a callback panicked.
    pub fn poisoned_subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .iter()
            .filter(|s| s.is_poisoned())
            .cloned()
            .collect()
    }

    /// The worker pool, started on first use. Held weakly by callbacks so
    /// that teardown can join it.
    fn executor(&self) -> SessionResult<Weak<dyn Executor>> {
        let mut slot = self.pool.lock();
        let pool = match slot.as_ref() {
            Some(pool) => pool.clone(),
            None => {
                let pool = Arc::new(ThreadPool::new(self.dispatch.pool_size)?);
                *slot = Some(pool.clone());
                pool
            }
        };
        let executor: Weak<dyn Executor> = Arc::downgrade(&pool) as Weak<ThreadPool>;
        Ok(executor)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        match self.release() {
            Ok(()) | Err(SessionError::InvalidSession) => {}
            Err(err) => error!(qq = self.qq, error = %err, "Failed to release session"),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("qq", &self.qq)
            .field("valid", &self.is_valid())
            .field("ws_base", &self.ws_base)
            .field("websocket_client_started", &self.websocket_client_started())
            .finish_non_exhaustive()
    }
}

/// `ws://` or `wss://` base for a configured HTTP host.
fn websocket_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    match host.split_once("://") {
        Some(("https", rest)) => format!("wss://{rest}"),
        Some((_, rest)) => format!("ws://{rest}"),
        None => format!("ws://{host}"),
    }
}

fn take_field(value: &mut Value, name: &str) -> SessionResult<Value> {
    value
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| DecodeError::MissingField(name.to_string()).into())
}

fn decode<T: DeserializeOwned>(value: Value) -> SessionResult<T> {
    serde_json::from_value(value).map_err(|e| DecodeError::from(e).into())
}
