//! HTTP request/response transport.
//!
//! The session talks to the server through [`HttpApi`], so tests can swap
//! the network out for a recording fake.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::HttpClient;

use mirai_core::{TransportResult, Value};

/// Synchronous JSON request/response calls against the API server.
///
/// Implementations fail with [`TransportError`](mirai_core::TransportError)
/// on non-2xx statuses and unreadable bodies; checking the `code` envelope
/// is left to the caller.
pub trait HttpApi: Send + Sync {
    /// `GET <base>/<path>?<query>`.
    fn get(&self, path: &str, query: &[(&str, String)]) -> TransportResult<Value>;

    /// `POST <base>/<path>` with a JSON body.
    fn post(&self, path: &str, body: &Value) -> TransportResult<Value>;
}
