//! Configuration schema definitions.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1:8080"
//! timeout_ms = 30000
//!
//! [auth]
//! auth_key = "INITKEY..."
//! qq = 123456789
//!
//! [dispatch]
//! pool_size = 4
//! abort_on_callback_panic = false
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! output = "stdout"
//! thread_ids = false
//!
//! [logging.filters]
//! mirai_transport = "debug"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiraiConfig {
    /// API server address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session credentials.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Callback dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MiraiConfig {
    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::validation("server.host must not be empty"));
        }
        if self.server.timeout_ms == 0 {
            return Err(ConfigError::validation(
                "server.timeout_ms must be greater than 0",
            ));
        }
        if self.dispatch.pool_size == 0 {
            return Err(ConfigError::validation(
                "dispatch.pool_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Server / Auth / Dispatch
// =============================================================================

/// Where the API server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `host:port`, optionally with an `http://` scheme. WebSocket
    /// subscriptions use the same host with `ws://`.
    #[serde(default = "default_host")]
    pub host: String,

    /// Timeout for HTTP requests in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

/// Credentials for `/auth` and `/verify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The server's auth key.
    #[serde(default)]
    pub auth_key: String,

    /// QQ number of the bot account to bind.
    #[serde(default)]
    pub qq: i64,
}

/// How subscription callbacks are run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Worker threads for pooled subscriptions.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Abort the process when a callback panics, instead of poisoning the
    /// subscription.
    #[serde(default)]
    pub abort_on_callback_panic: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            abort_on_callback_panic: false,
        }
    }
}

fn default_pool_size() -> usize {
    4
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON.
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to `logging.file_path`.
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Include thread ids; useful to tell the reactor thread from pool
    /// workers.
    #[serde(default)]
    pub thread_ids: bool,

    /// Per-target levels, e.g. `mirai_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
