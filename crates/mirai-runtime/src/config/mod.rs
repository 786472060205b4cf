//! Configuration for the mirai runtime.
//!
//! [`MiraiConfig`] is layered from defaults, config files and `MIRAI_*`
//! environment variables by [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AuthConfig, DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, MiraiConfig,
    ServerConfig,
};
