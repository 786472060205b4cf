//! Layered configuration loading on top of figment.
//!
//! Sources, each overriding the ones before it:
//!
//! | Source | Example |
//! |--------|---------|
//! | defaults | [`MiraiConfig::default`] |
//! | profile file | `mirai.production.toml` |
//! | main file | `mirai.toml`, `config.toml` (YAML with `yaml-config`) |
//! | environment | `MIRAI_SERVER__HOST=10.0.0.2:8080` |
//! | [`ConfigLoader::merge`] | a config built in code |
//!
//! Environment keys drop the `MIRAI_` prefix and split nested keys on `__`,
//! so `MIRAI_AUTH__QQ=123456` sets `auth.qq`.
//!
//! ```rust,ignore
//! use mirai_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().profile("prod").load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::MiraiConfig;

const ENV_PREFIX: &str = "MIRAI_";
const PROFILE_VAR: &str = "MIRAI_PROFILE";

/// Selects the `mirai.<profile>.*` file merged beneath the main file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Case-insensitive; `dev` and `prod` are accepted.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            "production" | "prod" => Self::Production,
            other => Self::Custom(other.to_string()),
        }
    }

    /// `MIRAI_PROFILE`, or Development when unset.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// File formats
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// Main file names probed in each search directory, in order.
    const CANDIDATES: &'static [(&'static str, FileFormat)] = &[
        #[cfg(feature = "toml-config")]
        ("mirai.toml", FileFormat::Toml),
        #[cfg(feature = "toml-config")]
        ("config.toml", FileFormat::Toml),
        #[cfg(feature = "yaml-config")]
        ("mirai.yaml", FileFormat::Yaml),
        #[cfg(feature = "yaml-config")]
        ("mirai.yml", FileFormat::Yaml),
        #[cfg(feature = "yaml-config")]
        ("config.yaml", FileFormat::Yaml),
        #[cfg(feature = "yaml-config")]
        ("config.yml", FileFormat::Yaml),
    ];

    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            #[cfg(feature = "toml-config")]
            "toml" => Some(Self::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    #[allow(unused_variables)]
    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// `mirai.toml` under profile `production` becomes `mirai.production.toml`.
fn profile_sibling(path: &Path, profile: &Profile) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.{profile}.{ext}")))
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Builds a [`MiraiConfig`] from files, the environment and code.
#[derive(Debug)]
pub struct ConfigLoader {
    profile: Profile,
    search_dirs: Vec<PathBuf>,
    explicit_file: Option<PathBuf>,
    read_env: bool,
    overrides: Vec<MiraiConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Profile from `MIRAI_PROFILE`, environment enabled, default search
    /// directories.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_dirs: Vec::new(),
            explicit_file: None,
            read_env: true,
            overrides: Vec::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search. Once any is given, the working directory
    /// and the user config directory are no longer searched implicitly.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds `<user config dir>/mirai` to the search directories.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("mirai")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers `config` over every other source. Later merges win.
    pub fn merge(mut self, config: MiraiConfig) -> Self {
        self.overrides.push(config);
        self
    }

    /// Extracts and validates the configuration.
    pub fn load(self) -> ConfigResult<MiraiConfig> {
        let config: MiraiConfig = self.figment()?.extract()?;
        config.validate()?;
        debug!(
            profile = %self.profile,
            host = %config.server.host,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(MiraiConfig::default()));

        figment = match &self.explicit_file {
            Some(path) => self.merge_explicit(figment, path)?,
            None => self.merge_discovered(figment),
        };

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(self
            .overrides
            .iter()
            .fold(figment, |figment, config| {
                figment.merge(Serialized::defaults(config))
            }))
    }

    fn merge_explicit(&self, figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::ParseError(format!(
                "unsupported or disabled configuration format: {}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "Loading configuration file");
        Ok(format.merge_into(figment, path))
    }

    /// Merges the first main file found, preceded by its profile sibling.
    fn merge_discovered(&self, mut figment: Figment) -> Figment {
        for dir in self.search_dirs() {
            for &(name, format) in FileFormat::CANDIDATES {
                let main = dir.join(name);
                if let Some(sibling) = profile_sibling(&main, &self.profile)
                    && sibling.exists()
                {
                    debug!(path = %sibling.display(), "Loading profile configuration");
                    figment = format.merge_into(figment, &sibling);
                }
                if main.exists() {
                    info!(path = %main.display(), "Loading configuration file");
                    return format.merge_into(figment, &main);
                }
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_dirs.is_empty() {
            return self.search_dirs.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("mirai")))
            .collect()
    }
}

/// Searches the default locations and reads the environment.
pub fn load_config() -> ConfigResult<MiraiConfig> {
    ConfigLoader::new().load()
}

/// Reads `path` plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<MiraiConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
