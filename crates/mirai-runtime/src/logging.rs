//! Logging setup for mirai applications.
//!
//! A `tracing-subscriber` registry with an `EnvFilter` and one fmt layer.
//! `RUST_LOG` wins over the configured level when it is set.
//!
//! From configuration:
//!
//! ```rust,ignore
//! use mirai_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! By hand:
//!
//! ```rust,ignore
//! use mirai_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .directive("mirai_transport=debug")
//!     .with_thread_ids(true)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Installs the global subscriber described by `config`.
///
/// A subscriber that is already installed is left alone.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// Assembles the filter and fmt layer, then installs them globally.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    level: Option<Level>,
    directives: Vec<String>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    show_target: bool,
    show_threads: bool,
}

impl LoggingBuilder {
    /// Compact output on stdout at `info`, targets shown.
    pub fn new() -> Self {
        Self {
            show_target: true,
            ..Default::default()
        }
    }

    /// Translates a [`LoggingConfig`]; per-target filters become directives
    /// in target order.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut targets: Vec<_> = config.filters.iter().collect();
        targets.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            level: Some(config.level.to_tracing_level()),
            directives: targets
                .into_iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            show_target: true,
            show_threads: config.thread_ids,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a directive such as `mirai_core=trace`. Unparseable directives
    /// are skipped at init.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Whether each line shows its module path.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.show_target = enabled;
        self
    }

    /// Whether each line shows the thread id and name.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.show_threads = enabled;
        self
    }

    /// Destination for [`LogOutput::File`].
    pub fn file_path(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    /// `RUST_LOG` when set, else the configured level; extra directives on
    /// top.
    fn build_filter(&self) -> EnvFilter {
        let default = LevelFilter::from_level(self.level.unwrap_or(Level::INFO));
        self.directives
            .iter()
            .filter_map(|d| d.parse::<Directive>().ok())
            .fold(
                EnvFilter::builder()
                    .with_default_directive(default.into())
                    .from_env_lossy(),
                EnvFilter::add_directive,
            )
    }

    /// The writer for the configured output. The flag is set when file
    /// output was requested without a path.
    fn writer(&self) -> (BoxMakeWriter, bool) {
        match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), false),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), false),
            (LogOutput::File, Some(path)) => {
                let appender = tracing_appender::rolling::never(
                    path.parent().unwrap_or_else(|| Path::new(".")),
                    path.file_name().unwrap_or_else(|| OsStr::new("mirai.log")),
                );
                (BoxMakeWriter::new(appender), false)
            }
            (LogOutput::File, None) => (BoxMakeWriter::new(std::io::stdout), true),
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(self.show_target)
            .with_thread_ids(self.show_threads)
            .with_thread_names(self.show_threads);
        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
        }
    }

    /// Installs the subscriber, ignoring failure.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber; fails if one is already installed.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (writer, missing_path) = self.writer();
        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(self.build_filter())
            .try_init()?;
        if missing_path {
            warn!("File output requested but no file path configured, logging to stdout");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            output: LogOutput::File,
            file_path: Some(PathBuf::from("logs/bot.log")),
            thread_ids: true,
            ..Default::default()
        };
        config
            .filters
            .insert("mirai_transport".to_string(), LogLevel::Trace);
        config.filters.insert("mirai_core".to_string(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Some(tracing::Level::DEBUG));
        assert_eq!(builder.output, LogOutput::File);
        assert!(builder.show_threads);
        assert!(builder.show_target);
        assert_eq!(builder.file_path.as_deref(), Some(Path::new("logs/bot.log")));
        assert_eq!(
            builder.directives,
            vec!["mirai_core=warn", "mirai_transport=trace"]
        );
    }

    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new()
            .with_level(tracing::Level::WARN)
            .directive("mirai_runtime=debug")
            .format(LogFormat::Pretty)
            .with_target(false);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(!builder.show_target);
        assert_eq!(builder.directives, vec!["mirai_runtime=debug"]);
    }
}
