//! Structured JSONL logging for Ensemble
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Session Context**: Tag spans with the owned identity and group being edited
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use ensemble_logging::{EnsembleSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! EnsembleSubscriberBuilder::new().init();
//!
//! // Pretty human-readable output
//! EnsembleSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, FilterConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{SessionContextData, SessionContextGuard};
pub use layers::{SessionContextExtension, SessionContextLayer};

use std::fs::{self, File};
use std::io;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("Failed to prepare log file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid filter directives: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Global subscriber already set: {0}")]
    AlreadySet(#[from] tracing_subscriber::util::TryInitError),
}

/// Builder for configuring and initializing the Ensemble logging subscriber
///
/// By default, console output uses JSONL format. Use
/// `LogConfig::development()` for human-readable output.
pub struct EnsembleSubscriberBuilder {
    config: LogConfig,
}

impl EnsembleSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Use pretty (human-readable) console output
    pub fn with_pretty_console(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self.config.console.ansi = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration this builder will install
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output and must be kept alive for
    /// the duration of the program.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogInitError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.config.filter_directives())?,
        };

        let console = &self.config.console;
        let jsonl = &self.config.jsonl;

        let pretty_layer = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(console.ansi)
                .with_target(true)
        });

        let json_console_layer = (console.enabled && !console.pretty)
            .then(|| layers::jsonl_layer(io::stdout, jsonl));

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(layers::jsonl_layer(writer, jsonl)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(SessionContextLayer::new())
            .with(pretty_layer)
            .with(json_console_layer)
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }

    /// Install the subscriber globally, reporting failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("ensemble-logging: {e}");
                None
            }
        }
    }
}

impl Default for EnsembleSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the non-blocking file writer for a file configuration
///
/// `Never` truncates a single file; the other strategies append to a
/// rolling file set.
fn file_writer(file_config: &FileConfig) -> io::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&file_config.directory)?;

    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            let path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::new(rotation, &file_config.directory, &file_config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let builder = EnsembleSubscriberBuilder::new()
            .with_level("trace")
            .with_pretty_console(true)
            .with_console(false);

        let config = builder.config();
        assert_eq!(config.default_level, "trace");
        assert!(config.console.pretty);
        assert!(!config.console.enabled);
    }

    #[test]
    fn test_file_writer_never_rotation_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            directory: dir.path().join("nested"),
            prefix: "session".to_string(),
            rotation: RotationStrategy::Never,
        };

        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(dir.path().join("nested").join("session.log").exists());
    }
}
