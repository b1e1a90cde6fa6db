//! Logging configuration
//!
//! Every field has a default, so a partial JSON document is a valid config.
//! Presets cover the places Ensemble runs: an interactive developer shell,
//! a deployed group service writing rotated JSONL files, the test suite,
//! and the `group-replay` tool.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Crates whose events are worth seeing at debug level while developing
const ENSEMBLE_TARGETS: [&str; 3] = ["ensemble_core", "ensemble_groups", "ensemble_logging"];

/// Top-level logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for every target without an explicit filter; `RUST_LOG` wins
    pub default_level: String,
    pub console: ConsoleConfig,
    /// Rotated JSONL files, off unless configured
    pub file: Option<FileConfig>,
    pub jsonl: JsonlConfig,
    pub filters: FilterConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}

impl LogConfig {
    /// Pretty, colored console; Ensemble crates at debug, dependencies at warn
    pub fn development() -> Self {
        let mut config = Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
            },
            ..Default::default()
        };
        for target in ENSEMBLE_TARGETS {
            config.filters.targets.insert(target.to_string(), "debug".to_string());
        }
        config
    }

    /// Daily-rotated `group-session.*` files under `log_dir`, no console
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig {
                enabled: false,
                ..Default::default()
            },
            file: Some(FileConfig {
                directory: log_dir,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings only, plain JSONL on the console
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            ..Default::default()
        }
    }

    /// One compact JSON line per event for scripted replays
    ///
    /// Span lists and source locations are dropped; the session span fields
    /// (owned identity, group) are kept on every line.
    pub fn replay() -> Self {
        Self {
            default_level: "warn".to_string(),
            jsonl: JsonlConfig {
                include_spans: false,
                include_location: false,
                ..Default::default()
            },
            filters: FilterConfig {
                targets: BTreeMap::from([("ensemble_groups".to_string(), "info".to_string())]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Directive string for `EnvFilter`: the default level, per-target
    /// levels in target order, then `off` for silenced crates
    pub fn filter_directives(&self) -> String {
        let targets = self
            .filters
            .targets
            .iter()
            .map(|(target, level)| format!("{target}={level}"));
        let silenced = self
            .filters
            .exclude_crates
            .iter()
            .map(|krate| format!("{}=off", krate.replace('-', "_")));

        std::iter::once(self.default_level.clone())
            .chain(targets)
            .chain(silenced)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Console sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable multi-line output instead of JSONL
    pub pretty: bool,
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pretty: false,
            ansi: false,
        }
    }
}

/// File sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name stem; rotation appends the date or hour
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "group-session".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

/// When the file sink starts a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// A single `<prefix>.log`, truncated at startup
    Never,
}

/// Shape of each JSON line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlConfig {
    /// Event fields at the top level rather than under `fields`
    pub flatten_events: bool,
    /// The whole span stack, root first
    pub include_spans: bool,
    /// The innermost span (the group session span for actor events)
    pub include_current_span: bool,
    pub include_thread_info: bool,
    /// Source file and line
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_current_span: true,
            include_thread_info: false,
            include_location: true,
        }
    }
}

/// Per-target levels on top of the default level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Crate names (dashes allowed) to silence entirely
    pub exclude_crates: Vec<String>,
    /// Target to level, e.g. `ensemble_groups::session` to `trace`
    pub targets: BTreeMap<String, String>,
}
