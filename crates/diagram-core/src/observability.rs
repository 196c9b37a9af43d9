//! Process-wide `tracing` setup.
//!
//! Environment variables:
//! - `DIAGRAM_OBSERVABILITY_ENABLED` / `DIAGRAM_OBSERVABILITY`: on/off flag, default on.
//! - `DIAGRAM_LOG_LEVEL`: filter directive; falls back to `RUST_LOG`, then `info`.
//! - `DIAGRAM_JSON_LOG_PATH`: write JSONL logs to this file instead of the console.
//!
//! Console logs go to stderr so stdout stays free for NDJSON event output.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "diagram.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Compact human-readable lines on stderr.
    Console,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info` or `diagram_ai_harness=debug`.
    pub filter: String,
    pub sink: LogSink,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: DEFAULT_FILTER.to_string(),
            sink: LogSink::Console,
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = ["DIAGRAM_OBSERVABILITY_ENABLED", "DIAGRAM_OBSERVABILITY"]
            .into_iter()
            .find_map(|key| lookup(key))
            .map_or(true, |value| parse_flag(&value).unwrap_or(true));
        let filter = ["DIAGRAM_LOG_LEVEL", "RUST_LOG"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let sink = lookup("DIAGRAM_JSON_LOG_PATH")
            .filter(|path| !path.trim().is_empty())
            .map_or(LogSink::Console, |path| LogSink::JsonFile(PathBuf::from(path)));
        Self {
            enabled,
            filter,
            sink,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Installs the global subscriber from the environment. Only the first call
/// in a process has any effect.
pub fn init_observability() {
    init_with(ObservabilityConfig::from_env());
}

/// Installs the global subscriber from an explicit config. Only the first
/// call in a process has any effect.
pub fn init_with(config: ObservabilityConfig) {
    INIT.get_or_init(|| install(&config));
}

fn install(config: &ObservabilityConfig) {
    if !config.enabled {
        return;
    }
    let filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match &config.sink {
        LogSink::JsonFile(path) => {
            let (dir, file_name) = split_log_path(path);
            if !dir.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(&dir);
            }
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file_name));
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
        LogSink::Console => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
    }
    tracing::debug!(filter = %config.filter, sink = ?config.sink, "logging initialized");
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}
