use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "vncplay_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Capacity of the queue between the interpreter and the dispatcher.
    /// Kept small so the interpreter never runs ahead of the writer.
    #[serde(default = "default_out_queue_capacity")]
    pub out_queue_capacity: usize,

    /// Include depth above which a warning is logged.
    #[serde(default = "default_warn_depth")]
    pub warn_depth: usize,

    /// Include depth above which the include chain is aborted.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Pause between screenshot polls of a WaitForIt.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Directory receiving `screenshot-<n>.png` files.
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

fn default_out_queue_capacity() -> usize {
    1
}

fn default_warn_depth() -> usize {
    10
}

fn default_max_depth() -> usize {
    100
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_screenshot_dir() -> String {
    ".".to_string()
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            out_queue_capacity: default_out_queue_capacity(),
            warn_depth: default_warn_depth(),
            max_depth: default_max_depth(),
            poll_interval_ms: default_poll_interval_ms(),
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        PathBuf::from(&self.screenshot_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_port")]
    pub default_port: u16,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Ask the server to leave other clients connected.
    #[serde(default = "default_shared")]
    pub shared: bool,
}

fn default_port() -> u16 {
    5900
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_shared() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            shared: default_shared(),
        }
    }
}
