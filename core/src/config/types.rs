use serde::{Deserialize, Serialize};

use crate::stream::{HookKind, Passthrough};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub redirect: RedirectConfig,

    #[serde(default)]
    pub activity_log: ActivityLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr. Off by default: with an fd hook on stderr the
    /// log lines would end up in the activity log.
    #[serde(default)]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "outfeed_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Level for the `outfeed.redirect` and `outfeed.dispatch` targets,
    /// layered on top of `level`. Unset leaves them at `level`.
    #[serde(default)]
    pub capture_level: Option<String>,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: false,
            file: default_logging_file(),
            level: default_logging_level(),
            capture_level: None,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    #[serde(default)]
    pub hook: HookKind,

    #[serde(default)]
    pub passthrough: Passthrough,

    /// Read size of the fd hook's pipe reader.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,

    /// How long the fd hook waits for its reader to drain on uninstall.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_read_chunk_bytes() -> usize {
    16 * 1024
}

fn default_drain_timeout_ms() -> u64 {
    250
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            hook: HookKind::default(),
            passthrough: Passthrough::default(),
            read_chunk_bytes: default_read_chunk_bytes(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogConfig {
    /// Oldest text is discarded beyond this many bytes.
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: usize,

    /// Where `run` saves the log when no `--save-log` is given.
    #[serde(default)]
    pub save_path: Option<String>,
}

fn default_capacity_bytes() -> usize {
    1024 * 1024
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: default_capacity_bytes(),
            save_path: None,
        }
    }
}
