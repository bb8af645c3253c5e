use serde::Deserialize;
use std::time::Duration;

/// High-level app configuration, flattened from the TOML tables.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub data_dir: String,
    pub restart_settle_ms: u64,
    pub seek_step_chars: usize,
    pub preview_chars: usize,
    pub words_per_minute: u32,
    pub default_rate: f32,
    pub default_pitch: f32,
    pub default_font_size: u32,
    pub default_dark_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            data_dir: crate::config::defaults::default_data_dir(),
            restart_settle_ms: crate::config::defaults::default_restart_settle_ms(),
            seek_step_chars: crate::config::defaults::default_seek_step_chars(),
            preview_chars: crate::config::defaults::default_preview_chars(),
            words_per_minute: crate::config::defaults::default_words_per_minute(),
            default_rate: crate::config::defaults::default_rate(),
            default_pitch: crate::config::defaults::default_pitch(),
            default_font_size: crate::config::defaults::default_font_size(),
            default_dark_mode: crate::config::defaults::default_dark_mode(),
        }
    }
}

impl AppConfig {
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
