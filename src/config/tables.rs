use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    voice: VoiceConfig,
    #[serde(default)]
    defaults: DefaultsConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            data_dir: tables.storage.data_dir,
            restart_settle_ms: tables.playback.restart_settle_ms,
            seek_step_chars: tables.playback.seek_step_chars,
            preview_chars: tables.playback.preview_chars,
            words_per_minute: tables.voice.words_per_minute,
            default_rate: tables.defaults.rate,
            default_pitch: tables.defaults.pitch,
            default_font_size: tables.defaults.font_size,
            default_dark_mode: tables.defaults.dark_mode,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            storage: StorageConfig {
                data_dir: config.data_dir.clone(),
            },
            playback: PlaybackConfig {
                restart_settle_ms: config.restart_settle_ms,
                seek_step_chars: config.seek_step_chars,
                preview_chars: config.preview_chars,
            },
            voice: VoiceConfig {
                words_per_minute: config.words_per_minute,
            },
            defaults: DefaultsConfig {
                rate: config.default_rate,
                pitch: config.default_pitch,
                font_size: config.default_font_size,
                dark_mode: config.default_dark_mode,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_data_dir")]
    data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: defaults::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_restart_settle_ms")]
    restart_settle_ms: u64,
    #[serde(default = "defaults::default_seek_step_chars")]
    seek_step_chars: usize,
    #[serde(default = "defaults::default_preview_chars")]
    preview_chars: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            restart_settle_ms: defaults::default_restart_settle_ms(),
            seek_step_chars: defaults::default_seek_step_chars(),
            preview_chars: defaults::default_preview_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct VoiceConfig {
    #[serde(default = "defaults::default_words_per_minute")]
    words_per_minute: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            words_per_minute: defaults::default_words_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct DefaultsConfig {
    #[serde(default = "defaults::default_rate")]
    rate: f32,
    #[serde(default = "defaults::default_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_font_size")]
    font_size: u32,
    #[serde(default = "defaults::default_dark_mode")]
    dark_mode: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            rate: defaults::default_rate(),
            pitch: defaults::default_pitch(),
            font_size: defaults::default_font_size(),
            dark_mode: defaults::default_dark_mode(),
        }
    }
}
