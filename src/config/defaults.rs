pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_data_dir() -> String {
    ".lingualecta".to_string()
}

pub(crate) fn default_restart_settle_ms() -> u64 {
    50
}

pub(crate) fn default_seek_step_chars() -> usize {
    100
}

pub(crate) fn default_preview_chars() -> usize {
    50
}

pub(crate) fn default_words_per_minute() -> u32 {
    170
}

pub(crate) fn default_rate() -> f32 {
    1.0
}

pub(crate) fn default_pitch() -> f32 {
    1.0
}

pub(crate) fn default_font_size() -> u32 {
    100
}

pub(crate) fn default_dark_mode() -> bool {
    false
}
