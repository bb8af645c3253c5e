//! Process-wide reader settings and their persistence.

use crate::config::AppConfig;
use crate::error::StorageError;
use crate::storage::{KeyValueStore, keys};
use crate::tts::VoiceParams;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::{debug, warn};

pub const RATE_RANGE: RangeInclusive<f32> = 0.5..=3.0;
pub const PITCH_RANGE: RangeInclusive<f32> = 0.5..=2.0;
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 50..=200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<String>,
    /// Display-only, in percent.
    pub font_size: u32,
    pub dark_mode: bool,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsPatch {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub voice: Option<String>,
    pub font_size: Option<u32>,
    pub dark_mode: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChange {
    /// Rate, pitch or voice changed.
    pub voice: bool,
    pub display: bool,
}

impl SettingsChange {
    pub fn any(self) -> bool {
        self.voice || self.display
    }
}

fn clamp_f32(value: f32, range: &RangeInclusive<f32>) -> Option<f32> {
    value
        .is_finite()
        .then(|| value.clamp(*range.start(), *range.end()))
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rate: clamp_f32(config.default_rate, &RATE_RANGE).unwrap_or(1.0),
            pitch: clamp_f32(config.default_pitch, &PITCH_RANGE).unwrap_or(1.0),
            voice: None,
            font_size: config
                .default_font_size
                .clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end()),
            dark_mode: config.default_dark_mode,
        }
    }

    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            rate: self.rate,
            pitch: self.pitch,
            voice: self.voice.clone(),
        }
    }

    /// Apply a patch, clamping values into their bounds.
    pub fn apply(&mut self, patch: &SettingsPatch) -> SettingsChange {
        let before = self.clone();
        if let Some(rate) = patch.rate.and_then(|r| clamp_f32(r, &RATE_RANGE)) {
            self.rate = rate;
        }
        if let Some(pitch) = patch.pitch.and_then(|p| clamp_f32(p, &PITCH_RANGE)) {
            self.pitch = pitch;
        }
        if let Some(voice) = &patch.voice {
            self.voice = Some(voice.clone()).filter(|name| !name.trim().is_empty());
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size.clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end());
        }
        if let Some(dark_mode) = patch.dark_mode {
            self.dark_mode = dark_mode;
        }
        SettingsChange {
            voice: self.rate != before.rate
                || self.pitch != before.pitch
                || self.voice != before.voice,
            display: self.font_size != before.font_size || self.dark_mode != before.dark_mode,
        }
    }

    /// Read stored settings over `defaults`. Unreadable or invalid values
    /// fall back to the default for that field.
    pub fn load(store: &dyn KeyValueStore, defaults: Settings) -> Self {
        let mut settings = defaults;
        if let Some(theme) = read_key(store, keys::THEME) {
            match theme.as_str() {
                "dark" => settings.dark_mode = true,
                "light" => settings.dark_mode = false,
                other => warn!(value = other, "Ignoring unknown stored theme"),
            }
        }
        if let Some(size) = parse_key::<u32>(store, keys::FONT_SIZE) {
            settings.font_size = size.clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end());
        }
        if let Some(rate) = parse_key::<f32>(store, keys::RATE).and_then(|r| clamp_f32(r, &RATE_RANGE)) {
            settings.rate = rate;
        }
        if let Some(pitch) =
            parse_key::<f32>(store, keys::PITCH).and_then(|p| clamp_f32(p, &PITCH_RANGE))
        {
            settings.pitch = pitch;
        }
        if let Some(voice) = read_key(store, keys::VOICE).filter(|v| !v.trim().is_empty()) {
            settings.voice = Some(voice);
        }
        debug!(
            rate = settings.rate,
            pitch = settings.pitch,
            voice = ?settings.voice,
            font_size = settings.font_size,
            dark_mode = settings.dark_mode,
            "Loaded settings"
        );
        settings
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        store.set(keys::THEME, if self.dark_mode { "dark" } else { "light" })?;
        store.set(keys::FONT_SIZE, &self.font_size.to_string())?;
        store.set(keys::RATE, &self.rate.to_string())?;
        store.set(keys::PITCH, &self.pitch.to_string())?;
        match &self.voice {
            Some(voice) => store.set(keys::VOICE, voice)?,
            None => store.remove(keys::VOICE)?,
        }
        Ok(())
    }
}

fn read_key(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.map(|v| v.trim().to_string()),
        Err(err) => {
            warn!(key, "Failed to read stored setting: {err}");
            None
        }
    }
}

fn parse_key<T: FromStr>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = read_key(store, key)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid stored setting");
            None
        }
    }
}
