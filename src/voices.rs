//! Voices offered by the speech host and the default-voice choice.

use crate::tts::Voice;

const PREFERRED_VOICE: &str = "Google UK English Male";
const FALLBACK_VOICE_FRAGMENT: &str = "Zira";

#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    pub fn replace(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|voice| voice.name == name)
    }

    /// Pick the voice used when the user has not chosen one.
    pub fn default_voice(&self) -> Option<&Voice> {
        let english: Vec<&Voice> = self
            .voices
            .iter()
            .filter(|voice| voice.lang.to_ascii_lowercase().starts_with("en"))
            .collect();

        self.voices
            .iter()
            .find(|voice| voice.name == PREFERRED_VOICE)
            .or_else(|| {
                self.voices
                    .iter()
                    .find(|voice| voice.name.contains(FALLBACK_VOICE_FRAGMENT))
            })
            .or_else(|| {
                english
                    .iter()
                    .copied()
                    .find(|voice| voice.name.to_lowercase().contains("male"))
            })
            .or_else(|| english.first().copied())
            .or_else(|| self.voices.first())
    }

    /// The selected voice when it is still offered, else the default.
    pub fn resolve(&self, selected: Option<&str>) -> Option<&Voice> {
        selected
            .and_then(|name| self.find(name))
            .or_else(|| self.default_voice())
    }
}
