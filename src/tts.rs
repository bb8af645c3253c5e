//! Speech primitive seam.
//!
//! The host speech primitive speaks one utterance at a time and reports
//! progress through asynchronous events. It is injected into the
//! [`driver::SpeechDriver`] rather than looked up globally so tests can swap
//! in a recording fake.

pub mod driver;
pub mod terminal;
mod transitions;

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Identity of one utterance request, assigned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtteranceId(pub(crate) u64);

impl UtteranceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Voice parameters applied to every utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<String>,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            voice: None,
        }
    }
}

/// One request to vocalize a bounded span of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub params: VoiceParams,
}

/// A voice offered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
    pub is_default: bool,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            is_default: false,
        }
    }
}

/// Per-utterance failure reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    Interrupted,
    Canceled,
    AudioBusy,
    VoiceUnavailable,
    SynthesisFailed,
    Other(String),
}

impl SpeechErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "interrupted" => Self::Interrupted,
            "canceled" | "cancelled" => Self::Canceled,
            "audio-busy" => Self::AudioBusy,
            "voice-unavailable" => Self::VoiceUnavailable,
            "synthesis-failed" => Self::SynthesisFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Side effects of an intentional stop or restart.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Interrupted | Self::Canceled)
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::Canceled => write!(f, "canceled"),
            Self::AudioBusy => write!(f, "audio-busy"),
            Self::VoiceUnavailable => write!(f, "voice-unavailable"),
            Self::SynthesisFailed => write!(f, "synthesis-failed"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Asynchronous notification from the host primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Started(UtteranceId),
    Boundary {
        utterance: UtteranceId,
        /// Char index within the utterance text.
        char_index: usize,
    },
    Ended(UtteranceId),
    Failed {
        utterance: UtteranceId,
        error: SpeechErrorKind,
    },
    VoicesChanged(Vec<Voice>),
}

/// A single-utterance text-to-speech primitive.
pub trait SpeechHost {
    /// Voices known so far; may be empty until `VoicesChanged` arrives.
    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, utterance: &Utterance);

    fn pause(&mut self);

    /// Resume in place. Returns `false` when the host no longer holds a
    /// paused utterance.
    fn resume(&mut self) -> bool;

    /// Best-effort cancellation of whatever is queued or speaking.
    fn cancel(&mut self);

    /// Give the host time to drain its queue after a cancel.
    fn settle(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }

    /// Events that became due by `now`.
    fn poll_events(&mut self, _now: Instant) -> Vec<HostEvent> {
        Vec::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum HostCall {
        Speak(Utterance),
        Pause,
        Resume,
        Cancel,
        Settle(Duration),
    }

    /// Records every call so tests can assert exact sequences.
    #[derive(Debug, Default)]
    pub(crate) struct FakeHost {
        pub(crate) calls: Vec<HostCall>,
        pub(crate) voices: Vec<Voice>,
        holding: Option<UtteranceId>,
        paused: bool,
    }

    impl FakeHost {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_voices(voices: Vec<Voice>) -> Self {
            Self {
                voices,
                ..Self::default()
            }
        }

        /// Simulate the host losing its paused utterance.
        pub(crate) fn forget_paused(&mut self) {
            self.holding = None;
            self.paused = false;
        }

        pub(crate) fn spoken(&self) -> Vec<&Utterance> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    HostCall::Speak(utterance) => Some(utterance),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn last_spoken(&self) -> Option<&Utterance> {
            self.spoken().last().copied()
        }

        pub(crate) fn clear(&mut self) {
            self.calls.clear();
        }
    }

    impl SpeechHost for FakeHost {
        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: &Utterance) {
            self.holding = Some(utterance.id);
            self.paused = false;
            self.calls.push(HostCall::Speak(utterance.clone()));
        }

        fn pause(&mut self) {
            if self.holding.is_some() {
                self.paused = true;
            }
            self.calls.push(HostCall::Pause);
        }

        fn resume(&mut self) -> bool {
            self.calls.push(HostCall::Resume);
            if self.holding.is_some() && self.paused {
                self.paused = false;
                true
            } else {
                false
            }
        }

        fn cancel(&mut self) {
            self.holding = None;
            self.paused = false;
            self.calls.push(HostCall::Cancel);
        }

        fn settle(&mut self, delay: Duration) {
            self.calls.push(HostCall::Settle(delay));
        }
    }
}
