//! Bridge to a platform media-session integration (lock screen, media keys).
//!
//! The platform side gets one [`MediaSession`] object and is told about the
//! live state through [`MediaSession::update`] after every transition. Media
//! actions travel the other way as [`MediaAction`] values that the reader
//! session resolves against its current state, so nothing here ever holds an
//! offset of its own.

use crate::tts::driver::PlaybackState;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    Play,
    Pause,
    SeekForward,
    SeekBackward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
}

/// What the platform should currently display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaContext {
    pub metadata: Option<MediaMetadata>,
    pub state: PlaybackState,
    pub offset: usize,
    pub sentence_idx: usize,
    pub progress_pct: f64,
    pub rate: f32,
}

pub trait MediaSession {
    fn update(&mut self, context: &MediaContext);
}

/// Logs context changes; used when no platform integration exists.
#[derive(Debug, Default)]
pub struct TracingMediaSession {
    last: Option<MediaContext>,
}

impl MediaSession for TracingMediaSession {
    fn update(&mut self, context: &MediaContext) {
        if self.last.as_ref() == Some(context) {
            return;
        }
        let title = context
            .metadata
            .as_ref()
            .map(|metadata| metadata.title.as_str())
            .unwrap_or("");
        debug!(
            title,
            state = %context.state,
            offset = context.offset,
            sentence_idx = context.sentence_idx,
            progress_pct = context.progress_pct,
            rate = context.rate,
            "Media session updated"
        );
        self.last = Some(context.clone());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingMediaSession {
        pub(crate) updates: Vec<MediaContext>,
    }

    impl RecordingMediaSession {
        pub(crate) fn last(&self) -> Option<&MediaContext> {
            self.updates.last()
        }
    }

    impl MediaSession for RecordingMediaSession {
        fn update(&mut self, context: &MediaContext) {
            self.updates.push(context.clone());
        }
    }
}
