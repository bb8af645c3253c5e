use super::driver::{PlaybackState, SpeechDriver};
use super::{HostEvent, SpeechErrorKind, SpeechHost, UtteranceId};
use tracing::{debug, info, warn};

pub(super) fn transition<H: SpeechHost>(
    driver: &mut SpeechDriver<H>,
    event: HostEvent,
) -> Option<SpeechErrorKind> {
    match event {
        HostEvent::Started(utterance) => {
            on_started(driver, utterance);
            None
        }
        HostEvent::Boundary {
            utterance,
            char_index,
        } => {
            on_boundary(driver, utterance, char_index);
            None
        }
        HostEvent::Ended(utterance) => {
            on_ended(driver, utterance);
            None
        }
        HostEvent::Failed { utterance, error } => on_failed(driver, utterance, error),
        HostEvent::VoicesChanged(voices) => {
            debug!(count = voices.len(), "Voice list changed");
            None
        }
    }
}

fn on_started<H: SpeechHost>(driver: &mut SpeechDriver<H>, utterance: UtteranceId) {
    if !driver.is_active(utterance) {
        debug!(%utterance, "Ignoring start of stale utterance");
        return;
    }
    debug!(%utterance, "Utterance started");
}

fn on_boundary<H: SpeechHost>(
    driver: &mut SpeechDriver<H>,
    utterance: UtteranceId,
    char_index: usize,
) {
    let Some(active) = driver.active.filter(|active| active.id == utterance) else {
        debug!(%utterance, char_index, "Ignoring boundary from stale utterance");
        return;
    };
    let Some(start) = driver.table.start_of(active.sentence_idx) else {
        return;
    };
    let offset = start + active.sub_offset + char_index;
    driver.cursor.set(offset, active.sentence_idx);
}

fn on_ended<H: SpeechHost>(driver: &mut SpeechDriver<H>, utterance: UtteranceId) {
    let Some(active) = driver.active.filter(|active| active.id == utterance) else {
        debug!(%utterance, "Ignoring completion of stale utterance");
        return;
    };
    if driver.state != PlaybackState::Playing {
        debug!(%utterance, state = %driver.state, "Ignoring completion outside of playback");
        return;
    }
    driver.active = None;
    driver.advance(active.sentence_idx + 1, 0);
}

fn on_failed<H: SpeechHost>(
    driver: &mut SpeechDriver<H>,
    utterance: UtteranceId,
    error: SpeechErrorKind,
) -> Option<SpeechErrorKind> {
    if !driver.is_active(utterance) {
        debug!(%utterance, %error, "Ignoring error from stale utterance");
        return None;
    }
    if error.is_expected() {
        debug!(%utterance, %error, "Suppressing expected speech interruption");
        return None;
    }
    warn!(%utterance, %error, "Narration failed; stopping playback");
    driver.active = None;
    driver.state = PlaybackState::Stopped;
    info!(offset = driver.cursor.offset(), "Playback stopped after error");
    Some(error)
}
