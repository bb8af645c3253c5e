use super::transitions;
use super::{HostEvent, SpeechErrorKind, SpeechHost, Utterance, UtteranceId, VoiceParams};
use crate::cursor::PlaybackCursor;
use crate::text_utils::SentenceTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        write!(f, "{}", label)
    }
}

/// The utterance the driver currently considers live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(in crate::tts) struct ActiveUtterance {
    pub(in crate::tts) id: UtteranceId,
    pub(in crate::tts) sentence_idx: usize,
    pub(in crate::tts) sub_offset: usize,
}

/// Drives a single-utterance host primitive through a document, one
/// sentence per utterance.
///
/// The driver is the authority on what should be happening: host events are
/// matched against the active utterance id and anything older is dropped.
pub struct SpeechDriver<H: SpeechHost> {
    pub(in crate::tts) host: H,
    pub(in crate::tts) table: SentenceTable,
    pub(in crate::tts) cursor: PlaybackCursor,
    pub(in crate::tts) state: PlaybackState,
    pub(in crate::tts) active: Option<ActiveUtterance>,
    pub(in crate::tts) params: VoiceParams,
    next_id: u64,
    restart_delay: Duration,
    needs_settle: bool,
}

impl<H: SpeechHost> SpeechDriver<H> {
    pub fn new(host: H, restart_delay: Duration) -> Self {
        Self {
            host,
            table: SentenceTable::default(),
            cursor: PlaybackCursor::default(),
            state: PlaybackState::Stopped,
            active: None,
            params: VoiceParams::default(),
            next_id: 1,
            restart_delay,
            needs_settle: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn table(&self) -> &SentenceTable {
        &self.table
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    /// Replace the sentence table (document switch). Stops playback and
    /// rewinds the cursor.
    pub fn load(&mut self, table: SentenceTable) {
        self.stop();
        self.cursor.reset(table.text_len());
        self.table = table;
        debug!(
            sentences = self.table.len(),
            text_len = self.table.text_len(),
            "Loaded sentence table"
        );
    }

    /// Cancel anything in flight and start speaking at the given sentence.
    pub fn play(&mut self, sentence_idx: usize, sub_offset: usize) {
        self.restart_point();
        info!(sentence_idx, sub_offset, "Starting narration");
        self.advance(sentence_idx, sub_offset);
    }

    /// Play from wherever the cursor sits, or from the top once finished.
    pub fn play_from_cursor(&mut self) {
        if self.cursor.is_finished() {
            self.play(0, 0);
        } else {
            let (idx, sub) = self.cursor_position();
            self.play(idx, sub);
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            debug!(state = %self.state, "Ignoring pause outside of playback");
            return false;
        }
        self.host.pause();
        self.state = PlaybackState::Paused;
        info!(offset = self.cursor.offset(), "Paused narration");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != PlaybackState::Paused {
            debug!(state = %self.state, "Ignoring resume outside of pause");
            return false;
        }
        if self.active.is_some() && self.host.resume() {
            self.state = PlaybackState::Playing;
            info!(offset = self.cursor.offset(), "Resumed narration in place");
            return true;
        }
        debug!("Host no longer holds the paused utterance; restarting at cursor");
        let (idx, sub) = self.cursor_position();
        self.play(idx, sub);
        true
    }

    /// Cancel any in-flight utterance. Idempotent.
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            self.needs_settle = true;
        }
        self.host.cancel();
        if self.state != PlaybackState::Stopped {
            info!(offset = self.cursor.offset(), "Stopped narration");
        }
        self.state = PlaybackState::Stopped;
    }

    /// Jump to a char offset. The cursor moves immediately; playback only
    /// restarts when `resume_playback` is set.
    pub fn seek(&mut self, target: usize, resume_playback: bool) {
        if self.table.is_empty() {
            self.stop();
            self.cursor.reset(0);
            return;
        }
        let clamped = target.min(self.table.text_len().saturating_sub(1));
        let Some((idx, sub)) = self.table.locate(clamped) else {
            return;
        };
        info!(
            target,
            offset = clamped,
            sentence_idx = idx,
            sub_offset = sub,
            resume_playback,
            "Seeking"
        );
        if resume_playback {
            self.cursor.set(clamped, idx);
            self.play(idx, sub);
        } else {
            self.stop();
            self.cursor.set(clamped, idx);
        }
    }

    /// Apply new rate/pitch/voice. The host cannot change an utterance in
    /// flight, so live playback restarts at the current position.
    pub fn set_params(&mut self, params: VoiceParams) {
        if self.params == params {
            return;
        }
        self.params = params;
        match self.state {
            PlaybackState::Playing => {
                let (idx, sub) = self.cursor_position();
                info!(
                    sentence_idx = idx,
                    sub_offset = sub,
                    rate = self.params.rate,
                    pitch = self.params.pitch,
                    "Restarting narration with new voice parameters"
                );
                self.play(idx, sub);
            }
            PlaybackState::Paused => {
                // The paused utterance still carries the old parameters; drop
                // it so resume rebuilds one at the cursor.
                if self.active.take().is_some() {
                    self.needs_settle = true;
                    self.host.cancel();
                }
            }
            PlaybackState::Stopped => {}
        }
    }

    /// Feed one host event through the state machine. Returns the failure
    /// to surface when the event is a non-expected narration error.
    pub fn handle_event(&mut self, event: HostEvent) -> Option<SpeechErrorKind> {
        transitions::transition(self, event)
    }

    /// Current `(sentence_idx, sub_offset)` derived from the cursor.
    pub fn cursor_position(&self) -> (usize, usize) {
        let idx = self.cursor.sentence_idx();
        let start = self.table.start_of(idx).unwrap_or(0);
        (idx, self.cursor.offset().saturating_sub(start))
    }

    pub(in crate::tts) fn is_active(&self, id: UtteranceId) -> bool {
        self.active.map(|active| active.id == id).unwrap_or(false)
    }

    /// Speak the first speakable span at or after `(sentence_idx, sub_offset)`,
    /// or finish when none is left.
    pub(in crate::tts) fn advance(&mut self, mut sentence_idx: usize, mut sub_offset: usize) {
        loop {
            let Some(sentence) = self.table.get(sentence_idx) else {
                self.finish();
                return;
            };
            let tail = sentence.tail_from(sub_offset);
            if !tail.chars().any(|c| !c.is_whitespace()) {
                debug!(sentence_idx, "Skipping sentence with nothing to speak");
                sentence_idx += 1;
                sub_offset = 0;
                continue;
            }

            let id = UtteranceId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            let utterance = Utterance {
                id,
                text: tail.to_string(),
                params: self.params.clone(),
            };
            let start = sentence.start;
            self.host.speak(&utterance);
            self.active = Some(ActiveUtterance {
                id,
                sentence_idx,
                sub_offset,
            });
            self.state = PlaybackState::Playing;
            self.cursor.set(start + sub_offset, sentence_idx);
            debug!(
                utterance = %id,
                sentence_idx,
                sub_offset,
                chars = utterance.text.chars().count(),
                "Queued utterance"
            );
            return;
        }
    }

    fn finish(&mut self) {
        self.active = None;
        self.state = PlaybackState::Stopped;
        self.cursor.finish(self.table.len().saturating_sub(1));
        info!("Narration reached the end of the document");
    }

    /// The single place where a cancel is followed by a fresh speak. Waits
    /// for the host to drain only when something was actually cancelled.
    fn restart_point(&mut self) {
        if self.active.take().is_some() {
            self.needs_settle = true;
        }
        self.host.cancel();
        if std::mem::take(&mut self.needs_settle) {
            self.host.settle(self.restart_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::testing::{FakeHost, HostCall};

    const SAMPLE: &str = "Hello world. How are you? Fine!";
    const SETTLE: Duration = Duration::from_millis(50);

    fn driver_with(text: &str) -> SpeechDriver<FakeHost> {
        let mut driver = SpeechDriver::new(FakeHost::new(), SETTLE);
        driver.load(SentenceTable::build(text));
        driver.host_mut().clear();
        driver
    }

    fn active_id(driver: &SpeechDriver<FakeHost>) -> UtteranceId {
        driver.active.map(|a| a.id).unwrap()
    }

    #[test]
    fn play_speaks_one_sentence_with_current_params() {
        let mut driver = driver_with(SAMPLE);
        driver.set_params(VoiceParams {
            rate: 1.5,
            pitch: 0.8,
            voice: Some("Zira".to_string()),
        });
        driver.play(0, 0);

        assert_eq!(driver.state(), PlaybackState::Playing);
        let spoken = driver.host().last_spoken().unwrap();
        assert_eq!(spoken.text, "Hello world. ");
        assert_eq!(spoken.params.rate, 1.5);
        assert_eq!(spoken.params.voice.as_deref(), Some("Zira"));
        assert_eq!(driver.host().calls, vec![HostCall::Cancel, HostCall::Speak(spoken.clone())]);
    }

    #[test]
    fn play_at_sub_offset_speaks_the_tail() {
        let mut driver = driver_with(SAMPLE);
        driver.play(1, 4);
        assert_eq!(driver.host().last_spoken().unwrap().text, "are you? ");
        assert_eq!(driver.cursor().offset(), 17);
    }

    #[test]
    fn boundary_events_move_the_cursor() {
        let mut driver = driver_with(SAMPLE);
        driver.play(1, 4);
        let id = active_id(&driver);

        driver.handle_event(HostEvent::Boundary {
            utterance: id,
            char_index: 4,
        });

        assert_eq!(driver.cursor().offset(), 13 + 4 + 4);
        assert_eq!(driver.cursor().sentence_idx(), 1);
    }

    #[test]
    fn completion_chains_to_the_next_sentence_and_finishes() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        let mut last_progress = driver.cursor().progress_pct();

        for expected in ["How are you? ", "Fine!"] {
            let id = active_id(&driver);
            driver.handle_event(HostEvent::Boundary {
                utterance: id,
                char_index: 3,
            });
            assert!(driver.cursor().progress_pct() >= last_progress);
            last_progress = driver.cursor().progress_pct();

            driver.handle_event(HostEvent::Ended(id));
            assert_eq!(driver.host().last_spoken().unwrap().text, expected);
            assert!(driver.cursor().progress_pct() >= last_progress);
            last_progress = driver.cursor().progress_pct();
        }

        let id = active_id(&driver);
        driver.handle_event(HostEvent::Ended(id));
        assert_eq!(driver.state(), PlaybackState::Stopped);
        assert_eq!(driver.cursor().progress_pct(), 100.0);
        assert!(driver.active.is_none());
    }

    #[test]
    fn completion_does_not_cancel_or_wait() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        let id = active_id(&driver);
        driver.host_mut().clear();

        driver.handle_event(HostEvent::Ended(id));

        let calls = &driver.host().calls;
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], HostCall::Speak(_)));
    }

    #[test]
    fn whitespace_only_sentences_are_skipped_without_dropping_indices() {
        let mut driver = driver_with("  \nTwo. Three.");
        assert_eq!(driver.table().len(), 3);

        driver.play(0, 0);

        assert_eq!(driver.host().spoken().len(), 1);
        assert_eq!(driver.host().last_spoken().unwrap().text, "Two. ");
        assert_eq!(driver.cursor().sentence_idx(), 1);
        assert_eq!(driver.cursor().offset(), 3);
    }

    #[test]
    fn trailing_blank_sentence_finishes_playback() {
        let mut driver = driver_with("Only.");
        driver.play(0, 5);
        assert_eq!(driver.state(), PlaybackState::Stopped);
        assert!(driver.cursor().is_finished());
        assert!(driver.host().spoken().is_empty());
    }

    #[test]
    fn stale_events_are_ignored() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        let old = active_id(&driver);
        driver.play(2, 0);
        let offset = driver.cursor().offset();

        driver.handle_event(HostEvent::Boundary {
            utterance: old,
            char_index: 2,
        });
        driver.handle_event(HostEvent::Ended(old));
        let failure = driver.handle_event(HostEvent::Failed {
            utterance: old,
            error: SpeechErrorKind::AudioBusy,
        });

        assert_eq!(failure, None);
        assert_eq!(driver.cursor().offset(), offset);
        assert_eq!(driver.cursor().sentence_idx(), 2);
        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.host().spoken().len(), 2);
    }

    #[test]
    fn expected_errors_are_suppressed_and_others_stop_playback() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        let id = active_id(&driver);
        for kind in [SpeechErrorKind::Interrupted, SpeechErrorKind::Canceled] {
            assert_eq!(
                driver.handle_event(HostEvent::Failed {
                    utterance: id,
                    error: kind,
                }),
                None
            );
        }
        assert_eq!(driver.state(), PlaybackState::Playing);

        let failure = driver.handle_event(HostEvent::Failed {
            utterance: id,
            error: SpeechErrorKind::SynthesisFailed,
        });
        assert_eq!(failure, Some(SpeechErrorKind::SynthesisFailed));
        assert_eq!(driver.state(), PlaybackState::Stopped);
    }

    #[test]
    fn cancel_then_canceled_error_is_silent() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        let id = active_id(&driver);
        driver.stop();
        let failure = driver.handle_event(HostEvent::Failed {
            utterance: id,
            error: SpeechErrorKind::Canceled,
        });
        assert_eq!(failure, None);
        assert_eq!(driver.state(), PlaybackState::Stopped);
    }

    #[test]
    fn pause_and_resume_in_place() {
        let mut driver = driver_with(SAMPLE);
        assert!(!driver.pause());
        driver.play(0, 0);
        driver.host_mut().clear();

        assert!(driver.pause());
        assert_eq!(driver.state(), PlaybackState::Paused);
        assert!(driver.resume());
        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.host().calls, vec![HostCall::Pause, HostCall::Resume]);
        assert!(!driver.resume());
    }

    #[test]
    fn resume_falls_back_to_play_when_host_dropped_state() {
        let mut driver = driver_with(SAMPLE);
        driver.play(1, 0);
        let id = active_id(&driver);
        driver.handle_event(HostEvent::Boundary {
            utterance: id,
            char_index: 4,
        });
        driver.pause();
        driver.host_mut().forget_paused();
        driver.host_mut().clear();

        assert!(driver.resume());

        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.host().last_spoken().unwrap().text, "are you? ");
        assert_ne!(active_id(&driver), id);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        driver.stop();
        driver.stop();
        assert_eq!(driver.state(), PlaybackState::Stopped);
        assert!(driver.active.is_none());
    }

    #[test]
    fn seek_and_play_resolves_sentence_and_sub_offset() {
        let mut driver = driver_with(SAMPLE);
        driver.seek(20, true);

        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.cursor().sentence_idx(), 1);
        assert_eq!(driver.cursor_position(), (1, 7));
        assert_eq!(driver.host().last_spoken().unwrap().text, " you? ");
    }

    #[test]
    fn seek_without_play_updates_cursor_only() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        driver.host_mut().clear();

        driver.seek(27, false);

        assert_eq!(driver.state(), PlaybackState::Stopped);
        assert_eq!(driver.cursor().offset(), 27);
        assert_eq!(driver.cursor().sentence_idx(), 2);
        assert!(driver.host().spoken().is_empty());
    }

    #[test]
    fn seek_clamps_out_of_range_offsets() {
        let mut driver = driver_with(SAMPLE);
        driver.seek(10_000, false);
        assert_eq!(driver.cursor().offset(), SAMPLE.len() - 1);
        assert_eq!(driver.cursor().sentence_idx(), 2);

        let mut empty = driver_with("");
        empty.seek(5, true);
        assert_eq!(empty.state(), PlaybackState::Stopped);
        assert_eq!(empty.cursor().offset(), 0);
    }

    #[test]
    fn seek_property_holds_for_every_offset() {
        let mut driver = driver_with(SAMPLE);
        let offsets = driver.table().offsets();
        for target in 0..SAMPLE.len() {
            driver.seek(target, false);
            let s = driver.cursor().sentence_idx();
            assert!(offsets[s] <= target);
            assert!(s + 1 == offsets.len() || offsets[s + 1] > target);
        }
    }

    #[test]
    fn rate_change_while_playing_restarts_in_place() {
        let mut driver = driver_with("A b. Cc dd. Eeee ffff gg. Hh.");
        driver.play(2, 0);
        let id = active_id(&driver);
        driver.handle_event(HostEvent::Boundary {
            utterance: id,
            char_index: 4,
        });
        driver.host_mut().clear();

        driver.set_params(VoiceParams {
            rate: 2.0,
            ..VoiceParams::default()
        });

        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.cursor_position(), (2, 4));
        let calls = &driver.host().calls;
        assert_eq!(calls[0], HostCall::Cancel);
        assert_eq!(calls[1], HostCall::Settle(SETTLE));
        let HostCall::Speak(utterance) = &calls[2] else {
            panic!("expected a speak call, got {calls:?}");
        };
        assert_eq!(utterance.text, " ffff gg. ");
        assert_eq!(utterance.params.rate, 2.0);

        // The cancelled utterance's late completion must not advance.
        driver.handle_event(HostEvent::Ended(id));
        assert_eq!(driver.cursor().sentence_idx(), 2);
    }

    #[test]
    fn voice_change_while_playing_restarts_in_place() {
        let mut driver = driver_with("A b. Cc dd. Eeee ffff gg. Hh.");
        driver.play(2, 0);
        let id = active_id(&driver);
        driver.handle_event(HostEvent::Boundary {
            utterance: id,
            char_index: 4,
        });
        driver.host_mut().clear();

        driver.set_params(VoiceParams {
            voice: Some("Daniel".to_string()),
            ..VoiceParams::default()
        });

        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.cursor_position(), (2, 4));
        let calls = &driver.host().calls;
        assert_eq!(calls[0], HostCall::Cancel);
        let utterance = driver.host().last_spoken().unwrap();
        assert_eq!(utterance.text, " ffff gg. ");
        assert_eq!(utterance.params.voice.as_deref(), Some("Daniel"));
        assert_eq!(utterance.params.rate, 1.0);
    }

    #[test]
    fn param_change_while_paused_applies_on_resume() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        driver.pause();
        driver.set_params(VoiceParams {
            pitch: 1.7,
            ..VoiceParams::default()
        });
        assert_eq!(driver.state(), PlaybackState::Paused);

        driver.resume();

        assert_eq!(driver.state(), PlaybackState::Playing);
        assert_eq!(driver.host().last_spoken().unwrap().params.pitch, 1.7);
    }

    #[test]
    fn settle_only_follows_a_real_cancellation() {
        let mut driver = driver_with(SAMPLE);
        driver.play(0, 0);
        assert!(!driver.host().calls.contains(&HostCall::Settle(SETTLE)));

        driver.host_mut().clear();
        driver.play(1, 0);
        assert_eq!(driver.host().calls[1], HostCall::Settle(SETTLE));
    }

    #[test]
    fn play_from_finished_cursor_starts_over() {
        let mut driver = driver_with(SAMPLE);
        driver.play(2, 0);
        let id = active_id(&driver);
        driver.handle_event(HostEvent::Ended(id));
        assert!(driver.cursor().is_finished());

        driver.play_from_cursor();

        assert_eq!(driver.host().last_spoken().unwrap().text, "Hello world. ");
    }
}
