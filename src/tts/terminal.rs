//! A speech host that "speaks" by printing words to a writer at a
//! reading pace, so the reader can run without an audio stack.

use super::{HostEvent, SpeechErrorKind, SpeechHost, Utterance, UtteranceId, Voice};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub fn builtin_voices() -> Vec<Voice> {
    vec![
        Voice {
            is_default: true,
            ..Voice::new("Console Narrator", "en-US")
        },
        Voice::new("Console Narrator UK Male", "en-GB"),
        Voice::new("Console Lectrice", "fr-FR"),
    ]
}

struct Speaking {
    id: UtteranceId,
    /// `(char_index, word)` pairs within the utterance text.
    words: Vec<(usize, String)>,
    next: usize,
    interval: Duration,
    next_due: Option<Instant>,
    paused: bool,
}

pub struct TerminalVoice<W: Write = io::Stdout> {
    out: W,
    voices: Vec<Voice>,
    words_per_minute: u32,
    queued: VecDeque<HostEvent>,
    speaking: Option<Speaking>,
    announced: bool,
}

impl TerminalVoice<io::Stdout> {
    pub fn stdout(words_per_minute: u32) -> Self {
        Self::new(io::stdout(), builtin_voices(), words_per_minute)
    }
}

impl<W: Write> TerminalVoice<W> {
    pub fn new(out: W, voices: Vec<Voice>, words_per_minute: u32) -> Self {
        Self {
            out,
            voices,
            words_per_minute: words_per_minute.max(1),
            queued: VecDeque::new(),
            speaking: None,
            announced: false,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.is_some()
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = write!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!(error = %err, "Failed to write narration output");
        }
    }

    fn interrupt_current(&mut self) {
        if let Some(speaking) = self.speaking.take() {
            debug!(utterance = %speaking.id, "Interrupting terminal utterance");
            self.emit("\n");
            self.queued.push_back(HostEvent::Failed {
                utterance: speaking.id,
                error: SpeechErrorKind::Interrupted,
            });
        }
    }
}

fn split_words(text: &str) -> Vec<(usize, String)> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    for (char_idx, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push((start, std::mem::take(&mut current)));
            }
        } else {
            if current.is_empty() {
                start = char_idx;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push((start, current));
    }
    words
}

impl<W: Write> SpeechHost for TerminalVoice<W> {
    fn voices(&self) -> Vec<Voice> {
        if self.announced {
            self.voices.clone()
        } else {
            Vec::new()
        }
    }

    fn speak(&mut self, utterance: &Utterance) {
        self.interrupt_current();
        let words_per_second = self.words_per_minute as f32 / 60.0 * utterance.params.rate.max(0.1);
        let interval = Duration::from_secs_f32(1.0 / words_per_second);
        self.queued.push_back(HostEvent::Started(utterance.id));
        self.speaking = Some(Speaking {
            id: utterance.id,
            words: split_words(&utterance.text),
            next: 0,
            interval,
            next_due: None,
            paused: false,
        });
    }

    fn pause(&mut self) {
        if let Some(speaking) = self.speaking.as_mut() {
            speaking.paused = true;
            speaking.next_due = None;
        }
    }

    fn resume(&mut self) -> bool {
        match self.speaking.as_mut() {
            Some(speaking) if speaking.paused => {
                speaking.paused = false;
                true
            }
            _ => false,
        }
    }

    fn cancel(&mut self) {
        self.interrupt_current();
    }

    fn poll_events(&mut self, now: Instant) -> Vec<HostEvent> {
        let mut events: Vec<HostEvent> = self.queued.drain(..).collect();
        if !self.announced {
            self.announced = true;
            events.push(HostEvent::VoicesChanged(self.voices.clone()));
        }

        let mut printed = Vec::new();
        let mut finished = None;
        if let Some(speaking) = self.speaking.as_mut().filter(|s| !s.paused) {
            let mut due = *speaking.next_due.get_or_insert(now);
            while due <= now && speaking.next < speaking.words.len() {
                let (char_index, word) = &speaking.words[speaking.next];
                events.push(HostEvent::Boundary {
                    utterance: speaking.id,
                    char_index: *char_index,
                });
                printed.push(word.clone());
                speaking.next += 1;
                due += speaking.interval;
            }
            speaking.next_due = Some(due);
            if speaking.next >= speaking.words.len() && due <= now {
                finished = Some(speaking.id);
            }
        }

        for word in printed {
            self.emit(&format!("{word} "));
        }
        if let Some(id) = finished {
            self.speaking = None;
            self.emit("\n");
            events.push(HostEvent::Ended(id));
        }
        events
    }

    fn settle(&mut self, delay: Duration) {
        std::thread::sleep(delay.min(Duration::from_millis(250)));
    }
}
