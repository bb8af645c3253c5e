//! Playback position shared by the speech driver and observers.

/// Current narration position within a document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackCursor {
    offset: usize,
    sentence_idx: usize,
    text_len: usize,
}

impl PlaybackCursor {
    pub fn new(text_len: usize) -> Self {
        Self {
            offset: 0,
            sentence_idx: 0,
            text_len,
        }
    }

    /// Back to the start of a (possibly different) document.
    pub fn reset(&mut self, text_len: usize) {
        *self = Self::new(text_len);
    }

    /// Move to `offset`, clamped to `[0, text_len - 1]`.
    pub fn set(&mut self, offset: usize, sentence_idx: usize) {
        self.offset = offset.min(self.text_len.saturating_sub(1));
        self.sentence_idx = sentence_idx;
    }

    /// Park the cursor one past the last character (progress 100).
    pub fn finish(&mut self, last_sentence_idx: usize) {
        self.offset = self.text_len;
        self.sentence_idx = last_sentence_idx;
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn sentence_idx(&self) -> usize {
        self.sentence_idx
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn is_finished(&self) -> bool {
        self.text_len > 0 && self.offset >= self.text_len
    }

    /// Percentage of the text traversed, in `[0, 100]`.
    pub fn progress_pct(&self) -> f64 {
        if self.text_len == 0 {
            return 0.0;
        }
        (self.offset as f64 / self.text_len as f64 * 100.0).clamp(0.0, 100.0)
    }
}
