//! Sentence segmentation for narration alignment.
//!
//! The document text is cut into sentences that end at `.`, `!`, `?` or a
//! newline (inclusive), with any whitespace that follows the terminators kept
//! on the sentence it trails. Nothing is filtered out, so the sentences always
//! concatenate back to the original text and the offset table stays exact.
//! Whitespace-only sentences are kept in the table; the speech driver skips
//! them at playback time.
//!
//! All offsets are counted in `char`s, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\n]*[.!?\n]+\s*|[^.!?\n]+").unwrap());

/// One entry of the sentence table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Char offset of the first character within the full text.
    pub start: usize,
    /// Length in chars.
    pub char_len: usize,
    pub text: String,
}

impl Sentence {
    /// Char offset one past the last character.
    pub fn end(&self) -> usize {
        self.start + self.char_len
    }

    /// Whether the sentence has anything to say.
    pub fn is_speakable(&self) -> bool {
        self.text.chars().any(|c| !c.is_whitespace())
    }

    /// The remainder of the sentence starting `sub_offset` chars in.
    pub fn tail_from(&self, sub_offset: usize) -> &str {
        match self.text.char_indices().nth(sub_offset) {
            Some((byte_idx, _)) => &self.text[byte_idx..],
            None => "",
        }
    }
}

/// Ordered sentences of a document together with their start offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceTable {
    sentences: Vec<Sentence>,
    /// Words in every sentence after the one at the same index.
    words_after: Vec<usize>,
    text_len: usize,
}

impl SentenceTable {
    pub fn build(text: &str) -> Self {
        let mut sentences = Vec::new();
        let mut start = 0usize;
        for found in RE_SENTENCE.find_iter(text) {
            let piece = found.as_str();
            let char_len = piece.chars().count();
            sentences.push(Sentence {
                start,
                char_len,
                text: piece.to_string(),
            });
            start += char_len;
        }
        let mut words_after = vec![0; sentences.len()];
        for idx in (0..sentences.len().saturating_sub(1)).rev() {
            words_after[idx] = words_after[idx + 1] + word_count(&sentences[idx + 1].text);
        }
        Self {
            sentences,
            words_after,
            text_len: start,
        }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Total text length in chars.
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn get(&self, idx: usize) -> Option<&Sentence> {
        self.sentences.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sentence> {
        self.sentences.iter()
    }

    pub fn start_of(&self, idx: usize) -> Option<usize> {
        self.sentences.get(idx).map(|s| s.start)
    }

    /// Start offsets indexed by sentence.
    pub fn offsets(&self) -> Vec<usize> {
        self.sentences.iter().map(|s| s.start).collect()
    }

    /// Resolve a char offset to `(sentence_idx, sub_offset)`.
    ///
    /// Picks the last sentence starting at or before `offset`. Offsets past
    /// the end resolve into the last sentence, so the sub-offset may exceed
    /// that sentence's length.
    pub fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        if self.sentences.is_empty() {
            return None;
        }
        let idx = self
            .sentences
            .partition_point(|s| s.start <= offset)
            .saturating_sub(1);
        let start = self.sentences[idx].start;
        Some((idx, offset.saturating_sub(start)))
    }

    /// Whitespace-separated words from `offset` to the end of the text. Only
    /// the sentence holding `offset` is scanned.
    pub fn words_from(&self, offset: usize) -> usize {
        if offset >= self.text_len {
            return 0;
        }
        match self.locate(offset) {
            Some((idx, sub)) => {
                word_count(self.sentences[idx].tail_from(sub)) + self.words_after[idx]
            }
            None => 0,
        }
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentence strings. See [`SentenceTable::build`].
pub fn split_sentences(text: &str) -> Vec<String> {
    SentenceTable::build(text)
        .sentences
        .into_iter()
        .map(|s| s.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "no terminators at all",
        "Hello world. How are you? Fine!",
        "...and then",
        "Line one\nLine two\n\n\nLine three.",
        "  leading space. trailing space.   ",
        "Wait?! Really!!! Yes.",
        "Ünïcödé — tëxt. Ça va? 日本語。テスト!",
        "\n\n",
    ];

    #[test]
    fn splits_the_reference_sentence() {
        let table = SentenceTable::build("Hello world. How are you? Fine!");
        let texts: Vec<&str> = table.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello world. ", "How are you? ", "Fine!"]);
        assert_eq!(table.offsets(), vec![0, 13, 26]);
    }

    #[test]
    fn segmentation_is_lossless() {
        for sample in SAMPLES {
            let joined: String = split_sentences(sample).concat();
            assert_eq!(&joined, sample);
        }
    }

    #[test]
    fn offsets_chain_through_lengths() {
        for sample in SAMPLES {
            let table = SentenceTable::build(sample);
            for idx in 0..table.len().saturating_sub(1) {
                let current = table.get(idx).unwrap();
                assert_eq!(current.start + current.char_len, table.start_of(idx + 1).unwrap());
            }
            assert_eq!(table.text_len(), sample.chars().count());
        }
    }

    #[test]
    fn words_from_counts_the_rest_of_the_text() {
        let text = "One two three. Four five?\nSix seven eight nine!";
        let table = SentenceTable::build(text);
        assert_eq!(table.words_from(0), 9);
        assert_eq!(table.words_from(4), 8);
        assert_eq!(table.words_from(15), 6);
        assert_eq!(table.words_from(17), 6);
        assert_eq!(table.words_from(text.chars().count()), 0);
        for offset in 0..text.len() {
            let rest: String = text.chars().skip(offset).collect();
            assert_eq!(table.words_from(offset), rest.split_whitespace().count());
        }
        assert_eq!(SentenceTable::build("").words_from(0), 0);
    }

    #[test]
    fn empty_text_has_no_sentences() {
        let table = SentenceTable::build("");
        assert!(table.is_empty());
        assert_eq!(table.locate(0), None);
    }

    #[test]
    fn text_without_terminators_is_one_sentence() {
        let table = SentenceTable::build("just words");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().text, "just words");
    }

    #[test]
    fn whitespace_only_segments_are_kept_but_not_speakable() {
        let table = SentenceTable::build("   ");
        assert_eq!(table.len(), 1);
        assert!(!table.get(0).unwrap().is_speakable());

        let table = SentenceTable::build("...so");
        assert_eq!(split_sentences("...so"), vec!["...", "so"]);
        assert!(!table.get(0).unwrap().text.is_empty());
    }

    #[test]
    fn newlines_terminate_sentences() {
        assert_eq!(
            split_sentences("Line one\nLine two"),
            vec!["Line one\n", "Line two"]
        );
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let table = SentenceTable::build("Ça va? Oui.");
        assert_eq!(table.offsets(), vec![0, 7]);
        assert_eq!(table.text_len(), 11);
    }

    #[test]
    fn locate_picks_last_sentence_starting_at_or_before() {
        let table = SentenceTable::build("Hello world. How are you? Fine!");
        for offset in 0..table.text_len() {
            let (idx, sub) = table.locate(offset).unwrap();
            let offsets = table.offsets();
            assert!(offsets[idx] <= offset);
            assert!(idx + 1 == offsets.len() || offsets[idx + 1] > offset);
            assert_eq!(offsets[idx] + sub, offset);
        }
        assert_eq!(table.locate(20), Some((1, 7)));
        assert_eq!(table.locate(500), Some((2, 474)));
    }

    #[test]
    fn tail_from_slices_on_char_boundaries() {
        let table = SentenceTable::build("Ça va? Oui.");
        let first = table.get(0).unwrap();
        assert_eq!(first.tail_from(1), "a va? ");
        assert_eq!(first.tail_from(99), "");
    }
}
