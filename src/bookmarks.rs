//! Per-document bookmarks.
//!
//! Bookmarks are kept in the order they were added. Offsets are checked only
//! when a bookmark is created; seeking to a stale offset clamps instead.

use crate::library::timestamp_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    /// Char offset into the owning document's text.
    pub char_index: usize,
    pub created_at: DateTime<Utc>,
    pub preview_text: String,
}

/// Up to `preview_chars` chars starting at `offset`, plus an ellipsis.
pub fn preview_at(text: &str, offset: usize, preview_chars: usize) -> String {
    let mut preview: String = text.chars().skip(offset).take(preview_chars).collect();
    preview.push_str("...");
    preview
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmarks(Vec<Bookmark>);

impl Bookmarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.0.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.0.iter().find(|bookmark| bookmark.id == id)
    }

    /// Append a bookmark at `offset` in `text`. Returns `None` for empty
    /// text; offsets past the end land on the last char.
    pub fn add(
        &mut self,
        text: &str,
        offset: usize,
        now: DateTime<Utc>,
        preview_chars: usize,
    ) -> Option<&Bookmark> {
        let text_len = text.chars().count();
        if text_len == 0 {
            return None;
        }
        let char_index = offset.min(text_len - 1);
        let id = timestamp_id(now, |candidate| self.get(candidate).is_some());
        self.0.push(Bookmark {
            id,
            char_index,
            created_at: now,
            preview_text: preview_at(text, char_index, preview_chars),
        });
        self.0.last()
    }

    pub fn remove(&mut self, id: &str) -> Option<Bookmark> {
        let idx = self.0.iter().position(|bookmark| bookmark.id == id)?;
        Some(self.0.remove(idx))
    }

    /// Most recently created bookmark; later entries win ties.
    pub fn latest(&self) -> Option<&Bookmark> {
        self.0.iter().reduce(|latest, current| {
            if latest.created_at > current.created_at {
                latest
            } else {
                current
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn preview_near_the_end_takes_the_rest() {
        let mut bookmarks = Bookmarks::new();
        let bookmark = bookmarks.add("0123456789", 5, at(0), 50).unwrap();
        assert_eq!(bookmark.preview_text, "56789...");
        assert_eq!(bookmark.char_index, 5);
    }

    #[test]
    fn preview_is_bounded_in_chars() {
        let text = "é".repeat(80);
        assert_eq!(preview_at(&text, 10, 50), format!("{}...", "é".repeat(50)));
    }

    #[test]
    fn bookmarks_keep_append_order_and_allow_duplicates() {
        let mut bookmarks = Bookmarks::new();
        bookmarks.add("Some text here.", 9, at(10), 50);
        bookmarks.add("Some text here.", 2, at(5), 50);
        bookmarks.add("Some text here.", 2, at(5), 50);

        let offsets: Vec<usize> = bookmarks.iter().map(|b| b.char_index).collect();
        assert_eq!(offsets, vec![9, 2, 2]);
        let ids: Vec<&str> = bookmarks.iter().map(|b| b.id.as_str()).collect();
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn latest_uses_creation_time_with_later_entries_winning_ties() {
        let mut bookmarks = Bookmarks::new();
        assert!(bookmarks.latest().is_none());
        bookmarks.add("abcdefghij", 1, at(30), 50);
        bookmarks.add("abcdefghij", 2, at(10), 50);
        bookmarks.add("abcdefghij", 3, at(30), 50);
        assert_eq!(bookmarks.latest().unwrap().char_index, 3);
    }

    #[test]
    fn remove_filters_by_id() {
        let mut bookmarks = Bookmarks::new();
        let id = bookmarks.add("abcdefghij", 1, at(1), 50).unwrap().id.clone();
        bookmarks.add("abcdefghij", 2, at(2), 50);
        assert!(bookmarks.remove(&id).is_some());
        assert!(bookmarks.remove(&id).is_none());
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks.iter().next().unwrap().char_index, 2);
    }

    #[test]
    fn empty_documents_cannot_be_bookmarked_and_offsets_clamp() {
        let mut bookmarks = Bookmarks::new();
        assert!(bookmarks.add("", 0, at(0), 50).is_none());
        let bookmark = bookmarks.add("abc", 3, at(0), 50).unwrap();
        assert_eq!(bookmark.char_index, 2);
        assert_eq!(bookmark.preview_text, "c...");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut bookmarks = Bookmarks::new();
        bookmarks.add("abc", 0, at(0), 50);
        let json = serde_json::to_value(&bookmarks).unwrap();
        let first = &json[0];
        assert_eq!(first["charIndex"], 0);
        assert_eq!(first["previewText"], "abc...");
        assert!(first["createdAt"].is_string());
    }
}
