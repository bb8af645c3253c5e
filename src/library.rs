//! The in-memory library of imported documents and its persisted snapshot.

use crate::bookmarks::Bookmarks;
use crate::error::StorageError;
use crate::storage::{KeyValueStore, keys, load_json, save_json};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Pdf,
    Epub,
    Mobi,
    Docx,
    Txt,
}

impl FileType {
    /// Format tag from a file extension; unknown extensions read as text.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            "epub" => FileType::Epub,
            "mobi" => FileType::Mobi,
            "docx" => FileType::Docx,
            _ => FileType::Txt,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Txt)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileType::Pdf => "PDF",
            FileType::Epub => "EPUB",
            FileType::Mobi => "MOBI",
            FileType::Docx => "DOCX",
            FileType::Txt => "TXT",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub author: String,
    /// `data:` URI of the cover image.
    pub cover_image: String,
    pub file_type: FileType,
    /// Newline-normalized text.
    pub content: String,
    #[serde(default)]
    pub bookmarks: Bookmarks,
}

impl Document {
    pub fn text_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Creation-timestamp id, suffixed until `taken` rejects it no more.
pub(crate) fn timestamp_id(now: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> String {
    let base = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    if !taken(&base) {
        return base;
    }
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Library {
    documents: Vec<Document>,
}

impl Library {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Read the persisted snapshot. A missing key is an empty library.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        let documents: Vec<Document> = load_json(store, keys::BOOKS)?.unwrap_or_default();
        debug!(count = documents.len(), "Loaded library snapshot");
        Ok(Self { documents })
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        save_json(store, keys::BOOKS, &self.documents)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|doc| doc.id == id)
    }

    /// Insert at the front, re-keying the document if its id is taken.
    /// Returns the id it was stored under.
    pub fn insert_front(&mut self, mut document: Document, now: DateTime<Utc>) -> String {
        if document.id.is_empty() || self.get(&document.id).is_some() {
            document.id = timestamp_id(now, |candidate| self.get(candidate).is_some());
        }
        let id = document.id.clone();
        info!(%id, title = %document.title, file_type = %document.file_type, "Added document to library");
        self.documents.insert(0, document);
        id
    }

    /// Returns `false` when the id is unknown or the title is blank.
    pub fn rename(&mut self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        match self.get_mut(id) {
            Some(doc) => {
                info!(%id, from = %doc.title, to = %title, "Renamed document");
                doc.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let idx = self.documents.iter().position(|doc| doc.id == id)?;
        let removed = self.documents.remove(idx);
        info!(%id, title = %removed.title, "Deleted document");
        Some(removed)
    }
}
