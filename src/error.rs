//! Error taxonomy for the fallible library boundaries.
//!
//! Narration failures are plain values ([`crate::tts::SpeechErrorKind`]); every
//! error here is converted into a [`crate::notify::Notice`] by the session.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no readable text found in {0}")]
    Empty(String),
    #[error("unable to parse PDF: {0}")]
    Pdf(String),
    #[error("unable to open EPUB: {0}")]
    Epub(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error on `{key}`: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage is read-only")]
    ReadOnly,
}
