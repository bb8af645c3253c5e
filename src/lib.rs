//! Listen to your books: sentence-synchronized narration over an injected
//! speech primitive, with bookmarks, resumable playback and a persisted
//! library.

pub mod bookmarks;
pub mod config;
pub mod cursor;
pub mod error;
pub mod importer;
pub mod library;
pub mod media_session;
pub mod notify;
pub mod session;
pub mod settings;
pub mod storage;
pub mod text_utils;
pub mod tts;
pub mod voices;
