//! The reader orchestrator.
//!
//! `ReaderSession` owns the library, settings, store, speech driver, voice
//! catalog and media-session bridge. Front ends feed it [`ReaderCommand`]s and
//! host events; each call returns a [`SessionEvent`] carrying a fresh
//! snapshot and whatever notices the call produced.

use crate::bookmarks::Bookmark;
use crate::config::AppConfig;
use crate::importer::Importer;
use crate::library::{Document, Library};
use crate::media_session::{MediaAction, MediaContext, MediaMetadata, MediaSession};
use crate::notify::Notice;
use crate::settings::{Settings, SettingsPatch};
use crate::storage::KeyValueStore;
use crate::text_utils::SentenceTable;
use crate::tts::driver::{PlaybackState, SpeechDriver};
use crate::tts::{HostEvent, SpeechHost, Voice};
use crate::voices::VoiceCatalog;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

const MIN_EFFECTIVE_WPM: f64 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    GetSnapshot,
    SelectDocument { id: String },
    CloseDocument,
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    /// Seek and start playing.
    SeekTo { offset: usize },
    GoToBookmark { id: String },
    AddBookmark,
    RemoveBookmark { id: String },
    ApplySettings { patch: SettingsPatch },
    Media(MediaAction),
    Import { path: PathBuf },
    Rename { id: String, title: String },
    Delete { id: String },
}

impl ReaderCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::SelectDocument { .. } => "reader_select_document",
            Self::CloseDocument => "reader_close_document",
            Self::Play => "reader_play",
            Self::Pause => "reader_pause",
            Self::TogglePlayPause => "reader_toggle_play_pause",
            Self::Stop => "reader_stop",
            Self::SeekTo { .. } => "reader_seek_to",
            Self::GoToBookmark { .. } => "reader_go_to_bookmark",
            Self::AddBookmark => "reader_add_bookmark",
            Self::RemoveBookmark { .. } => "reader_remove_bookmark",
            Self::ApplySettings { .. } => "reader_apply_settings",
            Self::Media(_) => "reader_media_action",
            Self::Import { .. } => "reader_import",
            Self::Rename { .. } => "reader_rename",
            Self::Delete { .. } => "reader_delete",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReaderSnapshot {
    pub document_id: Option<String>,
    pub title: Option<String>,
    pub state: PlaybackState,
    pub offset: usize,
    pub text_len: usize,
    pub sentence_idx: usize,
    pub sentence_count: usize,
    pub current_sentence: Option<String>,
    pub progress_pct: f64,
    pub time_remaining_secs: f64,
    pub bookmarks: Vec<Bookmark>,
    pub settings: Settings,
    pub voice: Option<String>,
}

impl ReaderSnapshot {
    /// Narration ran off the end of the document (or it has no text).
    /// Stopping anywhere else leaves the reader resumable.
    pub fn reached_end(&self) -> bool {
        self.state == PlaybackState::Stopped && self.offset >= self.text_len
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: ReaderSnapshot,
    pub notices: Vec<Notice>,
}

pub struct ReaderSession<H: SpeechHost, M: MediaSession> {
    config: AppConfig,
    library: Library,
    settings: Settings,
    store: Box<dyn KeyValueStore>,
    driver: SpeechDriver<H>,
    voices: VoiceCatalog,
    media: M,
    importer: Importer,
    selected: Option<String>,
    pending: Vec<Notice>,
}

impl<H: SpeechHost, M: MediaSession> ReaderSession<H, M> {
    /// Read persisted state and wire the collaborators together. Storage
    /// failures degrade to an empty library plus a notice.
    pub fn new(config: AppConfig, store: Box<dyn KeyValueStore>, host: H, media: M) -> Self {
        let mut pending = Vec::new();
        let library = match Library::load(store.as_ref()) {
            Ok(library) => library,
            Err(err) => {
                warn!("Failed to load library, starting empty: {err}");
                pending.push(Notice::error(format!(
                    "Could not load your library; starting with an empty one ({err})"
                )));
                Library::default()
            }
        };
        let settings = Settings::load(store.as_ref(), Settings::from_config(&config));
        let voices = VoiceCatalog::new(host.voices());
        let mut driver = SpeechDriver::new(host, config.restart_delay());
        driver.set_params(settings.voice_params());
        info!(
            documents = library.len(),
            voices = voices.voices().len(),
            "Reader session ready"
        );

        let mut session = Self {
            config,
            library,
            settings,
            store,
            driver,
            voices,
            media,
            importer: Importer::default(),
            selected: None,
            pending,
        };
        if !session.voices.is_empty() {
            session.ensure_voice();
        }
        session.sync_media();
        session
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn voices(&self) -> &[Voice] {
        self.voices.voices()
    }

    pub fn driver(&self) -> &SpeechDriver<H> {
        &self.driver
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn selected_document(&self) -> Option<&Document> {
        self.selected.as_deref().and_then(|id| self.library.get(id))
    }

    pub fn apply_command(&mut self, command: ReaderCommand) -> SessionEvent {
        let action = command.action();
        debug!(action, "Applying reader command");
        match command {
            ReaderCommand::GetSnapshot => {}
            ReaderCommand::SelectDocument { id } => self.select_document(&id),
            ReaderCommand::CloseDocument => self.close_document(),
            ReaderCommand::Play => self.play(),
            ReaderCommand::Pause => {
                self.driver.pause();
            }
            ReaderCommand::TogglePlayPause => self.toggle_play_pause(),
            ReaderCommand::Stop => self.driver.stop(),
            ReaderCommand::SeekTo { offset } => self.seek_and_play(offset),
            ReaderCommand::GoToBookmark { id } => self.go_to_bookmark(&id),
            ReaderCommand::AddBookmark => self.add_bookmark(),
            ReaderCommand::RemoveBookmark { id } => self.remove_bookmark(&id),
            ReaderCommand::ApplySettings { patch } => self.apply_settings(&patch),
            ReaderCommand::Media(media_action) => self.handle_media_action(media_action),
            ReaderCommand::Import { path } => self.import(path),
            ReaderCommand::Rename { id, title } => self.rename(&id, &title),
            ReaderCommand::Delete { id } => self.delete(&id),
        }
        self.finish(action)
    }

    /// Drain host events that became due by `now`.
    pub fn tick(&mut self, now: Instant) -> SessionEvent {
        let events = self.driver.host_mut().poll_events(now);
        for event in events {
            self.dispatch_host_event(event);
        }
        self.finish("reader_host_events")
    }

    pub fn handle_host_event(&mut self, event: HostEvent) -> SessionEvent {
        self.dispatch_host_event(event);
        self.finish("reader_host_event")
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let document = self.selected_document();
        let cursor = self.driver.cursor();
        let table = self.driver.table();
        let current_sentence = document
            .filter(|_| !cursor.is_finished())
            .and_then(|_| table.get(cursor.sentence_idx()))
            .map(|sentence| sentence.text.clone());
        ReaderSnapshot {
            document_id: document.map(|doc| doc.id.clone()),
            title: document.map(|doc| doc.title.clone()),
            state: self.driver.state(),
            offset: cursor.offset(),
            text_len: cursor.text_len(),
            sentence_idx: cursor.sentence_idx(),
            sentence_count: table.len(),
            current_sentence,
            progress_pct: cursor.progress_pct(),
            time_remaining_secs: self.time_remaining_secs(document),
            bookmarks: document
                .map(|doc| doc.bookmarks.iter().cloned().collect())
                .unwrap_or_default(),
            settings: self.settings.clone(),
            voice: self
                .voices
                .resolve(self.settings.voice.as_deref())
                .map(|voice| voice.name.clone())
                .or_else(|| self.settings.voice.clone()),
        }
    }

    fn finish(&mut self, action: &'static str) -> SessionEvent {
        self.sync_media();
        SessionEvent {
            action,
            snapshot: self.snapshot(),
            notices: std::mem::take(&mut self.pending),
        }
    }

    fn notify(&mut self, notice: Notice) {
        debug!(%notice, "Queued notice");
        self.pending.push(notice);
    }

    fn time_remaining_secs(&self, document: Option<&Document>) -> f64 {
        if document.is_none() {
            return 0.0;
        }
        let words_left = self.driver.table().words_from(self.driver.cursor().offset());
        let effective_wpm =
            (self.config.words_per_minute as f64 * self.settings.rate as f64).max(MIN_EFFECTIVE_WPM);
        words_left as f64 / effective_wpm * 60.0
    }

    fn sync_media(&mut self) {
        let metadata = self.selected_document().map(|doc| MediaMetadata {
            title: doc.title.clone(),
            artist: doc.author.clone(),
        });
        let cursor = self.driver.cursor();
        let context = MediaContext {
            metadata,
            state: self.driver.state(),
            offset: cursor.offset(),
            sentence_idx: cursor.sentence_idx(),
            progress_pct: cursor.progress_pct(),
            rate: self.settings.rate,
        };
        self.media.update(&context);
    }

    fn dispatch_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::VoicesChanged(voices) => {
                info!(count = voices.len(), "Voice list arrived");
                self.voices.replace(voices);
                self.ensure_voice();
            }
            other => {
                if let Some(error) = self.driver.handle_event(other) {
                    self.notify(Notice::error(format!("Narration failed: {error}")));
                }
            }
        }
    }

    /// Keep the selected voice when it is offered, else pick the default.
    fn ensure_voice(&mut self) {
        let selected = self.settings.voice.as_deref();
        if selected.is_some_and(|name| self.voices.find(name).is_some()) {
            return;
        }
        let Some(default) = self.voices.default_voice().map(|voice| voice.name.clone()) else {
            return;
        };
        info!(voice = %default, previous = ?self.settings.voice, "Selecting default voice");
        self.apply_settings(&SettingsPatch {
            voice: Some(default),
            ..SettingsPatch::default()
        });
    }

    fn persist_library(&mut self) {
        if let Err(err) = self.library.save(self.store.as_mut()) {
            warn!("Failed to persist library: {err}");
            self.notify(Notice::error(format!("Could not save your library: {err}")));
        }
    }

    fn persist_settings(&mut self) {
        if let Err(err) = self.settings.save(self.store.as_mut()) {
            warn!("Failed to persist settings: {err}");
            self.notify(Notice::error(format!("Could not save your settings: {err}")));
        }
    }

    fn require_document(&mut self) -> bool {
        if self.selected_document().is_some() {
            return true;
        }
        self.notify(Notice::warning("Select a document first."));
        false
    }

    fn select_document(&mut self, id: &str) {
        let Some(document) = self.library.get(id) else {
            self.notify(Notice::error(format!("Document {id} not found.")));
            return;
        };
        let resume_at = document.bookmarks.latest().map(|bookmark| bookmark.char_index);
        let table = SentenceTable::build(&document.content);
        info!(
            %id,
            title = %document.title,
            sentences = table.len(),
            resume_at = ?resume_at,
            "Selected document"
        );
        self.selected = Some(id.to_string());
        self.driver.load(table);
        self.driver.seek(resume_at.unwrap_or(0), false);
    }

    fn close_document(&mut self) {
        self.driver.load(SentenceTable::default());
        self.selected = None;
    }

    fn play(&mut self) {
        if self.require_document() {
            self.driver.play_from_cursor();
        }
    }

    fn toggle_play_pause(&mut self) {
        match self.driver.state() {
            PlaybackState::Playing => {
                self.driver.pause();
            }
            PlaybackState::Paused => {
                self.driver.resume();
            }
            PlaybackState::Stopped => self.play(),
        }
    }

    fn seek_and_play(&mut self, offset: usize) {
        if self.require_document() {
            self.driver.seek(offset, true);
        }
    }

    fn go_to_bookmark(&mut self, id: &str) {
        let offset = self
            .selected_document()
            .and_then(|doc| doc.bookmarks.get(id))
            .map(|bookmark| bookmark.char_index);
        match offset {
            Some(offset) => self.seek_and_play(offset),
            None => self.notify(Notice::error("Bookmark not found.")),
        }
    }

    fn add_bookmark(&mut self) {
        let offset = self.driver.cursor().offset();
        let preview_chars = self.config.preview_chars;
        let Some(id) = self.selected.clone() else {
            self.notify(Notice::warning("Select a document first."));
            return;
        };
        let Some(document) = self.library.get_mut(&id) else {
            return;
        };
        let added = document
            .bookmarks
            .add(&document.content, offset, Utc::now(), preview_chars)
            .map(|bookmark| bookmark.char_index);
        match added {
            Some(char_index) => {
                info!(document = %id, char_index, "Bookmark added");
                self.notify(Notice::success("Bookmark added!"));
                self.persist_library();
            }
            None => self.notify(Notice::warning("Nothing to bookmark in an empty document.")),
        }
    }

    fn remove_bookmark(&mut self, bookmark_id: &str) {
        let removed = self
            .selected
            .clone()
            .and_then(|id| self.library.get_mut(&id))
            .and_then(|doc| doc.bookmarks.remove(bookmark_id));
        if removed.is_some() {
            self.notify(Notice::info("Bookmark removed."));
            self.persist_library();
        } else {
            self.notify(Notice::error("Bookmark not found."));
        }
    }

    fn apply_settings(&mut self, patch: &SettingsPatch) {
        let change = self.settings.apply(patch);
        if change.voice {
            self.driver.set_params(self.settings.voice_params());
        }
        if change.any() {
            self.persist_settings();
        }
    }

    fn handle_media_action(&mut self, media_action: MediaAction) {
        debug!(?media_action, state = %self.driver.state(), "Media action");
        match media_action {
            MediaAction::Play | MediaAction::Pause => self.toggle_play_pause(),
            MediaAction::SeekForward | MediaAction::SeekBackward => {
                if self.selected_document().is_none() {
                    return;
                }
                let step = self.config.seek_step_chars;
                let offset = self.driver.cursor().offset();
                let target = if media_action == MediaAction::SeekForward {
                    offset.saturating_add(step)
                } else {
                    offset.saturating_sub(step)
                };
                let keep_playing = self.driver.state() == PlaybackState::Playing;
                self.driver.seek(target, keep_playing);
            }
        }
    }

    fn import(&mut self, path: PathBuf) {
        match self.importer.import_path(&path, Utc::now()) {
            Ok(document) => {
                let title = document.title.clone();
                let id = self.library.insert_front(document, Utc::now());
                self.notify(Notice::success(format!(
                    "{title} has been added to your library."
                )));
                self.persist_library();
                self.select_document(&id);
            }
            Err(err) => {
                warn!(path = %path.display(), "Import failed: {err}");
                self.notify(Notice::error(format!("Import failed: {err}")));
            }
        }
    }

    fn rename(&mut self, id: &str, title: &str) {
        if self.library.rename(id, title) {
            self.notify(Notice::success("Book renamed successfully."));
            self.persist_library();
        } else {
            self.notify(Notice::error("Could not rename: unknown book or empty title."));
        }
    }

    fn delete(&mut self, id: &str) {
        if self.library.remove(id).is_none() {
            self.notify(Notice::error(format!("Document {id} not found.")));
            return;
        }
        if self.selected.as_deref() == Some(id) {
            self.close_document();
        }
        self.notify(Notice::info("Book deleted."));
        self.persist_library();
    }
}
