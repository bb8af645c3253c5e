//! Entry point for the `lingualecta` command-line reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Open the persisted library and drive a `ReaderSession` for the
//!   requested subcommand.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use lingualecta::config::{AppConfig, load_config};
use lingualecta::media_session::{MediaAction, TracingMediaSession};
use lingualecta::notify::Notice;
use lingualecta::session::{ReaderCommand, ReaderSession, SessionEvent};
use lingualecta::settings::SettingsPatch;
use lingualecta::storage::FileStore;
use lingualecta::tts::driver::PlaybackState;
use lingualecta::tts::terminal::TerminalVoice;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
type CliSession = ReaderSession<TerminalVoice, TracingMediaSession>;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Parser)]
#[command(name = "lingualecta", version, about = "Listen to your books")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "conf/config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a PDF, EPUB or text file into the library.
    Import { path: PathBuf },
    /// List documents, newest first.
    List,
    Rename { id: String, title: String },
    Delete { id: String },
    /// List the bookmarks of a document.
    Bookmarks { id: String },
    /// List the voices offered by the speech host.
    Voices,
    /// Show settings, or update the given ones.
    Settings {
        #[arg(long)]
        rate: Option<f32>,
        #[arg(long)]
        pitch: Option<f32>,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        font_size: Option<u32>,
        #[arg(long, conflicts_with = "light")]
        dark: bool,
        #[arg(long)]
        light: bool,
    },
    /// Narrate a document, resuming at its latest bookmark.
    Read {
        id: String,
        /// Start at this char offset instead.
        #[arg(long)]
        from: Option<usize>,
    },
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %cli.config.display(),
        data_dir = %config.data_dir,
        level = %config.log_level,
        "Starting lingualecta"
    );

    let mut session = open_session(config);
    match cli.command {
        Command::Import { path } => {
            if !path.exists() {
                return Err(anyhow!("File not found: {}", path.display()));
            }
            apply(&mut session, ReaderCommand::Import { path });
        }
        Command::List => list_documents(&session),
        Command::Rename { id, title } => {
            apply(&mut session, ReaderCommand::Rename { id, title });
        }
        Command::Delete { id } => {
            apply(&mut session, ReaderCommand::Delete { id });
        }
        Command::Bookmarks { id } => list_bookmarks(&session, id)?,
        Command::Voices => list_voices(&session),
        Command::Settings {
            rate,
            pitch,
            voice,
            font_size,
            dark,
            light,
        } => {
            let dark_mode = match (dark, light) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let patch = SettingsPatch {
                rate,
                pitch,
                voice,
                font_size,
                dark_mode,
            };
            update_settings(&mut session, patch)?;
        }
        Command::Read { id, from } => read(&mut session, id, from)?,
    }
    Ok(())
}

fn open_session(config: AppConfig) -> CliSession {
    let store = FileStore::with_root(&config.data_dir);
    let host = TerminalVoice::stdout(config.words_per_minute);
    let mut session = ReaderSession::new(config, Box::new(store), host, TracingMediaSession::default());
    // The terminal host announces its voices on the first poll.
    let event = session.tick(Instant::now());
    report(&event.notices);
    session
}

fn apply(session: &mut CliSession, command: ReaderCommand) -> SessionEvent {
    let event = session.apply_command(command);
    report(&event.notices);
    event
}

fn report(notices: &[Notice]) {
    for notice in notices {
        if notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }
}

fn list_documents(session: &CliSession) {
    let documents = session.library().documents();
    if documents.is_empty() {
        println!("Your library is empty. Import a book to get started.");
        return;
    }
    for doc in documents {
        println!(
            "{}  [{}]  {} by {} ({} chars, {} bookmarks)",
            doc.id,
            doc.file_type,
            doc.title,
            doc.author,
            doc.text_len(),
            doc.bookmarks.len()
        );
    }
}

fn list_bookmarks(session: &CliSession, id: String) -> Result<()> {
    let doc = session
        .library()
        .get(&id)
        .ok_or_else(|| anyhow!("Document {id} not found"))?;
    if doc.bookmarks.is_empty() {
        println!("No bookmarks yet for {}.", doc.title);
    }
    for bookmark in doc.bookmarks.iter() {
        println!(
            "{}  @{}  {}  {}",
            bookmark.id,
            bookmark.char_index,
            bookmark.created_at.format("%Y-%m-%d %H:%M"),
            bookmark.preview_text
        );
    }
    Ok(())
}

fn list_voices(session: &CliSession) {
    let selected = session.snapshot().voice;
    for voice in session.voices() {
        let marker = if selected.as_deref() == Some(voice.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {} ({})", voice.name, voice.lang);
    }
}

fn update_settings(session: &mut CliSession, patch: SettingsPatch) -> Result<()> {
    if !patch.is_empty() {
        apply(session, ReaderCommand::ApplySettings { patch });
    }
    let rendered = serde_json::to_string_pretty(session.settings())
        .context("Failed to render settings")?;
    println!("{rendered}");
    Ok(())
}

fn read(session: &mut CliSession, id: String, from: Option<usize>) -> Result<()> {
    if session.library().get(&id).is_none() {
        return Err(anyhow!("Document {id} not found"));
    }
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl+C handler")?;
    let keys = spawn_key_reader();

    let event = apply(session, ReaderCommand::SelectDocument { id });
    if let Some(title) = &event.snapshot.title {
        println!(
            "Reading {title} from {:.1}% (p: play/pause, f/b: skip, m: bookmark, q: quit)",
            event.snapshot.progress_pct
        );
    }
    let mut last_state = match from {
        Some(offset) => apply(session, ReaderCommand::SeekTo { offset }),
        None => apply(session, ReaderCommand::Play),
    }
    .snapshot
    .state;

    loop {
        if interrupted.load(Ordering::SeqCst) {
            info!("Interrupted; saving position");
            apply(session, ReaderCommand::AddBookmark);
            apply(session, ReaderCommand::Stop);
            break;
        }
        let mut quit = false;
        while let Ok(key) = keys.try_recv() {
            match key {
                'p' => {
                    apply(session, ReaderCommand::TogglePlayPause);
                }
                'f' => {
                    apply(session, ReaderCommand::Media(MediaAction::SeekForward));
                }
                'b' => {
                    apply(session, ReaderCommand::Media(MediaAction::SeekBackward));
                }
                'm' => {
                    apply(session, ReaderCommand::AddBookmark);
                }
                'q' => quit = true,
                other => warn!(key = %other, "Unknown key command"),
            }
        }
        if quit {
            apply(session, ReaderCommand::Stop);
            break;
        }
        let event = session.tick(Instant::now());
        report(&event.notices);
        if event.snapshot.reached_end() {
            println!("Finished at {:.1}%.", event.snapshot.progress_pct);
            break;
        }
        let state = event.snapshot.state;
        if state == PlaybackState::Stopped && last_state != PlaybackState::Stopped {
            println!(
                "Stopped at {:.1}% (p: resume, q: quit).",
                event.snapshot.progress_pct
            );
        }
        last_state = state;
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

/// First char of each stdin line, for simple in-terminal controls.
fn spawn_key_reader() -> Receiver<char> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let Some(key) = line.trim().chars().next() else {
                continue;
            };
            if tx.send(key.to_ascii_lowercase()).is_err() {
                break;
            }
        }
    });
    rx
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
