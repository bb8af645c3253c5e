//! Turning a file into a [`Document`].
//!
//! PDF text comes from a [`PdfParser`] collaborator; EPUB spines are flattened
//! with `html2text`; everything else is read as text. The result is
//! newline-normalized and NFC-composed before it becomes a document.

use crate::bookmarks::Bookmarks;
use crate::error::ImportError;
use crate::library::{Document, FileType};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use epub::doc::EpubDoc;
use image::{ImageBuffer, Rgb};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

const COVER_WIDTH: u32 = 300;
const COVER_HEIGHT: u32 = 400;
const COVER_FRAME: u32 = 12;
const BEIGE: Rgb<u8> = Rgb([0xf5, 0xf5, 0xdc]);
const SIENNA: Rgb<u8> = Rgb([0xa0, 0x52, 0x2d]);

static RE_LINE_ENDINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r").unwrap());
static RE_NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Text and optional first-page raster extracted from a PDF.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfContent {
    pub pages: Vec<String>,
    /// PNG bytes of the first page, when the parser can render one.
    pub cover_png: Option<Vec<u8>>,
}

pub trait PdfParser {
    fn parse(&self, bytes: &[u8]) -> Result<PdfContent, ImportError>;
}

/// Text-only PDF parser; it cannot rasterize pages, so PDFs get the
/// placeholder cover.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfParser;

impl PdfParser for LopdfParser {
    fn parse(&self, bytes: &[u8]) -> Result<PdfContent, ImportError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|err| ImportError::Pdf(err.to_string()))?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(ImportError::Pdf("document has no pages".to_string()));
        }
        let pages = page_numbers
            .iter()
            .map(|&number| match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(err) => {
                    warn!(page = number, "Failed to extract PDF page text: {err}");
                    String::new()
                }
            })
            .collect();
        Ok(PdfContent {
            pages,
            cover_png: None,
        })
    }
}

/// CRLF/CR to LF, collapse newline runs, then NFC.
pub fn normalize_text(raw: &str) -> String {
    let unified = RE_LINE_ENDINGS.replace_all(raw, "\n");
    let collapsed = RE_NEWLINE_RUNS.replace_all(&unified, "\n");
    collapsed.nfc().collect()
}

/// Pages joined by blank lines, with runs of blank lines collapsed.
pub fn join_pdf_pages(pages: &[String]) -> String {
    let mut joined = String::new();
    for page in pages {
        joined.push_str(page);
        joined.push_str("\n\n");
    }
    RE_BLANK_LINES.replace_all(&joined, "\n").into_owned()
}

pub fn data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
}

/// Placeholder cover: beige card with a sienna frame.
pub fn fallback_cover() -> String {
    let img = ImageBuffer::from_fn(COVER_WIDTH, COVER_HEIGHT, |x, y| {
        let on_frame = x < COVER_FRAME
            || y < COVER_FRAME
            || x >= COVER_WIDTH - COVER_FRAME
            || y >= COVER_HEIGHT - COVER_FRAME;
        if on_frame { SIENNA } else { BEIGE }
    });
    let mut png_bytes = Vec::new();
    match img.write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png) {
        Ok(()) => data_url(&png_bytes, "image/png"),
        Err(err) => {
            warn!("PNG encoding failed for placeholder cover: {err}");
            String::new()
        }
    }
}

fn title_from_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    if stem.is_empty() {
        file_name.to_string()
    } else {
        stem.to_string()
    }
}

pub struct Importer<P: PdfParser = LopdfParser> {
    pdf: P,
}

impl Default for Importer<LopdfParser> {
    fn default() -> Self {
        Self::new(LopdfParser)
    }
}

impl<P: PdfParser> Importer<P> {
    pub fn new(pdf: P) -> Self {
        Self { pdf }
    }

    pub fn import_path(&self, path: &Path, now: DateTime<Utc>) -> Result<Document, ImportError> {
        let bytes = fs::read(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.import_bytes(&file_name, &bytes, now)
    }

    /// Build a document from a file's name and contents. No document is
    /// produced unless readable text was found.
    pub fn import_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Document, ImportError> {
        let file_type = FileType::from_path(Path::new(file_name));
        info!(file = file_name, %file_type, bytes = bytes.len(), "Importing document");

        let (raw, cover) = match file_type {
            FileType::Pdf => {
                let content = self.pdf.parse(bytes)?;
                debug!(pages = content.pages.len(), "Parsed PDF pages");
                let cover = content
                    .cover_png
                    .as_deref()
                    .map(|png| data_url(png, "image/png"));
                (join_pdf_pages(&content.pages), cover)
            }
            FileType::Epub => load_epub(bytes)?,
            FileType::Mobi | FileType::Docx | FileType::Txt => {
                (String::from_utf8_lossy(bytes).into_owned(), None)
            }
        };

        let content = normalize_text(&raw);
        if content.trim().is_empty() {
            warn!(file = file_name, "Import produced no readable text");
            return Err(ImportError::Empty(file_name.to_string()));
        }

        let document = Document {
            id: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            title: title_from_name(file_name),
            author: UNKNOWN_AUTHOR.to_string(),
            cover_image: cover.unwrap_or_else(fallback_cover),
            file_type,
            content,
            bookmarks: Bookmarks::new(),
        };
        info!(
            title = %document.title,
            total_chars = document.text_len(),
            "Finished importing document"
        );
        Ok(document)
    }
}

fn load_epub(bytes: &[u8]) -> Result<(String, Option<String>), ImportError> {
    let mut doc = EpubDoc::from_reader(Cursor::new(bytes.to_vec()))
        .map_err(|err| ImportError::Epub(err.to_string()))?;

    let mut combined = String::new();
    let mut chapters = 0usize;
    loop {
        if let Some((chapter, _mime)) = doc.get_current_str() {
            chapters += 1;
            if !combined.is_empty() {
                combined.push_str("\n\n");
            }
            // Very wide lines so no hard wraps end up in the text.
            let plain = match html2text::from_read(chapter.as_bytes(), 10_000) {
                Ok(clean) => clean,
                Err(err) => {
                    warn!(chapter = chapters, "html2text failed: {err}");
                    chapter
                }
            };
            combined.push_str(&plain);
        }
        if !doc.go_next() {
            break;
        }
    }

    let cover = doc.get_cover().map(|(data, mime)| data_url(&data, &mime));
    debug!(chapters, has_cover = cover.is_some(), "Parsed EPUB spine");
    Ok((combined, cover))
}
