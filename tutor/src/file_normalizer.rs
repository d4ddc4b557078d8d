use crate::models::ContentPart;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;
use rayon::prelude::*;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A file as received from the upload surface.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = fs::read(path)?;

        Ok(Self {
            mime_type: guess_mime_type(&name).to_string(),
            name,
            bytes,
        })
    }
}

pub fn guess_mime_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("pdf") => PDF_MIME_TYPE,
        Some("docx") => DOCX_MIME_TYPE,
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Inline,
    WordDocument,
    PlainText,
    Unsupported,
}

fn classify(file: &UploadedFile) -> FileKind {
    let mime = file.mime_type.to_ascii_lowercase();
    let name = file.name.to_ascii_lowercase();

    if mime.starts_with("image/") || mime == PDF_MIME_TYPE {
        FileKind::Inline
    } else if mime == DOCX_MIME_TYPE {
        FileKind::WordDocument
    } else if mime.starts_with("text/") || name.ends_with(".txt") || name.ends_with(".md") {
        FileKind::PlainText
    } else {
        FileKind::Unsupported
    }
}

/// Turns uploads into model input parts. Never fails: a file that cannot be
/// used is skipped and the rest of the batch goes through.
pub struct FileNormalizer;

impl FileNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, files: &[UploadedFile]) -> Vec<ContentPart> {
        // Order of the output follows order of the input.
        let parts: Vec<ContentPart> = files
            .par_iter()
            .filter_map(|file| self.normalize_file(file))
            .collect();

        log::info!("Normalized {} of {} files", parts.len(), files.len());
        parts
    }

    fn normalize_file(&self, file: &UploadedFile) -> Option<ContentPart> {
        match classify(file) {
            FileKind::Inline => {
                if file.bytes.is_empty() {
                    log::warn!("Skipping empty file: {}", file.name);
                    return None;
                }
                Some(ContentPart::inline(
                    STANDARD.encode(&file.bytes),
                    file.mime_type.clone(),
                ))
            }
            FileKind::WordDocument => match extract_docx_text(&file.bytes) {
                Ok(text) if !text.is_empty() => Some(ContentPart::text(format!(
                    "\n[Content from Word Document: {}]\n{}\n",
                    file.name, text
                ))),
                Ok(_) => {
                    log::warn!("No text found in Word document: {}", file.name);
                    None
                }
                Err(e) => {
                    log::warn!("Error parsing DOCX {}: {:#}", file.name, e);
                    None
                }
            },
            FileKind::PlainText => {
                let text = String::from_utf8_lossy(&file.bytes);
                if text.trim().is_empty() {
                    log::warn!("Skipping empty file: {}", file.name);
                    return None;
                }
                Some(ContentPart::text(format!(
                    "\n[Content from Text File: {}]\n{}\n",
                    file.name, text
                )))
            }
            FileKind::Unsupported => {
                log::info!("Ignoring unsupported file {} ({})", file.name, file.mime_type);
                None
            }
        }
    }
}

impl Default for FileNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls the raw text out of `word/document.xml`: one line per paragraph,
/// tabs and explicit breaks kept.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Failed to open ZIP")?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("Missing word/document.xml")?
        .read_to_string(&mut xml)
        .context("Failed to read word/document.xml")?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                text.push_str(&e.unescape().context("Invalid text node")?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}
