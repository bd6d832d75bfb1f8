//! Best-effort plain-text extraction for uploaded documents.
//!
//! PDFs are read page by page; a page that yields nothing (or fails) adds an
//! empty line instead of failing the whole document. DOCX files are unzipped
//! and their header, body and footer parts are flattened to text, in that
//! order. Anything else extracts to nothing, which callers treat as "no
//! content" rather than an error.

use std::io::{Read, Write};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("DOCX error: {0}")]
    Docx(#[from] zip::result::ZipError),
    #[error("DOCX XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Document kinds we know how to read, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" | "doc" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    /// Classify by the text after the filename's last `.`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    fn suffix(self) -> &'static str {
        match self {
            DocumentKind::Pdf => ".pdf",
            DocumentKind::Docx => ".docx",
        }
    }
}

/// Extract text from a file on disk. Unsupported kinds yield `""`.
pub fn extract_path(path: &Path, filename: &str) -> Result<String, ExtractError> {
    match DocumentKind::from_filename(filename) {
        Some(DocumentKind::Pdf) => pdf_text(path),
        Some(DocumentKind::Docx) => docx_text(path),
        None => Ok(String::new()),
    }
}

/// Extract text from an in-memory upload, spooled through the system temp
/// directory.
pub fn extract_bytes(data: &[u8], filename: &str) -> Result<String, ExtractError> {
    extract_bytes_in(&std::env::temp_dir(), data, filename)
}

/// Like [`extract_bytes`], spooling into `dir`.
///
/// The temporary file lives for the duration of the call and is removed when
/// its guard drops, whichever way we leave.
pub fn extract_bytes_in(
    dir: &Path,
    data: &[u8],
    filename: &str,
) -> Result<String, ExtractError> {
    let Some(kind) = DocumentKind::from_filename(filename) else {
        return Ok(String::new());
    };

    let mut tmp = tempfile::Builder::new()
        .suffix(kind.suffix())
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;

    extract_path(tmp.path(), kind.suffix())
}

fn pdf_text(path: &Path) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load(path)?;

    let pages: Vec<String> = doc
        .get_pages()
        .keys()
        .map(|&page| match doc.extract_text(&[page]) {
            // lopdf closes every text object with a newline
            Ok(text) => text.trim_end_matches(['\r', '\n']).to_string(),
            Err(e) => {
                tracing::debug!(page, error = %e, "No extractable text on PDF page");
                String::new()
            }
        })
        .collect();

    Ok(pages.join("\n"))
}

/// `word/header.xml`, `word/header1.xml`, ... for `kind = "header"`.
fn is_numbered_part(name: &str, kind: &str) -> bool {
    name.strip_prefix("word/")
        .and_then(|rest| rest.strip_prefix(kind))
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|n| n.bytes().all(|b| b.is_ascii_digit()))
}

fn docx_text(path: &Path) -> Result<String, ExtractError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    // Archive order within headers and footers
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let headers = names.iter().filter(|n| is_numbered_part(n, "header"));
    let footers = names.iter().filter(|n| is_numbered_part(n, "footer"));
    let body = "word/document.xml".to_string();

    let mut text = String::new();
    for name in headers.chain(std::iter::once(&body)).chain(footers) {
        let mut xml = String::new();
        archive.by_name(name)?.read_to_string(&mut xml)?;
        text.push_str(&part_text(&xml)?);
    }

    Ok(text.trim().to_string())
}

/// Flatten one WordprocessingML part: every paragraph (empty ones included)
/// ends a line, breaks become newlines, tabs become `\t`, runs concatenate.
fn part_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" | b"br" | b"cr" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::CData(c) if in_text => out.push_str(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
