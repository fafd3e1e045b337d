//! Text extraction for regulation documents.
//!
//! Extraction works on bytes already read from disk and returns one UTF-8
//! string per page. Supported formats:
//!
//! - **PDF** (`application/pdf`) via `pdf-extract`.
//! - **Plain text** (`text/plain`), e.g. `pdftotext` output: pages are
//!   separated by form feeds (`\x0C`).
//!
//! Errors are returned, never panicked on.

use std::path::Path;
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

const PAGE_BREAK: char = '\u{0C}';

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("text is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Guess a content type from the file extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => Some(MIME_PDF),
        Some("txt") => Some(MIME_TEXT),
        _ => None,
    }
}

/// Extract the text of every page, in page order.
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<String>, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf_pages(bytes),
        MIME_TEXT => extract_text_pages(bytes),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract can panic on malformed font tables; keep that from
    // unwinding through the indexer.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
    }
}

fn extract_text_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let text = std::str::from_utf8(bytes)?;
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    // A trailing form feed closes the last page rather than opening a new one.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_pages(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pages(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("SPO_2023.PDF")), Some(MIME_PDF));
        assert_eq!(content_type_for(Path::new("spo.txt")), Some(MIME_TEXT));
        assert_eq!(content_type_for(Path::new("notes.md")), None);
        assert_eq!(content_type_for(Path::new("README")), None);
    }

    #[test]
    fn text_pages_split_on_form_feed() {
        let pages = extract_pages("§ 1 Geltungsbereich\x0c§ 2 Ziele\x0c".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(pages, vec!["§ 1 Geltungsbereich", "§ 2 Ziele"]);

        let single = extract_pages("Nur eine Seite".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn invalid_utf8_text_returns_error() {
        let err = extract_pages(&[0xff, 0xfe, 0x00], MIME_TEXT).unwrap_err();
        assert!(matches!(err, ExtractError::Utf8(_)));
    }
}
