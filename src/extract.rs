//! Page-level text extraction for input documents.
//!
//! PDFs are read page by page with `pdf-extract`, which keeps vertical gaps
//! between text lines as blank lines; the section splitter relies on them to
//! find headings. Plain-text inputs use form feeds as page breaks.
//!
//! A document that cannot be opened fails with
//! [`DocrankError::DocumentRead`], which the pipeline reports per document.

use std::path::Path;

use thiserror::Error;

use crate::error::DocrankError;
use crate::input::InputFile;
use crate::models::Document;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

const FORM_FEED: char = '\u{0c}';

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("text decoding failed: {0}")]
    Text(String),
}

/// Map a file extension to a supported content type.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" => Some(MIME_TEXT),
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

/// Read and extract one input file into a [`Document`].
pub fn read_document(file: &InputFile) -> Result<Document, DocrankError> {
    let bytes = std::fs::read(&file.path).map_err(|e| DocrankError::DocumentRead {
        document: file.id.clone(),
        reason: e.to_string(),
    })?;
    let pages = extract_pages(&bytes, file.content_type).map_err(|e| {
        DocrankError::DocumentRead {
            document: file.id.clone(),
            reason: e.to_string(),
        }
    })?;
    Ok(Document::from_page_texts(file.id.clone(), pages))
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract panics on some malformed content streams; one bad file must
    // not end the run.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("pdf-extract panicked".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    if pages.is_empty() {
        return Err(ExtractError::Pdf("document has no pages".to_string()));
    }
    Ok(pages)
}

fn extract_text_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractError::Text(e.to_string()))?;
    Ok(split_form_feeds(text))
}

fn split_form_feeds(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split(FORM_FEED).map(str::to_string).collect();
    // A trailing form feed closes the last page rather than opening a new one.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}
