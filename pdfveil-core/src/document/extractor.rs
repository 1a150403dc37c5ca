//! Text extraction from source PDFs.
//!
//! The result is a flat string: page texts in page order, one line per text
//! object. Visual order and line breaks are not guaranteed to match the layout.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use log::{debug, warn};
use lopdf::Document;

use crate::errors::{VeilError, VeilResult};

/// Extracts the text of every page of the PDF in `bytes`.
///
/// Corrupt or unsupported input yields [`VeilError::Extraction`]. A parser
/// panic on hostile input is contained and reported the same way.
pub fn extract_text(bytes: &[u8]) -> VeilResult<String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| extract_inner(bytes)));
    match outcome {
        Ok(result) => result,
        Err(_) => {
            warn!("PDF parser panicked on a {} byte input", bytes.len());
            Err(VeilError::Extraction("document could not be parsed".to_string()))
        }
    }
}

/// Reads `path` and extracts its text.
pub fn extract_text_from_path<P: AsRef<Path>>(path: P) -> VeilResult<String> {
    let bytes = std::fs::read(path.as_ref())?;
    extract_text(&bytes)
}

fn extract_inner(bytes: &[u8]) -> VeilResult<String> {
    if bytes.is_empty() {
        return Err(VeilError::Extraction("document is empty".to_string()));
    }

    let document = Document::load_mem(bytes)
        .map_err(|e| VeilError::Extraction(format!("not a readable PDF: {}", e)))?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(VeilError::Extraction("document has no pages".to_string()));
    }

    let text = document
        .extract_text(&page_numbers)
        .map_err(|e| VeilError::Extraction(format!("failed to read page text: {}", e)))?;

    debug!("Extracted {} chars from {} page(s)", text.chars().count(), page_numbers.len());
    Ok(text)
}
