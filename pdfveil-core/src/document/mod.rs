//! Document handling: pulling text out of a source PDF, rebuilding a fresh PDF
//! that carries only redacted text, and protecting it with a password.
//!
//! The rebuilt document is lossy on purpose. Images, fonts, annotations and
//! layout of the source are never copied across.
//!
//! License: MIT OR Apache-2.0

pub mod encryptor;
pub mod extractor;
pub mod rebuilder;

use lopdf::Document;
use serde::{Deserialize, Serialize};

pub use encryptor::{EncryptionRevision, Encryptor, PasswordPolicy, PermissionPolicy, PrintingPermission};
pub use extractor::{extract_text, extract_text_from_path};
pub use rebuilder::DocumentRebuilder;

/// Glyph advance of the Courier family, in thousandths of the font size.
pub(crate) const COURIER_ADVANCE_PER_MILLE: u32 = 600;

/// Page size and text placement used when rebuilding documents. Units are PDF points.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub font_size: u32,
    /// Distance between consecutive baselines.
    pub leading: u32,
    /// Text needing more pages than this is rejected instead of truncated.
    pub max_pages: usize,
}

impl Default for PageGeometry {
    /// A4 portrait, 12 pt Courier.
    fn default() -> Self {
        Self {
            width: 595,
            height: 842,
            margin: 50,
            font_size: 12,
            leading: 14,
            max_pages: 200,
        }
    }
}

impl PageGeometry {
    pub fn validate(&self) -> Result<(), String> {
        if self.font_size == 0 || self.leading == 0 {
            return Err("font_size and leading must be positive".to_string());
        }
        if self.width <= 2 * self.margin || self.height <= 2 * self.margin {
            return Err(format!(
                "margin {} leaves no printable area on a {}x{} page",
                self.margin, self.width, self.height
            ));
        }
        if self.columns() == 0 {
            return Err(format!("font size {} is too large for the printable width", self.font_size));
        }
        if self.max_pages == 0 {
            return Err("max_pages must be at least 1".to_string());
        }
        Ok(())
    }

    /// Characters per line for the monospaced font inside the margins.
    pub fn columns(&self) -> usize {
        let printable = (self.width.saturating_sub(2 * self.margin)) as u64 * 1000;
        let advance = (self.font_size * COURIER_ADVANCE_PER_MILLE) as u64;
        (printable / advance) as usize
    }

    /// Baselines per page, the first one at `height - margin`.
    pub fn lines_per_page(&self) -> usize {
        (self.height.saturating_sub(2 * self.margin) / self.leading) as usize + 1
    }
}

/// A freshly built document holding only flowed, already-redacted text.
///
/// Kept unencrypted in memory so that re-protecting with a new password never
/// has to re-extract or re-redact anything.
#[derive(Debug, Clone)]
pub struct SanitizedDocument {
    pub(crate) document: Document,
    text: String,
    page_count: usize,
}

impl SanitizedDocument {
    pub(crate) fn new(document: Document, text: String, page_count: usize) -> Self {
        Self { document, text, page_count }
    }

    /// The redacted text the document was built from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Serializes the document without any protection.
    pub fn to_unprotected_bytes(&self) -> Result<Vec<u8>, crate::errors::VeilError> {
        let mut document = self.document.clone();
        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|e| crate::errors::VeilError::Rebuild(e.to_string()))?;
        Ok(buffer)
    }
}
