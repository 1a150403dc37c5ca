// pdfveil-core/src/headless.rs
//! Convenience wrapper for one-shot use without a job table.
//!
//! Useful for embedding and for command-line use, where the caller already
//! holds the final password and has no need to park an artifact.

use crate::config::RedactionConfig;
use crate::document::{DocumentRebuilder, Encryptor, PageGeometry, PasswordPolicy};
use crate::engines::regex_engine::RegexEngine;
use crate::errors::VeilResult;
use crate::pipeline::{process_document, ProcessedDocument};

/// Extracts, redacts, rebuilds and protects `source` in a single call.
///
/// # Arguments
///
/// * `config` - The merged RedactionConfig (defaults + optional user overrides).
/// * `geometry` - Page layout for the rebuilt document.
/// * `policy` - Passwords and permissions for the output.
/// * `source` - The source PDF bytes.
/// * `source_id` - A stable identifier for the input, used in logs.
pub fn headless_redact_pdf(
    config: RedactionConfig,
    geometry: PageGeometry,
    policy: &PasswordPolicy,
    source: &[u8],
    source_id: &str,
) -> VeilResult<ProcessedDocument> {
    let engine = RegexEngine::new(config)?;
    let rebuilder = DocumentRebuilder::new(geometry)?;
    process_document(&engine, &rebuilder, &Encryptor::new(), source, policy, source_id)
}
