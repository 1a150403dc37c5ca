// pdfveil-core/src/engine.rs
//! Defines the core SanitizationEngine trait.
//!
//! The `SanitizationEngine` trait is the pluggable PII detection layer: the
//! redaction pipeline only sees this trait, so a different rule set or a
//! different matching strategy can be swapped in without touching document
//! handling. Matching is a heuristic over extracted text, not a compliance
//! guarantee.
//!
//! License: MIT OR APACHE 2.0

use anyhow::Result;

use crate::config::{RedactionConfig, RedactionSummaryItem};
use crate::redaction_match::RedactionMatch;
use crate::sanitizers::compiler::CompiledRules;

/// A trait that defines the core functionality of a sanitization engine.
pub trait SanitizationEngine: Send + Sync {
    /// Redacts `content` and returns the sanitized text with a per-rule summary.
    ///
    /// The result must be deterministic for identical content and rule set.
    ///
    /// # Arguments
    /// * `content` - The input string to sanitize.
    /// * `source_id` - The name or identifier of the source being processed, used in logs.
    fn sanitize(&self, content: &str, source_id: &str) -> Result<(String, Vec<RedactionSummaryItem>)>;

    /// Reports what `sanitize` would redact without returning the redacted text.
    fn analyze_for_stats(&self, content: &str, source_id: &str) -> Result<Vec<RedactionSummaryItem>>;

    /// Returns every match, in rule order then position order.
    fn find_matches(&self, content: &str, source_id: &str) -> Result<Vec<RedactionMatch>>;

    /// Returns a reference to the `CompiledRules` used by the engine.
    fn compiled_rules(&self) -> &CompiledRules;

    /// Returns a reference to the engine's configuration.
    fn get_rules(&self) -> &RedactionConfig;
}
