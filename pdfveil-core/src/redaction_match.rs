// pdfveil-core/src/redaction_match.rs
//! Data structures for individual redaction matches, plus debug logging helpers
//! that keep raw personal data out of the logs.

use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Read once: whether raw matched text may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("PDFVEIL_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// A single matched span in the text a rule pass ran over.
///
/// Offsets are byte offsets into the input of that pass, which is the output
/// of the previous rule pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RedactionMatch {
    pub rule_name: String,
    pub original_string: String,
    pub sanitized_string: String,
    pub start: u64,
    pub end: u64,
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.len())
    }
}

fn get_loggable_content(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_redaction_match_debug(module_path: &str, m: &RedactionMatch) {
    debug!(
        "{} Found RedactionMatch: Rule='{}', Original='{}', Sanitized='{}', Span={}..{}",
        module_path,
        m.rule_name,
        get_loggable_content(&m.original_string),
        m.sanitized_string,
        m.start,
        m.end
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_sensitive_short_string() {
        assert_eq!(redact_sensitive("abc"), "[REDACTED]".to_string());
    }

    #[test]
    fn test_redact_sensitive_long_string() {
        assert_eq!(redact_sensitive("john@x.com"), "[REDACTED: 10 chars]".to_string());
    }
}
