//! Human-readable redaction summary.
//!
//! Only rule names and counts are printed. Matched text never reaches the
//! terminal, since the whole point is to keep it out of sight.

use std::io::{self, Write};

use pdfveil_core::RedactionSummaryItem;

use super::theme::{paint, ThemeEntry};

pub fn print_summary<W: Write>(
    summary: &[RedactionSummaryItem],
    writer: &mut W,
    enable_colors: bool,
) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", paint("Redaction Summary:", ThemeEntry::Header, enable_colors))?;

    if summary.is_empty() {
        writeln!(writer, "  No redactions applied.")?;
        return Ok(());
    }

    for item in summary {
        writeln!(
            writer,
            "  {} ({} occurrence{})",
            paint(&item.rule_name, ThemeEntry::SummaryRuleName, enable_colors),
            paint(&item.occurrences.to_string(), ThemeEntry::SummaryOccurrences, enable_colors),
            if item.occurrences == 1 { "" } else { "s" }
        )?;
    }

    let total: usize = summary.iter().map(|s| s.occurrences).sum();
    writeln!(writer, "  Total: {}", total)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, occurrences: usize) -> RedactionSummaryItem {
        RedactionSummaryItem {
            rule_name: name.to_string(),
            occurrences,
            original_texts: vec!["john@x.com".to_string(); occurrences],
            sanitized_texts: vec!["[REDACTED]".to_string(); occurrences],
        }
    }

    #[test]
    fn summary_lists_rules_without_matched_text() {
        let mut out = Vec::new();
        print_summary(&[item("email", 2), item("us_ssn", 1)], &mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("email (2 occurrences)"));
        assert!(text.contains("us_ssn (1 occurrence)"));
        assert!(text.contains("Total: 3"));
        assert!(!text.contains("john@x.com"));
    }

    #[test]
    fn empty_summary_says_so() {
        let mut out = Vec::new();
        print_summary(&[], &mut out, false).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No redactions applied."));
    }
}
