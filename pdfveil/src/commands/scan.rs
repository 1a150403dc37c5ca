//! `pdfveil scan`: report what would be redacted, without producing anything.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use log::info;
use serde::Serialize;

use pdfveil_core::{RedactionService, RedactionSummaryItem, ServiceConfig};

use crate::cli::ScanCommand;
use crate::commands::build_engine;
use crate::ui::redaction_summary;

/// JSON form of a scan. Carries counts only, never matched text.
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub source: String,
    pub total: usize,
    pub rules: Vec<RuleCount<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RuleCount<'a> {
    pub rule_name: &'a str,
    pub occurrences: usize,
}

impl<'a> ScanReport<'a> {
    pub fn new(source: &Path, summary: &'a [RedactionSummaryItem]) -> Self {
        Self {
            source: source.display().to_string(),
            total: summary.iter().map(|s| s.occurrences).sum(),
            rules: summary
                .iter()
                .map(|s| RuleCount {
                    rule_name: &s.rule_name,
                    occurrences: s.occurrences,
                })
                .collect(),
        }
    }
}

pub async fn run_scan(cmd: ScanCommand, quiet: bool) -> Result<()> {
    info!("Starting scan operation.");

    let engine = Arc::new(build_engine(&cmd.rules)?);
    let service = RedactionService::new(ServiceConfig::discover()?, engine)?;

    let source = tokio::fs::read(&cmd.input)
        .await
        .with_context(|| format!("Failed to read input file {}", cmd.input.display()))?;
    let summary = service.scan(&source).await?;
    let report = ScanReport::new(&cmd.input, &summary);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        let colors = std::io::stderr().is_terminal();
        redaction_summary::print_summary(&summary, &mut std::io::stderr(), colors)?;
    }

    if let Some(threshold) = cmd.fail_over_threshold {
        if report.total > threshold {
            bail!("Found {} match(es), over the threshold of {}.", report.total, threshold);
        }
    }
    info!("Scan operation completed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_totals_occurrences() {
        let summary = vec![
            RedactionSummaryItem {
                rule_name: "email".to_string(),
                occurrences: 2,
                original_texts: vec!["a@b.co".to_string(), "c@d.org".to_string()],
                sanitized_texts: vec!["[REDACTED]".to_string(); 2],
            },
            RedactionSummaryItem {
                rule_name: "us_ssn".to_string(),
                occurrences: 1,
                original_texts: vec!["123-45-6789".to_string()],
                sanitized_texts: vec!["[REDACTED]".to_string()],
            },
        ];
        let report = ScanReport::new(Path::new("in.pdf"), &summary);
        assert_eq!(report.total, 3);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""rule_name":"email""#));
        assert!(!json.contains("a@b.co"));
    }
}
