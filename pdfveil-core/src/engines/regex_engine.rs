// pdfveil-core/src/engines/regex_engine.rs
//! A `SanitizationEngine` implementation that uses regular expressions
//! to identify and redact sensitive data.
//!
//! Rules run one after another, in configuration order. Each rule is a single
//! global substitution over the output of the previous rule; a pass never
//! rescans text it has already replaced.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;

use crate::config::{RedactionConfig, RedactionSummaryItem};
use crate::engine::SanitizationEngine;
use crate::redaction_match::{log_redaction_match_debug, RedactionMatch};
use crate::sanitizers::compiler::{get_or_compile_rules, CompiledRule, CompiledRules};

#[derive(Debug)]
pub struct RegexEngine {
    compiled_rules: Arc<CompiledRules>,
    config: RedactionConfig,
}

impl RegexEngine {
    pub fn new(config: RedactionConfig) -> Result<Self> {
        let compiled_rules = get_or_compile_rules(&config)
            .context("Failed to compile redaction rules for RegexEngine")?;

        Ok(Self { compiled_rules, config })
    }

    /// Engine over the built-in rule set.
    pub fn with_default_rules() -> Result<Self> {
        Self::new(RedactionConfig::load_default_rules()?)
    }

    /// Runs one rule over `input`, returning the rewritten text and the matches.
    fn apply_rule(rule: &CompiledRule, input: &str) -> (String, Vec<RedactionMatch>) {
        let mut output = String::with_capacity(input.len());
        let mut matches = Vec::new();
        let mut last_end = 0usize;

        for caps in rule.regex.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            let mut replacement = String::new();
            caps.expand(&rule.replace_with, &mut replacement);

            output.push_str(&input[last_end..whole.start()]);
            output.push_str(&replacement);
            last_end = whole.end();

            matches.push(RedactionMatch {
                rule_name: rule.name.clone(),
                original_string: whole.as_str().to_string(),
                sanitized_string: replacement,
                start: whole.start() as u64,
                end: whole.end() as u64,
            });
        }
        output.push_str(&input[last_end..]);
        (output, matches)
    }

    fn run_passes(&self, content: &str, source_id: &str) -> (String, Vec<RedactionMatch>) {
        let mut current = content.to_string();
        let mut all_matches = Vec::new();

        for rule in &self.compiled_rules.rules {
            let (next, matches) = Self::apply_rule(rule, &current);
            debug!("[{}] rule '{}' matched {} time(s)", source_id, rule.name, matches.len());
            for m in &matches {
                log_redaction_match_debug(module_path!(), m);
            }
            all_matches.extend(matches);
            current = next;
        }
        (current, all_matches)
    }

    fn summarize(&self, matches: &[RedactionMatch]) -> Vec<RedactionSummaryItem> {
        self.compiled_rules
            .rules
            .iter()
            .filter_map(|rule| {
                let hits: Vec<&RedactionMatch> =
                    matches.iter().filter(|m| m.rule_name == rule.name).collect();
                if hits.is_empty() {
                    return None;
                }
                Some(RedactionSummaryItem {
                    rule_name: rule.name.clone(),
                    occurrences: hits.len(),
                    original_texts: hits.iter().map(|m| m.original_string.clone()).collect(),
                    sanitized_texts: hits.iter().map(|m| m.sanitized_string.clone()).collect(),
                })
            })
            .collect()
    }
}

impl SanitizationEngine for RegexEngine {
    fn sanitize(&self, content: &str, source_id: &str) -> Result<(String, Vec<RedactionSummaryItem>)> {
        let (sanitized, matches) = self.run_passes(content, source_id);
        Ok((sanitized, self.summarize(&matches)))
    }

    fn analyze_for_stats(&self, content: &str, source_id: &str) -> Result<Vec<RedactionSummaryItem>> {
        let (_, matches) = self.run_passes(content, source_id);
        Ok(self.summarize(&matches))
    }

    fn find_matches(&self, content: &str, source_id: &str) -> Result<Vec<RedactionMatch>> {
        let (_, matches) = self.run_passes(content, source_id);
        Ok(matches)
    }

    fn compiled_rules(&self) -> &CompiledRules { &self.compiled_rules }
    fn get_rules(&self) -> &RedactionConfig { &self.config }
}
