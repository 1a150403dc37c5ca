//! Configuration management for `pdfveil-core`.
//!
//! This module defines the data structures for redaction rules and for the
//! service that drives the redact/finalize workflow. It handles
//! serialization/deserialization of YAML configurations and provides utilities
//! for loading, merging, and validating them.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::encryptor::{EncryptionRevision, PermissionPolicy};
use crate::document::PageGeometry;

/// Maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Marker written in place of every match by the built-in rules.
pub const DEFAULT_REDACTION_MARKER: &str = "[REDACTED]";

/// Represents a single redaction rule used by the Regex engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactionRule {
    /// Unique identifier for the rule (e.g., "us_ssn").
    pub name: String,
    /// Human-readable description of what the rule targets.
    pub description: Option<String>,
    /// The regex pattern string.
    pub pattern: Option<String>,
    /// The string to replace matches with. `$1`-style group references are expanded.
    pub replace_with: String,
    /// If true, enables multiline mode for the regex engine.
    pub multiline: bool,
    /// If true, the dot character `.` in regex will match newlines.
    pub dot_matches_new_line: bool,
    /// Explicit override for enabling/disabling the rule.
    pub enabled: Option<bool>,
    /// Severity level (e.g., "high", "medium").
    pub severity: Option<String>,
    /// Metadata tags for categorization.
    pub tags: Option<Vec<String>>,
}

impl Default for RedactionRule {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            pattern: None,
            replace_with: DEFAULT_REDACTION_MARKER.to_string(),
            multiline: false,
            dot_matches_new_line: false,
            enabled: None,
            severity: None,
            tags: None,
        }
    }
}

impl RedactionRule {
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }
}

/// An ordered list of redaction rules. Rules run in list order.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct RedactionConfig {
    pub rules: Vec<RedactionRule>,
}

/// Represents a single item in the redaction summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactionSummaryItem {
    pub rule_name: String,
    pub occurrences: usize,
    pub original_texts: Vec<String>,
    pub sanitized_texts: Vec<String>,
}

impl RedactionConfig {
    /// Loads redaction rules from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading custom rules from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: RedactionConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_rules(&config.rules)?;
        info!("Loaded {} rules from file {}.", config.rules.len(), path.display());

        Ok(config)
    }

    /// Loads the built-in rules (SSN, email, bare phone number) from the embedded configuration.
    pub fn load_default_rules() -> Result<Self> {
        debug!("Loading default rules from embedded string...");
        let default_yaml = include_str!("../config/default_rules.yaml");
        let config: RedactionConfig = serde_yml::from_str(default_yaml)
            .context("Failed to parse default rules")?;

        debug!("Loaded {} default rules.", config.rules.len());
        Ok(config)
    }

    /// Disables the named rules. Unknown names are reported and ignored.
    pub fn disable_rules(&mut self, disable_rules: &[String]) {
        let disable_set: HashSet<&str> = disable_rules.iter().map(String::as_str).collect();
        let all_rule_names: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();

        for rule_name in disable_set.difference(&all_rule_names) {
            warn!("Rule '{}' in `disable_rules` list does not exist.", rule_name);
        }

        for rule in self.rules.iter_mut() {
            if disable_set.contains(rule.name.as_str()) {
                rule.enabled = Some(false);
            }
        }
        debug!(
            "Active rules after filtering: {}",
            self.rules.iter().filter(|r| r.is_enabled()).count()
        );
    }
}

/// Merges user-defined rules over the defaults.
///
/// A user rule with an existing name replaces that rule in place; new names are
/// appended after the defaults. The resulting order is stable.
pub fn merge_rules(
    default_config: RedactionConfig,
    user_config: Option<RedactionConfig>,
) -> RedactionConfig {
    debug!("merge_rules called. Initial default rules count: {}", default_config.rules.len());

    let mut final_rules = default_config.rules;

    if let Some(user_cfg) = user_config {
        debug!("User config provided. Merging {} user rules.", user_cfg.rules.len());
        for user_rule in user_cfg.rules {
            match final_rules.iter_mut().find(|r| r.name == user_rule.name) {
                Some(existing) => *existing = user_rule,
                None => final_rules.push(user_rule),
            }
        }
    }

    debug!("Final total rules after merge: {}", final_rules.len());
    RedactionConfig { rules: final_rules }
}

/// Validates rule integrity (regex compilation, capture groups).
fn validate_rules(rules: &[RedactionRule]) -> Result<()> {
    let mut rule_names = HashSet::new();
    let mut errors = Vec::new();
    let capture_group_regex = Regex::new(r"\$(\d+)")?;

    for rule in rules {
        if rule.name.is_empty() {
            errors.push("A rule has an empty `name` field.".to_string());
        } else if !rule_names.insert(rule.name.clone()) {
            errors.push(format!("Duplicate rule name found: '{}'.", rule.name));
        }

        let pattern = match &rule.pattern {
            Some(p) => p,
            None => {
                errors.push(format!("Rule '{}' is missing the `pattern` field.", rule.name));
                continue;
            }
        };

        if pattern.is_empty() {
            errors.push(format!("Rule '{}' has an empty `pattern` field.", rule.name));
        }
        if pattern.len() > MAX_PATTERN_LENGTH {
            errors.push(format!(
                "Rule '{}': pattern length ({}) exceeds maximum allowed ({}).",
                rule.name,
                pattern.len(),
                MAX_PATTERN_LENGTH
            ));
        }

        let compiled = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("Rule '{}' has an invalid regex pattern: {}", rule.name, e));
                continue;
            }
        };

        // captures_len counts the implicit whole-match group.
        let group_count = compiled.captures_len() - 1;
        for cap in capture_group_regex.captures_iter(&rule.replace_with) {
            if let Some(group_num) = cap.get(1).and_then(|g| g.as_str().parse::<usize>().ok()) {
                if group_num > group_count {
                    errors.push(format!(
                        "Rule '{}': replacement references non-existent capture group '${}'.",
                        rule.name, group_num
                    ));
                }
            }
        }
    }

    if !errors.is_empty() {
        Err(anyhow!("Rule validation failed:\n{}", errors.join("\n")))
    } else {
        Ok(())
    }
}

/// Output protection settings applied when no explicit policy is supplied.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EncryptionSettings {
    pub revision: EncryptionRevision,
    /// Forces the compatibility serializer even when the revision does not need it.
    pub compatibility_mode: bool,
    pub permissions: PermissionPolicy,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            revision: EncryptionRevision::default(),
            compatibility_mode: false,
            permissions: PermissionPolicy::default(),
        }
    }
}

/// Settings for the redaction service and its artifact storage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding per-job artifacts. Created on demand.
    pub storage_dir: PathBuf,
    /// Outstanding artifacts older than this are reaped.
    pub artifact_ttl_secs: u64,
    pub reap_interval_secs: u64,
    /// Unreferenced files in storage older than ttl plus this are swept.
    pub orphan_grace_secs: u64,
    /// Upper bound on accepted source documents.
    pub max_input_bytes: usize,
    /// Upper bound on extract/redact/rebuild/encrypt for one request.
    pub processing_timeout_secs: u64,
    pub page: PageGeometry,
    pub encryption: EncryptionSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            artifact_ttl_secs: 15 * 60,
            reap_interval_secs: 60,
            orphan_grace_secs: 5 * 60,
            max_input_bytes: 25 * 1024 * 1024,
            processing_timeout_secs: 30,
            page: PageGeometry::default(),
            encryption: EncryptionSettings::default(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pdfveil")
        .join("artifacts")
}

impl ServiceConfig {
    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }

    pub fn orphan_grace(&self) -> Duration {
        Duration::from_secs(self.orphan_grace_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    /// Loads service settings from a YAML file. Missing keys take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading service config from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServiceConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.page.validate().map_err(|e| anyhow!("Invalid page geometry in {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Loads the first config found in [`config_candidate_paths`], or the defaults.
    pub fn discover() -> Result<Self> {
        match config_candidate_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("No service config found in candidate paths; using defaults.");
                Ok(Self::default())
            }
        }
    }
}

/// Locations searched by [`ServiceConfig::discover`], in priority order.
pub fn config_candidate_paths() -> Vec<PathBuf> {
    let base_dirs = vec![
        dirs::config_dir().map(|p| p.join("pdfveil")),
        dirs::home_dir().map(|p| p.join(".pdfveil")),
        Some(PathBuf::from("./config")),
    ];

    base_dirs
        .into_iter()
        .flatten()
        .map(|dir| dir.join("pdfveil.yaml"))
        .collect()
}
