//! compiler.rs - Manages the compilation and caching of redaction rules.
//!
//! This module provides a thread-safe, cached mechanism to convert a
//! `RedactionConfig` into `CompiledRules`. It uses a global, shared cache to
//! avoid redundant compilation across requests.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::config::{RedactionConfig, RedactionRule, MAX_PATTERN_LENGTH};
use crate::errors::VeilError;

/// Represents a single compiled redaction rule.
#[derive(Debug)]
pub struct CompiledRule {
    /// The compiled regular expression used for matching.
    pub regex: Regex,
    /// The string to replace matches of this rule's pattern with.
    pub replace_with: String,
    /// The unique name of the redaction rule.
    pub name: String,
}

/// The enabled rules of a config, compiled, in application order.
#[derive(Debug)]
pub struct CompiledRules {
    pub rules: Vec<CompiledRule>,
}

lazy_static! {
    /// A thread-safe, global cache for compiled rules.
    /// The key is a hash of the ordered rule list.
    static ref COMPILED_RULES_CACHE: RwLock<HashMap<u64, Arc<CompiledRules>>> = RwLock::new(HashMap::new());
}

/// Hashes the `RedactionConfig` to create a key for the cache.
///
/// Rule order changes the redaction output, so it is part of the key.
fn hash_config(config: &RedactionConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.rules.hash(&mut hasher);
    hasher.finish()
}

/// Compiles a list of `RedactionRule`s into `CompiledRules`.
/// Disabled rules and rules without a pattern are skipped.
pub fn compile_rules(rules_to_compile: Vec<RedactionRule>) -> Result<CompiledRules, VeilError> {
    debug!("Starting compilation of {} rules.", rules_to_compile.len());

    let mut compiled_rules = Vec::new();
    let mut compilation_errors = Vec::new();

    for rule in rules_to_compile {
        if !rule.is_enabled() {
            debug!("Skipping disabled rule '{}'.", &rule.name);
            continue;
        }
        let Some(pattern) = rule.pattern.as_ref() else {
            warn!("Skipping rule '{}' because its pattern is missing.", &rule.name);
            continue;
        };

        if pattern.len() > MAX_PATTERN_LENGTH {
            compilation_errors.push(VeilError::PatternLengthExceeded(
                rule.name,
                pattern.len(),
                MAX_PATTERN_LENGTH,
            ));
            continue;
        }

        let regex_result = RegexBuilder::new(pattern)
            .multi_line(rule.multiline)
            .dot_matches_new_line(rule.dot_matches_new_line)
            .size_limit(10 * (1 << 20)) // 10 MB limit for compiled regex
            .build();

        match regex_result {
            Ok(regex) => {
                debug!(target: "pdfveil_core::sanitizer", "Rule '{}' compiled successfully.", &rule.name);
                compiled_rules.push(CompiledRule {
                    regex,
                    replace_with: rule.replace_with,
                    name: rule.name,
                });
            }
            Err(e) => compilation_errors.push(VeilError::RuleCompilationError(rule.name, e)),
        }
    }

    if !compilation_errors.is_empty() {
        let error_message = compilation_errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<String>>()
            .join("\n");
        Err(VeilError::Fatal(format!(
            "Failed to compile {} rule(s):\n{}",
            compilation_errors.len(),
            error_message
        )))
    } else {
        debug!("Finished compiling rules. Total compiled: {}.", compiled_rules.len());
        Ok(CompiledRules { rules: compiled_rules })
    }
}

/// Gets a `CompiledRules` instance from the cache or compiles them if not found.
pub fn get_or_compile_rules(config: &RedactionConfig) -> Result<Arc<CompiledRules>> {
    let cache_key = hash_config(config);

    {
        let cache = COMPILED_RULES_CACHE
            .read()
            .map_err(|_| anyhow!("compiled rule cache lock poisoned"))?;
        if let Some(rules) = cache.get(&cache_key) {
            debug!("Serving compiled rules from cache for key: {}", &cache_key);
            return Ok(Arc::clone(rules));
        }
    }

    debug!("Compiled rules not found in cache. Compiling now.");
    let compiled_arc = Arc::new(compile_rules(config.rules.clone())?);

    COMPILED_RULES_CACHE
        .write()
        .map_err(|_| anyhow!("compiled rule cache lock poisoned"))?
        .insert(cache_key, Arc::clone(&compiled_arc));

    debug!("Successfully compiled and cached rules for key: {}", &cache_key);
    Ok(compiled_arc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, pattern: &str) -> RedactionRule {
        RedactionRule {
            name: name.to_string(),
            pattern: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn disabled_rules_are_not_compiled() {
        let mut off = rule("off", "x");
        off.enabled = Some(false);
        let compiled = compile_rules(vec![rule("on", "y"), off]).unwrap();
        assert_eq!(compiled.rules.len(), 1);
        assert_eq!(compiled.rules[0].name, "on");
    }

    #[test]
    fn invalid_pattern_is_fatal() {
        let err = compile_rules(vec![rule("broken", "(unclosed")]).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn cache_returns_same_instance_for_same_order() {
        let config = RedactionConfig { rules: vec![rule("a", "a+"), rule("b", "b+")] };
        let first = get_or_compile_rules(&config).unwrap();
        let second = get_or_compile_rules(&config.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let reversed = RedactionConfig { rules: vec![rule("b", "b+"), rule("a", "a+")] };
        let third = get_or_compile_rules(&reversed).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
