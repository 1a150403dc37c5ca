//! Command implementations and the helpers they share.

pub mod redact;
pub mod scan;

use anyhow::{Context, Result};
use log::debug;

use pdfveil_core::{merge_rules, RedactionConfig, RegexEngine, VeilError};

use crate::cli::RuleArgs;

/// Builds the rule engine: built-in rules, then custom rules merged over them,
/// then the disabled names switched off.
pub fn build_engine(args: &RuleArgs) -> Result<RegexEngine> {
    let defaults = RedactionConfig::load_default_rules()?;
    let user = match &args.config {
        Some(path) => Some(
            RedactionConfig::load_from_file(path)
                .with_context(|| format!("Failed to load rules from {}", path.display()))?,
        ),
        None => None,
    };

    let mut config = merge_rules(defaults, user);
    if !args.disable.is_empty() {
        config.disable_rules(&args.disable);
    }
    debug!("Building engine with {} rule(s).", config.rules.len());
    RegexEngine::new(config)
}

/// Process exit code for a failed command.
///
/// 2 unreadable source, 3 protection failure, 4 missing artifact,
/// 5 invalid output name, 1 anything else.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<VeilError>() {
        Some(VeilError::Extraction(_)) => 2,
        Some(VeilError::Encryption(_)) => 3,
        Some(VeilError::NoPendingArtifact(_)) => 4,
        Some(VeilError::InvalidName(_)) => 5,
        _ => 1,
    }
}
