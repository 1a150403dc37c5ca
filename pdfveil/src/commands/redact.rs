//! `pdfveil redact`: produce a protected artifact, then finalize it straight
//! into the output file.
//!
//! The output file is created before any artifact exists. If anything fails
//! afterwards the output is removed and a pending artifact is discarded.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};

use pdfveil_core::{artifact_file_name, RedactionService, RedactionSummaryItem, ServiceConfig};

use crate::cli::RedactCommand;
use crate::commands::build_engine;
use crate::ui::output_format::{info_msg, prompt_text, success_msg, warn_msg};
use crate::ui::redaction_summary;

pub async fn run_redact(cmd: RedactCommand, quiet: bool) -> Result<()> {
    info!("Starting redact operation.");

    let mut service_config = match &cmd.service_config {
        Some(path) => ServiceConfig::load_from_file(path)?,
        None => ServiceConfig::discover()?,
    };
    if let Some(dir) = &cmd.storage_dir {
        service_config.storage_dir = dir.clone();
    }

    let name = match &cmd.name {
        Some(name) => name.clone(),
        None => default_artifact_name(&cmd.input),
    };
    let file_name = artifact_file_name(&name)?;
    let output = cmd
        .output
        .clone()
        .unwrap_or_else(|| cmd.input.with_file_name(&file_name));
    if same_file(&cmd.input, &output) {
        bail!("Refusing to overwrite the input file {}", cmd.input.display());
    }

    let password = resolve_password(cmd.password.clone())?;
    let new_password = cmd.new_password.clone().unwrap_or_else(|| password.clone());

    let engine = Arc::new(build_engine(&cmd.rules)?);
    let service = RedactionService::new(service_config, engine)?;

    let source = tokio::fs::read(&cmd.input)
        .await
        .with_context(|| format!("Failed to read input file {}", cmd.input.display()))?;
    debug!("Read {} bytes from {}", source.len(), cmd.input.display());

    let mut file = tokio::fs::File::create(&output)
        .await
        .with_context(|| format!("Failed to create output file {}", output.display()))?;
    let result = redact_into(&service, &source, &password, &name, &new_password, &mut file).await;
    drop(file);
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(e);
        }
    };

    if !quiet {
        if !cmd.no_summary {
            let colors = std::io::stderr().is_terminal();
            redaction_summary::print_summary(&summary, &mut std::io::stderr(), colors)?;
        }
        if summary.is_empty() {
            warn_msg("No sensitive data matched; the output carries the full text.");
        }
        success_msg(format!("Wrote protected document to {}", output.display()));
    }
    info!("Redact operation completed.");
    Ok(())
}

/// Runs redact then finalize into `file`. A failed finalize discards the artifact.
async fn redact_into(
    service: &RedactionService,
    source: &[u8],
    password: &str,
    name: &str,
    new_password: &str,
    file: &mut tokio::fs::File,
) -> Result<Vec<RedactionSummaryItem>> {
    let reference = service.redact(source, password).await?;
    let summary = service.jobs().summary(&reference).await.unwrap_or_default();
    if let Err(e) = service.finalize_to(&reference, name, new_password, file).await {
        if service.jobs().discard(&reference).await {
            debug!("Discarded artifact {} after failed finalize", reference);
        }
        return Err(e.into());
    }
    Ok(summary)
}

/// `<input stem>-redacted`, with characters outside the artifact name alphabet replaced.
fn default_artifact_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .trim_start_matches('.')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "redacted".to_string()
    } else {
        format!("{}-redacted", cleaned)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn resolve_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        bail!("No password given. Use --password or set PDFVEIL_PASSWORD.");
    }
    info_msg("The output document will be protected with this password.");
    let colors = std::io::stderr().is_terminal();
    let password = rpassword::prompt_password(prompt_text("Password:", colors))
        .context("Failed to read password")?;
    let confirm = rpassword::prompt_password(prompt_text("Confirm password:", colors))
        .context("Failed to read password")?;
    if password != confirm {
        bail!("Passwords do not match.");
    }
    Ok(password)
}
