// pdfveil/src/cli.rs
//! Command-line interface definition for the `pdfveil` binary.
//! License: MIT OR Apache-2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "pdfveil",
    version = env!("CARGO_PKG_VERSION"),
    about = "Redact personal data from PDF documents",
    long_about = "PdfVeil extracts the text of a PDF, replaces personal data (SSN-shaped tokens, email addresses, bare phone numbers and any custom patterns) with a marker, and writes a brand-new password-protected PDF containing only the redacted text.",
    arg_required_else_help = true
)]
pub struct Cli {
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    #[arg(long, short = 'd', global = true, conflicts_with = "quiet", help = "Enable debug logging.")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Redacts a PDF and writes a password-protected copy.
    Redact(RedactCommand),

    /// Reports what would be redacted without writing anything.
    Scan(ScanCommand),
}

/// Rule selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// Custom rules merged over the built-in ones (YAML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rule names to disable (comma-separated).
    #[arg(long, short = 'x', value_delimiter = ',')]
    pub disable: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RedactCommand {
    /// Source PDF.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the protected PDF. Defaults to `<name>.pdf` next to the input.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Name of the protected document, without extension. Defaults to `<input stem>-redacted`.
    #[arg(long, short = 'n', value_name = "NAME")]
    pub name: Option<String>,

    /// Password for the protected document. Prompted for when absent and stdin is a terminal.
    #[arg(long, env = "PDFVEIL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Password applied at hand-off, if different from `--password`.
    #[arg(long = "new-password", env = "PDFVEIL_NEW_PASSWORD", hide_env_values = true)]
    pub new_password: Option<String>,

    /// Service settings (storage, limits, page layout, encryption). Searched for in the usual places when absent.
    #[arg(long = "service-config", value_name = "FILE")]
    pub service_config: Option<PathBuf>,

    /// Overrides the directory used for intermediate files.
    #[arg(long = "storage-dir", value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    #[command(flatten)]
    pub rules: RuleArgs,

    #[arg(long = "no-redaction-summary", help = "Suppress the redaction summary.")]
    pub no_summary: bool,
}

#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Source PDF.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[command(flatten)]
    pub rules: RuleArgs,

    /// Print the summary as JSON to stdout.
    #[arg(long)]
    pub json: bool,

    /// Exit with a non-zero code if more than N matches are found.
    #[arg(long = "fail-over-threshold", value_name = "N")]
    pub fail_over_threshold: Option<usize>,
}
