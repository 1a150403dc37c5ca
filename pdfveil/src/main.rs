// pdfveil/src/main.rs
//! PdfVeil entry point.

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use pdfveil::cli::{Cli, Commands};
use pdfveil::commands::{self, redact::run_redact, scan::run_scan};
use pdfveil::logger;
use pdfveil::ui::output_format::error_msg;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let quiet = cli.quiet;

    let level = if quiet {
        Some(LevelFilter::Off)
    } else if cli.debug {
        Some(LevelFilter::Debug)
    } else {
        None
    };
    logger::init_logger(level);

    let result = match cli.command {
        Commands::Redact(cmd) => run_redact(cmd, quiet).await,
        Commands::Scan(cmd) => run_scan(cmd, quiet).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error_msg(format!("{:#}", e));
            ExitCode::from(commands::exit_code_for(&e))
        }
    }
}
