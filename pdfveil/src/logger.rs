//! Logger setup for the `pdfveil` binary.
//!
//! `RUST_LOG` is honoured unless an explicit level is passed in. Logs go to
//! stderr so they never mix with JSON written to stdout.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Initializes the global logger. Calling it more than once is harmless.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    builder.target(Target::Stderr).format_timestamp(None);
    if let Some(level) = level {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}
