// pdfveil/src/lib.rs
//! # PdfVeil command-line application
//!
//! Thin terminal front end over `pdfveil-core`. The binary in `main.rs`
//! parses arguments and dispatches to the modules here.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
