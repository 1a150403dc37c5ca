// pdfveil-core/src/engines/mod.rs
//! Concrete `SanitizationEngine` implementations.
//!
//! Each engine is a separate file within this directory. To add a new engine,
//! create a new file, implement the trait, and declare it here.

pub mod regex_engine;
