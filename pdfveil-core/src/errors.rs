//! errors.rs - Custom error types for the pdfveil-core library.
//!
//! This module defines a structured error enum for the library. The first four
//! variants form the failure taxonomy seen by a transport layer; the rest are
//! more specific failures that a caller may want to handle programmatically.
//!
//! License: MIT OR APACHE 2.0

use std::time::Duration;

use thiserror::Error;

use crate::jobs::ArtifactRef;

/// This enum represents all possible error types in the `pdfveil-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VeilError {
    /// The source document is unreadable, corrupt, unsupported or too large.
    #[error("Failed to extract text from source document: {0}")]
    Extraction(String),

    /// Serialization failed or the password policy was violated.
    #[error("Failed to protect document: {0}")]
    Encryption(String),

    /// `finalize` was called against a reference with no outstanding artifact.
    #[error("No pending artifact for reference '{0}'")]
    NoPendingArtifact(ArtifactRef),

    #[error("An unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to rebuild sanitized document: {0}")]
    Rebuild(String),

    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),

    #[error("Processing exceeded the time limit of {0:?}")]
    Timeout(Duration),

    #[error("Failed to compile redaction rule '{0}': {1}")]
    RuleCompilationError(String, regex::Error),

    #[error("Rule '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}

/// Convenience alias used throughout the core.
pub type VeilResult<T> = Result<T, VeilError>;
