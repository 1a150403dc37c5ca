// pdfveil-core/src/lib.rs
//! # PdfVeil Core Library
//!
//! `pdfveil-core` takes a PDF, finds personal-data patterns in its text,
//! builds a brand-new PDF carrying only the redacted text, protects it with a
//! password and keeps it parked until the requester finalizes it.
//!
//! ## Modules
//!
//! * `config`: `RedactionRule`s, `RedactionConfig` and the `ServiceConfig`.
//! * `engine`: The pluggable `SanitizationEngine` trait.
//! * `engines`: Concrete engines; `RegexEngine` applies rules as ordered passes.
//! * `sanitizers`: Rule compilation with a process-wide cache.
//! * `redaction_match`: Match records and PII-safe debug logging.
//! * `document`: Text extraction, document rebuilding and encryption.
//! * `storage`: Artifact storage trait, local-disk implementation and scoped files.
//! * `jobs`: The keyed table of outstanding artifacts.
//! * `pipeline`: `RedactionService`, exposing `redact` and `finalize`.
//! * `headless`: One-shot processing without a job table.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pdfveil_core::{RedactionService, RegexEngine, ServiceConfig};
//!
//! # async fn run(upload: Vec<u8>) -> Result<(), pdfveil_core::VeilError> {
//! let engine = Arc::new(RegexEngine::with_default_rules()?);
//! let service = RedactionService::new(ServiceConfig::default(), engine)?;
//! let _reaper = service.spawn_reaper();
//!
//! let reference = service.redact(&upload, "first-password").await?;
//! // ... later, from the same requester:
//! let finalized = service.finalize(&reference, "statement", "final-password").await?;
//! assert_eq!(finalized.file_name, "statement.pdf");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Core operations return `VeilError`. Configuration loading uses `anyhow`.
//!
//! License: MIT OR Apache-2.0

pub mod config;
pub mod document;
pub mod engine;
pub mod engines;
pub mod errors;
pub mod headless;
pub mod jobs;
pub mod pipeline;
pub mod redaction_match;
pub mod sanitizers;
pub mod storage;

pub use config::{
    merge_rules, RedactionConfig, RedactionRule, RedactionSummaryItem, ServiceConfig,
    DEFAULT_REDACTION_MARKER, MAX_PATTERN_LENGTH,
};

pub use errors::{VeilError, VeilResult};

pub use engine::SanitizationEngine;
pub use engines::regex_engine::RegexEngine;

pub use redaction_match::{redact_sensitive, RedactionMatch};

pub use document::{
    extract_text, DocumentRebuilder, EncryptionRevision, Encryptor, PageGeometry, PasswordPolicy,
    PermissionPolicy, PrintingPermission, SanitizedDocument,
};

pub use storage::{ArtifactStorage, LocalStorage, ScopedFile};

pub use jobs::{ArtifactRef, JobTable, SlotState};

pub use pipeline::{artifact_file_name, FinalizedArtifact, ProcessedDocument, RedactionService};

pub use headless::headless_redact_pdf;

pub use sanitizers::compiler::{compile_rules, CompiledRule, CompiledRules};
