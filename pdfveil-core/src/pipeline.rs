// pdfveil-core/src/pipeline.rs
//! The redaction service: the two operations a transport layer calls.
//!
//! * `redact` stores the upload, extracts its text, redacts it, rebuilds a new
//!   document, protects it and parks it in the job table under a fresh
//!   reference.
//! * `finalize` re-protects the parked document with a new password under a
//!   new name, hands the bytes to the caller and removes every file of the job.
//!
//! CPU-bound work runs on the blocking pool under a time limit.
//!
//! Every file a request creates is held by a guard until ownership passes to
//! the job table or to the caller, so a request that fails or is dropped at
//! any await point leaves nothing on disk. Blocking file operations already
//! in flight when that happens are cleaned up by the reaper's orphan sweep.
//!
//! License: MIT OR APACHE 2.0

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;

use crate::config::{RedactionSummaryItem, ServiceConfig};
use crate::document::{
    extract_text, DocumentRebuilder, Encryptor, PasswordPolicy, SanitizedDocument,
};
use crate::engine::SanitizationEngine;
use crate::errors::{VeilError, VeilResult};
use crate::jobs::{ArtifactRef, JobEntry, JobTable};
use crate::storage::{ArtifactStorage, LocalStorage, ScopedFile};

const MAX_ARTIFACT_NAME_LEN: usize = 128;

/// Result of one pass through extract → redact → rebuild → encrypt.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub document: SanitizedDocument,
    pub artifact: Vec<u8>,
    pub summary: Vec<RedactionSummaryItem>,
}

/// Runs the whole pipeline synchronously on `source`.
pub fn process_document(
    engine: &dyn SanitizationEngine,
    rebuilder: &DocumentRebuilder,
    encryptor: &Encryptor,
    source: &[u8],
    policy: &PasswordPolicy,
    source_id: &str,
) -> VeilResult<ProcessedDocument> {
    policy.validate()?;
    let text = extract_text(source)?;
    let (redacted, summary) = engine.sanitize(&text, source_id)?;
    let document = rebuilder.rebuild(&redacted)?;
    let artifact = encryptor.encrypt(&document, policy)?;
    Ok(ProcessedDocument { document, artifact, summary })
}

/// What `finalize` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedArtifact {
    /// Download name, `<new_name>.pdf`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Validates a caller-chosen artifact name and returns `<name>.pdf`.
pub fn artifact_file_name(new_name: &str) -> VeilResult<String> {
    let trimmed = new_name.trim();
    let split = trimmed
        .len()
        .checked_sub(4)
        .and_then(|at| trimmed.get(at..).map(|ext| (at, ext)));
    let stem = match split {
        Some((at, ext)) if at > 0 && ext.eq_ignore_ascii_case(".pdf") => &trimmed[..at],
        _ => trimmed,
    };

    let valid = !stem.is_empty()
        && stem.len() <= MAX_ARTIFACT_NAME_LEN
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(VeilError::InvalidName(new_name.to_string()));
    }
    Ok(format!("{}.pdf", stem))
}

pub struct RedactionService {
    engine: Arc<dyn SanitizationEngine>,
    rebuilder: DocumentRebuilder,
    encryptor: Encryptor,
    storage: Arc<dyn ArtifactStorage>,
    jobs: Arc<JobTable>,
    config: ServiceConfig,
}

impl RedactionService {
    /// Service storing artifacts on local disk under `config.storage_dir`.
    pub fn new(config: ServiceConfig, engine: Arc<dyn SanitizationEngine>) -> VeilResult<Self> {
        let storage: Arc<dyn ArtifactStorage> = Arc::new(LocalStorage::new(config.storage_dir.clone()));
        Self::with_storage(config, engine, storage)
    }

    pub fn with_storage(
        config: ServiceConfig,
        engine: Arc<dyn SanitizationEngine>,
        storage: Arc<dyn ArtifactStorage>,
    ) -> VeilResult<Self> {
        let rebuilder = DocumentRebuilder::new(config.page.clone())?;
        let jobs = Arc::new(
            JobTable::new(Arc::clone(&storage), config.artifact_ttl()).with_orphan_grace(config.orphan_grace()),
        );
        Ok(Self {
            engine,
            rebuilder,
            encryptor: Encryptor::new(),
            storage,
            jobs,
            config,
        })
    }

    pub fn jobs(&self) -> &Arc<JobTable> {
        &self.jobs
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Same password for owner and user, permissions and revision from config.
    pub fn default_policy(&self, password: &str) -> PasswordPolicy {
        let settings = &self.config.encryption;
        PasswordPolicy {
            permissions: settings.permissions,
            revision: settings.revision,
            compatibility_mode: settings.compatibility_mode,
            ..PasswordPolicy::with_password(password)
        }
    }

    /// Starts the periodic reaper for expired artifacts.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        Arc::clone(&self.jobs).spawn_reaper(self.config.reap_interval())
    }

    pub async fn redact(&self, source: &[u8], password: &str) -> VeilResult<ArtifactRef> {
        self.redact_with_policy(source, self.default_policy(password)).await
    }

    pub async fn redact_with_policy(&self, source: &[u8], policy: PasswordPolicy) -> VeilResult<ArtifactRef> {
        policy.validate()?;
        self.check_input_size(source)?;

        let source_file = ScopedFile::new(self.storage.store(source, "source.pdf").await?);
        let source_bytes = self.storage.read(source_file.path()).await?;
        let source_id = source_file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let engine = Arc::clone(&self.engine);
        let rebuilder = self.rebuilder.clone();
        let encryptor = self.encryptor;
        let job_policy = policy.clone();
        let processed = self
            .run_blocking(move || {
                process_document(
                    engine.as_ref(),
                    &rebuilder,
                    &encryptor,
                    &source_bytes,
                    &job_policy,
                    &source_id,
                )
            })
            .await?;

        let artifact = ScopedFile::new(self.storage.store(&processed.artifact, "artifact.pdf").await?);
        drop(source_file);

        let redactions: usize = processed.summary.iter().map(|s| s.occurrences).sum();
        let entry = JobEntry::new(
            artifact.path().to_path_buf(),
            processed.document,
            &policy,
            processed.summary,
        );
        let reference = self.jobs.produce(entry).await;
        artifact.keep();
        info!(
            "Produced artifact {} ({} redaction(s), {} bytes, sha256 {})",
            reference,
            redactions,
            processed.artifact.len(),
            hex::encode(Sha256::digest(&processed.artifact))
        );
        Ok(reference)
    }

    /// Re-protects the artifact with `new_password`, returns it as `<new_name>.pdf`
    /// and removes every file belonging to the job.
    pub async fn finalize(
        &self,
        reference: &ArtifactRef,
        new_name: &str,
        new_password: &str,
    ) -> VeilResult<FinalizedArtifact> {
        let mut bytes: Vec<u8> = Vec::new();
        let file_name = self.finalize_to(reference, new_name, new_password, &mut bytes).await?;
        Ok(FinalizedArtifact { file_name, bytes })
    }

    /// Streaming form of [`RedactionService::finalize`]. Returns the download name.
    ///
    /// If anything fails before the bytes are handed off, the artifact stays
    /// pending under the same reference.
    pub async fn finalize_to(
        &self,
        reference: &ArtifactRef,
        new_name: &str,
        new_password: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> VeilResult<String> {
        let file_name = artifact_file_name(new_name)?;
        let taken = TakenJob::new(*reference, self.jobs.take(reference).await?);

        let new_path = self.storage.path_for(&format!("{}-{}", reference, file_name));
        let staged = match self.reprotect(&taken.entry, new_password, new_path).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!("Finalize of {} failed, artifact kept: {}", reference, e);
                taken.restore(&self.jobs).await;
                return Err(e);
            }
        };
        // The old artifact is gone; only the staged copy is left to clean up.
        taken.release();

        let sent = self.storage.stream_to_client(staged.path(), writer).await?;
        staged.keep();
        info!("Finalized artifact {} as {} ({} bytes)", reference, file_name, sent);
        Ok(file_name)
    }

    /// Copies the artifact to `new_path`, overwrites the copy with the document
    /// re-encrypted under the new password, then deletes the old artifact.
    /// On error the old artifact is untouched and the copy is removed.
    async fn reprotect(&self, entry: &JobEntry, new_password: &str, new_path: PathBuf) -> VeilResult<ScopedFile> {
        let policy = entry.protection.rekeyed(new_password);
        policy.validate()?;

        let staged = ScopedFile::new(new_path);
        self.storage.copy(&entry.artifact_path, staged.path()).await?;

        let document = entry.document.clone();
        let encryptor = self.encryptor;
        let bytes = self
            .run_blocking(move || encryptor.encrypt(&document, &policy))
            .await?;
        self.storage.write(staged.path(), &bytes).await?;

        self.storage.delete(&entry.artifact_path).await?;
        debug!("Re-protected {} into {}", entry.artifact_path.display(), staged.path().display());
        Ok(staged)
    }

    /// Reports what would be redacted from `source` without producing anything.
    pub async fn scan(&self, source: &[u8]) -> VeilResult<Vec<RedactionSummaryItem>> {
        self.check_input_size(source)?;
        let engine = Arc::clone(&self.engine);
        let source = source.to_vec();
        self.run_blocking(move || {
            let text = extract_text(&source)?;
            Ok(engine.analyze_for_stats(&text, "scan")?)
        })
        .await
    }

    fn check_input_size(&self, source: &[u8]) -> VeilResult<()> {
        if source.len() > self.config.max_input_bytes {
            return Err(VeilError::Extraction(format!(
                "document is {} bytes, limit is {}",
                source.len(),
                self.config.max_input_bytes
            )));
        }
        Ok(())
    }

    async fn run_blocking<T, F>(&self, work: F) -> VeilResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> VeilResult<T> + Send + 'static,
    {
        let limit: Duration = self.config.processing_timeout();
        match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
            Err(_) => Err(VeilError::Timeout(limit)),
            Ok(Err(join_error)) if join_error.is_panic() => {
                Err(VeilError::Extraction("document processing panicked".to_string()))
            }
            Ok(Err(join_error)) => Err(VeilError::Fatal(join_error.to_string())),
            Ok(Ok(result)) => result,
        }
    }
}

/// An entry taken out of the job table for finalizing. Dropping it without
/// [`TakenJob::restore`] or [`TakenJob::release`] deletes the artifact.
struct TakenJob {
    reference: ArtifactRef,
    entry: JobEntry,
    artifact: ScopedFile,
}

impl TakenJob {
    fn new(reference: ArtifactRef, entry: JobEntry) -> Self {
        let artifact = ScopedFile::new(entry.artifact_path.clone());
        Self { reference, entry, artifact }
    }

    /// Puts the entry back under its reference.
    async fn restore(self, jobs: &JobTable) {
        let TakenJob { reference, entry, artifact } = self;
        jobs.restore(reference, entry).await;
        artifact.keep();
    }

    fn release(self) {
        self.artifact.keep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_are_validated() {
        assert_eq!(artifact_file_name("report").unwrap(), "report.pdf");
        assert_eq!(artifact_file_name("report.PDF").unwrap(), "report.pdf");
        assert_eq!(artifact_file_name(" q3-final_v2 ").unwrap(), "q3-final_v2.pdf");
        for bad in ["", ".pdf", "../etc/passwd", "a/b", ".hidden", "name with space"] {
            assert!(
                matches!(artifact_file_name(bad), Err(VeilError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(artifact_file_name(&"a".repeat(129)).is_err());
    }
}
