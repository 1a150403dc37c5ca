// pdfveil-core/tests/pipeline_tests.rs
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use pdfveil_core::{
    extract_text, headless_redact_pdf, DocumentRebuilder, PageGeometry, PasswordPolicy,
    RedactionConfig, RedactionService, RegexEngine, ServiceConfig, SlotState, VeilError,
};

const CONTACT_LINE: &str = "Contact john@x.com or 555-12-3456, call 1234567890";

fn source_pdf(text: &str) -> Vec<u8> {
    DocumentRebuilder::new(PageGeometry::default())
        .unwrap()
        .rebuild(text)
        .unwrap()
        .to_unprotected_bytes()
        .unwrap()
}

fn service_in(dir: &Path, tweak: impl FnOnce(&mut ServiceConfig)) -> RedactionService {
    let mut config = ServiceConfig {
        storage_dir: dir.to_path_buf(),
        ..ServiceConfig::default()
    };
    tweak(&mut config);
    let engine = Arc::new(RegexEngine::with_default_rules().unwrap());
    RedactionService::new(config, engine).unwrap()
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn open_with(bytes: &[u8], password: &str) -> lopdf::Result<String> {
    let mut document = lopdf::Document::load_mem(bytes)?;
    document.decrypt(password)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    document.extract_text(&pages)
}

/// Polls `future` once and drops it. Returns whether it had already finished.
async fn poll_once_then_drop<F: Future>(future: F) -> bool {
    let mut future = Box::pin(future);
    std::future::poll_fn(|cx| Poll::Ready(future.as_mut().poll(cx).is_ready())).await
}

/// Waits out blocking file operations left running by a dropped request, then
/// sweeps whatever they left.
async fn settle_and_sweep(service: &RedactionService, dir: &Path) {
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.jobs().sweep_orphans(Duration::ZERO).await;
        if files_in(dir) == 0 {
            break;
        }
    }
}

#[test_log::test(tokio::test)]
async fn redact_then_finalize_hands_off_and_cleans_up() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    let reference = service.redact(&source_pdf(CONTACT_LINE), "first").await?;
    assert_eq!(service.jobs().state(&reference).await, SlotState::Holding(reference));
    assert_eq!(files_in(dir.path()), 1);

    let summary = service.jobs().summary(&reference).await.unwrap();
    let names: Vec<&str> = summary.iter().map(|s| s.rule_name.as_str()).collect();
    assert_eq!(names, vec!["us_ssn", "email", "bare_phone_number"]);

    let finalized = service.finalize(&reference, "statement", "second").await?;
    assert_eq!(finalized.file_name, "statement.pdf");
    assert!(finalized.bytes.starts_with(b"%PDF-"));
    assert!(contains(&finalized.bytes, b"/Encrypt"));
    assert!(!contains(&finalized.bytes, b"john@x.com"));

    assert_eq!(service.jobs().state(&reference).await, SlotState::Empty);
    assert!(service.jobs().is_empty().await);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[test]
fn redacted_text_is_what_gets_rebuilt() -> Result<()> {
    let processed = headless_redact_pdf(
        RedactionConfig::load_default_rules()?,
        PageGeometry::default(),
        &PasswordPolicy::with_password("pw"),
        &source_pdf(CONTACT_LINE),
        "contact",
    )?;

    let text = processed.document.text();
    assert!(text.contains("Contact [REDACTED] or [REDACTED], call [REDACTED]"));
    assert!(!text.contains("john@x.com"));

    let round_trip = extract_text(&processed.document.to_unprotected_bytes()?)?;
    assert!(round_trip.contains("[REDACTED]"));
    assert!(!round_trip.contains("1234567890"));
    Ok(())
}

#[tokio::test]
async fn redact_is_deterministic() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let source = source_pdf(CONTACT_LINE);

    let a = service.redact(&source, "same").await?;
    let b = service.redact(&source, "same").await?;
    assert_ne!(a, b);

    let path_a = service.jobs().artifact_path(&a).await.unwrap();
    let path_b = service.jobs().artifact_path(&b).await.unwrap();
    assert_ne!(path_a, path_b);
    assert_eq!(std::fs::read(path_a)?, std::fs::read(path_b)?);
    Ok(())
}

#[tokio::test]
async fn finalize_unknown_reference_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    let reference = service.redact(&source_pdf("nothing sensitive"), "pw").await?;
    service.finalize(&reference, "done", "pw2").await?;

    let err = service.finalize(&reference, "again", "pw3").await.unwrap_err();
    assert!(matches!(err, VeilError::NoPendingArtifact(r) if r == reference));

    let never_issued = "7d444840-9dc0-11d1-b245-5ffdce74fad2".parse()?;
    let err = service.finalize(&never_issued, "x", "pw").await.unwrap_err();
    assert!(matches!(err, VeilError::NoPendingArtifact(_)));
    Ok(())
}

#[tokio::test]
async fn two_produces_are_independent() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    let first = service.redact(&source_pdf("first john@x.com"), "pw").await?;
    let second = service.redact(&source_pdf("second 123-45-6789"), "pw").await?;
    assert_ne!(first, second);
    assert_eq!(service.jobs().len().await, 2);

    let b = service.finalize(&second, "second", "new").await?;
    assert_eq!(service.jobs().state(&first).await, SlotState::Holding(first));
    let a = service.finalize(&first, "first", "new").await?;

    assert_eq!(a.file_name, "first.pdf");
    assert_eq!(b.file_name, "second.pdf");
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_finalize_has_one_winner() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;

    let (a, b) = tokio::join!(
        service.finalize(&reference, "left", "one"),
        service.finalize(&reference, "right", "two"),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, VeilError::NoPendingArtifact(_)));
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn corrupt_input_leaves_nothing_behind() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    for junk in [&b""[..], b"%PDF-1.7 truncated", b"\x00\x01\x02 binary noise"] {
        let err = service.redact(junk, "pw").await.unwrap_err();
        assert!(matches!(err, VeilError::Extraction(_)), "unexpected error {err:?}");
    }
    assert!(service.jobs().is_empty().await);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn empty_password_is_rejected_before_any_work() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    let err = service.redact(&source_pdf(CONTACT_LINE), "").await.unwrap_err();
    assert!(matches!(err, VeilError::Encryption(_)));
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn failed_finalize_keeps_artifact_pending() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;
    let original_path = service.jobs().artifact_path(&reference).await.unwrap();

    let err = service.finalize(&reference, "report", "").await.unwrap_err();
    assert!(matches!(err, VeilError::Encryption(_)));
    assert_eq!(service.jobs().state(&reference).await, SlotState::Holding(reference));
    assert!(original_path.exists());
    assert_eq!(files_in(dir.path()), 1);

    let err = service.finalize(&reference, "../escape", "pw2").await.unwrap_err();
    assert!(matches!(err, VeilError::InvalidName(_)));
    assert_eq!(service.jobs().state(&reference).await, SlotState::Holding(reference));

    let finalized = service.finalize(&reference, "report.pdf", "pw2").await?;
    assert_eq!(finalized.file_name, "report.pdf");
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn oversized_input_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |c| c.max_input_bytes = 64);

    let err = service.redact(&source_pdf(CONTACT_LINE), "pw").await.unwrap_err();
    assert!(matches!(err, VeilError::Extraction(_)));
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn expired_artifacts_are_reaped() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |c| c.artifact_ttl_secs = 0);

    let reaped = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;
    assert_eq!(service.jobs().reap_expired().await, 1);
    assert_eq!(files_in(dir.path()), 0);
    let err = service.finalize(&reaped, "late", "pw2").await.unwrap_err();
    assert!(matches!(err, VeilError::NoPendingArtifact(_)));

    let expired = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;
    let err = service.finalize(&expired, "late", "pw2").await.unwrap_err();
    assert!(matches!(err, VeilError::NoPendingArtifact(_)));
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn background_reaper_collects_orphans() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |c| {
        c.artifact_ttl_secs = 0;
        c.reap_interval_secs = 1;
    });

    service.redact(&source_pdf(CONTACT_LINE), "pw").await?;
    let reaper = service.spawn_reaper();
    for _ in 0..50 {
        if service.jobs().is_empty().await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    reaper.abort();

    assert!(service.jobs().is_empty().await);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn finalize_to_streams_into_writer() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;

    let mut sink: Vec<u8> = Vec::new();
    let name = service.finalize_to(&reference, "streamed", "pw2", &mut sink).await?;
    assert_eq!(name, "streamed.pdf");
    assert!(sink.starts_with(b"%PDF-"));
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn scan_reports_without_producing() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    let summary = service.scan(&source_pdf("mail a@b.co and c@d.org")).await?;
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].rule_name, "email");
    assert_eq!(summary[0].occurrences, 2);
    assert!(service.jobs().is_empty().await);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn finalized_artifact_opens_only_with_the_new_password() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "first").await?;

    let parked = std::fs::read(service.jobs().artifact_path(&reference).await.unwrap())?;
    assert!(open_with(&parked, "first")?.contains("[REDACTED]"));

    let finalized = service.finalize(&reference, "statement", "second").await?;
    let text = open_with(&finalized.bytes, "second")?;
    assert!(text.contains("Contact [REDACTED] or [REDACTED], call [REDACTED]"));
    assert!(!text.contains("john@x.com"));
    assert!(open_with(&finalized.bytes, "first").is_err());
    assert!(open_with(&finalized.bytes, "wrong").is_err());
    Ok(())
}

#[tokio::test]
async fn slow_processing_times_out_and_leaves_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |c| c.processing_timeout_secs = 0);
    let long_text = vec![CONTACT_LINE; 150 * 54].join("\n");

    let err = service.redact(&source_pdf(&long_text), "pw").await.unwrap_err();
    assert!(matches!(err, VeilError::Timeout(limit) if limit == Duration::ZERO), "unexpected error {err:?}");
    assert!(service.jobs().is_empty().await);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn dropped_finalize_does_not_orphan_the_artifact() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;
    let artifact = service.jobs().artifact_path(&reference).await.unwrap();

    let mut sink: Vec<u8> = Vec::new();
    let finished = poll_once_then_drop(service.finalize_to(&reference, "gone", "pw2", &mut sink)).await;
    if !finished {
        assert!(!artifact.exists());
    }

    settle_and_sweep(&service, dir.path()).await;
    assert_eq!(service.jobs().state(&reference).await, SlotState::Empty);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn dropped_redact_leaves_no_files() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});

    let finished = poll_once_then_drop(service.redact(&source_pdf(CONTACT_LINE), "pw")).await;
    assert!(!finished);

    settle_and_sweep(&service, dir.path()).await;
    assert!(service.jobs().is_empty().await);
    assert_eq!(files_in(dir.path()), 0);
    Ok(())
}

#[tokio::test]
async fn discarded_artifact_cannot_be_finalized() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;

    assert!(service.jobs().discard(&reference).await);
    assert_eq!(files_in(dir.path()), 0);
    let err = service.finalize(&reference, "late", "pw2").await.unwrap_err();
    assert!(matches!(err, VeilError::NoPendingArtifact(_)));
    Ok(())
}

#[tokio::test]
async fn parked_summary_keeps_counts_but_not_matched_text() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service_in(dir.path(), |_| {});
    let reference = service.redact(&source_pdf(CONTACT_LINE), "pw").await?;

    let summary = service.jobs().summary(&reference).await.unwrap();
    assert!(summary.iter().all(|s| s.occurrences == 1));
    assert!(summary.iter().all(|s| s.original_texts.is_empty()));
    Ok(())
}
