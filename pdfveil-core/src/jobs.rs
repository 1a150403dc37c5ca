// pdfveil-core/src/jobs.rs
//! The table of outstanding artifacts.
//!
//! Each produced artifact is keyed by its own [`ArtifactRef`], handed to the
//! caller and required again to finalize. Per reference the state machine is:
//!
//! ```text
//!   Empty --produce--> Holding(ref) --take (finalize)--> Empty
//!                          |  ^
//!                          |  '--restore (finalize failed before hand-off)
//!                          '--reap (older than ttl)--> Empty
//! ```
//!
//! `produce` always mints a fresh reference, so nothing is ever overwritten.
//! `take` removes the entry under the table lock, which gives the finalizing
//! caller exclusive ownership of that reference until it restores or drops it.
//!
//! The reaper also sweeps storage for files no entry refers to that are older
//! than the ttl plus a grace period. Those are left behind by work abandoned
//! while a blocking file operation was still in flight.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::RedactionSummaryItem;
use crate::document::{PasswordPolicy, SanitizedDocument};
use crate::errors::{VeilError, VeilResult};
use crate::storage::ArtifactStorage;

/// Opaque, caller-held handle to one outstanding artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(Uuid);

impl ArtifactRef {
    fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactRef {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Holding(ArtifactRef),
}

/// Everything kept about an outstanding artifact. No password and no matched
/// text is stored.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub artifact_path: PathBuf,
    /// The unencrypted rebuilt document, reused when re-protecting.
    pub document: SanitizedDocument,
    /// Permissions and revision of the original request, passwords cleared.
    pub protection: PasswordPolicy,
    /// Rule names and counts. `original_texts` is always empty.
    pub summary: Vec<RedactionSummaryItem>,
    pub created_at: DateTime<Utc>,
}

impl JobEntry {
    pub fn new(
        artifact_path: PathBuf,
        document: SanitizedDocument,
        protection: &PasswordPolicy,
        summary: Vec<RedactionSummaryItem>,
    ) -> Self {
        let summary = summary
            .into_iter()
            .map(|item| RedactionSummaryItem {
                original_texts: Vec::new(),
                ..item
            })
            .collect();
        Self {
            artifact_path,
            document,
            protection: protection.without_passwords(),
            summary,
            created_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.created_at)
            .to_std()
            .map(|age| age >= ttl)
            .unwrap_or(false)
    }
}

pub struct JobTable {
    entries: Mutex<HashMap<ArtifactRef, JobEntry>>,
    storage: Arc<dyn ArtifactStorage>,
    ttl: Duration,
    orphan_grace: Duration,
}

impl fmt::Debug for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTable").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JobTable {
    pub fn new(storage: Arc<dyn ArtifactStorage>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            storage,
            ttl,
            orphan_grace: ttl,
        }
    }

    /// Extra age, beyond the ttl, before an unreferenced file is swept.
    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    /// Records a new artifact under a freshly minted reference.
    pub async fn produce(&self, entry: JobEntry) -> ArtifactRef {
        let mut entries = self.entries.lock().await;
        let mut reference = ArtifactRef::mint();
        while entries.contains_key(&reference) {
            reference = ArtifactRef::mint();
        }
        debug!("Holding artifact {} at {}", reference, entry.artifact_path.display());
        entries.insert(reference, entry);
        reference
    }

    /// Removes and returns the entry for `reference`.
    ///
    /// Unknown, already-taken and expired references yield
    /// [`VeilError::NoPendingArtifact`]. An expired entry's file is deleted here.
    pub async fn take(&self, reference: &ArtifactRef) -> VeilResult<JobEntry> {
        let entry = self
            .entries
            .lock()
            .await
            .remove(reference)
            .ok_or(VeilError::NoPendingArtifact(*reference))?;

        if entry.is_expired(self.ttl, Utc::now()) {
            info!("Artifact {} expired before finalize", reference);
            self.delete_file(reference, &entry).await;
            return Err(VeilError::NoPendingArtifact(*reference));
        }
        Ok(entry)
    }

    /// Drops the entry for `reference` and deletes its file. Returns whether
    /// there was anything to discard.
    pub async fn discard(&self, reference: &ArtifactRef) -> bool {
        let removed = self.entries.lock().await.remove(reference);
        match removed {
            Some(entry) => {
                debug!("Discarding artifact {}", reference);
                self.delete_file(reference, &entry).await;
                true
            }
            None => false,
        }
    }

    async fn delete_file(&self, reference: &ArtifactRef, entry: &JobEntry) {
        if let Err(e) = self.storage.delete(&entry.artifact_path).await {
            warn!("Failed to delete artifact {}: {}", reference, e);
        }
    }

    /// Puts back an entry taken by a finalize that failed before hand-off.
    pub async fn restore(&self, reference: ArtifactRef, entry: JobEntry) {
        debug!("Restoring artifact {}", reference);
        self.entries.lock().await.insert(reference, entry);
    }

    pub async fn state(&self, reference: &ArtifactRef) -> SlotState {
        if self.entries.lock().await.contains_key(reference) {
            SlotState::Holding(*reference)
        } else {
            SlotState::Empty
        }
    }

    pub async fn artifact_path(&self, reference: &ArtifactRef) -> Option<PathBuf> {
        self.entries
            .lock()
            .await
            .get(reference)
            .map(|e| e.artifact_path.clone())
    }

    pub async fn summary(&self, reference: &ArtifactRef) -> Option<Vec<RedactionSummaryItem>> {
        self.entries.lock().await.get(reference).map(|e| e.summary.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops entries older than the ttl and deletes their files.
    /// Returns how many were reaped.
    pub async fn reap_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<(ArtifactRef, JobEntry)> = {
            let mut entries = self.entries.lock().await;
            let keys: Vec<ArtifactRef> = entries
                .iter()
                .filter(|(_, e)| e.is_expired(self.ttl, now))
                .map(|(k, _)| *k)
                .collect();
            keys.into_iter()
                .filter_map(|k| entries.remove(&k).map(|e| (k, e)))
                .collect()
        };

        for (reference, entry) in &expired {
            self.delete_file(reference, entry).await;
        }
        if !expired.is_empty() {
            info!("Reaped {} expired artifact(s)", expired.len());
        }

        self.sweep_orphans(self.ttl.saturating_add(self.orphan_grace)).await;
        expired.len()
    }

    /// Deletes files in storage at least `min_age` old that no entry refers to.
    /// Returns how many were deleted.
    pub async fn sweep_orphans(&self, min_age: Duration) -> usize {
        let candidates = match self.storage.stale_files(min_age).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Failed to list storage for orphan sweep: {}", e);
                return 0;
            }
        };
        if candidates.is_empty() {
            return 0;
        }

        let referenced: HashSet<PathBuf> = self
            .entries
            .lock()
            .await
            .values()
            .map(|e| e.artifact_path.clone())
            .collect();

        let mut swept = 0;
        for path in candidates.into_iter().filter(|p| !referenced.contains(p)) {
            match self.storage.delete(&path).await {
                Ok(()) => swept += 1,
                Err(e) => warn!("Failed to delete orphaned file {}: {}", path.display(), e),
            }
        }
        if swept > 0 {
            info!("Swept {} orphaned file(s)", swept);
        }
        swept
    }

    /// Runs [`JobTable::reap_expired`] every `interval` until the handle is aborted.
    pub fn spawn_reaper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.reap_expired().await;
            }
        })
    }
}
