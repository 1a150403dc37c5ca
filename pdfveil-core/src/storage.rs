// pdfveil-core/src/storage.rs
//! Artifact storage: "bytes in, path out" and "path in, bytes out".
//!
//! Every file written here is named `<uuid>-<hint>` so concurrent jobs never
//! collide and the original upload name never reaches the disk. Deletion is
//! idempotent. `ScopedFile` ties a path to a scope and removes the file when
//! the scope ends, whichever way it ends.
//!
//! License: MIT OR APACHE 2.0

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::errors::VeilResult;

const MAX_HINT_LEN: usize = 64;

#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Writes `bytes` under a fresh collision-free name and returns its path.
    async fn store(&self, bytes: &[u8], name_hint: &str) -> VeilResult<PathBuf>;

    async fn copy(&self, from: &Path, to: &Path) -> VeilResult<()>;

    /// Overwrites (or creates) `path` with `bytes`.
    async fn write(&self, path: &Path, bytes: &[u8]) -> VeilResult<()>;

    async fn read(&self, path: &Path) -> VeilResult<Vec<u8>>;

    /// Removes `path`. A missing file is not an error.
    async fn delete(&self, path: &Path) -> VeilResult<()>;

    /// Resolves `file_name` inside the storage area.
    fn path_for(&self, file_name: &str) -> PathBuf;

    /// Files in the storage area last modified at least `min_age` ago.
    async fn stale_files(&self, min_age: Duration) -> VeilResult<Vec<PathBuf>>;

    /// Copies the file into `writer` and then deletes it. The file is removed
    /// on success, on writer or read failure, and when the returned future is
    /// dropped before completion.
    async fn stream_to_client(
        &self,
        path: &Path,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> VeilResult<u64>;
}

/// Deletes its file when dropped unless [`ScopedFile::keep`] is called.
#[derive(Debug)]
pub struct ScopedFile {
    path: Option<PathBuf>,
}

impl ScopedFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Disarms the guard and hands the path back to the caller.
    pub fn keep(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Released scoped file {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scoped file {}: {}", path.display(), e),
            }
        }
    }
}

/// Reduces a caller-supplied hint to `[A-Za-z0-9._-]`, at most 64 chars.
pub fn sanitize_name_hint(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .take(MAX_HINT_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

/// Local-disk storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStorage for LocalStorage {
    async fn store(&self, bytes: &[u8], name_hint: &str) -> VeilResult<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = ScopedFile::new(
            self.root
                .join(format!("{}-{}", Uuid::new_v4(), sanitize_name_hint(name_hint))),
        );
        tokio::fs::write(path.path(), bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), path.path().display());
        Ok(path.keep())
    }

    async fn copy(&self, from: &Path, to: &Path) -> VeilResult<()> {
        tokio::fs::copy(from, to).await?;
        Ok(())
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> VeilResult<()> {
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn read(&self, path: &Path) -> VeilResult<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, path: &Path) -> VeilResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(sanitize_name_hint(file_name))
    }

    async fn stale_files(&self, min_age: Duration) -> VeilResult<Vec<PathBuf>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut stale = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or(Duration::ZERO);
            if age >= min_age {
                stale.push(entry.path());
            }
        }
        Ok(stale)
    }

    async fn stream_to_client(
        &self,
        path: &Path,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> VeilResult<u64> {
        let guard = ScopedFile::new(path.to_path_buf());

        let mut file = tokio::fs::File::open(guard.path()).await?;
        let sent = tokio::io::copy(&mut file, &mut *writer).await?;
        writer.flush().await?;
        drop(file);

        self.delete(&guard.keep()).await?;
        debug!("Streamed {} bytes from {}", sent, path.display());
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::new(ErrorKind::BrokenPipe, "client went away")))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn name_hints_are_sanitized() {
        assert_eq!(sanitize_name_hint("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_name_hint("report 2024.pdf"), "report_2024.pdf");
        assert_eq!(sanitize_name_hint(""), "artifact");
        assert_eq!(sanitize_name_hint("..."), "artifact");
    }

    #[tokio::test]
    async fn store_names_never_collide() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let a = storage.store(b"one", "same.pdf").await.unwrap();
        let b = storage.store(b"two", "same.pdf").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(storage.read(&a).await.unwrap(), b"one");
        assert!(a.file_name().unwrap().to_string_lossy().ends_with("-same.pdf"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let path = storage.store(b"x", "x").await.unwrap();
        storage.delete(&path).await.unwrap();
        storage.delete(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn stream_deletes_after_success() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let path = storage.store(b"payload", "out.pdf").await.unwrap();

        let mut sink: Vec<u8> = Vec::new();
        let sent = storage.stream_to_client(&path, &mut sink).await.unwrap();
        assert_eq!(sent, 7);
        assert_eq!(sink, b"payload");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn stream_deletes_after_client_failure() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let path = storage.store(b"payload", "out.pdf").await.unwrap();

        let err = storage.stream_to_client(&path, &mut BrokenPipe).await.unwrap_err();
        assert!(matches!(err, crate::errors::VeilError::Io(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn scoped_file_removes_on_drop_unless_kept() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let dropped = storage.store(b"a", "a").await.unwrap();
        let kept = storage.store(b"b", "b").await.unwrap();

        drop(ScopedFile::new(dropped.clone()));
        let path = ScopedFile::new(kept.clone()).keep();

        assert!(!dropped.exists());
        assert!(kept.exists());
        assert_eq!(path, kept);
    }

    #[tokio::test]
    async fn stale_files_respects_age_and_missing_root() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("not-yet-created"));
        assert!(storage.stale_files(Duration::ZERO).await.unwrap().is_empty());

        let path = storage.store(b"x", "x.pdf").await.unwrap();
        assert_eq!(storage.stale_files(Duration::ZERO).await.unwrap(), vec![path]);
        assert!(storage.stale_files(Duration::from_secs(3600)).await.unwrap().is_empty());
    }
}
