//! Download sinks: where `text/csv` and `application/json-download` bodies go.
//!
//! # Design
//! Saving a file is a platform side effect, so the dispatcher only sees the
//! `DownloadSink` trait. `DirectoryDownloads` is the native equivalent of a
//! browser save: the blob is staged in a uniquely named file next to its
//! destination, then moved into place without replacing anything, and the
//! staging file never outlives the call.
//! `MemoryDownloads` keeps blobs in memory for tests and embedding hosts.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::DispatchConfig;
use crate::error::DispatchError;

/// A response body to be saved, with the content type it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Offer `blob` to the user as a file called `filename`.
    async fn create_download(&self, blob: Blob, filename: &str) -> Result<(), DispatchError>;
}

/// Saves downloads into a directory.
///
/// An existing file is never overwritten: `export.csv` becomes
/// `export (1).csv`, `export (2).csv`, and so on.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(&config.download_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn save(&self, blob: Blob, filename: &str) -> io::Result<PathBuf> {
        let dir = self.dir.clone();
        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || save_into(&dir, &blob.bytes, &filename))
            .await
            .map_err(io::Error::other)?
    }
}

/// Write `bytes` to a fresh staging file in `dir`, then claim the first free
/// name among `filename`, `stem (1).ext`, `stem (2).ext`, ...
///
/// Claiming is a no-clobber rename, so concurrent saves of the same name
/// each end up in their own file.
fn save_into(dir: &Path, bytes: &[u8], filename: &str) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let prefix = format!(".{filename}.");
    let mut staged = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;

    let mut n = 0u32;
    loop {
        let target = dir.join(numbered(filename, n));
        match staged.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %target.display(), "download name taken");
                staged = err.file;
                n += 1;
            }
            Err(err) => return Err(err.error),
        }
    }
}

/// `export.csv` for 0, `export (n).csv` after that.
fn numbered(filename: &str, n: u32) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem} ({n}).{ext}"),
        None => format!("{filename} ({n})"),
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn create_download(&self, blob: Blob, filename: &str) -> Result<(), DispatchError> {
        debug!(filename, bytes = blob.bytes.len(), dir = %self.dir.display(), "saving download");
        let path = self
            .save(blob, filename)
            .await
            .map_err(|source| DispatchError::Download {
                filename: filename.to_string(),
                source,
            })?;
        info!(path = %path.display(), "download saved");
        Ok(())
    }
}

/// A download captured by `MemoryDownloads`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDownload {
    pub filename: String,
    pub blob: Blob,
}

/// Records downloads in memory instead of touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryDownloads {
    saved: Mutex<Vec<SavedDownload>>,
}

impl MemoryDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything saved so far, oldest first.
    pub fn saved(&self) -> Vec<SavedDownload> {
        self.saved
            .lock()
            .map(|saved| saved.clone())
            .unwrap_or_default()
    }

    /// Drain and return everything saved so far.
    pub fn take(&self) -> Vec<SavedDownload> {
        self.saved
            .lock()
            .map(|mut saved| std::mem::take(&mut *saved))
            .unwrap_or_default()
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloads {
    async fn create_download(&self, blob: Blob, filename: &str) -> Result<(), DispatchError> {
        let download = SavedDownload {
            filename: filename.to_string(),
            blob,
        };
        // A poisoned lock only means another recorder panicked mid-push.
        match self.saved.lock() {
            Ok(mut saved) => saved.push(download),
            Err(poisoned) => poisoned.into_inner().push(download),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(body: &str) -> Blob {
        Blob {
            content_type: "text/csv".to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path());
        sink.create_download(csv("a,b\n"), "export.csv").await.unwrap();

        let saved = std::fs::read_to_string(dir.path().join("export.csv")).unwrap();
        assert_eq!(saved, "a,b\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn directory_sink_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path());
        sink.create_download(csv("first"), "export.csv").await.unwrap();
        sink.create_download(csv("second"), "export.csv").await.unwrap();
        sink.create_download(csv("third"), "export.csv").await.unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("export.csv"), "first");
        assert_eq!(read("export (1).csv"), "second");
        assert_eq!(read("export (2).csv"), "third");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_of_one_name_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let sink = std::sync::Arc::new(DirectoryDownloads::new(dir.path()));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let sink = sink.clone();
            tasks.spawn(async move {
                sink.create_download(csv(&format!("row {i}\n")), "export.csv")
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let mut contents = Vec::new();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let entry = entry.unwrap();
            let name = entry.file_name().to_string_lossy().into_owned();
            assert!(name == "export.csv" || name.starts_with("export ("), "unexpected file {name}");
            contents.push(std::fs::read_to_string(entry.path()).unwrap());
        }
        contents.sort();
        let expected: Vec<String> = (0..8).map(|i| format!("row {i}\n")).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn numbered_names() {
        assert_eq!(numbered("export.csv", 0), "export.csv");
        assert_eq!(numbered("export.csv", 2), "export (2).csv");
        assert_eq!(numbered("export", 1), "export (1)");
    }

    #[tokio::test]
    async fn directory_sink_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let sink = DirectoryDownloads::new(&nested);
        sink.create_download(csv("x"), "export.csv").await.unwrap();
        assert!(nested.join("export.csv").exists());
    }

    #[tokio::test]
    async fn directory_sink_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let sink = DirectoryDownloads::new(&blocker);
        let err = sink.create_download(csv("x"), "export.csv").await.unwrap_err();
        assert!(matches!(err, DispatchError::Download { ref filename, .. } if filename == "export.csv"));
    }

    #[tokio::test]
    async fn memory_sink_records_in_order() {
        let sink = MemoryDownloads::new();
        sink.create_download(csv("1"), "export.csv").await.unwrap();
        sink.create_download(csv("2"), "export.json").await.unwrap();

        let names: Vec<String> = sink.saved().into_iter().map(|d| d.filename).collect();
        assert_eq!(names, vec!["export.csv", "export.json"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.saved().is_empty());
    }
}
