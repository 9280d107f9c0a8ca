//! Blob sinks: where `json_to_csv` downloads end up.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{error, info};

use crate::contract::{BlobSink, BoxError, NamedBlob};

/// Writes each blob to the filesystem at its literal filename, overwriting.
#[derive(Debug, Clone, Default)]
pub struct FileSink {
    base_dir: Option<PathBuf>,
}

impl FileSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative filenames against `base_dir` instead of the working directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn target(&self, filename: &str) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        }
    }
}

#[async_trait]
impl BlobSink for FileSink {
    async fn persist(&self, blob: NamedBlob) -> Result<(), BoxError> {
        let target = self.target(&blob.filename);
        match tokio::fs::write(&target, &blob.bytes).await {
            Ok(()) => {
                info!(path = %target.display(), bytes = blob.bytes.len(), "Wrote blob to file");
                Ok(())
            }
            Err(e) => {
                error!(path = %target.display(), error = ?e, "Failed to write blob to file");
                Err(Box::new(e))
            }
        }
    }
}

/// Keeps persisted blobs in memory for the embedding host to hand out
/// (e.g. as an HTTP download).
#[derive(Debug, Default)]
pub struct MemorySink {
    blobs: Mutex<Vec<NamedBlob>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything persisted so far, oldest first.
    pub fn take(&self) -> Vec<NamedBlob> {
        match self.blobs.lock() {
            Ok(mut blobs) => std::mem::take(&mut *blobs),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl BlobSink for MemorySink {
    async fn persist(&self, blob: NamedBlob) -> Result<(), BoxError> {
        info!(filename = %blob.filename, bytes = blob.bytes.len(), "Captured blob in memory");
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| "memory sink lock poisoned")?;
        blobs.push(blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn csv_blob(filename: &str, text: &str) -> NamedBlob {
        NamedBlob {
            filename: filename.to_string(),
            content_type: "text/csv".to_string(),
            bytes: text.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn file_sink_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let sink = FileSink::with_base_dir(dir.path());

        sink.persist(csv_blob("out.csv", "old contents that are longer"))
            .await
            .unwrap();
        sink.persist(csv_blob("out.csv", "a\r\n\"1\"")).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(written, "a\r\n\"1\"");
    }

    #[tokio::test]
    async fn file_sink_reports_missing_directory() {
        let dir = tempdir().unwrap();
        let sink = FileSink::with_base_dir(dir.path().join("does-not-exist"));
        assert!(sink.persist(csv_blob("out.csv", "x")).await.is_err());
    }

    #[tokio::test]
    async fn memory_sink_hands_out_blobs_once() {
        let sink = MemorySink::new();
        sink.persist(csv_blob("a.csv", "1")).await.unwrap();
        sink.persist(csv_blob("b.csv", "2")).await.unwrap();

        let blobs = sink.take();
        assert_eq!(
            blobs.iter().map(|b| b.filename.as_str()).collect::<Vec<_>>(),
            vec!["a.csv", "b.csv"]
        );
        assert!(sink.take().is_empty());
    }
}
