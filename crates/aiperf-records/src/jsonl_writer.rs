//! Buffered, append-only JSONL persistence for per-record output. Batches
//! writes under a lock and flushes every `batch_size` records or on
//! `flush`/`shutdown`, adapted from `JsonlExporter`'s buffering style for an
//! async writer shared across record-manager tasks.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum JsonlWriterError {
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, JsonlWriterError>;

struct WriterState {
    writer: BufWriter<File>,
    buffered: usize,
}

/// Appends one JSON object per line to `path`, batching under an async
/// mutex and flushing to disk every `batch_size` writes.
pub struct BufferedJsonlWriter {
    path: PathBuf,
    batch_size: usize,
    state: Mutex<WriterState>,
}

impl BufferedJsonlWriter {
    pub async fn create(path: impl AsRef<Path>, batch_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|source| JsonlWriterError::Io { path: path.clone(), source })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)
            .await
            .map_err(|source| JsonlWriterError::Io { path: path.clone(), source })?;

        Ok(Self {
            path,
            batch_size: batch_size.max(1),
            state: Mutex::new(WriterState {
                writer: BufWriter::new(file),
                buffered: 0,
            }),
        })
    }

    pub async fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut state = self.state.lock().await;
        state
            .writer
            .write_all(line.as_bytes())
            .await
            .map_err(|source| JsonlWriterError::Io { path: self.path.clone(), source })?;
        state
            .writer
            .write_all(b"\n")
            .await
            .map_err(|source| JsonlWriterError::Io { path: self.path.clone(), source })?;
        state.buffered += 1;
        if state.buffered >= self.batch_size {
            state.writer.flush().await.map_err(|source| JsonlWriterError::Io { path: self.path.clone(), source })?;
            state.buffered = 0;
        }
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.writer.flush().await.map_err(|source| JsonlWriterError::Io { path: self.path.clone(), source })?;
        state.buffered = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        id: u32,
    }

    #[tokio::test]
    async fn flushes_on_shutdown_even_under_the_batch_size() {
        let dir = std::env::temp_dir().join(format!("aiperf-jsonl-test-{}", std::process::id()));
        let path = dir.join("records.jsonl");
        let writer = BufferedJsonlWriter::create(&path, 100).await.unwrap();
        writer.append(&Sample { id: 1 }).await.unwrap();
        writer.append(&Sample { id: 2 }).await.unwrap();
        writer.flush().await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn flushes_automatically_at_the_batch_boundary() {
        let dir = std::env::temp_dir().join(format!("aiperf-jsonl-test-batch-{}", std::process::id()));
        let path = dir.join("records.jsonl");
        let writer = BufferedJsonlWriter::create(&path, 2).await.unwrap();
        writer.append(&Sample { id: 1 }).await.unwrap();
        writer.append(&Sample { id: 2 }).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
