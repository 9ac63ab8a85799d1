//! File sink that is opened on first write
//!
//! Tables that turn out to be empty never create their output file. The open
//! happens exactly once even when several tasks write concurrently; if it
//! fails, the failure is kept and returned to every later write.

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error};

use crate::error::{Result, SinkError};

use super::{open_buffered, SqlWriter};

type OpenResult = std::result::Result<Mutex<BufWriter<File>>, String>;

/// Deferred-open buffered file sink
pub struct LazyFileWriter {
    /// Path to the output file
    path: String,
    /// Outcome of the one open attempt
    file: OnceCell<OpenResult>,
}

impl LazyFileWriter {
    /// Create a lazy writer; nothing touches the filesystem yet
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            file: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the file has been opened successfully
    pub fn is_opened(&self) -> bool {
        matches!(self.file.get(), Some(Ok(_)))
    }

    async fn open(&self) -> Result<&Mutex<BufWriter<File>>> {
        let opened = self
            .file
            .get_or_init(|| async {
                match open_buffered(&self.path).await {
                    Ok(writer) => {
                        debug!("opened file: {}", self.path);
                        Ok(Mutex::new(writer))
                    }
                    Err(e) => {
                        error!("open file failed: {}: {}", self.path, e);
                        Err(e.to_string())
                    }
                }
            })
            .await;

        opened.as_ref().map_err(|reason| {
            SinkError::OpenFailed {
                path: self.path.clone(),
                reason: reason.clone(),
            }
            .into()
        })
    }

    /// Flush and close the file if it was ever opened
    pub async fn finalize(&self) -> Result<()> {
        let Some(Ok(writer)) = self.file.get() else {
            return Ok(());
        };
        debug!("tear down lazy file writer: {}", self.path);
        let mut writer = writer.lock().await;
        writer
            .flush()
            .await
            .map_err(|e| SinkError::FlushFailed(format!("{}: {}", self.path, e)))?;
        Ok(())
    }
}

#[async_trait]
impl SqlWriter for LazyFileWriter {
    async fn write_all(&self, chunk: &[u8]) -> Result<()> {
        let writer = self.open().await?;
        let mut writer = writer.lock().await;
        writer
            .write_all(chunk)
            .await
            .map_err(|e| SinkError::WriteFailed(format!("{}: {}", self.path, e)).into())
    }

    async fn flush(&self) -> Result<()> {
        self.finalize().await
    }
}
