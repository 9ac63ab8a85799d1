//! Eagerly opened file sink
//!
//! The file is created (or truncated) when the writer is built, so a bad
//! path is reported before any row is encoded.

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::{Result, SinkError};

use super::{create_writer, validate_path, SqlWriter};

/// Buffered file sink
pub struct FileWriter {
    /// Buffered file writer
    writer: Mutex<BufWriter<File>>,
    /// Path to the output file
    path: String,
}

impl FileWriter {
    /// Create a new file writer
    ///
    /// # Arguments
    /// * `path` - Output file path
    ///
    /// # Returns
    /// * `Result<Self>` - New writer instance or error
    pub async fn create(path: &str) -> Result<Self> {
        validate_path(path)?;
        let writer = create_writer(path).await.inspect_err(|e| {
            error!("open file failed: {}: {}", path, e);
        })?;

        debug!("opened file: {}", path);

        Ok(Self {
            writer: Mutex::new(writer),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Flush buffered data and sync it to disk
    pub async fn finalize(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .flush()
            .await
            .map_err(|e| SinkError::FlushFailed(format!("{}: {}", self.path, e)))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| SinkError::FlushFailed(format!("{}: {}", self.path, e)))?;
        debug!("closed file: {}", self.path);
        Ok(())
    }

    /// Get the current file size in bytes
    pub async fn file_size(&self) -> Result<u64> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        Ok(metadata.len())
    }
}

#[async_trait]
impl SqlWriter for FileWriter {
    async fn write_all(&self, chunk: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(chunk)
            .await
            .map_err(|e| SinkError::WriteFailed(format!("{}: {}", self.path, e)).into())
    }

    async fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .flush()
            .await
            .map_err(|e| SinkError::FlushFailed(format!("{}: {}", self.path, e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::fs;

    #[tokio::test]
    async fn test_file_writer_basic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sql");
        let path = path.to_str().unwrap();

        let writer = FileWriter::create(path).await.unwrap();
        writer.write_all(b"INSERT INTO `t` VALUES\n").await.unwrap();
        writer.write_all(b"(1);\n").await.unwrap();
        writer.finalize().await.unwrap();

        let content = fs::read_to_string(path).await.unwrap();
        assert_eq!(content, "INSERT INTO `t` VALUES\n(1);\n");
        assert_eq!(writer.file_size().await.unwrap(), content.len() as u64);
    }

    #[tokio::test]
    async fn test_file_writer_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sql");
        fs::write(&path, "stale content").await.unwrap();

        let writer = FileWriter::create(path.to_str().unwrap()).await.unwrap();
        writer.write_all(b"new").await.unwrap();
        writer.finalize().await.unwrap();

        assert_eq!(fs::read_to_string(&path).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_file_writer_invalid_directory() {
        let result = FileWriter::create("/nonexistent/directory/file.sql").await;
        assert!(result.is_err());
    }
}
