//! Output sinks for dump operations
//!
//! This module provides a unified interface for the append-only byte sinks a
//! dump writes to (files, lazily opened files, memory), plus a wrapper that
//! records whether anything was written.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufWriter;

use crate::error::{Result, SinkError};

pub mod file;
pub mod intercept;
pub mod lazy;
pub mod memory;

pub use file::FileWriter;
pub use intercept::InterceptWriter;
pub use lazy::LazyFileWriter;
pub use memory::MemoryWriter;

/// Append-only sink for SQL text
///
/// Methods take `&self` so a sink can be shared between the dump's writer
/// task and its owner; implementations synchronise internally.
#[async_trait]
pub trait SqlWriter: Send + Sync {
    /// Append a chunk of bytes
    ///
    /// # Arguments
    /// * `chunk` - Bytes to append, written in full or not at all
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    async fn write_all(&self, chunk: &[u8]) -> Result<()>;

    /// Flush buffered output
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<W: SqlWriter + ?Sized> SqlWriter for Arc<W> {
    async fn write_all(&self, chunk: &[u8]) -> Result<()> {
        (**self).write_all(chunk).await
    }

    async fn flush(&self) -> Result<()> {
        (**self).flush().await
    }
}

/// Open `path` for writing (create or truncate) behind an 8MB buffer
pub(crate) async fn open_buffered(path: &str) -> std::io::Result<BufWriter<File>> {
    let file = File::create(path).await?;
    Ok(BufWriter::with_capacity(8 * 1024 * 1024, file))
}

/// Helper function to create a buffered file writer
///
/// # Arguments
/// * `path` - File path to create
///
/// # Returns
/// * `Result<BufWriter<File>>` - Buffered writer or error
pub(crate) async fn create_writer(path: &str) -> Result<BufWriter<File>> {
    open_buffered(path).await.map_err(|e| {
        SinkError::OpenFailed {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Helper function to validate file path and directory
///
/// # Arguments
/// * `path` - File path to validate
///
/// # Returns
/// * `Result<()>` - Success or error
pub(crate) fn validate_path(path: &str) -> Result<()> {
    let path_obj = Path::new(path);

    if path.is_empty() {
        return Err(SinkError::InvalidPath("empty path".to_string()).into());
    }

    // Check if parent directory exists
    if let Some(parent) = path_obj.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(SinkError::InvalidPath(format!(
                "Directory does not exist: {}",
                parent.display()
            ))
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("out.sql").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/nonexistent/directory/out.sql").is_err());
    }

    #[tokio::test]
    async fn test_arc_forwards() {
        let sink = Arc::new(MemoryWriter::new());
        let shared: Arc<dyn SqlWriter> = sink.clone();
        shared.write_all(b"abc").await.unwrap();
        shared.flush().await.unwrap();
        assert_eq!(sink.contents(), b"abc");
    }
}
