//! In-memory sink that keeps every chunk it receives.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::Result;

use super::SqlWriter;

#[derive(Debug, Default)]
pub struct MemoryWriter {
    chunks: Mutex<Vec<Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write, in the order received.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// All writes concatenated.
    pub fn contents(&self) -> Vec<u8> {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .concat()
    }

    /// Contents as UTF-8, with invalid sequences replaced.
    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn write_count(&self) -> usize {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl SqlWriter for MemoryWriter {
    async fn write_all(&self, chunk: &[u8]) -> Result<()> {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(chunk.to_vec());
        Ok(())
    }
}
