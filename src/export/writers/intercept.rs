//! Sink wrapper that tracks whether anything was written.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::Result;

use super::SqlWriter;

/// Forwards to an inner sink and remembers whether a non-empty chunk went through.
///
/// Callers use this to discard outputs that stayed empty.
pub struct InterceptWriter<W> {
    inner: W,
    something_written: AtomicBool,
}

impl<W: SqlWriter> InterceptWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            something_written: AtomicBool::new(false),
        }
    }

    pub fn something_written(&self) -> bool {
        self.something_written.load(Ordering::Acquire)
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[async_trait]
impl<W: SqlWriter> SqlWriter for InterceptWriter<W> {
    async fn write_all(&self, chunk: &[u8]) -> Result<()> {
        if !chunk.is_empty() {
            self.something_written.store(true, Ordering::Release);
        }
        self.inner.write_all(chunk).await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}
