//! Bounded writer pipe between row encoding and the output sink.
//!
//! The producer (the table dumper) enqueues immutable chunks; one spawned
//! task writes them to the sink in FIFO order. The queue is bounded, so a
//! slow sink blocks [`WriterPipe::enqueue`] and throttles encoding. The first
//! failure (write error or cancellation) is kept in a one-shot slot that the
//! producer polls without blocking.
//!
//! Shutdown is always: [`WriterPipe::close`] once, then [`WriterPipe::wait`],
//! which joins the task within the drain bound or aborts it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{DumpError, PipeError, Result};

use super::writers::SqlWriter;

/// Chunks that may be queued ahead of the writer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Upper bound on waiting for the writer task to drain.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest prefix of a failed chunk included in the error log.
const LOGGED_PREFIX_LEN: usize = 200;

/// Totals reported by the writer task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipeStats {
    /// Chunks written to the sink
    pub chunks: u64,
    /// Bytes written to the sink
    pub bytes: u64,
}

/// First-error cell. Later errors are dropped; the stored one is taken once.
#[derive(Debug, Default)]
struct ErrorSlot {
    recorded: AtomicBool,
    error: Mutex<Option<DumpError>>,
}

impl ErrorSlot {
    fn set(&self, err: DumpError) {
        if self.recorded.swap(true, Ordering::AcqRel) {
            debug!("dropping secondary pipe error: {}", err);
            return;
        }
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    fn take(&self) -> Option<DumpError> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Handle to a running writer task.
pub struct WriterPipe {
    input: Option<mpsc::Sender<Bytes>>,
    task: Option<JoinHandle<PipeStats>>,
    errors: Arc<ErrorSlot>,
    cancel: CancellationToken,
    drain_timeout: Duration,
}

impl WriterPipe {
    /// Spawn the writer task.
    ///
    /// # Arguments
    /// * `writer` - Sink the chunks are written to
    /// * `capacity` - Queue capacity in chunks (at least 1)
    /// * `drain_timeout` - Bound on [`WriterPipe::wait`]
    /// * `parent` - Optional external cancellation; cancelling it stops the writer
    pub fn spawn(
        writer: Arc<dyn SqlWriter>,
        capacity: usize,
        drain_timeout: Duration,
        parent: Option<&CancellationToken>,
    ) -> Self {
        let (input, output) = mpsc::channel(capacity.max(1));
        let errors = Arc::new(ErrorSlot::default());
        let cancel = parent.map_or_else(CancellationToken::new, CancellationToken::child_token);

        let task = tokio::spawn(run_writer(
            output,
            writer,
            Arc::clone(&errors),
            cancel.clone(),
        ));

        Self {
            input: Some(input),
            task: Some(task),
            errors,
            cancel,
            drain_timeout,
        }
    }

    /// Queue a chunk, waiting while the queue is full.
    ///
    /// Fails with the writer's first error if it has stopped, with
    /// [`PipeError::Cancelled`] on cancellation, and with [`PipeError::Closed`]
    /// after [`WriterPipe::close`].
    pub async fn enqueue(&self, chunk: Bytes) -> Result<()> {
        let Some(input) = self.input.as_ref() else {
            return Err(PipeError::Closed.into());
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(self.error().unwrap_or(PipeError::Cancelled.into()))
            }
            sent = input.send(chunk) => match sent {
                Ok(()) => Ok(()),
                // the receiver is gone, so the writer has stopped
                Err(_) => Err(self.error().unwrap_or_else(|| {
                    PipeError::TaskFailed("writer stopped".to_string()).into()
                })),
            },
        }
    }

    /// The writer's first error, if any. Never blocks; each error is returned once.
    pub fn error(&self) -> Option<DumpError> {
        self.errors.take()
    }

    /// Whether the pipe (or its parent) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the writer without draining queued chunks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Signal that no more chunks will be enqueued. Idempotent.
    pub fn close(&mut self) {
        if self.input.take().is_some() {
            debug!("writer pipe closed");
        }
    }

    /// Close the queue and wait for the writer to drain and stop.
    ///
    /// Returns the writer's totals, or its first error not yet taken through
    /// [`WriterPipe::error`]. If the writer does not finish within the drain
    /// bound it is aborted and [`PipeError::DrainTimeout`] is returned.
    pub async fn wait(&mut self) -> Result<PipeStats> {
        self.close();

        let mut stats = PipeStats::default();
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.drain_timeout, &mut task).await {
                Ok(Ok(totals)) => stats = totals,
                Ok(Err(join_err)) => {
                    self.errors
                        .set(PipeError::TaskFailed(join_err.to_string()).into());
                }
                Err(_) => {
                    warn!(
                        "writer did not drain within {:?}, aborting",
                        self.drain_timeout
                    );
                    self.cancel.cancel();
                    task.abort();
                    return Err(PipeError::DrainTimeout(self.drain_timeout).into());
                }
            }
        }

        match self.error() {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }
}

impl Drop for WriterPipe {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("writer pipe dropped while running, aborting writer");
            self.cancel.cancel();
            task.abort();
        }
    }
}

async fn run_writer(
    mut output: mpsc::Receiver<Bytes>,
    writer: Arc<dyn SqlWriter>,
    errors: Arc<ErrorSlot>,
    cancel: CancellationToken,
) -> PipeStats {
    let mut stats = PipeStats::default();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("writer cancelled after {} chunks", stats.chunks);
                errors.set(PipeError::Cancelled.into());
                return stats;
            }
            chunk = output.recv() => match chunk {
                Some(chunk) => chunk,
                None => break,
            },
        };

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("writer cancelled during write after {} chunks", stats.chunks);
                errors.set(PipeError::Cancelled.into());
                return stats;
            }
            written = writer.write_all(&chunk) => written,
        };

        if let Err(err) = written {
            let shown = &chunk[..chunk.len().min(LOGGED_PREFIX_LEN)];
            error!(
                "writing failed: {} (chunk starts with {:?})",
                err,
                String::from_utf8_lossy(shown)
            );
            errors.set(err);
            return stats;
        }

        stats.chunks += 1;
        stats.bytes += chunk.len() as u64;
    }

    if stats.chunks > 0 {
        if let Err(err) = writer.flush().await {
            error!("flushing failed: {}", err);
            errors.set(err);
        }
    }
    debug!(
        "writer drained: {} chunks, {} bytes",
        stats.chunks, stats.bytes
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::export::writers::MemoryWriter;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    /// Blocks every write until released.
    struct GatedWriter {
        gate: Notify,
        inner: MemoryWriter,
    }

    #[async_trait]
    impl SqlWriter for GatedWriter {
        async fn write_all(&self, chunk: &[u8]) -> Result<()> {
            self.gate.notified().await;
            self.inner.write_all(chunk).await
        }
    }

    /// Fails the n-th write (1-based) and counts attempts.
    struct FailingWriter {
        fail_on: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl SqlWriter for FailingWriter {
        async fn write_all(&self, _chunk: &[u8]) -> Result<()> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(SinkError::WriteFailed("disk full".to_string()).into());
            }
            Ok(())
        }
    }

    /// Never finishes a write.
    struct StuckWriter;

    #[async_trait]
    impl SqlWriter for StuckWriter {
        async fn write_all(&self, _chunk: &[u8]) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_chunks_written_in_order() {
        let sink = Arc::new(MemoryWriter::new());
        let mut pipe = WriterPipe::spawn(sink.clone(), 2, DEFAULT_DRAIN_TIMEOUT, None);

        for i in 0..10 {
            assert_ok!(pipe.enqueue(Bytes::from(format!("{i};"))).await);
        }
        let stats = assert_ok!(pipe.wait().await);

        assert_eq!(stats.chunks, 10);
        assert_eq!(sink.contents_lossy(), "0;1;2;3;4;5;6;7;8;9;");
    }

    #[tokio::test]
    async fn test_empty_pipe_writes_nothing() {
        let sink = Arc::new(MemoryWriter::new());
        let mut pipe = WriterPipe::spawn(sink.clone(), 8, DEFAULT_DRAIN_TIMEOUT, None);
        let stats = assert_ok!(pipe.wait().await);
        assert_eq!(stats, PipeStats::default());
        assert_eq!(sink.write_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_blocks_when_full() {
        let sink = Arc::new(GatedWriter {
            gate: Notify::new(),
            inner: MemoryWriter::new(),
        });
        let mut pipe = WriterPipe::spawn(sink.clone(), 1, DEFAULT_DRAIN_TIMEOUT, None);

        // one chunk held by the stalled writer, one in the queue
        assert_ok!(pipe.enqueue(Bytes::from_static(b"a")).await);
        tokio::task::yield_now().await;
        assert_ok!(pipe.enqueue(Bytes::from_static(b"b")).await);

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), pipe.enqueue(Bytes::from_static(b"c")))
                .await;
        assert!(blocked.is_err(), "enqueue should wait on a full queue");

        sink.gate.notify_one();
        let unblocked =
            tokio::time::timeout(Duration::from_secs(5), pipe.enqueue(Bytes::from_static(b"c")))
                .await;
        assert_ok!(assert_ok!(unblocked));

        sink.gate.notify_one();
        sink.gate.notify_one();
        assert_ok!(pipe.wait().await);
        assert_eq!(sink.inner.contents_lossy(), "abc");
    }

    #[tokio::test]
    async fn test_write_error_stops_writer() {
        let sink = Arc::new(FailingWriter {
            fail_on: 2,
            attempts: AtomicUsize::new(0),
        });
        let mut pipe = WriterPipe::spawn(sink.clone(), 8, DEFAULT_DRAIN_TIMEOUT, None);

        let mut first_error = None;
        for _ in 0..50 {
            if let Err(err) = pipe.enqueue(Bytes::from_static(b"x")).await {
                first_error = Some(err);
                break;
            }
            if let Some(err) = pipe.error() {
                first_error = Some(err);
                break;
            }
            tokio::task::yield_now().await;
        }

        let err = first_error.expect("write error must surface");
        assert!(err.to_string().contains("disk full"));
        // already reported, so the join is clean
        assert_ok!(pipe.wait().await);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_reported_once() {
        let sink = Arc::new(FailingWriter {
            fail_on: 1,
            attempts: AtomicUsize::new(0),
        });
        let mut pipe = WriterPipe::spawn(sink, 8, DEFAULT_DRAIN_TIMEOUT, None);
        assert_ok!(pipe.enqueue(Bytes::from_static(b"x")).await);

        let err = assert_err!(pipe.wait().await);
        assert!(err.to_string().contains("disk full"));
        assert!(pipe.error().is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_close_fails() {
        let mut pipe = WriterPipe::spawn(
            Arc::new(MemoryWriter::new()),
            8,
            DEFAULT_DRAIN_TIMEOUT,
            None,
        );
        pipe.close();
        let err = assert_err!(pipe.enqueue(Bytes::from_static(b"late")).await);
        assert!(matches!(err, DumpError::Pipe(PipeError::Closed)));
        assert_ok!(pipe.wait().await);
    }

    #[tokio::test]
    async fn test_parent_cancellation() {
        let token = CancellationToken::new();
        let sink = Arc::new(GatedWriter {
            gate: Notify::new(),
            inner: MemoryWriter::new(),
        });
        let mut pipe = WriterPipe::spawn(sink, 1, DEFAULT_DRAIN_TIMEOUT, Some(&token));
        assert_ok!(pipe.enqueue(Bytes::from_static(b"a")).await);

        token.cancel();
        let err = assert_err!(pipe.enqueue(Bytes::from_static(b"b")).await);
        assert!(err.is_cancelled());

        // wait may report the cancellation again; it must not hang
        let joined = tokio::time::timeout(Duration::from_secs(5), pipe.wait()).await;
        assert!(joined.is_ok(), "wait must not hang after cancellation");
    }

    #[tokio::test]
    async fn test_pipe_cancel_does_not_cancel_parent() {
        let token = CancellationToken::new();
        let mut pipe = WriterPipe::spawn(
            Arc::new(StuckWriter),
            1,
            Duration::from_millis(50),
            Some(&token),
        );
        assert_ok!(pipe.enqueue(Bytes::from_static(b"a")).await);

        let err = assert_err!(pipe.wait().await);
        assert!(matches!(err, DumpError::Pipe(PipeError::DrainTimeout(_))));
        assert!(!token.is_cancelled());
    }
}
