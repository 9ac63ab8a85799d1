//! Dump coordinator for writing one table as INSERT statements
//!
//! This module brings together the row source, row encoding, the pooled
//! accumulator and the writer pipe:
//!
//! 1. Rows are decoded into a reusable [`RowImage`] and rendered into the
//!    accumulator, framed as `INSERT INTO ... VALUES` statements, one per
//!    row group.
//! 2. Whenever the accumulator reaches the chunk threshold after a row, its
//!    contents are handed to the [`WriterPipe`], which writes to the sink on
//!    its own task while encoding continues.
//! 3. At the end the remaining bytes are handed off, the pipe is closed and
//!    drained, and its first error (if any) is returned.
//!
//! Flushes only happen between rows, so a row's text is never split across
//! chunks, and the concatenation of all chunks equals the unbatched output.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{PipeError, Result};

use super::buffer::{Accumulator, BufferPool, DEFAULT_CHUNK_SIZE};
use super::pipe::{WriterPipe, DEFAULT_DRAIN_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
use super::progress::ProgressTracker;
use super::row::RowImage;
use super::source::TableData;
use super::writers::SqlWriter;

/// Tuning knobs for one table dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// Accumulator size that triggers a hand-off to the writer
    pub chunk_size: usize,
    /// Chunks that may wait for the writer
    pub queue_capacity: usize,
    /// Bound on the final drain wait
    pub drain_timeout: Duration,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Result of a table dump
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DumpStats {
    /// Rows encoded
    pub rows: u64,
    /// INSERT statements emitted
    pub statements: u64,
    /// Chunks written to the sink
    pub chunks: u64,
    /// Bytes written to the sink
    pub bytes: u64,
    /// Wall time of the dump
    pub elapsed: Duration,
}

/// Coordinator for INSERT dumps
///
/// Holds the sink and settings; each [`DumpCoordinator::write_insert`] call
/// runs its own writer pipe, which is torn down before the call returns.
pub struct DumpCoordinator {
    /// Output sink
    writer: Arc<dyn SqlWriter>,
    /// Chunking and drain settings
    options: DumpOptions,
    /// Accumulator pool
    pool: Arc<BufferPool>,
    /// Progress tracker for user feedback
    tracker: Option<ProgressTracker>,
    /// Cancellation token for aborting the dump
    cancel_token: Option<CancellationToken>,
}

impl DumpCoordinator {
    /// Create a new dump coordinator using the process-wide buffer pool
    pub fn new(writer: Arc<dyn SqlWriter>, options: DumpOptions) -> Self {
        Self {
            writer,
            options,
            pool: BufferPool::global(),
            tracker: None,
            cancel_token: None,
        }
    }

    /// Use a specific buffer pool
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Report encoded rows to a progress tracker
    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Set cancellation token for this dump operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Dump every row of `table` as INSERT statements
    ///
    /// An empty table writes nothing and succeeds. On a decode error, a sink
    /// error or cancellation, encoding stops, the writer is stopped and
    /// joined, and that first error is returned.
    ///
    /// # Returns
    /// * `Result<DumpStats>` - Dump statistics or error
    pub async fn write_insert(&self, table: &mut dyn TableData) -> Result<DumpStats> {
        let start_time = Instant::now();
        let mut row = RowImage::from_types(table.column_types());

        // Nothing is spawned or written until a first row exists.
        if !next_first_row(table, &mut row).await? {
            debug!("table {} has no rows, skipping", table.table_name());
            return Ok(DumpStats::default());
        }

        info!("dumping table {}", table.table_name());

        let mut pipe = WriterPipe::spawn(
            Arc::clone(&self.writer),
            self.options.queue_capacity,
            self.options.drain_timeout,
            self.cancel_token.as_ref(),
        );
        let mut acc = self.pool.acquire(self.options.chunk_size);
        let mut stats = DumpStats::default();

        let encoded = self
            .encode_rows(table, &mut row, &mut acc, &pipe, &mut stats)
            .await;
        let encoded = match encoded {
            Ok(()) if !acc.is_empty() => pipe.enqueue(acc.take_chunk()).await,
            other => other,
        };
        acc.release();

        if let Some(ref tracker) = self.tracker {
            tracker.update(stats.rows);
            tracker.finish();
        }

        if let Err(err) = encoded {
            if !err.is_cancelled() {
                error!("dumping table {} failed: {}", table.table_name(), err);
            }
            stop_pipe(&mut pipe).await;
            return Err(err);
        }

        let totals = pipe.wait().await?;
        stats.chunks = totals.chunks;
        stats.bytes = totals.bytes;
        stats.elapsed = start_time.elapsed();

        info!(
            "dumped table {}: {} rows, {} statements, {} bytes, {:?}",
            table.table_name(),
            stats.rows,
            stats.statements,
            stats.bytes,
            stats.elapsed
        );
        Ok(stats)
    }

    /// Encode all groups. `row` already holds the first row of the current group.
    async fn encode_rows(
        &self,
        table: &mut dyn TableData,
        row: &mut RowImage,
        acc: &mut Accumulator,
        pipe: &WriterPipe,
        stats: &mut DumpStats,
    ) -> Result<()> {
        let escape_backslash = table.escape_backslash();
        let prefix = insert_prefix(table.table_name(), table.selected_field());

        for comment in table.special_comments() {
            acc.extend_from_slice(comment.as_bytes());
            acc.extend_from_slice(b"\n");
        }

        loop {
            acc.extend_from_slice(prefix.as_bytes());
            stats.statements += 1;

            loop {
                row.write_to(acc.buffer_mut(), escape_backslash);
                stats.rows += 1;

                if acc.is_full() {
                    pipe.enqueue(acc.take_chunk()).await?;
                }

                let more = table.next_row(row).await.inspect_err(|e| {
                    error!("scanning row of {} failed: {}", table.table_name(), e);
                })?;
                acc.extend_from_slice(if more { b",\n" } else { b";\n" });

                if let Some(err) = pipe.error() {
                    return Err(err);
                }
                if pipe.is_cancelled() {
                    return Err(PipeError::Cancelled.into());
                }
                if !more {
                    break;
                }
            }

            if let Some(ref tracker) = self.tracker {
                tracker.update(stats.rows);
            }

            if !next_first_row(table, row).await? {
                return Ok(());
            }
        }
    }
}

/// Advance to the next group that has a row, decoding that row
async fn next_first_row(table: &mut dyn TableData, row: &mut RowImage) -> Result<bool> {
    while table.next_group().await? {
        let found = table.next_row(row).await.inspect_err(|e| {
            error!("scanning row of {} failed: {}", table.table_name(), e);
        })?;
        if found {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Stop the writer after a failure and join it; its own report is dropped
async fn stop_pipe(pipe: &mut WriterPipe) {
    pipe.cancel();
    if let Err(err) = pipe.wait().await {
        debug!("writer stopped after failure: {}", err);
    }
}

/// Dump `table` to `writer` with the given options
pub async fn write_insert(
    table: &mut dyn TableData,
    writer: Arc<dyn SqlWriter>,
    options: DumpOptions,
) -> Result<DumpStats> {
    DumpCoordinator::new(writer, options)
        .write_insert(table)
        .await
}

/// `INSERT INTO <ident> [<fields>] VALUES\n`
pub fn insert_prefix(table_name: &str, selected_field: Option<&str>) -> String {
    match selected_field.filter(|f| !f.is_empty()) {
        Some(fields) => format!("INSERT INTO {} {} VALUES\n", wrap_backticks(table_name), fields),
        None => format!("INSERT INTO {} VALUES\n", wrap_backticks(table_name)),
    }
}

/// Quote an identifier with backticks unless it already starts and ends with one
pub fn wrap_backticks(identifier: &str) -> String {
    if identifier.len() >= 2 && identifier.starts_with('`') && identifier.ends_with('`') {
        identifier.to_string()
    } else {
        format!("`{}`", identifier)
    }
}
