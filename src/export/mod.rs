//! Export module for dumping table rows as SQL INSERT statements
//!
//! This module provides the dump core:
//! - Value rendering per column kind with dialect-aware string escaping
//! - Reusable row images filled by a row source without per-row allocation
//! - Chunked output through a bounded writer pipe running on its own task
//! - Schema statements written straight to a sink
//!
//! # Architecture
//!
//! The dump is built on four main components:
//!
//! 1. **TableData**: the row source, segmented into groups (one INSERT each)
//! 2. **Accumulator**: pooled byte buffer that collects statement text
//! 3. **WriterPipe**: bounded queue plus writer task in front of the sink
//! 4. **SqlWriter**: the append-only output sink
//!
//! These components are orchestrated by the **DumpCoordinator**.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqldump::export::{write_insert, DumpOptions, MemoryTable, MemoryWriter};
//!
//! # async fn run() -> sqldump::Result<()> {
//! let mut table = MemoryTable::new("t", &["VARCHAR", "INT"])
//!     .with_group(vec![vec![Some(b"a".to_vec()), Some(b"5".to_vec())]]);
//! let sink = Arc::new(MemoryWriter::new());
//!
//! write_insert(&mut table, sink.clone(), DumpOptions::default()).await?;
//! assert_eq!(sink.contents_lossy(), "INSERT INTO `t` VALUES\n('a',5);\n");
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod column;
pub mod coordinator;
pub mod escape;
pub mod meta;
pub mod pipe;
pub mod progress;
pub mod row;
pub mod source;
pub mod writers;

pub use buffer::{Accumulator, BufferPool, DEFAULT_CHUNK_SIZE};
pub use column::{Column, ColumnKind};
pub use coordinator::{
    insert_prefix, wrap_backticks, write_insert, DumpCoordinator, DumpOptions, DumpStats,
};
pub use escape::{escape, escape_into};
pub use meta::write_meta;
pub use pipe::{PipeStats, WriterPipe, DEFAULT_DRAIN_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
pub use progress::ProgressTracker;
pub use row::RowImage;
pub use source::{decode_raw_row, MemoryMeta, MemoryTable, MetaData, RawRow, TableData};
pub use writers::{FileWriter, InterceptWriter, LazyFileWriter, MemoryWriter, SqlWriter};
