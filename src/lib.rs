//! sqldump library
//!
//! Turns a stream of table rows into batched SQL INSERT statements, written
//! to a sink through a bounded pipe so encoding overlaps with output I/O.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and the JSON Lines row source
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Value encoding, statement assembly, writer pipe and sinks
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqldump::export::{DumpCoordinator, DumpOptions, FileWriter, MemoryTable};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut table = MemoryTable::new("t", &["INT"])
//!         .with_group(vec![vec![Some(b"1".to_vec())], vec![None]]);
//!     let sink = Arc::new(FileWriter::create("t.sql").await?);
//!
//!     let stats = DumpCoordinator::new(sink.clone(), DumpOptions::default())
//!         .write_insert(&mut table)
//!         .await?;
//!     sink.finalize().await?;
//!     println!("{} rows", stats.rows);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;

// Re-export commonly used types
pub use config::Config;
pub use error::{DumpError, Result};
pub use export::{
    write_insert, write_meta, DumpCoordinator, DumpOptions, DumpStats, SqlWriter, TableData,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
