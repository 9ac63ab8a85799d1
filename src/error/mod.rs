//! Error handling module for dump operations.
//!
//! All fallible operations return [`Result`], whose error type [`DumpError`]
//! wraps one of the specific kinds below:
//! - [`DecodeError`]: the row source failed to fill a row image
//! - [`SinkError`]: the output could not be opened, written or flushed
//! - [`PipeError`]: cancellation, drain timeout or a failed writer task
//! - [`ConfigError`] and [`SourceError`]: plumbing around the dump core

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    ConfigError, DecodeError, DumpError, PipeError, Result, SinkError, SourceError,
};
