use std::time::Duration;
use std::{fmt, io};

/// Crate-wide `Result` type using [`DumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Top-level error type for dump operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum DumpError {
    /// A row could not be decoded into its row image.
    Decode(DecodeError),

    /// The output sink failed.
    Sink(SinkError),

    /// The streaming pipe stopped abnormally.
    Pipe(PipeError),

    /// Configuration errors.
    Config(ConfigError),

    /// Row source errors (reading or parsing input rows).
    Source(SourceError),

    /// I/O errors.
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Row decode errors.
#[derive(Debug)]
pub enum DecodeError {
    /// The source delivered a different number of values than there are columns.
    ColumnCount { expected: usize, found: usize },

    /// A single value could not be decoded.
    InvalidValue { column: usize, reason: String },

    /// Decode failed for a reason reported by the row source.
    Failed(String),
}

/// Sink-side errors.
#[derive(Debug)]
pub enum SinkError {
    /// The output could not be opened. Lazy sinks report this on every write.
    OpenFailed { path: String, reason: String },

    /// Writing a chunk failed.
    WriteFailed(String),

    /// Flushing buffered output failed.
    FlushFailed(String),

    /// The output path is unusable.
    InvalidPath(String),
}

/// Streaming pipe errors.
#[derive(Debug)]
pub enum PipeError {
    /// The dump was cancelled before the pipe drained.
    Cancelled,

    /// The writer task did not finish within the drain bound.
    DrainTimeout(Duration),

    /// A chunk was enqueued after the pipe was closed.
    Closed,

    /// The writer task panicked or was aborted.
    TaskFailed(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Row source errors.
#[derive(Debug)]
pub enum SourceError {
    /// The input could not be read.
    ReadFailed(String),

    /// A line of input is malformed.
    Malformed { line: usize, reason: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Decode(e) => write!(f, "Decode error: {e}"),
            DumpError::Sink(e) => write!(f, "Sink error: {e}"),
            DumpError::Pipe(e) => write!(f, "Pipe error: {e}"),
            DumpError::Config(e) => write!(f, "Configuration error: {e}"),
            DumpError::Source(e) => write!(f, "Source error: {e}"),
            DumpError::Io(e) => write!(f, "I/O error: {e}"),
            DumpError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::ColumnCount { expected, found } => {
                write!(f, "expected {expected} columns, found {found}")
            }
            DecodeError::InvalidValue { column, reason } => {
                write!(f, "invalid value in column {column}: {reason}")
            }
            DecodeError::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::OpenFailed { path, reason } => {
                write!(f, "open file error: {path}: {reason}")
            }
            SinkError::WriteFailed(msg) => write!(f, "write failed: {msg}"),
            SinkError::FlushFailed(msg) => write!(f, "flush failed: {msg}"),
            SinkError::InvalidPath(msg) => write!(f, "invalid path: {msg}"),
        }
    }
}

impl fmt::Display for PipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeError::Cancelled => write!(f, "dump cancelled"),
            PipeError::DrainTimeout(d) => {
                write!(f, "writer did not drain within {d:?}")
            }
            PipeError::Closed => write!(f, "pipe already closed"),
            PipeError::TaskFailed(msg) => write!(f, "writer task failed: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::ReadFailed(msg) => write!(f, "read failed: {msg}"),
            SourceError::Malformed { line, reason } => write!(f, "line {line}: {reason}"),
        }
    }
}

impl std::error::Error for DumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DumpError::Io(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for DecodeError {}
impl std::error::Error for SinkError {}
impl std::error::Error for PipeError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SourceError {}

/* ========================= Conversions to DumpError ========================= */

impl From<io::Error> for DumpError {
    fn from(err: io::Error) -> Self {
        DumpError::Io(err)
    }
}

impl From<DecodeError> for DumpError {
    fn from(err: DecodeError) -> Self {
        DumpError::Decode(err)
    }
}

impl From<SinkError> for DumpError {
    fn from(err: SinkError) -> Self {
        DumpError::Sink(err)
    }
}

impl From<PipeError> for DumpError {
    fn from(err: PipeError) -> Self {
        DumpError::Pipe(err)
    }
}

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err)
    }
}

impl From<SourceError> for DumpError {
    fn from(err: SourceError) -> Self {
        DumpError::Source(err)
    }
}

impl From<String> for DumpError {
    fn from(msg: String) -> Self {
        DumpError::Generic(msg)
    }
}

impl From<&str> for DumpError {
    fn from(msg: &str) -> Self {
        DumpError::Generic(msg.to_owned())
    }
}

impl DumpError {
    /// Whether this error is the pipe reporting cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DumpError::Pipe(PipeError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err: DumpError = SinkError::WriteFailed("disk full".into()).into();
        assert_eq!(err.to_string(), "Sink error: write failed: disk full");

        let err: DumpError = DecodeError::ColumnCount { expected: 2, found: 3 }.into();
        assert_eq!(err.to_string(), "Decode error: expected 2 columns, found 3");
    }

    #[test]
    fn test_drain_timeout_message() {
        let err: DumpError = PipeError::DrainTimeout(Duration::from_secs(60)).into();
        assert_eq!(err.to_string(), "Pipe error: writer did not drain within 60s");

        let err: DumpError = PipeError::DrainTimeout(Duration::from_millis(100)).into();
        assert_eq!(err.to_string(), "Pipe error: writer did not drain within 100ms");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(DumpError::Pipe(PipeError::Cancelled).is_cancelled());
        assert!(!DumpError::Generic("x".into()).is_cancelled());
    }
}
