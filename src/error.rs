//! Error types for treefs
//!
//! Design philosophy:
//! - thiserror for structured error types in library code
//! - Domain failures (missing path, duplicate name, full table) are normal
//!   statuses reported back to the caller, never fatal
//! - Only malformed batch input and resource initialization failures abort
//!   the process

use thiserror::Error;

/// Top-level error type for the treefs application
#[derive(Error, Debug)]
pub enum TreefsError {
    /// Namespace/domain errors
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Command parse errors
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file and socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command queue closed unexpectedly
    #[error("command queue closed unexpectedly")]
    QueueClosed,
}

/// Domain errors raised by namespace operations.
///
/// Every variant maps to a stable numeric status used for batch logging and
/// for service-mode replies; see [`FsError::status`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// A path component does not exist
    #[error("'{path}' not found")]
    NotFound { path: String },

    /// A path component resolved to a file where a directory was required
    #[error("'{path}' is not a directory")]
    NotADirectory { path: String },

    /// Target directory already has an entry with this name
    #[error("'{path}' already exists")]
    AlreadyExists { path: String },

    /// Delete of a directory that still has entries
    #[error("'{path}' is a directory and not empty")]
    NotEmpty { path: String },

    /// The fixed-capacity node table has no free slots
    #[error("node table exhausted")]
    TableExhausted,

    /// The parent directory's fixed entry list has no free slots
    #[error("directory '{path}' is full")]
    DirectoryFull { path: String },

    /// Path is structurally unusable (empty name, move into own subtree)
    #[error("invalid path '{path}'")]
    InvalidPath { path: String },
}

/// Status code replied for a datagram that could not be parsed
pub const STATUS_BAD_COMMAND: i64 = -8;

impl FsError {
    /// Numeric status for the wire protocol and batch logs.
    ///
    /// Success is 0 (lookup replies the found inumber, which is >= 0).
    pub fn status(&self) -> i64 {
        match self {
            FsError::NotFound { .. } => -1,
            FsError::NotADirectory { .. } => -2,
            FsError::AlreadyExists { .. } => -3,
            FsError::NotEmpty { .. } => -4,
            FsError::TableExhausted => -5,
            FsError::DirectoryFull { .. } => -6,
            FsError::InvalidPath { .. } => -7,
        }
    }
}

/// Command parse errors.
///
/// These are fatal in batch mode (the input stream is trusted, so a bad line
/// means the run is garbage) and a BAD_COMMAND reply in service mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown operation token
    #[error("unknown command '{token}' in line '{line}'")]
    UnknownCommand { token: String, line: String },

    /// Wrong number of fields for the operation
    #[error("wrong argument count for '{op}' in line '{line}'")]
    WrongArity { op: char, line: String },

    /// Node type field was not 'f' or 'd'
    #[error("invalid node type '{kind}' in line '{line}'")]
    InvalidKind { kind: String, line: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid node table capacity
    #[error("invalid table capacity {capacity}: must be at least {min}")]
    InvalidCapacity { capacity: usize, min: usize },

    /// Socket path problems (empty, parent missing)
    #[error("invalid socket path '{path}': {reason}")]
    InvalidSocketPath { path: String, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("worker {id} panicked")]
    Panicked { id: usize },

    /// Worker initialization failed
    #[error("failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Socket receive failed with a non-recoverable error
    #[error("worker {id} socket error: {reason}")]
    Socket { id: usize, reason: String },
}

/// Result type alias for TreefsError
pub type Result<T> = std::result::Result<T, TreefsError>;

/// Result type alias for FsError
pub type FsResult<T> = std::result::Result<T, FsError>;
