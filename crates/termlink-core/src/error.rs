//! Error types for termlink.

use thiserror::Error;

/// Main error type for termlink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// PTY-related errors
    #[error("PTY error: {0}")]
    PtyError(String),

    /// No transport could start the shell process
    #[error("Failed to spawn shell: {0}")]
    SpawnFailed(String),

    /// Invalid terminal dimensions
    #[error("Invalid dimensions: {rows}x{cols}")]
    InvalidDimensions {
        /// Number of rows
        rows: u16,
        /// Number of columns
        cols: u16,
    },

    /// Session already terminated
    #[error("Session already terminated")]
    SessionTerminated,

    /// Timeout waiting for condition
    #[error("Timeout waiting for condition after {0}ms")]
    WaitTimeout(u64),

    /// Invalid wait pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or parameters (generic)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
