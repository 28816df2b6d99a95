//! # termlink-shell
//!
//! Runs an interactive shell as a child process and turns its raw output
//! into a clean, line-oriented buffer that can be polled at any time.
//!
//! This crate provides:
//! - Line sanitizing (ANSI escape removal, carriage-return overwrite,
//!   control byte removal)
//! - PTY and pipe transports with automatic fallback
//! - A background reader that splits output into visible lines
//! - The [`Session`] façade: output snapshots, input, history recall,
//!   interrupt and resize
//! - Waiting for output or exit
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on termlink-core and is
//! consumed by the termlink binary.
//!
//! ```text
//! child stdout/stderr -> Transport -> reader thread -> Session buffer <- output_lines()
//! write() -> Transport -> child stdin
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod history;
pub mod reader;
pub mod sanitize;
pub mod session;
pub mod transport;
pub mod wait;

// Re-export commonly used types
pub use history::History;
pub use reader::LineAccumulator;
pub use sanitize::sanitize;
pub use session::{Session, SessionOptions};
pub use transport::{PipeTransport, PtyTransport, Signal, SpawnOptions, Transport, TransportKind};
pub use wait::{WaitCondition, WaitResult, WaitTarget};
