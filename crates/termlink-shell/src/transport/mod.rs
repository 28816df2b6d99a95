//! Byte-stream transports that host the shell process.
//!
//! Two implementations share the [`Transport`] capability set:
//!
//! - [`PtyTransport`]: the child runs on the slave end of a pseudo-terminal,
//!   so line editing, prompt redraw and password prompts behave as in a real
//!   terminal.
//! - [`PipeTransport`]: plain pipes with stdout and stderr merged into one
//!   stream. No terminal semantics, no resize.
//!
//! [`spawn`] picks the PTY when asked to and falls back to pipes when the
//! PTY cannot be set up.

use std::io::Read;
use std::path::PathBuf;

use tracing::{info, warn};

use termlink_core::{Dimensions, Error, Result};

pub mod pipe;
pub mod pty;

pub use pipe::PipeTransport;
pub use pty::PtyTransport;

/// Byte a terminal line discipline turns into SIGINT.
pub const INTERRUPT_BYTE: u8 = 0x03;

/// Which transport a session ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Pseudo-terminal
    Pty,
    /// Plain stdin / merged stdout+stderr pipes
    Pipe,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Pty => write!(f, "pty"),
            TransportKind::Pipe => write!(f, "pipe"),
        }
    }
}

/// Signals a session can deliver to its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl+C
    Interrupt,
}

/// What to spawn and where.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
    /// Initial window size
    pub dimensions: Dimensions,
    /// TERM exported to the child (PTY only)
    pub term: Option<String>,
}

impl SpawnOptions {
    /// Spawn `argv` in `cwd` with the default 24x80 window.
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
            dimensions: Dimensions::default(),
            term: None,
        }
    }

    /// Set the initial window size.
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the TERM value exported in PTY mode.
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub(crate) fn program(&self) -> Result<&str> {
        self.argv
            .first()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::SpawnFailed("empty shell command".to_string()))
    }
}

/// Capability set shared by both transports.
///
/// Output is consumed through the reader returned by
/// [`take_reader`](Transport::take_reader); everything else goes through
/// `&self` so the reader thread and the caller can use the transport at the
/// same time.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Which variant this is.
    fn kind(&self) -> TransportKind;

    /// Hand out the output stream. Succeeds once.
    fn take_reader(&self) -> Result<Box<dyn Read + Send>>;

    /// Write raw bytes to the child's input.
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Line terminator the child expects.
    fn line_ending(&self) -> &'static str;

    /// Write `text` followed by exactly one line terminator.
    fn write_line(&self, text: &str) -> Result<()> {
        self.write(terminate_line(text, self.line_ending()).as_bytes())
    }

    /// Change the window size. Transports without a window ignore this.
    fn resize(&self, dimensions: Dimensions) -> Result<()>;

    /// Deliver a signal to the child.
    fn send_signal(&self, signal: Signal) -> Result<()>;

    /// Whether the child process is still running.
    fn is_alive(&self) -> bool;

    /// Terminate the child process.
    fn kill(&self) -> Result<()>;

    /// OS process id of the child, when known.
    fn pid(&self) -> Option<u32>;
}

/// Spawn the shell, preferring a PTY and falling back to pipes.
///
/// Only fails when neither transport can start the process.
pub fn spawn(options: &SpawnOptions, prefer_pty: bool) -> Result<Box<dyn Transport>> {
    options.program()?;

    if prefer_pty {
        match PtyTransport::spawn(options) {
            Ok(pty) => return Ok(Box::new(pty)),
            Err(e) => warn!("PTY unavailable, falling back to pipes: {}", e),
        }
    }

    let pipe = PipeTransport::spawn(options).map_err(|e| {
        Error::SpawnFailed(format!("{}: {e}", options.argv.join(" ")))
    })?;
    info!("Shell running on pipe transport");
    Ok(Box::new(pipe))
}

/// Ensure `text` ends with one `ending`, normalising embedded newlines to it.
pub(crate) fn terminate_line(text: &str, ending: &str) -> String {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let body = body.strip_suffix('\r').unwrap_or(body);
    let mut out = body.replace("\r\n", "\n");
    if ending != "\n" {
        out = out.replace('\n', ending);
    }
    out.push_str(ending);
    out
}
