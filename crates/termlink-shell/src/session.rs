//! Shell session: the façade the UI layer talks to.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use termlink_core::{Dimensions, Error, Platform, Result, SessionId, ShellConfig};

use crate::history::History;
use crate::reader::ReaderTask;
use crate::transport::{self, Signal, SpawnOptions, Transport, TransportKind};

/// Everything the reader and the caller share, behind one lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    /// Completed visible lines, append-only
    pub lines: Vec<String>,
    /// Visible form of the line still being received
    pub pending: String,
    /// Submitted commands
    pub history: History,
}

/// How to start a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Program and arguments (None = platform default shell)
    pub command: Option<Vec<String>>,
    /// Working directory (None = current directory)
    pub cwd: Option<PathBuf>,
    /// Try a pseudo-terminal before falling back to pipes
    pub prefer_pty: bool,
    /// Initial window size
    pub dimensions: Dimensions,
    /// TERM exported in PTY mode
    pub term: Option<String>,
    /// History capacity
    pub history_size: usize,
    /// Bytes per transport read
    pub read_chunk_size: usize,
    /// Log raw transport traffic
    pub debug: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            command: None,
            cwd: None,
            prefer_pty: true,
            dimensions: Dimensions::default(),
            term: Some("xterm-256color".to_string()),
            history_size: 50,
            read_chunk_size: 4096,
            debug: false,
        }
    }
}

impl SessionOptions {
    /// Run `argv` instead of the default shell.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: Some(argv.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Set the working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Choose whether to try a PTY first.
    pub fn with_pty(mut self, prefer_pty: bool) -> Self {
        self.prefer_pty = prefer_pty;
        self
    }

    /// Set the initial window size.
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the history capacity.
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    /// Set the transport read size.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    /// Turn raw transport logging on or off.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build options from loaded configuration.
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            command: config.shell.command.clone(),
            cwd: config.shell.cwd.clone(),
            prefer_pty: config.shell.use_pty,
            dimensions: config.terminal.dimensions(),
            term: Some(config.terminal.term.clone()),
            history_size: config.shell.history_size,
            read_chunk_size: config.shell.read_chunk_size,
            debug: config.shell.debug,
        }
    }
}

/// A running shell and the clean line buffer fed from it.
///
/// All methods take `&self` and are safe to call from any thread. Output is
/// collected by a background reader; [`output_lines`](Session::output_lines)
/// only copies what has been collected so far and never waits on the child.
///
/// ```no_run
/// use termlink_shell::{Session, SessionOptions};
///
/// # fn example() -> termlink_core::Result<()> {
/// let session = Session::spawn(SessionOptions::new(["/bin/sh"]))?;
/// session.write("echo hello");
/// for line in session.output_lines() {
///     println!("{line}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    id: SessionId,
    transport: Box<dyn Transport>,
    state: Arc<Mutex<SessionState>>,
    reader_exited: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
    argv: Vec<String>,
    cwd: PathBuf,
    created_at: SystemTime,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transport", &self.transport.kind())
            .field("argv", &self.argv)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

/// Working directory for the shell: the given one, or our own.
fn resolve_cwd(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().map_err(|e| {
            Error::SpawnFailed(format!("cannot determine working directory: {e}"))
        }),
    }
}

impl Session {
    /// Start the shell and its reader.
    ///
    /// Falls back from PTY to pipes silently; fails only when no transport
    /// can start the process.
    pub fn spawn(options: SessionOptions) -> Result<Self> {
        let argv = options
            .command
            .clone()
            .unwrap_or_else(|| Platform::detect().default_shell());
        let cwd = resolve_cwd(options.cwd.clone())?;

        let mut spawn = SpawnOptions::new(argv.clone(), cwd.clone())
            .with_dimensions(options.dimensions);
        if let Some(term) = &options.term {
            spawn = spawn.with_term(term.as_str());
        }

        let transport = transport::spawn(&spawn, options.prefer_pty)?;
        let source = transport.take_reader().map_err(|e| {
            let _ = transport.kill();
            Error::SpawnFailed(format!("shell output unavailable: {e}"))
        })?;

        let id = SessionId::new();
        let state = Arc::new(Mutex::new(SessionState {
            lines: Vec::new(),
            pending: String::new(),
            history: History::new(options.history_size),
        }));
        let reader_exited = Arc::new(AtomicBool::new(false));

        let handle = ReaderTask {
            id,
            source,
            state: Arc::clone(&state),
            exited: Arc::clone(&reader_exited),
            chunk_size: options.read_chunk_size,
            debug: options.debug,
        }
        .spawn()
        .map_err(|e| {
            let _ = transport.kill();
            Error::SpawnFailed(format!("failed to start reader thread: {e}"))
        })?;

        info!(
            "Session started: id={}, transport={}, argv={:?}, pid={:?}",
            id,
            transport.kind(),
            argv,
            transport.pid()
        );

        Ok(Self {
            id,
            transport,
            state,
            reader_exited,
            reader: Mutex::new(Some(handle)),
            argv,
            cwd,
            created_at: SystemTime::now(),
        })
    }

    /// Start a session from loaded configuration.
    pub fn from_config(config: &ShellConfig) -> Result<Self> {
        Self::spawn(SessionOptions::from_config(config))
    }

    /// Get the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Which transport the shell ended up on.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// The argv that was spawned.
    pub fn command(&self) -> &[String] {
        &self.argv
    }

    /// Working directory the shell started in.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// OS process id of the shell.
    pub fn pid(&self) -> Option<u32> {
        self.transport.pid()
    }

    /// Get the session creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all completed lines, plus the pending line if it has
    /// visible content.
    pub fn output_lines(&self) -> Vec<String> {
        let state = self.state();
        let mut lines = Vec::with_capacity(state.lines.len() + 1);
        lines.extend(state.lines.iter().cloned());
        if !state.pending.is_empty() {
            lines.push(state.pending.clone());
        }
        lines
    }

    /// Like [`output_lines`](Session::output_lines), skipping the first
    /// `start` entries.
    pub fn output_lines_since(&self, start: usize) -> Vec<String> {
        let state = self.state();
        let mut lines: Vec<String> = state.lines.iter().skip(start).cloned().collect();
        if !state.pending.is_empty() && start <= state.lines.len() {
            lines.push(state.pending.clone());
        }
        lines
    }

    /// Number of completed lines so far.
    pub fn line_count(&self) -> usize {
        self.state().lines.len()
    }

    /// Current pending line, if any.
    pub fn pending_line(&self) -> Option<String> {
        let state = self.state();
        (!state.pending.is_empty()).then(|| state.pending.clone())
    }

    /// Send a line of input.
    ///
    /// Non-blank input is recorded in history. The text is always forwarded
    /// with a line terminator, so an empty string is a bare Enter. Write
    /// failures are swallowed; a dead shell shows up in
    /// [`is_alive`](Session::is_alive).
    pub fn write(&self, line: &str) {
        self.state().history.push(line);

        if let Err(e) = self.transport.write_line(line) {
            debug!("Write dropped: session={}, {}", self.id, e);
        }
    }

    /// Recall the previous (older) command.
    pub fn history_prev(&self) -> Option<String> {
        self.state().history.prev()
    }

    /// Recall the next (newer) command; `Some("")` when leaving history.
    pub fn history_next(&self) -> Option<String> {
        self.state().history.next()
    }

    /// Copy of the stored commands, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state().history.entries().map(str::to_string).collect()
    }

    /// Send Ctrl+C to the shell.
    pub fn send_interrupt(&self) {
        if let Err(e) = self.transport.send_signal(Signal::Interrupt) {
            debug!("Interrupt dropped: session={}, {}", self.id, e);
        }
    }

    /// Tell the shell its window size. Ignored on the pipe transport.
    pub fn set_window_size(&self, rows: u16, cols: u16) {
        if let Err(e) = self.transport.resize(Dimensions::new(rows, cols)) {
            warn!("Resize to {}x{} failed: session={}, {}", rows, cols, self.id, e);
        }
    }

    /// Whether the shell is running and its output is still being read.
    pub fn is_alive(&self) -> bool {
        !self.reader_exited.load(Ordering::Acquire) && self.transport.is_alive()
    }

    /// Whether the reader has drained the stream and stopped.
    pub fn is_drained(&self) -> bool {
        self.reader_exited.load(Ordering::Acquire)
    }

    /// Terminate the shell. The reader sees end-of-stream and stops.
    pub fn shutdown(&self) {
        if self.transport.is_alive() {
            if let Err(e) = self.transport.kill() {
                warn!("Failed to kill shell: session={}, {}", self.id, e);
            }
        }
    }

    /// Terminate the shell and wait for the reader to finish.
    pub fn close(self) {
        self.shutdown();
        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
        debug!("Session dropped: id={}", self.id);
    }
}
