//! PTY (pseudo-terminal) transport with portable-pty.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info};

use termlink_core::{Dimensions, Error, Result};

use super::{SpawnOptions, Signal, Transport, TransportKind, INTERRUPT_BYTE};

/// Shell attached to the slave end of a pseudo-terminal.
pub struct PtyTransport {
    /// The master PTY end
    master: Mutex<Box<dyn MasterPty + Send>>,
    /// The child process
    child: Mutex<Box<dyn Child + Send + Sync>>,
    /// PTY writer
    writer: Mutex<Box<dyn Write + Send>>,
    /// PTY reader, until the session's reader thread takes it
    reader: Mutex<Option<Box<dyn Read + Send>>>,
    /// Current PTY dimensions
    dimensions: Mutex<Dimensions>,
    /// Child pid, captured at spawn
    pid: Option<u32>,
}

impl std::fmt::Debug for PtyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTransport")
            .field("dimensions", &self.dimensions)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl PtyTransport {
    /// Open a PTY and spawn the command on it.
    pub fn spawn(options: &SpawnOptions) -> Result<Self> {
        let program = options.program()?;
        let dimensions = options.dimensions;
        dimensions.validate()?;

        info!(
            "Spawning PTY: argv={:?}, dimensions={}, cwd={}",
            options.argv,
            dimensions,
            options.cwd.display()
        );

        let pty_system = native_pty_system();

        debug!("Opening PTY with native system");
        let pair = pty_system.openpty(pty_size(dimensions)).map_err(|e| {
            error!("Failed to open PTY: {}", e);
            Error::PtyError(format!("Failed to open PTY: {e}"))
        })?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(&options.argv[1..]);
        cmd.cwd(&options.cwd);
        if let Some(term) = &options.term {
            cmd.env("TERM", term);
        }

        debug!("Spawning child process: {}", program);
        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            error!("Failed to spawn command '{}': {}", program, e);
            Error::PtyError(format!("Failed to spawn command: {e}"))
        })?;
        // The child holds its own slave handle. Ours must go, or the master
        // never reports end-of-stream after the child exits.
        drop(pair.slave);

        let writer = pair.master.take_writer().map_err(|e| {
            error!("Failed to take PTY writer: {}", e);
            Error::PtyError(format!("Failed to take writer: {e}"))
        })?;

        let reader = pair.master.try_clone_reader().map_err(|e| {
            error!("Failed to clone PTY reader: {}", e);
            Error::PtyError(format!("Failed to clone reader: {e}"))
        })?;

        let pid = child.process_id();
        info!("PTY spawned successfully: program='{}', pid={:?}", program, pid);

        Ok(Self {
            master: Mutex::new(pair.master),
            child: Mutex::new(child),
            writer: Mutex::new(writer),
            reader: Mutex::new(Some(reader)),
            dimensions: Mutex::new(dimensions),
            pid,
        })
    }

    /// Get current PTY dimensions.
    pub fn dimensions(&self) -> Dimensions {
        *self.dimensions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exit code of the child, if it has exited.
    pub fn exit_code(&self) -> Option<u32> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        match child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }
}

impl Transport for PtyTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pty
    }

    fn take_reader(&self) -> Result<Box<dyn Read + Send>> {
        self.reader
            .lock()
            .map_err(|e| Error::PtyError(format!("Reader lock error: {e}")))?
            .take()
            .ok_or_else(|| Error::PtyError("PTY reader already taken".to_string()))
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| Error::PtyError(format!("Writer lock error: {e}")))?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// A terminal's Enter key as seen through a line discipline.
    fn line_ending(&self) -> &'static str {
        "\r\n"
    }

    /// Resize the PTY; the child receives SIGWINCH.
    fn resize(&self, new_dimensions: Dimensions) -> Result<()> {
        new_dimensions.validate()?;
        info!("Resizing PTY to {}", new_dimensions);

        let master = self
            .master
            .lock()
            .map_err(|e| Error::PtyError(format!("Lock error: {e}")))?;
        master
            .resize(pty_size(new_dimensions))
            .map_err(|e| Error::PtyError(format!("Resize failed: {e}")))?;

        *self.dimensions.lock().unwrap_or_else(PoisonError::into_inner) = new_dimensions;
        Ok(())
    }

    /// The line discipline turns the control byte into the signal.
    fn send_signal(&self, signal: Signal) -> Result<()> {
        match signal {
            Signal::Interrupt => self.write(&[INTERRUPT_BYTE]),
        }
    }

    fn is_alive(&self) -> bool {
        let mut child = match self.child.lock() {
            Ok(c) => c,
            Err(_) => return false,
        };
        matches!(child.try_wait(), Ok(None))
    }

    fn kill(&self) -> Result<()> {
        info!("Killing PTY process: pid={:?}", self.pid);
        let mut child = self
            .child
            .lock()
            .map_err(|e| Error::PtyError(format!("Lock error: {e}")))?;
        child
            .kill()
            .map_err(|e| Error::PtyError(format!("Kill failed: {e}")))
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

fn pty_size(dimensions: Dimensions) -> PtySize {
    PtySize {
        rows: dimensions.rows,
        cols: dimensions.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
