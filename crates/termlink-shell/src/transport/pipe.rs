//! Pipe transport: stdin plus stdout/stderr merged into one stream.
//!
//! Both output streams of the child share the write end of a single pipe, so
//! the bytes arrive in the order the child wrote them.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info};

use termlink_core::{Dimensions, Error, Result};

use super::{SpawnOptions, Signal, Transport, TransportKind, INTERRUPT_BYTE};

/// Shell attached to plain pipes.
pub struct PipeTransport {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    /// Read end of the merged output pipe, until the reader thread takes it
    reader: Mutex<Option<Box<dyn Read + Send>>>,
    pid: u32,
}

impl std::fmt::Debug for PipeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeTransport")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl PipeTransport {
    /// Spawn the command with piped stdin and one merged output pipe.
    pub fn spawn(options: &SpawnOptions) -> Result<Self> {
        let program = options.program()?;
        info!(
            "Spawning pipe shell: argv={:?}, cwd={}",
            options.argv,
            options.cwd.display()
        );

        let (reader, stdout, stderr) = merged_output_pipe().map_err(|e| {
            error!("Failed to create output pipe: {}", e);
            e
        })?;

        let mut command = Command::new(program);
        command
            .args(&options.argv[1..])
            .current_dir(&options.cwd)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .stderr(stderr);
        hide_console_window(&mut command);

        let spawned = command.spawn();
        // The command still owns our copies of the write end. Until they are
        // closed the reader never sees end-of-stream.
        drop(command);
        let mut child = spawned.map_err(|e| {
            error!("Failed to spawn command '{}': {}", program, e);
            e
        })?;
        let pid = child.id();
        let stdin = child.stdin.take();

        info!("Pipe shell spawned successfully: program='{}', pid={}", program, pid);

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            reader: Mutex::new(Some(reader)),
            pid,
        })
    }

    /// Exit code of the child, if it has exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        child.try_wait().ok().flatten().and_then(|status| status.code())
    }
}

impl Transport for PipeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pipe
    }

    fn take_reader(&self) -> Result<Box<dyn Read + Send>> {
        self.reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::InvalidInput("pipe reader already taken".to_string()))
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.stdin.lock().unwrap_or_else(PoisonError::into_inner);
        let stdin = guard
            .as_mut()
            .ok_or_else(|| Error::Io(io::Error::from(io::ErrorKind::BrokenPipe)))?;
        if let Err(e) = stdin.write_all(data).and_then(|_| stdin.flush()) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                // Nobody is reading any more; stop trying.
                *guard = None;
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn line_ending(&self) -> &'static str {
        "\n"
    }

    /// Pipes carry no window size.
    fn resize(&self, dimensions: Dimensions) -> Result<()> {
        debug!("Ignoring resize to {} on pipe transport", dimensions);
        Ok(())
    }

    /// No process group is reachable through a pipe, so the control byte is
    /// written to stdin for programs that watch for it.
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
        info!("Killing pipe process: pid={}", self.pid);
        self.stdin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        match child.kill() {
            Ok(()) => {
                let _ = child.wait();
                Ok(())
            }
            // Already exited and reaped
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}

/// Read end plus two handles on the same write end, for stdout and stderr.
type OutputPipe = (Box<dyn Read + Send>, Stdio, Stdio);

#[cfg(unix)]
fn merged_output_pipe() -> io::Result<OutputPipe> {
    use std::fs::File;
    use std::os::fd::{FromRawFd, OwnedFd};

    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors the call fills in.
    if unsafe { open_cloexec_pipe(&mut fds) } == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: both descriptors were just created and nothing else owns them.
    let (read, write) = unsafe { (File::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    let stderr = write.try_clone()?;
    Ok((Box::new(read), Stdio::from(write), Stdio::from(stderr)))
}

/// `pipe2` with `O_CLOEXEC`, so concurrently spawned children never inherit
/// our ends.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
unsafe fn open_cloexec_pipe(fds: &mut [libc::c_int; 2]) -> libc::c_int {
    libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC)
}

/// `pipe` followed by `FD_CLOEXEC` where `pipe2` is unavailable.
#[cfg(all(
    unix,
    not(any(target_os = "linux", target_os = "android", target_os = "freebsd"))
))]
unsafe fn open_cloexec_pipe(fds: &mut [libc::c_int; 2]) -> libc::c_int {
    if libc::pipe(fds.as_mut_ptr()) == -1 {
        return -1;
    }
    for &fd in fds.iter() {
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) == -1 {
            libc::close(fds[0]);
            libc::close(fds[1]);
            return -1;
        }
    }
    0
}

#[cfg(windows)]
fn merged_output_pipe() -> io::Result<OutputPipe> {
    let (read, write) = io::pipe()?;
    let stderr = write.try_clone()?;
    Ok((Box::new(read), Stdio::from(write), Stdio::from(stderr)))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh() -> SpawnOptions {
        SpawnOptions::new(vec!["/bin/sh".to_string()], std::env::temp_dir())
    }

    fn sh_c(script: &str) -> SpawnOptions {
        SpawnOptions::new(
            vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            std::env::temp_dir(),
        )
    }

    fn read_all(pipe: &PipeTransport) -> String {
        let mut output = String::new();
        pipe.take_reader()
            .unwrap()
            .read_to_string(&mut output)
            .unwrap();
        output
    }

    #[test]
    fn test_pipe_merges_stdout_and_stderr() {
        let pipe = PipeTransport::spawn(&sh_c("echo out; echo err 1>&2; echo out2")).unwrap();
        assert_eq!(read_all(&pipe), "out\nerr\nout2\n");
    }

    #[test]
    fn test_pipe_keeps_interleaved_write_order() {
        let pipe = PipeTransport::spawn(&sh_c(
            "i=0; while [ $i -lt 200 ]; do echo o$i; echo e$i 1>&2; i=$((i+1)); done",
        ))
        .unwrap();

        let expected: String = (0..200).map(|i| format!("o{i}\ne{i}\n")).collect();
        assert_eq!(read_all(&pipe), expected);
    }

    #[test]
    fn test_pipe_reader_taken_once() {
        let pipe = PipeTransport::spawn(&sh_c("true")).unwrap();
        assert!(pipe.take_reader().is_ok());
        assert!(matches!(pipe.take_reader(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_pipe_write_line_reaches_shell() {
        let pipe = PipeTransport::spawn(&sh()).unwrap();
        let mut reader = pipe.take_reader().unwrap();

        pipe.write_line("echo PIPE_OK").unwrap();
        pipe.write_line("exit 0").unwrap();

        let mut output = String::new();
        reader.read_to_string(&mut output).unwrap();
        assert_eq!(output, "PIPE_OK\n");
    }

    #[test]
    fn test_pipe_resize_is_noop() {
        let pipe = PipeTransport::spawn(&sh()).unwrap();
        assert!(pipe.resize(Dimensions::new(50, 200)).is_ok());
        pipe.kill().unwrap();
    }

    #[test]
    fn test_pipe_kill_and_write_after_exit() {
        let pipe = PipeTransport::spawn(&sh()).unwrap();
        assert!(pipe.is_alive());
        pipe.kill().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while pipe.is_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!pipe.is_alive());
        assert!(pipe.write_line("echo too late").is_err());
        assert!(pipe.send_signal(Signal::Interrupt).is_err());
    }

    #[test]
    fn test_pipe_exit_code() {
        let pipe = PipeTransport::spawn(&sh()).unwrap();
        pipe.write_line("exit 7").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while pipe.is_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(pipe.exit_code(), Some(7));
    }

    #[test]
    fn test_pipe_spawn_missing_program() {
        let options = SpawnOptions::new(
            vec!["/nonexistent/termlink-test-shell".to_string()],
            std::env::temp_dir(),
        );
        assert!(PipeTransport::spawn(&options).is_err());
    }
}
