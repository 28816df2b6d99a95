//! Background reader: drains the transport into the session's line buffer.

use std::borrow::Cow;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use termlink_core::SessionId;

use crate::sanitize::{is_open_escape, sanitize, strip_complete_ansi, strip_control_chars};
use crate::session::SessionState;

/// Splits a raw byte stream into visible lines.
///
/// Raw bytes are kept until their line terminator arrives, so escape
/// sequences and multi-byte characters split across reads are sanitized
/// whole. The visible form of the unterminated tail is built up as its bytes
/// settle, so each byte is sanitized once however many reads the line spans.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8>,
    tail: Tail,
}

/// Visible state of the unterminated tail.
///
/// Follows the carriage-return overwrite rule one settled piece at a time:
/// the visible text is the last segment between `\r`s that has any text once
/// escape sequences are gone.
#[derive(Debug, Default)]
struct Tail {
    /// Raw bytes already folded in
    settled: usize,
    /// Visible text of the segment after the last `\r`
    current: String,
    /// Whether that segment held anything before control bytes were dropped
    current_has_text: bool,
    /// Visible text of the last segment with text that a `\r` closed
    closed: String,
    /// A stray ESC may join with bytes beyond a removed sequence
    stray_escape: bool,
}

impl Tail {
    fn fold(&mut self, stripped: &str) {
        for (i, part) in stripped.split('\r').enumerate() {
            if i > 0 {
                if self.current_has_text {
                    self.closed = std::mem::take(&mut self.current);
                }
                self.current.clear();
                self.current_has_text = false;
            }
            if !part.is_empty() {
                self.current_has_text = true;
                self.current.push_str(&strip_control_chars(part));
            }
        }
    }

    fn visible(&self) -> &str {
        if self.current_has_text {
            &self.current
        } else {
            &self.closed
        }
    }
}

impl LineAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the visible lines it completed.
    ///
    /// An empty source line (nothing, or a lone `\r`, before the `\n`) is
    /// returned as an empty string. A line that only sanitizes to empty
    /// (escape sequences, control bytes) is dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Earlier bytes hold no `\n`.
        let mut from = self.buf.len();
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if let Some(line) = complete_line(&self.buf[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }
        if start > 0 {
            self.buf.drain(..start);
            self.tail = Tail::default();
        }
        self.settle();
        lines
    }

    /// Fold every tail byte whose meaning can no longer change.
    ///
    /// A trailing escape sequence that is still open, and a trailing partial
    /// UTF-8 character, stay unsettled until more bytes arrive.
    fn settle(&mut self) {
        let from = self.tail.settled;
        let unsettled = &self.buf[from..];
        let mut end = unsettled.len() - incomplete_utf8_suffix(unsettled);
        if let Some(open) = open_escape_start(&unsettled[..end]) {
            end = open;
        }
        if end == 0 {
            return;
        }

        if !self.tail.stray_escape {
            let text = String::from_utf8_lossy(&unsettled[..end]);
            let stripped = strip_complete_ansi(&text);
            if stripped.contains('\x1b') {
                self.tail.stray_escape = true;
            } else {
                self.tail.fold(&stripped);
            }
        }
        self.tail.settled = from + end;
    }

    /// Visible form of the unterminated tail, or empty.
    pub fn pending(&self) -> String {
        if self.tail.stray_escape {
            return sanitize_tail(&self.buf);
        }
        self.tail.visible().to_string()
    }

    /// Raw unterminated bytes.
    pub fn raw_pending(&self) -> &[u8] {
        &self.buf
    }

    /// Flush the tail at end of stream.
    ///
    /// Whitespace-only tails and tails that sanitize to nothing yield `None`.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.tail = Tail::default();
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            return None;
        }
        let visible = sanitize(&text);
        (!visible.is_empty()).then_some(visible)
    }

    /// Whether no unterminated bytes are held.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Sanitize an unterminated tail in one pass, leaving out a partial
/// trailing character.
fn sanitize_tail(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let complete = bytes.len() - incomplete_utf8_suffix(bytes);
    sanitize(&String::from_utf8_lossy(&bytes[..complete]))
}

/// Start of a trailing escape sequence that is still missing bytes.
///
/// Only an OSC can hold an ESC (the first byte of its ST terminator), so the
/// sequence starts at the last ESC or, when that ESC is the final byte, at
/// the one before it.
fn open_escape_start(bytes: &[u8]) -> Option<usize> {
    let last = bytes.iter().rposition(|&b| b == 0x1b)?;
    let before = if last + 1 == bytes.len() {
        bytes[..last].iter().rposition(|&b| b == 0x1b)
    } else {
        None
    };
    before
        .into_iter()
        .chain(Some(last))
        .find(|&start| is_open_escape(&String::from_utf8_lossy(&bytes[start..])))
}

fn complete_line(raw: &[u8]) -> Option<String> {
    let text: Cow<'_, str> = String::from_utf8_lossy(raw);
    if text.is_empty() || text == "\r" {
        return Some(String::new());
    }
    let visible = sanitize(&text);
    (!visible.is_empty()).then_some(visible)
}

/// Length of a trailing UTF-8 sequence that is still missing bytes.
fn incomplete_utf8_suffix(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(4) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

/// Everything the reader thread owns.
pub(crate) struct ReaderTask {
    pub id: SessionId,
    pub source: Box<dyn Read + Send>,
    pub state: Arc<Mutex<SessionState>>,
    pub exited: Arc<AtomicBool>,
    pub chunk_size: usize,
    pub debug: bool,
}

impl ReaderTask {
    /// Start the reader on its own thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("termlink-reader-{}", self.id.short()))
            .spawn(move || self.run())
    }

    fn run(mut self) {
        debug!("Reader started: session={}", self.id);
        let mut accumulator = LineAccumulator::new();
        let mut buf = vec![0u8; self.chunk_size.max(1)];

        loop {
            let n = match self.source.read(&mut buf) {
                Ok(0) => {
                    debug!("Reader reached end of stream: session={}", self.id);
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // A PTY master reports EIO once the child side is gone.
                    debug!("Reader stopped on read error: session={}, {}", self.id, e);
                    break;
                }
            };

            let chunk = &buf[..n];
            if self.debug {
                debug!("raw {} bytes: {:?}", n, String::from_utf8_lossy(chunk));
            }

            let lines = accumulator.push(chunk);
            let pending = accumulator.pending();

            if self.debug {
                for line in &lines {
                    debug!("line -> {:?}", line);
                }
                debug!(
                    "pending raw {:?} -> {:?}",
                    String::from_utf8_lossy(accumulator.raw_pending()),
                    pending
                );
            } else {
                trace!("Read {} bytes, {} lines completed", n, lines.len());
            }

            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.lines.extend(lines);
            state.pending = pending;
        }

        let last = accumulator.finish();
        if self.debug {
            debug!("final flush -> {:?}", last);
        }
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(line) = last {
                state.lines.push(line);
            }
            state.pending.clear();
        }
        self.exited.store(true, Ordering::Release);
        debug!("Reader exited: session={}", self.id);
    }
}
