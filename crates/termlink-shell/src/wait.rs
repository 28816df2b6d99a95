//! Waiting for output to appear or for the shell to exit.

use regex::Regex;
use std::time::{Duration, Instant};

use termlink_core::{Error, Result};

use crate::session::Session;

/// What to wait for.
#[derive(Debug, Clone)]
pub enum WaitTarget {
    /// A visible line containing this text
    Text(String),
    /// A visible line matching this regex
    Pattern(String),
    /// The shell exiting and its output being fully drained
    Exit,
}

/// Condition to wait for in session output.
#[derive(Debug, Clone)]
pub struct WaitCondition {
    /// What to wait for
    pub target: WaitTarget,

    /// Only consider lines at or after this index
    pub from_line: usize,

    /// Maximum time to wait
    pub timeout: Duration,

    /// Polling interval between checks
    pub poll_interval: Duration,
}

impl WaitCondition {
    fn with_target(target: WaitTarget) -> Self {
        Self {
            target,
            from_line: 0,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(25),
        }
    }

    /// Wait for a line containing `text`.
    pub fn for_text(text: impl Into<String>) -> Self {
        Self::with_target(WaitTarget::Text(text.into()))
    }

    /// Wait for a line matching the regex `pattern`.
    pub fn for_pattern(pattern: impl Into<String>) -> Self {
        Self::with_target(WaitTarget::Pattern(pattern.into()))
    }

    /// Wait for the shell to exit.
    pub fn for_exit() -> Self {
        Self::with_target(WaitTarget::Exit)
    }

    /// Ignore lines before `index`, e.g. output that predates a command.
    pub fn from_line(mut self, index: usize) -> Self {
        self.from_line = index;
        self
    }

    /// Set timeout duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Result of a wait operation.
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Index of the matching line in the snapshot (None for exit waits)
    pub line_index: Option<usize>,

    /// The matching line
    pub line: Option<String>,

    /// Time waited in milliseconds
    pub waited_ms: u64,
}

enum Matcher {
    Text(String),
    Regex(Regex),
    Exit,
}

impl Matcher {
    fn compile(target: &WaitTarget) -> Result<Self> {
        Ok(match target {
            WaitTarget::Text(text) => Matcher::Text(text.clone()),
            WaitTarget::Pattern(pattern) => Matcher::Regex(
                Regex::new(pattern).map_err(|e| Error::InvalidPattern(e.to_string()))?,
            ),
            WaitTarget::Exit => Matcher::Exit,
        })
    }

    fn matches(&self, line: &str) -> bool {
        match self {
            Matcher::Text(text) => line.contains(text.as_str()),
            Matcher::Regex(re) => re.is_match(line),
            Matcher::Exit => false,
        }
    }
}

impl Session {
    /// Block until the condition holds or the timeout passes.
    ///
    /// Polls snapshots; the session lock is never held between polls. A text
    /// or pattern wait on a session whose output has fully drained without a
    /// match fails with [`Error::SessionTerminated`].
    pub fn wait_for(&self, condition: &WaitCondition) -> Result<WaitResult> {
        let matcher = Matcher::compile(&condition.target)?;
        let start = Instant::now();

        loop {
            let waited_ms = start.elapsed().as_millis() as u64;

            if let Matcher::Exit = matcher {
                if self.is_drained() {
                    return Ok(WaitResult {
                        line_index: None,
                        line: None,
                        waited_ms,
                    });
                }
            } else {
                let drained = self.is_drained();
                let lines = self.output_lines_since(condition.from_line);
                if let Some((offset, line)) =
                    lines.into_iter().enumerate().find(|(_, l)| matcher.matches(l))
                {
                    return Ok(WaitResult {
                        line_index: Some(condition.from_line + offset),
                        line: Some(line),
                        waited_ms,
                    });
                }
                if drained {
                    return Err(Error::SessionTerminated);
                }
            }

            if start.elapsed() >= condition.timeout {
                return Err(Error::WaitTimeout(condition.timeout.as_millis() as u64));
            }
            std::thread::sleep(condition.poll_interval);
        }
    }
}
