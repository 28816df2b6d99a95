//! On-screen scrollback fed from session snapshots.
//!
//! The session only ever appends completed lines, but its last entry may be
//! the pending line, which changes in place (progress bars, prompts redrawn
//! after `\r`). Each frame the front-end hands the latest snapshot to
//! [`Scrollback::update`] and renders the returned [`ScrollbackUpdate`].

use std::collections::VecDeque;

/// Default number of displayed lines kept.
pub const DEFAULT_MAX_LINES: usize = 10_000;

/// What changed on screen since the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollbackUpdate {
    /// New text for the line that was displayed last, if it changed
    pub replaced_last: Option<String>,
    /// Lines to add below it
    pub appended: Vec<String>,
}

impl ScrollbackUpdate {
    /// Whether nothing needs redrawing.
    pub fn is_empty(&self) -> bool {
        self.replaced_last.is_none() && self.appended.is_empty()
    }
}

/// Displayed lines plus how much of the session output they cover.
#[derive(Debug, Clone)]
pub struct Scrollback {
    lines: VecDeque<String>,
    seen: usize,
    max_lines: usize,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl Scrollback {
    /// Create a scrollback keeping at most `max_lines` lines (at least one).
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            seen: 0,
            max_lines: max_lines.max(1),
        }
    }

    /// Reconcile with a new snapshot.
    ///
    /// Lines beyond the previously seen count are appended. The line that was
    /// displayed last is replaced when its text differs from the snapshot at
    /// the same position.
    ///
    /// A snapshot shorter than the seen count means the pending line vanished.
    /// The display is left alone and the slot stays claimed, so whatever takes
    /// that position next replaces the stale line instead of landing below it.
    pub fn update(&mut self, snapshot: &[String]) -> ScrollbackUpdate {
        let mut update = ScrollbackUpdate::default();

        if snapshot.len() < self.seen {
            return update;
        }

        if self.seen > 0 {
            let current = &snapshot[self.seen - 1];
            if let Some(last) = self.lines.back_mut() {
                if last != current {
                    last.clone_from(current);
                    update.replaced_last = Some(current.clone());
                }
            }
        }

        for line in &snapshot[self.seen..] {
            self.lines.push_back(line.clone());
            update.appended.push(line.clone());
        }
        self.seen = snapshot.len();

        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }

        update
    }

    /// Displayed lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of displayed lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing is displayed.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of snapshot entries already reconciled.
    pub fn seen(&self) -> usize {
        self.seen
    }
}
