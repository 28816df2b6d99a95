//! Bounded command history with up/down recall.

use std::collections::VecDeque;

/// Previously submitted commands, oldest first.
///
/// The cursor is `None` while not browsing; otherwise it indexes the entry
/// last returned by [`prev`](History::prev) or [`next`](History::next).
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: Option<usize>,
}

impl History {
    /// Create an empty history holding at most `capacity` commands.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            cursor: None,
        }
    }

    /// Record a submitted command and stop browsing.
    ///
    /// The command is trimmed; blank commands are ignored and leave the
    /// cursor alone.
    pub fn push(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        self.entries.push_back(command.to_string());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = None;
    }

    /// Step toward older entries, stopping at the oldest.
    ///
    /// Starts from the newest entry when not browsing. Returns `None` only
    /// when the history is empty.
    pub fn prev(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.cursor = Some(index);
        self.entries.get(index).cloned()
    }

    /// Step toward newer entries.
    ///
    /// Stepping past the newest entry stops browsing and returns an empty
    /// string, so the caller clears its input line. Returns `None` when not
    /// browsing.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        let index = self.cursor?;
        if index + 1 >= self.entries.len() {
            self.cursor = None;
            return Some(String::new());
        }
        self.cursor = Some(index + 1);
        self.entries.get(index + 1).cloned()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of stored commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no commands are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of stored commands.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(commands: &[&str]) -> History {
        let mut history = History::new(50);
        for cmd in commands {
            history.push(cmd);
        }
        history
    }

    #[test]
    fn test_empty_history() {
        let mut history = History::new(10);
        assert_eq!(history.prev(), None);
        assert_eq!(history.next(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_prev_walks_newest_to_oldest_and_clamps() {
        let mut history = history_of(&["a", "b", "c"]);
        assert_eq!(history.prev().as_deref(), Some("c"));
        assert_eq!(history.prev().as_deref(), Some("b"));
        assert_eq!(history.prev().as_deref(), Some("a"));
        assert_eq!(history.prev().as_deref(), Some("a"));
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_next_walks_forward_then_clears() {
        let mut history = history_of(&["a", "b", "c"]);
        for _ in 0..4 {
            history.prev();
        }
        assert_eq!(history.next().as_deref(), Some("b"));
        assert_eq!(history.next().as_deref(), Some("c"));
        assert_eq!(history.next().as_deref(), Some(""));
        assert_eq!(history.cursor(), None);
        assert_eq!(history.next(), None);
    }

    #[test]
    fn test_next_without_browsing_is_none() {
        let mut history = history_of(&["a"]);
        assert_eq!(history.next(), None);
    }

    #[test]
    fn test_push_trims_and_skips_blank() {
        let mut history = history_of(&["  ls -la  ", "", "   \n"]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["ls -la"]);

        history.prev();
        history.push("   ");
        assert_eq!(history.cursor(), Some(0), "blank input keeps browsing state");
    }

    #[test]
    fn test_push_resets_cursor() {
        let mut history = history_of(&["a", "b"]);
        history.prev();
        history.prev();
        history.push("c");
        assert_eq!(history.cursor(), None);
        assert_eq!(history.prev().as_deref(), Some("c"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(3);
        for cmd in ["1", "2", "3", "4", "5"] {
            history.push(cmd);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.capacity(), 3);
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_single_entry_recall() {
        let mut history = history_of(&["only"]);
        assert_eq!(history.prev().as_deref(), Some("only"));
        assert_eq!(history.next().as_deref(), Some(""));
        assert_eq!(history.next(), None);
    }
}
