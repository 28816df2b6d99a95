//! Frame rendering for the console front-end.
//!
//! A [`Console`] owns the [`Scrollback`] and the writer it draws into. The
//! front-end calls [`Console::frame`] on every tick and stops once it returns
//! `false`, which happens only after the reader has delivered the last byte
//! the shell wrote and that output has been drawn.

use std::io::{self, IsTerminal, Write};

use termlink_shell::Session;

use crate::scrollback::{Scrollback, ScrollbackUpdate};

/// Draws session output into a writer.
#[derive(Debug)]
pub struct Console<W: Write> {
    out: W,
    redraw_in_place: bool,
    scrollback: Scrollback,
}

impl Console<io::Stdout> {
    /// Console on stdout; lines are redrawn in place when stdout is a terminal.
    pub fn stdout() -> Self {
        let out = io::stdout();
        let redraw_in_place = out.is_terminal();
        Self::new(out, redraw_in_place)
    }
}

impl<W: Write> Console<W> {
    /// Create a console drawing into `out`.
    ///
    /// With `redraw_in_place` a replaced last line is overwritten using cursor
    /// movement; without it the new text is printed on a fresh line.
    pub fn new(out: W, redraw_in_place: bool) -> Self {
        Self {
            out,
            redraw_in_place,
            scrollback: Scrollback::default(),
        }
    }

    /// Draw one frame from the session's current output.
    ///
    /// Returns `false` once the session is drained and everything it produced
    /// has been drawn.
    pub fn frame(&mut self, session: &Session) -> io::Result<bool> {
        // Read before the snapshot so the last chunk is in it.
        let drained = session.is_drained();
        let update = self.scrollback.update(&session.output_lines());
        self.render(&update)?;
        Ok(!drained)
    }

    /// Write one scrollback update.
    pub fn render(&mut self, update: &ScrollbackUpdate) -> io::Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        if let Some(line) = &update.replaced_last {
            if self.redraw_in_place {
                // Cursor up one line, then clear it.
                write!(self.out, "\x1b[1A\r\x1b[2K")?;
            }
            writeln!(self.out, "{line}")?;
        }
        for line in &update.appended {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }

    /// Lines currently on screen.
    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
