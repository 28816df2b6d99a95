//! # termlink
//!
//! Console front-end for an interactive shell session.
//!
//! ## Architecture
//!
//! This is Layer 2 - the binary that ties together:
//! - termlink-core: Configuration, errors and shared types
//! - termlink-shell: Shell session, transports and line buffer
//!
//! The library half holds the pieces the front-end renders with, so they can
//! be tested without a terminal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod console;
pub mod scrollback;

pub use console::Console;
pub use scrollback::{Scrollback, ScrollbackUpdate};
