//! # termlink-core
//!
//! Core types for termlink.
//!
//! This crate has **no internal dependencies** on other termlink crates. It
//! provides:
//!
//! - Error types
//! - Configuration (YAML, environment overrides)
//! - Geometry (terminal dimensions)
//! - Platform detection and default shell selection
//! - Session identifiers
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - the shell crate and the binary depend
//! on this one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod platform;
pub mod session;

// Re-export commonly used types
pub use config::{LoggingSettings, ShellConfig, ShellSettings, TerminalSettings, DEBUG_ENV_VAR};
pub use error::{Error, Result};
pub use geometry::Dimensions;
pub use platform::Platform;
pub use session::SessionId;
