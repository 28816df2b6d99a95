//! # termlink
//!
//! Runs an interactive shell and mirrors its cleaned-up output on the
//! console, one line at a time.
//!
//! ## Overview
//!
//! - Output is polled every frame and reconciled into a scrollback, so
//!   progress bars and prompts redrawn with `\r` update in place
//! - Typed lines are forwarded to the shell
//! - Lines starting with `:` are console commands:
//!   `:prev`, `:next`, `:history`, `:int`, `:size ROWS COLS`
//!   (`::text` sends `:text` to the shell)
//!
//! ## Architecture
//!
//! This is Layer 2 - the binary that ties together:
//! - termlink-core: Configuration and shared types
//! - termlink-shell: Shell session and line buffer

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use termlink::Console;
use termlink_core::ShellConfig;
use termlink_shell::Session;

/// Roughly 30 frames per second.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long, value_name = "FILE", help = "YAML configuration file.")]
    config: Option<PathBuf>,

    #[clap(long, value_name = "DIR", help = "Working directory for the shell.")]
    cwd: Option<PathBuf>,

    #[clap(long, help = "Use plain pipes instead of a pseudo-terminal.")]
    no_pty: bool,

    #[clap(long, help = "Initial terminal rows.")]
    rows: Option<u16>,

    #[clap(long, help = "Initial terminal columns.")]
    cols: Option<u16>,

    #[clap(long, help = "Log raw shell traffic to stderr.")]
    debug: bool,

    #[clap(last = true, value_name = "COMMAND", help = "Program and arguments to run instead of the default shell.")]
    command: Vec<String>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ShellConfig> {
        let mut config = match &self.config {
            Some(path) => ShellConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ShellConfig::default(),
        };
        config.apply_env();

        if let Some(cwd) = &self.cwd {
            config.shell.cwd = Some(cwd.clone());
        }
        if self.no_pty {
            config.shell.use_pty = false;
        }
        if let Some(rows) = self.rows {
            config.terminal.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.terminal.cols = cols;
        }
        if self.debug {
            config.shell.debug = true;
        }
        if !self.command.is_empty() {
            config.shell.command = Some(self.command.clone());
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// A line typed on the console.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Send(String),
    HistoryPrev,
    HistoryNext,
    History,
    Interrupt,
    Resize(u16, u16),
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let Some(command) = line.strip_prefix(':') else {
            return Input::Send(line.to_string());
        };
        if command.starts_with(':') {
            return Input::Send(command.to_string());
        }

        let mut words = command.split_whitespace();
        match (words.next(), words.next(), words.next(), words.next()) {
            (Some("prev"), None, ..) => Input::HistoryPrev,
            (Some("next"), None, ..) => Input::HistoryNext,
            (Some("history"), None, ..) => Input::History,
            (Some("int"), None, ..) => Input::Interrupt,
            (Some("size"), Some(rows), Some(cols), None) => {
                match (rows.parse::<u16>(), cols.parse::<u16>()) {
                    (Ok(rows), Ok(cols)) if rows > 0 && cols > 0 => Input::Resize(rows, cols),
                    _ => Input::Unknown(line.to_string()),
                }
            }
            _ => Input::Unknown(line.to_string()),
        }
    }
}

fn notice(message: &str) {
    eprintln!("termlink: {message}");
}

fn handle_input(session: &Session, line: &str) {
    match Input::parse(line) {
        Input::Send(text) => session.write(&text),
        Input::HistoryPrev => match session.history_prev() {
            Some(command) => notice(&format!("history: {command}")),
            None => notice("history is empty"),
        },
        Input::HistoryNext => match session.history_next() {
            Some(command) if command.is_empty() => notice("end of history"),
            Some(command) => notice(&format!("history: {command}")),
            None => notice("not browsing history"),
        },
        Input::History => {
            let history = session.history();
            if history.is_empty() {
                notice("history is empty");
            }
            for (i, command) in history.iter().enumerate() {
                notice(&format!("{:>3}  {}", i + 1, command));
            }
        }
        Input::Interrupt => session.send_interrupt(),
        Input::Resize(rows, cols) => {
            session.set_window_size(rows, cols);
            notice(&format!("window size set to {rows}x{cols}"));
        }
        Input::Unknown(line) => notice(&format!(
            "unknown command '{line}' (try :prev, :next, :history, :int, :size ROWS COLS)"
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    // Initialize logging
    let default_level = if config.shell.debug {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("termlink v{} starting...", env!("CARGO_PKG_VERSION"));

    let session = Session::from_config(&config).map_err(|e| {
        tracing::error!("Error starting shell: {}", e);
        e
    })?;

    tracing::info!(
        "Shell running: transport={}, argv={:?}, cwd={}",
        session.transport_kind(),
        session.command(),
        session.cwd().display()
    );

    // Attached programs only draw their prompt once they know the size.
    session.set_window_size(config.terminal.rows, config.terminal.cols);

    let mut console = Console::stdout();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Keep drawing until the reader has delivered everything the shell wrote.
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !console.frame(&session)? {
                    tracing::info!("Shell exited");
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line? {
                    Some(line) => handle_input(&session, &line),
                    None => {
                        tracing::info!("Console input closed");
                        stdin_open = false;
                        session.shutdown();
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.send_interrupt();
            }
        }
    }

    tokio::task::spawn_blocking(move || session.close()).await?;

    tracing::info!("termlink shutting down");

    Ok(())
}
