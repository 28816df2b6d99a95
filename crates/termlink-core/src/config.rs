//! Configuration types for termlink.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Dimensions, Error, Platform};

/// Environment variable that switches on raw transport logging.
pub const DEBUG_ENV_VAR: &str = "TERMLINK_SHELL_DEBUG";

/// Top-level configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShellConfig {
    /// Shell process settings
    pub shell: ShellSettings,
    /// Terminal settings
    pub terminal: TerminalSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl ShellConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ShellConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(argv) = &self.shell.command {
            if argv.first().map_or(true, |program| program.trim().is_empty()) {
                return Err(Error::Config(
                    "shell.command must name a program".to_string(),
                ));
            }
        }

        if self.shell.history_size == 0 {
            return Err(Error::Config("shell.history_size must be > 0".to_string()));
        }

        if self.shell.read_chunk_size == 0 {
            return Err(Error::Config(
                "shell.read_chunk_size must be > 0".to_string(),
            ));
        }

        self.terminal
            .dimensions()
            .validate()
            .map_err(|e| Error::Config(format!("terminal: {e}")))?;

        Ok(())
    }

    /// Apply overrides from the process environment.
    ///
    /// `TERMLINK_SHELL_DEBUG` set to anything other than empty, `0` or
    /// `false` turns on debug logging of raw transport traffic.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(DEBUG_ENV_VAR) {
            if env_flag(&value) {
                self.shell.debug = true;
            }
        }
    }
}

fn env_flag(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Shell process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Program and arguments (None = platform default shell)
    pub command: Option<Vec<String>>,
    /// Working directory (None = current directory)
    pub cwd: Option<PathBuf>,
    /// Prefer a pseudo-terminal over plain pipes
    pub use_pty: bool,
    /// Number of submitted commands kept for recall
    pub history_size: usize,
    /// Maximum bytes per transport read
    pub read_chunk_size: usize,
    /// Log raw transport bytes and line decisions
    pub debug: bool,
}

impl ShellSettings {
    /// The argv to spawn, resolving the platform default when unset.
    pub fn argv(&self) -> Vec<String> {
        self.command
            .clone()
            .unwrap_or_else(|| Platform::detect().default_shell())
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            command: None,
            cwd: None,
            use_pty: true,
            history_size: 50,
            read_chunk_size: 4096,
            debug: false,
        }
    }
}

/// Terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Initial terminal rows
    pub rows: u16,
    /// Initial terminal columns
    pub cols: u16,
    /// TERM environment variable value exported in PTY mode
    pub term: String,
}

impl TerminalSettings {
    /// Initial window size.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.rows, self.cols)
    }
}

impl Default for TerminalSettings {
    fn default() -> Self {
        let dims = Dimensions::default();
        Self {
            rows: dims.rows,
            cols: dims.cols,
            term: "xterm-256color".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShellConfig::default();
        assert!(config.shell.command.is_none());
        assert!(config.shell.use_pty);
        assert_eq!(config.shell.history_size, 50);
        assert_eq!(config.shell.read_chunk_size, 4096);
        assert!(!config.shell.debug);
        assert_eq!(config.terminal.rows, 24);
        assert_eq!(config.terminal.cols, 80);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = ShellConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_history_size() {
        let mut config = ShellConfig::default();
        config.shell.history_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut config = ShellConfig::default();
        config.terminal.rows = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid dimensions: 0x80"));
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut config = ShellConfig::default();
        config.shell.command = Some(vec![]);
        assert!(config.validate().is_err());

        config.shell.command = Some(vec!["  ".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
shell:
  command: ["/bin/bash", "--noprofile", "--norc"]
  cwd: /tmp
  use_pty: false
  history_size: 10
  read_chunk_size: 1024
  debug: true

terminal:
  rows: 30
  cols: 120
  term: "vt100"

logging:
  level: debug
"#;

        let config = ShellConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.shell.argv(), vec!["/bin/bash", "--noprofile", "--norc"]);
        assert_eq!(config.shell.cwd, Some(PathBuf::from("/tmp")));
        assert!(!config.shell.use_pty);
        assert_eq!(config.shell.history_size, 10);
        assert_eq!(config.shell.read_chunk_size, 1024);
        assert!(config.shell.debug);
        assert_eq!(config.terminal.dimensions(), Dimensions::new(30, 120));
        assert_eq!(config.terminal.term, "vt100");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = ShellConfig::from_yaml("terminal:\n  cols: 132\n").unwrap();
        assert_eq!(config.terminal.rows, 24);
        assert_eq!(config.terminal.cols, 132);
        assert!(config.shell.use_pty);
    }

    #[test]
    fn test_malformed_yaml() {
        let result = ShellConfig::from_yaml("shell: [not, a, map");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_argv_falls_back_to_platform_shell() {
        let settings = ShellSettings::default();
        assert_eq!(settings.argv(), Platform::detect().default_shell());
    }

    #[test]
    fn test_env_flag_values() {
        assert!(env_flag("1"));
        assert!(env_flag("yes"));
        assert!(!env_flag(""));
        assert!(!env_flag("0"));
        assert!(!env_flag("FALSE"));
    }
}
