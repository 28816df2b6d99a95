//! Platform detection and default shell selection.

use serde::{Deserialize, Serialize};

/// Platform family, as far as shell spawning is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux, macOS and the BSDs
    Unix,
    /// Native Windows
    Windows,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn detect() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Get the platform name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Unix => "Unix",
            Platform::Windows => "Windows",
        }
    }

    /// Default interactive shell argv for this platform.
    ///
    /// On Windows this is `cmd.exe` in quiet, keep-open mode so it neither
    /// echoes commands nor prints its banner. On Unix it is `$SHELL`, falling
    /// back to `/bin/sh`.
    pub fn default_shell(&self) -> Vec<String> {
        match self {
            Platform::Windows => vec!["cmd.exe".to_string(), "/q".to_string(), "/k".to_string()],
            Platform::Unix => {
                let shell = std::env::var("SHELL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "/bin/sh".to_string());
                vec![shell]
            }
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        if cfg!(windows) {
            assert_eq!(platform, Platform::Windows);
        } else {
            assert_eq!(platform, Platform::Unix);
        }
    }

    #[test]
    fn test_windows_default_shell_is_quiet_keep_open() {
        assert_eq!(
            Platform::Windows.default_shell(),
            vec!["cmd.exe", "/q", "/k"]
        );
    }

    #[test]
    fn test_unix_default_shell_is_single_program() {
        let argv = Platform::Unix.default_shell();
        assert_eq!(argv.len(), 1);
        assert!(!argv[0].is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Platform::Unix), "Unix");
        assert_eq!(format!("{}", Platform::Windows), "Windows");
    }
}
