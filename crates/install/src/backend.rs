//! Command builders for the installer backend script.
//!
//! The backend is a shell library; its functions are reached through
//! `bash -c` with a constant script, and all user data travels as
//! positional parameters or environment, never as shell source.

use crate::config::InstallConfig;
use icenet_executor::CommandSpec;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_SCRIPT: &str = "/usr/local/lib/icenet-installer-backend.sh";

/// Environment variable carrying the new user's password to the backend.
pub const PASSWORD_ENV: &str = "ICENET_INSTALL_PASSWORD";

const DETECT_SCRIPT: &str = r#"source "$0" && detect_disks"#;
const INSTALL_SCRIPT: &str =
    r#"source "$0" && full_install "$1" "$2" "$3" "$ICENET_INSTALL_PASSWORD" "$4" "$5""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallBackend {
    script: PathBuf,
}

impl InstallBackend {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Prints one `path:size` line per candidate disk.
    pub fn detect_command(&self) -> CommandSpec {
        CommandSpec::new("bash")
            .args(["-c", DETECT_SCRIPT])
            .arg(self.script.to_string_lossy())
    }

    /// The full install. Runs for as long as it takes.
    pub fn install_command(&self, config: &InstallConfig, disk: &str) -> CommandSpec {
        CommandSpec::new("bash")
            .args(["-c", INSTALL_SCRIPT])
            .arg(self.script.to_string_lossy())
            .args([
                disk,
                config.hostname.as_str(),
                config.username.as_str(),
                config.timezone.as_str(),
                config.locale.as_str(),
            ])
            .env(PASSWORD_ENV, config.password.as_str())
            .unbounded()
    }
}

impl Default for InstallBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_SCRIPT)
    }
}
