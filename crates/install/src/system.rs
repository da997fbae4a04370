//! Host checks before the installer starts, and the final reboot.

use icenet_executor::{CommandResult, CommandRunner, CommandSpec, Privilege};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_LIVE_BOOT_MARKER: &str = "/run/icenet/live-boot";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreflightError {
    #[error("Installer must be run as root")]
    NotRoot,

    #[error("Installer must be run from live boot ({} not found)", .0.display())]
    NotLiveSession(PathBuf),
}

pub fn preflight(live_boot_marker: &Path) -> Result<(), PreflightError> {
    if !is_root() {
        return Err(PreflightError::NotRoot);
    }
    check_live_session(live_boot_marker)
}

pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

pub fn check_live_session(marker: &Path) -> Result<(), PreflightError> {
    if marker.exists() {
        Ok(())
    } else {
        Err(PreflightError::NotLiveSession(marker.to_path_buf()))
    }
}

/// Ask systemd to reboot. The result is returned untouched; on success the
/// machine is going down anyway.
pub async fn reboot(runner: &dyn CommandRunner, privilege: Privilege) -> CommandResult {
    let spec = privilege.wrap(CommandSpec::new("systemctl").arg("reboot"));
    info!("Requesting reboot");
    let result = runner.run(&spec).await;
    if !result.success() {
        warn!("Reboot request failed: {}", result.stderr.trim());
    }
    result
}
