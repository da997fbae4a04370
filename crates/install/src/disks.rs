use crate::backend::InstallBackend;
use icenet_executor::{ArgGuard, CommandRunner, CommandSpec};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskInfo {
    pub path: String,
    pub size: String,
    /// Empty when `lsblk` has nothing to say.
    pub model: String,
}

/// `path:size` pairs from the backend's disk listing. Lines without a colon
/// are skipped.
pub fn parse_disk_listing(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| line.trim().split_once(':'))
        .map(|(path, size)| (path.trim().to_string(), size.trim().to_string()))
        .collect()
}

pub async fn detect_disks(runner: &dyn CommandRunner, backend: &InstallBackend) -> Vec<DiskInfo> {
    let result = runner.run(&backend.detect_command()).await;
    if !result.success() {
        warn!(
            "Disk detection exited with {}: {}",
            result.exit_code,
            result.stderr.trim()
        );
    }

    let mut disks = Vec::new();
    for (path, size) in parse_disk_listing(&result.stdout) {
        if let Err(e) = ArgGuard::validate_device_path(&path) {
            warn!("Ignoring disk entry from backend: {}", e);
            continue;
        }
        let model = read_model(runner, &path).await;
        disks.push(DiskInfo { path, size, model });
    }
    debug!("Detected {} disks", disks.len());
    disks
}

async fn read_model(runner: &dyn CommandRunner, path: &str) -> String {
    let spec = CommandSpec::new("lsblk").args(["-ndo", "MODEL", path]);
    let result = runner.run(&spec).await;
    if result.success() {
        result.stdout.trim().to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_disk_listing() {
        let listing = "/dev/sda:500G\n\nnoise line\n/dev/nvme0n1: 1T \n";
        assert_eq!(
            parse_disk_listing(listing),
            vec![
                ("/dev/sda".to_string(), "500G".to_string()),
                ("/dev/nvme0n1".to_string(), "1T".to_string()),
            ]
        );
    }

    #[test]
    fn test_size_keeps_later_colons() {
        assert_eq!(
            parse_disk_listing("/dev/sdb:1.8T:usb"),
            vec![("/dev/sdb".to_string(), "1.8T:usb".to_string())]
        );
    }
}
