//! Installer orchestration: the page flow, the backend commands it drives,
//! and the progress stream of the running install.

pub mod backend;
pub mod config;
pub mod disks;
pub mod log_buffer;
pub mod protocol;
pub mod streamer;
pub mod system;
pub mod wizard;

pub use backend::{InstallBackend, DEFAULT_BACKEND_SCRIPT, PASSWORD_ENV};
pub use config::{InstallConfig, InstallSummary};
pub use disks::{detect_disks, parse_disk_listing, DiskInfo};
pub use log_buffer::InstallLog;
pub use protocol::{parse_progress_line, ProgressEvent};
pub use streamer::{ProgressStreamer, ProgressSubscription, StreamEvent, TerminalEvent};
pub use system::{preflight, reboot, PreflightError, DEFAULT_LIVE_BOOT_MARKER};
pub use wizard::{
    InstallSession, UserForm, ValidationError, WizardError, WizardState, MIN_PASSWORD_LEN,
};
