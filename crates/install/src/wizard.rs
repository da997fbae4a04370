//! The installer's page flow.
//!
//! ```text
//! Welcome -> DiskSelect -> UserConfig -> Summary -> Installing -> Complete
//!                                                             \-> Failed
//! ```
//!
//! Back steps are allowed from DiskSelect, UserConfig and Summary. Once
//! Installing is entered the only way out is the terminal event.

use crate::backend::InstallBackend;
use crate::config::{InstallConfig, InstallSummary};
use crate::streamer::{ProgressStreamer, ProgressSubscription, TerminalEvent};
use icenet_executor::ArgGuard;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

pub const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    Welcome,
    DiskSelect,
    UserConfig,
    Summary,
    Installing,
    Complete,
    Failed,
}

impl WizardState {
    pub fn as_str(self) -> &'static str {
        match self {
            WizardState::Welcome => "welcome",
            WizardState::DiskSelect => "disk_select",
            WizardState::UserConfig => "user_config",
            WizardState::Summary => "summary",
            WizardState::Installing => "installing",
            WizardState::Complete => "complete",
            WizardState::Failed => "failed",
        }
    }

    /// The window may not be closed while the disk is being written.
    pub fn allows_close(self) -> bool {
        self != WizardState::Installing
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WizardState::Complete | WizardState::Failed)
    }

    fn previous(self) -> Option<WizardState> {
        match self {
            WizardState::DiskSelect => Some(WizardState::Welcome),
            WizardState::UserConfig => Some(WizardState::DiskSelect),
            WizardState::Summary => Some(WizardState::UserConfig),
            _ => None,
        }
    }

    fn collects_input(self) -> bool {
        matches!(
            self,
            WizardState::Welcome
                | WizardState::DiskSelect
                | WizardState::UserConfig
                | WizardState::Summary
        )
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input rejected by a page. The state does not change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a disk")]
    NoDiskSelected,

    #[error("Invalid disk: {0}")]
    InvalidDisk(String),

    #[error("Hostname cannot be empty")]
    EmptyHostname,

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Password must be at least 4 characters")]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Cannot {action} while in {from}")]
    InvalidTransition {
        from: WizardState,
        action: &'static str,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Contents of the user page.
#[derive(Clone, Default)]
pub struct UserForm {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub confirm: String,
    pub timezone: String,
    pub locale: String,
}

impl UserForm {
    /// Rules are checked in a fixed order and only the first failure is
    /// reported.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hostname.is_empty() {
            return Err(ValidationError::EmptyHostname);
        }
        if self.username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if self.password != self.confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

impl fmt::Debug for UserForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserForm")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("confirm", &"<redacted>")
            .field("timezone", &self.timezone)
            .field("locale", &self.locale)
            .finish()
    }
}

pub struct InstallSession {
    state: WizardState,
    config: InstallConfig,
    frozen: Option<InstallConfig>,
    backend: InstallBackend,
}

impl InstallSession {
    /// `defaults` pre-fills the user page; any disk or password in it is
    /// discarded.
    pub fn new(backend: InstallBackend, defaults: InstallConfig) -> Self {
        Self {
            state: WizardState::Welcome,
            config: InstallConfig {
                disk_path: None,
                password: String::new(),
                ..defaults
            },
            frozen: None,
            backend,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// The configuration being edited, or the frozen copy once installation
    /// has started.
    pub fn config(&self) -> &InstallConfig {
        self.frozen.as_ref().unwrap_or(&self.config)
    }

    /// Welcome -> DiskSelect.
    pub fn next(&mut self) -> Result<WizardState, WizardError> {
        self.require(WizardState::Welcome, "continue")?;
        Ok(self.transition(WizardState::DiskSelect))
    }

    /// DiskSelect -> UserConfig.
    pub fn select_disk(&mut self, disk: Option<&str>) -> Result<WizardState, WizardError> {
        self.require(WizardState::DiskSelect, "select a disk")?;

        let disk = disk
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(ValidationError::NoDiskSelected)?;
        ArgGuard::validate_device_path(disk)
            .map_err(|e| ValidationError::InvalidDisk(e.to_string()))?;

        self.config.disk_path = Some(disk.to_string());
        Ok(self.transition(WizardState::UserConfig))
    }

    /// UserConfig -> Summary, if the form validates.
    pub fn submit_user(&mut self, form: UserForm) -> Result<WizardState, WizardError> {
        self.require(WizardState::UserConfig, "submit user settings")?;
        if let Err(e) = form.validate() {
            info!("User settings rejected: {}", e);
            return Err(e.into());
        }

        self.config.hostname = form.hostname;
        self.config.username = form.username;
        self.config.password = form.password;
        self.config.timezone = form.timezone;
        self.config.locale = form.locale;
        Ok(self.transition(WizardState::Summary))
    }

    pub fn back(&mut self) -> Result<WizardState, WizardError> {
        let previous = self.state.previous().ok_or(WizardError::InvalidTransition {
            from: self.state,
            action: "go back",
        })?;
        Ok(self.transition(previous))
    }

    /// Available from Summary onward.
    pub fn summary(&self) -> Option<InstallSummary> {
        if self.state.collects_input() && self.state != WizardState::Summary {
            return None;
        }
        let config = self.config();
        Some(InstallSummary {
            disk_path: config.disk_path.clone().unwrap_or_default(),
            hostname: config.hostname.clone(),
            username: config.username.clone(),
            timezone: config.timezone.clone(),
            locale: config.locale.clone(),
        })
    }

    /// Summary -> Installing. Freezes the configuration and starts the
    /// backend on the streamer's worker.
    ///
    /// # Panics
    ///
    /// If no disk was selected. The flow makes that unreachable, so getting
    /// here without one is a bug, and a destructive install must not guess.
    pub fn confirm(
        &mut self,
        streamer: &ProgressStreamer,
    ) -> Result<ProgressSubscription, WizardError> {
        self.require(WizardState::Summary, "start the installation")?;

        let frozen = self.config.clone();
        let disk = frozen.disk_path.clone().unwrap_or_default();
        assert!(
            !disk.is_empty(),
            "installation confirmed without a selected disk"
        );

        let spec = self.backend.install_command(&frozen, &disk);
        self.frozen = Some(frozen);
        self.transition(WizardState::Installing);
        info!("Installing to {}", disk);
        Ok(streamer.start(spec))
    }

    /// Installing -> Complete or Failed. Accepted exactly once.
    pub fn finish(&mut self, terminal: TerminalEvent) -> Result<WizardState, WizardError> {
        self.require(WizardState::Installing, "finish")?;
        if terminal.success {
            Ok(self.transition(WizardState::Complete))
        } else {
            warn!("Installation failed with exit code {}", terminal.exit_code);
            Ok(self.transition(WizardState::Failed))
        }
    }

    /// Whether the user may abandon the wizard now. Nothing is undone; the
    /// caller just exits.
    pub fn cancel(&self) -> Result<(), WizardError> {
        if self.state.collects_input() {
            info!("Installation cancelled at {}", self.state);
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                from: self.state,
                action: "cancel",
            })
        }
    }

    fn require(&self, expected: WizardState, action: &'static str) -> Result<(), WizardError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, to: WizardState) -> WizardState {
        info!("Installer: {} -> {}", self.state, to);
        self.state = to;
        to
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn form() -> UserForm {
        UserForm {
            hostname: "icenet".into(),
            username: "operator".into(),
            password: "abcd".into(),
            confirm: "abcd".into(),
            timezone: "UTC".into(),
            locale: "en_US.UTF-8".into(),
        }
    }

    fn at_user_config() -> InstallSession {
        let mut session = InstallSession::new(InstallBackend::default(), InstallConfig::default());
        session.next().unwrap();
        session.select_disk(Some("/dev/sda")).unwrap();
        session
    }

    #[test]
    fn test_validation_order() {
        let mut f = form();
        f.hostname.clear();
        f.username.clear();
        f.password = "x".into();
        assert_eq!(f.validate(), Err(ValidationError::EmptyHostname));

        f.hostname = "icenet".into();
        assert_eq!(f.validate(), Err(ValidationError::EmptyUsername));

        f.username = "operator".into();
        assert_eq!(f.validate(), Err(ValidationError::PasswordTooShort));

        f.password = "abcd".into();
        f.confirm = "abce".into();
        assert_eq!(f.validate(), Err(ValidationError::PasswordMismatch));

        f.confirm = "abcd".into();
        assert_eq!(f.validate(), Ok(()));
    }

    #[test]
    fn test_password_length_counts_characters() {
        let mut f = form();
        f.password = "äöü".into();
        f.confirm = "äöü".into();
        assert_eq!(f.validate(), Err(ValidationError::PasswordTooShort));
    }

    #[test]
    fn test_only_welcome_moves_forward_with_next() {
        let mut session = at_user_config();
        assert_eq!(
            session.next(),
            Err(WizardError::InvalidTransition {
                from: WizardState::UserConfig,
                action: "continue",
            })
        );
    }

    #[test]
    fn test_back_steps() {
        let mut session = at_user_config();
        session.submit_user(form()).unwrap();
        assert_eq!(session.back(), Ok(WizardState::UserConfig));
        assert_eq!(session.back(), Ok(WizardState::DiskSelect));
        assert_eq!(session.back(), Ok(WizardState::Welcome));
        assert!(session.back().is_err());
    }

    #[test]
    fn test_disk_selection_errors() {
        let mut session = InstallSession::new(InstallBackend::default(), InstallConfig::default());
        session.next().unwrap();

        assert_eq!(
            session.select_disk(None),
            Err(WizardError::Invalid(ValidationError::NoDiskSelected))
        );
        assert_eq!(
            session.select_disk(Some("  ")),
            Err(WizardError::Invalid(ValidationError::NoDiskSelected))
        );
        assert!(matches!(
            session.select_disk(Some("sda; reboot")),
            Err(WizardError::Invalid(ValidationError::InvalidDisk(_)))
        ));
        assert_eq!(session.state(), WizardState::DiskSelect);
    }

    #[test]
    fn test_new_discards_disk_and_password_from_defaults() {
        let defaults = InstallConfig {
            disk_path: Some("/dev/sda".into()),
            password: "leftover".into(),
            hostname: "base".into(),
            ..Default::default()
        };
        let session = InstallSession::new(InstallBackend::default(), defaults);
        assert_eq!(session.config().disk_path, None);
        assert!(session.config().password.is_empty());
        assert_eq!(session.config().hostname, "base");
    }

    #[test]
    fn test_summary_only_from_summary_onward() {
        let mut session = at_user_config();
        assert_eq!(session.summary(), None);

        session.submit_user(form()).unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(summary.disk_path, "/dev/sda");
        assert_eq!(summary.username, "operator");
        assert!(!summary.to_string().contains("abcd"));
    }

    #[test]
    fn test_close_and_cancel_policy() {
        assert!(WizardState::Summary.allows_close());
        assert!(!WizardState::Installing.allows_close());
        assert!(WizardState::Failed.allows_close());

        let session = at_user_config();
        assert!(session.cancel().is_ok());
    }

    #[test]
    #[should_panic(expected = "without a selected disk")]
    fn test_confirm_without_disk_fails_closed() {
        let mut session = InstallSession::new(InstallBackend::default(), InstallConfig::default());
        session.state = WizardState::Summary;
        let streamer = ProgressStreamer::new(std::sync::Arc::new(icenet_executor::SystemRunner::new()));
        let _ = session.confirm(&streamer);
    }

    #[test]
    fn test_finish_requires_installing() {
        let mut session = at_user_config();
        assert!(session.finish(TerminalEvent::from_exit_code(0)).is_err());
        assert_eq!(session.state(), WizardState::UserConfig);
    }
}
