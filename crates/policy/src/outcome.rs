use serde::{Deserialize, Serialize};
use std::fmt;

/// The logical operation a command was run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationTag {
    Enable,
    Disable,
    Start,
    Stop,
    Probe,
}

impl OperationTag {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationTag::Enable => "enable",
            OperationTag::Disable => "disable",
            OperationTag::Start => "start",
            OperationTag::Stop => "stop",
            OperationTag::Probe => "probe",
        }
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed classification of a command result.
///
/// Variant names and [`Outcome::code`] values are stable; front-ends switch
/// on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// The unit was already where the operation would have put it.
    AlreadyInDesiredState,
    PermissionDenied,
    NotFound,
    TimedOut,
    /// A follow-up probe showed the unit cannot run on this hardware.
    HardwareUnsupported,
    /// Unclassified failure; carries the raw stderr.
    Unknown(String),
}

impl Outcome {
    pub fn code(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::AlreadyInDesiredState => "already_in_desired_state",
            Outcome::PermissionDenied => "permission_denied",
            Outcome::NotFound => "not_found",
            Outcome::TimedOut => "timed_out",
            Outcome::HardwareUnsupported => "hardware_unsupported",
            Outcome::Unknown(_) => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Success or an idempotent no-op. Neither warrants an error dialog.
    pub fn is_informational(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::AlreadyInDesiredState)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_informational()
    }

    /// User-facing wording for this outcome of `op` on the named service.
    pub fn notice(&self, display_name: &str, op: OperationTag) -> Notice {
        match self {
            Outcome::Success => {
                let (title, detail) = match op {
                    OperationTag::Enable => ("enabled", "Service will start at boot"),
                    OperationTag::Disable => ("disabled", "Service will not start at boot"),
                    OperationTag::Start => ("started", "Service is now running"),
                    OperationTag::Stop => ("stopped", "Service has been stopped"),
                    OperationTag::Probe => ("status refreshed", ""),
                };
                Notice::info(format!("{} {}", display_name, title), detail)
            }
            Outcome::AlreadyInDesiredState => {
                let title = match op {
                    OperationTag::Enable => "is already enabled",
                    OperationTag::Disable => "is already disabled",
                    OperationTag::Start => "is already running",
                    OperationTag::Stop => "is not running",
                    OperationTag::Probe => "is unchanged",
                };
                Notice::info(format!("{} {}", display_name, title), "No change was needed")
            }
            failure => {
                let title = format!("Failed to {} {}", op, display_name);
                let detail = match failure {
                    Outcome::PermissionDenied => {
                        "Authorization was denied or cancelled. Administrator rights are required."
                            .to_string()
                    }
                    Outcome::NotFound => "The service is not installed on this system.".to_string(),
                    Outcome::TimedOut => "The operation did not finish in time.".to_string(),
                    Outcome::HardwareUnsupported => {
                        "This computer lacks the hardware sensors the service needs.".to_string()
                    }
                    Outcome::Unknown(raw) if raw.trim().is_empty() => "Unknown error".to_string(),
                    Outcome::Unknown(raw) => raw.trim().to_string(),
                    Outcome::Success | Outcome::AlreadyInDesiredState => String::new(),
                };
                Notice::error(title, detail)
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unknown(raw) => write!(f, "unknown: {}", raw.trim()),
            other => f.write_str(other.code()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// Title and body for a notification or error dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub detail: String,
}

impl Notice {
    fn info(title: String, detail: &str) -> Self {
        Self {
            severity: Severity::Info,
            title,
            detail: detail.to_string(),
        }
    }

    fn error(title: String, detail: String) -> Self {
        Self {
            severity: Severity::Error,
            title,
            detail,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Outcome::Success.code(), "success");
        assert_eq!(Outcome::AlreadyInDesiredState.code(), "already_in_desired_state");
        assert_eq!(Outcome::PermissionDenied.code(), "permission_denied");
        assert_eq!(Outcome::NotFound.code(), "not_found");
        assert_eq!(Outcome::TimedOut.code(), "timed_out");
        assert_eq!(Outcome::HardwareUnsupported.code(), "hardware_unsupported");
        assert_eq!(Outcome::Unknown("x".into()).code(), "unknown");
    }

    #[test]
    fn test_already_is_informational() {
        assert!(Outcome::AlreadyInDesiredState.is_informational());
        assert!(!Outcome::AlreadyInDesiredState.is_failure());
        let notice = Outcome::AlreadyInDesiredState.notice("Mesh Bridge GUI", OperationTag::Start);
        assert_eq!(notice.severity, Severity::Info);
        assert_eq!(notice.title, "Mesh Bridge GUI is already running");
    }

    #[test]
    fn test_success_notices_follow_operation() {
        let notice = Outcome::Success.notice("Thermal Management", OperationTag::Enable);
        assert_eq!(notice.title, "Thermal Management enabled");
        assert_eq!(notice.detail, "Service will start at boot");

        let notice = Outcome::Success.notice("Thermal Management", OperationTag::Stop);
        assert_eq!(notice.title, "Thermal Management stopped");
    }

    #[test]
    fn test_failure_notice_carries_raw_error() {
        let outcome = Outcome::Unknown("Job failed. See journal.\n".into());
        let notice = outcome.notice("Meshtastic Bridge", OperationTag::Start);
        assert_eq!(notice.severity, Severity::Error);
        assert_eq!(notice.title, "Failed to start Meshtastic Bridge");
        assert_eq!(notice.detail, "Job failed. See journal.");
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_value(Outcome::Unknown("boom".into())).unwrap();
        assert_eq!(json["outcome"], "unknown");
        assert_eq!(json["detail"], "boom");

        let json = serde_json::to_value(Outcome::HardwareUnsupported).unwrap();
        assert_eq!(json["outcome"], "hardware_unsupported");
    }
}
