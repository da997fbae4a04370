//! Follow-up reads that refine an ambiguous failure before it is reported.

use crate::catalog::ServiceRef;
use async_trait::async_trait;
use icenet_executor::{CommandRunner, CommandSpec, DEFAULT_TIMEOUT};
use icenet_policy::{OperationTag, Outcome};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_JOURNAL_LINES: usize = 20;

/// One bounded diagnostic step run after a failed operation.
#[async_trait]
pub trait PostFailureProbe: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, service: &ServiceRef, op: OperationTag, outcome: &Outcome) -> bool;

    /// `None` keeps the classified outcome.
    async fn refine(&self, runner: &dyn CommandRunner, service: &ServiceRef) -> Option<Outcome>;
}

/// Reads the unit's recent journal after a failed `start` and reports
/// `HardwareUnsupported` when it mentions one of the unit's hardware markers.
pub struct MissingSensorProbe {
    journal_lines: usize,
    timeout: Duration,
}

impl MissingSensorProbe {
    pub fn new(journal_lines: usize) -> Self {
        Self {
            journal_lines,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn journal_spec(&self, unit: &str) -> CommandSpec {
        CommandSpec::new("journalctl")
            .arg("-u")
            .arg(unit)
            .arg("-n")
            .arg(self.journal_lines.to_string())
            .args(["--no-pager", "-o", "cat"])
            .with_timeout(self.timeout)
    }
}

impl Default for MissingSensorProbe {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_LINES)
    }
}

#[async_trait]
impl PostFailureProbe for MissingSensorProbe {
    fn name(&self) -> &'static str {
        "missing-sensor"
    }

    fn applies_to(&self, service: &ServiceRef, op: OperationTag, outcome: &Outcome) -> bool {
        // A denied start never ran, so the journal says nothing about it.
        op == OperationTag::Start
            && !service.hardware_markers.is_empty()
            && outcome.is_failure()
            && *outcome != Outcome::PermissionDenied
    }

    async fn refine(&self, runner: &dyn CommandRunner, service: &ServiceRef) -> Option<Outcome> {
        let result = runner.run(&self.journal_spec(&service.unit_name)).await;
        if result.timed_out {
            debug!("Journal read for {} timed out", service.unit_name);
            return None;
        }
        if result.stdout.trim().is_empty() {
            let stderr = result.stderr.trim();
            if stderr.is_empty() {
                debug!("Journal for {} has no entries", service.unit_name);
            } else {
                // journalctl exits 0 with an empty read for users outside
                // systemd-journal/adm and only says so on stderr.
                debug!(
                    "Journal for {} has no entries; reading it may need systemd-journal or adm membership: {}",
                    service.unit_name, stderr
                );
            }
            return None;
        }

        let journal = result.stdout.to_lowercase();
        let marker = service
            .hardware_markers
            .iter()
            .find(|m| journal.contains(&m.to_lowercase()))?;

        info!(
            "Journal for {} mentions '{}', reporting missing hardware",
            service.unit_name, marker
        );
        Some(Outcome::HardwareUnsupported)
    }
}
