//! Read-only unit state queries.

use icenet_executor::{ArgGuard, CommandRunner, CommandSpec, DEFAULT_TIMEOUT};
use icenet_policy::{OperationTag, ResultClassifier};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const ENABLED_KEYWORDS: &[&str] = &["enabled", "enabled-runtime"];
const ACTIVE_KEYWORDS: &[&str] = &["active"];

/// Snapshot of one unit. Always produced by a fresh query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceState {
    pub enabled: bool,
    pub active: bool,
}

pub struct ServiceStateProbe {
    runner: Arc<dyn CommandRunner>,
    classifier: ResultClassifier,
    timeout: Duration,
}

impl ServiceStateProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            classifier: ResultClassifier::standard(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn is_enabled(&self, unit: &str) -> bool {
        self.query("is-enabled", unit, ENABLED_KEYWORDS).await
    }

    pub async fn is_active(&self, unit: &str) -> bool {
        self.query("is-active", unit, ACTIVE_KEYWORDS).await
    }

    pub async fn state(&self, unit: &str) -> ServiceState {
        ServiceState {
            enabled: self.is_enabled(unit).await,
            active: self.is_active(unit).await,
        }
    }

    /// A zero exit status alone is not trusted; stdout must also name the
    /// expected state.
    async fn query(&self, verb: &str, unit: &str, keywords: &[&str]) -> bool {
        if let Err(e) = ArgGuard::validate_unit_name(unit) {
            warn!("Refusing to probe unit: {}", e);
            return false;
        }

        let spec = CommandSpec::new("systemctl")
            .arg(verb)
            .arg(unit)
            .with_timeout(self.timeout);
        let result = self.runner.run(&spec).await;
        let outcome = self.classifier.classify(OperationTag::Probe, &result);

        let reported = stdout_reports(&result.stdout, keywords);
        debug!(
            "systemctl {} {}: outcome={}, reported={}",
            verb, unit, outcome, reported
        );
        outcome.is_success() && reported
    }
}

fn stdout_reports(stdout: &str, keywords: &[&str]) -> bool {
    stdout
        .lines()
        .next()
        .map(str::trim)
        .is_some_and(|first| keywords.contains(&first))
}
