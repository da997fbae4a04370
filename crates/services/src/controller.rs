//! Privileged unit operations.

use crate::catalog::{ServiceCatalog, ServiceRef};
use crate::diagnostics::{MissingSensorProbe, PostFailureProbe};
use crate::locks::UnitLocks;
use crate::probe::{ServiceState, ServiceStateProbe};
use icenet_executor::{CommandRunner, CommandSpec, Privilege};
use icenet_policy::{OperationTag, Outcome, ResultClassifier};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Covers an interactive polkit prompt.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of flipping the boot-time switch: what happened, and the state
/// re-read afterwards that a switch widget should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleReport {
    pub outcome: Outcome,
    pub state: ServiceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub service: ServiceRef,
    pub state: ServiceState,
}

pub struct UnitController {
    runner: Arc<dyn CommandRunner>,
    catalog: Arc<ServiceCatalog>,
    classifier: ResultClassifier,
    probe: ServiceStateProbe,
    privilege: Privilege,
    action_timeout: Duration,
    diagnostics: Vec<Box<dyn PostFailureProbe>>,
    locks: UnitLocks,
}

impl UnitController {
    pub fn new(runner: Arc<dyn CommandRunner>, catalog: Arc<ServiceCatalog>) -> Self {
        Self {
            probe: ServiceStateProbe::new(Arc::clone(&runner)),
            runner,
            catalog,
            classifier: ResultClassifier::standard(),
            privilege: Privilege::default(),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            diagnostics: vec![Box::new(MissingSensorProbe::default())],
            locks: UnitLocks::new(),
        }
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    pub fn with_probe(mut self, probe: ServiceStateProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_classifier(mut self, classifier: ResultClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Box<dyn PostFailureProbe>>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn probe(&self) -> &ServiceStateProbe {
        &self.probe
    }

    pub async fn enable(&self, unit: &str) -> Outcome {
        self.perform(OperationTag::Enable, unit).await
    }

    pub async fn disable(&self, unit: &str) -> Outcome {
        self.perform(OperationTag::Disable, unit).await
    }

    pub async fn start(&self, unit: &str) -> Outcome {
        self.perform(OperationTag::Start, unit).await
    }

    pub async fn stop(&self, unit: &str) -> Outcome {
        self.perform(OperationTag::Stop, unit).await
    }

    /// Enable or disable, then re-read the state. The report's state comes
    /// from the system, never from `desired`.
    pub async fn set_enabled(&self, unit: &str, desired: bool) -> ToggleReport {
        let outcome = if desired {
            self.enable(unit).await
        } else {
            self.disable(unit).await
        };
        let state = self.probe.state(unit).await;
        if state.enabled != desired && outcome.is_informational() {
            warn!(
                "{} reported {} but unit is {}",
                unit,
                outcome,
                if state.enabled { "enabled" } else { "disabled" }
            );
        }
        ToggleReport { outcome, state }
    }

    /// Fresh state of every catalog entry, in catalog order.
    pub async fn refresh(&self) -> Vec<ServiceStatus> {
        let mut rows = Vec::with_capacity(self.catalog.len());
        for service in self.catalog.iter() {
            let state = self.probe.state(&service.unit_name).await;
            rows.push(ServiceStatus {
                service: service.clone(),
                state,
            });
        }
        rows
    }

    async fn perform(&self, op: OperationTag, unit: &str) -> Outcome {
        let Some(service) = self.catalog.get(unit) else {
            warn!("Refusing to {} {}: not in the service catalog", op, unit);
            return Outcome::NotFound;
        };

        let _guard = self.locks.acquire(unit).await;

        let spec = self.privilege.wrap(
            CommandSpec::new("systemctl")
                .arg(op.as_str())
                .arg(unit)
                .with_timeout(self.action_timeout),
        );
        info!("Running systemctl {} {}", op, unit);
        let result = self.runner.run(&spec).await;
        let classified = self.classifier.classify(op, &result);
        let outcome = self.diagnose(service, op, classified).await;

        if outcome.is_informational() {
            info!("systemctl {} {}: {}", op, unit, outcome);
        } else {
            warn!("systemctl {} {} failed: {}", op, unit, outcome);
        }
        outcome
    }

    /// Each applicable probe runs at most once; the first refinement wins.
    async fn diagnose(&self, service: &ServiceRef, op: OperationTag, outcome: Outcome) -> Outcome {
        for probe in &self.diagnostics {
            if !probe.applies_to(service, op, &outcome) {
                continue;
            }
            if let Some(refined) = probe.refine(self.runner.as_ref(), service).await {
                info!("{} refined {} to {}", probe.name(), outcome, refined);
                return refined;
            }
        }
        outcome
    }
}
