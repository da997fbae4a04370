//! Controller and probe behaviour against a scripted systemd.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use icenet_executor::{CommandResult, CommandRunner, CommandSpec, Privilege};
use icenet_policy::Outcome;
use icenet_services::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const START_FAILED: &str = "Job for icenet-thermal.service failed because the control process exited with error code.\nSee \"systemctl status icenet-thermal.service\" and \"journalctl -xeu icenet-thermal.service\" for details.\n";

#[derive(Default, Clone, Copy)]
struct UnitState {
    enabled: bool,
    active: bool,
}

/// Just enough systemctl/journalctl behaviour for the controller.
#[derive(Default)]
struct FakeSystemd {
    units: Mutex<HashMap<String, UnitState>>,
    journal: Mutex<HashMap<String, String>>,
    broken_start: Mutex<Vec<String>>,
    deny_auth: bool,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeSystemd {
    fn with_units(units: &[&str]) -> Self {
        let fake = Self::default();
        for unit in units {
            fake.units.lock().unwrap().insert((*unit).to_string(), UnitState::default());
        }
        fake
    }

    fn denying_auth(mut self) -> Self {
        self.deny_auth = true;
        self
    }

    fn failing_start(self, unit: &str, journal: &str) -> Self {
        self.broken_start.lock().unwrap().push(unit.to_string());
        self.journal.lock().unwrap().insert(unit.to_string(), journal.to_string());
        self
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.argv().iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn state(&self, unit: &str) -> UnitState {
        self.units.lock().unwrap().get(unit).copied().unwrap_or_default()
    }

    fn respond(&self, argv: &[&str]) -> CommandResult {
        let (privileged, argv) = match argv.first() {
            Some(&"pkexec") => (true, &argv[1..]),
            _ => (false, argv),
        };
        if privileged && self.deny_auth {
            return CommandResult::new(127, "", "==== AUTHENTICATION FAILED ====\n");
        }

        match argv {
            ["systemctl", "is-enabled", unit] => match self.units.lock().unwrap().get(*unit) {
                Some(s) if s.enabled => CommandResult::new(0, "enabled\n", ""),
                Some(_) => CommandResult::new(1, "disabled\n", ""),
                None => CommandResult::new(
                    1,
                    "",
                    format!("Failed to get unit file state for {}.service: No such file or directory\n", unit),
                ),
            },
            ["systemctl", "is-active", unit] => match self.units.lock().unwrap().get(*unit) {
                Some(s) if s.active => CommandResult::new(0, "active\n", ""),
                _ => CommandResult::new(3, "inactive\n", ""),
            },
            ["systemctl", verb, unit] => {
                let mut units = self.units.lock().unwrap();
                let Some(state) = units.get_mut(*unit) else {
                    return CommandResult::new(
                        5,
                        "",
                        format!("Failed to {} {}.service: Unit {}.service not found.\n", verb, unit, unit),
                    );
                };
                match *verb {
                    "enable" => state.enabled = true,
                    "disable" => state.enabled = false,
                    "start" if self.broken_start.lock().unwrap().iter().any(|u| u == unit) => {
                        return CommandResult::new(1, "", START_FAILED);
                    }
                    "start" => state.active = true,
                    "stop" => state.active = false,
                    _ => return CommandResult::new(1, "", "Unknown command verb\n"),
                }
                CommandResult::new(0, "", "")
            }
            ["journalctl", "-u", unit, ..] => {
                let journal = self.journal.lock().unwrap().get(*unit).cloned().unwrap_or_default();
                CommandResult::new(0, journal, "")
            }
            _ => CommandResult::new(127, "", format!("{}: command not found", argv[0])),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeSystemd {
    async fn run(&self, spec: &CommandSpec) -> CommandResult {
        self.calls.lock().unwrap().push(spec.clone());
        self.respond(&spec.argv())
    }
}

fn controller_for(fake: Arc<FakeSystemd>) -> UnitController {
    UnitController::new(fake, Arc::new(ServiceCatalog::icenet_default()))
}

#[tokio::test]
async fn test_thermal_start_without_sensors_is_hardware_unsupported() {
    let fake = Arc::new(
        FakeSystemd::with_units(&["icenet-thermal"]).failing_start(
            "icenet-thermal",
            "Starting IceNet thermal management...\nNo thermal zones found\nicenet-thermal.service: Failed with result 'exit-code'.\n",
        ),
    );
    let controller = controller_for(Arc::clone(&fake));

    let outcome = controller.start("icenet-thermal").await;

    assert_eq!(outcome, Outcome::HardwareUnsupported);
    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], vec!["pkexec", "systemctl", "start", "icenet-thermal"]);
    assert_eq!(calls[1][0], "journalctl");
}

#[tokio::test]
async fn test_thermal_start_failure_without_marker_stays_unknown() {
    let fake = Arc::new(
        FakeSystemd::with_units(&["icenet-thermal"])
            .failing_start("icenet-thermal", "config file missing\n"),
    );
    let controller = controller_for(Arc::clone(&fake));

    let outcome = controller.start("icenet-thermal").await;

    assert_eq!(outcome, Outcome::Unknown(START_FAILED.to_string()));
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn test_other_unit_start_failure_skips_journal() {
    let fake = Arc::new(
        FakeSystemd::with_units(&["mesh-bridge-gui"])
            .failing_start("mesh-bridge-gui", "No thermal zones found\n"),
    );
    let controller = controller_for(Arc::clone(&fake));

    let outcome = controller.start("mesh-bridge-gui").await;

    assert!(matches!(outcome, Outcome::Unknown(_)));
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn test_denied_start_is_not_diagnosed() {
    let fake = Arc::new(
        FakeSystemd::with_units(&["icenet-thermal"])
            .failing_start("icenet-thermal", "No thermal zones found\n")
            .denying_auth(),
    );
    let controller = controller_for(Arc::clone(&fake));

    assert_eq!(controller.start("icenet-thermal").await, Outcome::PermissionDenied);
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn test_disable_twice_is_idempotent() {
    let fake = Arc::new(FakeSystemd::with_units(&["meshtastic-bridge"]));
    let controller = controller_for(Arc::clone(&fake));

    let first = controller.disable("meshtastic-bridge").await;
    let second = controller.disable("meshtastic-bridge").await;

    assert!(first.is_informational());
    assert!(second.is_informational());
    assert!(!fake.state("meshtastic-bridge").enabled);
}

#[tokio::test]
async fn test_stop_of_missing_unit_is_not_found() {
    let fake = Arc::new(FakeSystemd::with_units(&[]));
    let controller = controller_for(Arc::clone(&fake));

    assert_eq!(controller.stop("mesh-bridge-gui").await, Outcome::NotFound);
}

#[tokio::test]
async fn test_uncatalogued_unit_is_refused_without_running_anything() {
    let fake = Arc::new(FakeSystemd::with_units(&["sshd"]));
    let controller = controller_for(Arc::clone(&fake));

    assert_eq!(controller.enable("sshd").await, Outcome::NotFound);
    assert_eq!(controller.start("--now").await, Outcome::NotFound);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_set_enabled_reports_fresh_state_on_failure() {
    let fake = Arc::new(FakeSystemd::with_units(&["icenet-thermal"]).denying_auth());
    let controller = controller_for(Arc::clone(&fake));

    let report = controller.set_enabled("icenet-thermal", true).await;

    assert_eq!(report.outcome, Outcome::PermissionDenied);
    assert!(!report.state.enabled);
}

#[tokio::test]
async fn test_set_enabled_success_rereads_state() {
    let fake = Arc::new(FakeSystemd::with_units(&["icenet-thermal"]));
    let controller = controller_for(Arc::clone(&fake));

    let report = controller.set_enabled("icenet-thermal", true).await;

    assert_eq!(report.outcome, Outcome::Success);
    assert!(report.state.enabled);
    assert!(!report.state.active);
    let calls = fake.calls();
    assert_eq!(calls[1], vec!["systemctl", "is-enabled", "icenet-thermal"]);
    assert_eq!(calls[2], vec!["systemctl", "is-active", "icenet-thermal"]);
}

#[tokio::test]
async fn test_refresh_lists_catalog_in_order() {
    let fake = Arc::new(FakeSystemd::with_units(&["icenet-thermal", "mesh-bridge-gui"]));
    let controller = controller_for(Arc::clone(&fake));
    controller.start("mesh-bridge-gui").await;

    let rows = controller.refresh().await;

    let units: Vec<&str> = rows.iter().map(|r| r.service.unit_name.as_str()).collect();
    assert_eq!(units, vec!["icenet-thermal", "meshtastic-bridge", "mesh-bridge-gui"]);
    assert_eq!(rows[2].state, ServiceState { enabled: false, active: true });
    assert_eq!(rows[1].state, ServiceState::default());
}

#[tokio::test]
async fn test_privilege_and_timeout_reach_the_command() {
    let fake = Arc::new(FakeSystemd::with_units(&["mesh-bridge-gui"]));
    let controller = controller_for(Arc::clone(&fake))
        .with_privilege(Privilege::None)
        .with_action_timeout(Duration::from_secs(5));

    controller.stop("mesh-bridge-gui").await;

    let spec = fake.calls.lock().unwrap()[0].clone();
    assert_eq!(spec.argv(), vec!["systemctl", "stop", "mesh-bridge-gui"]);
    assert_eq!(spec.timeout(), Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn test_probe_missing_unit_is_false() {
    let fake = Arc::new(FakeSystemd::with_units(&[]));
    let probe = ServiceStateProbe::new(fake);

    assert!(!probe.is_enabled("does-not-exist").await);
    assert!(!probe.is_active("does-not-exist").await);
}

#[tokio::test]
async fn test_probe_rejects_invalid_names_without_running() {
    let fake = Arc::new(FakeSystemd::with_units(&[]));
    let probe = ServiceStateProbe::new(Arc::clone(&fake) as Arc<dyn CommandRunner>);

    assert!(!probe.is_enabled("--global").await);
    assert!(!probe.is_active("a;b").await);
    assert!(fake.calls().is_empty());
}

struct FixedRunner(CommandResult);

#[async_trait]
impl CommandRunner for FixedRunner {
    async fn run(&self, _spec: &CommandSpec) -> CommandResult {
        self.0.clone()
    }
}

#[tokio::test]
async fn test_probe_needs_keyword_not_just_exit_zero() {
    let probe = ServiceStateProbe::new(Arc::new(FixedRunner(CommandResult::new(0, "unknown\n", ""))));
    assert!(!probe.is_enabled("icenet-thermal").await);
    assert!(!probe.is_active("icenet-thermal").await);
}

#[tokio::test]
async fn test_probe_needs_exit_zero_not_just_keyword() {
    let probe = ServiceStateProbe::new(Arc::new(FixedRunner(CommandResult::new(1, "active\n", ""))));
    assert!(!probe.is_active("icenet-thermal").await);
}

/// Tracks how many commands run at once.
struct SlowRunner {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl CommandRunner for SlowRunner {
    async fn run(&self, _spec: &CommandSpec) -> CommandResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        CommandResult::new(0, "", "")
    }
}

#[tokio::test]
async fn test_operations_on_one_unit_do_not_overlap() {
    let runner = Arc::new(SlowRunner {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let controller = UnitController::new(
        Arc::clone(&runner) as Arc<dyn CommandRunner>,
        Arc::new(ServiceCatalog::icenet_default()),
    );

    let (a, b) = tokio::join!(
        controller.start("meshtastic-bridge"),
        controller.stop("meshtastic-bridge")
    );

    assert_eq!(a, Outcome::Success);
    assert_eq!(b, Outcome::Success);
    assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
}
