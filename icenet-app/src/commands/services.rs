use super::print_notice;
use crate::config::OrchestratorConfig;
use anyhow::{Context, Result};
use icenet_executor::CommandRunner;
use icenet_policy::OperationTag;
use icenet_services::{ServiceState, ServiceStatus, UnitController};
use std::sync::Arc;
use tracing::debug;

pub fn list(config: &OrchestratorConfig, json: bool) -> Result<bool> {
    let catalog = config.catalog().context("Invalid service catalog")?;
    if json {
        let services: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(true);
    }

    for service in catalog.iter() {
        println!("{:<30} {:<20} {}", service.display_name, service.unit_name, service.description);
    }
    Ok(true)
}

pub async fn status(
    config: &OrchestratorConfig,
    runner: Arc<dyn CommandRunner>,
    json: bool,
) -> Result<bool> {
    let controller = config.controller(runner)?;
    let rows = controller.refresh().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            print_status(row);
        }
    }
    Ok(true)
}

/// Runs one operation, prints the notice and the state read afterwards.
pub async fn operate(
    config: &OrchestratorConfig,
    runner: Arc<dyn CommandRunner>,
    op: OperationTag,
    unit: &str,
) -> Result<bool> {
    let controller = config.controller(runner)?;
    let display_name = display_name(&controller, unit);

    let (outcome, state) = match op {
        OperationTag::Enable | OperationTag::Disable => {
            let report = controller
                .set_enabled(unit, op == OperationTag::Enable)
                .await;
            (report.outcome, report.state)
        }
        OperationTag::Start => {
            let outcome = controller.start(unit).await;
            (outcome, controller.probe().state(unit).await)
        }
        OperationTag::Stop => {
            let outcome = controller.stop(unit).await;
            (outcome, controller.probe().state(unit).await)
        }
        OperationTag::Probe => {
            anyhow::bail!("probe is not a unit operation; use `icenet services status`")
        }
    };
    debug!("{} {} -> {:?}", op, unit, outcome);

    print_notice(&outcome.notice(&display_name, op));
    println!("{}: {}", unit, describe(state));
    Ok(outcome.is_informational())
}

fn display_name(controller: &UnitController, unit: &str) -> String {
    controller
        .catalog()
        .get(unit)
        .map(|s| s.display_name.clone())
        .unwrap_or_else(|| unit.to_string())
}

fn print_status(row: &ServiceStatus) {
    println!(
        "{:<30} {:<20} {}",
        row.service.display_name,
        row.service.unit_name,
        describe(row.state)
    );
}

fn describe(state: ServiceState) -> String {
    format!(
        "{}, {}",
        if state.enabled { "enabled" } else { "disabled" },
        if state.active { "running" } else { "stopped" }
    )
}
