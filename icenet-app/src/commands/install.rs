use crate::config::OrchestratorConfig;
use anyhow::{bail, Context, Result};
use icenet_executor::{CommandRunner, Privilege};
use icenet_install::{
    detect_disks, preflight, reboot, InstallSession, ProgressStreamer, StreamEvent, UserForm,
    WizardState,
};
use std::sync::Arc;
use tracing::info;

/// Environment variable the CLI reads the new user's password from.
pub const PASSWORD_VAR: &str = "ICENET_PASSWORD";

/// Lines of the install log shown after a failure.
const FAILURE_LOG_TAIL: usize = 20;

/// Overrides for the user page; unset fields fall back to the config's
/// install defaults.
#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    pub disk: String,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub timezone: Option<String>,
    pub locale: Option<String>,
    pub reboot: bool,
}

pub async fn disks(
    config: &OrchestratorConfig,
    runner: Arc<dyn CommandRunner>,
    json: bool,
) -> Result<bool> {
    let disks = detect_disks(runner.as_ref(), &config.backend()).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&disks)?);
    } else if disks.is_empty() {
        eprintln!("No disks detected");
    } else {
        for disk in &disks {
            println!("{:<16} {:>8}  {}", disk.path, disk.size, disk.model);
        }
    }
    Ok(!disks.is_empty())
}

/// Walks the wizard from Welcome to a terminal state without a UI.
pub async fn run(
    config: &OrchestratorConfig,
    runner: Arc<dyn CommandRunner>,
    args: InstallArgs,
) -> Result<bool> {
    preflight(&config.live_boot_marker).context("Preflight check failed")?;

    let password = std::env::var(PASSWORD_VAR)
        .with_context(|| format!("Set {} to the new user's password", PASSWORD_VAR))?;

    let defaults = &config.install_defaults;
    let form = UserForm {
        hostname: args.hostname.unwrap_or_else(|| defaults.hostname.clone()),
        username: args.username.unwrap_or_else(|| defaults.username.clone()),
        confirm: password.clone(),
        password,
        timezone: args.timezone.unwrap_or_else(|| defaults.timezone.clone()),
        locale: args.locale.unwrap_or_else(|| defaults.locale.clone()),
    };

    let mut session = InstallSession::new(config.backend(), defaults.clone());
    session.next()?;
    session.select_disk(Some(&args.disk))?;
    session.submit_user(form)?;

    if let Some(summary) = session.summary() {
        println!("{}\n", summary);
    }

    let streamer = ProgressStreamer::new(Arc::clone(&runner));
    let subscription = session.confirm(&streamer)?;
    let log = subscription.log().clone();

    let terminal = subscription
        .drain(|event| {
            if let StreamEvent::Progress(progress) = event {
                println!("[{:>3}%] {}", progress.percent, progress.message);
            }
        })
        .await;

    match session.finish(terminal)? {
        WizardState::Complete => {
            println!("Installation complete");
            if args.reboot {
                info!("Rebooting into the installed system");
                let result = reboot(runner.as_ref(), Privilege::None).await;
                if !result.success() {
                    bail!("Reboot failed: {}", result.stderr.trim());
                }
            }
            Ok(true)
        }
        _ => {
            eprintln!("Installation failed (exit code {})", terminal.exit_code);
            let lines = log.snapshot();
            for line in &lines[lines.len().saturating_sub(FAILURE_LOG_TAIL)..] {
                eprintln!("  {}", line);
            }
            Ok(false)
        }
    }
}
