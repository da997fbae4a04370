//! IceNet control panel and installer, headless.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use icenet_app::commands::install::{self, InstallArgs};
use icenet_app::commands::services;
use icenet_app::config::resolve_config;
use icenet_executor::{CommandRunner, SystemRunner};
use icenet_policy::OperationTag;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "icenet")]
#[command(about = "IceNet-OS service control and installer", long_about = None)]
#[command(version)]
struct Cli {
    /// Orchestrator config (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage IceNet services
    Services {
        #[command(subcommand)]
        action: ServiceCommands,
    },

    /// Install IceNet-OS from the live session
    Install {
        #[command(subcommand)]
        action: InstallCommands,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// List the managed services
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show whether each service is enabled and running
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Start the service at boot
    Enable { unit: String },

    /// Stop starting the service at boot
    Disable { unit: String },

    /// Start the service now
    Start { unit: String },

    /// Stop the service now
    Stop { unit: String },
}

#[derive(Subcommand)]
enum InstallCommands {
    /// List disks the installer can write to
    Disks {
        #[arg(long)]
        json: bool,
    },

    /// Install to a disk. The password is read from ICENET_PASSWORD.
    Run {
        /// Target block device, e.g. /dev/sda. Everything on it is erased.
        #[arg(long)]
        disk: String,

        #[arg(long)]
        hostname: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        timezone: Option<String>,

        #[arg(long)]
        locale: Option<String>,

        /// Reboot once the installation completes
        #[arg(long)]
        reboot: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());

    let ok = match cli.command {
        Commands::Services { action } => match action {
            ServiceCommands::List { json } => services::list(&config, json)?,
            ServiceCommands::Status { json } => services::status(&config, runner, json).await?,
            ServiceCommands::Enable { unit } => {
                services::operate(&config, runner, OperationTag::Enable, &unit).await?
            }
            ServiceCommands::Disable { unit } => {
                services::operate(&config, runner, OperationTag::Disable, &unit).await?
            }
            ServiceCommands::Start { unit } => {
                services::operate(&config, runner, OperationTag::Start, &unit).await?
            }
            ServiceCommands::Stop { unit } => {
                services::operate(&config, runner, OperationTag::Stop, &unit).await?
            }
        },
        Commands::Install { action } => match action {
            InstallCommands::Disks { json } => install::disks(&config, runner, json).await?,
            InstallCommands::Run {
                disk,
                hostname,
                username,
                timezone,
                locale,
                reboot,
            } => {
                let args = InstallArgs {
                    disk,
                    hostname,
                    username,
                    timezone,
                    locale,
                    reboot,
                };
                install::run(&config, runner, args).await?
            }
        },
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
