//! Headless front-end for the orchestrator. Each command returns whether it
//! succeeded so `main` can pick the exit status.

pub mod install;
pub mod services;

use icenet_policy::{Notice, Severity};

pub(crate) fn print_notice(notice: &Notice) {
    match notice.severity {
        Severity::Info if notice.detail.is_empty() => println!("{}", notice.title),
        Severity::Info => println!("{}: {}", notice.title, notice.detail),
        Severity::Error => eprintln!("{}: {}", notice.title, notice.detail),
    }
}
