//! CLI command implementations
//!
//! Each command builds the configuration once, takes the operation lock for
//! anything that can mutate state, runs its pipeline, and turns the final
//! [`RunReport`] into a process exit code. List mode never takes the lock: a
//! read-only listing must work while a backup is running.

use crate::backup::BackupProducer;
use crate::config::Config;
use crate::lock::{OperationLock, DEFAULT_WAIT};
use crate::observability::Logger;
use crate::report::RunReport;
use crate::restore::{RestoreConsumer, RestoreOptions, Selector};
use crate::service::SystemdSupervisor;

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::StdinConfirmer;

/// Parse arguments and run. Returns the process exit code.
pub fn run() -> i32 {
    run_command(Cli::parse_args().command)
}

/// Dispatch one parsed command. Returns the process exit code.
pub fn run_command(cmd: Command) -> i32 {
    match cmd {
        Command::Backup => backup(),
        Command::Restore {
            selector,
            yes,
            non_interactive,
        } => restore(selector, yes, non_interactive),
    }
}

/// Load config and take the operation lock.
fn setup(locked: bool) -> CliResult<(Config, Option<OperationLock>)> {
    let config = Config::from_env()?;
    let lock = if locked {
        Some(OperationLock::acquire(&config.lock_path, DEFAULT_WAIT)?)
    } else {
        None
    };
    Ok((config, lock))
}

fn backup() -> i32 {
    let (config, _lock) = match setup(true) {
        Ok(pair) => pair,
        Err(e) => {
            Logger::fatal("BACKUP_NOT_STARTED", &[("reason", &e.to_string())]);
            eprintln!("{}", e);
            return 1;
        }
    };

    let mut report = RunReport::new("backup");
    if let Err(e) = BackupProducer::run(&config, &mut report) {
        eprintln!("{}", e);
        report.mark_fatal();
    }

    report.print_summary();
    report.exit_code()
}

fn restore(selector: Option<String>, yes: bool, non_interactive: bool) -> i32 {
    let selector = selector.as_deref().map(Selector::parse);

    // Listing is read-only; only an actual restore takes the lock
    let (config, _lock) = match setup(selector.is_some()) {
        Ok(pair) => pair,
        Err(e) => {
            Logger::fatal("RESTORE_NOT_STARTED", &[("reason", &e.to_string())]);
            eprintln!("{}", e);
            return 1;
        }
    };

    let options = RestoreOptions {
        interactive: !non_interactive,
        assume_yes: yes,
        ..RestoreOptions::default()
    };

    let supervisor = config.service_unit.as_deref().map(SystemdSupervisor::new);
    let listing_only = selector.is_none();

    let mut report = RunReport::new("restore");
    let mut confirmer = StdinConfirmer;
    let result = RestoreConsumer::run(
        &config,
        selector,
        &options,
        supervisor
            .as_ref()
            .map(|s| s as &dyn crate::service::ServiceSupervisor),
        &mut confirmer,
        &mut report,
    );

    if let Err(e) = result {
        eprintln!("{}", e);
        report.mark_fatal();
    }

    // A bare listing needs no step summary
    if !listing_only {
        report.print_summary();
    }
    report.exit_code()
}
