//! Boot launcher
//!
//! Runs the boot script once at startup. Any failure is a [`Fatal`] error: a device
//! whose boot script did not complete is not in a usable state.

use crate::config::Config;
use crate::error::Fatal;
use crate::process::{ExitOutcome, Invocation, ProcessRunner};
use std::path::Path;
use tracing::info;

/// Run `command` from `working_dir`, logging every output line.
pub fn run(
    runner: &dyn ProcessRunner,
    working_dir: &Path,
    command: &Invocation,
) -> Result<(), Fatal> {
    info!("Running {}", command);

    let outcome = runner
        .run(working_dir, command, &mut |line| {
            info!("script output: '{}'", line)
        })
        .map_err(Fatal::Launch)?;

    match outcome {
        ExitOutcome::Exited(0) => Ok(()),
        ExitOutcome::Exited(code) => Err(Fatal::ExitCode(code)),
        ExitOutcome::Abnormal => Err(Fatal::AbnormalTermination),
    }
}

/// Run the configured boot script
pub fn run_configured(runner: &dyn ProcessRunner, config: &Config) -> Result<(), Fatal> {
    run(runner, &config.boot_dir, &config.boot_command)
}
