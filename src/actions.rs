//! Local device actions triggered by SMS commands

use crate::command::Command;
use crate::config::Config;
use crate::process::{Invocation, ProcessRunner};
use std::path::PathBuf;
use tracing::{error, info};

/// A process to launch and where to launch it from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub dir: PathBuf,
    pub invocation: Invocation,
}

/// Performs the action a command asks for.
///
/// Launches block until the process exits. Inside the receive handler this holds up
/// the next message for as long as the script runs; reboot and ULPM normally take the
/// device down shortly after, but a slow upgrade script will stall message handling.
pub struct ActionDispatcher<R: ProcessRunner> {
    config: Config,
    runner: R,
}

impl<R: ProcessRunner> ActionDispatcher<R> {
    pub fn new(config: &Config, runner: R) -> Self {
        Self {
            config: config.clone(),
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The action `cmd` maps to, if any
    pub fn action_for(&self, cmd: &Command) -> Option<Action> {
        match cmd {
            Command::Upgrade { version_code } => Some(Action {
                dir: self.config.scripts_dir.clone(),
                invocation: Invocation::new(&self.config.upgrade_script).arg(version_code),
            }),
            Command::Reboot => Some(Action {
                dir: self.config.reboot_dir.clone(),
                invocation: Invocation::new(&self.config.reboot_command),
            }),
            Command::Sleep { seconds } if *seconds > 0 => Some(Action {
                dir: self.config.scripts_dir.clone(),
                invocation: Invocation::new(&self.config.ulpm_script).arg(seconds.to_string()),
            }),
            Command::Sleep { .. } | Command::Unknown { .. } => None,
        }
    }

    /// Launch the action for `cmd`. Failures are logged, never returned.
    pub fn perform(&self, cmd: &Command) -> Option<Action> {
        let action = self.action_for(cmd)?;

        if let Command::Upgrade { version_code } = cmd {
            info!("Running upgrade: {}", version_code);
        }
        info!("Running script {}", action.invocation);

        match self
            .runner
            .run(&action.dir, &action.invocation, &mut |line| {
                info!("script output: '{}'", line)
            }) {
            Ok(outcome) if outcome.success() => {}
            Ok(outcome) => error!("The script exited with an error ({:?})", outcome),
            Err(e) => error!("Could not launch {}: {}", action.invocation, e),
        }

        Some(action)
    }
}
