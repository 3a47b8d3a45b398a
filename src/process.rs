//! Process execution
//!
//! Runs a command in a working directory, streams its output and reports how it ended.
//! Commands are exec'd directly, never through `/bin/sh`.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use tracing::{error, warn};

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a finished process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Terminated normally with this status code
    Exited(i32),
    /// Killed by a signal or otherwise ended without a status code
    Abnormal,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }
}

/// Process execution service
pub trait ProcessRunner {
    /// Run `invocation` from `dir`, blocking until it exits. Every output line is
    /// handed to `on_line`.
    fn run(
        &self,
        dir: &Path,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> std::io::Result<ExitOutcome>;
}

/// Runs processes on the local system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        dir: &Path,
        invocation: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> std::io::Result<ExitOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A bad directory is not fatal: an absolute program path still runs
        if dir.is_dir() {
            cmd.current_dir(dir);
        } else {
            error!("Error changing directory to: {}", dir.display());
        }

        let mut child = cmd.spawn()?;

        // Both pipes are drained on reader threads so neither can fill up and stall
        // the child. Lines reach `on_line` in the order they arrive.
        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        for line in rx {
            on_line(&line);
        }
        for reader in readers {
            let _ = reader.join();
        }

        let status = child.wait()?;
        Ok(match status.code() {
            Some(code) => ExitOutcome::Exited(code),
            None => ExitOutcome::Abnormal,
        })
    }
}

/// Read `pipe` to EOF, sending each line to `tx`. Bytes that are not UTF-8 are
/// replaced rather than ending the read, so the child never sees a closed pipe.
fn forward_lines<P: Read + Send + 'static>(pipe: P, tx: Sender<String>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let _ = tx.send(line.trim_end_matches(['\n', '\r']).to_string());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Stopped reading child output: {}", e);
                    break;
                }
            }
        }
    })
}
