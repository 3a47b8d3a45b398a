//! Error types for taringa

use crate::sms::service::SmsFault;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} has failed!")]
    RegistrationFailed(&'static str),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of the outbound SMS helper, one per step of building a message
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("SMS message creation has failed")]
    CreationFailed,

    #[error("setting the destination has failed ({0})")]
    InvalidDestination(SmsFault),

    #[error("setting the text has failed ({0})")]
    InvalidText(SmsFault),

    #[error("sending has failed ({0})")]
    SendFailed(SmsFault),
}

/// Unrecoverable boot failure. The binary turns this into a process exit.
#[derive(Error, Debug)]
pub enum Fatal {
    #[error("Could not run boot script: {0}")]
    Launch(std::io::Error),

    #[error("Could not run boot script: terminated abnormally")]
    AbnormalTermination,

    #[error("boot script failed with exit code {0}")]
    ExitCode(i32),
}
