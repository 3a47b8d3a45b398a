//! SMS command grammar
//!
//! Every body maps to exactly one [`Command`]; anything that is not a well formed
//! command becomes [`Command::Unknown`]. Matching is case-sensitive and tried in
//! this order:
//!
//! - `UPGRADE <version>` - start a firmware upgrade
//! - `REBOOT` - reboot the FX30
//! - `ULPM <seconds>` - go into ultra low power mode

use crate::sms::message::{bounded, TEXT_MAX_LEN};

/// Longest accepted upgrade version code in bytes
pub const VERSION_CODE_MAX_LEN: usize = 255;

pub const MESSAGE_UPGRADE_SUCCESS: &str = "Upgrade started";
pub const MESSAGE_REBOOT_SUCCESS: &str = "Rebooting FX30";

const UPGRADE_PREFIX: &str = "UPGRADE ";
const REBOOT: &str = "REBOOT";
const ULPM_PREFIX: &str = "ULPM ";

/// A parsed SMS command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upgrade { version_code: String },
    Reboot,
    /// Not range checked here: only positive durations lead to a sleep
    Sleep { seconds: i32 },
    Unknown { raw_text: String },
}

impl Command {
    /// Parse a message body. Total: never fails.
    pub fn parse(body: &str) -> Self {
        if body.len() > TEXT_MAX_LEN {
            return Self::unknown(body);
        }

        if let Some(rest) = body.strip_prefix(UPGRADE_PREFIX) {
            if let Some(version_code) = first_token(rest) {
                if version_code.len() <= VERSION_CODE_MAX_LEN {
                    return Command::Upgrade {
                        version_code: version_code.to_string(),
                    };
                }
            }
        } else if body == REBOOT {
            return Command::Reboot;
        } else if let Some(rest) = body.strip_prefix(ULPM_PREFIX) {
            if let Some(seconds) = leading_int(rest) {
                return Command::Sleep { seconds };
            }
        }

        Self::unknown(body)
    }

    fn unknown(body: &str) -> Self {
        Command::Unknown {
            raw_text: body.to_string(),
        }
    }

    /// Text of the reply SMS, at most one SMS long
    pub fn reply_text(&self) -> String {
        let text = match self {
            Command::Upgrade { .. } => MESSAGE_UPGRADE_SUCCESS.to_string(),
            Command::Reboot => MESSAGE_REBOOT_SUCCESS.to_string(),
            Command::Sleep { seconds } => format!("Going into ULPM for {} seconds", seconds),
            Command::Unknown { raw_text } => {
                // Clip the echo first so the whole reply is never built oversize
                format!("Unknown command '{}'", bounded(raw_text, TEXT_MAX_LEN))
            }
        };
        bounded(&text, TEXT_MAX_LEN).to_string()
    }
}

/// Parse a message body into a command
pub fn parse(body: &str) -> Command {
    Command::parse(body)
}

/// Compose the reply for a command
pub fn compose(cmd: &Command) -> String {
    cmd.reply_text()
}

/// First whitespace-free token after optional leading whitespace
fn first_token(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

/// Leading decimal integer with optional sign, after optional whitespace.
/// Trailing text is ignored. Out-of-range values are rejected.
fn leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}
