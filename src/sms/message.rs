//! Message types and the text bounds of the cellular platform

use serde::{Deserialize, Serialize};

/// Longest phone number in bytes
pub const PHONE_NUM_MAX_LEN: usize = 17;

/// Longest SMS timestamp in bytes
pub const TIMESTAMP_MAX_LEN: usize = 20;

/// Longest SMS text in bytes
pub const TEXT_MAX_LEN: usize = 160;

/// Encoding of a received SMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    Pdu,
    #[default]
    Text,
    Binary,
    Ucs2,
    Unknown,
}

/// A received (mobile-terminated) text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub timestamp: String,
    pub text: String,
    pub format: MessageFormat,
}

impl InboundMessage {
    /// Build a message, clipping sender and timestamp to their platform bounds.
    /// The text is kept whole so an oversize body can be told apart from a command.
    pub fn new(sender: &str, timestamp: &str, text: &str) -> Self {
        Self {
            sender: bounded(sender, PHONE_NUM_MAX_LEN).to_string(),
            timestamp: bounded(timestamp, TIMESTAMP_MAX_LEN).to_string(),
            text: text.to_string(),
            format: MessageFormat::Text,
        }
    }
}

/// A reply to send back to the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub destination: String,
    pub text: String,
}

impl OutboundReply {
    pub fn new(destination: &str, text: &str) -> Self {
        Self {
            destination: destination.to_string(),
            text: bounded(text, TEXT_MAX_LEN).to_string(),
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character
pub fn bounded(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
