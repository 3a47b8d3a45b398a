//! SMS handling: inbound messages, outbound replies and the host telephony service

pub mod controller;
pub mod message;
pub mod outbound;
pub mod service;

pub use controller::SmsController;
pub use message::{InboundMessage, MessageFormat, OutboundReply};
pub use service::{MsgRef, SmsFault, SmsService, Storage};
