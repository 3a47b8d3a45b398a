//! Host telephony service
//!
//! The capability the controller needs from the platform's SMS stack: event
//! subscriptions, reading and deleting received messages, and building outbound ones.

use crate::sms::message::MessageFormat;

/// Opaque reference to a message held by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgRef(pub u64);

/// Subscription to "message received" events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RxHandlerRef(pub u64);

/// Subscription to "storage full" events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FullStorageHandlerRef(pub u64);

/// Which message store filled up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    None,
    Nv,
    Sim,
}

impl std::fmt::Display for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Storage::None => write!(f, "none"),
            Storage::Nv => write!(f, "nv"),
            Storage::Sim => write!(f, "sim"),
        }
    }
}

/// Result code of a rejected telephony call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsFault {
    Fault,
    Overflow,
    BadParameter,
    NotFound,
    FormatError,
    Unavailable,
}

impl std::fmt::Display for SmsFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmsFault::Fault => write!(f, "fault"),
            SmsFault::Overflow => write!(f, "overflow"),
            SmsFault::BadParameter => write!(f, "bad_parameter"),
            SmsFault::NotFound => write!(f, "not_found"),
            SmsFault::FormatError => write!(f, "format_error"),
            SmsFault::Unavailable => write!(f, "unavailable"),
        }
    }
}

pub type SmsResult<T> = std::result::Result<T, SmsFault>;

/// Telephony/SMS capability of the host
pub trait SmsService {
    /// Subscribe to received messages. `None` when the host refuses.
    fn add_rx_message_handler(&mut self) -> Option<RxHandlerRef>;
    fn remove_rx_message_handler(&mut self, handler: RxHandlerRef);

    /// Subscribe to storage-full notifications. `None` when the host refuses.
    fn add_full_storage_handler(&mut self) -> Option<FullStorageHandlerRef>;
    fn remove_full_storage_handler(&mut self, handler: FullStorageHandlerRef);

    fn format(&self, msg: MsgRef) -> MessageFormat;
    fn sender_tel(&self, msg: MsgRef) -> SmsResult<String>;
    fn timestamp(&self, msg: MsgRef) -> SmsResult<String>;
    fn text(&self, msg: MsgRef) -> SmsResult<String>;

    /// Remove a received message from persistent storage
    fn delete_from_storage(&mut self, msg: MsgRef) -> SmsResult<()>;

    /// Release a message reference, received or created
    fn release(&mut self, msg: MsgRef);

    /// Allocate an outbound message. `None` when no message can be created.
    fn create(&mut self) -> Option<MsgRef>;
    fn set_destination(&mut self, msg: MsgRef, destination: &str) -> SmsResult<()>;
    fn set_text(&mut self, msg: MsgRef, text: &str) -> SmsResult<()>;
    fn send(&mut self, msg: MsgRef) -> SmsResult<()>;
}
