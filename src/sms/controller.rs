//! SMS command controller
//!
//! Handles mobile-terminated messages: read, parse, reply, delete, then act.
//! The host delivers events one at a time; nothing here is reentrant.

use crate::actions::{Action, ActionDispatcher};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::process::ProcessRunner;
use crate::sms::message::InboundMessage;
use crate::sms::outbound;
use crate::sms::service::{
    FullStorageHandlerRef, MsgRef, RxHandlerRef, SmsResult, SmsService, Storage,
};
use crate::sms::{MessageFormat, OutboundReply};
use tracing::{error, info, warn};

/// What happened to one received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    pub message: Option<InboundMessage>,
    pub command: Option<Command>,
    pub reply: Option<OutboundReply>,
    pub reply_sent: bool,
    pub deleted: bool,
    pub action: Option<Action>,
}

/// Owns the handler registrations and the action dispatcher
pub struct SmsController<R: ProcessRunner> {
    rx_handler: Option<RxHandlerRef>,
    full_storage_handler: Option<FullStorageHandlerRef>,
    actions: ActionDispatcher<R>,
}

impl<R: ProcessRunner> SmsController<R> {
    pub fn new(actions: ActionDispatcher<R>) -> Self {
        Self {
            rx_handler: None,
            full_storage_handler: None,
            actions,
        }
    }

    pub fn actions(&self) -> &ActionDispatcher<R> {
        &self.actions
    }

    pub fn is_receiving(&self) -> bool {
        self.rx_handler.is_some()
    }

    pub fn is_monitoring_storage(&self) -> bool {
        self.full_storage_handler.is_some()
    }

    /// Subscribe to received messages
    pub fn register_receive_handler<S: SmsService + ?Sized>(
        &mut self,
        service: &mut S,
    ) -> Result<()> {
        match service.add_rx_message_handler() {
            Some(handler) => {
                self.rx_handler = Some(handler);
                Ok(())
            }
            None => {
                error!("add_rx_message_handler has failed!");
                Err(Error::RegistrationFailed("add_rx_message_handler"))
            }
        }
    }

    /// Subscribe to storage-full notifications
    pub fn register_storage_full_handler<S: SmsService + ?Sized>(
        &mut self,
        service: &mut S,
    ) -> Result<()> {
        match service.add_full_storage_handler() {
            Some(handler) => {
                self.full_storage_handler = Some(handler);
                Ok(())
            }
            None => {
                error!("add_full_storage_handler has failed!");
                Err(Error::RegistrationFailed("add_full_storage_handler"))
            }
        }
    }

    /// Remove the receive subscription. Does nothing if none is held.
    pub fn unregister_receive_handler<S: SmsService + ?Sized>(&mut self, service: &mut S) {
        if let Some(handler) = self.rx_handler.take() {
            service.remove_rx_message_handler(handler);
        }
    }

    /// Remove the storage-full subscription. Does nothing if none is held.
    pub fn unregister_storage_full_handler<S: SmsService + ?Sized>(&mut self, service: &mut S) {
        if let Some(handler) = self.full_storage_handler.take() {
            service.remove_full_storage_handler(handler);
        }
    }

    /// Handle one received message.
    ///
    /// The reply is sent and the message deleted and released before any action is
    /// launched: a reboot or sleep would otherwise cut off the confirmation SMS.
    pub fn on_message_received<S: SmsService + ?Sized>(
        &self,
        service: &mut S,
        msg: MsgRef,
    ) -> Handled {
        info!("A New SMS message is received with ref.{}", msg.0);

        let mut handled = Handled {
            message: None,
            command: None,
            reply: None,
            reply_sent: false,
            deleted: false,
            action: None,
        };

        if service.format(msg) == MessageFormat::Text {
            let sender = read_field(service.sender_tel(msg), "sender_tel");
            if let Some(tel) = &sender {
                info!("Message is received from {}.", tel);
            }

            let timestamp = read_field(service.timestamp(msg), "timestamp");
            if let Some(ts) = &timestamp {
                info!("Message timestamp is {}.", ts);
            }

            if let Some(text) = read_field(service.text(msg), "text") {
                info!("Message content: \"{}\"", text);
                handled.command = Some(Command::parse(&text));
                handled.message = Some(InboundMessage::new(
                    sender.as_deref().unwrap_or_default(),
                    timestamp.as_deref().unwrap_or_default(),
                    &text,
                ));
            }

            match (&sender, &handled.command) {
                (Some(tel), Some(command)) => {
                    let reply = OutboundReply::new(tel, &command.reply_text());
                    match outbound::send_reply(service, &reply) {
                        Ok(()) => {
                            info!("The message has been successfully sent.");
                            handled.reply_sent = true;
                        }
                        Err(e) => error!("send_reply has failed ({})!", e),
                    }
                    handled.reply = Some(reply);
                }
                _ => warn!("No reply sent: sender or text could not be read"),
            }

            match service.delete_from_storage(msg) {
                Ok(()) => {
                    info!("the message has been successfully deleted from storage.");
                    handled.deleted = true;
                }
                Err(fault) => error!("delete_from_storage has failed ({})!", fault),
            }
        } else {
            warn!("Warning! I read only Text messages!");
        }

        service.release(msg);

        if let Some(command) = &handled.command {
            handled.action = self.actions.perform(command);
        }

        handled
    }

    pub fn on_storage_full(&self, storage: Storage) {
        info!(
            "A Full storage SMS message is received. Type of full storage {}",
            storage
        );
    }
}

fn read_field(result: SmsResult<String>, op: &str) -> Option<String> {
    match result {
        Ok(value) => Some(value),
        Err(fault) => {
            error!("{} has failed ({})!", op, fault);
            None
        }
    }
}
