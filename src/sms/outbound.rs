//! Outbound (mobile-originated) SMS helper

use crate::error::SendError;
use crate::sms::message::OutboundReply;
use crate::sms::service::{MsgRef, SmsService};
use tracing::{error, info};

/// A created message that is released when dropped, whatever happened to it
struct ScopedMessage<'a, S: SmsService + ?Sized> {
    service: &'a mut S,
    msg: MsgRef,
}

impl<S: SmsService + ?Sized> Drop for ScopedMessage<'_, S> {
    fn drop(&mut self) {
        self.service.release(self.msg);
    }
}

/// Build and send one SMS. No retry.
pub fn send_message<S: SmsService + ?Sized>(
    service: &mut S,
    destination: &str,
    text: &str,
) -> Result<(), SendError> {
    let msg = match service.create() {
        Some(msg) => msg,
        None => {
            error!("SMS message creation has failed!");
            return Err(SendError::CreationFailed);
        }
    };
    let mut scoped = ScopedMessage { service, msg };

    scoped
        .service
        .set_destination(scoped.msg, destination)
        .map_err(|fault| {
            error!("set_destination has failed ({})!", fault);
            SendError::InvalidDestination(fault)
        })?;

    scoped.service.set_text(scoped.msg, text).map_err(|fault| {
        error!("set_text has failed ({})!", fault);
        SendError::InvalidText(fault)
    })?;

    scoped.service.send(scoped.msg).map_err(|fault| {
        error!("send has failed ({})!", fault);
        SendError::SendFailed(fault)
    })?;

    info!("\"{}\" has been successfully sent to {}.", text, destination);
    Ok(())
}

/// Send a composed reply
pub fn send_reply<S: SmsService + ?Sized>(
    service: &mut S,
    reply: &OutboundReply,
) -> Result<(), SendError> {
    send_message(service, &reply.destination, &reply.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sms::message::MessageFormat;
    use crate::sms::service::{FullStorageHandlerRef, RxHandlerRef, SmsFault, SmsResult};

    /// Fails the configured step and counts creations and releases
    #[derive(Default)]
    struct FlakyService {
        refuse_create: bool,
        fail_at: Option<&'static str>,
        created: u32,
        released: Vec<MsgRef>,
        sent: Vec<(String, String)>,
        destination: String,
        text: String,
    }

    impl FlakyService {
        fn failing(step: &'static str) -> Self {
            Self {
                fail_at: Some(step),
                ..Default::default()
            }
        }

        fn check(&self, step: &str) -> SmsResult<()> {
            if self.fail_at == Some(step) {
                Err(SmsFault::BadParameter)
            } else {
                Ok(())
            }
        }
    }

    impl SmsService for FlakyService {
        fn add_rx_message_handler(&mut self) -> Option<RxHandlerRef> {
            None
        }
        fn remove_rx_message_handler(&mut self, _handler: RxHandlerRef) {}
        fn add_full_storage_handler(&mut self) -> Option<FullStorageHandlerRef> {
            None
        }
        fn remove_full_storage_handler(&mut self, _handler: FullStorageHandlerRef) {}
        fn format(&self, _msg: MsgRef) -> MessageFormat {
            MessageFormat::Text
        }
        fn sender_tel(&self, _msg: MsgRef) -> SmsResult<String> {
            Err(SmsFault::NotFound)
        }
        fn timestamp(&self, _msg: MsgRef) -> SmsResult<String> {
            Err(SmsFault::NotFound)
        }
        fn text(&self, _msg: MsgRef) -> SmsResult<String> {
            Err(SmsFault::NotFound)
        }
        fn delete_from_storage(&mut self, _msg: MsgRef) -> SmsResult<()> {
            Ok(())
        }
        fn release(&mut self, msg: MsgRef) {
            self.released.push(msg);
        }
        fn create(&mut self) -> Option<MsgRef> {
            if self.refuse_create {
                return None;
            }
            self.created += 1;
            Some(MsgRef(self.created as u64))
        }
        fn set_destination(&mut self, _msg: MsgRef, destination: &str) -> SmsResult<()> {
            self.check("destination")?;
            self.destination = destination.to_string();
            Ok(())
        }
        fn set_text(&mut self, _msg: MsgRef, text: &str) -> SmsResult<()> {
            self.check("text")?;
            self.text = text.to_string();
            Ok(())
        }
        fn send(&mut self, _msg: MsgRef) -> SmsResult<()> {
            self.check("send")?;
            self.sent.push((self.destination.clone(), self.text.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_send_success_releases() {
        let mut svc = FlakyService::default();
        send_message(&mut svc, "+64211234567", "Rebooting FX30").unwrap();

        assert_eq!(
            svc.sent,
            vec![("+64211234567".to_string(), "Rebooting FX30".to_string())]
        );
        assert_eq!(svc.released, vec![MsgRef(1)]);
    }

    #[test]
    fn test_creation_failed() {
        let mut svc = FlakyService {
            refuse_create: true,
            ..Default::default()
        };
        let err = send_message(&mut svc, "+64211234567", "hi").unwrap_err();
        assert_eq!(err, SendError::CreationFailed);
        assert!(svc.released.is_empty());
    }

    #[test]
    fn test_every_failure_releases() {
        let cases = [
            ("destination", SendError::InvalidDestination(SmsFault::BadParameter)),
            ("text", SendError::InvalidText(SmsFault::BadParameter)),
            ("send", SendError::SendFailed(SmsFault::BadParameter)),
        ];

        for (step, expected) in cases {
            let mut svc = FlakyService::failing(step);
            let err = send_message(&mut svc, "+64211234567", "hi").unwrap_err();
            assert_eq!(err, expected, "step {}", step);
            assert_eq!(svc.released, vec![MsgRef(1)], "step {}", step);
            assert!(svc.sent.is_empty());
        }
    }

    #[test]
    fn test_send_reply() {
        let mut svc = FlakyService::default();
        let reply = OutboundReply::new("+64211234567", "Upgrade started");
        send_reply(&mut svc, &reply).unwrap();
        assert_eq!(svc.sent[0].1, "Upgrade started");
    }
}
