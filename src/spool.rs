//! File spool SMS service
//!
//! A modem daemon drops each received SMS as a JSON file in `inbox/`; replies are
//! queued as JSON files in `outbox/` for it to transmit. An inbox file that still does
//! not parse after [`PARTIAL_WRITE_GRACE`] is moved to `rejected/`.
//!
//! ```text
//! inbox/0001.json   {"sender": "+64211234567", "text": "REBOOT"}
//! outbox/<time>-<ref>.json   {"destination": "+64211234567", "text": "Rebooting FX30", "queued_at": "..."}
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::ProcessRunner;
use crate::sms::controller::SmsController;
use crate::sms::message::{MessageFormat, PHONE_NUM_MAX_LEN, TEXT_MAX_LEN};
use crate::sms::service::{
    FullStorageHandlerRef, MsgRef, RxHandlerRef, SmsFault, SmsResult, SmsService, Storage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

/// How long an unparseable inbox file is retried before it is moved to `rejected/`
pub const PARTIAL_WRITE_GRACE: Duration = Duration::from_secs(60);

/// A received message as spooled by the modem daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxRecord {
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub format: MessageFormat,
}

/// A message queued for transmission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub destination: String,
    pub text: String,
    pub queued_at: DateTime<Utc>,
}

/// Event raised by [`SpoolSmsService::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolEvent {
    MessageReceived(MsgRef),
    StorageFull(Storage),
}

struct Received {
    path: PathBuf,
    record: InboxRecord,
    timestamp: String,
}

#[derive(Default)]
struct Draft {
    destination: Option<String>,
    text: Option<String>,
}

pub struct SpoolSmsService {
    inbox: PathBuf,
    outbox: PathBuf,
    rejected: PathBuf,
    capacity: usize,
    next_id: u64,
    rx_handlers: HashSet<RxHandlerRef>,
    storage_handlers: HashSet<FullStorageHandlerRef>,
    received: HashMap<MsgRef, Received>,
    drafts: HashMap<MsgRef, Draft>,
    delivered: HashSet<PathBuf>,
    storage_full_reported: bool,
}

impl SpoolSmsService {
    /// Open (creating if needed) the spool under `config.spool_dir`
    pub fn open(config: &Config) -> Result<Self> {
        if config.storage_capacity == 0 {
            return Err(Error::Config("storage_capacity must be at least 1".to_string()));
        }

        let inbox = config.spool_dir.join("inbox");
        let outbox = config.spool_dir.join("outbox");
        fs::create_dir_all(&inbox)?;
        fs::create_dir_all(&outbox)?;

        Ok(Self {
            inbox,
            outbox,
            rejected: config.spool_dir.join("rejected"),
            capacity: config.storage_capacity,
            next_id: 0,
            rx_handlers: HashSet::new(),
            storage_handlers: HashSet::new(),
            received: HashMap::new(),
            drafts: HashMap::new(),
            delivered: HashSet::new(),
            storage_full_reported: false,
        })
    }

    pub fn inbox_dir(&self) -> &Path {
        &self.inbox
    }

    pub fn outbox_dir(&self) -> &Path {
        &self.outbox
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Inbox files in arrival (file name) order
    fn inbox_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.inbox)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Scan the inbox and return events for the current subscriptions
    pub fn poll(&mut self) -> Result<Vec<SpoolEvent>> {
        let files = self.inbox_files()?;
        let mut events = Vec::new();

        self.delivered.retain(|p| files.contains(p));

        if files.len() >= self.capacity {
            if !self.storage_full_reported && !self.storage_handlers.is_empty() {
                events.push(SpoolEvent::StorageFull(Storage::Sim));
                self.storage_full_reported = true;
            }
        } else {
            self.storage_full_reported = false;
        }

        if self.rx_handlers.is_empty() {
            return Ok(events);
        }

        for path in files {
            if self.delivered.contains(&path) {
                continue;
            }

            // Not marked delivered until it parses: the modem may still be writing it
            let record = match read_inbox_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    self.reject_if_stale(&path, &e);
                    continue;
                }
            };
            self.delivered.insert(path.clone());

            let timestamp = match &record.timestamp {
                Some(ts) => ts.clone(),
                None => modified_timestamp(&path),
            };

            let msg = MsgRef(self.next_id());
            debug!("Spooled message {} -> ref.{}", path.display(), msg.0);
            self.received.insert(
                msg,
                Received {
                    path,
                    record,
                    timestamp,
                },
            );
            events.push(SpoolEvent::MessageReceived(msg));
        }

        Ok(events)
    }

    /// Move an inbox file that has stayed unparseable past [`PARTIAL_WRITE_GRACE`]
    /// into `rejected/`. Younger files are left for the next poll.
    fn reject_if_stale(&self, path: &Path, err: &Error) {
        let age = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok());

        match age {
            Some(age) if age >= PARTIAL_WRITE_GRACE => {
                warn!("Rejecting unreadable spool file {}: {}", path.display(), err);
                if let Err(e) = self.move_to_rejected(path) {
                    warn!("Could not move {} aside: {}", path.display(), e);
                }
            }
            _ => debug!("Spool file {} not readable yet: {}", path.display(), err),
        }
    }

    fn move_to_rejected(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .ok_or_else(|| Error::Config(format!("bad spool path {}", path.display())))?;
        fs::create_dir_all(&self.rejected)?;
        fs::rename(path, self.rejected.join(name))?;
        Ok(())
    }

    /// Messages queued for transmission, oldest first
    pub fn read_outbox(&self) -> Result<Vec<OutboxRecord>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.outbox)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut records = Vec::with_capacity(files.len());
        for path in files {
            let content = fs::read_to_string(&path)?;
            records.push(serde_json::from_str(&content)?);
        }
        Ok(records)
    }

    fn received(&self, msg: MsgRef) -> SmsResult<&Received> {
        self.received.get(&msg).ok_or(SmsFault::NotFound)
    }

    fn write_outbox(&self, msg: MsgRef, record: &OutboxRecord) -> Result<()> {
        let name = format!(
            "{}-{:06}.json",
            record.queued_at.format("%Y%m%dT%H%M%S%.6f"),
            msg.0
        );
        let mut temp = NamedTempFile::new_in(&self.outbox)?;

        let json = serde_json::to_string_pretty(record)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;

        temp.persist(self.outbox.join(name))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl SmsService for SpoolSmsService {
    fn add_rx_message_handler(&mut self) -> Option<RxHandlerRef> {
        let handler = RxHandlerRef(self.next_id());
        self.rx_handlers.insert(handler);
        Some(handler)
    }

    fn remove_rx_message_handler(&mut self, handler: RxHandlerRef) {
        self.rx_handlers.remove(&handler);
    }

    fn add_full_storage_handler(&mut self) -> Option<FullStorageHandlerRef> {
        let handler = FullStorageHandlerRef(self.next_id());
        self.storage_handlers.insert(handler);
        Some(handler)
    }

    fn remove_full_storage_handler(&mut self, handler: FullStorageHandlerRef) {
        self.storage_handlers.remove(&handler);
    }

    fn format(&self, msg: MsgRef) -> MessageFormat {
        self.received(msg)
            .map(|r| r.record.format)
            .unwrap_or(MessageFormat::Unknown)
    }

    fn sender_tel(&self, msg: MsgRef) -> SmsResult<String> {
        let sender = &self.received(msg)?.record.sender;
        if sender.len() > PHONE_NUM_MAX_LEN {
            return Err(SmsFault::Overflow);
        }
        Ok(sender.clone())
    }

    fn timestamp(&self, msg: MsgRef) -> SmsResult<String> {
        Ok(self.received(msg)?.timestamp.clone())
    }

    /// The whole body, even past [`TEXT_MAX_LEN`], so an oversize message parses as
    /// unknown and still gets a reply
    fn text(&self, msg: MsgRef) -> SmsResult<String> {
        Ok(self.received(msg)?.record.text.clone())
    }

    fn delete_from_storage(&mut self, msg: MsgRef) -> SmsResult<()> {
        let path = &self.received(msg)?.path;
        fs::remove_file(path).map_err(|e| {
            warn!("Could not remove {}: {}", path.display(), e);
            SmsFault::Fault
        })
    }

    fn release(&mut self, msg: MsgRef) {
        self.received.remove(&msg);
        self.drafts.remove(&msg);
    }

    fn create(&mut self) -> Option<MsgRef> {
        let msg = MsgRef(self.next_id());
        self.drafts.insert(msg, Draft::default());
        Some(msg)
    }

    fn set_destination(&mut self, msg: MsgRef, destination: &str) -> SmsResult<()> {
        let draft = self.drafts.get_mut(&msg).ok_or(SmsFault::NotFound)?;
        if !is_valid_destination(destination) {
            return Err(SmsFault::BadParameter);
        }
        draft.destination = Some(destination.to_string());
        Ok(())
    }

    fn set_text(&mut self, msg: MsgRef, text: &str) -> SmsResult<()> {
        let draft = self.drafts.get_mut(&msg).ok_or(SmsFault::NotFound)?;
        if text.len() > TEXT_MAX_LEN {
            return Err(SmsFault::Overflow);
        }
        draft.text = Some(text.to_string());
        Ok(())
    }

    fn send(&mut self, msg: MsgRef) -> SmsResult<()> {
        let draft = self.drafts.get(&msg).ok_or(SmsFault::NotFound)?;
        let (destination, text) = match (&draft.destination, &draft.text) {
            (Some(d), Some(t)) => (d.clone(), t.clone()),
            _ => return Err(SmsFault::FormatError),
        };

        let record = OutboxRecord {
            destination,
            text,
            queued_at: Utc::now(),
        };
        self.write_outbox(msg, &record).map_err(|e| {
            warn!("Could not queue message ref.{}: {}", msg.0, e);
            SmsFault::Fault
        })
    }
}

/// Register `controller` with `service`, dispatch spool events until `stop` is set
/// (or after one pass when `once`), then unregister both handlers.
pub fn serve<R: ProcessRunner>(
    service: &mut SpoolSmsService,
    controller: &mut SmsController<R>,
    poll_interval: Duration,
    stop: &AtomicBool,
    once: bool,
) -> Result<()> {
    controller.register_receive_handler(service)?;
    if let Err(e) = controller.register_storage_full_handler(service) {
        controller.unregister_receive_handler(service);
        return Err(e);
    }
    info!("Watching {}", service.inbox_dir().display());

    loop {
        match service.poll() {
            Ok(events) => {
                for event in events {
                    match event {
                        SpoolEvent::MessageReceived(msg) => {
                            controller.on_message_received(service, msg);
                        }
                        SpoolEvent::StorageFull(storage) => controller.on_storage_full(storage),
                    }
                }
            }
            Err(e) => {
                error!("Failed to poll the SMS spool: {}", e);
            }
        }

        if once || stop.load(Ordering::SeqCst) {
            break;
        }

        std::thread::sleep(poll_interval);
    }

    controller.unregister_receive_handler(service);
    controller.unregister_storage_full_handler(service);
    Ok(())
}

fn read_inbox_record(path: &Path) -> Result<InboxRecord> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Modification time in the modem's `yy/MM/dd,hh:mm:ss+zz` form
fn modified_timestamp(path: &Path) -> String {
    let modified: DateTime<Utc> = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    modified.format("%y/%m/%d,%H:%M:%S+00").to_string()
}

/// Digits with an optional leading '+', within the phone number bound
pub fn is_valid_destination(destination: &str) -> bool {
    let digits = destination.strip_prefix('+').unwrap_or(destination);
    !digits.is_empty()
        && destination.len() <= PHONE_NUM_MAX_LEN
        && digits.bytes().all(|b| b.is_ascii_digit())
}
