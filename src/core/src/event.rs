use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

use crate::platform::PlatformDescriptor;

/// Event key type
pub type EventKey = &'static str;

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A service's image is about to be resolved
    ServicePinning { service: String, image: String },

    /// A service's image was rewritten to a digest reference
    ServicePinned {
        service: String,
        original: String,
        platforms: Vec<PlatformDescriptor>,
        pinned: String,
    },

    /// An ignore pattern excluded its first entry
    PatternIgnored { pattern: String, path: String },

    /// An entry was written into the bundle archive
    EntryArchived { name: String, size: u64 },

    /// The bundle blob was uploaded
    BlobUploaded { repository: String, digest: String, size: u64 },

    /// The bundle manifest was pushed
    ManifestPushed {
        repository: String,
        tag: String,
        digest: String,
    },
}

/// App event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEvent {
    /// Event payload
    pub payload: EventPayload,

    /// Timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AppEvent {
    /// Create a new event
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Catalog key of this event
    pub fn key(&self) -> EventKey {
        match self.payload {
            EventPayload::ServicePinning { .. } => events::SERVICE_PINNING,
            EventPayload::ServicePinned { .. } => events::SERVICE_PINNED,
            EventPayload::PatternIgnored { .. } => events::ARCHIVE_PATTERN_IGNORED,
            EventPayload::EntryArchived { .. } => events::ARCHIVE_ENTRY_WRITTEN,
            EventPayload::BlobUploaded { .. } => events::PUBLISH_BLOB_UPLOADED,
            EventPayload::ManifestPushed { .. } => events::PUBLISH_MANIFEST_PUSHED,
        }
    }
}

/// Event emitter
#[derive(Clone)]
pub struct EventEmitter {
    sender: Arc<broadcast::Sender<AppEvent>>,
    sinks: Arc<Mutex<Vec<mpsc::UnboundedSender<AppEvent>>>>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventEmitter {
    /// Create a new event emitter
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Emit an event. Dropped when nobody is subscribed.
    pub fn emit(&self, payload: EventPayload) {
        let event = AppEvent::new(payload);
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.retain(|sink| sink.send(event.clone()).is_ok());
        }
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Slow receivers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Subscribe without loss: every event emitted after this call is
    /// delivered. The receiver closes once all emitter clones are dropped.
    pub fn subscribe_unbounded(&self) -> mpsc::UnboundedReceiver<AppEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(tx);
        }
        rx
    }
}

/// Event catalog - predefined event keys
pub mod events {
    // Pin events
    pub const SERVICE_PINNING: &str = "pin.service.started";
    pub const SERVICE_PINNED: &str = "pin.service.pinned";

    // Archive events
    pub const ARCHIVE_PATTERN_IGNORED: &str = "archive.pattern.ignored";
    pub const ARCHIVE_ENTRY_WRITTEN: &str = "archive.entry.written";

    // Publish events
    pub const PUBLISH_BLOB_UPLOADED: &str = "publish.blob.uploaded";
    pub const PUBLISH_MANIFEST_PUSHED: &str = "publish.manifest.pushed";
}
