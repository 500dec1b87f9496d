//! Status and progress notifications for the presentation layer.
//!
//! The synchronizer never touches UI state directly. It publishes
//! [`LibraryEvent`]s on a `tokio::sync::broadcast` channel and any number
//! of consumers subscribe. A slow subscriber may see
//! `RecvError::Lagged`; progress events are superseded by later ones, so
//! skipping them is harmless.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Library status as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LibraryStatus {
    /// Nothing checked yet
    #[default]
    Initial,
    Authorized,
    Restricted { message: String },
    Denied { message: String },
    /// The store holds a complete, committed library
    DataAvailable,
    StorageError { message: String },
}

impl LibraryStatus {
    /// Message payload for variants that carry one.
    pub fn message(&self) -> Option<&str> {
        match self {
            LibraryStatus::Restricted { message }
            | LibraryStatus::Denied { message }
            | LibraryStatus::StorageError { message } => Some(message),
            _ => None,
        }
    }
}

/// Phase of a synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Clearing,
    Importing,
    Finalizing,
}

/// Progress of the three import stages, each a fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SyncProgress {
    pub composers: f64,
    pub albums: f64,
    pub playlists: f64,
}

/// A notification published by the library core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LibraryEvent {
    Status(LibraryStatus),
    Phase(SyncPhase),
    Progress(SyncProgress),
    /// Some tracks had no asset on the device; dismissible notice
    DataMissing,
    /// The source changed since the last synchronization; prompt to reload
    LibraryChanged,
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<LibraryEvent>,
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: LibraryEvent) {
        let _ = self.tx.send(event);
    }

    pub fn status(&self, status: LibraryStatus) {
        tracing::debug!(target: "sync", ?status, "Status");
        self.publish(LibraryEvent::Status(status));
    }

    pub fn phase(&self, phase: SyncPhase) {
        tracing::debug!(target: "sync", ?phase, "Phase");
        self.publish(LibraryEvent::Phase(phase));
    }

    pub fn progress(&self, progress: SyncProgress) {
        self.publish(LibraryEvent::Progress(progress));
    }
}
