//! The media library service.
//!
//! [`MediaLibrary`] is constructed once at startup and handed to whoever
//! needs it. It owns the store and source handles, the event channel and
//! the cached checkpoint, and guarantees that at most one synchronization
//! runs at a time.
//!
//! # Startup flow
//!
//! ```text
//! check_access ──► Authorized ──► check_for_changes
//!                                   ├─ NoPriorData ─► synchronize ─► DataAvailable
//!                                   ├─ UpToDate ────► DataAvailable
//!                                   └─ Changed ─────► DataAvailable + LibraryChanged
//! ```
//!
//! # Example
//!
//! ```ignore
//! use classical_library::library::MediaLibrary;
//!
//! let library = Arc::new(MediaLibrary::new(store, source));
//! let mut events = library.subscribe();
//! library.open().await?;
//! ```

mod detector;
mod events;
mod store;
mod sync;

pub use detector::{LibraryChange, check_for_changes};
pub use events::{
    DEFAULT_CAPACITY, EventPublisher, LibraryEvent, LibraryStatus, SyncPhase, SyncProgress,
};
pub use store::{EntityKind, LibraryStore, StoreTransaction};
pub use sync::{SENTINEL_GENRE, SyncReport, Synchronizer};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::LibraryCheckpoint;
use crate::parser::TitleParser;
use crate::source::{Authorization, MediaSource};

/// Shown when corporate or parental controls block access.
pub const RESTRICTED_MESSAGE: &str = "Media library access restricted by corporate or parental controls";

/// Shown when the user refused access.
pub const DENIED_MESSAGE: &str = "Please give ClassicalPlayer access to your Media Library and restart it.";

/// Resets the in-flight flag when a run ends, however it ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Service object tying source, store and event channel together.
pub struct MediaLibrary {
    store: Arc<dyn LibraryStore>,
    source: Arc<dyn MediaSource>,
    parser: TitleParser,
    config: SyncConfig,
    events: EventPublisher,
    status: RwLock<LibraryStatus>,
    info: RwLock<Option<LibraryCheckpoint>>,
    syncing: AtomicBool,
}

impl MediaLibrary {
    pub fn new(store: Arc<dyn LibraryStore>, source: Arc<dyn MediaSource>) -> Self {
        Self {
            store,
            source,
            parser: TitleParser::new(),
            config: SyncConfig::default(),
            events: EventPublisher::default(),
            status: RwLock::new(LibraryStatus::Initial),
            info: RwLock::new(None),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_parser(mut self, parser: TitleParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.events.subscribe()
    }

    /// Last published status.
    pub fn status(&self) -> LibraryStatus {
        self.status.read().clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Cached checkpoint from the last [`refresh_info`](Self::refresh_info)
    /// or synchronization; never touches entity tables.
    pub fn library_info(&self) -> Option<LibraryCheckpoint> {
        self.info.read().clone()
    }

    /// Reload the cached checkpoint from the store.
    pub async fn refresh_info(&self) -> Result<Option<LibraryCheckpoint>> {
        let checkpoint = self.store.checkpoint().await?;
        *self.info.write() = checkpoint.clone();
        Ok(checkpoint)
    }

    fn set_status(&self, status: LibraryStatus) {
        *self.status.write() = status.clone();
        self.events.status(status);
    }

    /// Map the source's authorization to a status and publish it.
    ///
    /// Not-determined leaves the status at `Initial` and publishes nothing.
    pub fn check_access(&self) -> LibraryStatus {
        let status = match self.source.authorization() {
            Authorization::NotDetermined => return self.status(),
            Authorization::Authorized => LibraryStatus::Authorized,
            Authorization::Restricted => LibraryStatus::Restricted {
                message: RESTRICTED_MESSAGE.to_string(),
            },
            Authorization::Denied => LibraryStatus::Denied {
                message: DENIED_MESSAGE.to_string(),
            },
        };
        tracing::info!(?status, "Media library access checked");
        self.set_status(status.clone());
        status
    }

    /// Compare the stored checkpoint with the source.
    pub async fn check_for_changes(&self) -> Result<LibraryChange> {
        check_for_changes(self.store.as_ref(), self.source.as_ref()).await
    }

    /// Startup: access check, change detection, and an initial load if
    /// the store has never been filled.
    ///
    /// A refused access returns [`Error::AccessRefused`]; a corrupt
    /// checkpoint publishes `StorageError` and returns the error.
    pub async fn open(&self) -> Result<LibraryStatus> {
        match self.check_access() {
            LibraryStatus::Authorized => {}
            LibraryStatus::Initial => {
                return Err(Error::AccessRefused(
                    "media library authorization not determined".to_string(),
                ));
            }
            other => {
                let message = other.message().unwrap_or_default().to_string();
                return Err(Error::AccessRefused(message));
            }
        }

        let change = self.check_for_changes().await;
        let change = self.or_storage_error(change)?;

        match change {
            LibraryChange::NoPriorData => {
                self.synchronize().await?;
            }
            LibraryChange::UpToDate => {
                let info = self.refresh_info().await;
                self.or_storage_error(info)?;
                self.set_status(LibraryStatus::DataAvailable);
            }
            LibraryChange::Changed(_) => {
                let info = self.refresh_info().await;
                self.or_storage_error(info)?;
                self.set_status(LibraryStatus::DataAvailable);
                self.events.publish(LibraryEvent::LibraryChanged);
            }
        }
        Ok(self.status())
    }

    /// Publish `StorageError` for a failed store read before handing the error back.
    fn or_storage_error<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.set_status(LibraryStatus::StorageError {
                message: e.to_string(),
            });
        }
        result
    }

    /// Run a full resynchronization now.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadySyncing`] if another run is in flight (that run is
    /// unaffected); otherwise whatever the run failed with.
    pub async fn synchronize(&self) -> Result<SyncReport> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(target: "sync", "Synchronization requested while one is running");
            return Err(Error::AlreadySyncing);
        }
        let _guard = SyncGuard(&self.syncing);

        let result = Synchronizer::new(
            self.source.as_ref(),
            self.store.as_ref(),
            &self.events,
            &self.parser,
        )
        .with_config(self.config.clone())
        .run()
        .await;

        match &result {
            Ok(report) => {
                *self.info.write() = Some(LibraryCheckpoint {
                    last_modified: Some(report.last_modified),
                    counts: report.counts,
                });
                *self.status.write() = LibraryStatus::DataAvailable;
            }
            Err(e) => {
                *self.status.write() = LibraryStatus::StorageError {
                    message: e.to_string(),
                };
            }
        }
        result
    }

    /// Run [`synchronize`](Self::synchronize) on a background task.
    pub fn spawn_synchronize(self: &Arc<Self>) -> JoinHandle<Result<SyncReport>> {
        let library = Arc::clone(self);
        tokio::spawn(async move { library.synchronize().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::source::{Catalog, CatalogSource};
    use crate::test_utils::{album, item, temp_db, ts};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn source(authorization: Authorization, modified: &str) -> Arc<CatalogSource> {
        Arc::new(CatalogSource::new(Catalog {
            authorization,
            albums: vec![album(1, vec![item(1, 1, "Symphony No. 5: I. Allegro")])],
            ..Catalog::empty(ts(modified))
        }))
    }

    fn drain(rx: &mut broadcast::Receiver<LibraryEvent>) -> Vec<LibraryEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_check_access_messages() {
        let (pool, _dir) = temp_db().await;
        let store = Arc::new(SqliteStore::new(pool));

        let cases = [
            (Authorization::Authorized, LibraryStatus::Authorized),
            (
                Authorization::Restricted,
                LibraryStatus::Restricted {
                    message: RESTRICTED_MESSAGE.to_string(),
                },
            ),
            (
                Authorization::Denied,
                LibraryStatus::Denied {
                    message: DENIED_MESSAGE.to_string(),
                },
            ),
            (Authorization::NotDetermined, LibraryStatus::Initial),
        ];
        for (authorization, expected) in cases {
            let library = MediaLibrary::new(store.clone(), source(authorization, "2021-01-01T00:00:00Z"));
            assert_eq!(library.check_access(), expected);
            assert_eq!(library.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_open_runs_initial_sync() {
        let (pool, _dir) = temp_db().await;
        let library = MediaLibrary::new(
            Arc::new(SqliteStore::new(pool)),
            source(Authorization::Authorized, "2021-01-01T00:00:00Z"),
        );
        let mut rx = library.subscribe();

        assert_eq!(library.open().await.unwrap(), LibraryStatus::DataAvailable);
        let info = library.library_info().unwrap();
        assert_eq!(info.counts.pieces, 1);
        assert_eq!(info.last_modified, Some(ts("2021-01-01T00:00:00Z")));
        assert!(!drain(&mut rx).contains(&LibraryEvent::LibraryChanged));
    }

    #[tokio::test]
    async fn test_open_prompts_when_source_changed() {
        let (pool, _dir) = temp_db().await;
        let store: Arc<dyn LibraryStore> = Arc::new(SqliteStore::new(pool));
        MediaLibrary::new(store.clone(), source(Authorization::Authorized, "2021-01-01T00:00:00Z"))
            .open()
            .await
            .unwrap();

        let library = MediaLibrary::new(store, source(Authorization::Authorized, "2021-06-01T00:00:00Z"));
        let mut rx = library.subscribe();
        assert_eq!(library.open().await.unwrap(), LibraryStatus::DataAvailable);

        let events = drain(&mut rx);
        assert!(events.contains(&LibraryEvent::LibraryChanged));
        assert!(!events.contains(&LibraryEvent::Phase(SyncPhase::Clearing)));
        // Cached info still describes the old import until the user reloads
        assert_eq!(
            library.library_info().unwrap().last_modified,
            Some(ts("2021-01-01T00:00:00Z"))
        );
    }

    #[tokio::test]
    async fn test_open_refused_access() {
        let (pool, _dir) = temp_db().await;
        let library = MediaLibrary::new(
            Arc::new(SqliteStore::new(pool)),
            source(Authorization::Denied, "2021-01-01T00:00:00Z"),
        );
        let err = library.open().await.unwrap_err();
        assert!(matches!(err, Error::AccessRefused(ref m) if m == DENIED_MESSAGE));
        assert!(library.library_info().is_none());
    }

    #[tokio::test]
    async fn test_open_with_corrupt_checkpoint() {
        let (pool, _dir) = temp_db().await;
        sqlx::query("INSERT INTO library_checkpoint (id, last_modified) VALUES (1, NULL)")
            .execute(&pool)
            .await
            .unwrap();
        let library = MediaLibrary::new(
            Arc::new(SqliteStore::new(pool)),
            source(Authorization::Authorized, "2021-01-01T00:00:00Z"),
        );

        assert!(library.open().await.is_err());
        assert!(matches!(library.status(), LibraryStatus::StorageError { .. }));
    }

    /// Store whose checkpoint reads fail after the first one.
    struct FlakyCheckpointStore {
        inner: SqliteStore,
        reads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LibraryStore for FlakyCheckpointStore {
        async fn checkpoint(&self) -> Result<Option<LibraryCheckpoint>> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.checkpoint().await
            } else {
                Err(Error::inconsistent("checkpoint row unreadable"))
            }
        }

        async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
            self.inner.begin().await
        }
    }

    #[tokio::test]
    async fn test_open_publishes_storage_error_when_info_reload_fails() {
        let (pool, _dir) = temp_db().await;
        MediaLibrary::new(
            Arc::new(SqliteStore::new(pool.clone())),
            source(Authorization::Authorized, "2021-01-01T00:00:00Z"),
        )
        .open()
        .await
        .unwrap();

        let library = MediaLibrary::new(
            Arc::new(FlakyCheckpointStore {
                inner: SqliteStore::new(pool),
                reads: std::sync::atomic::AtomicUsize::new(0),
            }),
            source(Authorization::Authorized, "2021-01-01T00:00:00Z"),
        );
        let mut rx = library.subscribe();

        assert!(library.open().await.is_err());
        assert!(matches!(library.status(), LibraryStatus::StorageError { .. }));
        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(LibraryEvent::Status(LibraryStatus::StorageError { .. }))
        ));
        assert!(!events.contains(&LibraryEvent::Status(LibraryStatus::DataAvailable)));
    }

    /// Store that parks inside `begin` until released.
    struct GatedStore {
        inner: SqliteStore,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl LibraryStore for GatedStore {
        async fn checkpoint(&self) -> Result<Option<LibraryCheckpoint>> {
            self.inner.checkpoint().await
        }

        async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.begin().await
        }
    }

    #[tokio::test]
    async fn test_concurrent_sync_is_rejected() {
        let (pool, _dir) = temp_db().await;
        let store = Arc::new(GatedStore {
            inner: SqliteStore::new(pool),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let library = Arc::new(MediaLibrary::new(
            store.clone(),
            source(Authorization::Authorized, "2021-01-01T00:00:00Z"),
        ));

        let first = library.spawn_synchronize();
        store.entered.notified().await;
        assert!(library.is_syncing());

        let second = library.synchronize().await;
        assert!(matches!(second, Err(Error::AlreadySyncing)));

        store.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.counts.albums, 1);
        assert!(!library.is_syncing());

        // The flag is released, so a later reload is accepted
        store.release.notify_one();
        assert!(library.synchronize().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_sync_releases_guard() {
        let (pool, _dir) = temp_db().await;
        pool.close().await;
        let library = MediaLibrary::new(
            Arc::new(SqliteStore::new(pool)),
            source(Authorization::Authorized, "2021-01-01T00:00:00Z"),
        );

        assert!(library.synchronize().await.is_err());
        assert!(!library.is_syncing());
        assert!(matches!(library.status(), LibraryStatus::StorageError { .. }));
        assert_eq!(library.library_info(), None);
    }
}
