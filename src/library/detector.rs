//! Staleness check of the stored library against the media source.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::store::LibraryStore;
use crate::error::{Error, Result};
use crate::source::MediaSource;

/// Outcome of comparing the checkpoint with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "change", content = "last_modified", rename_all = "snake_case")]
pub enum LibraryChange {
    /// No synchronization has ever completed
    NoPriorData,
    UpToDate,
    /// The source was modified after the checkpoint, at this time
    Changed(DateTime<Utc>),
}

impl LibraryChange {
    /// Whether a synchronization is needed before the store can be trusted.
    pub fn needs_sync(&self) -> bool {
        !matches!(self, LibraryChange::UpToDate)
    }
}

/// Compare the source's last modification time against the stored checkpoint.
///
/// Pure read; deciding whether to synchronize is up to the caller.
///
/// # Errors
///
/// Returns [`Error::InconsistentStore`] when a checkpoint exists without a
/// timestamp, and store errors as-is.
pub async fn check_for_changes(
    store: &dyn LibraryStore,
    source: &dyn MediaSource,
) -> Result<LibraryChange> {
    let Some(checkpoint) = store.checkpoint().await? else {
        tracing::info!(target: "detector", "No library checkpoint, initial load needed");
        return Ok(LibraryChange::NoPriorData);
    };

    let stored = checkpoint.last_modified.ok_or_else(|| {
        Error::inconsistent("Last modification date not set in library checkpoint")
    })?;
    let external = source.last_modified();

    if external <= stored {
        tracing::debug!(
            target: "detector",
            stored = %stored,
            external = %external,
            "Library up to date"
        );
        Ok(LibraryChange::UpToDate)
    } else {
        tracing::info!(
            target: "detector",
            stored = %stored,
            external = %external,
            "Media library changed since last synchronization"
        );
        Ok(LibraryChange::Changed(external))
    }
}
