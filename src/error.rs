//! Crate-wide error types.
//!
//! Library modules return [`Error`] via the [`Result`] alias, while the
//! CLI binary uses `anyhow` for convenient top-level propagation.
//!
//! # Design
//!
//! - [`Error`]: single error enum for store, source, and synchronization failures
//! - [`ResultExt`]: attach human-readable context while propagating with `?`
//! - The synchronizer converts any [`Error`] into one terminal
//!   [`LibraryStatus::StorageError`](crate::library::LibraryStatus) at the
//!   pipeline boundary, using its `Display` output as the message.
//!
//! # Example
//!
//! ```ignore
//! use classical_library::error::{Error, Result, ResultExt};
//!
//! async fn count(pool: &SqlitePool) -> Result<i64> {
//!     let n = db::count_albums(pool).await.with_context("counting albums")?;
//!     Ok(n)
//! }
//! ```

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Media catalog could not be read or decoded
    #[error("Catalog error for {path}: {message}")]
    Catalog { path: PathBuf, message: String },

    /// Stored library state is self-contradictory (e.g. checkpoint without a timestamp)
    #[error("Storage is inconsistent: {0}")]
    InconsistentStore(String),

    /// A synchronization run is already in flight
    #[error("Library synchronization already in progress")]
    AlreadySyncing,

    /// The external media source refused access
    #[error("Media library access refused: {0}")]
    AccessRefused(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a catalog error.
    pub fn catalog(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Catalog {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a store-inconsistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentStore(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}
