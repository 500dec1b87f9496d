//! JSON catalog export used as a [`MediaSource`].
//!
//! The catalog file looks like:
//!
//! ```json
//! {
//!   "last_modified": "2021-06-01T00:00:00Z",
//!   "authorization": "authorized",
//!   "albums": [ { "items": [ { "title": "Symphony No. 5: I. Allegro", "persistent_id": 1 } ] } ],
//!   "playlists": [ { "persistent_id": 9, "name": "Favourites", "track_ids": [1] } ]
//! }
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AlbumCollection, Authorization, MediaSource, PlaylistCollection};
use crate::error::{Error, Result};

/// In-memory form of a catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub authorization: Authorization,
    #[serde(default)]
    pub albums: Vec<AlbumCollection>,
    #[serde(default)]
    pub playlists: Vec<PlaylistCollection>,
}

impl Catalog {
    /// An empty, authorized catalog last modified at `last_modified`.
    pub fn empty(last_modified: DateTime<Utc>) -> Self {
        Self {
            last_modified,
            authorization: Authorization::Authorized,
            albums: Vec::new(),
            playlists: Vec::new(),
        }
    }
}

/// A [`MediaSource`] backed by a [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogSource {
    catalog: Catalog,
}

impl CatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Read and decode a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Catalog`] if the file cannot be read or is not a
    /// valid catalog.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::catalog(path, e.to_string()))?;
        let catalog: Catalog =
            serde_json::from_str(&contents).map_err(|e| Error::catalog(path, e.to_string()))?;
        tracing::info!(
            target: "source",
            path = %path.display(),
            albums = catalog.albums.len(),
            playlists = catalog.playlists.len(),
            "Loaded media catalog"
        );
        Ok(Self::new(catalog))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl MediaSource for CatalogSource {
    fn authorization(&self) -> Authorization {
        self.catalog.authorization
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.catalog.last_modified
    }

    fn albums(&self) -> Vec<AlbumCollection> {
        self.catalog.albums.clone()
    }

    fn playlists(&self) -> Vec<PlaylistCollection> {
        self.catalog.playlists.clone()
    }
}
