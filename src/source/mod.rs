//! The external media source the library mirrors.
//!
//! The device's media catalog is outside our control; the core only
//! enumerates it. [`MediaSource`] is the seam: production code on a device
//! wraps the platform catalog, [`CatalogSource`] reads an exported JSON
//! catalog, and tests build catalogs in memory.
//!
//! # Example
//!
//! ```ignore
//! use classical_library::source::{CatalogSource, MediaSource};
//!
//! let source = CatalogSource::from_path("library.json")?;
//! for album in source.albums() {
//!     println!("{} tracks", album.items.len());
//! }
//! ```

mod catalog;

pub use catalog::{Catalog, CatalogSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authorization state reported by the media source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    /// The user has not been asked yet
    NotDetermined,
    #[default]
    Authorized,
    /// Blocked by corporate or parental controls
    Restricted,
    /// The user refused access
    Denied,
}

/// Whether a track's audio asset can be played from this device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetAvailability {
    #[default]
    Available,
    /// The asset should exist but is not on the device
    Missing,
    /// The item has no playable asset at all (booklets, LP extras)
    Unsupported,
}

impl AssetAvailability {
    pub fn is_playable(self) -> bool {
        self == AssetAvailability::Available
    }
}

/// Raw per-track metadata as the source reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub album_title: Option<String>,
    pub album_artist: Option<String>,
    pub album_track_count: u32,
    pub year: i32,
    pub persistent_id: u64,
    pub album_persistent_id: u64,
    pub artist_persistent_id: u64,
    /// Playback duration in seconds
    pub playback_duration: f64,
    pub asset_url: Option<String>,
    pub availability: AssetAvailability,
}

/// One album collection: its tracks in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumCollection {
    pub items: Vec<MediaItem>,
}

/// One playlist with its ordered track references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistCollection {
    pub persistent_id: u64,
    pub name: String,
    pub description_text: String,
    pub author_display_name: String,
    /// Album of the representative item, if any
    pub representative_album_id: Option<u64>,
    /// External track IDs in playlist order
    pub track_ids: Vec<u64>,
}

/// Enumeration and metadata capabilities consumed from the media source.
///
/// Implement this trait to back the library with a different catalog.
pub trait MediaSource: Send + Sync {
    /// Current access authorization.
    fn authorization(&self) -> Authorization;

    /// When the source last changed.
    fn last_modified(&self) -> DateTime<Utc>;

    /// All album collections, in source enumeration order.
    fn albums(&self) -> Vec<AlbumCollection>;

    /// All playlists, in source enumeration order.
    fn playlists(&self) -> Vec<PlaylistCollection>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_available_assets_are_playable() {
        assert!(AssetAvailability::Available.is_playable());
        assert!(!AssetAvailability::Missing.is_playable());
        assert!(!AssetAvailability::Unsupported.is_playable());
    }

    #[test]
    fn test_media_item_defaults_from_sparse_json() {
        let item: MediaItem = serde_json::from_str(r#"{"title": "Aria", "persistent_id": 7}"#).unwrap();
        assert_eq!(item.title.as_deref(), Some("Aria"));
        assert_eq!(item.persistent_id, 7);
        assert_eq!(item.composer, None);
        assert_eq!(item.availability, AssetAvailability::Available);
    }

    #[test]
    fn test_availability_serde_names() {
        let parsed: AssetAvailability = serde_json::from_str(r#""missing""#).unwrap();
        assert_eq!(parsed, AssetAvailability::Missing);
        let auth: Authorization = serde_json::from_str(r#""not_determined""#).unwrap();
        assert_eq!(auth, Authorization::NotDetermined);
    }
}
