//! Test utilities and fixtures for classical-library tests.
//!
//! This module provides a throwaway database plus small builders for
//! source catalogs, so sync tests read as a description of the library.
//!
//! # Example
//!
//! ```ignore
//! use classical_library::test_utils::{album, item, temp_db};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     let symphony = album(1, vec![item(10, 1, "Symphony No. 1: I. Allegro")]);
//!     // ... test logic
//! }
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::source::{AlbumCollection, AssetAvailability, MediaItem, PlaylistCollection};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Parse an RFC3339 timestamp literal.
pub fn ts(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid RFC3339 timestamp")
        .with_timezone(&Utc)
}

/// Creates a playable MediaItem with sensible defaults.
///
/// Customize with struct update syntax or by mutating the result:
///
/// ```ignore
/// let mut track = item(1, 10, "Gloria");
/// track.composer = Some("Vivaldi, Antonio".to_string());
/// ```
pub fn item(persistent_id: u64, album_persistent_id: u64, title: &str) -> MediaItem {
    MediaItem {
        title: Some(title.to_string()),
        composer: None,
        artist: Some("Test Artist".to_string()),
        genre: Some("Classical".to_string()),
        album_title: Some(format!("Album {}", album_persistent_id)),
        album_artist: None,
        album_track_count: 0,
        year: 0,
        persistent_id,
        album_persistent_id,
        artist_persistent_id: 0,
        playback_duration: 300.0,
        asset_url: Some(format!("file:///music/{}.m4a", persistent_id)),
        availability: AssetAvailability::Available,
    }
}

/// Mark an item's asset as missing from the device.
pub fn missing(item: MediaItem) -> MediaItem {
    MediaItem {
        asset_url: None,
        availability: AssetAvailability::Missing,
        ..item
    }
}

/// An album collection. The ID is only there to keep call sites readable;
/// items carry their own album ID.
pub fn album(album_persistent_id: u64, items: Vec<MediaItem>) -> AlbumCollection {
    debug_assert!(
        items
            .iter()
            .all(|i| i.album_persistent_id == album_persistent_id),
        "items belong to album {}",
        album_persistent_id
    );
    AlbumCollection { items }
}

pub fn playlist(persistent_id: u64, name: &str, track_ids: Vec<u64>) -> PlaylistCollection {
    PlaylistCollection {
        persistent_id,
        name: name.to_string(),
        track_ids,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();

        assert_eq!(result.0, 1);
    }

    #[tokio::test]
    async fn test_temp_db_has_migrations() {
        let (pool, _dir) = temp_db().await;

        let result = sqlx::query("SELECT COUNT(*) FROM pieces")
            .fetch_one(&pool)
            .await;

        assert!(result.is_ok(), "pieces table should exist after migrations");
    }

    #[test]
    fn test_missing_keeps_identity() {
        let track = missing(item(4, 2, "Largo"));
        assert_eq!(track.persistent_id, 4);
        assert_eq!(track.title.as_deref(), Some("Largo"));
        assert!(!track.availability.is_playable());
    }
}
