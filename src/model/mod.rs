//! Core data models for the mirrored media library.
//!
//! Defines the persisted entities: [`Album`], [`Piece`], [`Movement`],
//! [`Song`], [`Playlist`], [`Composer`], and the singleton
//! [`LibraryCheckpoint`]. Row types derive SQLx's `FromRow` for database
//! mapping.
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `albums` - One row per external album collection
//! - `pieces` - Works parsed from track titles, owned by an album (cascade delete)
//! - `movements` - Sections of a piece, owned by the piece (cascade delete)
//! - `songs` - Flat track records, album referenced by external ID
//! - `playlists` / `playlist_songs` - Ordered playlist membership
//! - `composers` - Distinct non-empty piece composers
//! - `library_checkpoint` - Last synchronized source timestamp and counts

mod sort;

pub use sort::{anarthrous_cmp, remove_article};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Convert an external 64-bit persistent ID to its stored form.
///
/// The store only has signed 64-bit integers, so the bit pattern is kept
/// unchanged. [`from_store`] restores the original value.
pub fn to_store(id: u64) -> i64 {
    id as i64
}

/// Restore an external persistent ID from its stored form.
pub fn from_store(id: i64) -> u64 {
    id as u64
}

/// Format a playback duration in seconds as `m:ss`.
///
/// Negative or non-finite durations format as `0:00`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// An album in the mirrored library.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Album {
    /// Database ID (auto-generated)
    pub id: i64,
    /// External album persistent ID (stored bit pattern)
    pub persistent_id: i64,
    pub title: String,
    pub composer: String,
    pub artist: String,
    pub genre: String,
    pub year: i64,
    /// Track count reported by the source at import time
    pub track_count: i64,
}

/// A musical work, possibly spanning several tracks.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Piece {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Foreign key to albums table
    pub album_id: i64,
    pub album_persistent_id: i64,
    pub composer: String,
    pub artist: String,
    pub artist_persistent_id: i64,
    pub genre: String,
    pub title: String,
    /// Track of the first source title of this piece
    pub track_persistent_id: i64,
    pub track_url: Option<String>,
    /// Order within the album
    pub position: i64,
}

impl Piece {
    /// External track IDs to queue when this piece is played.
    ///
    /// A piece without movements is itself the playable unit; otherwise
    /// each movement's track is played in order.
    pub fn playback_tracks(&self, movements: &[Movement]) -> Vec<u64> {
        if movements.is_empty() {
            vec![from_store(self.track_persistent_id)]
        } else {
            movements
                .iter()
                .map(|m| from_store(m.track_persistent_id))
                .collect()
        }
    }
}

/// One labeled section of a multi-track piece.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movement {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Foreign key to the owning piece
    pub piece_id: i64,
    pub title: String,
    pub track_persistent_id: i64,
    pub track_url: Option<String>,
    /// Display duration (`m:ss`)
    pub duration: String,
    /// Order within the piece
    pub position: i64,
}

/// A flat, un-decomposed track record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Song {
    /// Database ID (auto-generated)
    pub id: i64,
    pub persistent_id: i64,
    pub album_persistent_id: i64,
    pub artist: String,
    pub composer: String,
    pub title: String,
    pub duration: String,
    pub track_url: Option<String>,
}

/// A playlist mirrored from the source.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Playlist {
    /// Database ID (auto-generated)
    pub id: i64,
    pub persistent_id: i64,
    pub name: String,
    pub description_text: String,
    pub author_display_name: String,
    /// Album of the playlist's representative item, for artwork
    pub album_persistent_id: Option<i64>,
}

/// A distinct composer name derived from pieces.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Composer {
    pub id: i64,
    pub name: String,
}

/// Entity counts cached alongside the checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryCounts {
    pub albums: u32,
    pub songs: u32,
    pub pieces: u32,
    pub movements: u32,
    pub playlists: u32,
}

/// Snapshot of the last successful synchronization.
///
/// `last_modified` is only `None` when the stored row is corrupt; a
/// synchronization always writes a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryCheckpoint {
    pub last_modified: Option<DateTime<Utc>>,
    pub counts: LibraryCounts,
}

// ============================================================================
// Insert records (built by the synchronizer, written by the store)
// ============================================================================

/// Album fields to insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAlbum {
    pub persistent_id: u64,
    pub title: String,
    pub composer: String,
    pub artist: String,
    pub genre: String,
    pub year: i32,
    pub track_count: u32,
}

/// Piece fields to insert; the album is given by its database ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPiece {
    pub album_id: i64,
    pub album_persistent_id: u64,
    pub composer: String,
    pub artist: String,
    pub artist_persistent_id: u64,
    pub genre: String,
    pub title: String,
    pub track_persistent_id: u64,
    pub track_url: Option<String>,
    pub position: u32,
}

/// Movement fields to insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMovement {
    pub piece_id: i64,
    pub title: String,
    pub track_persistent_id: u64,
    pub track_url: Option<String>,
    pub duration: String,
    pub position: u32,
}

/// Song fields to insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSong {
    pub persistent_id: u64,
    pub album_persistent_id: u64,
    pub artist: String,
    pub composer: String,
    pub title: String,
    pub duration: String,
    pub track_url: Option<String>,
}

/// Playlist fields to insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPlaylist {
    pub persistent_id: u64,
    pub name: String,
    pub description_text: String,
    pub author_display_name: String,
    pub album_persistent_id: Option<u64>,
}
