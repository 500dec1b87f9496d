//! Trait definitions for the persistent library store.
//!
//! The synchronizer only talks to the store through these traits, so the
//! SQLite implementation in [`crate::db`] can be swapped for a fake in
//! tests (for example one whose deletes fail).
//!
//! A synchronization run opens one [`StoreTransaction`], issues every
//! delete and insert through it, then commits. Dropping a transaction
//! without committing discards its writes.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    LibraryCheckpoint, NewAlbum, NewMovement, NewPiece, NewPlaylist, NewSong,
};

/// Entity types the synchronizer clears before reloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Movement,
    Piece,
    Album,
    Song,
    Composer,
    Playlist,
}

impl EntityKind {
    /// Order in which a full resynchronization clears entity types.
    pub const CLEAR_ORDER: [EntityKind; 6] = [
        EntityKind::Movement,
        EntityKind::Piece,
        EntityKind::Album,
        EntityKind::Song,
        EntityKind::Composer,
        EntityKind::Playlist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Movement => "movements",
            EntityKind::Piece => "pieces",
            EntityKind::Album => "albums",
            EntityKind::Song => "songs",
            EntityKind::Composer => "composers",
            EntityKind::Playlist => "playlists",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persistent structured store.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Read the checkpoint, or `None` if no synchronization ever completed.
    async fn checkpoint(&self) -> Result<Option<LibraryCheckpoint>>;

    /// Open a write batch.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// A batch of writes that becomes visible only on [`commit`](Self::commit).
///
/// Insert methods return the store-assigned ID of the new record.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Delete every record of one type, returning how many were removed.
    async fn clear(&mut self, kind: EntityKind) -> Result<u64>;

    async fn insert_album(&mut self, album: &NewAlbum) -> Result<i64>;

    async fn insert_piece(&mut self, piece: &NewPiece) -> Result<i64>;

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<i64>;

    async fn insert_song(&mut self, song: &NewSong) -> Result<i64>;

    /// Resolve an external track ID to an imported song, if any.
    async fn song_id_for_track(&mut self, track_persistent_id: u64) -> Result<Option<i64>>;

    async fn insert_playlist(&mut self, playlist: &NewPlaylist) -> Result<i64>;

    /// Append a song to a playlist at `position`.
    async fn add_playlist_song(&mut self, playlist_id: i64, song_id: i64, position: u32)
    -> Result<()>;

    /// Distinct non-empty composer names over all pieces written so far.
    async fn distinct_piece_composers(&mut self) -> Result<Vec<String>>;

    async fn insert_composer(&mut self, name: &str) -> Result<()>;

    /// Replace the checkpoint.
    async fn write_checkpoint(&mut self, checkpoint: &LibraryCheckpoint) -> Result<()>;

    /// Make every write in this batch durable.
    async fn commit(&mut self) -> Result<()>;
}
