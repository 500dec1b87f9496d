//! Browse queries consumed by the presentation layer.
//!
//! Filtering is a case-insensitive "contains" on one field; an empty
//! filter instead keeps rows whose field is non-empty. Lists are ordered
//! anarthrously ("The Planets" sorts under P), which SQLite cannot do, so
//! rows are fetched and then filtered and sorted in memory.
//!
//! Lookups by external ID return `None` when nothing matches.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use crate::error::{Error, Result};
use crate::model::{
    Album, Composer, LibraryCheckpoint, LibraryCounts, Movement, Piece, Playlist, Song,
    anarthrous_cmp, to_store,
};

// ============================================================================
// Filtering and ordering
// ============================================================================

fn matches_filter(field: &str, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() {
        !field.is_empty()
    } else {
        field.to_lowercase().contains(&filter.to_lowercase())
    }
}

/// Keep rows whose `key` matches `filter`, ordered anarthrously by `key`.
fn browse<T>(rows: Vec<T>, filter: &str, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut rows: Vec<T> = rows
        .into_iter()
        .filter(|row| matches_filter(key(row), filter))
        .collect();
    rows.sort_by(|a, b| anarthrous_cmp(key(a), key(b)));
    rows
}

/// Field pieces are filtered and ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PieceSort {
    #[default]
    Title,
    Composer,
    Artist,
}

impl PieceSort {
    fn key(self, piece: &Piece) -> &str {
        match self {
            PieceSort::Title => &piece.title,
            PieceSort::Composer => &piece.composer,
            PieceSort::Artist => &piece.artist,
        }
    }
}

/// Field albums are filtered and ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AlbumSort {
    #[default]
    Title,
    Composer,
    Artist,
    Genre,
}

impl AlbumSort {
    fn key(self, album: &Album) -> &str {
        match self {
            AlbumSort::Title => &album.title,
            AlbumSort::Composer => &album.composer,
            AlbumSort::Artist => &album.artist,
            AlbumSort::Genre => &album.genre,
        }
    }
}

/// Field songs are filtered and ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SongSort {
    #[default]
    Title,
    Composer,
    Artist,
}

impl SongSort {
    fn key(self, song: &Song) -> &str {
        match self {
            SongSort::Title => &song.title,
            SongSort::Composer => &song.composer,
            SongSort::Artist => &song.artist,
        }
    }
}

// ============================================================================
// Lists
// ============================================================================

/// Composers whose name contains `filter`, ordered case-insensitively.
pub async fn composers(pool: &SqlitePool, filter: &str) -> sqlx::Result<Vec<Composer>> {
    let rows: Vec<Composer> = sqlx::query_as("SELECT id, name FROM composers")
        .fetch_all(pool)
        .await?;
    let mut rows: Vec<Composer> = rows
        .into_iter()
        .filter(|c| matches_filter(&c.name, filter))
        .collect();
    rows.sort_by_cached_key(|c| c.name.to_lowercase());
    Ok(rows)
}

/// Pieces whose `sort` field contains `filter`, ordered by that field.
pub async fn pieces(pool: &SqlitePool, filter: &str, sort: PieceSort) -> sqlx::Result<Vec<Piece>> {
    let rows: Vec<Piece> = sqlx::query_as("SELECT * FROM pieces")
        .fetch_all(pool)
        .await?;
    Ok(browse(rows, filter, |p| sort.key(p)))
}

/// Pieces by exactly this composer, ordered by title.
pub async fn pieces_for_composer(pool: &SqlitePool, composer: &str) -> sqlx::Result<Vec<Piece>> {
    let mut rows: Vec<Piece> = sqlx::query_as("SELECT * FROM pieces WHERE composer = ?")
        .bind(composer)
        .fetch_all(pool)
        .await?;
    rows.sort_by(|a, b| anarthrous_cmp(&a.title, &b.title));
    Ok(rows)
}

/// Pieces of one album in track order.
pub async fn pieces_for_album(
    pool: &SqlitePool,
    album_persistent_id: u64,
) -> sqlx::Result<Vec<Piece>> {
    sqlx::query_as("SELECT * FROM pieces WHERE album_persistent_id = ? ORDER BY position, id")
        .bind(to_store(album_persistent_id))
        .fetch_all(pool)
        .await
}

/// Movements of a piece in track order.
pub async fn movements_for_piece(pool: &SqlitePool, piece_id: i64) -> sqlx::Result<Vec<Movement>> {
    sqlx::query_as("SELECT * FROM movements WHERE piece_id = ? ORDER BY position, id")
        .bind(piece_id)
        .fetch_all(pool)
        .await
}

pub async fn albums(pool: &SqlitePool, filter: &str, sort: AlbumSort) -> sqlx::Result<Vec<Album>> {
    let rows: Vec<Album> = sqlx::query_as("SELECT * FROM albums")
        .fetch_all(pool)
        .await?;
    Ok(browse(rows, filter, |a| sort.key(a)))
}

pub async fn songs(pool: &SqlitePool, filter: &str, sort: SongSort) -> sqlx::Result<Vec<Song>> {
    let rows: Vec<Song> = sqlx::query_as("SELECT * FROM songs")
        .fetch_all(pool)
        .await?;
    Ok(browse(rows, filter, |s| sort.key(s)))
}

pub async fn playlists(pool: &SqlitePool, filter: &str) -> sqlx::Result<Vec<Playlist>> {
    let rows: Vec<Playlist> = sqlx::query_as("SELECT * FROM playlists")
        .fetch_all(pool)
        .await?;
    Ok(browse(rows, filter, |p| &p.name))
}

/// Songs of a playlist in playlist order.
pub async fn songs_for_playlist(pool: &SqlitePool, playlist_id: i64) -> sqlx::Result<Vec<Song>> {
    sqlx::query_as(
        r#"
        SELECT s.*
        FROM playlist_songs ps
        JOIN songs s ON s.id = ps.song_id
        WHERE ps.playlist_id = ?
        ORDER BY ps.position
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await
}

// ============================================================================
// Lookups
// ============================================================================

pub async fn song_for_track(pool: &SqlitePool, track_persistent_id: u64) -> sqlx::Result<Option<Song>> {
    sqlx::query_as("SELECT * FROM songs WHERE persistent_id = ? ORDER BY id LIMIT 1")
        .bind(to_store(track_persistent_id))
        .fetch_optional(pool)
        .await
}

pub async fn album_for_persistent_id(
    pool: &SqlitePool,
    album_persistent_id: u64,
) -> sqlx::Result<Option<Album>> {
    sqlx::query_as("SELECT * FROM albums WHERE persistent_id = ? ORDER BY id LIMIT 1")
        .bind(to_store(album_persistent_id))
        .fetch_optional(pool)
        .await
}

/// Delete an album; its pieces and their movements go with it.
///
/// Returns false if no such album existed.
pub async fn delete_album(pool: &SqlitePool, album_id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM albums WHERE id = ?")
        .bind(album_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Aggregates
// ============================================================================

/// Live row counts per entity type.
pub async fn counts(pool: &SqlitePool) -> sqlx::Result<LibraryCounts> {
    let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM albums),
            (SELECT COUNT(*) FROM songs),
            (SELECT COUNT(*) FROM pieces),
            (SELECT COUNT(*) FROM movements),
            (SELECT COUNT(*) FROM playlists)
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(LibraryCounts {
        albums: row.0 as u32,
        songs: row.1 as u32,
        pieces: row.2 as u32,
        movements: row.3 as u32,
        playlists: row.4 as u32,
    })
}

/// Database row for the library_checkpoint table.
#[derive(Debug, sqlx::FromRow)]
struct CheckpointRow {
    last_modified: Option<String>,
    album_count: i64,
    song_count: i64,
    piece_count: i64,
    movement_count: i64,
    playlist_count: i64,
}

impl TryFrom<CheckpointRow> for LibraryCheckpoint {
    type Error = Error;

    fn try_from(row: CheckpointRow) -> Result<Self> {
        let last_modified = row
            .last_modified
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| Error::inconsistent(format!("bad checkpoint timestamp '{}': {}", s, e)))
            })
            .transpose()?;
        Ok(LibraryCheckpoint {
            last_modified,
            counts: LibraryCounts {
                albums: row.album_count as u32,
                songs: row.song_count as u32,
                pieces: row.piece_count as u32,
                movements: row.movement_count as u32,
                playlists: row.playlist_count as u32,
            },
        })
    }
}

/// The stored checkpoint, or `None` before the first synchronization.
pub async fn checkpoint(pool: &SqlitePool) -> Result<Option<LibraryCheckpoint>> {
    let row: Option<CheckpointRow> = sqlx::query_as(
        r#"
        SELECT last_modified, album_count, song_count, piece_count, movement_count, playlist_count
        FROM library_checkpoint
        WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.map(LibraryCheckpoint::try_from).transpose()
}
