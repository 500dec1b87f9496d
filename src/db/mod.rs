//! Database module for the mirrored library.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides:
//! - [`init_db`]: pool creation and migrations
//! - [`SqliteStore`]: the [`LibraryStore`] used by synchronization, writing
//!   a whole run inside one transaction
//! - browse queries for the presentation layer (see [`queries`])
//!
//! # Example
//!
//! ```ignore
//! use classical_library::db::{init_db, SqliteStore, pieces, PieceSort};
//!
//! let pool = init_db("sqlite:classical_library.db").await?;
//! let store = SqliteStore::new(pool.clone());
//! let by_composer = pieces(&pool, "", PieceSort::Composer).await?;
//! ```

mod queries;

pub use queries::{
    AlbumSort, PieceSort, SongSort, album_for_persistent_id, albums, checkpoint, composers,
    counts, delete_album, movements_for_piece, pieces, pieces_for_album, pieces_for_composer,
    playlists, song_for_track, songs, songs_for_playlist,
};

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::error::{Error, Result};
use crate::library::{EntityKind, LibraryStore, StoreTransaction};
use crate::model::{
    LibraryCheckpoint, NewAlbum, NewMovement, NewPiece, NewPlaylist, NewSong, to_store,
};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "classical_library.db";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections (foreign keys enforced, so deleting an
/// album cascades to its pieces and their movements), and runs all pending
/// migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> sqlx::Result<SqlitePool> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let options = SqliteConnectOptions::from_str(db_url)?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::debug!(target: "db", url = db_url, "Database ready");

    Ok(pool)
}

/// [`LibraryStore`] backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LibraryStore for SqliteStore {
    async fn checkpoint(&self) -> Result<Option<LibraryCheckpoint>> {
        queries::checkpoint(&self.pool).await
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }
}

/// One open SQLite transaction. Dropped without commit, it rolls back.
pub struct SqliteTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| Error::inconsistent("transaction already committed"))
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn clear(&mut self, kind: EntityKind) -> Result<u64> {
        let sql = match kind {
            EntityKind::Movement => "DELETE FROM movements",
            EntityKind::Piece => "DELETE FROM pieces",
            EntityKind::Album => "DELETE FROM albums",
            EntityKind::Song => "DELETE FROM songs",
            EntityKind::Composer => "DELETE FROM composers",
            EntityKind::Playlist => "DELETE FROM playlists",
        };
        let result = sqlx::query(sql).execute(self.conn()?).await?;
        Ok(result.rows_affected())
    }

    async fn insert_album(&mut self, album: &NewAlbum) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO albums (persistent_id, title, composer, artist, genre, year, track_count)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_store(album.persistent_id))
        .bind(&album.title)
        .bind(&album.composer)
        .bind(&album.artist)
        .bind(&album.genre)
        .bind(i64::from(album.year))
        .bind(i64::from(album.track_count))
        .execute(self.conn()?)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_piece(&mut self, piece: &NewPiece) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO pieces (
                album_id, album_persistent_id, composer, artist, artist_persistent_id,
                genre, title, track_persistent_id, track_url, position
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(piece.album_id)
        .bind(to_store(piece.album_persistent_id))
        .bind(&piece.composer)
        .bind(&piece.artist)
        .bind(to_store(piece.artist_persistent_id))
        .bind(&piece.genre)
        .bind(&piece.title)
        .bind(to_store(piece.track_persistent_id))
        .bind(&piece.track_url)
        .bind(i64::from(piece.position))
        .execute(self.conn()?)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO movements (piece_id, title, track_persistent_id, track_url, duration, position)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.piece_id)
        .bind(&movement.title)
        .bind(to_store(movement.track_persistent_id))
        .bind(&movement.track_url)
        .bind(&movement.duration)
        .bind(i64::from(movement.position))
        .execute(self.conn()?)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_song(&mut self, song: &NewSong) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO songs (persistent_id, album_persistent_id, artist, composer, title, duration, track_url)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_store(song.persistent_id))
        .bind(to_store(song.album_persistent_id))
        .bind(&song.artist)
        .bind(&song.composer)
        .bind(&song.title)
        .bind(&song.duration)
        .bind(&song.track_url)
        .execute(self.conn()?)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn song_id_for_track(&mut self, track_persistent_id: u64) -> Result<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM songs WHERE persistent_id = ? ORDER BY id LIMIT 1")
                .bind(to_store(track_persistent_id))
                .fetch_optional(self.conn()?)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn insert_playlist(&mut self, playlist: &NewPlaylist) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO playlists (persistent_id, name, description_text, author_display_name, album_persistent_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_store(playlist.persistent_id))
        .bind(&playlist.name)
        .bind(&playlist.description_text)
        .bind(&playlist.author_display_name)
        .bind(playlist.album_persistent_id.map(to_store))
        .execute(self.conn()?)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn add_playlist_song(
        &mut self,
        playlist_id: i64,
        song_id: i64,
        position: u32,
    ) -> Result<()> {
        sqlx::query("INSERT INTO playlist_songs (playlist_id, song_id, position) VALUES (?, ?, ?)")
            .bind(playlist_id)
            .bind(song_id)
            .bind(i64::from(position))
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn distinct_piece_composers(&mut self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT composer FROM pieces WHERE composer <> '' ORDER BY composer",
        )
        .fetch_all(self.conn()?)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn insert_composer(&mut self, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO composers (name) VALUES (?)")
            .bind(name)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn write_checkpoint(&mut self, checkpoint: &LibraryCheckpoint) -> Result<()> {
        let last_modified = checkpoint.last_modified.map(|t| t.to_rfc3339());
        let counts = checkpoint.counts;
        sqlx::query(
            r#"
            INSERT INTO library_checkpoint (
                id, last_modified, album_count, song_count, piece_count, movement_count, playlist_count
            )
            VALUES (1, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_modified = excluded.last_modified,
                album_count = excluded.album_count,
                song_count = excluded.song_count,
                piece_count = excluded.piece_count,
                movement_count = excluded.movement_count,
                playlist_count = excluded.playlist_count
            "#,
        )
        .bind(last_modified)
        .bind(i64::from(counts.albums))
        .bind(i64::from(counts.songs))
        .bind(i64::from(counts.pieces))
        .bind(i64::from(counts.movements))
        .bind(i64::from(counts.playlists))
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::inconsistent("transaction already committed"))?;
        tx.commit().await?;
        tracing::debug!(target: "db", "Library transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LibraryCounts;
    use crate::test_utils::{temp_db, ts};

    #[test]
    fn test_db_url() {
        assert_eq!(db_url(None), "sqlite:classical_library.db");
        assert_eq!(
            db_url(Some(std::path::Path::new("/tmp/lib.db"))),
            "sqlite:/tmp/lib.db"
        );
    }

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}", db_path.display());

        let pool = init_db(&db_url).await.expect("Failed to init db");
        assert!(db_path.exists());

        // Verify we can query the tables
        let counts = counts(&pool).await.expect("Failed to count entities");
        assert_eq!(counts, LibraryCounts::default());
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_rolls_back() {
        let (pool, _dir) = temp_db().await;
        let store = SqliteStore::new(pool.clone());
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_album(&NewAlbum {
                persistent_id: 1,
                title: "Draft".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }
        assert_eq!(counts(&pool).await.unwrap().albums, 0);
    }

    #[tokio::test]
    async fn test_commit_twice_is_an_error() {
        let (pool, _dir) = temp_db().await;
        let store = SqliteStore::new(pool);
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(tx.commit().await, Err(Error::InconsistentStore(_))));
        assert!(tx.clear(EntityKind::Song).await.is_err());
    }

    #[tokio::test]
    async fn test_high_bit_persistent_ids_survive() {
        let (pool, _dir) = temp_db().await;
        let store = SqliteStore::new(pool.clone());
        let id = u64::MAX - 7;

        let mut tx = store.begin().await.unwrap();
        tx.insert_song(&NewSong {
            persistent_id: id,
            album_persistent_id: id,
            title: "Lacrimosa".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(tx.song_id_for_track(id).await.unwrap().is_some());
        assert!(tx.song_id_for_track(7).await.unwrap().is_none());
        tx.commit().await.unwrap();

        let song = song_for_track(&pool, id).await.unwrap().unwrap();
        assert_eq!(crate::model::from_store(song.persistent_id), id);
    }

    #[tokio::test]
    async fn test_checkpoint_is_replaced() {
        let (pool, _dir) = temp_db().await;
        let store = SqliteStore::new(pool);
        assert!(store.checkpoint().await.unwrap().is_none());

        for (stamp, albums) in [("2021-01-01T00:00:00Z", 3), ("2021-06-01T00:00:00Z", 5)] {
            let mut tx = store.begin().await.unwrap();
            tx.write_checkpoint(&LibraryCheckpoint {
                last_modified: Some(ts(stamp)),
                counts: LibraryCounts {
                    albums,
                    ..Default::default()
                },
            })
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }

        let checkpoint = store.checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.last_modified, Some(ts("2021-06-01T00:00:00Z")));
        assert_eq!(checkpoint.counts.albums, 5);
    }

    #[tokio::test]
    async fn test_distinct_piece_composers() {
        let (pool, _dir) = temp_db().await;
        let store = SqliteStore::new(pool);
        let mut tx = store.begin().await.unwrap();
        let album_id = tx
            .insert_album(&NewAlbum {
                persistent_id: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        for composer in ["Schubert, Franz", "", "Schubert, Franz", "Haydn, Joseph"] {
            tx.insert_piece(&NewPiece {
                album_id,
                composer: composer.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }
        assert_eq!(
            tx.distinct_piece_composers().await.unwrap(),
            vec!["Haydn, Joseph".to_string(), "Schubert, Franz".to_string()]
        );
    }
}
