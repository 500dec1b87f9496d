//! Full resynchronization of the store from the media source.
//!
//! A run moves through `Clearing -> Importing -> Finalizing` and back to
//! `Idle`, strictly sequentially, inside one store transaction:
//!
//! 1. **Clearing** deletes every movement, piece, album, song, composer
//!    and playlist, in that order.
//! 2. **Importing** indexes composers, then walks albums in source order
//!    creating an album, its songs, and its parsed pieces and movements.
//!    Playlists follow once all songs exist.
//! 3. **Finalizing** derives composers from pieces, writes the
//!    checkpoint, and commits.
//!
//! Any error drops the transaction (discarding its writes), publishes one
//! [`LibraryStatus::StorageError`] and is returned to the caller. There is
//! no internal retry.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::{EventPublisher, LibraryEvent, LibraryStatus, SyncPhase, SyncProgress};
use super::store::{EntityKind, LibraryStore, StoreTransaction};
use crate::config::SyncConfig;
use crate::error::{Result, ResultExt};
use crate::model::{
    LibraryCheckpoint, LibraryCounts, NewAlbum, NewMovement, NewPiece, NewPlaylist, NewSong,
    format_duration,
};
use crate::parser::{ComposerIndex, ParseEvent, TitleParser};
use crate::source::{AlbumCollection, AssetAvailability, MediaItem, MediaSource, PlaylistCollection};

/// Genre of the albums kept when `only_sentinel_genre` is set.
pub const SENTINEL_GENRE: &str = "fake";

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub counts: LibraryCounts,
    pub composers: u32,
    /// Some tracks' assets were missing from the device
    pub data_missing: bool,
    /// Source modification time recorded in the checkpoint
    pub last_modified: DateTime<Utc>,
}

/// Running tallies for one run.
#[derive(Debug, Default)]
struct ImportState {
    counts: LibraryCounts,
    data_missing: bool,
    progress: SyncProgress,
}

/// How often to publish progress: every `total / steps` items, at least every item.
fn cadence(total: usize, steps: u32) -> usize {
    (total / steps.max(1) as usize).max(1)
}

fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    }
}

fn should_report(done: usize, total: usize, every: usize) -> bool {
    done % every == 0 || done == total
}

fn text(field: &Option<String>) -> String {
    field.clone().unwrap_or_default()
}

/// Drives one synchronization run.
pub struct Synchronizer<'a> {
    source: &'a dyn MediaSource,
    store: &'a dyn LibraryStore,
    events: &'a EventPublisher,
    parser: &'a TitleParser,
    config: SyncConfig,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        source: &'a dyn MediaSource,
        store: &'a dyn LibraryStore,
        events: &'a EventPublisher,
        parser: &'a TitleParser,
    ) -> Self {
        Self {
            source,
            store,
            events,
            parser,
            config: SyncConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Rebuild the store from the source.
    ///
    /// Publishes phase and progress events while running, then either
    /// `DataAvailable` (preceded by `DataMissing` if needed) or one
    /// `StorageError`.
    pub async fn run(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let result = self.run_phases().await;
        self.events.phase(SyncPhase::Idle);

        match &result {
            Ok(report) => {
                tracing::info!(
                    target: "sync",
                    composers = report.composers,
                    albums = report.counts.albums,
                    pieces = report.counts.pieces,
                    movements = report.counts.movements,
                    songs = report.counts.songs,
                    playlists = report.counts.playlists,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Library synchronized"
                );
                if report.data_missing {
                    tracing::warn!(target: "sync", "Some tracks have no media on this device");
                    self.events.publish(LibraryEvent::DataMissing);
                }
                self.events.status(LibraryStatus::DataAvailable);
            }
            Err(e) => {
                tracing::error!(target: "sync", error = %e, "Library synchronization failed");
                self.events.status(LibraryStatus::StorageError {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn run_phases(&self) -> Result<SyncReport> {
        let mut state = ImportState::default();
        self.events.progress(state.progress);

        let mut tx = self
            .store
            .begin()
            .await
            .with_context("opening library transaction")?;

        self.events.phase(SyncPhase::Clearing);
        self.clear(tx.as_mut()).await?;

        self.events.phase(SyncPhase::Importing);
        let last_modified = self.source.last_modified();
        let albums = self.source.albums();
        let composers = self.index_composers(&albums, &mut state);

        let every = cadence(albums.len(), self.config.album_progress_steps);
        for (i, album) in albums.iter().enumerate() {
            self.import_album(tx.as_mut(), album, &composers, &mut state)
                .await?;
            let done = i + 1;
            if should_report(done, albums.len(), every) {
                state.progress.albums = fraction(done, albums.len());
                self.events.progress(state.progress);
            }
        }
        state.progress.albums = 1.0;

        let playlists = self.source.playlists();
        let every = cadence(playlists.len(), self.config.playlist_progress_steps);
        for (i, playlist) in playlists.iter().enumerate() {
            self.import_playlist(tx.as_mut(), playlist, &mut state)
                .await
                .with_context(format!("importing playlist '{}'", playlist.name))?;
            let done = i + 1;
            if should_report(done, playlists.len(), every) {
                state.progress.playlists = fraction(done, playlists.len());
                self.events.progress(state.progress);
            }
        }
        state.progress.playlists = 1.0;
        self.events.progress(state.progress);

        // The checkpoint records the source timestamp read when Importing
        // began, not a fresh one. A source change that lands mid-run is then
        // newer than the checkpoint, so the next check reports it instead of
        // the run silently claiming data it never imported.
        self.events.phase(SyncPhase::Finalizing);
        let composers = self.store_composers(tx.as_mut()).await?;
        tx.write_checkpoint(&LibraryCheckpoint {
            last_modified: Some(last_modified),
            counts: state.counts,
        })
        .await
        .with_context("writing library checkpoint")?;
        tx.commit().await.with_context("committing library")?;

        Ok(SyncReport {
            counts: state.counts,
            composers,
            data_missing: state.data_missing,
            last_modified,
        })
    }

    async fn clear(&self, tx: &mut dyn StoreTransaction) -> Result<()> {
        for kind in EntityKind::CLEAR_ORDER {
            let deleted = tx
                .clear(kind)
                .await
                .with_context(format!("clearing {}", kind))?;
            tracing::info!(target: "sync", entity = %kind, deleted, "Cleared");
        }
        Ok(())
    }

    fn index_composers(&self, albums: &[AlbumCollection], state: &mut ImportState) -> ComposerIndex {
        let mut index = ComposerIndex::new();
        let every = cadence(albums.len(), self.config.composer_progress_steps);
        for (i, album) in albums.iter().enumerate() {
            index.add_album(album);
            let done = i + 1;
            if should_report(done, albums.len(), every) {
                state.progress.composers = fraction(done, albums.len());
                self.events.progress(state.progress);
            }
        }
        state.progress.composers = 1.0;
        tracing::info!(target: "sync", composers = index.len(), "Indexed composers from tracks");
        index
    }

    fn in_sentinel_genre(&self, item: &MediaItem) -> bool {
        !self.config.only_sentinel_genre || item.genre.as_deref() == Some(SENTINEL_GENRE)
    }

    async fn import_album(
        &self,
        tx: &mut dyn StoreTransaction,
        album: &AlbumCollection,
        composers: &ComposerIndex,
        state: &mut ImportState,
    ) -> Result<()> {
        let playable: Vec<&MediaItem> = album
            .items
            .iter()
            .filter(|item| item.availability.is_playable())
            .collect();

        // The sentinel filter looks at the first playable track, or the
        // first track of an album with none.
        let Some(representative) = playable.first().copied().or(album.items.first()) else {
            return Ok(());
        };
        if !self.in_sentinel_genre(representative) {
            return Ok(());
        }
        if album
            .items
            .iter()
            .any(|item| item.availability == AssetAvailability::Missing)
        {
            state.data_missing = true;
        }

        let Some(first) = playable.first().copied() else {
            let title = representative.album_title.as_deref().unwrap_or_default();
            tracing::info!(target: "sync", album = title, "Skipping album with no playable tracks");
            return Ok(());
        };

        let album_id = tx
            .insert_album(&NewAlbum {
                persistent_id: first.album_persistent_id,
                title: text(&first.album_title),
                composer: text(&first.composer).trim().to_string(),
                artist: text(&first.album_artist),
                genre: text(&first.genre),
                year: first.year,
                track_count: first.album_track_count,
            })
            .await?;
        state.counts.albums += 1;

        for item in playable.iter().filter(|item| self.in_sentinel_genre(item)) {
            tx.insert_song(&NewSong {
                persistent_id: item.persistent_id,
                album_persistent_id: item.album_persistent_id,
                artist: text(&item.artist),
                composer: text(&item.composer),
                title: text(&item.title),
                duration: format_duration(item.playback_duration),
                track_url: item.asset_url.clone(),
            })
            .await?;
            state.counts.songs += 1;
        }

        let titles: Vec<String> = playable.iter().map(|item| text(&item.title)).collect();
        let mut piece_id = None;
        let mut piece_position = 0;
        let mut movement_position = 0;

        for event in self.parser.parse(&titles, composers) {
            match event {
                ParseEvent::PieceFound { track, title, rule } => {
                    let item = playable[track];
                    tracing::debug!(target: "parser", %title, rule, "Piece");
                    let id = tx
                        .insert_piece(&NewPiece {
                            album_id,
                            album_persistent_id: item.album_persistent_id,
                            composer: text(&item.composer).trim().to_string(),
                            artist: text(&item.artist),
                            artist_persistent_id: item.artist_persistent_id,
                            genre: text(&item.genre),
                            title,
                            track_persistent_id: item.persistent_id,
                            track_url: item.asset_url.clone(),
                            position: piece_position,
                        })
                        .await?;
                    piece_id = Some(id);
                    piece_position += 1;
                    movement_position = 0;
                    state.counts.pieces += 1;
                }
                ParseEvent::MovementFound { track, title, rule } => {
                    let Some(piece_id) = piece_id else { continue };
                    let item = playable[track];
                    tracing::debug!(target: "parser", %title, rule, "Movement");
                    tx.insert_movement(&NewMovement {
                        piece_id,
                        title,
                        track_persistent_id: item.persistent_id,
                        track_url: item.asset_url.clone(),
                        duration: format_duration(item.playback_duration),
                        position: movement_position,
                    })
                    .await?;
                    movement_position += 1;
                    state.counts.movements += 1;
                }
            }
        }
        Ok(())
    }

    async fn import_playlist(
        &self,
        tx: &mut dyn StoreTransaction,
        playlist: &PlaylistCollection,
        state: &mut ImportState,
    ) -> Result<()> {
        let playlist_id = tx
            .insert_playlist(&NewPlaylist {
                persistent_id: playlist.persistent_id,
                name: playlist.name.clone(),
                description_text: playlist.description_text.clone(),
                author_display_name: playlist.author_display_name.clone(),
                album_persistent_id: playlist.representative_album_id,
            })
            .await?;
        state.counts.playlists += 1;

        let mut position = 0;
        for &track in &playlist.track_ids {
            match tx.song_id_for_track(track).await? {
                Some(song_id) => {
                    tx.add_playlist_song(playlist_id, song_id, position).await?;
                    position += 1;
                }
                None => {
                    tracing::trace!(target: "sync", playlist = %playlist.name, track, "Playlist track has no song");
                }
            }
        }
        Ok(())
    }

    async fn store_composers(&self, tx: &mut dyn StoreTransaction) -> Result<u32> {
        let names = tx
            .distinct_piece_composers()
            .await
            .with_context("collecting piece composers")?;
        for name in &names {
            tx.insert_composer(name).await?;
        }
        Ok(names.len() as u32)
    }
}
