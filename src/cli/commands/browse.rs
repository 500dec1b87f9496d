//! Browse commands: list what the last synchronization stored.

use tokio::runtime::Runtime;

use super::open_pool;
use crate::config::Config;
use crate::db::{self, AlbumSort, PieceSort, SongSort};
use crate::model::from_store;

/// List composers
pub fn cmd_composers(rt: &Runtime, config: &Config, filter: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        for composer in db::composers(&pool, filter).await? {
            println!("{}", composer.name);
        }
        Ok(())
    })
}

/// List pieces, optionally with their movements
pub fn cmd_pieces(
    rt: &Runtime,
    config: &Config,
    filter: &str,
    sort: PieceSort,
    composer: Option<&str>,
    with_movements: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        let pieces = match composer {
            Some(name) => db::pieces_for_composer(&pool, name).await?,
            None => db::pieces(&pool, filter, sort).await?,
        };

        for piece in &pieces {
            println!("{} - {} ({})", piece.title, piece.composer, piece.artist);
            if with_movements {
                for movement in db::movements_for_piece(&pool, piece.id).await? {
                    println!("    {} [{}]", movement.title, movement.duration);
                }
            }
        }
        println!("{} pieces", pieces.len());
        Ok(())
    })
}

/// List albums, optionally with their pieces
pub fn cmd_albums(
    rt: &Runtime,
    config: &Config,
    filter: &str,
    sort: AlbumSort,
    with_pieces: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        let albums = db::albums(&pool, filter, sort).await?;

        for album in &albums {
            let year = if album.year > 0 {
                format!(", {}", album.year)
            } else {
                String::new()
            };
            println!(
                "{} - {} ({} tracks{})",
                album.title, album.artist, album.track_count, year
            );
            if with_pieces {
                for piece in db::pieces_for_album(&pool, from_store(album.persistent_id)).await? {
                    println!("    {}", piece.title);
                }
            }
        }
        println!("{} albums", albums.len());
        Ok(())
    })
}

/// List songs
pub fn cmd_songs(rt: &Runtime, config: &Config, filter: &str, sort: SongSort) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        let songs = db::songs(&pool, filter, sort).await?;
        for song in &songs {
            println!("{} - {} [{}]", song.title, song.composer, song.duration);
        }
        println!("{} songs", songs.len());
        Ok(())
    })
}

/// List playlists, optionally with their songs
pub fn cmd_playlists(
    rt: &Runtime,
    config: &Config,
    filter: &str,
    with_songs: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        for playlist in db::playlists(&pool, filter).await? {
            if playlist.author_display_name.is_empty() {
                println!("{}", playlist.name);
            } else {
                println!("{} (by {})", playlist.name, playlist.author_display_name);
            }
            if with_songs {
                for (i, song) in db::songs_for_playlist(&pool, playlist.id)
                    .await?
                    .iter()
                    .enumerate()
                {
                    println!("    {:>3}. {} [{}]", i + 1, song.title, song.duration);
                }
            }
        }
        Ok(())
    })
}
