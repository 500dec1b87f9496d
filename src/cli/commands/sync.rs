//! Change detection, synchronization and library info commands.

use std::io::Write;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::RecvError;

use super::{open_catalog, open_pool};
use crate::config::Config;
use crate::db::{self, SqliteStore};
use crate::library::{LibraryChange, LibraryEvent, LibraryStatus, MediaLibrary, SyncPhase};
use crate::model::LibraryCheckpoint;

fn library(store: SqliteStore, config: &Config) -> anyhow::Result<MediaLibrary> {
    let source = open_catalog(config)?;
    Ok(MediaLibrary::new(Arc::new(store), Arc::new(source)).with_config(config.sync.clone()))
}

fn print_checkpoint(checkpoint: &LibraryCheckpoint) {
    match checkpoint.last_modified {
        Some(ts) => println!("Last synchronized catalog: {}", ts.to_rfc3339()),
        None => println!("Last synchronized catalog: (not recorded)"),
    }
    let counts = &checkpoint.counts;
    println!("  Albums:    {}", counts.albums);
    println!("  Songs:     {}", counts.songs);
    println!("  Pieces:    {}", counts.pieces);
    println!("  Movements: {}", counts.movements);
    println!("  Playlists: {}", counts.playlists);
}

/// Report whether the catalog changed since the last synchronization
pub fn cmd_check(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        let library = library(SqliteStore::new(pool), config)?;

        let status = library.check_access();
        if let Some(message) = status.message() {
            anyhow::bail!("{}", message);
        }

        match library.check_for_changes().await? {
            LibraryChange::NoPriorData => {
                println!("The library has never been synchronized. Run `sync` to import it.");
            }
            LibraryChange::UpToDate => println!("The library is up to date."),
            LibraryChange::Changed(at) => {
                println!(
                    "The catalog changed at {}. Run `sync` to reload the library.",
                    at.to_rfc3339()
                );
            }
        }
        Ok(())
    })
}

/// Rebuild the library from the catalog, printing progress
pub fn cmd_sync(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        let library = Arc::new(library(SqliteStore::new(pool), config)?);

        match library.check_access() {
            LibraryStatus::Authorized => {}
            LibraryStatus::Initial => {
                anyhow::bail!("The catalog has not granted access to its media library")
            }
            other => anyhow::bail!("{}", other.message().unwrap_or("Access refused")),
        }

        let mut rx = library.subscribe();
        let handle = library.spawn_synchronize();

        loop {
            match rx.recv().await {
                Ok(LibraryEvent::Phase(phase)) if phase != SyncPhase::Idle => {
                    println!("\n{:?}...", phase);
                }
                Ok(LibraryEvent::Progress(p)) => {
                    print!(
                        "\rComposers {:>3.0}%  Albums {:>3.0}%  Playlists {:>3.0}%",
                        p.composers * 100.0,
                        p.albums * 100.0,
                        p.playlists * 100.0
                    );
                    std::io::stdout().flush()?;
                }
                Ok(LibraryEvent::DataMissing) => {
                    println!("\nSome tracks are not on this device and were left out.");
                }
                Ok(LibraryEvent::Status(
                    LibraryStatus::DataAvailable | LibraryStatus::StorageError { .. },
                )) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
        println!();

        let report = handle.await??;
        println!(
            "Synchronized {} composers. The library now holds:",
            report.composers
        );
        print_checkpoint(&LibraryCheckpoint {
            last_modified: Some(report.last_modified),
            counts: report.counts,
        });
        Ok(())
    })
}

/// Show the checkpoint written by the last synchronization
pub fn cmd_info(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_pool(config).await?;
        match db::checkpoint(&pool).await? {
            Some(checkpoint) => print_checkpoint(&checkpoint),
            None => println!("The library has never been synchronized."),
        }
        Ok(())
    })
}
