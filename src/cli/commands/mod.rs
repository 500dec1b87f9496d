//! CLI command definitions and dispatch.
//!
//! Each group of subcommands lives in its own submodule:
//! - `sync`: change detection, synchronization and cached library info
//! - `browse`: listing composers, pieces, albums, songs and playlists
//! - `parse`: running the title parser over ad-hoc titles
//! - `settings`: writing and printing the config file

mod browse;
mod parse;
mod settings;
mod sync;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::db::{self, AlbumSort, PieceSort, SongSort};
use crate::source::CatalogSource;

pub use browse::{cmd_albums, cmd_composers, cmd_pieces, cmd_playlists, cmd_songs};
pub use parse::cmd_parse;
pub use settings::{cmd_config_init, cmd_config_show};
pub use sync::{cmd_check, cmd_info, cmd_sync};

/// Classical library CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database path (overrides the config file)
    #[arg(long, global = true, env = "CLASSICAL_LIBRARY_DB")]
    pub db: Option<PathBuf>,

    /// JSON media catalog to mirror (overrides the config file)
    #[arg(long, global = true, env = "CLASSICAL_LIBRARY_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Config file to use instead of the one in the OS config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Compare the stored library with the catalog
    Check,
    /// Rebuild the library from the catalog
    Sync {
        /// Import only albums of the "fake" genre
        #[arg(long)]
        only_sentinel_genre: bool,
    },
    /// Show the cached counts of the last synchronization
    Info,
    /// Split titles into pieces and movements without touching the library
    Parse {
        /// Track titles in album order
        #[arg(required = true)]
        titles: Vec<String>,
        /// Composer name to treat as a title prefix (repeatable)
        #[arg(short, long = "composer")]
        composers: Vec<String>,
    },
    /// List composers
    Composers {
        #[arg(default_value = "")]
        filter: String,
    },
    /// List pieces
    Pieces {
        #[arg(default_value = "")]
        filter: String,
        /// Field to filter and sort by
        #[arg(short, long, value_enum, default_value_t = PieceSort::Title)]
        sort: PieceSort,
        /// Only pieces by this exact composer
        #[arg(long, conflicts_with = "filter")]
        composer: Option<String>,
        /// Also list each piece's movements
        #[arg(short, long)]
        movements: bool,
    },
    /// List albums
    Albums {
        #[arg(default_value = "")]
        filter: String,
        /// Field to filter and sort by
        #[arg(short, long, value_enum, default_value_t = AlbumSort::Title)]
        sort: AlbumSort,
        /// Also list each album's pieces
        #[arg(short, long)]
        pieces: bool,
    },
    /// List songs
    Songs {
        #[arg(default_value = "")]
        filter: String,
        /// Field to filter and sort by
        #[arg(short, long, value_enum, default_value_t = SongSort::Title)]
        sort: SongSort,
    },
    /// Write or print the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List playlists
    Playlists {
        #[arg(default_value = "")]
        filter: String,
        /// Also list each playlist's songs
        #[arg(long)]
        songs: bool,
    },
}

/// Config file actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Save the effective settings (file values plus flags) as the config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli);

    // These need neither a database nor a runtime
    match &cli.command {
        Commands::Parse { titles, composers } => return cmd_parse(titles, composers),
        Commands::Config { action } => {
            return match action {
                ConfigAction::Init { force } => {
                    cmd_config_init(&config, cli.config.as_deref(), *force)
                }
                ConfigAction::Show => cmd_config_show(&config),
            };
        }
        _ => {}
    }

    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Check => cmd_check(&rt, &config),
        Commands::Sync {
            only_sentinel_genre,
        } => {
            let mut config = config;
            config.sync.only_sentinel_genre |= *only_sentinel_genre;
            cmd_sync(&rt, &config)
        }
        Commands::Info => cmd_info(&rt, &config),
        Commands::Composers { filter } => cmd_composers(&rt, &config, filter),
        Commands::Pieces {
            filter,
            sort,
            composer,
            movements,
        } => cmd_pieces(&rt, &config, filter, *sort, composer.as_deref(), *movements),
        Commands::Albums {
            filter,
            sort,
            pieces,
        } => cmd_albums(&rt, &config, filter, *sort, *pieces),
        Commands::Songs { filter, sort } => cmd_songs(&rt, &config, filter, *sort),
        Commands::Playlists { filter, songs } => cmd_playlists(&rt, &config, filter, *songs),
        Commands::Parse { .. } | Commands::Config { .. } => Ok(()),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Config file values with command-line overrides applied.
fn resolve_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(db) = &cli.db {
        config.library.database_path = db.clone();
    }
    if let Some(catalog) = &cli.catalog {
        config.library.catalog_path = Some(catalog.clone());
    }
    config
}

/// Open (creating and migrating if needed) the configured database.
pub(crate) async fn open_pool(config: &Config) -> anyhow::Result<SqlitePool> {
    let path = &config.library.database_path;
    let url = db::db_url(Some(path));
    db::init_db(&url)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Load the configured catalog.
pub(crate) fn open_catalog(config: &Config) -> anyhow::Result<CatalogSource> {
    let Some(path) = &config.library.catalog_path else {
        anyhow::bail!("No catalog configured; pass --catalog or set library.catalog_path");
    };
    Ok(CatalogSource::from_path(path)?)
}
