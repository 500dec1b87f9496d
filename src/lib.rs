//! Classical Library - synchronization core for a classical-music player.
//!
//! Mirrors an external media catalog into a local store, reorganizing
//! flat track lists into pieces and movements by parsing track titles.
//!
//! - [`library`]: change detection, the synchronizer and the [`library::MediaLibrary`] service
//! - [`parser`]: the title parser and composer index
//! - [`source`]: the media source contract and a JSON catalog implementation
//! - [`db`]: the SQLite store and browse queries

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod model;
pub mod parser;
pub mod source;
#[cfg(test)]
pub mod test_utils;
