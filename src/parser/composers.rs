//! Index of composer names found in the source.
//!
//! Built fresh on every synchronization from the raw composer field of
//! every track, then consulted by the title parser to recognise titles
//! that start with a composer name ("Brahms: Intermezzo").

use std::collections::BTreeMap;

use crate::source::AlbumCollection;

/// Deduplicated composer names with case-insensitive fuzzy membership.
#[derive(Debug, Clone, Default)]
pub struct ComposerIndex {
    /// raw name -> lowercased name
    names: BTreeMap<String, String>,
}

impl ComposerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from every track of every album.
    pub fn build(albums: &[AlbumCollection]) -> Self {
        let mut index = Self::new();
        for album in albums {
            index.add_album(album);
        }
        index
    }

    /// Add the composer of every track in `album`.
    pub fn add_album(&mut self, album: &AlbumCollection) {
        for item in &album.items {
            if let Some(composer) = &item.composer {
                self.insert(composer);
            }
        }
    }

    /// Insert a raw composer name. Blank names are ignored.
    pub fn insert(&mut self, name: &str) {
        if name.trim().is_empty() || self.names.contains_key(name) {
            return;
        }
        self.names.insert(name.to_string(), name.to_lowercase());
    }

    /// Does any indexed composer contain this (possibly partial) name?
    ///
    /// A parenthesized suffix is dropped first, so "Strauss (R)" is looked
    /// up as "Strauss" and matches "Strauss, Richard". A candidate that is
    /// blank after refinement matches nothing.
    pub fn contains(&self, candidate: &str) -> bool {
        let refined = candidate.split('(').next().unwrap_or_default().trim();
        if refined.is_empty() {
            return false;
        }
        let refined = refined.to_lowercase();
        self.names.values().any(|name| name.contains(&refined))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Indexed names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ComposerIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        for name in iter {
            index.insert(name.as_ref());
        }
        index
    }
}
