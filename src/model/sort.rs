//! Article-insensitive ("anarthrous") title ordering.
//!
//! Titles such as "The Art of Fugue" sort under "A", not "T". SQLite has
//! no collation for this, so browse queries sort in memory with
//! [`anarthrous_cmp`].

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

static LEADING_ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(a|an|the)\s+").expect("article pattern is valid"));

/// Strip a leading "A", "An" or "The" (any case) and the whitespace after it.
pub fn remove_article(title: &str) -> &str {
    match LEADING_ARTICLE.find(title) {
        Some(m) => &title[m.end()..],
        None => title,
    }
}

/// Compare two titles case-insensitively, ignoring a leading article.
///
/// Ties fall back to the raw strings so the ordering stays total.
pub fn anarthrous_cmp(a: &str, b: &str) -> Ordering {
    let left = remove_article(a).to_lowercase();
    let right = remove_article(b).to_lowercase();
    left.cmp(&right).then_with(|| a.cmp(b))
}
