//! Title-splitting rules.
//!
//! Each rule looks for one separator convention used by taggers to encode
//! "work + movement" in a single track title. A rule either splits the
//! title into `(piece, movement)` or does not fire. Rules are tried in
//! priority order and the first one that fires wins.

use regex::Regex;

/// One named splitting rule.
#[derive(Debug, Clone)]
pub struct Rule {
    name: &'static str,
    pattern: Regex,
}

impl Rule {
    /// Create a rule from a pattern with `piece` and `movement` named groups.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
        })
    }

    /// Provenance name, used in parse diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Split `title` into `(piece, movement)`, if this rule fires.
    ///
    /// Both halves are trimmed; a rule whose match leaves either half
    /// empty does not fire.
    pub fn split(&self, title: &str) -> Option<(String, String)> {
        let caps = self.pattern.captures(title)?;
        let piece = caps.name("piece")?.as_str().trim();
        let movement = caps.name("movement")?.as_str().trim();
        if piece.is_empty() || movement.is_empty() {
            return None;
        }
        Some((piece.to_string(), movement.to_string()))
    }
}

/// The built-in rules, highest priority first.
///
/// - `bracketed_number`: `Goldberg Variations [3] Variation 2`
/// - `colon`: `Symphony No. 5: I. Allegro con brio`
/// - `spaced_dash`: `Cello Suite No. 1 - Prelude` (hyphen, en or em dash)
/// - `roman_numeral`: `Symphony No. 7 II. Allegretto`
pub fn default_rules() -> Vec<Rule> {
    const RULES: [(&str, &str); 4] = [
        (
            "bracketed_number",
            r"^(?P<piece>[^\[]+?)\s*[:\-–—]?\s*(?P<movement>\[\d+\].*)$",
        ),
        ("colon", r"^(?P<piece>[^:]+?)\s*:\s*(?P<movement>.+)$"),
        ("spaced_dash", r"^(?P<piece>.+?)\s+[-–—]\s+(?P<movement>.+)$"),
        (
            "roman_numeral",
            r"^(?P<piece>.+?)[,;]?\s+(?P<movement>[IVXLC]+\.\s+.+)$",
        ),
    ];
    RULES
        .iter()
        .map(|(name, pattern)| Rule::new(name, pattern).expect("built-in rule pattern is valid"))
        .collect()
}
