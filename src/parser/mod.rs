//! Piece/movement classification of album track titles.
//!
//! Media catalogs have no notion of a work spanning several tracks, so
//! the hierarchy is rebuilt from the titles themselves. [`TitleParser`]
//! walks an album's titles in order and emits [`ParseEvent`]s:
//!
//! - a title no rule can split stands alone as a piece with no movements
//! - a split whose piece half continues the piece in progress becomes a
//!   movement of that piece
//! - any other split opens a new piece whose first movement is that track
//!
//! Every track therefore ends up as exactly one playable unit: either a
//! movement, or a piece without movements.
//!
//! # Example
//!
//! ```ignore
//! use classical_library::parser::{ComposerIndex, TitleParser, group_pieces};
//!
//! let parser = TitleParser::new();
//! let events = parser.parse(&titles, &ComposerIndex::new());
//! for piece in group_pieces(&events) {
//!     println!("{} ({} movements)", piece.title, piece.movements.len());
//! }
//! ```

mod composers;
mod rules;

pub use composers::ComposerIndex;
pub use rules::{Rule, default_rules};

use serde::Serialize;

/// Provenance of a title no rule could split.
pub const NO_MATCH: &str = "none";

/// Provenance of a title reduced to a lone piece by stripping a composer prefix.
pub const COMPOSER_PREFIX: &str = "composer_prefix";

/// One classification decision for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ParseEvent {
    /// A new piece starts at `track`.
    PieceFound {
        track: usize,
        title: String,
        rule: &'static str,
    },
    /// `track` is a movement of the most recently found piece.
    MovementFound {
        track: usize,
        title: String,
        rule: &'static str,
    },
}

impl ParseEvent {
    pub fn track(&self) -> usize {
        match self {
            ParseEvent::PieceFound { track, .. } | ParseEvent::MovementFound { track, .. } => {
                *track
            }
        }
    }
}

/// How a single title was split.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Split {
    Alone {
        title: String,
        rule: &'static str,
    },
    Grouped {
        piece: String,
        movement: String,
        rule: &'static str,
    },
}

/// Rule-driven piece/movement parser.
#[derive(Debug, Clone)]
pub struct TitleParser {
    rules: Vec<Rule>,
}

impl Default for TitleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleParser {
    /// Parser with the built-in rule list.
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Parser with a custom rule list, tried in the given order.
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify one album's titles, in track order.
    ///
    /// An empty title list yields no events.
    pub fn parse<S: AsRef<str>>(&self, titles: &[S], composers: &ComposerIndex) -> Vec<ParseEvent> {
        let mut events = Vec::with_capacity(titles.len() + titles.len() / 2);
        let mut current: Option<String> = None;

        for (track, raw) in titles.iter().enumerate() {
            match self.split(raw.as_ref().trim(), composers) {
                Split::Alone { title, rule } => {
                    tracing::trace!(target: "parser", track, %title, rule, "standalone piece");
                    events.push(ParseEvent::PieceFound { track, title, rule });
                    current = None;
                }
                Split::Grouped {
                    piece,
                    movement,
                    rule,
                } => {
                    let continues = current
                        .as_deref()
                        .is_some_and(|open| same_piece(open, &piece));
                    if !continues {
                        tracing::trace!(target: "parser", track, %piece, rule, "piece");
                        events.push(ParseEvent::PieceFound {
                            track,
                            title: piece.clone(),
                            rule,
                        });
                        current = Some(piece);
                    }
                    tracing::trace!(target: "parser", track, %movement, rule, "movement");
                    events.push(ParseEvent::MovementFound {
                        track,
                        title: movement,
                        rule,
                    });
                }
            }
        }
        events
    }

    /// Apply the first rule that fires.
    ///
    /// When that rule's piece half is really a composer name, the prefix is
    /// dropped and the remainder is split once more.
    fn split(&self, title: &str, composers: &ComposerIndex) -> Split {
        let Some((first, second, rule)) = self.first_split(title) else {
            return Split::Alone {
                title: title.to_string(),
                rule: NO_MATCH,
            };
        };

        if !composers.contains(&first) {
            return Split::Grouped {
                piece: first,
                movement: second,
                rule,
            };
        }

        match self.first_split(&second) {
            Some((piece, movement, rule)) => Split::Grouped {
                piece,
                movement,
                rule,
            },
            None => Split::Alone {
                title: second,
                rule: COMPOSER_PREFIX,
            },
        }
    }

    fn first_split(&self, title: &str) -> Option<(String, String, &'static str)> {
        self.rules.iter().find_map(|rule| {
            rule.split(title)
                .map(|(piece, movement)| (piece, movement, rule.name()))
        })
    }
}

/// Loose comparison of piece titles from neighbouring tracks.
///
/// Case, runs of whitespace and trailing punctuation are ignored, and one
/// title may extend the other at a word boundary ("Symphony No. 5" vs
/// "Symphony No. 5 in C minor"), but "Symphony No. 1" never continues
/// "Symphony No. 10".
pub fn same_piece(open: &str, candidate: &str) -> bool {
    let a = normalize(open);
    let b = normalize(candidate);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if !long.starts_with(short.as_str()) {
        return false;
    }
    long[short.len()..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric())
}

fn normalize(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ';', ':', '.', '-'])
        .trim_end()
        .to_lowercase()
}

/// A parsed movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMovement {
    pub track: usize,
    pub title: String,
}

/// A parsed piece with its movements in track order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedPiece {
    /// Track that opened the piece
    pub track: usize,
    pub title: String,
    pub rule: &'static str,
    pub movements: Vec<ParsedMovement>,
}

/// Fold an event sequence into pieces, preserving order.
///
/// A movement event with no preceding piece is ignored; [`TitleParser`]
/// never produces one.
pub fn group_pieces(events: &[ParseEvent]) -> Vec<ParsedPiece> {
    let mut pieces: Vec<ParsedPiece> = Vec::new();
    for event in events {
        match event {
            ParseEvent::PieceFound { track, title, rule } => pieces.push(ParsedPiece {
                track: *track,
                title: title.clone(),
                rule: *rule,
                movements: Vec::new(),
            }),
            ParseEvent::MovementFound { track, title, .. } => {
                if let Some(piece) = pieces.last_mut() {
                    piece.movements.push(ParsedMovement {
                        track: *track,
                        title: title.clone(),
                    });
                }
            }
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(titles: &[&str]) -> Vec<ParsedPiece> {
        group_pieces(&TitleParser::new().parse(titles, &ComposerIndex::new()))
    }

    fn movement_titles(piece: &ParsedPiece) -> Vec<&str> {
        piece.movements.iter().map(|m| m.title.as_str()).collect()
    }

    #[test]
    fn test_symphony_then_nocturne() {
        let pieces = parse(&[
            "Symphony No. 5: I. Allegro",
            "Symphony No. 5: II. Andante",
            "Nocturne in E-flat",
        ]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].title, "Symphony No. 5");
        assert_eq!(movement_titles(&pieces[0]), vec!["I. Allegro", "II. Andante"]);
        assert_eq!(pieces[1].title, "Nocturne in E-flat");
        assert!(pieces[1].movements.is_empty());
        assert_eq!(pieces[1].rule, NO_MATCH);
    }

    #[test]
    fn test_event_sequence() {
        let events = TitleParser::new().parse(
            &["Cello Suite No. 1 - Prelude", "Cello Suite No. 1 - Allemande"],
            &ComposerIndex::new(),
        );
        assert_eq!(
            events,
            vec![
                ParseEvent::PieceFound {
                    track: 0,
                    title: "Cello Suite No. 1".to_string(),
                    rule: "spaced_dash"
                },
                ParseEvent::MovementFound {
                    track: 0,
                    title: "Prelude".to_string(),
                    rule: "spaced_dash"
                },
                ParseEvent::MovementFound {
                    track: 1,
                    title: "Allemande".to_string(),
                    rule: "spaced_dash"
                },
            ]
        );
    }

    #[test]
    fn test_empty_album_yields_no_events() {
        let titles: [&str; 0] = [];
        assert!(TitleParser::new().parse(&titles, &ComposerIndex::new()).is_empty());
    }

    #[test]
    fn test_new_piece_replaces_open_piece() {
        let pieces = parse(&[
            "Symphony No. 1: I. Adagio",
            "Symphony No. 10: I. Adagio",
            "Symphony No. 10: II. Scherzo",
        ]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].movements.len(), 1);
        assert_eq!(pieces[1].title, "Symphony No. 10");
        assert_eq!(movement_titles(&pieces[1]), vec!["I. Adagio", "II. Scherzo"]);
    }

    #[test]
    fn test_standalone_title_closes_open_piece() {
        let pieces = parse(&[
            "Suite: Prelude",
            "Interlude",
            "Suite: Gigue",
        ]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].title, "Suite");
        assert_eq!(movement_titles(&pieces[2]), vec!["Gigue"]);
    }

    #[test]
    fn test_mixed_separator_conventions_continue_piece() {
        let pieces = parse(&[
            "Symphony No. 7: I. Poco sostenuto",
            "Symphony No. 7 II. Allegretto",
            "Symphony No. 7, - III. Presto",
        ]);
        assert_eq!(pieces.len(), 1);
        assert_eq!(
            movement_titles(&pieces[0]),
            vec!["I. Poco sostenuto", "II. Allegretto", "III. Presto"]
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let events = TitleParser::new().parse(&["Requiem: Dies irae - Tuba mirum"], &ComposerIndex::new());
        assert_eq!(
            events[0],
            ParseEvent::PieceFound {
                track: 0,
                title: "Requiem".to_string(),
                rule: "colon"
            }
        );
        assert_eq!(
            events[1],
            ParseEvent::MovementFound {
                track: 0,
                title: "Dies irae - Tuba mirum".to_string(),
                rule: "colon"
            }
        );
    }

    #[test]
    fn test_composer_prefix_is_stripped() {
        let composers: ComposerIndex = ["Brahms, Johannes"].into_iter().collect();
        let parser = TitleParser::new();
        let pieces = group_pieces(&parser.parse(
            &[
                "Brahms: Symphony No. 1 - I. Un poco sostenuto",
                "Brahms: Symphony No. 1 - II. Andante sostenuto",
                "Brahms: Intermezzo in A",
            ],
            &composers,
        ));
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].title, "Symphony No. 1");
        assert_eq!(pieces[0].rule, "spaced_dash");
        assert_eq!(pieces[0].movements.len(), 2);
        assert_eq!(pieces[1].title, "Intermezzo in A");
        assert_eq!(pieces[1].rule, COMPOSER_PREFIX);
        assert!(pieces[1].movements.is_empty());
    }

    #[test]
    fn test_composer_prefix_ignored_without_index_entry() {
        let pieces = parse(&["Brahms: Intermezzo in A"]);
        assert_eq!(pieces[0].title, "Brahms");
        assert_eq!(movement_titles(&pieces[0]), vec!["Intermezzo in A"]);
    }

    #[test]
    fn test_titles_are_trimmed() {
        let pieces = parse(&["  Ave Maria  ", ""]);
        assert_eq!(pieces[0].title, "Ave Maria");
        assert_eq!(pieces[1].title, "");
    }

    #[test]
    fn test_same_piece() {
        assert!(same_piece("Symphony No. 5", "symphony  no. 5"));
        assert!(same_piece("Symphony No. 5", "Symphony No. 5,"));
        assert!(same_piece("Symphony No. 5", "Symphony No. 5 in C minor, Op. 67"));
        assert!(!same_piece("Symphony No. 1", "Symphony No. 10"));
        assert!(!same_piece("Suite", "Serenade"));
        assert!(!same_piece("", "Suite"));
    }

    #[test]
    fn test_custom_rule_list() {
        let parser = TitleParser::with_rules(vec![
            Rule::new("slash", r"^(?P<piece>[^/]+?)\s*/\s*(?P<movement>.+)$").unwrap(),
        ]);
        let pieces = group_pieces(&parser.parse(
            &["Partita / Chaconne", "Symphony No. 5: I. Allegro"],
            &ComposerIndex::new(),
        ));
        assert_eq!(pieces[0].title, "Partita");
        assert_eq!(pieces[1].title, "Symphony No. 5: I. Allegro");
        assert_eq!(pieces[1].rule, NO_MATCH);
    }
}
