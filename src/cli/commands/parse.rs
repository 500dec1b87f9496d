//! Title parser playground.

use crate::parser::{ComposerIndex, ParsedPiece, TitleParser, group_pieces};

fn parse_titles(titles: &[String], composers: &[String]) -> Vec<ParsedPiece> {
    let mut index = ComposerIndex::new();
    for name in composers {
        index.insert(name);
    }
    let events = TitleParser::new().parse(titles, &index);
    group_pieces(&events)
}

/// Print the pieces and movements the parser finds in `titles`
pub fn cmd_parse(titles: &[String], composers: &[String]) -> anyhow::Result<()> {
    for piece in parse_titles(titles, composers) {
        println!("{:>3}. {}  [{}]", piece.track + 1, piece.title, piece.rule);
        for movement in &piece.movements {
            println!("       {:>3}. {}", movement.track + 1, movement.title);
        }
    }
    Ok(())
}
