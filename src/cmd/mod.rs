pub mod simulate;
pub mod validate;

use comfy_table::presets::ASCII_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use tilewatch::game::{Game, MoveKind};

/// Renders the move list as a transcript table.
pub fn move_table(game: &Game) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "#",
            "player",
            "kind",
            "coord",
            "word",
            "points",
            game.nicknames[0].as_str(),
            game.nicknames[1].as_str(),
        ]);
    for mov in &game.moves {
        let coord = mov
            .placement
            .as_ref()
            .filter(|_| mov.kind == MoveKind::Regular)
            .map(|placement| placement.anchor.gcg_label(placement.orientation))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(mov.number).set_alignment(CellAlignment::Right),
            Cell::new(&game.nicknames[mov.player]),
            Cell::new(mov.kind),
            Cell::new(coord),
            Cell::new(mov.gcg_word()),
            Cell::new(mov.points).set_alignment(CellAlignment::Right),
            Cell::new(mov.score[0]).set_alignment(CellAlignment::Right),
            Cell::new(mov.score[1]).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
