pub mod layout;

use std::collections::BTreeMap;
use std::fmt;

use strum_macros::Display;

pub use layout::{Language, BLANK};

/// Number of rows and columns of the board.
pub const BOARD_SIZE: u8 = 15;

/// A cell on the 15x15 board, 0-indexed. Columns run left to right,
/// rows top to bottom. Row 0 is labelled 'A', column 0 is labelled '1'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    pub col: u8,
    pub row: u8,
}

/// Reading direction of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// The cell following `coord` in reading direction, if on the board.
    pub fn step(&self, coord: Coord) -> Option<Coord> {
        match self {
            Self::Horizontal => coord.right(),
            Self::Vertical => coord.down(),
        }
    }

    /// The cell preceding `coord` in reading direction, if on the board.
    pub fn back(&self, coord: Coord) -> Option<Coord> {
        match self {
            Self::Horizontal => coord.left(),
            Self::Vertical => coord.up(),
        }
    }

    /// The cell `offset` steps after `anchor`, if on the board.
    pub fn offset(&self, anchor: Coord, offset: usize) -> Option<Coord> {
        let offset = u8::try_from(offset).ok()?;
        match self {
            Self::Horizontal => Coord::checked(anchor.col.checked_add(offset)?, anchor.row),
            Self::Vertical => Coord::checked(anchor.col, anchor.row.checked_add(offset)?),
        }
    }

    pub fn crossed(&self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

impl Coord {
    pub fn new(col: u8, row: u8) -> Self {
        debug_assert!(col < BOARD_SIZE && row < BOARD_SIZE);
        Self { col, row }
    }

    fn checked(col: u8, row: u8) -> Option<Self> {
        (col < BOARD_SIZE && row < BOARD_SIZE).then_some(Self { col, row })
    }

    pub fn left(&self) -> Option<Self> {
        self.col.checked_sub(1).map(|col| Self { col, row: self.row })
    }

    pub fn right(&self) -> Option<Self> {
        Self::checked(self.col + 1, self.row)
    }

    pub fn up(&self) -> Option<Self> {
        self.row.checked_sub(1).map(|row| Self { col: self.col, row })
    }

    pub fn down(&self) -> Option<Self> {
        Self::checked(self.col, self.row + 1)
    }

    /// All existing 4-neighbours.
    pub fn neighbours(&self) -> impl Iterator<Item = Coord> {
        [self.left(), self.right(), self.up(), self.down()]
            .into_iter()
            .flatten()
    }

    /// Coordinate label in GCG notation. Vertical words lead with the
    /// column number ("5G"), horizontal words with the row letter ("H4").
    pub fn gcg_label(&self, orientation: Orientation) -> String {
        let row_letter = (b'A' + self.row) as char;
        match orientation {
            Orientation::Vertical => format!("{}{}", self.col + 1, row_letter),
            Orientation::Horizontal => format!("{}{}", row_letter, self.col + 1),
        }
    }

    /// Parses a GCG coordinate label, accepting upper- and lowercase
    /// row letters. "H4"/"h4" is horizontal, "4H" vertical.
    pub fn parse_gcg(label: &str) -> Option<(Orientation, Self)> {
        let label = label.trim();
        let row_from = |c: char| -> Option<u8> {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            let row = (c.to_ascii_uppercase() as u8).checked_sub(b'A')?;
            (row < BOARD_SIZE).then_some(row)
        };
        let col_from = |digits: &str| -> Option<u8> {
            let number: u8 = digits.parse().ok()?;
            (1..=BOARD_SIZE).contains(&number).then(|| number - 1)
        };

        let mut chars = label.chars();
        let first = chars.next()?;
        let rest = chars.as_str();
        if first.is_ascii_alphabetic() {
            let row = row_from(first)?;
            let col = col_from(rest)?;
            return Some((Orientation::Horizontal, Self { col, row }));
        }
        let split = label.len().checked_sub(1)?;
        let last = label.chars().last()?;
        let row = row_from(last)?;
        let col = col_from(&label[..split])?;
        Some((Orientation::Vertical, Self { col, row }))
    }

    /// Key used in the status record board map: lowercase row letter
    /// followed by the 1-based column number ("h4").
    pub fn status_key(&self) -> String {
        format!("{}{}", (b'a' + self.row) as char, self.col + 1)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

/// A recognized tile: a letter guess and the recognition confidence
/// (0..=100). Blanks are '_' until an admin assigns them a lowercase
/// letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub letter: char,
    pub confidence: u8,
}

impl Tile {
    pub fn new(letter: char, confidence: u8) -> Self {
        Self { letter, confidence }
    }

    pub fn is_blank(&self) -> bool {
        self.letter == BLANK || self.letter.is_lowercase()
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.letter, self.confidence)
    }
}

/// Sparse tile set keyed by coordinate, used for full snapshots as well
/// as per-move new/removed tile sets.
pub type TileMap = BTreeMap<Coord, Tile>;

/// A full board snapshot at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    tiles: TileMap,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: Coord) -> Option<Tile> {
        self.tiles.get(&coord).copied()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.tiles.contains_key(&coord)
    }

    pub fn insert(&mut self, coord: Coord, tile: Tile) -> Option<Tile> {
        self.tiles.insert(coord, tile)
    }

    pub fn remove(&mut self, coord: Coord) -> Option<Tile> {
        self.tiles.remove(&coord)
    }

    /// Overwrites cells from `tiles`.
    pub fn merge(&mut self, tiles: &TileMap) {
        for (&coord, &tile) in tiles {
            self.tiles.insert(coord, tile);
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Coord, &Tile)> {
        self.tiles.iter()
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.tiles.keys().copied()
    }

    /// Letters on the board, in coordinate order.
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.tiles.values().map(|tile| tile.letter)
    }

    /// Text rendering with new tiles bracketed and removed cells dashed.
    /// Empty cells show their premium marker.
    pub fn grid(&self, new_tiles: &TileMap, removed_tiles: &TileMap) -> String {
        let mut out = String::from("  |");
        for col in 0..BOARD_SIZE {
            out.push_str(&format!("{:2} ", col + 1));
        }
        out.push('\n');
        for row in 0..BOARD_SIZE {
            out.push_str(&format!("{} |", (b'A' + row) as char));
            for col in 0..BOARD_SIZE {
                let coord = Coord::new(col, row);
                if let Some(tile) = self.get(coord) {
                    if new_tiles.contains_key(&coord) {
                        out.push_str(&format!("[{}]", tile.letter));
                    } else {
                        out.push_str(&format!(" {} ", tile.letter));
                    }
                } else if removed_tiles.contains_key(&coord) {
                    out.push_str(" - ");
                } else {
                    out.push_str(&format!(" {} ", layout::premium_marker(coord)));
                }
            }
            out.push('\n');
        }
        out
    }
}

impl FromIterator<(Coord, Tile)> for Board {
    fn from_iter<I: IntoIterator<Item = (Coord, Tile)>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let empty = TileMap::new();
        f.write_str(&self.grid(&empty, &empty))
    }
}
