use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::Coord;

/// Letter used for an unassigned blank tile.
pub const BLANK: char = '_';

/// Bonus added when a move empties the rack (7 tiles placed).
pub const FULL_RACK_BONUS: i32 = 50;

/// Tile set of the game. Selects letter values and bag contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    German,
    English,
}

impl Language {
    /// Value of a single letter. Blanks and lowercase letters
    /// (blanks with an assigned letter) are worth 0.
    pub fn letter_score(&self, letter: char) -> i32 {
        if letter == BLANK || letter.is_lowercase() {
            return 0;
        }
        match self {
            Self::German => match letter {
                'A' | 'D' | 'E' | 'I' | 'N' | 'R' | 'S' | 'T' | 'U' => 1,
                'G' | 'H' | 'L' | 'O' => 2,
                'B' | 'M' | 'W' | 'Z' => 3,
                'C' | 'F' | 'K' | 'P' => 4,
                'J' | 'V' | 'Ä' | 'Ü' => 6,
                'Ö' | 'X' => 8,
                'Q' | 'Y' => 10,
                _ => 0,
            },
            Self::English => match letter {
                'A' | 'E' | 'I' | 'L' | 'N' | 'O' | 'R' | 'S' | 'T' | 'U' => 1,
                'D' | 'G' => 2,
                'B' | 'C' | 'M' | 'P' => 3,
                'F' | 'H' | 'V' | 'W' | 'Y' => 4,
                'K' => 5,
                'J' | 'X' => 8,
                'Q' | 'Z' => 10,
                _ => 0,
            },
        }
    }

    /// Tile distribution as (letter, count) pairs.
    pub fn distribution(&self) -> &'static [(char, u8)] {
        match self {
            Self::German => &[
                ('A', 5),
                ('B', 2),
                ('C', 2),
                ('D', 4),
                ('E', 15),
                ('F', 2),
                ('G', 3),
                ('H', 4),
                ('I', 6),
                ('J', 1),
                ('K', 2),
                ('L', 3),
                ('M', 4),
                ('N', 9),
                ('O', 3),
                ('P', 1),
                ('Q', 1),
                ('R', 6),
                ('S', 7),
                ('T', 6),
                ('U', 6),
                ('V', 1),
                ('W', 1),
                ('X', 1),
                ('Y', 1),
                ('Z', 1),
                ('Ä', 1),
                ('Ö', 1),
                ('Ü', 1),
                (BLANK, 2),
            ],
            Self::English => &[
                ('A', 9),
                ('B', 2),
                ('C', 2),
                ('D', 4),
                ('E', 12),
                ('F', 2),
                ('G', 3),
                ('H', 2),
                ('I', 9),
                ('J', 1),
                ('K', 1),
                ('L', 4),
                ('M', 2),
                ('N', 6),
                ('O', 8),
                ('P', 2),
                ('Q', 1),
                ('R', 6),
                ('S', 4),
                ('T', 6),
                ('U', 4),
                ('V', 2),
                ('W', 2),
                ('X', 1),
                ('Y', 2),
                ('Z', 1),
                (BLANK, 2),
            ],
        }
    }

    /// The full bag as a flat multiset of letters.
    pub fn full_bag(&self) -> Vec<char> {
        self.distribution()
            .iter()
            .flat_map(|&(letter, count)| std::iter::repeat(letter).take(count as usize))
            .collect()
    }

    /// Total number of tiles in the bag (102 for German, 100 for English).
    pub fn bag_size(&self) -> usize {
        self.distribution().iter().map(|&(_, count)| count as usize).sum()
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::German
    }
}

// Premium squares of the standard board, 0-indexed (col, row).
// The layout is symmetric, so the tuple order never matters.
const TRIPLE_WORD: &[(u8, u8)] = &[
    (0, 0),
    (7, 0),
    (14, 0),
    (0, 7),
    (14, 7),
    (0, 14),
    (7, 14),
    (14, 14),
];

const DOUBLE_WORD: &[(u8, u8)] = &[
    (1, 1),
    (2, 2),
    (3, 3),
    (4, 4),
    (7, 7),
    (10, 10),
    (11, 11),
    (12, 12),
    (13, 13),
    (13, 1),
    (12, 2),
    (11, 3),
    (10, 4),
    (4, 10),
    (3, 11),
    (2, 12),
    (1, 13),
];

const TRIPLE_LETTER: &[(u8, u8)] = &[
    (5, 1),
    (9, 1),
    (1, 5),
    (5, 5),
    (9, 5),
    (13, 5),
    (1, 9),
    (5, 9),
    (9, 9),
    (13, 9),
    (5, 13),
    (9, 13),
];

const DOUBLE_LETTER: &[(u8, u8)] = &[
    (3, 0),
    (11, 0),
    (6, 2),
    (8, 2),
    (0, 3),
    (7, 3),
    (14, 3),
    (2, 6),
    (6, 6),
    (8, 6),
    (12, 6),
    (3, 7),
    (11, 7),
    (2, 8),
    (6, 8),
    (8, 8),
    (12, 8),
    (0, 11),
    (7, 11),
    (14, 11),
    (6, 12),
    (8, 12),
    (3, 14),
    (11, 14),
];

/// Letter multiplier of a square (1, 2 or 3).
pub fn letter_multiplier(coord: Coord) -> i32 {
    let cell = (coord.col, coord.row);
    if DOUBLE_LETTER.contains(&cell) {
        2
    } else if TRIPLE_LETTER.contains(&cell) {
        3
    } else {
        1
    }
}

/// Word multiplier of a square (1, 2 or 3).
pub fn word_multiplier(coord: Coord) -> i32 {
    let cell = (coord.col, coord.row);
    if DOUBLE_WORD.contains(&cell) {
        2
    } else if TRIPLE_WORD.contains(&cell) {
        3
    } else {
        1
    }
}

/// Marker of a premium square for board rendering.
pub fn premium_marker(coord: Coord) -> char {
    let cell = (coord.col, coord.row);
    if TRIPLE_WORD.contains(&cell) {
        '*'
    } else if DOUBLE_WORD.contains(&cell) {
        '+'
    } else if TRIPLE_LETTER.contains(&cell) {
        '^'
    } else if DOUBLE_LETTER.contains(&cell) {
        '\''
    } else {
        '.'
    }
}
