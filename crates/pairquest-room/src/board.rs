//! Tile themes and board generation.

use std::fmt;
use std::str::FromStr;

use pairquest_protocol::TileValue;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::RoomError;

const NUMBERS: [&str; 50] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14",
    "15", "16", "17", "18", "19", "20", "21", "22", "23", "24", "25", "26",
    "27", "28", "29", "30", "31", "32", "33", "34", "35", "36", "37", "38",
    "39", "40", "41", "42", "43", "44", "45", "46", "47", "48", "49", "50",
];

const LETTERS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O",
    "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

const ICONS: [&str; 32] = [
    "🍎", "🍌", "🍇", "🍉", "🍒", "🍓", "🍍", "🥝", "🥕", "🌽", "🍄", "🌵",
    "🌻", "🌙", "⭐", "🔥", "⚡", "❄", "🎈", "🎲", "🎸", "🚀", "🚲", "⚓",
    "🐱", "🐶", "🐸", "🐙", "🦊", "🐼", "🐧", "🦉",
];

/// The symbol set a room draws its tiles from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Numbers,
    Letters,
    Icons,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numbers => "numbers",
            Self::Letters => "letters",
            Self::Icons => "icons",
        }
    }

    /// Every symbol this theme can put on a board.
    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            Self::Numbers => &NUMBERS,
            Self::Letters => &LETTERS,
            Self::Icons => &ICONS,
        }
    }

    /// Largest grid this theme can fill without repeating a pair.
    pub fn max_grid_size(&self) -> usize {
        self.symbols().len() * 2
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numbers" => Ok(Self::Numbers),
            "letters" => Ok(Self::Letters),
            "icons" => Ok(Self::Icons),
            other => Err(RoomError::InvalidSettings(format!(
                "unknown theme {other:?}"
            ))),
        }
    }
}

/// Builds a shuffled board of `grid_size` tiles, each value appearing
/// exactly twice.
///
/// Does not validate its input: callers check the grid against the theme
/// with [`RoomSettings::validate`](crate::RoomSettings::validate) first.
/// An odd grid size or one larger than the theme allows yields a board
/// shorter than `grid_size`.
pub fn generate_board(grid_size: usize, theme: Theme) -> Vec<TileValue> {
    let mut board: Vec<TileValue> = theme
        .symbols()
        .iter()
        .take(grid_size / 2)
        .flat_map(|symbol| [symbol.to_string(), symbol.to_string()])
        .collect();
    board.shuffle(&mut rand::rng());
    board
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn counts(board: &[TileValue]) -> HashMap<&str, usize> {
        let mut map = HashMap::new();
        for tile in board {
            *map.entry(tile.as_str()).or_default() += 1;
        }
        map
    }

    #[test]
    fn test_generate_board_every_value_twice() {
        for theme in [Theme::Numbers, Theme::Letters, Theme::Icons] {
            for grid in (4..=theme.max_grid_size()).step_by(2) {
                let board = generate_board(grid, theme);
                assert_eq!(board.len(), grid, "{theme} grid {grid}");
                let counts = counts(&board);
                assert_eq!(counts.len(), grid / 2);
                assert!(counts.values().all(|&n| n == 2), "{theme} grid {grid}");
            }
        }
    }

    #[test]
    fn test_generate_board_uses_theme_symbols() {
        let board = generate_board(8, Theme::Letters);
        for tile in &board {
            assert!(LETTERS.contains(&tile.as_str()), "unexpected tile {tile}");
        }
    }

    #[test]
    fn test_generate_board_order_varies() {
        let first = generate_board(32, Theme::Numbers);
        let differs = (0..20).any(|_| generate_board(32, Theme::Numbers) != first);
        assert!(differs, "20 boards in a row came out identical");
    }

    #[test]
    fn test_theme_from_str_round_trips_display() {
        for theme in [Theme::Numbers, Theme::Letters, Theme::Icons] {
            assert_eq!(theme.to_string().parse::<Theme>().unwrap(), theme);
        }
    }

    #[test]
    fn test_theme_from_str_unknown_is_invalid_settings() {
        let err = "animals".parse::<Theme>().unwrap_err();
        assert!(matches!(err, RoomError::InvalidSettings(_)));
    }

    #[test]
    fn test_symbol_tables_have_no_duplicates() {
        for theme in [Theme::Numbers, Theme::Letters, Theme::Icons] {
            let symbols = theme.symbols();
            let unique: std::collections::HashSet<_> = symbols.iter().collect();
            assert_eq!(unique.len(), symbols.len(), "{theme}");
        }
    }
}
