//! Tile grid model and cell classification predicates.
//!
//! Rows are stored exactly as supplied, so a malformed level may declare rows
//! of different lengths. Every lookup is bounds-checked per row.

use serde::{Deserialize, Serialize};

use crate::NavError;

/// Symbol used for solid platform tiles.
pub const PLATFORM_SYMBOL: char = 'P';
/// Symbol used for empty air.
pub const EMPTY_SYMBOL: char = ' ';
/// Symbol used for hazard (spike) tiles.
pub const HAZARD_SYMBOL: char = 'S';
/// Symbol used for the goal flag.
pub const GOAL_SYMBOL: char = 'F';
/// Symbol used for the human player's spawn point.
pub const PLAYER_SPAWN_SYMBOL: char = 'X';
/// Symbol used for the autonomous agent's spawn point.
pub const AGENT_SPAWN_SYMBOL: char = 'A';

/// Classification of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Solid ground an agent can stand on.
    Platform,
    /// Empty air.
    Empty,
    /// Tile that harms the agent and blocks movement.
    Hazard,
    /// Goal flag marker.
    Goal,
    /// Spawn marker for the human player.
    PlayerSpawn,
    /// Spawn marker for the autonomous agent.
    AgentSpawn,
    /// Any symbol outside the level alphabet.
    Unknown,
}

impl TileKind {
    /// Classifies a grid symbol. Comparison ignores ASCII case so tiles marked
    /// in lowercase during platform extraction keep their meaning.
    #[must_use]
    pub fn from_symbol(symbol: char) -> Self {
        match symbol.to_ascii_uppercase() {
            PLATFORM_SYMBOL => Self::Platform,
            EMPTY_SYMBOL => Self::Empty,
            HAZARD_SYMBOL => Self::Hazard,
            GOAL_SYMBOL => Self::Goal,
            PLAYER_SPAWN_SYMBOL => Self::PlayerSpawn,
            AGENT_SPAWN_SYMBOL => Self::AgentSpawn,
            _ => Self::Unknown,
        }
    }

    /// Canonical symbol written when stamping this kind into a grid.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Platform => PLATFORM_SYMBOL,
            Self::Empty => EMPTY_SYMBOL,
            Self::Hazard => HAZARD_SYMBOL,
            Self::Goal => GOAL_SYMBOL,
            Self::PlayerSpawn => PLAYER_SPAWN_SYMBOL,
            Self::AgentSpawn => AGENT_SPAWN_SYMBOL,
            Self::Unknown => '?',
        }
    }

    /// Reports whether the tile supports an agent standing on top of it.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Platform)
    }

    /// Reports whether the tile is one of the level markers.
    #[must_use]
    pub const fn is_marker(self) -> bool {
        matches!(self, Self::Goal | Self::PlayerSpawn | Self::AgentSpawn)
    }
}

/// Case-insensitive set of symbols an agent may pass through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TraversableSet {
    symbols: Vec<char>,
}

impl TraversableSet {
    /// Creates a set from the provided symbols. Platform and hazard symbols
    /// are dropped, since neither may ever be traversed.
    #[must_use]
    pub fn new(symbols: impl IntoIterator<Item = char>) -> Self {
        let mut normalized: Vec<char> = symbols
            .into_iter()
            .map(|symbol| symbol.to_ascii_uppercase())
            .filter(|symbol| *symbol != PLATFORM_SYMBOL && *symbol != HAZARD_SYMBOL)
            .collect();
        normalized.sort_unstable();
        normalized.dedup();
        Self {
            symbols: normalized,
        }
    }

    /// Reports whether the symbol may be traversed.
    #[must_use]
    pub fn contains(&self, symbol: char) -> bool {
        let upper = symbol.to_ascii_uppercase();
        self.symbols.iter().any(|candidate| *candidate == upper)
    }

    /// Normalized symbols contained in the set.
    #[must_use]
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

impl Default for TraversableSet {
    fn default() -> Self {
        Self::new([
            EMPTY_SYMBOL,
            GOAL_SYMBOL,
            PLAYER_SPAWN_SYMBOL,
            AGENT_SPAWN_SYMBOL,
        ])
    }
}

impl From<String> for TraversableSet {
    fn from(value: String) -> Self {
        Self::new(value.chars())
    }
}

impl From<TraversableSet> for String {
    fn from(value: TraversableSet) -> Self {
        value.symbols.into_iter().collect()
    }
}

/// Rectangular (or defensively ragged) tile grid of single-character cells.
///
/// `x` indexes columns and `y` indexes rows, with row zero at the top of the
/// level. Coordinates are signed so callers can probe above or left of the
/// grid without wrapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LevelGrid {
    rows: Vec<Vec<char>>,
}

impl LevelGrid {
    /// Builds a grid from textual rows.
    #[must_use]
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.as_ref().chars().collect())
                .collect(),
        }
    }

    /// Number of rows in the grid.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Declared length of the provided row, if it exists.
    #[must_use]
    pub fn row_len(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(Vec::len)
    }

    /// Raw symbol stored at the provided cell.
    #[must_use]
    pub fn symbol(&self, x: i32, y: i32) -> Option<char> {
        let row = usize::try_from(y).ok()?;
        let column = usize::try_from(x).ok()?;
        self.rows.get(row)?.get(column).copied()
    }

    /// Classification of the provided cell.
    #[must_use]
    pub fn tile(&self, x: i32, y: i32) -> Option<TileKind> {
        self.symbol(x, y).map(TileKind::from_symbol)
    }

    /// Reports whether the cell exists and holds solid ground.
    #[must_use]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).is_some_and(TileKind::is_solid)
    }

    /// Reports whether the cell exists and holds a traversable symbol.
    #[must_use]
    pub fn is_traversable(&self, x: i32, y: i32, traversable: &TraversableSet) -> bool {
        self.symbol(x, y)
            .is_some_and(|symbol| traversable.contains(symbol))
    }

    /// Reports whether an agent can rest at `(x, y)`.
    ///
    /// The tile below must be solid and the tile itself must be traversable.
    /// A platform on the top row supports a standing position at `y = -1`.
    #[must_use]
    pub fn is_standable(&self, x: i32, y: i32, traversable: &TraversableSet) -> bool {
        let Some(below) = y.checked_add(1) else {
            return false;
        };
        if !self.is_solid(x, below) {
            return false;
        }
        below == 0 || self.is_traversable(x, y, traversable)
    }

    /// Location of the first cell holding the provided marker, scanning row-major.
    #[must_use]
    pub fn find_marker(&self, kind: TileKind) -> Option<(i32, i32)> {
        self.cells()
            .find(|(_, _, symbol)| TileKind::from_symbol(*symbol) == kind)
            .map(|(x, y, _)| (x, y))
    }

    /// Iterator over every stored cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, char)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(column, symbol)| {
                let x = i32::try_from(column).ok()?;
                let y = i32::try_from(row).ok()?;
                Some((x, y, *symbol))
            })
        })
    }

    /// Validates that `length` cells starting at `(column, row)` lie inside a single row.
    pub fn check_region(&self, row: i32, column: i32, length: usize) -> Result<(), NavError> {
        let rejected = NavError::InvalidGridRegion {
            row,
            column,
            length,
        };
        let (Ok(row_index), Ok(start)) = (usize::try_from(row), usize::try_from(column)) else {
            return Err(rejected);
        };
        let Some(row_len) = self.row_len(row_index) else {
            return Err(rejected);
        };
        match start.checked_add(length) {
            Some(end) if end <= row_len => Ok(()),
            _ => Err(rejected),
        }
    }

    /// Replaces a contiguous run of `length` cells within a single row.
    ///
    /// `fill` is cycled to cover the run, so `"P"` with a length of three
    /// stamps `"PPP"`. On error the grid is left untouched.
    pub fn update_region(
        &mut self,
        row: i32,
        column: i32,
        fill: &str,
        length: usize,
    ) -> Result<(), NavError> {
        self.check_region(row, column, length)?;
        if length == 0 {
            return Ok(());
        }
        if fill.is_empty() {
            return Err(NavError::InvalidGridRegion {
                row,
                column,
                length,
            });
        }

        let (Ok(row_index), Ok(start)) = (usize::try_from(row), usize::try_from(column)) else {
            return Err(NavError::InvalidGridRegion {
                row,
                column,
                length,
            });
        };
        let cells = &mut self.rows[row_index][start..start + length];
        for (cell, symbol) in cells.iter_mut().zip(fill.chars().cycle()) {
            *cell = symbol;
        }
        Ok(())
    }

    /// Textual rows of the grid.
    #[must_use]
    pub fn to_rows(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.iter().collect()).collect()
    }
}

impl From<Vec<String>> for LevelGrid {
    fn from(rows: Vec<String>) -> Self {
        Self::from_rows(rows)
    }
}

impl From<LevelGrid> for Vec<String> {
    fn from(grid: LevelGrid) -> Self {
        grid.to_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LevelGrid {
        LevelGrid::from_rows(["X P", "   ", "PPP"])
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(TileKind::from_symbol('p'), TileKind::Platform);
        assert_eq!(TileKind::from_symbol('s'), TileKind::Hazard);
        assert_eq!(TileKind::from_symbol('#'), TileKind::Unknown);
    }

    #[test]
    fn traversable_set_never_admits_platforms_or_hazards() {
        let set = TraversableSet::new(['p', 'S', ' ', 'f']);
        assert!(set.contains(' '));
        assert!(set.contains('F'));
        assert!(!set.contains('P'));
        assert!(!set.contains('s'));
    }

    #[test]
    fn standable_requires_solid_below_and_open_cell() {
        let grid = sample();
        let set = TraversableSet::default();

        assert!(grid.is_standable(0, 1, &set));
        assert!(grid.is_standable(2, 1, &set));
        assert!(!grid.is_standable(0, 0, &set), "spawn floats above air");
        assert!(grid.is_standable(2, -1, &set), "top-row platform supports y = -1");
        assert!(!grid.is_standable(1, 2, &set), "nothing below the last row");
    }

    #[test]
    fn ragged_rows_are_bounds_checked() {
        let grid = LevelGrid::from_rows(["PPPP", "P"]);
        assert_eq!(grid.symbol(3, 1), None);
        assert_eq!(grid.symbol(-1, 0), None);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.row_len(1), Some(1));
    }

    #[test]
    fn update_region_cycles_fill() {
        let mut grid = LevelGrid::from_rows(["     "]);
        grid.update_region(0, 1, "PS", 3).expect("region fits");
        assert_eq!(grid.to_rows(), vec![" PSP ".to_owned()]);
    }

    #[test]
    fn update_region_rejects_out_of_bounds_without_mutation() {
        let mut grid = sample();
        let before = grid.clone();

        let error = grid
            .update_region(2, 2, "P", 2)
            .expect_err("run overflows the row");
        assert_eq!(
            error,
            NavError::InvalidGridRegion {
                row: 2,
                column: 2,
                length: 2
            }
        );
        assert!(grid.update_region(-1, 0, "P", 1).is_err());
        assert!(grid.update_region(7, 0, "P", 1).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn find_marker_scans_row_major() {
        let grid = LevelGrid::from_rows([" F  ", "A  F"]);
        assert_eq!(grid.find_marker(TileKind::Goal), Some((1, 0)));
        assert_eq!(grid.find_marker(TileKind::AgentSpawn), Some((0, 1)));
        assert_eq!(grid.find_marker(TileKind::PlayerSpawn), None);
    }
}
