//! Terrain edit descriptors and platform rectangles.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    grid::{LevelGrid, TileKind, EMPTY_SYMBOL, HAZARD_SYMBOL, PLATFORM_SYMBOL},
    NavError,
};

/// Integer tile coordinate addressed by an edit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCell {
    /// Column of the tile.
    pub x: i32,
    /// Row of the tile.
    pub y: i32,
}

impl TileCell {
    /// Creates a tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned block of platform tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatformRect {
    column: i32,
    row: i32,
    width: u32,
    height: u32,
}

impl PlatformRect {
    /// Creates a rectangle anchored at its top-left tile.
    #[must_use]
    pub const fn new(column: i32, row: i32, width: u32, height: u32) -> Self {
        Self {
            column,
            row,
            width,
            height,
        }
    }

    /// Leftmost column.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Topmost row.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Number of columns covered.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows covered.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn column_end(&self) -> i64 {
        i64::from(self.column) + i64::from(self.width)
    }

    fn row_end(&self) -> i64 {
        i64::from(self.row) + i64::from(self.height)
    }

    /// Reports whether the tile lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, cell: TileCell) -> bool {
        let (x, y) = (i64::from(cell.x), i64::from(cell.y));
        x >= i64::from(self.column)
            && x < self.column_end()
            && y >= i64::from(self.row)
            && y < self.row_end()
    }

    /// Reports whether two rectangles share at least one tile.
    #[must_use]
    pub fn overlaps(&self, other: &PlatformRect) -> bool {
        i64::from(self.column) < other.column_end()
            && i64::from(other.column) < self.column_end()
            && i64::from(self.row) < other.row_end()
            && i64::from(other.row) < self.row_end()
    }
}

/// Splits the grid's platform tiles into maximal rectangles.
///
/// Tiles are scanned row-major; each unclaimed platform tile seeds a
/// rectangle that grows right as far as possible and then down while every
/// tile of the next row segment is also an unclaimed platform.
#[must_use]
pub fn extract_platforms(grid: &LevelGrid) -> Vec<PlatformRect> {
    let mut claimed: BTreeSet<(i32, i32)> = BTreeSet::new();
    let mut rects = Vec::new();
    let free = |claimed: &BTreeSet<(i32, i32)>, x: i32, y: i32| {
        grid.is_solid(x, y) && !claimed.contains(&(x, y))
    };

    for (x, y, _) in grid.cells() {
        if !free(&claimed, x, y) {
            continue;
        }

        let mut width = 1;
        while free(&claimed, x + width, y) {
            width += 1;
        }
        let mut height = 1;
        while (x..x + width).all(|column| free(&claimed, column, y + height)) {
            height += 1;
        }

        for row in y..y + height {
            for column in x..x + width {
                let _ = claimed.insert((column, row));
            }
        }
        rects.push(PlatformRect::new(
            x,
            y,
            width.unsigned_abs(),
            height.unsigned_abs(),
        ));
    }
    rects
}

/// Category of terrain mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EditKind {
    /// Stamp a short run of platform tiles.
    AddPlatform,
    /// Stamp a single hazard tile.
    AddHazard,
    /// Clear an existing platform rectangle back to empty tiles.
    RemovePlatform,
}

impl EditKind {
    /// Every edit kind in evaluation order.
    pub const ALL: [EditKind; 3] = [Self::AddPlatform, Self::AddHazard, Self::RemovePlatform];
}

/// Replacement of a contiguous run of cells within one row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionUpdate {
    /// Row being rewritten.
    pub row: i32,
    /// First column being rewritten.
    pub column: i32,
    /// Symbols cycled across the run.
    pub fill: String,
    /// Number of cells rewritten.
    pub length: usize,
}

/// Concrete grid mutation produced by an edit candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainEdit {
    kind: EditKind,
    target: TileCell,
    updates: Vec<RegionUpdate>,
}

impl TerrainEdit {
    /// Platform run of `length` tiles on `row`, starting at `column`.
    #[must_use]
    pub fn add_platform(row: i32, column: i32, length: usize, target: TileCell) -> Self {
        Self {
            kind: EditKind::AddPlatform,
            target,
            updates: vec![RegionUpdate {
                row,
                column,
                fill: PLATFORM_SYMBOL.to_string(),
                length,
            }],
        }
    }

    /// Single hazard tile at `cell`.
    #[must_use]
    pub fn add_hazard(cell: TileCell) -> Self {
        Self {
            kind: EditKind::AddHazard,
            target: cell,
            updates: vec![RegionUpdate {
                row: cell.y,
                column: cell.x,
                fill: HAZARD_SYMBOL.to_string(),
                length: 1,
            }],
        }
    }

    /// Clears every tile of `rect`.
    #[must_use]
    pub fn remove_platform(rect: &PlatformRect) -> Self {
        let length = usize::try_from(rect.width()).unwrap_or(usize::MAX);
        let updates = (0..rect.height())
            .filter_map(|offset| i32::try_from(offset).ok())
            .map(|offset| RegionUpdate {
                row: rect.row().saturating_add(offset),
                column: rect.column(),
                fill: EMPTY_SYMBOL.to_string(),
                length,
            })
            .collect();
        Self {
            kind: EditKind::RemovePlatform,
            target: TileCell::new(rect.column(), rect.row()),
            updates,
        }
    }

    /// Category of the edit.
    #[must_use]
    pub const fn kind(&self) -> EditKind {
        self.kind
    }

    /// Tile the edit is anchored on.
    #[must_use]
    pub const fn target(&self) -> TileCell {
        self.target
    }

    /// Row rewrites performed by the edit.
    #[must_use]
    pub fn updates(&self) -> &[RegionUpdate] {
        &self.updates
    }

    /// First tile matching `guarded` whose kind the edit would change on `grid`.
    ///
    /// Rewriting a tile with a symbol of the same kind leaves it undisturbed.
    #[must_use]
    pub fn disturbed_cell(
        &self,
        grid: &LevelGrid,
        guarded: impl Fn(TileCell) -> bool,
    ) -> Option<TileCell> {
        self.updates.iter().find_map(|update| {
            (0..update.length)
                .zip(update.fill.chars().cycle())
                .find_map(|(offset, symbol)| {
                    let column = update
                        .column
                        .saturating_add(i32::try_from(offset).unwrap_or(i32::MAX));
                    let cell = TileCell::new(column, update.row);
                    let changed = grid.tile(cell.x, cell.y) != Some(TileKind::from_symbol(symbol));
                    (guarded(cell) && changed).then_some(cell)
                })
        })
    }

    /// Applies every row rewrite, or none of them if any lies outside the grid.
    pub fn apply_to(&self, grid: &mut LevelGrid) -> Result<(), NavError> {
        for update in &self.updates {
            grid.check_region(update.row, update.column, update.length)?;
        }
        for update in &self.updates {
            grid.update_region(update.row, update.column, &update.fill, update.length)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_containment_is_half_open() {
        let rect = PlatformRect::new(2, 4, 3, 1);
        assert!(rect.contains(TileCell::new(2, 4)));
        assert!(rect.contains(TileCell::new(4, 4)));
        assert!(!rect.contains(TileCell::new(5, 4)));
        assert!(!rect.contains(TileCell::new(3, 5)));
    }

    #[test]
    fn rect_overlap_requires_shared_tile() {
        let rect = PlatformRect::new(0, 0, 2, 2);
        assert!(rect.overlaps(&PlatformRect::new(1, 1, 1, 1)));
        assert!(!rect.overlaps(&PlatformRect::new(2, 0, 1, 1)));
        assert!(!rect.overlaps(&PlatformRect::new(0, 2, 5, 1)));
    }

    #[test]
    fn remove_platform_clears_every_row() {
        let mut grid = LevelGrid::from_rows(["    ", " PP ", " PP "]);
        let edit = TerrainEdit::remove_platform(&PlatformRect::new(1, 1, 2, 2));
        edit.apply_to(&mut grid).expect("rect inside grid");
        assert_eq!(grid.to_rows(), vec!["    ", "    ", "    "]);
        assert_eq!(edit.kind(), EditKind::RemovePlatform);
    }

    #[test]
    fn partially_invalid_edit_leaves_grid_untouched() {
        let mut grid = LevelGrid::from_rows(["PP", "PP"]);
        let before = grid.clone();
        let edit = TerrainEdit::remove_platform(&PlatformRect::new(0, 1, 2, 2));
        let error = edit.apply_to(&mut grid).expect_err("second row is missing");
        assert_eq!(
            error,
            NavError::InvalidGridRegion {
                row: 2,
                column: 0,
                length: 2
            }
        );
        assert_eq!(grid, before);
    }

    #[test]
    fn disturbed_cell_ignores_same_kind_rewrites() {
        let grid = LevelGrid::from_rows(["A  F", "PPPP"]);
        let guarded = |cell: TileCell| cell == TileCell::new(3, 0) || cell == TileCell::new(1, 1);

        let hazard = TerrainEdit::add_hazard(TileCell::new(3, 0));
        assert_eq!(hazard.disturbed_cell(&grid, guarded), Some(TileCell::new(3, 0)));

        let restamp = TerrainEdit::add_platform(1, 0, 3, TileCell::new(1, 1));
        assert_eq!(restamp.disturbed_cell(&grid, guarded), None);

        let removal = TerrainEdit::remove_platform(&PlatformRect::new(0, 1, 4, 1));
        assert_eq!(removal.disturbed_cell(&grid, guarded), Some(TileCell::new(1, 1)));
    }

    #[test]
    fn platforms_grow_right_then_down() {
        let grid = LevelGrid::from_rows(["PP  ", "PP P", "  pP", "    ", "PPPP"]);
        let rects = extract_platforms(&grid);
        assert_eq!(
            rects,
            vec![
                PlatformRect::new(0, 0, 2, 2),
                PlatformRect::new(3, 1, 1, 2),
                PlatformRect::new(2, 2, 1, 1),
                PlatformRect::new(0, 4, 4, 1),
            ]
        );
    }

    #[test]
    fn ragged_rows_do_not_extend_rectangles() {
        let grid = LevelGrid::from_rows(["PPP", "P"]);
        assert_eq!(
            extract_platforms(&grid),
            vec![PlatformRect::new(0, 0, 3, 1), PlatformRect::new(0, 1, 1, 1)]
        );
    }

    #[test]
    fn hazard_targets_its_cell() {
        let mut grid = LevelGrid::from_rows(["   "]);
        let edit = TerrainEdit::add_hazard(TileCell::new(2, 0));
        edit.apply_to(&mut grid).expect("cell inside grid");
        assert_eq!(grid.to_rows(), vec!["  S"]);
        assert_eq!(edit.target(), TileCell::new(2, 0));
    }
}
