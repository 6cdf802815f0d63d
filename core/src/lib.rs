#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the arcpath engine.
//!
//! This crate defines the tile grid, the jump-arc geometry, the visibility
//! oracle and the compiled navigation graph, together with the message surface
//! that connects adapters, the authoritative world, and pure systems. Adapters
//! submit [`Command`] values describing desired mutations, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values for systems to react to deterministically.

pub mod arc;
pub mod edit;
pub mod graph;
pub mod grid;
pub mod tuning;
pub mod visibility;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arc::{arc_length, ArcBranch, JumpArc};
pub use edit::{extract_platforms, EditKind, PlatformRect, RegionUpdate, TerrainEdit, TileCell};
pub use graph::{
    total_weight, EdgeKind, LevelGraph, NavEdge, NavNode, NavPath, NodeKey, PathSegment,
    SegmentMotion,
};
pub use grid::{LevelGrid, TileKind, TraversableSet};
pub use tuning::{JumpTuning, TuningError, WeightMode};
pub use visibility::{arc_clear, segment_clear, supercover_walk, tile_blocks};

/// Recoverable failures reported by the navigation pipeline.
///
/// None of these are fatal: callers fall back to a default behaviour such as
/// a straight-line route or a default terrain edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Error)]
pub enum NavError {
    /// The goal cannot be reached from the start, or either is not a node.
    #[error("no path from {start} to {goal}")]
    NoPath {
        /// Requested start node.
        start: NodeKey,
        /// Requested goal node.
        goal: NodeKey,
    },
    /// The landing point lies outside what a jump of the configured apex can reach.
    #[error("no jump arc covers a rise of {rise} rows with apex height {apex_height}")]
    UndefinedArc {
        /// Row displacement from take-off to landing; negative values rise.
        rise: f64,
        /// Configured apex height.
        apex_height: f64,
    },
    /// An edit addressed cells outside the grid.
    #[error("region of {length} cells at row {row}, column {column} lies outside the grid")]
    InvalidGridRegion {
        /// Row of the rejected region.
        row: i32,
        /// First column of the rejected region.
        column: i32,
        /// Number of cells in the rejected region.
        length: usize,
    },
    /// An edit would overwrite a marker or the tile a marker stands on.
    #[error("tile {cell} is protected")]
    ProtectedTile {
        /// First protected tile the edit would change.
        cell: TileCell,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the level with the provided textual rows.
    LoadLevel {
        /// Grid rows, top row first.
        rows: Vec<String>,
    },
    /// Rewrites a contiguous run of cells within one row.
    UpdateRegion {
        /// Row being rewritten.
        row: i32,
        /// First column being rewritten.
        column: i32,
        /// Symbols cycled across the run.
        fill: String,
        /// Number of cells rewritten.
        length: usize,
    },
    /// Applies a terrain edit chosen by the edit evaluator.
    ApplyEdit {
        /// Edit to apply to the live grid.
        edit: TerrainEdit,
    },
    /// Installs a freshly solved path for the agent.
    AssignPath {
        /// Path from the agent's settled position to the goal.
        path: NavPath,
    },
    /// Drops the agent's current path.
    ClearPath,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a new level replaced the previous grid.
    LevelLoaded {
        /// Length of the longest row.
        columns: usize,
        /// Number of rows.
        rows: usize,
    },
    /// Confirms that a run of cells in the live grid changed.
    GridEdited {
        /// Row that changed.
        row: i32,
        /// First column that changed.
        column: i32,
        /// Number of cells that changed.
        length: usize,
    },
    /// Confirms that a terrain edit was applied.
    EditApplied {
        /// Category of the applied edit.
        kind: EditKind,
        /// Tile the edit was anchored on.
        target: TileCell,
    },
    /// Reports that a mutation was refused and the grid left untouched.
    EditRejected {
        /// Reason the mutation was refused.
        reason: NavError,
    },
    /// Confirms that the agent received a new path.
    PathAssigned {
        /// Number of nodes in the path.
        nodes: usize,
        /// Total weight of the path.
        cost: f64,
    },
    /// Confirms that the agent's path was dropped.
    PathCleared,
}

/// Marker positions discovered in the current level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelMarkers {
    /// Spawn tile of the human player.
    pub player_spawn: Option<TileCell>,
    /// Spawn tile of the autonomous agent.
    pub agent_spawn: Option<TileCell>,
    /// Goal flag tile.
    pub goal: Option<TileCell>,
}

impl LevelMarkers {
    /// Locates every marker in the grid.
    #[must_use]
    pub fn scan(grid: &LevelGrid) -> Self {
        let find = |kind| {
            grid.find_marker(kind)
                .map(|(x, y)| TileCell::new(x, y))
        };
        Self {
            player_spawn: find(TileKind::PlayerSpawn),
            agent_spawn: find(TileKind::AgentSpawn),
            goal: find(TileKind::Goal),
        }
    }

    /// Markers that are present, in player, agent, goal order.
    pub fn iter(&self) -> impl Iterator<Item = TileCell> {
        [self.player_spawn, self.agent_spawn, self.goal]
            .into_iter()
            .flatten()
    }

    /// Marker tiles together with the tile directly beneath each of them.
    pub fn guarded_cells(&self) -> impl Iterator<Item = TileCell> {
        self.iter()
            .flat_map(|cell| [cell, TileCell::new(cell.x, cell.y.saturating_add(1))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_found_row_major() {
        let grid = LevelGrid::from_rows(["X  ", "  F", "A  ", "PPP"]);
        let markers = LevelMarkers::scan(&grid);
        assert_eq!(markers.player_spawn, Some(TileCell::new(0, 0)));
        assert_eq!(markers.goal, Some(TileCell::new(2, 1)));
        assert_eq!(markers.agent_spawn, Some(TileCell::new(0, 2)));
        assert_eq!(markers.iter().count(), 3);
    }

    #[test]
    fn errors_render_their_context() {
        let error = NavError::NoPath {
            start: NodeKey::new(0, 1),
            goal: NodeKey::new(4, 1),
        };
        assert_eq!(error.to_string(), "no path from (0, 1) to (4, 1)");

        let region = NavError::InvalidGridRegion {
            row: 9,
            column: 2,
            length: 3,
        };
        assert!(region.to_string().contains("row 9"));

        let protected = NavError::ProtectedTile {
            cell: TileCell::new(4, 0),
        };
        assert_eq!(protected.to_string(), "tile (4, 0) is protected");
    }

    #[test]
    fn guarded_cells_cover_markers_and_their_footing() {
        let grid = LevelGrid::from_rows(["A  F", "PPPP"]);
        let guarded: Vec<TileCell> = LevelMarkers::scan(&grid).guarded_cells().collect();
        assert_eq!(
            guarded,
            vec![
                TileCell::new(0, 0),
                TileCell::new(0, 1),
                TileCell::new(3, 0),
                TileCell::new(3, 1),
            ]
        );
    }
}
