#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for arcpath.
//!
//! The world owns the live tile grid together with everything derived from
//! it: marker positions and platform rectangles. Both are rebuilt after every
//! successful grid mutation since a single edit can merge or split platforms.

use arcpath_core::{
    extract_platforms, Command, Event, LevelGrid, LevelMarkers, NavError, NavPath, PlatformRect,
    TileCell,
};
use log::{debug, warn};

/// Represents the authoritative arcpath world state.
#[derive(Debug, Default)]
pub struct World {
    grid: LevelGrid,
    markers: LevelMarkers,
    platforms: Vec<PlatformRect>,
    current_path: Option<NavPath>,
}

impl World {
    /// Creates an empty world with no level loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh_derived_state(&mut self) {
        self.markers = LevelMarkers::scan(&self.grid);
        self.platforms = extract_platforms(&self.grid);
    }

    fn reject(reason: NavError, out_events: &mut Vec<Event>) {
        warn!("rejected grid mutation: {reason}");
        out_events.push(Event::EditRejected { reason });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLevel { rows } => {
            world.grid = LevelGrid::from_rows(rows);
            world.refresh_derived_state();
            world.current_path = None;
            debug!(
                "loaded {}x{} level with {} platforms",
                world.grid.width(),
                world.grid.height(),
                world.platforms.len()
            );
            out_events.push(Event::LevelLoaded {
                columns: world.grid.width(),
                rows: world.grid.height(),
            });
        }
        Command::UpdateRegion {
            row,
            column,
            fill,
            length,
        } => match world.grid.update_region(row, column, &fill, length) {
            Ok(()) => {
                world.refresh_derived_state();
                out_events.push(Event::GridEdited {
                    row,
                    column,
                    length,
                });
            }
            Err(reason) => World::reject(reason, out_events),
        },
        Command::ApplyEdit { edit } => {
            let markers = world.markers;
            let guarded = |cell: TileCell| markers.guarded_cells().any(|guard| guard == cell);
            if let Some(cell) = edit.disturbed_cell(&world.grid, guarded) {
                World::reject(NavError::ProtectedTile { cell }, out_events);
                return;
            }
            match edit.apply_to(&mut world.grid) {
                Ok(()) => {
                    world.refresh_derived_state();
                    out_events.extend(edit.updates().iter().map(|update| Event::GridEdited {
                        row: update.row,
                        column: update.column,
                        length: update.length,
                    }));
                    out_events.push(Event::EditApplied {
                        kind: edit.kind(),
                        target: edit.target(),
                    });
                }
                Err(reason) => World::reject(reason, out_events),
            }
        }
        Command::AssignPath { path } => {
            let nodes = path.nodes().len();
            let cost = path.total_cost();
            world.current_path = Some(path);
            out_events.push(Event::PathAssigned { nodes, cost });
        }
        Command::ClearPath => {
            if world.current_path.take().is_some() {
                out_events.push(Event::PathCleared);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use arcpath_core::{LevelGrid, LevelMarkers, NavPath, PlatformRect};

    use super::World;

    /// Provides read-only access to the live tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &LevelGrid {
        &world.grid
    }

    /// Marker positions found in the live grid.
    #[must_use]
    pub fn markers(world: &World) -> LevelMarkers {
        world.markers
    }

    /// Platform rectangles extracted from the live grid, in scan order.
    #[must_use]
    pub fn platforms(world: &World) -> &[PlatformRect] {
        &world.platforms
    }

    /// One-column rectangles covering each marker and the tile beneath it.
    ///
    /// Edits may not change these tiles, otherwise a spawn point or the goal
    /// would be erased or left floating.
    #[must_use]
    pub fn protected_tiles(world: &World) -> Vec<PlatformRect> {
        world
            .markers
            .iter()
            .map(|cell| PlatformRect::new(cell.x, cell.y, 1, 2))
            .collect()
    }

    /// Path currently assigned to the agent, if any.
    #[must_use]
    pub fn current_path(world: &World) -> Option<&NavPath> {
        world.current_path.as_ref()
    }
}
