#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Event-driven navigation system that replans the agent's route.
//!
//! The system never recomputes on its own schedule. It compiles and solves
//! only when the world reports a new level or an edited grid, and answers with
//! either an `AssignPath` or a `ClearPath` command.

use arcpath_core::{
    Command, Event, JumpTuning, LevelGraph, LevelGrid, LevelMarkers, NavError, NavPath, NodeKey,
};
use arcpath_system_compiler::compile;
use arcpath_system_solver::{settle, solve};
use log::{info, warn};

/// Result of compiling a grid and solving from the agent to the goal.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePlan {
    /// Graph compiled from the grid.
    pub graph: LevelGraph,
    /// Node the agent starts from, if its spawn settled onto the graph.
    pub start: Option<NodeKey>,
    /// Node holding the goal, if the goal settled onto the graph.
    pub goal: Option<NodeKey>,
    /// Solved path, or the reason none exists.
    pub path: Result<NavPath, NavError>,
}

/// Compiles `grid` and solves from the agent's spawn to the goal.
///
/// The agent spawn is preferred; levels without one fall back to the player
/// spawn. Markers that cannot be settled produce a `NoPath` result.
#[must_use]
pub fn plan_route(grid: &LevelGrid, markers: &LevelMarkers, tuning: &JumpTuning) -> RoutePlan {
    let graph = compile(grid, tuning);
    let start = markers
        .agent_spawn
        .or(markers.player_spawn)
        .and_then(|tile| settle(&graph, grid, tile));
    let goal = markers.goal.and_then(|tile| settle(&graph, grid, tile));

    let path = match (start, goal) {
        (Some(start), Some(goal)) => solve(&graph, start, goal),
        _ => Err(NavError::NoPath {
            start: start.unwrap_or_default(),
            goal: goal.unwrap_or_default(),
        }),
    };

    RoutePlan {
        graph,
        start,
        goal,
        path,
    }
}

/// Pure system that reacts to grid changes with fresh path assignments.
#[derive(Debug, Default)]
pub struct Navigator {
    tuning: JumpTuning,
}

impl Navigator {
    /// Creates a navigator using the provided jump tuning.
    #[must_use]
    pub fn new(tuning: JumpTuning) -> Self {
        Self { tuning }
    }

    /// Tuning used for every recompute.
    #[must_use]
    pub fn tuning(&self) -> &JumpTuning {
        &self.tuning
    }

    /// Consumes world events and emits at most one path command per batch.
    pub fn handle(
        &mut self,
        events: &[Event],
        grid: &LevelGrid,
        markers: &LevelMarkers,
        out: &mut Vec<Command>,
    ) {
        let grid_changed = events.iter().any(|event| {
            matches!(
                event,
                Event::LevelLoaded { .. } | Event::GridEdited { .. }
            )
        });
        if !grid_changed {
            return;
        }

        match plan_route(grid, markers, &self.tuning).path {
            Ok(path) => {
                info!(
                    "assigning {}-node path at cost {}",
                    path.nodes().len(),
                    path.total_cost()
                );
                out.push(Command::AssignPath { path });
            }
            Err(error) => {
                warn!("agent has no route: {error}");
                out.push(Command::ClearPath);
            }
        }
    }
}
