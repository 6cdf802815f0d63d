use anyhow::{Context, Result};
use arcpath_core::{Command, EditKind, LevelGrid, LevelMarkers, NavPath, TileCell};
use arcpath_system_edit_evaluator::{
    EditDecision, EditEvaluator, EditScorer, EditSite, ItemPolicy, LevelAssessment,
    MaximizeOpponentCost, MinimizeOwnCost,
};
use arcpath_system_navigator::plan_route;
use arcpath_system_solver::direct_route;
use arcpath_world::{self as world, query, World};

use crate::{
    config::Settings,
    simulate::{self, SegmentOutcome},
};

fn load_world(grid: &LevelGrid) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::LoadLevel {
            rows: grid.to_rows(),
        },
        &mut events,
    );
    world
}

fn format_cost(cost: f64) -> String {
    if cost.is_finite() {
        format!("{cost:.2}")
    } else {
        "unreachable".to_owned()
    }
}

fn format_path(path: &NavPath) -> String {
    path.nodes()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn as_point(cell: TileCell) -> (f64, f64) {
    (f64::from(cell.x), f64::from(cell.y))
}

/// Compiles the level and solves from the agent spawn to the goal.
pub(crate) fn plan(grid: &LevelGrid, settings: &Settings) -> Vec<String> {
    let world = load_world(grid);
    let markers = query::markers(&world);
    let plan = plan_route(query::grid(&world), &markers, &settings.jump);

    let mut lines = vec![format!(
        "graph: {} nodes, {} edges",
        plan.graph.node_count(),
        plan.graph.edge_count()
    )];
    match &plan.path {
        Ok(path) => lines.push(format!(
            "path ({} nodes, cost {}): {}",
            path.nodes().len(),
            format_cost(path.total_cost()),
            format_path(path)
        )),
        Err(error) => {
            lines.push(format!("no path: {error}"));
            if let (Some(start), Some(goal)) =
                (markers.agent_spawn.or(markers.player_spawn), markers.goal)
            {
                let waypoints = direct_route(as_point(start), as_point(goal))
                    .into_iter()
                    .map(|(x, y)| format!("({x:.1}, {y:.1})"))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                lines.push(format!("fallback route: {waypoints}"));
            }
        }
    }
    lines
}

/// Ranks candidate edits for the agent, or against the player with `opponent`.
pub(crate) fn evaluate(grid: &LevelGrid, settings: &Settings, opponent: bool) -> Result<Vec<String>> {
    let world = load_world(grid);
    let markers = query::markers(&world);
    let goal = markers.goal.context("level has no goal marker")?;
    let own = markers
        .agent_spawn
        .or(markers.player_spawn)
        .context("level has no spawn marker")?;
    let rival = markers.player_spawn.unwrap_or(own);
    let start = if opponent { rival } else { own };

    let route_markers = LevelMarkers {
        player_spawn: None,
        agent_spawn: Some(start),
        goal: Some(goal),
    };
    let path = plan_route(query::grid(&world), &route_markers, &settings.jump)
        .path
        .ok();

    let protected = query::protected_tiles(&world);
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &protected,
        start,
        goal,
    };

    let mut lines = Vec::new();
    let assessment = LevelAssessment::assess(site.grid, own, rival, goal);
    let preferred = ItemPolicy::default().choose(&assessment, None, &EditKind::ALL);
    if let Some(kind) = preferred {
        lines.push(format!("policy prefers {kind:?}"));
    }

    let decision = if opponent {
        let evaluator = EditEvaluator::new(
            settings.jump.clone(),
            settings.evaluator.clone(),
            MaximizeOpponentCost,
        );
        rank_into(&evaluator, &site, path.as_ref(), preferred, &mut lines)
    } else {
        let evaluator = EditEvaluator::new(
            settings.jump.clone(),
            settings.evaluator.clone(),
            MinimizeOwnCost,
        );
        rank_into(&evaluator, &site, path.as_ref(), preferred, &mut lines)
    };

    lines.push(format!(
        "selected {:?} at {} (cost {}){}",
        decision.kind(),
        decision.target(),
        format_cost(decision.cost),
        if decision.fallback {
            " [default bridge]"
        } else {
            ""
        }
    ));
    Ok(lines)
}

fn rank_into<S: EditScorer>(
    evaluator: &EditEvaluator<S>,
    site: &EditSite<'_>,
    path: Option<&NavPath>,
    preferred: Option<EditKind>,
    lines: &mut Vec<String>,
) -> EditDecision {
    match path {
        Some(path) => {
            for scored in evaluator.rank(site, path, &EditKind::ALL) {
                lines.push(format!(
                    "  {:?} at {}: {}",
                    scored.edit.kind(),
                    scored.edit.target(),
                    format_cost(scored.cost)
                ));
            }
        }
        None => lines.push("route is currently unreachable".to_owned()),
    }
    evaluator.evaluate_preferring(site, path, preferred)
}

/// Follows the solved route with the trajectory controller.
pub(crate) fn simulate(grid: &LevelGrid, settings: &Settings, ticks: u32) -> Result<Vec<String>> {
    let world = load_world(grid);
    let plan = plan_route(query::grid(&world), &query::markers(&world), &settings.jump);
    let path = plan.path.context("nothing to simulate")?;

    let outcomes = simulate::run(&path, settings.jump.apex_height, &settings.controller, ticks);
    let mut lines: Vec<String> = outcomes
        .iter()
        .map(|outcome| match outcome {
            SegmentOutcome::Completed { segment, tick } => {
                format!("tick {tick}: reached {} from {}", segment.to, segment.from)
            }
            SegmentOutcome::Skipped { segment, tick } => {
                format!("tick {tick}: stuck, skipped {} -> {}", segment.from, segment.to)
            }
        })
        .collect();

    let completed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, SegmentOutcome::Completed { .. }))
        .count();
    if outcomes.len() == path.segment_count() {
        lines.push(format!(
            "reached the goal ({completed} of {} segments completed)",
            path.segment_count()
        ));
    } else {
        lines.push(format!(
            "stopped after {ticks} ticks with {} segments left",
            path.segment_count() - outcomes.len()
        ));
    }
    Ok(lines)
}
