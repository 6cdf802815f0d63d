use arcpath_core::{
    Command, EditKind, Event, JumpTuning, LevelGrid, NavPath, NodeKey, TerrainEdit, TileCell,
};
use arcpath_system_compiler::compile;
use arcpath_system_edit_evaluator::{
    cost_between, critical_edge, route_cost, EditEvaluator, EditScorer, EditSite,
    EvaluatorTuning, MaximizeOpponentCost, MinimizeOwnCost,
};
use arcpath_system_solver::{settle, solve};
use arcpath_world::{self as world, query, World};

const GAP_LEVEL: [&str; 5] = [
    "             ",
    "             ",
    "             ",
    "A           F",
    "PPP       PPP",
];

const STEPPING_STONES: [&str; 5] = [
    "             ",
    "             ",
    "             ",
    "A           F",
    "PPP  PPP  PPP",
];

fn loaded(rows: &[&str]) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::LoadLevel {
            rows: rows.iter().map(|row| (*row).to_owned()).collect(),
        },
        &mut events,
    );
    world
}

fn endpoints(world: &World) -> (TileCell, TileCell) {
    let markers = query::markers(world);
    (
        markers.agent_spawn.expect("agent spawn"),
        markers.goal.expect("goal"),
    )
}

fn solved(grid: &LevelGrid, start: TileCell, goal: TileCell) -> Option<NavPath> {
    let graph = compile(grid, &JumpTuning::default());
    let start = settle(&graph, grid, start)?;
    let goal = settle(&graph, grid, goal)?;
    solve(&graph, start, goal).ok()
}

fn evaluator<S: EditScorer>(scorer: S) -> EditEvaluator<S> {
    EditEvaluator::new(JumpTuning::default(), EvaluatorTuning::default(), scorer)
}

#[test]
fn unreachable_gap_is_bridged_with_a_platform() {
    let mut world = loaded(&GAP_LEVEL);
    let (start, goal) = endpoints(&world);
    let protected = query::protected_tiles(&world);
    let before = route_cost(query::grid(&world), &JumpTuning::default(), start, goal);
    assert!(before.is_infinite(), "gap wider than the jump span");
    assert!(solved(query::grid(&world), start, goal).is_none());

    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &protected,
        start,
        goal,
    };
    let decision = evaluator(MinimizeOwnCost).evaluate(&site, None);

    assert!(decision.fallback);
    assert_eq!(decision.kind(), EditKind::AddPlatform);
    assert_eq!(decision.target(), TileCell::new(6, 4));
    let update = &decision.edit.updates()[0];
    assert_eq!((update.row, update.column, update.length), (4, 5, 3));
    assert!(decision.cost < before, "bridge must make the goal reachable");

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ApplyEdit {
            edit: decision.edit.clone(),
        },
        &mut events,
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EditApplied { .. })));
    let after = route_cost(query::grid(&world), &JumpTuning::default(), start, goal);
    assert_eq!(after, decision.cost);
}

#[test]
fn candidates_surround_the_heaviest_interior_edge() {
    let world = loaded(&STEPPING_STONES);
    let (start, goal) = endpoints(&world);
    let protected = query::protected_tiles(&world);
    let path = solved(query::grid(&world), start, goal).expect("stones are reachable");
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &protected,
        start,
        goal,
    };

    let critical = critical_edge(&path).expect("path has interior edges");
    let candidates = evaluator(MinimizeOwnCost).candidates(&site, &path, &EditKind::ALL);
    let kinds: Vec<EditKind> = candidates.iter().map(|edit| edit.kind()).collect();
    assert_eq!(kinds, EditKind::ALL.to_vec());

    let hazard = &candidates[1];
    assert_eq!(
        hazard.target(),
        TileCell::new(critical.to.x(), critical.to.y())
    );
    let removal = &candidates[2];
    assert_eq!(removal.updates()[0].row, critical.to.y() + 1);
}

#[test]
fn scorers_pick_opposite_ends_of_the_ranking() {
    let world = loaded(&STEPPING_STONES);
    let (start, goal) = endpoints(&world);
    let protected = query::protected_tiles(&world);
    let path = solved(query::grid(&world), start, goal).expect("stones are reachable");
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &protected,
        start,
        goal,
    };

    let own = evaluator(MinimizeOwnCost);
    let ranked = own.rank(&site, &path, &EditKind::ALL);
    assert!(!ranked.is_empty());

    let cheapest = own.evaluate(&site, Some(&path));
    assert!(!cheapest.fallback);
    assert!(ranked.iter().all(|scored| cheapest.cost <= scored.cost));

    let harshest = evaluator(MaximizeOpponentCost).evaluate(&site, Some(&path));
    assert!(!harshest.fallback);
    assert!(
        harshest.cost.is_infinite(),
        "removing a stepping stone cuts the route"
    );
    assert_eq!(query::grid(&world).to_rows(), STEPPING_STONES.to_vec());
}

#[test]
fn protected_platforms_are_never_removed() {
    let world = loaded(&STEPPING_STONES);
    let (start, goal) = endpoints(&world);
    let path = solved(query::grid(&world), start, goal).expect("stones are reachable");
    let everything = query::platforms(&world).to_vec();
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &everything,
        start,
        goal,
    };

    let candidates = evaluator(MaximizeOpponentCost).candidates(
        &site,
        &path,
        &[EditKind::RemovePlatform],
    );
    assert!(candidates.is_empty());

    let decision = evaluator(MaximizeOpponentCost).evaluate_kinds(
        &site,
        Some(&path),
        &[EditKind::RemovePlatform],
    );
    assert!(decision.fallback, "nothing removable leaves only the bridge");
}

#[test]
fn out_of_grid_candidates_are_skipped() {
    let grid = LevelGrid::from_rows(["A F", "PPP"]);
    let start = TileCell::new(0, 0);
    let goal = TileCell::new(2, 0);
    let path = solved(&grid, start, goal).expect("flat walk");
    let site = EditSite {
        grid: &grid,
        platforms: &[],
        protected: &[],
        start,
        goal,
    };

    let ranked = evaluator(MinimizeOwnCost).rank(&site, &path, &[EditKind::AddPlatform]);
    assert!(
        ranked.is_empty(),
        "the vertex row of a top-row walk lies above the grid"
    );
}

const SHORT_HOP: [&str; 2] = ["A   F", "PP  P"];

#[test]
fn the_goal_flag_is_never_traded_for_a_cheaper_route() {
    let mut world = loaded(&SHORT_HOP);
    let (start, goal) = endpoints(&world);
    let protected = query::protected_tiles(&world);
    let path = solved(query::grid(&world), start, goal).expect("hop is reachable");
    assert_eq!(path.total_cost(), 4.0);
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &protected,
        start,
        goal,
    };

    let own = evaluator(MinimizeOwnCost);
    let candidates = own.candidates(&site, &path, &EditKind::ALL);
    assert!(candidates
        .iter()
        .any(|edit| edit.kind() == EditKind::AddHazard && edit.target() == goal));
    assert!(
        own.rank(&site, &path, &EditKind::ALL).is_empty(),
        "every candidate either leaves the grid or touches a marker"
    );

    let decision = own.evaluate(&site, Some(&path));
    assert!(decision.fallback);
    assert_eq!(decision.kind(), EditKind::AddPlatform);
    assert_eq!(decision.target(), TileCell::new(2, 1));
    assert_eq!(decision.cost, 4.0);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ApplyEdit {
            edit: decision.edit.clone(),
        },
        &mut events,
    );
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EditApplied { .. })));
    assert_eq!(query::grid(&world).to_rows(), vec!["A   F", "PPPPP"]);
}

#[test]
fn edited_grids_are_scored_between_the_original_nodes() {
    let mut grid = LevelGrid::from_rows(SHORT_HOP);
    TerrainEdit::add_hazard(TileCell::new(4, 0))
        .apply_to(&mut grid)
        .expect("goal tile is inside the grid");

    let tuning = JumpTuning::default();
    assert!(
        route_cost(&grid, &tuning, TileCell::new(0, 0), TileCell::new(4, 0)).is_finite(),
        "re-settling drifts onto another node"
    );
    assert!(cost_between(&grid, &tuning, NodeKey::new(0, 0), NodeKey::new(4, 0)).is_infinite());
}

#[test]
fn preferred_kind_wins_when_it_can_be_scored() {
    let world = loaded(&STEPPING_STONES);
    let (start, goal) = endpoints(&world);
    let protected = query::protected_tiles(&world);
    let path = solved(query::grid(&world), start, goal).expect("stones are reachable");
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &protected,
        start,
        goal,
    };
    let own = evaluator(MinimizeOwnCost);

    for kind in EditKind::ALL {
        let decision = own.evaluate_preferring(&site, Some(&path), Some(kind));
        assert_eq!(decision.kind(), kind);
        assert!(!decision.fallback);
    }
    assert_eq!(
        own.evaluate_preferring(&site, Some(&path), None),
        own.evaluate(&site, Some(&path))
    );
}

#[test]
fn unscorable_preference_falls_back_to_every_kind() {
    let world = loaded(&STEPPING_STONES);
    let (start, goal) = endpoints(&world);
    let path = solved(query::grid(&world), start, goal).expect("stones are reachable");
    let everything = query::platforms(&world).to_vec();
    let site = EditSite {
        grid: query::grid(&world),
        platforms: query::platforms(&world),
        protected: &everything,
        start,
        goal,
    };
    let harsh = evaluator(MaximizeOpponentCost);

    let decision = harsh.evaluate_preferring(&site, Some(&path), Some(EditKind::RemovePlatform));
    assert_ne!(decision.kind(), EditKind::RemovePlatform);
    assert_eq!(decision, harsh.evaluate(&site, Some(&path)));
}

#[test]
fn bridge_stays_inside_a_level_without_ground() {
    let grid = LevelGrid::from_rows(["A    F"]);
    let site = EditSite {
        grid: &grid,
        platforms: &[],
        protected: &[],
        start: TileCell::new(0, 0),
        goal: TileCell::new(5, 0),
    };

    let decision = evaluator(MinimizeOwnCost).evaluate(&site, None);
    assert!(decision.fallback);
    assert_eq!(decision.target(), TileCell::new(2, 0));
    let mut stamped = grid.clone();
    decision
        .edit
        .apply_to(&mut stamped)
        .expect("bridge row is clamped into the grid");
    assert_eq!(stamped.to_rows(), vec!["APPP F"]);
}
