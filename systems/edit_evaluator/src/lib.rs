#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Terrain edit evaluator.
//!
//! Finds the most expensive edge of a solved route, proposes one edit of each
//! kind around it, and scores every proposal by recompiling and resolving a
//! private copy of the grid. The live grid is never touched here; the chosen
//! edit is handed back to the caller to submit as a world command.

mod policy;

use arcpath_core::{
    total_weight, EditKind, JumpArc, JumpTuning, LevelGrid, NavPath, NodeKey, PathSegment,
    PlatformRect, TerrainEdit, TileCell,
};
use arcpath_system_compiler::compile;
use arcpath_system_solver::{settle, solve};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use policy::{ItemPolicy, LevelAssessment};

/// Constants for the edits the evaluator proposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorTuning {
    /// Number of platform tiles stamped by an add-platform edit.
    pub platform_run: usize,
}

impl Default for EvaluatorTuning {
    fn default() -> Self {
        Self { platform_run: 3 }
    }
}

/// Decides which of two post-edit route costs serves the asking side better.
pub trait EditScorer {
    /// Reports whether `candidate` is strictly preferable to `incumbent`.
    fn improves(&self, candidate: f64, incumbent: f64) -> bool;
}

/// Prefers edits that make the evaluated route cheaper.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinimizeOwnCost;

impl EditScorer for MinimizeOwnCost {
    fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        candidate < incumbent
    }
}

/// Prefers edits that make the evaluated route more expensive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaximizeOpponentCost;

impl EditScorer for MaximizeOpponentCost {
    fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        candidate > incumbent
    }
}

/// Level state an evaluation runs against.
#[derive(Clone, Copy, Debug)]
pub struct EditSite<'a> {
    /// Grid the edits are proposed for.
    pub grid: &'a LevelGrid,
    /// Platform rectangles extracted from `grid`.
    pub platforms: &'a [PlatformRect],
    /// Tiles edits may not change; platforms overlapping them are never removed.
    pub protected: &'a [PlatformRect],
    /// Start tile of the evaluated route.
    pub start: TileCell,
    /// Goal tile of the evaluated route.
    pub goal: TileCell,
}

/// Candidate edit together with the route cost it produces.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredEdit {
    /// Proposed mutation.
    pub edit: TerrainEdit,
    /// Route cost after the edit; infinite when the route is cut.
    pub cost: f64,
}

/// Outcome of an evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct EditDecision {
    /// Selected mutation.
    pub edit: TerrainEdit,
    /// Route cost after the edit; infinite when the route is cut.
    pub cost: f64,
    /// Whether the default bridge was chosen because nothing could be scored.
    pub fallback: bool,
}

impl EditDecision {
    /// Category of the selected edit.
    #[must_use]
    pub const fn kind(&self) -> EditKind {
        self.edit.kind()
    }

    /// Tile the selected edit is anchored on.
    #[must_use]
    pub const fn target(&self) -> TileCell {
        self.edit.target()
    }
}

/// Most expensive segment of `path`, ignoring its first and last edges when
/// the path has at least three of them.
#[must_use]
pub fn critical_edge(path: &NavPath) -> Option<PathSegment> {
    let weights = path.weights();
    let scanned = if weights.len() >= 3 {
        1..weights.len() - 1
    } else {
        0..weights.len()
    };

    let mut heaviest: Option<(usize, f64)> = None;
    for index in scanned {
        let weight = weights[index];
        if weight.is_nan() {
            continue;
        }
        if heaviest.map_or(true, |(_, top)| weight > top) {
            heaviest = Some((index, weight));
        }
    }
    heaviest.and_then(|(index, _)| path.segment(index))
}

/// Cost of the cheapest route between two marker tiles on `grid`.
///
/// Returns infinity when either tile cannot be settled or no route exists.
#[must_use]
pub fn route_cost(grid: &LevelGrid, tuning: &JumpTuning, start: TileCell, goal: TileCell) -> f64 {
    let graph = compile(grid, tuning);
    let (Some(start), Some(goal)) = (settle(&graph, grid, start), settle(&graph, grid, goal)) else {
        return f64::INFINITY;
    };
    solve(&graph, start, goal).map_or(f64::INFINITY, |path| total_weight(path.weights()))
}

/// Cost of the cheapest route between two fixed nodes of `grid`.
///
/// Returns infinity when either node no longer exists or no route exists.
#[must_use]
pub fn cost_between(grid: &LevelGrid, tuning: &JumpTuning, start: NodeKey, goal: NodeKey) -> f64 {
    let graph = compile(grid, tuning);
    solve(&graph, start, goal).map_or(f64::INFINITY, |path| total_weight(path.weights()))
}

/// Start and goal nodes of the unedited grid that every edit is scored between.
type Anchors = Option<(NodeKey, NodeKey)>;

/// Scores terrain edits around the critical edge of a route.
#[derive(Clone, Debug)]
pub struct EditEvaluator<S> {
    jump: JumpTuning,
    tuning: EvaluatorTuning,
    scorer: S,
}

impl<S: EditScorer> EditEvaluator<S> {
    /// Creates an evaluator that recompiles with `jump` and ranks with `scorer`.
    #[must_use]
    pub fn new(jump: JumpTuning, tuning: EvaluatorTuning, scorer: S) -> Self {
        Self {
            jump,
            tuning,
            scorer,
        }
    }

    /// Jump tuning used when recompiling edited grids.
    #[must_use]
    pub fn jump_tuning(&self) -> &JumpTuning {
        &self.jump
    }

    /// Proposes one edit per requested kind around the critical edge of `path`.
    ///
    /// Kinds that have no sensible placement are left out.
    #[must_use]
    pub fn candidates(
        &self,
        site: &EditSite<'_>,
        path: &NavPath,
        kinds: &[EditKind],
    ) -> Vec<TerrainEdit> {
        let Some(segment) = critical_edge(path) else {
            return Vec::new();
        };

        kinds
            .iter()
            .filter_map(|kind| match kind {
                EditKind::AddPlatform => self.platform_under_vertex(site.grid, &segment),
                EditKind::AddHazard => Some(TerrainEdit::add_hazard(TileCell::new(
                    segment.to.x(),
                    segment.to.y(),
                ))),
                EditKind::RemovePlatform => {
                    removable_platform(site, segment.to).map(TerrainEdit::remove_platform)
                }
            })
            .collect()
    }

    /// Scores every candidate, in proposal order.
    ///
    /// Edits that do not fit the grid or that would change a protected tile
    /// are skipped.
    #[must_use]
    pub fn rank(&self, site: &EditSite<'_>, path: &NavPath, kinds: &[EditKind]) -> Vec<ScoredEdit> {
        self.rank_between(site, self.anchors(site), path, kinds)
    }

    /// Selects the best edit of any kind.
    #[must_use]
    pub fn evaluate(&self, site: &EditSite<'_>, path: Option<&NavPath>) -> EditDecision {
        self.evaluate_kinds(site, path, &EditKind::ALL)
    }

    /// Selects the best edit of the `preferred` kind, if one can be scored,
    /// and otherwise the best edit of any kind.
    #[must_use]
    pub fn evaluate_preferring(
        &self,
        site: &EditSite<'_>,
        path: Option<&NavPath>,
        preferred: Option<EditKind>,
    ) -> EditDecision {
        let anchors = self.anchors(site);
        if let (Some(kind), Some(path)) = (preferred, path) {
            if let Some(decision) = self.select(self.rank_between(site, anchors, path, &[kind])) {
                return decision;
            }
            debug!("no scorable {kind:?} edit; considering every kind");
        }
        self.decide(site, anchors, path, &EditKind::ALL)
    }

    /// Selects the best edit among `kinds`.
    ///
    /// Without a path, or when no candidate can be scored, the default bridge
    /// is returned instead.
    #[must_use]
    pub fn evaluate_kinds(
        &self,
        site: &EditSite<'_>,
        path: Option<&NavPath>,
        kinds: &[EditKind],
    ) -> EditDecision {
        self.decide(site, self.anchors(site), path, kinds)
    }

    fn decide(
        &self,
        site: &EditSite<'_>,
        anchors: Anchors,
        path: Option<&NavPath>,
        kinds: &[EditKind],
    ) -> EditDecision {
        let ranked = path
            .map(|path| self.rank_between(site, anchors, path, kinds))
            .unwrap_or_default();
        if let Some(decision) = self.select(ranked) {
            return decision;
        }

        let edit = self.bridge(site);
        let cost = self.score(site, anchors, &edit).unwrap_or(f64::INFINITY);
        debug!(
            "no scorable edit; bridging at {} for cost {cost}",
            edit.target()
        );
        EditDecision {
            edit,
            cost,
            fallback: true,
        }
    }

    /// Default edit: a platform run midway between the settled start and
    /// goal, one row below their average standing row and never below the
    /// bottom row.
    #[must_use]
    pub fn bridge(&self, site: &EditSite<'_>) -> TerrainEdit {
        let graph = compile(site.grid, &self.jump);
        let anchor = |tile: TileCell| {
            settle(&graph, site.grid, tile).unwrap_or(NodeKey::new(tile.x, tile.y))
        };
        let (start, goal) = (anchor(site.start), anchor(site.goal));

        let bottom = i32::try_from(site.grid.height())
            .unwrap_or(i32::MAX)
            .saturating_sub(1);
        let column = midpoint(start.x(), goal.x());
        let row = midpoint(start.y(), goal.y())
            .saturating_add(1)
            .min(bottom.max(0));
        self.platform_run(site.grid, row, column)
    }

    fn anchors(&self, site: &EditSite<'_>) -> Anchors {
        let graph = compile(site.grid, &self.jump);
        let start = settle(&graph, site.grid, site.start)?;
        let goal = settle(&graph, site.grid, site.goal)?;
        Some((start, goal))
    }

    fn rank_between(
        &self,
        site: &EditSite<'_>,
        anchors: Anchors,
        path: &NavPath,
        kinds: &[EditKind],
    ) -> Vec<ScoredEdit> {
        self.candidates(site, path, kinds)
            .into_iter()
            .filter_map(|edit| {
                let cost = self.score(site, anchors, &edit)?;
                Some(ScoredEdit { edit, cost })
            })
            .collect()
    }

    /// Best candidate according to the scorer; the earliest wins ties.
    fn select(&self, ranked: Vec<ScoredEdit>) -> Option<EditDecision> {
        let mut best: Option<ScoredEdit> = None;
        for candidate in ranked {
            match &best {
                Some(incumbent) if !self.scorer.improves(candidate.cost, incumbent.cost) => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|ScoredEdit { edit, cost }| EditDecision {
            edit,
            cost,
            fallback: false,
        })
    }

    fn platform_under_vertex(&self, grid: &LevelGrid, segment: &PathSegment) -> Option<TerrainEdit> {
        let arc = match JumpArc::new(
            segment.from.to_point(),
            segment.to.to_point(),
            f64::from(self.jump.apex_height),
        ) {
            Ok(arc) => arc,
            Err(error) => {
                warn!(
                    "no platform candidate for {} -> {}: {error}",
                    segment.from, segment.to
                );
                return None;
            }
        };

        let (x, y) = arc.vertex();
        let row = (y.round() as i32).saturating_add(1);
        Some(self.platform_run(grid, row, x.round() as i32))
    }

    /// Platform run centred on `column`, clipped to the row when it exists.
    fn platform_run(&self, grid: &LevelGrid, row: i32, column: i32) -> TerrainEdit {
        let run = self.tuning.platform_run.max(1);
        let first = column.saturating_sub(i32::try_from(run / 2).unwrap_or(i32::MAX));
        let target = TileCell::new(column, row);

        let row_len = usize::try_from(row)
            .ok()
            .and_then(|index| grid.row_len(index))
            .and_then(|len| i32::try_from(len).ok());
        let Some(row_len) = row_len else {
            return TerrainEdit::add_platform(row, first, run, target);
        };

        let end = first
            .saturating_add(i32::try_from(run).unwrap_or(i32::MAX))
            .min(row_len);
        let start = first.max(0);
        let length = usize::try_from(end.saturating_sub(start)).unwrap_or(0);
        TerrainEdit::add_platform(row, start, length, target)
    }

    fn score(&self, site: &EditSite<'_>, anchors: Anchors, edit: &TerrainEdit) -> Option<f64> {
        if let Some(cell) = edit.disturbed_cell(site.grid, |cell| is_guarded(site, cell)) {
            warn!(
                "skipping {:?} edit at {}: tile {cell} is protected",
                edit.kind(),
                edit.target()
            );
            return None;
        }
        let mut grid = site.grid.clone();
        if let Err(error) = edit.apply_to(&mut grid) {
            warn!(
                "skipping {:?} edit at {}: {error}",
                edit.kind(),
                edit.target()
            );
            return None;
        }
        let cost = anchors.map_or(f64::INFINITY, |(start, goal)| {
            cost_between(&grid, &self.jump, start, goal)
        });
        debug!("{:?} at {} costs {cost}", edit.kind(), edit.target());
        Some(cost)
    }
}

/// Platform supporting `node`, unless it also supports a protected tile.
fn removable_platform<'a>(site: &EditSite<'a>, node: NodeKey) -> Option<&'a PlatformRect> {
    let support = TileCell::new(node.x(), node.y().saturating_add(1));
    let rect = site.platforms.iter().find(|rect| rect.contains(support))?;
    if site.protected.iter().any(|guard| rect.overlaps(guard)) {
        debug!("platform at ({}, {}) is protected", rect.column(), rect.row());
        return None;
    }
    Some(rect)
}

/// Route endpoints, the tiles they stand on and every protected tile.
fn is_guarded(site: &EditSite<'_>, cell: TileCell) -> bool {
    let footing = |tile: TileCell| TileCell::new(tile.x, tile.y.saturating_add(1));
    [site.start, site.goal, footing(site.start), footing(site.goal)].contains(&cell)
        || site.protected.iter().any(|rect| rect.contains(cell))
}

fn midpoint(a: i32, b: i32) -> i32 {
    let mid = (i64::from(a) + i64::from(b)).div_euclid(2);
    i32::try_from(mid).unwrap_or(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: &[(i32, i32)], weights: &[f64]) -> NavPath {
        NavPath::new(
            points.iter().map(|&(x, y)| NodeKey::new(x, y)).collect(),
            weights.to_vec(),
        )
        .expect("well-formed path")
    }

    #[test]
    fn critical_edge_skips_bootstrap_and_landing_edges() {
        let long = path(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)], &[1.0, 5.0, 3.0, 9.0]);
        let segment = critical_edge(&long).expect("interior edge");
        assert_eq!(segment.from, NodeKey::new(1, 0));
        assert_eq!(segment.to, NodeKey::new(2, 0));

        let short = path(&[(0, 0), (1, 0), (2, 0)], &[4.0, 2.0]);
        assert_eq!(critical_edge(&short).map(|s| s.to), Some(NodeKey::new(1, 0)));
        assert!(critical_edge(&NavPath::single(NodeKey::new(0, 0))).is_none());
    }

    #[test]
    fn critical_edge_ignores_nan_weights() {
        let noisy = path(&[(0, 0), (1, 0), (2, 0)], &[f64::NAN, 2.0]);
        assert_eq!(critical_edge(&noisy).map(|s| s.from), Some(NodeKey::new(1, 0)));
    }

    #[test]
    fn vertex_platform_sits_one_row_below_the_apex() {
        let grid = LevelGrid::from_rows(["      "; 5]);
        let evaluator = EditEvaluator::new(
            JumpTuning::default(),
            EvaluatorTuning::default(),
            MinimizeOwnCost,
        );
        let segment = PathSegment::new(NodeKey::new(0, 3), NodeKey::new(3, 3), 2.0);

        let edit = evaluator
            .platform_under_vertex(&grid, &segment)
            .expect("level jump has a vertex");
        assert_eq!(edit.kind(), EditKind::AddPlatform);
        assert_eq!(edit.target(), TileCell::new(2, 2));
        assert_eq!(edit.updates()[0].column, 1);
        assert_eq!(edit.updates()[0].length, 3);
    }

    #[test]
    fn platform_runs_are_clipped_to_the_row() {
        let grid = LevelGrid::from_rows(["    ", "    "]);
        let evaluator = EditEvaluator::new(
            JumpTuning::default(),
            EvaluatorTuning { platform_run: 5 },
            MinimizeOwnCost,
        );

        let edit = evaluator.platform_run(&grid, 1, 0);
        assert_eq!(edit.updates()[0].column, 0);
        assert_eq!(edit.updates()[0].length, 3);

        let off_grid = evaluator.platform_run(&grid, 7, 1);
        assert!(off_grid.apply_to(&mut grid.clone()).is_err());
    }

    #[test]
    fn scorers_disagree_on_direction() {
        assert!(MinimizeOwnCost.improves(2.0, 3.0));
        assert!(!MinimizeOwnCost.improves(3.0, 3.0));
        assert!(MaximizeOpponentCost.improves(f64::INFINITY, 3.0));
        assert!(!MaximizeOpponentCost.improves(f64::INFINITY, f64::INFINITY));
    }

    #[test]
    fn midpoint_rounds_toward_negative_infinity() {
        assert_eq!(midpoint(0, 12), 6);
        assert_eq!(midpoint(3, 4), 3);
        assert_eq!(midpoint(-1, 0), -1);
        assert_eq!(midpoint(i32::MAX, i32::MAX), i32::MAX);
    }
}
