//! Decision tree choosing which kind of edit to prefer.

use arcpath_core::{EditKind, LevelGrid, TileCell, TileKind};

use arcpath_core::EditKind::{AddHazard, AddPlatform, RemovePlatform};

/// Walkable runs at most this wide count as critical.
const NARROW_WALKWAY: usize = 3;

/// Coarse description of a level from the deciding side's point of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelAssessment {
    /// Number of platform tiles in the grid.
    pub platform_tiles: usize,
    /// Number of narrow walkable runs resting on platforms.
    pub critical_walkways: usize,
    /// How easily the goal can be reached, from 0 (walled in) to 1 (open).
    pub goal_accessibility: f64,
    /// Manhattan distance from the deciding side to the goal.
    pub own_distance: u32,
    /// Manhattan distance from the opponent to the goal.
    pub opponent_distance: u32,
}

impl LevelAssessment {
    /// Measures `grid` for a side at `own` playing against `opponent`.
    #[must_use]
    pub fn assess(grid: &LevelGrid, own: TileCell, opponent: TileCell, goal: TileCell) -> Self {
        let platform_tiles = grid
            .cells()
            .filter(|(_, _, symbol)| TileKind::from_symbol(*symbol) == TileKind::Platform)
            .count();

        Self {
            platform_tiles,
            critical_walkways: critical_walkways(grid),
            goal_accessibility: goal_accessibility(grid, goal),
            own_distance: manhattan(own, goal),
            opponent_distance: manhattan(opponent, goal),
        }
    }
}

fn manhattan(a: TileCell, b: TileCell) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}

fn is_platform(grid: &LevelGrid, x: i32, y: i32) -> bool {
    grid.tile(x, y) == Some(TileKind::Platform)
}

fn critical_walkways(grid: &LevelGrid) -> usize {
    let height = i32::try_from(grid.height()).unwrap_or(i32::MAX);
    let mut count = 0;

    for y in 0..height {
        let mut run = 0;
        let width = usize::try_from(y)
            .ok()
            .and_then(|row| grid.row_len(row))
            .and_then(|len| i32::try_from(len).ok())
            .unwrap_or(0);
        for x in 0..width {
            let open = grid.tile(x, y) == Some(TileKind::Empty);
            let supported = y + 1 >= height || is_platform(grid, x, y + 1);
            if open && supported {
                run += 1;
                continue;
            }
            if (1..=NARROW_WALKWAY).contains(&run) {
                count += 1;
            }
            run = 0;
        }
        if (1..=NARROW_WALKWAY).contains(&run) {
            count += 1;
        }
    }
    count
}

fn goal_accessibility(grid: &LevelGrid, goal: TileCell) -> f64 {
    if !is_platform(grid, goal.x, goal.y.saturating_add(1)) {
        return 0.9;
    }

    let mut nearby = 0_u32;
    for y in goal.y.saturating_sub(2)..=goal.y.saturating_add(2) {
        for x in goal.x.saturating_sub(2)..=goal.x.saturating_add(2) {
            if is_platform(grid, x, y) {
                nearby += 1;
            }
        }
    }
    1.0 - (f64::from(nearby) / 10.0).min(0.9)
}

/// Thresholds of the edit-kind decision tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemPolicy {
    /// Below this many platform tiles the level counts as sparse.
    pub sparse_platforms: usize,
    /// Above this many platform tiles the level counts as crowded.
    pub crowded_platforms: usize,
    /// Distance beyond which the deciding side is struggling.
    pub struggling_distance: u32,
    /// Distance beyond which the opponent is considered far from the goal.
    pub distant_opponent: u32,
    /// Accessibility below which the deciding side must build a way in.
    pub blocked_accessibility: f64,
    /// Accessibility below which building is preferred over defending.
    pub hard_accessibility: f64,
}

impl Default for ItemPolicy {
    fn default() -> Self {
        Self {
            sparse_platforms: 20,
            crowded_platforms: 25,
            struggling_distance: 10,
            distant_opponent: 15,
            blocked_accessibility: 0.3,
            hard_accessibility: 0.5,
        }
    }
}

impl ItemPolicy {
    /// Picks the preferred edit kind among `available`.
    ///
    /// `opponent_choice` is the kind the opponent already claimed this round,
    /// if any. Returns `None` only when nothing is available.
    #[must_use]
    pub fn choose(
        &self,
        assessment: &LevelAssessment,
        opponent_choice: Option<EditKind>,
        available: &[EditKind],
    ) -> Option<EditKind> {
        self.preferences(assessment, opponent_choice)
            .into_iter()
            .find_map(|order| order.iter().copied().find(|kind| available.contains(kind)))
            .or_else(|| available.first().copied())
    }

    /// Preference orders of every rule that fires, most urgent first.
    fn preferences(
        &self,
        level: &LevelAssessment,
        opponent: Option<EditKind>,
    ) -> Vec<&'static [EditKind]> {
        let mut orders: Vec<&'static [EditKind]> = Vec::new();
        let own = level.own_distance;
        let theirs = level.opponent_distance;

        if own > 0 && level.goal_accessibility < self.blocked_accessibility {
            orders.push(&[AddPlatform]);
        }
        match opponent {
            Some(AddPlatform) if theirs > own => {
                orders.push(&[RemovePlatform, AddHazard, AddPlatform]);
            }
            Some(RemovePlatform) if level.platform_tiles < self.sparse_platforms => {
                orders.push(&[AddPlatform, AddHazard, RemovePlatform]);
            }
            Some(AddHazard) if own > self.struggling_distance => {
                orders.push(&[AddPlatform, AddHazard, RemovePlatform]);
            }
            _ => {}
        }
        if opponent == Some(AddPlatform) && level.platform_tiles > self.crowded_platforms {
            orders.push(&[RemovePlatform, AddHazard, AddPlatform]);
        }
        if theirs < own {
            orders.push(&[AddHazard, AddPlatform, RemovePlatform]);
        }
        match opponent {
            Some(RemovePlatform) if level.critical_walkways > 0 => {
                orders.push(&[AddHazard, RemovePlatform, AddPlatform]);
            }
            Some(AddHazard) if theirs > self.distant_opponent => {
                orders.push(&[RemovePlatform, AddHazard, AddPlatform]);
            }
            _ => {}
        }
        if level.goal_accessibility < self.hard_accessibility {
            orders.push(&[AddPlatform, RemovePlatform]);
        } else {
            orders.push(&[AddHazard, RemovePlatform]);
        }
        orders
    }
}
