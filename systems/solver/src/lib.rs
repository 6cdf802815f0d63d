#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shortest-path solver over compiled level graphs.
//!
//! The solver runs plain Dijkstra so that any non-negative jump tuning stays
//! valid. Queue ties break on node key, which makes every solve reproducible.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, BTreeSet, BinaryHeap},
};

use arcpath_core::{LevelGraph, LevelGrid, NavError, NavPath, NodeKey, TileCell};
use log::debug;
use ordered_float::OrderedFloat;

/// Largest perimeter radius searched when settling a marker onto the graph.
pub const SETTLE_RADIUS: i32 = 15;

/// Straight-line distance, in tiles, from which fallback routes gain waypoints.
pub const WAYPOINT_THRESHOLD: f64 = 10.0;

/// Spacing, in tiles, between fallback route waypoints.
pub const WAYPOINT_SPACING: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frontier {
    cost: OrderedFloat<f64>,
    node: NodeKey,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        Reverse(self.cost)
            .cmp(&Reverse(other.cost))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds the minimum-weight path from `start` to `goal`.
///
/// Returns [`NavError::NoPath`] when either endpoint is not a node or the goal
/// is unreachable. A start equal to the goal yields a single-node path.
pub fn solve(graph: &LevelGraph, start: NodeKey, goal: NodeKey) -> Result<NavPath, NavError> {
    let no_path = NavError::NoPath { start, goal };
    if !graph.contains(start) || !graph.contains(goal) {
        return Err(no_path);
    }
    if start == goal {
        return Ok(NavPath::single(start));
    }

    let mut distances: BTreeMap<NodeKey, f64> = BTreeMap::new();
    let mut came_from: BTreeMap<NodeKey, (NodeKey, f64)> = BTreeMap::new();
    let mut settled: BTreeSet<NodeKey> = BTreeSet::new();
    let mut frontier = BinaryHeap::new();

    let _ = distances.insert(start, 0.0);
    frontier.push(Frontier {
        cost: OrderedFloat(0.0),
        node: start,
    });

    while let Some(Frontier { cost, node }) = frontier.pop() {
        if !settled.insert(node) {
            continue;
        }
        if node == goal {
            debug!(
                "solved {start} -> {goal} at cost {} after settling {} nodes",
                cost.0,
                settled.len()
            );
            return reconstruct(&came_from, start, goal).ok_or(no_path);
        }

        for (neighbor, edge) in graph.neighbors(node) {
            if settled.contains(&neighbor) {
                continue;
            }
            let candidate = cost.0 + edge.weight();
            let improves = distances
                .get(&neighbor)
                .map_or(true, |known| candidate < *known);
            if improves {
                let _ = distances.insert(neighbor, candidate);
                let _ = came_from.insert(neighbor, (node, edge.weight()));
                frontier.push(Frontier {
                    cost: OrderedFloat(candidate),
                    node: neighbor,
                });
            }
        }
    }

    debug!("no path from {start} to {goal}");
    Err(no_path)
}

fn reconstruct(
    came_from: &BTreeMap<NodeKey, (NodeKey, f64)>,
    start: NodeKey,
    goal: NodeKey,
) -> Option<NavPath> {
    let mut nodes = vec![goal];
    let mut weights = Vec::new();
    let mut current = goal;
    while current != start {
        let (previous, weight) = *came_from.get(&current)?;
        nodes.push(previous);
        weights.push(weight);
        current = previous;
    }
    nodes.reverse();
    weights.reverse();
    NavPath::new(nodes, weights)
}

/// Resolves a marker tile to the node an agent standing there would occupy.
///
/// Tries the tile itself, then the first node straight below it, then the
/// perimeters of growing squares around it up to [`SETTLE_RADIUS`].
#[must_use]
pub fn settle(graph: &LevelGraph, grid: &LevelGrid, tile: TileCell) -> Option<NodeKey> {
    let exact = NodeKey::new(tile.x, tile.y);
    if graph.contains(exact) {
        return Some(exact);
    }

    let floor = i32::try_from(grid.height()).unwrap_or(i32::MAX);
    let below = (tile.y.saturating_add(1)..floor)
        .map(|row| NodeKey::new(tile.x, row))
        .find(|candidate| graph.contains(*candidate));
    if below.is_some() {
        return below;
    }

    for radius in 1..=SETTLE_RADIUS {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let candidate = NodeKey::new(tile.x + dx, tile.y + dy);
                if graph.contains(candidate) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Straight-line fallback route used when no compiled path exists.
///
/// Long routes are split into evenly spaced waypoints roughly
/// [`WAYPOINT_SPACING`] tiles apart.
#[must_use]
pub fn direct_route(start: (f64, f64), goal: (f64, f64)) -> Vec<(f64, f64)> {
    let (dx, dy) = (goal.0 - start.0, goal.1 - start.1);
    let distance = dx.hypot(dy);
    if !distance.is_finite() || distance < WAYPOINT_THRESHOLD {
        return vec![start, goal];
    }

    let legs = (distance / WAYPOINT_SPACING).ceil() as u32;
    let mut route = Vec::with_capacity(legs as usize + 1);
    route.push(start);
    for leg in 1..legs {
        let t = f64::from(leg) / f64::from(legs);
        route.push((start.0 + dx * t, start.1 + dy * t));
    }
    route.push(goal);
    route
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_pops_cheapest_then_lowest_key() {
        let mut heap = BinaryHeap::new();
        for (cost, x) in [(2.0, 0), (1.0, 5), (1.0, 3)] {
            heap.push(Frontier {
                cost: OrderedFloat(cost),
                node: NodeKey::new(x, 0),
            });
        }
        let order: Vec<i32> = std::iter::from_fn(|| heap.pop())
            .map(|entry| entry.node.x())
            .collect();
        assert_eq!(order, vec![3, 5, 0]);
    }

    #[test]
    fn short_routes_go_direct() {
        assert_eq!(direct_route((0.0, 0.0), (3.0, 4.0)), vec![(0.0, 0.0), (3.0, 4.0)]);
    }

    #[test]
    fn long_routes_gain_waypoints() {
        let route = direct_route((0.0, 2.0), (12.0, 2.0));
        assert_eq!(route.len(), 4);
        assert!((route[1].0 - 4.0).abs() < 1e-9);
        assert!((route[2].0 - 8.0).abs() < 1e-9);
        assert!(route.iter().all(|point| point.1 == 2.0));
        assert_eq!(route.last(), Some(&(12.0, 2.0)));
    }
}
