//! Clearance checks for straight and arced motion through the grid.
//!
//! Tile `i` covers `[i - 0.5, i + 0.5]`, so standing positions sit on tile
//! centres. Segments are rasterised with a supercover walk: every tile the
//! segment touches is visited, including both neighbours when the segment
//! passes exactly through a tile corner.

use crate::{arc::JumpArc, grid::LevelGrid, grid::TraversableSet};

/// Two crossing times closer than this are treated as a corner crossing.
const CORNER_TOLERANCE: f64 = 1e-9;

/// Visits every tile touched by the segment from `from` to `to`.
///
/// The walk stops early when `visit` returns `false`; the return value reports
/// whether every visited tile was accepted. Non-finite endpoints are rejected
/// without visiting anything.
pub fn supercover_walk<F>(from: (f64, f64), to: (f64, f64), mut visit: F) -> bool
where
    F: FnMut(i32, i32) -> bool,
{
    let finite = [from.0, from.1, to.0, to.1]
        .iter()
        .all(|value| value.is_finite());
    if !finite {
        return false;
    }

    let (x0, y0) = (from.0 + 0.5, from.1 + 0.5);
    let (x1, y1) = (to.0 + 0.5, to.1 + 0.5);
    let mut tile_x = x0.floor() as i32;
    let mut tile_y = y0.floor() as i32;
    let end_x = x1.floor() as i32;
    let end_y = y1.floor() as i32;

    if !visit(tile_x, tile_y) {
        return false;
    }

    let dx = x1 - x0;
    let dy = y1 - y0;
    let step_x = axis_step(dx);
    let step_y = axis_step(dy);
    let delta_x = if dx == 0.0 { f64::INFINITY } else { 1.0 / dx.abs() };
    let delta_y = if dy == 0.0 { f64::INFINITY } else { 1.0 / dy.abs() };
    let mut max_x = first_crossing(x0, dx, tile_x);
    let mut max_y = first_crossing(y0, dy, tile_y);

    let mut remaining = (end_x - tile_x).unsigned_abs() + (end_y - tile_y).unsigned_abs();
    while remaining > 0 {
        let x_done = tile_x == end_x;
        let y_done = tile_y == end_y;

        if !x_done && !y_done && (max_x - max_y).abs() < CORNER_TOLERANCE {
            if !visit(tile_x + step_x, tile_y) || !visit(tile_x, tile_y + step_y) {
                return false;
            }
            tile_x += step_x;
            tile_y += step_y;
            max_x += delta_x;
            max_y += delta_y;
            remaining = remaining.saturating_sub(2);
        } else if y_done || (!x_done && max_x < max_y) {
            tile_x += step_x;
            max_x += delta_x;
            remaining -= 1;
        } else {
            tile_y += step_y;
            max_y += delta_y;
            remaining -= 1;
        }

        if !visit(tile_x, tile_y) {
            return false;
        }
    }

    true
}

fn axis_step(delta: f64) -> i32 {
    if delta > 0.0 {
        1
    } else if delta < 0.0 {
        -1
    } else {
        0
    }
}

/// Parametric time at which the segment first leaves its starting tile along one axis.
fn first_crossing(origin: f64, delta: f64, tile: i32) -> f64 {
    if delta > 0.0 {
        (f64::from(tile) + 1.0 - origin) / delta
    } else if delta < 0.0 {
        (origin - f64::from(tile)) / -delta
    } else {
        f64::INFINITY
    }
}

/// Reports whether the tile at `(x, y)` stops motion.
///
/// Rows at or below the grid height block. Tiles above the grid, left of it or
/// past the end of their row are open air so arcs may leave the level bounds.
#[must_use]
pub fn tile_blocks(grid: &LevelGrid, x: i32, y: i32, traversable: &TraversableSet) -> bool {
    let Ok(row) = usize::try_from(y) else {
        return false;
    };
    if row >= grid.height() {
        return true;
    }
    match grid.symbol(x, y) {
        Some(symbol) => !traversable.contains(symbol),
        None => false,
    }
}

/// Reports whether every tile touched by the straight segment is traversable.
#[must_use]
pub fn segment_clear(
    grid: &LevelGrid,
    from: (f64, f64),
    to: (f64, f64),
    traversable: &TraversableSet,
) -> bool {
    supercover_walk(from, to, |x, y| !tile_blocks(grid, x, y, traversable))
}

/// Reports whether the jump arc clears the grid.
///
/// The curve is approximated by `samples` chords of equal horizontal extent;
/// the first blocked chord ends the check.
#[must_use]
pub fn arc_clear(
    grid: &LevelGrid,
    arc: &JumpArc,
    samples: u32,
    traversable: &TraversableSet,
) -> bool {
    if samples == 0 {
        return false;
    }

    let (origin_x, _) = arc.from();
    let run = arc.run();
    let point_at = |index: u32| {
        let offset = run * f64::from(index) / f64::from(samples);
        (origin_x + offset, arc.height_at(offset))
    };

    let mut previous = arc.from();
    for index in 1..=samples {
        let next = if index == samples {
            arc.to()
        } else {
            point_at(index)
        };
        if !segment_clear(grid, previous, next, traversable) {
            return false;
        }
        previous = next;
    }
    true
}
