#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level graph compiler that turns a tile grid into a weighted navigation graph.
//!
//! Nodes are the standable positions of the grid. For every node, edges are
//! discovered in a fixed order: walking steps first, then the centre rectangle
//! of short jumps, then the two side zones of long jumps. Jump candidates are
//! only linked when the visibility oracle certifies their arc as clear.

use arcpath_core::{
    arc_clear, EdgeKind, JumpArc, JumpTuning, LevelGraph, LevelGrid, NodeKey, WeightMode,
};
use log::{debug, trace};

/// Builds the navigation graph for `grid` from scratch.
#[must_use]
pub fn compile(grid: &LevelGrid, tuning: &JumpTuning) -> LevelGraph {
    let mut compiler = Compiler {
        grid,
        tuning,
        graph: LevelGraph::new(),
    };
    compiler.discover_nodes();

    let keys: Vec<NodeKey> = compiler.graph.keys().collect();
    for key in keys {
        compiler.link_walks(key);
        if !compiler.can_take_off(key) {
            continue;
        }
        compiler.scan_centre(key);
        compiler.scan_side_zones(key);
    }

    debug!(
        "compiled {} nodes and {} edges from a {}x{} grid",
        compiler.graph.node_count(),
        compiler.graph.edge_count(),
        grid.width(),
        grid.height()
    );
    compiler.graph
}

struct Compiler<'a> {
    grid: &'a LevelGrid,
    tuning: &'a JumpTuning,
    graph: LevelGraph,
}

impl Compiler<'_> {
    fn discover_nodes(&mut self) {
        for (x, y, _) in self.grid.cells() {
            let standing = y - 1;
            if self
                .grid
                .is_standable(x, standing, &self.tuning.traversable)
            {
                let _ = self.graph.insert_node(NodeKey::new(x, standing));
            }
        }
    }

    fn link_walks(&mut self, from: NodeKey) {
        for step in [-1, 1] {
            let to = NodeKey::new(from.x() + step, from.y());
            let _ = self
                .graph
                .add_edge(from, to, self.tuning.walk_cost, EdgeKind::Walk);
        }
    }

    /// A jump needs open space directly above the standing tile; positions
    /// above the grid are always open.
    fn can_take_off(&self, from: NodeKey) -> bool {
        let above = from.y() - 1;
        above < 0
            || self
                .grid
                .is_traversable(from.x(), above, &self.tuning.traversable)
    }

    fn scan_centre(&mut self, from: NodeKey) {
        let reach = self.tuning.centre_reach();
        let top = from.y() - self.tuning.apex_rows();
        let bottom = from.y().saturating_add(slack_rows(self.tuning));

        for dx in (-reach..=reach).filter(|dx| *dx != 0) {
            let column = from.x() + dx;
            let landing = (top..=bottom)
                .map(|row| NodeKey::new(column, row))
                .find(|candidate| self.graph.contains(*candidate));
            if let Some(to) = landing {
                self.try_jump(from, to, EdgeKind::ShortJump);
            }
        }
    }

    fn scan_side_zones(&mut self, from: NodeKey) {
        let apex = f64::from(self.tuning.apex_height);
        let span = f64::from(self.tuning.flat_span);
        let floor = i32::try_from(self.grid.height()).unwrap_or(i32::MAX);

        for offset in self.tuning.centre_reach()..=self.tuning.side_reach() {
            if offset == 0 {
                continue;
            }
            let reach = f64::from(offset);
            let start_row = from.y() + ((reach / apex) * (reach - span)).floor() as i32;

            let mut right = None;
            let mut left = None;
            for row in start_row..floor {
                if right.is_none() {
                    right = Some(NodeKey::new(from.x() + offset, row))
                        .filter(|candidate| self.graph.contains(*candidate));
                }
                if left.is_none() {
                    left = Some(NodeKey::new(from.x() - offset, row))
                        .filter(|candidate| self.graph.contains(*candidate));
                }
                if right.is_some() && left.is_some() {
                    break;
                }
            }

            for to in [right, left].into_iter().flatten() {
                self.try_jump(from, to, EdgeKind::LongJump);
            }
        }
    }

    fn try_jump(&mut self, from: NodeKey, to: NodeKey, kind: EdgeKind) {
        let arc = match JumpArc::new(
            from.to_point(),
            to.to_point(),
            f64::from(self.tuning.apex_height),
        ) {
            Ok(arc) => arc,
            Err(error) => {
                trace!("skipping jump {from} -> {to}: {error}");
                return;
            }
        };

        if !arc_clear(
            self.grid,
            &arc,
            self.tuning.arc_samples,
            &self.tuning.traversable,
        ) {
            return;
        }

        let weight = match (self.tuning.weight_mode, kind) {
            (WeightMode::ArcLength, _) => arc.length(),
            (WeightMode::Flat, EdgeKind::LongJump) => self.tuning.long_jump_cost,
            (WeightMode::Flat, _) => self.tuning.short_jump_cost,
        };
        let _ = self.graph.add_edge(from, to, weight, kind);
    }
}

fn slack_rows(tuning: &JumpTuning) -> i32 {
    i32::try_from(tuning.drop_slack).unwrap_or(i32::MAX)
}
