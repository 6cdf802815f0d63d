//! Compiled navigation graph and solved paths.
//!
//! Nodes live in an arena keyed by their tile coordinate; each node owns a
//! map from neighbour key to edge. Ordered maps keep every traversal
//! deterministic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tile coordinate of a standing position.
///
/// `y` may be `-1` for positions resting on a platform in the top row.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeKey {
    x: i32,
    y: i32,
}

impl NodeKey {
    /// Creates a node key from column and row.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the standing position.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the standing position.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Manhattan distance between two keys.
    #[must_use]
    pub const fn manhattan_distance(&self, other: NodeKey) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Key expressed as floating-point tile coordinates.
    #[must_use]
    pub fn to_point(self) -> (f64, f64) {
        (f64::from(self.x), f64::from(self.y))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// How an edge was discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Single step to an adjacent node on the same row.
    Walk,
    /// Jump found by the centre rectangle scan.
    ShortJump,
    /// Jump found by the side-zone scan.
    LongJump,
}

/// Directed weighted link to a neighbouring node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavEdge {
    weight: f64,
    kind: EdgeKind,
}

impl NavEdge {
    /// Traversal cost of the edge.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Discovery kind of the edge.
    #[must_use]
    pub const fn kind(&self) -> EdgeKind {
        self.kind
    }
}

/// Standing position together with its outgoing edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NavNode {
    key: NodeKey,
    edges: BTreeMap<NodeKey, NavEdge>,
}

impl NavNode {
    /// Coordinate of the node.
    #[must_use]
    pub const fn key(&self) -> NodeKey {
        self.key
    }

    /// Outgoing edges ordered by neighbour key.
    pub fn edges(&self) -> impl Iterator<Item = (NodeKey, &NavEdge)> + '_ {
        self.edges.iter().map(|(key, edge)| (*key, edge))
    }

    /// Number of outgoing edges.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

/// Node arena produced by the level compiler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelGraph {
    nodes: BTreeMap<NodeKey, NavNode>,
}

impl LevelGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, returning `false` when it already existed.
    pub fn insert_node(&mut self, key: NodeKey) -> bool {
        if self.nodes.contains_key(&key) {
            return false;
        }
        let _ = self.nodes.insert(
            key,
            NavNode {
                key,
                edges: BTreeMap::new(),
            },
        );
        true
    }

    /// Records a directed edge, keeping the lowest weight seen for the pair.
    ///
    /// Returns `true` when the stored edge changed. Self loops, unknown
    /// endpoints and negative or non-numeric weights are ignored.
    pub fn add_edge(&mut self, from: NodeKey, to: NodeKey, weight: f64, kind: EdgeKind) -> bool {
        if from == to || weight.is_nan() || weight < 0.0 || !self.nodes.contains_key(&to) {
            return false;
        }
        let Some(node) = self.nodes.get_mut(&from) else {
            return false;
        };
        match node.edges.get_mut(&to) {
            Some(existing) if existing.weight <= weight => false,
            Some(existing) => {
                *existing = NavEdge { weight, kind };
                true
            }
            None => {
                let _ = node.edges.insert(to, NavEdge { weight, kind });
                true
            }
        }
    }

    /// Reports whether a node exists at `key`.
    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Node stored at `key`.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&NavNode> {
        self.nodes.get(&key)
    }

    /// Edge from `from` to `to`, if one was compiled.
    #[must_use]
    pub fn edge(&self, from: NodeKey, to: NodeKey) -> Option<&NavEdge> {
        self.nodes.get(&from)?.edges.get(&to)
    }

    /// Outgoing edges of `key`; empty for unknown nodes.
    pub fn neighbors(&self, key: NodeKey) -> impl Iterator<Item = (NodeKey, &NavEdge)> + '_ {
        self.nodes
            .get(&key)
            .into_iter()
            .flat_map(|node| node.edges())
    }

    /// Iterator over all node keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }

    /// Iterator over all nodes in ascending key order.
    pub fn nodes(&self) -> impl Iterator<Item = &NavNode> + '_ {
        self.nodes.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(NavNode::degree).sum()
    }
}

/// Motion required to traverse one path segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentMotion {
    /// Horizontal step to an adjacent tile on the same row.
    Walk,
    /// Any other displacement, traversed along a jump arc.
    Jump,
}

impl SegmentMotion {
    /// Classifies the displacement between two consecutive path nodes.
    #[must_use]
    pub const fn between(from: NodeKey, to: NodeKey) -> Self {
        if from.y == to.y && from.x.abs_diff(to.x) == 1 {
            Self::Walk
        } else {
            Self::Jump
        }
    }
}

/// One edge of a solved path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Node the segment leaves.
    pub from: NodeKey,
    /// Node the segment reaches.
    pub to: NodeKey,
    /// Weight of the compiled edge.
    pub weight: f64,
    /// Motion used to traverse the segment.
    pub motion: SegmentMotion,
}

impl PathSegment {
    /// Builds a segment, classifying its motion from the displacement.
    #[must_use]
    pub const fn new(from: NodeKey, to: NodeKey, weight: f64) -> Self {
        Self {
            from,
            to,
            weight,
            motion: SegmentMotion::between(from, to),
        }
    }
}

/// Ordered start-to-goal node sequence with the weights of the edges taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PathParts")]
pub struct NavPath {
    nodes: Vec<NodeKey>,
    weights: Vec<f64>,
}

impl NavPath {
    /// Creates a path from parts. Returns `None` unless there is at least one
    /// node and exactly one weight per consecutive node pair.
    #[must_use]
    pub fn new(nodes: Vec<NodeKey>, weights: Vec<f64>) -> Option<Self> {
        if nodes.is_empty() || weights.len() + 1 != nodes.len() {
            return None;
        }
        Some(Self { nodes, weights })
    }

    /// Path that starts and ends on the same node.
    #[must_use]
    pub fn single(node: NodeKey) -> Self {
        Self {
            nodes: vec![node],
            weights: Vec::new(),
        }
    }

    /// Visited nodes from start to goal.
    #[must_use]
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// Edge weights, one shorter than the node list.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// First node of the path.
    #[must_use]
    pub fn start(&self) -> NodeKey {
        self.nodes[0]
    }

    /// Final node of the path.
    #[must_use]
    pub fn goal(&self) -> NodeKey {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.weights.len()
    }

    /// Segment at `index`, if present.
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<PathSegment> {
        let weight = *self.weights.get(index)?;
        let from = *self.nodes.get(index)?;
        let to = *self.nodes.get(index + 1)?;
        Some(PathSegment::new(from, to, weight))
    }

    /// Segments in travel order.
    pub fn segments(&self) -> impl Iterator<Item = PathSegment> + '_ {
        (0..self.segment_count()).filter_map(|index| self.segment(index))
    }

    /// Sum of the edge weights, skipping non-numeric entries.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        total_weight(&self.weights)
    }
}

#[derive(Deserialize)]
struct PathParts {
    nodes: Vec<NodeKey>,
    weights: Vec<f64>,
}

impl TryFrom<PathParts> for NavPath {
    type Error = String;

    fn try_from(parts: PathParts) -> Result<Self, Self::Error> {
        let (nodes, weights) = (parts.nodes.len(), parts.weights.len());
        Self::new(parts.nodes, parts.weights)
            .ok_or_else(|| format!("path with {nodes} nodes cannot carry {weights} weights"))
    }
}

/// Sums weights while ignoring `NaN` entries.
#[must_use]
pub fn total_weight(weights: &[f64]) -> f64 {
    weights.iter().filter(|weight| !weight.is_nan()).sum()
}
