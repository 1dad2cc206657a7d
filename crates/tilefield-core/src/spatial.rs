//! Quadrant tree over tile influence boxes.
//!
//! Built once per field pass and dropped before the next one. Each tile handle
//! is stored in every leaf its influence box touches, so a point query only has
//! to walk one root-to-leaf path and still sees every tile that can reach it.

use crate::config::IndexConfig;
use crate::geometry::Aabb;
use crate::tile::{Tile, TileId};
use std::{error::Error, fmt};
use tracing::{debug, warn};

/// Slot in the node arena. Node 0 is always the root.
pub type NodeId = usize;

pub const ROOT: NodeId = 0;

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Leaf(Vec<TileId>),
    /// Children in [`Aabb::quadrants`] order.
    Internal([NodeId; 4]),
}

#[derive(Clone, Debug)]
pub struct IndexNode {
    pub bounds: Aabb,
    pub depth: u32,
    /// Back-link only; nodes are owned by the tree's arena.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl IndexNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Handles held by this node; empty for internal nodes.
    pub fn contents(&self) -> &[TileId] {
        match &self.kind {
            NodeKind::Leaf(contents) => contents,
            NodeKind::Internal(_) => &[],
        }
    }

    pub fn children(&self) -> Option<&[NodeId; 4]> {
        match &self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(children) => Some(children),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuadTree {
    nodes: Vec<IndexNode>,
    config: IndexConfig,
    /// Influence box per inserted handle, needed to redistribute on split.
    extents: Vec<Option<Aabb>>,
    len: usize,
}

impl QuadTree {
    /// Roots smaller than this on either axis are grown to it.
    pub const MIN_ROOT_EXTENT: f64 = 1.0;

    pub fn new(bounds: Aabb, config: IndexConfig) -> Self {
        let bounds = Self::sanitize_bounds(bounds);
        Self {
            nodes: vec![IndexNode {
                bounds,
                depth: 0,
                parent: None,
                kind: NodeKind::Leaf(Vec::new()),
            }],
            config,
            extents: Vec::new(),
            len: 0,
        }
    }

    /// A zero-area root could never split and would act as one unbounded leaf,
    /// so degenerate sides are widened from the min corner instead.
    fn sanitize_bounds(bounds: Aabb) -> Aabb {
        if !bounds.is_finite() {
            warn!(?bounds, "non-finite index bounds, falling back to unit box");
            return Aabb::new(
                [0.0, 0.0],
                [Self::MIN_ROOT_EXTENT, Self::MIN_ROOT_EXTENT],
            );
        }
        let mut out = bounds;
        for axis in 0..2 {
            if out.max[axis] - out.min[axis] < Self::MIN_ROOT_EXTENT {
                out.max[axis] = out.min[axis] + Self::MIN_ROOT_EXTENT;
            }
        }
        if out != bounds {
            warn!(?bounds, clamped = ?out, "degenerate index bounds clamped");
        }
        out
    }

    /// Add one handle whose influence reaches over `extent`.
    pub fn insert(&mut self, id: TileId, extent: Aabb) {
        if self.extents.len() <= id {
            self.extents.resize(id + 1, None);
        }
        if self.extents[id].is_some() {
            warn!(id, "tile handle inserted twice; ignoring the repeat");
            return;
        }
        self.extents[id] = Some(extent);
        self.len += 1;
        if self.nodes[ROOT].bounds.intersects(&extent) {
            self.insert_at(ROOT, id, &extent);
        }
    }

    fn insert_at(&mut self, node: NodeId, id: TileId, extent: &Aabb) {
        if let NodeKind::Internal(children) = self.nodes[node].kind {
            for child in children {
                if self.nodes[child].bounds.intersects(extent) {
                    self.insert_at(child, id, extent);
                }
            }
            return;
        }
        if let NodeKind::Leaf(contents) = &mut self.nodes[node].kind {
            contents.push(id);
        }
        if self.should_split(node) {
            self.split(node);
        }
    }

    fn should_split(&self, node: NodeId) -> bool {
        let n = &self.nodes[node];
        n.contents().len() > self.config.split_threshold
            && n.bounds.size() > self.config.min_split_size
            && n.depth < self.config.max_depth
            && self.split_separates(node)
    }

    /// True if at least one handle would miss some child. When every box spans
    /// all four quadrants a split only copies the leaf four times.
    fn split_separates(&self, node: NodeId) -> bool {
        let quadrants = self.nodes[node].bounds.quadrants();
        self.nodes[node].contents().iter().any(|&id| {
            self.extents
                .get(id)
                .copied()
                .flatten()
                .is_some_and(|extent| !quadrants.iter().all(|q| q.intersects(&extent)))
        })
    }

    fn split(&mut self, node: NodeId) {
        let first_child = self.nodes.len();
        let children = [first_child, first_child + 1, first_child + 2, first_child + 3];
        let (bounds, depth) = (self.nodes[node].bounds, self.nodes[node].depth);
        for quadrant in bounds.quadrants() {
            self.nodes.push(IndexNode {
                bounds: quadrant,
                depth: depth + 1,
                parent: Some(node),
                kind: NodeKind::Leaf(Vec::new()),
            });
        }

        let previous = std::mem::replace(&mut self.nodes[node].kind, NodeKind::Internal(children));
        let NodeKind::Leaf(contents) = previous else {
            return;
        };
        for id in contents {
            let Some(extent) = self.extents[id] else {
                continue;
            };
            for child in children {
                if self.nodes[child].bounds.intersects(&extent) {
                    self.insert_at(child, id, &extent);
                }
            }
        }
    }

    /// Leaf whose box holds `point`. On a split line the min-side child wins,
    /// so ties resolve toward the top-left quadrant.
    pub fn leaf_at(&self, point: [f64; 2]) -> NodeId {
        let root = self.nodes[ROOT].bounds;
        debug_assert!(
            root.contains_point(point),
            "query point {point:?} outside index bounds {root:?}"
        );
        let point = root.clamp_point(point);
        let mut node = ROOT;
        while let NodeKind::Internal(children) = &self.nodes[node].kind {
            let [mid_x, mid_y] = self.nodes[node].bounds.center();
            let quadrant = usize::from(point[0] > mid_x) + 2 * usize::from(point[1] > mid_y);
            node = children[quadrant];
        }
        node
    }

    /// Candidate handles for `point`: a superset of every tile whose influence
    /// box contains it. Callers still apply their own exact range test.
    pub fn query(&self, point: [f64; 2]) -> &[TileId] {
        self.nodes[self.leaf_at(point)].contents()
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes[ROOT].bounds
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn node(&self, id: NodeId) -> &IndexNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[IndexNode] {
        &self.nodes
    }

    /// Number of distinct handles inserted.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest node (root = 0).
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn max_leaf_len(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.contents().len())
            .max()
            .unwrap_or(0)
    }

    /// Walk the arena and report the first structural inconsistency.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let fail = |node: NodeId, reason: &'static str| Err(InvariantViolation { node, reason });
        let root = &self.nodes[ROOT];
        if root.parent.is_some() || root.depth != 0 {
            return fail(ROOT, "root must have depth 0 and no parent");
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if node.depth > self.config.max_depth {
                return fail(id, "node deeper than max_depth");
            }
            if let Some(parent) = node.parent {
                let Some(siblings) = self.nodes.get(parent).and_then(IndexNode::children) else {
                    return fail(id, "parent is not an internal node");
                };
                if !siblings.contains(&id) {
                    return fail(id, "parent does not list node as a child");
                }
                if node.depth != self.nodes[parent].depth + 1 {
                    return fail(id, "child depth must be parent depth + 1");
                }
            } else if id != ROOT {
                return fail(id, "non-root node without parent");
            }
            match &node.kind {
                NodeKind::Internal(children) => {
                    let quadrants = node.bounds.quadrants();
                    for (child, quadrant) in children.iter().zip(quadrants) {
                        if self.nodes.get(*child).map(|c| c.bounds) != Some(quadrant) {
                            return fail(id, "child bounds are not the parent's quadrants");
                        }
                    }
                }
                NodeKind::Leaf(contents) => {
                    for &tile in contents {
                        let Some(Some(extent)) = self.extents.get(tile) else {
                            return fail(id, "leaf holds a handle that was never inserted");
                        };
                        if !extent.intersects(&node.bounds) {
                            return fail(id, "leaf holds a handle outside its box");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Construct a tree over `bounds` and insert every tile in slice order.
pub fn build_index(tiles: &[Tile], bounds: Aabb, config: &IndexConfig) -> QuadTree {
    let mut tree = QuadTree::new(bounds, config.clone());
    for (id, tile) in tiles.iter().enumerate() {
        tree.insert(id, tile.extent());
    }
    debug_assert_eq!(tree.check_invariants(), Ok(()));
    debug!(
        tiles = tiles.len(),
        nodes = tree.node_count(),
        depth = tree.depth(),
        "spatial index built"
    );
    tree
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub node: NodeId,
    pub reason: &'static str,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index node {}: {}", self.node, self.reason)
    }
}

impl Error for InvariantViolation {}
