//! Dynamic AABB tree
//!
//! Broad-phase bounding volume hierarchy. Leaves hold a fattened copy of each
//! proxy's bounds so small movements do not touch the tree. Internal nodes
//! store the union of their two children and are kept height balanced with
//! single rotations.

use std::collections::HashMap;
use std::hash::Hash;

use crate::foundation::collections::FreeList;
use crate::physics::collision::aabb::Aabb;
use crate::physics::error::{PhysicsError, PhysicsResult};

/// Default fattening margin applied on every side of a leaf
pub const DEFAULT_AABB_MARGIN: f32 = 0.1;

/// Handle to a leaf in an [`AabbTree`].
///
/// Slots are reused, so a handle also records the slot generation it was
/// issued for; a handle outlives its leaf once that leaf is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind<T> {
    Leaf(T),
    Internal([usize; 2]),
}

#[derive(Debug, Clone, Copy)]
struct TreeNode<T> {
    /// Fat AABB for leaves, union of children for internal nodes
    aabb: Aabb,
    parent: Option<usize>,
    /// 0 for leaves
    height: i32,
    kind: NodeKind<T>,
}

impl<T> TreeNode<T> {
    fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }
}

/// Dynamic bounding volume hierarchy keyed by proxy id
#[derive(Debug, Clone)]
pub struct AabbTree<T> {
    nodes: FreeList<TreeNode<T>>,
    root: Option<usize>,
    leaves: HashMap<T, usize>,
    margin: f32,
}

impl<T: Copy + Ord + Hash> Default for AabbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Ord + Hash> AabbTree<T> {
    /// Create an empty tree with the default margin
    pub fn new() -> Self {
        Self::with_margin(DEFAULT_AABB_MARGIN)
    }

    /// Create an empty tree that fattens leaves by `margin`
    pub fn with_margin(margin: f32) -> Self {
        Self {
            nodes: FreeList::new(),
            root: None,
            leaves: HashMap::new(),
            margin: margin.max(0.0),
        }
    }

    /// Fattening margin used for new and moved leaves
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Number of proxies in the tree
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True when the tree holds no proxies
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Height of the root; 0 for an empty tree or a single leaf
    pub fn height(&self) -> i32 {
        self.root.map_or(0, |root| self.nodes[root].height)
    }

    /// Remove every proxy
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.leaves.clear();
        self.root = None;
    }

    /// Insert a proxy with its tight AABB.
    ///
    /// Fails with [`PhysicsError::AlreadyRegistered`] if `id` is already present.
    pub fn insert(&mut self, id: T, aabb: Aabb) -> PhysicsResult<NodeHandle> {
        if self.leaves.contains_key(&id) {
            return Err(PhysicsError::AlreadyRegistered);
        }

        let leaf = self.nodes.insert(TreeNode {
            aabb: aabb.fatten(self.margin),
            parent: None,
            height: 0,
            kind: NodeKind::Leaf(id),
        });
        self.insert_leaf(leaf);
        self.leaves.insert(id, leaf);

        Ok(self.handle_at(leaf))
    }

    /// Move a proxy to a new tight AABB.
    ///
    /// Returns `false` when the new bounds still fit inside the stored fat
    /// AABB and the tree was left untouched. The handle stays valid either way.
    ///
    /// # Panics
    /// If `handle` does not refer to a live leaf.
    pub fn update(&mut self, handle: NodeHandle, aabb: Aabb) -> bool {
        let leaf = self.expect_leaf(handle);
        if self.nodes[leaf].aabb.contains(&aabb) {
            return false;
        }

        self.remove_leaf(leaf);
        self.nodes[leaf].aabb = aabb.fatten(self.margin);
        self.insert_leaf(leaf);
        true
    }

    /// Remove a proxy and return its id.
    ///
    /// # Panics
    /// If `handle` does not refer to a live leaf.
    pub fn remove(&mut self, handle: NodeHandle) -> T {
        let leaf = self.expect_leaf(handle);
        let id = self.leaf_id(leaf);

        self.remove_leaf(leaf);
        self.nodes.remove(leaf);
        self.leaves.remove(&id);
        id
    }

    /// Handle of the leaf holding `id`, if any
    pub fn handle_of(&self, id: &T) -> Option<NodeHandle> {
        self.leaves.get(id).map(|&leaf| self.handle_at(leaf))
    }

    /// Id stored in a leaf
    ///
    /// # Panics
    /// If `handle` does not refer to a live leaf.
    pub fn user_data(&self, handle: NodeHandle) -> T {
        self.leaf_id(self.expect_leaf(handle))
    }

    /// Fattened AABB stored in a leaf
    ///
    /// # Panics
    /// If `handle` does not refer to a live leaf.
    pub fn fat_aabb(&self, handle: NodeHandle) -> Aabb {
        self.nodes[self.expect_leaf(handle)].aabb
    }

    /// All unordered pairs of leaves whose fat AABBs overlap.
    ///
    /// Each pair appears once as `(min, max)`; self pairs never appear. The
    /// result is sorted so callers see a stable order.
    pub fn query_pairs(&self) -> Vec<(T, T)> {
        let mut pairs = Vec::new();
        let Some(root) = self.root else {
            return pairs;
        };

        // Every leaf pair has exactly one lowest common ancestor; it is found
        // by testing that ancestor's left subtree against its right subtree.
        let mut stack = Vec::with_capacity(64);
        stack.push(root);
        while let Some(index) = stack.pop() {
            if let NodeKind::Internal([left, right]) = self.nodes[index].kind {
                self.query_overlap(left, right, &mut pairs);
                stack.push(left);
                stack.push(right);
            }
        }

        pairs.sort_unstable();
        pairs
    }

    /// Ids of leaves whose fat AABB overlaps `region`, sorted
    pub fn query(&self, region: &Aabb) -> Vec<T> {
        let mut hits = Vec::new();
        let Some(root) = self.root else {
            return hits;
        };

        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.aabb.overlaps(region) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf(id) => hits.push(id),
                NodeKind::Internal([left, right]) => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }

        hits.sort_unstable();
        hits
    }

    /// Check structural invariants: parent links, heights, and that every
    /// internal AABB contains both children.
    ///
    /// # Panics
    /// On the first violated invariant.
    pub fn validate(&self) {
        let Some(root) = self.root else {
            assert!(self.leaves.is_empty(), "empty tree still indexes leaves");
            return;
        };
        assert_eq!(self.nodes[root].parent, None, "root has a parent");

        let mut leaf_count = 0;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            match node.kind {
                NodeKind::Leaf(id) => {
                    assert_eq!(node.height, 0, "leaf {index} has non-zero height");
                    assert_eq!(self.leaves.get(&id), Some(&index), "leaf {index} not indexed");
                    leaf_count += 1;
                }
                NodeKind::Internal([left, right]) => {
                    let (l, r) = (&self.nodes[left], &self.nodes[right]);
                    assert_eq!(l.parent, Some(index), "bad parent link at {left}");
                    assert_eq!(r.parent, Some(index), "bad parent link at {right}");
                    assert_eq!(node.height, 1 + l.height.max(r.height), "stale height at {index}");
                    assert!(node.aabb.contains(&l.aabb), "node {index} does not contain {left}");
                    assert!(node.aabb.contains(&r.aabb), "node {index} does not contain {right}");
                    stack.push(left);
                    stack.push(right);
                }
            }
        }

        assert_eq!(leaf_count, self.leaves.len(), "leaf count mismatch");
        assert_eq!(self.nodes.len(), 2 * leaf_count - 1, "orphaned nodes");
    }

    fn handle_at(&self, leaf: usize) -> NodeHandle {
        NodeHandle {
            index: leaf,
            generation: self.nodes.generation(leaf).unwrap_or_default(),
        }
    }

    fn expect_leaf(&self, handle: NodeHandle) -> usize {
        let live = self.nodes.generation(handle.index) == Some(handle.generation)
            && self.nodes.get(handle.index).is_some_and(TreeNode::is_leaf);
        if !live {
            panic!("AabbTree: {handle:?} is not a live leaf");
        }
        handle.index
    }

    fn leaf_id(&self, leaf: usize) -> T {
        match self.nodes[leaf].kind {
            NodeKind::Leaf(id) => id,
            NodeKind::Internal(_) => unreachable!("node {leaf} is internal"),
        }
    }

    fn children(&self, index: usize) -> [usize; 2] {
        match self.nodes[index].kind {
            NodeKind::Internal(children) => children,
            NodeKind::Leaf(_) => unreachable!("node {index} is a leaf"),
        }
    }

    fn query_overlap(&self, a: usize, b: usize, pairs: &mut Vec<(T, T)>) {
        let (node_a, node_b) = (&self.nodes[a], &self.nodes[b]);
        if !node_a.aabb.overlaps(&node_b.aabb) {
            return;
        }

        match (node_a.kind, node_b.kind) {
            (NodeKind::Leaf(id_a), NodeKind::Leaf(id_b)) => {
                if id_a != id_b {
                    pairs.push((id_a.min(id_b), id_a.max(id_b)));
                }
            }
            (NodeKind::Leaf(_), NodeKind::Internal([b0, b1])) => {
                self.query_overlap(a, b0, pairs);
                self.query_overlap(a, b1, pairs);
            }
            (NodeKind::Internal([a0, a1]), NodeKind::Leaf(_)) => {
                self.query_overlap(a0, b, pairs);
                self.query_overlap(a1, b, pairs);
            }
            (NodeKind::Internal([a0, a1]), NodeKind::Internal([b0, b1])) => {
                self.query_overlap(a0, b0, pairs);
                self.query_overlap(a0, b1, pairs);
                self.query_overlap(a1, b0, pairs);
                self.query_overlap(a1, b1, pairs);
            }
        }
    }

    fn insert_leaf(&mut self, leaf: usize) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.nodes[leaf].parent = None;
            return;
        };

        let leaf_aabb = self.nodes[leaf].aabb;
        let sibling = self.find_best_sibling(root, &leaf_aabb);

        let old_parent = self.nodes[sibling].parent;
        let sibling_node = self.nodes[sibling];
        let new_parent = self.nodes.insert(TreeNode {
            aabb: leaf_aabb.merge(&sibling_node.aabb),
            parent: old_parent,
            height: sibling_node.height + 1,
            kind: NodeKind::Internal([sibling, leaf]),
        });

        match old_parent {
            Some(parent) => self.replace_child(parent, sibling, new_parent),
            None => self.root = Some(new_parent),
        }
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        self.refit_ancestors(Some(new_parent));
    }

    /// Perimeter-cost descent: stop where pairing with the current node is
    /// cheaper than pushing the leaf further down.
    fn find_best_sibling(&self, root: usize, leaf_aabb: &Aabb) -> usize {
        let mut index = root;
        while let NodeKind::Internal([child1, child2]) = self.nodes[index].kind {
            let node_aabb = self.nodes[index].aabb;
            let perimeter = node_aabb.perimeter();
            let combined_perimeter = node_aabb.merge(leaf_aabb).perimeter();

            let cost = 2.0 * combined_perimeter;
            let inheritance_cost = 2.0 * (combined_perimeter - perimeter);

            let cost1 = self.descend_cost(child1, leaf_aabb) + inheritance_cost;
            let cost2 = self.descend_cost(child2, leaf_aabb) + inheritance_cost;

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }
        index
    }

    fn descend_cost(&self, child: usize, leaf_aabb: &Aabb) -> f32 {
        let node = &self.nodes[child];
        let new_perimeter = node.aabb.merge(leaf_aabb).perimeter();
        if node.is_leaf() {
            new_perimeter
        } else {
            new_perimeter - node.aabb.perimeter()
        }
    }

    /// Detach a leaf, splicing its sibling into the parent's slot. The leaf
    /// node itself stays allocated.
    fn remove_leaf(&mut self, leaf: usize) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let Some(parent) = self.nodes[leaf].parent else {
            return;
        };
        let [first, second] = self.children(parent);
        let sibling = if first == leaf { second } else { first };
        let grand_parent = self.nodes[parent].parent;

        self.nodes.remove(parent);
        self.nodes[sibling].parent = grand_parent;
        self.nodes[leaf].parent = None;

        match grand_parent {
            Some(grand_parent) => {
                self.replace_child(grand_parent, parent, sibling);
                self.refit_ancestors(Some(grand_parent));
            }
            None => self.root = Some(sibling),
        }
    }

    fn replace_child(&mut self, parent: usize, old_child: usize, new_child: usize) {
        if let NodeKind::Internal(children) = &mut self.nodes[parent].kind {
            for child in children.iter_mut().filter(|child| **child == old_child) {
                *child = new_child;
            }
        }
    }

    fn refit_ancestors(&mut self, start: Option<usize>) {
        let mut current = start;
        while let Some(index) = current {
            let index = self.balance(index);
            self.refit(index);
            current = self.nodes[index].parent;
        }
    }

    fn refit(&mut self, index: usize) {
        let [left, right] = self.children(index);
        let (l, r) = (self.nodes[left], self.nodes[right]);
        let node = &mut self.nodes[index];
        node.aabb = l.aabb.merge(&r.aabb);
        node.height = 1 + l.height.max(r.height);
    }

    /// Rotate the taller child up when the children's heights differ by more
    /// than one. Returns the index now occupying this subtree's root.
    fn balance(&mut self, index: usize) -> usize {
        let node = self.nodes[index];
        let NodeKind::Internal([left, right]) = node.kind else {
            return index;
        };
        if node.height < 2 {
            return index;
        }

        let skew = self.nodes[right].height - self.nodes[left].height;
        if skew > 1 {
            self.rotate_up(index, 1)
        } else if skew < -1 {
            self.rotate_up(index, 0)
        } else {
            index
        }
    }

    /// Promote child `side` of `a` to take `a`'s place. The promoted node
    /// keeps its taller child and hands the shorter one to `a`.
    fn rotate_up(&mut self, a: usize, side: usize) -> usize {
        let pivot = self.children(a)[side];
        let [p0, p1] = self.children(pivot);
        let (tall, short) = if self.nodes[p0].height > self.nodes[p1].height {
            (p0, p1)
        } else {
            (p1, p0)
        };

        let a_parent = self.nodes[a].parent;
        self.nodes[pivot].kind = NodeKind::Internal([a, tall]);
        self.nodes[pivot].parent = a_parent;
        self.nodes[a].parent = Some(pivot);
        if let NodeKind::Internal(children) = &mut self.nodes[a].kind {
            children[side] = short;
        }
        self.nodes[short].parent = Some(a);

        match a_parent {
            Some(parent) => self.replace_child(parent, a, pivot),
            None => self.root = Some(pivot),
        }

        self.refit(a);
        self.refit(pivot);
        pivot
    }
}
