//! # Marker Tree
//!
//! The parsed snippet is an arena of [`Node`]s addressed by [`NodeId`]
//! handles. Each node owns an ordered list of child ids and keeps a
//! non-owning `parent` back-reference; the root is always a
//! [`Marker::Snippet`] node.
//!
//! ## Identity
//!
//! Every tree gets a process-unique id and every [`NodeId`] carries it, so a
//! handle from another tree (or from the tree a clone was taken from) is
//! recognized as foreign instead of silently aliasing a different node.
//! Moving content between trees always goes through [`MarkerTree::import`],
//! which deep-copies.
//!
//! ## Detached Nodes
//!
//! Nodes removed from the tree stay in the arena without a parent. They can
//! be re-attached with the mutators; queries that depend on position
//! ([`MarkerTree::offset`], [`MarkerTree::text_before`]) treat them as not
//! found.
//!
//! A detached subtree that is no longer needed is handed back with
//! [`MarkerTree::release`]. Its slots are reused by later allocations, and
//! each slot carries a generation so stale handles to a reused slot are
//! reported as foreign.
//!
//! ## Module Structure
//!
//! - [`marker`] - node payloads (`Placeholder`, `Variable`, `CodeBlock`, ...)
//! - `edit` - shape mutators and normalization
//! - `render` - rendered text, lengths and offsets
//! - `serialize` - canonical snippet source

mod edit;
pub mod marker;
mod render;
mod serialize;

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

use crate::dialect::Dialect;
pub use marker::{
    Choice, CodeBlock, CodeKind, Marker, MarkerKind, Placeholder, TabIndex, Variable,
};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

fn next_tree_id() -> u32 {
    NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a node of one specific [`MarkerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    tree: u32,
    index: u32,
    generation: u32,
}

/// Errors from structural tree operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0:?} does not belong to this tree")]
    Foreign(NodeId),

    #[error("node {0:?} is not attached to the tree")]
    Detached(NodeId),

    #[error("moving node {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("the root node cannot be moved or replaced")]
    Root,

    #[error("node {0:?} is still attached")]
    Attached(NodeId),
}

/// One arena slot.
#[derive(Debug, Clone)]
pub struct Node {
    marker: Marker,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
}

impl Node {
    fn new(marker: Marker) -> Self {
        Self {
            marker,
            parent: None,
            children: Vec::new(),
            generation: 0,
        }
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An arena-backed snippet tree.
#[derive(Debug)]
pub struct MarkerTree {
    id: u32,
    dialect: Dialect,
    nodes: Vec<Node>,
    free: Vec<u32>,
}

impl MarkerTree {
    /// An empty tree holding only the root.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            id: next_tree_id(),
            dialect,
            nodes: vec![Node::new(Marker::Snippet)],
            free: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            tree: self.id,
            index: 0,
            generation: 0,
        }
    }

    /// Whether `id` was allocated by this tree and has not been released.
    pub fn owns(&self, id: NodeId) -> bool {
        id.tree == self.id
            && self
                .nodes
                .get(id.index as usize)
                .is_some_and(|node| node.generation == id.generation)
    }

    /// Number of arena slots, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<(), TreeError> {
        if self.owns(id) {
            Ok(())
        } else {
            Err(TreeError::Foreign(id))
        }
    }

    fn slot(&self, id: NodeId) -> &Node {
        &self.nodes[id.index as usize]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index as usize]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.owns(id).then(|| self.slot(id))
    }

    pub fn marker(&self, id: NodeId) -> Option<&Marker> {
        self.node(id).map(Node::marker)
    }

    pub fn marker_mut(&mut self, id: NodeId) -> Option<&mut Marker> {
        if self.owns(id) {
            Some(&mut self.slot_mut(id).marker)
        } else {
            None
        }
    }

    pub fn kind(&self, id: NodeId) -> Option<MarkerKind> {
        self.marker(id).map(Marker::kind)
    }

    /// Children of `id`; empty for foreign ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.slot(parent).children.iter().position(|c| *c == id)
    }

    /// Ancestors of `id`, nearest first, ending with the root when attached.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.slot(parent).parent;
        }
        ancestors
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.owns(id) && (id == self.root() || self.ancestors(id).last() == Some(&self.root()))
    }

    /// `id` and all of its descendants in pre-order.
    pub fn walk(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.owns(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.slot(current).children.iter().rev());
        }
        out
    }

    /// Descendants of `id` in pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut nodes = self.walk(id);
        if !nodes.is_empty() {
            nodes.remove(0);
        }
        nodes
    }

    /// Placeholders under the root in document order.
    pub fn placeholders(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.kind(*id) == Some(MarkerKind::Placeholder))
            .collect()
    }

    pub fn placeholder(&self, id: NodeId) -> Option<&Placeholder> {
        self.marker(id).and_then(Marker::as_placeholder)
    }

    /// The choice attached to a placeholder, if any.
    pub fn choice(&self, placeholder: NodeId) -> Option<&Choice> {
        self.children(placeholder)
            .iter()
            .find_map(|child| self.slot(*child).marker.as_choice())
    }

    /// Allocate a detached node, reusing a released slot when there is one.
    ///
    /// # Panics
    ///
    /// Panics if the arena would exceed `u32::MAX` slots.
    pub fn alloc(&mut self, marker: Marker) -> NodeId {
        if let Some(index) = self.free.pop() {
            let node = &mut self.nodes[index as usize];
            node.marker = marker;
            return NodeId {
                tree: self.id,
                index,
                generation: node.generation,
            };
        }
        let Ok(index) = u32::try_from(self.nodes.len()) else {
            panic!("marker tree is limited to {} nodes", u32::MAX);
        };
        self.nodes.push(Node::new(marker));
        NodeId {
            tree: self.id,
            index,
            generation: 0,
        }
    }

    /// Free `id` and its whole subtree. `id` must be detached; every handle
    /// into the subtree becomes foreign.
    pub fn release(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check(id)?;
        if id == self.root() {
            return Err(TreeError::Root);
        }
        if self.slot(id).parent.is_some() {
            return Err(TreeError::Attached(id));
        }
        for node in self.walk(id) {
            let slot = self.slot_mut(node);
            slot.marker = Marker::Text(String::new());
            slot.parent = None;
            slot.children.clear();
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
        Ok(())
    }

    /// Allocate a detached text node.
    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Marker::Text(text.into()))
    }

    /// Allocate a detached, empty placeholder.
    pub fn new_placeholder(&mut self, index: impl Into<TabIndex>) -> NodeId {
        self.alloc(Marker::Placeholder(Placeholder::new(index)))
    }

    /// Deep-copy `node` from `other` into this tree, returning the detached
    /// copy.
    pub fn import(&mut self, other: &MarkerTree, node: NodeId) -> Result<NodeId, TreeError> {
        other.check(node)?;
        let copy = self.alloc(other.slot(node).marker.clone());
        let children = other.slot(node).children.clone();
        for child in children {
            let child_copy = self.import(other, child)?;
            self.slot_mut(child_copy).parent = Some(copy);
            self.slot_mut(copy).children.push(child_copy);
        }
        Ok(copy)
    }

    /// Deep-copy a node of this tree, returning the detached copy.
    pub fn duplicate(&mut self, node: NodeId) -> Result<NodeId, TreeError> {
        self.check(node)?;
        let marker = self.slot(node).marker.clone();
        let children = self.slot(node).children.clone();
        let copy = self.alloc(marker);
        for child in children {
            let child_copy = self.duplicate(child)?;
            self.slot_mut(child_copy).parent = Some(copy);
            self.slot_mut(copy).children.push(child_copy);
        }
        Ok(copy)
    }
}

impl Clone for MarkerTree {
    /// Deep copy under a fresh tree id; handles into the original are foreign
    /// to the clone. Node positions are preserved, so
    /// [`MarkerTree::counterpart`] maps a handle across.
    fn clone(&self) -> Self {
        let id = next_tree_id();
        let rebase = |node: NodeId| NodeId { tree: id, ..node };
        let nodes = self
            .nodes
            .iter()
            .map(|node| Node {
                marker: node.marker.clone(),
                parent: node.parent.map(rebase),
                children: node.children.iter().copied().map(rebase).collect(),
                generation: node.generation,
            })
            .collect();
        Self {
            id,
            dialect: self.dialect,
            nodes,
            free: self.free.clone(),
        }
    }
}

impl MarkerTree {
    /// The handle in this tree at the same arena position as `id` in the tree
    /// it was cloned from.
    pub fn counterpart(&self, id: NodeId) -> Option<NodeId> {
        let mapped = NodeId {
            tree: self.id,
            ..id
        };
        self.owns(mapped).then_some(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_with(markers: Vec<Marker>) -> (MarkerTree, Vec<NodeId>) {
        let mut tree = MarkerTree::new(Dialect::TextMate);
        let root = tree.root();
        let ids: Vec<NodeId> = markers.into_iter().map(|m| tree.alloc(m)).collect();
        tree.replace_children(root, ids.clone()).unwrap();
        (tree, ids)
    }

    #[test]
    fn new_tree_has_only_root() {
        let tree = MarkerTree::new(Dialect::TextMate);
        assert_eq!(tree.kind(tree.root()), Some(MarkerKind::Snippet));
        assert!(tree.children(tree.root()).is_empty());
        assert!(tree.is_attached(tree.root()));
    }

    #[test]
    fn ids_from_other_trees_are_foreign() {
        let (tree, ids) = tree_with(vec![Marker::text("a")]);
        let other = MarkerTree::new(Dialect::TextMate);
        assert!(!other.owns(ids[0]));
        assert_eq!(other.marker(ids[0]), None);
        assert!(tree.owns(ids[0]));
    }

    #[test]
    fn walk_is_pre_order() {
        let mut tree = MarkerTree::new(Dialect::TextMate);
        let root = tree.root();
        let p1 = tree.alloc(Marker::Placeholder(Placeholder::new(1)));
        let a = tree.alloc(Marker::text("a"));
        let b = tree.alloc(Marker::text("b"));
        tree.append_child(p1, a).unwrap();
        tree.append_child(root, p1).unwrap();
        tree.append_child(root, b).unwrap();
        assert_eq!(tree.walk(root), vec![root, p1, a, b]);
        assert_eq!(tree.descendants(root), vec![p1, a, b]);
        assert_eq!(tree.ancestors(a), vec![p1, root]);
    }

    #[test]
    fn clone_gets_new_identity() {
        let (tree, ids) = tree_with(vec![Marker::text("a"), Marker::text("b")]);
        let copy = tree.clone();
        assert!(!copy.owns(ids[0]));
        let mapped = copy.counterpart(ids[1]).unwrap();
        assert_eq!(copy.marker(mapped), Some(&Marker::text("b")));
        assert_eq!(copy.parent(mapped), Some(copy.root()));
    }

    #[test]
    fn import_deep_copies() {
        let mut source = MarkerTree::new(Dialect::TextMate);
        let root = source.root();
        let p = source.alloc(Marker::Placeholder(Placeholder::new(1)));
        let t = source.alloc(Marker::text("x"));
        source.append_child(p, t).unwrap();
        source.append_child(root, p).unwrap();

        let mut target = MarkerTree::new(Dialect::TextMate);
        let copy = target.import(&source, p).unwrap();
        assert_eq!(target.parent(copy), None);
        assert_eq!(target.children(copy).len(), 1);
        assert_eq!(target.render(copy), "x");
        // the source is untouched
        assert_eq!(source.parent(p), Some(root));
    }

    #[test]
    fn released_slots_are_reused_and_stale_ids_are_foreign() {
        let (mut tree, ids) = tree_with(vec![Marker::text("a")]);
        let p = tree.alloc(Marker::Placeholder(Placeholder::new(1)));
        let inner = tree.alloc(Marker::text("x"));
        tree.append_child(p, inner).unwrap();
        let capacity = tree.capacity();

        tree.release(p).unwrap();
        assert!(!tree.owns(p));
        assert!(!tree.owns(inner));
        assert_eq!(tree.marker(inner), None);

        let reused = [tree.new_text("b"), tree.new_text("c")];
        assert_eq!(tree.capacity(), capacity);
        assert!(!reused.contains(&p) && !reused.contains(&inner));
        assert_eq!(tree.release(p), Err(TreeError::Foreign(p)));
        assert_eq!(tree.release(ids[0]), Err(TreeError::Attached(ids[0])));
        assert_eq!(tree.release(tree.root()), Err(TreeError::Root));
    }

    #[test]
    fn clone_keeps_free_slots() {
        let (mut tree, _) = tree_with(vec![Marker::text("a")]);
        let loose = tree.new_text("b");
        tree.release(loose).unwrap();
        let mut copy = tree.clone();
        let capacity = copy.capacity();
        let fresh = copy.new_text("c");
        assert_eq!(copy.capacity(), capacity);
        assert_eq!(copy.render(fresh), "c");
    }
}
