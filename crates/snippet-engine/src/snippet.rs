//! # Snippet
//!
//! A parsed [`MarkerTree`] plus the runtime rules layered on top of it:
//! every non-zero tab stop has exactly one primary placeholder, and every
//! other placeholder with that index mirrors the primary's text.
//!
//! The placeholder registry is not stored separately. It is read from the
//! tree in document order on demand, so structural edits can never leave it
//! stale.

use std::collections::BTreeMap;
use std::fmt;

use snippet_syntax::{
    CodeKind, Dialect, Marker, MarkerKind, MarkerTree, NodeId, Placeholder, TabIndex, TreeError,
};

use crate::error::SnippetError;

/// A snippet being expanded and edited.
#[derive(Debug, Clone)]
pub struct Snippet {
    pub(crate) tree: MarkerTree,
}

impl Snippet {
    /// Wrap a parsed tree: assign primaries and bring mirrors in sync.
    pub fn new(tree: MarkerTree) -> Self {
        let mut snippet = Self { tree };
        snippet.assign_primaries();
        snippet.sync_all_mirrors();
        snippet
    }

    pub fn tree(&self) -> &MarkerTree {
        &self.tree
    }

    /// Direct access to the tree for a session controller. Shape changes made
    /// through it bypass every runtime check; follow them with
    /// [`Snippet::on_placeholder_update`].
    pub fn tree_mut(&mut self) -> &mut MarkerTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> MarkerTree {
        self.tree
    }

    pub fn dialect(&self) -> Dialect {
        self.tree.dialect()
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// All placeholders in document order.
    pub fn placeholders(&self) -> Vec<NodeId> {
        self.tree.placeholders()
    }

    pub fn placeholder(&self, id: NodeId) -> Option<&Placeholder> {
        self.tree.placeholder(id)
    }

    /// Placeholders with the given index, in document order.
    pub fn placeholders_with_index(&self, index: TabIndex) -> Vec<NodeId> {
        self.placeholders()
            .into_iter()
            .filter(|id| self.tree.placeholder(*id).is_some_and(|p| p.index == index))
            .collect()
    }

    /// The primary placeholder of `index`.
    pub fn primary(&self, index: TabIndex) -> Option<NodeId> {
        self.placeholders_with_index(index)
            .into_iter()
            .find(|id| self.tree.placeholder(*id).is_some_and(|p| p.primary))
    }

    /// Primary placeholder of every index, in document order.
    pub fn primaries(&self) -> Vec<NodeId> {
        self.placeholders()
            .into_iter()
            .filter(|id| self.tree.placeholder(*id).is_some_and(|p| p.primary))
            .collect()
    }

    /// Current text of each tab stop, taken from its primary.
    pub fn values(&self) -> BTreeMap<TabIndex, String> {
        let mut values = BTreeMap::new();
        for id in self.primaries() {
            if let Some(p) = self.tree.placeholder(id) {
                values
                    .entry(p.index)
                    .or_insert_with(|| self.tree.render(id));
            }
        }
        values
    }

    /// Where the cursor goes first: the primary with the lowest non-zero
    /// index, else the first final tab stop. Primaries hidden inside a
    /// resolved variable are skipped.
    pub fn first(&self) -> Option<NodeId> {
        let primaries = self.primaries();
        let lowest = primaries
            .iter()
            .copied()
            .filter(|id| !self.tree.is_hidden(*id))
            .filter_map(|id| Some((self.tree.placeholder(id)?.index, id)))
            .filter(|(index, _)| !index.is_final())
            .min_by_key(|(index, _)| *index)
            .map(|(_, id)| id);
        lowest.or_else(|| {
            self.placeholders().into_iter().find(|id| {
                !self.tree.is_hidden(*id)
                    && self.tree.placeholder(*id).is_some_and(Placeholder::is_final)
            })
        })
    }

    fn any_code_block(&self, matches: impl Fn(CodeKind) -> bool) -> bool {
        self.tree.descendants(self.root()).into_iter().any(|id| {
            self.tree
                .marker(id)
                .and_then(Marker::as_code_block)
                .is_some_and(|block| matches(block.kind))
        })
    }

    pub fn has_code_block(&self) -> bool {
        self.any_code_block(|_| true)
    }

    pub fn has_python_block(&self) -> bool {
        self.any_code_block(|kind| kind == CodeKind::Python)
    }

    /// Canonical snippet source.
    pub fn to_source(&self) -> String {
        self.tree.to_source()
    }

    pub fn render(&self, id: NodeId) -> String {
        self.tree.render(id)
    }

    pub fn length(&self, id: NodeId) -> usize {
        self.tree.length(id)
    }

    pub fn subtree_length(&self, id: NodeId) -> usize {
        self.tree.subtree_length(id)
    }

    pub fn offset(&self, id: NodeId) -> Option<usize> {
        self.tree.offset(id)
    }

    pub fn enclosing_placeholders(&self, id: NodeId) -> Vec<NodeId> {
        self.tree.enclosing_placeholders(id)
    }

    pub fn text_before(&self, node: NodeId, boundary: Option<NodeId>) -> Option<String> {
        self.tree.text_before(node, boundary)
    }

    /// Allocate a detached text node to insert with the mutators.
    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        self.tree.new_text(text)
    }

    /// Allocate a detached placeholder to insert with the mutators.
    pub fn new_placeholder(&mut self, index: impl Into<TabIndex>) -> NodeId {
        self.tree.new_placeholder(index)
    }

    /// Deep-copy `node` of another tree into this one, detached.
    pub fn import(&mut self, other: &MarkerTree, node: NodeId) -> Result<NodeId, SnippetError> {
        Ok(self.tree.import(other, node)?)
    }

    /// Append a final tab stop unless the snippet already has one. Returns
    /// whether one was added.
    pub fn insert_final_tabstop(&mut self) -> bool {
        let has_final = self
            .placeholders()
            .into_iter()
            .any(|id| self.tree.placeholder(id).is_some_and(Placeholder::is_final));
        if has_final {
            return false;
        }
        let root = self.root();
        let id = self.tree.alloc(Marker::Placeholder(Placeholder {
            primary: true,
            ..Placeholder::new(TabIndex::FINAL)
        }));
        self.tree.append_child(root, id).is_ok()
    }

    /// Fail unless `id` is an attached placeholder of this snippet.
    pub(crate) fn expect_placeholder(&self, id: NodeId) -> Result<&Placeholder, SnippetError> {
        if !self.tree.owns(id) {
            return Err(TreeError::Foreign(id).into());
        }
        if !self.tree.is_attached(id) {
            return Err(TreeError::Detached(id).into());
        }
        match self.tree.kind(id) {
            Some(MarkerKind::Placeholder) => self
                .tree
                .placeholder(id)
                .ok_or(SnippetError::NotAPlaceholder(id)),
            _ => Err(SnippetError::NotAPlaceholder(id)),
        }
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree.render(self.root()))
    }
}
