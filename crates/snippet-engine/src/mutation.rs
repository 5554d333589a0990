//! Structural edits.
//!
//! [`Snippet::replace_subtree`] keeps the tab stop rules intact and
//! propagates mirrors. The thin mutators below it only reshape the tree;
//! call [`Snippet::on_placeholder_update`] afterwards when the edit touched
//! a primary.
//!
//! Children displaced by a replacing edit are released back to the arena,
//! so handles to them become foreign.

use std::collections::HashSet;

use log::debug;
use snippet_syntax::{NodeId, TabIndex, TreeError};

use crate::error::SnippetError;
use crate::snippet::Snippet;

impl Snippet {
    /// Replace the children of `marker` with `children`, which may be
    /// detached nodes or nodes moved from elsewhere in this snippet.
    ///
    /// Fails without touching the tree when a new placeholder reuses the
    /// index of `marker` or of a placeholder enclosing it, or when the edit
    /// would leave an index with two primaries.
    pub fn replace_subtree(
        &mut self,
        marker: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), SnippetError> {
        self.check_replace(marker, &children).inspect_err(|err| {
            debug!("Rejected replacing the children of {marker:?}: {err}");
        })?;
        self.replace_and_release(marker, children)?;
        self.assign_primaries();
        self.sync_all_mirrors();
        Ok(())
    }

    pub(crate) fn replace_and_release(
        &mut self,
        parent: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), SnippetError> {
        let old = self.tree.children(parent).to_vec();
        self.tree.replace_children(parent, children)?;
        for id in old {
            if self.tree.parent(id).is_some() {
                continue;
            }
            if let Err(err) = self.tree.release(id) {
                debug!("Failed to release displaced node {id:?}: {err}");
            }
        }
        Ok(())
    }

    fn check_replace(&self, marker: NodeId, children: &[NodeId]) -> Result<(), SnippetError> {
        if !self.tree.owns(marker) {
            return Err(TreeError::Foreign(marker).into());
        }
        if !self.tree.is_attached(marker) {
            return Err(TreeError::Detached(marker).into());
        }
        if let Some(foreign) = children.iter().find(|id| !self.tree.owns(**id)) {
            return Err(TreeError::Foreign(*foreign).into());
        }

        let incoming: Vec<NodeId> = children
            .iter()
            .flat_map(|child| self.tree.walk(*child))
            .filter(|id| self.tree.placeholder(*id).is_some())
            .collect();

        let mut enclosing: HashSet<TabIndex> = self
            .tree
            .enclosing_placeholders(marker)
            .into_iter()
            .filter_map(|id| self.tree.placeholder(id).map(|p| p.index))
            .collect();
        if let Some(p) = self.tree.placeholder(marker) {
            enclosing.insert(p.index);
        }

        let mut claimed: HashSet<TabIndex> = self
            .primaries()
            .into_iter()
            .filter(|id| {
                !incoming.contains(id)
                    && !(self.tree.is_ancestor_or_self(marker, *id) && *id != marker)
            })
            .filter_map(|id| self.tree.placeholder(id).map(|p| p.index))
            .collect();

        for id in incoming {
            let Some(placeholder) = self.tree.placeholder(id) else {
                continue;
            };
            let index = placeholder.index;
            if index.is_final() {
                continue;
            }
            if enclosing.contains(&index) {
                return Err(SnippetError::AncestorIndex { index });
            }
            if placeholder.primary && !claimed.insert(index) {
                return Err(SnippetError::DuplicatePrimary { index });
            }
        }
        Ok(())
    }

    /// Insert `text` right before `node`.
    pub fn insert_before(&mut self, node: NodeId, text: &str) -> Result<(), SnippetError> {
        Ok(self.tree.insert_before(node, text)?)
    }

    /// Make `child` the only child of `parent`.
    pub fn set_only_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SnippetError> {
        self.replace_and_release(parent, vec![child])
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SnippetError> {
        Ok(self.tree.append_child(parent, child)?)
    }

    pub fn replace_children(
        &mut self,
        parent: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), SnippetError> {
        self.replace_and_release(parent, children)
    }

    /// Merge adjacent text below `node` from child `from` on and drop empty
    /// text nodes.
    pub fn normalize(&mut self, node: NodeId, from: usize) -> Result<(), SnippetError> {
        Ok(self.tree.normalize(node, from)?)
    }
}
