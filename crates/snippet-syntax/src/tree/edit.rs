//! Shape mutators.
//!
//! Every mutator validates all handles before touching the arena, so a
//! failed call leaves the tree unchanged. None of them propagate text to
//! mirrors; that is the runtime's job.

use super::{Marker, MarkerTree, NodeId, TreeError};

impl MarkerTree {
    /// Check that `child` may be placed under `parent`.
    fn check_move(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root() {
            return Err(TreeError::Root);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    /// Unlink `id` from its parent. The node and its subtree stay in the
    /// arena and may be re-attached.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check(id)?;
        if id == self.root() {
            return Err(TreeError::Root);
        }
        self.unlink(id);
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.slot_mut(id).parent.take() {
            self.slot_mut(parent).children.retain(|c| *c != id);
        }
    }

    /// Insert `child` at `index` among `parent`'s children, moving it from
    /// its current position if it is attached somewhere.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_move(parent, child)?;
        self.unlink(child);
        let children = &mut self.slot_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.slot_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    /// Replace all children of `parent` with `children`. The previous
    /// children are detached.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), TreeError> {
        self.check(parent)?;
        for child in &children {
            self.check_move(parent, *child)?;
        }
        let old = std::mem::take(&mut self.slot_mut(parent).children);
        for child in old {
            self.slot_mut(child).parent = None;
        }
        for child in &children {
            self.unlink(*child);
            self.slot_mut(*child).parent = Some(parent);
        }
        self.slot_mut(parent).children = children;
        Ok(())
    }

    /// Make `child` the only child of `parent`.
    pub fn set_only_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.replace_children(parent, vec![child])
    }

    /// Put `replacement` where `old` is; `old` becomes detached.
    pub fn replace_with(&mut self, old: NodeId, replacement: NodeId) -> Result<(), TreeError> {
        self.check(old)?;
        let parent = self.parent(old).ok_or(TreeError::Detached(old))?;
        self.check_move(parent, replacement)?;
        if self.is_ancestor_or_self(replacement, old) {
            return Err(TreeError::Cycle {
                parent,
                child: replacement,
            });
        }
        self.unlink(replacement);
        let position = self
            .index_in_parent(old)
            .ok_or(TreeError::Detached(old))?;
        self.slot_mut(parent).children[position] = replacement;
        self.slot_mut(replacement).parent = Some(parent);
        self.slot_mut(old).parent = None;
        Ok(())
    }

    /// Insert `text` directly before `node`, extending a preceding Text
    /// sibling when there is one.
    pub fn insert_before(&mut self, node: NodeId, text: &str) -> Result<(), TreeError> {
        self.check(node)?;
        let parent = self.parent(node).ok_or(TreeError::Detached(node))?;
        let position = self
            .index_in_parent(node)
            .ok_or(TreeError::Detached(node))?;
        if text.is_empty() {
            return Ok(());
        }
        if position > 0 {
            let previous = self.slot(parent).children[position - 1];
            if let Marker::Text(existing) = &mut self.slot_mut(previous).marker {
                existing.push_str(text);
                return Ok(());
            }
        }
        let id = self.alloc(Marker::text(text));
        self.insert_child(parent, position, id)
    }

    /// Merge adjacent Text children of `node` starting at child `from`, drop
    /// empty Text nodes, and do the same inside every descendant. Merged and
    /// dropped Text nodes are released.
    ///
    /// Sibling order is never changed, and running it twice is the same as
    /// running it once.
    pub fn normalize(&mut self, node: NodeId, from: usize) -> Result<(), TreeError> {
        self.check(node)?;
        let children = self.slot(node).children.clone();
        let from = from.min(children.len());
        let mut kept: Vec<NodeId> = children[..from].to_vec();

        for child in children[from..].iter().copied() {
            let text = match &self.slot(child).marker {
                Marker::Text(text) => Some(text.clone()),
                _ => None,
            };
            match text {
                Some(text) if text.is_empty() => {
                    self.slot_mut(child).parent = None;
                    self.release(child)?;
                }
                Some(text) => {
                    let merge_into = kept
                        .last()
                        .copied()
                        .filter(|last| kept.len() > from && self.slot(*last).marker.as_text().is_some());
                    match merge_into {
                        Some(last) => {
                            if let Marker::Text(existing) = &mut self.slot_mut(last).marker {
                                existing.push_str(&text);
                            }
                            self.slot_mut(child).parent = None;
                            self.release(child)?;
                        }
                        None => kept.push(child),
                    }
                }
                None => {
                    self.normalize(child, 0)?;
                    kept.push(child);
                }
            }
        }

        self.slot_mut(node).children = kept;
        Ok(())
    }
}
