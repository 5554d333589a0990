//! Python block ordering.
//!
//! A python block that lives in a primary placeholder produces the text of
//! that tab stop, and may read other tab stops through `t[N]`. Blocks are
//! evaluated in declaration order, so a block may only read tab stops whose
//! own block has already run.

use std::collections::HashSet;

use log::debug;
use snippet_syntax::{CodeKind, Marker, NodeId, TabIndex};

use crate::snippet::Snippet;

impl Snippet {
    /// Python code blocks in document order.
    pub fn python_blocks(&self) -> Vec<NodeId> {
        self.tree
            .descendants(self.root())
            .into_iter()
            .filter(|id| {
                self.tree
                    .marker(*id)
                    .and_then(Marker::as_code_block)
                    .is_some_and(|block| block.kind == CodeKind::Python)
            })
            .collect()
    }

    /// The tab stop a code block writes to: its nearest enclosing placeholder,
    /// when that placeholder is a non-final primary.
    pub fn bound_index(&self, block: NodeId) -> Option<TabIndex> {
        let placeholder = self.tree.ancestors(block).into_iter().find_map(|id| {
            self.tree.placeholder(id)
        })?;
        (placeholder.primary && !placeholder.is_final()).then_some(placeholder.index)
    }

    /// Python blocks bound to a tab stop, in an order where every block only
    /// reads tab stops produced before it.
    ///
    /// Empty when a block reads a tab stop produced by a later block, which
    /// also covers cycles. Callers then skip python evaluation.
    pub fn ordered_python_blocks(&self) -> Vec<NodeId> {
        let bound: Vec<(NodeId, TabIndex)> = self
            .python_blocks()
            .into_iter()
            .filter_map(|id| Some((id, self.bound_index(id)?)))
            .collect();
        let produced: HashSet<TabIndex> = bound.iter().map(|(_, index)| *index).collect();

        let mut seen: HashSet<TabIndex> = HashSet::new();
        let mut ordered = Vec::with_capacity(bound.len());
        for (id, index) in bound {
            let related = self
                .tree
                .marker(id)
                .and_then(Marker::as_code_block)
                .map(|block| block.related())
                .unwrap_or_default();
            let forward = related.into_iter().map(TabIndex::new).find(|reference| {
                *reference != index && produced.contains(reference) && !seen.contains(reference)
            });
            if let Some(reference) = forward {
                debug!(
                    "Skipping python blocks: tab stop {index} reads t[{reference}] before it is produced"
                );
                return Vec::new();
            }
            seen.insert(index);
            ordered.push(id);
        }
        ordered
    }
}
