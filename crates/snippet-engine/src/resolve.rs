//! Asynchronous variable resolution and code block evaluation.
//!
//! Capability calls are awaited one at a time in pre-order, and the tree is
//! only touched between calls, so a capability never observes a half-applied
//! change from a sibling.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use snippet_syntax::{CodeKind, Dialect, Marker, MarkerKind, NodeId, Placeholder, TabIndex, Variable};

use crate::capability::{CodeEvaluator, EvalContext, VariableResolver};
use crate::error::SnippetError;
use crate::snippet::Snippet;

/// Bookkeeping for variables that stay unresolved in a TextMate snippet.
struct Promotions {
    by_name: HashMap<String, TabIndex>,
    next: u32,
}

impl Promotions {
    fn new(snippet: &Snippet) -> Self {
        let highest = snippet
            .placeholders()
            .into_iter()
            .filter_map(|id| snippet.tree.placeholder(id))
            .map(|p| p.index.value().floor() as u32)
            .max()
            .unwrap_or(0);
        Self {
            by_name: HashMap::new(),
            next: highest + 1,
        }
    }

    fn index_for(&mut self, name: &str) -> TabIndex {
        if let Some(index) = self.by_name.get(name) {
            return *index;
        }
        let index = TabIndex::new(self.next);
        self.next += 1;
        self.by_name.insert(name.to_string(), index);
        index
    }
}

impl Snippet {
    fn variables(&self) -> Vec<NodeId> {
        self.tree
            .descendants(self.root())
            .into_iter()
            .filter(|id| self.tree.kind(*id) == Some(MarkerKind::Variable))
            .collect()
    }

    /// Resolve every variable through `resolver`.
    ///
    /// A resolved variable renders the (transformed) value and keeps its
    /// default for later re-resolution. An unresolved TextMate variable with
    /// a default becomes a new tab stop, one index per variable name, and
    /// one without a default shows its (transformed) name. An unresolved
    /// UltiSnips variable is replaced by its default, or shows its
    /// (transformed) name when it has none.
    pub async fn resolve_variables(&mut self, resolver: &dyn VariableResolver) {
        let mut resolved: Vec<NodeId> = Vec::new();
        let mut promotions = Promotions::new(self);

        for id in self.variables() {
            if !self.tree.is_attached(id)
                || resolved
                    .iter()
                    .any(|outer| self.tree.is_ancestor_or_self(*outer, id))
            {
                continue;
            }
            let Some(variable) = self.tree.marker(id).and_then(Marker::as_variable).cloned() else {
                continue;
            };

            trace!("Resolving variable {}", variable.name);
            let value = resolver.resolve(&variable.name).await.ok().flatten();
            match value {
                Some(value) => {
                    let value = match &variable.transform {
                        Some(transform) => transform.resolve(&value),
                        None => value,
                    };
                    if let Some(target) = self
                        .tree
                        .marker_mut(id)
                        .and_then(|marker| marker.as_variable_mut())
                    {
                        target.value = Some(value);
                    }
                    resolved.push(id);
                }
                None => self.leave_unresolved(id, variable, &mut promotions),
            }
        }

        self.assign_primaries();
        self.sync_all_mirrors();
    }

    fn leave_unresolved(&mut self, id: NodeId, variable: Variable, promotions: &mut Promotions) {
        let has_default = !self.tree.children(id).is_empty();
        let replacement = match self.dialect() {
            Dialect::UltiSnips if has_default => {
                self.splice_children(id);
                return;
            }
            Dialect::TextMate if has_default || promotions.by_name.contains_key(&variable.name) => {
                Marker::Placeholder(Placeholder {
                    transform: variable.transform,
                    ..Placeholder::new(promotions.index_for(&variable.name))
                })
            }
            Dialect::TextMate | Dialect::UltiSnips => Marker::Text(match &variable.transform {
                Some(transform) => transform.resolve(&variable.name),
                None => variable.name,
            }),
        };
        if let Some(marker) = self.tree.marker_mut(id) {
            *marker = replacement;
        }
    }

    /// Put the children of `id` where `id` is and release `id`.
    fn splice_children(&mut self, id: NodeId) {
        let (Some(parent), Some(position)) = (self.tree.parent(id), self.tree.index_in_parent(id))
        else {
            return;
        };
        let children = self.tree.children(id).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            if let Err(err) = self.tree.insert_child(parent, position + offset, child) {
                debug!("Failed to splice the default of {id:?}: {err}");
                return;
            }
        }
        let spliced = self
            .tree
            .detach(id)
            .and_then(|()| self.tree.release(id))
            .and_then(|()| self.tree.normalize(parent, 0));
        if let Err(err) = spliced {
            debug!("Failed to drop spliced variable {id:?}: {err}");
        }
    }

    fn code_blocks(&self) -> Vec<NodeId> {
        self.tree
            .descendants(self.root())
            .into_iter()
            .filter(|id| self.tree.kind(*id) == Some(MarkerKind::CodeBlock))
            .collect()
    }

    /// Run every code block through `evaluator`.
    ///
    /// Shell and vim blocks go first in document order, then python blocks
    /// bound to a tab stop in [`Snippet::ordered_python_blocks`] order, then
    /// the remaining python blocks. A failed evaluation renders empty.
    pub async fn evaluate_code_blocks(&mut self, evaluator: &dyn CodeEvaluator) {
        let (python, others): (Vec<NodeId>, Vec<NodeId>) =
            self.code_blocks().into_iter().partition(|id| {
                self.tree
                    .marker(*id)
                    .and_then(Marker::as_code_block)
                    .is_some_and(|block| block.kind == CodeKind::Python)
            });
        for id in others {
            self.evaluate_block(id, evaluator).await;
        }
        for id in self.ordered_python_blocks() {
            self.evaluate_block(id, evaluator).await;
        }
        for id in python {
            if self.bound_index(id).is_none() {
                self.evaluate_block(id, evaluator).await;
            }
        }
    }

    async fn evaluate_block(&mut self, id: NodeId, evaluator: &dyn CodeEvaluator) {
        if !self.tree.is_attached(id) {
            return;
        }
        let Some(block) = self.tree.marker(id).and_then(Marker::as_code_block).cloned() else {
            return;
        };
        let context = EvalContext {
            values: self.values(),
            index: self
                .tree
                .ancestors(id)
                .into_iter()
                .find_map(|ancestor| self.tree.placeholder(ancestor))
                .map(|p| p.index),
        };

        trace!("Evaluating {:?} block {:?}", block.kind, block.code);
        let value = evaluator
            .evaluate(&block, &context)
            .await
            .unwrap_or_default();
        if let Some(target) = self
            .tree
            .marker_mut(id)
            .and_then(|marker| marker.as_code_block_mut())
        {
            target.value = Some(value);
        }
        if self.bound_index(id).is_some() {
            self.sync_all_mirrors();
        }
    }

    /// Like [`Snippet::on_placeholder_update`], but first re-evaluates the
    /// python blocks that read the edited tab stop, directly or through
    /// another python block.
    pub async fn on_placeholder_update_with(
        &mut self,
        primary: NodeId,
        evaluator: &dyn CodeEvaluator,
    ) -> Result<(), SnippetError> {
        let placeholder = self.expect_placeholder(primary)?;
        if !placeholder.primary {
            return Err(SnippetError::NotPrimary(primary));
        }
        self.sync_all_mirrors();

        if let Some(edited) = self.tree.placeholder(primary).and_then(|p| p.index.whole()) {
            let mut changed: HashSet<u32> = HashSet::from([edited]);
            for id in self.ordered_python_blocks() {
                let reads_changed = self
                    .tree
                    .marker(id)
                    .and_then(Marker::as_code_block)
                    .is_some_and(|block| block.related().iter().any(|n| changed.contains(n)));
                if !reads_changed {
                    continue;
                }
                self.evaluate_block(id, evaluator).await;
                if let Some(index) = self.bound_index(id).and_then(TabIndex::whole) {
                    changed.insert(index);
                }
            }
        }

        self.sync_all_mirrors();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use snippet_syntax::{CodeBlock, parse};
    use std::collections::BTreeMap;

    fn snippet(source: &str, dialect: Dialect) -> Snippet {
        Snippet::new(parse(source, dialect))
    }

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct Failing;

    #[async_trait]
    impl VariableResolver for Failing {
        async fn resolve(&self, name: &str) -> Result<Option<String>> {
            bail!("no access to {name}")
        }
    }

    #[async_trait]
    impl CodeEvaluator for Failing {
        async fn evaluate(&self, block: &CodeBlock, _context: &EvalContext) -> Result<String> {
            bail!("cannot run {}", block.code)
        }
    }

    #[tokio::test]
    async fn resolved_variables_render_their_value() {
        let mut s = snippet("${1:${foo}x${foo:bar}} $1", Dialect::TextMate);
        s.resolve_variables(&vars(&[("foo", "f")])).await;
        assert_eq!(s.to_string(), "fxf fxf");
    }

    #[tokio::test]
    async fn tab_stops_in_a_resolved_default_are_not_navigated() {
        let mut s = snippet("${TM_X:${1:def}} $1 $0", Dialect::TextMate);
        s.resolve_variables(&vars(&[("TM_X", "val")])).await;
        assert_eq!(s.to_string(), "val def ");

        let hidden = s.primary(TabIndex::new(1)).unwrap();
        assert_eq!(s.offset(hidden), None);
        let first = s.first().unwrap();
        assert!(s.placeholder(first).unwrap().is_final());
        assert_eq!(s.offset(first), Some(8));
    }

    #[tokio::test]
    async fn unresolved_default_becomes_a_tab_stop() {
        let mut s = snippet("${1:a} ${name:bar} ${name} ${other}", Dialect::TextMate);
        s.resolve_variables(&vars(&[])).await;
        assert_eq!(s.to_string(), "a bar bar other");
        assert_eq!(s.to_source(), "${1:a} ${2:bar} ${2:bar} other");
        let primary = s.primary(TabIndex::new(2)).unwrap();
        assert_eq!(s.placeholders()[1], primary);
    }

    #[tokio::test]
    async fn unresolved_name_is_transformed() {
        let mut s = snippet("${myname/(.*)$/${1:/capitalize}/}", Dialect::TextMate);
        s.resolve_variables(&Failing).await;
        assert_eq!(s.to_string(), "Myname");
    }

    #[tokio::test]
    async fn visual_is_transformed_with_case_escapes() {
        let mut s = snippet("${VISUAL/\\w+\\s*/\\u$0\\\\x/} ${visual}", Dialect::UltiSnips);
        s.resolve_variables(&vars(&[("VISUAL", "visual")])).await;
        assert_eq!(s.to_string(), "Visual\\x ${visual}");
    }

    #[tokio::test]
    async fn unresolved_visual_is_replaced_by_its_default() {
        let mut s = snippet("<${VISUAL:${1:x}}> $1", Dialect::UltiSnips);
        s.resolve_variables(&vars(&[])).await;
        assert_eq!(s.to_string(), "<x> x");
        assert_eq!(s.to_source(), "<${1:x}> ${1:x}");
    }

    #[tokio::test]
    async fn unresolved_visual_without_default_shows_its_name() {
        let mut s = snippet("x ${VISUAL} y", Dialect::UltiSnips);
        s.resolve_variables(&HashMap::<String, String>::new()).await;
        assert_eq!(s.to_string(), "x VISUAL y");

        let mut s = snippet("${VISUAL/^(\\w)/\\l$1/}", Dialect::UltiSnips);
        s.resolve_variables(&Failing).await;
        assert_eq!(s.to_string(), "vISUAL");
    }

    #[tokio::test]
    async fn failed_code_renders_empty() {
        let mut s = snippet("a`date`b${1:`!p snip.rv = 1`} $1", Dialect::UltiSnips);
        s.evaluate_code_blocks(&Failing).await;
        assert_eq!(s.to_string(), "ab ");
        let values: Vec<Option<String>> = s
            .tree()
            .descendants(s.root())
            .into_iter()
            .filter_map(|id| s.tree().marker(id)?.as_code_block())
            .map(|block| block.value.clone())
            .collect();
        assert_eq!(values, vec![Some(String::new()), Some(String::new())]);
    }
}
