//! Rendered text and position queries.
//!
//! Lengths and offsets count Unicode scalar values.

use super::{Marker, MarkerKind, MarkerTree, NodeId};

impl MarkerTree {
    /// The text `id` and its subtree currently display.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        if self.owns(id) {
            self.render_into(id, &mut out);
        }
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        let node = self.slot(id);
        match &node.marker {
            Marker::Text(text) => out.push_str(text),
            Marker::Variable(variable) if variable.value.is_some() => {
                out.push_str(variable.value.as_deref().unwrap_or_default());
            }
            Marker::CodeBlock(block) => out.push_str(block.value.as_deref().unwrap_or_default()),
            Marker::Choice(choice) => out.push_str(choice.default_value()),
            Marker::Snippet | Marker::Placeholder(_) | Marker::Variable(_) => {
                for child in &node.children {
                    self.render_into(*child, out);
                }
            }
        }
    }

    /// Characters contributed by the node itself, not counting children.
    ///
    /// Text, resolved variables, choices and code blocks have their own text;
    /// every other node has length 0.
    pub fn length(&self, id: NodeId) -> usize {
        match self.marker(id) {
            Some(Marker::Text(text)) => text.chars().count(),
            Some(Marker::Variable(variable)) => variable
                .value
                .as_deref()
                .map_or(0, |value| value.chars().count()),
            Some(Marker::CodeBlock(block)) => block
                .value
                .as_deref()
                .map_or(0, |value| value.chars().count()),
            Some(Marker::Choice(choice)) => choice.default_value().chars().count(),
            _ => 0,
        }
    }

    /// Characters rendered by `id` and its subtree.
    pub fn subtree_length(&self, id: NodeId) -> usize {
        self.render(id).chars().count()
    }

    /// Whether `id` sits in the default of a resolved variable, which renders
    /// the value instead of its children.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.ancestors(id).into_iter().any(|ancestor| {
            matches!(self.marker(ancestor), Some(Marker::Variable(v)) if v.value.is_some())
        })
    }

    /// Character offset of `id` from the start of the rendered snippet;
    /// `None` for foreign, detached or hidden nodes.
    pub fn offset(&self, id: NodeId) -> Option<usize> {
        if !self.is_attached(id) || self.is_hidden(id) {
            return None;
        }
        let mut offset = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            for sibling in self.slot(parent).children.iter() {
                if *sibling == current {
                    break;
                }
                offset += self.subtree_length(*sibling);
            }
            current = parent;
        }
        Some(offset)
    }

    /// Rendered text preceding `node`, stopping at `boundary` (the root when
    /// `None`). `None` when `node` is foreign, detached or not inside
    /// `boundary`.
    pub fn text_before(&self, node: NodeId, boundary: Option<NodeId>) -> Option<String> {
        let boundary = boundary.unwrap_or_else(|| self.root());
        if !self.is_attached(node) || !self.is_ancestor_or_self(boundary, node) {
            return None;
        }
        let mut parts = Vec::new();
        let mut current = node;
        while current != boundary {
            let parent = self.parent(current)?;
            let mut level = String::new();
            for sibling in self.slot(parent).children.iter() {
                if *sibling == current {
                    break;
                }
                self.render_into(*sibling, &mut level);
            }
            parts.push(level);
            current = parent;
        }
        Some(parts.into_iter().rev().collect())
    }

    /// Placeholders strictly enclosing `id`, outermost first.
    pub fn enclosing_placeholders(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain: Vec<NodeId> = self
            .ancestors(id)
            .into_iter()
            .filter(|ancestor| self.kind(*ancestor) == Some(MarkerKind::Placeholder))
            .collect();
        chain.reverse();
        chain
    }
}
