//! Sink for converting parser events into a [`MarkerTree`].

use crate::dialect::Dialect;
use crate::parser::event::Event;
use crate::tree::{Marker, MarkerTree, NodeId};

/// Converts parser events into a marker tree rooted at a Snippet node.
pub struct Sink {
    tree: MarkerTree,
    stack: Vec<NodeId>,
    events: Vec<Event>,
}

impl Sink {
    pub fn new(dialect: Dialect, events: Vec<Event>) -> Self {
        let tree = MarkerTree::new(dialect);
        let root = tree.root();
        Self {
            tree,
            stack: vec![root],
            events,
        }
    }

    /// Consume the sink and build the tree.
    pub fn finish(mut self) -> MarkerTree {
        for event in std::mem::take(&mut self.events) {
            match event {
                Event::Start { marker } => {
                    let id = self.tree.alloc(marker);
                    self.attach(id);
                    self.stack.push(id);
                }
                Event::Text(text) => self.text(text),
                Event::Finish => {
                    // the root is never popped
                    if self.stack.len() > 1 {
                        self.stack.pop();
                    }
                }
                Event::Placeholder => {}
            }
        }
        self.tree
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn attach(&mut self, id: NodeId) {
        let parent = self.current();
        if let Err(err) = self.tree.append_child(parent, id) {
            log::debug!("Dropped parsed node {id:?}: {err}");
        }
    }

    fn text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        let last = self.tree.children(parent).last().copied();
        if let Some(last) = last
            && let Some(Marker::Text(existing)) = self.tree.marker_mut(last)
        {
            existing.push_str(&text);
            return;
        }
        let id = self.tree.alloc(Marker::Text(text));
        self.attach(id);
    }
}
