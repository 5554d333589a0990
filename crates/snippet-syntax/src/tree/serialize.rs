//! Canonical snippet source.
//!
//! Each node is written as the grammar production that parses back into the
//! same node, escaping characters that would otherwise start a construct.

use super::{CodeKind, Marker, MarkerTree, NodeId};
use crate::dialect::Dialect;

/// Escape literal text so the given dialect parses it back unchanged.
pub(crate) fn escape_text(text: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let special = match c {
            '$' | '}' | '\\' => true,
            '`' => dialect.is_ultisnips(),
            _ => false,
        };
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_choice_option(option: &str) -> String {
    let mut out = String::with_capacity(option.len());
    for c in option.chars() {
        if matches!(c, '\\' | ',' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl MarkerTree {
    /// Canonical source of the whole tree.
    pub fn to_source(&self) -> String {
        self.source_of(self.root())
    }

    /// Canonical source of one node and its subtree.
    pub fn source_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        if self.owns(id) {
            self.write_node(id, false, &mut out);
        }
        out
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        let children = &self.slot(id).children;
        for (i, child) in children.iter().enumerate() {
            let digit_follows = children
                .get(i + 1)
                .and_then(|next| self.slot(*next).marker.as_text())
                .and_then(|text| text.chars().next())
                .is_some_and(|c| c.is_ascii_digit());
            self.write_node(*child, digit_follows, out);
        }
    }

    fn write_node(&self, id: NodeId, digit_follows: bool, out: &mut String) {
        let node = self.slot(id);
        match &node.marker {
            Marker::Snippet => self.write_children(id, out),
            Marker::Text(text) => out.push_str(&escape_text(text, self.dialect)),
            Marker::Placeholder(placeholder) => {
                let index = placeholder.index;
                if let Some(transform) = &placeholder.transform {
                    out.push_str(&format!("${{{index}/{}}}", transform.to_source(self.dialect)));
                } else if let Some(choice) = self.choice(id) {
                    let options: Vec<String> =
                        choice.options.iter().map(|o| escape_choice_option(o)).collect();
                    out.push_str(&format!("${{{index}|{}|}}", options.join(",")));
                } else if node.children.is_empty() {
                    if digit_follows {
                        out.push_str(&format!("${{{index}}}"));
                    } else {
                        out.push_str(&format!("${index}"));
                    }
                } else {
                    out.push_str(&format!("${{{index}:"));
                    self.write_children(id, out);
                    out.push('}');
                }
            }
            Marker::Variable(variable) => {
                let name = &variable.name;
                if let Some(transform) = &variable.transform {
                    out.push_str(&format!("${{{name}/{}}}", transform.to_source(self.dialect)));
                } else if node.children.is_empty() {
                    out.push_str(&format!("${{{name}}}"));
                } else {
                    out.push_str(&format!("${{{name}:"));
                    self.write_children(id, out);
                    out.push('}');
                }
            }
            Marker::Choice(choice) => {
                let options: Vec<String> =
                    choice.options.iter().map(|o| escape_choice_option(o)).collect();
                out.push_str(&format!("|{}|", options.join(",")));
            }
            Marker::CodeBlock(block) => {
                let prefix = match block.kind {
                    CodeKind::Shell => "",
                    CodeKind::Vim => "!v ",
                    CodeKind::Python => "!p ",
                };
                out.push_str(&format!("`{prefix}{}`", block.code));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Choice, CodeBlock, Placeholder, Variable};
    use pretty_assertions::assert_eq;

    #[test]
    fn text_escaping_per_dialect() {
        assert_eq!(escape_text("$foo}\\`", Dialect::TextMate), "\\$foo\\}\\\\`");
        assert_eq!(escape_text("$foo}\\`", Dialect::UltiSnips), "\\$foo\\}\\\\\\`");
    }

    #[test]
    fn tab_stop_before_digit_is_braced() {
        let mut tree = MarkerTree::new(Dialect::TextMate);
        let root = tree.root();
        let p = tree.alloc(Marker::Placeholder(Placeholder::new(1)));
        let t = tree.alloc(Marker::text("2"));
        let q = tree.alloc(Marker::Placeholder(Placeholder::new(0)));
        tree.replace_children(root, vec![p, t, q]).unwrap();
        assert_eq!(tree.to_source(), "${1}2$0");
    }

    #[test]
    fn choice_options_are_escaped() {
        let mut tree = MarkerTree::new(Dialect::TextMate);
        let root = tree.root();
        let p = tree.alloc(Marker::Placeholder(Placeholder::new(1)));
        let c = tree.alloc(Marker::Choice(Choice::new(vec![
            "a,b".to_string(),
            "c|d".to_string(),
            "e\\".to_string(),
        ])));
        tree.append_child(p, c).unwrap();
        tree.append_child(root, p).unwrap();
        assert_eq!(tree.to_source(), "${1|a\\,b,c\\|d,e\\\\|}");
    }

    #[test]
    fn variables_are_always_braced() {
        let mut tree = MarkerTree::new(Dialect::TextMate);
        let root = tree.root();
        let v = tree.alloc(Marker::Variable(Variable::new("var")));
        let w = tree.alloc(Marker::Variable(Variable::new("other")));
        let t = tree.alloc(Marker::text("x"));
        tree.append_child(w, t).unwrap();
        tree.replace_children(root, vec![v, w]).unwrap();
        assert_eq!(tree.to_source(), "${var}${other:x}");
    }

    #[test]
    fn code_blocks_keep_their_prefix() {
        let mut tree = MarkerTree::new(Dialect::UltiSnips);
        let root = tree.root();
        let blocks = vec![
            CodeBlock::new(CodeKind::Shell, "foo"),
            CodeBlock::new(CodeKind::Python, "snip.rv"),
            CodeBlock::new(CodeKind::Vim, "\"var\""),
        ];
        let ids: Vec<NodeId> = blocks
            .into_iter()
            .map(|b| tree.alloc(Marker::CodeBlock(b)))
            .collect();
        tree.replace_children(root, ids).unwrap();
        assert_eq!(tree.to_source(), "`foo``!p snip.rv``!v \"var\"`");
    }
}
