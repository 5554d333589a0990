//! # snippet-syntax
//!
//! A resilient parser for TextMate and UltiSnips snippet bodies, built on
//! [Logos] and the event-based parser architecture of [rust-analyzer].
//!
//! [Logos]: https://docs.rs/logos
//! [rust-analyzer]: https://rust-analyzer.github.io/book/contributing/syntax.html
//!
//! ## Never Fails
//!
//! Snippet bodies are typed by hand and frequently half-finished. The parser
//! therefore never reports a syntax error: any construct that fails to match
//! (an unterminated `${1:`, an invalid regex, an unknown transform flag)
//! backtracks and becomes literal text, so the snippet can still be
//! inserted and edited.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Scanner → Tokens → Parser → Events → Sink → MarkerTree
//!               (Logos)          (Grammar)
//! ```
//!
//! ### 1. Scanner ([`lexer`] module)
//!
//! Breaks the source into single-character punctuation tokens, integers,
//! identifiers and runs of everything else. Every byte lands in a token.
//!
//! ### 2. Parser ([`parser`] module)
//!
//! Grammar rules consume tokens and emit **events**. Speculative parsing is
//! cheap: a checkpoint is a token position plus an event count.
//!
//! ### 3. Sink ([`parser::sink`] module)
//!
//! Replays the events into a [`MarkerTree`], an arena of nodes addressed by
//! [`NodeId`] with a [`Marker::Snippet`] root.
//!
//! ## Module Structure
//!
//! ```text
//! snippet-syntax/
//! ├── lib.rs           # This file - public API and snapshot tests
//! ├── dialect.rs       # TextMate / UltiSnips switch
//! ├── lexer.rs         # Logos-based scanner
//! ├── parser/
//! │   ├── mod.rs       # Parser struct, pending nodes, checkpoints
//! │   ├── event.rs     # Event enum (Start, Text, Finish, Placeholder)
//! │   ├── sink.rs      # Converts events to a MarkerTree
//! │   └── grammar/     # tab stops, transforms, code blocks
//! ├── transform/       # regex transforms, format strings, conditions
//! └── tree/            # arena, mutators, rendering, serialization
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use snippet_syntax::{Dialect, MarkerKind, parse};
//!
//! let tree = parse("Hello ${1:world}!", Dialect::TextMate);
//! assert_eq!(tree.render(tree.root()), "Hello world!");
//!
//! let placeholder = tree.children(tree.root())[1];
//! assert_eq!(tree.kind(placeholder), Some(MarkerKind::Placeholder));
//!
//! // canonical source parses back to the same tree
//! assert_eq!(tree.to_source(), "Hello ${1:world}!");
//! ```

pub mod dialect;
pub mod lexer;
pub mod parser;
pub mod transform;
pub mod tree;

pub use dialect::Dialect;
pub use lexer::{Scanner, Token, TokenKind};
pub use parser::{Parser, parse};
pub use transform::{
    CaseEscape, ConditionMarker, ConditionString, FormatString, Shorthand, TemplatePiece,
    Transform, TransformError, TransformFlags, apply_case_escapes,
};
pub use tree::{
    Choice, CodeBlock, CodeKind, Marker, MarkerKind, MarkerTree, Node, NodeId, Placeholder,
    TabIndex, TreeError, Variable,
};

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    /// Helper to format a marker tree for snapshot testing.
    fn format_tree(tree: &MarkerTree, id: NodeId, indent: usize) -> String {
        let mut result = String::new();
        let prefix = "  ".repeat(indent);
        let Some(marker) = tree.marker(id) else {
            return result;
        };

        let label = match marker {
            Marker::Snippet => "Snippet".to_string(),
            Marker::Text(text) => format!("Text {:?}", text),
            Marker::Placeholder(p) => {
                let mut label = format!("Placeholder {}", p.index);
                if p.primary {
                    label.push_str(" primary");
                }
                if let Some(t) = &p.transform {
                    label.push_str(&format!(" /{}", t.to_source(tree.dialect())));
                }
                label
            }
            Marker::Variable(v) => match &v.transform {
                Some(t) => format!("Variable {} /{}", v.name, t.to_source(tree.dialect())),
                None => format!("Variable {}", v.name),
            },
            Marker::Choice(c) => format!("Choice {:?}", c.options),
            Marker::CodeBlock(b) => format!("CodeBlock {:?} {:?}", b.kind, b.code),
        };
        result.push_str(&format!("{prefix}{label}\n"));

        for child in tree.children(id) {
            result.push_str(&format_tree(tree, *child, indent + 1));
        }
        result
    }

    fn dump(source: &str, dialect: Dialect) -> String {
        let tree = parse(source, dialect);
        format_tree(&tree, tree.root(), 0)
    }

    #[test]
    fn snapshot_nested_placeholders() {
        assert_snapshot!(dump("${1:foo ${2:bar $3}} $1", Dialect::TextMate), @r#"
        Snippet
          Placeholder 1
            Text "foo "
            Placeholder 2
              Text "bar "
              Placeholder 3
          Text " "
          Placeholder 1
        "#);
    }

    #[test]
    fn snapshot_variables_and_choice() {
        assert_snapshot!(dump("${TM_FILENAME/(.*)/${1:/upcase}/} ${2|a,b|}", Dialect::TextMate), @r#"
        Snippet
          Variable TM_FILENAME /(.*)/${1:/upcase}/
          Text " "
          Placeholder 2
            Choice ["a", "b"]
        "#);
    }

    #[test]
    fn snapshot_ultisnips_body() {
        let source = "def ${1:name}(${2:`!p snip.rv = t[1]`}):\n\t${VISUAL}$0";
        assert_snapshot!(dump(source, Dialect::UltiSnips), @r#"
        Snippet
          Text "def "
          Placeholder 1
            Text "name"
          Text "("
          Placeholder 2
            CodeBlock Python "snip.rv = t[1]"
          Text "):\n\t"
          Variable VISUAL
          Placeholder 0
        "#);
    }

    // === Error tolerance ===
    // Half-typed snippets must still produce a usable tree.

    #[test]
    fn snapshot_messy_unclosed_constructs() {
        let input = "${1:open ${2:inner} ${3|a, `!p py";
        assert_snapshot!(dump(input, Dialect::UltiSnips), @r#"
        Snippet
          Text "${1:open "
          Placeholder 2
            Text "inner"
          Text " ${3|a, `!p py"
        "#);
        let tree = parse(input, Dialect::UltiSnips);
        assert_eq!(tree.render(tree.root()), "${1:open inner ${3|a, `!p py");
    }

    #[test]
    fn stray_brace_closes_the_open_placeholder() {
        let input = "${1:open ${foo/(/x/} tail";
        assert_snapshot!(dump(input, Dialect::TextMate), @r#"
        Snippet
          Placeholder 1
            Text "open ${foo/(/x/"
          Text " tail"
        "#);
    }

    #[test]
    fn roundtrip_canonical_source() {
        let inputs = [
            "plain text",
            "$1 and ${2:two} and ${3|x,y|}",
            "${1:outer ${2:inner}}$0",
            "${foo:default} ${bar}",
            "${1/(\\w+)/${1:?yes:no}/g}",
            "\\$1 \\} \\\\",
            "${1}2",
        ];

        for input in inputs {
            let tree = parse(input, Dialect::TextMate);
            let canonical = tree.to_source();
            let reparsed = parse(&canonical, Dialect::TextMate);
            assert_eq!(
                format_tree(&reparsed, reparsed.root(), 0),
                format_tree(&tree, tree.root(), 0),
                "Roundtrip failed for: {:?}",
                input
            );
            assert_eq!(reparsed.to_source(), canonical);
        }
    }

    #[test]
    fn ultisnips_roundtrip_canonical_source() {
        let inputs = [
            "${1:foo} ${1/^(\\w)/\\u$1/}",
            "`!p snip.rv = t[1]` `!v g:x` `date`",
            "${1/(a)|(b)/(?1:one:two)/} \\`",
            "${VISUAL/x/y/}",
        ];

        for input in inputs {
            let tree = parse(input, Dialect::UltiSnips);
            let canonical = tree.to_source();
            let reparsed = parse(&canonical, Dialect::UltiSnips);
            assert_eq!(
                format_tree(&reparsed, reparsed.root(), 0),
                format_tree(&tree, tree.root(), 0),
                "Roundtrip failed for: {:?}",
                input
            );
        }
    }
}
