//! Node kinds stored in a [`MarkerTree`](super::MarkerTree).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::Regex;

use crate::transform::Transform;

/// Tab-stop order of a placeholder.
///
/// Parsed indexes are whole numbers; a session controller may assign
/// fractional ones to order stops inserted between existing ones. `0` is the
/// final cursor position.
#[derive(Debug, Clone, Copy)]
pub struct TabIndex(f64);

impl TabIndex {
    pub const FINAL: TabIndex = TabIndex(0.0);

    pub fn new(index: u32) -> Self {
        TabIndex(f64::from(index))
    }

    /// A possibly fractional index; `None` for negative or non-finite values.
    pub fn fractional(value: f64) -> Option<Self> {
        // `+ 0.0` turns -0.0 into 0.0 so equality and hashing agree
        (value.is_finite() && value >= 0.0).then_some(TabIndex(value + 0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_final(self) -> bool {
        self.0 == 0.0
    }

    /// The index as an integer when it has no fractional part.
    pub fn whole(self) -> Option<u32> {
        (self.0.fract() == 0.0 && self.0 <= f64::from(u32::MAX)).then_some(self.0 as u32)
    }
}

impl From<u32> for TabIndex {
    fn from(index: u32) -> Self {
        TabIndex::new(index)
    }
}

impl PartialEq for TabIndex {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for TabIndex {}

impl PartialEq<u32> for TabIndex {
    fn eq(&self, other: &u32) -> bool {
        *self == TabIndex::new(*other)
    }
}

impl Hash for TabIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for TabIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TabIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for TabIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.whole() {
            Some(index) => write!(f, "{index}"),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A tab stop: `$1`, `${1:default}`, `${1|a,b|}`, `${1/re/fmt/}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub index: TabIndex,
    /// Canonical occurrence among same-index placeholders
    pub primary: bool,
    pub transform: Option<Transform>,
}

impl Placeholder {
    pub fn new(index: impl Into<TabIndex>) -> Self {
        Self {
            index: index.into(),
            primary: false,
            transform: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.index.is_final()
    }
}

/// `$name`, `${name:default}`, `${name/re/fmt/}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub transform: Option<Transform>,
    /// Rendered value once resolved (already transformed)
    pub value: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: None,
            value: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

/// `${1|one,two|}` options; the first is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub options: Vec<String>,
}

impl Choice {
    pub fn new(options: Vec<String>) -> Self {
        Self { options }
    }

    pub fn default_value(&self) -> &str {
        self.options.first().map(String::as_str).unwrap_or("")
    }
}

/// Interpreter a code block is evaluated by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    /// `` `code` ``
    Shell,
    /// `` `!v code` ``
    Vim,
    /// `` `!p code` ``
    Python,
}

/// Embedded UltiSnips code whose output becomes snippet text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub kind: CodeKind,
    pub code: String,
    /// Cached evaluator output
    pub value: Option<String>,
}

impl CodeBlock {
    pub fn new(kind: CodeKind, code: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            value: None,
        }
    }

    /// Tab stops a python block reads through `t[N]`, sorted and unique.
    pub fn related(&self) -> Vec<u32> {
        if self.kind != CodeKind::Python {
            return Vec::new();
        }
        static TABSTOP_REF: OnceLock<Regex> = OnceLock::new();
        let re = TABSTOP_REF
            .get_or_init(|| Regex::new(r"\bt\[(\d+)\]").expect("Invalid tab stop regex"));
        re.captures_iter(&self.code)
            .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Discriminant of a [`Marker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Snippet,
    Text,
    Placeholder,
    Variable,
    Choice,
    CodeBlock,
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// The root container
    Snippet,
    Text(String),
    Placeholder(Placeholder),
    Variable(Variable),
    Choice(Choice),
    CodeBlock(CodeBlock),
}

impl Marker {
    pub fn text(value: impl Into<String>) -> Self {
        Marker::Text(value.into())
    }

    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::Snippet => MarkerKind::Snippet,
            Marker::Text(_) => MarkerKind::Text,
            Marker::Placeholder(_) => MarkerKind::Placeholder,
            Marker::Variable(_) => MarkerKind::Variable,
            Marker::Choice(_) => MarkerKind::Choice,
            Marker::CodeBlock(_) => MarkerKind::CodeBlock,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Marker::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<&Placeholder> {
        match self {
            Marker::Placeholder(placeholder) => Some(placeholder),
            _ => None,
        }
    }

    pub fn as_placeholder_mut(&mut self) -> Option<&mut Placeholder> {
        match self {
            Marker::Placeholder(placeholder) => Some(placeholder),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Marker::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut Variable> {
        match self {
            Marker::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&Choice> {
        match self {
            Marker::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    pub fn as_code_block(&self) -> Option<&CodeBlock> {
        match self {
            Marker::CodeBlock(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_code_block_mut(&mut self) -> Option<&mut CodeBlock> {
        match self {
            Marker::CodeBlock(block) => Some(block),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tab_index_orders_fractions_between_wholes() {
        let mut indexes = vec![
            TabIndex::new(2),
            TabIndex::fractional(1.5).unwrap(),
            TabIndex::FINAL,
            TabIndex::new(1),
        ];
        indexes.sort();
        let rendered: Vec<String> = indexes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["0", "1", "1.5", "2"]);
    }

    #[test]
    fn tab_index_rejects_invalid_fractions() {
        assert_eq!(TabIndex::fractional(-1.0), None);
        assert_eq!(TabIndex::fractional(f64::NAN), None);
        assert_eq!(TabIndex::fractional(-0.0), Some(TabIndex::FINAL));
        assert_eq!(TabIndex::fractional(2.0), Some(TabIndex::new(2)));
    }

    #[test]
    fn related_tab_stops_are_sorted_and_unique() {
        let block = CodeBlock::new(CodeKind::Python, "snip.rv = t[2] + t[1] + t[2] + st[9]");
        assert_eq!(block.related(), vec![1, 2]);
        let shell = CodeBlock::new(CodeKind::Shell, "echo t[1]");
        assert!(shell.related().is_empty());
    }

    #[test]
    fn choice_default_is_first_option() {
        let choice = Choice::new(vec!["one".to_string(), "two".to_string()]);
        assert_eq!(choice.default_value(), "one");
        assert_eq!(Choice::new(vec![]).default_value(), "");
    }
}
