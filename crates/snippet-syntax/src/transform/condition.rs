//! UltiSnips conditional replacements: `(?N:if:else)`.

use std::fmt;

use super::escape::{Segment, fold_segments};
use super::{TemplatePiece, escape_template_text, render_pieces, write_pieces};
use crate::dialect::Dialect;

fn group_matched(groups: &[Option<&str>], index: usize) -> bool {
    groups
        .get(index)
        .copied()
        .flatten()
        .is_some_and(|value| !value.is_empty())
}

/// A condition whose branches are plain text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionString {
    pub index: usize,
    pub if_text: String,
    pub else_text: String,
}

impl ConditionString {
    pub fn new(index: usize, if_text: impl Into<String>, else_text: impl Into<String>) -> Self {
        Self {
            index,
            if_text: if_text.into(),
            else_text: else_text.into(),
        }
    }

    /// Pick the branch by whether capture group `index` matched non-empty.
    pub fn resolve(&self, groups: &[Option<&str>]) -> String {
        if group_matched(groups, self.index) {
            self.if_text.clone()
        } else {
            self.else_text.clone()
        }
    }
}

impl fmt::Display for ConditionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(?{}:{}",
            self.index,
            escape_template_text(&self.if_text, Dialect::UltiSnips)
        )?;
        if !self.else_text.is_empty() {
            write!(
                f,
                ":{}",
                escape_template_text(&self.else_text, Dialect::UltiSnips)
            )?;
        }
        write!(f, ")")
    }
}

/// A condition whose branches reference other capture groups, escapes or
/// nested conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionMarker {
    pub index: usize,
    pub if_branch: Vec<TemplatePiece>,
    pub else_branch: Vec<TemplatePiece>,
}

impl ConditionMarker {
    pub fn new(index: usize, if_branch: Vec<TemplatePiece>, else_branch: Vec<TemplatePiece>) -> Self {
        Self {
            index,
            if_branch,
            else_branch,
        }
    }

    pub(crate) fn render(&self, groups: &[Option<&str>], out: &mut Vec<Segment>) {
        let branch = if group_matched(groups, self.index) {
            &self.if_branch
        } else {
            &self.else_branch
        };
        render_pieces(branch, groups, out);
    }

    /// Render the chosen branch on its own, applying its case escapes.
    pub fn resolve(&self, groups: &[Option<&str>]) -> String {
        let mut segments = Vec::new();
        self.render(groups, &mut segments);
        fold_segments(&segments)
    }
}

impl fmt::Display for ConditionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(?{}:", self.index)?;
        write_pieces(f, &self.if_branch, Dialect::UltiSnips)?;
        if !self.else_branch.is_empty() {
            write!(f, ":")?;
            write_pieces(f, &self.else_branch, Dialect::UltiSnips)?;
        }
        write!(f, ")")
    }
}
