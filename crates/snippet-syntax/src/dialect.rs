//! Snippet dialects.

/// Which snippet grammar the parser accepts.
///
/// Both dialects share tab stops, placeholders, choices and transforms.
/// UltiSnips adds code blocks, conditional replacements and case-folding
/// escapes, and only treats `VISUAL` as a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    TextMate,
    UltiSnips,
}

impl Dialect {
    /// Select the dialect from an "is UltiSnips" flag.
    pub fn from_ultisnips(ultisnips: bool) -> Self {
        if ultisnips {
            Dialect::UltiSnips
        } else {
            Dialect::TextMate
        }
    }

    pub fn is_ultisnips(self) -> bool {
        self == Dialect::UltiSnips
    }

    /// Whether `name` parses as a variable reference in this dialect.
    pub fn accepts_variable(self, name: &str) -> bool {
        match self {
            Dialect::TextMate => true,
            Dialect::UltiSnips => name == "VISUAL",
        }
    }
}
