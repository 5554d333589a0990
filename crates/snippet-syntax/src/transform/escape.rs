//! Case-folding escapes: `\u \l \U \L \E \n \t`.
//!
//! Transform output is assembled as a list of [`Segment`]s so that text taken
//! from the matched input is never reinterpreted as a directive; only escapes
//! written in the replacement template itself act on the output.

/// A directive written as a backslash escape in UltiSnips replacement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseEscape {
    /// `\u` - uppercase the next character
    UpperNext,
    /// `\l` - lowercase the next character
    LowerNext,
    /// `\U` - uppercase everything until `\E`
    UpperAll,
    /// `\L` - lowercase everything until `\E`
    LowerAll,
    /// `\E` - end a `\U` or `\L` run
    End,
    /// `\n`
    Newline,
    /// `\t`
    Tab,
}

impl CaseEscape {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'u' => Some(CaseEscape::UpperNext),
            'l' => Some(CaseEscape::LowerNext),
            'U' => Some(CaseEscape::UpperAll),
            'L' => Some(CaseEscape::LowerAll),
            'E' => Some(CaseEscape::End),
            'n' => Some(CaseEscape::Newline),
            't' => Some(CaseEscape::Tab),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            CaseEscape::UpperNext => 'u',
            CaseEscape::LowerNext => 'l',
            CaseEscape::UpperAll => 'U',
            CaseEscape::LowerAll => 'L',
            CaseEscape::End => 'E',
            CaseEscape::Newline => 'n',
            CaseEscape::Tab => 't',
        }
    }
}

/// A piece of rendered transform output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    Escape(CaseEscape),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
}

fn push_cased(out: &mut String, c: char, case: Option<Case>) {
    match case {
        Some(Case::Upper) => out.extend(c.to_uppercase()),
        Some(Case::Lower) => out.extend(c.to_lowercase()),
        None => out.push(c),
    }
}

/// Apply the directives in `segments` to the text that follows them.
pub(crate) fn fold_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut next: Option<Case> = None;
    let mut mode: Option<Case> = None;

    for segment in segments {
        match segment {
            Segment::Escape(CaseEscape::UpperNext) => next = Some(Case::Upper),
            Segment::Escape(CaseEscape::LowerNext) => next = Some(Case::Lower),
            Segment::Escape(CaseEscape::UpperAll) => mode = Some(Case::Upper),
            Segment::Escape(CaseEscape::LowerAll) => mode = Some(Case::Lower),
            Segment::Escape(CaseEscape::End) => mode = None,
            Segment::Escape(CaseEscape::Newline) => out.push('\n'),
            Segment::Escape(CaseEscape::Tab) => out.push('\t'),
            Segment::Text(text) => {
                for c in text.chars() {
                    let case = next.take().or(mode);
                    push_cased(&mut out, c, case);
                }
            }
        }
    }

    out
}

/// Split `text` into literal runs and directives.
///
/// `\\` is kept as-is so that an escaped backslash never starts a directive;
/// any other unknown escape is left untouched as well.
fn segments_of(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            literal.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('\\') => {
                chars.next();
                literal.push_str("\\\\");
            }
            Some(next) => match CaseEscape::from_char(next) {
                Some(escape) => {
                    chars.next();
                    if !literal.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Escape(escape));
                }
                None => literal.push('\\'),
            },
            None => literal.push('\\'),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    segments
}

/// Interpret `\u \l \U \L \E \n \t` directives embedded in `text`.
///
/// ```
/// use snippet_syntax::apply_case_escapes;
///
/// assert_eq!(apply_case_escapes("b\\uabc\\LDef"), "bAbcdef");
/// assert_eq!(apply_case_escapes("b\\Uabc\\Edef"), "bABCdef");
/// ```
pub fn apply_case_escapes(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    fold_segments(&segments_of(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("b\\uabc\\LDef", "bAbcdef")]
    #[case("b\\lAbc\\LDef", "babcdef")]
    #[case("b\\Uabc\\Edef", "bABCdef")]
    #[case(" \\n \\t", " \n \t")]
    #[case("\\Ustraße", "STRASSE")]
    #[case("no escapes", "no escapes")]
    #[case("keep \\x and \\\\u", "keep \\x and \\\\u")]
    #[case("trailing \\", "trailing \\")]
    #[case("\\u", "")]
    fn case_escapes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(apply_case_escapes(input), expected);
    }

    #[test]
    fn next_char_overrides_mode() {
        let segments = vec![
            Segment::Escape(CaseEscape::UpperAll),
            Segment::Escape(CaseEscape::LowerNext),
            Segment::Text("abc".to_string()),
        ];
        assert_eq!(fold_segments(&segments), "aBC");
    }

    #[test]
    fn escapes_roundtrip_through_chars() {
        for c in ['u', 'l', 'U', 'L', 'E', 'n', 't'] {
            let escape = CaseEscape::from_char(c).unwrap();
            assert_eq!(escape.as_char(), c);
        }
        assert_eq!(CaseEscape::from_char('x'), None);
    }
}
