//! Capture-group references inside a replacement template.

use std::fmt;

/// Case conversion named by `${n:/name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shorthand {
    Upcase,
    Downcase,
    Capitalize,
    PascalCase,
    CamelCase,
    /// A name this engine does not know; the value passes through unchanged.
    Unknown(String),
}

impl Shorthand {
    pub fn from_name(name: &str) -> Self {
        match name {
            "upcase" => Shorthand::Upcase,
            "downcase" => Shorthand::Downcase,
            "capitalize" => Shorthand::Capitalize,
            "pascalcase" => Shorthand::PascalCase,
            "camelcase" => Shorthand::CamelCase,
            other => Shorthand::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Shorthand::Upcase => "upcase",
            Shorthand::Downcase => "downcase",
            Shorthand::Capitalize => "capitalize",
            Shorthand::PascalCase => "pascalcase",
            Shorthand::CamelCase => "camelcase",
            Shorthand::Unknown(name) => name,
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Shorthand::Upcase => value.to_uppercase(),
            Shorthand::Downcase => value.to_lowercase(),
            Shorthand::Capitalize => capitalize(value),
            Shorthand::PascalCase => {
                let words = words(value);
                if words.is_empty() {
                    return value.to_string();
                }
                words.into_iter().map(capitalize).collect()
            }
            Shorthand::CamelCase => {
                let words = words(value);
                if words.is_empty() {
                    return value.to_string();
                }
                words
                    .into_iter()
                    .enumerate()
                    .map(|(i, word)| {
                        if i == 0 {
                            uncapitalize(word)
                        } else {
                            capitalize(word)
                        }
                    })
                    .collect()
            }
            Shorthand::Unknown(_) => value.to_string(),
        }
    }
}

/// Runs of ASCII letters and digits.
fn words(value: &str) -> Vec<&str> {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn uncapitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `$n`, `${n}`, `${n:/upcase}`, `${n:+if}`, `${n:-else}`, `${n:?if:else}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FormatString {
    pub index: usize,
    pub shorthand: Option<Shorthand>,
    pub if_value: Option<String>,
    pub else_value: Option<String>,
}

impl FormatString {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_shorthand(index: usize, shorthand: Shorthand) -> Self {
        Self {
            index,
            shorthand: Some(shorthand),
            ..Self::default()
        }
    }

    pub fn with_branches(index: usize, if_value: Option<String>, else_value: Option<String>) -> Self {
        Self {
            index,
            shorthand: None,
            if_value,
            else_value,
        }
    }

    /// Render this reference for the captured `value` (`None` when the group
    /// did not participate in the match).
    pub fn resolve(&self, value: Option<&str>) -> String {
        let value = value.unwrap_or("");
        if let Some(shorthand) = &self.shorthand {
            return shorthand.apply(value);
        }
        if !value.is_empty() {
            self.if_value.clone().unwrap_or_else(|| value.to_string())
        } else {
            self.else_value.clone().unwrap_or_default()
        }
    }
}

/// Escape text placed in an if/else branch of a format string.
fn escape_branch(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '$' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for FormatString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}", self.index)?;
        if let Some(shorthand) = &self.shorthand {
            write!(f, ":/{}", shorthand.name())?;
        } else {
            match (&self.if_value, &self.else_value) {
                (Some(if_value), Some(else_value)) => write!(
                    f,
                    ":?{}:{}",
                    escape_branch(if_value),
                    escape_branch(else_value)
                )?,
                (Some(if_value), None) => write!(f, ":+{}", escape_branch(if_value))?,
                (None, Some(else_value)) => write!(f, ":-{}", escape_branch(else_value))?,
                (None, None) => {}
            }
        }
        write!(f, "}}")
    }
}
