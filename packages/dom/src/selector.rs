//! A small selector engine for delegation and placeholder lookup.
//!
//! Supported syntax: selector groups separated by `,`, each a chain of
//! compound selectors joined by whitespace (descendant combinator). A
//! compound is any of `*`, a tag name, `#id`, `.class`, `[attr]` and
//! `[attr=value]` (value optionally quoted).

use std::fmt;

use crate::{DomError, Element};

/// A parsed selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Vec<Compound>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let error = |message: String| DomError::Selector {
            selector: source.to_string(),
            message,
        };

        let mut groups = Vec::new();
        for group in split_outside_brackets(source, |c| c == ',').map_err(error)? {
            let mut chain = Vec::new();
            for token in split_outside_brackets(&group, char::is_whitespace).map_err(error)? {
                chain.push(parse_compound(&token).map_err(error)?);
            }
            if chain.is_empty() {
                return Err(error("empty selector group".to_string()));
            }
            groups.push(chain);
        }
        if groups.is_empty() {
            return Err(error("empty selector".to_string()));
        }

        Ok(Selector {
            source: source.trim().to_string(),
            groups,
        })
    }

    /// Whether `element` matches any group of this selector.
    pub fn matches(&self, element: &Element) -> bool {
        self.groups.iter().any(|chain| chain_matches(chain, element))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

fn chain_matches(chain: &[Compound], element: &Element) -> bool {
    let Some((subject, ancestors)) = chain.split_last() else {
        return false;
    };
    if !subject.matches(element) {
        return false;
    }

    // Descendant-only chains can be matched greedily against the nearest
    // qualifying ancestor.
    let mut cursor = element.parent();
    for compound in ancestors.iter().rev() {
        loop {
            match cursor {
                Some(candidate) => {
                    cursor = candidate.parent();
                    if compound.matches(&candidate) {
                        break;
                    }
                }
                None => return false,
            }
        }
    }
    true
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id().as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|test| match &test.value {
            None => element.has_attribute(&test.name),
            Some(expected) => element.attribute(&test.name).as_deref() == Some(expected.as_str()),
        })
    }
}

fn split_outside_brackets(
    source: &str,
    is_separator: impl Fn(char) -> bool,
) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for c in source.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') if in_brackets => quote = Some(c),
            (None, '[') => in_brackets = true,
            (None, ']') => in_brackets = false,
            (None, c) if !in_brackets && is_separator(c) => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    if in_brackets || quote.is_some() {
        return Err("unterminated attribute selector".to_string());
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    Ok(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let chars: Vec<char> = token.chars().collect();
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && is_ident_char(chars[*i]) {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    if chars.first() == Some(&'*') {
        i = 1;
    } else if chars.first().copied().is_some_and(is_ident_char) {
        compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
    }

    while i < chars.len() {
        match chars[i] {
            '.' => {
                i += 1;
                let class = read_ident(&mut i);
                if class.is_empty() {
                    return Err(format!("missing class name in '{}'", token));
                }
                compound.classes.push(class);
            }
            '#' => {
                i += 1;
                let id = read_ident(&mut i);
                if id.is_empty() {
                    return Err(format!("missing id in '{}'", token));
                }
                compound.id = Some(id);
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|offset| i + offset)
                    .ok_or_else(|| "unterminated attribute selector".to_string())?;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attributes.push(parse_attribute(&inner)?);
                i = close + 1;
            }
            c @ ('>' | '+' | '~') => return Err(format!("unsupported combinator '{}'", c)),
            ':' => return Err("pseudo-classes are not supported".to_string()),
            c => return Err(format!("unexpected character '{}'", c)),
        }
    }

    Ok(compound)
}

fn parse_attribute(inner: &str) -> Result<AttributeTest, String> {
    let (name, value) = match inner.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (name.trim(), Some(unquoted.to_string()))
        }
        None => (inner.trim(), None),
    };

    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(format!("invalid attribute name '{}'", name));
    }
    Ok(AttributeTest {
        name: name.to_string(),
        value,
    })
}
