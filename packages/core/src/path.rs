//! Dotted paths into a block's state graph.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A path component contains a forbidden character.
    #[error("invalid path component '{component}' at position {position}: {message}")]
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },

    /// A numeric component lands too far past the end of an array.
    #[error("array index {index} is out of range for length {len}")]
    IndexOutOfRange { index: String, len: usize },
}

/// A validated dotted path.
///
/// Components are separated by `.`. Numeric components address array
/// elements; everything else addresses map keys. The empty path addresses
/// the root of the graph.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path {
            components: Vec::new(),
        }
    }

    /// Parse a dotted path string, validating components.
    ///
    /// # Path Syntax
    ///
    /// - Components are separated by `.`
    /// - Empty components are ignored (normalizes `..` and leading/trailing dots)
    /// - Components may not contain whitespace or `:`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blocks_core::Path;
    ///
    /// let path = Path::parse("models.user.name").unwrap();
    /// assert_eq!(path.len(), 3);
    ///
    /// assert_eq!(Path::parse("a..b.").unwrap(), Path::parse("a.b").unwrap());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let components: Vec<String> = s
            .split('.')
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();

        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }

        Ok(Path { components })
    }

    /// Try to create a path from components, validating each.
    pub fn try_from_components(components: Vec<String>) -> Result<Self, PathError> {
        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }
        Ok(Path { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        if component.is_empty() {
            return Err(PathError::InvalidComponent {
                component: component.to_string(),
                position,
                message: "empty component".to_string(),
            });
        }

        for c in component.chars() {
            if c == '.' || c == ':' || c.is_whitespace() {
                return Err(PathError::InvalidComponent {
                    component: component.to_string(),
                    position,
                    message: format!("invalid character {:?} in component", c),
                });
            }
        }

        Ok(())
    }

    /// Check if this path is empty (root path).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &String> {
        self.components.iter()
    }

    /// Last component, if any.
    pub fn last(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Extend this path by one key.
    ///
    /// The key is taken as-is; map keys found inside a state graph are
    /// always addressable even when they would not parse on their own.
    #[must_use]
    pub fn child(&self, key: &str) -> Path {
        let mut components = self.components.clone();
        components.push(key.to_string());
        Path { components }
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Path { components }
    }

    /// The path with its last component removed, `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_empty() {
            return None;
        }
        Some(self.slice(0, self.len() - 1))
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }

    /// Get a slice of components as a new path.
    pub fn slice(&self, start: usize, end: usize) -> Path {
        Path {
            components: self.components[start..end].to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Path::parse(s)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Path::parse(&s)
    }
}

impl TryFrom<&Path> for Path {
    type Error = PathError;

    fn try_from(p: &Path) -> Result<Self, Self::Error> {
        Ok(p.clone())
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use blocks_core::path;
///
/// let p = path!("collections.users");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
