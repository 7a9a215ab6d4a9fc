//! Error types for the element layer.

use thiserror::Error;

/// Errors raised while building elements or parsing selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// Markup used to build an element must have exactly one root element.
    #[error("markup must contain exactly one root element, found {found}")]
    RootCount { found: usize },

    /// Non-whitespace text sits beside the root element.
    #[error("markup has text outside its root element: {text:?}")]
    StrayText { text: String },

    /// A selector could not be parsed.
    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}
