//! Markup fragments produced by templates.
//!
//! Templates build a `Markup` tree instead of concatenating strings, so
//! placeholders and partials compose without re-parsing.

use std::fmt;

use indexmap::IndexMap;

/// Elements rendered without a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// A fragment of markup.
#[derive(Clone, Debug, PartialEq)]
pub enum Markup {
    Element(MarkupElement),
    Text(String),
    Fragment(Vec<Markup>),
}

/// An element under construction.
///
/// ```rust
/// use blocks_dom::Markup;
///
/// let markup: Markup = Markup::element("ul")
///     .class("list")
///     .child(Markup::element("li").child("one"))
///     .into();
/// assert_eq!(markup.to_html(), r#"<ul class="list"><li>one</li></ul>"#);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupElement {
    tag: String,
    attributes: IndexMap<String, String>,
    children: Vec<Markup>,
}

impl Markup {
    /// Start building an element.
    pub fn element(tag: impl Into<String>) -> MarkupElement {
        MarkupElement {
            tag: tag.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Markup {
        Markup::Text(text.into())
    }

    pub fn fragment(items: impl IntoIterator<Item = impl Into<Markup>>) -> Markup {
        Markup::Fragment(items.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Markup {
        Markup::Fragment(Vec::new())
    }

    /// Serialize to HTML text with escaping.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Markup::Element(element) => element.write_html(out),
            Markup::Text(text) => out.push_str(&escape_text(text)),
            Markup::Fragment(items) => {
                for item in items {
                    item.write_html(out);
                }
            }
        }
    }
}

impl MarkupElement {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[Markup] {
        &self.children
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(name.into(), value.to_string());
        self
    }

    #[must_use]
    pub fn id(self, id: impl ToString) -> Self {
        self.attr("id", id)
    }

    /// Append to the class attribute.
    #[must_use]
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref().trim();
        if class.is_empty() {
            return self;
        }
        let merged = match self.attributes.get("class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.attributes.insert("class".to_string(), merged);
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<Markup>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = impl Into<Markup>>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) && self.children.is_empty() {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

impl From<MarkupElement> for Markup {
    fn from(element: MarkupElement) -> Self {
        Markup::Element(element)
    }
}

impl From<&str> for Markup {
    fn from(text: &str) -> Self {
        Markup::Text(text.to_string())
    }
}

impl From<String> for Markup {
    fn from(text: String) -> Self {
        Markup::Text(text)
    }
}

impl From<Vec<Markup>> for Markup {
    fn from(items: Vec<Markup>) -> Self {
        Markup::Fragment(items)
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
