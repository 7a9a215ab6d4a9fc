//! The element tree.
//!
//! `Element` is a shared handle: clones refer to the same node. Parents own
//! their children; the child→parent link is weak.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use blocks_core::Value;
use indexmap::IndexMap;

use crate::event::{DomEvent, Listener, ListenerId};
use crate::markup::{escape_attribute, escape_text, is_void_tag, MarkupElement};
use crate::{DomError, Markup, Selector};

/// A node in the tree: an element or a run of text.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

/// Shared handle to an element.
#[derive(Clone)]
pub struct Element(Rc<ElementNode>);

struct ElementNode {
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    children: RefCell<Vec<Node>>,
    parent: RefCell<Weak<ElementNode>>,
    listeners: RefCell<Vec<Listener>>,
    owner: RefCell<Option<Weak<dyn Any>>>,
}

impl Element {
    /// Create a detached, empty element.
    pub fn new(tag: &str) -> Self {
        Element(Rc::new(ElementNode {
            tag: tag.to_ascii_lowercase(),
            attributes: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            listeners: RefCell::new(Vec::new()),
            owner: RefCell::new(None),
        }))
    }

    /// Build a detached element from markup with exactly one root element.
    ///
    /// Whitespace-only text around the root is ignored.
    pub fn from_markup(markup: &Markup) -> Result<Self, DomError> {
        let mut roots = Vec::new();
        flatten(markup, &mut roots);

        let mut element = None;
        let mut found = 0;
        for node in roots {
            match node {
                Markup::Element(spec) => {
                    found += 1;
                    element = Some(spec);
                }
                Markup::Text(text) if text.trim().is_empty() => {}
                Markup::Text(text) => {
                    return Err(DomError::StrayText { text: text.clone() });
                }
                Markup::Fragment(_) => {}
            }
        }

        match (found, element) {
            (1, Some(root)) => Ok(build(root)),
            _ => Err(DomError::RootCount { found }),
        }
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ==================== attributes ====================

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.attributes.borrow().contains_key(name)
    }

    pub fn set_attribute(&self, name: &str, value: impl ToString) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow_mut().shift_remove(name)
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    pub fn set_id(&self, id: impl ToString) {
        self.set_attribute("id", id);
    }

    /// The raw class attribute, empty when absent.
    pub fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }

    /// Replace the whole class attribute.
    pub fn set_class_name(&self, class_name: &str) {
        self.set_attribute("class", class_name.trim());
    }

    pub fn classes(&self) -> Vec<String> {
        self.class_name()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_name().split_whitespace().any(|c| c == class)
    }

    pub fn add_class(&self, class: &str) {
        let mut classes = self.classes();
        for class in class.split_whitespace() {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
        self.set_class_name(&classes.join(" "));
    }

    pub fn remove_class(&self, class: &str) {
        let classes: Vec<String> = self.classes().into_iter().filter(|c| c != class).collect();
        self.set_class_name(&classes.join(" "));
    }

    // ==================== tree ====================

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.borrow().upgrade().map(Element)
    }

    /// Child elements, skipping text.
    pub fn children(&self) -> Vec<Element> {
        self.0
            .children
            .borrow()
            .iter()
            .filter_map(|node| match node {
                Node::Element(element) => Some(element.clone()),
                Node::Text(_) => None,
            })
            .collect()
    }

    pub fn child_nodes(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    /// Append a node, moving it out of its current parent first.
    pub fn append_child(&self, node: impl Into<Node>) {
        let node = node.into();
        if let Node::Element(element) = &node {
            element.detach();
            *element.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        }
        self.0.children.borrow_mut().push(node);
    }

    /// Remove this element from its parent. Returns whether it had one.
    pub fn detach(&self) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        parent
            .0
            .children
            .borrow_mut()
            .retain(|node| !matches!(node, Node::Element(e) if e.ptr_eq(self)));
        *self.0.parent.borrow_mut() = Weak::new();
        true
    }

    /// Put `replacement` where this element sits in its parent.
    ///
    /// A detached element has nowhere to put the replacement; the call
    /// does nothing and returns `false`.
    pub fn replace_with(&self, replacement: &Element) -> bool {
        if self.ptr_eq(replacement) {
            return self.parent().is_some();
        }
        let Some(parent) = self.parent() else {
            return false;
        };
        replacement.detach();

        let mut children = parent.0.children.borrow_mut();
        let position = children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.ptr_eq(self)));
        let Some(position) = position else {
            return false;
        };
        children[position] = Node::Element(replacement.clone());
        drop(children);

        *replacement.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
        *self.0.parent.borrow_mut() = Weak::new();
        true
    }

    /// Whether `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(element) = cursor {
            if element.ptr_eq(self) {
                return true;
            }
            cursor = element.parent();
        }
        false
    }

    /// All descendants in document order, excluding this element.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select_all(&selector))
    }

    pub fn query(&self, selector: &str) -> Result<Option<Element>, DomError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|element| selector.matches(element))
            .collect()
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(self)
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, selector: &Selector) -> Option<Element> {
        let mut cursor = Some(self.clone());
        while let Some(element) = cursor {
            if selector.matches(&element) {
                return Some(element);
            }
            cursor = element.parent();
        }
        None
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in self.0.children.borrow().iter() {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_html(self, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for node in self.0.children.borrow().iter() {
            match node {
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::Element(element) => write_html(element, &mut out),
            }
        }
        out
    }

    // ==================== owner ====================

    /// Associate this element with the object that rendered it.
    ///
    /// The link is weak; it never keeps the owner alive.
    pub fn set_owner<T: Any>(&self, owner: &Rc<T>) {
        let owner: Rc<dyn Any> = owner.clone();
        *self.0.owner.borrow_mut() = Some(Rc::downgrade(&owner));
    }

    pub fn owner<T: Any>(&self) -> Option<Rc<T>> {
        let owner = self.0.owner.borrow().as_ref()?.upgrade()?;
        owner.downcast::<T>().ok()
    }

    pub fn clear_owner(&self) {
        *self.0.owner.borrow_mut() = None;
    }

    // ==================== events ====================

    pub fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = listener.id;
        self.0.listeners.borrow_mut().push(listener);
        id
    }

    /// Listen for `event` on this element and everything below it.
    pub fn on(&self, event: &str, handler: impl Fn(&DomEvent) + 'static) -> ListenerId {
        self.add_listener(Listener::new(event, handler))
    }

    /// Listen for `event` originating from descendants matching `selector`.
    pub fn delegate(
        &self,
        event: &str,
        selector: &str,
        handler: impl Fn(&DomEvent) + 'static,
    ) -> Result<ListenerId, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.add_listener(Listener::new(event, handler).delegate(selector)))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Remove every listener tagged with `namespace`. Returns how many.
    pub fn off_namespace(&self, namespace: &str) -> usize {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.namespace.as_deref() != Some(namespace));
        before - listeners.len()
    }

    pub fn clear_listeners(&self) {
        self.0.listeners.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    pub fn namespace_count(&self, namespace: &str) -> usize {
        self.0
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.namespace.as_deref() == Some(namespace))
            .count()
    }

    /// Dispatch `name` on this element and bubble it to the top of the tree.
    pub fn trigger(&self, name: &str, detail: Value) -> DomEvent {
        let event = DomEvent::new(name, detail, self.clone());
        tracing::trace!(event = name, tag = self.tag(), "dispatching element event");

        let mut cursor = Some(self.clone());
        while let Some(element) = cursor {
            element.invoke_listeners(&event);
            if event.is_propagation_stopped() {
                break;
            }
            cursor = element.parent();
        }
        event
    }

    fn invoke_listeners(&self, event: &DomEvent) {
        // Handlers may add or remove listeners; iterate a snapshot and skip
        // entries removed along the way.
        let snapshot: Vec<Listener> = self
            .0
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event.name())
            .cloned()
            .collect();

        for listener in snapshot {
            if !self.0.listeners.borrow().iter().any(|l| l.id == listener.id) {
                continue;
            }
            match &listener.selector {
                None => {
                    event.set_current_target(self);
                    (listener.handler)(event);
                }
                Some(selector) => {
                    let mut cursor = Some(event.target().clone());
                    while let Some(candidate) = cursor {
                        if candidate.ptr_eq(self) {
                            break;
                        }
                        if selector.matches(&candidate) {
                            event.set_current_target(&candidate);
                            (listener.handler)(event);
                        }
                        cursor = candidate.parent();
                    }
                }
            }
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element(<{}", self.tag())?;
        for (name, value) in self.0.attributes.borrow().iter() {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">)")
    }
}

fn flatten<'a>(markup: &'a Markup, out: &mut Vec<&'a Markup>) {
    match markup {
        Markup::Fragment(items) => {
            for item in items {
                flatten(item, out);
            }
        }
        other => out.push(other),
    }
}

fn build(spec: &MarkupElement) -> Element {
    let element = Element::new(spec.tag());
    for (name, value) in spec.attributes() {
        element.set_attribute(name, value);
    }
    for child in spec.children() {
        append_markup(&element, child);
    }
    element
}

fn append_markup(parent: &Element, markup: &Markup) {
    match markup {
        Markup::Element(spec) => parent.append_child(build(spec)),
        Markup::Text(text) => parent.append_child(Node::Text(text.clone())),
        Markup::Fragment(items) => {
            for item in items {
                append_markup(parent, item);
            }
        }
    }
}

fn collect_descendants(element: &Element, out: &mut Vec<Element>) {
    for child in element.children() {
        out.push(child.clone());
        collect_descendants(&child, out);
    }
}

fn write_html(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.tag());
    for (name, value) in element.0.attributes.borrow().iter() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    out.push('>');
    let children = element.0.children.borrow();
    if is_void_tag(element.tag()) && children.is_empty() {
        return;
    }
    for node in children.iter() {
        match node {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(child) => write_html(child, out),
        }
    }
    out.push_str("</");
    out.push_str(element.tag());
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Element {
        Element::from_markup(
            &Markup::element("ul")
                .child(Markup::element("li").class("a").child("one"))
                .child(Markup::element("li").class("b").child("two"))
                .into(),
        )
        .unwrap()
    }

    #[test]
    fn builds_from_markup() {
        let element = list();
        assert_eq!(element.tag(), "ul");
        assert_eq!(element.children().len(), 2);
        assert_eq!(element.text_content(), "onetwo");
        assert_eq!(
            element.outer_html(),
            r#"<ul><li class="a">one</li><li class="b">two</li></ul>"#
        );
    }

    #[test]
    fn from_markup_ignores_surrounding_whitespace() {
        let markup = Markup::fragment(vec![
            Markup::text("\n  "),
            Markup::element("p").into(),
            Markup::text(" "),
        ]);
        assert_eq!(Element::from_markup(&markup).unwrap().tag(), "p");
    }

    #[test]
    fn from_markup_requires_one_root() {
        let two = Markup::fragment(vec![Markup::element("p"), Markup::element("p")]);
        assert_eq!(
            Element::from_markup(&two).unwrap_err(),
            DomError::RootCount { found: 2 }
        );
        assert_eq!(
            Element::from_markup(&Markup::empty()).unwrap_err(),
            DomError::RootCount { found: 0 }
        );
        assert!(matches!(
            Element::from_markup(&Markup::fragment(vec![
                Markup::element("p").into(),
                Markup::text("x")
            ])),
            Err(DomError::StrayText { .. })
        ));
    }

    #[test]
    fn replace_with_swaps_in_place() {
        let root = list();
        let first = root.children()[0].clone();
        let replacement = Element::new("section");

        assert!(first.replace_with(&replacement));
        assert_eq!(root.children()[0], replacement);
        assert_eq!(replacement.parent(), Some(root.clone()));
        assert_eq!(first.parent(), None);
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn replace_with_moves_replacement_out_of_old_parent() {
        let root = list();
        let other = Element::new("div");
        let moved = Element::new("em");
        other.append_child(moved.clone());

        root.children()[1].replace_with(&moved);
        assert!(other.children().is_empty());
        assert_eq!(root.children()[1], moved);
    }

    #[test]
    fn replace_with_on_detached_is_noop() {
        let lonely = Element::new("div");
        assert!(!lonely.replace_with(&Element::new("span")));
    }

    #[test]
    fn append_child_reparents() {
        let a = Element::new("div");
        let b = Element::new("div");
        let child = Element::new("span");
        a.append_child(child.clone());
        b.append_child(child.clone());
        assert!(a.children().is_empty());
        assert_eq!(child.parent(), Some(b.clone()));
        assert!(b.contains(&child));
        assert!(!a.contains(&child));
    }

    #[test]
    fn class_helpers() {
        let element = Element::new("div");
        element.add_class("btn btn_active");
        element.add_class("btn");
        assert_eq!(element.class_name(), "btn btn_active");
        assert!(element.has_class("btn_active"));
        element.remove_class("btn");
        assert_eq!(element.classes(), vec!["btn_active"]);
    }

    #[test]
    fn owner_is_weak() {
        let element = Element::new("div");
        let owner = Rc::new(String::from("block1"));
        element.set_owner(&owner);
        assert_eq!(element.owner::<String>().as_deref().map(String::as_str), Some("block1"));
        assert!(element.owner::<u32>().is_none());
        drop(owner);
        assert!(element.owner::<String>().is_none());
    }

    #[test]
    fn events_bubble_to_ancestors() {
        let root = list();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        root.on("ping", move |event| {
            log.borrow_mut().push(event.detail().clone());
        });

        root.children()[0].trigger("ping", Value::from(1));
        root.trigger("pong", Value::Null);
        assert_eq!(*seen.borrow(), vec![Value::from(1)]);
    }

    #[test]
    fn delegated_listeners_match_origin() {
        let root = list();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        root.delegate("click", ".b", move |event| {
            log.borrow_mut()
                .push(event.current_target().map(|e| e.class_name()));
        })
        .unwrap();

        root.children()[0].trigger("click", Value::Null);
        root.children()[1].trigger("click", Value::Null);
        root.trigger("click", Value::Null);
        assert_eq!(*seen.borrow(), vec![Some("b".to_string())]);
    }

    #[test]
    fn stop_propagation_halts_bubbling() {
        let root = list();
        let child = root.children()[0].clone();
        let hits = Rc::new(RefCell::new(0));
        child.on("x", |event| event.stop_propagation());
        let counter = hits.clone();
        root.on("x", move |_| *counter.borrow_mut() += 1);

        child.trigger("x", Value::Null);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn namespaces_are_removed_independently() {
        let element = Element::new("body");
        element.add_listener(Listener::new("click", |_| {}).namespace("block1"));
        element.add_listener(Listener::new("keyup", |_| {}).namespace("block1"));
        element.add_listener(Listener::new("click", |_| {}).namespace("block2"));

        assert_eq!(element.off_namespace("block1"), 2);
        assert_eq!(element.namespace_count("block2"), 1);
        assert_eq!(element.off_namespace("block1"), 0);
    }

    #[test]
    fn listener_removed_during_dispatch_does_not_fire() {
        let element = Element::new("div");
        let fired = Rc::new(RefCell::new(false));
        let second_id = Rc::new(RefCell::new(None));

        let target = element.clone();
        let id_slot = second_id.clone();
        element.on("go", move |_| {
            if let Some(id) = *id_slot.borrow() {
                target.off(id);
            }
        });
        let flag = fired.clone();
        let id = element.on("go", move |_| *flag.borrow_mut() = true);
        *second_id.borrow_mut() = Some(id);

        element.trigger("go", Value::Null);
        assert!(!*fired.borrow());
    }
}
