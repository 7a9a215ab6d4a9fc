//! The document: a body element plus the document-scoped handler table.

use blocks_core::Value;

use crate::event::{DomEvent, Listener, ListenerId};
use crate::{DomError, Element, Selector};

/// Owner of the top of the element tree.
///
/// Document-scoped handlers live on the body and see every event that
/// bubbles out of an attached element. Each handler carries a namespace so
/// a subscriber can drop all of its handlers in one call.
#[derive(Debug, Clone)]
pub struct Document {
    body: Element,
}

impl Document {
    pub fn new() -> Self {
        Self {
            body: Element::new("body"),
        }
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    /// Subscribe a namespaced handler, delegated when `selector` is given.
    pub fn on(
        &self,
        event: &str,
        namespace: &str,
        selector: Option<&str>,
        handler: impl Fn(&DomEvent) + 'static,
    ) -> Result<ListenerId, DomError> {
        let mut listener = Listener::new(event, handler).namespace(namespace);
        if let Some(selector) = selector {
            listener = listener.delegate(Selector::parse(selector)?);
        }
        Ok(self.body.add_listener(listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.body.off(id)
    }

    /// Drop every handler in `namespace`; other namespaces are untouched.
    pub fn off_namespace(&self, namespace: &str) -> usize {
        let removed = self.body.off_namespace(namespace);
        if removed > 0 {
            tracing::trace!(namespace, removed, "removed document handlers");
        }
        removed
    }

    pub fn handler_count(&self, namespace: &str) -> usize {
        self.body.namespace_count(namespace)
    }

    /// Whether `element` is attached somewhere below the body.
    pub fn contains(&self, element: &Element) -> bool {
        self.body.contains(element)
    }

    /// Dispatch an event on the document itself.
    pub fn trigger(&self, name: &str, detail: Value) -> DomEvent {
        self.body.trigger(name, detail)
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        self.body.query_all(selector)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
