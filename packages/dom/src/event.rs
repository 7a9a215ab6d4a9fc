//! Native-style events dispatched through the element tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use blocks_core::Value;

use crate::{Element, Selector};

/// Callback invoked for a dispatched event.
pub type DomHandler = Rc<dyn Fn(&DomEvent)>;

/// Handle for removing a single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ListenerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An event travelling from its target up to the top of the tree.
pub struct DomEvent {
    name: String,
    detail: Value,
    target: Element,
    current_target: RefCell<Option<Element>>,
    propagation_stopped: Cell<bool>,
}

impl DomEvent {
    pub(crate) fn new(name: &str, detail: Value, target: Element) -> Self {
        Self {
            name: name.to_string(),
            detail,
            target,
            current_target: RefCell::new(None),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data attached by whoever triggered the event.
    pub fn detail(&self) -> &Value {
        &self.detail
    }

    /// The element the event was triggered on.
    pub fn target(&self) -> &Element {
        &self.target
    }

    /// The element whose listener is running: the listening element for
    /// direct listeners, the matched element for delegated ones.
    pub fn current_target(&self) -> Option<Element> {
        self.current_target.borrow().clone()
    }

    pub(crate) fn set_current_target(&self, element: &Element) {
        *self.current_target.borrow_mut() = Some(element.clone());
    }

    /// Stop bubbling once the current element's listeners have run.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

impl std::fmt::Debug for DomEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomEvent")
            .field("name", &self.name)
            .field("detail", &self.detail)
            .field("target", &self.target)
            .finish()
    }
}

/// A listener registration on an element.
#[derive(Clone)]
pub struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) selector: Option<Selector>,
    pub(crate) namespace: Option<String>,
    pub(crate) handler: DomHandler,
}

impl Listener {
    pub fn new(event: impl Into<String>, handler: impl Fn(&DomEvent) + 'static) -> Self {
        Self {
            id: ListenerId::next(),
            event: event.into(),
            selector: None,
            namespace: None,
            handler: Rc::new(handler),
        }
    }

    /// Only fire for events whose origin matches `selector` below the
    /// listening element.
    #[must_use]
    pub fn delegate(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Tag the listener so a whole group can be removed at once.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("selector", &self.selector)
            .field("namespace", &self.namespace)
            .finish()
    }
}
