//! Named-signal emitter and the listener-side subscription ledger.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use blocks_core::Value;
use blocks_dom::{DomEvent, Element};

/// Handlers registered under this name receive every signal.
pub const ALL: &str = "all";

/// A signal delivered to handlers.
///
/// Signals raised by an emitter carry only a name and data. Signals built
/// from element events also carry the origin and the matched element.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    pub name: String,
    pub data: Value,
    pub target: Option<Element>,
    pub current_target: Option<Element>,
}

impl Signal {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            target: None,
            current_target: None,
        }
    }

    pub(crate) fn from_dom(event: &DomEvent) -> Self {
        Self {
            name: event.name().to_string(),
            data: event.detail().clone(),
            target: Some(event.target().clone()),
            current_target: event.current_target(),
        }
    }
}

/// Callback invoked for a signal.
pub type Handler = Rc<dyn Fn(&Signal)>;

/// Handle for removing one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    event: String,
    handler: Handler,
}

#[derive(Default)]
struct EmitterInner {
    next_id: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Shared signal emitter.
///
/// Clones share one subscription table. Blocks own one each; models and
/// collections placed in block state are plain emitters.
#[derive(Clone, Default)]
pub struct Emitter(Rc<EmitterInner>);

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: &str, handler: impl Fn(&Signal) + 'static) -> SubscriptionId {
        self.on_handler(event, Rc::new(handler))
    }

    pub fn on_handler(&self, event: &str, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.0.next_id.get());
        self.0.next_id.set(id.0 + 1);
        self.0.subscriptions.borrow_mut().push(Subscription {
            id,
            event: event.to_string(),
            handler,
        });
        id
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.0.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Remove every subscription for `event`. Returns how many.
    pub fn off_event(&self, event: &str) -> usize {
        let mut subscriptions = self.0.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.event != event);
        before - subscriptions.len()
    }

    pub fn clear(&self) {
        self.0.subscriptions.borrow_mut().clear();
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.0
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.event == event)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.subscriptions.borrow().is_empty()
    }

    /// Deliver `name` to its handlers, then to `"all"` handlers.
    pub fn trigger(&self, name: &str, data: Value) {
        self.emit(&Signal::new(name, data));
    }

    pub fn emit(&self, signal: &Signal) {
        let snapshot: Vec<(SubscriptionId, Handler)> = {
            let subscriptions = self.0.subscriptions.borrow();
            let named = subscriptions.iter().filter(|s| s.event == signal.name);
            let all = subscriptions
                .iter()
                .filter(|s| s.event == ALL && signal.name != ALL);
            named
                .chain(all)
                .map(|s| (s.id, s.handler.clone()))
                .collect()
        };

        for (id, handler) in snapshot {
            // Skip handlers unsubscribed by an earlier handler in this pass.
            if self.0.subscriptions.borrow().iter().any(|s| s.id == id) {
                handler(signal);
            }
        }
    }

    pub fn ptr_eq(&self, other: &Emitter) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Emitter {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscriptions", &self.0.subscriptions.borrow().len())
            .finish()
    }
}

/// Subscriptions one party made on other emitters.
///
/// `stop_listening` releases all of them at once.
#[derive(Default)]
pub struct Listening {
    entries: RefCell<Vec<(Emitter, SubscriptionId)>>,
}

impl Listening {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen_to(&self, target: &Emitter, event: &str, handler: Handler) -> SubscriptionId {
        let id = target.on_handler(event, handler);
        self.entries.borrow_mut().push((target.clone(), id));
        id
    }

    pub fn stop_listening(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        for (target, id) in &entries {
            target.off(*id);
        }
        entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for Listening {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listening")
            .field("entries", &self.entries.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Handler) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &str| -> Handler {
            let sink = sink.clone();
            let tag = tag.to_string();
            Rc::new(move |signal: &Signal| {
                sink.borrow_mut().push(format!("{}:{}", tag, signal.name));
            })
        };
        (log, make)
    }

    #[test]
    fn named_handlers_then_all() {
        let emitter = Emitter::new();
        let (log, make) = recorder();
        emitter.on_handler(ALL, make("all"));
        emitter.on_handler("change", make("one"));
        emitter.on_handler("other", make("two"));

        emitter.trigger("change", Value::Null);
        assert_eq!(*log.borrow(), vec!["one:change", "all:change"]);
    }

    #[test]
    fn off_and_off_event() {
        let emitter = Emitter::new();
        let (log, make) = recorder();
        let id = emitter.on_handler("a", make("x"));
        emitter.on_handler("a", make("y"));
        emitter.on_handler("b", make("z"));

        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        emitter.trigger("a", Value::Null);
        assert_eq!(emitter.off_event("a"), 1);
        emitter.trigger("a", Value::Null);
        assert_eq!(*log.borrow(), vec!["y:a"]);
        assert_eq!(emitter.handler_count("b"), 1);
    }

    #[test]
    fn handlers_added_during_dispatch_wait_for_next_trigger() {
        let emitter = Emitter::new();
        let hits = Rc::new(Cell::new(0));
        let inner = emitter.clone();
        let counter = hits.clone();
        emitter.on("tick", move |_| {
            let counter = counter.clone();
            inner.on("tick", move |_| counter.set(counter.get() + 1));
        });

        emitter.trigger("tick", Value::Null);
        assert_eq!(hits.get(), 0);
        emitter.trigger("tick", Value::Null);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn stop_listening_releases_every_target() {
        let model = Emitter::new();
        let collection = Emitter::new();
        let listening = Listening::new();
        let (log, make) = recorder();

        listening.listen_to(&model, "change", make("m"));
        listening.listen_to(&collection, "add", make("c"));
        assert_eq!(listening.len(), 2);

        assert_eq!(listening.stop_listening(), 2);
        model.trigger("change", Value::Null);
        collection.trigger("add", Value::Null);
        assert!(log.borrow().is_empty());
        assert!(model.is_empty() && collection.is_empty());
        assert_eq!(listening.stop_listening(), 0);
    }
}
