//! Element-scoped and document-scoped event delegation.
//!
//! Both maps use keys of the form `"<event>"` or `"<event> <selector>"`.
//! Local events attach to the block's current element and are moved to
//! each new element on render. Global events attach to the document under
//! the block's id as namespace, so a block's handlers are dropped together
//! without touching anyone else's.

use blocks_core::Value;
use blocks_dom::{DomEvent, Listener, Selector};
use indexmap::IndexMap;

use crate::emitter::Signal;
use crate::{Block, Method, Result};

/// Split `"click .save"` into `("click", Some(".save"))`.
fn split_key(key: &str) -> (&str, Option<&str>) {
    let key = key.trim();
    match key.split_once(char::is_whitespace) {
        Some((event, selector)) if !selector.trim().is_empty() => (event, Some(selector.trim())),
        Some((event, _)) => (event, None),
        None => (key, None),
    }
}

impl Block {
    /// Subscribe the type's global events on the document, replacing any
    /// this block already had.
    pub fn delegate_global_events(&self) -> Result<()> {
        self.undelegate_global_events();
        let namespace = self.id().to_string();
        let document = self.0.runtime.document();

        for (key, handler) in self.handlers(&self.0.ty.0.global_events) {
            let (event, selector) = split_key(&key);
            document.on(event, &namespace, selector, self.dom_handler(handler))?;
        }
        Ok(())
    }

    /// Drop this block's document handlers. Returns how many were removed.
    pub fn undelegate_global_events(&self) -> usize {
        self.0
            .runtime
            .document()
            .off_namespace(&self.id().to_string())
    }

    /// Attach the type's local events to the current element, replacing any
    /// this block already attached there.
    pub fn delegate_events(&self) -> Result<()> {
        self.undelegate_events();
        let namespace = self.id().to_string();
        let element = self.element();

        for (key, handler) in self.handlers(&self.0.ty.0.events) {
            let (event, selector) = split_key(&key);
            let mut listener =
                Listener::new(event, self.dom_handler(handler)).namespace(&namespace);
            if let Some(selector) = selector {
                listener = listener.delegate(Selector::parse(selector)?);
            }
            element.add_listener(listener);
        }
        Ok(())
    }

    /// Remove local events from the current element.
    pub fn undelegate_events(&self) -> usize {
        self.element().off_namespace(&self.id().to_string())
    }

    fn handlers(&self, declared: &IndexMap<String, Value>) -> Vec<(String, Method)> {
        declared
            .iter()
            .filter_map(|(key, handler)| Some((key.clone(), self.bind_handler(handler)?)))
            .collect()
    }

    /// Run `method` with this block as context for each element event.
    fn dom_handler(&self, method: Method) -> impl Fn(&DomEvent) + 'static {
        let weak = self.downgrade();
        move |event: &DomEvent| {
            if let Some(block) = weak.upgrade() {
                method(&block, &Signal::from_dom(event));
            }
        }
    }
}
