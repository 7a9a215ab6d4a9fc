//! Declarative listener binding.
//!
//! The `listeners` map in block state is read when the block finishes
//! initializing. Each entry is one of:
//!
//! - `"<event>": handler` subscribes `handler` to the block's own signal
//! - `"<path>": { "<event>": handler, ... }` subscribes each handler on the
//!   emitter found at `path` (the empty path is the block itself)
//!
//! A handler is a method name, resolved on every call, or a value built
//! with [`listener`](crate::listener).

use std::rc::Rc;

use blocks_core::{Path, Value};

use crate::{Block, Emitter, ListenerFn, Method, Signal};

impl Block {
    /// Subscribe everything declared under `listeners`. Returns how many
    /// subscriptions were made.
    pub fn start_listening(&self) -> usize {
        let Some(Value::Map(listeners)) = self.get_at(&Path::root().child("listeners")) else {
            return 0;
        };

        let mut count = 0;
        for (key, spec) in &listeners {
            match spec {
                Value::Map(events) => {
                    let Some(target) = self.resolve_target(key) else {
                        tracing::trace!(block = %self.id(), target = %key, "no listener target");
                        continue;
                    };
                    for (event, handler) in events {
                        if let Some(method) = self.bind_handler(handler) {
                            self.listen_with(&target, event, method);
                            count += 1;
                        }
                    }
                }
                handler => {
                    if let Some(method) = self.bind_handler(handler) {
                        self.listen_with(&self.0.emitter, key, method);
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// The emitter a listener path points at.
    ///
    /// Block state may hold emitters directly or other blocks; anything
    /// else (including nothing) is not a target.
    fn resolve_target(&self, path: &str) -> Option<Emitter> {
        let path = Path::parse(path).ok()?;
        if path.is_empty() {
            return Some(self.0.emitter.clone());
        }
        let value = self.get_at(&path)?;
        if let Some(emitter) = value.downcast::<Emitter>() {
            return Some((*emitter).clone());
        }
        value
            .downcast::<Block>()
            .map(|block| block.0.emitter.clone())
    }

    /// Turn a declared handler into something callable.
    pub(crate) fn bind_handler(&self, handler: &Value) -> Option<Method> {
        match handler {
            Value::String(name) => Some(late_bound(name.clone())),
            other => match other.downcast::<ListenerFn>() {
                Some(f) => Some(f.0.clone()),
                None => {
                    tracing::warn!(block = %self.id(), handler = ?other, "ignoring unusable handler");
                    None
                }
            },
        }
    }
}

/// Dispatch to whatever method `name` refers to at call time.
fn late_bound(name: String) -> Method {
    Rc::new(move |block: &Block, signal: &Signal| {
        if !block.call_method(&name, signal) {
            tracing::warn!(block = %block.id(), method = %name, "no such method; signal skipped");
        }
    })
}
