//! The block handle, its state accessor and its signal surface.
//!
//! Construction and removal live in `lifecycle`, rendering and child
//! management in `compose`, subscriptions in `listeners` and `delegate`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use blocks_core::{access, Map, Path, Value};
use blocks_dom::Element;
use futures::channel::oneshot;
use futures::future::{LocalBoxFuture, Shared};
use indexmap::IndexMap;

use crate::emitter::{Emitter, Listening, Signal, SubscriptionId};
use crate::{BlockId, BlockType, Method, Result, Runtime};

/// Where a block is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; `initialize` has not settled yet.
    Initializing,
    /// Rendered and listening.
    Initialized,
    /// `initialize` or the first render failed.
    Failed,
    /// `remove` has run.
    Removed,
}

pub(crate) type Ready = Shared<LocalBoxFuture<'static, Result<()>>>;

pub(crate) struct BlockInner {
    pub(crate) id: BlockId,
    pub(crate) ty: BlockType,
    pub(crate) runtime: Runtime,
    pub(crate) parent: Weak<BlockInner>,
    pub(crate) children: RefCell<IndexMap<BlockId, Block>>,
    pub(crate) state: RefCell<Value>,
    pub(crate) modifiers: RefCell<Map>,
    pub(crate) collections: RefCell<Map>,
    pub(crate) models: RefCell<Map>,
    pub(crate) collection: RefCell<Option<Value>>,
    pub(crate) model: RefCell<Option<Value>>,
    pub(crate) element: RefCell<Element>,
    pub(crate) emitter: Emitter,
    pub(crate) listening: Listening,
    pub(crate) methods: RefCell<IndexMap<String, Method>>,
    pub(crate) phase: Cell<Phase>,
    pub(crate) rendered: Cell<bool>,
    pub(crate) generation: Cell<u64>,
    pub(crate) ready: Ready,
    pub(crate) settle: RefCell<Option<oneshot::Sender<Result<()>>>>,
}

/// Handle to a live block. Clones refer to the same block.
#[derive(Clone)]
pub struct Block(pub(crate) Rc<BlockInner>);

/// Non-owning handle to a block.
#[derive(Clone, Default)]
pub struct WeakBlock(Weak<BlockInner>);

impl WeakBlock {
    pub fn upgrade(&self) -> Option<Block> {
        self.0.upgrade().map(Block)
    }
}

impl fmt::Debug for WeakBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(block) => write!(f, "WeakBlock({})", block.id()),
            None => f.write_str("WeakBlock(dropped)"),
        }
    }
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.0.id
    }

    pub fn block_type(&self) -> &BlockType {
        &self.0.ty
    }

    pub fn runtime(&self) -> &Runtime {
        &self.0.runtime
    }

    pub fn downgrade(&self) -> WeakBlock {
        WeakBlock(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Block) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The block whose template included this one, if it is still alive.
    pub fn parent(&self) -> Option<Block> {
        self.0.parent.upgrade().map(Block)
    }

    /// Current children in inclusion order.
    pub fn children(&self) -> Vec<Block> {
        self.0.children.borrow().values().cloned().collect()
    }

    pub fn child(&self, id: BlockId) -> Option<Block> {
        self.0.children.borrow().get(&id).cloned()
    }

    pub fn child_ids(&self) -> Vec<BlockId> {
        self.0.children.borrow().keys().copied().collect()
    }

    /// The current root element. Replaced, not mutated, by every render.
    pub fn element(&self) -> Element {
        self.0.element.borrow().clone()
    }

    /// The block that rendered `element`, if it is still alive.
    pub fn from_element(element: &Element) -> Option<Block> {
        element.owner::<BlockInner>().map(Block)
    }

    pub fn phase(&self) -> Phase {
        self.0.phase.get()
    }

    pub fn is_removed(&self) -> bool {
        self.phase() == Phase::Removed
    }

    /// Settles once `initialize`, the first render and listener binding
    /// have completed, or with the error that stopped them.
    pub fn ready(&self) -> impl Future<Output = Result<()>> + 'static {
        self.0.ready.clone()
    }

    pub fn emitter(&self) -> &Emitter {
        &self.0.emitter
    }

    // ==================== state ====================

    /// Snapshot of the whole state graph.
    pub fn state(&self) -> Value {
        self.0.state.borrow().clone()
    }

    /// Read the value at a dotted path. Unparseable paths and absent
    /// intermediates read as `None`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path).ok()?;
        self.get_at(&path)
    }

    pub fn get_at(&self, path: &Path) -> Option<Value> {
        access::get_path(&self.0.state.borrow(), path).cloned()
    }

    /// Write `value` at a dotted path and announce what changed.
    ///
    /// Returns the changed sub-graph anchored at the root, or `None` when
    /// the write changed nothing (in which case nothing is announced).
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let path = Path::parse(path)?;
        self.set_at(&path, value.into())
    }

    pub fn set_at(&self, path: &Path, value: Value) -> Result<Option<Value>> {
        let changed = access::set_path(&mut self.0.state.borrow_mut(), path, value)?;
        if let Some(changed) = &changed {
            self.announce(changed);
        }
        Ok(changed)
    }

    /// Deep-merge `value` into the whole state and announce what changed.
    pub fn assign(&self, value: impl Into<Value>) -> Result<Option<Value>> {
        let changed = access::merge_path(
            &mut self.0.state.borrow_mut(),
            &Path::root(),
            &value.into(),
        )?;
        if let Some(changed) = &changed {
            self.announce(changed);
        }
        Ok(changed)
    }

    /// Emit `change:<path>` for every key in the diff, most specific first,
    /// then `change` with the whole diff.
    fn announce(&self, changed: &Value) {
        for (path, data) in access::change_signals(changed) {
            let name = if path.is_empty() {
                "change".to_string()
            } else {
                format!("change:{}", path)
            };
            tracing::trace!(block = %self.id(), signal = %name, "state changed");
            self.trigger(&name, data);
        }
    }

    pub fn modifiers(&self) -> Map {
        self.0.modifiers.borrow().clone()
    }

    pub fn collections(&self) -> Map {
        self.0.collections.borrow().clone()
    }

    pub fn collection(&self) -> Option<Value> {
        self.0.collection.borrow().clone()
    }

    pub fn models(&self) -> Map {
        self.0.models.borrow().clone()
    }

    pub fn model(&self) -> Option<Value> {
        self.0.model.borrow().clone()
    }

    // ==================== signals ====================

    /// Raise a signal: mirrored on the element as an event, then delivered
    /// through the block's emitter.
    pub fn trigger(&self, name: &str, data: Value) {
        self.element().trigger(name, data.clone());
        self.0.emitter.trigger(name, data);
    }

    pub fn on(&self, event: &str, handler: impl Fn(&Signal) + 'static) -> SubscriptionId {
        self.0.emitter.on(event, handler)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.0.emitter.off(id)
    }

    /// Subscribe to `target` on behalf of this block; released by
    /// [`stop_listening`](Self::stop_listening) and by removal.
    pub fn listen_to(
        &self,
        target: &Emitter,
        event: &str,
        handler: impl Fn(&Block, &Signal) + 'static,
    ) -> SubscriptionId {
        self.listen_with(target, event, Rc::new(handler))
    }

    pub(crate) fn listen_with(
        &self,
        target: &Emitter,
        event: &str,
        method: Method,
    ) -> SubscriptionId {
        let weak = self.downgrade();
        self.0.listening.listen_to(
            target,
            event,
            Rc::new(move |signal: &Signal| {
                if let Some(block) = weak.upgrade() {
                    method(&block, signal);
                }
            }),
        )
    }

    pub fn stop_listening(&self) -> usize {
        self.0.listening.stop_listening()
    }

    pub fn listening_count(&self) -> usize {
        self.0.listening.len()
    }

    // ==================== methods ====================

    /// Install or replace a method on this block only.
    ///
    /// Handlers bound by name pick up the new method on their next call.
    pub fn define_method(
        &self,
        name: impl Into<String>,
        method: impl Fn(&Block, &Signal) + 'static,
    ) {
        self.0
            .methods
            .borrow_mut()
            .insert(name.into(), Rc::new(method));
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.0.methods.borrow().contains_key(name)
    }

    /// Call the current method `name`. Returns `false` when there is none.
    pub fn call_method(&self, name: &str, signal: &Signal) -> bool {
        // Clone out so the method may redefine methods while it runs.
        let method = self.0.methods.borrow().get(name).cloned();
        match method {
            Some(method) => {
                method(self, signal);
                true
            }
            None => false,
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.0.id)
            .field("type", &self.0.ty.name())
            .field("phase", &self.0.phase.get())
            .field("children", &self.child_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{listener, BlockType, Error};
    use blocks_core::PathError;
    use serde_json::json;

    fn plain(runtime: &Runtime, state: serde_json::Value) -> Block {
        let ty = BlockType::builder("plain").build();
        runtime.create(&ty, Value::from(state)).unwrap()
    }

    fn record(block: &Block) -> Rc<RefCell<Vec<(String, Value)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        block.on("all", move |signal| {
            sink.borrow_mut()
                .push((signal.name.clone(), signal.data.clone()));
        });
        log
    }

    #[test]
    fn get_reads_nested_paths() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({"user": {"name": "Ann", "tags": ["a", "b"]}}));

        assert_eq!(block.get("user.name"), Some(Value::from("Ann")));
        assert_eq!(block.get("user.tags.1"), Some(Value::from("b")));
        assert_eq!(block.get("user.missing.deep"), None);
        assert_eq!(block.get("not a path"), None);
    }

    #[test]
    fn set_returns_only_the_changed_subgraph() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({"a": {"x": 1, "y": 2}, "b": 3}));

        let changed = block.set("a.x", 5).unwrap();
        assert_eq!(changed, Some(Value::from(json!({"a": {"x": 5}}))));
        assert_eq!(block.get("a.y"), Some(Value::from(2)));
    }

    #[test]
    fn set_announces_every_prefix_leaf_first() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        let log = record(&block);

        block.set("a.b", Value::from(json!({"c": 1}))).unwrap();

        let names: Vec<String> = log.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["change:a.b.c", "change:a.b", "change:a", "change"]);
        let log = log.borrow();
        assert_eq!(log[1].1, Value::from(json!({"c": 1})));
        assert_eq!(log[3].1, Value::from(json!({"a": {"b": {"c": 1}}})));
    }

    #[test]
    fn unchanged_set_is_silent() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({"a": 1}));
        let log = record(&block);

        assert_eq!(block.set("a", 1).unwrap(), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn set_rejects_bad_paths() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        assert!(matches!(block.set("a b", 1), Err(Error::Path(_))));
    }

    #[test]
    fn set_far_past_an_array_fails_without_announcing() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({"items": [1, 2]}));
        let log = record(&block);

        let err = block.set("items.18446744073709551615", 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Path(PathError::IndexOutOfRange { len: 2, .. })
        ));
        assert!(block.set("items.99999999999", 1).is_err());
        assert_eq!(block.get("items"), Some(Value::from(json!([1, 2]))));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn set_announces_containers_that_changed_shape() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({"items": [1, 2], "title": "x"}));
        let log = record(&block);

        block.set("items.best", 9).unwrap();
        let items = Value::from(json!({"0": 1, "1": 2, "best": 9}));
        assert_eq!(block.get("items"), Some(items.clone()));
        let seen = log.borrow().iter().find(|(n, _)| n == "change:items").cloned();
        assert_eq!(seen.map(|(_, data)| data), Some(items));

        log.borrow_mut().clear();
        let changed = block.set("title.text", "y").unwrap();
        assert_eq!(changed, Some(Value::from(json!({"title": {"text": "y"}}))));
        let seen = log.borrow().iter().find(|(n, _)| n == "change:title").cloned();
        assert_eq!(seen.map(|(_, data)| data), Some(Value::from(json!({"text": "y"}))));
    }

    #[test]
    fn assign_merges_and_announces() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({"a": {"x": 1}}));
        let log = record(&block);

        let changed = block.assign(Value::from(json!({"a": {"y": 2}}))).unwrap();
        assert_eq!(changed, Some(Value::from(json!({"a": {"y": 2}}))));
        assert_eq!(block.get("a"), Some(Value::from(json!({"x": 1, "y": 2}))));
        assert_eq!(log.borrow().last().map(|(n, _)| n.as_str()), Some("change"));
    }

    #[test]
    fn trigger_mirrors_on_the_element() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        block.element().on("saved", move |event| {
            sink.borrow_mut().push(event.detail().clone());
        });

        block.trigger("saved", Value::from(3));
        assert_eq!(*seen.borrow(), vec![Value::from(3)]);
    }

    #[test]
    fn late_bound_methods_follow_redefinition() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        let hits = Rc::new(RefCell::new(Vec::new()));

        let sink = hits.clone();
        block.define_method("handle", move |_, _| sink.borrow_mut().push("first"));
        assert!(block.call_method("handle", &Signal::new("x", Value::Null)));

        let sink = hits.clone();
        block.define_method("handle", move |_, _| sink.borrow_mut().push("second"));
        assert!(block.call_method("handle", &Signal::new("x", Value::Null)));
        assert!(!block.call_method("missing", &Signal::new("x", Value::Null)));

        assert_eq!(*hits.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn listen_to_is_released_by_stop_listening() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        let model = Emitter::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        block.listen_to(&model, "sync", move |_, _| counter.set(counter.get() + 1));

        model.trigger("sync", Value::Null);
        assert_eq!(block.stop_listening(), 1);
        model.trigger("sync", Value::Null);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn from_element_finds_the_owner() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        assert_eq!(Block::from_element(&block.element()), Some(block.clone()));
        assert_eq!(Block::from_element(&Element::new("div")), None);
    }

    #[test]
    fn listener_values_survive_in_state() {
        let runtime = Runtime::default();
        let block = plain(&runtime, json!({}));
        block.set("handler", listener(|_, _| {})).unwrap();
        assert!(block
            .get("handler")
            .and_then(|v| v.downcast::<crate::ListenerFn>())
            .is_some());
    }
}
