//! Construction and teardown.
//!
//! Construction runs in a fixed order: identity, state merge, collection
//! and model resolution, element, `initializing`, the `initialize` hook,
//! then (once the hook settles) render, listener binding and
//! `initialized`. Removal releases everything construction acquired.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use blocks_core::{merge_all, Map, Path, Value};
use blocks_dom::Element;
use futures::channel::oneshot;
use futures::future::FutureExt;
use indexmap::IndexMap;

use crate::block::{BlockInner, Phase};
use crate::emitter::{Emitter, Listening};
use crate::{Block, BlockId, BlockType, Error, Init, Result, Runtime};

impl Block {
    pub(crate) fn construct(
        runtime: &Runtime,
        ty: &BlockType,
        config: Value,
        parent: Option<&Block>,
    ) -> Result<Block> {
        let id = BlockId::next();
        // Only maps contribute; `Null` config means "no data".
        let state = merge_all([ty.defaults(), &config].into_iter().filter(|l| l.is_map()));
        let modifiers = state
            .get(&Path::root().child("modifiers"))
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();
        let supplied = state
            .get(&Path::root().child("el"))
            .and_then(|el| el.downcast::<Element>())
            .map(|el| (*el).clone());
        let element = supplied.clone().unwrap_or_else(|| {
            let tag = ty.tag().unwrap_or(&runtime.config().default_tag);
            Element::new(tag)
        });

        let (settle, settled) = oneshot::channel();
        let ready = settled
            .map(move |outcome| outcome.unwrap_or(Err(Error::Removed(id))))
            .boxed_local()
            .shared();

        let block = Block(Rc::new(BlockInner {
            id,
            ty: ty.clone(),
            runtime: runtime.clone(),
            parent: parent.map(|p| Rc::downgrade(&p.0)).unwrap_or_default(),
            children: RefCell::new(IndexMap::new()),
            state: RefCell::new(state),
            modifiers: RefCell::new(modifiers),
            collections: RefCell::new(Map::new()),
            models: RefCell::new(Map::new()),
            collection: RefCell::new(None),
            model: RefCell::new(None),
            element: RefCell::new(element),
            emitter: Emitter::new(),
            listening: Listening::new(),
            methods: RefCell::new(ty.0.methods.clone()),
            phase: Cell::new(Phase::Initializing),
            rendered: Cell::new(false),
            generation: Cell::new(0),
            ready,
            settle: RefCell::new(Some(settle)),
        }));
        tracing::debug!(block = %id, ty = ty.name(), "constructing block");

        block.stop_listening();
        block.init_collections();
        block.init_models();
        block.ensure_element(supplied.is_none());
        block.trigger("initializing", Value::Null);

        let init = match &ty.0.initialize {
            Some(hook) => hook(&block),
            None => Init::Done(Ok(())),
        };
        match init {
            Init::Done(outcome) => block.settle(outcome)?,
            Init::Pending(pending) => {
                let weak = block.downgrade();
                runtime.spawn(async move {
                    let outcome = pending.await;
                    if let Some(block) = weak.upgrade() {
                        if let Err(error) = block.settle(outcome) {
                            tracing::warn!(
                                block = %block.id(),
                                %error,
                                "deferred initialization failed"
                            );
                        }
                    }
                });
            }
        }

        if let Err(error) = block.delegate_global_events() {
            block.remove();
            return Err(error);
        }
        Ok(block)
    }

    fn init_collections(&self) {
        let mut collections = Map::new();
        for name in &self.0.ty.0.collections {
            let path = Path::root().child("collections").child(name);
            collections.insert(name.clone(), self.get_at(&path).unwrap_or_default());
        }
        *self.0.collections.borrow_mut() = collections;
        *self.0.collection.borrow_mut() = self.get_at(&Path::root().child("collection"));
    }

    fn init_models(&self) {
        let mut models = Map::new();
        for name in &self.0.ty.0.models {
            let path = Path::root().child("models").child(name);
            models.insert(name.clone(), self.get_at(&path).unwrap_or_default());
        }
        *self.0.models.borrow_mut() = models;
        *self.0.model.borrow_mut() = self.get_at(&Path::root().child("model"));
    }

    /// Tie the element to this block and, for an element the block created
    /// itself, apply the generated class and persisted id.
    fn ensure_element(&self, created: bool) {
        let element = self.element();
        element.set_owner(&self.0);
        if created {
            element.set_class_name(&self.full_class_name());
            if let Some(id) = self.get("id").filter(|id| !id.is_null()) {
                element.set_id(id);
            }
        }
    }

    /// Continue construction once `initialize` has produced `outcome`.
    pub(crate) fn settle(&self, outcome: Result<()>) -> Result<()> {
        let result = if self.is_removed() {
            Err(Error::Removed(self.id()))
        } else {
            outcome.and_then(|()| self.finish())
        };

        if let Err(error) = &result {
            if !self.is_removed() {
                self.0.phase.set(Phase::Failed);
                self.remove_blocks();
            }
            tracing::debug!(block = %self.id(), %error, "initialization did not complete");
        }

        if let Some(settle) = self.0.settle.borrow_mut().take() {
            let _ = settle.send(result.clone());
        }
        result
    }

    fn finish(&self) -> Result<()> {
        self.render()?;
        self.start_listening();
        self.0.phase.set(Phase::Initialized);
        tracing::debug!(block = %self.id(), "block initialized");
        self.trigger("initialized", Value::Null);
        Ok(())
    }

    /// Release every subscription, remove children, unlink from the parent
    /// and detach the element. Removing twice is a no-op.
    pub fn remove(&self) {
        if self.is_removed() {
            return;
        }
        self.0.phase.set(Phase::Removed);
        tracing::debug!(block = %self.id(), "removing block");

        self.stop_listening();
        self.undelegate_events();
        self.undelegate_global_events();
        self.remove_blocks();

        if let Some(parent) = self.parent() {
            parent.0.children.borrow_mut().shift_remove(&self.id());
        }

        let element = self.element();
        element.detach();
        element.clear_listeners();
        element.clear_owner();
    }
}
