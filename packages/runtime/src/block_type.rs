//! Block types: plain data descriptions combined with the engine.
//!
//! A block type bundles defaults, a template, hooks and declarative
//! subscriptions. There is no inheritance; shared behaviour lives on
//! [`Block`] and a type only supplies data and callbacks.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use blocks_core::{Map, Opaque, Value};
use blocks_dom::Markup;
use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;

use crate::{Block, Result, Signal};

/// Evaluates a block's markup against its current state.
pub type Template = Rc<dyn Fn(&Block) -> Result<Markup>>;

/// A hook run with the block as context.
pub type Hook = Rc<dyn Fn(&Block)>;

/// A named method or bound handler. Receives the block it runs on.
pub type Method = Rc<dyn Fn(&Block, &Signal)>;

/// An inline partial: markup produced with the including block as context.
pub type Partial = Rc<dyn Fn(&Block, &Value) -> Result<Markup>>;

/// Outcome of an `initialize` hook.
pub enum Init {
    /// Initialization finished synchronously.
    Done(Result<()>),
    /// Initialization continues when the runtime drives this future.
    Pending(LocalBoxFuture<'static, Result<()>>),
}

impl From<Result<()>> for Init {
    fn from(result: Result<()>) -> Self {
        Init::Done(result)
    }
}

pub(crate) type InitHook = Rc<dyn Fn(&Block) -> Init>;

/// A function stored in block state as a listener.
///
/// Use [`listener`] to build the `Value` form.
#[derive(Clone)]
pub struct ListenerFn(pub(crate) Method);

impl ListenerFn {
    pub fn call(&self, block: &Block, signal: &Signal) {
        (self.0)(block, signal)
    }
}

impl fmt::Debug for ListenerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ListenerFn")
    }
}

/// Wrap a closure so it can sit in a `listeners`, `events` or
/// `global_events` declaration next to method names.
pub fn listener(f: impl Fn(&Block, &Signal) + 'static) -> Value {
    Value::Opaque(Opaque::new(ListenerFn(Rc::new(f))))
}

/// What a template embeds through [`Block::include`].
#[derive(Clone)]
pub enum Include {
    /// A child block, constructed now and substituted after render.
    Block(BlockType),
    /// Inline markup with no lifecycle of its own.
    Partial(Partial),
}

impl Include {
    pub fn partial(f: impl Fn(&Block, &Value) -> Result<Markup> + 'static) -> Self {
        Include::Partial(Rc::new(f))
    }
}

impl From<BlockType> for Include {
    fn from(ty: BlockType) -> Self {
        Include::Block(ty)
    }
}

impl From<&BlockType> for Include {
    fn from(ty: &BlockType) -> Self {
        Include::Block(ty.clone())
    }
}

#[derive(Clone)]
pub(crate) struct TypeDef {
    pub(crate) name: String,
    pub(crate) tag: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) defaults: Value,
    pub(crate) template: Option<Template>,
    pub(crate) initialize: Option<InitHook>,
    pub(crate) prerender: Option<Hook>,
    pub(crate) after_render: Option<Hook>,
    pub(crate) methods: IndexMap<String, Method>,
    pub(crate) global_events: IndexMap<String, Value>,
    pub(crate) events: IndexMap<String, Value>,
    pub(crate) collections: Vec<String>,
    pub(crate) models: Vec<String>,
    pub(crate) mark: Option<String>,
}

/// A block type. Cheap to clone.
#[derive(Clone)]
pub struct BlockType(pub(crate) Rc<TypeDef>);

impl BlockType {
    pub fn builder(name: impl Into<String>) -> BlockTypeBuilder {
        BlockTypeBuilder {
            def: TypeDef {
                name: name.into(),
                tag: None,
                class_name: None,
                defaults: Value::map(),
                template: None,
                initialize: None,
                prerender: None,
                after_render: None,
                methods: IndexMap::new(),
                global_events: IndexMap::new(),
                events: IndexMap::new(),
                collections: Vec::new(),
                models: Vec::new(),
                mark: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.0.tag.as_deref()
    }

    /// Base class for generated class names; the type name unless set.
    pub fn class_name(&self) -> &str {
        self.0.class_name.as_deref().unwrap_or(&self.0.name)
    }

    pub fn defaults(&self) -> &Value {
        &self.0.defaults
    }

    pub fn mark(&self) -> Option<&str> {
        self.0.mark.as_deref()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.0.methods.contains_key(name)
    }

    /// Start a new type from this one's declarations.
    pub fn extend(&self, name: impl Into<String>) -> BlockTypeBuilder {
        let mut def = (*self.0).clone();
        def.name = name.into();
        BlockTypeBuilder { def }
    }
}

impl fmt::Debug for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockType")
            .field("name", &self.0.name)
            .field("tag", &self.0.tag)
            .field("methods", &self.0.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`BlockType`].
pub struct BlockTypeBuilder {
    def: TypeDef,
}

impl BlockTypeBuilder {
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.def.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.def.class_name = Some(class_name.into());
        self
    }

    /// Deep-merge `defaults` into the type's defaults.
    #[must_use]
    pub fn defaults(mut self, defaults: impl Into<Value>) -> Self {
        blocks_core::deep_merge(&mut self.def.defaults, &defaults.into());
        self
    }

    #[must_use]
    pub fn template(mut self, template: impl Fn(&Block) -> Result<Markup> + 'static) -> Self {
        self.def.template = Some(Rc::new(template));
        self
    }

    #[must_use]
    pub fn initialize(mut self, hook: impl Fn(&Block) -> Result<()> + 'static) -> Self {
        self.def.initialize = Some(Rc::new(move |block: &Block| Init::Done(hook(block))));
        self
    }

    /// An `initialize` hook whose work completes later.
    #[must_use]
    pub fn initialize_async<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(&Block) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        self.def.initialize = Some(Rc::new(move |block: &Block| {
            Init::Pending(hook(block).boxed_local())
        }));
        self
    }

    /// An `initialize` hook deciding per call whether to finish now.
    #[must_use]
    pub fn initialize_with(mut self, hook: impl Fn(&Block) -> Init + 'static) -> Self {
        self.def.initialize = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn prerender(mut self, hook: impl Fn(&Block) + 'static) -> Self {
        self.def.prerender = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn after_render(mut self, hook: impl Fn(&Block) + 'static) -> Self {
        self.def.after_render = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Block, &Signal) + 'static,
    ) -> Self {
        self.def.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Subscribe on initialization. `handler` is a method name or a
    /// [`listener`] value; a map subscribes several events on `key`'s target.
    #[must_use]
    pub fn listener(mut self, key: impl Into<String>, handler: impl Into<Value>) -> Self {
        let mut listeners = Map::new();
        listeners.insert(key.into(), handler.into());
        let mut layer = Map::new();
        layer.insert("listeners".to_string(), Value::Map(listeners));
        blocks_core::deep_merge(&mut self.def.defaults, &Value::Map(layer));
        self
    }

    /// Document-scoped handler keyed `"<event>"` or `"<event> <selector>"`.
    #[must_use]
    pub fn global_event(mut self, key: impl Into<String>, handler: impl Into<Value>) -> Self {
        self.def.global_events.insert(key.into(), handler.into());
        self
    }

    /// Element-scoped handler keyed `"<event>"` or `"<event> <selector>"`.
    #[must_use]
    pub fn event(mut self, key: impl Into<String>, handler: impl Into<Value>) -> Self {
        self.def.events.insert(key.into(), handler.into());
        self
    }

    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.def.collections.push(name.into());
        self
    }

    #[must_use]
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.def.models.push(name.into());
        self
    }

    /// Discovery class added as `<mark_prefix><mark>`.
    #[must_use]
    pub fn mark(mut self, mark: impl Into<String>) -> Self {
        self.def.mark = Some(mark.into());
        self
    }

    pub fn build(self) -> BlockType {
        BlockType(Rc::new(self.def))
    }
}
