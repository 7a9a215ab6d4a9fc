//! Runtime coordinator for blocks.
//!
//! The runtime is responsible for:
//! - Holding configuration shared by every block it creates
//! - Owning the document that global handlers attach to
//! - Scheduling deferred work (pending `initialize` hooks, `after_render`)

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use blocks_core::Value;
use blocks_dom::Document;
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::{Block, BlockType, Error, Result, RuntimeConfig};

struct RuntimeInner {
    config: RuntimeConfig,
    document: Document,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

/// The block runtime.
///
/// Single-threaded: all work runs on the thread that drives the runtime.
/// Cloning yields another handle to the same runtime.
///
/// # Example
///
/// ```rust
/// use blocks_core::Value;
/// use blocks_dom::Markup;
/// use blocks_runtime::{BlockType, Runtime, RuntimeConfig};
///
/// let runtime = Runtime::new(RuntimeConfig::default());
/// let greeting = BlockType::builder("greeting")
///     .template(|block| {
///         let name = block.get("name").unwrap_or(Value::from("world"));
///         Ok(Markup::element("p").child(format!("Hello, {}", name)).into())
///     })
///     .build();
///
/// let block = runtime.create(&greeting, Value::map()).unwrap();
/// assert_eq!(block.element().text_content(), "Hello, world");
/// ```
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

impl Runtime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self(Rc::new(RuntimeInner {
            config,
            document: Document::new(),
            pool: RefCell::new(pool),
            spawner,
        }))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    pub fn document(&self) -> &Document {
        &self.0.document
    }

    /// Construct a root block from `config`.
    ///
    /// A synchronous `initialize` hook has fully run (render and listener
    /// binding included) when this returns. An asynchronous one continues
    /// when the runtime is driven; see [`Block::ready`].
    pub fn create(&self, ty: &BlockType, config: Value) -> Result<Block> {
        Block::construct(self, ty, config, None)
    }

    /// Attach a block's element below the document body.
    pub fn mount(&self, block: &Block) {
        self.0.document.body().append_child(block.element());
    }

    /// Schedule a future on the runtime's task pool.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        if let Err(error) = self.0.spawner.spawn_local(future) {
            tracing::warn!(%error, "failed to schedule task");
        }
    }

    /// Run `callback` on a later scheduling turn, after the current
    /// synchronous call stack has returned.
    pub fn defer(&self, callback: impl FnOnce() + 'static) {
        self.spawn(async move { callback() });
    }

    /// Drive every task until none can make progress.
    pub fn run_until_stalled(&self) -> Result<()> {
        let mut pool = self.0.pool.try_borrow_mut().map_err(|_| Error::Reentrant)?;
        pool.run_until_stalled();
        Ok(())
    }

    /// Drive the task pool until `future` resolves.
    ///
    /// Must not be called from inside a task or deferred callback.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let mut pool = self.0.pool.try_borrow_mut().map_err(|_| Error::Reentrant)?;
        Ok(pool.run_until(future))
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.0.config)
            .finish()
    }
}
