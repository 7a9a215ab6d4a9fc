//! Block lifecycle, composition and state-propagation engine.
//!
//! A [`Block`] is a node in a UI composition tree. It owns its children,
//! its state graph and its root element. A [`BlockType`] describes what a
//! block looks like and how it reacts; the engine supplies the behaviour:
//!
//! - **Lifecycle**: construction in a fixed order, possibly suspended by an
//!   asynchronous `initialize` hook, and symmetric removal
//! - **State**: dotted-path `get`/`set` with `change:<path>` signals for
//!   every level the change touched
//! - **Composition**: templates include child blocks through placeholders
//!   that are swapped for the children's elements after render
//! - **Subscriptions**: declarative `listeners`, element `events` and
//!   document-scoped `global_events`
//!
//! # Example
//!
//! ```rust
//! use blocks_core::Value;
//! use blocks_dom::Markup;
//! use blocks_runtime::{BlockType, Runtime};
//! use serde_json::json;
//!
//! let runtime = Runtime::default();
//! let item = BlockType::builder("item")
//!     .tag("li")
//!     .template(|block| {
//!         let label = block.get("label").unwrap_or_default();
//!         Ok(Markup::element("li").child(label.to_string()).into())
//!     })
//!     .build();
//! let list = BlockType::builder("list")
//!     .template(move |block| {
//!         let first = block.include(&item, Value::from(json!({"label": "one"})))?;
//!         Ok(Markup::element("ul").child(first).into())
//!     })
//!     .build();
//!
//! let block = runtime.create(&list, Value::map()).unwrap();
//! assert_eq!(block.children().len(), 1);
//! assert_eq!(block.element().outer_html(), "<ul><li>one</li></ul>");
//! ```

mod block;
mod block_type;
mod class_name;
mod compose;
mod config;
mod delegate;
mod emitter;
mod error;
mod id;
mod lifecycle;
mod listeners;
mod runtime;

pub use block::{Block, Phase, WeakBlock};
pub use block_type::{
    listener, BlockType, BlockTypeBuilder, Hook, Include, Init, ListenerFn, Method, Partial,
    Template,
};
pub use class_name::generate_class_name;
pub use config::RuntimeConfig;
pub use emitter::{Emitter, Handler, Listening, Signal, SubscriptionId, ALL};
pub use error::{Error, Result};
pub use id::BlockId;
pub use runtime::Runtime;
