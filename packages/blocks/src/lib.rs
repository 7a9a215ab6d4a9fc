//! Blocks: composable UI units with path-addressed state.
//!
//! This crate re-exports the layered workspace:
//!
//! - [`state`]: `Path`, `Value`, deep merge and change diffs
//! - [`dom`]: markup, the element tree, selectors and the document
//! - the engine itself ([`Block`], [`BlockType`], [`Runtime`]) at the root
//!
//! # Example
//!
//! ```rust
//! use blocks::{listener, BlockType, Markup, Runtime, Value};
//! use serde_json::json;
//!
//! let runtime = Runtime::default();
//! let counter = BlockType::builder("counter")
//!     .defaults(Value::from(json!({"count": 0})))
//!     .template(|block| {
//!         let count = block.get("count").unwrap_or_default();
//!         Ok(Markup::element("span").child(count.to_string()).into())
//!     })
//!     .listener("change:count", listener(|block, _| {
//!         block.render().unwrap();
//!     }))
//!     .build();
//!
//! let block = runtime.create(&counter, Value::map()).unwrap();
//! block.set("count", 2).unwrap();
//! assert_eq!(block.element().outer_html(), "<span>2</span>");
//! ```

pub use blocks_core as state;
pub use blocks_dom as dom;

pub use blocks_core::{path, Map, Path, PathError, Value};
pub use blocks_dom::{Document, DomError, Element, Markup};
pub use blocks_runtime::*;
