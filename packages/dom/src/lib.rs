//! In-memory element tree for blocks.
//!
//! This crate is the element collaborator the runtime renders into:
//!
//! - [`Markup`] is what templates produce.
//! - [`Element`] is a shared handle to a live node, built from markup.
//! - [`Selector`] resolves placeholders and filters delegated events.
//! - [`Document`] owns the body and the namespaced document-scoped handlers.
//!
//! # Example
//!
//! ```rust
//! use blocks_core::Value;
//! use blocks_dom::{Document, Element, Markup};
//!
//! let document = Document::new();
//! let list = Element::from_markup(
//!     &Markup::element("ul")
//!         .child(Markup::element("li").attr("data-id", 1))
//!         .into(),
//! )
//! .unwrap();
//! document.body().append_child(list.clone());
//!
//! document
//!     .on("click", "app", Some("[data-id]"), |event| {
//!         assert_eq!(event.target().attribute("data-id").as_deref(), Some("1"));
//!     })
//!     .unwrap();
//! list.children()[0].trigger("click", Value::Null);
//! ```

mod document;
mod element;
mod error;
mod event;
mod markup;
mod selector;

pub use document::Document;
pub use element::{Element, Node};
pub use error::DomError;
pub use event::{DomEvent, DomHandler, Listener, ListenerId};
pub use markup::{Markup, MarkupElement};
pub use selector::Selector;
