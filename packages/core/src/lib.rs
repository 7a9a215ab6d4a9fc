//! Block state layer
//!
//! The data half of a block:
//! - `Path`: dotted address into a state graph (`"models.user.name"`)
//! - `Value`: the state graph itself, with insertion-ordered maps and
//!   opaque references to live host objects
//! - `merge`: structural deep merge of defaults and constructor data
//! - `access`: writes through paths that report exactly what changed
//!
//! # Example
//!
//! ```rust
//! use blocks_core::{access, path, Value};
//! use serde_json::json;
//!
//! let mut state = Value::from(json!({"user": {"name": "Ann"}}));
//! let changed = access::set_path(&mut state, &path!("user.name"), Value::from("Bo")).unwrap();
//! assert_eq!(changed, Some(Value::from(json!({"user": {"name": "Bo"}}))));
//! ```

pub mod access;
pub mod merge;
mod path;
mod value;

pub use merge::{deep_merge, merge_all};
pub use path::{Path, PathError};
pub use value::{Map, Opaque, Value};
