//! Runtime configuration.

use serde::Deserialize;

use crate::{Error, Result};

/// Configuration for a [`Runtime`](crate::Runtime).
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Attribute carrying a child id on placeholder elements.
    pub marker_attribute: String,

    /// Prefix for the discovery class derived from a block type's mark.
    pub mark_prefix: String,

    /// Tag of the element created for blocks that declare none.
    pub default_tag: String,
}

impl RuntimeConfig {
    /// Load a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            marker_attribute: "block-cid".to_string(),
            mark_prefix: "js-".to_string(),
            default_tag: "div".to_string(),
        }
    }
}
