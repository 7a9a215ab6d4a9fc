//! BEM-style modifier classes.

use blocks_core::{Map, Value};

use crate::Block;

/// Build `"<base> <base>_<name>[_<value>] ..."` from modifiers in map order.
///
/// A `true` flag adds `<base>_<name>`, a `false` flag adds nothing, and any
/// other value adds `<base>_<name>_<value>`.
///
/// ```rust
/// use blocks_core::Value;
/// use blocks_runtime::generate_class_name;
///
/// let modifiers = Value::from(serde_json::json!({
///     "active": true,
///     "size": "lg",
///     "disabled": false,
/// }));
/// assert_eq!(
///     generate_class_name("btn", modifiers.as_map().unwrap()),
///     "btn btn_active btn_size_lg"
/// );
/// ```
pub fn generate_class_name(base: &str, modifiers: &Map) -> String {
    modifiers
        .iter()
        .fold(base.to_string(), |mut class, (name, value)| {
            match value {
                Value::Bool(true) => {
                    class.push_str(&format!(" {}_{}", base, name));
                }
                Value::Bool(false) => {}
                other => {
                    class.push_str(&format!(" {}_{}_{}", base, name, other));
                }
            }
            class
        })
}

impl Block {
    /// Class name for `base` from `modifiers`, or from the block's own
    /// modifiers when none are given.
    pub fn generate_class_name(&self, base: &str, modifiers: Option<&Map>) -> String {
        match modifiers {
            Some(modifiers) => generate_class_name(base, modifiers),
            None => generate_class_name(base, &self.0.modifiers.borrow()),
        }
    }

    /// Merge `modifiers` into the block's modifiers. A rendered block gets
    /// its whole class attribute rewritten.
    pub fn set_modifiers(&self, modifiers: &Map) {
        {
            let mut current = self.0.modifiers.borrow_mut();
            for (name, value) in modifiers {
                current.insert(name.clone(), value.clone());
            }
        }
        if self.0.rendered.get() {
            self.element().set_class_name(&self.full_class_name());
        }
    }

    pub(crate) fn mark_class(&self) -> Option<String> {
        let mark = self.0.ty.mark()?;
        Some(format!("{}{}", self.0.runtime.config().mark_prefix, mark))
    }

    /// Type class with all modifiers, plus the mark class if declared.
    pub(crate) fn full_class_name(&self) -> String {
        let mut class = self.generate_class_name(self.0.ty.class_name(), None);
        if let Some(mark) = self.mark_class() {
            class.push(' ');
            class.push_str(&mark);
        }
        class
    }
}
