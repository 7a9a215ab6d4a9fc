//! Rendering and child composition.
//!
//! Templates embed children through [`Block::include`], which constructs
//! the child immediately and leaves a placeholder carrying the child's id.
//! Once the new element exists, every placeholder is swapped for the
//! element of the child it names.

use blocks_core::Value;
use blocks_dom::{Element, Markup};

use crate::{Block, BlockId, BlockType, Error, Include, Result};

impl Block {
    /// Rebuild the element from the template and mount children into it.
    ///
    /// Old children are removed first; the template constructs a fresh set.
    /// The new element takes the old one's place in the tree. `after_render`
    /// runs on a later scheduling turn and is skipped if the block has
    /// re-rendered or been removed by then.
    pub fn render(&self) -> Result<()> {
        if self.is_removed() {
            return Err(Error::Removed(self.id()));
        }
        let ty = self.0.ty.clone();

        if let Some(prerender) = &ty.0.prerender {
            prerender(self);
        }
        self.remove_blocks();

        let generation = self.0.generation.get() + 1;
        self.0.generation.set(generation);

        if let Some(template) = &ty.0.template {
            let markup = template(self)?;
            let element = Element::from_markup(&markup)?;
            self.swap_element(element);
        }

        let element = self.element();
        if let Some(id) = self.get("id").filter(|id| !id.is_null()) {
            element.set_id(id);
        }
        if let Some(mark) = self.mark_class() {
            element.add_class(&mark);
        }
        element.set_owner(&self.0);
        self.delegate_events()?;
        self.init_blocks()?;
        self.0.rendered.set(true);
        tracing::debug!(block = %self.id(), generation, "rendered");

        if ty.0.after_render.is_some() {
            let weak = self.downgrade();
            self.0.runtime.defer(move || {
                let Some(block) = weak.upgrade() else {
                    return;
                };
                if block.is_removed() || block.0.generation.get() != generation {
                    tracing::trace!(block = %block.id(), generation, "skipping stale after_render");
                    return;
                }
                if let Some(after_render) = &block.0.ty.0.after_render {
                    after_render(&block);
                }
            });
        }
        Ok(())
    }

    /// Put `element` where the current element sits and make it current.
    fn swap_element(&self, element: Element) {
        let old = self.element();
        self.undelegate_events();
        old.replace_with(&element);
        old.clear_owner();
        *self.0.element.borrow_mut() = element;
    }

    /// Embed a child block or a partial while a template runs.
    ///
    /// A block type is constructed now with `params` and tracked as a child;
    /// the returned placeholder is replaced by the child's element once the
    /// template's markup has become an element. A partial is called with
    /// `params` and its markup returned as-is.
    pub fn include(&self, include: impl Into<Include>, params: Value) -> Result<Markup> {
        match include.into() {
            Include::Block(ty) => {
                let child = self.init_block(&ty, params)?;
                let tag = child.element().tag().to_string();
                Ok(Markup::element(tag)
                    .attr(&self.0.runtime.config().marker_attribute, child.id())
                    .into())
            }
            Include::Partial(partial) => partial(self, &params),
        }
    }

    /// Construct a child with this block as its parent and track it.
    pub fn init_block(&self, ty: &BlockType, params: Value) -> Result<Block> {
        let child = Block::construct(&self.0.runtime, ty, params, Some(self))?;
        self.0.children.borrow_mut().insert(child.id(), child.clone());
        Ok(child)
    }

    /// Replace every placeholder below the element with its child's element.
    pub fn init_blocks(&self) -> Result<()> {
        let marker = &self.0.runtime.config().marker_attribute;
        let placeholders = self.element().query_all(&format!("[{}]", marker))?;

        for placeholder in placeholders {
            let cid = placeholder.attribute(marker).unwrap_or_default();
            let child = cid
                .parse::<BlockId>()
                .ok()
                .and_then(|id| self.child(id))
                .ok_or_else(|| Error::MissingChild {
                    parent: self.id(),
                    child: cid.clone(),
                })?;
            placeholder.replace_with(&child.element());
        }
        Ok(())
    }

    /// Remove every child and forget them.
    pub fn remove_blocks(&self) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children.values() {
            child.remove();
        }
    }
}
