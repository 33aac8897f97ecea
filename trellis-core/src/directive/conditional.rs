//! `if`: mounts the element while the value is truthy.
//!
//! On initialize the element is swapped for a comment placeholder. The
//! element's lower-priority markers live in a nested section that is connected
//! while mounted and disconnected while unmounted, so a hidden branch does not
//! react to model changes.

use tracing::{error, warn};

use crate::dom::Node;
use crate::error::Result;
use crate::section::{DirectiveContext, Section};
use crate::value::Value;

use super::Directive;

struct Conditional {
    element: Node,
    placeholder: Node,
    nested: Section,
}

pub(super) fn construct(ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
    let placeholder = Node::comment(&format!(" {}: {} ", ctx.attribute(), ctx.source()));
    Ok(Box::new(Conditional {
        element: ctx.element().clone(),
        placeholder,
        nested: ctx.nested(),
    }))
}

impl Directive for Conditional {
    fn initialize(&mut self) -> Result<()> {
        match self.element.parent() {
            Some(parent) => {
                parent.replace_child(&self.placeholder, &self.element);
            }
            None => warn!("conditional element has no parent; it will stay in place"),
        }
        self.nested.initialize()
    }

    fn execute(&mut self, value: &Value) -> Result<()> {
        if value.is_truthy() {
            if self.element.parent().is_none() {
                if let Some(parent) = self.placeholder.parent() {
                    parent.insert_before(&self.element, self.placeholder.next_sibling().as_ref());
                }
            }
            if !self.nested.is_connected() {
                self.nested.connect()?;
            }
        } else {
            if self.nested.is_connected() {
                self.nested.disconnect()?;
            }
            if self.placeholder.parent().is_some() {
                self.element.detach();
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.nested.is_connected() {
            if let Err(err) = self.nested.disconnect() {
                error!(error = %err, "could not disconnect conditional branch");
            }
        }
    }

    fn destroy(&mut self) {
        if let Err(err) = self.nested.destroy() {
            error!(error = %err, "could not destroy conditional branch");
        }
        self.placeholder.detach();
    }
}
