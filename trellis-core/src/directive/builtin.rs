//! The default directive set.
//!
//! | Key        | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `text`     | replaces the element's text content                      |
//! | `show`     | removes `hidden` while truthy                            |
//! | `hide`     | sets `hidden` while truthy                               |
//! | `enabled`  | removes `disabled` while truthy                          |
//! | `disabled` | sets `disabled` while truthy                             |
//! | `class-*`  | toggles one class name                                   |
//! | `on-*`     | installs the value as an event handler                   |
//! | `value`    | two-way binding on the `value` property (`input` event)  |
//! | `checked`  | two-way binding on the `checked` property (`change`)     |
//! | `if`       | mounts/unmounts the element                              |
//! | `each-*`   | repeats the element once per array item                  |
//! | `*`        | sets the attribute named by the parameter                |

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::dom::{ListenerId, Node};
use crate::error::{Error, Result};
use crate::section::{DirectiveContext, Publisher};
use crate::value::Value;

use super::{conditional, list, Directive, Registration, Registry};

pub(super) fn register_defaults(registry: Registry) -> Registry {
    registry
        .with(Registration::new("text", text))
        .with(Registration::new("show", |ctx| toggle_attribute(ctx, "hidden", false)))
        .with(Registration::new("hide", |ctx| toggle_attribute(ctx, "hidden", true)))
        .with(Registration::new("enabled", |ctx| toggle_attribute(ctx, "disabled", false)))
        .with(Registration::new("disabled", |ctx| toggle_attribute(ctx, "disabled", true)))
        .with(Registration::new("class-*", class_toggle))
        .with(Registration::new("on-*", event_handler).pass_functions())
        .with(Registration::new("value", |ctx| two_way(ctx, Property::Value)))
        .with(Registration::new("checked", |ctx| two_way(ctx, Property::Checked)))
        .with(Registration::new("if", conditional::construct).priority(3000))
        .with(
            Registration::new("each-*", list::construct)
                .priority(4000)
                .observe_depth(1),
        )
        .with(Registration::new("*", attribute))
}

/// The wildcard parameter, rejecting an empty one.
fn required_param(ctx: &DirectiveContext<'_>, what: &str) -> Result<String> {
    match ctx.param() {
        Some(param) if !param.is_empty() => Ok(param.to_string()),
        _ => Err(Error::Directive(format!(
            "`{}` is missing its {what}",
            ctx.attribute()
        ))),
    }
}

// ----------------------------------------------------------------------------
// text
// ----------------------------------------------------------------------------

struct Text {
    element: Node,
}

fn text(ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
    Ok(Box::new(Text {
        element: ctx.element().clone(),
    }))
}

impl Directive for Text {
    fn execute(&mut self, value: &Value) -> Result<()> {
        self.element.set_text_content(&value.to_text());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// show / hide / enabled / disabled
// ----------------------------------------------------------------------------

/// Sets a boolean attribute when the value's truthiness equals `present_when`.
struct AttributeToggle {
    element: Node,
    name: &'static str,
    present_when: bool,
}

fn toggle_attribute(
    ctx: &DirectiveContext<'_>,
    name: &'static str,
    present_when: bool,
) -> Result<Box<dyn Directive>> {
    Ok(Box::new(AttributeToggle {
        element: ctx.element().clone(),
        name,
        present_when,
    }))
}

impl Directive for AttributeToggle {
    fn execute(&mut self, value: &Value) -> Result<()> {
        if value.is_truthy() == self.present_when {
            self.element.set_attribute(self.name, "");
        } else {
            self.element.remove_attribute(self.name);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// class-*
// ----------------------------------------------------------------------------

struct ClassToggle {
    element: Node,
    class: String,
}

fn class_toggle(ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
    Ok(Box::new(ClassToggle {
        element: ctx.element().clone(),
        class: required_param(ctx, "class name")?,
    }))
}

impl Directive for ClassToggle {
    fn execute(&mut self, value: &Value) -> Result<()> {
        let current = self.element.attribute("class").unwrap_or_default();
        let mut classes: Vec<&str> = current
            .split_whitespace()
            .filter(|class| *class != self.class)
            .collect();
        if value.is_truthy() {
            classes.push(&self.class);
        }
        if classes.is_empty() {
            self.element.remove_attribute("class");
        } else {
            self.element.set_attribute("class", &classes.join(" "));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// on-*
// ----------------------------------------------------------------------------

/// Handlers receive the event name and the target node.
struct EventHandler {
    element: Node,
    event: String,
    handler: Rc<RefCell<Value>>,
    listener: Option<ListenerId>,
}

fn event_handler(ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
    Ok(Box::new(EventHandler {
        element: ctx.element().clone(),
        event: required_param(ctx, "event name")?,
        handler: Rc::new(RefCell::new(Value::Undefined)),
        listener: None,
    }))
}

impl EventHandler {
    fn unlisten(&mut self) {
        if let Some(id) = self.listener.take() {
            self.element.remove_event_listener(id);
        }
    }
}

impl Directive for EventHandler {
    fn execute(&mut self, value: &Value) -> Result<()> {
        *self.handler.borrow_mut() = value.clone();
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let handler = self.handler.clone();
        let id = self.element.add_event_listener(&self.event, move |event| {
            let current = handler.borrow().clone();
            match current {
                Value::Function(f) => {
                    f.call(&[Value::from(event.name.as_str()), Value::Node(event.target.clone())]);
                }
                Value::Undefined | Value::Null => {}
                other => warn!(event = %event.name, handler = ?other, "event handler is not a function"),
            }
        });
        self.listener = Some(id);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.unlisten();
    }

    fn destroy(&mut self) {
        self.unlisten();
    }
}

// ----------------------------------------------------------------------------
// value / checked
// ----------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Property {
    Value,
    Checked,
}

impl Property {
    fn name(self) -> &'static str {
        match self {
            Property::Value => "value",
            Property::Checked => "checked",
        }
    }

    fn event(self) -> &'static str {
        match self {
            Property::Value => "input",
            Property::Checked => "change",
        }
    }

    fn to_property(self, value: &Value) -> Value {
        match self {
            Property::Value => Value::from(value.to_text()),
            Property::Checked => Value::Bool(value.is_truthy()),
        }
    }
}

/// Model to property on execute, property to model on the property's event.
struct TwoWay {
    element: Node,
    property: Property,
    publisher: Publisher,
    listener: Option<ListenerId>,
}

fn two_way(ctx: &DirectiveContext<'_>, property: Property) -> Result<Box<dyn Directive>> {
    Ok(Box::new(TwoWay {
        element: ctx.element().clone(),
        property,
        publisher: ctx.publisher(),
        listener: None,
    }))
}

impl TwoWay {
    fn unlisten(&mut self) {
        if let Some(id) = self.listener.take() {
            self.element.remove_event_listener(id);
        }
    }
}

impl Directive for TwoWay {
    fn execute(&mut self, value: &Value) -> Result<()> {
        self.element
            .set_property(self.property.name(), self.property.to_property(value));
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        if self.listener.is_some() {
            return Ok(());
        }
        let publisher = self.publisher.clone();
        let property = self.property;
        let id = self
            .element
            .add_event_listener(property.event(), move |event| {
                let value = event.target.property(property.name());
                if let Err(err) = publisher.publish(value) {
                    warn!(property = property.name(), error = %err, "could not publish input");
                }
            });
        self.listener = Some(id);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.unlisten();
    }

    fn destroy(&mut self) {
        self.unlisten();
    }
}

// ----------------------------------------------------------------------------
// *
// ----------------------------------------------------------------------------

struct Attribute {
    element: Node,
    name: String,
}

fn attribute(ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
    Ok(Box::new(Attribute {
        element: ctx.element().clone(),
        name: required_param(ctx, "attribute name")?,
    }))
}

impl Directive for Attribute {
    fn execute(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Undefined | Value::Null | Value::Bool(false) => {
                self.element.remove_attribute(&self.name)
            }
            Value::Bool(true) => self.element.set_attribute(&self.name, ""),
            other => self.element.set_attribute(&self.name, &other.to_text()),
        }
        Ok(())
    }
}
