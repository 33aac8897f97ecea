use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::config::Binder;
use crate::dom::Node;
use crate::error::{Error, Result};
use crate::expr::Atom;
use crate::scope::Scope;
use crate::value::Value;

use super::traverse::{Marker, Plan, Step};
use super::{Section, Template};

/// Everything a directive factory may ask about the marker it is built for.
pub struct DirectiveContext<'a> {
    binder: &'a Binder,
    element: &'a Node,
    scope: &'a Scope,
    marker: &'a Marker,
    atom: &'a Rc<Atom>,
    /// Lower-priority markers on the same element.
    remaining: &'a [Marker],
    plan: &'a Plan,
    /// The element's position in `plan`.
    path: &'a [usize],
    claimed: Cell<bool>,
    failures: RefCell<Vec<Error>>,
}

impl<'a> DirectiveContext<'a> {
    pub(crate) fn new(
        binder: &'a Binder,
        element: &'a Node,
        scope: &'a Scope,
        atom: &'a Rc<Atom>,
        plan: &'a Plan,
        step: &'a Step,
        index: usize,
    ) -> Self {
        Self {
            binder,
            element,
            scope,
            marker: &step.markers[index],
            atom,
            remaining: &step.markers[index + 1..],
            plan,
            path: &step.path,
            claimed: Cell::new(false),
            failures: RefCell::new(Vec::new()),
        }
    }

    pub fn binder(&self) -> &Binder {
        self.binder
    }

    pub fn element(&self) -> &Node {
        self.element
    }

    pub fn scope(&self) -> &Scope {
        self.scope
    }

    /// The full attribute name, prefix included.
    pub fn attribute(&self) -> &str {
        &self.marker.attribute
    }

    /// The raw expression text.
    pub fn source(&self) -> &str {
        &self.marker.source
    }

    /// The part of the marker name matched by a trailing `*`.
    pub fn param(&self) -> Option<&str> {
        self.marker.param.as_deref()
    }

    pub fn atom(&self) -> &Atom {
        self.atom
    }

    /// A handle for writing values back through the expression.
    pub fn publisher(&self) -> Publisher {
        Publisher {
            atom: self.atom.clone(),
            scope: self.scope.clone(),
        }
    }

    /// Hand the element over to a nested section built from the remaining
    /// markers and the element's descendants. The enclosing section stops
    /// processing the element.
    pub fn nested(&self) -> Section {
        self.claimed.set(true);
        let mut section = Section::build(
            self.binder,
            self.element.clone(),
            self.scope.clone(),
            &self.subplan(),
        );
        self.failures.borrow_mut().extend(section.take_failures());
        section
    }

    /// Turn the element into a template for repeated stamping. The marker
    /// attribute is removed; the remaining markers become the template's root
    /// markers.
    pub fn template(&self) -> Template {
        self.claimed.set(true);
        self.element.remove_attribute(&self.marker.attribute);
        Template::new(self.binder.clone(), self.element.clone(), self.subplan())
    }

    fn subplan(&self) -> Plan {
        self.plan.within(self.path, self.remaining.to_vec())
    }

    pub(crate) fn is_claimed(&self) -> bool {
        self.claimed.get()
    }

    pub(crate) fn take_failures(&self) -> Vec<Error> {
        self.failures.take()
    }
}

/// Writes values back to the model through a marker's expression.
#[derive(Clone)]
pub struct Publisher {
    atom: Rc<Atom>,
    scope: Scope,
}

impl Publisher {
    pub fn publish(&self, value: Value) -> Result<()> {
        self.atom.publish(&self.scope, value)
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("expression", &self.atom.to_string())
            .finish()
    }
}
