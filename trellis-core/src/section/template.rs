use tracing::debug;

use crate::config::Binder;
use crate::dom::{Node, NodeKind};
use crate::error::{Error, Result};
use crate::scope::Scope;

use super::traverse::Plan;
use super::Section;

/// A detached sub-tree that can be stamped into any number of sections.
///
/// Markers are recorded when the template is created. Each stamp clones the
/// node and binds the recorded markers by position, without consulting the
/// registry again.
#[derive(Clone, Debug)]
pub struct Template {
    binder: Binder,
    node: Node,
    plan: Plan,
}

impl Template {
    pub(crate) fn new(binder: Binder, node: Node, plan: Plan) -> Self {
        debug!(tag = ?node.tag_name(), elements = plan.len(), "template recorded");
        Self { binder, node, plan }
    }

    /// Build a template from an element, or from a fragment holding exactly
    /// one element and no loose text.
    pub fn from_fragment(binder: &Binder, source: &Node) -> Result<Self> {
        let node = match source.kind() {
            NodeKind::Element { .. } => source.clone(),
            NodeKind::Fragment => single_root(source)?,
            NodeKind::Text(_) | NodeKind::Comment(_) => return Err(Error::FragmentRoots(0)),
        };
        let plan = Plan::record(binder, &node, None);
        Ok(Self::new(binder.clone(), node, plan))
    }

    /// The pristine node every stamp is cloned from.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Clone the template and build an unconnected section over the copy.
    pub fn stamp(&self, scope: Scope) -> Section {
        let root = self.node.deep_clone();
        debug!(tag = ?root.tag_name(), "stamping template");
        Section::build(&self.binder, root, scope, &self.plan)
    }
}

fn single_root(fragment: &Node) -> Result<Node> {
    let significant: Vec<Node> = fragment
        .children()
        .into_iter()
        .filter(|child| match child.kind() {
            NodeKind::Element { .. } => true,
            NodeKind::Text(text) => !text.trim().is_empty(),
            NodeKind::Comment(_) | NodeKind::Fragment => false,
        })
        .collect();
    match significant.as_slice() {
        [only] if only.is_element() => Ok(only.clone()),
        other => Err(Error::FragmentRoots(other.len())),
    }
}
