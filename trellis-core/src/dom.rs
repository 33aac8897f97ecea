//! Document Tree
//!
//! A minimal in-memory document: elements with ordered attributes and
//! properties, text nodes, comments used as position sentinels, and fragments
//! used as template sources.
//!
//! Nodes are reference-counted handles; cloning a [`Node`] clones the handle,
//! [`Node::deep_clone`] copies the sub-tree. Parents are held weakly so a
//! detached sub-tree is dropped with its last handle.
//!
//! Event dispatch does not bubble. Listeners are cloned out of the node before
//! they run, so a listener may add or remove listeners on the node it was
//! fired on.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::value::Value;

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
    Fragment,
}

/// Identifies a registered event listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub target: Node,
}

struct Listener {
    id: ListenerId,
    event: String,
    handler: Rc<dyn Fn(&Event)>,
}

struct NodeData {
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<Node>,
    properties: IndexMap<String, Value>,
    listeners: Vec<Listener>,
}

/// A handle to a node in the document tree.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
            properties: IndexMap::new(),
            listeners: Vec::new(),
        })))
    }

    pub fn element(tag: &str) -> Self {
        Self::from_kind(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
        })
    }

    pub fn text(text: &str) -> Self {
        Self::from_kind(NodeKind::Text(text.to_string()))
    }

    pub fn comment(text: &str) -> Self {
        Self::from_kind(NodeKind::Comment(text.to_string()))
    }

    pub fn fragment() -> Self {
        Self::from_kind(NodeKind::Fragment)
    }

    /// Builder: set an attribute and return the node.
    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder: append a child and return the node.
    pub fn with_child(self, child: Node) -> Self {
        self.append_child(&child);
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element { .. })
    }

    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.borrow().children.first().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.children();
        let position = siblings.iter().position(|c| c == self)?;
        siblings.get(position + 1).cloned()
    }

    /// `true` when `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// All descendants in document order, excluding this node.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Remove this node from its parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.0.borrow_mut().children.retain(|c| c != self);
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None` or not a child of this node.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        if reference == Some(child) {
            return;
        }
        child.detach();
        {
            let mut data = self.0.borrow_mut();
            let at = reference
                .and_then(|r| data.children.iter().position(|c| c == r))
                .unwrap_or(data.children.len());
            data.children.insert(at, child.clone());
        }
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
    }

    /// Returns `false` if `child` was not a child of this node.
    pub fn remove_child(&self, child: &Node) -> bool {
        if child.parent().as_ref() != Some(self) {
            return false;
        }
        child.detach();
        true
    }

    /// Put `new` where `old` was. Returns `false` if `old` is not a child.
    pub fn replace_child(&self, new: &Node, old: &Node) -> bool {
        if old.parent().as_ref() != Some(self) {
            return false;
        }
        if new == old {
            return true;
        }
        new.detach();
        {
            let mut data = self.0.borrow_mut();
            if let Some(at) = data.children.iter().position(|c| c == old) {
                data.children[at] = new.clone();
            }
        }
        old.0.borrow_mut().parent = Weak::new();
        new.0.borrow_mut().parent = Rc::downgrade(&self.0);
        true
    }

    /// Exchange the tree positions of two attached nodes.
    pub fn swap_with(&self, other: &Node) {
        if self == other {
            return;
        }
        let (Some(parent_a), Some(parent_b)) = (self.parent(), other.parent()) else {
            return;
        };
        let marker = Node::comment("");
        parent_a.insert_before(&marker, Some(self));
        parent_b.insert_before(self, Some(other));
        parent_a.insert_before(other, Some(&marker));
        marker.detach();
    }

    /// Copy this node and its descendants. Listeners and properties stay
    /// with the original.
    pub fn deep_clone(&self) -> Node {
        let copy = Node::from_kind(self.kind());
        for child in self.children() {
            copy.append_child(&child.deep_clone());
        }
        copy
    }

    // ------------------------------------------------------------------
    // Attributes & properties
    // ------------------------------------------------------------------

    /// Attributes in source order. Empty for non-elements.
    pub fn attributes(&self) -> Vec<(String, String)> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => {
                attributes.get(&name.to_ascii_lowercase()).cloned()
            }
            _ => None,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            attributes.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            attributes.shift_remove(&name.to_ascii_lowercase());
        }
    }

    pub fn property(&self, name: &str) -> Value {
        self.0
            .borrow()
            .properties
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.0
            .borrow_mut()
            .properties
            .insert(name.to_string(), value);
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    pub fn text_content(&self) -> String {
        match &self.0.borrow().kind {
            NodeKind::Text(text) => return text.clone(),
            NodeKind::Comment(_) => return String::new(),
            _ => {}
        }
        self.children().iter().map(Node::text_content).collect()
    }

    /// Replace the children with a single text node (or set the text of a
    /// text node).
    pub fn set_text_content(&self, text: &str) {
        if let NodeKind::Text(existing) = &mut self.0.borrow_mut().kind {
            *existing = text.to_string();
            return;
        }
        for child in self.children() {
            child.detach();
        }
        if !text.is_empty() {
            self.append_child(&Node::text(text));
        }
    }

    /// Serialize the sub-tree for diagnostics and assertions.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self.kind() {
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(&tag);
                for (name, value) in &attributes {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                for child in self.children() {
                    child.write_html(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
            NodeKind::Text(text) => out.push_str(&text),
            NodeKind::Comment(text) => out.push_str(&format!("<!--{text}-->")),
            NodeKind::Fragment => {
                for child in self.children() {
                    child.write_html(out);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        let id = ListenerId::next();
        self.0.borrow_mut().listeners.push(Listener {
            id,
            event: event.to_string(),
            handler: Rc::new(handler),
        });
        id
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut data = self.0.borrow_mut();
        let before = data.listeners.len();
        data.listeners.retain(|l| l.id != id);
        data.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    /// Run every listener registered for `event` on this node.
    pub fn dispatch_event(&self, event: &str) {
        let handlers: Vec<Rc<dyn Fn(&Event)>> = self
            .0
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.event == event)
            .map(|l| l.handler.clone())
            .collect();
        let payload = Event {
            name: event.to_string(),
            target: self.clone(),
        };
        for handler in handlers {
            handler(&payload);
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => write!(f, "<{tag}>"),
            NodeKind::Text(text) => write!(f, "#text({text:?})"),
            NodeKind::Comment(text) => write!(f, "<!--{text}-->"),
            NodeKind::Fragment => f.write_str("#fragment"),
        }
    }
}
