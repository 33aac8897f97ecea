//! Data Scope Chain
//!
//! A [`Scope`] resolves keypaths against the bound model. The chain is
//! immutable: [`Scope::scoped`] and [`Scope::alias`] return a new layer that
//! shadows one key and defers every other key to its parent, so nested
//! sections (list items, renamed bindings) never disturb the data seen by
//! their siblings.
//!
//! [`Scope::each_key`] is the hook observation is built on: it reports every
//! `(container, key)` pair it is about to index, in order, before descending.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::value::Value;

/// An ordered sequence of property names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keypath(SmallVec<[String; 4]>);

impl Keypath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Append `rest` after this path.
    pub fn join(&self, rest: &[String]) -> Keypath {
        Keypath(self.0.iter().chain(rest).cloned().collect())
    }
}

impl Deref for Keypath {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// Plain dotted form; use the expression compiler for quoted segments.
impl From<&str> for Keypath {
    fn from(dotted: &str) -> Self {
        Keypath::new(dotted.split('.').filter(|s| !s.is_empty()))
    }
}

impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

enum Source {
    Value(Value),
    Alias(Keypath),
}

enum Layer {
    Root(Value),
    Scoped {
        parent: Scope,
        key: String,
        source: Source,
    },
}

/// Where the first segment of a keypath resolves to.
enum Head {
    /// Index the model with the whole path.
    Model(Value),
    /// A shadowed key holding a fixed value; index it with the rest.
    Fixed(Value),
    /// A shadowed key re-rooted onto a path of the parent scope.
    Alias(Scope, Keypath),
}

/// A layer in the scope chain. Cloning shares the layer.
#[derive(Clone)]
pub struct Scope(Rc<Layer>);

impl Scope {
    /// The outermost scope, backed by `model`.
    pub fn root(model: impl Into<Value>) -> Self {
        Self(Rc::new(Layer::Root(model.into())))
    }

    /// A new layer answering `key` with `value`.
    pub fn scoped(&self, key: impl Into<String>, value: impl Into<Value>) -> Scope {
        Self(Rc::new(Layer::Scoped {
            parent: self.clone(),
            key: key.into(),
            source: Source::Value(value.into()),
        }))
    }

    /// A new layer answering `key` with whatever `target` resolves to in
    /// this scope. Reads, writes and observation all follow `target`.
    pub fn alias(&self, key: impl Into<String>, target: Keypath) -> Scope {
        Self(Rc::new(Layer::Scoped {
            parent: self.clone(),
            key: key.into(),
            source: Source::Alias(target),
        }))
    }

    /// The value backing the root of the chain.
    pub fn model(&self) -> Value {
        let mut current = self;
        loop {
            match &*current.0 {
                Layer::Root(model) => return model.clone(),
                Layer::Scoped { parent, .. } => current = parent,
            }
        }
    }

    fn head(&self, first: &str) -> Head {
        let mut current = self;
        loop {
            match &*current.0 {
                Layer::Root(model) => return Head::Model(model.clone()),
                Layer::Scoped {
                    parent,
                    key,
                    source,
                } => {
                    if key == first {
                        return match source {
                            Source::Value(value) => Head::Fixed(value.clone()),
                            Source::Alias(target) => Head::Alias(parent.clone(), target.clone()),
                        };
                    }
                    current = parent;
                }
            }
        }
    }

    pub fn get(&self, path: &[String]) -> Value {
        self.each_key(path, &mut |_, _| {})
    }

    /// Resolve `path`, calling `visit(container, key)` before each step that
    /// indexes into an object or array.
    pub fn each_key(&self, path: &[String], visit: &mut dyn FnMut(&Value, &str)) -> Value {
        let Some((first, rest)) = path.split_first() else {
            return Value::Undefined;
        };
        match self.head(first) {
            Head::Model(model) => descend(model, path, visit),
            Head::Fixed(value) => descend(value, rest, visit),
            Head::Alias(parent, target) => parent.each_key(&target.join(rest), visit),
        }
    }

    /// Write `value` at `path`, notifying watchers of the terminal container.
    pub fn set(&self, path: &[String], value: Value) -> Result<()> {
        let Some((first, rest)) = path.split_first() else {
            return Err(Error::NotWritable(String::new()));
        };
        let dotted = || path.join(".");
        match self.head(first) {
            Head::Model(model) => {
                let (last, init) = path.split_last().unwrap_or((first, &[]));
                let container = descend(model, init, &mut |_, _| {});
                assign(&container, last, value).ok_or_else(|| Error::NotWritable(dotted()))
            }
            Head::Fixed(fixed) => {
                let Some((last, init)) = rest.split_last() else {
                    return Err(Error::ReadOnlyScope(first.clone()));
                };
                let container = descend(fixed, init, &mut |_, _| {});
                assign(&container, last, value).ok_or_else(|| Error::NotWritable(dotted()))
            }
            Head::Alias(parent, target) => parent.set(&target.join(rest), value),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut current = self;
        while let Layer::Scoped { parent, key, .. } = &*current.0 {
            keys.push(key.as_str());
            current = parent;
        }
        f.debug_struct("Scope").field("shadowed", &keys).finish()
    }
}

fn descend(mut current: Value, keys: &[String], visit: &mut dyn FnMut(&Value, &str)) -> Value {
    for key in keys {
        if current.is_nullish() {
            return Value::Undefined;
        }
        if current.is_container() {
            visit(&current, key);
        }
        current = current.index(key);
    }
    current
}

fn assign(container: &Value, key: &str, value: Value) -> Option<()> {
    match container {
        Value::Object(object) => {
            object.set(key, value);
            Some(())
        }
        Value::Array(array) => {
            let index = key.parse::<usize>().ok()?;
            array.set(index, value).then_some(())
        }
        _ => None,
    }
}
