//! Model Values
//!
//! The data model bound to a tree is made of dynamic [`Value`]s. Primitives
//! are compared by value; objects, arrays, functions and nodes are shared
//! reference types compared by identity, which is what list reconciliation
//! keys on.
//!
//! # Change Notification
//!
//! [`Object`] and [`Array`] keep their own watcher lists. Mutating them through
//! [`Object::set`] or the array mutators notifies the registered observers
//! synchronously, after the internal borrow has been released, so a callback
//! may freely read the model or re-register observers.
//!
//! A key watched with `depth > 0` whose value is an [`Array`] also observes
//! mutations of that array; the subscription follows the key when the array
//! is replaced.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Node;
use crate::reactive::Observer;

/// A dynamically typed model value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Array),
    Object(Object),
    Function(Function),
    Node(Node),
}

impl Value {
    /// `true` for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Objects and arrays can be indexed into and observed.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Identity equality: primitives by value, reference types by pointer.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Node(a), Value::Node(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Look up one keypath segment on this value.
    ///
    /// Anything that cannot be indexed yields `undefined`.
    pub fn index(&self, key: &str) -> Value {
        match self {
            Value::Object(o) => o.get(key),
            Value::Array(a) => match key {
                "length" => Value::Number(a.len() as f64),
                _ => key
                    .parse::<usize>()
                    .map(|i| a.get(i))
                    .unwrap_or_default(),
            },
            Value::String(s) if key == "length" => Value::Number(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }

    /// Render the value the way a text node displays it.
    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(a) => a
                .to_vec()
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) => "[function]".to_string(),
            Value::Node(n) => n.text_content(),
        }
    }

    /// Snapshot the value as JSON. Functions and nodes become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) | Value::Node(_) => {
                serde_json::Value::Null
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(a) => {
                serde_json::Value::Array(a.to_vec().iter().map(Value::to_json).collect())
            }
            Value::Object(o) => serde_json::Value::Object(
                o.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(a) => f.debug_list().entries(a.to_vec()).finish(),
            Value::Object(o) => f.debug_map().entries(o.entries()).finish(),
            Value::Function(_) => f.write_str("[function]"),
            Value::Node(n) => write!(f, "{n:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Node> for Value {
    fn from(n: Node) -> Self {
        Value::Node(n)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .fold(Object::new(), |obj, (k, v)| obj.with(k, Value::from(v))),
            ),
        }
    }
}

// ----------------------------------------------------------------------------
// Object
// ----------------------------------------------------------------------------

struct KeyWatcher {
    key: String,
    observer: Observer,
    depth: usize,
}

#[derive(Default)]
struct ObjectData {
    fields: IndexMap<String, Value>,
    watchers: Vec<KeyWatcher>,
}

/// A shared, observable string-keyed record.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<ObjectData>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert that does not notify.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.borrow_mut().fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Value {
        self.0.borrow().fields.get(key).cloned().unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().fields.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().fields.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assign `key` and notify its watchers if the value changed identity.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let (previous, watchers) = {
            let mut data = self.0.borrow_mut();
            let previous = data
                .fields
                .insert(key.clone(), value.clone())
                .unwrap_or_default();
            let watchers: Vec<(Observer, usize)> = data
                .watchers
                .iter()
                .filter(|w| w.key == key)
                .map(|w| (w.observer.clone(), w.depth))
                .collect();
            (previous, watchers)
        };

        if previous.same(&value) {
            return;
        }

        for (observer, depth) in &watchers {
            if *depth > 0 {
                if let Value::Array(old) = &previous {
                    old.unwatch(observer);
                }
                if let Value::Array(new) = &value {
                    new.watch(observer.clone());
                }
            }
        }

        for (observer, _) in watchers {
            observer.notify();
        }
    }

    /// Remove `key`, notifying its watchers if it was present.
    pub fn remove(&self, key: &str) -> Value {
        let removed = self.0.borrow().fields.contains_key(key);
        if !removed {
            return Value::Undefined;
        }
        let previous = self.get(key);
        self.set(key, Value::Undefined);
        self.0.borrow_mut().fields.shift_remove(key);
        previous
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Register `observer` for changes of `key`.
    pub fn watch(&self, key: &str, observer: Observer, depth: usize) {
        let nested = {
            let mut data = self.0.borrow_mut();
            data.watchers.push(KeyWatcher {
                key: key.to_string(),
                observer: observer.clone(),
                depth,
            });
            data.fields.get(key).cloned()
        };
        if depth > 0 {
            if let Some(Value::Array(array)) = nested {
                array.watch(observer);
            }
        }
    }

    /// Remove one registration of `observer` for `key`.
    pub fn unwatch(&self, key: &str, observer: &Observer) {
        let removed = {
            let mut data = self.0.borrow_mut();
            let position = data
                .watchers
                .iter()
                .position(|w| w.key == key && w.observer == *observer);
            position.map(|i| {
                let watcher = data.watchers.remove(i);
                (watcher.depth, data.fields.get(key).cloned())
            })
        };
        if let Some((depth, Some(Value::Array(array)))) = removed {
            if depth > 0 {
                array.unwatch(observer);
            }
        }
    }

    /// Number of live `(key, observer)` registrations.
    pub fn watcher_count(&self) -> usize {
        self.0.borrow().watchers.len()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

// ----------------------------------------------------------------------------
// Array
// ----------------------------------------------------------------------------

#[derive(Default)]
struct ArrayData {
    items: Vec<Value>,
    watchers: Vec<Observer>,
}

/// A shared, observable list. Every mutator notifies all watchers.
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<ArrayData>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Value {
        self.0.borrow().items.get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the current items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.mutate(|items| items.push(value));
    }

    pub fn pop(&self) -> Value {
        self.mutate(|items| items.pop().unwrap_or_default())
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();
        self.mutate(|items| {
            let at = index.min(items.len());
            items.insert(at, value);
        });
    }

    pub fn remove(&self, index: usize) -> Value {
        self.mutate(|items| {
            if index < items.len() {
                items.remove(index)
            } else {
                Value::Undefined
            }
        })
    }

    /// Assign `index`; `index == len()` appends. Returns `false`, without
    /// notifying, when `index` is past the end.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
        if index > self.len() {
            return false;
        }
        let value = value.into();
        self.mutate(|items| {
            if index == items.len() {
                items.push(value);
            } else {
                items[index] = value;
            }
        });
        true
    }

    pub fn swap(&self, a: usize, b: usize) {
        self.mutate(|items| {
            if a < items.len() && b < items.len() {
                items.swap(a, b);
            }
        });
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    /// Replace every item at once, notifying a single time.
    pub fn replace_all(&self, values: Vec<Value>) {
        self.mutate(|items| *items = values);
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn watch(&self, observer: Observer) {
        self.0.borrow_mut().watchers.push(observer);
    }

    /// Remove one registration of `observer`.
    pub fn unwatch(&self, observer: &Observer) {
        let mut data = self.0.borrow_mut();
        if let Some(i) = data.watchers.iter().position(|w| w == observer) {
            data.watchers.remove(i);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.0.borrow().watchers.len()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let (result, watchers) = {
            let mut data = self.0.borrow_mut();
            let result = f(&mut data.items);
            (result, data.watchers.clone())
        };
        for observer in watchers {
            observer.notify();
        }
        result
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let array = Array::new();
        array.0.borrow_mut().items = iter.into_iter().collect();
        array
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

// ----------------------------------------------------------------------------
// Function
// ----------------------------------------------------------------------------

/// A callable model value (event handlers, computed getters, setters).
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&[Value]) -> Value>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Partially apply `bound`; call-time arguments are appended after them.
    pub fn bind(&self, bound: Vec<Value>) -> Function {
        let inner = self.clone();
        Function::new(move |args| {
            let mut all = bound.clone();
            all.extend_from_slice(args);
            inner.call(&all)
        })
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
