//! Filters
//!
//! A filter transforms a value on its way from the model to the tree. A
//! two-way filter also carries the inverse transform applied on publish.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// `(value, arguments) -> value`.
pub type Transform = Rc<dyn Fn(&Value, &[Value]) -> Value>;

#[derive(Clone)]
pub struct Filter {
    read: Transform,
    publish: Option<Transform>,
}

impl Filter {
    pub fn read_only<F>(read: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + 'static,
    {
        Self {
            read: Rc::new(read),
            publish: None,
        }
    }

    pub fn two_way<R, P>(read: R, publish: P) -> Self
    where
        R: Fn(&Value, &[Value]) -> Value + 'static,
        P: Fn(&Value, &[Value]) -> Value + 'static,
    {
        Self {
            read: Rc::new(read),
            publish: Some(Rc::new(publish)),
        }
    }

    pub fn read(&self, value: &Value, args: &[Value]) -> Value {
        (self.read)(value, args)
    }

    /// Apply the inverse transform; read-only filters pass values through.
    pub fn publish(&self, value: &Value, args: &[Value]) -> Value {
        match &self.publish {
            Some(publish) => publish(value, args),
            None => value.clone(),
        }
    }

    pub fn is_two_way(&self) -> bool {
        self.publish.is_some()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("two_way", &self.is_two_way())
            .finish()
    }
}

/// Filters by name, consulted when expressions are compiled.
#[derive(Clone, Default, Debug)]
pub struct FilterTable {
    filters: IndexMap<String, Filter>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `not`, `eq`, `default`, `length`, `upper`, `lower` and the two-way
    /// `number`.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(
                "not",
                Filter::two_way(
                    |v, _| Value::Bool(!v.is_truthy()),
                    |v, _| Value::Bool(!v.is_truthy()),
                ),
            )
            .with(
                "eq",
                Filter::read_only(|v, args| {
                    Value::Bool(args.first().is_some_and(|other| v.same(other)))
                }),
            )
            .with(
                "default",
                Filter::read_only(|v, args| {
                    if v.is_nullish() {
                        args.first().cloned().unwrap_or_default()
                    } else {
                        v.clone()
                    }
                }),
            )
            .with("length", Filter::read_only(|v, _| v.index("length")))
            .with(
                "upper",
                Filter::read_only(|v, _| Value::from(v.to_text().to_uppercase())),
            )
            .with(
                "lower",
                Filter::read_only(|v, _| Value::from(v.to_text().to_lowercase())),
            )
            .with(
                "number",
                Filter::two_way(|v, _| to_number(v), |v, _| to_number(v)),
            )
    }

    pub fn with(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.insert(name, filter);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, filter: Filter) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

fn to_number(value: &Value) -> Value {
    let n = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Null => 0.0,
        _ => f64::NAN,
    };
    Value::Number(n)
}
