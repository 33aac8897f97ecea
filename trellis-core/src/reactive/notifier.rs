//! The pluggable "tell me when `object[key]` changes" primitive.

use crate::value::Value;

use super::Observer;

/// Registers observers against `(container, key)` pairs.
///
/// Implementations must not invoke observers from inside `watch` or
/// `unwatch`; bindings call both while re-wiring.
pub trait Notifier {
    /// Start notifying `observer` when `target[key]` changes. With
    /// `depth > 0`, mutations of a collection stored at `key` count too.
    fn watch(&self, target: &Value, key: &str, observer: &Observer, depth: usize);

    /// Remove one registration made by [`Notifier::watch`].
    fn unwatch(&self, target: &Value, key: &str, observer: &Observer);
}

/// The default notifier, backed by the watcher lists built into
/// [`Object`](crate::value::Object) and [`Array`](crate::value::Array).
///
/// Arrays notify on any mutation, whatever index was watched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelNotifier;

impl Notifier for ModelNotifier {
    fn watch(&self, target: &Value, key: &str, observer: &Observer, depth: usize) {
        match target {
            Value::Object(object) => object.watch(key, observer.clone(), depth),
            Value::Array(array) => array.watch(observer.clone()),
            _ => {}
        }
    }

    fn unwatch(&self, target: &Value, key: &str, observer: &Observer) {
        match target {
            Value::Object(object) => object.unwatch(key, observer),
            Value::Array(array) => array.unwatch(observer),
            _ => {}
        }
    }
}
