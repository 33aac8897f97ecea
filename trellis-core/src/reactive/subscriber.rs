//! Observer handles.
//!
//! An Observer is the callback a binding registers with the notification
//! primitive. Identity is carried by an [`ObserverId`] so the same handler can
//! be unregistered later without comparing closures.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an observer.
///
/// Each binding gets one ID when it is created. The notification primitive
/// uses it to match `unwatch` calls against earlier `watch` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// A change handler registered against `(object, key)` pairs.
///
/// Cloning shares the callback and keeps the same ID.
#[derive(Clone)]
pub struct Observer {
    id: ObserverId,
    notify: Rc<dyn Fn()>,
}

impl Observer {
    /// Create a new observer with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            id: ObserverId::new(),
            notify: Rc::new(notify),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Notify the observer that a watched property changed.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observer").field(&self.id).finish()
    }
}
