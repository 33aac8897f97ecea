//! Keypath Observation
//!
//! A [`KeypathObserver`] keeps exactly one registration per `(container, key)`
//! pair reached by its keypaths. Re-running [`KeypathObserver::connect`] after
//! any change walks the paths again and moves registrations whose container
//! changed identity:
//!
//! ```text
//! user.address.city
//!   [0] (model,   "user")      unchanged      -> kept
//!   [1] (user,    "address")   unchanged      -> kept
//!   [2] (address, "city")      address swapped -> unwatch old, watch new
//! ```
//!
//! Paths that share a prefix share its registrations, so `user.first` and
//! `user.last` watch `(model, "user")` once. Steps past the point where a walk
//! stops (a null intermediate) are unwatched and dropped.

use tracing::trace;

use crate::scope::{Keypath, Scope};
use crate::value::Value;

use super::{Notifier, Observer};

#[derive(Debug, Clone)]
struct Watched {
    target: Value,
    key: String,
    depth: usize,
}

impl Watched {
    fn is_at(&self, target: &Value, key: &str) -> bool {
        self.target.same(target) && self.key == key
    }

    fn same_as(&self, other: &Watched) -> bool {
        self.is_at(&other.target, &other.key) && self.depth == other.depth
    }
}

/// Observation state for the keypaths one binding depends on.
#[derive(Debug)]
pub struct KeypathObserver {
    paths: Vec<Keypath>,
    depth: usize,
    observed: Vec<Watched>,
}

impl KeypathObserver {
    /// `depth` is forwarded to the notifier for the final step.
    pub fn new(path: Keypath, depth: usize) -> Self {
        Self::merged([path], depth)
    }

    /// Observe several keypaths under a single set of registrations.
    pub fn merged(paths: impl IntoIterator<Item = Keypath>, depth: usize) -> Self {
        let mut unique: Vec<Keypath> = Vec::new();
        for path in paths {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        Self {
            paths: unique,
            depth,
            observed: Vec::new(),
        }
    }

    pub fn paths(&self) -> &[Keypath] {
        &self.paths
    }

    /// Number of `(container, key)` pairs currently observed.
    pub fn observed_len(&self) -> usize {
        self.observed.len()
    }

    /// Bring registrations in line with the current shape of the model.
    pub fn connect(&mut self, scope: &Scope, notifier: &dyn Notifier, observer: &Observer) {
        let wanted = self.walk(scope);

        let (kept, stale): (Vec<Watched>, Vec<Watched>) = self
            .observed
            .drain(..)
            .partition(|current| wanted.iter().any(|w| w.same_as(current)));
        for watched in stale {
            trace!(key = %watched.key, "unobserving replaced container");
            notifier.unwatch(&watched.target, &watched.key, observer);
        }
        for watched in &wanted {
            if !kept.iter().any(|k| k.same_as(watched)) {
                notifier.watch(&watched.target, &watched.key, observer, watched.depth);
            }
        }
        self.observed = wanted;
    }

    /// Drop every registration.
    pub fn disconnect(&mut self, notifier: &dyn Notifier, observer: &Observer) {
        for watched in self.observed.drain(..) {
            notifier.unwatch(&watched.target, &watched.key, observer);
        }
    }

    /// Every `(container, key)` pair the paths currently pass through, once
    /// each. A pair that is the last step of one path and an inner step of
    /// another keeps the larger depth.
    fn walk(&self, scope: &Scope) -> Vec<Watched> {
        let mut wanted: Vec<Watched> = Vec::new();
        for path in &self.paths {
            let mut visits = Vec::new();
            scope.each_key(path, &mut |target, key| {
                visits.push((target.clone(), key.to_string()));
            });
            let last = visits.len().saturating_sub(1);
            for (i, (target, key)) in visits.into_iter().enumerate() {
                let depth = if i == last { self.depth } else { 0 };
                match wanted.iter_mut().find(|w| w.is_at(&target, &key)) {
                    Some(existing) => existing.depth = existing.depth.max(depth),
                    None => wanted.push(Watched { target, key, depth }),
                }
            }
        }
        wanted
    }
}
