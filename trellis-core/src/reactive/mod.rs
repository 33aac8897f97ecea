//! Observation
//!
//! This module connects keypaths to change notifications. It is deliberately
//! thin: the actual "property changed" signal comes from a pluggable
//! [`Notifier`], and this layer only decides which `(object, key)` pairs must
//! be watched for a given keypath.
//!
//! # Concepts
//!
//! ## Observers
//!
//! An [`Observer`] is a callback with a stable [`ObserverId`]. Each marker
//! binding owns one and registers it with the notifier for every step of every
//! keypath its expression depends on.
//!
//! ## Keypath chains
//!
//! A [`KeypathObserver`] tracks the registrations for the keypaths of one
//! binding, with each `(object, key)` pair watched once. When an intermediate
//! object is replaced, re-connecting unwatches the old object and watches the
//! new one, so a binding on `user.address.city` keeps working after
//! `user.address` is swapped for a different object.
//!
//! # Implementation Notes
//!
//! Everything here is single-threaded and synchronous: notifications run to
//! completion inside the mutating call, with no batching or scheduling.

mod chain;
mod notifier;
mod subscriber;

pub use chain::KeypathObserver;
pub use notifier::{ModelNotifier, Notifier};
pub use subscriber::{Observer, ObserverId};
