//! Trellis Core
//!
//! This crate binds a live data model to a tree of display nodes. It scans
//! the tree for declarative markers (attributes such as `tr-text="user.name"`),
//! compiles each marker's value into an expression, and keeps the tree in sync
//! as the model changes, editing only the nodes that need it.
//!
//! It implements:
//!
//! - An expression language with keypaths, call arguments, filter pipelines,
//!   publish targets and extra watch dependencies
//! - Keypath observation that survives replacement of intermediate objects
//! - Prioritized, wildcard-matched directives with nested sections
//! - Keyed list reconciliation that moves nodes instead of rebuilding them
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: Dynamic model values with built-in change watchers
//! - `dom`: In-memory document tree
//! - `expr`: Expression compiler, atoms and filters
//! - `scope`: Layered data scopes
//! - `reactive`: Notifier seam and keypath observation chains
//! - `directive`: Directive trait, registry and the built-in directives
//! - `section`: Tree traversal, bound sections and templates
//! - `config`: Options and the `Binder` entry point
//!
//! # Example
//!
//! ```rust
//! use trellis_core::dom::Node;
//! use trellis_core::value::Object;
//! use trellis_core::Binder;
//!
//! let greeting = Node::element("p").with_attr("tr-text", "name | upper");
//! let root = Node::element("div").with_child(greeting.clone());
//! let model = Object::new().with("name", "Jack");
//!
//! let _section = Binder::new().bind(&root, model.clone()).unwrap();
//! assert_eq!(greeting.text_content(), "JACK");
//!
//! // Only the bindings that depend on `name` re-run
//! model.set("name", "Jill");
//! assert_eq!(greeting.text_content(), "JILL");
//! ```

pub mod config;
pub mod directive;
pub mod dom;
pub mod error;
pub mod expr;
pub mod reactive;
pub mod scope;
pub mod section;
pub mod value;

pub use config::{Binder, BinderBuilder, Options};
pub use error::{Error, Result};
pub use section::{Section, SectionState, Template};
pub use value::Value;
