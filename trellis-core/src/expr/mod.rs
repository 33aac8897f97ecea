//! Expressions
//!
//! Marker values are small expressions compiled once into an [`Atom`] tree:
//!
//! - a core keypath or literal, optionally followed by call arguments,
//! - an optional publish target (`> other.path`) for two-way bindings whose
//!   write location differs from the read location,
//! - any number of filters (`| name arg...`) looked up in a [`FilterTable`],
//! - any number of watch clauses (`< extra.path`) that only add
//!   dependencies.
//!
//! Compilation fails on unknown filters, repeated publish clauses and
//! unterminated quotes. Evaluation never fails: a lookup through a missing
//! intermediate yields `undefined`.

mod atom;
mod compile;
mod filter;
mod token;

pub use atom::Atom;
pub use compile::{Compiler, ELEMENT_SENTINEL};
pub use filter::{Filter, FilterTable, Transform};
