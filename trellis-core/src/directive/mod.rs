//! Directives
//!
//! A directive is the behaviour attached to one marker on one element. The
//! section that discovers the marker constructs the directive through the
//! [`Registry`], then drives it:
//!
//! 1. `initialize` once, for structural setup such as swapping the element
//!    for a placeholder,
//! 2. `execute` with the freshly evaluated expression on connect and on every
//!    change of its dependencies,
//! 3. `connect` / `disconnect` hooks as the section is (re)attached,
//! 4. `destroy` when the section is torn down.
//!
//! Structural directives (`if`, `each-*`) own nested sections and forward
//! every lifecycle transition to them.

mod builtin;
mod conditional;
mod list;
mod reconcile;
mod registry;

pub use reconcile::{reconcile, Materialize};
pub use registry::{Factory, Match, Registration, Registry};

use crate::error::Result;
use crate::value::Value;

/// Behaviour bound to one marker.
pub trait Directive {
    /// Apply the current value of the marker's expression.
    fn execute(&mut self, value: &Value) -> Result<()>;

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn destroy(&mut self) {}
}
