//! Compiled expression nodes.

use std::fmt;

use crate::error::{Error, Result};
use crate::scope::{Keypath, Scope};
use crate::value::Value;

use super::filter::Filter;

/// A compiled expression.
///
/// `read` never touches the tree. `publish` is the only mutating entry point
/// and always ends at a single keypath.
#[derive(Clone, Debug)]
pub enum Atom {
    /// A literal.
    Primitive(Value),
    /// A model lookup; with `args`, a function found there is bound to them.
    Keypath { path: Keypath, args: Vec<Atom> },
    /// Reads through `read`, writes through `write`.
    Publish { read: Box<Atom>, write: Box<Atom> },
    /// `inner` piped through a named filter.
    Filter {
        name: String,
        filter: Filter,
        inner: Box<Atom>,
        args: Vec<Atom>,
    },
    /// `inner` plus extra dependencies that only trigger re-evaluation.
    Watch { inner: Box<Atom>, extra: Vec<Atom> },
}

impl Atom {
    pub fn read(&self, scope: &Scope) -> Value {
        match self {
            Atom::Primitive(value) => value.clone(),
            Atom::Keypath { path, args } => {
                let value = scope.get(path);
                match value {
                    Value::Function(f) if !args.is_empty() => {
                        Value::Function(f.bind(read_all(args, scope)))
                    }
                    other => other,
                }
            }
            Atom::Publish { read, .. } => read.read(scope),
            Atom::Filter {
                filter,
                inner,
                args,
                ..
            } => filter.read(&inner.read(scope), &read_all(args, scope)),
            Atom::Watch { inner, .. } => inner.read(scope),
        }
    }

    /// Write `value` back to the model.
    ///
    /// A keypath with arguments that resolves to a function is treated as a
    /// setter: it is called with the arguments followed by `value`.
    pub fn publish(&self, scope: &Scope, value: Value) -> Result<()> {
        match self {
            Atom::Primitive(_) => Err(Error::NotWritable(self.to_string())),
            Atom::Keypath { path, args } => {
                if !args.is_empty() {
                    if let Value::Function(setter) = scope.get(path) {
                        let mut all = read_all(args, scope);
                        all.push(value);
                        setter.call(&all);
                        return Ok(());
                    }
                }
                scope.set(path, value)
            }
            Atom::Publish { write, .. } => write.publish(scope, value),
            Atom::Filter {
                filter,
                inner,
                args,
                ..
            } => {
                let converted = filter.publish(&value, &read_all(args, scope));
                inner.publish(scope, converted)
            }
            Atom::Watch { inner, .. } => inner.publish(scope, value),
        }
    }

    /// Every keypath whose change should re-evaluate this atom: the core
    /// path, call and filter arguments, and watch clauses.
    pub fn dependencies(&self) -> Vec<Keypath> {
        let mut out = Vec::new();
        self.collect_dependencies(&mut out);
        out
    }

    fn collect_dependencies(&self, out: &mut Vec<Keypath>) {
        match self {
            Atom::Primitive(_) => {}
            Atom::Keypath { path, args } => {
                if !path.is_empty() {
                    out.push(path.clone());
                }
                for arg in args {
                    arg.collect_dependencies(out);
                }
            }
            Atom::Publish { read, .. } => read.collect_dependencies(out),
            Atom::Filter { inner, args, .. } => {
                inner.collect_dependencies(out);
                for arg in args {
                    arg.collect_dependencies(out);
                }
            }
            Atom::Watch { inner, extra } => {
                inner.collect_dependencies(out);
                for atom in extra {
                    atom.collect_dependencies(out);
                }
            }
        }
    }
}

fn read_all(atoms: &[Atom], scope: &Scope) -> Vec<Value> {
    atoms.iter().map(|atom| atom.read(scope)).collect()
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Atom]) -> fmt::Result {
    for arg in args {
        write!(f, " {arg}")?;
    }
    Ok(())
}

/// Normalized source form, used in logs and errors.
impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Primitive(value) => write!(f, "{value:?}"),
            Atom::Keypath { path, args } => {
                write!(f, "{path}")?;
                write_args(f, args)
            }
            Atom::Publish { read, write } => write!(f, "{read} > {write}"),
            Atom::Filter {
                name, inner, args, ..
            } => {
                write!(f, "{inner} | {name}")?;
                write_args(f, args)
            }
            Atom::Watch { inner, extra } => {
                write!(f, "{inner} <")?;
                write_args(f, extra)
            }
        }
    }
}
