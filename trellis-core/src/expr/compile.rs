//! Expression Compiler
//!
//! Grammar, left to right:
//!
//! ```text
//! CORE [ARG...] [> PUBLISH] [| FILTER [ARG...]]* [< WATCH...]*
//! ```
//!
//! Bare tokens are classified in order: keyword (`true`, `false`, `null`,
//! `undefined`), element reference (`$el`), quoted literal, finite number,
//! keypath.

use crate::dom::Node;
use crate::error::{Error, Result};
use crate::value::Value;

use super::atom::Atom;
use super::filter::FilterTable;
use super::token::{self, Clause};

/// Token that compiles to the element the marker sits on.
pub const ELEMENT_SENTINEL: &str = "$el";

/// Compiles marker values into [`Atom`]s against a filter table.
#[derive(Clone, Copy)]
pub struct Compiler<'a> {
    filters: &'a FilterTable,
    element: Option<&'a Node>,
}

impl<'a> Compiler<'a> {
    pub fn new(filters: &'a FilterTable) -> Self {
        Self {
            filters,
            element: None,
        }
    }

    /// Resolve the element sentinel to `element`.
    pub fn with_element(mut self, element: &'a Node) -> Self {
        self.element = Some(element);
        self
    }

    pub fn compile(&self, source: &str) -> Result<Atom> {
        let (core, clauses) = token::clauses(source)?;
        let mut atom = self.parse_core(&core)?;
        let mut published = false;
        let mut watched = Vec::new();

        for (clause, text) in clauses {
            match clause {
                Clause::Publish => {
                    if published {
                        return Err(Error::MultiplePublish(source.to_string()));
                    }
                    published = true;
                    atom = Atom::Publish {
                        read: Box::new(atom),
                        write: Box::new(self.parse_core(&text)?),
                    };
                }
                Clause::Filter => {
                    let words = token::words(&text)?;
                    let Some((name, args)) = words.split_first() else {
                        return Err(Error::UnknownFilter(String::new()));
                    };
                    let filter = self
                        .filters
                        .get(name)
                        .cloned()
                        .ok_or_else(|| Error::UnknownFilter(name.clone()))?;
                    atom = Atom::Filter {
                        name: name.clone(),
                        filter,
                        inner: Box::new(atom),
                        args: args.iter().map(|word| self.token(word)).collect(),
                    };
                }
                Clause::Watch => {
                    for word in token::words(&text)? {
                        watched.push(self.token(&word));
                    }
                }
            }
        }

        if !watched.is_empty() {
            atom = Atom::Watch {
                inner: Box::new(atom),
                extra: watched,
            };
        }
        Ok(atom)
    }

    /// First word is the primary token, the rest are bound call arguments.
    fn parse_core(&self, text: &str) -> Result<Atom> {
        let words = token::words(text)?;
        let Some((head, rest)) = words.split_first() else {
            return Ok(Atom::Primitive(Value::Undefined));
        };
        Ok(match self.token(head) {
            Atom::Keypath { path, .. } => Atom::Keypath {
                path,
                args: rest.iter().map(|word| self.token(word)).collect(),
            },
            literal => literal,
        })
    }

    fn token(&self, word: &str) -> Atom {
        let literal = match word {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            "null" => Some(Value::Null),
            "undefined" => Some(Value::Undefined),
            ELEMENT_SENTINEL => Some(self.element.cloned().map(Value::Node).unwrap_or_default()),
            _ => None,
        };
        if let Some(value) = literal {
            return Atom::Primitive(value);
        }
        if let Some(text) = token::unquote(word) {
            return Atom::Primitive(Value::from(text));
        }
        if token::is_numeric(word) {
            if let Ok(n) = word.parse::<f64>() {
                return Atom::Primitive(Value::Number(n));
            }
        }
        Atom::Keypath {
            path: token::keypath(word),
            args: Vec::new(),
        }
    }
}
