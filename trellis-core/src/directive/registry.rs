//! Directive registry and marker matching.
//!
//! Keys are case-insensitive. A key ending in `*` matches every name sharing
//! the part before it and captures the remainder as the directive parameter
//! (`class-*` matches `class-active` with parameter `active`). Exact keys win
//! over wildcards; among wildcards the longest prefix wins, and equal
//! prefixes resolve to the earliest registration.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::section::DirectiveContext;

use super::Directive;

/// Constructs a directive for one marker occurrence.
pub type Factory = Rc<dyn Fn(&DirectiveContext<'_>) -> Result<Box<dyn Directive>>>;

/// How a marker name maps to a directive.
#[derive(Clone)]
pub struct Registration {
    key: String,
    prefix: Option<String>,
    factory: Factory,
    priority: i32,
    pass_functions: bool,
    depth: usize,
}

impl Registration {
    pub fn new<F>(key: &str, factory: F) -> Self
    where
        F: Fn(&DirectiveContext<'_>) -> Result<Box<dyn Directive>> + 'static,
    {
        let key = key.to_ascii_lowercase();
        let prefix = key.strip_suffix('*').map(str::to_string);
        Self {
            key,
            prefix,
            factory: Rc::new(factory),
            priority: 0,
            pass_functions: false,
            depth: 0,
        }
    }

    /// Higher priorities are constructed and executed first on an element.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Deliver function values as-is instead of calling them.
    pub fn pass_functions(mut self) -> Self {
        self.pass_functions = true;
        self
    }

    /// Depth passed to the notifier for the last keypath step.
    pub fn observe_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get_priority(&self) -> i32 {
        self.priority
    }

    pub fn passes_functions(&self) -> bool {
        self.pass_functions
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_wildcard(&self) -> bool {
        self.prefix.is_some()
    }

    pub(crate) fn construct(&self, ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("pass_functions", &self.pass_functions)
            .field("depth", &self.depth)
            .finish()
    }
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct Match {
    pub registration: Rc<Registration>,
    /// The part of the name matched by `*`.
    pub param: Option<String>,
}

/// Registered directives, immutable once handed to a binder.
#[derive(Clone, Default, Debug)]
pub struct Registry {
    exact: IndexMap<String, Rc<Registration>>,
    /// Sorted by descending prefix length, registration order within a length.
    wildcards: Vec<Rc<Registration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in directive set.
    pub fn with_defaults() -> Self {
        super::builtin::register_defaults(Self::new())
    }

    pub fn with(mut self, registration: Registration) -> Self {
        self.register(registration);
        self
    }

    /// Add or replace a registration with the same key.
    pub fn register(&mut self, registration: Registration) {
        let registration = Rc::new(registration);
        let Some(prefix) = registration.prefix.as_deref() else {
            self.exact.insert(registration.key.clone(), registration);
            return;
        };
        if let Some(existing) = self
            .wildcards
            .iter_mut()
            .find(|r| r.key == registration.key)
        {
            *existing = registration;
            return;
        }
        let at = self
            .wildcards
            .iter()
            .position(|r| r.prefix.as_deref().map_or(0, str::len) < prefix.len())
            .unwrap_or(self.wildcards.len());
        self.wildcards.insert(at, registration);
    }

    pub fn lookup(&self, name: &str) -> Option<Match> {
        let name = name.to_ascii_lowercase();
        if let Some(registration) = self.exact.get(&name) {
            return Some(Match {
                registration: registration.clone(),
                param: None,
            });
        }
        self.wildcards.iter().find_map(|registration| {
            let prefix = registration.prefix.as_deref()?;
            name.strip_prefix(prefix).map(|rest| Match {
                registration: registration.clone(),
                param: Some(rest.to_string()),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Inert;

    impl Directive for Inert {
        fn execute(&mut self, _: &Value) -> Result<()> {
            Ok(())
        }
    }

    fn entry(key: &str) -> Registration {
        Registration::new(key, |_| Ok(Box::new(Inert)))
    }

    #[test]
    fn exact_keys_are_case_insensitive() {
        let registry = Registry::new().with(entry("Text"));
        let found = registry.lookup("TEXT").unwrap();
        assert_eq!(found.registration.key(), "text");
        assert_eq!(found.param, None);
    }

    #[test]
    fn wildcard_captures_remainder() {
        let registry = Registry::new().with(entry("class-*"));
        let found = registry.lookup("class-Active").unwrap();
        assert_eq!(found.param.as_deref(), Some("active"));
        assert!(registry.lookup("style").is_none());
    }

    #[test]
    fn most_specific_key_wins() {
        let registry = Registry::new()
            .with(entry("*"))
            .with(entry("on-*"))
            .with(entry("on-click"))
            .with(entry("o*"));

        assert_eq!(registry.lookup("on-click").unwrap().registration.key(), "on-click");
        assert_eq!(registry.lookup("on-input").unwrap().registration.key(), "on-*");
        assert_eq!(registry.lookup("open").unwrap().registration.key(), "o*");
        let fallback = registry.lookup("title").unwrap();
        assert_eq!(fallback.registration.key(), "*");
        assert_eq!(fallback.param.as_deref(), Some("title"));
    }

    #[test]
    fn reregistering_replaces() {
        let registry = Registry::new()
            .with(entry("each-*"))
            .with(entry("each-*").priority(7));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("each-x").unwrap().registration.get_priority(), 7);
    }

    #[test]
    fn unmatched_names_are_none() {
        assert!(Registry::new().with(entry("text")).lookup("txet").is_none());
    }
}
