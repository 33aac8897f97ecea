//! Binder configuration.
//!
//! A [`Binder`] bundles everything that stays fixed for the lifetime of a
//! bound tree: options, the directive registry, the filter table and the
//! change notifier. It is cheap to clone and is threaded through every
//! section and template it creates, so there is no global registry to mutate.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directive::{Registration, Registry};
use crate::dom::Node;
use crate::error::Result;
use crate::expr::{Filter, FilterTable};
use crate::reactive::{ModelNotifier, Notifier};
use crate::scope::Scope;
use crate::section::{Section, Template};
use crate::value::Value;

/// User-facing options, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Attribute prefix that marks a binding, e.g. `tr-text`.
    pub prefix: String,
    /// Fail `bind` on the first skipped marker instead of recording it.
    pub strict: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prefix: "tr-".to_string(),
            strict: false,
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builder for [`Binder`]. Starts from the default directives, the default
/// filters and [`ModelNotifier`].
pub struct BinderBuilder {
    options: Options,
    registry: Registry,
    filters: FilterTable,
    notifier: Option<Rc<dyn Notifier>>,
}

impl Default for BinderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinderBuilder {
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            registry: Registry::with_defaults(),
            filters: FilterTable::with_defaults(),
            notifier: Some(Rc::new(ModelNotifier)),
        }
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.prefix = prefix.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Add a directive on top of the current registry.
    pub fn directive(mut self, registration: Registration) -> Self {
        self.registry.register(registration);
        self
    }

    /// Replace the whole registry.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn filter(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.filters.insert(name, filter);
        self
    }

    /// Replace the whole filter table.
    pub fn filters(mut self, filters: FilterTable) -> Self {
        self.filters = filters;
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Rc::new(notifier));
        self
    }

    /// Render once and never observe the model.
    pub fn without_notifier(mut self) -> Self {
        self.notifier = None;
        self
    }

    pub fn build(self) -> Binder {
        Binder(Rc::new(BinderInner {
            options: self.options,
            registry: self.registry,
            filters: self.filters,
            notifier: self.notifier,
            warned_static: Cell::new(false),
        }))
    }
}

struct BinderInner {
    options: Options,
    registry: Registry,
    filters: FilterTable,
    notifier: Option<Rc<dyn Notifier>>,
    warned_static: Cell<bool>,
}

/// Entry point for binding trees to models.
#[derive(Clone)]
pub struct Binder(Rc<BinderInner>);

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    /// A binder with every default.
    pub fn new() -> Self {
        BinderBuilder::new().build()
    }

    pub fn builder() -> BinderBuilder {
        BinderBuilder::new()
    }

    pub fn options(&self) -> &Options {
        &self.0.options
    }

    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }

    pub fn filters(&self) -> &FilterTable {
        &self.0.filters
    }

    pub fn notifier(&self) -> Option<Rc<dyn Notifier>> {
        self.0.notifier.clone()
    }

    /// Bind `root` to `model` and connect it.
    pub fn bind(&self, root: &Node, model: impl Into<Value>) -> Result<Section> {
        self.bind_scope(root, Scope::root(model))
    }

    /// Bind `root` against an existing scope and connect it.
    ///
    /// Skipped markers are available from [`Section::failures`]; in strict
    /// mode the first one is returned instead and nothing is connected.
    pub fn bind_scope(&self, root: &Node, scope: Scope) -> Result<Section> {
        debug!(root = ?root.tag_name(), prefix = %self.0.options.prefix, "binding tree");
        let mut section = Section::scan(self, root.clone(), scope);
        if self.0.options.strict {
            if let Some(first) = section.take_failures().into_iter().next() {
                return Err(first);
            }
        }
        section.connect()?;
        Ok(section)
    }

    /// Build a reusable template from an element or single-root fragment.
    pub fn template(&self, source: &Node) -> Result<Template> {
        Template::from_fragment(self, source)
    }

    pub(crate) fn note_static_render(&self) {
        if !self.0.warned_static.replace(true) {
            warn!("no change notifier configured; rendering statically");
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("options", &self.0.options)
            .field("directives", &self.0.registry.len())
            .field("observing", &self.0.notifier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn options_default_and_parse() {
        assert_eq!(Options::default().prefix, "tr-");
        let parsed = Options::from_json(r#"{"prefix": "data-rv-"}"#).unwrap();
        assert_eq!(parsed.prefix, "data-rv-");
        assert!(!parsed.strict);
        assert_eq!(Options::from_json("{}").unwrap(), Options::default());
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = Options::from_json(r#"{"prefx": "x-"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[test]
    fn builder_overrides() {
        let binder = Binder::builder()
            .prefix("x-")
            .strict(true)
            .filter("twice", Filter::read_only(|v, _| Value::from(v.as_number().unwrap_or(0.0) * 2.0)))
            .without_notifier()
            .build();
        assert_eq!(binder.options().prefix, "x-");
        assert!(binder.options().strict);
        assert!(binder.filters().contains("twice"));
        assert!(binder.notifier().is_none());
    }
}
