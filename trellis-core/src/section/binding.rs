//! One marker's live connection between the model and its directive.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{error, trace, warn};

use crate::directive::{Directive, Registration};
use crate::error::{Error, Result};
use crate::expr::Atom;
use crate::reactive::{KeypathObserver, Notifier, Observer};
use crate::scope::Scope;
use crate::value::Value;

/// Shared handle; the observer registered with the notifier holds a weak
/// reference back to it.
#[derive(Clone)]
pub(crate) struct Binding(Rc<BindingInner>);

struct BindingInner {
    attribute: String,
    atom: Rc<Atom>,
    scope: Scope,
    pass_functions: bool,
    directive: RefCell<Box<dyn Directive>>,
    chain: RefCell<KeypathObserver>,
    observer: Observer,
    notifier: Option<Rc<dyn Notifier>>,
    connected: Cell<bool>,
    /// A change arrived while the directive was executing.
    pending: Cell<bool>,
}

impl Binding {
    pub(crate) fn new(
        attribute: String,
        atom: Rc<Atom>,
        scope: Scope,
        registration: &Registration,
        directive: Box<dyn Directive>,
        notifier: Option<Rc<dyn Notifier>>,
    ) -> Self {
        let chain = KeypathObserver::merged(atom.dependencies(), registration.depth());
        let inner = Rc::new_cyclic(|weak: &Weak<BindingInner>| {
            let weak = weak.clone();
            BindingInner {
                attribute,
                atom,
                scope,
                pass_functions: registration.passes_functions(),
                directive: RefCell::new(directive),
                chain: RefCell::new(chain),
                observer: Observer::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        Binding(inner).changed();
                    }
                }),
                notifier,
                connected: Cell::new(false),
                pending: Cell::new(false),
            }
        });
        Binding(inner)
    }

    pub(crate) fn attribute(&self) -> &str {
        &self.0.attribute
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.0.connected.get()
    }

    /// Observe every dependency and apply the current value.
    ///
    /// Without a notifier the value is still applied once and
    /// [`Error::NoObserverConfigured`] is returned so the caller can report
    /// the static render.
    pub(crate) fn connect(&self) -> Result<()> {
        self.0.connected.set(true);
        let observed = self.observe();
        self.refresh();
        observed
    }

    pub(crate) fn disconnect(&self) {
        self.0.connected.set(false);
        let Some(notifier) = self.0.notifier.as_deref() else {
            return;
        };
        self.0
            .chain
            .borrow_mut()
            .disconnect(notifier, &self.0.observer);
    }

    /// Run a lifecycle hook on the directive.
    pub(crate) fn with_directive<R>(
        &self,
        hook: impl FnOnce(&mut Box<dyn Directive>) -> R,
    ) -> Option<R> {
        match self.0.directive.try_borrow_mut() {
            Ok(mut directive) => Some(hook(&mut directive)),
            Err(_) => {
                warn!(attribute = %self.0.attribute, "directive busy; lifecycle hook skipped");
                None
            }
        }
    }

    fn observe(&self) -> Result<()> {
        let notifier = self.0.notifier.as_deref().ok_or(Error::NoObserverConfigured)?;
        let Ok(mut chain) = self.0.chain.try_borrow_mut() else {
            return Ok(());
        };
        chain.connect(&self.0.scope, notifier, &self.0.observer);
        Ok(())
    }

    fn changed(&self) {
        if !self.is_connected() {
            trace!(attribute = %self.0.attribute, "ignoring change on disconnected binding");
            return;
        }
        // The path may now run through different objects.
        let _ = self.observe();
        self.refresh();
    }

    /// The atom's current value, with functions called unless the directive
    /// wants them as-is.
    fn evaluate(&self) -> Value {
        match self.0.atom.read(&self.0.scope) {
            Value::Function(f) if !self.0.pass_functions => f.call(&[]),
            other => other,
        }
    }

    fn refresh(&self) {
        loop {
            let Ok(mut directive) = self.0.directive.try_borrow_mut() else {
                self.0.pending.set(true);
                return;
            };
            self.0.pending.set(false);
            let value = self.evaluate();
            trace!(attribute = %self.0.attribute, expression = %self.0.atom, "executing directive");
            if let Err(err) = directive.execute(&value) {
                error!(attribute = %self.0.attribute, error = %err, "directive execution failed");
            }
            drop(directive);
            if !self.0.pending.get() || !self.is_connected() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Compiler, FilterTable};
    use crate::reactive::ModelNotifier;
    use crate::value::{Function, Object};

    /// Records every executed value.
    struct Probe(Rc<RefCell<Vec<Value>>>);

    impl Directive for Probe {
        fn execute(&mut self, value: &Value) -> Result<()> {
            self.0.borrow_mut().push(value.clone());
            Ok(())
        }
    }

    fn binding(source: &str, model: &Object, registration: Registration) -> (Binding, Rc<RefCell<Vec<Value>>>) {
        let filters = FilterTable::with_defaults();
        let atom = Compiler::new(&filters).compile(source).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let binding = Binding::new(
            "tr-probe".into(),
            Rc::new(atom),
            Scope::root(model.clone()),
            &registration,
            Box::new(Probe(seen.clone())),
            Some(Rc::new(ModelNotifier)),
        );
        (binding, seen)
    }

    fn plain() -> Registration {
        Registration::new("probe", |_| Err(Error::Directive("unused".into())))
    }

    #[test]
    fn connect_applies_and_follows_changes() {
        let model = Object::new().with("name", "Jack");
        let (binding, seen) = binding("name | upper", &model, plain());
        binding.connect().unwrap();
        model.set("name", "Jill");
        assert_eq!(*seen.borrow(), vec![Value::from("JACK"), Value::from("JILL")]);
    }

    #[test]
    fn disconnected_binding_ignores_changes() {
        let model = Object::new().with("name", "Jack");
        let (binding, seen) = binding("name", &model, plain());
        binding.connect().unwrap();
        binding.disconnect();
        model.set("name", "Jill");
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(model.watcher_count(), 0);
    }

    #[test]
    fn functions_are_called_unless_passed_through() {
        let model = Object::new().with("greet", Function::new(|_| Value::from("hello")));

        let (called, seen) = binding("greet", &model, plain());
        called.connect().unwrap();
        assert_eq!(seen.borrow()[0], Value::from("hello"));

        let (passed, seen) = binding("greet", &model, plain().pass_functions());
        passed.connect().unwrap();
        assert!(seen.borrow()[0].as_function().is_some());
    }

    #[test]
    fn missing_notifier_renders_once() {
        let filters = FilterTable::new();
        let model = Object::new().with("name", "Jack");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let binding = Binding::new(
            "tr-probe".into(),
            Rc::new(Compiler::new(&filters).compile("name").unwrap()),
            Scope::root(model.clone()),
            &plain(),
            Box::new(Probe(seen.clone())),
            None,
        );
        assert!(matches!(binding.connect(), Err(Error::NoObserverConfigured)));
        model.set("name", "Jill");
        assert_eq!(*seen.borrow(), vec![Value::from("Jack")]);
    }

    #[test]
    fn shared_path_prefix_is_watched_once() {
        let model = Object::new().with("user", Object::new().with("first", "Ada").with("last", "King"));
        let (binding, seen) = binding("user.first < user.last", &model, plain());
        binding.connect().unwrap();
        assert_eq!(model.watcher_count(), 1);

        model.set("user", Object::new().with("first", "Grace").with("last", "Hopper"));
        assert_eq!(model.watcher_count(), 1);
        assert_eq!(*seen.borrow(), vec![Value::from("Ada"), Value::from("Grace")]);
    }

    /// Writes `n = 2` back to the model the first time it sees `n = 1`.
    struct Bump {
        model: Object,
        seen: Rc<RefCell<Vec<Value>>>,
    }

    impl Directive for Bump {
        fn execute(&mut self, value: &Value) -> Result<()> {
            self.seen.borrow_mut().push(value.clone());
            if value.as_number() == Some(1.0) {
                self.model.set("n", 2);
            }
            Ok(())
        }
    }

    #[test]
    fn execute_may_change_its_own_dependency() {
        let model = Object::new().with("n", 1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let filters = FilterTable::new();
        let binding = Binding::new(
            "tr-bump".into(),
            Rc::new(Compiler::new(&filters).compile("n").unwrap()),
            Scope::root(model.clone()),
            &plain(),
            Box::new(Bump {
                model: model.clone(),
                seen: seen.clone(),
            }),
            Some(Rc::new(ModelNotifier)),
        );

        binding.connect().unwrap();
        assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);

        model.set("n", 3);
        assert_eq!(seen.borrow().last(), Some(&Value::from(3)));
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn watch_clause_triggers_reevaluation() {
        let model = Object::new().with("name", "Jack").with("tick", 0);
        let (binding, seen) = binding("name < tick", &model, plain());
        binding.connect().unwrap();
        model.set("tick", 1);
        assert_eq!(seen.borrow().len(), 2);
    }
}
