//! Integration Tests for Data Binding
//!
//! These tests bind small trees end to end and verify that markers, scopes,
//! observation and the structural directives work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::directive::{Directive, Registration};
use trellis_core::dom::Node;
use trellis_core::value::{Array, Function, Object, Value};
use trellis_core::{Binder, Error, Result, SectionState};

/// Appends `(label, value)` to a shared log on every execute.
struct Probe {
    label: String,
    log: Rc<RefCell<Vec<(String, Value)>>>,
}

impl Directive for Probe {
    fn execute(&mut self, value: &Value) -> Result<()> {
        self.log.borrow_mut().push((self.label.clone(), value.clone()));
        Ok(())
    }
}

type Log = Rc<RefCell<Vec<(String, Value)>>>;

fn probe(key: &str, log: &Log) -> Registration {
    let log = log.clone();
    let fixed = key.trim_end_matches('*').trim_end_matches('-').to_string();
    Registration::new(key, move |ctx| {
        Ok(Box::new(Probe {
            label: ctx.param().map(str::to_string).unwrap_or_else(|| fixed.clone()),
            log: log.clone(),
        }))
    })
}

fn labels(log: &Log) -> Vec<String> {
    log.borrow().iter().map(|(label, _)| label.clone()).collect()
}

fn element_children(node: &Node) -> Vec<Node> {
    node.children().into_iter().filter(Node::is_element).collect()
}

fn todo(title: &str) -> Value {
    Value::from(Object::new().with("title", title))
}

// ============================================================================
// Rendering and change propagation
// ============================================================================

/// Test that a text marker renders the model and follows changes.
#[test]
fn text_marker_renders_and_updates() {
    let span = Node::element("span").with_attr("tr-text", "name");
    let root = Node::element("div").with_child(span.clone());
    let model = Object::new().with("name", "Jack");

    let _section = Binder::new().bind(&root, model.clone()).unwrap();
    assert_eq!(span.text_content(), "Jack");

    model.set("name", "Jill");
    assert_eq!(span.text_content(), "Jill");
}

/// Test that a change only re-runs the bindings that depend on it.
#[test]
fn change_reruns_only_dependent_bindings() {
    let log: Log = Rc::default();
    let binder = Binder::builder().directive(probe("probe-*", &log)).build();
    let root = Node::element("div")
        .with_child(Node::element("span").with_attr("tr-probe-name", "name"))
        .with_child(Node::element("span").with_attr("tr-probe-age", "age"));
    let model = Object::new().with("name", "Jack").with("age", 30);

    let _section = binder.bind(&root, model.clone()).unwrap();
    assert_eq!(labels(&log), ["name", "age"]);

    model.set("name", "Jill");
    assert_eq!(labels(&log), ["name", "age", "name"]);

    // Assigning the same value is not a change
    model.set("age", 30);
    assert_eq!(log.borrow().len(), 3);
}

/// Test that paths sharing a prefix are observed once and run once per change.
#[test]
fn shared_prefix_runs_once_per_change() {
    let log: Log = Rc::default();
    let binder = Binder::builder().directive(probe("count", &log)).build();
    let root = Node::element("div").with_attr("tr-count", "user.first < user.last");
    let model = Object::new().with("user", Object::new().with("first", "Ada").with("last", "King"));

    let _section = binder.bind(&root, model.clone()).unwrap();
    assert_eq!(model.watcher_count(), 1);

    model.set("user", Object::new().with("first", "Grace").with("last", "Hopper"));
    assert_eq!(model.watcher_count(), 1);
    assert_eq!(labels(&log), ["count", "count"]);
}

/// Test that directives on one element execute by descending priority.
#[test]
fn priorities_order_execution() {
    let log: Log = Rc::default();
    let binder = Binder::builder()
        .directive(probe("first", &log).priority(500))
        .directive(probe("second", &log).priority(250))
        .directive(probe("third", &log))
        .build();
    let root = Node::element("div")
        .with_attr("tr-third", "x")
        .with_attr("tr-second", "x")
        .with_attr("tr-first", "x");

    let _section = binder.bind(&root, Object::new()).unwrap();
    assert_eq!(labels(&log), ["first", "second", "third"]);
}

/// Test that replacing an intermediate object re-targets observation.
#[test]
fn nested_path_survives_replacement() {
    let span = Node::element("span").with_attr("tr-text", "user.address.city");
    let old_address = Object::new().with("city", "Oslo");
    let user = Object::new().with("address", old_address.clone());
    let model = Object::new().with("user", user.clone());

    let _section = Binder::new().bind(&span, model).unwrap();
    assert_eq!(span.text_content(), "Oslo");

    let new_address = Object::new().with("city", "Bergen");
    user.set("address", new_address.clone());
    assert_eq!(span.text_content(), "Bergen");

    old_address.set("city", "Stale");
    assert_eq!(span.text_content(), "Bergen");
    assert_eq!(old_address.watcher_count(), 0);

    new_address.set("city", "Tromsø");
    assert_eq!(span.text_content(), "Tromsø");
}

/// Test that a null intermediate renders empty and recovers.
#[test]
fn null_intermediate_renders_empty() {
    let span = Node::element("span").with_attr("tr-text", "user.name");
    let model = Object::new().with("user", Value::Null);

    let _section = Binder::new().bind(&span, model.clone()).unwrap();
    assert_eq!(span.text_content(), "");

    model.set("user", Object::new().with("name", "Ada"));
    assert_eq!(span.text_content(), "Ada");
}

/// Test that attribute and class markers follow the model.
#[test]
fn attribute_and_class_markers() {
    let link = Node::element("a")
        .with_attr("class", "nav")
        .with_attr("tr-href", "url")
        .with_attr("tr-class-active", "current | eq 'home'");
    let model = Object::new().with("url", "/home").with("current", "home");

    let _section = Binder::new().bind(&link, model.clone()).unwrap();
    assert_eq!(link.attribute("href").as_deref(), Some("/home"));
    assert_eq!(link.attribute("class").as_deref(), Some("nav active"));

    model.set("current", "about");
    model.set("url", Value::Null);
    assert_eq!(link.attribute("class").as_deref(), Some("nav"));
    assert!(!link.has_attribute("href"));
}

/// Test that a watch clause re-evaluates without being read.
#[test]
fn watch_clause_forces_refresh() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let model = Object::new()
        .with(
            "stamp",
            Function::new(move |_| {
                counter.set(counter.get() + 1);
                Value::from(counter.get())
            }),
        )
        .with("tick", 0);
    let span = Node::element("span").with_attr("tr-text", "stamp < tick");

    let _section = Binder::new().bind(&span, model.clone()).unwrap();
    assert_eq!(span.text_content(), "1");

    model.set("tick", 1);
    assert_eq!(span.text_content(), "2");
    assert_eq!(calls.get(), 2);
}

// ============================================================================
// Two-way binding and events
// ============================================================================

/// Test that input events publish back into the model.
#[test]
fn value_marker_is_two_way() {
    let input = Node::element("input").with_attr("tr-value", "user.name");
    let echo = Node::element("span").with_attr("tr-text", "user.name");
    let root = Node::element("form")
        .with_child(input.clone())
        .with_child(echo.clone());
    let user = Object::new().with("name", "Jack");
    let model = Object::new().with("user", user.clone());

    let _section = Binder::new().bind(&root, model).unwrap();
    assert_eq!(input.property("value"), Value::from("Jack"));

    input.set_property("value", Value::from("Jill"));
    input.dispatch_event("input");
    assert_eq!(user.get("name"), Value::from("Jill"));
    assert_eq!(echo.text_content(), "Jill");
}

/// Test that a two-way filter converts on the way back.
#[test]
fn number_filter_publishes_numbers() {
    let input = Node::element("input").with_attr("tr-value", "age | number");
    let model = Object::new().with("age", 30);

    let _section = Binder::new().bind(&input, model.clone()).unwrap();
    assert_eq!(input.property("value"), Value::from("30"));

    input.set_property("value", Value::from("42"));
    input.dispatch_event("input");
    assert_eq!(model.get("age"), Value::from(42));
}

/// Test that a publish clause reads one path and writes another.
#[test]
fn publish_clause_redirects_writes() {
    let input = Node::element("input").with_attr("tr-value", "draft > saved");
    let model = Object::new().with("draft", "hello").with("saved", "");

    let _section = Binder::new().bind(&input, model.clone()).unwrap();
    assert_eq!(input.property("value"), Value::from("hello"));

    input.set_property("value", Value::from("bye"));
    input.dispatch_event("input");
    assert_eq!(model.get("saved"), Value::from("bye"));
    assert_eq!(model.get("draft"), Value::from("hello"));
}

/// Test that checkbox state round-trips through `checked`.
#[test]
fn checked_marker_is_two_way() {
    let checkbox = Node::element("input").with_attr("tr-checked", "done");
    let model = Object::new().with("done", false);

    let _section = Binder::new().bind(&checkbox, model.clone()).unwrap();
    assert_eq!(checkbox.property("checked"), Value::Bool(false));

    checkbox.set_property("checked", Value::Bool(true));
    checkbox.dispatch_event("change");
    assert_eq!(model.get("done"), Value::Bool(true));
}

/// Test that event handlers receive bound arguments, the event name and the
/// target, and stop firing once disconnected.
#[test]
fn event_handler_with_bound_argument() {
    let selected = Object::new();
    let sink = selected.clone();
    let select = Function::new(move |args| {
        sink.set("item", args[0].clone());
        sink.set("event", args[1].clone());
        Value::Undefined
    });
    let item = Node::element("li")
        .with_attr("tr-each-todo", "todos")
        .with_attr("tr-on-click", "select todo");
    let list = Node::element("ul").with_child(item);
    let (a, b) = (todo("a"), todo("b"));
    let todos: Array = vec![a, b.clone()].into_iter().collect();
    let model = Object::new().with("todos", todos).with("select", select);

    let mut section = Binder::new().bind(&list, model).unwrap();
    let items = element_children(&list);
    items[1].dispatch_event("click");
    assert_eq!(selected.get("item"), b);
    assert_eq!(selected.get("event"), Value::from("click"));

    section.disconnect().unwrap();
    selected.set("item", Value::Null);
    items[1].dispatch_event("click");
    assert_eq!(selected.get("item"), Value::Null);
}

// ============================================================================
// Structural directives
// ============================================================================

/// Test that reordering a list moves existing nodes instead of rebuilding.
#[test]
fn list_reorder_reuses_nodes() {
    let item = Node::element("li")
        .with_attr("tr-each-todo", "todos")
        .with_attr("tr-text", "todo.title");
    let list = Node::element("ul").with_child(item);
    let (a, b, c) = (todo("a"), todo("b"), todo("c"));
    let todos: Array = vec![a.clone(), b.clone(), c.clone()].into_iter().collect();
    let model = Object::new().with("todos", todos.clone());

    let _section = Binder::new().bind(&list, model).unwrap();
    let before = element_children(&list);
    assert_eq!(before.len(), 3);

    todos.replace_all(vec![c, a.clone(), b]);
    let after = element_children(&list);
    assert_eq!(after, vec![before[2].clone(), before[0].clone(), before[1].clone()]);
    let titles: Vec<String> = after.iter().map(Node::text_content).collect();
    assert_eq!(titles, ["c", "a", "b"]);

    let d = todo("d");
    todos.replace_all(vec![a, d]);
    let last = element_children(&list);
    assert_eq!(last.len(), 2);
    assert_eq!(last[0], before[0], "A keeps its node");
    assert!(!before.contains(&last[1]), "D gets a fresh node");
    assert_eq!(last[1].text_content(), "d");
}

/// Test that list items keep observing their own item.
#[test]
fn list_items_follow_item_changes() {
    let item = Node::element("li")
        .with_attr("tr-each-todo", "todos")
        .with_attr("tr-text", "todo.title");
    let list = Node::element("ul").with_child(item);
    let first = Object::new().with("title", "a");
    let todos: Array = vec![Value::from(first.clone())].into_iter().collect();
    let model = Object::new().with("todos", todos.clone());

    let _section = Binder::new().bind(&list, model.clone()).unwrap();
    first.set("title", "renamed");
    assert_eq!(element_children(&list)[0].text_content(), "renamed");

    // Replacing the array itself re-renders
    let replacement: Array = vec![todo("x"), todo("y")].into_iter().collect();
    model.set("todos", replacement);
    let titles: Vec<String> = element_children(&list).iter().map(Node::text_content).collect();
    assert_eq!(titles, ["x", "y"]);

    // The old array is no longer observed
    todos.push(todo("ignored"));
    assert_eq!(element_children(&list).len(), 2);
}

/// Test that list items hidden by their own conditional keep their slot.
#[test]
fn conditional_list_items_keep_their_slot() {
    let item = Node::element("li")
        .with_attr("tr-each-todo", "todos")
        .with_attr("tr-if", "todo.visible")
        .with_attr("tr-text", "todo.title");
    let list = Node::element("ul").with_child(item);
    let entry = |title: &str, visible: bool| Object::new().with("title", title).with("visible", visible);
    let titles = |list: &Node| -> Vec<String> {
        element_children(list).iter().map(Node::text_content).collect()
    };

    let a = entry("a", false);
    let todos: Array = vec![Value::from(a)].into_iter().collect();
    let model = Object::new().with("todos", todos.clone());
    let _section = Binder::new().bind(&list, model).unwrap();
    assert!(titles(&list).is_empty());

    // The hidden item's slot is replaced in place
    let b = entry("b", true);
    todos.replace_all(vec![Value::from(b.clone())]);
    assert_eq!(titles(&list), ["b"]);

    let (c, d) = (entry("c", false), entry("d", true));
    todos.replace_all(vec![b.clone().into(), c.clone().into(), d.clone().into()]);
    assert_eq!(titles(&list), ["b", "d"]);

    // Moves carry hidden items along
    todos.replace_all(vec![d.into(), c.clone().into(), b.into()]);
    assert_eq!(titles(&list), ["d", "b"]);

    c.set("visible", true);
    assert_eq!(titles(&list), ["d", "c", "b"]);
}

/// Test that lists nest inside conditionals.
#[test]
fn conditional_list() {
    let item = Node::element("li")
        .with_attr("tr-each-todo", "todos")
        .with_attr("tr-text", "todo.title");
    let list = Node::element("ul")
        .with_attr("tr-if", "todos | length")
        .with_child(item);
    let root = Node::element("div").with_child(list.clone());
    let todos = Array::new();
    let model = Object::new().with("todos", todos.clone());

    let _section = Binder::new().bind(&root, model.clone()).unwrap();
    assert!(element_children(&root).is_empty());

    // The conditional watches `todos` without depth; a new array is a change
    let filled: Array = vec![todo("a")].into_iter().collect();
    model.set("todos", filled.clone());
    assert_eq!(element_children(&root), vec![list.clone()]);
    assert_eq!(element_children(&list).len(), 1);

    filled.push(todo("b"));
    assert_eq!(element_children(&list).len(), 2);
}

// ============================================================================
// Lifecycle, configuration and failures
// ============================================================================

/// Test that destroy is terminal and releases the tree.
#[test]
fn destroy_releases_everything() {
    let item = Node::element("li")
        .with_attr("tr-each-todo", "todos")
        .with_attr("tr-text", "todo.title");
    let list = Node::element("ul").with_child(item);
    let root = Node::element("main").with_child(list.clone());
    let todos: Array = vec![todo("a")].into_iter().collect();
    let model = Object::new().with("todos", todos.clone());

    let mut section = Binder::new().bind(&list, model.clone()).unwrap();
    section.destroy().unwrap();

    assert_eq!(section.state(), SectionState::Destroyed);
    assert!(root.children().is_empty());
    assert!(list.children().is_empty());
    assert_eq!(model.watcher_count(), 0);
    assert_eq!(todos.watcher_count(), 0);
    assert!(matches!(section.connect(), Err(Error::SectionDestroyed)));
}

/// Test that a binder without a notifier renders once.
#[test]
fn static_render_without_notifier() {
    let span = Node::element("span").with_attr("tr-text", "name");
    let model = Object::new().with("name", "Jack");
    let binder = Binder::builder().without_notifier().build();

    let section = binder.bind(&span, model.clone()).unwrap();
    assert!(section.is_connected());
    assert_eq!(span.text_content(), "Jack");

    model.set("name", "Jill");
    assert_eq!(span.text_content(), "Jack");
    assert_eq!(model.watcher_count(), 0);
}

/// Test that one bad marker does not stop the rest of the tree.
#[test]
fn compile_failure_is_isolated() {
    let bad = Node::element("span").with_attr("tr-text", "name | shout");
    let good = Node::element("span").with_attr("tr-text", "name");
    let root = Node::element("div")
        .with_child(bad.clone())
        .with_child(good.clone());

    let section = Binder::new()
        .bind(&root, Object::new().with("name", "Jack"))
        .unwrap();
    assert_eq!(good.text_content(), "Jack");
    assert_eq!(bad.text_content(), "");
    assert_eq!(section.failures().len(), 1);
    match &section.failures()[0] {
        Error::Marker { attribute, source } => {
            assert_eq!(attribute, "tr-text");
            assert!(matches!(**source, Error::UnknownFilter(ref name) if name == "shout"));
        }
        other => panic!("unexpected failure {other:?}"),
    }
}

/// Test that strict mode turns the first skipped marker into an error.
#[test]
fn strict_mode_fails_bind() {
    let root = Node::element("div")
        .with_child(Node::element("span").with_attr("tr-text", "'open"))
        .with_child(Node::element("span").with_attr("tr-each-", "items"));
    let binder = Binder::builder().strict(true).build();

    let err = binder.bind(&root, Object::new()).unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnterminatedQuote(_)));
}

/// Test that options loaded from JSON change the marker prefix.
#[test]
fn options_from_json() {
    let options = trellis_core::Options::from_json(r#"{"prefix": "data-bind-"}"#).unwrap();
    let binder = Binder::builder().options(options).build();
    let span = Node::element("span")
        .with_attr("data-bind-text", "name")
        .with_attr("tr-text", "ignored");

    let _section = binder.bind(&span, Object::new().with("name", "Jack")).unwrap();
    assert_eq!(span.text_content(), "Jack");
}

/// Test that templates need a single element root.
#[test]
fn template_requires_single_root() {
    let binder = Binder::new();
    let fragment = Node::fragment()
        .with_child(Node::element("li"))
        .with_child(Node::text("loose"));
    assert!(matches!(binder.template(&fragment), Err(Error::FragmentRoots(2))));
}

/// Test that a function value is called with no arguments when rendered.
#[test]
fn computed_values_are_called() {
    let first = Object::new().with("first", "Ada").with("last", "Lovelace");
    let person = first.clone();
    let model = first.clone().with(
        "full",
        Function::new(move |_| {
            Value::from(format!("{} {}", person.get("first").to_text(), person.get("last").to_text()))
        }),
    );
    let span = Node::element("span").with_attr("tr-text", "full < first last");

    let _section = Binder::new().bind(&span, model).unwrap();
    assert_eq!(span.text_content(), "Ada Lovelace");

    first.set("last", "Byron");
    assert_eq!(span.text_content(), "Ada Byron");
}
