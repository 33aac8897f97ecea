//! `each-<item>`: one stamped section per array element.
//!
//! The element becomes a template and is replaced by an end comment. Each
//! item section is inserted before that marker between a pair of anchor
//! comments owned by the list, and kept in step with the array by
//! [`reconcile`]:
//!
//! ```text
//! <ul>
//!   <!-- tr-each-todo -->  <li>a</li>  <!-- /tr-each-todo -->
//!   <!-- tr-each-todo -->  <!-- tr-if: todo.visible -->  <!-- /tr-each-todo -->
//!   <!-- end tr-each-todo -->
//! </ul>
//! ```
//!
//! Moves and replacements act on the whole anchored range, so an item whose
//! root is currently swapped out (by `if`, say) still keeps its place.
//! Reordering the array moves existing nodes instead of rebuilding them. Each
//! item section sees `<item>` in its scope; everything else resolves through
//! the enclosing scope.

use tracing::{error, warn};

use crate::dom::Node;
use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::section::{DirectiveContext, Section, Template};
use crate::value::Value;

use super::{reconcile, Directive, Materialize};

struct List {
    element: Node,
    end: Node,
    label: String,
    template: Template,
    scope: Scope,
    item: String,
    values: Vec<Value>,
    items: Vec<Item>,
}

pub(super) fn construct(ctx: &DirectiveContext<'_>) -> Result<Box<dyn Directive>> {
    let item = match ctx.param() {
        Some(item) if !item.is_empty() => item.to_string(),
        _ => {
            return Err(Error::Directive(format!(
                "`{}` is missing its item name",
                ctx.attribute()
            )))
        }
    };
    Ok(Box::new(List {
        element: ctx.element().clone(),
        end: Node::comment(&format!(" end {} ", ctx.attribute())),
        label: ctx.attribute().to_string(),
        template: ctx.template(),
        scope: ctx.scope().clone(),
        item,
        values: Vec::new(),
        items: Vec::new(),
    }))
}

/// One stamped section and the comments bracketing its nodes.
struct Item {
    start: Node,
    end: Node,
    section: Section,
}

impl Item {
    /// `start`, `end` and every sibling between them.
    fn range(&self) -> Vec<Node> {
        let mut nodes = vec![self.start.clone()];
        let mut cursor = self.start.next_sibling();
        while let Some(node) = cursor {
            cursor = node.next_sibling();
            let last = node == self.end;
            nodes.push(node);
            if last {
                break;
            }
        }
        nodes
    }

    fn dispose(mut self) {
        let range = self.range();
        if let Err(err) = self.section.destroy() {
            error!(error = %err, "could not destroy list item");
        }
        for node in range {
            node.detach();
        }
    }
}

/// Builds item sections from the template at the list's position.
struct Stamper<'a> {
    template: &'a Template,
    scope: &'a Scope,
    item: &'a str,
    label: &'a str,
    end: &'a Node,
}

impl Stamper<'_> {
    /// Stamp `value` and place it, anchors included, before `reference`.
    fn place(&self, value: &Value, reference: &Node) -> Result<Item> {
        let mut item = Item {
            start: Node::comment(&format!(" {} ", self.label)),
            end: Node::comment(&format!(" /{} ", self.label)),
            section: self.template.stamp(self.scope.scoped(self.item, value.clone())),
        };
        match reference.parent() {
            Some(parent) => {
                for node in [&item.start, item.section.root(), &item.end] {
                    parent.insert_before(node, Some(reference));
                }
            }
            None => warn!("list marker is detached; item is not placed"),
        }
        item.section.connect()?;
        Ok(item)
    }
}

impl Materialize for Stamper<'_> {
    type Item = Item;

    fn append(&mut self, value: &Value) -> Result<Item> {
        self.place(value, self.end)
    }

    fn replace(&mut self, stale: &Item, value: &Value) -> Result<Item> {
        self.place(value, &stale.start)
    }

    fn swap(&mut self, a: &Item, b: &Item) {
        let Some(parent) = a.start.parent() else {
            return;
        };
        let hold = Node::comment("");
        parent.insert_before(&hold, Some(&a.start));
        for node in a.range() {
            parent.insert_before(&node, Some(&b.start));
        }
        for node in b.range() {
            parent.insert_before(&node, Some(&hold));
        }
        hold.detach();
    }

    fn destroy(&mut self, item: Item) {
        item.dispose();
    }
}

impl Directive for List {
    fn initialize(&mut self) -> Result<()> {
        match self.element.parent() {
            Some(parent) => {
                parent.replace_child(&self.end, &self.element);
            }
            None => warn!("list element has no parent; items cannot be placed"),
        }
        Ok(())
    }

    fn execute(&mut self, value: &Value) -> Result<()> {
        let incoming = value.as_array().map(|items| items.to_vec()).unwrap_or_default();
        let mut stamper = Stamper {
            template: &self.template,
            scope: &self.scope,
            item: &self.item,
            label: &self.label,
            end: &self.end,
        };
        reconcile(&mut stamper, &mut self.values, &mut self.items, &incoming)
    }

    fn connect(&mut self) -> Result<()> {
        for item in &mut self.items {
            if !item.section.is_connected() {
                item.section.connect()?;
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        for item in &mut self.items {
            if item.section.is_connected() {
                if let Err(err) = item.section.disconnect() {
                    error!(error = %err, "could not disconnect list item");
                }
            }
        }
    }

    fn destroy(&mut self) {
        for item in self.items.drain(..) {
            item.dispose();
        }
        self.values.clear();
        self.end.detach();
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Binder;
    use crate::dom::Node;
    use crate::value::{Array, Object, Value};

    fn todo(title: &str) -> Value {
        Value::from(Object::new().with("title", title))
    }

    fn titles(list: &Node) -> Vec<String> {
        list.children()
            .iter()
            .filter(|node| node.is_element())
            .map(Node::text_content)
            .collect()
    }

    #[test]
    fn renders_one_item_per_element() {
        let item = Node::element("li")
            .with_attr("tr-each-todo", "todos")
            .with_attr("tr-text", "todo.title");
        let list = Node::element("ul").with_child(item);
        let todos: Array = vec![todo("a"), todo("b")].into_iter().collect();
        let model = Object::new().with("todos", todos.clone());

        let _section = Binder::new().bind(&list, model).unwrap();
        assert_eq!(titles(&list), ["a", "b"]);
        let first = list.children().into_iter().find(Node::is_element).unwrap();
        assert!(!first.has_attribute("tr-each-todo"));

        todos.push(todo("c"));
        assert_eq!(titles(&list), ["a", "b", "c"]);

        todos.remove(0);
        assert_eq!(titles(&list), ["b", "c"]);
    }

    #[test]
    fn non_arrays_render_empty() {
        let item = Node::element("li").with_attr("tr-each-x", "items");
        let list = Node::element("ul").with_child(item);
        let model = Object::new().with("items", "not a list");

        let _section = Binder::new().bind(&list, model.clone()).unwrap();
        assert_eq!(titles(&list).len(), 0);

        let items: Array = vec![Value::from(1)].into_iter().collect();
        model.set("items", items);
        assert_eq!(titles(&list).len(), 1);
    }

    #[test]
    fn item_sections_reach_the_enclosing_scope() {
        let item = Node::element("li")
            .with_attr("tr-each-todo", "todos")
            .with_attr("tr-class-current", "todo.title | eq selected");
        let list = Node::element("ul").with_child(item);
        let todos: Array = vec![todo("a"), todo("b")].into_iter().collect();
        let model = Object::new().with("todos", todos).with("selected", "b");

        let _section = Binder::new().bind(&list, model.clone()).unwrap();
        let marked: Vec<bool> = list
            .children()
            .iter()
            .filter(|node| node.is_element())
            .map(|node| node.has_attribute("class"))
            .collect();
        assert_eq!(marked, [false, true]);
    }
}
