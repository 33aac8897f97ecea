//! Marker discovery, recorded plans and the per-element build loop.

use std::rc::Rc;

use tracing::{error, trace};

use crate::config::Binder;
use crate::directive::Registration;
use crate::dom::Node;
use crate::error::{Error, Result};
use crate::expr::Compiler;
use crate::scope::Scope;

use super::binding::Binding;
use super::context::DirectiveContext;

/// A prefixed attribute matched to a registration.
#[derive(Debug, Clone)]
pub struct Marker {
    pub attribute: String,
    pub source: String,
    pub registration: Rc<Registration>,
    pub param: Option<String>,
}

/// Markers on `element`, highest priority first. Ties keep attribute order.
pub(crate) fn discover(binder: &Binder, element: &Node) -> Vec<Marker> {
    let prefix = binder.options().prefix.to_ascii_lowercase();
    let mut markers: Vec<Marker> = element
        .attributes()
        .into_iter()
        .filter_map(|(attribute, source)| {
            let name = attribute.strip_prefix(prefix.as_str())?;
            match binder.registry().lookup(name) {
                Some(found) => Some(Marker {
                    registration: found.registration,
                    param: found.param,
                    attribute,
                    source,
                }),
                None => {
                    trace!(%attribute, "no directive registered; marker is inert");
                    None
                }
            }
        })
        .collect();
    markers.sort_by_key(|marker| std::cmp::Reverse(marker.registration.get_priority()));
    markers
}

/// One element's markers, addressed by child indexes from the plan's root.
#[derive(Debug)]
pub(crate) struct Step {
    pub(crate) path: Vec<usize>,
    pub(crate) markers: Vec<Marker>,
}

/// The markers of every element under a root, discovered once.
///
/// A plan recorded from a template fits every clone of it, so stamping
/// resolves elements by position instead of scanning attributes again.
#[derive(Debug, Clone)]
pub(crate) struct Plan(Rc<[Step]>);

impl Plan {
    /// Scan `root` and its element descendants. `root_markers` replaces
    /// discovery on the root itself.
    pub(crate) fn record(binder: &Binder, root: &Node, root_markers: Option<Vec<Marker>>) -> Self {
        let mut steps = vec![Step {
            path: Vec::new(),
            markers: root_markers.unwrap_or_else(|| discover(binder, root)),
        }];
        record_children(binder, root, &mut Vec::new(), &mut steps);
        Self(steps.into())
    }

    /// The part of the plan below `path`, rooted there with `root_markers`.
    pub(crate) fn within(&self, path: &[usize], root_markers: Vec<Marker>) -> Self {
        let root = Step {
            path: Vec::new(),
            markers: root_markers,
        };
        let below = self.0.iter().filter_map(|step| {
            let rest = step.path.strip_prefix(path)?;
            (!rest.is_empty()).then(|| Step {
                path: rest.to_vec(),
                markers: step.markers.clone(),
            })
        });
        Self(std::iter::once(root).chain(below).collect())
    }

    /// Number of elements carrying markers, the root always included.
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

fn record_children(binder: &Binder, parent: &Node, path: &mut Vec<usize>, steps: &mut Vec<Step>) {
    for (i, child) in parent.children().into_iter().enumerate() {
        if !child.is_element() {
            continue;
        }
        path.push(i);
        let markers = discover(binder, &child);
        if !markers.is_empty() {
            steps.push(Step {
                path: path.clone(),
                markers,
            });
        }
        record_children(binder, &child, path, steps);
        path.pop();
    }
}

fn resolve(root: &Node, path: &[usize]) -> Option<Node> {
    path.iter()
        .try_fold(root.clone(), |node, &i| node.children().into_iter().nth(i))
}

/// The outcome of building every marker under a root.
#[derive(Default)]
pub(crate) struct Built {
    pub bindings: Vec<Binding>,
    pub failures: Vec<Error>,
}

/// Construct a binding per recorded marker under `root`, in document order.
///
/// An element claimed by a structural directive is handed over whole; the
/// directive builds its descendants from the part of `plan` below it.
pub(crate) fn build(binder: &Binder, root: &Node, scope: &Scope, plan: &Plan) -> Built {
    let mut built = Built::default();
    let mut claimed: Vec<Node> = Vec::new();

    let steps: Vec<(&Step, Node)> = plan
        .0
        .iter()
        .filter_map(|step| match resolve(root, &step.path) {
            Some(element) => Some((step, element)),
            None => {
                trace!(path = ?step.path, "recorded element is gone");
                None
            }
        })
        .collect();

    for (step, element) in steps {
        if claimed.iter().any(|owner| owner.contains(&element)) || !root.contains(&element) {
            continue;
        }
        for index in 0..step.markers.len() {
            if bind_marker(binder, &element, scope, plan, step, index, &mut built) {
                claimed.push(element.clone());
                break;
            }
        }
    }
    built
}

/// Returns whether the directive claimed the element.
fn bind_marker(
    binder: &Binder,
    element: &Node,
    scope: &Scope,
    plan: &Plan,
    step: &Step,
    index: usize,
    built: &mut Built,
) -> bool {
    let marker = &step.markers[index];
    let atom = match Compiler::new(binder.filters())
        .with_element(element)
        .compile(&marker.source)
    {
        Ok(atom) => Rc::new(atom),
        Err(err) => {
            record(built, marker, err);
            return false;
        }
    };

    let ctx = DirectiveContext::new(binder, element, scope, &atom, plan, step, index);
    let constructed: Result<_> = marker.registration.construct(&ctx);
    built.failures.extend(ctx.take_failures());
    match constructed {
        Ok(directive) => {
            trace!(attribute = %marker.attribute, expression = %atom, "bound marker");
            built.bindings.push(Binding::new(
                marker.attribute.clone(),
                atom.clone(),
                scope.clone(),
                &marker.registration,
                directive,
                binder.notifier(),
            ));
        }
        Err(err) => record(built, marker, err),
    }
    ctx.is_claimed()
}

fn record(built: &mut Built, marker: &Marker, err: Error) {
    error!(attribute = %marker.attribute, source = %marker.source, error = %err, "marker skipped");
    built.failures.push(err.in_marker(&marker.attribute));
}
