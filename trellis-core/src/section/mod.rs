//! Sections
//!
//! A [`Section`] is a bound region of the tree: one root node, the scope its
//! expressions resolve against, and one binding per marker found under the
//! root. Structural directives own nested sections, and every lifecycle
//! transition cascades through them.
//!
//! ```text
//! Constructed --initialize--> Initialized --connect--> Connected
//!                                             ^             |
//!                                             |         disconnect
//!                                             |             v
//!                                             +-------- Disconnected
//!
//! any state --destroy--> Destroyed (terminal)
//! ```
//!
//! A marker whose expression fails to compile, or whose directive refuses to
//! construct, is skipped; the error is kept in [`Section::failures`] and the
//! rest of the section binds normally.

mod binding;
mod context;
mod template;
mod traverse;

pub use context::{DirectiveContext, Publisher};
pub use template::Template;
pub use traverse::Marker;

use tracing::{debug, error};

use crate::config::Binder;
use crate::dom::Node;
use crate::error::{Error, Result};
use crate::scope::Scope;

use binding::Binding;
use traverse::Plan;

/// Lifecycle state of a [`Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Constructed,
    Initialized,
    Connected,
    Disconnected,
    Destroyed,
}

/// A bound region of the tree.
pub struct Section {
    binder: Binder,
    root: Node,
    scope: Scope,
    bindings: Vec<Binding>,
    state: SectionState,
    failures: Vec<Error>,
}

impl Section {
    /// Discover markers under `root` and construct their directives.
    pub(crate) fn scan(binder: &Binder, root: Node, scope: Scope) -> Self {
        let plan = Plan::record(binder, &root, None);
        Self::build(binder, root, scope, &plan)
    }

    /// Construct directives for markers already recorded in `plan`.
    pub(crate) fn build(binder: &Binder, root: Node, scope: Scope, plan: &Plan) -> Self {
        let built = traverse::build(binder, &root, &scope, plan);
        debug!(
            root = ?root.tag_name(),
            bindings = built.bindings.len(),
            failures = built.failures.len(),
            "section built"
        );
        Self {
            binder: binder.clone(),
            root,
            scope,
            bindings: built.bindings,
            state: SectionState::Constructed,
            failures: built.failures,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SectionState::Connected
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Markers that were skipped while building, wrapped in
    /// [`Error::Marker`].
    pub fn failures(&self) -> &[Error] {
        &self.failures
    }

    pub fn take_failures(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.failures)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state == SectionState::Destroyed {
            return Err(Error::SectionDestroyed);
        }
        Ok(())
    }

    /// Run every directive's one-time setup. Idempotent.
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.state != SectionState::Constructed {
            return Ok(());
        }
        debug!(root = ?self.root.tag_name(), "initializing section");
        for binding in &self.bindings {
            if let Some(Err(err)) = binding.with_directive(|directive| directive.initialize()) {
                error!(attribute = binding.attribute(), error = %err, "directive initialization failed");
            }
        }
        self.state = SectionState::Initialized;
        Ok(())
    }

    /// Observe the model and apply current values, initializing first if
    /// needed. Without a notifier the section renders once and stays static.
    pub fn connect(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.state == SectionState::Connected {
            return Ok(());
        }
        self.initialize()?;
        debug!(root = ?self.root.tag_name(), "connecting section");
        for binding in &self.bindings {
            match binding.connect() {
                Ok(()) => {}
                Err(Error::NoObserverConfigured) => self.binder.note_static_render(),
                Err(err) => {
                    error!(attribute = binding.attribute(), error = %err, "binding failed to connect")
                }
            }
            if let Some(Err(err)) = binding.with_directive(|directive| directive.connect()) {
                error!(attribute = binding.attribute(), error = %err, "directive connect failed");
            }
        }
        self.state = SectionState::Connected;
        Ok(())
    }

    /// Stop observing. Nested sections are disconnected with their owners.
    pub fn disconnect(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.state != SectionState::Connected {
            return Ok(());
        }
        debug!(root = ?self.root.tag_name(), "disconnecting section");
        self.release();
        self.state = SectionState::Disconnected;
        Ok(())
    }

    /// Tear the section down: disconnect, destroy every directive, detach the
    /// root and drop the bindings. Every later call fails with
    /// [`Error::SectionDestroyed`].
    pub fn destroy(&mut self) -> Result<()> {
        self.ensure_live()?;
        debug!(root = ?self.root.tag_name(), "destroying section");
        if self.state == SectionState::Connected {
            self.release();
        }
        for binding in &self.bindings {
            binding.with_directive(|directive| directive.destroy());
        }
        self.root.detach();
        self.bindings.clear();
        self.state = SectionState::Destroyed;
        Ok(())
    }

    fn release(&self) {
        for binding in &self.bindings {
            binding.disconnect();
            binding.with_directive(|directive| directive.disconnect());
        }
    }
}

impl Drop for Section {
    fn drop(&mut self) {
        if self.state == SectionState::Connected {
            for binding in &self.bindings {
                if binding.is_connected() {
                    binding.disconnect();
                }
            }
        }
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("root", &self.root)
            .field("state", &self.state)
            .field("bindings", &self.bindings.len())
            .field("failures", &self.failures)
            .finish()
    }
}
