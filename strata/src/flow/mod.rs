//! Flow engine: stub merge, fixpoint resolution, classification and state
//! extraction.
//!
//! [`Cascade`] assembles one run. Stubs are folded into an overlay (a prior
//! state document, when given, is the lowest-priority stub), the overlay is
//! laid over the template, and every pending expression in the three
//! documents is evaluated pass by pass until nothing changes. Template nodes
//! still pending at that point are classified and reported.

mod classify;
mod fixpoint;
mod merge;
mod walk;

pub use walk::{OutputPolicy, Policy, StatePolicy, Visit, extract_state, filter};

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::StrataResult;
use crate::error::{NodeError, StrataError, UnresolvedReport};
use crate::node::{Node, NodePath, Value};
use crate::registry::Registry;

/// Knobs for one resolution run.
///
/// ```
/// use strata::ResolveOptions;
///
/// let options: ResolveOptions = serde_json::from_str(r#"{"partial": true}"#)?;
/// assert!(options.partial);
/// assert!(!options.keep_temporary);
/// # Ok::<_, serde_json::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    /// Accept unresolved nodes: [`Resolution::into_result`] returns the
    /// best-effort tree instead of failing.
    pub partial: bool,
    /// Keep `&temporary` and `&local` nodes in the output.
    pub keep_temporary: bool,
}

/// Terminal state of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Every template expression has a value.
    Resolved,
    /// Some template expressions could not be resolved.
    Stuck,
}

/// Outcome of a resolution run.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Output tree; unresolved leaves hold [`Value::Unresolved`].
    pub tree: Node,
    /// Classified failures, sorted by path.
    pub errors: Vec<NodeError>,
    /// Number of fixpoint passes run.
    pub passes: usize,
    /// Terminal state.
    pub status: Status,
    state: Node,
    partial: bool,
}

impl Resolution {
    /// Subtree of `&state` nodes, suitable for [`Cascade::with_state`] on the
    /// next run.
    #[must_use]
    pub const fn state(&self) -> &Node {
        &self.state
    }

    /// The output tree, or the classified errors.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Unresolved`] carrying every node error and the
    /// partial tree when the run got stuck, unless partial output was
    /// requested.
    pub fn into_result(self) -> StrataResult<Node> {
        if self.errors.is_empty() || self.partial {
            return Ok(self.tree);
        }
        Err(Arc::new(StrataError::Unresolved(Box::new(
            UnresolvedReport::new(self.errors, self.tree),
        ))))
    }
}

/// Builder for one resolution run.
///
/// ```
/// use strata::{Cascade, Native, Registry, ingest};
/// use serde_json::json;
///
/// let registry = Registry::standard()?;
/// let template = ingest("template", &Native::from(json!({
///     "port": 80,
///     "url": "(( \"http://\" host \":\" port ))",
/// })))?;
/// let stub = ingest("stub", &Native::from(json!({"host": "example.org", "port": 8080})))?;
///
/// let tree = Cascade::new(&registry, template).push_stub(stub).resolve().into_result()?;
/// assert_eq!(
///     serde_json::to_value(&tree)?,
///     json!({"port": 8080, "url": "http://example.org:8080"})
/// );
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Cascade<'r> {
    registry: &'r Registry,
    template: Node,
    stubs: Vec<Node>,
    state: Option<Node>,
    options: ResolveOptions,
}

impl<'r> Cascade<'r> {
    /// Start a run for `template` with no stubs.
    #[must_use]
    pub const fn new(registry: &'r Registry, template: Node) -> Self {
        Self {
            registry,
            template,
            stubs: Vec::new(),
            state: None,
            options: ResolveOptions {
                partial: false,
                keep_temporary: false,
            },
        }
    }

    /// Add a stub with higher priority than every stub added before it.
    #[must_use]
    pub fn push_stub(mut self, stub: Node) -> Self {
        self.stubs.push(stub);
        self
    }

    /// Add several stubs, lowest priority first.
    #[must_use]
    pub fn stubs(mut self, stubs: impl IntoIterator<Item = Node>) -> Self {
        self.stubs.extend(stubs);
        self
    }

    /// State extracted from a previous run.
    #[must_use]
    pub fn with_state(mut self, state: Node) -> Self {
        self.state = Some(state);
        self
    }

    /// Replace the run options.
    #[must_use]
    pub const fn options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Merge and resolve.
    #[must_use]
    pub fn resolve(self) -> Resolution {
        let Self {
            registry,
            template,
            stubs,
            state,
            options,
        } = self;
        debug!(stubs = stubs.len(), state = state.is_some(), "resolving cascade");
        let overlay = merge::fold_stubs(state.iter().cloned().chain(stubs));
        let merged = merge::merge_template(template, &overlay);
        let mut snapshot = fixpoint::Snapshot::new(merged, overlay, state);
        let outcome = fixpoint::run(registry, &mut snapshot);
        let errors = classify::classify(&outcome.blocked);

        let mut tree = snapshot.into_template();
        let status = if mark_unresolved(&mut tree) == 0 {
            Status::Resolved
        } else {
            Status::Stuck
        };
        debug!(passes = outcome.passes, ?status, errors = errors.len(), "cascade finished");

        let state_tree = extract_state(&tree);
        let output = filter(&tree, &OutputPolicy::new(options.keep_temporary))
            .unwrap_or_else(Node::empty_mapping);
        Resolution {
            tree: output,
            errors,
            passes: outcome.passes,
            status,
            state: state_tree,
            partial: options.partial,
        }
    }
}

/// Resolve `template` against `stubs` (lowest priority first) with default
/// options.
#[must_use]
pub fn resolve(
    registry: &Registry,
    template: Node,
    stubs: impl IntoIterator<Item = Node>,
) -> Resolution {
    Cascade::new(registry, template).stubs(stubs).resolve()
}

/// Replace every pending node left in `tree` by its placeholder, returning
/// how many were replaced.
fn mark_unresolved(tree: &mut Node) -> usize {
    let pending = tree.pending_paths(&NodePath::root());
    for path in &pending {
        let Some(node) = tree.at_mut(path) else {
            continue;
        };
        let Value::Pending(expression) = &node.value else {
            continue;
        };
        let source = expression.source().to_owned();
        node.settle(Value::Unresolved(source));
    }
    pending.len()
}
