//! Pass loop driving every pending node to a value.
//!
//! Each pass evaluates all pending nodes against the same snapshot and only
//! then writes the resolved values back, so the outcome of a pass does not
//! depend on evaluation order. Failures are retried while other nodes keep
//! settling. When a pass settles nothing, the loop gives up on failed and
//! cyclic nodes and runs again so that `//` can fall back past them; each
//! such pass must give up on more nodes or the loop stops. With `n` pending
//! nodes that bounds a run to `(n + 1)^2` passes, which is also the ceiling.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::classify::cycle_through;
use crate::binding::{Binding, Document, Documents, NodeRef};
use crate::eval::{EvalError, EvalResult, Evaluation, evaluate, resolved};
use crate::node::{Flags, Node, NodePath, Value};
use crate::registry::Registry;

/// Why a node is still pending after the loop.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum Blocked {
    /// Deferred on these nodes in the last pass.
    On(Vec<NodeRef>),
    /// The node's own expression failed.
    Failed(EvalError),
}

/// Documents owned by one resolution run.
#[derive(Debug)]
pub(super) struct Snapshot {
    template: Node,
    stubs: Node,
    state: Option<Node>,
}

impl Snapshot {
    pub(super) const fn new(template: Node, stubs: Node, state: Option<Node>) -> Self {
        Self {
            template,
            stubs,
            state,
        }
    }

    const fn view(&self) -> Documents<'_> {
        Documents {
            template: &self.template,
            stubs: &self.stubs,
            state: self.state.as_ref(),
        }
    }

    const fn root_mut(&mut self, document: Document) -> Option<&mut Node> {
        match document {
            Document::Template => Some(&mut self.template),
            Document::Stubs => Some(&mut self.stubs),
            Document::State => self.state.as_mut(),
        }
    }

    fn pending(&self) -> Vec<NodeRef> {
        let root = NodePath::root();
        let mut found: Vec<NodeRef> = Vec::new();
        for document in [Document::Template, Document::Stubs, Document::State] {
            if let Some(node) = self.view().root(document) {
                found.extend(
                    node.pending_paths(&root)
                        .into_iter()
                        .map(|path| NodeRef::new(document, path)),
                );
            }
        }
        found
    }

    pub(super) fn into_template(self) -> Node {
        self.template
    }

    fn settle(&mut self, target: &NodeRef, node: Node) {
        let Some(slot) = self
            .root_mut(target.document)
            .and_then(|root| root.at_mut(&target.path))
        else {
            return;
        };
        slot.flags |= node.flags & Flags::ESCAPED;
        slot.settle(node.into_value());
    }
}

/// Terminal state of the loop.
#[derive(Debug, Default)]
pub(super) struct Outcome {
    /// Number of passes run.
    pub(super) passes: usize,
    /// Every node left pending, with the reason.
    pub(super) blocked: BTreeMap<NodeRef, Blocked>,
}

pub(super) fn run(registry: &Registry, snapshot: &mut Snapshot) -> Outcome {
    let mut pending = snapshot.pending();
    let ceiling = pending.len().saturating_add(1).saturating_pow(2);
    let mut outcome = Outcome::default();
    let mut abandoned: BTreeSet<NodeRef> = BTreeSet::new();

    while !pending.is_empty() && outcome.passes < ceiling {
        outcome.passes += 1;
        let results: Vec<(NodeRef, EvalResult)> = pending
            .into_iter()
            .map(|target| {
                let result = step(registry, snapshot.view(), &abandoned, &target);
                (target, result)
            })
            .collect();

        outcome.blocked.clear();
        let mut still_pending = Vec::new();
        let mut settled = 0_usize;
        for (target, result) in results {
            let reason = match result {
                Ok(Evaluation::Resolved(node)) => {
                    snapshot.settle(&target, node);
                    settled += 1;
                    continue;
                }
                Ok(Evaluation::Deferred(blockers)) => Blocked::On(dedup(blockers)),
                Err(err) => Blocked::Failed(err),
            };
            outcome.blocked.insert(target.clone(), reason);
            still_pending.push(target);
        }
        pending = still_pending;
        debug!(
            pass = outcome.passes,
            resolved = settled,
            pending = pending.len(),
            abandoned = abandoned.len(),
            "fixpoint pass"
        );
        if settled > 0 {
            abandoned.clear();
            continue;
        }
        let hopeless = give_up(&outcome.blocked, &abandoned);
        if hopeless.len() == abandoned.len() {
            break;
        }
        abandoned = hopeless;
    }

    debug!(
        passes = outcome.passes,
        unresolved = outcome.blocked.len(),
        "fixpoint finished"
    );
    outcome
}

/// Nodes a stuck loop stops waiting for: failures, members of a deferral
/// cycle, and nodes that only wait on nodes already given up.
fn give_up(
    blocked: &BTreeMap<NodeRef, Blocked>,
    abandoned: &BTreeSet<NodeRef>,
) -> BTreeSet<NodeRef> {
    let mut hopeless = abandoned.clone();
    for (target, reason) in blocked {
        let lost = match reason {
            Blocked::Failed(_) => true,
            Blocked::On(blockers) => {
                let waits_on_lost = !blockers.is_empty()
                    && blockers.iter().all(|blocker| abandoned.contains(blocker));
                waits_on_lost || cycle_through(target, blocked).is_some()
            }
        };
        if lost {
            hopeless.insert(target.clone());
        }
    }
    hopeless
}

fn step(
    registry: &Registry,
    documents: Documents<'_>,
    abandoned: &BTreeSet<NodeRef>,
    target: &NodeRef,
) -> EvalResult {
    let Some(node) = documents
        .root(target.document)
        .and_then(|root| root.at(&target.path))
    else {
        return Err(EvalError::UnknownReference(target.to_string()));
    };
    let Value::Pending(pending) = node.value() else {
        return resolved(node.clone());
    };
    let expression = pending.parsed().as_ref().map_err(|err| EvalError::Parse(err.clone()))?;
    match &expression.body {
        Some(body) => {
            let binding = Binding::new(documents, registry, target.document, target.path.clone());
            if abandoned.is_empty() {
                evaluate(body, &binding)
            } else {
                evaluate(body, &binding.abandoning(abandoned))
            }
        }
        None => resolved(Node::null()),
    }
}

fn dedup(blockers: Vec<NodeRef>) -> Vec<NodeRef> {
    let mut unique: Vec<NodeRef> = Vec::with_capacity(blockers.len());
    for blocker in blockers {
        if !unique.contains(&blocker) {
            unique.push(blocker);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, ensure};
    use rstest::rstest;
    use serde_json::json;

    use super::{Blocked, Snapshot, run};
    use crate::binding::{Document, NodeRef};
    use crate::ingest::{Native, ingest};
    use crate::node::{Node, NodePath};
    use crate::registry::Registry;

    fn snapshot(template: serde_json::Value) -> Result<Snapshot> {
        Ok(Snapshot::new(
            ingest("template", &Native::from(template))?,
            Node::empty_mapping(),
            None,
        ))
    }

    #[rstest]
    fn resolves_chains_within_the_pass_ceiling() -> Result<()> {
        let registry = Registry::standard()?;
        let mut documents = snapshot(json!({
            "a": "(( b + 1 ))",
            "b": "(( c + 1 ))",
            "c": "(( d + 1 ))",
            "d": 0
        }))?;
        let outcome = run(&registry, &mut documents);
        ensure!(outcome.blocked.is_empty(), "blocked: {:?}", outcome.blocked);
        ensure!(outcome.passes == 3);
        let tree = documents.into_template();
        ensure!(serde_json::to_value(&tree)? == json!({"a": 3, "b": 2, "c": 1, "d": 0}));
        Ok(())
    }

    #[rstest]
    fn records_failures_and_deferrals() -> Result<()> {
        let registry = Registry::standard()?;
        let mut documents = snapshot(json!({
            "bad": "(( 1 / 0 ))",
            "waits": "(( bad ))",
            "ok": "(( 2 ))"
        }))?;
        let outcome = run(&registry, &mut documents);
        let bad = NodeRef::new(Document::Template, NodePath::root().key("bad"));
        let waits = NodeRef::new(Document::Template, NodePath::root().key("waits"));
        ensure!(matches!(outcome.blocked.get(&bad), Some(Blocked::Failed(_))));
        ensure!(outcome.blocked.get(&waits) == Some(&Blocked::On(vec![bad])));
        ensure!(outcome.blocked.len() == 2);
        Ok(())
    }

    #[rstest]
    fn no_pending_nodes_means_no_passes() -> Result<()> {
        let registry = Registry::standard()?;
        let mut documents = snapshot(json!({"a": 1}))?;
        let outcome = run(&registry, &mut documents);
        ensure!(outcome.passes == 0 && outcome.blocked.is_empty());
        Ok(())
    }
}
