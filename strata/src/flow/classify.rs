//! Terminal classification of nodes left pending by the fixpoint loop.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::fixpoint::Blocked;
use crate::binding::{Document, NodeRef};
use crate::error::{Classification, ErrorKind, NodeError};

/// Classify every blocked template node, sorted by rendered path.
pub(super) fn classify(blocked: &BTreeMap<NodeRef, Blocked>) -> Vec<NodeError> {
    let mut errors: Vec<NodeError> = blocked
        .iter()
        .filter(|(target, _)| target.document == Document::Template)
        .map(|(target, reason)| classify_one(target, reason, blocked))
        .collect();
    errors.sort_by_cached_key(|error| error.path.to_string());
    errors
}

fn classify_one(
    target: &NodeRef,
    reason: &Blocked,
    blocked: &BTreeMap<NodeRef, Blocked>,
) -> NodeError {
    let path = target.path.clone();
    let blockers = match reason {
        Blocked::Failed(err) => {
            return NodeError {
                path,
                classification: Classification::Local,
                kind: err.kind(),
                message: err.to_string(),
            };
        }
        Blocked::On(blockers) => blockers,
    };
    if let Some(cycle) = cycle_through(target, blocked) {
        let rendered: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        return NodeError {
            path,
            classification: Classification::Cyclic,
            kind: ErrorKind::Cycle,
            message: format!("dependency cycle: {}", rendered.join(" -> ")),
        };
    }
    let culprit = blockers
        .iter()
        .find(|blocker| blocked.contains_key(*blocker))
        .or_else(|| blockers.first());
    let message = culprit.map_or_else(
        || "unresolved dependency".to_owned(),
        |blocker| format!("unresolved dependency '{blocker}'"),
    );
    NodeError {
        path,
        classification: Classification::Propagated,
        kind: ErrorKind::UnresolvedDependency,
        message,
    }
}

fn edges<'b>(node: &NodeRef, blocked: &'b BTreeMap<NodeRef, Blocked>) -> &'b [NodeRef] {
    match blocked.get(node) {
        Some(Blocked::On(blockers)) => blockers,
        _ => &[],
    }
}

/// Shortest deferral path leading from `start` back to itself, rendered as
/// `start -> … -> start`.
pub(super) fn cycle_through(
    start: &NodeRef,
    blocked: &BTreeMap<NodeRef, Blocked>,
) -> Option<Vec<NodeRef>> {
    let mut parents: BTreeMap<&NodeRef, &NodeRef> = BTreeMap::new();
    let mut seen: BTreeSet<&NodeRef> = BTreeSet::new();
    let mut queue: VecDeque<&NodeRef> = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in edges(current, blocked) {
            if next == start {
                let mut cycle = vec![start.clone(), current.clone()];
                let mut cursor = current;
                while let Some(&parent) = parents.get(cursor) {
                    cycle.push(parent.clone());
                    cursor = parent;
                }
                cycle.reverse();
                return Some(cycle);
            }
            if seen.insert(next) {
                parents.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}
