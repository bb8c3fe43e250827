//! Stub folding and template overlay.
//!
//! Stubs are folded left to right into a single overlay, later stubs
//! winning unless the earlier node is locked. The overlay is then laid over
//! the template: template nodes whose path exists in the overlay take the
//! overlay value while keeping their own markers.

use std::borrow::Borrow;

use tracing::{trace, warn};

use crate::node::{Flags, Mapping, MergeKind, Node, NodePath, Value};

/// Fold `stubs` (lowest priority first) into one overlay document.
pub(super) fn fold_stubs(stubs: impl IntoIterator<Item = Node>) -> Node {
    let root = NodePath::root();
    stubs
        .into_iter()
        .fold(Node::empty_mapping(), |base, top| fold(base, top, &root))
}

fn fold(base: Node, top: Node, path: &NodePath) -> Node {
    if base.flags.contains(Flags::OVERRIDE_LOCK) {
        warn!(
            path = %path,
            source = top.origin.source(),
            "locked stub value kept over a later override"
        );
        return base;
    }
    if matches!(top.merge, Some(MergeKind::Replace)) {
        return top;
    }
    let Node {
        value: top_value,
        flags,
        merge,
        origin,
    } = top;
    let folded = match (base.value, top_value) {
        (Value::Mapping(mut entries), Value::Mapping(more)) => {
            for (key, child) in more {
                let child_path = path.key(&key);
                if let Some(slot) = entries.get_mut(&key) {
                    let current = std::mem::replace(slot, Node::null());
                    *slot = fold(current, child, &child_path);
                } else {
                    entries.insert(key, child);
                }
            }
            Value::Mapping(entries)
        }
        (Value::Sequence(items), Value::Sequence(more)) => {
            match merge.as_ref().and_then(MergeKind::element_key) {
                Some((key, at)) => Value::Sequence(merge_elements(
                    items,
                    more,
                    key,
                    at,
                    |current, next| fold(current, next, path),
                    |next| next,
                )),
                None => Value::Sequence(more),
            }
        }
        (_, other) => other,
    };
    Node {
        value: folded,
        flags,
        merge,
        origin,
    }
}

/// Lay `overlay` over `template`.
pub(super) fn merge_template(template: Node, overlay: &Node) -> Node {
    overlay_node(template, overlay, &NodePath::root())
}

fn overlay_node(node: Node, stub: &Node, path: &NodePath) -> Node {
    if node.flags.intersects(Flags::OVERRIDE_LOCK | Flags::LOCAL) {
        return node;
    }
    let Node {
        value,
        flags,
        merge,
        origin,
    } = node;
    let merged = match (value, &stub.value, merge.as_ref()) {
        (_, _, Some(MergeKind::Replace)) => return substitute(flags, stub, path),
        (Value::Mapping(entries), Value::Mapping(stub_entries), kind) => {
            let include = matches!(kind, Some(MergeKind::Include));
            Value::Mapping(overlay_entries(entries, stub_entries, include, path))
        }
        (Value::Sequence(items), Value::Sequence(stub_items), Some(kind)) => {
            let Some((key, at)) = kind.element_key() else {
                return substitute(flags, stub, path);
            };
            Value::Sequence(merge_elements(
                items,
                stub_items.iter(),
                key,
                at,
                |current, next| overlay_node(current, next, path),
                Node::clone,
            ))
        }
        _ => return substitute(flags, stub, path),
    };
    Node {
        value: merged,
        flags,
        merge,
        origin,
    }
}

fn overlay_entries(
    entries: Mapping,
    stub_entries: &Mapping,
    include: bool,
    path: &NodePath,
) -> Mapping {
    let mut merged = Mapping::with_capacity(entries.len());
    for (key, child) in entries {
        let next = match stub_entries.get(&key) {
            Some(stub_child) => overlay_node(child, stub_child, &path.key(&key)),
            None => child,
        };
        merged.insert(key, next);
    }
    if include {
        for (key, stub_child) in stub_entries {
            if !merged.contains_key(key) {
                trace!(path = %path.key(key), "included stub-only key");
                merged.insert(key.clone(), stub_child.clone());
            }
        }
    }
    merged
}

/// Replace a template node by a clone of its overlay counterpart, keeping
/// the template's persistence and scoping markers.
fn substitute(flags: Flags, stub: &Node, path: &NodePath) -> Node {
    trace!(path = %path, source = stub.origin.source(), "stub value substituted");
    let mut replacement = stub.clone();
    replacement.flags |= flags & Flags::CARRIED;
    replacement
}

/// Merge `top` into `base` element-wise on the `key` field. Matching
/// elements are combined in place; the rest are inserted at `at`, in order.
fn merge_elements<T: Borrow<Node>>(
    mut base: Vec<Node>,
    top: impl IntoIterator<Item = T>,
    key: &str,
    at: usize,
    mut combine: impl FnMut(Node, T) -> Node,
    adopt: impl Fn(T) -> Node,
) -> Vec<Node> {
    let mut unmatched = Vec::new();
    for item in top {
        let position = item.borrow().get(key).and_then(|wanted| {
            base.iter()
                .position(|candidate| candidate.get(key) == Some(wanted))
        });
        match position.and_then(|index| base.get_mut(index)) {
            Some(slot) => {
                let current = std::mem::replace(slot, Node::null());
                *slot = combine(current, item);
            }
            None => unmatched.push(adopt(item)),
        }
    }
    let tail = base.split_off(at.min(base.len()));
    base.extend(unmatched);
    base.extend(tail);
    base
}
