//! Policy-driven tree filtering used for state extraction and output
//! cleanup.

use crate::node::{Flags, Node, Value};
use crate::scanner::unescape;

/// Decision a [`Policy`] makes for one node.
#[derive(Clone, Debug, PartialEq)]
pub enum Visit<P> {
    /// Keep the node and its whole subtree.
    Keep,
    /// Drop the node.
    Discard,
    /// Emit this node in place of the visited one.
    Replace(Node),
    /// Filter the children with `policy`.
    Descend {
        /// Policy applied to every child.
        policy: P,
        /// Keep the container even when no child survives.
        retain: bool,
    },
}

/// Per-node filtering decision.
pub trait Policy: Sized {
    /// Decide what happens to `node`.
    fn visit(&self, node: &Node) -> Visit<Self>;
}

/// Filter `node` with `policy`, returning `None` when the node is dropped.
///
/// ```
/// use strata::flow::{Policy, Visit, filter};
/// use strata::{Native, Node, ingest};
/// use serde_json::json;
///
/// struct Ints;
///
/// impl Policy for Ints {
///     fn visit(&self, node: &Node) -> Visit<Self> {
///         match node.as_int() {
///             Some(_) => Visit::Keep,
///             None if node.as_mapping().is_some() => Visit::Descend {
///                 policy: Ints,
///                 retain: false,
///             },
///             None => Visit::Discard,
///         }
///     }
/// }
///
/// let tree = ingest("doc", &Native::from(json!({"a": 1, "b": "x", "c": {"d": "y"}})))?;
/// let kept = filter(&tree, &Ints).unwrap_or_else(Node::empty_mapping);
/// assert_eq!(serde_json::to_value(&kept)?, json!({"a": 1}));
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn filter<P: Policy>(node: &Node, policy: &P) -> Option<Node> {
    match policy.visit(node) {
        Visit::Keep => Some(node.clone()),
        Visit::Discard => None,
        Visit::Replace(replacement) => Some(replacement),
        Visit::Descend {
            policy: inner,
            retain,
        } => {
            let value = match &node.value {
                Value::Mapping(entries) => {
                    let kept: crate::node::Mapping = entries
                        .iter()
                        .filter_map(|(key, child)| {
                            filter(child, &inner).map(|survivor| (key.clone(), survivor))
                        })
                        .collect();
                    (retain || !kept.is_empty()).then_some(Value::Mapping(kept))
                }
                Value::Sequence(items) => {
                    let kept: Vec<Node> = items
                        .iter()
                        .filter_map(|child| filter(child, &inner))
                        .collect();
                    (retain || !kept.is_empty()).then_some(Value::Sequence(kept))
                }
                scalar => retain.then(|| scalar.clone()),
            }?;
            Some(Node {
                value,
                flags: node.flags,
                merge: node.merge.clone(),
                origin: node.origin.clone(),
            })
        }
    }
}

/// Keeps `&state` nodes and the containers leading to them.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatePolicy;

impl Policy for StatePolicy {
    fn visit(&self, node: &Node) -> Visit<Self> {
        if node.flags.contains(Flags::STATE) {
            Visit::Keep
        } else {
            Visit::Descend {
                policy: Self,
                retain: false,
            }
        }
    }
}

/// Shapes the resolved tree for output: drops `&temporary` and `&local`
/// nodes and unescapes escaped expression text.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputPolicy {
    keep_temporary: bool,
}

impl OutputPolicy {
    /// Output policy; `keep_temporary` retains temporary and local nodes.
    #[must_use]
    pub const fn new(keep_temporary: bool) -> Self {
        Self { keep_temporary }
    }
}

impl Policy for OutputPolicy {
    fn visit(&self, node: &Node) -> Visit<Self> {
        if !self.keep_temporary && node.flags.intersects(Flags::TEMPORARY | Flags::LOCAL) {
            return Visit::Discard;
        }
        match &node.value {
            Value::String(text) if node.flags.contains(Flags::ESCAPED) => {
                let plain = unescape(text).unwrap_or_else(|| text.clone());
                let mut replacement = node.clone();
                replacement.value = Value::String(plain);
                replacement.flags.remove(Flags::ESCAPED);
                Visit::Replace(replacement)
            }
            Value::Mapping(_) | Value::Sequence(_) => Visit::Descend {
                policy: *self,
                retain: true,
            },
            _ => Visit::Keep,
        }
    }
}

/// Subtree of `tree` holding only `&state` nodes and their ancestors.
#[must_use]
pub fn extract_state(tree: &Node) -> Node {
    filter(tree, &StatePolicy).unwrap_or_else(Node::empty_mapping)
}
