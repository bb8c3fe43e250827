//! Per-node failure reports produced when resolution gets stuck.

use std::fmt;

use crate::node::{Node, NodePath};

/// Terminal category of a node that could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The node's own expression failed (`*`).
    Local,
    /// The node is part of a dependency cycle (`@`).
    Cyclic,
    /// The node waits on a failed or cyclic node (`-`).
    Propagated,
}

impl Classification {
    /// Single-character marker used in reports.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Local => '*',
            Self::Cyclic => '@',
            Self::Propagated => '-',
        }
    }
}

/// Failure taxonomy for node errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed expression text.
    Parse,
    /// Operator or function applied to incompatible kinds.
    Type,
    /// Reference to a name no scope defines.
    UnknownReference,
    /// A registered function or validator failed.
    Function,
    /// Dependency cycle.
    Cycle,
    /// Waiting on another unresolved node.
    UnresolvedDependency,
}

/// One unresolved node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeError {
    /// Path of the node in the template.
    pub path: NodePath,
    /// Terminal classification.
    pub classification: Classification,
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable cause.
    pub message: String,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}",
            self.path,
            self.classification.marker(),
            self.message
        )
    }
}

/// Every unresolved node of a run plus the best-effort tree, in which the
/// failing leaves hold [`crate::Value::Unresolved`] placeholders.
#[derive(Clone, Debug)]
pub struct UnresolvedReport {
    errors: Vec<NodeError>,
    partial: Node,
}

impl UnresolvedReport {
    pub(crate) const fn new(errors: Vec<NodeError>, partial: Node) -> Self {
        Self { errors, partial }
    }

    /// Node errors sorted by rendered path.
    #[must_use]
    pub const fn errors(&self) -> &[NodeError] {
        self.errors.as_slice()
    }

    /// Best-effort output tree.
    #[must_use]
    pub const fn partial(&self) -> &Node {
        &self.partial
    }

    /// Consume the report, returning the best-effort tree.
    #[must_use]
    pub fn into_partial(self) -> Node {
        self.partial
    }
}

impl fmt::Display for UnresolvedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
