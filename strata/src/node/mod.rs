//! Document tree shared by every resolution stage.
//!
//! A [`Node`] mirrors the shape of the decoded source document. Scalars that
//! carry an embedded expression are stored as [`Value::Pending`] until the
//! flow engine replaces them with their resolved value; nothing else in the
//! tree is ever rewritten during resolution.

mod path;
mod serialize;

pub use path::{NodePath, Segment};

use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::expr::{Expression, ParseError};

bitflags! {
    /// Markers attached to a node by scalar markup.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        /// The value persists across runs (`&state`).
        const STATE = 1;
        /// Removed from the output but still referenceable (`&temporary`).
        const TEMPORARY = 1 << 1;
        /// Only visible inside its own document (`&local`).
        const LOCAL = 1 << 2;
        /// Later overrides are ignored (`prefer`, `merge none`).
        const OVERRIDE_LOCK = 1 << 3;
        /// Escaped expression text awaiting one unescape pass.
        const ESCAPED = 1 << 4;
    }
}

impl Flags {
    /// Markers a template node keeps when a stub value replaces it.
    pub const CARRIED: Self = Self::STATE.union(Self::TEMPORARY).union(Self::LOCAL);
}

/// Ordered mapping with unique string keys.
pub type Mapping = IndexMap<String, Node>;

/// Merge directive attached to a mapping or sequence by a `<<` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeKind {
    /// Mappings take stub keys missing from the template; sequences merge
    /// element-wise on the `name` field.
    Include,
    /// The stub node replaces this node wholesale.
    Replace,
    /// Sequences merge element-wise on `key`; unmatched stub elements are
    /// inserted at index `at`.
    Keyed {
        /// Field identifying matching elements.
        key: String,
        /// Insertion index for unmatched elements.
        at: usize,
    },
}

impl MergeKind {
    /// Field used to match sequence elements, if this directive merges
    /// element-wise.
    #[must_use]
    pub fn element_key(&self) -> Option<(&str, usize)> {
        match self {
            Self::Include => Some(("name", 0)),
            Self::Keyed { key, at } => Some((key.as_str(), *at)),
            Self::Replace => None,
        }
    }
}

/// Where a node was read from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Origin {
    source: Arc<str>,
    path: NodePath,
}

impl Origin {
    /// Create an origin for `path` inside the document named `source`.
    #[must_use]
    pub const fn new(source: Arc<str>, path: NodePath) -> Self {
        Self { source, path }
    }

    /// Name of the source document.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Path of the node inside its source document.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }
}

/// An expression waiting to be evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct Pending {
    source: String,
    parsed: Result<Arc<Expression>, ParseError>,
}

impl Pending {
    /// Wrap canonical expression text with its parse result.
    #[must_use]
    pub const fn new(source: String, parsed: Result<Arc<Expression>, ParseError>) -> Self {
        Self { source, parsed }
    }

    /// Canonical `(( … ))` text of the expression.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed expression, or the error the parser reported for it.
    #[must_use]
    pub const fn parsed(&self) -> &Result<Arc<Expression>, ParseError> {
        &self.parsed
    }
}

/// Value carried by a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar; every source integer width collapses into `i64`.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// Text scalar.
    String(String),
    /// Binary scalar.
    Bytes(Vec<u8>),
    /// Ordered mapping.
    Mapping(Mapping),
    /// Ordered sequence.
    Sequence(Vec<Node>),
    /// Expression not yet resolved.
    Pending(Pending),
    /// Placeholder left behind by a node that failed to resolve; holds the
    /// original expression text.
    Unresolved(String),
}

/// One node of a document tree.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) value: Value,
    pub(crate) flags: Flags,
    pub(crate) merge: Option<MergeKind>,
    pub(crate) origin: Origin,
}

impl PartialEq for Node {
    /// Equality compares values only; provenance and markers are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Node {
    /// Create a node without provenance or markers.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            flags: Flags::empty(),
            merge: None,
            origin: Origin::default(),
        }
    }

    /// Create a null node.
    #[must_use]
    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    /// Create an empty mapping node.
    #[must_use]
    pub fn empty_mapping() -> Self {
        Self::new(Value::Mapping(Mapping::new()))
    }

    /// Attach provenance.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Add markers.
    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags |= flags;
        self
    }

    /// Attach a merge directive.
    #[must_use]
    pub fn with_merge(mut self, merge: Option<MergeKind>) -> Self {
        self.merge = merge;
        self
    }

    /// The node's value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the node, returning its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The node's markers.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// The node's merge directive.
    #[must_use]
    pub const fn merge(&self) -> Option<&MergeKind> {
        self.merge.as_ref()
    }

    /// Where the node was read from.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns `true` when this node itself is an unresolved expression.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.value, Value::Pending(_))
    }

    /// Collect the paths of every pending node in this subtree, with `base`
    /// as the path of `self`.
    #[must_use]
    pub fn pending_paths(&self, base: &NodePath) -> Vec<NodePath> {
        let mut found = Vec::new();
        self.collect_pending(base, &mut found);
        found
    }

    fn collect_pending(&self, path: &NodePath, found: &mut Vec<NodePath>) {
        match &self.value {
            Value::Pending(_) => found.push(path.clone()),
            Value::Mapping(entries) => {
                for (key, child) in entries {
                    child.collect_pending(&path.key(key), found);
                }
            }
            Value::Sequence(items) => {
                for (index, child) in items.iter().enumerate() {
                    child.collect_pending(&path.index(index), found);
                }
            }
            _ => {}
        }
    }

    /// Child addressed by one path segment.
    #[must_use]
    pub fn child(&self, segment: &Segment) -> Option<&Self> {
        match (&self.value, segment) {
            (Value::Mapping(entries), Segment::Key(key)) => entries.get(key),
            (Value::Sequence(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut Self> {
        match (&mut self.value, segment) {
            (Value::Mapping(entries), Segment::Key(key)) => entries.get_mut(key),
            (Value::Sequence(items), Segment::Index(index)) => items.get_mut(*index),
            _ => None,
        }
    }

    /// Descendant at `path`, relative to this node.
    #[must_use]
    pub fn at(&self, path: &NodePath) -> Option<&Self> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub(crate) fn at_mut(&mut self, path: &NodePath) -> Option<&mut Self> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// Mapping entry by key, when this node is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match &self.value {
            Value::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    /// String content, when this node is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Integer content, when this node is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self.value {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }

    /// Sequence items, when this node is a sequence.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Self]> {
        match &self.value {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Mapping entries, when this node is a mapping.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&Mapping> {
        match &self.value {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Human-readable name of the node kind, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self.value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Mapping(_) => "map",
            Value::Sequence(_) => "list",
            Value::Pending(_) => "expression",
            Value::Unresolved(_) => "unresolved",
        }
    }

    /// Truthiness used by logical operators and conditionals: null, `false`,
    /// zero, the empty string and empty collections are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            Value::Null | Value::Pending(_) | Value::Unresolved(_) => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::String(text) => !text.is_empty(),
            Value::Bytes(bytes) => !bytes.is_empty(),
            Value::Mapping(entries) => !entries.is_empty(),
            Value::Sequence(items) => !items.is_empty(),
        }
    }

    /// Replace a pending value with its resolution, keeping markers and
    /// provenance.
    pub(crate) fn settle(&mut self, value: Value) {
        self.value = value;
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::new(Value::Bool(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::new(Value::Int(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Self::new(Value::Float(value))
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::new(Value::String(value.to_owned()))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::new(Value::String(value))
    }
}

impl From<Vec<Self>> for Node {
    fn from(items: Vec<Self>) -> Self {
        Self::new(Value::Sequence(items))
    }
}

impl From<Mapping> for Node {
    fn from(entries: Mapping) -> Self {
        Self::new(Value::Mapping(entries))
    }
}

#[cfg(test)]
mod tests;
