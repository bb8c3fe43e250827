//! Scope chain used to resolve references.
//!
//! A [`Binding`] is an immutable view over the documents taking part in one
//! fixpoint pass plus the position of the node being evaluated. Child
//! bindings are derived with [`Binding::with_path`] and
//! [`Binding::with_locals`]; the parent is never modified.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::eval::{EvalError, EvalResult, Evaluation};
use crate::expr::{RefSegment, Reference};
use crate::node::{Flags, Node, NodePath, Segment, Value};
use crate::registry::Registry;

/// Document a node belongs to during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Document {
    /// The template merged with the stub overlay.
    Template,
    /// The folded stub overlay.
    Stubs,
    /// Persisted state from a previous run.
    State,
}

impl Document {
    /// Other documents consulted, in priority order, when a reference is
    /// not found in this one.
    const fn fallbacks(self) -> &'static [Self] {
        match self {
            Self::Template => &[Self::Stubs, Self::State],
            Self::Stubs => &[Self::Template, Self::State],
            Self::State => &[Self::Template, Self::Stubs],
        }
    }
}

/// A node addressed across documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    /// Owning document.
    pub document: Document,
    /// Path inside the document.
    pub path: NodePath,
}

impl NodeRef {
    /// Reference to `path` inside `document`.
    #[must_use]
    pub const fn new(document: Document, path: NodePath) -> Self {
        Self { document, path }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document {
            Document::Template => write!(f, "{}", self.path),
            Document::Stubs => write!(f, "stub:{}", self.path),
            Document::State => write!(f, "state:{}", self.path),
        }
    }
}

/// Document roots visible to a pass.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Documents<'a> {
    pub(crate) template: &'a Node,
    pub(crate) stubs: &'a Node,
    pub(crate) state: Option<&'a Node>,
}

impl<'a> Documents<'a> {
    pub(crate) const fn root(&self, document: Document) -> Option<&'a Node> {
        match document {
            Document::Template => Some(self.template),
            Document::Stubs => Some(self.stubs),
            Document::State => self.state,
        }
    }
}

#[derive(Debug)]
struct Frame {
    vars: Vec<(String, Node)>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    fn lookup(&self, name: &str) -> Option<&Node> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, node)| node)
            .or_else(|| self.parent.as_deref().and_then(|parent| parent.lookup(name)))
    }
}

/// Evaluation scope for one node.
#[derive(Clone, Debug)]
pub struct Binding<'a> {
    documents: Documents<'a>,
    registry: &'a Registry,
    document: Document,
    path: NodePath,
    locals: Option<Rc<Frame>>,
    abandoned: Option<&'a BTreeSet<NodeRef>>,
}

enum Walk<'a> {
    Found(&'a Node, NodePath),
    Deferred(NodeRef),
    Missing,
}

impl<'a> Binding<'a> {
    pub(crate) const fn new(
        documents: Documents<'a>,
        registry: &'a Registry,
        document: Document,
        path: NodePath,
    ) -> Self {
        Self {
            documents,
            registry,
            document,
            path,
            locals: None,
            abandoned: None,
        }
    }

    /// Binding for a pass run after the loop got stuck: `//` falls back to
    /// its right operand when the left one only waits on `abandoned` nodes.
    #[must_use]
    pub(crate) const fn abandoning(mut self, abandoned: &'a BTreeSet<NodeRef>) -> Self {
        self.abandoned = Some(abandoned);
        self
    }

    /// Whether every node in `blockers` has been given up on.
    #[must_use]
    pub fn gave_up_on(&self, blockers: &[NodeRef]) -> bool {
        self.abandoned.is_some_and(|abandoned| {
            !blockers.is_empty() && blockers.iter().all(|blocker| abandoned.contains(blocker))
        })
    }

    /// Binding for another node of the same document.
    #[must_use]
    pub fn with_path(&self, path: NodePath) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }

    /// Binding with an extra frame of comprehension variables.
    #[must_use]
    pub fn with_locals(&self, vars: Vec<(String, Node)>) -> Self {
        Self {
            locals: Some(Rc::new(Frame {
                vars,
                parent: self.locals.clone(),
            })),
            ..self.clone()
        }
    }

    /// Path of the node being evaluated.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Document of the node being evaluated.
    #[must_use]
    pub const fn document(&self) -> Document {
        self.document
    }

    /// Registry available to calls.
    #[must_use]
    pub const fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Value of the folded stub overlay at `path`, or a deferral while the
    /// value or one of its ancestors is still pending. `None` when the stubs
    /// define nothing there.
    #[must_use]
    pub fn stub(&self, path: &NodePath) -> Option<Evaluation> {
        let mut node = self.documents.stubs;
        for (depth, segment) in path.segments().iter().enumerate() {
            if node.is_pending() {
                return Some(Evaluation::Deferred(vec![NodeRef::new(
                    Document::Stubs,
                    path.prefix(depth),
                )]));
            }
            node = node.child(segment)?;
        }
        Some(settled_or_waiting(node, path, Document::Stubs))
    }

    /// Resolve a reference through the scope chain.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownReference`] when no scope defines the
    /// reference.
    pub fn resolve(&self, reference: &Reference) -> EvalResult {
        let mut segments = reference.path.iter();
        let Some(first) = segments.next() else {
            return Err(EvalError::UnknownReference(reference.to_string()));
        };

        if !reference.absolute
            && let (RefSegment::Key(name), Some(frame)) = (first, self.locals.as_deref())
            && let Some(local) = frame.lookup(name)
        {
            return match walk_local(local, segments) {
                Some(found) => Ok(Evaluation::Resolved(found.clone())),
                None => Err(EvalError::UnknownReference(reference.to_string())),
            };
        }

        for (document, base) in self.scopes(reference.absolute) {
            let Some(root) = self.documents.root(document) else {
                continue;
            };
            let foreign = document != self.document;
            let Some(scope) = root.at(&base) else {
                continue;
            };
            match step(scope, first, &base, document, foreign) {
                Walk::Missing => {}
                Walk::Deferred(blocker) => return Ok(Evaluation::Deferred(vec![blocker])),
                Walk::Found(node, path) => {
                    return finish(node, path, reference, document, foreign);
                }
            }
        }
        Err(EvalError::UnknownReference(reference.to_string()))
    }

    /// Candidate scopes in priority order: enclosing nodes of the current
    /// document innermost first, then other document roots.
    fn scopes(&self, absolute: bool) -> Vec<(Document, NodePath)> {
        let mut scopes = Vec::new();
        if absolute {
            scopes.push((self.document, NodePath::root()));
        } else {
            for len in (0..self.path.len()).rev() {
                scopes.push((self.document, self.path.prefix(len)));
            }
            if self.path.is_empty() {
                scopes.push((self.document, NodePath::root()));
            }
        }
        for fallback in self.document.fallbacks() {
            scopes.push((*fallback, NodePath::root()));
        }
        scopes
    }
}

fn walk_local<'n, 'r>(
    local: &'n Node,
    mut segments: impl Iterator<Item = &'r RefSegment>,
) -> Option<&'n Node> {
    segments.try_fold(local, |node, segment| {
        let (found, _) = lookup(node, segment)?;
        Some(found)
    })
}

/// Child of `node` selected by a reference segment, with the concrete path
/// segment it corresponds to.
fn lookup<'n>(node: &'n Node, segment: &RefSegment) -> Option<(&'n Node, Segment)> {
    match (&node.value, segment) {
        (Value::Mapping(entries), RefSegment::Key(key)) => entries
            .get(key)
            .map(|child| (child, Segment::Key(key.clone()))),
        (Value::Sequence(items), RefSegment::Key(key)) => items
            .iter()
            .enumerate()
            .find(|(_, item)| item.get("name").and_then(Node::as_str) == Some(key.as_str()))
            .map(|(index, item)| (item, Segment::Index(index))),
        (Value::Sequence(items), RefSegment::Index(index)) => {
            let position = if *index < 0 {
                items.len().checked_sub(usize::try_from(index.unsigned_abs()).ok()?)?
            } else {
                usize::try_from(*index).ok()?
            };
            items.get(position).map(|item| (item, Segment::Index(position)))
        }
        _ => None,
    }
}

fn step<'n>(
    node: &'n Node,
    segment: &RefSegment,
    base: &NodePath,
    document: Document,
    foreign: bool,
) -> Walk<'n> {
    if node.is_pending() {
        return Walk::Deferred(NodeRef::new(document, base.clone()));
    }
    match lookup(node, segment) {
        Some((child, _)) if foreign && child.flags.contains(Flags::LOCAL) => Walk::Missing,
        Some((child, concrete)) => Walk::Found(child, base.child(concrete)),
        None => Walk::Missing,
    }
}

fn finish(
    start: &Node,
    start_path: NodePath,
    reference: &Reference,
    document: Document,
    foreign: bool,
) -> EvalResult {
    let mut node = start;
    let mut path = start_path;
    for segment in reference.path.iter().skip(1) {
        match step(node, segment, &path, document, foreign) {
            Walk::Found(child, child_path) => {
                node = child;
                path = child_path;
            }
            Walk::Deferred(blocker) => return Ok(Evaluation::Deferred(vec![blocker])),
            Walk::Missing => {
                if matches!(segment, RefSegment::Key(_))
                    && let Some(blocker) = unnamed_yet(node, &path)
                {
                    return Ok(Evaluation::Deferred(vec![NodeRef::new(document, blocker)]));
                }
                return Err(EvalError::UnknownReference(reference.to_string()));
            }
        }
    }
    Ok(settled_or_waiting(node, &path, document))
}

/// `node` itself when nothing below it is pending, otherwise a deferral on
/// every pending descendant.
fn settled_or_waiting(node: &Node, path: &NodePath, document: Document) -> Evaluation {
    let pending = node.pending_paths(path);
    if pending.is_empty() {
        Evaluation::Resolved(node.clone())
    } else {
        Evaluation::Deferred(
            pending
                .into_iter()
                .map(|blocker| NodeRef::new(document, blocker))
                .collect(),
        )
    }
}

/// First element of a sequence whose `name` cannot be compared yet, as the
/// pending node to wait for.
fn unnamed_yet(node: &Node, base: &NodePath) -> Option<NodePath> {
    let Value::Sequence(items) = &node.value else {
        return None;
    };
    items.iter().enumerate().find_map(|(index, item)| {
        let at = base.index(index);
        if item.is_pending() {
            Some(at)
        } else {
            item.get("name").filter(|name| name.is_pending()).map(|_| at.key("name"))
        }
    })
}
