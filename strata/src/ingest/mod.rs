//! Conversion of decoded values into the node tree.
//!
//! Strings are routed through the scanner; embedded expressions are parsed
//! once here and stored on the node as [`Value::Pending`]. Markers on an
//! expression become node flags, and `<<`/`<<<` entries become merge
//! directives on the enclosing mapping or sequence.

mod native;

pub use native::Native;

use std::sync::Arc;

use crate::StrataResult;
use crate::error::StrataError;
use crate::expr::{Expr, Expression, Marker, MergeExpr, parse};
use crate::node::{Flags, Mapping, MergeKind, Node, NodePath, Origin, Pending, Value};
use crate::scanner::{Scanned, expression_text, scan};

const DIRECTIVE_KEYS: [&str; 2] = ["<<", "<<<"];

/// Build a node tree named `source` from a decoded value.
///
/// # Errors
///
/// Returns [`StrataError::NonStringKey`] for mapping keys that are not
/// strings, [`StrataError::UnknownType`] for values the node model cannot
/// hold and [`StrataError::InvalidDirective`] for malformed `<<` entries.
///
/// ```
/// use strata::{Native, ingest};
/// use serde_json::json;
///
/// let node = ingest("doc", &Native::from(json!({"a": "(( b ))", "b": 1})))?;
/// assert!(node.get("a").is_some_and(strata::Node::is_pending));
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub fn ingest(source: &str, native: &Native) -> StrataResult<Node> {
    let builder = Builder {
        source: Arc::from(source),
    };
    builder.node(native, &NodePath::root()).map_err(Arc::new)
}

/// Directive carried by a `<<` entry.
#[derive(Debug, Default)]
struct Directive {
    flags: Flags,
    merge: Option<MergeKind>,
}

struct Builder {
    source: Arc<str>,
}

impl Builder {
    fn origin(&self, path: &NodePath) -> Origin {
        Origin::new(Arc::clone(&self.source), path.clone())
    }

    fn node(&self, native: &Native, path: &NodePath) -> Result<Node, StrataError> {
        let node = match native {
            Native::Null => Node::null(),
            Native::Bool(value) => Node::from(*value),
            Native::Int(value) => Node::from(*value),
            Native::Float(value) => Node::from(*value),
            Native::Bytes(bytes) => Node::new(Value::Bytes(bytes.clone())),
            Native::String(text) => scalar(text),
            Native::Sequence(items) => self.sequence(items, path)?,
            Native::Mapping(entries) => self.mapping(entries, path)?,
            Native::UInt(_) => {
                return Err(StrataError::UnknownType {
                    path: path.clone(),
                    kind: native.kind_name().to_owned(),
                });
            }
            Native::Tagged { tag, .. } => {
                return Err(StrataError::UnknownType {
                    path: path.clone(),
                    kind: format!("tagged value !{tag}"),
                });
            }
        };
        Ok(node.with_origin(self.origin(path)))
    }

    fn mapping(&self, entries: &[(Native, Native)], path: &NodePath) -> Result<Node, StrataError> {
        let mut mapping = Mapping::with_capacity(entries.len());
        let mut directive = Directive::default();
        for (key, value) in entries {
            let Native::String(name) = key else {
                return Err(StrataError::NonStringKey {
                    key: key.to_string(),
                    path: path.clone(),
                });
            };
            if DIRECTIVE_KEYS.contains(&name.as_str()) {
                directive = parse_directive(value, path)?;
                continue;
            }
            let child = self.node(value, &path.key(name))?;
            mapping.insert(name.clone(), child);
        }
        Ok(Node::from(mapping)
            .with_flags(directive.flags)
            .with_merge(directive.merge))
    }

    fn sequence(&self, items: &[Native], path: &NodePath) -> Result<Node, StrataError> {
        let mut nodes = Vec::with_capacity(items.len());
        let mut directive = Directive::default();
        for item in items {
            if let Some(value) = directive_entry(item) {
                let found = parse_directive(value, path)?;
                directive = Directive {
                    flags: found.flags,
                    merge: found.merge.map(|kind| element_merge(kind, nodes.len())),
                };
                continue;
            }
            nodes.push(self.node(item, &path.index(nodes.len()))?);
        }
        Ok(Node::from(nodes)
            .with_flags(directive.flags)
            .with_merge(directive.merge))
    }
}

/// Value of a sequence element consisting of a single `<<` entry.
fn directive_entry(item: &Native) -> Option<&Native> {
    match item {
        Native::Mapping(entries) => match entries.as_slice() {
            [(Native::String(key), value)] if DIRECTIVE_KEYS.contains(&key.as_str()) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

/// In a sequence, unmatched stub elements go where the directive stood.
fn element_merge(kind: MergeKind, at: usize) -> MergeKind {
    match kind {
        MergeKind::Include => MergeKind::Keyed {
            key: "name".to_owned(),
            at,
        },
        MergeKind::Keyed { key, .. } => MergeKind::Keyed { key, at },
        MergeKind::Replace => MergeKind::Replace,
    }
}

fn parse_directive(value: &Native, path: &NodePath) -> Result<Directive, StrataError> {
    let invalid = |message: String| StrataError::InvalidDirective {
        path: path.clone(),
        message,
    };
    let Native::String(text) = value else {
        return Err(invalid(format!("expected an expression, found {}", value.kind_name())));
    };
    let Scanned::Expression(canonical) = scan(text) else {
        return Err(invalid(format!("expected an expression, found '{text}'")));
    };
    let expression = parse(expression_text(&canonical)).map_err(|err| invalid(err.to_string()))?;
    let mut directive = Directive {
        flags: marker_flags(&expression),
        merge: None,
    };
    match &expression.body {
        None => {}
        Some(Expr::Merge(MergeExpr::Plain)) => directive.merge = Some(MergeKind::Include),
        Some(Expr::Merge(MergeExpr::Replace)) => directive.merge = Some(MergeKind::Replace),
        Some(Expr::Merge(MergeExpr::None)) => directive.flags |= Flags::OVERRIDE_LOCK,
        Some(Expr::Merge(MergeExpr::On(key))) => {
            directive.merge = Some(MergeKind::Keyed {
                key: key.clone(),
                at: 0,
            });
        }
        Some(Expr::Merge(MergeExpr::Path(reference))) => {
            return Err(invalid(format!(
                "merging from '{reference}' is only supported as a value"
            )));
        }
        Some(_) => return Err(invalid("expected a merge directive".to_owned())),
    }
    Ok(directive)
}

fn marker_flags(expression: &Expression) -> Flags {
    expression
        .markers
        .iter()
        .fold(Flags::empty(), |flags, marker| {
            flags
                | match marker {
                    Marker::State => Flags::STATE,
                    Marker::Temporary => Flags::TEMPORARY,
                    Marker::Local => Flags::LOCAL,
                    Marker::Prefer => Flags::OVERRIDE_LOCK,
                }
        })
}

fn scalar(text: &str) -> Node {
    match scan(text) {
        Scanned::Literal => Node::from(text),
        Scanned::Escaped => Node::from(text).with_flags(Flags::ESCAPED),
        Scanned::Expression(canonical) => match parse(expression_text(&canonical)) {
            Ok(expression) if expression.body.is_none() => {
                Node::null().with_flags(marker_flags(&expression))
            }
            Ok(expression) => {
                let flags = marker_flags(&expression);
                Node::new(Value::Pending(Pending::new(canonical, Ok(Arc::new(expression)))))
                    .with_flags(flags)
            }
            Err(err) => Node::new(Value::Pending(Pending::new(canonical, Err(err)))),
        },
    }
}

#[cfg(test)]
mod tests;
