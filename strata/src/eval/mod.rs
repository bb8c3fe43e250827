//! Expression evaluator.
//!
//! [`evaluate`] reduces one expression against a [`Binding`]. A reference to
//! a node that is still pending is not an error: the evaluation reports
//! [`Evaluation::Deferred`] with the blocking nodes so the flow engine can
//! retry in a later pass.

mod operators;

pub(crate) use operators::render_text;

use thiserror::Error;

use crate::binding::{Binding, Document, NodeRef};
use crate::error::ErrorKind;
use crate::expr::{
    BinaryOp, Comprehension, ComprehensionKind, Expr, Literal, MergeExpr, ParseError, RefSegment,
    Reference,
};
use crate::node::{Mapping, Node, NodePath, Segment, Value};

/// Outcome of a successful evaluation step.
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluation {
    /// A concrete value.
    Resolved(Node),
    /// Not yet resolvable; lists the pending nodes it waits for.
    Deferred(Vec<NodeRef>),
}

/// Result of evaluating an expression.
pub type EvalResult = Result<Evaluation, EvalError>;

/// Failure local to one expression.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum EvalError {
    /// The expression text is malformed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// An operator or builtin received incompatible kinds.
    #[error("{0}")]
    Type(String),
    /// No scope defines the referenced name.
    #[error("unknown reference '{0}'")]
    UnknownReference(String),
    /// A registered function or validator failed.
    #[error("{name}: {message}")]
    Function {
        /// Function name.
        name: String,
        /// Failure description.
        message: String,
    },
    /// `merge` found no stub value to take.
    #[error("no stub value to merge at '{0}'")]
    MergeMissing(String),
}

impl EvalError {
    /// Failure raised by the function `name`.
    #[must_use]
    pub fn function(name: &str, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.to_owned(),
            message: message.into(),
        }
    }

    /// Report category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Type(_) | Self::MergeMissing(_) => ErrorKind::Type,
            Self::UnknownReference(_) => ErrorKind::UnknownReference,
            Self::Function { .. } => ErrorKind::Function,
        }
    }
}

/// Shorthand for a resolved value.
pub(crate) const fn resolved(node: Node) -> EvalResult {
    Ok(Evaluation::Resolved(node))
}

/// Unwrap a resolved value or return the deferral from the enclosing
/// function.
macro_rules! value_of {
    ($evaluation:expr) => {
        match $evaluation? {
            Evaluation::Resolved(node) => node,
            deferred @ Evaluation::Deferred(_) => return Ok(deferred),
        }
    };
}

/// Evaluate `expr` in `binding`.
///
/// # Errors
///
/// Returns an [`EvalError`] when the expression fails for good; pending
/// inputs produce [`Evaluation::Deferred`] instead.
pub fn evaluate(expr: &Expr, binding: &Binding<'_>) -> EvalResult {
    match expr {
        Expr::Literal(literal) => resolved(literal_node(literal)),
        Expr::Reference(reference) => binding.resolve(reference),
        Expr::Unary { op, operand } => {
            let value = value_of!(evaluate(operand, binding));
            operators::unary(*op, &value).map(Evaluation::Resolved)
        }
        Expr::Binary { op, left, right } => evaluate_binary(*op, left, right, binding),
        Expr::Call { name, args } => {
            let values = match evaluate_all(args, binding)? {
                Ok(values) => values,
                Err(blockers) => return Ok(Evaluation::Deferred(blockers)),
            };
            let function = binding
                .registry()
                .function(name)
                .ok_or_else(|| EvalError::function(name, "unknown function"))?;
            function.call(&values, binding)
        }
        Expr::Comprehension(comprehension) => evaluate_comprehension(comprehension, binding),
        Expr::Concatenation(operands) => match evaluate_all(operands, binding)? {
            Ok(values) => operators::concatenate(values).map(Evaluation::Resolved),
            Err(blockers) => Ok(Evaluation::Deferred(blockers)),
        },
        Expr::Merge(directive) => evaluate_merge(directive, binding),
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            let test = value_of!(evaluate(condition, binding));
            if test.is_truthy() {
                evaluate(then, binding)
            } else {
                evaluate(otherwise, binding)
            }
        }
        Expr::List(items) => match evaluate_all(items, binding)? {
            Ok(values) => resolved(Node::from(values)),
            Err(blockers) => Ok(Evaluation::Deferred(blockers)),
        },
    }
}

fn literal_node(literal: &Literal) -> Node {
    match literal {
        Literal::Null => Node::null(),
        Literal::Bool(value) => Node::from(*value),
        Literal::Int(value) => Node::from(*value),
        Literal::Float(value) => Node::from(*value),
        Literal::String(text) => Node::from(text.as_str()),
    }
}

/// Evaluate every expression, gathering all deferrals rather than stopping
/// at the first.
fn evaluate_all(
    exprs: &[Expr],
    binding: &Binding<'_>,
) -> Result<Result<Vec<Node>, Vec<NodeRef>>, EvalError> {
    let mut values = Vec::with_capacity(exprs.len());
    let mut blockers = Vec::new();
    for expr in exprs {
        match evaluate(expr, binding)? {
            Evaluation::Resolved(node) => values.push(node),
            Evaluation::Deferred(waiting) => blockers.extend(waiting),
        }
    }
    if blockers.is_empty() {
        Ok(Ok(values))
    } else {
        Ok(Err(blockers))
    }
}

fn evaluate_binary(op: BinaryOp, left: &Expr, right: &Expr, binding: &Binding<'_>) -> EvalResult {
    match op {
        BinaryOp::Default => match evaluate(left, binding) {
            Ok(Evaluation::Deferred(blockers)) if binding.gave_up_on(&blockers) => {
                evaluate(right, binding)
            }
            Ok(outcome) => Ok(outcome),
            Err(_) => evaluate(right, binding),
        },
        BinaryOp::And | BinaryOp::Or => {
            let lhs = value_of!(evaluate(left, binding));
            let short = lhs.is_truthy() == (op == BinaryOp::Or);
            if short {
                return resolved(Node::from(lhs.is_truthy()));
            }
            let rhs = value_of!(evaluate(right, binding));
            resolved(Node::from(rhs.is_truthy()))
        }
        _ => {
            let first = evaluate(left, binding)?;
            let second = evaluate(right, binding)?;
            match (first, second) {
                (Evaluation::Resolved(lhs), Evaluation::Resolved(rhs)) => {
                    operators::binary(op, &lhs, &rhs).map(Evaluation::Resolved)
                }
                (lhs, rhs) => {
                    let mut blockers = waiting_on(lhs);
                    blockers.extend(waiting_on(rhs));
                    Ok(Evaluation::Deferred(blockers))
                }
            }
        }
    }
}

fn waiting_on(evaluation: Evaluation) -> Vec<NodeRef> {
    match evaluation {
        Evaluation::Resolved(_) => Vec::new(),
        Evaluation::Deferred(blockers) => blockers,
    }
}

/// Iteration entries of a comprehension source: key (or index) and value.
fn entries(source: Node) -> Result<(bool, Vec<(Node, Node)>), EvalError> {
    match source.value {
        Value::Sequence(items) => Ok((
            false,
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let position = i64::try_from(index).unwrap_or(i64::MAX);
                    (Node::from(position), item)
                })
                .collect(),
        )),
        Value::Mapping(map) => Ok((
            true,
            map.into_iter()
                .map(|(key, value)| (Node::from(key), value))
                .collect(),
        )),
        _ => Err(EvalError::Type(format!(
            "comprehension source must be a list or map, found {}",
            source.kind_name()
        ))),
    }
}

fn loop_vars(names: &[String], key: &Node, value: &Node) -> Vec<(String, Node)> {
    match names {
        [value_name] => vec![(value_name.clone(), value.clone())],
        [key_name, value_name, ..] => vec![
            (key_name.clone(), key.clone()),
            (value_name.clone(), value.clone()),
        ],
        [] => Vec::new(),
    }
}

fn evaluate_comprehension(comprehension: &Comprehension, binding: &Binding<'_>) -> EvalResult {
    let source = value_of!(evaluate(&comprehension.source, binding));
    let (keyed, items) = entries(source)?;
    match comprehension.kind {
        ComprehensionKind::Map | ComprehensionKind::Select => {
            let mut blockers = Vec::new();
            let mut kept = Vec::new();
            for (key, value) in items {
                let scope = binding.with_locals(loop_vars(&comprehension.vars, &key, &value));
                match evaluate(&comprehension.body, &scope)? {
                    Evaluation::Deferred(waiting) => blockers.extend(waiting),
                    Evaluation::Resolved(result) => {
                        if comprehension.kind == ComprehensionKind::Map {
                            kept.push((key, result));
                        } else if result.is_truthy() {
                            kept.push((key, value));
                        }
                    }
                }
            }
            if !blockers.is_empty() {
                return Ok(Evaluation::Deferred(blockers));
            }
            if keyed && comprehension.kind == ComprehensionKind::Select {
                let map: Mapping = kept
                    .into_iter()
                    .filter_map(|(key, value)| key.as_str().map(|name| (name.to_owned(), value)))
                    .collect();
                return resolved(Node::from(map));
            }
            resolved(Node::from(
                kept.into_iter().map(|(_, value)| value).collect::<Vec<_>>(),
            ))
        }
        ComprehensionKind::Sum => {
            let Some(init) = comprehension.init.as_ref() else {
                return Err(EvalError::Type("sum requires an initial value".to_owned()));
            };
            let mut accumulator = value_of!(evaluate(init, binding));
            let Some((acc_name, element_vars)) = comprehension.vars.split_first() else {
                return Err(EvalError::Type("sum requires an accumulator".to_owned()));
            };
            for (key, value) in items {
                let mut vars = vec![(acc_name.clone(), accumulator)];
                vars.extend(loop_vars(element_vars, &key, &value));
                let scope = binding.with_locals(vars);
                accumulator = value_of!(evaluate(&comprehension.body, &scope));
            }
            resolved(accumulator)
        }
    }
}

fn stub_path(base: &NodePath, reference: Option<&Reference>) -> Option<NodePath> {
    let Some(target) = reference else {
        return Some(base.clone());
    };
    target
        .path
        .iter()
        .map(|segment| match segment {
            RefSegment::Key(key) => Some(Segment::Key(key.clone())),
            RefSegment::Index(index) => usize::try_from(*index).ok().map(Segment::Index),
        })
        .collect()
}

fn evaluate_merge(directive: &MergeExpr, binding: &Binding<'_>) -> EvalResult {
    let reference = match directive {
        MergeExpr::Plain => None,
        MergeExpr::Path(reference) => Some(reference),
        MergeExpr::Replace | MergeExpr::None | MergeExpr::On(_) => {
            return Err(EvalError::Type(
                "merge options are only valid in a '<<' entry".to_owned(),
            ));
        }
    };
    if binding.document() != Document::Template {
        return Err(EvalError::Type(
            "merge is only valid inside the template".to_owned(),
        ));
    }
    let Some(path) = stub_path(binding.path(), reference) else {
        return Err(EvalError::Type("merge path must not use negative indices".to_owned()));
    };
    binding
        .stub(&path)
        .ok_or_else(|| EvalError::MergeMissing(path.to_string()))
}

#[cfg(test)]
mod tests;
