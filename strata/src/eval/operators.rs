//! Operator semantics on resolved nodes.

use std::cmp::Ordering;

use crate::expr::{BinaryOp, UnaryOp};
use crate::node::{Node, Value};

use super::EvalError;

#[derive(Clone, Copy, Debug)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    const fn of(node: &Node) -> Option<Self> {
        match node.value {
            Value::Int(value) => Some(Self::Int(value)),
            Value::Float(value) => Some(Self::Float(value)),
            _ => None,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "mixed int/float arithmetic promotes to float"
    )]
    const fn to_float(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

fn type_error(op: BinaryOp, left: &Node, right: &Node) -> EvalError {
    EvalError::Type(format!(
        "operator '{}' cannot combine {} and {}",
        op.symbol(),
        left.kind_name(),
        right.kind_name()
    ))
}

/// Apply a prefix operator.
pub(super) fn unary(op: UnaryOp, operand: &Node) -> Result<Node, EvalError> {
    match op {
        UnaryOp::Not => Ok(Node::from(!operand.is_truthy())),
        UnaryOp::Neg => match Number::of(operand) {
            Some(Number::Int(value)) => value
                .checked_neg()
                .map(Node::from)
                .ok_or_else(|| EvalError::Type(format!("integer overflow negating {value}"))),
            Some(Number::Float(value)) => Ok(Node::from(negate(value))),
            None => Err(EvalError::Type(format!(
                "operator '-' cannot negate {}",
                operand.kind_name()
            ))),
        },
    }
}

#[expect(clippy::float_arithmetic, reason = "float negation is the operator's meaning")]
const fn negate(value: f64) -> f64 {
    -value
}

/// Apply an infix operator other than the short-circuiting ones.
pub(super) fn binary(op: BinaryOp, left: &Node, right: &Node) -> Result<Node, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Node::from(equals(left, right))),
        BinaryOp::NotEq => Ok(Node::from(!equals(left, right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(left, right).ok_or_else(|| type_error(op, left, right))?;
            let holds = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Node::from(holds))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (Some(lhs), Some(rhs)) = (Number::of(left), Number::of(right)) else {
                return Err(type_error(op, left, right));
            };
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::Default | BinaryOp::Or | BinaryOp::And => Err(EvalError::Type(format!(
            "operator '{}' is not a value operator",
            op.symbol()
        ))),
    }
}

/// Deep equality; numbers compare by value across int and float.
pub(super) fn equals(left: &Node, right: &Node) -> bool {
    match (Number::of(left), Number::of(right)) {
        (Some(lhs), Some(rhs)) => compare_numbers(lhs, rhs) == Some(Ordering::Equal),
        _ => left == right,
    }
}

fn compare(left: &Node, right: &Node) -> Option<Ordering> {
    if let (Some(lhs), Some(rhs)) = (Number::of(left), Number::of(right)) {
        return compare_numbers(lhs, rhs);
    }
    match (&left.value, &right.value) {
        (Value::String(lhs), Value::String(rhs)) => Some(lhs.cmp(rhs)),
        _ => None,
    }
}

fn compare_numbers(lhs: Number, rhs: Number) -> Option<Ordering> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_float().partial_cmp(&b.to_float()),
    }
}

fn arithmetic(op: BinaryOp, lhs: Number, rhs: Number) -> Result<Node, EvalError> {
    if let (Number::Int(a), Number::Int(b)) = (lhs, rhs) {
        return integer(op, a, b).map(Node::from);
    }
    float(op, lhs.to_float(), rhs.to_float()).map(Node::from)
}

fn integer(op: BinaryOp, a: i64, b: i64) -> Result<i64, EvalError> {
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
        return Err(EvalError::Type(format!("division by zero in {a} {} {b}", op.symbol())));
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result.ok_or_else(|| EvalError::Type(format!("integer overflow in {a} {} {b}", op.symbol())))
}

#[expect(clippy::float_arithmetic, reason = "float operands use float arithmetic")]
fn float(op: BinaryOp, a: f64, b: f64) -> Result<f64, EvalError> {
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0.0 {
        return Err(EvalError::Type(format!("division by zero in {a} {} {b}", op.symbol())));
    }
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    })
}

/// Text form of a scalar used by concatenation and string builtins.
pub(crate) fn render_text(node: &Node) -> Option<String> {
    match &node.value {
        Value::String(text) => Some(text.clone()),
        Value::Int(value) => Some(value.to_string()),
        Value::Float(value) => Some(value.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Juxtaposition: lists append, mappings merge, scalars render as text.
pub(super) fn concatenate(operands: Vec<Node>) -> Result<Node, EvalError> {
    let mut iter = operands.into_iter();
    let Some(first) = iter.next() else {
        return Ok(Node::from(String::new()));
    };
    match first.value {
        Value::Sequence(mut items) => {
            for operand in iter {
                match operand.value {
                    Value::Sequence(more) => items.extend(more),
                    Value::Mapping(_) => {
                        return Err(EvalError::Type(
                            "cannot append a map to a list".to_owned(),
                        ));
                    }
                    _ => items.push(operand),
                }
            }
            Ok(Node::from(items))
        }
        Value::Mapping(mut entries) => {
            for operand in iter {
                let Value::Mapping(more) = operand.value else {
                    return Err(EvalError::Type(format!(
                        "cannot merge {} into a map",
                        operand.kind_name()
                    )));
                };
                entries.extend(more);
            }
            Ok(Node::from(entries))
        }
        value => {
            let mut text = String::new();
            for operand in std::iter::once(Node::new(value)).chain(iter) {
                let piece = render_text(&operand).ok_or_else(|| {
                    EvalError::Type(format!("cannot concatenate {} as text", operand.kind_name()))
                })?;
                text.push_str(&piece);
            }
            Ok(Node::from(text))
        }
    }
}
