//! Core validators used by `validate`.

use crate::node::{Node, Value};

use super::{Module, RegistryBuilder, RegistryError, Validation};

/// Registers the core validators: `map`, `list`, `string`, `int`,
/// `number`, `bool`, `empty` and `nonempty`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoreValidators;

impl Module for CoreValidators {
    fn register(&self, builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
        builder
            .validator("map", kind_check("map", |value| matches!(value, Value::Mapping(_))))?
            .validator("list", kind_check("list", |value| matches!(value, Value::Sequence(_))))?
            .validator("string", kind_check("string", |value| matches!(value, Value::String(_))))?
            .validator("int", kind_check("int", |value| matches!(value, Value::Int(_))))?
            .validator(
                "number",
                kind_check("number", |value| matches!(value, Value::Int(_) | Value::Float(_))),
            )?
            .validator("bool", kind_check("bool", |value| matches!(value, Value::Bool(_))))?
            .validator("empty", |node: &Node, _: &[Node]| emptiness(node, true))?
            .validator("nonempty", |node: &Node, _: &[Node]| emptiness(node, false))
    }
}

fn kind_check(
    label: &'static str,
    test: fn(&Value) -> bool,
) -> impl Fn(&Node, &[Node]) -> Validation + Send + Sync {
    move |node: &Node, _: &[Node]| {
        Validation::new(test(node.value()), format!("is {label}"), format!("is no {label}"))
    }
}

fn emptiness(node: &Node, want_empty: bool) -> Validation {
    let size = match node.value() {
        Value::Null => Some(0),
        Value::String(text) => Some(text.len()),
        Value::Sequence(items) => Some(items.len()),
        Value::Mapping(entries) => Some(entries.len()),
        Value::Bytes(bytes) => Some(bytes.len()),
        _ => None,
    };
    let (positive, negative) = if want_empty {
        ("is empty", "is not empty")
    } else {
        ("is not empty", "is empty")
    };
    size.map_or_else(
        || {
            Validation::not_applicable(
                negative,
                format!("cannot measure {}", node.kind_name()),
            )
        },
        |len| Validation::new((len == 0) == want_empty, positive, negative),
    )
}
