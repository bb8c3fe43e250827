//! Core function library.

use std::ops::RangeInclusive;

use crate::binding::Binding;
use crate::eval::{EvalError, EvalResult, render_text, resolved};
use crate::node::{Node, NodePath, Value};

use super::{Module, RegistryBuilder, RegistryError, Validation};

/// Registers the core functions: `length`, `join`, `split`, `trim`,
/// `upper`, `lower`, `keys`, `contains`, `min`, `max`, `uniq`, `format`,
/// `stub` and `validate`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Core;

impl Module for Core {
    fn register(&self, builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
        builder
            .function("length", length)?
            .function("join", join)?
            .function("split", split)?
            .function("trim", trim)?
            .function("upper", upper)?
            .function("lower", lower)?
            .function("keys", keys)?
            .function("contains", contains)?
            .function("min", min)?
            .function("max", max)?
            .function("uniq", uniq)?
            .function("format", format)?
            .function("stub", stub)?
            .function("validate", validate)
    }
}

fn arity(name: &str, args: &[Node], allowed: &RangeInclusive<usize>) -> Result<(), EvalError> {
    if allowed.contains(&args.len()) {
        return Ok(());
    }
    let expected = if allowed.start() == allowed.end() {
        allowed.start().to_string()
    } else {
        format!("{} to {}", allowed.start(), allowed.end())
    };
    Err(EvalError::function(
        name,
        format!("expected {expected} arguments, found {}", args.len()),
    ))
}

fn text_arg(name: &str, node: &Node) -> Result<String, EvalError> {
    render_text(node).ok_or_else(|| {
        EvalError::function(name, format!("expected a scalar, found {}", node.kind_name()))
    })
}

fn string_arg<'n>(name: &str, node: &'n Node) -> Result<&'n str, EvalError> {
    node.as_str().ok_or_else(|| {
        EvalError::function(name, format!("expected a string, found {}", node.kind_name()))
    })
}

fn single<'n>(name: &str, args: &'n [Node]) -> Result<&'n Node, EvalError> {
    match args {
        [only] => Ok(only),
        _ => {
            arity(name, args, &(1..=1))?;
            Err(EvalError::function(name, "expected one argument"))
        }
    }
}

fn pair<'n>(name: &str, args: &'n [Node]) -> Result<(&'n Node, &'n Node), EvalError> {
    match args {
        [first, second] => Ok((first, second)),
        _ => {
            arity(name, args, &(2..=2))?;
            Err(EvalError::function(name, "expected two arguments"))
        }
    }
}

/// Flatten list arguments one level.
fn flatten(args: &[Node]) -> Vec<&Node> {
    let mut flat = Vec::new();
    for arg in args {
        match arg.as_sequence() {
            Some(items) => flat.extend(items),
            None => flat.push(arg),
        }
    }
    flat
}

fn length(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let subject = single("length", args)?;
    let count = match subject.value() {
        Value::String(text) => text.chars().count(),
        Value::Sequence(items) => items.len(),
        Value::Mapping(entries) => entries.len(),
        Value::Bytes(bytes) => bytes.len(),
        _ => {
            return Err(EvalError::function(
                "length",
                format!("cannot measure {}", subject.kind_name()),
            ));
        }
    };
    i64::try_from(count)
        .map_err(|err| EvalError::function("length", err.to_string()))
        .and_then(|total| resolved(Node::from(total)))
}

fn join(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let Some((first, rest)) = args.split_first() else {
        return Err(EvalError::function("join", "expected a separator"));
    };
    let separator = string_arg("join", first)?;
    let pieces = flatten(rest)
        .into_iter()
        .map(|piece| text_arg("join", piece))
        .collect::<Result<Vec<_>, _>>()?;
    resolved(Node::from(pieces.join(separator)))
}

fn split(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let (first, second) = pair("split", args)?;
    let separator = string_arg("split", first)?;
    let subject = string_arg("split", second)?;
    let parts: Vec<Node> = subject.split(separator).map(Node::from).collect();
    resolved(Node::from(parts))
}

fn map_strings(name: &str, subject: &Node, apply: impl Fn(&str) -> String) -> EvalResult {
    match subject.value() {
        Value::String(text) => resolved(Node::from(apply(text))),
        Value::Sequence(items) => {
            let mapped = items
                .iter()
                .map(|item| string_arg(name, item).map(|text| Node::from(apply(text))))
                .collect::<Result<Vec<_>, _>>()?;
            resolved(Node::from(mapped))
        }
        _ => Err(EvalError::function(
            name,
            format!("expected a string or list, found {}", subject.kind_name()),
        )),
    }
}

fn trim(args: &[Node], _: &Binding<'_>) -> EvalResult {
    arity("trim", args, &(1..=2))?;
    let Some((subject, rest)) = args.split_first() else {
        return Err(EvalError::function("trim", "expected a value"));
    };
    let cut: Option<Vec<char>> = rest
        .first()
        .map(|chars| string_arg("trim", chars).map(|set| set.chars().collect()))
        .transpose()?;
    map_strings("trim", subject, |text| match &cut {
        Some(set) => text.trim_matches(|ch| set.contains(&ch)).to_owned(),
        None => text.trim().to_owned(),
    })
}

fn upper(args: &[Node], _: &Binding<'_>) -> EvalResult {
    map_strings("upper", single("upper", args)?, str::to_uppercase)
}

fn lower(args: &[Node], _: &Binding<'_>) -> EvalResult {
    map_strings("lower", single("lower", args)?, str::to_lowercase)
}

fn keys(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let subject = single("keys", args)?;
    let Some(entries) = subject.as_mapping() else {
        return Err(EvalError::function(
            "keys",
            format!("expected a map, found {}", subject.kind_name()),
        ));
    };
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort_unstable();
    resolved(Node::from(
        names
            .into_iter()
            .map(|name| Node::from(name.as_str()))
            .collect::<Vec<_>>(),
    ))
}

fn contains(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let (haystack, needle) = pair("contains", args)?;
    let found = match haystack.value() {
        Value::Sequence(items) => items.iter().any(|item| item == needle),
        Value::Mapping(entries) => entries.contains_key(string_arg("contains", needle)?),
        Value::String(text) => text.contains(text_arg("contains", needle)?.as_str()),
        _ => {
            return Err(EvalError::function(
                "contains",
                format!("cannot search {}", haystack.kind_name()),
            ));
        }
    };
    resolved(Node::from(found))
}

fn extreme(name: &str, args: &[Node], keep: std::cmp::Ordering) -> EvalResult {
    let values = flatten(args);
    let mut best: Option<&Node> = None;
    for candidate in values {
        let usable = matches!(candidate.value(), Value::Int(_) | Value::Float(_));
        if !usable {
            return Err(EvalError::function(
                name,
                format!("expected numbers, found {}", candidate.kind_name()),
            ));
        }
        best = match best {
            Some(current) if order(candidate, current) != Some(keep) => Some(current),
            _ => Some(candidate),
        };
    }
    best.map_or_else(
        || Err(EvalError::function(name, "expected at least one number")),
        |winner| resolved(winner.clone()),
    )
}

fn order(left: &Node, right: &Node) -> Option<std::cmp::Ordering> {
    match (left.value(), right.value()) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => numeric(left)?.partial_cmp(&numeric(right)?),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "mixed int/float comparison promotes to float"
)]
const fn numeric(node: &Node) -> Option<f64> {
    match node.value {
        Value::Int(value) => Some(value as f64),
        Value::Float(value) => Some(value),
        _ => None,
    }
}

fn min(args: &[Node], _: &Binding<'_>) -> EvalResult {
    extreme("min", args, std::cmp::Ordering::Less)
}

fn max(args: &[Node], _: &Binding<'_>) -> EvalResult {
    extreme("max", args, std::cmp::Ordering::Greater)
}

fn uniq(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let subject = single("uniq", args)?;
    let Some(items) = subject.as_sequence() else {
        return Err(EvalError::function(
            "uniq",
            format!("expected a list, found {}", subject.kind_name()),
        ));
    };
    let mut unique: Vec<Node> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
    }
    resolved(Node::from(unique))
}

/// `format(template, args…)`: each `%s`, `%d` or `%v` consumes the next
/// argument rendered as text; `%%` is a literal percent sign.
fn format(args: &[Node], _: &Binding<'_>) -> EvalResult {
    let Some((first, rest)) = args.split_first() else {
        return Err(EvalError::function("format", "expected a format string"));
    };
    let template = string_arg("format", first)?;
    let mut remaining = rest.iter();
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => output.push('%'),
            Some('s' | 'd' | 'v') => {
                let arg = remaining
                    .next()
                    .ok_or_else(|| EvalError::function("format", "not enough arguments"))?;
                output.push_str(&text_arg("format", arg)?);
            }
            Some(other) => {
                return Err(EvalError::function(
                    "format",
                    format!("unsupported directive '%{other}'"),
                ));
            }
            None => return Err(EvalError::function("format", "dangling '%'")),
        }
    }
    if remaining.next().is_some() {
        return Err(EvalError::function("format", "too many arguments"));
    }
    resolved(Node::from(output))
}

/// `stub()` or `stub("a.b")`: the folded stub value at this node's path or
/// the given dotted path.
fn stub(args: &[Node], binding: &Binding<'_>) -> EvalResult {
    arity("stub", args, &(0..=1))?;
    let path = match args.first() {
        Some(dotted) => {
            let text = string_arg("stub", dotted)?;
            NodePath::parse_dotted(text)
                .ok_or_else(|| EvalError::function("stub", format!("invalid path '{text}'")))?
        }
        None => binding.path().clone(),
    };
    binding
        .stub(&path)
        .ok_or_else(|| EvalError::function("stub", format!("no stub value at '{path}'")))
}

/// `validate(value, condition…)`: each condition is a validator name, or a
/// list of name and extra arguments. A leading `!` negates the validator.
fn validate(args: &[Node], binding: &Binding<'_>) -> EvalResult {
    let Some((subject, conditions)) = args.split_first() else {
        return Err(EvalError::function("validate", "expected a value"));
    };
    for (position, condition) in conditions.iter().enumerate() {
        let (spec, extra) = match condition.as_sequence() {
            Some([head, tail @ ..]) => (head, tail),
            Some([]) => {
                return Err(EvalError::function("validate", "empty condition"));
            }
            None => (condition, &[][..]),
        };
        let written = string_arg("validate", spec)?;
        let (negated, name) = written
            .strip_prefix('!')
            .map_or((false, written), |stripped| (true, stripped));
        let validator = binding
            .registry()
            .validator(name)
            .ok_or_else(|| EvalError::function("validate", format!("unknown validator '{name}'")))?;
        let raw = validator.validate(subject, extra);
        let outcome: Validation = if negated { raw.negate() } else { raw };
        if !outcome.applicable || !outcome.matched {
            return Err(EvalError::function(
                "validate",
                format!("condition {} failed: {}", position + 1, outcome.message()),
            ));
        }
    }
    resolved(subject.clone())
}
