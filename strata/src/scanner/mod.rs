//! Interpolation scanner for scalar text.
//!
//! [`scan`] turns a raw scalar into either a literal or one canonical
//! `(( operand operand … ))` expression in which literal spans appear as
//! quoted strings and embedded expressions contribute their inner text. The
//! parser only ever sees canonical text, so every interpolation reduces to
//! plain concatenation by juxtaposition.
//!
//! The scanner never fails: anything ambiguous is left literal and parse
//! problems surface later from the expression parser.

const OPEN: &str = "((";
const ESCAPED_OPEN: &str = "((!";
const MASKED_OPEN: &str = "\\((";

/// Outcome of scanning one scalar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scanned {
    /// Plain text; the scalar is used as-is.
    Literal,
    /// An escaped expression (`((! … ))`) kept as text until unescaped.
    Escaped,
    /// Canonical expression text, including the `((` and `))` delimiters.
    Expression(String),
}

/// Scan `input` for embedded expressions.
///
/// # Examples
///
/// ```rust
/// use strata::scanner::{Scanned, scan};
///
/// assert_eq!(
///     scan("start (( a + b )) end"),
///     Scanned::Expression(r#"(( "start " a + b " end" ))"#.to_owned()),
/// );
/// assert_eq!(scan("test("), Scanned::Literal);
/// ```
#[must_use]
pub fn scan(input: &str) -> Scanned {
    if input.starts_with(ESCAPED_OPEN) {
        return Scanned::Escaped;
    }
    if input.starts_with(MASKED_OPEN) {
        return Scanned::Literal;
    }
    canonicalise(input).map_or(Scanned::Literal, Scanned::Expression)
}

/// Strip one escape level from an escaped expression scalar.
///
/// Returns `None` when `text` is not an escaped expression.
///
/// ```rust
/// use strata::scanner::unescape;
///
/// assert_eq!(unescape("((! a ))").as_deref(), Some("(( a ))"));
/// assert_eq!(unescape("((!! a ))").as_deref(), Some("((! a ))"));
/// assert_eq!(unescape("(( a ))"), None);
/// ```
#[must_use]
pub fn unescape(text: &str) -> Option<String> {
    text.strip_prefix(ESCAPED_OPEN)
        .map(|rest| format!("{OPEN}{rest}"))
}

/// Inner text of a canonical expression, without delimiters.
#[must_use]
pub fn expression_text(canonical: &str) -> &str {
    let inner = canonical.strip_prefix(OPEN).unwrap_or(canonical);
    inner.strip_suffix("))").unwrap_or(inner).trim()
}

fn canonicalise(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut operands = Vec::new();
    let mut cursor = 0;
    let mut pos = 0;
    let mut found = false;

    while pos < bytes.len() {
        let opens_here = input.get(pos..).is_some_and(|rest| rest.starts_with(OPEN));
        if !opens_here {
            pos += 1;
            continue;
        }
        let run = bytes.iter().skip(pos).take_while(|byte| **byte == b'(').count();
        let extra = run.saturating_sub(2);
        let body = pos + run;
        let close = find_close(bytes, body)?;
        let after = close + 2;
        let trailing = bytes
            .iter()
            .skip(after)
            .take(extra)
            .take_while(|byte| **byte == b')')
            .count();
        if trailing < extra {
            return None;
        }
        if bytes.get(body) == Some(&b'!') {
            // Escaped spans inside other text stay literal.
            pos = after + extra;
            continue;
        }

        push_literal(&mut operands, input.get(cursor..pos + extra)?);
        let inner = input.get(body..close)?.trim();
        if let Some(stripped) = inner.strip_suffix('\\') {
            push_operand(&mut operands, stripped.trim_end());
            operands.push(quote("\\"));
        } else {
            push_operand(&mut operands, inner);
        }
        found = true;
        cursor = after;
        pos = after;
    }

    if !found {
        return None;
    }
    push_literal(&mut operands, input.get(cursor..)?);
    if operands.is_empty() {
        return Some("(( ))".to_owned());
    }
    Some(format!("(( {} ))", operands.join(" ")))
}

/// Byte offset of the `))` closing an expression whose body starts at
/// `start`, honouring nested parentheses and quoted strings.
fn find_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut idx = start;
    while let Some(&byte) = bytes.get(idx) {
        if quoted {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                quoted = false;
            }
        } else {
            match byte {
                b'"' => quoted = true,
                b'(' => depth += 1,
                b')' if depth > 0 => depth -= 1,
                b')' if bytes.get(idx + 1) == Some(&b')') => return Some(idx),
                _ => {}
            }
        }
        idx += 1;
    }
    None
}

fn push_literal(operands: &mut Vec<String>, text: &str) {
    if !text.is_empty() {
        operands.push(quote(text));
    }
}

fn push_operand(operands: &mut Vec<String>, text: &str) {
    if !text.is_empty() {
        operands.push(text.to_owned());
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests;
