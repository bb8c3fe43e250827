//! Expression language: lexer, syntax tree and parser.
//!
//! The parser consumes the inner text of a canonical `(( … ))` expression as
//! produced by [`crate::scanner::scan`].

mod ast;
mod lexer;
mod parser;

pub use ast::{
    BinaryOp, Comprehension, ComprehensionKind, Expr, Expression, Literal, Marker, MergeExpr,
    RefSegment, Reference, UnaryOp,
};

use thiserror::Error;

/// Malformed expression text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} at {start}..{end}")]
pub struct ParseError {
    message: String,
    start: usize,
    end: usize,
}

impl ParseError {
    /// Create an error covering the byte range `start..end`.
    #[must_use]
    pub fn new(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            message: message.into(),
            start,
            end,
        }
    }

    /// Description without position.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte range of the offending input.
    #[must_use]
    pub const fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }
}

/// Parse expression text (without the surrounding `((`/`))`).
///
/// # Errors
///
/// Returns a [`ParseError`] carrying the byte span of the first malformed
/// token.
///
/// # Examples
///
/// ```rust
/// use strata::expr::{BinaryOp, Expr, parse};
///
/// let parsed = parse("a + 1")?;
/// assert!(matches!(parsed.body, Some(Expr::Binary { op: BinaryOp::Add, .. })));
/// # Ok::<_, strata::expr::ParseError>(())
/// ```
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    parser::Parser::new(text)?.parse_expression()
}

#[cfg(test)]
mod tests;
