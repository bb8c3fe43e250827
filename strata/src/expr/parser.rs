//! Recursive-descent parser over the token stream.
//!
//! Precedence, loosest first: markers, juxtaposition, `?:`, `//`, `||`,
//! `&&`, comparison, additive, multiplicative, unary, primary.

use super::ParseError;
use super::ast::{
    BinaryOp, Comprehension, ComprehensionKind, Expr, Expression, Literal, Marker, MergeExpr,
    RefSegment, Reference, UnaryOp,
};
use super::lexer::{Token, TokenKind, tokenize};

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

impl Parser {
    pub(crate) fn new(src: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(src)?;
        let eof = Token {
            kind: TokenKind::Eof,
            start: src.len(),
            end: src.len(),
            spaced: false,
        };
        Ok(Self {
            tokens,
            pos: 0,
            eof,
        })
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        ParseError::new(
            format!("expected {expected}, found {}", token.kind.describe()),
            token.start,
            token.end,
        )
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Next token is glued to the current one (no whitespace between).
    fn glued(&self, kind: &TokenKind) -> bool {
        let next = self.peek();
        !next.spaced && &next.kind == kind
    }

    pub(crate) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let markers = self.parse_markers()?;
        let body = if self.at(&TokenKind::Eof) {
            None
        } else {
            Some(self.parse_concatenation()?)
        };
        if !self.at(&TokenKind::Eof) {
            return Err(self.unexpected("end of expression"));
        }
        Ok(Expression { markers, body })
    }

    fn parse_markers(&mut self) -> Result<Vec<Marker>, ParseError> {
        let mut markers = Vec::new();
        loop {
            let marker = match self.current_kind() {
                TokenKind::Marker(name) => match name.as_str() {
                    "state" => Marker::State,
                    "temporary" => Marker::Temporary,
                    "local" => Marker::Local,
                    _ => {
                        let token = self.current();
                        return Err(ParseError::new(
                            format!("unknown marker '&{name}'"),
                            token.start,
                            token.end,
                        ));
                    }
                },
                TokenKind::Ident(name) if name == "prefer" => Marker::Prefer,
                _ => return Ok(markers),
            };
            self.advance();
            markers.push(marker);
        }
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Eof
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Comma
                | TokenKind::Pipe
                | TokenKind::Arrow
                | TokenKind::Colon
        )
    }

    fn parse_concatenation(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_ternary()?;
        if self.at_terminator() {
            return Ok(first);
        }
        let mut operands = vec![first];
        while !self.at_terminator() {
            operands.push(self.parse_ternary()?);
        }
        Ok(Expr::Concatenation(operands))
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_default()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }
        let then = self.parse_ternary()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let otherwise = self.parse_ternary()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_binary_level(
        &mut self,
        matcher: fn(&TokenKind) -> Option<BinaryOp>,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        while let Some(op) = matcher(self.current_kind()) {
            self.advance();
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_default(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(match_default_op, Self::parse_or)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(match_or_op, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(match_and_op, Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(match_comparison_op, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(match_additive_op, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(match_multiplicative_op, Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(value)))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(value)))
            }
            TokenKind::Str(text) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(text)))
            }
            TokenKind::Tilde => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Ident(name) => self.parse_word(name),
            TokenKind::Dot => {
                self.advance();
                let reference = self.parse_reference_tail(Vec::new(), true)?;
                Ok(Expr::Reference(reference))
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_concatenation()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an operand")),
        }
    }

    fn parse_word(&mut self, name: String) -> Result<Expr, ParseError> {
        match name.as_str() {
            "true" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Bool(true)));
            }
            "false" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Bool(false)));
            }
            "nil" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Null));
            }
            "merge" => {
                self.advance();
                return self.parse_merge();
            }
            _ => {}
        }
        if self.glued(&TokenKind::LParen) {
            return self.parse_call(name);
        }
        let kind = match name.as_str() {
            "map" => Some(ComprehensionKind::Map),
            "select" => Some(ComprehensionKind::Select),
            "sum" => Some(ComprehensionKind::Sum),
            _ => None,
        };
        if let Some(flavour) = kind.filter(|_| self.glued(&TokenKind::LBracket)) {
            return self.parse_comprehension(flavour);
        }
        self.advance();
        let reference = self.parse_reference_tail(vec![RefSegment::Key(name)], false)?;
        Ok(Expr::Reference(reference))
    }

    /// Continue a reference while `.key`, `.[n]` or `[n]` follow without
    /// whitespace.
    fn parse_reference_tail(
        &mut self,
        mut path: Vec<RefSegment>,
        absolute: bool,
    ) -> Result<Reference, ParseError> {
        if absolute {
            self.parse_reference_step(&mut path)?;
        }
        while !self.current().spaced {
            if self.eat(&TokenKind::Dot) {
                self.parse_reference_step(&mut path)?;
            } else if self.at(&TokenKind::LBracket) {
                self.parse_index(&mut path)?;
            } else {
                break;
            }
        }
        Ok(Reference { absolute, path })
    }

    fn parse_reference_step(&mut self, path: &mut Vec<RefSegment>) -> Result<(), ParseError> {
        if self.current().spaced {
            return Err(self.unexpected("a path segment"));
        }
        match self.current_kind().clone() {
            TokenKind::Ident(key) => {
                self.advance();
                path.push(RefSegment::Key(key));
                Ok(())
            }
            TokenKind::Int(index) => {
                self.advance();
                path.push(RefSegment::Index(index));
                Ok(())
            }
            TokenKind::LBracket => self.parse_index(path),
            _ => Err(self.unexpected("a path segment")),
        }
    }

    fn parse_index(&mut self, path: &mut Vec<RefSegment>) -> Result<(), ParseError> {
        self.expect(&TokenKind::LBracket, "'['")?;
        let negative = self.eat(&TokenKind::Minus);
        let TokenKind::Int(value) = self.current_kind().clone() else {
            return Err(self.unexpected("an index"));
        };
        self.advance();
        self.expect(&TokenKind::RBracket, "']'")?;
        path.push(RefSegment::Index(if negative { -value } else { value }));
        Ok(())
    }

    fn parse_separated(&mut self, close: &TokenKind, what: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_concatenation()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&TokenKind::Comma, what)?;
        }
    }

    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::LBracket, "'['")?;
        let items = self.parse_separated(&TokenKind::RBracket, "',' or ']'")?;
        Ok(Expr::List(items))
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        self.advance();
        self.expect(&TokenKind::LParen, "'('")?;
        let args = self.parse_separated(&TokenKind::RParen, "',' or ')'")?;
        Ok(Expr::Call { name, args })
    }

    fn parse_comprehension(&mut self, kind: ComprehensionKind) -> Result<Expr, ParseError> {
        let start = self.advance().start;
        self.expect(&TokenKind::LBracket, "'['")?;
        let source = self.parse_concatenation()?;
        self.expect(&TokenKind::Pipe, "'|'")?;
        let init = if kind == ComprehensionKind::Sum {
            let seed = self.parse_concatenation()?;
            self.expect(&TokenKind::Pipe, "'|'")?;
            Some(seed)
        } else {
            None
        };
        let mut vars = Vec::new();
        loop {
            let TokenKind::Ident(name) = self.current_kind().clone() else {
                return Err(self.unexpected("a variable name"));
            };
            self.advance();
            vars.push(name);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Pipe, "'|'")?;
        self.expect(&TokenKind::Arrow, "'->'")?;
        let body = self.parse_concatenation()?;
        let end = self.expect(&TokenKind::RBracket, "']'")?.end;

        let allowed = if kind == ComprehensionKind::Sum { 2..=3 } else { 1..=2 };
        if !allowed.contains(&vars.len()) {
            return Err(ParseError::new(
                format!(
                    "expected {} to {} variables, found {}",
                    allowed.start(),
                    allowed.end(),
                    vars.len()
                ),
                start,
                end,
            ));
        }
        Ok(Expr::Comprehension(Box::new(Comprehension {
            kind,
            source,
            init,
            vars,
            body,
        })))
    }

    fn parse_merge(&mut self) -> Result<Expr, ParseError> {
        let directive = match self.current_kind().clone() {
            TokenKind::Ident(word) if word == "replace" => {
                self.advance();
                MergeExpr::Replace
            }
            TokenKind::Ident(word) if word == "none" => {
                self.advance();
                MergeExpr::None
            }
            TokenKind::Ident(word) if word == "on" => {
                self.advance();
                let TokenKind::Ident(key) = self.current_kind().clone() else {
                    return Err(self.unexpected("a key name after 'merge on'"));
                };
                self.advance();
                MergeExpr::On(key)
            }
            TokenKind::Ident(word) => {
                self.advance();
                let reference = self.parse_reference_tail(vec![RefSegment::Key(word)], false)?;
                MergeExpr::Path(reference)
            }
            TokenKind::Dot => {
                self.advance();
                MergeExpr::Path(self.parse_reference_tail(Vec::new(), true)?)
            }
            _ => MergeExpr::Plain,
        };
        Ok(Expr::Merge(directive))
    }
}

const fn match_default_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::DoubleSlash => Some(BinaryOp::Default),
        _ => None,
    }
}

const fn match_or_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::OrOr => Some(BinaryOp::Or),
        _ => None,
    }
}

const fn match_and_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::AndAnd => Some(BinaryOp::And),
        _ => None,
    }
}

const fn match_comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::EqEq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        _ => None,
    }
}

const fn match_additive_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

const fn match_multiplicative_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        _ => None,
    }
}
