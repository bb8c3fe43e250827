//! Tokeniser for expression text.

use super::ParseError;

/// Token kinds.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Marker(String),
    Int(i64),
    Float(f64),
    Str(String),
    Dot,
    Comma,
    Colon,
    Question,
    Pipe,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    DoubleSlash,
    OrOr,
    AndAnd,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Eof,
}

impl TokenKind {
    /// Short description used in parse errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Marker(name) => format!("marker '&{name}'"),
            Self::Int(value) => format!("number {value}"),
            Self::Float(value) => format!("number {value}"),
            Self::Str(_) => "string".to_owned(),
            Self::Eof => "end of expression".to_owned(),
            other => format!("'{}'", other.symbol()),
        }
    }

    const fn symbol(&self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Question => "?",
            Self::Pipe => "|",
            Self::Arrow => "->",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::DoubleSlash => "//",
            Self::OrOr => "||",
            Self::AndAnd => "&&",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::Tilde => "~",
            Self::Ident(_)
            | Self::Marker(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::Str(_)
            | Self::Eof => "",
        }
    }
}

/// A token with its byte span and whether whitespace preceded it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) spaced: bool,
}

struct Lexer<'src> {
    src: &'src str,
    pos: usize,
}

/// Split `src` into tokens, terminated by [`TokenKind::Eof`].
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer { src, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        let spaced = lexer.skip_whitespace();
        let start = lexer.pos;
        let kind = lexer.next_kind()?;
        let done = kind == TokenKind::Eof;
        tokens.push(Token {
            kind,
            start,
            end: lexer.pos,
            spaced,
        });
        if done {
            return Ok(tokens);
        }
    }
}

const fn is_word(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.src.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    fn peek_second(&self) -> Option<char> {
        self.src.get(self.pos..).and_then(|rest| rest.chars().nth(1))
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let before = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > before
    }

    fn error(&self, message: impl Into<String>, start: usize) -> ParseError {
        ParseError::new(message, start, self.pos)
    }

    fn next_kind(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let Some(ch) = self.bump() else {
            return Ok(TokenKind::Eof);
        };
        let kind = match ch {
            '"' => return self.string(start),
            '&' if self.peek() == Some('&') => {
                self.bump();
                TokenKind::AndAnd
            }
            '&' => {
                let name = self.word();
                if name.is_empty() {
                    return Err(self.error("expected marker name after '&'", start));
                }
                TokenKind::Marker(name)
            }
            '|' if self.peek() == Some('|') => {
                self.bump();
                TokenKind::OrOr
            }
            '|' => TokenKind::Pipe,
            '/' if self.peek() == Some('/') => {
                self.bump();
                TokenKind::DoubleSlash
            }
            '/' => TokenKind::Slash,
            '-' if self.peek() == Some('>') => {
                self.bump();
                TokenKind::Arrow
            }
            '-' => TokenKind::Minus,
            '=' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::EqEq
            }
            '!' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::NotEq
            }
            '!' => TokenKind::Bang,
            '<' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::LtEq
            }
            '<' => TokenKind::Lt,
            '>' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::GtEq
            }
            '>' => TokenKind::Gt,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '~' => TokenKind::Tilde,
            digit if digit.is_ascii_digit() => return self.number(start),
            word if is_word(word) => {
                let rest = self.word();
                TokenKind::Ident(format!("{word}{rest}"))
            }
            other => return Err(self.error(format!("unexpected character '{other}'"), start)),
        };
        Ok(kind)
    }

    /// Identifier characters; a `-` is part of the name when it sits
    /// between two word characters.
    fn word(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            let joins = ch == '-'
                && !text.is_empty()
                && self.peek_second().is_some_and(is_word);
            if !(is_word(ch) || joins) {
                break;
            }
            text.push(ch);
            self.bump();
        }
        text
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.bump();
        }
        let fractional = self.peek() == Some('.')
            && self.peek_second().is_some_and(|ch| ch.is_ascii_digit());
        if fractional {
            self.bump();
            while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = self.src.get(start..self.pos).unwrap_or_default();
        if fractional {
            text.parse()
                .map(TokenKind::Float)
                .map_err(|err| self.error(format!("invalid number: {err}"), start))
        } else {
            text.parse()
                .map(TokenKind::Int)
                .map_err(|err| self.error(format!("invalid integer: {err}"), start))
        }
    }

    fn string(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string", start)),
                Some('"') => return Ok(TokenKind::Str(text)),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => return Err(self.error("unterminated string", start)),
                },
                Some(other) => text.push(other),
            }
        }
    }
}
