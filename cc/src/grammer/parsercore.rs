use super::token::{Token, TokenKind};
use crate::error::Error;

/// Token cursor shared by the grammar rules in `parser.rs`.
///
/// Comments are dropped when the cursor is built, so every lookahead
/// distance counts syntax tokens only.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    errors: Vec<Error>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: impl IntoIterator<Item = Token<'a>>) -> Self {
        Parser {
            tokens: tokens
                .into_iter()
                .filter(|token| !matches!(token.kind, TokenKind::Comment(_)))
                .collect(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn error(&mut self, e: Error) {
        self.errors.push(e);
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    pub fn peek(&self) -> Option<&Token<'a>> {
        self.peek_nth(0)
    }

    /// Token `n` places after the next one.
    pub fn peek_nth(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    pub fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    pub fn check_if<F: Fn(&Token) -> bool>(&self, cond: F) -> bool {
        self.check_nth_if(0, cond)
    }

    pub fn check_nth_if<F: Fn(&Token) -> bool>(&self, n: usize, cond: F) -> bool {
        self.peek_nth(n).is_some_and(|token| cond(token))
    }

    pub fn consume_if<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Option<Token<'a>> {
        if self.check_if(cond) {
            self.next()
        } else {
            None
        }
    }

    /// Consume the next token, which must satisfy `cond`.
    pub fn expect_if<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Result<Token<'a>, Error> {
        let token = self.peek().ok_or(Error::UnexpectedEOF)?;
        if !cond(token) {
            return Err(Error::UnexpectedToken(token.into()));
        }
        self.next().ok_or(Error::UnexpectedEOF)
    }
}

#[macro_export]
macro_rules! check {
    ($parser:expr, $kind:pat) => {
        $parser.check_if(|token| matches!(&token.kind, $kind))
    };
}

/// Check the token `n` places after the next one
#[macro_export]
macro_rules! check_nth {
    ($parser:expr, $n:expr, $kind:pat) => {
        $parser.check_nth_if($n, |token| matches!(&token.kind, $kind))
    };
}

#[macro_export]
macro_rules! expect {
    ($parser:expr, $kind:pat) => {
        $parser.expect_if(|token| matches!(&token.kind, $kind))
    };
}

#[macro_export]
macro_rules! optional {
    ($parser:expr, $trigger:pat, $following:expr) => {
        if check!($parser, $trigger) {
            expect!($parser, $trigger)?;
            Some($following)
        } else {
            None
        }
    };
    ($parser:expr, $trigger:pat) => {
        $parser.consume_if(|token| matches!(&token.kind, $trigger))
    };
}

/// `{ elem } terminal`, or with a delimiter `[ elem { delim elem } ] terminal`.
/// The terminal itself is left for the caller.
#[macro_export]
macro_rules! repeat {
    ($parser:expr, $elem:expr, $terminal:pat) => {{
        let mut items = Vec::new();
        while !check!($parser, $terminal) {
            items.push($elem?);
        }
        items
    }};
    ($parser:expr, $elem:expr, $delimiter:pat, $terminal:pat) => {{
        let mut items = Vec::new();
        if !check!($parser, $terminal) {
            items.push($elem?);
            while optional!($parser, $delimiter).is_some() {
                items.push($elem?);
            }
        }
        items
    }};
}
