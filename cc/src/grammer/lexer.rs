use super::token::{Pos, Token, TokenKind};
use std::iter::Peekable;
use std::str::CharIndices;

pub struct Lexer<'a> {
    file: &'a str,
    code: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a str, code: &'a str) -> Self {
        Self { file, code }
    }

    /// Tokens never span lines, so each line is lexed on its own.
    pub fn parse(self) -> Vec<Token<'a>> {
        let file = self.file;
        self.code
            .lines()
            .enumerate()
            .flat_map(|(line, text)| LineLexer::new(text, file, line))
            .collect()
    }
}

/// Yields the tokens of one source line. A `//` comment swallows the rest
/// of the line; characters that start no token come out as `Error`.
pub struct LineLexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    file: &'a str,
    line: usize,
}

impl<'a> LineLexer<'a> {
    pub fn new(text: &'a str, file: &'a str, line: usize) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            file,
            line,
        }
    }

    pub fn parse(self) -> Vec<Token<'a>> {
        self.collect()
    }

    /// Take characters while `cond` holds, appending them to `lexeme`.
    fn take_while(&mut self, lexeme: &mut String, cond: impl Fn(char) -> bool) {
        while let Some((_, ch)) = self.chars.next_if(|&(_, ch)| cond(ch)) {
            lexeme.push(ch);
        }
    }

    fn lex(&mut self, ch: char) -> TokenKind {
        let next = self.chars.peek().map(|&(_, ch)| ch);
        if let Some(kind) = next.and_then(|next| double_char_token(ch, next)) {
            self.chars.next();
            return kind;
        }
        if ch == '/' && next == Some('/') {
            self.chars.next();
            let rest: String = self.chars.by_ref().map(|(_, ch)| ch).collect();
            return TokenKind::Comment(rest.trim_start().to_string());
        }
        if let Some(kind) = single_char_token(ch) {
            return kind;
        }
        match ch {
            '0'..='9' => self.number(ch),
            '\'' => self.char_literal(),
            'a'..='z' | 'A'..='Z' | '_' => self.word(ch),
            _ => TokenKind::Error(ch.to_string()),
        }
    }

    fn word(&mut self, first: char) -> TokenKind {
        let mut lexeme = first.to_string();
        self.take_while(&mut lexeme, |ch| ch == '_' || ch.is_ascii_alphanumeric());
        keyword(&lexeme).unwrap_or(TokenKind::Ident(lexeme))
    }

    /// Char: 'a', '\n'. The opening quote is already consumed.
    fn char_literal(&mut self) -> TokenKind {
        let mut lexeme = String::from("'");
        let value = match self.chars.next().map(|(_, ch)| ch) {
            Some('\\') => {
                lexeme.push('\\');
                let escaped = self.chars.next().map(|(_, ch)| ch);
                lexeme.extend(escaped);
                escaped.and_then(unescape)
            }
            Some('\'') | None => None,
            Some(ch) => {
                lexeme.push(ch);
                Some(ch)
            }
        };
        match (value, self.chars.next_if(|&(_, ch)| ch == '\'')) {
            (Some(ch), Some(_)) if ch.is_ascii() => TokenKind::Char(ch),
            _ => TokenKind::Error(lexeme),
        }
    }

    /// Decimal or `0x` hex digits with `_` separators, then an optional `u`.
    /// Letters glued to the end make the whole lexeme an error.
    fn number(&mut self, first: char) -> TokenKind {
        let mut lexeme = first.to_string();
        let prefix = match first {
            '0' => self.chars.next_if(|&(_, ch)| matches!(ch, 'x' | 'X')),
            _ => None,
        };
        let value = if let Some((_, x)) = prefix {
            lexeme.push(x);
            let start = lexeme.len();
            self.take_while(&mut lexeme, |ch| ch == '_' || ch.is_ascii_hexdigit());
            u64::from_str_radix(&lexeme[start..].replace('_', ""), 16).ok()
        } else {
            self.take_while(&mut lexeme, |ch| ch == '_' || ch.is_ascii_digit());
            lexeme.replace('_', "").parse::<u64>().ok()
        };
        let unsigned = self.chars.next_if(|&(_, ch)| ch == 'u').is_some();
        if unsigned {
            lexeme.push('u');
        }
        let len = lexeme.len();
        self.take_while(&mut lexeme, |ch| ch == '_' || ch.is_ascii_alphanumeric());
        match value {
            Some(value) if lexeme.len() == len => TokenKind::Number(lexeme, value, unsigned),
            _ => TokenKind::Error(lexeme),
        }
    }
}

impl<'a> Iterator for LineLexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        while self.chars.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
        let (col, ch) = self.chars.next()?;
        let pos = Pos {
            file: self.file,
            line: self.line,
            col,
        };
        Some(Token::new(self.lex(ch), pos))
    }
}

fn unescape(ch: char) -> Option<char> {
    match ch {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '0' => Some('\0'),
        _ => None,
    }
}

fn double_char_token(ch0: char, ch1: char) -> Option<TokenKind> {
    match (ch0, ch1) {
        ('=', '=') => Some(TokenKind::EqualEqual),
        ('!', '=') => Some(TokenKind::ExclEqual),
        ('<', '=') => Some(TokenKind::LAngleEqual),
        ('>', '=') => Some(TokenKind::RAngleEqual),
        ('&', '&') => Some(TokenKind::AmpAmp),
        ('|', '|') => Some(TokenKind::PipePipe),
        _ => None,
    }
}

fn single_char_token(ch: char) -> Option<TokenKind> {
    match ch {
        '=' => Some(TokenKind::Equal),
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '@' => Some(TokenKind::Atmark),
        '/' => Some(TokenKind::Slash),
        '!' => Some(TokenKind::Excl),
        ';' => Some(TokenKind::Semicolon),
        ',' => Some(TokenKind::Comma),
        '.' => Some(TokenKind::Period),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '{' => Some(TokenKind::LCurly),
        '}' => Some(TokenKind::RCurly),
        '<' => Some(TokenKind::LAngle),
        '>' => Some(TokenKind::RAngle),
        _ => None,
    }
}

fn keyword(s: &str) -> Option<TokenKind> {
    match s {
        "int" => Some(TokenKind::KwInt),
        "uint" => Some(TokenKind::KwUint),
        "bool" => Some(TokenKind::KwBool),
        "char" => Some(TokenKind::KwChar),
        "void" => Some(TokenKind::KwVoid),
        "struct" => Some(TokenKind::KwStruct),
        "return" => Some(TokenKind::KwReturn),
        "if" => Some(TokenKind::KwIf),
        "else" => Some(TokenKind::KwElse),
        "while" => Some(TokenKind::KwWhile),
        "new" => Some(TokenKind::KwNew),
        "gpr" => Some(TokenKind::KwGpr),
        "except" => Some(TokenKind::KwExcept),
        "true" => Some(TokenKind::KwTrue),
        "false" => Some(TokenKind::KwFalse),
        _ => None,
    }
}
