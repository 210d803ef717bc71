#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub pos: Pos<'a>,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, pos: Pos<'a>) -> Self {
        Token { kind, pos }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Double character tokens
    EqualEqual,  // '=='
    ExclEqual,   // '!='
    RAngleEqual, // '>='
    LAngleEqual, // '<='
    AmpAmp,      // '&&'
    PipePipe,    // '||'

    // Single character tokens
    Equal,     // '='
    Plus,      // '+'
    Minus,     // '-'
    Star,      // '*'
    Atmark,    // '@'
    Slash,     // '/'
    Excl,      // '!'
    Semicolon, // ';'
    Comma,     // ','
    Period,    // '.'
    LParen,    // '('
    RParen,    // ')'
    LBracket,  // '['
    RBracket,  // ']'
    LCurly,    // '{'
    RCurly,    // '}'
    LAngle,    // '<'
    RAngle,    // '>'

    // Keywords
    KwInt,    // "int"
    KwUint,   // "uint"
    KwBool,   // "bool"
    KwChar,   // "char"
    KwVoid,   // "void"
    KwStruct, // "struct"
    KwReturn, // "return"
    KwIf,     // "if"
    KwElse,   // "else"
    KwWhile,  // "while"
    KwNew,    // "new"
    KwGpr,    // "gpr"
    KwExcept, // "except"
    KwTrue,   // "true"
    KwFalse,  // "false"

    // Identifier
    Ident(String),

    // Literals
    /// Lexeme, value, and whether it carried the `u` suffix.
    Number(String, u64, bool),
    Char(char),

    // Special
    Comment(String),
    Error(String),
}

impl TokenKind {
    /// Tokens that open a type.
    pub fn is_type_start(&self) -> bool {
        matches!(
            self,
            TokenKind::KwInt
                | TokenKind::KwUint
                | TokenKind::KwBool
                | TokenKind::KwChar
                | TokenKind::KwStruct
        )
    }
}

/// `line` and `col` are 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Pos<'a> {
    pub file: &'a str,
    pub line: usize,
    pub col: usize,
}
