use crate::grammer::token::{Token, TokenKind};
use color_print::cprintln;
use std::fmt;
use thiserror::Error;

// Token information without lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub kind: TokenKind,
    pub file: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} at {}:{}:{}",
            self.kind,
            self.file,
            self.line + 1,
            self.col + 1
        )
    }
}

impl<'a> From<Token<'a>> for TokenInfo {
    fn from(token: Token<'a>) -> Self {
        TokenInfo {
            kind: token.kind,
            file: token.pos.file.to_string(),
            line: token.pos.line,
            col: token.pos.col,
        }
    }
}

impl<'a> From<&Token<'a>> for TokenInfo {
    fn from(token: &Token<'a>) -> Self {
        TokenInfo {
            kind: token.kind.clone(),
            file: token.pos.file.to_string(),
            line: token.pos.line,
            col: token.pos.col,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    // Parse errors
    #[error("Unexpected end of file")]
    UnexpectedEOF,

    #[error("Unexpected token: {0}")]
    UnexpectedToken(TokenInfo),

    // Symbol collection errors
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Struct `{0}` contains itself")]
    RecursiveStruct(String),

    #[error("`{0}` is defined twice")]
    Redefined(String),

    #[error("`{0}` does not fit the 32-bit address space")]
    TooLarge(String),

    #[error("No `main` function")]
    NoMain,

    // Code generation errors
    #[error("Type mismatch in `{fragment}`: expected {expected}, found {found}")]
    TypeMismatch {
        fragment: String,
        expected: String,
        found: String,
    },

    #[error("Malformed statement: `{0}`")]
    Malformed(String),

    #[error("Undefined variable: `{0}`")]
    UndefinedVariable(String),

    #[error("Undefined function: `{0}`")]
    UndefinedFunction(String),

    #[error("No field `{1}` in `{0}`")]
    NoSuchField(String, String),

    #[error("`{name}` takes {expected} argument(s), found {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Register {0} out of range in `{1}`: expected 1..=31")]
    RegisterOutOfRange(u64, String),

    #[error("Out of registers in `{0}`")]
    RegisterExhausted(String),

    #[error("Literal does not fit 32 bits: `{0}`")]
    LiteralOutOfRange(String),

    #[error("Branch over {0} instructions does not fit the offset field")]
    BranchTooFar(usize),

    #[error("In function `{func}`: {source}")]
    InFunction {
        func: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Macro(#[from] arch::MacroError),

    // Driver errors
    #[error("Could not open file `{0}`")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Could not write file `{0}`")]
    FileWrite(String, #[source] std::io::Error),

    #[error("Could not parse config `{0}`: {1}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Invalid memory map: {0}")]
    MemoryMap(String),

    #[error("Generated assembly was rejected: {0}")]
    Assemble(#[from] m32asm::Error),
}

impl Error {
    pub fn in_function(self, func: &str) -> Error {
        match self {
            e @ Error::InFunction { .. } => e,
            e => Error::InFunction {
                func: func.to_string(),
                source: Box::new(e),
            },
        }
    }

    /// Source position, for errors raised by the parser.
    pub fn token(&self) -> Option<&TokenInfo> {
        match self {
            Error::UnexpectedToken(info) => Some(info),
            Error::InFunction { source, .. } => source.token(),
            _ => None,
        }
    }

    pub fn print_diag(&self, lines: &[&str]) {
        cprintln!("<red,bold>error</>: {}", self);
        let Some(info) = self.token() else {
            return;
        };
        cprintln!(
            "     <blue>--></> <underline>{}:{}:{}</>",
            info.file,
            info.line + 1,
            info.col + 1
        );
        cprintln!("      <blue>|</>");
        let content = lines.get(info.line).copied().unwrap_or("");
        cprintln!(" <blue>{:>4} |</> {}", info.line + 1, content);
        cprintln!("      <blue>|</> {}<red,bold>^</>", " ".repeat(info.col));
    }
}
