use arch::MacroError;
use color_print::cprintln;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown operation: `{0}`")]
    UnknownOperation(String),

    #[error("`{op}` takes {expected} operand(s), found {found}")]
    ArgumentCount {
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("Cannot parse `{0}` as {1}")]
    ParseArgument(String, String),

    #[error("Operand `{0}` out of range for {1}")]
    OutOfRange(String, String),

    #[error("Invalid label name: `{0}`")]
    InvalidLabel(String),

    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error("Undefined label(s): {}", .0.join(", "))]
    UndefinedLabel(Vec<String>),

    #[error("Re-defined label: `{name}` (first defined on line {first})")]
    RedefinedLabel { name: String, first: usize },

    #[error("Address 0x{0:08X} cannot be reached by a jump")]
    Unreachable(u32),

    #[error("line {line}: {source}")]
    At {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to read file")]
    FileRead(#[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),
}

impl Error {
    pub fn at(self, line: usize) -> Error {
        match self {
            at @ Error::At { .. } => at,
            other => Error::At {
                line,
                source: Box::new(other),
            },
        }
    }

    /// 1-based source line, if the error is tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::At { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Print error with the offending source line underneath.
    pub fn print_diag(&self, files: &IndexMap<String, Vec<String>>, file: &str) {
        let (line, inner) = match self {
            Error::At { line, source } => (Some(*line), source.as_ref()),
            other => (None, other),
        };
        cprintln!("<red,bold>error</>: {}", inner);

        let Some(line_num) = line else {
            cprintln!("     <blue>--></> <underline>{}</>", file);
            return;
        };
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line_num);
        cprintln!("      <blue>|</>");

        let line_content = files
            .get(file)
            .and_then(|lines| lines.get(line_num.wrapping_sub(1)))
            .map(|s| s.as_str())
            .unwrap_or("");

        cprintln!(" <blue>{:>4} |</> {}", line_num, line_content);
        cprintln!("      <blue>|</>");
    }
}
