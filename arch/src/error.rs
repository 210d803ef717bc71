use thiserror::Error;

use crate::reg::Reg;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown instruction word: 0x{0:08X}")]
    UnknownOpcode(u32),

    #[error("Unknown special register selector in 0x{0:08X}")]
    BadSelector(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    #[error("Malformed macro line: `{0}`")]
    Malformed(String),

    #[error("Unknown macro: `{0}`")]
    Unknown(String),

    #[error("Macro `{name}` takes {expected} argument(s), found {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Cannot parse `{0}` as {1}")]
    ParseArgument(String, String),

    #[error("Macro `{0}` cannot use scratch register {1} as an argument")]
    ScratchRegister(String, Reg),

    #[error("Macro `{0}` needs distinct operand registers, got {1} twice")]
    AliasedOperands(String, Reg),

    #[error("Macro `{0}` overwrites its operands, {1} is read-only")]
    ReadOnlyOperand(String, Reg),
}
