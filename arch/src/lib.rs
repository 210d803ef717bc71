//! M32 instruction set: registers, binary layout, instructions and macros.

pub mod alu;
pub mod error;
pub mod format;
pub mod inst;
pub mod literal;
pub mod macros;
pub mod memmap;
pub mod op;
pub mod reg;

pub use error::{DecodeError, MacroError};
pub use inst::Inst;
pub use macros::{EncType, Macro, MacroKind};
pub use memmap::MemoryMap;
pub use reg::{Reg, SReg};
