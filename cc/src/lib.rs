//! Compiler from a small C-like language to M32 assembly.

pub mod codegen;
pub mod context;
pub mod driver;
pub mod error;
pub mod grammer;
pub mod regalloc;
pub mod types;

pub use driver::{build, compile, parse, Config};
pub use error::Error;
