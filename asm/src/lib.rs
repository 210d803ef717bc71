pub mod assembler;
pub mod error;
pub mod label;
pub mod parser;
pub mod util;

pub use assembler::{assemble, Assembler, Word};
pub use error::Error;
