pub mod config;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod model;

pub use config::Config;
pub use error::{Error, Trap};
pub use model::{image_from_bytes, image_from_text, Halt, Machine, Step};
