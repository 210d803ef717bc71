pub mod dump;
pub mod trace;

use crate::model::{Machine, Step};

/// Observer called around the main loop.
pub trait Hook {
    fn init(&mut self, machine: &Machine);
    fn exec(&mut self, time: u64, step: &Step, machine: &Machine);
}
