use color_print::cprintln;

use crate::model::{Machine, Step};

use super::Hook;

/// Prints every executed instruction.
#[derive(Debug, Default)]
pub struct Trace;

impl Hook for Trace {
    fn init(&mut self, _machine: &Machine) {
        println!(" * Trace");
    }

    fn exec(&mut self, time: u64, step: &Step, _machine: &Machine) {
        if let Some(inst) = step.inst {
            cprintln!("<dim>[{:>8}]</> <c>{:08X}</> {}", time, step.addr, inst.cformat());
        }
    }
}
