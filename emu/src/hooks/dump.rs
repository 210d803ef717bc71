use arch::reg::Reg;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use crate::{
    error::Error,
    model::{Machine, Step},
};

use super::Hook;

/// Prints machine state after the instruction at chosen addresses runs.
#[derive(Debug)]
pub struct Dump {
    file: Option<String>,
    all: bool,
    list: List,
}

/// Keyed by instruction address.
#[derive(Debug, Default, Serialize, Deserialize)]
struct List(HashMap<u32, Config>);

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Config {
    /// Words from sp upward.
    stack: usize,
    /// Word addresses to print.
    words: Vec<u32>,
}

impl Dump {
    pub fn arg(file: Option<String>, all: bool) -> Result<Self, Error> {
        let list = match &file {
            Some(fname) => {
                let f = File::open(fname).map_err(|e| Error::FileOpen(fname.clone(), e))?;
                serde_yaml::from_reader(BufReader::new(f))
                    .map_err(|e| Error::Config(fname.clone(), e))?
            }
            None => List::default(),
        };
        Ok(Self { file, all, list })
    }

    fn get(&self, pc: u32) -> Option<&Config> {
        self.list.0.get(&pc)
    }
}

impl Hook for Dump {
    fn init(&mut self, _machine: &Machine) {
        if self.all {
            println!(" * Dump all");
        }
        if let Some(fname) = &self.file {
            println!(" * Dump[{}] {:?}", self.list.0.len(), fname);
        }
    }

    fn exec(&mut self, time: u64, step: &Step, machine: &Machine) {
        if let Some(cfg) = self.get(step.addr) {
            println!(" [{:>8}] after 0x{:08X}", time, step.addr);
            print_reg(machine);
            print_stack(machine, cfg.stack);
            print_words(machine, &cfg.words);
        } else if self.all {
            print_reg(machine);
        }
    }
}

const RULE: &str = " +-------------------+-------------------+-------------------+-------------------+";

pub fn print_reg(machine: &Machine) {
    println!("{RULE}");
    println!(
        " | pc  {:08X}      | steps {:<11} |                   |                   |",
        machine.pc(),
        machine.steps()
    );
    for row in 0..8u8 {
        let cells: Vec<String> = (0..4u8)
            .filter_map(|col| Reg::new(row + col * 8))
            .map(|reg| format!(" {:>4}: {:08X}    ", reg, machine.reg(reg)))
            .collect();
        println!(" |{}|", cells.join("|"));
    }
    println!("{RULE}");
}

fn print_stack(machine: &Machine, words: usize) {
    let sp = machine.reg(Reg::SP);
    let addrs: Vec<u32> = (0..words as u32).map(|i| sp.wrapping_add(4 * i)).collect();
    print_words(machine, &addrs);
}

fn print_words(machine: &Machine, addrs: &[u32]) {
    if addrs.is_empty() {
        return;
    }
    for addr in addrs {
        match machine.peek(*addr) {
            Some(value) => println!(" | {:08X} : {:08X} ({})", addr, value, value as i32),
            None => println!(" | {:08X} : --------", addr),
        }
    }
    println!("{RULE}");
}
