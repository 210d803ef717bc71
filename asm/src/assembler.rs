use arch::inst::Inst;
use log::trace;
use std::collections::VecDeque;

use crate::{
    error::Error,
    label::LabelManager,
    parser::{Code, Stmt},
};

/// One emitted instruction word and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub addr: u32,
    pub line: usize,
    pub inst: Inst,
}

impl Word {
    pub fn bin(&self) -> u32 {
        self.inst.encode()
    }
}

#[derive(Debug)]
struct Slot {
    word: Word,
    resolved: bool,
}

/// Streaming two-pass assembler.
///
/// Instructions are queued in program order. A jump to a label that is not
/// yet defined waits in the queue until the label appears, and the queue is
/// drained up to the first such jump after every line.
#[derive(Debug, Default)]
pub struct Assembler {
    pc: u32,
    labels: LabelManager,
    queue: VecDeque<Slot>,
    /// Sequence number of the queue front.
    head: usize,
    out: Vec<Word>,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler::default()
    }

    /// Address of the next instruction.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Words drained so far.
    pub fn emitted(&self) -> &[Word] {
        &self.out
    }

    /// Feed one source line. `line` is 1-based and only used for diagnostics.
    pub fn feed(&mut self, line: usize, text: &str) -> Result<(), Error> {
        self.feed_stmt(line, text).map_err(|e| e.at(line))?;
        self.drain();
        Ok(())
    }

    fn feed_stmt(&mut self, line: usize, text: &str) -> Result<(), Error> {
        let Some(stmt) = Stmt::parse(text)? else {
            return Ok(());
        };
        trace!("{:5} {:08X} {}", line, self.pc, text.trim());

        match stmt {
            Stmt::Label(name) => {
                let waiting = self.labels.define(&name, self.pc, line)?;
                let index = jump_index(self.pc)?;
                for seq in waiting {
                    let slot = &mut self.queue[seq - self.head];
                    slot.word.inst = slot.word.inst.with_index(index);
                    slot.resolved = true;
                }
            }
            Stmt::Macro(mac) => {
                for inst in mac.expand()? {
                    self.push(line, inst, true);
                }
            }
            Stmt::Code(Code::Inst(inst)) => self.push(line, inst, true),
            Stmt::Code(Code::Jump(inst, label)) => {
                let seq = self.head + self.queue.len();
                match self.labels.reference(&label, seq, line) {
                    Some(addr) => self.push(line, inst.with_index(jump_index(addr)?), true),
                    None => self.push(line, inst, false),
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, line: usize, inst: Inst, resolved: bool) {
        self.queue.push_back(Slot {
            word: Word {
                addr: self.pc,
                line,
                inst,
            },
            resolved,
        });
        self.pc = self.pc.wrapping_add(4);
    }

    /// Emit the resolved prefix of the queue.
    fn drain(&mut self) {
        while self.queue.front().is_some_and(|slot| slot.resolved) {
            if let Some(slot) = self.queue.pop_front() {
                self.out.push(slot.word);
                self.head += 1;
            }
        }
    }

    /// End of input. Fails if any label is still undefined.
    pub fn finish(mut self) -> Result<Vec<Word>, Error> {
        let unresolved = self.labels.unresolved();
        if !unresolved.is_empty() {
            return Err(Error::UndefinedLabel(unresolved));
        }
        self.drain();
        Ok(self.out)
    }
}

fn jump_index(addr: u32) -> Result<u32, Error> {
    let index = addr >> 2;
    if index < (1 << 26) {
        Ok(index)
    } else {
        Err(Error::Unreachable(addr))
    }
}

/// Assemble a whole program held in memory.
pub fn assemble(text: &str) -> Result<Vec<Word>, Error> {
    let mut asm = Assembler::new();
    for (idx, line) in text.lines().enumerate() {
        asm.feed(idx + 1, line)?;
    }
    asm.finish()
}
