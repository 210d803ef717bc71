use arch::{
    alu::{valu, ALU},
    format::parse_bin_string,
    inst::Inst,
    reg::{Reg, SReg},
};
use log::trace;
use std::fmt;

use crate::{
    config::Config,
    error::{Error, Trap},
    hooks::Hook,
    memory::Memory,
};

/// Why the machine stopped without trapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// `syscall` with the code found in r1.
    Signal(u32),
    /// `halt`
    Halted,
    /// The program counter left the loaded image.
    EndOfProgram,
    StepLimit,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Signal(code) => write!(f, "signal {code}"),
            Halt::Halted => write!(f, "halted"),
            Halt::EndOfProgram => write!(f, "end of program"),
            Halt::StepLimit => write!(f, "step limit reached"),
        }
    }
}

impl Halt {
    /// Process exit status. Signal 1 is success; any other signal,
    /// 0 included, is a failure carrying its code (saturated to 255).
    pub fn exit_code(self) -> u8 {
        match self {
            Halt::Signal(1) => 0,
            Halt::Signal(0) => 1,
            Halt::Signal(code) => code.min(255) as u8,
            Halt::Halted | Halt::EndOfProgram | Halt::StepLimit => 0,
        }
    }
}

/// Result of one fetch-decode-execute step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub addr: u32,
    /// `None` if nothing was executed.
    pub inst: Option<Inst>,
    pub halt: Option<Halt>,
}

pub struct Machine {
    regs: [u32; Reg::COUNT],
    sregs: [u32; SReg::COUNT],
    pc: u32,
    mem: Memory,
    image_end: u32,
    steps: u64,
}

// Register and memory access
impl Machine {
    pub fn reg(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    /// Writes to register 0 are dropped.
    pub fn set_reg(&mut self, reg: Reg, value: u32) {
        if reg != Reg::ZERO {
            self.regs[reg.index()] = value;
        }
    }

    pub fn sreg(&self, sreg: SReg) -> u32 {
        self.sregs[sreg.index()]
    }

    pub fn set_sreg(&mut self, sreg: SReg, value: u32) {
        self.sregs[sreg.index()] = value;
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn image_end(&self) -> u32 {
        self.image_end
    }

    /// Word at `addr`, or `None` if unaligned or outside memory.
    pub fn peek(&self, addr: u32) -> Option<u32> {
        (addr % 4 == 0 && self.mem.contains(addr)).then(|| self.mem.read(addr))
    }

    pub fn poke(&mut self, addr: u32, value: u32) -> Result<(), Trap> {
        self.check(self.pc, addr)?;
        self.mem.write(addr, value);
        Ok(())
    }

    fn check(&self, pc: u32, addr: u32) -> Result<(), Trap> {
        if addr % 4 != 0 {
            return Err(Trap::UnalignedAccess { pc, addr });
        }
        if !self.mem.contains(addr) {
            return Err(Trap::AccessOutOfBounds { pc, addr });
        }
        Ok(())
    }

    fn load_word(&self, pc: u32, addr: u32) -> Result<u32, Trap> {
        self.check(pc, addr)?;
        Ok(self.mem.read(addr))
    }

    fn store_word(&mut self, pc: u32, addr: u32, value: u32) -> Result<(), Trap> {
        self.check(pc, addr)?;
        self.mem.write(addr, value);
        Ok(())
    }
}

// Construction and loading
impl Machine {
    pub fn new(config: &Config) -> Self {
        Machine {
            regs: [0; Reg::COUNT],
            sregs: [0; SReg::COUNT],
            pc: 0,
            mem: Memory::new(config.memory_size),
            image_end: 0,
            steps: 0,
        }
    }

    /// Place `words` at address 0. The image ends after the last word.
    pub fn load(&mut self, words: &[u32]) -> Result<(), Error> {
        let bytes = (words.len() as u64) * 4;
        if bytes > self.mem.size() || bytes > u32::MAX as u64 {
            return Err(Error::ImageTooLarge(words.len()));
        }
        for (i, word) in words.iter().enumerate() {
            self.mem.write((i * 4) as u32, *word);
        }
        self.image_end = bytes as u32;
        Ok(())
    }
}

/// Raw big-endian image.
pub fn image_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, Error> {
    if bytes.len() % 4 != 0 {
        return Err(Error::TruncatedImage(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// One binary-string word per line. Blank lines are skipped.
pub fn image_from_text(text: &str) -> Result<Vec<u32>, Error> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_bin_string(line).ok_or(Error::BadWord(idx + 1)))
        .collect()
}

// Execution
impl Machine {
    pub fn step(&mut self) -> Result<Step, Trap> {
        let pc = self.pc;
        if pc % 4 != 0 {
            return Err(Trap::UnalignedFetch(pc));
        }
        if !self.mem.contains(pc) {
            return Err(Trap::FetchOutOfBounds(pc));
        }
        if pc >= self.image_end {
            return Ok(Step {
                addr: pc,
                inst: None,
                halt: Some(Halt::EndOfProgram),
            });
        }

        let word = self.mem.read(pc);
        let inst = Inst::decode(word).map_err(|_| Trap::IllegalInstruction { pc, word })?;
        trace!("[{:>8}] {:08X} {}", self.steps, pc, inst);

        self.steps += 1;
        self.pc = pc.wrapping_add(4);
        let halt = self.exec(pc, inst)?;
        Ok(Step {
            addr: pc,
            inst: Some(inst),
            halt,
        })
    }

    fn exec(&mut self, pc: u32, inst: Inst) -> Result<Option<Halt>, Trap> {
        let branch = |off: i16| pc.wrapping_add((off as i32 as u32).wrapping_mul(4));

        use Inst::*;
        match inst {
            SLL(rd, rt, sa) => self.set_reg(rd, valu(ALU::SLL, self.reg(rt), sa as u32)),
            SRL(rd, rt, sa) => self.set_reg(rd, valu(ALU::SRL, self.reg(rt), sa as u32)),
            SRA(rd, rt, sa) => self.set_reg(rd, valu(ALU::SRA, self.reg(rt), sa as u32)),
            SLLV(rd, rt, rs) => self.set_reg(rd, valu(ALU::SLL, self.reg(rt), self.reg(rs))),
            SRLV(rd, rt, rs) => self.set_reg(rd, valu(ALU::SRL, self.reg(rt), self.reg(rs))),
            SRAV(rd, rt, rs) => self.set_reg(rd, valu(ALU::SRA, self.reg(rt), self.reg(rs))),

            JR(rs) => self.pc = self.reg(rs),
            JALR(rd, rs) => {
                let target = self.reg(rs);
                self.set_reg(rd, pc.wrapping_add(4));
                self.pc = target;
            }
            SYSCALL() => return Ok(Some(Halt::Signal(self.reg(Reg::SIG)))),
            HALT() => return Ok(Some(Halt::Halted)),

            ADD(rd, rs, rt) => self.calc(ALU::ADD, rd, rs, rt),
            ADDU(rd, rs, rt) => self.calc(ALU::ADDU, rd, rs, rt),
            SUB(rd, rs, rt) => self.calc(ALU::SUB, rd, rs, rt),
            SUBU(rd, rs, rt) => self.calc(ALU::SUBU, rd, rs, rt),
            AND(rd, rs, rt) => self.calc(ALU::AND, rd, rs, rt),
            OR(rd, rs, rt) => self.calc(ALU::OR, rd, rs, rt),
            XOR(rd, rs, rt) => self.calc(ALU::XOR, rd, rs, rt),
            NOR(rd, rs, rt) => self.calc(ALU::NOR, rd, rs, rt),
            SLT(rd, rs, rt) => self.calc(ALU::SLT, rd, rs, rt),
            SLTU(rd, rs, rt) => self.calc(ALU::SLTU, rd, rs, rt),

            MFS(rt, sel) => self.set_reg(rt, self.sreg(sel)),
            MTS(rt, sel) => self.set_sreg(sel, self.reg(rt)),
            ERET() => self.pc = self.sreg(SReg::Epc),

            BLTZ(rs, off) => {
                if (self.reg(rs) as i32) < 0 {
                    self.pc = branch(off);
                }
            }
            BGEZ(rs, off) => {
                if (self.reg(rs) as i32) >= 0 {
                    self.pc = branch(off);
                }
            }
            BLEZ(rs, off) => {
                if (self.reg(rs) as i32) <= 0 {
                    self.pc = branch(off);
                }
            }
            BGTZ(rs, off) => {
                if (self.reg(rs) as i32) > 0 {
                    self.pc = branch(off);
                }
            }
            BEQ(rs, rt, off) => {
                if self.reg(rs) == self.reg(rt) {
                    self.pc = branch(off);
                }
            }
            BNE(rs, rt, off) => {
                if self.reg(rs) != self.reg(rt) {
                    self.pc = branch(off);
                }
            }
            J(index) => self.pc = index << 2,
            JAL(index) => {
                self.set_reg(Reg::RA, pc.wrapping_add(4));
                self.pc = index << 2;
            }

            ADDI(rt, rs, imm) | ADDIU(rt, rs, imm) => {
                self.set_reg(rt, valu(ALU::ADD, self.reg(rs), imm as i32 as u32))
            }
            SLTI(rt, rs, imm) => self.set_reg(rt, valu(ALU::SLT, self.reg(rs), imm as i32 as u32)),
            SLTIU(rt, rs, imm) => {
                self.set_reg(rt, valu(ALU::SLTU, self.reg(rs), imm as i32 as u32))
            }
            ANDI(rt, rs, imm) => self.set_reg(rt, valu(ALU::AND, self.reg(rs), imm as u32)),
            ORI(rt, rs, imm) => self.set_reg(rt, valu(ALU::OR, self.reg(rs), imm as u32)),
            XORI(rt, rs, imm) => self.set_reg(rt, valu(ALU::XOR, self.reg(rs), imm as u32)),
            LUI(rt, imm) => self.set_reg(rt, (imm as u32) << 16),

            LW(rt, base, off) => {
                let addr = self.reg(base).wrapping_add(off as i32 as u32);
                let value = self.load_word(pc, addr)?;
                self.set_reg(rt, value);
            }
            SW(rt, base, off) => {
                let addr = self.reg(base).wrapping_add(off as i32 as u32);
                self.store_word(pc, addr, self.reg(rt))?;
            }
        }
        Ok(None)
    }

    fn calc(&mut self, alu: ALU, rd: Reg, rs: Reg, rt: Reg) {
        let value = valu(alu, self.reg(rs), self.reg(rt));
        self.set_reg(rd, value);
    }

    /// Step until the machine halts, traps, or `budget` instructions have run.
    /// Hooks observe every step.
    pub fn run(&mut self, budget: u64, hooks: &mut [Box<dyn Hook>]) -> Result<Halt, Trap> {
        for hook in hooks.iter_mut() {
            hook.init(self);
        }
        for time in 0..budget {
            let step = self.step()?;
            for hook in hooks.iter_mut() {
                hook.exec(time, &step, self);
            }
            if let Some(halt) = step.halt {
                return Ok(halt);
            }
        }
        Ok(Halt::StepLimit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn r(i: u8) -> Reg {
        Reg::new(i).unwrap()
    }

    fn machine(insts: &[Inst]) -> Machine {
        let words: Vec<u32> = insts.iter().map(|i| i.encode()).collect();
        let mut m = Machine::new(&Config::default());
        m.load(&words).unwrap();
        m
    }

    fn run(m: &mut Machine) -> Result<Halt, Trap> {
        m.run(1000, &mut [])
    }

    #[test]
    fn zero_register_ignores_writes() {
        let mut m = machine(&[
            Inst::ADDI(Reg::ZERO, Reg::ZERO, 5),
            Inst::LUI(Reg::ZERO, 0xFFFF),
            Inst::JAL(3),
            Inst::LW(Reg::ZERO, Reg::ZERO, 0),
            Inst::MFS(Reg::ZERO, SReg::Timer),
            Inst::ADD(r(2), Reg::ZERO, Reg::ZERO),
            Inst::HALT(),
        ]);
        m.set_sreg(SReg::Timer, 77);
        assert_eq!(run(&mut m), Ok(Halt::Halted));
        assert_eq!(m.reg(Reg::ZERO), 0);
        assert_eq!(m.reg(r(2)), 0);
    }

    #[test]
    fn branch_offset_counts_from_the_branch() {
        let mut m = machine(&[
            Inst::BEQ(Reg::ZERO, Reg::ZERO, 2),
            Inst::ADDI(r(2), Reg::ZERO, 1),
            Inst::ADDI(r(3), Reg::ZERO, 1),
            Inst::BEQ(Reg::ZERO, Reg::ZERO, 1),
            Inst::HALT(),
        ]);
        assert_eq!(run(&mut m), Ok(Halt::Halted));
        assert_eq!(m.reg(r(2)), 0);
        assert_eq!(m.reg(r(3)), 1);
    }

    #[test]
    fn syscall_signals_r1() {
        let mut m = machine(&[Inst::ADDI(Reg::SIG, Reg::ZERO, 41), Inst::SYSCALL()]);
        assert_eq!(run(&mut m), Ok(Halt::Signal(41)));
    }

    #[test]
    fn runs_off_the_end() {
        let mut m = machine(&[Inst::ADDI(r(2), Reg::ZERO, 1)]);
        assert_eq!(run(&mut m), Ok(Halt::EndOfProgram));
        assert_eq!(m.steps(), 1);
    }

    #[test]
    fn step_limit_is_not_an_error() {
        let mut m = machine(&[Inst::BEQ(Reg::ZERO, Reg::ZERO, 0)]);
        assert_eq!(m.run(50, &mut []), Ok(Halt::StepLimit));
        assert_eq!(m.steps(), 50);
    }

    #[test]
    fn wrapping_arithmetic() {
        let mut m = machine(&[
            Inst::LUI(r(2), 0x7FFF),
            Inst::ORI(r(2), r(2), 0xFFFF),
            Inst::ADDI(r(3), r(2), 1),
            Inst::SUBU(r(4), Reg::ZERO, r(3)),
            Inst::SLT(r(5), r(3), Reg::ZERO),
            Inst::SLTU(r(6), r(3), Reg::ZERO),
            Inst::SRA(r(7), r(3), 31),
            Inst::HALT(),
        ]);
        assert_eq!(run(&mut m), Ok(Halt::Halted));
        assert_eq!(m.reg(r(3)), 0x8000_0000);
        assert_eq!(m.reg(r(4)), 0x8000_0000);
        assert_eq!(m.reg(r(5)), 1);
        assert_eq!(m.reg(r(6)), 0);
        assert_eq!(m.reg(r(7)), 0xFFFF_FFFF);
    }

    #[test]
    fn link_and_return() {
        let mut m = machine(&[
            Inst::JAL(3),
            Inst::ADDI(r(2), r(2), 10),
            Inst::HALT(),
            Inst::ADDI(r(2), r(2), 1),
            Inst::JR(Reg::RA),
        ]);
        assert_eq!(run(&mut m), Ok(Halt::Halted));
        assert_eq!(m.reg(r(2)), 11);
        assert_eq!(m.reg(Reg::RA), 4);
    }

    #[test]
    fn scratch_word_at_top_of_memory() {
        let mut m = machine(&[
            Inst::ADDI(r(2), Reg::ZERO, 99),
            Inst::SW(r(2), Reg::ZERO, -4),
            Inst::LW(r(3), Reg::ZERO, -4),
            Inst::HALT(),
        ]);
        assert_eq!(run(&mut m), Ok(Halt::Halted));
        assert_eq!(m.reg(r(3)), 99);
        assert_eq!(m.peek(0xFFFF_FFFC), Some(99));
    }

    #[test]
    fn traps() {
        let mut m = machine(&[Inst::LW(r(2), Reg::ZERO, 2)]);
        assert_eq!(run(&mut m), Err(Trap::UnalignedAccess { pc: 0, addr: 2 }));

        let mut m = machine(&[Inst::JR(r(2))]);
        m.set_reg(r(2), 6);
        assert_eq!(run(&mut m), Err(Trap::UnalignedFetch(6)));

        let mut m = Machine::new(&Config::default());
        m.load(&[0xFC00_0000]).unwrap();
        assert_eq!(
            run(&mut m),
            Err(Trap::IllegalInstruction {
                pc: 0,
                word: 0xFC00_0000
            })
        );

        let mut m = Machine::new(&Config {
            memory_size: 0x100,
            ..Config::default()
        });
        m.load(&[Inst::SW(Reg::ZERO, Reg::ZERO, 0x100).encode()]).unwrap();
        assert_eq!(
            run(&mut m),
            Err(Trap::AccessOutOfBounds { pc: 0, addr: 0x100 })
        );
    }

    #[test]
    fn eret_returns_to_epc() {
        let mut m = machine(&[Inst::ERET(), Inst::HALT(), Inst::SYSCALL()]);
        m.set_sreg(SReg::Epc, 8);
        assert_eq!(run(&mut m), Ok(Halt::Signal(0)));
    }

    #[test]
    fn leaving_the_image_ends_the_program() {
        let mut m = machine(&[Inst::HALT(), Inst::HALT()]);
        assert_eq!(m.image_end(), 8);
        m.set_pc(8);
        assert_eq!(run(&mut m), Ok(Halt::EndOfProgram));
        assert_eq!(m.pc(), 8);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Halt::Signal(1).exit_code(), 0);
        assert_eq!(Halt::Signal(0).exit_code(), 1);
        assert_eq!(Halt::Signal(7).exit_code(), 7);
        assert_eq!(Halt::Signal(41).exit_code(), 41);
        assert_eq!(Halt::Signal(256).exit_code(), 255);
        assert_eq!(Halt::Halted.exit_code(), 0);
        assert_eq!(Halt::EndOfProgram.exit_code(), 0);
    }

    #[test]
    fn loaders() {
        assert_eq!(
            image_from_bytes(&[0, 0, 0, 0x0C, 0, 0, 0, 0x0D]).unwrap(),
            vec![0x0C, 0x0D]
        );
        assert!(matches!(
            image_from_bytes(&[0, 0, 0]),
            Err(Error::TruncatedImage(3))
        ));
        assert_eq!(
            image_from_text("00000000000000000000000000001100\n\n00000000000000000000000000001101\n")
                .unwrap(),
            vec![0x0C, 0x0D]
        );
        assert!(matches!(image_from_text("0101\n"), Err(Error::BadWord(1))));
    }
}
