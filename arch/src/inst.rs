use crate::{
    error::DecodeError,
    format::Op,
    op::{Format, OpKind},
    reg::{Reg, SReg},
};

use color_print::cformat;
use std::fmt;

/// One machine instruction with typed operands, in textual operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    // rd rt sa
    SLL(Reg, Reg, u8),
    SRL(Reg, Reg, u8),
    SRA(Reg, Reg, u8),
    // rd rt rs
    SLLV(Reg, Reg, Reg),
    SRLV(Reg, Reg, Reg),
    SRAV(Reg, Reg, Reg),

    JR(Reg),
    JALR(Reg, Reg),
    SYSCALL(),
    HALT(),

    // rd rs rt
    ADD(Reg, Reg, Reg),
    ADDU(Reg, Reg, Reg),
    SUB(Reg, Reg, Reg),
    SUBU(Reg, Reg, Reg),
    AND(Reg, Reg, Reg),
    OR(Reg, Reg, Reg),
    XOR(Reg, Reg, Reg),
    NOR(Reg, Reg, Reg),
    SLT(Reg, Reg, Reg),
    SLTU(Reg, Reg, Reg),

    MFS(Reg, SReg),
    MTS(Reg, SReg),
    ERET(),

    BLTZ(Reg, i16),
    BGEZ(Reg, i16),
    J(u32),
    JAL(u32),
    BEQ(Reg, Reg, i16),
    BNE(Reg, Reg, i16),
    BLEZ(Reg, i16),
    BGTZ(Reg, i16),

    // rt rs imm
    ADDI(Reg, Reg, i16),
    ADDIU(Reg, Reg, i16),
    SLTI(Reg, Reg, i16),
    SLTIU(Reg, Reg, i16),
    ANDI(Reg, Reg, u16),
    ORI(Reg, Reg, u16),
    XORI(Reg, Reg, u16),
    LUI(Reg, u16),

    // rt base offset
    LW(Reg, Reg, i16),
    SW(Reg, Reg, i16),
}

impl Inst {
    pub fn kind(&self) -> OpKind {
        use Inst::*;
        match self {
            SLL(..) => OpKind::SLL,
            SRL(..) => OpKind::SRL,
            SRA(..) => OpKind::SRA,
            SLLV(..) => OpKind::SLLV,
            SRLV(..) => OpKind::SRLV,
            SRAV(..) => OpKind::SRAV,
            JR(..) => OpKind::JR,
            JALR(..) => OpKind::JALR,
            SYSCALL() => OpKind::SYSCALL,
            HALT() => OpKind::HALT,
            ADD(..) => OpKind::ADD,
            ADDU(..) => OpKind::ADDU,
            SUB(..) => OpKind::SUB,
            SUBU(..) => OpKind::SUBU,
            AND(..) => OpKind::AND,
            OR(..) => OpKind::OR,
            XOR(..) => OpKind::XOR,
            NOR(..) => OpKind::NOR,
            SLT(..) => OpKind::SLT,
            SLTU(..) => OpKind::SLTU,
            MFS(..) => OpKind::MFS,
            MTS(..) => OpKind::MTS,
            ERET() => OpKind::ERET,
            BLTZ(..) => OpKind::BLTZ,
            BGEZ(..) => OpKind::BGEZ,
            J(..) => OpKind::J,
            JAL(..) => OpKind::JAL,
            BEQ(..) => OpKind::BEQ,
            BNE(..) => OpKind::BNE,
            BLEZ(..) => OpKind::BLEZ,
            BGTZ(..) => OpKind::BGTZ,
            ADDI(..) => OpKind::ADDI,
            ADDIU(..) => OpKind::ADDIU,
            SLTI(..) => OpKind::SLTI,
            SLTIU(..) => OpKind::SLTIU,
            ANDI(..) => OpKind::ANDI,
            ORI(..) => OpKind::ORI,
            XORI(..) => OpKind::XORI,
            LUI(..) => OpKind::LUI,
            LW(..) => OpKind::LW,
            SW(..) => OpKind::SW,
        }
    }

    pub fn to_op(self) -> Op {
        let kind = self.kind();
        let opcode = kind.opcode();
        let fun = kind.sub_code();
        let z = Reg::ZERO;

        let r = |rs: Reg, rt: Reg, rd: Reg, sa: u8| Op::R {
            opcode,
            rs: rs.into(),
            rt: rt.into(),
            rd: rd.into(),
            sa,
            fun,
        };
        let i = |rs: Reg, rt: Reg, imm: u16| Op::I {
            opcode,
            rs: rs.into(),
            rt: rt.into(),
            imm,
        };

        use Inst::*;
        match self {
            SLL(rd, rt, sa) | SRL(rd, rt, sa) | SRA(rd, rt, sa) => r(z, rt, rd, sa),
            SLLV(rd, rt, rs) | SRLV(rd, rt, rs) | SRAV(rd, rt, rs) => r(rs, rt, rd, 0),
            JR(rs) => r(rs, z, z, 0),
            JALR(rd, rs) => r(rs, z, rd, 0),
            SYSCALL() | HALT() | ERET() => r(z, z, z, 0),
            ADD(rd, rs, rt) | ADDU(rd, rs, rt) | SUB(rd, rs, rt) | SUBU(rd, rs, rt)
            | AND(rd, rs, rt) | OR(rd, rs, rt) | XOR(rd, rs, rt) | NOR(rd, rs, rt)
            | SLT(rd, rs, rt) | SLTU(rd, rs, rt) => r(rs, rt, rd, 0),
            MFS(rt, sel) | MTS(rt, sel) => r(z, rt, Reg::from_field(u8::from(sel) as u32), 0),
            BLTZ(rs, off) | BGEZ(rs, off) => Op::I {
                opcode,
                rs: rs.into(),
                rt: fun,
                imm: off as u16,
            },
            J(index) | JAL(index) => Op::J { opcode, index },
            BEQ(rs, rt, off) | BNE(rs, rt, off) => i(rs, rt, off as u16),
            BLEZ(rs, off) | BGTZ(rs, off) => i(rs, z, off as u16),
            ADDI(rt, rs, imm) | ADDIU(rt, rs, imm) | SLTI(rt, rs, imm) | SLTIU(rt, rs, imm) => {
                i(rs, rt, imm as u16)
            }
            ANDI(rt, rs, imm) | ORI(rt, rs, imm) | XORI(rt, rs, imm) => i(rs, rt, imm),
            LUI(rt, imm) => i(z, rt, imm),
            LW(rt, rs, off) | SW(rt, rs, off) => i(rs, rt, off as u16),
        }
    }

    pub fn from_op(op: Op) -> Result<Inst, DecodeError> {
        let bin = op.to_bin();
        let kind = match op {
            Op::R { opcode, fun, .. } => OpKind::decode(opcode, fun, 0),
            Op::I { opcode, rt, .. } => OpKind::decode(opcode, 0, rt),
            Op::J { opcode, .. } => OpKind::decode(opcode, 0, 0),
        }
        .ok_or(DecodeError::UnknownOpcode(bin))?;

        use OpKind as K;
        let inst = match op {
            Op::R { rs, rt, rd, sa, .. } => {
                let (rs, rt, rd) = (
                    Reg::from_field(rs as u32),
                    Reg::from_field(rt as u32),
                    Reg::from_field(rd as u32),
                );
                let sel = || SReg::try_from(u8::from(rd)).map_err(|_| DecodeError::BadSelector(bin));
                match kind {
                    K::SLL => Inst::SLL(rd, rt, sa),
                    K::SRL => Inst::SRL(rd, rt, sa),
                    K::SRA => Inst::SRA(rd, rt, sa),
                    K::SLLV => Inst::SLLV(rd, rt, rs),
                    K::SRLV => Inst::SRLV(rd, rt, rs),
                    K::SRAV => Inst::SRAV(rd, rt, rs),
                    K::JR => Inst::JR(rs),
                    K::JALR => Inst::JALR(rd, rs),
                    K::SYSCALL => Inst::SYSCALL(),
                    K::HALT => Inst::HALT(),
                    K::ADD => Inst::ADD(rd, rs, rt),
                    K::ADDU => Inst::ADDU(rd, rs, rt),
                    K::SUB => Inst::SUB(rd, rs, rt),
                    K::SUBU => Inst::SUBU(rd, rs, rt),
                    K::AND => Inst::AND(rd, rs, rt),
                    K::OR => Inst::OR(rd, rs, rt),
                    K::XOR => Inst::XOR(rd, rs, rt),
                    K::NOR => Inst::NOR(rd, rs, rt),
                    K::SLT => Inst::SLT(rd, rs, rt),
                    K::SLTU => Inst::SLTU(rd, rs, rt),
                    K::MFS => Inst::MFS(rt, sel()?),
                    K::MTS => Inst::MTS(rt, sel()?),
                    K::ERET => Inst::ERET(),
                    _ => return Err(DecodeError::UnknownOpcode(bin)),
                }
            }
            Op::I { rs, rt, imm, .. } => {
                let (rs, rt) = (Reg::from_field(rs as u32), Reg::from_field(rt as u32));
                let simm = imm as i16;
                match kind {
                    K::BLTZ => Inst::BLTZ(rs, simm),
                    K::BGEZ => Inst::BGEZ(rs, simm),
                    K::BEQ => Inst::BEQ(rs, rt, simm),
                    K::BNE => Inst::BNE(rs, rt, simm),
                    K::BLEZ => Inst::BLEZ(rs, simm),
                    K::BGTZ => Inst::BGTZ(rs, simm),
                    K::ADDI => Inst::ADDI(rt, rs, simm),
                    K::ADDIU => Inst::ADDIU(rt, rs, simm),
                    K::SLTI => Inst::SLTI(rt, rs, simm),
                    K::SLTIU => Inst::SLTIU(rt, rs, simm),
                    K::ANDI => Inst::ANDI(rt, rs, imm),
                    K::ORI => Inst::ORI(rt, rs, imm),
                    K::XORI => Inst::XORI(rt, rs, imm),
                    K::LUI => Inst::LUI(rt, imm),
                    K::LW => Inst::LW(rt, rs, simm),
                    K::SW => Inst::SW(rt, rs, simm),
                    _ => return Err(DecodeError::UnknownOpcode(bin)),
                }
            }
            Op::J { index, .. } => match kind {
                K::J => Inst::J(index),
                K::JAL => Inst::JAL(index),
                _ => return Err(DecodeError::UnknownOpcode(bin)),
            },
        };
        debug_assert_eq!(inst.kind().format(), format_of(&op));
        Ok(inst)
    }

    pub fn encode(self) -> u32 {
        self.to_op().to_bin()
    }

    pub fn decode(bin: u32) -> Result<Inst, DecodeError> {
        Inst::from_op(Op::from_bin(bin))
    }

    /// Set the target of a `j` / `jal`. Other instructions are returned unchanged.
    pub fn with_index(self, index: u32) -> Inst {
        match self {
            Inst::J(_) => Inst::J(index),
            Inst::JAL(_) => Inst::JAL(index),
            other => other,
        }
    }
}

fn format_of(op: &Op) -> Format {
    match op {
        Op::R { .. } => Format::R,
        Op::I { .. } => Format::I,
        Op::J { .. } => Format::J,
    }
}

/// Assembler text, parseable by the assembler.
impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Inst::*;
        let name = self.kind();
        match *self {
            SLL(a, b, c) | SRL(a, b, c) | SRA(a, b, c) => write!(f, "{name} {a} {b} {c}"),
            SLLV(a, b, c) | SRLV(a, b, c) | SRAV(a, b, c) | ADD(a, b, c) | ADDU(a, b, c)
            | SUB(a, b, c) | SUBU(a, b, c) | AND(a, b, c) | OR(a, b, c) | XOR(a, b, c)
            | NOR(a, b, c) | SLT(a, b, c) | SLTU(a, b, c) => write!(f, "{name} {a} {b} {c}"),
            JR(a) => write!(f, "{name} {a}"),
            JALR(a, b) => write!(f, "{name} {a} {b}"),
            SYSCALL() | HALT() | ERET() => write!(f, "{name}"),
            MFS(a, s) | MTS(a, s) => write!(f, "{name} {a} {s}"),
            BLTZ(a, o) | BGEZ(a, o) | BLEZ(a, o) | BGTZ(a, o) => write!(f, "{name} {a} {o}"),
            J(i) | JAL(i) => write!(f, "{name} {i}"),
            BEQ(a, b, o) | BNE(a, b, o) => write!(f, "{name} {a} {b} {o}"),
            ADDI(a, b, o) | ADDIU(a, b, o) | SLTI(a, b, o) | SLTIU(a, b, o) | LW(a, b, o)
            | SW(a, b, o) => write!(f, "{name} {a} {b} {o}"),
            ANDI(a, b, u) | ORI(a, b, u) | XORI(a, b, u) => write!(f, "{name} {a} {b} {u}"),
            LUI(a, u) => write!(f, "{name} {a} {u}"),
        }
    }
}

impl Inst {
    pub fn cformat(&self) -> String {
        macro_rules! rrr {
            ($name:expr, $a:expr, $b:expr, $c:expr) => {
                cformat!("<r>{:<8}</><b>{:<4} {:<4} {:<4}</>", $name, $a, $b, $c)
            };
        }

        macro_rules! rri {
            ($name:expr, $a:expr, $b:expr, $imm:expr) => {
                cformat!(
                    "<r>{:<8}</><b>{:<4} {:<4} <y>{}</></>",
                    $name,
                    $a,
                    $b,
                    $imm
                )
            };
        }

        use Inst::*;
        let name = self.kind().to_string();
        match *self {
            SLL(a, b, c) | SRL(a, b, c) | SRA(a, b, c) => rri!(name, a, b, c),
            SLLV(a, b, c) | SRLV(a, b, c) | SRAV(a, b, c) | ADD(a, b, c) | ADDU(a, b, c)
            | SUB(a, b, c) | SUBU(a, b, c) | AND(a, b, c) | OR(a, b, c) | XOR(a, b, c)
            | NOR(a, b, c) | SLT(a, b, c) | SLTU(a, b, c) => rrr!(name, a, b, c),
            JR(a) => rrr!(name, a, "", ""),
            JALR(a, b) => rrr!(name, a, b, ""),
            SYSCALL() | HALT() | ERET() => rrr!(name, "", "", ""),
            MFS(a, s) | MTS(a, s) => rrr!(name, a, s, ""),
            BLTZ(a, o) | BGEZ(a, o) | BLEZ(a, o) | BGTZ(a, o) => rri!(name, a, "", o),
            J(i) | JAL(i) => rri!(name, "", "", format!("0x{:07X}", i)),
            BEQ(a, b, o) | BNE(a, b, o) => rri!(name, a, b, o),
            ADDI(a, b, o) | ADDIU(a, b, o) | SLTI(a, b, o) | SLTIU(a, b, o) | LW(a, b, o)
            | SW(a, b, o) => rri!(name, a, b, o),
            ANDI(a, b, u) | ORI(a, b, u) | XORI(a, b, u) => {
                rri!(name, a, b, format!("0x{:04X}", u))
            }
            LUI(a, u) => rri!(name, a, "", format!("0x{:04X}", u)),
        }
    }
}
