use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OpKind {
    SLL,
    SRL,
    SRA,
    SLLV,
    SRLV,
    SRAV,
    JR,
    JALR,
    SYSCALL,
    HALT,
    ADD,
    ADDU,
    SUB,
    SUBU,
    AND,
    OR,
    XOR,
    NOR,
    SLT,
    SLTU,
    MFS,
    MTS,
    ERET,
    BLTZ,
    BGEZ,
    J,
    JAL,
    BEQ,
    BNE,
    BLEZ,
    BGTZ,
    ADDI,
    ADDIU,
    SLTI,
    SLTIU,
    ANDI,
    ORI,
    XORI,
    LUI,
    LW,
    SW,
}

impl OpKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    R,
    I,
    J,
}

pub struct Opcode;

impl Opcode {
    pub const SPECIAL: u8 = 0x00;
    pub const REGIMM: u8 = 0x01;
    pub const J: u8 = 0x02;
    pub const JAL: u8 = 0x03;
    pub const BEQ: u8 = 0x04;
    pub const BNE: u8 = 0x05;
    pub const BLEZ: u8 = 0x06;
    pub const BGTZ: u8 = 0x07;
    pub const ADDI: u8 = 0x08;
    pub const ADDIU: u8 = 0x09;
    pub const SLTI: u8 = 0x0A;
    pub const SLTIU: u8 = 0x0B;
    pub const ANDI: u8 = 0x0C;
    pub const ORI: u8 = 0x0D;
    pub const XORI: u8 = 0x0E;
    pub const LUI: u8 = 0x0F;
    pub const PRIV: u8 = 0x10;
    pub const LW: u8 = 0x23;
    pub const SW: u8 = 0x2B;
}

/// Operand slots in textual order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    RD,
    RS,
    RT,
    /// 5-bit shift amount
    SA,
    /// 16-bit two's complement
    SIMM,
    /// 16-bit unsigned
    UIMM,
    /// 26-bit jump index or label
    INDEX,
    /// special register selector
    SEL,
}

impl Arg {
    pub fn describe(&self) -> &'static str {
        match self {
            Arg::RD | Arg::RS | Arg::RT => "register (0..31)",
            Arg::SA => "shift amount (0..31)",
            Arg::SIMM => "signed 16-bit immediate",
            Arg::UIMM => "unsigned 16-bit immediate",
            Arg::INDEX => "26-bit jump index or label",
            Arg::SEL => "special register",
        }
    }
}

impl OpKind {
    pub fn format(&self) -> Format {
        use OpKind::*;
        match self {
            J | JAL => Format::J,
            SLL | SRL | SRA | SLLV | SRLV | SRAV | JR | JALR | SYSCALL | HALT | ADD | ADDU
            | SUB | SUBU | AND | OR | XOR | NOR | SLT | SLTU | MFS | MTS | ERET => Format::R,
            _ => Format::I,
        }
    }

    pub fn opcode(&self) -> u8 {
        use OpKind::*;
        match self {
            MFS | MTS | ERET => Opcode::PRIV,
            BLTZ | BGEZ => Opcode::REGIMM,
            J => Opcode::J,
            JAL => Opcode::JAL,
            BEQ => Opcode::BEQ,
            BNE => Opcode::BNE,
            BLEZ => Opcode::BLEZ,
            BGTZ => Opcode::BGTZ,
            ADDI => Opcode::ADDI,
            ADDIU => Opcode::ADDIU,
            SLTI => Opcode::SLTI,
            SLTIU => Opcode::SLTIU,
            ANDI => Opcode::ANDI,
            ORI => Opcode::ORI,
            XORI => Opcode::XORI,
            LUI => Opcode::LUI,
            LW => Opcode::LW,
            SW => Opcode::SW,
            _ => Opcode::SPECIAL,
        }
    }

    /// Function field of R-type ops, or the rt selector of REGIMM branches.
    pub fn sub_code(&self) -> u8 {
        use OpKind::*;
        match self {
            SLL => 0x00,
            SRL => 0x02,
            SRA => 0x03,
            SLLV => 0x04,
            SRLV => 0x06,
            SRAV => 0x07,
            JR => 0x08,
            JALR => 0x09,
            SYSCALL => 0x0C,
            HALT => 0x0D,
            ADD => 0x20,
            ADDU => 0x21,
            SUB => 0x22,
            SUBU => 0x23,
            AND => 0x24,
            OR => 0x25,
            XOR => 0x26,
            NOR => 0x27,
            SLT => 0x2A,
            SLTU => 0x2B,
            MFS => 0x00,
            MTS => 0x04,
            ERET => 0x18,
            BLTZ => 0x00,
            BGEZ => 0x01,
            _ => 0x00,
        }
    }

    pub fn arg_field(&self) -> Vec<Arg> {
        use OpKind::*;
        match self {
            SLL | SRL | SRA => vec![Arg::RD, Arg::RT, Arg::SA],
            SLLV | SRLV | SRAV => vec![Arg::RD, Arg::RT, Arg::RS],
            JR => vec![Arg::RS],
            JALR => vec![Arg::RD, Arg::RS],
            SYSCALL | HALT | ERET => vec![],
            ADD | ADDU | SUB | SUBU | AND | OR | XOR | NOR | SLT | SLTU => {
                vec![Arg::RD, Arg::RS, Arg::RT]
            }
            MFS | MTS => vec![Arg::RT, Arg::SEL],
            BLTZ | BGEZ | BLEZ | BGTZ => vec![Arg::RS, Arg::SIMM],
            J | JAL => vec![Arg::INDEX],
            BEQ | BNE => vec![Arg::RS, Arg::RT, Arg::SIMM],
            ADDI | ADDIU | SLTI | SLTIU => vec![Arg::RT, Arg::RS, Arg::SIMM],
            ANDI | ORI | XORI => vec![Arg::RT, Arg::RS, Arg::UIMM],
            LUI => vec![Arg::RT, Arg::UIMM],
            LW | SW => vec![Arg::RT, Arg::RS, Arg::SIMM],
        }
    }

    /// Recover the mnemonic from (opcode, fun) for R-type, (opcode, rt) for REGIMM
    /// and opcode alone otherwise.
    pub fn decode(opcode: u8, fun: u8, rt: u8) -> Option<OpKind> {
        let key = match opcode {
            Opcode::SPECIAL | Opcode::PRIV => (opcode, fun),
            Opcode::REGIMM => (opcode, rt),
            _ => (opcode, 0),
        };
        DECODE.get(&key).copied()
    }
}

static DECODE: Lazy<HashMap<(u8, u8), OpKind>> = Lazy::new(|| {
    OpKind::iter()
        .map(|kind| ((kind.opcode(), kind.sub_code()), kind))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mnemonics() {
        assert_eq!(OpKind::parse("addi"), Ok(OpKind::ADDI));
        assert_eq!(OpKind::parse("SYSCALL"), Ok(OpKind::SYSCALL));
        assert!(OpKind::parse("hoge").is_err());
        assert_eq!(OpKind::SLTIU.to_string(), "sltiu");
    }

    #[test]
    fn decode_table_is_injective() {
        // Every mnemonic must own a distinct (opcode, sub) key.
        assert_eq!(DECODE.len(), OpKind::iter().count());
        for kind in OpKind::iter() {
            let (fun, rt) = match kind.opcode() {
                Opcode::REGIMM => (0, kind.sub_code()),
                _ => (kind.sub_code(), 0),
            };
            assert_eq!(OpKind::decode(kind.opcode(), fun, rt), Some(kind));
        }
    }

    #[test]
    fn decode_unknown() {
        assert_eq!(OpKind::decode(0x3F, 0, 0), None);
        assert_eq!(OpKind::decode(Opcode::SPECIAL, 0x3F, 0), None);
        assert_eq!(OpKind::decode(Opcode::REGIMM, 0, 7), None);
    }
}
