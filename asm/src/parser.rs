use arch::{
    inst::Inst,
    literal::{fits_signed, fits_unsigned, parse_int},
    macros::Macro,
    op::{Arg, OpKind},
    reg::{Reg, SReg},
};

use crate::error::Error;

// ----------------------------------------------------------------------------
// Statement

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Label(String),
    Macro(Macro),
    Code(Code),
}

impl Stmt {
    /// `None` for blank and comment lines.
    pub fn parse(line: &str) -> Result<Option<Stmt>, Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        if let Some(body) = line.strip_prefix("macro:") {
            return Ok(Some(Stmt::Macro(Macro::parse(body)?)));
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if let [word] = words.as_slice() {
            if let Some(name) = word.strip_suffix(':') {
                if !is_label(name) {
                    return Err(Error::InvalidLabel(name.to_string()));
                }
                return Ok(Some(Stmt::Label(name.to_string())));
            }
        }

        Code::parse(&words).map(|code| Some(Stmt::Code(code)))
    }
}

/// `[A-Za-z_.][A-Za-z0-9_.]*`
pub fn is_label(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

// ----------------------------------------------------------------------------
// Operation

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Inst(Inst),
    /// `j` / `jal` to a label whose address is filled in later.
    Jump(Inst, String),
}

impl Code {
    fn parse(words: &[&str]) -> Result<Code, Error> {
        let Some((op, args)) = words.split_first() else {
            return Err(Error::UnknownOperation(String::new()));
        };
        let kind = op
            .parse::<OpKind>()
            .map_err(|_| Error::UnknownOperation(op.to_string()))?;

        let fields = kind.arg_field();
        if args.len() != fields.len() {
            return Err(Error::ArgumentCount {
                op: kind.to_string(),
                expected: fields.len(),
                found: args.len(),
            });
        }

        // Get argument by index and parse it as the slot it fills
        // Example: arg!(0, reg) -> Reg
        macro_rules! arg {
            ($index:expr, $parse:ident) => {
                operand::$parse(args[$index], fields[$index])?
            };
        }

        use Inst::*;
        use OpKind as K;
        let inst = match kind {
            K::SLL => SLL(arg!(0, reg), arg!(1, reg), arg!(2, sa)),
            K::SRL => SRL(arg!(0, reg), arg!(1, reg), arg!(2, sa)),
            K::SRA => SRA(arg!(0, reg), arg!(1, reg), arg!(2, sa)),
            K::SLLV => SLLV(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::SRLV => SRLV(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::SRAV => SRAV(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::JR => JR(arg!(0, reg)),
            K::JALR => JALR(arg!(0, reg), arg!(1, reg)),
            K::SYSCALL => SYSCALL(),
            K::HALT => HALT(),
            K::ADD => ADD(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::ADDU => ADDU(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::SUB => SUB(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::SUBU => SUBU(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::AND => AND(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::OR => OR(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::XOR => XOR(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::NOR => NOR(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::SLT => SLT(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::SLTU => SLTU(arg!(0, reg), arg!(1, reg), arg!(2, reg)),
            K::MFS => MFS(arg!(0, reg), arg!(1, sel)),
            K::MTS => MTS(arg!(0, reg), arg!(1, sel)),
            K::ERET => ERET(),
            K::BLTZ => BLTZ(arg!(0, reg), arg!(1, simm)),
            K::BGEZ => BGEZ(arg!(0, reg), arg!(1, simm)),
            K::J | K::JAL => {
                let target = args[0];
                let inst = if kind == K::J { J(0) } else { JAL(0) };
                return match parse_int(target) {
                    Some(_) => Ok(Code::Inst(inst.with_index(arg!(0, index)))),
                    None if is_label(target) => Ok(Code::Jump(inst, target.to_string())),
                    None => Err(Error::ParseArgument(
                        target.to_string(),
                        Arg::INDEX.describe().to_string(),
                    )),
                };
            }
            K::BEQ => BEQ(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::BNE => BNE(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::BLEZ => BLEZ(arg!(0, reg), arg!(1, simm)),
            K::BGTZ => BGTZ(arg!(0, reg), arg!(1, simm)),
            K::ADDI => ADDI(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::ADDIU => ADDIU(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::SLTI => SLTI(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::SLTIU => SLTIU(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::ANDI => ANDI(arg!(0, reg), arg!(1, reg), arg!(2, uimm)),
            K::ORI => ORI(arg!(0, reg), arg!(1, reg), arg!(2, uimm)),
            K::XORI => XORI(arg!(0, reg), arg!(1, reg), arg!(2, uimm)),
            K::LUI => LUI(arg!(0, reg), arg!(1, uimm)),
            K::LW => LW(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
            K::SW => SW(arg!(0, reg), arg!(1, reg), arg!(2, simm)),
        };
        Ok(Code::Inst(inst))
    }
}

/// Operand parsers. A token that is not a number at all is a parse error,
/// a number that does not fit its field is a range error.
mod operand {
    use super::*;

    fn number(s: &str, slot: Arg) -> Result<i64, Error> {
        parse_int(s).ok_or_else(|| Error::ParseArgument(s.to_string(), slot.describe().to_string()))
    }

    fn out_of_range(s: &str, slot: Arg) -> Error {
        Error::OutOfRange(s.to_string(), slot.describe().to_string())
    }

    pub fn reg(s: &str, slot: Arg) -> Result<Reg, Error> {
        if let Some(reg) = Reg::parse(s) {
            return Ok(reg);
        }
        let value = number(s, slot)?;
        if fits_unsigned(value, 5) {
            Ok(Reg::from_field(value as u32))
        } else {
            Err(out_of_range(s, slot))
        }
    }

    pub fn sa(s: &str, slot: Arg) -> Result<u8, Error> {
        let value = number(s, slot)?;
        if fits_unsigned(value, 5) {
            Ok(value as u8)
        } else {
            Err(out_of_range(s, slot))
        }
    }

    pub fn simm(s: &str, slot: Arg) -> Result<i16, Error> {
        let value = number(s, slot)?;
        if fits_signed(value, 16) {
            Ok(value as i16)
        } else {
            Err(out_of_range(s, slot))
        }
    }

    pub fn uimm(s: &str, slot: Arg) -> Result<u16, Error> {
        let value = number(s, slot)?;
        if fits_unsigned(value, 16) {
            Ok(value as u16)
        } else {
            Err(out_of_range(s, slot))
        }
    }

    pub fn index(s: &str, slot: Arg) -> Result<u32, Error> {
        let value = number(s, slot)?;
        if fits_unsigned(value, 26) {
            Ok(value as u32)
        } else {
            Err(out_of_range(s, slot))
        }
    }

    pub fn sel(s: &str, slot: Arg) -> Result<SReg, Error> {
        SReg::parse(s).ok_or_else(|| Error::ParseArgument(s.to_string(), slot.describe().to_string()))
    }
}
