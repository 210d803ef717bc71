//! Pseudo-instructions and their expansion into real instructions.
//!
//! The expansion function is the only place a macro's length is defined.
//! [`MacroKind::size`] is the cached length of a canonical expansion, so the
//! code generator's branch arithmetic and the assembler's output cannot drift.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
    error::MacroError,
    inst::Inst,
    literal::parse_int,
    memmap::{PCB_SREG_BASE, SCRATCH_OFFSET},
    reg::{Reg, SReg},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum MacroKind {
    Zero,
    Mul,
    Divu,
    Divt,
    Gpr,
    Ssave,
    Srestore,
    SaveUser,
    RestoreUser,
}

/// Primitive type tag of a `gpr(..) = enc(value, type)` load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum EncType {
    Int,
    Uint,
    Bool,
    Char,
}

impl EncType {
    /// Bit pattern of a literal of this type.
    pub fn encode(self, text: &str) -> Option<u32> {
        let text = text.trim();
        match self {
            EncType::Int => {
                let v = parse_int(text)?;
                i32::try_from(v).ok().map(|v| v as u32)
            }
            EncType::Uint => {
                let text = text
                    .strip_suffix('u')
                    .or_else(|| text.strip_suffix('U'))
                    .unwrap_or(text);
                let v = parse_int(text)?;
                u32::try_from(v).ok()
            }
            EncType::Bool => match text {
                "true" | "1" => Some(1),
                "false" | "0" => Some(0),
                _ => None,
            },
            EncType::Char => {
                let quoted = text
                    .strip_prefix('\'')
                    .and_then(|t| t.strip_suffix('\''));
                match quoted {
                    Some(inner) => {
                        let mut chars = inner.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Some(c as u32),
                            _ => None,
                        }
                    }
                    None => {
                        let v = parse_int(text)?;
                        u32::try_from(v).ok()
                    }
                }
            }
        }
    }

    pub fn render(self, bits: u32) -> String {
        match self {
            EncType::Int => (bits as i32).to_string(),
            EncType::Uint | EncType::Char => bits.to_string(),
            EncType::Bool => (bits != 0).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Macro {
    /// Store `count` zero words from `base` upward. Both registers are consumed.
    Zero { base: Reg, count: Reg },
    /// `dst = a * b` (mod 2^32). `a` is consumed.
    Mul { dst: Reg, a: Reg, b: Reg },
    /// `dst = a / b`, unsigned. `a` and `b` are consumed.
    Divu { dst: Reg, a: Reg, b: Reg },
    /// `dst = a / b`, signed, truncating toward zero. `a` and `b` are consumed.
    Divt { dst: Reg, a: Reg, b: Reg },
    Gpr { reg: Reg, value: u32, ty: EncType },
    Ssave(Reg),
    Srestore(Reg),
    SaveUser,
    RestoreUser,
}

static SIZES: Lazy<HashMap<MacroKind, usize>> = Lazy::new(|| {
    MacroKind::iter()
        .map(|kind| (kind, kind.canonical().emit().len()))
        .collect()
});

impl MacroKind {
    /// Number of real instructions this macro expands to.
    pub fn size(self) -> usize {
        SIZES[&self]
    }

    pub fn arity(self) -> usize {
        match self {
            MacroKind::Zero => 2,
            MacroKind::Mul | MacroKind::Divu | MacroKind::Divt => 3,
            MacroKind::Gpr | MacroKind::Ssave | MacroKind::Srestore => 1,
            MacroKind::SaveUser | MacroKind::RestoreUser => 0,
        }
    }

    fn canonical(self) -> Macro {
        let (d, a, b) = (Reg::from_field(1), Reg::from_field(2), Reg::from_field(3));
        match self {
            MacroKind::Zero => Macro::Zero { base: a, count: b },
            MacroKind::Mul => Macro::Mul { dst: d, a, b },
            MacroKind::Divu => Macro::Divu { dst: d, a, b },
            MacroKind::Divt => Macro::Divt { dst: d, a, b },
            MacroKind::Gpr => Macro::Gpr {
                reg: d,
                value: 0,
                ty: EncType::Int,
            },
            MacroKind::Ssave => Macro::Ssave(d),
            MacroKind::Srestore => Macro::Srestore(d),
            MacroKind::SaveUser => Macro::SaveUser,
            MacroKind::RestoreUser => Macro::RestoreUser,
        }
    }
}

// ----------------------------------------------------------------------------
// Parsing

/// Split `name(a, b)` into its name and trimmed arguments. A bare `name` has none.
fn split_call(text: &str) -> Option<(&str, Vec<&str>)> {
    let text = text.trim();
    match text.find('(') {
        None => Some((text, vec![])),
        Some(open) => {
            let inner = text.get(open + 1..)?.strip_suffix(')')?;
            let name = text[..open].trim();
            let args = if inner.trim().is_empty() {
                vec![]
            } else {
                inner.split(',').map(str::trim).collect()
            };
            Some((name, args))
        }
    }
}

fn parse_reg(arg: &str) -> Result<Reg, MacroError> {
    Reg::parse(arg).ok_or_else(|| MacroError::ParseArgument(arg.to_string(), "register".into()))
}

impl Macro {
    /// Parse the text after `macro:`.
    pub fn parse(body: &str) -> Result<Macro, MacroError> {
        let malformed = || MacroError::Malformed(body.trim().to_string());

        // gpr(reg) = enc(value, type)
        if let Some((lhs, rhs)) = body.split_once('=') {
            let (name, args) = split_call(lhs).ok_or_else(malformed)?;
            if !matches!(name.parse::<MacroKind>(), Ok(MacroKind::Gpr)) {
                return Err(malformed());
            }
            let [reg] = args.as_slice() else {
                return Err(MacroError::ArgumentCount {
                    name: name.to_string(),
                    expected: 1,
                    found: args.len(),
                });
            };
            let reg = parse_reg(reg)?;

            let rhs = rhs.trim();
            let inner = rhs
                .strip_prefix("enc")
                .map(str::trim_start)
                .and_then(|r| r.strip_prefix('('))
                .and_then(|r| r.strip_suffix(')'))
                .ok_or_else(malformed)?;
            let (value, ty) = inner.rsplit_once(',').ok_or_else(malformed)?;
            let ty = ty
                .trim()
                .parse::<EncType>()
                .map_err(|_| MacroError::ParseArgument(ty.trim().to_string(), "type".into()))?;
            let value = ty.encode(value).ok_or_else(|| {
                MacroError::ParseArgument(value.trim().to_string(), ty.to_string())
            })?;
            return Ok(Macro::Gpr { reg, value, ty });
        }

        let (name, args) = split_call(body).ok_or_else(malformed)?;
        if name.is_empty() {
            return Err(malformed());
        }
        let kind = name
            .parse::<MacroKind>()
            .map_err(|_| MacroError::Unknown(name.to_string()))?;
        if kind == MacroKind::Gpr {
            return Err(malformed());
        }
        if args.len() != kind.arity() {
            return Err(MacroError::ArgumentCount {
                name: kind.to_string(),
                expected: kind.arity(),
                found: args.len(),
            });
        }
        let regs = args
            .iter()
            .map(|a| parse_reg(a))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match (kind, regs.as_slice()) {
            (MacroKind::Zero, &[base, count]) => Macro::Zero { base, count },
            (MacroKind::Mul, &[dst, a, b]) => Macro::Mul { dst, a, b },
            (MacroKind::Divu, &[dst, a, b]) => Macro::Divu { dst, a, b },
            (MacroKind::Divt, &[dst, a, b]) => Macro::Divt { dst, a, b },
            (MacroKind::Ssave, &[r]) => Macro::Ssave(r),
            (MacroKind::Srestore, &[r]) => Macro::Srestore(r),
            (MacroKind::SaveUser, []) => Macro::SaveUser,
            (MacroKind::RestoreUser, []) => Macro::RestoreUser,
            _ => return Err(malformed()),
        })
    }

    pub fn kind(&self) -> MacroKind {
        match self {
            Macro::Zero { .. } => MacroKind::Zero,
            Macro::Mul { .. } => MacroKind::Mul,
            Macro::Divu { .. } => MacroKind::Divu,
            Macro::Divt { .. } => MacroKind::Divt,
            Macro::Gpr { .. } => MacroKind::Gpr,
            Macro::Ssave(_) => MacroKind::Ssave,
            Macro::Srestore(_) => MacroKind::Srestore,
            Macro::SaveUser => MacroKind::SaveUser,
            Macro::RestoreUser => MacroKind::RestoreUser,
        }
    }

    pub fn size(&self) -> usize {
        self.kind().size()
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.kind();
        match *self {
            Macro::Zero { base, count } => write!(f, "macro: {name}({base}, {count})"),
            Macro::Mul { dst, a, b } | Macro::Divu { dst, a, b } | Macro::Divt { dst, a, b } => {
                write!(f, "macro: {name}({dst}, {a}, {b})")
            }
            Macro::Gpr { reg, value, ty } => {
                write!(f, "macro: {name}({reg}) = enc({}, {ty})", ty.render(value))
            }
            Macro::Ssave(r) | Macro::Srestore(r) => write!(f, "macro: {name}({r})"),
            Macro::SaveUser | Macro::RestoreUser => write!(f, "macro: {name}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Expansion

impl Macro {
    fn check(&self) -> Result<(), MacroError> {
        let name = self.kind().to_string();
        let no_scratch = |regs: &[Reg]| match regs.iter().find(|r| r.is_scratch()) {
            Some(&r) => Err(MacroError::ScratchRegister(name.clone(), r)),
            None => Ok(()),
        };
        let distinct = |a: Reg, b: Reg| {
            if a == b {
                Err(MacroError::AliasedOperands(name.clone(), a))
            } else {
                Ok(())
            }
        };
        let writable = |regs: &[Reg]| match regs.iter().find(|&&r| r == Reg::ZERO) {
            Some(&r) => Err(MacroError::ReadOnlyOperand(name.clone(), r)),
            None => Ok(()),
        };

        match *self {
            Macro::Zero { base, count } => {
                distinct(base, count)?;
                writable(&[base, count])
            }
            Macro::Mul { dst, a, b } => {
                no_scratch(&[dst, a, b])?;
                distinct(a, b)?;
                writable(&[a])
            }
            Macro::Divu { dst, a, b } | Macro::Divt { dst, a, b } => {
                no_scratch(&[dst, a, b])?;
                distinct(a, b)?;
                writable(&[a, b])
            }
            Macro::Gpr { .. }
            | Macro::Ssave(_)
            | Macro::Srestore(_)
            | Macro::SaveUser
            | Macro::RestoreUser => Ok(()),
        }
    }

    /// Validate the operands and expand into real instructions.
    pub fn expand(&self) -> Result<Vec<Inst>, MacroError> {
        self.check()?;
        Ok(self.emit())
    }

    fn emit(&self) -> Vec<Inst> {
        use Inst::*;
        let z = Reg::ZERO;
        let (k0, k1, k2, k3) = (Reg::K0, Reg::K1, Reg::K2, Reg::K3);

        match *self {
            Macro::Zero { base, count } => vec![
                SW(z, base, 0),
                ADDI(base, base, 4),
                ADDI(count, count, -1),
                BNE(count, z, -3),
            ],

            // k0 = mask, k1 = accumulator, k2 = tested bit
            Macro::Mul { dst, a, b } => vec![
                ADD(k1, z, z),
                ADDI(k0, z, 1),
                AND(k2, b, k0),
                BEQ(k2, z, 2),
                ADDU(k1, k1, a),
                SLL(a, a, 1),
                SLL(k0, k0, 1),
                BEQ(k0, z, 2),
                BEQ(z, z, -6),
                ADD(dst, k1, z),
            ],

            // k0 = shifted divisor, k1 = quotient bit, k2 = compare, b = quotient
            Macro::Divu { dst, a, b } => vec![
                ADD(k0, b, z),
                ADDI(k1, z, 1),
                ADD(b, z, z),
                BNE(k0, z, 3),
                ADDI(dst, z, -1),
                BEQ(z, z, 16),
                // scale up while the copy still fits in the dividend
                SLTU(k2, a, k0),
                BNE(k2, z, 6),
                SLT(k2, k0, z),
                BNE(k2, z, 4),
                SLL(k0, k0, 1),
                SLL(k1, k1, 1),
                BEQ(z, z, -6),
                // subtract and halve
                SLTU(k2, a, k0),
                BNE(k2, z, 3),
                SUBU(a, a, k0),
                OR(b, b, k1),
                SRL(k0, k0, 1),
                SRL(k1, k1, 1),
                BNE(k1, z, -6),
                ADD(dst, b, z),
            ],

            // k3 keeps the sign of the quotient across the unsigned divide
            Macro::Divt { dst, a, b } => {
                let divu = Macro::Divu { dst, a, b }.emit();
                let total = (10 + divu.len() + 4) as i16;
                let mut insts = vec![
                    BNE(b, z, 3),
                    ADDI(dst, z, -1),
                    BEQ(z, z, total - 2),
                    XOR(k3, a, b),
                    SLT(k2, a, z),
                    BEQ(k2, z, 2),
                    SUBU(a, z, a),
                    SLT(k2, b, z),
                    BEQ(k2, z, 2),
                    SUBU(b, z, b),
                ];
                insts.extend(divu);
                insts.extend([
                    SLT(k3, k3, z),
                    BEQ(k3, z, 3),
                    NOR(dst, dst, z),
                    ADDI(dst, dst, 1),
                ]);
                insts
            }

            Macro::Gpr { reg, value, .. } => vec![
                LUI(reg, (value >> 16) as u16),
                ORI(reg, reg, (value & 0xFFFF) as u16),
            ],

            Macro::Ssave(r) => vec![SW(r, z, SCRATCH_OFFSET)],
            Macro::Srestore(r) => vec![LW(r, z, SCRATCH_OFFSET)],

            Macro::SaveUser => {
                let mut insts = Macro::Ssave(k0).emit();
                insts.push(MFS(k0, SReg::Pcb));
                for reg in spilled() {
                    insts.push(SW(reg, k0, gpr_slot(reg)));
                }
                insts.extend(Macro::Srestore(k1).emit());
                insts.push(SW(k1, k0, gpr_slot(k0)));
                for (i, sreg) in SReg::SAVED.iter().enumerate() {
                    insts.push(MFS(k1, *sreg));
                    insts.push(SW(k1, k0, sreg_slot(i)));
                }
                insts
            }

            Macro::RestoreUser => {
                let mut insts = vec![MFS(k0, SReg::Pcb)];
                for (i, sreg) in SReg::SAVED.iter().enumerate() {
                    insts.push(LW(k1, k0, sreg_slot(i)));
                    insts.push(MTS(k1, *sreg));
                }
                insts.push(LW(k1, k0, gpr_slot(k0)));
                insts.extend(Macro::Ssave(k1).emit());
                for reg in spilled() {
                    insts.push(LW(reg, k0, gpr_slot(reg)));
                }
                insts.extend(Macro::Srestore(k0).emit());
                insts
            }
        }
    }
}

/// Registers 1..=31 except k0, which holds the control block address.
fn spilled() -> impl Iterator<Item = Reg> {
    (1..Reg::COUNT as u8)
        .filter_map(Reg::new)
        .filter(|r| *r != Reg::K0)
}

fn gpr_slot(reg: Reg) -> i16 {
    4 * reg.index() as i16
}

fn sreg_slot(i: usize) -> i16 {
    PCB_SREG_BASE + 4 * i as i16
}
