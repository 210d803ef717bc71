use bimap::BiMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

use crate::literal::parse_int;

/// General purpose register index (0..32).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Reg(u8);

impl Reg {
    pub const COUNT: usize = 32;

    pub const ZERO: Reg = Reg(0);
    /// Syscall signal code.
    pub const SIG: Reg = Reg(1);
    pub const K0: Reg = Reg(24);
    pub const K1: Reg = Reg(25);
    pub const K2: Reg = Reg(26);
    pub const K3: Reg = Reg(27);
    pub const BP: Reg = Reg(28);
    pub const SP: Reg = Reg(29);
    pub const HP: Reg = Reg(30);
    pub const RA: Reg = Reg(31);

    pub const fn new(idx: u8) -> Option<Reg> {
        if (idx as usize) < Self::COUNT {
            Some(Reg(idx))
        } else {
            None
        }
    }

    /// Masks to 5 bits. Only for fields already known to be in range.
    pub const fn from_field(bits: u32) -> Reg {
        Reg((bits & 0x1F) as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    /// Macro and check-sequence scratch registers (k0..k3).
    pub fn is_scratch(self) -> bool {
        (Self::K0.0..=Self::K3.0).contains(&self.0)
    }

    /// Accepts `12`, `r12`, `$12` and the aliases (`zero`, `sp`, `k0`, ...).
    /// `sig` is accepted for register 1 but never printed.
    pub fn parse(s: &str) -> Option<Reg> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if let Some(&idx) = ALIASES.get_by_left(lower.as_str()) {
            return Some(Reg(idx));
        }
        if lower == "sig" {
            return Some(Reg::SIG);
        }
        let digits = s
            .strip_prefix('$')
            .or_else(|| s.strip_prefix('r'))
            .unwrap_or(s);
        if !digits.chars().all(|c| c.is_ascii_digit()) || digits.is_empty() {
            return None;
        }
        digits.parse::<u8>().ok().and_then(Reg::new)
    }

    pub fn name(self) -> Option<&'static str> {
        ALIASES.get_by_right(&self.0).copied()
    }
}

static ALIASES: Lazy<BiMap<&'static str, u8>> = Lazy::new(|| {
    let mut map = BiMap::new();
    map.insert("zero", Reg::ZERO.0);
    map.insert("k0", Reg::K0.0);
    map.insert("k1", Reg::K1.0);
    map.insert("k2", Reg::K2.0);
    map.insert("k3", Reg::K3.0);
    map.insert("bp", Reg::BP.0);
    map.insert("sp", Reg::SP.0);
    map.insert("hp", Reg::HP.0);
    map.insert("ra", Reg::RA.0);
    map
});

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.pad(name),
            None => f.pad(&self.0.to_string()),
        }
    }
}

impl From<Reg> for u8 {
    fn from(reg: Reg) -> u8 {
        reg.0
    }
}

/// Special (privileged) registers reached through `mfs` / `mts`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum SReg {
    Epc = 0,
    Cause = 1,
    Status = 2,
    BadVAddr = 3,
    Ptbr = 4,
    Pcb = 5,
    Timer = 6,
    Scratch = 7,
}

impl SReg {
    pub const COUNT: usize = 8;

    /// Subset spilled to the process control block by `save-user`, in slot order.
    pub const SAVED: [SReg; 6] = [
        SReg::Epc,
        SReg::Cause,
        SReg::Status,
        SReg::BadVAddr,
        SReg::Ptbr,
        SReg::Timer,
    ];

    pub fn parse(s: &str) -> Option<SReg> {
        if let Ok(sreg) = s.trim().parse::<SReg>() {
            return Some(sreg);
        }
        let idx = parse_int(s)?;
        u8::try_from(idx).ok().and_then(|i| SReg::try_from(i).ok())
    }

    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}
