use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Register-register ALU operations, keyed by their R-type function field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum ALU {
    SLL = 0x00,
    SRL = 0x02,
    SRA = 0x03,
    ADD = 0x20,
    ADDU = 0x21,
    SUB = 0x22,
    SUBU = 0x23,
    AND = 0x24,
    OR = 0x25,
    XOR = 0x26,
    NOR = 0x27,
    SLT = 0x2A,
    SLTU = 0x2B,
}

macro_rules! boo {
    ($cond:expr) => {
        if $cond {
            1
        } else {
            0
        }
    };
}

/// 32-bit ALU model. Shifts use the low five bits of `b`; nothing traps.
pub fn valu<T: Into<ALU>>(op: T, a: u32, b: u32) -> u32 {
    use ALU::*;
    match op.into() {
        ADD | ADDU => a.wrapping_add(b),
        SUB | SUBU => a.wrapping_sub(b),
        AND => a & b,
        OR => a | b,
        XOR => a ^ b,
        NOR => !(a | b),
        SLT => boo!((a as i32) < (b as i32)),
        SLTU => boo!(a < b),
        SLL => a << (b & 0x1F),
        SRL => a >> (b & 0x1F),
        SRA => ((a as i32) >> (b & 0x1F)) as u32,
    }
}
