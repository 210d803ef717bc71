use crate::op::Opcode;

/// Raw instruction fields, one variant per 32-bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    R {
        opcode: u8,
        rs: u8,
        rt: u8,
        rd: u8,
        sa: u8,
        fun: u8,
    },
    I {
        opcode: u8,
        rs: u8,
        rt: u8,
        imm: u16,
    },
    J {
        opcode: u8,
        index: u32,
    },
}

// ----------------------------------------------------------------------------

fn field(value: u32, width: u32) -> u32 {
    value & ((1 << width) - 1)
}

fn enc_r(opcode: u8, rs: u8, rt: u8, rd: u8, sa: u8, fun: u8) -> u32 {
    (field(opcode as u32, 6) << 26)
        | (field(rs as u32, 5) << 21)
        | (field(rt as u32, 5) << 16)
        | (field(rd as u32, 5) << 11)
        | (field(sa as u32, 5) << 6)
        | field(fun as u32, 6)
}

fn enc_i(opcode: u8, rs: u8, rt: u8, imm: u16) -> u32 {
    (field(opcode as u32, 6) << 26)
        | (field(rs as u32, 5) << 21)
        | (field(rt as u32, 5) << 16)
        | imm as u32
}

fn enc_j(opcode: u8, index: u32) -> u32 {
    (field(opcode as u32, 6) << 26) | field(index, 26)
}

// ----------------------------------------------------------------------------

impl Op {
    pub fn to_bin(&self) -> u32 {
        match *self {
            Op::R {
                opcode,
                rs,
                rt,
                rd,
                sa,
                fun,
            } => enc_r(opcode, rs, rt, rd, sa, fun),
            Op::I {
                opcode,
                rs,
                rt,
                imm,
            } => enc_i(opcode, rs, rt, imm),
            Op::J { opcode, index } => enc_j(opcode, index),
        }
    }

    /// Classify by opcode; never fails, unknown opcodes come back as I-type.
    pub fn from_bin(bin: u32) -> Op {
        let opcode = (bin >> 26) as u8;
        match opcode {
            Opcode::SPECIAL | Opcode::PRIV => Op::R {
                opcode,
                rs: ((bin >> 21) & 0x1F) as u8,
                rt: ((bin >> 16) & 0x1F) as u8,
                rd: ((bin >> 11) & 0x1F) as u8,
                sa: ((bin >> 6) & 0x1F) as u8,
                fun: (bin & 0x3F) as u8,
            },
            Opcode::J | Opcode::JAL => Op::J {
                opcode,
                index: bin & 0x03FF_FFFF,
            },
            _ => Op::I {
                opcode,
                rs: ((bin >> 21) & 0x1F) as u8,
                rt: ((bin >> 16) & 0x1F) as u8,
                imm: (bin & 0xFFFF) as u16,
            },
        }
    }
}

/// 32-character zero/one rendering, MSB first.
pub fn bin_string(word: u32) -> String {
    format!("{:032b}", word)
}

pub fn parse_bin_string(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.len() != 32 || !s.chars().all(|c| c == '0' || c == '1') {
        return None;
    }
    u32::from_str_radix(s, 2).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r_layout() {
        let op = Op::R {
            opcode: 0,
            rs: 1,
            rt: 2,
            rd: 3,
            sa: 0,
            fun: 0x20,
        };
        assert_eq!(
            bin_string(op.to_bin()),
            "00000000001000100001100000100000"
        );
        assert_eq!(Op::from_bin(op.to_bin()), op);
    }

    #[test]
    fn i_layout_keeps_raw_immediate() {
        let op = Op::I {
            opcode: Opcode::ADDI,
            rs: 29,
            rt: 29,
            imm: 0xFFF0,
        };
        assert_eq!(op.to_bin(), 0x23BD_FFF0);
        assert_eq!(Op::from_bin(0x23BD_FFF0), op);
    }

    #[test]
    fn j_layout_masks_index() {
        let op = Op::J {
            opcode: Opcode::JAL,
            index: 0x0FFF_FFFF,
        };
        assert_eq!(op.to_bin(), 0x0FFF_FFFF);
        assert_eq!(
            Op::from_bin(op.to_bin()),
            Op::J {
                opcode: Opcode::JAL,
                index: 0x03FF_FFFF
            }
        );
    }

    #[test]
    fn field_round_trip_sweep() {
        for opcode in [Opcode::SPECIAL, Opcode::PRIV] {
            for reg in 0..32u8 {
                for fun in [0u8, 0x0C, 0x2B, 0x3F] {
                    let op = Op::R {
                        opcode,
                        rs: reg,
                        rt: 31 - reg,
                        rd: reg ^ 0x15,
                        sa: reg,
                        fun,
                    };
                    assert_eq!(Op::from_bin(op.to_bin()), op);
                }
            }
        }
    }

    #[test]
    fn bin_string_parse() {
        assert_eq!(bin_string(5).len(), 32);
        assert_eq!(parse_bin_string(&bin_string(0xDEAD_BEEF)), Some(0xDEAD_BEEF));
        assert_eq!(parse_bin_string("0101"), None);
        assert_eq!(parse_bin_string(&"2".repeat(32)), None);
    }
}
