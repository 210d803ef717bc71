//! Arithmetic macros executed on the machine.

use arch::{
    inst::Inst,
    macros::Macro,
    reg::{Reg, SReg},
};
use m32emu::{Config, Halt, Machine};
use pretty_assertions::assert_eq;

fn r(i: u8) -> Reg {
    Reg::new(i).unwrap()
}

fn program(mac: Macro) -> Machine {
    let mut words: Vec<u32> = mac.expand().unwrap().iter().map(|i| i.encode()).collect();
    words.push(Inst::HALT().encode());
    let mut m = Machine::new(&Config::default());
    m.load(&words).unwrap();
    m
}

fn binary(mac: fn(Reg, Reg, Reg) -> Macro, a: u32, b: u32) -> u32 {
    let (dst, ra, rb) = (r(3), r(4), r(5));
    let mut m = program(mac(dst, ra, rb));
    m.set_reg(ra, a);
    m.set_reg(rb, b);
    assert_eq!(m.run(100_000, &mut []), Ok(Halt::Halted));
    m.reg(dst)
}

fn mul(dst: Reg, a: Reg, b: Reg) -> Macro {
    Macro::Mul { dst, a, b }
}

fn divu(dst: Reg, a: Reg, b: Reg) -> Macro {
    Macro::Divu { dst, a, b }
}

fn divt(dst: Reg, a: Reg, b: Reg) -> Macro {
    Macro::Divt { dst, a, b }
}

const SAMPLES: [u32; 12] = [
    0,
    1,
    2,
    3,
    7,
    10,
    12345,
    0x7FFF_FFFF,
    0x8000_0000,
    0x8000_0001,
    0xFFFF_FFFE,
    0xFFFF_FFFF,
];

#[test]
fn mul_wraps() {
    for a in SAMPLES {
        for b in SAMPLES {
            assert_eq!(binary(mul, a, b), a.wrapping_mul(b), "{a} * {b}");
        }
    }
}

#[test]
fn divu_matches_integer_division() {
    for a in SAMPLES {
        for b in SAMPLES.into_iter().filter(|&b| b != 0) {
            assert_eq!(binary(divu, a, b), a / b, "{a} / {b}");
        }
    }
}

#[test]
fn divide_by_zero_gives_all_ones() {
    assert_eq!(binary(divu, 17, 0), 0xFFFF_FFFF);
    assert_eq!(binary(divt, 17, 0), 0xFFFF_FFFF);
    assert_eq!(binary(divt, (-17i32) as u32, 0), 0xFFFF_FFFF);
}

#[test]
fn divt_truncates_toward_zero() {
    let cases: [(i32, i32, i32); 8] = [
        (-7, 2, -3),
        (7, -2, -3),
        (-7, -2, 3),
        (7, 2, 3),
        (i32::MAX, 1, i32::MAX),
        (i32::MIN + 1, -1, i32::MAX),
        (i32::MIN, -1, i32::MIN),
        (i32::MIN, 2, i32::MIN / 2),
    ];
    for (a, b, q) in cases {
        assert_eq!(binary(divt, a as u32, b as u32) as i32, q, "{a} / {b}");
    }
}

#[test]
fn zero_fills_words() {
    let (base, count) = (r(6), r(7));
    let mut m = program(Macro::Zero { base, count });
    for i in 0..5 {
        m.poke(0x1000 + 4 * i, 0xAAAA_AAAA).unwrap();
    }
    m.set_reg(base, 0x1000);
    m.set_reg(count, 4);
    assert_eq!(m.run(1000, &mut []), Ok(Halt::Halted));
    assert_eq!(m.peek(0x1000), Some(0));
    assert_eq!(m.peek(0x100C), Some(0));
    assert_eq!(m.peek(0x1010), Some(0xAAAA_AAAA));
}

#[test]
fn save_then_restore_round_trips_registers() {
    let pcb = 0x0002_0000;
    let mut words: Vec<u32> = Macro::SaveUser
        .expand()
        .unwrap()
        .iter()
        .map(|i| i.encode())
        .collect();
    let clobber = words.len();
    for i in 1..32u8 {
        words.push(Inst::ADDI(r(i), Reg::ZERO, -1).encode());
    }
    for sreg in SReg::SAVED {
        words.push(Inst::MTS(Reg::ZERO, sreg).encode());
    }
    words.extend(Macro::RestoreUser.expand().unwrap().iter().map(|i| i.encode()));
    words.push(Inst::HALT().encode());
    assert_eq!(words.len(), clobber + 31 + 6 + 46 + 1);

    let mut m = Machine::new(&Config::default());
    m.load(&words).unwrap();
    for i in 1..32u8 {
        m.set_reg(r(i), 0x100 * i as u32 + 1);
    }
    for (i, sreg) in SReg::SAVED.iter().enumerate() {
        m.set_sreg(*sreg, 0xC0DE_0000 + i as u32);
    }
    m.set_sreg(SReg::Pcb, pcb);

    assert_eq!(m.run(10_000, &mut []), Ok(Halt::Halted));
    for i in 1..32u8 {
        assert_eq!(m.reg(r(i)), 0x100 * i as u32 + 1, "r{i}");
    }
    for (i, sreg) in SReg::SAVED.iter().enumerate() {
        assert_eq!(m.sreg(*sreg), 0xC0DE_0000 + i as u32, "{sreg}");
    }
    // k0 lands in its own slot through the scratch word.
    assert_eq!(m.peek(pcb + 96), Some(0x100 * 24 + 1));
}
