//! Shape of the generated assembly.

use arch::MemoryMap;
use m32cc::{compile, Error};
use pretty_assertions::assert_eq;

/// Lines of one function, from its label up to the next label.
fn function(asm: &str, name: &str) -> Vec<String> {
    let head = format!("{name}:");
    asm.lines()
        .skip_while(|line| *line != head)
        .skip(1)
        .take_while(|line| !line.ends_with(':'))
        .map(|line| line.trim().to_string())
        .collect()
}

fn compile_ok(code: &str) -> String {
    let asm = compile("test.c", code, MemoryMap::default()).unwrap();
    println!("{asm}");
    asm
}

fn compile_err(code: &str) -> Error {
    match compile("test.c", code, MemoryMap::default()) {
        Ok(asm) => panic!("expected an error, got\n{asm}"),
        Err(err) => {
            println!("{err}");
            err
        }
    }
}

#[test]
fn while_offsets_are_real_sizes() {
    let asm = compile_ok(
        "
        int i;
        int main() {
            while i < 3 {
                i = i + 1
            }
            return 1
        }
        ",
    );
    assert_eq!(
        function(&asm, "main"),
        vec![
            // condition: 5 words
            "addi 1 bp 0",
            "lw 1 1 0",
            "macro: gpr(2) = enc(3, int)",
            "slt 1 1 2",
            "beq 1 zero 9",
            // body: 7 words
            "addi 2 bp 0",
            "lw 2 2 0",
            "macro: gpr(3) = enc(1, int)",
            "addu 2 2 3",
            "addi 3 bp 0",
            "sw 2 3 0",
            "beq zero zero -13",
            "macro: gpr(1) = enc(1, int)",
            "add 1 1 zero",
            "syscall",
        ]
    );
}

#[test]
fn if_else_offsets() {
    let asm = compile_ok(
        "
        bool f;
        int x;
        int main() {
            if f { x = 1 } else { x = 2 * x }
        }
        ",
    );
    let lines = function(&asm, "main");
    // then: gpr + addi + sw = 4 words, else: gpr + addi + lw + mul + addi + sw = 16 words
    assert_eq!(lines[2], "beq 1 zero 6");
    assert_eq!(lines[6], "beq zero zero 17");
    assert_eq!(&lines[lines.len() - 2..], ["addi 1 zero 1", "syscall"]);
}

#[test]
fn startup_comes_first() {
    let asm = compile_ok("void helper() { } int main() { helper() }");
    let lines = asm.lines().map(str::trim).collect::<Vec<_>>();
    assert_eq!(
        &lines[..6],
        [
            "macro: gpr(bp) = enc(65536, uint)",
            "macro: gpr(sp) = enc(16777216, uint)",
            "macro: gpr(hp) = enc(1048576, uint)",
            "j main",
            "helper:",
            "sw ra sp 4",
        ]
    );
}

#[test]
fn call_sequence() {
    let asm = compile_ok(
        "
        int r;
        int twice(int v) { return v + v }
        int main() { r = twice(21); return 1 }
        ",
    );
    assert_eq!(
        &function(&asm, "main")[..11],
        [
            "addi 1 bp 0",
            "macro: gpr(2) = enc(21, int)",
            "addi sp sp -12",
            "macro: gpr(k0) = enc(12582912, uint)",
            "sltu k0 sp k0",
            "beq k0 zero 3",
            "addi 1 zero 41",
            "syscall",
            "sw 1 sp 0",
            "sw 2 sp 8",
            "jal twice",
        ]
    );
    assert_eq!(
        function(&asm, "twice"),
        vec![
            "sw ra sp 4",
            "addi 1 sp 8",
            "lw 1 1 0",
            "addi 2 sp 8",
            "lw 2 2 0",
            "addu 1 1 2",
            "lw 2 sp 0",
            "beq 2 zero 2",
            "sw 1 2 0",
            "lw ra sp 4",
            "addi sp sp 12",
            "jr ra",
        ]
    );
}

#[test]
fn locals_are_zero_filled() {
    let asm = compile_ok("void f(int a) { int[3] buf; uint n; } int main() { f(1) }");
    assert_eq!(
        &function(&asm, "f")[..4],
        [
            "sw ra sp 4",
            "addi 1 sp 12",
            "addi 2 zero 4",
            "macro: zero(1, 2)",
        ]
    );
}

#[test]
fn heap_allocation() {
    let asm = compile_ok("int* p; int main() { p = new int*; }");
    assert_eq!(
        &function(&asm, "main")[..7],
        [
            "addi 1 bp 0",
            "sw hp 1 0",
            "addi hp hp 4",
            "macro: gpr(k0) = enc(8388608, uint)",
            "sltu k0 k0 hp",
            "beq k0 zero 3",
            "addi 1 zero 42",
        ]
    );
}

#[test]
fn operators() {
    let asm = compile_ok(
        "
        int a; uint u; bool b;
        int main() {
            b = a != a;
            b = a == a;
            b = u >= u;
            b = !b;
            a = -a;
            a = a / a;
            u = u / u;
        }
        ",
    );
    let lines = function(&asm, "main");
    let has = |needle: &str| lines.iter().any(|l| l == needle);
    assert!(has("xor 1 1 2"));
    assert!(has("beq 1 zero 2"));
    assert!(has("addi 1 zero 1"));
    assert!(has("xori 1 1 1"));
    assert!(has("sltu 1 1 2"));
    assert!(has("slt 1 1 zero"));
    assert!(has("addi 1 1 -1"));
    assert!(has("subu 1 zero 1"));
    assert!(has("macro: divt(1, 1, 2)"));
    assert!(has("macro: divu(1, 1, 2)"));
}

#[test]
fn register_statements() {
    let asm = compile_ok("int x; int main() { gpr(1) = x except(2); x = gpr(7) }");
    let lines = function(&asm, "main");
    assert_eq!(
        &lines[..5],
        ["addi 3 bp 0", "lw 3 3 0", "add 1 3 zero", "addi 1 bp 0", "sw 7 1 0"]
    );
}

#[test]
fn type_mismatch() {
    let err = compile_err("int a; uint b; int main() { a = b }");
    let Error::InFunction { func, source } = err else {
        panic!("no function context");
    };
    assert_eq!(func, "main");
    assert!(matches!(
        *source,
        Error::TypeMismatch { ref fragment, .. } if fragment == "a = b"
    ));
}

#[test]
fn shape_errors() {
    let inner = |code: &str| match compile_err(code) {
        Error::InFunction { source, .. } => *source,
        other => other,
    };
    assert!(matches!(
        inner("int x; int main() { gpr(0) = x }"),
        Error::RegisterOutOfRange(0, _)
    ));
    assert!(matches!(
        inner("int x; int main() { x = gpr(32) }"),
        Error::RegisterOutOfRange(32, _)
    ));
    assert!(matches!(
        inner("int x; int main() { gpr(3) = x except(40) }"),
        Error::RegisterOutOfRange(40, _)
    ));
    assert!(matches!(inner("int main() { y = 1 }"), Error::UndefinedVariable(_)));
    assert!(matches!(inner("int main() { g(1) }"), Error::UndefinedFunction(_)));
    assert!(matches!(
        inner("void f(int a) { } int main() { f() }"),
        Error::ArgumentCount { expected: 1, found: 0, .. }
    ));
    assert!(matches!(
        inner("int x; void f() { } int main() { x = f() }"),
        Error::Malformed(_)
    ));
    assert!(matches!(
        inner("int x; int main() { x = 2147483648 }"),
        Error::LiteralOutOfRange(_)
    ));
    assert!(matches!(
        inner("int x; int main() { while x { } }"),
        Error::TypeMismatch { .. }
    ));
    assert!(matches!(
        inner("bool x; int main() { x = x + x }"),
        Error::TypeMismatch { .. }
    ));
    assert!(matches!(
        inner("struct s { int a; } struct s v; int main() { v.b = 1 }"),
        Error::NoSuchField(..)
    ));
    assert!(matches!(
        inner("int x; int main() { x@ = 1 }"),
        Error::TypeMismatch { .. }
    ));
}

#[test]
fn sizes_beyond_address_space() {
    assert!(matches!(
        compile_err("int[1073741824] g; int main() { }"),
        Error::TooLarge(_)
    ));
    assert!(matches!(
        compile_err("int[536870912] a; int[536870912] b; int main() { }"),
        Error::TooLarge(name) if name == "b"
    ));
    assert!(matches!(
        compile_err("struct big { int[1073741823] a; int[2] b; } int main() { }"),
        Error::TooLarge(_)
    ));
    assert!(matches!(
        compile_err("void f() { int[1073741824] a; } int main() { }"),
        Error::InFunction { source, .. } if matches!(*source, Error::TooLarge(_))
    ));
}

#[test]
fn empty_locals_skip_zero_fill() {
    let asm = compile_ok("void f() { int[0] z; } int main() { f() }");
    let lines = function(&asm, "f");
    assert!(!lines.iter().any(|l| l.starts_with("macro: zero")));
    assert_eq!(lines[0], "sw ra sp 4");
}

#[test]
fn register_exhaustion() {
    // 24 nested operands need more than the 23 pool registers
    let mut expr = "1".to_string();
    for _ in 0..24 {
        expr = format!("(1 + {expr})");
    }
    let code = format!("int x; int main() {{ x = {expr} }}");
    assert!(matches!(
        compile_err(&code),
        Error::InFunction { source, .. } if matches!(*source, Error::RegisterExhausted(_))
    ));
}
