mod expr;
mod func;

use arch::{EncType, Inst, Macro, Reg};
use itertools::Itertools;
use log::debug;
use std::fmt;

use crate::context::Context;
use crate::error::Error;
use crate::grammer::ast::{Def, Program};
pub use func::FuncCompiler;

/// One line of generated assembly with its real (expanded) instruction count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub size: usize,
}

impl Line {
    pub fn label(name: &str) -> Line {
        Line {
            text: format!("{name}:"),
            size: 0,
        }
    }

    pub fn inst(inst: Inst) -> Line {
        Line {
            text: inst.to_string(),
            size: 1,
        }
    }

    /// Operands are validated here so a bad invocation never reaches the assembler.
    pub fn mac(mac: Macro) -> Result<Line, Error> {
        let size = mac.expand()?.len();
        Ok(Line {
            text: mac.to_string(),
            size,
        })
    }

    /// `j` / `jal` to a label.
    pub fn jump(mnemonic: &str, label: &str) -> Line {
        Line {
            text: format!("{mnemonic} {label}"),
            size: 1,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.size == 0 {
            write!(f, "{}", self.text)
        } else {
            write!(f, "    {}", self.text)
        }
    }
}

/// Instruction buffer of one function with a running real size.
#[derive(Debug, Default, Clone)]
pub struct Buffer {
    lines: Vec<Line>,
    size: usize,
}

impl Buffer {
    pub fn push(&mut self, line: Line) {
        self.size += line.size;
        self.lines.push(line);
    }

    /// Insert before the line at index `at`.
    pub fn insert(&mut self, at: usize, line: Line) {
        self.size += line.size;
        self.lines.insert(at, line);
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Real instruction count.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }
}

/// `beq c zero skip`
pub fn branch_if_zero(cond: Reg, skip: usize) -> Result<Inst, Error> {
    let offset = i16::try_from(skip).map_err(|_| Error::BranchTooFar(skip))?;
    Ok(Inst::BEQ(cond, Reg::ZERO, offset))
}

/// `beq zero zero skip`
pub fn jump_forward(skip: usize) -> Result<Inst, Error> {
    branch_if_zero(Reg::ZERO, skip)
}

/// `beq zero zero -back`
pub fn jump_back(back: usize) -> Result<Inst, Error> {
    let offset = i16::try_from(back)
        .map(|b| -b)
        .map_err(|_| Error::BranchTooFar(back))?;
    Ok(Inst::BEQ(Reg::ZERO, Reg::ZERO, offset))
}

/// Load the base registers and enter `main`.
fn startup(ctx: &Context) -> Result<Vec<Line>, Error> {
    let map = &ctx.map;
    Ok(vec![
        Line::mac(Macro::Gpr {
            reg: Reg::BP,
            value: map.global_base,
            ty: EncType::Uint,
        })?,
        Line::mac(Macro::Gpr {
            reg: Reg::SP,
            value: map.stack_top,
            ty: EncType::Uint,
        })?,
        Line::mac(Macro::Gpr {
            reg: Reg::HP,
            value: map.heap_base,
            ty: EncType::Uint,
        })?,
        Line::jump("j", "main"),
    ])
}

/// Generate the whole program: the startup block, then every function in
/// declaration order.
pub fn generate(ctx: &Context, program: &Program) -> Result<Vec<Line>, Error> {
    let mut lines = startup(ctx)?;
    for def in &program.defs {
        let Def::Func(def) = def else {
            continue;
        };
        let fun = ctx.fun(&def.name)?;
        let buf = FuncCompiler::new(ctx, fun)
            .compile(def)
            .map_err(|e| e.in_function(&def.name))?;
        debug!(
            "compiled `{}`: {} lines, {} words",
            def.name,
            buf.len(),
            buf.size()
        );
        lines.extend(buf.into_lines());
    }
    Ok(lines)
}

pub fn render(lines: &[Line]) -> String {
    let mut text = lines.iter().join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::MemoryMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_keeps_real_size() {
        let mut buf = Buffer::default();
        buf.push(Line::label("f"));
        buf.push(Line::inst(Inst::HALT()));
        buf.push(
            Line::mac(Macro::Mul {
                dst: Reg::new(1).unwrap(),
                a: Reg::new(1).unwrap(),
                b: Reg::new(2).unwrap(),
            })
            .unwrap(),
        );
        assert_eq!(buf.size(), 11);
        buf.insert(1, Line::inst(jump_forward(12).unwrap()));
        assert_eq!(buf.size(), 12);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.into_lines()[1].text, "beq zero zero 12");
    }

    #[test]
    fn bad_macro_operands_rejected() {
        let line = Line::mac(Macro::Mul {
            dst: Reg::K0,
            a: Reg::new(1).unwrap(),
            b: Reg::new(2).unwrap(),
        });
        assert!(matches!(line, Err(Error::Macro(_))));
    }

    #[test]
    fn branch_range() {
        assert_eq!(jump_back(3).unwrap(), Inst::BEQ(Reg::ZERO, Reg::ZERO, -3));
        assert!(matches!(jump_back(40000), Err(Error::BranchTooFar(40000))));
        assert!(matches!(
            branch_if_zero(Reg::new(4).unwrap(), 32768),
            Err(Error::BranchTooFar(_))
        ));
    }

    #[test]
    fn startup_block() {
        let ctx = Context::new(MemoryMap::default());
        let text = render(&startup(&ctx).unwrap());
        assert_eq!(
            text,
            "    macro: gpr(bp) = enc(65536, uint)\n    \
             macro: gpr(sp) = enc(16777216, uint)\n    \
             macro: gpr(hp) = enc(1048576, uint)\n    \
             j main\n"
        );
    }
}
