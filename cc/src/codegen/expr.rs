use arch::{EncType, Inst, Macro, Reg};

use super::func::{FuncCompiler, Value};
use crate::error::Error;
use crate::grammer::ast::{Access, BinaryOp, Expr, LValue, UnaryOp};
use crate::types::VarType;

impl<'a> FuncCompiler<'a> {
    /// Evaluate an expression into a fresh register.
    pub(super) fn expr(&mut self, e: &Expr) -> Result<Value, Error> {
        match e {
            Expr::Number(n, unsigned) => {
                let (value, ty, enc) = match *unsigned {
                    true => (u32::try_from(*n).ok(), VarType::Uint, EncType::Uint),
                    false => (
                        i32::try_from(*n).ok().map(|v| v as u32),
                        VarType::Int,
                        EncType::Int,
                    ),
                };
                let value = value.ok_or_else(|| Error::LiteralOutOfRange(e.to_string()))?;
                self.literal(value, ty, enc)
            }
            Expr::Bool(b) => self.literal(*b as u32, VarType::Bool, EncType::Bool),
            Expr::Char(c) => self.literal(*c as u32, VarType::Char, EncType::Char),
            Expr::LValue(lv) => {
                let v = self.address(lv)?;
                if !v.ty.is_scalar() {
                    return Err(Error::Malformed(self.current.clone()));
                }
                self.emit(Inst::LW(v.reg, v.reg, 0));
                Ok(v)
            }
            Expr::Unary(op, operand) => self.unary(*op, operand),
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
        }
    }

    fn literal(&mut self, value: u32, ty: VarType, enc: EncType) -> Result<Value, Error> {
        let reg = self.acquire()?;
        self.emit_macro(Macro::Gpr { reg, value, ty: enc })?;
        Ok(Value { ty, reg })
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, Error> {
        let v = self.expr(operand)?;
        match op {
            UnaryOp::Not => {
                self.expect_type(&VarType::Bool, &v.ty)?;
                self.emit(Inst::ADDI(v.reg, v.reg, -1));
                self.emit(Inst::SLT(v.reg, v.reg, Reg::ZERO));
            }
            UnaryOp::Neg => {
                self.expect_type(&VarType::Int, &v.ty)?;
                self.emit(Inst::SUBU(v.reg, Reg::ZERO, v.reg));
            }
        }
        Ok(v)
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, Error> {
        let l = self.expr(lhs)?;
        let r = self.expr(rhs)?;
        self.expect_type(&l.ty, &r.ty)?;

        let (a, b) = (l.reg, r.reg);
        let allowed = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                matches!(l.ty, VarType::Int | VarType::Uint)
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                matches!(l.ty, VarType::Int | VarType::Uint | VarType::Char)
            }
            BinaryOp::Eq | BinaryOp::Ne => l.ty.is_scalar(),
            BinaryOp::And | BinaryOp::Or => l.ty == VarType::Bool,
        };
        if !allowed {
            return Err(Error::TypeMismatch {
                fragment: self.current.clone(),
                expected: format!("operand of `{op}`"),
                found: self.ctx.types().describe(&l.ty),
            });
        }

        let signed = l.ty == VarType::Int;
        let slt = |d, x, y| {
            if signed {
                Inst::SLT(d, x, y)
            } else {
                Inst::SLTU(d, x, y)
            }
        };
        let ty = match op {
            BinaryOp::Add => {
                self.emit(Inst::ADDU(a, a, b));
                l.ty
            }
            BinaryOp::Sub => {
                self.emit(Inst::SUBU(a, a, b));
                l.ty
            }
            BinaryOp::Mul => {
                self.emit_macro(Macro::Mul { dst: a, a, b })?;
                l.ty
            }
            BinaryOp::Div if signed => {
                self.emit_macro(Macro::Divt { dst: a, a, b })?;
                l.ty
            }
            BinaryOp::Div => {
                self.emit_macro(Macro::Divu { dst: a, a, b })?;
                l.ty
            }
            BinaryOp::Lt => {
                self.emit(slt(a, a, b));
                VarType::Bool
            }
            BinaryOp::Gt => {
                self.emit(slt(a, b, a));
                VarType::Bool
            }
            BinaryOp::Le => {
                self.emit(slt(a, b, a));
                self.emit(Inst::XORI(a, a, 1));
                VarType::Bool
            }
            BinaryOp::Ge => {
                self.emit(slt(a, a, b));
                self.emit(Inst::XORI(a, a, 1));
                VarType::Bool
            }
            BinaryOp::Ne | BinaryOp::Eq => {
                self.emit(Inst::XOR(a, a, b));
                self.emit(Inst::BEQ(a, Reg::ZERO, 2));
                self.emit(Inst::ADDI(a, Reg::ZERO, 1));
                if op == BinaryOp::Eq {
                    self.emit(Inst::XORI(a, a, 1));
                }
                VarType::Bool
            }
            BinaryOp::And => {
                self.emit(Inst::AND(a, a, b));
                VarType::Bool
            }
            BinaryOp::Or => {
                self.emit(Inst::OR(a, a, b));
                VarType::Bool
            }
        };
        self.regs.release(b);
        Ok(Value { ty, reg: a })
    }

    /// Compute the address of an lvalue. Locals shadow globals.
    pub(super) fn address(&mut self, lv: &LValue) -> Result<Value, Error> {
        let (ctx, fun) = (self.ctx, self.fun);
        let (ty, base, offset) = if let Some((ty, disp)) = fun.frame.get(&lv.name) {
            (ty, Reg::SP, self.frame_base() + disp as i64)
        } else if let Some((ty, disp)) = ctx.global(&lv.name) {
            (ty, Reg::BP, disp as i64)
        } else {
            return Err(Error::UndefinedVariable(lv.name.clone()));
        };

        let reg = self.acquire()?;
        self.offset_addr(reg, base, offset)?;
        let mut ty = ty.clone();

        for access in &lv.path {
            ty = match (access, ty) {
                (Access::Index(index), VarType::Array(elem, _)) => {
                    self.index(reg, &elem, index)?;
                    *elem
                }
                (Access::Index(index), VarType::Pointer(elem)) => {
                    self.emit(Inst::LW(reg, reg, 0));
                    self.index(reg, &elem, index)?;
                    *elem
                }
                (Access::Field(name), VarType::Struct(id)) => {
                    let field = ctx.types().field(id, name)?;
                    if field.disp != 0 {
                        self.offset_addr(reg, reg, field.disp as i64)?;
                    }
                    field.ty.clone()
                }
                (Access::Deref, VarType::Pointer(target)) => {
                    self.emit(Inst::LW(reg, reg, 0));
                    *target
                }
                (_, other) => {
                    let expected = match access {
                        Access::Index(_) => "array or pointer",
                        Access::Field(_) => "struct",
                        Access::Deref => "pointer",
                    };
                    return Err(Error::TypeMismatch {
                        fragment: self.current.clone(),
                        expected: expected.to_string(),
                        found: ctx.types().describe(&other),
                    });
                }
            };
        }
        Ok(Value { ty, reg })
    }

    /// `addr += index * sizeof(elem)`
    fn index(&mut self, addr: Reg, elem: &VarType, index: &Expr) -> Result<(), Error> {
        let i = self.expr(index)?;
        if !matches!(i.ty, VarType::Int | VarType::Uint) {
            return Err(self.mismatch(&VarType::Int, &i.ty));
        }
        let size = self.ctx.types().size_of(elem)?;
        if size.is_power_of_two() {
            let shift = size.trailing_zeros() as u8;
            if shift > 0 {
                self.emit(Inst::SLL(i.reg, i.reg, shift));
            }
        } else {
            let scale = self.acquire()?;
            self.emit_macro(Macro::Gpr {
                reg: scale,
                value: size,
                ty: EncType::Uint,
            })?;
            self.emit_macro(Macro::Mul {
                dst: i.reg,
                a: i.reg,
                b: scale,
            })?;
            self.regs.release(scale);
        }
        self.emit(Inst::ADDU(addr, addr, i.reg));
        self.regs.release(i.reg);
        Ok(())
    }
}
