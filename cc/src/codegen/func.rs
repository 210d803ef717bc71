use arch::literal::fits_signed;
use arch::memmap::signal;
use arch::{EncType, Inst, Macro, Reg};
use itertools::chain;

use super::{branch_if_zero, jump_back, jump_forward, Buffer, Line};
use crate::context::{Context, Fun};
use crate::error::Error;
use crate::grammer::ast::{Call, Expr, FuncDef, LValue, Rhs, Stmt, Type};
use crate::regalloc::RegAlloc;
use crate::types::VarType;

/// A value held in a register. For addresses `ty` is the type of the object
/// pointed at.
#[derive(Debug, Clone)]
pub(super) struct Value {
    pub ty: VarType,
    pub reg: Reg,
}

/// Return address and destination slot below each callee frame.
const LINK_AREA: i64 = 8;

pub struct FuncCompiler<'a> {
    pub(super) ctx: &'a Context,
    pub(super) fun: &'a Fun,
    pub(super) regs: RegAlloc,
    pub(super) buf: Buffer,
    /// Source of the statement being compiled, for diagnostics.
    pub(super) current: String,
}

impl<'a> FuncCompiler<'a> {
    pub fn new(ctx: &'a Context, fun: &'a Fun) -> Self {
        FuncCompiler {
            ctx,
            fun,
            regs: RegAlloc::new(),
            buf: Buffer::default(),
            current: String::new(),
        }
    }

    pub fn compile(mut self, def: &FuncDef) -> Result<Buffer, Error> {
        self.buf.push(Line::label(&self.fun.name));
        self.prologue()?;
        self.stmts(&def.body)?;
        if !matches!(def.body.last(), Some(Stmt::Return(_))) {
            self.current = "return".to_string();
            self.ret(None)?;
        }
        Ok(self.buf)
    }

    // ------------------------------------------------------------------------
    // Emission helpers

    pub(super) fn emit(&mut self, inst: Inst) {
        self.buf.push(Line::inst(inst));
    }

    pub(super) fn emit_macro(&mut self, mac: Macro) -> Result<(), Error> {
        self.buf.push(Line::mac(mac)?);
        Ok(())
    }

    pub(super) fn acquire(&mut self) -> Result<Reg, Error> {
        self.regs
            .acquire()
            .ok_or_else(|| Error::RegisterExhausted(self.current.clone()))
    }

    /// `dst = base + offset`. Large offsets go through k1.
    pub(super) fn offset_addr(&mut self, dst: Reg, base: Reg, offset: i64) -> Result<(), Error> {
        if fits_signed(offset, 16) {
            self.emit(Inst::ADDI(dst, base, offset as i16));
        } else {
            self.emit_macro(Macro::Gpr {
                reg: Reg::K1,
                value: offset as i32 as u32,
                ty: EncType::Int,
            })?;
            self.emit(Inst::ADDU(dst, base, Reg::K1));
        }
        Ok(())
    }

    /// `dst = value`
    fn load_const(&mut self, dst: Reg, value: i64) -> Result<(), Error> {
        if fits_signed(value, 16) {
            self.emit(Inst::ADDI(dst, Reg::ZERO, value as i16));
            Ok(())
        } else {
            self.emit_macro(Macro::Gpr {
                reg: dst,
                value: value as i32 as u32,
                ty: EncType::Int,
            })
        }
    }

    /// Store `src` at `base + offset`.
    fn store_at(&mut self, src: Reg, base: Reg, offset: i64) -> Result<(), Error> {
        if fits_signed(offset, 16) {
            self.emit(Inst::SW(src, base, offset as i16));
        } else {
            self.offset_addr(Reg::K1, base, offset)?;
            self.emit(Inst::SW(src, Reg::K1, 0));
        }
        Ok(())
    }

    /// Move a pointer register (`sp`, `hp`) by `delta` bytes.
    fn bump(&mut self, reg: Reg, delta: i64) -> Result<(), Error> {
        if fits_signed(delta, 16) {
            self.emit(Inst::ADDI(reg, reg, delta as i16));
        } else {
            self.emit_macro(Macro::Gpr {
                reg: Reg::K0,
                value: delta as i32 as u32,
                ty: EncType::Int,
            })?;
            self.emit(Inst::ADDU(reg, reg, Reg::K0));
        }
        Ok(())
    }

    /// Signal 41 when `sp` has crossed the stack limit.
    fn stack_check(&mut self) -> Result<(), Error> {
        self.emit_macro(Macro::Gpr {
            reg: Reg::K0,
            value: self.ctx.map.stack_limit,
            ty: EncType::Uint,
        })?;
        self.emit(Inst::SLTU(Reg::K0, Reg::SP, Reg::K0));
        self.signal_unless_zero(signal::STACK_LIMIT);
        Ok(())
    }

    /// Signal 42 when `hp` has crossed the heap limit.
    fn heap_check(&mut self) -> Result<(), Error> {
        self.emit_macro(Macro::Gpr {
            reg: Reg::K0,
            value: self.ctx.map.heap_limit,
            ty: EncType::Uint,
        })?;
        self.emit(Inst::SLTU(Reg::K0, Reg::K0, Reg::HP));
        self.signal_unless_zero(signal::HEAP_LIMIT);
        Ok(())
    }

    fn signal_unless_zero(&mut self, code: u32) {
        self.emit(Inst::BEQ(Reg::K0, Reg::ZERO, 3));
        self.emit(Inst::ADDI(Reg::SIG, Reg::ZERO, code as i16));
        self.emit(Inst::SYSCALL());
    }

    pub(super) fn mismatch(&self, expected: &VarType, found: &VarType) -> Error {
        let types = self.ctx.types();
        Error::TypeMismatch {
            fragment: self.current.clone(),
            expected: types.describe(expected),
            found: types.describe(found),
        }
    }

    pub(super) fn expect_type(&self, expected: &VarType, found: &VarType) -> Result<(), Error> {
        if expected == found {
            Ok(())
        } else {
            Err(self.mismatch(expected, found))
        }
    }

    /// Byte offset of the frame from `sp`.
    pub(super) fn frame_base(&self) -> i64 {
        if self.fun.is_entry() {
            0
        } else {
            LINK_AREA
        }
    }

    // ------------------------------------------------------------------------
    // Frame

    fn prologue(&mut self) -> Result<(), Error> {
        let size = self.fun.frame_size() as i64;
        if self.fun.is_entry() {
            if size > 0 {
                self.bump(Reg::SP, -size)?;
                self.stack_check()?;
            }
            return Ok(());
        }

        self.emit(Inst::SW(Reg::RA, Reg::SP, 4));
        if let Some((start, len)) = self.fun.locals() {
            let base = self.acquire()?;
            let count = self.acquire()?;
            self.offset_addr(base, Reg::SP, LINK_AREA + start as i64)?;
            self.load_const(count, (len / 4) as i64)?;
            self.emit_macro(Macro::Zero { base, count })?;
            self.regs.free_all();
        }
        Ok(())
    }

    fn ret(&mut self, value: Option<&Expr>) -> Result<(), Error> {
        if self.fun.is_entry() {
            match value {
                Some(e) => {
                    let v = self.expr(e)?;
                    self.emit(Inst::ADD(Reg::SIG, v.reg, Reg::ZERO));
                }
                None => self.emit(Inst::ADDI(Reg::SIG, Reg::ZERO, signal::EXIT as i16)),
            }
            self.emit(Inst::SYSCALL());
            return Ok(());
        }

        let fun = self.fun;
        let result = match (value, &fun.ret) {
            (Some(e), Some(ret)) => {
                let v = self.expr(e)?;
                self.expect_type(ret, &v.ty)?;
                Some(v.reg)
            }
            (Some(_), None) => return Err(Error::Malformed(self.current.clone())),
            (None, _) => None,
        };
        if let Some(v) = result {
            let dst = self.acquire()?;
            self.emit(Inst::LW(dst, Reg::SP, 0));
            self.emit(Inst::BEQ(dst, Reg::ZERO, 2));
            self.emit(Inst::SW(v, dst, 0));
        }
        self.emit(Inst::LW(Reg::RA, Reg::SP, 4));
        self.bump(Reg::SP, fun.frame_size() as i64 + LINK_AREA)?;
        self.emit(Inst::JR(Reg::RA));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Statements

    fn stmts(&mut self, stmts: &[Stmt]) -> Result<(), Error> {
        for stmt in stmts {
            self.stmt(stmt)?;
            self.regs.free_all();
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        self.current = stmt.to_string();
        match stmt {
            Stmt::While(cond, body) => self.while_stmt(cond, body),
            Stmt::If(cond, then, els) => self.if_stmt(cond, then, els.as_deref()),
            Stmt::Return(value) => self.ret(value.as_ref()),
            Stmt::ToGpr(n, lv, except) => self.to_gpr(*n, lv, except),
            Stmt::FromGpr(lv, n, except) => self.from_gpr(lv, *n, except),
            Stmt::Call(call) => self.call(call, None),
            Stmt::Assign(lv, Rhs::Call(call)) => self.call(call, Some(lv)),
            Stmt::Assign(lv, Rhs::New(ty)) => self.alloc(lv, ty),
            Stmt::Assign(lv, Rhs::Expr(e)) => self.assign(lv, e),
        }
    }

    fn cond(&mut self, cond: &Expr) -> Result<Reg, Error> {
        let c = self.expr(cond)?;
        self.expect_type(&VarType::Bool, &c.ty)?;
        Ok(c.reg)
    }

    fn while_stmt(&mut self, cond: &Expr, body: &[Stmt]) -> Result<(), Error> {
        let cond_start = self.buf.size();
        let c = self.cond(cond)?;
        let at = self.buf.len();
        let cond_size = self.buf.size() - cond_start;

        self.regs.retain(c);
        self.stmts(body)?;
        self.regs.unretain(c);
        let body_size = self.buf.size() - cond_start - cond_size;

        self.buf.insert(at, Line::inst(branch_if_zero(c, body_size + 2)?));
        self.buf.push(Line::inst(jump_back(cond_size + body_size + 1)?));
        Ok(())
    }

    fn if_stmt(&mut self, cond: &Expr, then: &[Stmt], els: Option<&[Stmt]>) -> Result<(), Error> {
        let c = self.cond(cond)?;
        let at = self.buf.len();

        let then_start = self.buf.size();
        self.regs.retain(c);
        self.stmts(then)?;
        self.regs.unretain(c);
        let then_size = self.buf.size() - then_start;

        match els {
            None => {
                self.buf.insert(at, Line::inst(branch_if_zero(c, then_size + 1)?));
            }
            Some(els) => {
                let jump_at = self.buf.len();
                let else_start = self.buf.size();
                self.stmts(els)?;
                let else_size = self.buf.size() - else_start;
                self.buf.insert(jump_at, Line::inst(jump_forward(else_size + 1)?));
                self.buf.insert(at, Line::inst(branch_if_zero(c, then_size + 2)?));
            }
        }
        Ok(())
    }

    fn assign(&mut self, lv: &LValue, e: &Expr) -> Result<(), Error> {
        let v = self.expr(e)?;
        let dst = self.address(lv)?;
        self.expect_type(&dst.ty, &v.ty)?;
        self.emit(Inst::SW(v.reg, dst.reg, 0));
        Ok(())
    }

    /// `lv = new T*`: hand out the heap pointer and advance it.
    fn alloc(&mut self, lv: &LValue, ty: &Type) -> Result<(), Error> {
        let ctx = self.ctx;
        let types = ctx.types();
        let ty = types.resolve(ty)?;
        let VarType::Pointer(target) = &ty else {
            return Err(Error::Malformed(self.current.clone()));
        };
        let size = types.size_of(target)?;

        let dst = self.address(lv)?;
        self.expect_type(&dst.ty, &ty)?;
        self.emit(Inst::SW(Reg::HP, dst.reg, 0));
        self.bump(Reg::HP, size as i64)?;
        self.heap_check()
    }

    fn gpr(&self, n: u64) -> Result<Reg, Error> {
        match u8::try_from(n).ok().and_then(Reg::new) {
            Some(reg) if reg != Reg::ZERO => Ok(reg),
            _ => Err(Error::RegisterOutOfRange(n, self.current.clone())),
        }
    }

    /// Occupy `reg` and the restricted registers. Returns the ones that were free.
    fn occupy(&mut self, reg: Reg, except: &[u64]) -> Result<Vec<Reg>, Error> {
        let mut taken = Vec::new();
        let except = except.iter().map(|&n| self.gpr(n)).collect::<Result<Vec<_>, _>>()?;
        for r in chain!([reg], except) {
            if self.regs.occupy(r) {
                taken.push(r);
            }
        }
        Ok(taken)
    }

    /// `gpr(n) = lv except(..)`
    fn to_gpr(&mut self, n: u64, lv: &LValue, except: &[u64]) -> Result<(), Error> {
        let reg = self.gpr(n)?;
        let taken = self.occupy(reg, except)?;
        let src = self.address(lv)?;
        if !src.ty.is_scalar() {
            return Err(Error::Malformed(self.current.clone()));
        }
        self.emit(Inst::LW(src.reg, src.reg, 0));
        self.emit(Inst::ADD(reg, src.reg, Reg::ZERO));
        for r in taken {
            self.regs.release(r);
        }
        Ok(())
    }

    /// `lv = gpr(n) except(..)`
    fn from_gpr(&mut self, lv: &LValue, n: u64, except: &[u64]) -> Result<(), Error> {
        let reg = self.gpr(n)?;
        let taken = self.occupy(reg, except)?;
        let dst = self.address(lv)?;
        if !dst.ty.is_scalar() {
            return Err(Error::Malformed(self.current.clone()));
        }
        self.emit(Inst::SW(reg, dst.reg, 0));
        for r in taken {
            self.regs.release(r);
        }
        Ok(())
    }

    /// Caller side of a call. The result, if any, is written through `dest`.
    fn call(&mut self, call: &Call, dest: Option<&LValue>) -> Result<(), Error> {
        let ctx = self.ctx;
        let callee = ctx.fun(&call.name)?;
        if callee.is_entry() {
            return Err(Error::Malformed(self.current.clone()));
        }

        let dst = match dest {
            Some(lv) => {
                let Some(ret) = &callee.ret else {
                    return Err(Error::Malformed(self.current.clone()));
                };
                let dst = self.address(lv)?;
                self.expect_type(&dst.ty, ret)?;
                dst.reg
            }
            None => Reg::ZERO,
        };

        if call.args.len() != callee.params {
            return Err(Error::ArgumentCount {
                name: call.name.clone(),
                expected: callee.params,
                found: call.args.len(),
            });
        }
        let mut args = Vec::with_capacity(call.args.len());
        for (arg, (ty, disp)) in call.args.iter().zip(callee.param_types()) {
            let v = self.expr(arg)?;
            self.expect_type(ty, &v.ty)?;
            args.push((v.reg, disp));
        }

        self.bump(Reg::SP, -(callee.frame_size() as i64 + LINK_AREA))?;
        self.stack_check()?;
        self.emit(Inst::SW(dst, Reg::SP, 0));
        for (reg, disp) in args {
            self.store_at(reg, Reg::SP, LINK_AREA + disp as i64)?;
        }
        self.buf.push(Line::jump("jal", &callee.name));
        Ok(())
    }
}
