use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub defs: Vec<Def>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    Struct(StructDef),
    Global(Type, String),
    Func(FuncDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<(Type, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    /// `None` for `void`.
    pub ret: Option<Type>,
    pub params: Vec<(Type, String)>,
    pub locals: Vec<(Type, String)>,
    pub body: Vec<Stmt>,
}

/// Type as written in the source. Struct names are resolved later.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Uint,
    Bool,
    Char,
    Struct(String),
    Pointer(Box<Type>),
    Array(Box<Type>, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    While(Expr, Vec<Stmt>),
    If(Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    Return(Option<Expr>),
    /// `gpr(n) = lv except(..)`
    ToGpr(u64, LValue, Vec<u64>),
    /// `lv = gpr(n) except(..)`
    FromGpr(LValue, u64, Vec<u64>),
    Call(Call),
    Assign(LValue, Rhs),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    Call(Call),
    New(Type),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LValue {
    pub name: String,
    pub path: Vec<Access>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Index(Expr),
    Field(String),
    Deref,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    /// Decimal or hex literal. The flag marks the `u` suffix.
    Number(u64, bool),
    Bool(bool),
    Char(char),
    LValue(LValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

// ----------------------------------------------------------------------------
// Source rendering, used to point at the offending fragment in diagnostics

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Uint => write!(f, "uint"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::Struct(name) => write!(f, "struct {name}"),
            Type::Pointer(ty) => write!(f, "{ty}*"),
            Type::Array(ty, len) => write!(f, "{ty}[{len}]"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "!{e}"),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{e}"),
            Expr::Number(n, true) => write!(f, "{n}u"),
            Expr::Number(n, false) => write!(f, "{n}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Char(c) => write!(f, "{:?}", c),
            Expr::LValue(lv) => write!(f, "{lv}"),
        }
    }
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for access in &self.path {
            match access {
                Access::Index(e) => write!(f, "[{e}]")?,
                Access::Field(name) => write!(f, ".{name}")?,
                Access::Deref => write!(f, "@")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}

impl fmt::Display for Rhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rhs::Call(call) => write!(f, "{call}"),
            Rhs::New(ty) => write!(f, "new {ty}"),
            Rhs::Expr(e) => write!(f, "{e}"),
        }
    }
}

fn except(regs: &[u64]) -> String {
    if regs.is_empty() {
        String::new()
    } else {
        format!(" except({})", regs.iter().join(", "))
    }
}

/// Statement heads only. Nested bodies are elided.
impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::While(cond, _) => write!(f, "while {cond} {{ .. }}"),
            Stmt::If(cond, _, None) => write!(f, "if {cond} {{ .. }}"),
            Stmt::If(cond, _, Some(_)) => write!(f, "if {cond} {{ .. }} else {{ .. }}"),
            Stmt::Return(Some(e)) => write!(f, "return {e}"),
            Stmt::Return(None) => write!(f, "return"),
            Stmt::ToGpr(n, lv, regs) => write!(f, "gpr({n}) = {lv}{}", except(regs)),
            Stmt::FromGpr(lv, n, regs) => write!(f, "{lv} = gpr({n}){}", except(regs)),
            Stmt::Call(call) => write!(f, "{call}"),
            Stmt::Assign(lv, rhs) => write!(f, "{lv} = {rhs}"),
        }
    }
}
