use super::ast::{
    Access, BinaryOp, Call, Def, Expr, FuncDef, LValue, Program, Rhs, Stmt, StructDef, Type,
    UnaryOp,
};
use super::parsercore::Parser;
use super::token::TokenKind::*;
use crate::error::Error;
use crate::{check, check_nth, expect, optional, repeat};

impl<'a> Parser<'a> {
    /// Parsing stops at the first error.
    pub fn parse(mut self) -> (Program, Vec<Error>) {
        let program = self.parse_program();
        (program, self.into_errors())
    }
}

impl<'a> Parser<'a> {
    /// program = { def }
    fn parse_program(&mut self) -> Program {
        let mut defs = Vec::new();
        while self.peek().is_some() {
            match self.parse_def() {
                Ok(def) => defs.push(def),
                Err(err) => {
                    self.error(err);
                    break;
                }
            }
        }
        Program { defs }
    }

    /// def = struct-def | global-def | func-def
    fn parse_def(&mut self) -> Result<Def, Error> {
        // Struct: "struct" ident "{" ...
        if check!(self, KwStruct) && check_nth!(self, 2, LCurly) {
            return Ok(Def::Struct(self.parse_struct_def()?));
        }

        let ret = if optional!(self, KwVoid).is_some() {
            None
        } else {
            Some(self.parse_type()?)
        };
        let name = self.parse_ident()?;

        match (ret, check!(self, LParen)) {
            (ret, true) => Ok(Def::Func(self.parse_func_def(name, ret)?)),
            (Some(ty), false) => {
                expect!(self, Semicolon)?;
                Ok(Def::Global(ty, name))
            }
            (None, false) => Err(self.unexpected()),
        }
    }

    /// struct-def = "struct" ident "{" { type ident ";" } "}" [ ";" ]
    fn parse_struct_def(&mut self) -> Result<StructDef, Error> {
        expect!(self, KwStruct)?;
        let name = self.parse_ident()?;
        expect!(self, LCurly)?;
        let fields = repeat!(self, self.parse_decl(), RCurly);
        expect!(self, RCurly)?;
        optional!(self, Semicolon);
        Ok(StructDef { name, fields })
    }

    /// func-def = ( type | "void" ) ident "(" [ param { "," param } ] ")" "{" { decl } { stmt } "}"
    fn parse_func_def(&mut self, name: String, ret: Option<Type>) -> Result<FuncDef, Error> {
        expect!(self, LParen)?;
        let params = repeat!(self, self.parse_param(), Comma, RParen);
        expect!(self, RParen)?;
        expect!(self, LCurly)?;
        let mut locals = Vec::new();
        while self.check_if(|token| token.kind.is_type_start()) {
            locals.push(self.parse_decl()?);
        }
        let body = repeat!(self, self.parse_stmt(), RCurly);
        expect!(self, RCurly)?;
        Ok(FuncDef {
            name,
            ret,
            params,
            locals,
            body,
        })
    }

    /// param = type ident
    fn parse_param(&mut self) -> Result<(Type, String), Error> {
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        Ok((ty, name))
    }

    /// decl = type ident ";"
    fn parse_decl(&mut self) -> Result<(Type, String), Error> {
        let decl = self.parse_param()?;
        expect!(self, Semicolon)?;
        Ok(decl)
    }

    /// type = ( "int" | "uint" | "bool" | "char" | "struct" ident ) { "*" | "[" number "]" }
    fn parse_type(&mut self) -> Result<Type, Error> {
        let token = self.next().ok_or(Error::UnexpectedEOF)?;
        let mut ty = match token.kind {
            KwInt => Type::Int,
            KwUint => Type::Uint,
            KwBool => Type::Bool,
            KwChar => Type::Char,
            KwStruct => Type::Struct(self.parse_ident()?),
            _ => return Err(Error::UnexpectedToken(token.into())),
        };
        loop {
            if optional!(self, Star).is_some() {
                ty = Type::Pointer(Box::new(ty));
            } else if let Some(len) = optional!(self, LBracket, self.parse_number()?) {
                expect!(self, RBracket)?;
                ty = Type::Array(Box::new(ty), len as usize);
            } else {
                break;
            }
        }
        Ok(ty)
    }

    // ------------------------------------------------------------------------
    // Statements

    /// stmt = ( while-stmt | if-stmt | return-stmt | gpr-stmt | call-stmt | assign-stmt ) [ ";" ]
    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        let token = self.peek().cloned().ok_or(Error::UnexpectedEOF)?;
        let stmt = match token.kind {
            KwWhile => self.parse_while_stmt()?,
            KwIf => self.parse_if_stmt()?,
            KwReturn => self.parse_return_stmt()?,
            KwGpr => self.parse_to_gpr_stmt()?,
            Ident(_) if check_nth!(self, 1, LParen) => Stmt::Call(self.parse_call()?),
            Ident(_) => self.parse_assign_stmt()?,
            _ => return Err(Error::UnexpectedToken(token.into())),
        };
        optional!(self, Semicolon);
        Ok(stmt)
    }

    /// block = "{" { stmt } "}"
    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        expect!(self, LCurly)?;
        let stmts = repeat!(self, self.parse_stmt(), RCurly);
        expect!(self, RCurly)?;
        Ok(stmts)
    }

    /// while-stmt = "while" expr block
    fn parse_while_stmt(&mut self) -> Result<Stmt, Error> {
        expect!(self, KwWhile)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While(cond, body))
    }

    /// if-stmt = "if" expr block [ "else" block ]
    fn parse_if_stmt(&mut self) -> Result<Stmt, Error> {
        expect!(self, KwIf)?;
        let cond = self.parse_expr()?;
        let then = self.parse_block()?;
        let els = optional!(self, KwElse, self.parse_block()?);
        Ok(Stmt::If(cond, then, els))
    }

    /// return-stmt = "return" [ expr ]
    fn parse_return_stmt(&mut self) -> Result<Stmt, Error> {
        expect!(self, KwReturn)?;
        if check!(self, Semicolon | RCurly) {
            Ok(Stmt::Return(None))
        } else {
            Ok(Stmt::Return(Some(self.parse_expr()?)))
        }
    }

    /// gpr-stmt = "gpr" "(" number ")" "=" lvalue [ except ]
    fn parse_to_gpr_stmt(&mut self) -> Result<Stmt, Error> {
        let reg = self.parse_gpr()?;
        expect!(self, Equal)?;
        let lv = self.parse_lvalue()?;
        let except = self.parse_except()?;
        Ok(Stmt::ToGpr(reg, lv, except))
    }

    /// assign-stmt = lvalue "=" ( "gpr" "(" number ")" [ except ] | "new" type | call | expr )
    fn parse_assign_stmt(&mut self) -> Result<Stmt, Error> {
        let lv = self.parse_lvalue()?;
        expect!(self, Equal)?;
        if check!(self, KwGpr) {
            let reg = self.parse_gpr()?;
            let except = self.parse_except()?;
            return Ok(Stmt::FromGpr(lv, reg, except));
        }
        let rhs = if optional!(self, KwNew).is_some() {
            Rhs::New(self.parse_type()?)
        } else if check!(self, Ident(_)) && check_nth!(self, 1, LParen) {
            Rhs::Call(self.parse_call()?)
        } else {
            Rhs::Expr(self.parse_expr()?)
        };
        Ok(Stmt::Assign(lv, rhs))
    }

    /// "gpr" "(" number ")"
    fn parse_gpr(&mut self) -> Result<u64, Error> {
        expect!(self, KwGpr)?;
        expect!(self, LParen)?;
        let reg = self.parse_number()?;
        expect!(self, RParen)?;
        Ok(reg)
    }

    /// except = "except" "(" number { "," number } ")"
    fn parse_except(&mut self) -> Result<Vec<u64>, Error> {
        if optional!(self, KwExcept).is_none() {
            return Ok(Vec::new());
        }
        expect!(self, LParen)?;
        let regs = repeat!(self, self.parse_number(), Comma, RParen);
        expect!(self, RParen)?;
        Ok(regs)
    }

    /// call = ident "(" [ expr { "," expr } ] ")"
    fn parse_call(&mut self) -> Result<Call, Error> {
        let name = self.parse_ident()?;
        expect!(self, LParen)?;
        let args = repeat!(self, self.parse_expr(), Comma, RParen);
        expect!(self, RParen)?;
        Ok(Call { name, args })
    }

    /// lvalue = ident { "[" expr "]" | "." ident | "@" }
    fn parse_lvalue(&mut self) -> Result<LValue, Error> {
        let name = self.parse_ident()?;
        let mut path = Vec::new();
        loop {
            if let Some(index) = optional!(self, LBracket, self.parse_expr()?) {
                expect!(self, RBracket)?;
                path.push(Access::Index(index));
            } else if let Some(field) = optional!(self, Period, self.parse_ident()?) {
                path.push(Access::Field(field));
            } else if optional!(self, Atmark).is_some() {
                path.push(Access::Deref);
            } else {
                break;
            }
        }
        Ok(LValue { name, path })
    }

    // ------------------------------------------------------------------------
    // Expressions

    /// expr = or-expr
    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or_expr()
    }

    /// or-expr = and-expr { "||" and-expr }
    fn parse_or_expr(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and_expr()?;
        while optional!(self, PipePipe).is_some() {
            let rhs = self.parse_and_expr()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// and-expr = eq-expr { "&&" eq-expr }
    fn parse_and_expr(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_eq_expr()?;
        while optional!(self, AmpAmp).is_some() {
            let rhs = self.parse_eq_expr()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// eq-expr = relat-expr { ( "==" | "!=" ) relat-expr }
    fn parse_eq_expr(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_relat_expr()?;
        loop {
            let op = if optional!(self, EqualEqual).is_some() {
                BinaryOp::Eq
            } else if optional!(self, ExclEqual).is_some() {
                BinaryOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_relat_expr()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// relat-expr = add-expr [ ( "<" | "<=" | ">" | ">=" ) add-expr ]
    fn parse_relat_expr(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_add_expr()?;
        let op = match self.peek().map(|token| &token.kind) {
            Some(LAngle) => BinaryOp::Lt,
            Some(LAngleEqual) => BinaryOp::Le,
            Some(RAngle) => BinaryOp::Gt,
            Some(RAngleEqual) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.parse_add_expr()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    /// add-expr = mul-expr { ( "+" | "-" ) mul-expr }
    fn parse_add_expr(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_mul_expr()?;
        loop {
            let op = if optional!(self, Plus).is_some() {
                BinaryOp::Add
            } else if optional!(self, Minus).is_some() {
                BinaryOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_mul_expr()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// mul-expr = unary-expr { ( "*" | "/" ) unary-expr }
    fn parse_mul_expr(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = if optional!(self, Star).is_some() {
                BinaryOp::Mul
            } else if optional!(self, Slash).is_some() {
                BinaryOp::Div
            } else {
                break;
            };
            let rhs = self.parse_unary_expr()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// unary-expr = ( "!" | "-" ) unary-expr | primary
    fn parse_unary_expr(&mut self) -> Result<Expr, Error> {
        if optional!(self, Excl).is_some() {
            let e = self.parse_unary_expr()?;
            Ok(Expr::Unary(UnaryOp::Not, Box::new(e)))
        } else if optional!(self, Minus).is_some() {
            let e = self.parse_unary_expr()?;
            Ok(Expr::Unary(UnaryOp::Neg, Box::new(e)))
        } else {
            self.parse_primary()
        }
    }

    /// primary = number [ "u" ] | "true" | "false" | char | lvalue | "(" expr ")"
    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let token = self.peek().cloned().ok_or(Error::UnexpectedEOF)?;
        match token.kind {
            Number(_, value, unsigned) => {
                self.next();
                Ok(Expr::Number(value, unsigned))
            }
            KwTrue => {
                self.next();
                Ok(Expr::Bool(true))
            }
            KwFalse => {
                self.next();
                Ok(Expr::Bool(false))
            }
            Char(ch) => {
                self.next();
                Ok(Expr::Char(ch))
            }
            Ident(_) => Ok(Expr::LValue(self.parse_lvalue()?)),
            LParen => {
                expect!(self, LParen)?;
                let e = self.parse_expr()?;
                expect!(self, RParen)?;
                Ok(e)
            }
            _ => Err(Error::UnexpectedToken(token.into())),
        }
    }

    // ------------------------------------------------------------------------
    // Terminals

    fn parse_ident(&mut self) -> Result<String, Error> {
        let token = expect!(self, Ident(_))?;
        match token.kind {
            Ident(name) => Ok(name),
            _ => Err(Error::UnexpectedToken(token.into())),
        }
    }

    /// Plain number without the `u` suffix.
    fn parse_number(&mut self) -> Result<u64, Error> {
        let token = expect!(self, Number(_, _, false))?;
        match token.kind {
            Number(_, value, _) => Ok(value),
            _ => Err(Error::UnexpectedToken(token.into())),
        }
    }

    fn unexpected(&mut self) -> Error {
        match self.peek() {
            Some(token) => Error::UnexpectedToken(token.into()),
            None => Error::UnexpectedEOF,
        }
    }
}
