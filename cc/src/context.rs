use arch::MemoryMap;
use indexmap::IndexMap;
use log::debug;

use crate::error::Error;
use crate::grammer::ast::{Def, Program, Type};
use crate::types::{TypeTable, VarType};

/// Ordered variables with their byte displacement from the start of the block.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    vars: IndexMap<String, (VarType, u32)>,
    size: u32,
}

impl Layout {
    fn push(&mut self, types: &TypeTable, ty: &Type, name: &str) -> Result<(), Error> {
        let ty = types.resolve(ty)?;
        let size = types.size_of(&ty)?;
        if self.vars.contains_key(name) {
            return Err(Error::Redefined(name.to_string()));
        }
        let end = self
            .size
            .checked_add(size)
            .ok_or_else(|| Error::TooLarge(name.to_string()))?;
        self.vars.insert(name.to_string(), (ty, self.size));
        self.size = end;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<(&VarType, u32)> {
        self.vars.get(name).map(|(ty, disp)| (ty, *disp))
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarType, u32)> {
        self.vars.iter().map(|(name, (ty, disp))| (name, ty, *disp))
    }
}

#[derive(Debug, Clone)]
pub struct Fun {
    pub name: String,
    /// `None` for `void`.
    pub ret: Option<VarType>,
    /// Parameters first, then locals.
    pub frame: Layout,
    pub params: usize,
}

impl Fun {
    pub fn frame_size(&self) -> u32 {
        self.frame.size()
    }

    pub fn param_types(&self) -> impl Iterator<Item = (&VarType, u32)> {
        self.frame.iter().take(self.params).map(|(_, ty, disp)| (ty, disp))
    }

    /// Displacement and size of the local region following the parameters.
    /// `None` when the locals take no bytes.
    pub fn locals(&self) -> Option<(u32, u32)> {
        let (_, _, start) = self.frame.iter().nth(self.params)?;
        let len = self.frame.size() - start;
        (len > 0).then_some((start, len))
    }

    pub fn is_entry(&self) -> bool {
        self.name == "main"
    }
}

/// Everything code generation needs to know about one program.
#[derive(Debug, Default)]
pub struct Context {
    pub map: MemoryMap,
    types: TypeTable,
    funs: IndexMap<String, Fun>,
    globals: Option<Layout>,
}

impl Context {
    pub fn new(map: MemoryMap) -> Self {
        Context {
            map,
            ..Context::default()
        }
    }

    /// Forget all symbols. The memory map is kept.
    pub fn reset(&mut self) {
        self.types.clear();
        self.funs.clear();
        self.globals = None;
    }

    /// Symbol collection pass: struct layouts, the global block and function frames.
    pub fn collect(&mut self, program: &Program) -> Result<(), Error> {
        self.reset();
        for def in &program.defs {
            match def {
                Def::Struct(def) => {
                    let id = self.types.declare(&def.name)?;
                    self.types.define(id, &def.fields)?;
                }
                Def::Global(ty, name) => {
                    let globals = self.globals.get_or_insert_with(Layout::default);
                    globals.push(&self.types, ty, name)?;
                }
                Def::Func(def) => {
                    if self.funs.contains_key(&def.name) {
                        return Err(Error::Redefined(def.name.clone()));
                    }
                    let ret = match &def.ret {
                        Some(ty) => Some(self.types.resolve(ty)?),
                        None => None,
                    };
                    let mut frame = Layout::default();
                    for (ty, name) in def.params.iter().chain(&def.locals) {
                        frame
                            .push(&self.types, ty, name)
                            .map_err(|e| e.in_function(&def.name))?;
                    }
                    debug!(
                        "frame of `{}`: {} bytes, {} params",
                        def.name,
                        frame.size(),
                        def.params.len()
                    );
                    self.funs.insert(
                        def.name.clone(),
                        Fun {
                            name: def.name.clone(),
                            ret,
                            frame,
                            params: def.params.len(),
                        },
                    );
                }
            }
        }
        if !self.funs.contains_key("main") {
            return Err(Error::NoMain);
        }
        Ok(())
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn fun(&self, name: &str) -> Result<&Fun, Error> {
        self.funs
            .get(name)
            .ok_or_else(|| Error::UndefinedFunction(name.to_string()))
    }

    pub fn globals(&self) -> Option<&Layout> {
        self.globals.as_ref()
    }

    pub fn global(&self, name: &str) -> Option<(&VarType, u32)> {
        self.globals.as_ref()?.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammer::{lexer::Lexer, parsercore::Parser};

    fn collect(code: &str) -> Result<Context, Error> {
        let tokens = Lexer::new("test.c", code).parse();
        let (program, errors) = Parser::new(tokens.into_iter()).parse();
        assert!(errors.is_empty(), "{errors:?}");
        let mut ctx = Context::new(MemoryMap::default());
        ctx.collect(&program)?;
        Ok(ctx)
    }

    #[test]
    fn frames_and_globals() {
        let ctx = collect(
            "
            struct pair { int a; int b; }
            int g;
            struct pair[2] table;
            int add(int x, uint y) { int t; char[3] buf; return x }
            int main() { return 1 }
            ",
        )
        .unwrap();

        assert_eq!(ctx.global("g"), Some((&VarType::Int, 0)));
        assert_eq!(ctx.global("table").map(|(_, d)| d), Some(4));
        assert_eq!(ctx.globals().map(|g| g.size()), Some(20));

        let add = ctx.fun("add").unwrap();
        assert_eq!(add.frame_size(), 24);
        assert_eq!(
            add.param_types().collect::<Vec<_>>(),
            vec![(&VarType::Int, 0), (&VarType::Uint, 4)]
        );
        assert_eq!(add.locals(), Some((8, 16)));
        assert!(!add.is_entry());

        let main = ctx.fun("main").unwrap();
        assert_eq!(main.locals(), None);
        assert!(main.is_entry());
    }

    #[test]
    fn no_globals_is_not_an_error() {
        let ctx = collect("int main() { return 1 }").unwrap();
        assert!(ctx.globals().is_none());
        assert!(ctx.global("x").is_none());
    }

    #[test]
    fn symbol_errors() {
        assert!(matches!(collect("int f() { }"), Err(Error::NoMain)));
        assert!(matches!(
            collect("int main() { } int main() { }"),
            Err(Error::Redefined(_))
        ));
        assert!(matches!(
            collect("struct s x; int main() { }"),
            Err(Error::UnknownType(_))
        ));
        assert!(matches!(
            collect("int main() { int a; int a; }"),
            Err(Error::InFunction { .. })
        ));
        assert!(matches!(
            ctx_fun("int main() { }", "missing"),
            Err(Error::UndefinedFunction(_))
        ));
    }

    #[test]
    fn empty_locals_need_no_fill() {
        let ctx = collect("void f(int a) { int[0] z; } int main() { }").unwrap();
        let f = ctx.fun("f").unwrap();
        assert_eq!(f.frame_size(), 4);
        assert_eq!(f.locals(), None);
    }

    #[test]
    fn oversized_globals_rejected() {
        assert!(matches!(
            collect("int[536870912] a; int[536870912] b; int main() { }"),
            Err(Error::TooLarge(name)) if name == "b"
        ));
    }

    fn ctx_fun(code: &str, name: &str) -> Result<(), Error> {
        collect(code)?.fun(name).map(|_| ())
    }

    #[test]
    fn reset_clears_symbols() {
        let mut ctx = collect("int g; int main() { }").unwrap();
        ctx.reset();
        assert!(ctx.globals().is_none());
        assert!(ctx.fun("main").is_err());
        assert_eq!(ctx.map, MemoryMap::default());
    }
}
