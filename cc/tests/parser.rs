use m32cc::grammer::ast::{Access, BinaryOp, Def, Expr, LValue, Program, Rhs, Stmt, Type};
use m32cc::grammer::lexer::Lexer;
use m32cc::grammer::parsercore::Parser;
use pretty_assertions::assert_eq;

fn parse(code: &str) -> Program {
    let tokens = Lexer::new("test.c", code).parse();
    let (ast, errors) = Parser::new(tokens.into_iter()).parse();
    println!("{:#?}", ast);
    for error in &errors {
        println!("{:?}", error);
    }
    assert!(errors.is_empty(), "Errors found: {:?}", errors);
    ast
}

fn fails(code: &str) {
    let tokens = Lexer::new("test.c", code).parse();
    let (_, errors) = Parser::new(tokens.into_iter()).parse();
    assert!(!errors.is_empty(), "expected a parse error in {code:?}");
}

macro_rules! case {
    ($name:ident, $code:expr) => {
        #[test]
        fn $name() {
            parse($code);
        }
    };
}

macro_rules! fail {
    ($name:ident, $code:expr) => {
        #[test]
        fn $name() {
            fails($code);
        }
    };
}

case!(global_scalar, "int a;");
case!(global_array, "uint[16] table;");
case!(global_pointer_to_pointer, "char** argv;");
case!(struct_def, "struct pair { int a; bool b; };");
case!(struct_self_pointer, "struct node { int v; struct node* next; }");
case!(struct_global, "struct pair p;");
case!(func_empty, "void init() { }");
case!(func_params, "int add(int a, int b) { return a + b }");
case!(func_locals, "int f() { int x; char[8] buf; x = 1; return x }");
case!(while_stmt, "int main() { while i < 4 { a[i] = i; i = i + 1 } }");
case!(if_else, "int main() { if a == b { x = 1 } else { x = 2; } }");
case!(nested, "int main() { while true { if !done { step() } } }");
case!(return_bare, "void f() { return }");
case!(gpr_to, "int main() { gpr(5) = x except(3, 4); }");
case!(gpr_from, "int main() { x = gpr(31) }");
case!(new_stmt, "int main() { p = new struct node*; }");
case!(call_assign, "int main() { r = gcd(12, 16 / 2); }");
case!(char_literal, "int main() { c = 'x'; }");
case!(comments, "// header\nint main() { // body\n  return 1 // done\n}");
case!(comment_inside_struct_head, "struct node // tag\n{ int v; }");
case!(comment_before_call_paren, "int main() { step // next\n(); }");

fail!(missing_name, "int ;");
fail!(void_global, "void x;");
fail!(call_in_expr, "int main() { x = 1 + f(2) }");
fail!(unterminated, "int main() { x = 1");
fail!(suffixed_register, "int main() { gpr(5u) = x }");
fail!(bad_token, "int main() { x = $ }");

#[test]
fn precedence() {
    let ast = parse("int main() { x = 1 + 2 * 3 < 4 && !y || z == w }");
    let Def::Func(main) = &ast.defs[0] else {
        panic!("not a function");
    };
    let Stmt::Assign(_, Rhs::Expr(e)) = &main.body[0] else {
        panic!("not an assignment");
    };
    assert_eq!(e.to_string(), "((((1 + (2 * 3)) < 4) && !y) || (z == w))");
}

#[test]
fn lvalue_path() {
    let ast = parse("int main() { list@.items[i + 1].value = 0u }");
    let Def::Func(main) = &ast.defs[0] else {
        panic!("not a function");
    };
    let var = |name: &str| {
        Expr::LValue(LValue {
            name: name.to_string(),
            path: vec![],
        })
    };
    assert_eq!(
        main.body[0],
        Stmt::Assign(
            LValue {
                name: "list".to_string(),
                path: vec![
                    Access::Deref,
                    Access::Field("items".to_string()),
                    Access::Index(Expr::Binary(
                        BinaryOp::Add,
                        Box::new(var("i")),
                        Box::new(Expr::Number(1, false)),
                    )),
                    Access::Field("value".to_string()),
                ],
            },
            Rhs::Expr(Expr::Number(0, true)),
        )
    );
}

#[test]
fn declaration_shapes() {
    let ast = parse(
        "
        struct pair { int a; int b; }
        struct pair[2] pairs;
        uint f(struct pair* p, int n) { bool ok; return 0u }
        ",
    );
    assert_eq!(ast.defs.len(), 3);
    assert_eq!(
        ast.defs[1],
        Def::Global(
            Type::Array(Box::new(Type::Struct("pair".to_string())), 2),
            "pairs".to_string()
        )
    );
    let Def::Func(f) = &ast.defs[2] else {
        panic!("not a function");
    };
    assert_eq!(f.ret, Some(Type::Uint));
    assert_eq!(
        f.params,
        vec![
            (
                Type::Pointer(Box::new(Type::Struct("pair".to_string()))),
                "p".to_string()
            ),
            (Type::Int, "n".to_string()),
        ]
    );
    assert_eq!(f.locals, vec![(Type::Bool, "ok".to_string())]);
    assert_eq!(f.body, vec![Stmt::Return(Some(Expr::Number(0, true)))]);
}
