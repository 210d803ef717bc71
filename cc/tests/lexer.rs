use m32cc::grammer::lexer::{Lexer, LineLexer};
use m32cc::grammer::token::TokenKind;

fn case(code: &str, expects: Vec<TokenKind>) {
    let tokens = LineLexer::new(code, "test.c", 0).parse();

    println!(" {code}");
    for token in &tokens {
        print!("\r\x1b[{}C^", token.pos.col + 1);
    }
    println!();
    for (idx, token) in tokens.iter().enumerate() {
        println!("{:>2}: {:?}", idx, token.kind);
    }

    assert_eq!(tokens.len(), expects.len());
    for (idx, expect) in expects.iter().enumerate() {
        assert_eq!(tokens[idx].kind, *expect);
    }
}

#[test]
fn declarations() {
    use TokenKind::*;
    case(
        "struct node* next; int[4] a; // sample comment",
        vec![
            KwStruct,
            Ident(format!("node")),
            Star,
            Ident(format!("next")),
            Semicolon,
            KwInt,
            LBracket,
            Number(format!("4"), 4, false),
            RBracket,
            Ident(format!("a")),
            Semicolon,
            Comment(format!("sample comment")),
        ],
    );
}

#[test]
fn operators() {
    use TokenKind::*;
    case(
        "a<=b >= c==d != !e && f || -g",
        vec![
            Ident(format!("a")),
            LAngleEqual,
            Ident(format!("b")),
            RAngleEqual,
            Ident(format!("c")),
            EqualEqual,
            Ident(format!("d")),
            ExclEqual,
            Excl,
            Ident(format!("e")),
            AmpAmp,
            Ident(format!("f")),
            PipePipe,
            Minus,
            Ident(format!("g")),
        ],
    );
}

#[test]
fn literals() {
    use TokenKind::*;
    case(
        "4294967294u 0x1F 1_000 'a' '\\n' true false",
        vec![
            Number(format!("4294967294u"), 4294967294, true),
            Number(format!("0x1F"), 31, false),
            Number(format!("1_000"), 1000, false),
            Char('a'),
            Char('\n'),
            KwTrue,
            KwFalse,
        ],
    );
}

#[test]
fn statements() {
    use TokenKind::*;
    case(
        "gpr(5) = p@.next except(3); x = new int*;",
        vec![
            KwGpr,
            LParen,
            Number(format!("5"), 5, false),
            RParen,
            Equal,
            Ident(format!("p")),
            Atmark,
            Period,
            Ident(format!("next")),
            KwExcept,
            LParen,
            Number(format!("3"), 3, false),
            RParen,
            Semicolon,
            Ident(format!("x")),
            Equal,
            KwNew,
            KwInt,
            Star,
            Semicolon,
        ],
    );
}

#[test]
fn malformed() {
    use TokenKind::*;
    case(
        "12ab '' $",
        vec![
            Error(format!("12ab")),
            Error(format!("'")),
            Error(format!("$")),
        ],
    );
}

#[test]
fn comment_takes_rest_of_line() {
    use TokenKind::*;
    case(
        "x = 1 //   note // here",
        vec![
            Ident(format!("x")),
            Equal,
            Number(format!("1"), 1, false),
            Comment(format!("note // here")),
        ],
    );
}

#[test]
fn positions_across_lines() {
    let tokens = Lexer::new("test.c", "int a;\n\n  a = 0X1f;").parse();
    let spots = tokens
        .iter()
        .map(|t| (t.pos.line, t.pos.col))
        .collect::<Vec<_>>();
    assert_eq!(spots, [(0, 0), (0, 4), (0, 5), (2, 2), (2, 4), (2, 6), (2, 10)]);
    assert_eq!(tokens[5].kind, TokenKind::Number(format!("0X1f"), 31, false));
}
