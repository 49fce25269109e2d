use treelox as lox;

use lox::error::LoxError;
use lox::parser::{Expr, LiteralValue, Parser, Stmt};
use lox::scanner::Scanner;
use lox::token::Token;

fn scan(source: &str) -> Vec<Token> {
    let (tokens, errors) = Scanner::new(source.as_bytes()).scan_all();
    assert!(errors.is_empty(), "lexical errors in test source: {:?}", errors);
    tokens
}

fn parse(source: &str) -> Vec<Stmt> {
    let tokens = scan(source);
    let mut parser = Parser::new(&tokens);
    parser.parse().expect("test source should parse")
}

fn parse_errors(source: &str) -> Vec<LoxError> {
    let tokens = scan(source);
    let mut parser = Parser::new(&tokens);
    match parser.parse() {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

#[test]
fn test_parser_precedence() {
    let statements = parse("1 + 2 * 3;");
    assert_eq!(statements.len(), 1);

    // Multiplication binds tighter: (+ 1 (* 2 3)).
    let Stmt::Expression(Expr::Binary {
        left,
        operator,
        right,
    }) = &statements[0]
    else {
        panic!("expected expression statement, got {:?}", statements[0]);
    };

    assert_eq!(operator.lexeme, "+");
    assert_eq!(**left, Expr::Literal(LiteralValue::Number(1.0)));

    let Expr::Binary { operator, .. } = &**right else {
        panic!("expected nested binary, got {:?}", right);
    };
    assert_eq!(operator.lexeme, "*");
}

#[test]
fn test_parser_for_desugars_to_while() {
    let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;");
    assert_eq!(statements.len(), 1);

    // { var i; while (cond) { body; incr; } }
    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected block from desugaring, got {:?}", statements[0]);
    };
    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while from desugaring, got {:?}", outer[1]);
    };
    let Stmt::Block(inner) = &**body else {
        panic!("expected block body, got {:?}", body);
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn test_parser_class_methods() {
    let statements = parse(
        "class Adder {\
           fun init(base) { this.base = base; }\
           fun add(n) { return this.base + n; }\
           class fun describe() { return \"adds things\"; }\
         }",
    );

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &statements[0]
    else {
        panic!("expected class declaration, got {:?}", statements[0]);
    };

    assert_eq!(name.lexeme, "Adder");
    assert!(superclass.is_none());
    assert_eq!(methods.len(), 3);

    assert_eq!(methods[0].name.lexeme, "init");
    assert!(!methods[0].is_class_method);
    assert_eq!(methods[1].name.lexeme, "add");
    assert!(!methods[1].is_class_method);
    assert_eq!(methods[2].name.lexeme, "describe");
    assert!(methods[2].is_class_method);
}

#[test]
fn test_parser_superclass_clause() {
    let statements = parse("class B < A { fun m() { return super.m(); } }");

    let Stmt::Class { superclass, methods, .. } = &statements[0] else {
        panic!("expected class declaration, got {:?}", statements[0]);
    };

    let Some(Expr::Variable { name, .. }) = superclass else {
        panic!("expected superclass variable, got {:?}", superclass);
    };
    assert_eq!(name.lexeme, "A");

    // `super.m` folds the method name into the node.
    let Stmt::Return { value: Some(Expr::Call { callee, .. }), .. } = &methods[0].body[0] else {
        panic!("expected return of a call, got {:?}", methods[0].body[0]);
    };
    let Expr::Super { method, .. } = &**callee else {
        panic!("expected super expression, got {:?}", callee);
    };
    assert_eq!(method.lexeme, "m");
}

#[test]
fn test_parser_invalid_assignment_target() {
    let errors = parse_errors("1 = 2;");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target."));
}

#[test]
fn test_parser_bare_method_name_rejected() {
    let errors = parse_errors("class A { m() {} }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Expect 'class fun' or 'fun' in class body."));
}

#[test]
fn test_parser_recovers_and_reports_multiple_errors() {
    // Two separate statements with errors; synchronize() lets the second
    // one be reported too.
    let errors = parse_errors("var = 1;\nprint 2\nvar ok = 3;");
    assert_eq!(errors.len(), 2);
    assert!(errors[0].to_string().contains("Expect variable name."));
    assert!(errors[1].to_string().contains("Expect ';' after value."));
}

#[test]
fn test_parser_assignment_to_property() {
    let statements = parse("obj.field = 42;");

    let Stmt::Expression(Expr::Set { object, name, value }) = &statements[0] else {
        panic!("expected set expression, got {:?}", statements[0]);
    };
    assert!(matches!(**object, Expr::Variable { .. }));
    assert_eq!(name.lexeme, "field");
    assert_eq!(**value, Expr::Literal(LiteralValue::Number(42.0)));
}
