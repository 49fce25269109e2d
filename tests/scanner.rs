use treelox as lox;

use lox::scanner::Scanner;
use lox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn test_scanner_symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_two_char_operators() {
    assert_token_sequence(
        "! != = == < <= > >=",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_keywords_and_identifiers() {
    assert_token_sequence(
        "class Foo < Bar { fun init() { super.init(); this.done = nil; } }",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "Foo"),
            (TokenType::LESS, "<"),
            (TokenType::IDENTIFIER, "Bar"),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::FUN, "fun"),
            (TokenType::IDENTIFIER, "init"),
            (TokenType::LEFT_PAREN, "("),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::SUPER, "super"),
            (TokenType::DOT, "."),
            (TokenType::IDENTIFIER, "init"),
            (TokenType::LEFT_PAREN, "("),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::THIS, "this"),
            (TokenType::DOT, "."),
            (TokenType::IDENTIFIER, "done"),
            (TokenType::EQUAL, "="),
            (TokenType::NIL, "nil"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_literals() {
    let scanner = Scanner::new(b"123 3.14 \"hello\"");
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), 4);

    match &tokens[0].token_type {
        TokenType::NUMBER(n) => assert_eq!(*n, 123.0),
        other => panic!("Expected NUMBER, got {:?}", other),
    }
    match &tokens[1].token_type {
        TokenType::NUMBER(n) => assert_eq!(*n, 3.14),
        other => panic!("Expected NUMBER, got {:?}", other),
    }
    match &tokens[2].token_type {
        TokenType::STRING(s) => assert_eq!(s, "hello"),
        other => panic!("Expected STRING, got {:?}", other),
    }
    assert_eq!(tokens[3].token_type, TokenType::EOF);
}

#[test]
fn test_scanner_token_display() {
    let scanner = Scanner::new(b"42");
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    // Integral numbers display their literal with a trailing ".0".
    assert_eq!(tokens[0].to_string(), "NUMBER 42 42.0");
}

#[test]
fn test_token_serializes_to_json() {
    let scanner = Scanner::new(b"answer 42");
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    let ident = serde_json::to_string(&tokens[0]).expect("token serializes");
    assert_eq!(
        ident,
        "{\"token_type\":\"IDENTIFIER\",\"lexeme\":\"answer\",\"line\":1}"
    );

    // Payload-carrying variants keep their literal value.
    let number = serde_json::to_string(&tokens[1]).expect("token serializes");
    assert_eq!(
        number,
        "{\"token_type\":{\"NUMBER\":42.0},\"lexeme\":\"42\",\"line\":1}"
    );
}

#[test]
fn test_scanner_comments_and_lines() {
    let source = "var a; // a comment\nvar b;";
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(lexemes, vec!["var", "a", ";", "var", "b", ";", ""]);

    // The comment is skipped; the second `var` sits on line 2.
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[3].line, 2);
}

#[test]
fn test_scanner_unterminated_string() {
    let (tokens, errors) = Scanner::new(b"\"oops").scan_all();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Unterminated string"));

    // The stream still terminates with EOF.
    assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
}

#[test]
fn test_scanner_unexpected_characters_do_not_stop_the_stream() {
    let (tokens, errors) = Scanner::new(b",.$(#").scan_all();

    // 2 errors for '$' and '#'; valid tokens around them survive.
    assert_eq!(errors.len(), 2);
    for e in &errors {
        assert!(
            e.to_string().contains("Unexpected character"),
            "unexpected message: {}",
            e
        );
    }

    let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
    assert_eq!(lexemes, vec![",", ".", "(", ""]);
}
