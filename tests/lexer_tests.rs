// tests/lexer_tests.rs

use fsq_lang::ast::Token;
use fsq_lang::lexer::{LexError, Lexer, Position};

fn tokens(input: &str) -> Vec<Token> {
    Lexer::tokenize(input)
        .unwrap()
        .into_iter()
        .map(|lexeme| lexeme.token)
        .collect()
}

// ============================================================================
// Single Character Tokens
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("+", Token::Plus),
        ("-", Token::Minus),
        ("*", Token::Star),
        ("/", Token::Slash),
        ("(", Token::LParen),
        (")", Token::RParen),
        (",", Token::Comma),
        ("=", Token::Eq),
        ("<", Token::Lt),
        (">", Token::Gt),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        assert_eq!(lexer.next_token(), Ok(expected), "Failed for input: {}", input);
        assert_eq!(lexer.next_token(), Ok(Token::Eof));
    }
}

#[test]
fn test_two_char_operators() {
    let test_cases = vec![
        ("==", Token::Eq),
        ("!=", Token::NotEq),
        ("<>", Token::NotEq),
        ("<=", Token::LtEq),
        (">=", Token::GtEq),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        assert_eq!(lexer.next_token(), Ok(expected), "Failed for input: {}", input);
        assert_eq!(lexer.next_token(), Ok(Token::Eof));
    }
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(tokens("42"), vec![Token::Integer(42)]);
    assert_eq!(tokens("2.75"), vec![Token::Float(2.75)]);
    assert_eq!(tokens("0.5"), vec![Token::Float(0.5)]);
}

#[test]
fn test_negative_number_is_minus_then_literal() {
    assert_eq!(tokens("-7"), vec![Token::Minus, Token::Integer(7)]);
}

#[test]
fn test_strings() {
    assert_eq!(tokens("'txt'"), vec![Token::String("txt".to_string())]);
    assert_eq!(
        tokens("\"2024-01-01\""),
        vec![Token::String("2024-01-01".to_string())]
    );
    // The other quote character needs no escaping
    assert_eq!(
        tokens("\"it's\""),
        vec![Token::String("it's".to_string())]
    );
}

#[test]
fn test_boolean_and_null_keywords() {
    assert_eq!(
        tokens("TRUE false Null"),
        vec![Token::Boolean(true), Token::Boolean(false), Token::Null]
    );
}

#[test]
fn test_identifiers_keep_their_case() {
    assert_eq!(
        tokens("fmtSize is_dir _x1"),
        vec![
            Token::Identifier("fmtSize".to_string()),
            Token::Identifier("is_dir".to_string()),
            Token::Identifier("_x1".to_string()),
        ]
    );
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_paths_after_from() {
    let cases = vec![".", "./dir", "/tmp", "~/x", "../a-b.c"];
    for path in cases {
        let query = format!("select name from {}", path);
        assert_eq!(
            tokens(&query),
            vec![
                Token::Select,
                Token::Identifier("name".to_string()),
                Token::From,
                Token::Path(path.to_string()),
            ],
            "Failed for path: {}",
            path
        );
    }
}

#[test]
fn test_quoted_path_after_from() {
    assert_eq!(
        tokens("select name from 'my photos'"),
        vec![
            Token::Select,
            Token::Identifier("name".to_string()),
            Token::From,
            Token::String("my photos".to_string()),
        ]
    );
}

#[test]
fn test_keyword_after_from_is_not_a_path() {
    assert_eq!(
        tokens("select name from where"),
        vec![
            Token::Select,
            Token::Identifier("name".to_string()),
            Token::From,
            Token::Where,
        ]
    );
}

// ============================================================================
// Whole queries
// ============================================================================

#[test]
fn test_full_query() {
    assert_eq!(
        tokens("select name, fmtSize(size) from . where size >= 1024 order by 2 desc limit 10"),
        vec![
            Token::Select,
            Token::Identifier("name".to_string()),
            Token::Comma,
            Token::Identifier("fmtSize".to_string()),
            Token::LParen,
            Token::Identifier("size".to_string()),
            Token::RParen,
            Token::From,
            Token::Path(".".to_string()),
            Token::Where,
            Token::Identifier("size".to_string()),
            Token::GtEq,
            Token::Integer(1024),
            Token::Order,
            Token::By,
            Token::Integer(2),
            Token::Desc,
            Token::Limit,
            Token::Integer(10),
        ]
    );
}

#[test]
fn test_empty_input() {
    assert!(Lexer::tokenize("").unwrap().is_empty());
    assert!(Lexer::tokenize("   \n\t ").unwrap().is_empty());
}

#[test]
fn test_positions() {
    let lexemes = Lexer::tokenize("select name\nfrom .").unwrap();

    assert_eq!(lexemes[0].position, Position { offset: 0, line: 1, column: 1 });
    assert_eq!(lexemes[1].position, Position { offset: 7, line: 1, column: 8 });
    assert_eq!(lexemes[2].position, Position { offset: 12, line: 2, column: 1 });
    assert_eq!(lexemes[3].text, ".");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_invalid_character() {
    let err = Lexer::tokenize("select name from . where size % 2").unwrap_err();
    assert!(matches!(err, LexError::UnexpectedCharacter { ch: '%', .. }));
}

#[test]
fn test_lone_exclamation() {
    let err = Lexer::tokenize("select ! name").unwrap_err();
    assert!(matches!(err, LexError::UnexpectedCharacter { ch: '!', .. }));
}

#[test]
fn test_unterminated_string() {
    let err = Lexer::tokenize("select 'abc from .").unwrap_err();
    assert_eq!(
        err,
        LexError::UnterminatedString {
            position: Position { offset: 7, line: 1, column: 8 }
        }
    );
}

#[test]
fn test_integer_overflow() {
    let err = Lexer::tokenize("select 99999999999999999999 from .").unwrap_err();
    assert!(matches!(err, LexError::InvalidNumber { .. }));
}
