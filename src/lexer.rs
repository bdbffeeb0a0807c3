use std::fmt;

use crate::ast::{Lexeme, Token};

/// Location of a token in the query text. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Character offset from the start of the query
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: Position },

    #[error("unterminated string starting at {position}: missing closing quote")]
    UnterminatedString { position: Position },

    #[error("invalid number '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },
}

/// Splits query text into tokens.
///
/// Keywords are matched case-insensitively. The token after `from` is read as a
/// raw path (up to the next whitespace) so that `.`, `./src` or `/tmp` need no
/// quoting.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    expect_path: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            expect_path: false,
        }
    }

    /// Tokenizes the whole input. The returned stream has no trailing
    /// [`Token::Eof`]; empty input yields an empty stream.
    pub fn tokenize(input: &str) -> Result<Vec<Lexeme>, LexError> {
        let mut lexer = Lexer::new(input);
        let mut lexemes = Vec::new();
        loop {
            let lexeme = lexer.next_lexeme()?;
            if lexeme.token == Token::Eof {
                return Ok(lexemes);
            }
            lexemes.push(lexeme);
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn location(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn text_since(&self, start: Position) -> String {
        self.input[start.offset..self.position].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char, start: Position) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == quote {
                return Ok(result);
            }
            result.push(ch);
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_number(&mut self, start: Position) -> Result<Token, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = || LexError::InvalidNumber {
            text: number.clone(),
            position: start,
        };
        if is_float {
            number.parse::<f64>().map(Token::Float).map_err(|_| invalid())
        } else {
            number.parse::<i64>().map(Token::Integer).map_err(|_| invalid())
        }
    }

    /// Reads the raw word following `from`. Keywords still lex as keywords so
    /// that `select name from where ...` reports a missing source.
    fn read_path(&mut self) -> Token {
        let mut path = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                break;
            }
            path.push(ch);
            self.advance();
        }

        match Token::keyword(&path.to_ascii_lowercase()) {
            Some(keyword) => keyword,
            None => Token::Path(path),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.advance();
        self.advance();
        token
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.next_lexeme().map(|lexeme| lexeme.token)
    }

    pub fn next_lexeme(&mut self) -> Result<Lexeme, LexError> {
        self.skip_whitespace();
        let start = self.location();

        if self.expect_path {
            self.expect_path = false;
            match self.current_char() {
                None | Some('"') | Some('\'') => {}
                Some(_) => {
                    let token = self.read_path();
                    return Ok(Lexeme::new(token, self.text_since(start), start));
                }
            }
        }

        let token = match self.current_char() {
            None => Token::Eof,
            Some(',') => self.single(Token::Comma),
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('+') => self.single(Token::Plus),
            Some('-') => self.single(Token::Minus),
            Some('*') => self.single(Token::Star),
            Some('/') => self.single(Token::Slash),
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::Eq)
                } else {
                    self.single(Token::Eq)
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::NotEq)
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        ch: '!',
                        position: start,
                    });
                }
            }
            Some('<') => match self.peek_char(1) {
                Some('=') => self.double(Token::LtEq),
                Some('>') => self.double(Token::NotEq),
                _ => self.single(Token::Lt),
            },
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.double(Token::GtEq)
                } else {
                    self.single(Token::Gt)
                }
            }
            Some(quote @ ('"' | '\'')) => Token::String(self.read_string(quote, start)?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                match Token::keyword(&ident.to_ascii_lowercase()) {
                    Some(keyword) => keyword,
                    None => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(start)?,
            Some(ch) => {
                return Err(LexError::UnexpectedCharacter {
                    ch,
                    position: start,
                });
            }
        };

        if token == Token::From {
            self.expect_path = true;
        }

        Ok(Lexeme::new(token, self.text_since(start), start))
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("SELECT From where Order by LIMIT asc DESC and or not as");
    assert_eq!(lexer.next_token(), Ok(Token::Select));
    assert_eq!(lexer.next_token(), Ok(Token::From));
    assert_eq!(lexer.next_token(), Ok(Token::Where));
    assert_eq!(lexer.next_token(), Ok(Token::Order));
    assert_eq!(lexer.next_token(), Ok(Token::By));
    assert_eq!(lexer.next_token(), Ok(Token::Limit));
    assert_eq!(lexer.next_token(), Ok(Token::Asc));
    assert_eq!(lexer.next_token(), Ok(Token::Desc));
    assert_eq!(lexer.next_token(), Ok(Token::And));
    assert_eq!(lexer.next_token(), Ok(Token::Or));
    assert_eq!(lexer.next_token(), Ok(Token::Not));
    assert_eq!(lexer.next_token(), Ok(Token::As));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_path_after_from() {
    let mut lexer = Lexer::new("select name from ./src/lib.rs where size > 1");
    assert_eq!(lexer.next_token(), Ok(Token::Select));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("name".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::From));
    assert_eq!(lexer.next_token(), Ok(Token::Path("./src/lib.rs".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Where));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("size".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Gt));
    assert_eq!(lexer.next_token(), Ok(Token::Integer(1)));
}
