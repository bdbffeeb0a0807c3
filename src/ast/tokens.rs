use std::fmt;

use crate::lexer::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1024
    /// ```
    Integer(i64),

    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Float(f64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// 'txt'
    /// "2024-01-01"
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    // Identifiers
    /// Attribute, function or alias name
    ///
    /// Must start with letter or underscore, followed by letters, digits, or underscores.
    ///
    /// # Examples
    /// ```text
    /// size
    /// fmtSize
    /// is_dir
    /// ```
    Identifier(String),

    /// Unquoted source path following `from`
    ///
    /// # Examples
    /// ```text
    /// .
    /// ./src
    /// ~/Downloads
    /// /var/log
    /// ```
    Path(String),

    // Keywords (case-insensitive)
    Select,
    From,
    Where,
    Order,
    By,
    Limit,
    Asc,
    Desc,
    As,
    /// Logical AND (word, not symbol)
    And,
    /// Logical OR (word, not symbol)
    Or,
    /// Logical NOT (word, not symbol)
    Not,

    // Comparison
    /// `=` (also accepts `==`)
    Eq,
    /// `!=` or `<>`
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    /// Multiplication, or "all default columns" in projection position
    Star,
    Slash,

    // Delimiters
    LParen,
    RParen,
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Keyword lookup; `word` must already be lowercase.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "select" => Token::Select,
            "from" => Token::From,
            "where" => Token::Where,
            "order" => Token::Order,
            "by" => Token::By,
            "limit" => Token::Limit,
            "asc" => Token::Asc,
            "desc" => Token::Desc,
            "as" => Token::As,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            _ => return None,
        };
        Some(token)
    }

    /// True for tokens that can begin an expression.
    pub fn starts_expression(&self) -> bool {
        matches!(
            self,
            Token::Integer(_)
                | Token::Float(_)
                | Token::String(_)
                | Token::Boolean(_)
                | Token::Null
                | Token::Identifier(_)
                | Token::LParen
                | Token::Minus
                | Token::Not
        )
    }
}

/// A token together with its source text and position.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    /// Literal text as written in the query
    pub text: String,
    pub position: Position,
}

impl Lexeme {
    pub fn new(token: Token, text: impl Into<String>, position: Position) -> Self {
        Lexeme {
            token,
            text: text.into(),
            position,
        }
    }

    /// Position just past the end of this lexeme.
    pub fn end(&self) -> Position {
        let width = self.text.chars().count();
        Position {
            offset: self.position.offset + width,
            line: self.position.line,
            column: self.position.column + width,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token == Token::Eof {
            f.write_str("end of query")
        } else {
            f.write_str(&self.text)
        }
    }
}
