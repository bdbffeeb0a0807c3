use std::mem;

use crate::{
    ast::{BinOp, Direction, Expr, Lexeme, OrderKey, Projection, Query, Token, UnaryOp},
    context::{Arity, Capability, Function, Registry},
    lexer::Position,
    value::Value,
};

/// Errors detected while parsing. Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("only select queries are supported, found '{found}' at {position}")]
    NonSelectQuery { found: String, position: Position },

    #[error("expected an expression in the projection list, found '{found}' at {position}")]
    ExpectedExpressionInProjection { found: String, position: Position },

    #[error("expected ',' or 'from' after a projection, found '{found}' at {position}")]
    MissingCommaProjection { found: String, position: Position },

    #[error("function '{function}' must be followed by '(' at {position}")]
    OpeningParenthesesProjection {
        function: &'static str,
        position: Position,
    },

    #[error("expected ')' to close the call to '{function}', found '{found}' at {position}")]
    ClosingParenthesesProjection {
        function: &'static str,
        found: String,
        position: Position,
    },

    #[error("missing source path after 'from' at {position}")]
    MissingSource { position: Position },

    #[error("expected 'by' after 'order', found '{found}' at {position}")]
    MissingBy { found: String, position: Position },

    #[error("expected a column number after 'order by', found '{found}' at {position}")]
    MissingOrderByColumns { found: String, position: Position },

    #[error("expected ',' between order by columns, found '{found}' at {position}")]
    MissingCommaOrderBy { found: String, position: Position },

    #[error("expected a value after 'limit' at {position}")]
    LimitValue { position: Position },

    #[error("limit must be a non-negative integer, found '{found}' at {position}")]
    LimitValueInt { found: String, position: Position },

    #[error("unknown identifier '{name}' at {position}")]
    UnknownIdentifier { name: String, position: Position },

    #[error("function '{function}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        function: &'static str,
        expected: Arity,
        got: usize,
        position: Position,
    },

    #[error("order by column {index} is out of range: the query has {columns} column(s)")]
    OrderByIndexOutOfRange {
        index: i64,
        columns: usize,
        position: Position,
    },

    #[error("expected {expected}, found '{found}' at {position}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: Position,
    },

    #[error("aggregate function '{function}' cannot be used in a where clause")]
    NotAllowedInWhere {
        function: &'static str,
        position: Position,
    },

    #[error("aggregate function '{function}' cannot be nested inside another aggregate")]
    NestedAggregate {
        function: &'static str,
        position: Position,
    },
}

/// Recursive-descent parser from tokens to a [`Query`].
///
/// Identifiers are resolved against the registry as they are consumed, so a
/// successful parse never contains an unknown attribute or function.
pub struct Parser<'r> {
    tokens: Vec<Lexeme>,
    index: usize,
    registry: &'r Registry,
    in_where: bool,
    aggregate_depth: usize,
}

impl<'r> Parser<'r> {
    pub fn new(mut tokens: Vec<Lexeme>, registry: &'r Registry) -> Self {
        if tokens.last().is_none_or(|last| last.token != Token::Eof) {
            let end = tokens.last().map(Lexeme::end).unwrap_or_default();
            tokens.push(Lexeme::new(Token::Eof, "", end));
        }
        Parser {
            tokens,
            index: 0,
            registry,
            in_where: false,
            aggregate_depth: 0,
        }
    }

    fn current(&self) -> &Lexeme {
        &self.tokens[self.index]
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.index + 1)
            .map(|lexeme| &lexeme.token)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Takes the current token, leaving `Eof` in its place, and advances.
    fn take(&mut self) -> Lexeme {
        let placeholder = Lexeme::new(Token::Eof, "", self.current().position);
        let lexeme = mem::replace(&mut self.tokens[self.index], placeholder);
        self.advance();
        lexeme
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current().token) == mem::discriminant(token)
    }

    fn found(&self) -> String {
        self.current().to_string()
    }

    fn position(&self) -> Position {
        self.current().position
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.found(),
            position: self.position(),
        }
    }

    fn expect(&mut self, expected: Token, description: &'static str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(description));
        }
        self.advance();
        Ok(())
    }

    /// Parse a complete query
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        if self.check(&Token::Eof) {
            return Err(ParseError::EmptyQuery);
        }
        if !self.check(&Token::Select) {
            return Err(ParseError::NonSelectQuery {
                found: self.found(),
                position: self.position(),
            });
        }
        self.advance();

        let projections = self.parse_projection_list()?;
        let source = self.parse_source()?;

        let predicate = if self.check(&Token::Where) {
            self.advance();
            self.in_where = true;
            let predicate = self.parse_bool_expression()?;
            self.in_where = false;
            Some(predicate)
        } else {
            None
        };

        let order_by = if self.check(&Token::Order) {
            self.parse_order_by(projections.len())?
        } else {
            Vec::new()
        };

        let limit = if self.check(&Token::Limit) {
            Some(self.parse_limit()?)
        } else {
            None
        };

        self.expect(Token::Eof, "end of query")?;

        Ok(Query {
            projections,
            source,
            predicate,
            order_by,
            limit,
        })
    }

    fn parse_projection_list(&mut self) -> Result<Vec<Projection>, ParseError> {
        let mut projections = Vec::new();

        loop {
            if self.check(&Token::Star) {
                self.advance();
                projections.extend(self.registry.default_columns().map(|def| Projection {
                    expr: Expr::Column(def.attribute),
                    alias: None,
                }));
            } else if self.current().token.starts_expression() {
                let expr = self.parse_bool_expression()?;
                let alias = self.parse_alias()?;
                projections.push(Projection { expr, alias });
            } else {
                return Err(ParseError::ExpectedExpressionInProjection {
                    found: self.found(),
                    position: self.position(),
                });
            }

            match &self.current().token {
                Token::Comma => self.advance(),
                Token::From => return Ok(projections),
                Token::Eof => {
                    return Err(ParseError::MissingSource {
                        position: self.position(),
                    });
                }
                _ => {
                    return Err(ParseError::MissingCommaProjection {
                        found: self.found(),
                        position: self.position(),
                    });
                }
            }
        }
    }

    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        if !self.check(&Token::As) {
            return Ok(None);
        }
        self.advance();

        match self.take() {
            Lexeme {
                token: Token::Identifier(name) | Token::String(name),
                ..
            } => Ok(Some(name)),
            lexeme => Err(ParseError::UnexpectedToken {
                expected: "alias after 'as'",
                found: lexeme.to_string(),
                position: lexeme.position,
            }),
        }
    }

    fn parse_source(&mut self) -> Result<String, ParseError> {
        self.advance(); // consume 'from'

        match &self.current().token {
            Token::Path(path) | Token::String(path) if !path.trim().is_empty() => {
                let path = path.clone();
                self.advance();
                Ok(path)
            }
            _ => Err(ParseError::MissingSource {
                position: self.position(),
            }),
        }
    }

    fn parse_order_by(&mut self, columns: usize) -> Result<Vec<OrderKey>, ParseError> {
        self.advance(); // consume 'order'

        if !self.check(&Token::By) {
            return Err(ParseError::MissingBy {
                found: self.found(),
                position: self.position(),
            });
        }
        self.advance();

        let mut keys = Vec::new();
        loop {
            let index = match self.current().token {
                Token::Integer(n) => n,
                _ => {
                    return Err(ParseError::MissingOrderByColumns {
                        found: self.found(),
                        position: self.position(),
                    });
                }
            };
            if index < 1 || index as usize > columns {
                return Err(ParseError::OrderByIndexOutOfRange {
                    index,
                    columns,
                    position: self.position(),
                });
            }
            self.advance();

            let direction = match self.current().token {
                Token::Asc => {
                    self.advance();
                    Direction::Asc
                }
                Token::Desc => {
                    self.advance();
                    Direction::Desc
                }
                _ => Direction::Asc,
            };
            keys.push(OrderKey {
                column: index as usize,
                direction,
            });

            match self.current().token {
                Token::Comma => self.advance(),
                Token::Integer(_) => {
                    return Err(ParseError::MissingCommaOrderBy {
                        found: self.found(),
                        position: self.position(),
                    });
                }
                _ => return Ok(keys),
            }
        }
    }

    fn parse_limit(&mut self) -> Result<usize, ParseError> {
        self.advance(); // consume 'limit'

        let limit = match self.current().token {
            Token::Eof => {
                return Err(ParseError::LimitValue {
                    position: self.position(),
                });
            }
            Token::Integer(n) if n >= 0 => n as usize,
            _ => {
                return Err(ParseError::LimitValueInt {
                    found: self.found(),
                    position: self.position(),
                });
            }
        };
        self.advance();
        Ok(limit)
    }

    /// `bool_expression := and_expr (OR and_expr)*`
    pub fn parse_bool_expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_expression()?;

        let op = match self.current().token {
            Token::Eq => BinOp::Equal,
            Token::NotEq => BinOp::NotEqual,
            Token::Lt => BinOp::LessThan,
            Token::Gt => BinOp::GreaterThan,
            Token::LtEq => BinOp::LessEqual,
            Token::GtEq => BinOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_expression()?;
        Ok(Expr::binary(op, left, right))
    }

    /// `expression := term (('+' | '-') term)*`
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.current().token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current().token {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if !self.check(&Token::Minus) {
            return self.parse_factor();
        }
        self.advance();

        // Fold negative literals so `-1` stays a literal
        Ok(match self.parse_unary()? {
            Expr::Literal(Value::Integer(n)) => Expr::Literal(Value::Integer(-n)),
            Expr::Literal(Value::Float(n)) => Expr::Literal(Value::Float(-n)),
            operand => Expr::unary(UnaryOp::Negate, operand),
        })
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        match &self.current().token {
            Token::Integer(_)
            | Token::Float(_)
            | Token::String(_)
            | Token::Boolean(_)
            | Token::Null => {
                let literal = match self.take().token {
                    Token::Integer(n) => Value::Integer(n),
                    Token::Float(n) => Value::Float(n),
                    Token::String(s) => Value::String(s),
                    Token::Boolean(b) => Value::Boolean(b),
                    _ => Value::Null,
                };
                Ok(Expr::Literal(literal))
            }
            Token::Identifier(_) => self.parse_identifier(),
            Token::LParen => {
                self.advance();
                let expr = self.parse_bool_expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_identifier(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        let name = match &self.current().token {
            Token::Identifier(name) => name.clone(),
            _ => return Err(self.unexpected("identifier")),
        };

        if *self.peek() == Token::LParen {
            let Some(def) = self.registry.function_by_name(&name) else {
                return Err(ParseError::UnknownIdentifier { name, position });
            };
            let (function, arity) = (def.function, def.arity);

            if self.in_where && !def.has_capability(Capability::Where) {
                return Err(ParseError::NotAllowedInWhere {
                    function: function.name(),
                    position,
                });
            }
            if function.is_aggregate() && self.aggregate_depth > 0 {
                return Err(ParseError::NestedAggregate {
                    function: function.name(),
                    position,
                });
            }

            self.advance(); // function name
            self.advance(); // '('

            if function.is_aggregate() {
                self.aggregate_depth += 1;
            }
            let args = self.parse_arguments(function);
            if function.is_aggregate() {
                self.aggregate_depth -= 1;
            }
            let args = args?;

            if !arity.accepts(args.len()) {
                return Err(ParseError::ArityMismatch {
                    function: function.name(),
                    expected: arity,
                    got: args.len(),
                    position,
                });
            }
            return Ok(Expr::FunctionCall { function, args });
        }

        if let Some(def) = self.registry.attribute_by_name(&name) {
            let attribute = def.attribute;
            self.advance();
            return Ok(Expr::Column(attribute));
        }

        match self.registry.function_by_name(&name) {
            Some(def) => Err(ParseError::OpeningParenthesesProjection {
                function: def.name(),
                position: self.tokens[self.index + 1].position,
            }),
            None => Err(ParseError::UnknownIdentifier { name, position }),
        }
    }

    /// Arguments after the opening parenthesis, up to and including `)`.
    fn parse_arguments(&mut self, function: Function) -> Result<Vec<Expr>, ParseError> {
        // count(*) is count()
        if function == Function::Count && self.check(&Token::Star) && *self.peek() == Token::RParen
        {
            self.advance();
        }

        let mut args = Vec::new();
        if self.check(&Token::RParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            if !self.current().token.starts_expression() {
                return Err(self.unclosed(function));
            }
            args.push(self.parse_bool_expression()?);

            match self.current().token {
                Token::Comma => self.advance(),
                Token::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.unclosed(function)),
            }
        }
    }

    fn unclosed(&self, function: Function) -> ParseError {
        ParseError::ClosingParenthesesProjection {
            function: function.name(),
            found: self.found(),
            position: self.position(),
        }
    }
}
