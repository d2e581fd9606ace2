use crate::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of query")]
    UnexpectedEof,
    #[error("Invalid date literal '{literal}' at {span:?}")]
    InvalidDateLiteral { literal: String, span: Span },
    #[error("Invalid number at {0:?}")]
    InvalidNumber(Span),
}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    /// Parse a complete query; trailing tokens are an error
    pub fn parse(&mut self) -> ParseResult<SoqlQuery> {
        let query = self.parse_soql_query()?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of query"));
        }
        Ok(query)
    }

    // ==================== Helper Methods ====================

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_span(&self) -> Span {
        self.current.span
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.is_at_end() {
            return ParseError::UnexpectedEof;
        }
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current.kind.to_string(),
            span: self.current.span,
        }
    }

    // ==================== Query ====================

    fn parse_soql_query(&mut self) -> ParseResult<SoqlQuery> {
        let start = self.current_span();
        self.consume(&TokenKind::Select, "SELECT")?;

        let select_clause = self.parse_select_fields()?;

        self.consume(&TokenKind::From, "FROM")?;
        let from_clause = self.parse_soql_identifier()?;

        let where_clause = if self.match_token(&TokenKind::Where) {
            Some(self.parse_soql_condition()?)
        } else {
            None
        };

        let order_by_clause = if self.match_token(&TokenKind::Order) {
            self.consume(&TokenKind::By, "BY")?;
            self.parse_order_by_fields()?
        } else {
            Vec::new()
        };

        let limit_clause = if self.match_token(&TokenKind::Limit) {
            Some(self.parse_row_count()?)
        } else {
            None
        };

        let offset_clause = if self.match_token(&TokenKind::Offset) {
            Some(self.parse_row_count()?)
        } else {
            None
        };

        Ok(SoqlQuery {
            select_clause,
            from_clause,
            where_clause,
            order_by_clause,
            limit_clause,
            offset_clause,
            span: start.merge(self.current_span()),
        })
    }

    fn parse_select_fields(&mut self) -> ParseResult<Vec<SelectField>> {
        let mut fields = Vec::new();

        loop {
            let path = self.parse_soql_field_path()?;

            if path.eq_ignore_ascii_case("count") && self.match_token(&TokenKind::LParen) {
                let field = if self.check(&TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_soql_field_path()?)
                };
                self.consume(&TokenKind::RParen, ")")?;
                // Optional alias: COUNT(Id) total
                let alias = if let TokenKind::Identifier(name) = &self.current.kind {
                    let name = name.clone();
                    self.advance();
                    Some(name)
                } else {
                    None
                };
                fields.push(SelectField::Count { field, alias });
            } else {
                fields.push(SelectField::Field(path));
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(fields)
    }

    /// Parse a field path like "Name" or "Account.Name"
    fn parse_soql_field_path(&mut self) -> ParseResult<String> {
        let mut path = self.parse_soql_identifier()?;

        while self.match_token(&TokenKind::Dot) {
            let next = self.parse_soql_identifier()?;
            path.push('.');
            path.push_str(&next);
        }

        Ok(path)
    }

    /// Parse an identifier, allowing keywords that double as field names
    fn parse_soql_identifier(&mut self) -> ParseResult<String> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::First => "First".to_string(),
            TokenKind::Last => "Last".to_string(),
            _ => return Err(self.unexpected("identifier")),
        };
        self.advance();
        Ok(name)
    }

    // ==================== Conditions ====================

    fn parse_soql_condition(&mut self) -> ParseResult<Condition> {
        self.parse_soql_or_condition()
    }

    fn parse_soql_or_condition(&mut self) -> ParseResult<Condition> {
        let mut left = self.parse_soql_and_condition()?;

        while self.match_token(&TokenKind::Or) {
            let right = self.parse_soql_and_condition()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_soql_and_condition(&mut self) -> ParseResult<Condition> {
        let mut left = self.parse_soql_not_condition()?;

        while self.match_token(&TokenKind::And) {
            let right = self.parse_soql_not_condition()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_soql_not_condition(&mut self) -> ParseResult<Condition> {
        if self.match_token(&TokenKind::Not) {
            let inner = self.parse_soql_not_condition()?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_soql_comparison()
    }

    fn parse_soql_comparison(&mut self) -> ParseResult<Condition> {
        if self.match_token(&TokenKind::LParen) {
            let inner = self.parse_soql_condition()?;
            self.consume(&TokenKind::RParen, ")")?;
            return Ok(inner);
        }

        let field = self.parse_soql_field_path()?;

        if self.match_token(&TokenKind::In) {
            let values = self.parse_in_values()?;
            return Ok(Condition::In {
                field,
                negated: false,
                values,
            });
        }

        if self.match_token(&TokenKind::Not) {
            self.consume(&TokenKind::In, "IN")?;
            let values = self.parse_in_values()?;
            return Ok(Condition::In {
                field,
                negated: true,
                values,
            });
        }

        let operator = match self.current.kind {
            TokenKind::Eq => ComparisonOp::Equal,
            TokenKind::NotEq | TokenKind::LtGt => ComparisonOp::NotEqual,
            TokenKind::Lt => ComparisonOp::LessThan,
            TokenKind::Gt => ComparisonOp::GreaterThan,
            TokenKind::LtEq => ComparisonOp::LessOrEqual,
            TokenKind::GtEq => ComparisonOp::GreaterOrEqual,
            TokenKind::Like => ComparisonOp::Like,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();

        let value = self.parse_soql_operand()?;
        Ok(Condition::Comparison {
            field,
            operator,
            value,
        })
    }

    /// `IN :bind` or `IN (v1, v2, ...)`
    fn parse_in_values(&mut self) -> ParseResult<InValues> {
        if self.match_token(&TokenKind::Colon) {
            let name = self.parse_soql_identifier()?;
            return Ok(InValues::Bind(name));
        }

        self.consume(&TokenKind::LParen, "(")?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_soql_operand()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RParen, ")")?;
        Ok(InValues::List(values))
    }

    /// Parse a value: literal, bind variable, or date literal
    fn parse_soql_operand(&mut self) -> ParseResult<Operand> {
        let start = self.current_span();

        if self.match_token(&TokenKind::Colon) {
            let name = self.parse_soql_identifier()?;
            return Ok(Operand::Bind(name));
        }

        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                self.parse_date_literal(name, start)
            }
            TokenKind::Minus => {
                self.advance();
                match self.current.kind {
                    TokenKind::IntegerLiteral(n) => {
                        self.advance();
                        Ok(Operand::Integer(-n))
                    }
                    TokenKind::DoubleLiteral(n) => {
                        self.advance();
                        Ok(Operand::Double(-n))
                    }
                    _ => Err(ParseError::InvalidNumber(start.merge(self.current_span()))),
                }
            }
            TokenKind::IntegerLiteral(n) => {
                let n = *n;
                self.advance();
                Ok(Operand::Integer(n))
            }
            TokenKind::DoubleLiteral(n) => {
                let n = *n;
                self.advance();
                Ok(Operand::Double(n))
            }
            TokenKind::StringLiteral(s) => {
                let s = s.clone();
                self.advance();
                Ok(Operand::String(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Operand::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Operand::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Operand::Null)
            }
            _ => Err(self.unexpected("value")),
        }
    }

    fn parse_date_literal(&mut self, name: String, start: Span) -> ParseResult<Operand> {
        if DateLiteral::takes_count(&name) {
            self.consume(&TokenKind::Colon, ":")?;
            let n = match self.current.kind {
                TokenKind::IntegerLiteral(n) => u32::try_from(n)
                    .map_err(|_| ParseError::InvalidNumber(self.current_span()))?,
                _ => return Err(self.unexpected("integer")),
            };
            self.advance();
            return DateLiteral::with_count(&name, n)
                .map(Operand::Date)
                .ok_or_else(|| ParseError::InvalidDateLiteral {
                    literal: name,
                    span: start,
                });
        }

        DateLiteral::simple(&name)
            .map(Operand::Date)
            .ok_or(ParseError::InvalidDateLiteral {
                literal: name,
                span: start,
            })
    }

    // ==================== ORDER BY / LIMIT ====================

    fn parse_order_by_fields(&mut self) -> ParseResult<Vec<OrderByField>> {
        let mut fields = Vec::new();

        loop {
            let field = self.parse_soql_field_path()?;
            let ascending = if self.match_token(&TokenKind::Desc) {
                false
            } else {
                self.match_token(&TokenKind::Asc);
                true
            };

            let nulls_first = if self.match_token(&TokenKind::Nulls) {
                if self.match_token(&TokenKind::First) {
                    Some(true)
                } else {
                    self.consume(&TokenKind::Last, "FIRST or LAST")?;
                    Some(false)
                }
            } else {
                None
            };

            fields.push(OrderByField {
                field,
                ascending,
                nulls_first,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(fields)
    }

    /// LIMIT / OFFSET accept an integer or a bind variable
    fn parse_row_count(&mut self) -> ParseResult<Operand> {
        match self.current.kind {
            TokenKind::IntegerLiteral(n) => {
                self.advance();
                Ok(Operand::Integer(n))
            }
            TokenKind::Colon => {
                self.advance();
                let name = self.parse_soql_identifier()?;
                Ok(Operand::Bind(name))
            }
            _ => Err(self.unexpected("integer or bind variable")),
        }
    }
}

/// Parse SOQL text into a query
pub fn parse(source: &str) -> ParseResult<SoqlQuery> {
    let mut parser = Parser::new(source);
    parser.parse()
}
