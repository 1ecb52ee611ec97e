//! Statement parser: recursive descent with Pratt expressions.

use super::error::{ParseError, ParseErrorCode};
use super::pratt::{
    infix_binding_power, prefix_binding_power, token_to_binary_op, token_to_unary_op,
};
use crate::ast::{
    Assignment, ColumnDef, CreateIndexStatement, CreateTableStatement, DataType, DeleteStatement,
    DropIndexStatement, DropTableStatement, Expr, FunctionCall, InSet, InsertStatement, JoinClause,
    JoinType, Literal, OrderBy, SelectItem, SelectStatement, Statement, UpdateStatement,
};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// The most columns a single table may declare.
pub const MAX_COLUMNS: usize = 32;

/// Statement parser over a pre-lexed token vector.
///
/// The cursor index into the vector flows into diagnostics as the
/// `token_index` field.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    /// Creates a parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            source: input,
            tokens: Lexer::new(input).tokenize(),
            pos: 0,
        }
    }

    /// Parses exactly one statement, allowing a trailing semicolon.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the input is not a single valid
    /// statement.
    pub fn parse_statement(&mut self) -> ParseResult<Statement> {
        let statement = self.parse_one()?;
        self.eat(&TokenKind::Semicolon);
        if !self.current().is_eof() {
            return Err(self
                .error(ParseErrorCode::UnexpectedToken, "trailing input after statement")
                .with_expected("end of statement")
                .with_found(&self.current().kind.clone()));
        }
        Ok(statement)
    }

    /// Parses a semicolon-separated script into statements.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] encountered; the statement in
    /// which it occurred and everything after it are abandoned.
    pub fn parse_statements(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.current().is_eof() {
                break;
            }
            statements.push(self.parse_one()?);
            if !self.current().is_eof() && !self.check(&TokenKind::Semicolon) {
                return Err(self
                    .error(ParseErrorCode::MissingToken, "statements must be separated by `;`")
                    .with_expected("`;`")
                    .with_found(&self.current().kind.clone()));
            }
        }
        Ok(statements)
    }

    fn parse_one(&mut self) -> ParseResult<Statement> {
        self.lex_guard()?;
        match self.current().as_keyword() {
            Some(Keyword::Select) => Ok(Statement::Select(self.parse_select()?)),
            Some(Keyword::Insert) => Ok(Statement::Insert(self.parse_insert()?)),
            Some(Keyword::Update) => Ok(Statement::Update(self.parse_update()?)),
            Some(Keyword::Delete) => Ok(Statement::Delete(self.parse_delete()?)),
            Some(Keyword::Create) => self.parse_create(),
            Some(Keyword::Drop) => self.parse_drop(),
            _ => {
                let err = self
                    .error(ParseErrorCode::UnexpectedToken, "expected a statement")
                    .with_expected("SELECT, INSERT, UPDATE, DELETE, CREATE, or DROP")
                    .with_found(&self.current().kind.clone());
                Err(if self.current().is_eof() {
                    self.recode(err, ParseErrorCode::UnexpectedEnd)
                } else {
                    err
                })
            }
        }
    }

    // --- DDL ---

    fn parse_create(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Create)?;
        if self.check_keyword(Keyword::Table) {
            self.advance();
            Ok(Statement::CreateTable(self.parse_create_table_body()?))
        } else if self.check_keyword(Keyword::Index) {
            self.advance();
            Ok(Statement::CreateIndex(self.parse_create_index_body()?))
        } else {
            Err(self
                .error(ParseErrorCode::UnexpectedToken, "CREATE must be followed by TABLE or INDEX")
                .with_expected("TABLE or INDEX")
                .with_found(&self.current().kind.clone()))
        }
    }

    fn parse_drop(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Drop)?;
        if self.check_keyword(Keyword::Table) {
            self.advance();
            let name = self.expect_identifier("table name")?;
            Ok(Statement::DropTable(DropTableStatement { name }))
        } else if self.check_keyword(Keyword::Index) {
            self.advance();
            let name = self.expect_identifier("index name")?;
            Ok(Statement::DropIndex(DropIndexStatement { name }))
        } else {
            Err(self
                .error(ParseErrorCode::UnexpectedToken, "DROP must be followed by TABLE or INDEX")
                .with_expected("TABLE or INDEX")
                .with_found(&self.current().kind.clone()))
        }
    }

    fn parse_create_table_body(&mut self) -> ParseResult<CreateTableStatement> {
        let name = self.expect_identifier("table name")?;
        self.expect(&TokenKind::LeftParen)?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut primary_key = Vec::new();
        let mut checks = Vec::new();

        loop {
            if self.check_keyword(Keyword::Primary) {
                // Table-level PRIMARY KEY (col, ...)
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                self.expect(&TokenKind::LeftParen)?;
                primary_key = self.parse_identifier_list("primary key column")?;
                self.expect(&TokenKind::RightParen)?;
            } else if self.check_keyword(Keyword::Check) {
                // Table-level CHECK (expr)
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                checks.push(self.parse_expression(0)?);
                self.expect(&TokenKind::RightParen)?;
            } else {
                columns.push(self.parse_column_def()?);
                if columns.len() > MAX_COLUMNS {
                    return Err(self
                        .error(
                            ParseErrorCode::TooManyColumns,
                            format!("a table may declare at most {MAX_COLUMNS} columns"),
                        )
                        .with_expected("`)`"));
                }
            }

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightParen)?;

        let strict = if self.check_keyword(Keyword::Strict) {
            self.advance();
            true
        } else {
            false
        };

        if columns.is_empty() {
            return Err(self
                .error(ParseErrorCode::InvalidSyntax, "a table needs at least one column")
                .with_expected("column definition"));
        }

        Ok(CreateTableStatement {
            name,
            columns,
            primary_key,
            checks,
            strict,
        })
    }

    fn parse_column_def(&mut self) -> ParseResult<ColumnDef> {
        let name = self.expect_identifier("column name")?;
        let data_type = self.parse_data_type()?;
        let mut column = ColumnDef::new(name, data_type);

        loop {
            if self.check_keyword(Keyword::Not) {
                self.advance();
                self.expect_keyword(Keyword::Null)?;
                column = column.not_null();
            } else if self.check_keyword(Keyword::Primary) {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                column = column.primary_key();
            } else if self.check_keyword(Keyword::Unique) {
                self.advance();
                column = column.unique();
            } else if self.check_keyword(Keyword::References) {
                self.advance();
                let table = self.expect_identifier("referenced table")?;
                self.expect(&TokenKind::LeftParen)?;
                let ref_column = self.expect_identifier("referenced column")?;
                self.expect(&TokenKind::RightParen)?;
                column = column.references(table, ref_column);
            } else if self.check_keyword(Keyword::Check) {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let expr = self.parse_expression(0)?;
                self.expect(&TokenKind::RightParen)?;
                column = column.check(expr);
            } else {
                break;
            }
        }

        Ok(column)
    }

    fn parse_data_type(&mut self) -> ParseResult<DataType> {
        let data_type = match self.current().as_keyword() {
            Some(Keyword::Int) => DataType::Int,
            Some(Keyword::Float) => DataType::Float,
            Some(Keyword::Boolean) => DataType::Boolean,
            Some(Keyword::String) => DataType::Str,
            Some(Keyword::Blob) => DataType::Blob,
            Some(Keyword::Date) => DataType::Date,
            Some(Keyword::Time) => DataType::Time,
            Some(Keyword::Decimal) => {
                self.advance();
                let (precision, scale) = self.parse_precision_scale()?;
                return Ok(DataType::Decimal { precision, scale });
            }
            _ => {
                return Err(self
                    .error(ParseErrorCode::UnexpectedToken, "expected a data type")
                    .with_expected("INT, FLOAT, BOOLEAN, DECIMAL, STRING, BLOB, DATE, or TIME")
                    .with_found(&self.current().kind.clone()));
            }
        };
        self.advance();
        Ok(data_type)
    }

    fn parse_precision_scale(&mut self) -> ParseResult<(Option<u8>, Option<u8>)> {
        if !self.eat(&TokenKind::LeftParen) {
            return Ok((None, None));
        }

        let precision = self.expect_small_integer("precision")?;
        let scale = if self.eat(&TokenKind::Comma) {
            Some(self.expect_small_integer("scale")?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen)?;
        Ok((Some(precision), scale))
    }

    fn expect_small_integer(&mut self, what: &str) -> ParseResult<u8> {
        match self.current().kind {
            TokenKind::Integer(n) => {
                let value = u8::try_from(n).map_err(|_| {
                    self.error(
                        ParseErrorCode::InvalidNumber,
                        format!("{what} must fit in 0..=255"),
                    )
                })?;
                self.advance();
                Ok(value)
            }
            _ => Err(self
                .error(ParseErrorCode::UnexpectedToken, format!("expected {what}"))
                .with_expected("integer")
                .with_found(&self.current().kind.clone())),
        }
    }

    fn parse_create_index_body(&mut self) -> ParseResult<CreateIndexStatement> {
        let name = self.expect_identifier("index name")?;
        self.expect_keyword(Keyword::On)?;
        let table = self.expect_identifier("table name")?;
        self.expect(&TokenKind::LeftParen)?;
        let columns = self.parse_identifier_list("indexed column")?;
        self.expect(&TokenKind::RightParen)?;
        Ok(CreateIndexStatement {
            name,
            table,
            columns,
        })
    }

    // --- DML ---

    fn parse_insert(&mut self) -> ParseResult<InsertStatement> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier("table name")?;

        let columns = if self.eat(&TokenKind::LeftParen) {
            let cols = self.parse_identifier_list("column name")?;
            self.expect(&TokenKind::RightParen)?;
            cols
        } else {
            Vec::new()
        };

        self.expect_keyword(Keyword::Values)?;

        let mut rows = Vec::new();
        loop {
            self.expect(&TokenKind::LeftParen)?;
            rows.push(self.parse_expression_list()?);
            self.expect(&TokenKind::RightParen)?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(InsertStatement {
            table,
            columns,
            rows,
        })
    }

    fn parse_update(&mut self) -> ParseResult<UpdateStatement> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.expect_identifier("table name")?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier("column name")?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression(0)?;
            assignments.push(Assignment { column, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
        })
    }

    fn parse_delete(&mut self) -> ParseResult<DeleteStatement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_identifier("table name")?;
        let where_clause = self.parse_optional_where()?;
        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    fn parse_optional_where(&mut self) -> ParseResult<Option<Expr>> {
        if self.check_keyword(Keyword::Where) {
            self.advance();
            Ok(Some(self.parse_expression(0)?))
        } else {
            Ok(None)
        }
    }

    // --- SELECT ---

    fn parse_select(&mut self) -> ParseResult<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let items = self.parse_select_items()?;

        self.expect_keyword(Keyword::From)?;
        let from = self.expect_identifier("table name")?;

        let join = self.parse_optional_join()?;
        let where_clause = self.parse_optional_where()?;

        let order_by = if self.check_keyword(Keyword::Order) {
            self.advance();
            self.expect_keyword(Keyword::By)?;
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };

        let limit = if self.check_keyword(Keyword::Limit) {
            self.advance();
            match self.current().kind {
                TokenKind::Integer(n) => match u64::try_from(n) {
                    Ok(limit) => {
                        self.advance();
                        Some(limit)
                    }
                    Err(_) => {
                        return Err(self
                            .error(ParseErrorCode::InvalidNumber, "LIMIT takes a non-negative integer")
                            .with_expected("non-negative integer"));
                    }
                },
                _ => {
                    return Err(self
                        .error(ParseErrorCode::UnexpectedToken, "LIMIT takes a non-negative integer")
                        .with_expected("non-negative integer")
                        .with_found(&self.current().kind.clone()));
                }
            }
        } else {
            None
        };

        Ok(SelectStatement {
            distinct,
            items,
            from,
            join,
            where_clause,
            order_by,
            limit,
        })
    }

    fn parse_select_items(&mut self) -> ParseResult<Vec<SelectItem>> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expression(0)?;

            let alias = if self.check_keyword(Keyword::As) {
                self.advance();
                Some(self.expect_identifier("column alias")?)
            } else if matches!(self.current().kind, TokenKind::Identifier(_)) {
                Some(self.expect_identifier("column alias")?)
            } else {
                None
            };

            items.push(SelectItem { expr, alias });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_optional_join(&mut self) -> ParseResult<Option<JoinClause>> {
        let join_type = if self.check_keyword(Keyword::Join) {
            self.advance();
            JoinType::Inner
        } else if self.check_keyword(Keyword::Inner) {
            self.advance();
            self.expect_keyword(Keyword::Join)?;
            JoinType::Inner
        } else if self.check_keyword(Keyword::Left) {
            self.advance();
            self.expect_keyword(Keyword::Join)?;
            JoinType::Left
        } else {
            return Ok(None);
        };

        let table = self.expect_identifier("joined table name")?;
        self.expect_keyword(Keyword::On)?;
        let on = self.parse_expression(0)?;

        Ok(Some(JoinClause {
            join_type,
            table,
            on,
        }))
    }

    fn parse_order_by_list(&mut self) -> ParseResult<Vec<OrderBy>> {
        let mut keys = Vec::new();
        loop {
            let expr = self.parse_expression(0)?;
            let descending = if self.check_keyword(Keyword::Desc) {
                self.advance();
                true
            } else {
                // ASC is the default and may be spelled out.
                if self.check_keyword(Keyword::Asc) {
                    self.advance();
                }
                false
            };
            keys.push(OrderBy { expr, descending });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(keys)
    }

    // --- Expressions ---

    /// Pratt expression loop.
    fn parse_expression(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((l_bp, r_bp)) = infix_binding_power(&self.current().kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            match self.current().as_keyword() {
                Some(Keyword::Is) => {
                    self.advance();
                    let negated = if self.check_keyword(Keyword::Not) {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    self.expect_keyword(Keyword::Null)?;
                    lhs = Expr::IsNull {
                        expr: Box::new(lhs),
                        negated,
                    };
                }
                Some(Keyword::In) => {
                    self.advance();
                    lhs = self.parse_in_rest(lhs, false)?;
                }
                Some(Keyword::Like) => {
                    self.advance();
                    let pattern = self.parse_expression(r_bp)?;
                    lhs = Expr::Like {
                        expr: Box::new(lhs),
                        pattern: Box::new(pattern),
                        negated: false,
                    };
                }
                Some(Keyword::Not) => {
                    // Infix NOT introduces only NOT IN / NOT LIKE.
                    self.advance();
                    if self.check_keyword(Keyword::In) {
                        self.advance();
                        lhs = self.parse_in_rest(lhs, true)?;
                    } else if self.check_keyword(Keyword::Like) {
                        self.advance();
                        let pattern = self.parse_expression(r_bp)?;
                        lhs = Expr::Like {
                            expr: Box::new(lhs),
                            pattern: Box::new(pattern),
                            negated: true,
                        };
                    } else {
                        return Err(self
                            .error(ParseErrorCode::UnexpectedToken, "expected IN or LIKE after NOT")
                            .with_expected("IN or LIKE")
                            .with_found(&self.current().kind.clone()));
                    }
                }
                _ => {
                    if let Some(op) = token_to_binary_op(&self.current().kind) {
                        self.advance();
                        let rhs = self.parse_expression(r_bp)?;
                        lhs = Expr::Binary {
                            left: Box::new(lhs),
                            op,
                            right: Box::new(rhs),
                        };
                    } else {
                        break;
                    }
                }
            }
        }

        Ok(lhs)
    }

    fn parse_in_rest(&mut self, lhs: Expr, negated: bool) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let set = if self.check_keyword(Keyword::Select) {
            InSet::Subquery(Box::new(self.parse_select()?))
        } else {
            InSet::List(self.parse_expression_list()?)
        };
        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::In {
            expr: Box::new(lhs),
            set,
            negated,
        })
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        if let Some(op) = token_to_unary_op(&self.current().kind) {
            // EXISTS and NOT EXISTS read better handled at the primary
            // level; everything else is a plain unary node.
            let bp = prefix_binding_power(&self.current().kind).unwrap_or(13);
            self.advance();
            let operand = self.parse_expression(bp)?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        self.lex_guard()?;
        let token = self.current().clone();

        match &token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(*n)))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(*x)))
            }
            TokenKind::Str(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expr::Literal(Literal::Str(value)))
            }
            TokenKind::Blob(bytes) => {
                let value = bytes.clone();
                self.advance();
                Ok(Expr::Literal(Literal::Blob(value)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }

            TokenKind::Star => {
                self.advance();
                Ok(Expr::Wildcard { table: None })
            }

            TokenKind::LeftParen => {
                self.advance();
                if self.check_keyword(Keyword::Select) {
                    let subquery = self.parse_select()?;
                    self.expect(&TokenKind::RightParen)?;
                    Ok(Expr::Subquery(Box::new(subquery)))
                } else {
                    let expr = self.parse_expression(0)?;
                    self.expect(&TokenKind::RightParen)?;
                    Ok(expr)
                }
            }

            TokenKind::Keyword(Keyword::Exists) => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                let subquery = self.parse_select()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(Expr::Exists(Box::new(subquery)))
            }

            TokenKind::Keyword(Keyword::Case) => self.parse_case(),

            // Keywords that act as function names: aggregates,
            // COALESCE/NULLIF, the TIME/DATE constructors, and LEFT
            // (which doubles as the join keyword).
            TokenKind::Keyword(kw) if self.keyword_is_function_name(*kw) => {
                let name = kw.as_str().to_string();
                self.advance();
                self.parse_function_call(name)
            }

            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = token.span;
                self.advance();

                if self.check(&TokenKind::LeftParen) {
                    return self.parse_function_call(name.to_ascii_uppercase());
                }

                if self.eat(&TokenKind::Dot) {
                    if self.eat(&TokenKind::Star) {
                        return Ok(Expr::Wildcard { table: Some(name) });
                    }
                    let column = self.expect_identifier("column name")?;
                    return Ok(Expr::Column {
                        table: Some(name),
                        name: column,
                        span,
                    });
                }

                Ok(Expr::Column {
                    table: None,
                    name,
                    span,
                })
            }

            TokenKind::Eof => Err(self
                .error(ParseErrorCode::UnexpectedEnd, "input ended where an expression was expected")
                .with_expected("expression")),

            _ => Err(self
                .error(ParseErrorCode::UnexpectedToken, "expected an expression")
                .with_expected("expression")
                .with_found(&token.kind)),
        }
    }

    /// Keywords that may begin a function call.
    fn keyword_is_function_name(&self, kw: Keyword) -> bool {
        let callable = kw.is_aggregate()
            || matches!(
                kw,
                Keyword::Coalesce | Keyword::Nullif | Keyword::Time | Keyword::Date | Keyword::Left
            );
        callable && matches!(self.peek_kind(), Some(TokenKind::LeftParen))
    }

    fn parse_function_call(&mut self, name: String) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;

        let distinct = if self.check_keyword(Keyword::Distinct) {
            self.advance();
            true
        } else {
            false
        };

        let mut star = false;
        let args = if self.check(&TokenKind::RightParen) {
            Vec::new()
        } else if self.check(&TokenKind::Star) {
            self.advance();
            star = true;
            Vec::new()
        } else {
            self.parse_expression_list()?
        };

        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            distinct,
            star,
        }))
    }

    fn parse_case(&mut self) -> ParseResult<Expr> {
        self.expect_keyword(Keyword::Case)?;

        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };

        let mut when_clauses = Vec::new();
        while self.check_keyword(Keyword::When) {
            self.advance();
            let when = self.parse_expression(0)?;
            self.expect_keyword(Keyword::Then)?;
            let then = self.parse_expression(0)?;
            when_clauses.push((when, then));
        }

        if when_clauses.is_empty() {
            return Err(self
                .error(ParseErrorCode::InvalidSyntax, "CASE needs at least one WHEN clause")
                .with_expected("WHEN")
                .with_found(&self.current().kind.clone()));
        }

        let else_clause = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.parse_expression(0)?))
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    fn parse_expression_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expression(0)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    fn parse_identifier_list(&mut self, what: &str) -> ParseResult<Vec<String>> {
        let mut idents = Vec::new();
        loop {
            idents.push(self.expect_identifier(what)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(idents)
    }

    // --- Cursor helpers ---

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        core::mem::discriminant(&self.current().kind) == core::mem::discriminant(kind)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().as_keyword() == Some(keyword)
    }

    /// Consumes the current token if it matches.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        self.lex_guard()?;
        if self.eat(kind) {
            Ok(())
        } else {
            let code = if self.current().is_eof() {
                ParseErrorCode::UnexpectedEnd
            } else {
                ParseErrorCode::MissingToken
            };
            Err(self
                .error(code, format!("expected {}", kind.describe()))
                .with_expected(kind.describe())
                .with_found(&self.current().kind.clone()))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<()> {
        self.lex_guard()?;
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            let code = if self.current().is_eof() {
                ParseErrorCode::UnexpectedEnd
            } else {
                ParseErrorCode::MissingToken
            };
            Err(self
                .error(code, format!("expected keyword {}", keyword.as_str()))
                .with_expected(keyword.as_str())
                .with_found(&self.current().kind.clone()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> ParseResult<String> {
        self.lex_guard()?;
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            TokenKind::Eof => Err(self
                .error(ParseErrorCode::UnexpectedEnd, format!("input ended where a {what} was expected"))
                .with_expected(what.to_string())),
            TokenKind::Keyword(kw) => Err(self
                .error(
                    ParseErrorCode::UnexpectedToken,
                    format!("{} cannot be used as a {what}", kw.as_str()),
                )
                .with_expected(what.to_string())
                .with_found(&self.current().kind.clone())
                .with_suggestion("keywords must not be used as identifiers")),
            _ => Err(self
                .error(ParseErrorCode::UnexpectedToken, format!("expected a {what}"))
                .with_expected(what.to_string())
                .with_found(&self.current().kind.clone())),
        }
    }

    /// Converts a lexer error token under the cursor into a diagnostic.
    fn lex_guard(&self) -> ParseResult<()> {
        if let TokenKind::Error(kind) = self.current().kind {
            return Err(self.error(ParseError::code_for_lex_error(kind), kind.message()));
        }
        Ok(())
    }

    fn error(&self, code: ParseErrorCode, message: impl Into<String>) -> ParseError {
        ParseError::new(code, message, self.source, self.current_span(), self.pos)
    }

    fn recode(&self, mut err: ParseError, code: ParseErrorCode) -> ParseError {
        err.code = code;
        err
    }

    fn current_span(&self) -> Span {
        self.current().span
    }
}
