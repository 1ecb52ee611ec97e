#![allow(dead_code)]

use opal_sql::ast::{
    CreateTableStatement, DeleteStatement, InsertStatement, SelectStatement, Statement,
    UpdateStatement,
};
use opal_sql::{ParseError, Parser};

pub fn parse(sql: &str) -> Statement {
    Parser::new(sql)
        .parse_statement()
        .unwrap_or_else(|e| panic!("failed to parse: {sql}\nerror: {e:?}"))
}

pub fn parse_err(sql: &str) -> ParseError {
    Parser::new(sql)
        .parse_statement()
        .expect_err(&format!("expected parse error for: {sql}"))
}

pub fn parse_select(sql: &str) -> SelectStatement {
    match parse(sql) {
        Statement::Select(s) => s,
        other => panic!("expected SELECT, got {other:?}"),
    }
}

pub fn parse_insert(sql: &str) -> InsertStatement {
    match parse(sql) {
        Statement::Insert(i) => i,
        other => panic!("expected INSERT, got {other:?}"),
    }
}

pub fn parse_update(sql: &str) -> UpdateStatement {
    match parse(sql) {
        Statement::Update(u) => u,
        other => panic!("expected UPDATE, got {other:?}"),
    }
}

pub fn parse_delete(sql: &str) -> DeleteStatement {
    match parse(sql) {
        Statement::Delete(d) => d,
        other => panic!("expected DELETE, got {other:?}"),
    }
}

pub fn parse_create_table(sql: &str) -> CreateTableStatement {
    match parse(sql) {
        Statement::CreateTable(c) => c,
        other => panic!("expected CREATE TABLE, got {other:?}"),
    }
}
