//! CREATE / DROP TABLE and INDEX coverage.

mod common;
use common::*;

use opal_sql::ast::{DataType, Statement};
use opal_sql::parser::MAX_COLUMNS;
use opal_sql::ParseErrorCode;

#[test]
fn create_table_types() {
    let create = parse_create_table(
        "CREATE TABLE all_types (i INT, f FLOAT, b BOOLEAN, d DECIMAL(10, 2), \
         s STRING, bl BLOB, dt DATE, tm TIME)",
    );
    assert_eq!(create.columns.len(), 8);
    assert_eq!(create.columns[0].data_type, DataType::Int);
    assert_eq!(
        create.columns[3].data_type,
        DataType::Decimal {
            precision: Some(10),
            scale: Some(2)
        }
    );
    assert_eq!(create.columns[4].data_type, DataType::Str);
    assert!(!create.strict);
}

#[test]
fn create_table_type_aliases() {
    let create = parse_create_table("CREATE TABLE t (a INTEGER, b TEXT, c DOUBLE)");
    assert_eq!(create.columns[0].data_type, DataType::Int);
    assert_eq!(create.columns[1].data_type, DataType::Str);
    assert_eq!(create.columns[2].data_type, DataType::Float);
}

#[test]
fn create_table_column_constraints() {
    let create = parse_create_table(
        "CREATE TABLE t (id INT PRIMARY KEY, email STRING UNIQUE NOT NULL, \
         age INT CHECK (age >= 0))",
    );
    assert!(create.columns[0].primary_key);
    assert!(!create.columns[0].nullable);
    assert!(create.columns[1].unique);
    assert!(!create.columns[1].nullable);
    assert!(create.columns[2].check.is_some());
}

#[test]
fn create_table_foreign_key() {
    let create =
        parse_create_table("CREATE TABLE prods (pid INT, cid INT REFERENCES cats(cid))");
    let fk = create.columns[1].references.as_ref().unwrap();
    assert_eq!(fk.table, "cats");
    assert_eq!(fk.column, "cid");
}

#[test]
fn create_table_table_level_clauses() {
    let create = parse_create_table(
        "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a), CHECK (b > a))",
    );
    assert_eq!(create.primary_key, vec!["a"]);
    assert_eq!(create.checks.len(), 1);
}

#[test]
fn create_table_strict() {
    assert!(parse_create_table("CREATE TABLE t (a INT) STRICT").strict);
}

#[test]
fn create_table_column_cap() {
    let columns = (0..=MAX_COLUMNS)
        .map(|i| format!("c{i} INT"))
        .collect::<Vec<_>>()
        .join(", ");
    let err = parse_err(&format!("CREATE TABLE wide ({columns})"));
    assert_eq!(err.code, ParseErrorCode::TooManyColumns);
}

#[test]
fn drop_table() {
    let Statement::DropTable(drop) = parse("DROP TABLE t") else {
        panic!("expected DROP TABLE");
    };
    assert_eq!(drop.name, "t");
}

#[test]
fn create_index() {
    let Statement::CreateIndex(create) = parse("CREATE INDEX idx_age ON users (age)") else {
        panic!("expected CREATE INDEX");
    };
    assert_eq!(create.name, "idx_age");
    assert_eq!(create.table, "users");
    assert_eq!(create.columns, vec!["age"]);
}

#[test]
fn drop_index() {
    let Statement::DropIndex(drop) = parse("DROP INDEX idx_age") else {
        panic!("expected DROP INDEX");
    };
    assert_eq!(drop.name, "idx_age");
}
