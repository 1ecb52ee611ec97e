//! INSERT / UPDATE / DELETE coverage.

mod common;
use common::*;

use opal_sql::ast::{Expr, Literal};

#[test]
fn insert_positional() {
    let insert = parse_insert("INSERT INTO t VALUES (1, 'a', NULL)");
    assert_eq!(insert.table, "t");
    assert!(insert.columns.is_empty());
    assert_eq!(insert.rows.len(), 1);
    assert_eq!(insert.rows[0].len(), 3);
    assert!(matches!(insert.rows[0][2], Expr::Literal(Literal::Null)));
}

#[test]
fn insert_with_column_list() {
    let insert = parse_insert("INSERT INTO t (b, a) VALUES (1, 2)");
    assert_eq!(insert.columns, vec!["b", "a"]);
}

#[test]
fn insert_multiple_tuples() {
    let insert = parse_insert("INSERT INTO t VALUES (1), (2), (3)");
    assert_eq!(insert.rows.len(), 3);
}

#[test]
fn insert_expression_values() {
    let insert = parse_insert("INSERT INTO t VALUES (1 + 2, UPPER('x'))");
    assert!(matches!(insert.rows[0][0], Expr::Binary { .. }));
    assert!(matches!(insert.rows[0][1], Expr::Function(_)));
}

#[test]
fn insert_negative_numbers() {
    let insert = parse_insert("INSERT INTO t VALUES (-5, -2.5)");
    assert!(matches!(insert.rows[0][0], Expr::Unary { .. }));
}

#[test]
fn update_single_assignment() {
    let update = parse_update("UPDATE t SET a = 1");
    assert_eq!(update.assignments.len(), 1);
    assert_eq!(update.assignments[0].column, "a");
    assert!(update.where_clause.is_none());
}

#[test]
fn update_references_old_row() {
    let update = parse_update("UPDATE t SET a = a + 1 WHERE a < 10");
    assert!(matches!(update.assignments[0].value, Expr::Binary { .. }));
    assert!(update.where_clause.is_some());
}

#[test]
fn update_multiple_assignments() {
    let update = parse_update("UPDATE t SET a = 1, b = 'x', c = NULL WHERE id = 7");
    assert_eq!(update.assignments.len(), 3);
}

#[test]
fn delete_with_where() {
    let delete = parse_delete("DELETE FROM t WHERE a = 1");
    assert_eq!(delete.table, "t");
    assert!(delete.where_clause.is_some());
}

#[test]
fn delete_all_rows() {
    assert!(parse_delete("DELETE FROM t").where_clause.is_none());
}
