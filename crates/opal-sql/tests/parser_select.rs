//! SELECT clause coverage.

mod common;
use common::*;

use opal_sql::ast::{BinaryOp, Expr, JoinType, Literal};

#[test]
fn select_star() {
    let select = parse_select("SELECT * FROM users");
    assert_eq!(select.items.len(), 1);
    assert!(matches!(select.items[0].expr, Expr::Wildcard { table: None }));
    assert_eq!(select.from, "users");
}

#[test]
fn select_qualified_star() {
    let select = parse_select("SELECT users.* FROM users");
    assert!(
        matches!(&select.items[0].expr, Expr::Wildcard { table: Some(t) } if t == "users")
    );
}

#[test]
fn select_columns_and_aliases() {
    let select = parse_select("SELECT id, name AS n, age a FROM users");
    assert_eq!(select.items.len(), 3);
    assert_eq!(select.items[0].alias, None);
    assert_eq!(select.items[1].alias.as_deref(), Some("n"));
    assert_eq!(select.items[2].alias.as_deref(), Some("a"));
}

#[test]
fn select_qualified_column() {
    let select = parse_select("SELECT users.name FROM users");
    assert!(matches!(
        &select.items[0].expr,
        Expr::Column { table: Some(t), name, .. } if t == "users" && name == "name"
    ));
}

#[test]
fn select_distinct() {
    assert!(parse_select("SELECT DISTINCT city FROM users").distinct);
    assert!(!parse_select("SELECT city FROM users").distinct);
}

#[test]
fn select_where() {
    let select = parse_select("SELECT * FROM t WHERE a = 1 AND b != 2");
    let Some(Expr::Binary { op, .. }) = select.where_clause else {
        panic!("expected binary where");
    };
    assert_eq!(op, BinaryOp::And);
}

#[test]
fn select_order_by_directions() {
    let select = parse_select("SELECT * FROM t ORDER BY a, b DESC, c ASC");
    assert_eq!(select.order_by.len(), 3);
    assert!(!select.order_by[0].descending);
    assert!(select.order_by[1].descending);
    assert!(!select.order_by[2].descending);
}

#[test]
fn select_limit() {
    assert_eq!(parse_select("SELECT * FROM t LIMIT 10").limit, Some(10));
    assert_eq!(parse_select("SELECT * FROM t LIMIT 0").limit, Some(0));
    assert_eq!(parse_select("SELECT * FROM t").limit, None);
}

#[test]
fn select_inner_join() {
    let select = parse_select("SELECT * FROM a INNER JOIN b ON a.x = b.y");
    let join = select.join.unwrap();
    assert_eq!(join.join_type, JoinType::Inner);
    assert_eq!(join.table, "b");
}

#[test]
fn select_bare_join_is_inner() {
    let select = parse_select("SELECT * FROM a JOIN b ON a.x = b.y");
    assert_eq!(select.join.unwrap().join_type, JoinType::Inner);
}

#[test]
fn select_left_join() {
    let select = parse_select("SELECT * FROM a LEFT JOIN b ON a.x = b.y");
    assert_eq!(select.join.unwrap().join_type, JoinType::Left);
}

#[test]
fn select_all_clauses_in_order() {
    let select = parse_select(
        "SELECT DISTINCT a, b FROM t LEFT JOIN u ON t.id = u.id \
         WHERE a > 0 ORDER BY b DESC LIMIT 3",
    );
    assert!(select.distinct);
    assert!(select.join.is_some());
    assert!(select.where_clause.is_some());
    assert_eq!(select.order_by.len(), 1);
    assert_eq!(select.limit, Some(3));
}

#[test]
fn select_literal_projection() {
    let select = parse_select("SELECT 1, 'x' FROM t");
    assert!(matches!(
        select.items[0].expr,
        Expr::Literal(Literal::Integer(1))
    ));
}
