//! Constraint enforcement: NOT NULL, UNIQUE / PRIMARY KEY, FOREIGN
//! KEY, CHECK.

mod common;
use common::*;

use opal_engine::{EngineError, Value};

#[test]
fn not_null_rejects_null_and_missing_values() {
    let mut db = setup("CREATE TABLE t (a INT NOT NULL, b INT)");
    assert!(matches!(
        db.execute("INSERT INTO t VALUES (NULL, 1)"),
        Err(EngineError::Constraint(_))
    ));
    // A missing column defaults to NULL, which NOT NULL rejects too.
    assert!(matches!(
        db.execute("INSERT INTO t (b) VALUES (1)"),
        Err(EngineError::Constraint(_))
    ));
    assert_eq!(db.table("t").unwrap().row_count(), 0);
}

#[test]
fn unique_allows_multiple_nulls() {
    let mut db = setup(
        "CREATE TABLE t (u INT UNIQUE);
         INSERT INTO t VALUES (1), (NULL), (NULL);",
    );
    assert_eq!(db.table("t").unwrap().row_count(), 3);
    assert!(matches!(
        db.execute("INSERT INTO t VALUES (1)"),
        Err(EngineError::Constraint(_))
    ));
}

#[test]
fn no_two_live_rows_share_a_primary_key() {
    let mut db = setup(
        "CREATE TABLE t (id INT PRIMARY KEY);
         INSERT INTO t VALUES (1), (2);",
    );
    assert!(db.execute("INSERT INTO t VALUES (2)").is_err());
    // Deleting frees the value for reuse.
    db.execute("DELETE FROM t WHERE id = 2").unwrap();
    db.execute("INSERT INTO t VALUES (2)").unwrap();
    assert_eq!(int_column(&mut db, "SELECT id FROM t"), vec![1, 2]);
}

#[test]
fn primary_key_implies_not_null() {
    let mut db = setup("CREATE TABLE t (id INT PRIMARY KEY)");
    assert!(matches!(
        db.execute("INSERT INTO t VALUES (NULL)"),
        Err(EngineError::Constraint(_))
    ));
}

#[test]
fn unique_applies_to_updates() {
    let mut db = setup(
        "CREATE TABLE t (id INT, u INT UNIQUE);
         INSERT INTO t VALUES (1, 10), (2, 20);",
    );
    assert!(matches!(
        db.execute("UPDATE t SET u = 10 WHERE id = 2"),
        Err(EngineError::Constraint(_))
    ));
    // A row may keep its own unique value.
    db.execute("UPDATE t SET u = 20 WHERE id = 2").unwrap();
}

#[test]
fn foreign_key_enforced_with_null_exempt() {
    let mut db = setup(
        "CREATE TABLE cats (cid INT PRIMARY KEY, n STRING);
         INSERT INTO cats VALUES (1, 'E');
         CREATE TABLE prods (pid INT, cid INT REFERENCES cats(cid));",
    );
    db.execute("INSERT INTO prods VALUES (10, 1)").unwrap();
    assert!(matches!(
        db.execute("INSERT INTO prods VALUES (11, 999)"),
        Err(EngineError::Constraint(_))
    ));
    // NULL foreign keys are always accepted.
    db.execute("INSERT INTO prods VALUES (12, NULL)").unwrap();
    assert_eq!(db.table("prods").unwrap().row_count(), 2);
}

#[test]
fn foreign_key_applies_to_updates() {
    let mut db = setup(
        "CREATE TABLE cats (cid INT PRIMARY KEY);
         INSERT INTO cats VALUES (1), (2);
         CREATE TABLE prods (pid INT, cid INT REFERENCES cats(cid));
         INSERT INTO prods VALUES (10, 1);",
    );
    db.execute("UPDATE prods SET cid = 2").unwrap();
    assert!(matches!(
        db.execute("UPDATE prods SET cid = 999"),
        Err(EngineError::Constraint(_))
    ));
    assert_eq!(int_column(&mut db, "SELECT cid FROM prods"), vec![2]);
}

#[test]
fn column_check_constraint() {
    let mut db = setup("CREATE TABLE t (age INT CHECK (age >= 0))");
    db.execute("INSERT INTO t VALUES (30)").unwrap();
    assert!(matches!(
        db.execute("INSERT INTO t VALUES (-1)"),
        Err(EngineError::Constraint(_))
    ));
    // A NULL makes the CHECK unknown, which does not reject.
    db.execute("INSERT INTO t VALUES (NULL)").unwrap();
    assert_eq!(db.table("t").unwrap().row_count(), 2);
}

#[test]
fn table_level_check_sees_the_whole_row() {
    let mut db = setup("CREATE TABLE span (lo INT, hi INT, CHECK (lo <= hi))");
    db.execute("INSERT INTO span VALUES (1, 5)").unwrap();
    assert!(matches!(
        db.execute("INSERT INTO span VALUES (9, 2)"),
        Err(EngineError::Constraint(_))
    ));
}

#[test]
fn check_applies_to_updates() {
    let mut db = setup(
        "CREATE TABLE t (age INT CHECK (age >= 0));
         INSERT INTO t VALUES (5);",
    );
    assert!(matches!(
        db.execute("UPDATE t SET age = -3"),
        Err(EngineError::Constraint(_))
    ));
    assert_eq!(int_column(&mut db, "SELECT age FROM t"), vec![5]);
}

#[test]
fn constraint_failures_do_not_corrupt_the_catalog() {
    let mut db = setup(
        "CREATE TABLE t (id INT PRIMARY KEY, v INT);
         INSERT INTO t VALUES (1, 10);",
    );
    let _ = db.execute("INSERT INTO t VALUES (1, 20)");
    assert_eq!(
        rows(&mut db, "SELECT id, v FROM t"),
        vec![vec![i(1), i(10)]]
    );
    // The engine stays usable after the rejection.
    db.execute("INSERT INTO t VALUES (2, 20)").unwrap();
    assert_eq!(db.table("t").unwrap().row_count(), 2);
}

#[test]
fn values_are_deep_copied_into_rows() {
    let mut db = setup(
        "CREATE TABLE a (s STRING);
         INSERT INTO a VALUES ('shared');
         CREATE TABLE b (s STRING);",
    );
    db.execute("INSERT INTO b VALUES ('shared')").unwrap();
    db.execute("UPDATE b SET s = 'changed'").unwrap();
    assert_eq!(str_column(&mut db, "SELECT s FROM a"), vec!["shared"]);
    assert_eq!(rows(&mut db, "SELECT s FROM b"), vec![vec![Value::Str("changed".into())]]);
}
