//! The SELECT pipeline: filtering under three-valued logic,
//! projection, DISTINCT, ORDER BY, LIMIT.

mod common;
use common::*;

use opal_engine::Value;

fn people() -> opal_engine::Database {
    setup(
        "CREATE TABLE p (id INT, name STRING, age INT);
         INSERT INTO p VALUES (1, 'Alice', 25), (2, 'Bob', 30),
                              (3, 'Cara', NULL), (4, 'Dan', 30);",
    )
}

#[test]
fn filter_keeps_only_definite_true() {
    let mut db = people();
    // Cara's NULL age makes the comparison unknown; she is excluded.
    assert_eq!(
        str_column(&mut db, "SELECT name FROM p WHERE age >= 30"),
        vec!["Bob", "Dan"]
    );
    assert_eq!(
        str_column(&mut db, "SELECT name FROM p WHERE age < 100"),
        vec!["Alice", "Bob", "Dan"]
    );
}

#[test]
fn equals_null_matches_nothing() {
    let mut db = people();
    assert!(str_column(&mut db, "SELECT name FROM p WHERE age = NULL").is_empty());
    assert_eq!(
        str_column(&mut db, "SELECT name FROM p WHERE age IS NULL"),
        vec!["Cara"]
    );
    assert_eq!(
        str_column(&mut db, "SELECT name FROM p WHERE age IS NOT NULL"),
        vec!["Alice", "Bob", "Dan"]
    );
}

#[test]
fn three_valued_or_recovers_rows() {
    let mut db = people();
    assert_eq!(
        str_column(
            &mut db,
            "SELECT name FROM p WHERE age >= 30 OR age IS NULL"
        ),
        vec!["Bob", "Cara", "Dan"]
    );
}

#[test]
fn projection_expressions() {
    let mut db = people();
    assert_eq!(
        int_column(&mut db, "SELECT id * 10 + 1 FROM p WHERE id <= 2"),
        vec![11, 21]
    );
    assert_eq!(
        str_column(&mut db, "SELECT UPPER(name) FROM p WHERE id = 1"),
        vec!["ALICE"]
    );
}

#[test]
fn projection_aliases_name_output_columns() {
    let mut db = people();
    let result = db.query("SELECT name AS who, age FROM p").unwrap();
    assert_eq!(result.columns(), &["who".to_string(), "age".to_string()]);
}

#[test]
fn wildcard_expands_in_schema_order() {
    let mut db = people();
    let result = db.query("SELECT * FROM p WHERE id = 1").unwrap();
    assert_eq!(
        result.columns(),
        &["id".to_string(), "name".to_string(), "age".to_string()]
    );
}

#[test]
fn distinct_deduplicates_by_value() {
    let mut db = people();
    assert_eq!(
        int_column(&mut db, "SELECT DISTINCT age FROM p WHERE age IS NOT NULL"),
        vec![25, 30]
    );
    // NULLs collapse into one output row under DISTINCT.
    assert_eq!(rows(&mut db, "SELECT DISTINCT age FROM p").len(), 3);
}

#[test]
fn order_by_ascending_descending() {
    let mut db = people();
    assert_eq!(
        str_column(
            &mut db,
            "SELECT name FROM p WHERE age IS NOT NULL ORDER BY age DESC, name"
        ),
        vec!["Bob", "Dan", "Alice"]
    );
}

#[test]
fn order_by_nulls_first_ascending() {
    let mut db = people();
    let ages = rows(&mut db, "SELECT age FROM p ORDER BY age");
    assert_eq!(ages[0][0], Value::Null);
    assert_eq!(ages[1][0], i(25));
    // Descending puts NULLs last.
    let ages = rows(&mut db, "SELECT age FROM p ORDER BY age DESC");
    assert_eq!(ages[3][0], Value::Null);
}

#[test]
fn sort_is_stable_on_ties() {
    let mut db = setup(
        "CREATE TABLE t (k INT, tag STRING);
         INSERT INTO t VALUES (1, 'first'), (2, 'x'), (1, 'second'), (1, 'third');",
    );
    assert_eq!(
        str_column(&mut db, "SELECT tag FROM t WHERE k = 1 ORDER BY k"),
        vec!["first", "second", "third"]
    );
}

#[test]
fn order_by_expression() {
    let mut db = people();
    assert_eq!(
        str_column(
            &mut db,
            "SELECT name FROM p WHERE age IS NOT NULL ORDER BY 0 - age, name"
        ),
        vec!["Bob", "Dan", "Alice"]
    );
}

#[test]
fn limit_truncates() {
    let mut db = people();
    assert_eq!(
        str_column(&mut db, "SELECT name FROM p ORDER BY id LIMIT 2"),
        vec!["Alice", "Bob"]
    );
    assert!(str_column(&mut db, "SELECT name FROM p LIMIT 0").is_empty());
    assert_eq!(str_column(&mut db, "SELECT name FROM p LIMIT 99").len(), 4);
}

#[test]
fn like_is_case_sensitive() {
    let mut db = setup(
        "CREATE TABLE f (name STRING);
         INSERT INTO f VALUES ('Apple'), ('apricot'), ('Banana');",
    );
    assert_eq!(
        str_column(&mut db, "SELECT name FROM f WHERE name LIKE 'A%' ORDER BY name"),
        vec!["Apple"]
    );
    assert_eq!(
        str_column(&mut db, "SELECT name FROM f WHERE name LIKE '%an%'"),
        vec!["Banana"]
    );
    assert_eq!(
        str_column(&mut db, "SELECT name FROM f WHERE name NOT LIKE 'A%' ORDER BY name"),
        vec!["Banana", "apricot"]
    );
    assert_eq!(
        str_column(&mut db, "SELECT name FROM f WHERE name LIKE '_pricot'"),
        vec!["apricot"]
    );
}

#[test]
fn in_predicate_with_subquery() {
    let mut db = setup(
        "CREATE TABLE a (x INT);
         INSERT INTO a VALUES (1), (2), (3), (4);
         CREATE TABLE b (y INT);
         INSERT INTO b VALUES (2), (4);",
    );
    assert_eq!(
        int_column(&mut db, "SELECT x FROM a WHERE x IN (SELECT y FROM b)"),
        vec![2, 4]
    );
    assert_eq!(
        int_column(&mut db, "SELECT x FROM a WHERE x NOT IN (SELECT y FROM b)"),
        vec![1, 3]
    );
}

#[test]
fn exists_and_scalar_subqueries() {
    let mut db = setup(
        "CREATE TABLE a (x INT);
         INSERT INTO a VALUES (1), (5);
         CREATE TABLE b (y INT);
         INSERT INTO b VALUES (3);",
    );
    assert_eq!(
        int_column(&mut db, "SELECT x FROM a WHERE EXISTS (SELECT y FROM b)"),
        vec![1, 5]
    );
    assert_eq!(
        int_column(&mut db, "SELECT x FROM a WHERE x > (SELECT MAX(y) FROM b)"),
        vec![5]
    );
}

#[test]
fn where_error_excludes_the_row() {
    // `age < 'x'` cannot be ordered; affected rows are excluded
    // rather than failing the statement.
    let mut db = people();
    assert!(rows(&mut db, "SELECT name FROM p WHERE age < 'x'").is_empty());
}

#[test]
fn case_projection() {
    let mut db = people();
    assert_eq!(
        str_column(
            &mut db,
            "SELECT CASE WHEN age >= 30 THEN 'senior' ELSE 'junior' END FROM p \
             WHERE age IS NOT NULL ORDER BY id"
        ),
        vec!["junior", "senior", "senior"]
    );
}
