//! CREATE / DROP TABLE and the schema round-trip property.

mod common;
use common::*;

use opal_engine::{Database, EngineError};
use opal_sql::ast::DataType;

#[test]
fn schema_round_trip() {
    let db = setup(
        "CREATE TABLE users (id INT PRIMARY KEY, name STRING NOT NULL, \
         balance DECIMAL(10, 2), joined DATE)",
    );
    let table = db.table("users").expect("table exists");

    let names: Vec<&str> = table
        .schema
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "name", "balance", "joined"]);

    assert_eq!(table.schema.columns[0].data_type, DataType::Int);
    assert!(table.schema.columns[0].primary_key);
    assert!(table.schema.columns[0].unique);
    assert!(!table.schema.columns[0].nullable);

    assert_eq!(table.schema.columns[1].data_type, DataType::Str);
    assert!(!table.schema.columns[1].nullable);

    assert_eq!(
        table.schema.columns[2].data_type,
        DataType::Decimal {
            precision: Some(10),
            scale: Some(2)
        }
    );
    assert!(table.schema.columns[2].nullable);
    assert_eq!(table.schema.columns[3].data_type, DataType::Date);
}

#[test]
fn duplicate_table_rejected() {
    let mut db = setup("CREATE TABLE t (a INT)");
    assert!(matches!(
        db.execute("CREATE TABLE t (b INT)"),
        Err(EngineError::DuplicateTable(_))
    ));
}

#[test]
fn table_limit_enforced() {
    let mut db = Database::new();
    for i in 0..32 {
        db.execute(&format!("CREATE TABLE t{i} (a INT)")).unwrap();
    }
    assert!(matches!(
        db.execute("CREATE TABLE overflow (a INT)"),
        Err(EngineError::TableLimit { .. })
    ));
}

#[test]
fn drop_table_removes_table_and_indexes() {
    let mut db = setup(
        "CREATE TABLE t (a INT);
         CREATE INDEX ix_a ON t (a);",
    );
    assert_eq!(db.catalog().indexes().len(), 1);

    db.execute("DROP TABLE t").unwrap();
    assert!(db.table("t").is_none());
    assert!(db.catalog().indexes().is_empty());
    assert!(matches!(
        db.query("SELECT a FROM t"),
        Err(EngineError::TableNotFound(_))
    ));
}

#[test]
fn drop_missing_table_fails() {
    let mut db = Database::new();
    assert!(matches!(
        db.execute("DROP TABLE ghost"),
        Err(EngineError::TableNotFound(_))
    ));
}

#[test]
fn table_level_primary_key_applies_to_column() {
    let db = setup("CREATE TABLE t (a INT, b INT, PRIMARY KEY (a))");
    let table = db.table("t").unwrap();
    assert!(table.schema.columns[0].primary_key);
    assert!(!table.schema.columns[0].nullable);
    assert!(!table.schema.columns[1].primary_key);
}

#[test]
fn foreign_key_must_reference_existing_column() {
    let mut db = Database::new();
    assert!(matches!(
        db.execute("CREATE TABLE p (x INT REFERENCES ghost(id))"),
        Err(EngineError::TableNotFound(_))
    ));

    db.execute("CREATE TABLE c (id INT)").unwrap();
    assert!(matches!(
        db.execute("CREATE TABLE p (x INT REFERENCES c(nope))"),
        Err(EngineError::ColumnNotFound { .. })
    ));
}

#[test]
fn failed_create_leaves_catalog_unchanged() {
    let mut db = setup("CREATE TABLE t (a INT)");
    let before = db.catalog().tables().len();
    let _ = db.execute("CREATE TABLE bad (x INT REFERENCES ghost(id))");
    assert_eq!(db.catalog().tables().len(), before);
}
