#![allow(dead_code)]

use opal_engine::{Database, EngineConfig, QueryResult, Value};

/// A database pre-loaded with a setup script.
pub fn setup(script: &str) -> Database {
    let mut db = Database::new();
    db.run_script(script)
        .unwrap_or_else(|e| panic!("setup failed: {e}"));
    db
}

/// A database with a custom configuration, pre-loaded with a script.
pub fn setup_with(config: EngineConfig, script: &str) -> Database {
    let mut db = Database::with_config(config);
    db.run_script(script)
        .unwrap_or_else(|e| panic!("setup failed: {e}"));
    db
}

/// Runs a query and materializes the result as row vectors.
pub fn rows(db: &mut Database, sql: &str) -> Vec<Vec<Value>> {
    let result = db
        .query(sql)
        .unwrap_or_else(|e| panic!("query failed: {sql}\nerror: {e}"));
    materialize(&result)
}

pub fn materialize(result: &QueryResult) -> Vec<Vec<Value>> {
    result.rows().map(<[Value]>::to_vec).collect()
}

/// Shorthand for a single-column integer result.
pub fn int_column(db: &mut Database, sql: &str) -> Vec<i64> {
    rows(db, sql)
        .into_iter()
        .map(|row| match &row[0] {
            Value::Int(n) => *n,
            other => panic!("expected INT, got {other:?}"),
        })
        .collect()
}

/// Shorthand for a single-column string result.
pub fn str_column(db: &mut Database, sql: &str) -> Vec<String> {
    rows(db, sql)
        .into_iter()
        .map(|row| match &row[0] {
            Value::Str(s) => s.clone(),
            other => panic!("expected STRING, got {other:?}"),
        })
        .collect()
}

pub fn s(text: &str) -> Value {
    Value::Str(text.to_string())
}

pub const fn i(n: i64) -> Value {
    Value::Int(n)
}
