//! # opal-engine
//!
//! The in-memory relational engine behind opal: typed values and rows,
//! a catalog of tables and indexes with planner statistics, hash and
//! B-tree access methods, a cost-based access planner, and the
//! statement executor.
//!
//! The engine is single-threaded and synchronous: one statement at a
//! time, no suspension points, no background work. A [`Database`]
//! owns all state; `reset` returns it to the startup state.
//!
//! ```rust
//! use opal_engine::{Database, Value};
//!
//! let mut db = Database::new();
//! db.run_script(
//!     "CREATE TABLE users (id INT PRIMARY KEY, name STRING, age INT);
//!      INSERT INTO users VALUES (1, 'Alice', 25), (2, 'Bob', 30);",
//! )
//! .unwrap();
//!
//! let result = db.query("SELECT name FROM users WHERE age >= 30").unwrap();
//! assert_eq!(result.value(0, 0), Some(&Value::Str("Bob".into())));
//! ```

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod eval;
pub mod executor;
pub mod index;
pub mod planner;
pub mod result;
pub mod row;
pub mod value;

pub use catalog::{Catalog, Table, TableSchema, TableStats};
pub use config::{EngineConfig, IndexKind, LogLevel};
pub use database::Database;
pub use error::{EngineError, Result};
pub use result::QueryResult;
pub use row::Row;
pub use value::{Decimal, Value};
