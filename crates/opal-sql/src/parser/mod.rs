//! Statement parser.
//!
//! A hand-written recursive descent parser with Pratt (top-down
//! operator precedence) expression parsing over a pre-lexed token
//! vector.
//!
//! # Supported statements
//!
//! | Statement | Notes |
//! |-----------|-------|
//! | `CREATE TABLE` | column constraints, table-level PRIMARY KEY and CHECK, `STRICT` |
//! | `DROP TABLE` | |
//! | `CREATE INDEX` | index kind comes from engine configuration, not grammar |
//! | `DROP INDEX` | |
//! | `INSERT` | optional column list, multi-tuple `VALUES` |
//! | `UPDATE` | `SET` list, optional `WHERE` |
//! | `DELETE` | optional `WHERE` |
//! | `SELECT` | `DISTINCT`, single `INNER`/`LEFT` join, `WHERE`, `ORDER BY`, `LIMIT` |
//!
//! # Expressions
//!
//! Precedence, loosest to tightest: `OR`; `AND`; `NOT`; comparisons
//! (`= != < <= > >=`, `[NOT] LIKE`, `[NOT] IN`, `IS [NOT] NULL`,
//! `EXISTS`); `+ -`; `* / %`; unary `-`; primaries (literals, column
//! references, function calls, parenthesized expressions, scalar
//! subqueries, `CASE`).
//!
//! # Diagnostics
//!
//! Failures are [`ParseError`] values carrying a [`ParseErrorCode`],
//! the expected construct, the found token, a zero-based line/column
//! position, and the offending token's index. Parsing stops at the
//! first fatal error.

mod error;
mod parser;
mod pratt;

pub use error::{ParseError, ParseErrorCode};
pub use parser::{Parser, MAX_COLUMNS};
