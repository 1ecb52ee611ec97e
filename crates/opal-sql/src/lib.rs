//! # opal-sql
//!
//! The SQL front end of the opal in-memory database engine: a
//! hand-written lexer, a recursive descent parser with Pratt
//! expression parsing, the statement/expression AST, and structured
//! parse diagnostics.
//!
//! The front end is purely syntactic. Statements reference tables and
//! columns by name; the execution engine resolves them against its
//! catalog.
//!
//! ```rust
//! use opal_sql::{Parser, Statement};
//!
//! let statement = Parser::new("SELECT name FROM users WHERE age >= 30")
//!     .parse_statement()
//!     .expect("valid statement");
//! assert!(matches!(statement, Statement::Select(_)));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Statement};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, ParseErrorCode, Parser};
