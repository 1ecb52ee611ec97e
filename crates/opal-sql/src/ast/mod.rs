//! Abstract syntax tree for statements and expressions.

mod expression;
mod statement;
mod types;

pub use expression::{BinaryOp, Expr, FunctionCall, InSet, Literal, UnaryOp};
pub use statement::{
    Assignment, CreateIndexStatement, CreateTableStatement, DeleteStatement, DropIndexStatement,
    DropTableStatement, InsertStatement, JoinClause, JoinType, OrderBy, SelectItem,
    SelectStatement, Statement, UpdateStatement,
};
pub use types::{ColumnDef, DataType, ForeignKeyRef};
