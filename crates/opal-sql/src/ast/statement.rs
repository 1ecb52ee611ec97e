//! Statement AST types.
//!
//! Statements reference tables and columns by *name*; resolution
//! against the catalog happens in the executor, so the parser never
//! needs catalog access.

use core::fmt;

use super::expression::Expr;
use super::types::ColumnDef;

/// Join flavor of the single optional join a SELECT may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN: rows with matches on both sides.
    Inner,
    /// LEFT JOIN: all left rows, right columns NULL when unmatched.
    Left,
}

impl JoinType {
    /// Returns the query-language spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JOIN clause of a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// INNER or LEFT.
    pub join_type: JoinType,
    /// The right-hand table name.
    pub table: String,
    /// The ON condition.
    pub on: Expr,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The sort expression.
    pub expr: Expr,
    /// True for DESC.
    pub descending: bool,
}

/// One projection item.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// The projected expression.
    pub expr: Expr,
    /// Optional output column alias.
    pub alias: Option<String>,
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// DISTINCT marker.
    pub distinct: bool,
    /// Projection list.
    pub items: Vec<SelectItem>,
    /// Source table name.
    pub from: String,
    /// Optional single join.
    pub join: Option<JoinClause>,
    /// WHERE condition.
    pub where_clause: Option<Expr>,
    /// ORDER BY keys.
    pub order_by: Vec<OrderBy>,
    /// LIMIT row count.
    pub limit: Option<u64>,
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name.
    pub table: String,
    /// Explicit column list; empty means positional.
    pub columns: Vec<String>,
    /// One or more value tuples.
    pub rows: Vec<Vec<Expr>>,
}

/// One SET assignment of an UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column name.
    pub column: String,
    /// Value expression, evaluated in the matched row's context.
    pub value: Expr,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table name.
    pub table: String,
    /// SET assignments.
    pub assignments: Vec<Assignment>,
    /// WHERE condition.
    pub where_clause: Option<Expr>,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name.
    pub table: String,
    /// WHERE condition.
    pub where_clause: Option<Expr>,
}

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// New table name.
    pub name: String,
    /// Ordered column definitions.
    pub columns: Vec<ColumnDef>,
    /// Table-level PRIMARY KEY column list.
    pub primary_key: Vec<String>,
    /// Table-level CHECK expressions.
    pub checks: Vec<Expr>,
    /// STRICT mode: no implicit coercion at INSERT.
    pub strict: bool,
}

/// A DROP TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// The table to drop.
    pub name: String,
}

/// A CREATE INDEX statement.
///
/// The index kind (hash or B-tree) is not part of the grammar; the
/// executor takes it from the engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    /// Globally-unique index name.
    pub name: String,
    /// The indexed table.
    pub table: String,
    /// The indexed column(s).
    pub columns: Vec<String>,
}

/// A DROP INDEX statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropIndexStatement {
    /// The index to drop.
    pub name: String,
}

/// Any statement the parser can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE.
    CreateTable(CreateTableStatement),
    /// DROP TABLE.
    DropTable(DropTableStatement),
    /// CREATE INDEX.
    CreateIndex(CreateIndexStatement),
    /// DROP INDEX.
    DropIndex(DropIndexStatement),
    /// INSERT.
    Insert(InsertStatement),
    /// UPDATE.
    Update(UpdateStatement),
    /// DELETE.
    Delete(DeleteStatement),
    /// SELECT.
    Select(SelectStatement),
}

impl Statement {
    /// A short name for logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "CREATE TABLE",
            Self::DropTable(_) => "DROP TABLE",
            Self::CreateIndex(_) => "CREATE INDEX",
            Self::DropIndex(_) => "DROP INDEX",
            Self::Insert(_) => "INSERT",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
            Self::Select(_) => "SELECT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_spelling() {
        assert_eq!(JoinType::Inner.as_str(), "INNER JOIN");
        assert_eq!(JoinType::Left.as_str(), "LEFT JOIN");
    }

    #[test]
    fn test_kind_name() {
        let stmt = Statement::Delete(DeleteStatement {
            table: "t".to_string(),
            where_clause: None,
        });
        assert_eq!(stmt.kind_name(), "DELETE");
    }
}
