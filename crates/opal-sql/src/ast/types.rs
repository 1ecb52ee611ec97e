//! Column data types and column definitions.

use core::fmt;

use super::expression::Expr;

/// Data types a column can be declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int,
    /// Double-precision float.
    Float,
    /// Boolean.
    Boolean,
    /// Fixed-point decimal with optional precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u8>,
        /// Digits after the decimal point.
        scale: Option<u8>,
    },
    /// UTF-8 string.
    Str,
    /// Byte blob.
    Blob,
    /// Calendar date (packed year/month/day).
    Date,
    /// Time of day (packed hour/minute/second).
    Time,
}

impl DataType {
    /// Returns the canonical type name.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Int => "INT".to_string(),
            Self::Float => "FLOAT".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => "DECIMAL".to_string(),
            },
            Self::Str => "STRING".to_string(),
            Self::Blob => "BLOB".to_string(),
            Self::Date => "DATE".to_string(),
            Self::Time => "TIME".to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// A foreign-key reference carried by a column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRef {
    /// The referenced table.
    pub table: String,
    /// The referenced column.
    pub column: String,
}

/// A column definition inside CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared data type.
    pub data_type: DataType,
    /// Whether NULL values are accepted.
    pub nullable: bool,
    /// PRIMARY KEY flag (implies UNIQUE and NOT NULL).
    pub primary_key: bool,
    /// UNIQUE flag.
    pub unique: bool,
    /// Foreign-key reference, if declared with REFERENCES.
    pub references: Option<ForeignKeyRef>,
    /// Column-level CHECK expression.
    pub check: Option<Expr>,
}

impl ColumnDef {
    /// Creates a nullable column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
            unique: false,
            references: None,
            check: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column PRIMARY KEY (implies UNIQUE and NOT NULL).
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.unique = true;
        self.nullable = false;
        self
    }

    /// Marks the column UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declares a foreign-key reference.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    /// Attaches a column-level CHECK expression.
    #[must_use]
    pub fn check(mut self, expr: Expr) -> Self {
        self.check = Some(expr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::Int.to_sql(), "INT");
        assert_eq!(
            DataType::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
            .to_sql(),
            "DECIMAL(10, 2)"
        );
    }

    #[test]
    fn test_primary_key_implies_unique_not_null() {
        let col = ColumnDef::new("id", DataType::Int).primary_key();
        assert!(col.primary_key);
        assert!(col.unique);
        assert!(!col.nullable);
    }

    #[test]
    fn test_references_builder() {
        let col = ColumnDef::new("cid", DataType::Int).references("cats", "cid");
        let fk = col.references.unwrap();
        assert_eq!(fk.table, "cats");
        assert_eq!(fk.column, "cid");
    }
}
