//! The engine's error taxonomy.
//!
//! Every failing operation returns one of these; recoverable kinds
//! (everything except [`EngineError::Internal`]) leave the catalog
//! untouched. Parse failures carry the front end's structured
//! diagnostic unchanged.

use opal_sql::ParseError;

/// Errors surfaced at the engine boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The statement did not parse; the payload carries the code,
    /// position, and expected/found details.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A table was not found.
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    /// A column was not found.
    #[error("column '{column}' does not exist in table '{table}'")]
    ColumnNotFound {
        /// The table searched.
        table: String,
        /// The missing column.
        column: String,
    },

    /// An index was not found.
    #[error("index '{0}' does not exist")]
    IndexNotFound(String),

    /// A table with the same name already exists.
    #[error("table '{0}' already exists")]
    DuplicateTable(String),

    /// An index with the same name already exists (index names are
    /// unique across tables).
    #[error("index '{0}' already exists")]
    DuplicateIndex(String),

    /// The per-process table cap was reached.
    #[error("cannot create table '{name}': the catalog holds at most {limit} tables")]
    TableLimit {
        /// The rejected table.
        name: String,
        /// The cap.
        limit: usize,
    },

    /// The per-table row cap was reached.
    #[error("table '{table}' is full ({limit} rows)")]
    RowLimit {
        /// The full table.
        table: String,
        /// The cap.
        limit: usize,
    },

    /// Operands of incompatible types, an arithmetic overflow, or a
    /// failed coercion.
    #[error("type error: {0}")]
    Type(String),

    /// A NOT NULL, UNIQUE, PRIMARY KEY, FOREIGN KEY, or CHECK
    /// violation. Earlier rows of the same statement stand.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// An engine invariant was broken; the caller must reset.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns true when the catalog is still consistent after the
    /// error and the session may continue.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = core::result::Result<T, EngineError>;
