//! The catalog: tables, schemas, indexes, and planner statistics.
//!
//! One [`Catalog`] instance is owned by the `Database` facade and
//! handed by reference to the planner and executor; nothing here is
//! process-global.

use opal_sql::ast::{ColumnDef, Expr};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::index::Index;
use crate::row::Row;
use crate::value::Value;

/// The most tables a catalog may hold.
pub const MAX_TABLES: usize = 32;

/// The most rows a table may hold.
pub const MAX_ROWS: usize = 1000;

/// A table's schema: ordered columns, table-level CHECK expressions,
/// and the STRICT flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Ordered column definitions.
    pub columns: Vec<ColumnDef>,
    /// Table-level CHECK expressions.
    pub checks: Vec<Expr>,
    /// STRICT mode: INSERT values must be assignable without coercion.
    pub strict: bool,
}

impl TableSchema {
    /// Creates a schema from its parts.
    #[must_use]
    pub const fn new(columns: Vec<ColumnDef>, checks: Vec<Expr>, strict: bool) -> Self {
        Self {
            columns,
            checks,
            strict,
        }
    }

    /// Finds a column's position by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// A named table: schema plus row storage.
///
/// Row identity is the current position in the row vector; deletion
/// compacts it, so positions must not be held across statements.
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (unique in the catalog).
    pub name: String,
    /// Stable numeric id in `0..MAX_TABLES`.
    pub id: usize,
    /// The schema.
    pub schema: TableSchema,
    /// Row storage in insertion order.
    pub rows: Vec<Row>,
}

impl Table {
    /// The number of live rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Per-column statistics for the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    /// Non-NULL values observed.
    pub row_count: usize,
    /// Distinct non-NULL values (exact at this scale).
    pub distinct_values: usize,
    /// Smallest observed value, NULL when the column is all NULL.
    pub min: Value,
    /// Largest observed value, NULL when the column is all NULL.
    pub max: Value,
    /// Mean payload width in bytes.
    pub avg_width: f64,
    /// False until the first refresh sees at least one row.
    pub has_stats: bool,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            row_count: 0,
            distinct_values: 0,
            min: Value::Null,
            max: Value::Null,
            avg_width: 0.0,
            has_stats: false,
        }
    }
}

/// Per-table statistics for the planner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableStats {
    /// Live row count at the last refresh.
    pub total_rows: usize,
    /// One entry per column, in schema order.
    pub columns: Vec<ColumnStats>,
}

/// The process-wide schema state: tables, indexes, statistics.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: Vec<Table>,
    /// Stats for `tables[i]` live at `stats[i]`.
    stats: Vec<TableStats>,
    indexes: Vec<Index>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every table, index, and stats entry.
    pub fn reset(&mut self) {
        info!("resetting catalog");
        self.tables.clear();
        self.stats.clear();
        self.indexes.clear();
    }

    /// The tables in creation order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// The indexes in creation order.
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Looks up a table by name, mutably.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Looks up a table by name or fails with `TableNotFound`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TableNotFound`] when absent.
    pub fn resolve(&self, name: &str) -> Result<&Table> {
        self.table(name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))
    }

    /// Installs a new table and registers empty statistics.
    ///
    /// # Errors
    ///
    /// Rejects duplicate table names, duplicate column names, and a
    /// full catalog.
    pub fn create_table(&mut self, name: &str, schema: TableSchema) -> Result<usize> {
        if self.table(name).is_some() {
            return Err(EngineError::DuplicateTable(name.to_string()));
        }
        if self.tables.len() >= MAX_TABLES {
            return Err(EngineError::TableLimit {
                name: name.to_string(),
                limit: MAX_TABLES,
            });
        }
        for (i, col) in schema.columns.iter().enumerate() {
            if schema.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(EngineError::Constraint(format!(
                    "duplicate column '{}' in table '{name}'",
                    col.name
                )));
            }
        }

        let id = self.lowest_free_id();
        let width = schema.width();
        self.tables.push(Table {
            name: name.to_string(),
            id,
            schema,
            rows: Vec::new(),
        });
        self.stats.push(TableStats {
            total_rows: 0,
            columns: vec![ColumnStats::default(); width],
        });
        info!(table = name, id, "created table");
        Ok(id)
    }

    fn lowest_free_id(&self) -> usize {
        (0..MAX_TABLES)
            .find(|id| self.tables.iter().all(|t| t.id != *id))
            .unwrap_or(self.tables.len())
    }

    /// Removes a table, its statistics, and every index over it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TableNotFound`] when absent.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        let position = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))?;
        self.tables.remove(position);
        self.stats.remove(position);
        let before = self.indexes.len();
        self.indexes.retain(|ix| ix.table != name);
        info!(
            table = name,
            dropped_indexes = before - self.indexes.len(),
            "dropped table"
        );
        Ok(())
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|ix| ix.name == name)
    }

    /// Indexes over the given table.
    pub fn indexes_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Index> + 'a {
        self.indexes.iter().filter(move |ix| ix.table == table)
    }

    /// Indexes over the given table, mutably.
    pub fn indexes_for_mut<'a>(
        &'a mut self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a mut Index> + 'a {
        self.indexes.iter_mut().filter(move |ix| ix.table == table)
    }

    /// Installs a new index. Index names are unique across tables.
    ///
    /// # Errors
    ///
    /// Rejects duplicate index names.
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if self.index(&index.name).is_some() {
            return Err(EngineError::DuplicateIndex(index.name.clone()));
        }
        info!(
            index = %index.name,
            table = %index.table,
            column = %index.column,
            kind = index.kind().as_str(),
            "created index"
        );
        self.indexes.push(index);
        Ok(())
    }

    /// Removes an index by name, releasing its storage.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IndexNotFound`] when absent.
    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        let position = self
            .indexes
            .iter()
            .position(|ix| ix.name == name)
            .ok_or_else(|| EngineError::IndexNotFound(name.to_string()))?;
        self.indexes.remove(position);
        info!(index = name, "dropped index");
        Ok(())
    }

    /// The stats entry for a table, if it exists.
    #[must_use]
    pub fn stats(&self, table: &str) -> Option<&TableStats> {
        let position = self.tables.iter().position(|t| t.name == table)?;
        self.stats.get(position)
    }

    /// Recomputes a table's statistics by scanning its rows.
    ///
    /// Called by the executor after every successful mutation; at the
    /// engine's row ceiling a full scan is cheaper than incremental
    /// maintenance would be to keep correct.
    pub fn refresh_stats(&mut self, table: &str) {
        let Some(position) = self.tables.iter().position(|t| t.name == table) else {
            return;
        };
        let table_ref = &self.tables[position];
        let width = table_ref.schema.width();
        let total_rows = table_ref.rows.len();

        let mut columns = Vec::with_capacity(width);
        for col in 0..width {
            columns.push(column_stats(&table_ref.rows, col));
        }

        debug!(table, total_rows, "refreshed statistics");
        self.stats[position] = TableStats {
            total_rows,
            columns,
        };
    }
}

/// Scans one column's values into a stats entry.
#[allow(clippy::cast_precision_loss)]
fn column_stats(rows: &[Row], col: usize) -> ColumnStats {
    let mut non_null: Vec<&Value> = Vec::new();
    let mut width_sum = 0usize;
    for row in rows {
        if let Some(v) = row.get(col) {
            width_sum += v.width();
            if !v.is_null() {
                non_null.push(v);
            }
        }
    }

    if non_null.is_empty() {
        return ColumnStats {
            has_stats: !rows.is_empty(),
            ..ColumnStats::default()
        };
    }

    let mut min = non_null[0];
    let mut max = non_null[0];
    for v in &non_null[1..] {
        if v.compare(min) == Some(core::cmp::Ordering::Less) {
            min = v;
        }
        if v.compare(max) == Some(core::cmp::Ordering::Greater) {
            max = v;
        }
    }

    // Exact distinct count: sort then count runs. Columns hold values
    // of one type, so the comparator is total here.
    let mut sorted = non_null.clone();
    sorted.sort_by(|a, b| a.compare(b).unwrap_or(core::cmp::Ordering::Equal));
    let mut distinct = 1usize;
    for pair in sorted.windows(2) {
        if pair[0].sql_eq(pair[1]) != Some(true) {
            distinct += 1;
        }
    }

    ColumnStats {
        row_count: non_null.len(),
        distinct_values: distinct,
        min: min.clone(),
        max: max.clone(),
        avg_width: width_sum as f64 / rows.len() as f64,
        has_stats: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_sql::ast::{ColumnDef, DataType};

    fn schema(cols: &[(&str, DataType)]) -> TableSchema {
        TableSchema::new(
            cols.iter()
                .map(|(name, ty)| ColumnDef::new(*name, ty.clone()))
                .collect(),
            Vec::new(),
            false,
        )
    }

    #[test]
    fn test_create_and_resolve_table() {
        let mut catalog = Catalog::new();
        let id = catalog
            .create_table("users", schema(&[("id", DataType::Int)]))
            .unwrap();
        assert_eq!(id, 0);
        assert!(catalog.resolve("users").is_ok());
        assert!(matches!(
            catalog.resolve("ghosts"),
            Err(EngineError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut catalog = Catalog::new();
        catalog
            .create_table("t", schema(&[("a", DataType::Int)]))
            .unwrap();
        assert!(matches!(
            catalog.create_table("t", schema(&[("a", DataType::Int)])),
            Err(EngineError::DuplicateTable(_))
        ));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut catalog = Catalog::new();
        assert!(matches!(
            catalog.create_table("t", schema(&[("a", DataType::Int), ("a", DataType::Int)])),
            Err(EngineError::Constraint(_))
        ));
    }

    #[test]
    fn test_table_limit() {
        let mut catalog = Catalog::new();
        for i in 0..MAX_TABLES {
            catalog
                .create_table(&format!("t{i}"), schema(&[("a", DataType::Int)]))
                .unwrap();
        }
        assert!(matches!(
            catalog.create_table("one_more", schema(&[("a", DataType::Int)])),
            Err(EngineError::TableLimit { .. })
        ));
    }

    #[test]
    fn test_ids_are_reused_after_drop() {
        let mut catalog = Catalog::new();
        catalog
            .create_table("a", schema(&[("x", DataType::Int)]))
            .unwrap();
        catalog
            .create_table("b", schema(&[("x", DataType::Int)]))
            .unwrap();
        catalog.drop_table("a").unwrap();
        let id = catalog
            .create_table("c", schema(&[("x", DataType::Int)]))
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_stats_refresh() {
        let mut catalog = Catalog::new();
        catalog
            .create_table("t", schema(&[("a", DataType::Int)]))
            .unwrap();
        let table = catalog.table_mut("t").unwrap();
        table.rows.push(Row::new(vec![Value::Int(5)]));
        table.rows.push(Row::new(vec![Value::Int(5)]));
        table.rows.push(Row::new(vec![Value::Int(9)]));
        table.rows.push(Row::new(vec![Value::Null]));
        catalog.refresh_stats("t");

        let stats = catalog.stats("t").unwrap();
        assert_eq!(stats.total_rows, 4);
        let col = &stats.columns[0];
        assert_eq!(col.row_count, 3);
        assert_eq!(col.distinct_values, 2);
        assert_eq!(col.min, Value::Int(5));
        assert_eq!(col.max, Value::Int(9));
        assert!(col.has_stats);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut catalog = Catalog::new();
        catalog
            .create_table("t", schema(&[("a", DataType::Int)]))
            .unwrap();
        catalog.reset();
        assert!(catalog.tables().is_empty());
        assert!(catalog.indexes().is_empty());
        assert!(catalog.table("t").is_none());
    }
}
