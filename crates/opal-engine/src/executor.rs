//! Statement execution.
//!
//! One statement in, one result (or error) out. DDL and DML validate
//! before they mutate, so a failing statement leaves the catalog
//! unchanged — except UPDATE and DELETE, which surface the first
//! per-row constraint failure while keeping earlier rows' changes
//! (the engine is not transactional).
//!
//! The SELECT pipeline runs scan → filter → join → project/aggregate →
//! sort → limit, with no suspension points.

use core::cmp::Ordering;

use opal_sql::ast::{
    BinaryOp, ColumnDef, CreateIndexStatement, CreateTableStatement, Expr, InsertStatement,
    JoinType, SelectItem, SelectStatement, Statement, UpdateStatement,
};
use tracing::{debug, warn};

use crate::catalog::{Catalog, Table, TableSchema, MAX_ROWS};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::eval::{eval, truth, EvalContext, RowBinding};
use crate::index::Index;
use crate::planner::{choose_plan, AccessPlan, ScanOp};
use crate::result::QueryResult;
use crate::row::Row;
use crate::value::Value;

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// A SELECT's result table.
    Rows(QueryResult),
    /// The number of rows a DDL/DML statement affected.
    Affected(usize),
}

impl ExecOutcome {
    /// The outcome as a result table (empty for DDL/DML).
    #[must_use]
    pub fn into_result(self) -> QueryResult {
        match self {
            Self::Rows(result) => result,
            Self::Affected(_) => QueryResult::empty(),
        }
    }

    /// The outcome as an affected-row count (row count for SELECT).
    #[must_use]
    pub fn affected(&self) -> usize {
        match self {
            Self::Rows(result) => result.row_count(),
            Self::Affected(n) => *n,
        }
    }
}

/// Executes statements against a catalog under an engine
/// configuration.
pub struct Executor<'a> {
    catalog: &'a mut Catalog,
    config: &'a EngineConfig,
}

impl<'a> Executor<'a> {
    /// Creates an executor borrowing the catalog for the statement.
    pub fn new(catalog: &'a mut Catalog, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// Dispatches one statement.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`]; recoverable kinds leave the catalog
    /// consistent.
    pub fn execute(&mut self, statement: &Statement) -> Result<ExecOutcome> {
        debug!(kind = statement.kind_name(), "executing statement");
        match statement {
            Statement::CreateTable(stmt) => {
                self.create_table(stmt)?;
                Ok(ExecOutcome::Affected(0))
            }
            Statement::DropTable(stmt) => {
                self.catalog.drop_table(&stmt.name)?;
                Ok(ExecOutcome::Affected(0))
            }
            Statement::CreateIndex(stmt) => {
                self.create_index(stmt)?;
                Ok(ExecOutcome::Affected(0))
            }
            Statement::DropIndex(stmt) => {
                self.catalog.drop_index(&stmt.name)?;
                Ok(ExecOutcome::Affected(0))
            }
            Statement::Insert(stmt) => Ok(ExecOutcome::Affected(self.insert(stmt)?)),
            Statement::Update(stmt) => Ok(ExecOutcome::Affected(self.update(stmt)?)),
            Statement::Delete(stmt) => {
                Ok(ExecOutcome::Affected(self.delete(&stmt.table, stmt.where_clause.as_ref())?))
            }
            Statement::Select(stmt) => Ok(ExecOutcome::Rows(run_select(&*self.catalog, stmt)?)),
        }
    }

    // --- DDL ---

    fn create_table(&mut self, stmt: &CreateTableStatement) -> Result<()> {
        let mut columns = stmt.columns.clone();

        // Fold the table-level PRIMARY KEY list into the columns.
        for pk in &stmt.primary_key {
            let column = columns
                .iter_mut()
                .find(|c| c.name == *pk)
                .ok_or_else(|| EngineError::ColumnNotFound {
                    table: stmt.name.clone(),
                    column: pk.clone(),
                })?;
            column.primary_key = true;
            column.unique = true;
            column.nullable = false;
        }

        // Foreign keys must point at an existing column; a table may
        // reference itself.
        for column in &columns {
            if let Some(fk) = &column.references {
                if fk.table == stmt.name {
                    if !columns.iter().any(|c| c.name == fk.column) {
                        return Err(EngineError::ColumnNotFound {
                            table: fk.table.clone(),
                            column: fk.column.clone(),
                        });
                    }
                } else {
                    let referenced = self.catalog.resolve(&fk.table)?;
                    if referenced.schema.column_index(&fk.column).is_none() {
                        return Err(EngineError::ColumnNotFound {
                            table: fk.table.clone(),
                            column: fk.column.clone(),
                        });
                    }
                }
            }
        }

        let schema = TableSchema::new(columns, stmt.checks.clone(), stmt.strict);
        self.catalog.create_table(&stmt.name, schema)?;
        Ok(())
    }

    fn create_index(&mut self, stmt: &CreateIndexStatement) -> Result<()> {
        if self.catalog.index(&stmt.name).is_some() {
            return Err(EngineError::DuplicateIndex(stmt.name.clone()));
        }
        let [column] = stmt.columns.as_slice() else {
            return Err(EngineError::Constraint(
                "an index covers exactly one column".to_string(),
            ));
        };

        let table = self.catalog.resolve(&stmt.table)?;
        let column_index =
            table
                .schema
                .column_index(column)
                .ok_or_else(|| EngineError::ColumnNotFound {
                    table: stmt.table.clone(),
                    column: column.clone(),
                })?;

        let mut index = Index::new(
            &stmt.name,
            &stmt.table,
            column,
            self.config.default_index_kind,
            self.config.btree_order,
            self.config.hash_buckets,
        );
        index.build_from_scan(&table.rows, column_index);
        self.catalog.add_index(index)
    }

    // --- INSERT ---

    fn insert(&mut self, stmt: &InsertStatement) -> Result<usize> {
        let schema = self.catalog.resolve(&stmt.table)?.schema.clone();

        // Map the written columns to schema positions.
        let targets: Vec<usize> = if stmt.columns.is_empty() {
            (0..schema.width()).collect()
        } else {
            stmt.columns
                .iter()
                .map(|name| {
                    schema
                        .column_index(name)
                        .ok_or_else(|| EngineError::ColumnNotFound {
                            table: stmt.table.clone(),
                            column: name.clone(),
                        })
                })
                .collect::<Result<_>>()?
        };

        let mut inserted = 0usize;
        let outcome: Result<()> = (|| {
            for tuple in &stmt.rows {
                let row = self.build_insert_row(&stmt.table, &schema, &targets, tuple)?;
                self.check_constraints(&stmt.table, &schema, &row, None)?;
                self.append_row(&stmt.table, row)?;
                inserted += 1;
            }
            Ok(())
        })();

        if inserted > 0 {
            self.catalog.refresh_stats(&stmt.table);
        }
        outcome.map(|()| inserted)
    }

    fn build_insert_row(
        &self,
        table: &str,
        schema: &TableSchema,
        targets: &[usize],
        tuple: &[Expr],
    ) -> Result<Row> {
        if tuple.len() > targets.len() {
            return Err(EngineError::Type(format!(
                "INSERT supplies {} values for {} column(s)",
                tuple.len(),
                targets.len()
            )));
        }

        let ctx = EvalContext::bare(&*self.catalog);
        let mut row = Row::nulls(schema.width());
        for (expr, &target) in tuple.iter().zip(targets) {
            let value = eval(expr, &ctx)?;
            let column = &schema.columns[target];
            let stored = coerce_for_column(value, column, schema.strict, table)?;
            row.set(target, stored);
        }
        Ok(row)
    }

    /// Validates NOT NULL, UNIQUE/PRIMARY KEY, FOREIGN KEY, and CHECK
    /// for a prospective row. `skip_position` excludes the row's own
    /// slot during UPDATE.
    fn check_constraints(
        &self,
        table_name: &str,
        schema: &TableSchema,
        row: &Row,
        skip_position: Option<usize>,
    ) -> Result<()> {
        let table = self.catalog.resolve(table_name)?;

        for (i, column) in schema.columns.iter().enumerate() {
            let value = row.get(i).unwrap_or(&Value::Null);

            if value.is_null() {
                if !column.nullable {
                    warn!(table = table_name, column = %column.name, "NOT NULL violation");
                    return Err(EngineError::Constraint(format!(
                        "column '{}' is NOT NULL",
                        column.name
                    )));
                }
                // NULL is exempt from UNIQUE and FOREIGN KEY.
                continue;
            }

            if column.unique {
                let clash = table.rows.iter().enumerate().any(|(pos, existing)| {
                    Some(pos) != skip_position
                        && existing.get(i).is_some_and(|v| v.sql_eq(value) == Some(true))
                });
                if clash {
                    warn!(table = table_name, column = %column.name, "UNIQUE violation");
                    return Err(EngineError::Constraint(format!(
                        "duplicate value for unique column '{}'",
                        column.name
                    )));
                }
            }

            if let Some(fk) = &column.references {
                let referenced = self.catalog.resolve(&fk.table)?;
                let ref_index = referenced
                    .schema
                    .column_index(&fk.column)
                    .ok_or_else(|| EngineError::ColumnNotFound {
                        table: fk.table.clone(),
                        column: fk.column.clone(),
                    })?;
                let found = referenced
                    .rows
                    .iter()
                    .any(|r| r.get(ref_index).is_some_and(|v| v.sql_eq(value) == Some(true)));
                if !found {
                    warn!(
                        table = table_name,
                        column = %column.name,
                        referenced = %fk.table,
                        "FOREIGN KEY violation"
                    );
                    return Err(EngineError::Constraint(format!(
                        "value for '{}' not present in {}({})",
                        column.name, fk.table, fk.column
                    )));
                }
            }
        }

        // CHECK expressions see the prospective row; only a definite
        // FALSE rejects.
        let binding = RowBinding {
            table: table_name,
            schema,
            row: Some(row),
        };
        let ctx = EvalContext::single(&*self.catalog, binding);
        let column_checks = schema.columns.iter().filter_map(|c| c.check.as_ref());
        for check in column_checks.chain(schema.checks.iter()) {
            if truth(&eval(check, &ctx)?)? == Some(false) {
                warn!(table = table_name, check = %check, "CHECK violation");
                return Err(EngineError::Constraint(format!(
                    "CHECK ({check}) failed"
                )));
            }
        }

        Ok(())
    }

    /// Appends a validated row and registers it in every index.
    fn append_row(&mut self, table_name: &str, row: Row) -> Result<()> {
        let (position, keys) = {
            let table = self.catalog.resolve(table_name)?;
            if table.rows.len() >= MAX_ROWS {
                return Err(EngineError::RowLimit {
                    table: table_name.to_string(),
                    limit: MAX_ROWS,
                });
            }
            let keys: Vec<(String, Value)> = self
                .catalog
                .indexes_for(table_name)
                .map(|ix| {
                    let key = table
                        .schema
                        .column_index(&ix.column)
                        .and_then(|col| row.get(col))
                        .cloned()
                        .unwrap_or(Value::Null);
                    (ix.name.clone(), key)
                })
                .collect();
            (table.rows.len(), keys)
        };

        self.catalog
            .table_mut(table_name)
            .ok_or_else(|| EngineError::TableNotFound(table_name.to_string()))?
            .rows
            .push(row);

        for (name, key) in keys {
            for ix in self.catalog.indexes_for_mut(table_name) {
                if ix.name == name {
                    ix.insert(key.clone(), position);
                }
            }
        }
        Ok(())
    }

    // --- UPDATE ---

    fn update(&mut self, stmt: &UpdateStatement) -> Result<usize> {
        let schema = self.catalog.resolve(&stmt.table)?.schema.clone();

        // Resolve assignment targets once.
        let targets: Vec<(usize, &Expr)> = stmt
            .assignments
            .iter()
            .map(|a| {
                schema
                    .column_index(&a.column)
                    .map(|i| (i, &a.value))
                    .ok_or_else(|| EngineError::ColumnNotFound {
                        table: stmt.table.clone(),
                        column: a.column.clone(),
                    })
            })
            .collect::<Result<_>>()?;

        let matches = self.matching_positions(&stmt.table, stmt.where_clause.as_ref())?;

        let mut updated = 0usize;
        let outcome: Result<()> = (|| {
            for position in matches {
                let new_row = {
                    let table = self.catalog.resolve(&stmt.table)?;
                    let old_row = &table.rows[position];
                    let binding = RowBinding {
                        table: &stmt.table,
                        schema: &schema,
                        row: Some(old_row),
                    };
                    let ctx = EvalContext::single(&*self.catalog, binding);

                    let mut new_row = old_row.clone();
                    for (target, expr) in &targets {
                        let value = eval(expr, &ctx)?;
                        let column = &schema.columns[*target];
                        new_row.set(
                            *target,
                            coerce_for_column(value, column, schema.strict, &stmt.table)?,
                        );
                    }
                    new_row
                };

                self.check_constraints(&stmt.table, &schema, &new_row, Some(position))?;
                self.replace_row(&stmt.table, &schema, position, new_row)?;
                updated += 1;
            }
            Ok(())
        })();

        if updated > 0 {
            self.catalog.refresh_stats(&stmt.table);
        }
        outcome.map(|()| updated)
    }

    /// Swaps a row in place and re-keys every index entry that
    /// changed.
    fn replace_row(
        &mut self,
        table_name: &str,
        schema: &TableSchema,
        position: usize,
        new_row: Row,
    ) -> Result<()> {
        let rekeys: Vec<(String, Value, Value)> = {
            let table = self.catalog.resolve(table_name)?;
            let old_row = &table.rows[position];
            self.catalog
                .indexes_for(table_name)
                .filter_map(|ix| {
                    let col = schema.column_index(&ix.column)?;
                    let old_key = old_row.get(col).cloned().unwrap_or(Value::Null);
                    let new_key = new_row.get(col).cloned().unwrap_or(Value::Null);
                    Some((ix.name.clone(), old_key, new_key))
                })
                .collect()
        };

        self.catalog
            .table_mut(table_name)
            .ok_or_else(|| EngineError::TableNotFound(table_name.to_string()))?
            .rows[position] = new_row;

        for (name, old_key, new_key) in rekeys {
            for ix in self.catalog.indexes_for_mut(table_name) {
                if ix.name == name {
                    ix.remove(&old_key, position);
                    ix.insert(new_key.clone(), position);
                }
            }
        }
        Ok(())
    }

    // --- DELETE ---

    fn delete(&mut self, table_name: &str, where_clause: Option<&Expr>) -> Result<usize> {
        let matches = self.matching_positions(table_name, where_clause)?;
        if matches.is_empty() {
            return Ok(0);
        }

        let table = self
            .catalog
            .table_mut(table_name)
            .ok_or_else(|| EngineError::TableNotFound(table_name.to_string()))?;

        // Compact the survivors in order.
        let doomed: std::collections::BTreeSet<usize> = matches.iter().copied().collect();
        let old_rows = core::mem::take(&mut table.rows);
        table.rows = old_rows
            .into_iter()
            .enumerate()
            .filter_map(|(pos, row)| (!doomed.contains(&pos)).then_some(row))
            .collect();

        // Positions shifted; rebuild this table's indexes from scan.
        let schema_columns: Vec<(String, usize)> = {
            let table = self.catalog.resolve(table_name)?;
            self.catalog
                .indexes_for(table_name)
                .filter_map(|ix| {
                    table
                        .schema
                        .column_index(&ix.column)
                        .map(|col| (ix.name.clone(), col))
                })
                .collect()
        };
        let rows = self.catalog.resolve(table_name)?.rows.clone();
        for (name, col) in schema_columns {
            for ix in self.catalog.indexes_for_mut(table_name) {
                if ix.name == name {
                    ix.build_from_scan(&rows, col);
                }
            }
        }

        self.catalog.refresh_stats(table_name);
        debug!(table = table_name, deleted = doomed.len(), "deleted rows");
        Ok(doomed.len())
    }

    /// Runs plan + scan + filter for a mutation's WHERE clause and
    /// returns matching positions in ascending order.
    fn matching_positions(
        &self,
        table_name: &str,
        where_clause: Option<&Expr>,
    ) -> Result<Vec<usize>> {
        let table = self.catalog.resolve(table_name)?;
        let plan = choose_plan(&*self.catalog, table, where_clause);
        let candidates = scan_positions(&*self.catalog, table, &plan);
        Ok(filter_positions(
            &*self.catalog,
            table,
            where_clause,
            candidates,
        ))
    }
}

/// Applies the STRICT or coercion rule for one column.
fn coerce_for_column(
    value: Value,
    column: &ColumnDef,
    strict: bool,
    table: &str,
) -> Result<Value> {
    if strict && !value.matches_type(&column.data_type) {
        return Err(EngineError::Type(format!(
            "strict table '{table}': {} value is not assignable to {} column '{}'",
            value.type_name(),
            column.data_type,
            column.name
        )));
    }
    let type_name = value.type_name();
    value.coerce_to(&column.data_type).ok_or_else(|| {
        EngineError::Type(format!(
            "cannot coerce {type_name} to {} for column '{}'",
            column.data_type, column.name
        ))
    })
}

/// Produces candidate positions for a plan.
fn scan_positions(catalog: &Catalog, table: &Table, plan: &AccessPlan) -> Vec<usize> {
    match plan {
        AccessPlan::SeqScan => (0..table.rows.len()).collect(),
        AccessPlan::IndexScan { index, op, key } => {
            let Some(ix) = catalog.index(index) else {
                return (0..table.rows.len()).collect();
            };
            // Range probes use inclusive bounds: the filter stage
            // re-applies the exact predicate, so a slightly wider
            // candidate set is harmless.
            match op {
                ScanOp::Eq => ix.access().find_equal(key),
                ScanOp::Lt | ScanOp::LtEq => ix.access().find_range(None, Some(key)),
                ScanOp::Gt | ScanOp::GtEq => ix.access().find_range(Some(key), None),
            }
        }
    }
}

/// Keeps the candidates whose WHERE evaluates to a definite TRUE.
/// Evaluation failures exclude the row.
fn filter_positions(
    catalog: &Catalog,
    table: &Table,
    where_clause: Option<&Expr>,
    candidates: Vec<usize>,
) -> Vec<usize> {
    let Some(filter) = where_clause else {
        return candidates;
    };

    candidates
        .into_iter()
        .filter(|&position| {
            let binding = RowBinding {
                table: &table.name,
                schema: &table.schema,
                row: Some(&table.rows[position]),
            };
            let ctx = EvalContext::single(catalog, binding);
            match eval(filter, &ctx).and_then(|v| truth(&v)) {
                Ok(Some(true)) => true,
                Ok(_) => false,
                Err(error) => {
                    debug!(table = table.name, position, %error, "row excluded by evaluation error");
                    false
                }
            }
        })
        .collect()
}

// --- SELECT pipeline ---

/// A joined row: the left position plus an optional right position
/// (`None` on the NULL-extended side of a LEFT JOIN).
type RowPair = (usize, Option<usize>);

/// Runs a SELECT against the catalog.
///
/// # Errors
///
/// Schema errors for unknown tables/columns, type errors from
/// projection or ORDER BY evaluation.
pub fn run_select(catalog: &Catalog, stmt: &SelectStatement) -> Result<QueryResult> {
    let table = catalog.resolve(&stmt.from)?;

    // 1. Scan.
    let plan = choose_plan(catalog, table, stmt.where_clause.as_ref());
    let candidates = scan_positions(catalog, table, &plan);

    // 2. Filter on the left row.
    let survivors = filter_positions(catalog, table, stmt.where_clause.as_ref(), candidates);

    // 3. Join.
    let (right_table, pairs) = match &stmt.join {
        Some(join) => {
            let right = catalog.resolve(&join.table)?;
            let pairs = join_pairs(catalog, table, right, join.join_type, &join.on, &survivors)?;
            (Some(right), pairs)
        }
        None => (
            None,
            survivors.iter().map(|&p| (p, None)).collect::<Vec<RowPair>>(),
        ),
    };

    // 4. Project or aggregate.
    let items = expand_items(table, right_table, &stmt.items)?;
    let column_names: Vec<String> = items
        .iter()
        .map(|item| {
            item.alias
                .clone()
                .unwrap_or_else(|| match &item.expr {
                    Expr::Column { name, .. } => name.clone(),
                    other => other.to_string(),
                })
        })
        .collect();

    let aggregate_mode = items.iter().any(|item| item.expr.contains_aggregate());
    let mut rows: Vec<(Row, Vec<Value>)> = if aggregate_mode {
        let row = aggregate_row(catalog, table, right_table, &items, &pairs)?;
        vec![(row, Vec::new())]
    } else {
        project_rows(catalog, table, right_table, &items, &stmt.order_by, &pairs)?
    };

    // 5. DISTINCT keeps the first occurrence of each output row.
    if stmt.distinct {
        let mut kept: Vec<(Row, Vec<Value>)> = Vec::new();
        for (row, keys) in rows {
            if !kept.iter().any(|(seen, _)| seen.same_output(&row)) {
                kept.push((row, keys));
            }
        }
        rows = kept;
    }

    // 6. Stable sort; NULLs first ascending, last descending.
    if !aggregate_mode && !stmt.order_by.is_empty() {
        rows.sort_by(|(_, a), (_, b)| {
            for (i, order) in stmt.order_by.iter().enumerate() {
                let ordering = null_first_cmp(&a[i], &b[i]);
                let ordering = if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    // 7. Limit.
    if let Some(limit) = stmt.limit {
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }

    Ok(QueryResult::new(
        column_names,
        rows.into_iter().map(|(row, _)| row).collect(),
    ))
}

fn null_first_cmp(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

/// Expands wildcards into concrete column references.
fn expand_items(
    left: &Table,
    right: Option<&Table>,
    items: &[SelectItem],
) -> Result<Vec<SelectItem>> {
    let mut expanded = Vec::new();
    for item in items {
        match &item.expr {
            Expr::Wildcard { table: None } => {
                push_table_columns(left, &mut expanded);
                if let Some(right) = right {
                    push_table_columns(right, &mut expanded);
                }
            }
            Expr::Wildcard { table: Some(name) } => {
                let source = if *name == left.name {
                    left
                } else if right.is_some_and(|r| r.name == *name) {
                    right.unwrap_or(left)
                } else {
                    return Err(EngineError::TableNotFound(name.clone()));
                };
                push_table_columns(source, &mut expanded);
            }
            _ => expanded.push(item.clone()),
        }
    }
    Ok(expanded)
}

fn push_table_columns(table: &Table, out: &mut Vec<SelectItem>) {
    for column in &table.schema.columns {
        out.push(SelectItem {
            expr: Expr::Column {
                table: Some(table.name.clone()),
                name: column.name.clone(),
                span: opal_sql::lexer::Span::default(),
            },
            alias: Some(column.name.clone()),
        });
    }
}

fn binding_for<'a>(table: &'a Table, position: Option<usize>) -> RowBinding<'a> {
    RowBinding {
        table: &table.name,
        schema: &table.schema,
        row: position.map(|p| &table.rows[p]),
    }
}

/// Projects each surviving pair and evaluates its ORDER BY keys.
fn project_rows(
    catalog: &Catalog,
    left: &Table,
    right: Option<&Table>,
    items: &[SelectItem],
    order_by: &[opal_sql::ast::OrderBy],
    pairs: &[RowPair],
) -> Result<Vec<(Row, Vec<Value>)>> {
    let mut out = Vec::with_capacity(pairs.len());
    for &(left_pos, right_pos) in pairs {
        let ctx = EvalContext {
            catalog,
            left: Some(binding_for(left, Some(left_pos))),
            right: right.map(|r| binding_for(r, right_pos)),
        };

        let values: Vec<Value> = items
            .iter()
            .map(|item| eval(&item.expr, &ctx))
            .collect::<Result<_>>()?;
        let keys: Vec<Value> = order_by
            .iter()
            .map(|key| eval(&key.expr, &ctx))
            .collect::<Result<_>>()?;
        out.push((Row::new(values), keys));
    }
    Ok(out)
}

// --- Joins ---

/// Produces the joined row pairs for the surviving left positions.
fn join_pairs(
    catalog: &Catalog,
    left: &Table,
    right: &Table,
    join_type: JoinType,
    on: &Expr,
    survivors: &[usize],
) -> Result<Vec<RowPair>> {
    let on_matches = |left_pos: usize, right_pos: usize| -> bool {
        let ctx = EvalContext {
            catalog,
            left: Some(binding_for(left, Some(left_pos))),
            right: Some(binding_for(right, Some(right_pos))),
        };
        matches!(eval(on, &ctx).and_then(|v| truth(&v)), Ok(Some(true)))
    };

    if let Some((left_col, right_col)) = equi_join_columns(on, left, right) {
        // Probe an index over the right equality column if one
        // exists; otherwise hash the smaller side.
        if let Some(index) = catalog
            .indexes_for(&right.name)
            .find(|ix| ix.column == right.schema.columns[right_col].name)
        {
            debug!(index = %index.name, "join probes index");
            return Ok(probe_join(
                left,
                right,
                left_col,
                index,
                join_type,
                survivors,
                &on_matches,
            ));
        }

        if join_type == JoinType::Inner && survivors.len() < right.rows.len() {
            // Build over the smaller (left) side, stream the right.
            debug!(build_side = %left.name, "hash join");
            return Ok(hash_join_build_left(
                left, right, left_col, right_col, survivors, &on_matches,
            ));
        }

        debug!(build_side = %right.name, "hash join");
        return Ok(hash_join_build_right(
            left, right, left_col, right_col, join_type, survivors, &on_matches,
        ));
    }

    // General ON condition: nested loops.
    debug!("nested-loop join");
    let mut pairs = Vec::new();
    for &left_pos in survivors {
        let mut matched = false;
        for right_pos in 0..right.rows.len() {
            if on_matches(left_pos, right_pos) {
                pairs.push((left_pos, Some(right_pos)));
                matched = true;
            }
        }
        if !matched && join_type == JoinType::Left {
            pairs.push((left_pos, None));
        }
    }
    Ok(pairs)
}

/// Detects a top-level `left_col = right_col` ON condition and
/// resolves the column positions on each side.
fn equi_join_columns(on: &Expr, left: &Table, right: &Table) -> Option<(usize, usize)> {
    let Expr::Binary {
        left: a,
        op: BinaryOp::Eq,
        right: b,
    } = on
    else {
        return None;
    };

    let side = |expr: &Expr, table: &Table| -> Option<usize> {
        let Expr::Column {
            table: qualifier,
            name,
            ..
        } = expr
        else {
            return None;
        };
        if qualifier.as_deref().is_some_and(|q| q != table.name) {
            return None;
        }
        table.schema.column_index(name)
    };

    if let (Some(l), Some(r)) = (side(a, left), side(b, right)) {
        return Some((l, r));
    }
    if let (Some(l), Some(r)) = (side(b, left), side(a, right)) {
        return Some((l, r));
    }
    None
}

/// The probe key for a join, coerced to the build side's column type
/// so hashing and ordering agree with the stored values.
fn join_key(value: Option<&Value>, target: &ColumnDef) -> Option<Value> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    value.clone().coerce_to(&target.data_type)
}

fn probe_join(
    left: &Table,
    right: &Table,
    left_col: usize,
    index: &Index,
    join_type: JoinType,
    survivors: &[usize],
    on_matches: &dyn Fn(usize, usize) -> bool,
) -> Vec<RowPair> {
    let mut pairs = Vec::new();
    for &left_pos in survivors {
        let key = join_key(
            left.rows[left_pos].get(left_col),
            &right.schema.columns[index_column(right, index)],
        );
        let mut matched = false;
        if let Some(key) = key {
            for right_pos in index.access().find_equal(&key) {
                if on_matches(left_pos, right_pos) {
                    pairs.push((left_pos, Some(right_pos)));
                    matched = true;
                }
            }
        }
        if !matched && join_type == JoinType::Left {
            pairs.push((left_pos, None));
        }
    }
    pairs
}

fn index_column(table: &Table, index: &Index) -> usize {
    table.schema.column_index(&index.column).unwrap_or(0)
}

fn hash_join_build_right(
    left: &Table,
    right: &Table,
    left_col: usize,
    right_col: usize,
    join_type: JoinType,
    survivors: &[usize],
    on_matches: &dyn Fn(usize, usize) -> bool,
) -> Vec<RowPair> {
    let buckets = right.rows.len().max(16);
    let mut map: Vec<Vec<usize>> = vec![Vec::new(); buckets];
    for (right_pos, row) in right.rows.iter().enumerate() {
        if let Some(v) = row.get(right_col) {
            if !v.is_null() {
                map[v.bucket_hash(buckets)].push(right_pos);
            }
        }
    }

    let mut pairs = Vec::new();
    for &left_pos in survivors {
        let key = join_key(left.rows[left_pos].get(left_col), &right.schema.columns[right_col]);
        let mut matched = false;
        if let Some(key) = key {
            for &right_pos in &map[key.bucket_hash(buckets)] {
                if on_matches(left_pos, right_pos) {
                    pairs.push((left_pos, Some(right_pos)));
                    matched = true;
                }
            }
        }
        if !matched && join_type == JoinType::Left {
            pairs.push((left_pos, None));
        }
    }
    pairs
}

/// Inner-join variant that hashes the (smaller) left side and streams
/// the right table; output is in right-table order.
fn hash_join_build_left(
    left: &Table,
    right: &Table,
    left_col: usize,
    right_col: usize,
    survivors: &[usize],
    on_matches: &dyn Fn(usize, usize) -> bool,
) -> Vec<RowPair> {
    let buckets = survivors.len().max(16);
    let mut map: Vec<Vec<usize>> = vec![Vec::new(); buckets];
    for &left_pos in survivors {
        if let Some(v) = left.rows[left_pos].get(left_col) {
            if !v.is_null() {
                map[v.bucket_hash(buckets)].push(left_pos);
            }
        }
    }

    let mut pairs = Vec::new();
    for (right_pos, row) in right.rows.iter().enumerate() {
        let key = join_key(row.get(right_col), &left.schema.columns[left_col]);
        if let Some(key) = key {
            for &left_pos in &map[key.bucket_hash(buckets)] {
                if on_matches(left_pos, right_pos) {
                    pairs.push((left_pos, Some(right_pos)));
                }
            }
        }
    }
    pairs
}

// --- Aggregates ---

/// Which aggregate a projection item computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "COUNT" => Some(Self::Count),
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            _ => None,
        }
    }
}

/// Running state of one aggregate, per the three-variant machine.
#[derive(Debug)]
enum AggState {
    /// COUNT(*) and plain COUNT/SUM/AVG: running sums and counts.
    Plain {
        count: usize,
        sum_int: i64,
        sum_float: f64,
        int_only: bool,
    },
    /// DISTINCT variants: the observed value set.
    Distinct { seen: Vec<Value> },
    /// MIN/MAX: the running extremum; first-seen wins ties.
    Extremum { best: Option<Value>, want_max: bool },
}

struct Aggregate {
    func: AggFunc,
    /// `None` for COUNT(*).
    arg: Option<Expr>,
    state: AggState,
}

impl Aggregate {
    fn from_item(item: &SelectItem) -> Result<Self> {
        let Expr::Function(call) = &item.expr else {
            return Err(EngineError::Type(
                "aggregates cannot be mixed with plain projections".to_string(),
            ));
        };
        let func = AggFunc::parse(&call.name).ok_or_else(|| {
            EngineError::Type("aggregates cannot be mixed with plain projections".to_string())
        })?;

        if call.star {
            if func != AggFunc::Count {
                return Err(EngineError::Type(format!(
                    "{}(*) is not defined; only COUNT(*) counts rows",
                    call.name
                )));
            }
            return Ok(Self {
                func,
                arg: None,
                state: AggState::Plain {
                    count: 0,
                    sum_int: 0,
                    sum_float: 0.0,
                    int_only: true,
                },
            });
        }

        let [arg] = call.args.as_slice() else {
            return Err(EngineError::Type(format!(
                "{} takes exactly one argument",
                call.name
            )));
        };

        let state = if call.distinct {
            AggState::Distinct { seen: Vec::new() }
        } else {
            match func {
                AggFunc::Min => AggState::Extremum {
                    best: None,
                    want_max: false,
                },
                AggFunc::Max => AggState::Extremum {
                    best: None,
                    want_max: true,
                },
                _ => AggState::Plain {
                    count: 0,
                    sum_int: 0,
                    sum_float: 0.0,
                    int_only: true,
                },
            }
        };

        Ok(Self {
            func,
            arg: Some(arg.clone()),
            state,
        })
    }

    /// Feeds one row's value into the state. NULL inputs are skipped;
    /// COUNT(*) counts the row regardless.
    fn update(&mut self, ctx: &EvalContext<'_>) -> Result<()> {
        let value = match &self.arg {
            None => {
                if let AggState::Plain { count, .. } = &mut self.state {
                    *count += 1;
                }
                return Ok(());
            }
            Some(expr) => eval(expr, ctx)?,
        };
        if value.is_null() {
            return Ok(());
        }

        match &mut self.state {
            AggState::Plain {
                count,
                sum_int,
                sum_float,
                int_only,
            } => {
                *count += 1;
                if self.func == AggFunc::Count {
                    return Ok(());
                }
                let number = value.as_f64().ok_or_else(|| {
                    EngineError::Type(format!(
                        "cannot aggregate {} values numerically",
                        value.type_name()
                    ))
                })?;
                *sum_float += number;
                match value {
                    Value::Int(n) if *int_only => {
                        *sum_int = sum_int.checked_add(n).ok_or_else(|| {
                            EngineError::Type("integer overflow in SUM".to_string())
                        })?;
                    }
                    _ => *int_only = false,
                }
            }
            AggState::Distinct { seen } => {
                if !seen.iter().any(|v| v.sql_eq(&value) == Some(true)) {
                    seen.push(value);
                }
            }
            AggState::Extremum { best, want_max } => {
                let replace = match best.as_ref() {
                    None => true,
                    Some(current) => {
                        let ordering = value.compare(current);
                        // Ties keep the first-seen value.
                        if *want_max {
                            ordering == Some(Ordering::Greater)
                        } else {
                            ordering == Some(Ordering::Less)
                        }
                    }
                };
                if replace {
                    *best = Some(value);
                }
            }
        }
        Ok(())
    }

    /// Collapses the state into the aggregate's output value.
    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> Result<Value> {
        match (self.func, self.state) {
            (AggFunc::Count, AggState::Plain { count, .. }) => {
                Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
            }
            (AggFunc::Count, AggState::Distinct { seen }) => {
                Ok(Value::Int(i64::try_from(seen.len()).unwrap_or(i64::MAX)))
            }
            (AggFunc::Sum, AggState::Plain {
                count,
                sum_int,
                sum_float,
                int_only,
            }) => Ok(if count == 0 {
                Value::Null
            } else if int_only {
                Value::Int(sum_int)
            } else {
                Value::Float(sum_float)
            }),
            (AggFunc::Sum, AggState::Distinct { seen }) => sum_distinct(&seen),
            (AggFunc::Avg, AggState::Plain {
                count, sum_float, ..
            }) => Ok(if count == 0 {
                Value::Null
            } else {
                Value::Float(sum_float / count as f64)
            }),
            (AggFunc::Avg, AggState::Distinct { seen }) => {
                if seen.is_empty() {
                    return Ok(Value::Null);
                }
                let mut sum = 0.0;
                for v in &seen {
                    sum += v.as_f64().ok_or_else(|| {
                        EngineError::Type("AVG of a non-numeric value".to_string())
                    })?;
                }
                Ok(Value::Float(sum / seen.len() as f64))
            }
            (AggFunc::Min | AggFunc::Max, AggState::Extremum { best, .. }) => {
                Ok(best.unwrap_or(Value::Null))
            }
            (AggFunc::Min, AggState::Distinct { seen }) => Ok(extremum(&seen, false)),
            (AggFunc::Max, AggState::Distinct { seen }) => Ok(extremum(&seen, true)),
            _ => Err(EngineError::Internal(
                "aggregate state does not match its function".to_string(),
            )),
        }
    }
}

fn sum_distinct(seen: &[Value]) -> Result<Value> {
    if seen.is_empty() {
        return Ok(Value::Null);
    }
    let mut sum_int = 0i64;
    let mut sum_float = 0.0f64;
    let mut int_only = true;
    for v in seen {
        let number = v.as_f64().ok_or_else(|| {
            EngineError::Type("SUM of a non-numeric value".to_string())
        })?;
        sum_float += number;
        match v {
            Value::Int(n) if int_only => {
                sum_int = sum_int
                    .checked_add(*n)
                    .ok_or_else(|| EngineError::Type("integer overflow in SUM".to_string()))?;
            }
            _ => int_only = false,
        }
    }
    Ok(if int_only {
        Value::Int(sum_int)
    } else {
        Value::Float(sum_float)
    })
}

fn extremum(seen: &[Value], want_max: bool) -> Value {
    let mut best: Option<&Value> = None;
    for v in seen {
        let replace = match best {
            None => true,
            Some(current) => {
                let ordering = v.compare(current);
                if want_max {
                    ordering == Some(Ordering::Greater)
                } else {
                    ordering == Some(Ordering::Less)
                }
            }
        };
        if replace {
            best = Some(v);
        }
    }
    best.cloned().unwrap_or(Value::Null)
}

/// Collapses the filtered/joined sequence into the single aggregate
/// output row.
fn aggregate_row(
    catalog: &Catalog,
    left: &Table,
    right: Option<&Table>,
    items: &[SelectItem],
    pairs: &[RowPair],
) -> Result<Row> {
    let mut aggregates: Vec<Aggregate> = items
        .iter()
        .map(Aggregate::from_item)
        .collect::<Result<_>>()?;

    for &(left_pos, right_pos) in pairs {
        let ctx = EvalContext {
            catalog,
            left: Some(binding_for(left, Some(left_pos))),
            right: right.map(|r| binding_for(r, right_pos)),
        };
        for aggregate in &mut aggregates {
            aggregate.update(&ctx)?;
        }
    }

    let values: Vec<Value> = aggregates
        .into_iter()
        .map(Aggregate::finish)
        .collect::<Result<_>>()?;
    Ok(Row::new(values))
}
