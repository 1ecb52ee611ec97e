//! Cost-based access planning: sequential scan vs. index scan.
//!
//! The planner inspects the top-level AND conjuncts of a WHERE tree
//! for a `column op literal` predicate over an indexed column,
//! estimates its selectivity from the table's statistics, and picks
//! the cheaper of a sequential scan and an index probe. The executor
//! re-applies the full WHERE to every candidate row, so an index probe
//! only ever narrows the candidate set; correctness never depends on
//! the plan.

use opal_sql::ast::{BinaryOp, Expr, Literal, UnaryOp};
use tracing::debug;

use crate::catalog::{Catalog, Table};
use crate::config::IndexKind;
use crate::value::Value;

/// Selectivity above which an index probe is not worth considering.
const SELECTIVITY_THRESHOLD: f64 = 0.3;

/// Default selectivity of a range predicate without usable min/max
/// statistics.
const RANGE_SELECTIVITY: f64 = 0.3;

/// Per-row cost of a sequential scan, the unit the cost model is
/// denominated in.
const SEQ_COST_PER_ROW: f64 = 1.0;

/// Comparison operators an index probe can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOp {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl ScanOp {
    const fn from_binary(op: BinaryOp, flipped: bool) -> Option<Self> {
        let direct = match op {
            BinaryOp::Eq => Self::Eq,
            BinaryOp::Lt => Self::Lt,
            BinaryOp::LtEq => Self::LtEq,
            BinaryOp::Gt => Self::Gt,
            BinaryOp::GtEq => Self::GtEq,
            _ => return None,
        };
        Some(if flipped { direct.mirror() } else { direct })
    }

    /// The operator as seen with its operands swapped
    /// (`10 > col` ≡ `col < 10`).
    const fn mirror(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }

    /// True for the range-shaped operators.
    #[must_use]
    pub const fn is_range(self) -> bool {
        !matches!(self, Self::Eq)
    }
}

/// How the executor should fetch a table's candidate rows.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPlan {
    /// Iterate rows in insertion order.
    SeqScan,
    /// Probe an index and take its positions as candidates.
    IndexScan {
        /// The chosen index.
        index: String,
        /// The probe operator.
        op: ScanOp,
        /// The probe key, already coerced to the column type.
        key: Value,
    },
}

/// A `column op literal` conjunct extracted from a WHERE tree.
struct Sarg<'a> {
    column: &'a str,
    op: ScanOp,
    literal: Value,
}

/// Chooses the access plan for `table` under the given WHERE tree.
#[must_use]
pub fn choose_plan(catalog: &Catalog, table: &Table, where_clause: Option<&Expr>) -> AccessPlan {
    let Some(filter) = where_clause else {
        return AccessPlan::SeqScan;
    };

    let total_rows = table.row_count();
    if total_rows == 0 {
        return AccessPlan::SeqScan;
    }

    let mut sargs = Vec::new();
    collect_sargs(filter, &mut sargs);

    #[allow(clippy::cast_precision_loss)]
    let seq_cost = total_rows as f64 * SEQ_COST_PER_ROW;
    let mut best: Option<(AccessPlan, f64)> = None;

    for sarg in sargs {
        let Some((index_name, key)) = probe_target(catalog, table, &sarg) else {
            continue;
        };
        let selectivity = estimate_selectivity(catalog, table, &sarg);
        // Range predicates are gated by the selectivity threshold;
        // equality probes are left to the cost comparison, which
        // already rejects them on tiny or low-cardinality tables.
        if sarg.op.is_range() && selectivity >= SELECTIVITY_THRESHOLD {
            debug!(
                table = %table.name,
                column = sarg.column,
                selectivity,
                "range predicate too wide for an index probe"
            );
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let rows = total_rows as f64;
        let cost = rows.max(2.0).log2() + selectivity * rows;
        if cost < seq_cost && best.as_ref().is_none_or(|(_, c)| cost < *c) {
            best = Some((
                AccessPlan::IndexScan {
                    index: index_name,
                    op: sarg.op,
                    key,
                },
                cost,
            ));
        }
    }

    match best {
        Some((plan, cost)) => {
            debug!(table = %table.name, ?plan, cost, seq_cost, "chose index scan");
            plan
        }
        // Ties and empty candidate sets fall back to the sequential
        // scan.
        None => {
            debug!(table = %table.name, "chose sequential scan");
            AccessPlan::SeqScan
        }
    }
}

/// Walks the top-level AND conjuncts collecting indexable predicates.
fn collect_sargs<'a>(expr: &'a Expr, out: &mut Vec<Sarg<'a>>) {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            collect_sargs(left, out);
            collect_sargs(right, out);
        }
        Expr::Binary { left, op, right } => {
            if let (Some(column), Some(literal)) = (column_name(left), literal_value(right)) {
                if let Some(op) = ScanOp::from_binary(*op, false) {
                    out.push(Sarg {
                        column,
                        op,
                        literal,
                    });
                }
            } else if let (Some(literal), Some(column)) = (literal_value(left), column_name(right))
            {
                if let Some(op) = ScanOp::from_binary(*op, true) {
                    out.push(Sarg {
                        column,
                        op,
                        literal,
                    });
                }
            }
        }
        _ => {}
    }
}

fn column_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Column { name, .. } => Some(name),
        _ => None,
    }
}

/// Evaluates a constant literal (possibly negated) to a value.
fn literal_value(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(lit) => Some(Value::from(lit)),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match operand.as_ref() {
            Expr::Literal(Literal::Integer(n)) => Some(Value::Int(-n)),
            Expr::Literal(Literal::Float(x)) => Some(Value::Float(-x)),
            _ => None,
        },
        _ => None,
    }
}

/// Finds an index able to serve the predicate and coerces the probe
/// key to the column type. Hash indexes serve equality only.
fn probe_target(catalog: &Catalog, table: &Table, sarg: &Sarg<'_>) -> Option<(String, Value)> {
    let column_index = table.schema.column_index(sarg.column)?;
    let column_type = &table.schema.columns[column_index].data_type;
    let key = sarg.literal.clone().coerce_to(column_type)?;
    if key.is_null() {
        return None;
    }

    catalog
        .indexes_for(&table.name)
        .find(|ix| {
            ix.column == sarg.column && (ix.supports_range() || !sarg.op.is_range())
        })
        .map(|ix| (ix.name.clone(), key))
}

/// Estimates the fraction of rows the predicate keeps.
#[allow(clippy::cast_precision_loss)]
fn estimate_selectivity(catalog: &Catalog, table: &Table, sarg: &Sarg<'_>) -> f64 {
    let total = table.row_count().max(1) as f64;
    let column_index = table.schema.column_index(sarg.column);
    let stats = catalog.stats(&table.name);
    let col_stats = match (stats, column_index) {
        (Some(s), Some(i)) => s.columns.get(i).filter(|c| c.has_stats),
        _ => None,
    };

    if sarg.op == ScanOp::Eq {
        return match col_stats {
            Some(c) if c.distinct_values > 0 => 1.0 / c.distinct_values as f64,
            _ => 1.0 / total,
        };
    }

    // Range predicate: narrow the default estimate when min/max
    // statistics cover a numeric column.
    let Some(c) = col_stats else {
        return RANGE_SELECTIVITY;
    };
    let (Some(lo), Some(hi), Some(k)) = (c.min.as_f64(), c.max.as_f64(), sarg.literal.as_f64())
    else {
        return RANGE_SELECTIVITY;
    };
    let span = hi - lo;
    if span <= 0.0 {
        return RANGE_SELECTIVITY;
    }
    let fraction = match sarg.op {
        ScanOp::Lt | ScanOp::LtEq => (k - lo) / span,
        ScanOp::Gt | ScanOp::GtEq => (hi - k) / span,
        ScanOp::Eq => RANGE_SELECTIVITY,
    };
    fraction.clamp(0.0, 1.0)
}
