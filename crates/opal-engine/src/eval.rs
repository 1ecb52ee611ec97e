//! The expression evaluator.
//!
//! Evaluates an expression tree against zero, one, or two row
//! bindings (two during a join) plus the catalog for subqueries.
//! NULL propagates as [`Value::Null`]; hard failures (unknown columns,
//! type mismatches, overflow) are `Err` results that abort the
//! evaluation. The filter stage treats only a concrete `TRUE` as row
//! inclusion.

use core::cmp::Ordering;

use opal_sql::ast::{BinaryOp, Expr, FunctionCall, InSet, UnaryOp};

use crate::catalog::{Catalog, TableSchema};
use crate::error::{EngineError, Result};
use crate::executor;
use crate::row::Row;
use crate::value::Value;

/// One table's row bound into the evaluation scope.
#[derive(Clone, Copy)]
pub struct RowBinding<'a> {
    /// The binding's name, matched by `table.column` references.
    pub table: &'a str,
    /// The bound table's schema.
    pub schema: &'a TableSchema,
    /// The row, or `None` for the NULL-extended side of a LEFT JOIN.
    pub row: Option<&'a Row>,
}

/// The evaluation scope: catalog plus up to two row bindings.
///
/// Column names resolve against the left binding first, then the
/// right one; `table.column` picks a binding explicitly.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// The catalog, for subqueries.
    pub catalog: &'a Catalog,
    /// The primary (left) binding.
    pub left: Option<RowBinding<'a>>,
    /// The joined (right) binding.
    pub right: Option<RowBinding<'a>>,
}

impl<'a> EvalContext<'a> {
    /// A scope with no row bindings (constant expressions).
    #[must_use]
    pub const fn bare(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            left: None,
            right: None,
        }
    }

    /// A scope over a single table's row.
    #[must_use]
    pub const fn single(catalog: &'a Catalog, binding: RowBinding<'a>) -> Self {
        Self {
            catalog,
            left: Some(binding),
            right: None,
        }
    }

    fn resolve_column(&self, table: Option<&str>, name: &str) -> Result<Value> {
        for binding in [&self.left, &self.right].into_iter().flatten() {
            if let Some(qualifier) = table {
                if qualifier != binding.table {
                    continue;
                }
            }
            if let Some(index) = binding.schema.column_index(name) {
                return Ok(match binding.row {
                    Some(row) => row.get(index).cloned().unwrap_or(Value::Null),
                    // The unmatched side of a LEFT JOIN.
                    None => Value::Null,
                });
            }
            if table.is_some() {
                break;
            }
        }
        Err(EngineError::ColumnNotFound {
            table: table
                .map_or_else(|| "<scope>".to_string(), ToString::to_string),
            column: name.to_string(),
        })
    }
}

/// The three-valued truth of a value: `Some(bool)` or `None` for NULL.
///
/// # Errors
///
/// Non-boolean, non-NULL values are a type error.
pub fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(EngineError::Type(format!(
            "expected a boolean condition, got {}",
            other.type_name()
        ))),
    }
}

/// Evaluates `expr` in `ctx`.
///
/// # Errors
///
/// Returns [`EngineError::Type`] for operand mismatches and overflow,
/// [`EngineError::ColumnNotFound`] for unresolved references, and
/// whatever a nested subquery surfaces.
pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(lit) => Ok(Value::from(lit)),

        Expr::Column { table, name, .. } => ctx.resolve_column(table.as_deref(), name),

        Expr::Binary { left, op, right } => eval_binary(left, *op, right, ctx),

        Expr::Unary { op, operand } => eval_unary(*op, operand, ctx),

        Expr::Function(call) => eval_function(call, ctx),

        Expr::IsNull { expr, negated } => {
            let value = eval(expr, ctx)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }

        Expr::Like {
            expr,
            pattern,
            negated,
        } => eval_like(expr, pattern, *negated, ctx),

        Expr::In {
            expr,
            set,
            negated,
        } => eval_in(expr, set, *negated, ctx),

        Expr::Exists(subquery) => {
            let result = executor::run_select(ctx.catalog, subquery)?;
            Ok(Value::Bool(result.row_count() > 0))
        }

        Expr::Subquery(subquery) => {
            let result = executor::run_select(ctx.catalog, subquery)?;
            if result.column_count() != 1 {
                return Err(EngineError::Type(format!(
                    "scalar subquery must produce one column, got {}",
                    result.column_count()
                )));
            }
            match result.row_count() {
                0 => Ok(Value::Null),
                1 => Ok(result.value(0, 0).cloned().unwrap_or(Value::Null)),
                n => Err(EngineError::Type(format!(
                    "scalar subquery produced {n} rows"
                ))),
            }
        }

        Expr::Case {
            operand,
            when_clauses,
            else_clause,
        } => eval_case(operand.as_deref(), when_clauses, else_clause.as_deref(), ctx),

        Expr::Wildcard { .. } => Err(EngineError::Type(
            "`*` is only valid as a projection or inside COUNT(*)".to_string(),
        )),
    }
}

fn eval_binary(left: &Expr, op: BinaryOp, right: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    match op {
        BinaryOp::And => {
            // Three-valued AND with a short circuit on a definite
            // FALSE, so the other side's errors cannot leak out of an
            // already-decided condition.
            let lhs = truth(&eval(left, ctx)?)?;
            if lhs == Some(false) {
                return Ok(Value::Bool(false));
            }
            let rhs = truth(&eval(right, ctx)?)?;
            Ok(match (lhs, rhs) {
                (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            })
        }
        BinaryOp::Or => {
            let lhs = truth(&eval(left, ctx)?)?;
            if lhs == Some(true) {
                return Ok(Value::Bool(true));
            }
            let rhs = truth(&eval(right, ctx)?)?;
            Ok(match (lhs, rhs) {
                (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            })
        }
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => {
            let lhs = eval(left, ctx)?;
            let rhs = eval(right, ctx)?;
            compare_values(&lhs, &rhs, op)
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let lhs = eval(left, ctx)?;
            let rhs = eval(right, ctx)?;
            arithmetic(&lhs, &rhs, op)
        }
    }
}

/// Comparison under numeric promotion; NULL operands yield NULL.
fn compare_values(lhs: &Value, rhs: &Value, op: BinaryOp) -> Result<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }

    match op {
        // Equality across incomparable types is FALSE, not an error:
        // `1 = 'x'` simply never matches.
        BinaryOp::Eq => Ok(Value::Bool(lhs.sql_eq(rhs) == Some(true))),
        BinaryOp::NotEq => Ok(Value::Bool(lhs.sql_eq(rhs) != Some(true))),
        _ => {
            let Some(ordering) = lhs.compare(rhs) else {
                return Err(EngineError::Type(format!(
                    "cannot order {} against {}",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            };
            let keep = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::GtEq => ordering != Ordering::Less,
                _ => unreachable!("caller dispatches comparisons only"),
            };
            Ok(Value::Bool(keep))
        }
    }
}

/// Arithmetic with the usual numeric promotion. INT op INT stays INT
/// and overflow is a hard error; any FLOAT or DECIMAL operand promotes
/// the operation to FLOAT.
fn arithmetic(lhs: &Value, rhs: &Value, op: BinaryOp) -> Result<Value> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }

    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Div => {
                if *b == 0 {
                    return Err(EngineError::Type("division by zero".to_string()));
                }
                a.checked_div(*b)
            }
            BinaryOp::Mod => {
                if *b == 0 {
                    return Err(EngineError::Type("division by zero".to_string()));
                }
                a.checked_rem(*b)
            }
            _ => unreachable!("caller dispatches arithmetic only"),
        };
        return result.map(Value::Int).ok_or_else(|| {
            EngineError::Type(format!("integer overflow in {} {} {}", a, op.as_str(), b))
        });
    }

    let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(EngineError::Type(format!(
            "cannot apply `{}` to {} and {}",
            op.as_str(),
            lhs.type_name(),
            rhs.type_name()
        )));
    };

    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EngineError::Type("division by zero".to_string()));
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EngineError::Type("division by zero".to_string()));
            }
            a % b
        }
        _ => unreachable!("caller dispatches arithmetic only"),
    };
    Ok(Value::Float(result))
}

fn eval_unary(op: UnaryOp, operand: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    let value = eval(operand, ctx)?;
    match op {
        UnaryOp::Neg => match value {
            Value::Null => Ok(Value::Null),
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EngineError::Type("integer overflow in negation".to_string())),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(EngineError::Type(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
        UnaryOp::Not => Ok(match truth(&value)? {
            Some(b) => Value::Bool(!b),
            None => Value::Null,
        }),
    }
}

fn eval_like(expr: &Expr, pattern: &Expr, negated: bool, ctx: &EvalContext<'_>) -> Result<Value> {
    let value = eval(expr, ctx)?;
    let pattern = eval(pattern, ctx)?;
    if value.is_null() || pattern.is_null() {
        return Ok(Value::Null);
    }
    let Value::Str(pattern) = pattern else {
        return Err(EngineError::Type(format!(
            "LIKE pattern must be a string, got {}",
            pattern.type_name()
        )));
    };
    // A non-string left side matches against its display text.
    let text = match value {
        Value::Str(s) => s,
        other => other.to_string(),
    };
    Ok(Value::Bool(like_match(&text, &pattern) != negated))
}

/// Matches `text` against `pattern` with `%`/`*` (any run), `_`/`?`
/// (one code point), and `\` escaping the next pattern character.
/// Matching is case-sensitive.
#[must_use]
pub fn like_match(text: &str, pattern: &str) -> bool {
    fn matches(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some(('%' | '*', rest)) => {
                (0..=text.len()).any(|skip| matches(&text[skip..], rest))
            }
            Some(('_' | '?', rest)) => text
                .split_first()
                .is_some_and(|(_, text_rest)| matches(text_rest, rest)),
            Some(('\\', rest)) => match rest.split_first() {
                Some((escaped, rest)) => text
                    .split_first()
                    .is_some_and(|(c, text_rest)| c == escaped && matches(text_rest, rest)),
                // A trailing backslash matches a literal backslash.
                None => text == ['\\'],
            },
            Some((c, rest)) => text
                .split_first()
                .is_some_and(|(t, text_rest)| t == c && matches(text_rest, rest)),
        }
    }

    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&text, &pattern)
}

fn eval_in(expr: &Expr, set: &InSet, negated: bool, ctx: &EvalContext<'_>) -> Result<Value> {
    let needle = eval(expr, ctx)?;
    if needle.is_null() {
        return Ok(Value::Null);
    }

    let candidates: Vec<Value> = match set {
        InSet::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<_>>()?,
        InSet::Subquery(subquery) => {
            let result = executor::run_select(ctx.catalog, subquery)?;
            if result.column_count() != 1 {
                return Err(EngineError::Type(format!(
                    "IN subquery must produce one column, got {}",
                    result.column_count()
                )));
            }
            result.values().to_vec()
        }
    };

    let mut saw_null = false;
    for candidate in &candidates {
        match needle.sql_eq(candidate) {
            Some(true) => return Ok(Value::Bool(!negated)),
            Some(false) => {}
            None => saw_null = true,
        }
    }
    // No match, but a NULL candidate leaves the answer unknown.
    if saw_null {
        Ok(Value::Null)
    } else {
        Ok(Value::Bool(negated))
    }
}

fn eval_case(
    operand: Option<&Expr>,
    when_clauses: &[(Expr, Expr)],
    else_clause: Option<&Expr>,
    ctx: &EvalContext<'_>,
) -> Result<Value> {
    let operand_value = operand.map(|o| eval(o, ctx)).transpose()?;

    for (when, then) in when_clauses {
        let hit = match &operand_value {
            Some(op_value) => {
                let when_value = eval(when, ctx)?;
                op_value.sql_eq(&when_value) == Some(true)
            }
            None => truth(&eval(when, ctx)?)? == Some(true),
        };
        if hit {
            return eval(then, ctx);
        }
    }

    else_clause.map_or(Ok(Value::Null), |e| eval(e, ctx))
}

fn eval_function(call: &FunctionCall, ctx: &EvalContext<'_>) -> Result<Value> {
    if call.is_aggregate() {
        return Err(EngineError::Type(format!(
            "aggregate {} is only valid at the top of a projection",
            call.name
        )));
    }

    let args: Vec<Value> = call
        .args
        .iter()
        .map(|arg| eval(arg, ctx))
        .collect::<Result<_>>()?;

    scalar_function(&call.name, &args)
}

/// Applies a scalar function to already-evaluated arguments.
#[allow(clippy::too_many_lines)]
fn scalar_function(name: &str, args: &[Value]) -> Result<Value> {
    let arity = |n: usize| -> Result<()> {
        if args.len() == n {
            Ok(())
        } else {
            Err(EngineError::Type(format!(
                "{name} takes {n} argument(s), got {}",
                args.len()
            )))
        }
    };

    // NULL in, NULL out for the single-argument functions.
    let null_in = args.iter().any(Value::is_null);

    match name {
        "ABS" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => n
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| EngineError::Type("integer overflow in ABS".to_string())),
                Value::Float(x) => Ok(Value::Float(x.abs())),
                other => Err(EngineError::Type(format!(
                    "ABS expects a number, got {}",
                    other.type_name()
                ))),
            }
        }
        "SQRT" => {
            arity(1)?;
            if null_in {
                return Ok(Value::Null);
            }
            let x = numeric_arg(name, &args[0])?;
            if x < 0.0 {
                return Err(EngineError::Type("SQRT of a negative number".to_string()));
            }
            Ok(Value::Float(x.sqrt()))
        }
        "MOD" => {
            arity(2)?;
            arithmetic(&args[0], &args[1], BinaryOp::Mod)
        }
        "POW" => {
            arity(2)?;
            if null_in {
                return Ok(Value::Null);
            }
            let base = numeric_arg(name, &args[0])?;
            let exponent = numeric_arg(name, &args[1])?;
            Ok(Value::Float(base.powf(exponent)))
        }
        "ROUND" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => Ok(Value::Int(*n)),
                // f64::round is half-away-from-zero.
                v => Ok(Value::Float(numeric_arg(name, v)?.round())),
            }
        }
        "FLOOR" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => Ok(Value::Int(*n)),
                v => Ok(Value::Float(numeric_arg(name, v)?.floor())),
            }
        }
        "CEIL" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => Ok(Value::Int(*n)),
                v => Ok(Value::Float(numeric_arg(name, v)?.ceil())),
            }
        }
        "UPPER" => {
            arity(1)?;
            if null_in {
                return Ok(Value::Null);
            }
            Ok(Value::Str(string_arg(name, &args[0])?.to_uppercase()))
        }
        "LOWER" => {
            arity(1)?;
            if null_in {
                return Ok(Value::Null);
            }
            Ok(Value::Str(string_arg(name, &args[0])?.to_lowercase()))
        }
        "LEN" => {
            arity(1)?;
            if null_in {
                return Ok(Value::Null);
            }
            let count = string_arg(name, &args[0])?.chars().count();
            Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
        }
        "MID" => {
            arity(3)?;
            if null_in {
                return Ok(Value::Null);
            }
            let s = string_arg(name, &args[0])?;
            let start = int_arg(name, &args[1])?;
            let len = int_arg(name, &args[2])?;
            // 1-based start; out-of-range slices clamp to empty.
            let skip = usize::try_from(start.max(1) - 1).unwrap_or(0);
            let take = usize::try_from(len.max(0)).unwrap_or(0);
            Ok(Value::Str(s.chars().skip(skip).take(take).collect()))
        }
        "LEFT" => {
            arity(2)?;
            if null_in {
                return Ok(Value::Null);
            }
            let s = string_arg(name, &args[0])?;
            let n = usize::try_from(int_arg(name, &args[1])?.max(0)).unwrap_or(0);
            Ok(Value::Str(s.chars().take(n).collect()))
        }
        "RIGHT" => {
            arity(2)?;
            if null_in {
                return Ok(Value::Null);
            }
            let s = string_arg(name, &args[0])?;
            let n = usize::try_from(int_arg(name, &args[1])?.max(0)).unwrap_or(0);
            let total = s.chars().count();
            Ok(Value::Str(s.chars().skip(total.saturating_sub(n)).collect()))
        }
        "CONCAT" => {
            // NULL arguments contribute nothing.
            let mut out = String::new();
            for arg in args {
                if !arg.is_null() {
                    out.push_str(&arg.to_string());
                }
            }
            Ok(Value::Str(out))
        }
        "COALESCE" => Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null)),
        "NULLIF" => {
            arity(2)?;
            if args[0].sql_eq(&args[1]) == Some(true) {
                Ok(Value::Null)
            } else {
                Ok(args[0].clone())
            }
        }
        "TIME" => {
            arity(1)?;
            if null_in {
                return Ok(Value::Null);
            }
            let s = string_arg(name, &args[0])?;
            Value::parse_time(s)
                .ok_or_else(|| EngineError::Type(format!("invalid time literal '{s}'")))
        }
        "DATE" => {
            arity(1)?;
            if null_in {
                return Ok(Value::Null);
            }
            let s = string_arg(name, &args[0])?;
            Value::parse_date(s)
                .ok_or_else(|| EngineError::Type(format!("invalid date literal '{s}'")))
        }
        "HOUR" | "MINUTE" | "SECOND" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Time(packed) => {
                    let (h, m, s) = Value::unpack_time(*packed);
                    Ok(Value::Int(i64::from(match name {
                        "HOUR" => h,
                        "MINUTE" => m,
                        _ => s,
                    })))
                }
                other => Err(EngineError::Type(format!(
                    "{name} expects a TIME value, got {}",
                    other.type_name()
                ))),
            }
        }
        "YEAR" | "MONTH" | "DAY" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Date(packed) => {
                    let (y, m, d) = Value::unpack_date(*packed);
                    Ok(Value::Int(i64::from(match name {
                        "YEAR" => y,
                        "MONTH" => m,
                        _ => d,
                    })))
                }
                other => Err(EngineError::Type(format!(
                    "{name} expects a DATE value, got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(EngineError::Type(format!("unknown function {name}"))),
    }
}

fn numeric_arg(name: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        EngineError::Type(format!(
            "{name} expects a number, got {}",
            value.type_name()
        ))
    })
}

fn int_arg(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(EngineError::Type(format!(
            "{name} expects an integer, got {}",
            other.type_name()
        ))),
    }
}

fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EngineError::Type(format!(
            "{name} expects a string, got {}",
            other.type_name()
        ))),
    }
}
