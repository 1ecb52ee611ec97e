//! Expression tree types.

use core::fmt;

use crate::lexer::Span;

/// A literal value appearing in query text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Integer(i64),
    /// Decimal literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Blob literal.
    Blob(Vec<u8>),
    /// Boolean literal.
    Boolean(bool),
    /// NULL literal.
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Blob(bytes) => {
                write!(f, "X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                write!(f, "'")
            }
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Returns the query-language spelling of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Returns true for `= != < <= > >=`.
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`).
    Neg,
    /// Logical NOT.
    Not,
}

impl UnaryOp {
    /// Returns the query-language spelling of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "NOT",
        }
    }
}

/// A function call: scalar (`ABS(x)`) or aggregate (`COUNT(*)`).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Uppercased function name.
    pub name: String,
    /// Argument expressions (empty for `f()` and `f(*)`).
    pub args: Vec<Expr>,
    /// `DISTINCT` marker (aggregates only).
    pub distinct: bool,
    /// `*` marker (`COUNT(*)`).
    pub star: bool,
}

impl FunctionCall {
    /// Returns true if the name is one of the aggregate functions.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(self.name.as_str(), "COUNT" | "SUM" | "AVG" | "MIN" | "MAX")
    }
}

/// The right-hand side of an `IN` predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum InSet {
    /// An explicit expression list.
    List(Vec<Expr>),
    /// A subquery producing the candidate values.
    Subquery(Box<super::SelectStatement>),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal),

    /// A column reference, optionally qualified with a table name.
    Column {
        /// Table qualifier (`table.column`).
        table: Option<String>,
        /// Column name.
        name: String,
        /// Source span.
        span: Span,
    },

    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },

    /// A scalar or aggregate function call.
    Function(FunctionCall),

    /// A scalar subquery.
    Subquery(Box<super::SelectStatement>),

    /// `EXISTS (SELECT …)`.
    Exists(Box<super::SelectStatement>),

    /// `expr IS [NOT] NULL`.
    IsNull {
        /// The tested expression.
        expr: Box<Expr>,
        /// True for `IS NOT NULL`.
        negated: bool,
    },

    /// `expr [NOT] LIKE pattern`.
    Like {
        /// The matched expression.
        expr: Box<Expr>,
        /// The pattern expression.
        pattern: Box<Expr>,
        /// True for `NOT LIKE`.
        negated: bool,
    },

    /// `expr [NOT] IN (…)`.
    In {
        /// The tested expression.
        expr: Box<Expr>,
        /// The candidate set.
        set: InSet,
        /// True for `NOT IN`.
        negated: bool,
    },

    /// `CASE [operand] WHEN … THEN … [ELSE …] END`.
    Case {
        /// Operand of a simple CASE, if any.
        operand: Option<Box<Expr>>,
        /// WHEN/THEN pairs.
        when_clauses: Vec<(Expr, Expr)>,
        /// ELSE result.
        else_clause: Option<Box<Expr>>,
    },

    /// `*` or `table.*` in a projection.
    Wildcard {
        /// Table qualifier.
        table: Option<String>,
    },
}

impl Expr {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
            span: Span::default(),
        }
    }

    /// Creates an integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::Str(value.into()))
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Returns true if this node is an aggregate function call.
    #[must_use]
    pub fn is_aggregate_call(&self) -> bool {
        match self {
            Self::Function(call) => call.is_aggregate(),
            _ => false,
        }
    }

    /// Returns true if any node of the tree is an aggregate call.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Function(call) => {
                call.is_aggregate() || call.args.iter().any(Self::contains_aggregate)
            }
            Self::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Self::Unary { operand, .. } => operand.contains_aggregate(),
            Self::IsNull { expr, .. } => expr.contains_aggregate(),
            Self::Like { expr, pattern, .. } => {
                expr.contains_aggregate() || pattern.contains_aggregate()
            }
            Self::In { expr, set, .. } => {
                expr.contains_aggregate()
                    || match set {
                        InSet::List(items) => items.iter().any(Self::contains_aggregate),
                        InSet::Subquery(_) => false,
                    }
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                operand.as_deref().is_some_and(Self::contains_aggregate)
                    || when_clauses
                        .iter()
                        .any(|(w, t)| w.contains_aggregate() || t.contains_aggregate())
                    || else_clause.as_deref().is_some_and(Self::contains_aggregate)
            }
            Self::Literal(_)
            | Self::Column { .. }
            | Self::Subquery(_)
            | Self::Exists(_)
            | Self::Wildcard { .. } => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column { table, name, .. } => match table {
                Some(t) => write!(f, "{t}.{name}"),
                None => write!(f, "{name}"),
            },
            Self::Binary { left, op, right } => write!(f, "{left} {op} {right}"),
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "NOT {operand}"),
            },
            Self::Function(call) => {
                write!(f, "{}(", call.name)?;
                if call.distinct {
                    write!(f, "DISTINCT ")?;
                }
                if call.star {
                    write!(f, "*")?;
                }
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Subquery(_) | Self::Exists(_) => write!(f, "(SELECT …)"),
            Self::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{expr} IS NOT NULL")
                } else {
                    write!(f, "{expr} IS NULL")
                }
            }
            Self::Like {
                expr,
                pattern,
                negated,
            } => {
                if *negated {
                    write!(f, "{expr} NOT LIKE {pattern}")
                } else {
                    write!(f, "{expr} LIKE {pattern}")
                }
            }
            Self::In { expr, set, negated } => {
                write!(f, "{expr}")?;
                if *negated {
                    write!(f, " NOT")?;
                }
                write!(f, " IN (")?;
                match set {
                    InSet::List(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{item}")?;
                        }
                    }
                    InSet::Subquery(_) => write!(f, "SELECT …")?,
                }
                write!(f, ")")
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(op) = operand {
                    write!(f, " {op}")?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(e) = else_clause {
                    write!(f, " ELSE {e}")?;
                }
                write!(f, " END")
            }
            Self::Wildcard { table } => match table {
                Some(t) => write!(f, "{t}.*"),
                None => write!(f, "*"),
            },
        }
    }
}
