//! The typed value model.
//!
//! Every cell of every row is a [`Value`]: a tagged variant owning any
//! heap payload it carries, so assigning a value into a row or a stats
//! entry deep-copies it. NULL is a value in its own right; evaluation
//! failures are *not* values but `Err` results (see `eval`).

use core::cmp::Ordering;
use core::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use opal_sql::ast::DataType;

/// Bit layout of a packed time-of-day: seconds in bits 0–5, minutes in
/// bits 6–11, hour in bits 12–19.
const TIME_MIN_SHIFT: u32 = 6;
const TIME_HOUR_SHIFT: u32 = 12;

/// Bit layout of a packed date: day in bits 0–4, month in bits 5–8,
/// year in bits 9–30.
const DATE_MONTH_SHIFT: u32 = 5;
const DATE_YEAR_SHIFT: u32 = 9;

/// A fixed-point decimal: `unscaled × 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// Total digits the column declared (informational).
    pub precision: u8,
    /// Digits after the decimal point.
    pub scale: u8,
    /// The scaled integer payload.
    pub unscaled: i64,
}

impl Decimal {
    /// Creates a decimal from a scaled integer.
    #[must_use]
    pub const fn new(precision: u8, scale: u8, unscaled: i64) -> Self {
        Self {
            precision,
            scale,
            unscaled,
        }
    }

    /// The value as a float (lossy for large payloads).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.unscaled as f64 / 10f64.powi(i32::from(self.scale))
    }

    /// Builds a decimal from a float by rounding at `scale` digits.
    #[must_use]
    pub fn from_f64(value: f64, precision: u8, scale: u8) -> Option<Self> {
        let scaled = value * 10f64.powi(i32::from(scale));
        if !scaled.is_finite() || scaled.abs() >= 9_223_372_036_854_775_807.0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let unscaled = scaled.round() as i64;
        Some(Self::new(precision, scale, unscaled))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let divisor = 10i64.pow(u32::from(self.scale));
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let abs = self.unscaled.unsigned_abs();
        let divisor = divisor.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / divisor,
            abs % divisor,
            width = self.scale as usize
        )
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// Owned UTF-8 string.
    Str(String),
    /// Owned byte blob.
    Blob(Vec<u8>),
    /// Packed time of day.
    Time(u32),
    /// Packed calendar date.
    Date(u32),
    /// The absent value.
    Null,
}

impl Value {
    /// Packs hour/minute/second into a time value.
    #[must_use]
    pub const fn time_from_parts(hour: u32, minute: u32, second: u32) -> Self {
        Self::Time(second | (minute << TIME_MIN_SHIFT) | (hour << TIME_HOUR_SHIFT))
    }

    /// Packs year/month/day into a date value.
    #[must_use]
    pub const fn date_from_parts(year: u32, month: u32, day: u32) -> Self {
        Self::Date(day | (month << DATE_MONTH_SHIFT) | (year << DATE_YEAR_SHIFT))
    }

    /// Unpacks a packed time into (hour, minute, second).
    #[must_use]
    pub const fn unpack_time(packed: u32) -> (u32, u32, u32) {
        (
            packed >> TIME_HOUR_SHIFT,
            (packed >> TIME_MIN_SHIFT) & 0x3F,
            packed & 0x3F,
        )
    }

    /// Unpacks a packed date into (year, month, day).
    #[must_use]
    pub const fn unpack_date(packed: u32) -> (u32, u32, u32) {
        (
            packed >> DATE_YEAR_SHIFT,
            (packed >> DATE_MONTH_SHIFT) & 0x0F,
            packed & 0x1F,
        )
    }

    /// Parses a `'HH:MM:SS'` literal into a packed time.
    #[must_use]
    pub fn parse_time(text: &str) -> Option<Self> {
        let t = NaiveTime::parse_from_str(text, "%H:%M:%S").ok()?;
        Some(Self::time_from_parts(t.hour(), t.minute(), t.second()))
    }

    /// Parses a `'YYYY-MM-DD'` literal into a packed date.
    #[must_use]
    pub fn parse_date(text: &str) -> Option<Self> {
        let d = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
        let year = u32::try_from(d.year()).ok()?;
        Some(Self::date_from_parts(year, d.month(), d.day()))
    }

    /// Returns true for NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The name of the value's runtime type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "INT",
            Self::Float(_) => "FLOAT",
            Self::Bool(_) => "BOOLEAN",
            Self::Decimal(_) => "DECIMAL",
            Self::Str(_) => "STRING",
            Self::Blob(_) => "BLOB",
            Self::Time(_) => "TIME",
            Self::Date(_) => "DATE",
            Self::Null => "NULL",
        }
    }

    /// The numeric view of the value, if it has one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            Self::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    /// Returns true when the value's type is assignable to `target`
    /// without coercion (the STRICT-mode rule). Integers widen to
    /// FLOAT and DECIMAL; NULL is assignable everywhere.
    #[must_use]
    pub const fn matches_type(&self, target: &DataType) -> bool {
        matches!(
            (self, target),
            (Self::Null, _)
                | (Self::Int(_), DataType::Int | DataType::Float | DataType::Decimal { .. })
                | (Self::Float(_), DataType::Float)
                | (Self::Bool(_), DataType::Boolean)
                | (Self::Decimal(_), DataType::Decimal { .. })
                | (Self::Str(_), DataType::Str)
                | (Self::Blob(_), DataType::Blob)
                | (Self::Time(_), DataType::Time)
                | (Self::Date(_), DataType::Date)
        )
    }

    /// Attempts the canonical coercion of the value to `target`
    /// (the non-STRICT INSERT rule). Returns `None` when the value
    /// cannot represent the target type.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn coerce_to(self, target: &DataType) -> Option<Self> {
        if self.is_null() || self.matches_type(target) {
            return Some(self.adapt(target));
        }
        match (self, target) {
            (Self::Float(x), DataType::Int) => {
                if x.fract() == 0.0 && x.abs() < 9.3e18 {
                    Some(Self::Int(x as i64))
                } else {
                    None
                }
            }
            (Self::Decimal(d), DataType::Int) => {
                let divisor = 10i64.pow(u32::from(d.scale));
                (d.unscaled % divisor == 0).then(|| Self::Int(d.unscaled / divisor))
            }
            (Self::Str(s), DataType::Int) => s.trim().parse::<i64>().ok().map(Self::Int),
            (Self::Str(s), DataType::Float) => s.trim().parse::<f64>().ok().map(Self::Float),
            (Self::Str(s), DataType::Boolean) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" | "1" => Some(Self::Bool(true)),
                "FALSE" | "0" => Some(Self::Bool(false)),
                _ => None,
            },
            (Self::Float(x), DataType::Decimal { precision, scale }) => {
                Decimal::from_f64(x, precision.unwrap_or(18), scale.unwrap_or(0))
                    .map(Self::Decimal)
            }
            (Self::Decimal(d), DataType::Float) => Some(Self::Float(d.to_f64())),
            (Self::Str(s), DataType::Decimal { precision, scale }) => {
                let parsed = s.trim().parse::<f64>().ok()?;
                Decimal::from_f64(parsed, precision.unwrap_or(18), scale.unwrap_or(0))
                    .map(Self::Decimal)
            }
            (Self::Str(s), DataType::Time) => Self::parse_time(&s),
            (Self::Str(s), DataType::Date) => Self::parse_date(&s),
            (Self::Int(n), DataType::Str) => Some(Self::Str(n.to_string())),
            (Self::Float(x), DataType::Str) => Some(Self::Str(Self::Float(x).to_string())),
            (Self::Int(n), DataType::Boolean) => match n {
                0 => Some(Self::Bool(false)),
                1 => Some(Self::Bool(true)),
                _ => None,
            },
            (Self::Bool(b), DataType::Int) => Some(Self::Int(i64::from(b))),
            _ => None,
        }
    }

    /// Adapts an already-assignable value to the exact column type
    /// (widening integers into FLOAT/DECIMAL columns).
    #[allow(clippy::cast_precision_loss)]
    fn adapt(self, target: &DataType) -> Self {
        match (&self, target) {
            (Self::Int(n), DataType::Float) => Self::Float(*n as f64),
            (Self::Int(n), DataType::Decimal { precision, scale }) => {
                let scale = scale.unwrap_or(0);
                match n.checked_mul(10i64.pow(u32::from(scale))) {
                    Some(unscaled) => {
                        Self::Decimal(Decimal::new(precision.unwrap_or(18), scale, unscaled))
                    }
                    None => self,
                }
            }
            _ => self,
        }
    }

    /// Total ordering across comparable values.
    ///
    /// Numeric values compare with promotion; strings compare
    /// byte-lexicographically; NULL and cross-type pairs are
    /// incomparable and return `None`.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::Blob(a), Self::Blob(b)) => Some(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) | (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Value equality under promotion, three-valued: `None` when
    /// either side is NULL, `Some(false)` for incomparable types.
    #[must_use]
    pub fn sql_eq(&self, other: &Self) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.compare(other) == Some(Ordering::Equal))
    }

    /// An estimate of the value's width in bytes, for statistics.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Int(_) | Self::Float(_) | Self::Decimal(_) => 8,
            Self::Bool(_) => 1,
            Self::Str(s) => s.len(),
            Self::Blob(b) => b.len(),
            Self::Time(_) | Self::Date(_) => 4,
            Self::Null => 0,
        }
    }

    /// Hashes the value into one of `buckets` chains.
    ///
    /// FNV-1a over a canonical byte form per type; any total hash that
    /// agrees with [`Value::sql_eq`] on same-typed keys works.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn bucket_hash(&self, buckets: usize) -> usize {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        fn mix(state: u64, bytes: &[u8]) -> u64 {
            let mut h = state;
            for &b in bytes {
                h ^= u64::from(b);
                h = h.wrapping_mul(FNV_PRIME);
            }
            h
        }

        let hash = match self {
            Self::Int(n) => mix(FNV_OFFSET, &n.to_le_bytes()),
            Self::Float(x) => mix(FNV_OFFSET, &x.to_bits().to_le_bytes()),
            Self::Bool(b) => mix(FNV_OFFSET, &[u8::from(*b)]),
            Self::Decimal(d) => {
                let h = mix(FNV_OFFSET, &d.unscaled.to_le_bytes());
                mix(h, &[d.scale])
            }
            Self::Str(s) => mix(FNV_OFFSET, s.as_bytes()),
            Self::Blob(b) => mix(FNV_OFFSET, b),
            Self::Time(t) | Self::Date(t) => mix(FNV_OFFSET, &t.to_le_bytes()),
            Self::Null => 0,
        };

        if buckets == 0 {
            0
        } else {
            (hash % buckets as u64) as usize
        }
    }
}

impl From<&opal_sql::ast::Literal> for Value {
    fn from(literal: &opal_sql::ast::Literal) -> Self {
        use opal_sql::ast::Literal;
        match literal {
            Literal::Integer(n) => Self::Int(*n),
            Literal::Float(x) => Self::Float(*x),
            Literal::Str(s) => Self::Str(s.clone()),
            Literal::Blob(b) => Self::Blob(b.clone()),
            Literal::Boolean(b) => Self::Bool(*b),
            Literal::Null => Self::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Blob(bytes) => {
                write!(f, "X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                write!(f, "'")
            }
            Self::Time(packed) => {
                let (h, m, s) = Self::unpack_time(*packed);
                write!(f, "{h:02}:{m:02}:{s:02}")
            }
            Self::Date(packed) => {
                let (y, m, d) = Self::unpack_date(*packed);
                write!(f, "{y:04}-{m:02}-{d:02}")
            }
            Self::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_packing_round_trip() {
        let Value::Time(packed) = Value::time_from_parts(13, 45, 59) else {
            panic!("not a time");
        };
        assert_eq!(Value::unpack_time(packed), (13, 45, 59));
        assert_eq!(Value::Time(packed).to_string(), "13:45:59");
    }

    #[test]
    fn test_date_packing_round_trip() {
        let Value::Date(packed) = Value::date_from_parts(2024, 2, 29) else {
            panic!("not a date");
        };
        assert_eq!(Value::unpack_date(packed), (2024, 2, 29));
        assert_eq!(Value::Date(packed).to_string(), "2024-02-29");
    }

    #[test]
    fn test_parse_time_and_date() {
        assert_eq!(
            Value::parse_time("08:30:00"),
            Some(Value::time_from_parts(8, 30, 0))
        );
        assert_eq!(Value::parse_time("25:00:00"), None);
        assert_eq!(
            Value::parse_date("2024-01-15"),
            Some(Value::date_from_parts(2024, 1, 15))
        );
        assert_eq!(Value::parse_date("2024-13-01"), None);
    }

    #[test]
    fn test_compare_with_promotion() {
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float(3.0).compare(&Value::Int(3)),
            Some(Ordering::Equal)
        );
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Str("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_string_ordering_is_byte_lexicographic() {
        // 'B' (0x42) sorts before 'a' (0x61).
        assert_eq!(
            Value::Str("Banana".into()).compare(&Value::Str("apricot".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_sql_eq_three_valued() {
        assert_eq!(Value::Int(1).sql_eq(&Value::Int(1)), Some(true));
        assert_eq!(Value::Int(1).sql_eq(&Value::Null), None);
        assert_eq!(Value::Null.sql_eq(&Value::Null), None);
        assert_eq!(Value::Int(1).sql_eq(&Value::Str("1".into())), Some(false));
    }

    #[test]
    fn test_strict_assignability() {
        assert!(Value::Int(1).matches_type(&DataType::Float));
        assert!(!Value::Float(1.0).matches_type(&DataType::Int));
        assert!(!Value::Str("1".into()).matches_type(&DataType::Int));
        assert!(Value::Null.matches_type(&DataType::Int));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(
            Value::Str("42".into()).coerce_to(&DataType::Int),
            Some(Value::Int(42))
        );
        assert_eq!(Value::Str("x".into()).coerce_to(&DataType::Int), None);
        assert_eq!(
            Value::Float(3.0).coerce_to(&DataType::Int),
            Some(Value::Int(3))
        );
        assert_eq!(Value::Float(3.5).coerce_to(&DataType::Int), None);
        assert_eq!(
            Value::Int(2).coerce_to(&DataType::Float),
            Some(Value::Float(2.0))
        );
    }

    #[test]
    fn test_float_rounds_into_decimal_column() {
        let target = DataType::Decimal {
            precision: Some(10),
            scale: Some(2),
        };
        assert_eq!(
            Value::Float(19.95).coerce_to(&target),
            Some(Value::Decimal(Decimal::new(10, 2, 1995)))
        );
        assert_eq!(
            Value::Decimal(Decimal::new(10, 2, 250)).coerce_to(&DataType::Float),
            Some(Value::Float(2.5))
        );
    }

    #[test]
    fn test_int_widens_into_decimal_column() {
        let target = DataType::Decimal {
            precision: Some(10),
            scale: Some(2),
        };
        assert_eq!(
            Value::Int(3).coerce_to(&target),
            Some(Value::Decimal(Decimal::new(10, 2, 300)))
        );
    }

    #[test]
    fn test_decimal_display() {
        assert_eq!(Decimal::new(10, 2, 1995).to_string(), "19.95");
        assert_eq!(Decimal::new(10, 2, -5).to_string(), "-0.05");
        assert_eq!(Decimal::new(10, 0, 7).to_string(), "7");
    }

    #[test]
    fn test_bucket_hash_agrees_with_equality() {
        let a = Value::Str("hello".into());
        let b = Value::Str("hello".into());
        assert_eq!(a.bucket_hash(64), b.bucket_hash(64));
        assert!(Value::Int(123).bucket_hash(64) < 64);
    }
}
