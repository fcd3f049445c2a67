/// GapDash column types and scalar values
///
/// Every cell of the dataset is a `ColumnValue`. Columns are typed so the
/// table view can pick the right default filter operator and coerce edited
/// cells, and so sort can compare numerics numerically.

use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int32,
    Int64,
    Float64,
    String,
    Bool,
}

impl ColumnType {
    /// Returns true for the integer and float types
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int32 | ColumnType::Int64 | ColumnType::Float64)
    }

    /// Smallest type able to hold values of both `self` and `other`.
    ///
    /// Used when inferring a CSV column's type across all of its rows.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int32, Int64) | (Int64, Int32) => Int64,
            (a, b) if a.is_numeric() && b.is_numeric() => Float64,
            _ => String,
        }
    }

    /// Name used on the wire ("numeric" / "text" like the browser table expects)
    pub fn wire_kind(&self) -> &'static str {
        match self {
            ColumnType::Int32 | ColumnType::Int64 | ColumnType::Float64 => "numeric",
            ColumnType::Bool => "boolean",
            ColumnType::String => "text",
        }
    }
}

/// Column value enum to support multiple types
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int32(v) => Some(*v as i64),
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int32(v) => Some(*v as f64),
            ColumnValue::Int64(v) => Some(*v as f64),
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The type this value belongs to, `None` for Null
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Int32(_) => Some(ColumnType::Int32),
            ColumnValue::Int64(_) => Some(ColumnType::Int64),
            ColumnValue::Float64(_) => Some(ColumnType::Float64),
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::Bool(_) => Some(ColumnType::Bool),
            ColumnValue::Null => None,
        }
    }

    /// Ordering used by the table's sort. Both values must be non-null;
    /// the caller decides where nulls go.
    ///
    /// Numerics compare by value regardless of width. Mixed types fall back
    /// to a fixed rank so the ordering stays total and deterministic.
    pub fn compare(&self, other: &ColumnValue) -> Ordering {
        match (self, other) {
            (ColumnValue::String(a), ColumnValue::String(b)) => a.cmp(b),
            (ColumnValue::Bool(a), ColumnValue::Bool(b)) => a.cmp(b),
            (ColumnValue::Int32(a), ColumnValue::Int32(b)) => a.cmp(b),
            (ColumnValue::Int64(a), ColumnValue::Int64(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            ColumnValue::Bool(_) => 0,
            ColumnValue::Int32(_) | ColumnValue::Int64(_) | ColumnValue::Float64(_) => 1,
            ColumnValue::String(_) => 2,
            ColumnValue::Null => 3,
        }
    }

    /// Convert to a JSON value. Non-finite floats become null.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ColumnValue::Int32(v) => JsonValue::Number((*v).into()),
            ColumnValue::Int64(v) => JsonValue::Number((*v).into()),
            ColumnValue::Float64(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ColumnValue::String(v) => JsonValue::String(v.clone()),
            ColumnValue::Bool(v) => JsonValue::Bool(*v),
            ColumnValue::Null => JsonValue::Null,
        }
    }

    /// Convert a JSON scalar, inferring the narrowest type.
    /// Arrays and objects are rejected.
    pub fn from_json(value: &JsonValue) -> Option<ColumnValue> {
        match value {
            JsonValue::Null => Some(ColumnValue::Null),
            JsonValue::Bool(b) => Some(ColumnValue::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        Some(ColumnValue::Int32(i as i32))
                    } else {
                        Some(ColumnValue::Int64(i))
                    }
                } else {
                    n.as_f64().map(ColumnValue::Float64)
                }
            }
            JsonValue::String(s) => Some(ColumnValue::String(s.clone())),
            _ => None,
        }
    }

    /// Coerce an edited cell value (as sent by the browser) to `target`.
    ///
    /// The browser sends numbers typed into a cell as strings, so text is
    /// parsed for numeric and boolean columns. An empty string clears the cell.
    pub fn coerce_json(value: &JsonValue, target: ColumnType) -> Result<ColumnValue, String> {
        if let JsonValue::String(s) = value {
            if s.trim().is_empty() {
                return Ok(ColumnValue::Null);
            }
        }
        let invalid = || format!("Cannot use {} as a {:?} value", value, target);

        match (target, value) {
            (_, JsonValue::Null) => Ok(ColumnValue::Null),
            (ColumnType::String, JsonValue::String(s)) => Ok(ColumnValue::String(s.clone())),
            (ColumnType::String, JsonValue::Number(n)) => Ok(ColumnValue::String(n.to_string())),
            (ColumnType::String, JsonValue::Bool(b)) => Ok(ColumnValue::String(b.to_string())),
            (ColumnType::Bool, JsonValue::Bool(b)) => Ok(ColumnValue::Bool(*b)),
            (ColumnType::Bool, JsonValue::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(ColumnValue::Bool(true)),
                "false" => Ok(ColumnValue::Bool(false)),
                _ => Err(invalid()),
            },
            (ColumnType::Int32, _) => {
                let n = json_to_i64(value).ok_or_else(invalid)?;
                i32::try_from(n).map(ColumnValue::Int32).map_err(|_| invalid())
            }
            (ColumnType::Int64, _) => json_to_i64(value).map(ColumnValue::Int64).ok_or_else(invalid),
            (ColumnType::Float64, _) => json_to_f64(value).map(ColumnValue::Float64).ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

fn json_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int32(v) => write!(f, "{}", v),
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(v) => f.write_str(v),
            ColumnValue::Bool(v) => write!(f, "{}", v),
            ColumnValue::Null => Ok(()),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::String(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::String(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Int32(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Float64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_widen() {
        assert_eq!(ColumnType::Int32.widen(ColumnType::Int32), ColumnType::Int32);
        assert_eq!(ColumnType::Int32.widen(ColumnType::Int64), ColumnType::Int64);
        assert_eq!(ColumnType::Int64.widen(ColumnType::Float64), ColumnType::Float64);
        assert_eq!(ColumnType::Float64.widen(ColumnType::String), ColumnType::String);
        assert_eq!(ColumnType::Bool.widen(ColumnType::Int32), ColumnType::String);
    }

    #[test]
    fn test_compare_across_numeric_widths() {
        let a = ColumnValue::Int32(3);
        let b = ColumnValue::Float64(2.5);
        assert_eq!(a.compare(&b), Ordering::Greater);
        assert_eq!(b.compare(&a), Ordering::Less);
        assert_eq!(ColumnValue::Int64(7).compare(&ColumnValue::Int32(7)), Ordering::Equal);
    }

    #[test]
    fn test_compare_mixed_types_is_deterministic() {
        let text = ColumnValue::from("Asia");
        let num = ColumnValue::Int32(1);
        assert_eq!(num.compare(&text), Ordering::Less);
        assert_eq!(text.compare(&num), Ordering::Greater);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(ColumnValue::from_json(&json!(5)), Some(ColumnValue::Int32(5)));
        assert_eq!(
            ColumnValue::from_json(&json!(5_000_000_000i64)),
            Some(ColumnValue::Int64(5_000_000_000))
        );
        assert_eq!(ColumnValue::from_json(&json!(1.5)), Some(ColumnValue::Float64(1.5)));
        assert_eq!(ColumnValue::from_json(&json!([1])), None);
        assert_eq!(ColumnValue::Float64(f64::NAN).to_json(), JsonValue::Null);
        assert_eq!(ColumnValue::from("Asia").to_json(), json!("Asia"));
    }

    #[test]
    fn test_coerce_edited_values() {
        assert_eq!(
            ColumnValue::coerce_json(&json!("1990"), ColumnType::Int32),
            Ok(ColumnValue::Int32(1990))
        );
        assert_eq!(
            ColumnValue::coerce_json(&json!("71.5"), ColumnType::Float64),
            Ok(ColumnValue::Float64(71.5))
        );
        assert_eq!(
            ColumnValue::coerce_json(&json!(12), ColumnType::String),
            Ok(ColumnValue::from("12"))
        );
        assert_eq!(ColumnValue::coerce_json(&json!(""), ColumnType::Int32), Ok(ColumnValue::Null));
        assert!(ColumnValue::coerce_json(&json!("abc"), ColumnType::Float64).is_err());
        assert!(ColumnValue::coerce_json(&json!("3000000000"), ColumnType::Int32).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ColumnValue::Float64(28.801).to_string(), "28.801");
        assert_eq!(ColumnValue::Int32(1952).to_string(), "1952");
        assert_eq!(ColumnValue::Null.to_string(), "");
    }
}
