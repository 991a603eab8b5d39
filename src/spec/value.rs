//! Property and filter values.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::sql::dialect::helpers::TIMESTAMP_LAYOUT;

/// A scalar (or list) value carried by filters, constraints and decoded objects.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Nominal(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDateTime),
    List(Vec<Value>),
}

/// The scalar kinds a column can be decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Nominal,
    Number,
    Boolean,
    Date,
}

impl Value {
    pub fn nominal(s: impl Into<String>) -> Self {
        Value::Nominal(s.into())
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Scalar kind of this value, `None` for lists.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Nominal(_) => Some(ValueType::Nominal),
            Value::Number(_) => Some(ValueType::Number),
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::Date(_) => Some(ValueType::Date),
            Value::List(_) => None,
        }
    }

    /// Parse the textual form of a value of the given type.
    pub fn parse(text: &str, value_type: ValueType) -> Option<Value> {
        let text = text.trim();
        match value_type {
            ValueType::Nominal => Some(Value::Nominal(text.to_string())),
            ValueType::Number => text.parse::<f64>().ok().map(Value::Number),
            ValueType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Some(Value::Boolean(true)),
                "false" | "f" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            ValueType::Date => parse_datetime(text).map(Value::Date),
        }
    }
}

/// Parse the date-time layouts databases commonly hand back as text.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];
    for layout in LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// Numbers compare by value, with identical bit patterns (NaN) equal to
// themselves so that Eq holds.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nominal(a), Value::Nominal(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nominal(s) => s.hash(state),
            Value::Number(n) => {
                let n = if *n == 0.0 { 0.0f64 } else { *n };
                n.to_bits().hash(state)
            }
            Value::Boolean(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nominal(s) => write!(f, "{}", s),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format(TIMESTAMP_LAYOUT)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Nominal(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Nominal(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}
