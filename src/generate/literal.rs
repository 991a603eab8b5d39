//! Literal canonicalization.
//!
//! Every value that ends up in generated SQL goes through here. Values
//! become typed [`Expr`] literals and the dialect serializer decides their
//! final spelling, so no call site formats a literal by hand.

use crate::spec::{position_to_datetime, PositionFormat, SpecError, SpecResult, Value, ValueType};
use crate::sql::{
    lit_bool, lit_float, lit_int, lit_str, lit_timestamp, Dialect, Expr, ExprExt,
};

/// Largest magnitude below which an integral number renders as an integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Escape character used in LIKE patterns.
pub const LIKE_ESCAPE: char = '\\';

/// Convert a scalar value to a literal expression.
pub fn value_expr(value: &Value) -> SpecResult<Expr> {
    match value {
        Value::Nominal(s) => Ok(lit_str(s)),
        Value::Number(n) => number_expr(*n),
        Value::Boolean(b) => Ok(lit_bool(*b)),
        Value::Date(d) => Ok(lit_timestamp(*d)),
        Value::List(_) => Err(SpecError::InvalidValue(
            "list values cannot be rendered as a single literal".into(),
        )),
    }
}

fn number_expr(n: f64) -> SpecResult<Expr> {
    if !n.is_finite() {
        return Err(SpecError::InvalidValue(format!(
            "{} cannot be rendered as a SQL number",
            n
        )));
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        Ok(lit_int(n as i64))
    } else {
        Ok(lit_float(n))
    }
}

/// Convert a key id to a literal of the entity's key type.
pub fn key_expr(key: &str, key_type: ValueType) -> SpecResult<Expr> {
    match key_type {
        ValueType::Nominal => Ok(lit_str(key)),
        _ => {
            let value = Value::parse(key, key_type).ok_or_else(|| {
                SpecError::InvalidValue(format!("key id '{}' is not a {:?}", key, key_type))
            })?;
            value_expr(&value)
        }
    }
}

/// Convert a millisecond position to a literal in the entity's position format.
pub fn position_expr(position: i64, format: PositionFormat) -> SpecResult<Expr> {
    match format {
        PositionFormat::Numeric => Ok(lit_int(position)),
        PositionFormat::Timestamp => position_to_datetime(position)
            .map(lit_timestamp)
            .ok_or_else(|| {
                SpecError::InvalidValue(format!("position {} is out of date range", position))
            }),
    }
}

/// Escape `\`, `%` and `_` so that `code` matches itself literally.
///
/// Returns the pattern and whether anything was escaped.
pub fn escape_like(code: &str) -> (String, bool) {
    let mut out = String::with_capacity(code.len());
    let mut escaped = false;
    for c in code.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            out.push(LIKE_ESCAPE);
            escaped = true;
        }
        out.push(c);
    }
    (out, escaped)
}

/// `column LIKE 'code'`, with `ESCAPE '\'` only when the code needed escaping.
pub fn like_code(column: Expr, code: &str) -> Expr {
    let (pattern, escaped) = escape_like(code);
    column.like(lit_str(&pattern), escaped.then_some(LIKE_ESCAPE))
}

/// Render a value as dialect-specific literal text.
pub fn render_literal(value: &Value, dialect: Dialect) -> SpecResult<String> {
    Ok(value_expr(value)?.to_tokens_for_dialect(dialect).serialize(dialect))
}
