//! Result normalizer: casts raw driver values into declared column types.
//!
//! # Coercion policy
//!
//! Coercion is best-effort and never fails. A value that cannot be cast to
//! its column's declared type is passed through unchanged and reported as a
//! [`CoercionMiss`]; the rest of the row and the rest of the result set are
//! still returned. Columns absent from a row stay absent, and columns the
//! schema does not declare are left as the driver produced them.
//!
//! Every cast maps an already-typed value to itself, so normalizing twice
//! yields the same rows as normalizing once.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::schema::{DataType, TableDefinition};
use crate::value::{Record, Value};

/// A value left as-is because it did not fit its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionMiss {
    pub row: usize,
    pub column: String,
    pub data_type: DataType,
}

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Normalizes `rows` against the column schema of `table`.
pub fn normalize(table: &TableDefinition, rows: Vec<Record>) -> Vec<Record> {
    normalize_with_report(table, rows).0
}

/// Like [`normalize`], also returning every value that was passed through.
pub fn normalize_with_report(
    table: &TableDefinition,
    mut rows: Vec<Record>,
) -> (Vec<Record>, Vec<CoercionMiss>) {
    let mut misses = Vec::new();

    for (index, row) in rows.iter_mut().enumerate() {
        for column in &table.columns {
            let Some(slot) = row.get_mut(&column.name) else {
                continue;
            };
            let raw = std::mem::replace(slot, Value::Null);
            *slot = match coerce(raw, column.data_type) {
                Ok(value) => value,
                Err(original) => {
                    misses.push(CoercionMiss {
                        row: index,
                        column: column.name.clone(),
                        data_type: column.data_type,
                    });
                    original
                }
            };
        }
    }

    (rows, misses)
}

/// Casts one value, handing it back untouched in `Err` when it does not fit.
pub fn coerce(value: Value, data_type: DataType) -> Result<Value, Value> {
    if value.is_null() {
        return Ok(value);
    }
    match data_type {
        DataType::Integer => to_integer(value),
        DataType::Real => to_real(value),
        DataType::Text => to_text(value),
        DataType::Blob => match value {
            Value::Blob(_) => Ok(value),
            other => Err(other),
        },
        DataType::Boolean => to_boolean(value),
        DataType::DateTime => to_datetime(value),
        DataType::Json => to_json(value),
    }
}

fn to_integer(value: Value) -> Result<Value, Value> {
    match value {
        Value::Integer(_) => Ok(value),
        Value::Boolean(b) => Ok(Value::Integer(i64::from(b))),
        Value::Real(f) => real_as_integer(f).map(Value::Integer).ok_or(value),
        Value::Text(ref s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::Integer(i))
            } else {
                // Numeric text that is not integral stays numeric.
                parse_finite(trimmed)
                    .map(|f| real_as_integer(f).map_or(Value::Real(f), Value::Integer))
                    .ok_or(value)
            }
        }
        other => Err(other),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn real_as_integer(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[allow(clippy::cast_precision_loss)]
fn to_real(value: Value) -> Result<Value, Value> {
    match value {
        Value::Real(_) => Ok(value),
        Value::Integer(i) => Ok(Value::Real(i as f64)),
        Value::Text(ref s) => parse_finite(s.trim()).map(Value::Real).ok_or(value),
        other => Err(other),
    }
}

fn to_text(value: Value) -> Result<Value, Value> {
    match value {
        Value::Text(_) => Ok(value),
        Value::Integer(i) => Ok(Value::Text(i.to_string())),
        Value::Real(f) => Ok(Value::Text(f.to_string())),
        Value::Boolean(b) => Ok(Value::Text(b.to_string())),
        Value::DateTime(dt) => Ok(Value::Text(dt.to_rfc3339())),
        Value::Blob(bytes) => String::from_utf8(bytes)
            .map(Value::Text)
            .map_err(|e| Value::Blob(e.into_bytes())),
        other => Err(other),
    }
}

fn to_boolean(value: Value) -> Result<Value, Value> {
    match value {
        Value::Boolean(_) => Ok(value),
        Value::Integer(0) => Ok(Value::Boolean(false)),
        Value::Integer(1) => Ok(Value::Boolean(true)),
        Value::Text(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Value::Boolean(true)),
            "false" | "f" | "0" => Ok(Value::Boolean(false)),
            _ => Err(value),
        },
        other => Err(other),
    }
}

fn to_datetime(value: Value) -> Result<Value, Value> {
    match value {
        Value::DateTime(_) => Ok(value),
        // Integers are epoch milliseconds.
        Value::Integer(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Value::DateTime)
            .ok_or(value),
        Value::Text(ref s) => parse_datetime(s.trim()).map(Value::DateTime).ok_or(value),
        other => Err(other),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn to_json(value: Value) -> Result<Value, Value> {
    match value {
        Value::Json(_) => Ok(value),
        Value::Text(ref s) => serde_json::from_str(s).map(Value::Json).map_err(|_| value),
        Value::Integer(i) => Ok(Value::Json(i.into())),
        Value::Boolean(b) => Ok(Value::Json(b.into())),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(|n| Value::Json(n.into()))
            .ok_or(value),
        other => Err(other),
    }
}
