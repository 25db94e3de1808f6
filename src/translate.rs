//! Criteria translator: turns [`Criteria`] into a [`Statement`].
//!
//! Where-clause grammar:
//!
//! - `{ attr: scalar }` equality, `{ attr: null }` null test,
//!   `{ attr: [a, b] }` membership.
//! - `{ attr: { op: value, .. } }` with `<`, `<=`, `>`, `>=`, `!=`, `in`,
//!   `nin`, `like`, `contains`, `startsWith`, `endsWith`. Several operators on
//!   one attribute are conjoined.
//! - `{ and: [clause, ..] }` and `{ or: [clause, ..] }`.
//! - Sibling keys in one object are conjoined.

use serde_json::{Map, Value as JsonValue};

use crate::criteria::Criteria;
use crate::error::TranslateError;
use crate::statement::{CompareOp, OrderBy, Predicate, Projection, SortDirection, Statement};
use crate::value::Value;

/// Translates `criteria` into a find statement over `table_name`.
pub fn translate(table_name: &str, criteria: &Criteria) -> Result<Statement, TranslateError> {
    if table_name.is_empty() {
        return Err(TranslateError::EmptyTableName);
    }

    let mut statement = Statement::new(table_name);

    if let Some(clause) = &criteria.where_clause {
        statement.filter = translate_where(clause)?;
    }
    if let Some(columns) = &criteria.select {
        statement.projection = translate_projection(columns)?;
    }
    if let Some(sort) = &criteria.sort {
        statement.order_by = translate_sort(sort)?;
    }
    statement.limit = criteria.limit;
    statement.offset = criteria.skip;

    Ok(statement)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// `None` when the clause places no constraint.
fn translate_where(clause: &JsonValue) -> Result<Option<Predicate>, TranslateError> {
    let JsonValue::Object(map) = clause else {
        return Err(TranslateError::WhereNotObject(json_kind(clause)));
    };
    if map.is_empty() {
        return Ok(None);
    }
    translate_object(map).map(Some)
}

fn translate_object(map: &Map<String, JsonValue>) -> Result<Predicate, TranslateError> {
    let mut parts = map
        .iter()
        .map(|(key, value)| translate_entry(key, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if parts.len() == 1 {
        parts.remove(0)
    } else {
        Predicate::And(parts)
    })
}

fn translate_entry(key: &str, value: &JsonValue) -> Result<Predicate, TranslateError> {
    match key {
        "and" | "or" => {
            let JsonValue::Array(items) = value else {
                return Err(TranslateError::ExpectedArray(key.to_string()));
            };
            let children = items
                .iter()
                .map(|item| match item {
                    JsonValue::Object(map) if map.is_empty() => Ok(Predicate::And(Vec::new())),
                    JsonValue::Object(map) => translate_object(map),
                    other => Err(TranslateError::WhereNotObject(json_kind(other))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if key == "and" {
                Predicate::And(children)
            } else {
                Predicate::Or(children)
            })
        }
        attribute => translate_attribute(attribute, value),
    }
}

fn translate_attribute(attribute: &str, value: &JsonValue) -> Result<Predicate, TranslateError> {
    match value {
        JsonValue::Null => Ok(Predicate::IsNull {
            column: attribute.to_string(),
            negated: false,
        }),
        JsonValue::Array(items) => Ok(Predicate::InList {
            column: attribute.to_string(),
            values: scalar_list(attribute, items)?,
            negated: false,
        }),
        JsonValue::Object(ops) => {
            if ops.is_empty() {
                return Err(TranslateError::InvalidValue {
                    attribute: attribute.to_string(),
                    reason: "empty modifier object".into(),
                });
            }
            let mut parts = ops
                .iter()
                .map(|(op, operand)| translate_operator(attribute, op, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if parts.len() == 1 {
                parts.remove(0)
            } else {
                Predicate::And(parts)
            })
        }
        scalar => Ok(Predicate::Compare {
            column: attribute.to_string(),
            op: CompareOp::Equal,
            value: scalar_value(attribute, scalar)?,
        }),
    }
}

fn translate_operator(
    attribute: &str,
    op: &str,
    operand: &JsonValue,
) -> Result<Predicate, TranslateError> {
    let column = attribute.to_string();
    let compare = |op| -> Result<Predicate, TranslateError> {
        if operand.is_null() {
            return Err(TranslateError::InvalidValue {
                attribute: attribute.to_string(),
                reason: "null cannot be ordered".into(),
            });
        }
        Ok(Predicate::Compare {
            column: attribute.to_string(),
            op,
            value: scalar_value(attribute, operand)?,
        })
    };

    match op {
        "<" => compare(CompareOp::LessThan),
        "<=" => compare(CompareOp::LessThanOrEqual),
        ">" => compare(CompareOp::GreaterThan),
        ">=" => compare(CompareOp::GreaterThanOrEqual),
        "!=" if operand.is_null() => Ok(Predicate::IsNull {
            column,
            negated: true,
        }),
        "!=" => Ok(Predicate::Compare {
            column,
            op: CompareOp::NotEqual,
            value: scalar_value(attribute, operand)?,
        }),
        "in" | "nin" => {
            let JsonValue::Array(items) = operand else {
                return Err(TranslateError::ExpectedArray(format!("{attribute}.{op}")));
            };
            Ok(Predicate::InList {
                column,
                values: scalar_list(attribute, items)?,
                negated: op == "nin",
            })
        }
        "like" => Ok(Predicate::Like {
            column,
            pattern: string_operand(attribute, op, operand)?.to_string(),
        }),
        "contains" => Ok(Predicate::Like {
            column,
            pattern: format!("%{}%", escape_like(string_operand(attribute, op, operand)?)),
        }),
        "startsWith" => Ok(Predicate::Like {
            column,
            pattern: format!("{}%", escape_like(string_operand(attribute, op, operand)?)),
        }),
        "endsWith" => Ok(Predicate::Like {
            column,
            pattern: format!("%{}", escape_like(string_operand(attribute, op, operand)?)),
        }),
        unknown => Err(TranslateError::UnknownOperator {
            attribute: attribute.to_string(),
            operator: unknown.to_string(),
        }),
    }
}

fn scalar_value(attribute: &str, value: &JsonValue) -> Result<Value, TranslateError> {
    Value::from_json_scalar(value).ok_or_else(|| TranslateError::InvalidValue {
        attribute: attribute.to_string(),
        reason: format!("expected a scalar, got {}", json_kind(value)),
    })
}

fn scalar_list(attribute: &str, items: &[JsonValue]) -> Result<Vec<Value>, TranslateError> {
    items
        .iter()
        .map(|item| match scalar_value(attribute, item)? {
            Value::Null => Err(TranslateError::InvalidValue {
                attribute: attribute.to_string(),
                reason: "null is not allowed in a list".into(),
            }),
            value => Ok(value),
        })
        .collect()
}

fn string_operand<'a>(
    attribute: &str,
    op: &str,
    operand: &'a JsonValue,
) -> Result<&'a str, TranslateError> {
    operand.as_str().ok_or_else(|| TranslateError::InvalidValue {
        attribute: attribute.to_string(),
        reason: format!("`{op}` expects a string, got {}", json_kind(operand)),
    })
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn translate_projection(columns: &[String]) -> Result<Projection, TranslateError> {
    if columns.is_empty() {
        return Err(TranslateError::EmptyProjection);
    }
    if columns.iter().any(|c| c == "*") {
        return Ok(Projection::All);
    }
    Ok(Projection::Columns(columns.to_vec()))
}

fn translate_sort(sort: &JsonValue) -> Result<Vec<OrderBy>, TranslateError> {
    match sort {
        JsonValue::String(s) => s.split(',').map(sort_term).collect(),
        JsonValue::Array(items) => items.iter().map(sort_item).collect(),
        JsonValue::Object(map) if map.len() == 1 => sort_item(sort).map(|order| vec![order]),
        other => Err(TranslateError::InvalidSort(format!(
            "expected a string, an array or a single-key object, got {}",
            json_kind(other)
        ))),
    }
}

fn sort_item(item: &JsonValue) -> Result<OrderBy, TranslateError> {
    match item {
        JsonValue::String(s) => sort_term(s),
        JsonValue::Object(map) => {
            let mut entries = map.iter();
            match (entries.next(), entries.next()) {
                (Some((column, direction)), None) => Ok(OrderBy {
                    column: column.clone(),
                    direction: sort_direction(direction)?,
                }),
                _ => Err(TranslateError::InvalidSort(
                    "each sort object must name exactly one attribute".into(),
                )),
            }
        }
        other => Err(TranslateError::InvalidSort(format!(
            "unexpected sort entry: {}",
            json_kind(other)
        ))),
    }
}

fn sort_term(term: &str) -> Result<OrderBy, TranslateError> {
    let mut words = term.split_whitespace();
    let column = words
        .next()
        .ok_or_else(|| TranslateError::InvalidSort("empty sort term".into()))?;
    let direction = match words.next() {
        None => SortDirection::Asc,
        Some(word) => parse_direction(word)?,
    };
    if let Some(extra) = words.next() {
        return Err(TranslateError::InvalidSort(format!(
            "unexpected `{extra}` in sort term `{term}`"
        )));
    }
    Ok(OrderBy {
        column: column.to_string(),
        direction,
    })
}

fn sort_direction(value: &JsonValue) -> Result<SortDirection, TranslateError> {
    match value {
        JsonValue::String(s) => parse_direction(s),
        JsonValue::Number(n) if n.as_i64() == Some(1) => Ok(SortDirection::Asc),
        JsonValue::Number(n) if n.as_i64() == Some(-1) => Ok(SortDirection::Desc),
        other => Err(TranslateError::InvalidSort(format!(
            "unexpected sort direction: {other}"
        ))),
    }
}

fn parse_direction(word: &str) -> Result<SortDirection, TranslateError> {
    if word.eq_ignore_ascii_case("asc") {
        Ok(SortDirection::Asc)
    } else if word.eq_ignore_ascii_case("desc") {
        Ok(SortDirection::Desc)
    } else {
        Err(TranslateError::InvalidSort(format!(
            "unknown sort direction `{word}`"
        )))
    }
}
