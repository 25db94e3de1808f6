//! Statement compiler for the SQLite dialect.
//!
//! Identifiers are double-quoted, values are always bound as positional `?`
//! parameters, and `LIKE` patterns use `\` as their escape character.

use crate::dialect::NativeQuery;
use crate::error::CompileError;
use crate::statement::{CompareOp, Predicate, Projection, SortDirection, Statement};
use crate::value::Value;

/// Highest parameter index SQLite will bind (`SQLITE_MAX_VARIABLE_NUMBER`).
pub const MAX_PARAMETERS: usize = 32766;

pub fn compile(statement: &Statement) -> Result<NativeQuery, CompileError> {
    let mut compiler = Compiler::default();
    compiler.select(statement)?;
    if compiler.params.len() > MAX_PARAMETERS {
        return Err(CompileError::TooManyParameters(compiler.params.len()));
    }
    Ok(NativeQuery::new(compiler.sql).with_params(compiler.params))
}

#[derive(Default)]
struct Compiler {
    sql: String,
    params: Vec<Value>,
}

impl Compiler {
    fn select(&mut self, statement: &Statement) -> Result<(), CompileError> {
        self.sql.push_str("SELECT ");
        match &statement.projection {
            Projection::All => self.sql.push('*'),
            Projection::Columns(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.ident(column)?;
                }
            }
        }

        self.sql.push_str(" FROM ");
        if let Some(schema) = &statement.from.schema {
            self.ident(schema)?;
            self.sql.push('.');
        }
        self.ident(&statement.from.name)?;

        if let Some(filter) = &statement.filter {
            self.sql.push_str(" WHERE ");
            self.predicate(filter)?;
        }

        for (i, order) in statement.order_by.iter().enumerate() {
            self.sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            self.ident(&order.column)?;
            self.sql.push_str(match order.direction {
                SortDirection::Asc => " ASC",
                SortDirection::Desc => " DESC",
            });
        }

        // SQLite only accepts OFFSET after LIMIT; -1 means unbounded.
        if statement.limit.is_some() || statement.offset.is_some() {
            let limit = match statement.limit {
                Some(limit) => {
                    i64::try_from(limit).map_err(|_| CompileError::LimitOutOfRange(limit))?
                }
                None => -1,
            };
            self.sql.push_str(" LIMIT ?");
            self.params.push(Value::Integer(limit));

            if let Some(offset) = statement.offset {
                let offset =
                    i64::try_from(offset).map_err(|_| CompileError::OffsetOutOfRange(offset))?;
                self.sql.push_str(" OFFSET ?");
                self.params.push(Value::Integer(offset));
            }
        }

        Ok(())
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<(), CompileError> {
        match predicate {
            Predicate::And(parts) => self.group(parts, " AND ", "1"),
            Predicate::Or(parts) => self.group(parts, " OR ", "0"),
            Predicate::Compare { column, op, value } => {
                self.ident(column)?;
                match (op, value) {
                    (CompareOp::Equal, Value::Null) => self.sql.push_str(" IS NULL"),
                    (CompareOp::NotEqual, Value::Null) => self.sql.push_str(" IS NOT NULL"),
                    (op, value) => {
                        self.sql.push(' ');
                        self.sql.push_str(operator(*op));
                        self.sql.push_str(" ?");
                        self.params.push(value.clone());
                    }
                }
                Ok(())
            }
            Predicate::IsNull { column, negated } => {
                self.ident(column)?;
                self.sql
                    .push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
                Ok(())
            }
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                self.ident(column)?;
                self.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.sql.push('?');
                    self.params.push(value.clone());
                }
                self.sql.push(')');
                Ok(())
            }
            Predicate::Like { column, pattern } => {
                self.ident(column)?;
                self.sql.push_str(" LIKE ? ESCAPE '\\'");
                self.params.push(Value::Text(pattern.clone()));
                Ok(())
            }
        }
    }

    fn group(&mut self, parts: &[Predicate], separator: &str, empty: &str) -> Result<(), CompileError> {
        if parts.is_empty() {
            self.sql.push_str(empty);
            return Ok(());
        }
        self.sql.push('(');
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            self.predicate(part)?;
        }
        self.sql.push(')');
        Ok(())
    }

    fn ident(&mut self, name: &str) -> Result<(), CompileError> {
        if name.is_empty() || name.contains('\0') {
            return Err(CompileError::InvalidIdentifier(name.to_string()));
        }
        self.sql.push('"');
        self.sql.push_str(&name.replace('"', "\"\""));
        self.sql.push('"');
        Ok(())
    }
}

fn operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Equal => "=",
        CompareOp::NotEqual => "<>",
        CompareOp::GreaterThan => ">",
        CompareOp::GreaterThanOrEqual => ">=",
        CompareOp::LessThan => "<",
        CompareOp::LessThanOrEqual => "<=",
    }
}
