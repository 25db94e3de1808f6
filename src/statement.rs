//! Intermediate, dialect-neutral representation of a SELECT.

use crate::value::Value;

/// Columns a statement projects.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Namespace qualifier; `None` leaves the dialect default in effect.
    pub schema: Option<String>,
    pub name: String,
}

/// Comparison operators usable against a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

/// Filter tree. An empty `And` always matches and an empty `Or` never does.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `%` and `_` are wildcards; `\` escapes them.
    Like { column: String, pattern: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// A find query over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub projection: Projection,
    pub from: TableRef,
    pub filter: Option<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Statement {
    /// `SELECT *` over `table` with no filter, ordering or pagination.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            projection: Projection::All,
            from: TableRef {
                schema: None,
                name: table.into(),
            },
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.from.schema = Some(schema.into());
        self
    }
}
