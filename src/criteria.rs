//! Declarative, backend-agnostic find criteria.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A find request as the caller describes it.
///
/// `where` and `sort` are kept as raw JSON; their grammar is checked by the
/// translator, so a malformed shape is a translation fault rather than a
/// deserialization one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Criteria {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, where_clause: JsonValue) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort(mut self, sort: JsonValue) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}
