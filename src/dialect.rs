//! SQL-dialect seam: statement compilation and query execution.

use async_trait::async_trait;

use crate::error::{CompileError, ExecuteError};
use crate::statement::Statement;
use crate::value::{Record, Value};

/// A dialect-specific query string with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl NativeQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
pub trait Dialect: Send + Sync {
    type Connection: Send + 'static;

    /// Pure function of the statement; never touches a connection.
    fn compile(&self, statement: &Statement) -> Result<NativeQuery, CompileError>;

    /// Runs `query` and hands the connection back together with the raw rows.
    ///
    /// On failure the connection is disconnected before returning, which is
    /// why it is consumed: the caller has nothing left to release.
    async fn execute(
        &self,
        connection: Self::Connection,
        query: NativeQuery,
    ) -> Result<(Self::Connection, Vec<Record>), ExecuteError>;
}
