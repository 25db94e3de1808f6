//! SQLite query executor: runs compiled selects on a pooled connection.

use async_trait::async_trait;
use rusqlite::Connection;
use tracing::debug;

use super::compile::compile;
use super::pool::SqliteConnection;
use crate::dialect::{Dialect, NativeQuery};
use crate::error::{CompileError, ExecuteError};
use crate::statement::Statement;
use crate::value::{Record, Value};

/// SQLite compiler and executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

#[async_trait]
impl Dialect for SqliteDialect {
    type Connection = SqliteConnection;

    fn compile(&self, statement: &Statement) -> Result<NativeQuery, CompileError> {
        compile(statement)
    }

    async fn execute(
        &self,
        mut connection: SqliteConnection,
        query: NativeQuery,
    ) -> Result<(SqliteConnection, Vec<Record>), ExecuteError> {
        tokio::task::spawn_blocking(move || match run_query(connection.connection(), &query) {
            Ok(rows) => Ok((connection, rows)),
            Err(err) => {
                debug!(error = %err, "select failed; discarding connection");
                connection.invalidate();
                drop(connection);
                Err(ExecuteError::Sqlite(err))
            }
        })
        .await
        .map_err(|e| ExecuteError::Interrupted(e.to_string()))?
    }
}

/// Runs `query` and reads every row as raw driver values.
pub fn run_query(conn: &Connection, query: &NativeQuery) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare(&query.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query(rusqlite::params_from_iter(query.params.iter()))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), Value::from(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(records)
}
