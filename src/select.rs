//! Select orchestrator.
//!
//! Runs one find end to end:
//!
//! ```text
//! resolve → translate → compile → acquire → execute → release → normalize
//! ```
//!
//! Each stage either hands its output to the next or ends the run with a
//! [`SelectError`]. Nothing is retried. A connection is only acquired once
//! the query has compiled, and only released on the path where execution
//! succeeded; a failed execute has already disconnected it.

use tracing::{debug, instrument, warn};

use crate::connection::ConnectionManager;
use crate::criteria::Criteria;
use crate::dialect::Dialect;
use crate::error::{ReleaseError, SelectError, Stage};
use crate::normalize::{normalize_with_report, CoercionMiss};
use crate::schema::{resolve, Datastore};
use crate::translate::translate;
use crate::value::Record;

/// Non-fatal faults raised by a successful select.
#[derive(Debug)]
pub enum SelectWarning {
    /// The connection could not be returned to its pool.
    Release(ReleaseError),
    /// A value did not fit its declared column type and was passed through.
    Coercion(CoercionMiss),
}

/// Typed records plus any warnings raised after the data was fetched.
#[derive(Debug, Default)]
pub struct SelectOutput {
    pub records: Vec<Record>,
    pub warnings: Vec<SelectWarning>,
}

impl SelectWarning {
    /// The post-fetch stage that raised the warning.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Release(_) => Stage::Release,
            Self::Coercion(_) => Stage::Normalize,
        }
    }
}

impl SelectOutput {
    pub fn release_failed(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, SelectWarning::Release(_)))
    }
}

/// Finds records in `table_name` matching `criteria`.
#[instrument(
    name = "select",
    skip_all,
    fields(datastore = %datastore.identity(), table = %table_name)
)]
pub async fn select<M, D>(
    datastore: &Datastore<M>,
    dialect: &D,
    table_name: &str,
    criteria: &Criteria,
) -> Result<SelectOutput, SelectError>
where
    M: ConnectionManager,
    D: Dialect<Connection = M::Connection>,
{
    let resolved = resolve(datastore, table_name)?;

    let statement = translate(table_name, criteria)
        .map_err(|e| SelectError::internal(Stage::Translate, e))?
        .in_schema(resolved.schema_name);

    let query = dialect
        .compile(&statement)
        .map_err(|e| SelectError::internal(Stage::Compile, e))?;
    debug!(sql = %query.sql, params = query.params.len(), "compiled select");

    let connection = datastore
        .manager()
        .acquire()
        .await
        .map_err(|e| SelectError::bad_connection(Stage::Acquire, e))?;

    // A failed execute consumes the connection; there is nothing to release.
    let (connection, rows) = dialect
        .execute(connection, query)
        .await
        .map_err(|e| SelectError::bad_connection(Stage::Execute, e))?;
    debug!(rows = rows.len(), "select returned");

    let mut warnings = Vec::new();
    if let Err(err) = datastore.manager().release(connection).await {
        let warning = SelectWarning::Release(err);
        warn!(
            stage = %warning.stage(),
            ?warning,
            "connection release failed after a successful select"
        );
        warnings.push(warning);
    }

    let (records, misses) = normalize_with_report(resolved.columns, rows);
    for miss in misses {
        debug!(
            row = miss.row,
            column = %miss.column,
            data_type = ?miss.data_type,
            "value left uncoerced"
        );
        warnings.push(SelectWarning::Coercion(miss));
    }

    Ok(SelectOutput { records, warnings })
}
