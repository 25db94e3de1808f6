//! SQLite backend for the select pipeline.
//!
//! - **[`config`]**: serde-loadable datastore configuration.
//! - **[`pool`]**: `r2d2` pool whose connections can be invalidated so a
//!   failed connection is closed rather than reused.
//! - **[`compile`]**: statement compiler for SQLite SQL.
//! - **[`dialect`]**: [`SqliteDialect`], pairing the compiler with a blocking
//!   executor run on tokio's blocking pool.

pub mod compile;
pub mod config;
pub mod dialect;
pub mod pool;

pub use config::SqliteConfig;
pub use dialect::SqliteDialect;
pub use pool::{ManagedConnection, SqliteConnection, SqliteManager, SqlitePool};

use crate::criteria::Criteria;
use crate::error::SelectError;
use crate::schema::Datastore;
use crate::select::{select, SelectOutput};

impl Datastore<SqlitePool> {
    /// Opens a pooled SQLite datastore with empty registries.
    pub fn open(identity: impl Into<String>, config: &SqliteConfig) -> Result<Self, r2d2::Error> {
        Ok(Self::new(identity, SqlitePool::open(config)?))
    }

    /// Runs a find against `table_name` using the SQLite dialect.
    pub async fn find(
        &self,
        table_name: &str,
        criteria: &Criteria,
    ) -> Result<SelectOutput, SelectError> {
        select(self, &SqliteDialect, table_name, criteria).await
    }
}
