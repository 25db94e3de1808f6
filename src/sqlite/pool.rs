//! `r2d2` connection pool over managed `rusqlite` connections.
//!
//! Connections are wrapped in [`ManagedConnection`] so that one can be
//! invalidated after a failure; the pool then discards it on return instead
//! of handing it out again.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{ManageConnection, Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::debug;

use super::config::SqliteConfig;
use crate::connection::ConnectionManager;
use crate::error::{AcquireError, ReleaseError};

/// A pooled connection leased to one select.
pub type SqliteConnection = PooledConnection<SqliteManager>;

#[derive(Debug)]
pub struct ManagedConnection {
    conn: Connection,
    invalidated: bool,
}

impl ManagedConnection {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Marks the connection so the pool closes it instead of reusing it.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }
}

pub struct SqliteManager {
    inner: SqliteConnectionManager,
}

impl fmt::Debug for SqliteManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteManager").finish_non_exhaustive()
    }
}

impl ManageConnection for SqliteManager {
    type Connection = ManagedConnection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<ManagedConnection, rusqlite::Error> {
        self.inner.connect().map(|conn| ManagedConnection {
            conn,
            invalidated: false,
        })
    }

    fn is_valid(&self, conn: &mut ManagedConnection) -> Result<(), rusqlite::Error> {
        self.inner.is_valid(&mut conn.conn)
    }

    fn has_broken(&self, conn: &mut ManagedConnection) -> bool {
        conn.invalidated || self.inner.has_broken(&mut conn.conn)
    }
}

/// Pragma customizer that runs on each new connection.
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<ManagedConnection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut ManagedConnection) -> Result<(), rusqlite::Error> {
        conn.conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;",
            self.busy_timeout_ms
        ))
    }
}

/// Connection pool bound to one SQLite database file.
#[derive(Clone)]
pub struct SqlitePool {
    pool: Pool<SqliteManager>,
}

impl fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("SqlitePool")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl SqlitePool {
    pub fn open(config: &SqliteConfig) -> Result<Self, r2d2::Error> {
        let manager = SqliteManager {
            inner: SqliteConnectionManager::file(&config.db_path),
        };
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .connection_customizer(Box::new(PragmaCustomizer {
                busy_timeout_ms: config.busy_timeout_ms,
            }))
            .build(manager)?;
        debug!(path = %config.db_path, size = config.pool_size, "opened sqlite pool");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ConnectionManager for SqlitePool {
    type Connection = SqliteConnection;

    async fn acquire(&self) -> Result<SqliteConnection, AcquireError> {
        let pool = self.pool.clone();
        let connection = tokio::task::spawn_blocking(move || pool.get())
            .await
            .map_err(|e| AcquireError::Interrupted(e.to_string()))??;
        Ok(connection)
    }

    async fn release(&self, mut connection: SqliteConnection) -> Result<(), ReleaseError> {
        if connection.is_invalidated() {
            return Err(ReleaseError::Invalidated);
        }
        if !connection.connection().is_autocommit() {
            connection.invalidate();
            return Err(ReleaseError::OpenTransaction);
        }
        drop(connection);
        Ok(())
    }
}
